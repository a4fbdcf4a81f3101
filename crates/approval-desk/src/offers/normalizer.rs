use chrono::{DateTime, Utc};

use super::book::repair_primary;
use super::domain::{BusinessRecord, LegacyOfferEntry, OfferEntry, OfferFields};
use super::ids::{new_offer_id_at, OfferIdOrigin};
use super::schema::StoredApprovals;

/// Canonical offer list for `record`, whatever generation its data is stored in.
pub fn normalize(record: &BusinessRecord) -> Vec<OfferEntry> {
    normalize_at(record, Utc::now())
}

/// As [`normalize`], with `now` standing in for timestamps the stored data never recorded.
///
/// A non-empty canonical list comes back untouched. Otherwise the flat single-offer columns
/// (when they hold a lender or an amount) become the primary offer, followed by the legacy
/// array entries in their stored order.
pub fn normalize_at(record: &BusinessRecord, now: DateTime<Utc>) -> Vec<OfferEntry> {
    if let StoredApprovals::Canonical(entries) = &record.additional_approvals {
        if !entries.is_empty() {
            return entries.clone();
        }
    }

    let mut offers = Vec::new();

    if record.flat.has_offer() {
        offers.push(OfferEntry::new(
            new_offer_id_at(OfferIdOrigin::PrimaryMigration(&record.id), now),
            record.flat.to_offer_fields(),
            true,
            record.created_at.unwrap_or(now),
        ));
    }

    if let StoredApprovals::Legacy(legacy) = &record.additional_approvals {
        offers.extend(
            legacy
                .iter()
                .enumerate()
                .map(|(index, entry)| upgrade_legacy(index, entry, now)),
        );
    }

    // Without a flat-field offer nothing above was marked primary.
    repair_primary(&mut offers);
    offers
}

fn upgrade_legacy(index: usize, entry: &LegacyOfferEntry, now: DateTime<Utc>) -> OfferEntry {
    let fields = OfferFields {
        lender: entry.lender.clone(),
        advance_amount: entry.amount.clone(),
        term: entry.term.clone(),
        factor_rate: entry.factor_rate.clone(),
        ..OfferFields::default()
    };

    OfferEntry::new(
        new_offer_id_at(OfferIdOrigin::LegacyMigration(index), now),
        fields,
        false,
        now,
    )
}
