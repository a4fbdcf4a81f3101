use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

use super::domain::{BusinessId, OfferId};

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const RANDOM_SUFFIX_LEN: usize = 6;

/// Where an offer came from. Each origin owns a distinct id prefix, so ids never collide
/// across origins within one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferIdOrigin<'a> {
    /// Added by staff or by a bulk import row: `appr-{epochMillis}-{6 base36 chars}`.
    Manual,
    /// The flat single-offer columns of a record: `primary-{recordId}`.
    PrimaryMigration(&'a BusinessId),
    /// Position in a pre-`isPrimary` array: `migrated-{index}`.
    LegacyMigration(usize),
}

pub fn new_offer_id(origin: OfferIdOrigin<'_>) -> OfferId {
    new_offer_id_at(origin, Utc::now())
}

pub fn new_offer_id_at(origin: OfferIdOrigin<'_>, now: DateTime<Utc>) -> OfferId {
    match origin {
        OfferIdOrigin::Manual => OfferId(format!(
            "appr-{}-{}",
            now.timestamp_millis(),
            random_suffix()
        )),
        OfferIdOrigin::PrimaryMigration(record_id) => OfferId(format!("primary-{record_id}")),
        OfferIdOrigin::LegacyMigration(index) => OfferId(format!("migrated-{index}")),
    }
}

static BUSINESS_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Fresh record id, `biz-{epochMillis}-{sequence}`.
pub fn next_business_id(now: DateTime<Utc>) -> BusinessId {
    let sequence = BUSINESS_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    BusinessId(format!("biz-{}-{sequence:04}", now.timestamp_millis()))
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..RANDOM_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}
