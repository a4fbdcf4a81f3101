use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::{
    ImportLayout, ImportRow, ImportRowError, ImportSummary, OverallStatus, RawImportRow,
    RowResult, RowStatus,
};
use crate::offers::book::OfferBook;
use crate::offers::domain::{BusinessId, BusinessRecord, DecisionStatus};
use crate::offers::ids::next_business_id;
use crate::offers::normalizer::normalize_at;
use crate::offers::repository::BusinessRepository;

/// Applies import rows to the repository one at a time, in input order.
pub(crate) struct Reconciler<'a, R> {
    repository: &'a R,
    layout: ImportLayout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AppliedRow {
    pub(crate) business_id: BusinessId,
    pub(crate) offers_added: usize,
    pub(crate) created: bool,
}

impl<'a, R> Reconciler<'a, R>
where
    R: BusinessRepository,
{
    pub(crate) fn new(repository: &'a R, layout: ImportLayout) -> Self {
        Self { repository, layout }
    }

    pub(crate) fn run(&self, rows: Vec<RawImportRow>, now: DateTime<Utc>) -> ImportSummary {
        let mut summary = ImportSummary::default();

        for raw in rows {
            let row = raw.row();
            let business_name = raw.business_name();

            let result = match self.apply_raw(raw, now) {
                Ok(applied) => {
                    debug!(
                        row,
                        business = %business_name,
                        business_id = %applied.business_id,
                        offers_added = applied.offers_added,
                        created = applied.created,
                        "import row applied"
                    );
                    RowResult {
                        row,
                        business_name,
                        status: RowStatus::Imported,
                        business_id: Some(applied.business_id),
                        offers_added: applied.offers_added,
                        error: None,
                    }
                }
                Err(error) => {
                    warn!(row, business = %business_name, %error, "import row rejected");
                    RowResult {
                        row,
                        business_name,
                        status: RowStatus::Error,
                        business_id: None,
                        offers_added: 0,
                        error: Some(error.to_string()),
                    }
                }
            };
            summary.record(result);
        }

        summary
    }

    fn apply_raw(&self, raw: RawImportRow, now: DateTime<Utc>) -> Result<AppliedRow, ImportRowError> {
        let columns = match raw {
            RawImportRow::Columns { columns, .. } => columns,
            RawImportRow::Malformed { error, .. } => return Err(ImportRowError::Malformed(error)),
        };
        let row = ImportRow::from_columns(&columns, &self.layout)?;
        self.apply(&row, now)
    }

    /// Merges one row into the record with the same business name, creating it when absent.
    /// Existing offers are normalized first and kept; new offers are appended in slot order,
    /// so the best slot becomes primary only on a record with no prior offers.
    pub(crate) fn apply(
        &self,
        row: &ImportRow,
        now: DateTime<Utc>,
    ) -> Result<AppliedRow, ImportRowError> {
        if row.overall_status == OverallStatus::Approved && row.offers.is_empty() {
            return Err(ImportRowError::NoOffers);
        }

        let existing = self.repository.find_by_name(&row.business_name)?;
        let created = existing.is_none();
        let mut record = existing.unwrap_or_else(|| {
            BusinessRecord::new(
                next_business_id(now),
                row.business_name.clone(),
                row.overall_status.decision_status(),
                now,
            )
        });

        let mut book = OfferBook::new(normalize_at(&record, now));
        match row.overall_status {
            OverallStatus::Approved => {
                for fields in &row.offers {
                    book.add_at(fields.clone(), now);
                }
                record.status = DecisionStatus::Approved;
            }
            OverallStatus::DeclinedOnly => {
                if book.is_empty() {
                    record.status = DecisionStatus::Declined;
                }
            }
        }
        record.decline.record(&row.declined);

        let offers_added = match row.overall_status {
            OverallStatus::Approved => row.offers.len(),
            OverallStatus::DeclinedOnly => 0,
        };
        let business_id = record.id.clone();
        record.commit_offers(book.into_entries());

        if created {
            self.repository.insert(record)?;
        } else {
            self.repository.update(record)?;
        }

        Ok(AppliedRow {
            business_id,
            offers_added,
            created,
        })
    }
}
