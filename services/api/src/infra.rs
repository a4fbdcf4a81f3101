use approval_desk::offers::{BusinessId, BusinessRecord, BusinessRepository, RepositoryError};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local record store backing the HTTP service and the import command.
#[derive(Default, Clone)]
pub(crate) struct InMemoryBusinessRepository {
    records: Arc<Mutex<HashMap<BusinessId, BusinessRecord>>>,
}

impl InMemoryBusinessRepository {
    /// Loads records as they were stored, in any of the historical offer shapes.
    pub(crate) fn seeded(records: Vec<BusinessRecord>) -> Result<Self, RepositoryError> {
        let repository = Self::default();
        for record in records {
            repository.insert(record)?;
        }
        Ok(repository)
    }

    /// Every stored record, ordered by id.
    pub(crate) fn snapshot(&self) -> Result<Vec<BusinessRecord>, RepositoryError> {
        let mut records: Vec<BusinessRecord> = self.lock()?.values().cloned().collect();
        records.sort_by(|left, right| left.id.as_str().cmp(right.id.as_str()));
        Ok(records)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<BusinessId, BusinessRecord>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl BusinessRepository for InMemoryBusinessRepository {
    fn insert(&self, record: BusinessRecord) -> Result<BusinessRecord, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: BusinessRecord) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&record.id) {
            guard.insert(record.id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &BusinessId) -> Result<Option<BusinessRecord>, RepositoryError> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn find_by_name(&self, business_name: &str) -> Result<Option<BusinessRecord>, RepositoryError> {
        Ok(self
            .lock()?
            .values()
            .find(|record| record.business_name == business_name)
            .cloned())
    }

    fn delete(&self, id: &BusinessId) -> Result<(), RepositoryError> {
        self.lock()?
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approval_desk::offers::{DecisionStatus, OfferGeneration};
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn update_requires_an_existing_record() {
        let repository = InMemoryBusinessRepository::default();
        let record = BusinessRecord::new(
            BusinessId::from("biz-1"),
            "Zulu Tailors",
            DecisionStatus::Pending,
            Utc::now(),
        );

        assert!(matches!(
            repository.update(record.clone()),
            Err(RepositoryError::NotFound)
        ));
        repository.insert(record.clone()).expect("insert");
        assert!(matches!(
            repository.insert(record),
            Err(RepositoryError::Conflict)
        ));
    }

    #[test]
    fn seeded_records_keep_their_stored_shape() {
        let records: Vec<BusinessRecord> = serde_json::from_value(json!([
            { "id": "biz-b", "businessName": "Second", "lender": "Acme", "advanceAmount": "1" },
            { "id": "biz-a", "businessName": "First" }
        ]))
        .expect("records decode");

        let repository = InMemoryBusinessRepository::seeded(records).expect("seeded");
        let snapshot = repository.snapshot().expect("snapshot");

        assert_eq!(snapshot[0].id.as_str(), "biz-a");
        assert_eq!(snapshot[1].generation(), OfferGeneration::FlatLegacy);
        assert!(repository
            .find_by_name("Second")
            .expect("lookup")
            .is_some());
        assert!(repository.find_by_name("second").expect("lookup").is_none());
    }
}
