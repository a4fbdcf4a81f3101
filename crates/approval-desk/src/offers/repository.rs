use super::domain::{BusinessId, BusinessRecord};

/// Storage abstraction for business records and their embedded offer list.
///
/// One fetch followed by one update per mutation; there is no version token, so concurrent
/// writers to the same record resolve as last write wins.
pub trait BusinessRepository: Send + Sync {
    fn insert(&self, record: BusinessRecord) -> Result<BusinessRecord, RepositoryError>;
    fn update(&self, record: BusinessRecord) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &BusinessId) -> Result<Option<BusinessRecord>, RepositoryError>;
    /// Case-sensitive exact match on the business name.
    fn find_by_name(&self, business_name: &str) -> Result<Option<BusinessRecord>, RepositoryError>;
    fn delete(&self, id: &BusinessId) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("stored record could not be decoded: {0}")]
    Corrupt(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
