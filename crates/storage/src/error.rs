use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("core error: {0}")]
    Core(#[from] kts_core::CoreError),
}
