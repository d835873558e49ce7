use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("unknown history period '{0}' (expected 24h, 7d or 30d)")]
    UnknownPeriod(String),

    #[error("search query must contain at least {min} characters")]
    QueryTooShort { min: usize },
}

pub type Result<T> = std::result::Result<T, StoreError>;
