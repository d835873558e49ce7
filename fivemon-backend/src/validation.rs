/// Input validation for request parameters
use fivemon_store::Period;
use thiserror::Error;

/// Longest accepted search query, in characters.
pub const MAX_SEARCH_LEN: usize = 64;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Search query too long (max {max} characters, got {actual})")]
    SearchQueryTooLong { max: usize, actual: usize },

    #[error("Search query contains control characters")]
    SearchQueryInvalidChars,
}

/// Validates a player search query
///
/// Rules:
/// - Max 64 characters
/// - No control characters
///
/// The minimum length is enforced by the store's search itself.
pub fn validate_search_query(query: &str) -> Result<(), ValidationError> {
    let len = query.chars().count();
    if len > MAX_SEARCH_LEN {
        return Err(ValidationError::SearchQueryTooLong {
            max: MAX_SEARCH_LEN,
            actual: len,
        });
    }

    if query.chars().any(char::is_control) {
        return Err(ValidationError::SearchQueryInvalidChars);
    }

    Ok(())
}

/// Resolves the `period` query parameter
///
/// Missing or unrecognised values fall back to the last 24 hours.
pub fn resolve_period(raw: Option<&str>) -> Period {
    match raw.map(str::parse::<Period>) {
        Some(Ok(period)) => period,
        Some(Err(err)) => {
            tracing::debug!(%err, "falling back to 24h history");
            Period::default()
        }
        None => Period::default(),
    }
}
