use std::fmt;

use thiserror::Error;

/// A field the receipt parser knows how to pull out of a notification body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Amount,
    Card,
    Merchant,
    Date,
    Snippet,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Amount => "amount",
            Self::Card => "card",
            Self::Merchant => "merchant",
            Self::Date => "date",
            Self::Snippet => "snippet",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("No {field} found in the email")]
pub struct ExtractionError {
    pub field: Field,
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Expense creation failed: {0}")]
    ExpenseCreation(String),

    #[error("Missing credentials: {0}")]
    Credentials(String),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_error_names_field() {
        let err = ExtractionError { field: Field::Amount };
        assert_eq!(err.to_string(), "No amount found in the email");
        let err = ExtractionError { field: Field::Card };
        assert_eq!(err.to_string(), "No card found in the email");
    }

    #[test]
    fn test_extraction_converts_into_sync_error() {
        let err: SyncError = ExtractionError { field: Field::Date }.into();
        assert!(matches!(
            err,
            SyncError::Extraction(ExtractionError { field: Field::Date })
        ));
        assert!(err.to_string().contains("No date found"));
    }
}
