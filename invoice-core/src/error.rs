use std::path::PathBuf;

use thiserror::Error;

/// A precondition the user can fix by editing the form. `Display` is the
/// message shown to them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a description for the item")]
    MissingDescription,

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Please enter a rate for the item")]
    MissingRate,

    #[error("Please enter the client's name")]
    MissingClientName,

    #[error("Please enter the client's email")]
    MissingClientEmail,

    #[error("Please add at least one item")]
    NoItems,

    #[error("That amount is too large")]
    AmountTooLarge,

    #[error("{field} must be a date like 2024-01-15, got {value:?}")]
    InvalidDate { field: &'static str, value: String },

    #[error("unknown status {0:?} (expected draft, sent, paid or overdue)")]
    InvalidStatus(String),

    #[error("no course with id {0}")]
    UnknownCourse(String),

    #[error("no student with id {0}")]
    UnknownStudent(String),

    #[error("no item with id {0}")]
    UnknownItem(String),
}

#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("store error: {0}")]
    Store(String),

    #[error("invoice {0} not found")]
    NotFound(String),

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    #[error("could not render PDF: {0}")]
    Render(#[from] std::io::Error),

    #[error("could not read font file {}: {source}", path.display())]
    FontFile { path: PathBuf, source: std::io::Error },

    #[error("download failed: {0}")]
    Download(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, InvoiceError>;
