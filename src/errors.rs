//! Unified error type for the grocery ledger.
//!
//! Every service function returns [`Result`]. Variants carry enough structure for
//! callers to branch on, and [`Error::kind`] folds them into the coarse taxonomy a
//! transport layer needs (client error, not found, conflict, forbidden, storage).

use thiserror::Error;

/// Coarse classification of an [`Error`], used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or empty input, correctable by the caller
    Validation,
    /// A referenced record does not exist (or was deleted)
    NotFound,
    /// The request collides with existing state
    Conflict,
    /// Ownership or role check failed
    Authorization,
    /// Underlying persistence failure, possibly transient
    Storage,
    /// Application configuration could not be loaded
    Configuration,
}

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Input failed validation
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// A monetary or quantity value was negative, zero where not allowed, or not finite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected value
        amount: f64,
    },

    /// Product lookup failed
    #[error("Product not found: {id}")]
    ProductNotFound {
        /// Requested product id
        id: i64,
    },

    /// Purchase lookup failed
    #[error("Purchase not found: {id}")]
    PurchaseNotFound {
        /// Requested purchase id
        id: i64,
    },

    /// Price history lookup failed
    #[error("Price history entry not found: {id}")]
    PriceHistoryNotFound {
        /// Requested entry id
        id: i64,
    },

    /// User lookup failed
    #[error("User not found: {key}")]
    UserNotFound {
        /// Requested id or email
        key: String,
    },

    /// Category lookup failed
    #[error("Category not found: {id}")]
    CategoryNotFound {
        /// Requested category id
        id: i64,
    },

    /// User-category-product link lookup failed
    #[error("Category link not found: {id}")]
    LinkNotFound {
        /// Requested link id
        id: i64,
    },

    /// A purchase with the same user, date and location already exists
    #[error("Duplicate purchase at '{location}' on {date}")]
    DuplicatePurchase {
        /// Purchase location
        location: String,
        /// Purchase date (RFC3339)
        date: String,
    },

    /// Another product already uses this barcode
    #[error("Barcode already in use: {barcode}")]
    DuplicateBarcode {
        /// Conflicting barcode
        barcode: String,
    },

    /// Another user already registered this email
    #[error("Email already registered: {email}")]
    DuplicateEmail {
        /// Conflicting email
        email: String,
    },

    /// The product is already linked to the category for this user
    #[error("Product {product_id} is already in category {category_id}")]
    DuplicateLink {
        /// Category id
        category_id: i64,
        /// Product id
        product_id: i64,
    },

    /// The requesting user may not perform the action
    #[error("Permission denied: {message}")]
    Unauthorized {
        /// Which action was refused
        message: String,
    },

    /// Database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Maps the error onto the coarse taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } | Self::InvalidAmount { .. } => ErrorKind::Validation,
            Self::ProductNotFound { .. }
            | Self::PurchaseNotFound { .. }
            | Self::PriceHistoryNotFound { .. }
            | Self::UserNotFound { .. }
            | Self::CategoryNotFound { .. }
            | Self::LinkNotFound { .. } => ErrorKind::NotFound,
            Self::DuplicatePurchase { .. }
            | Self::DuplicateBarcode { .. }
            | Self::DuplicateEmail { .. }
            | Self::DuplicateLink { .. } => ErrorKind::Conflict,
            Self::Unauthorized { .. } => ErrorKind::Authorization,
            Self::Database(_) | Self::Io(_) => ErrorKind::Storage,
            Self::Config { .. } | Self::EnvVar(_) => ErrorKind::Configuration,
        }
    }

    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for an [`Error::Unauthorized`] with the given message.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Replaces a unique-constraint violation with `conflict`, keeping any other error.
    pub(crate) fn on_unique_violation(self, conflict: impl FnOnce() -> Self) -> Self {
        match &self {
            Self::Database(err)
                if matches!(
                    err.sql_err(),
                    Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
                ) =>
            {
                conflict()
            }
            _ => self,
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
