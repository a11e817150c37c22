//! # Error Types
//!
//! Domain-specific error types for khata-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  khata-core errors (this file)                                         │
//! │  ├── CoreError        - Ledger rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  khata-db errors (separate crate)                                      │
//! │  └── DbError          - Record store failures                          │
//! │                                                                         │
//! │  khata-service errors (separate crate)                                 │
//! │  └── ServiceError     - What the caller sees (serialized)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ServiceError → Caller   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product key, entry id, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger engine errors.
///
/// These errors represent ledger rule violations. They are returned before
/// any stock mutation is computed - a failed operation leaves the Mart
/// value it was given untouched.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A transaction line carries a negative unit count.
    ///
    /// ## When This Occurs
    /// - A refill or sale form submits a negative quantity
    /// - Quantities are integer units only; the engine never accepts
    ///   fractional or negative counts
    #[error("Invalid quantity for {key}: {quantity}")]
    InvalidQuantity { key: String, quantity: i64 },

    /// Requested sale quantity exceeds on-hand stock.
    ///
    /// ## When This Occurs
    /// Only under [`crate::ledger::OversellPolicy::Reject`]. The default
    /// floor-at-zero policy absorbs the deficit instead of failing.
    ///
    /// ## User Workflow
    /// ```text
    /// Record Sale (gir500 × 15)
    ///      │
    ///      ▼
    /// Check stock: available=10
    ///      │
    ///      ▼
    /// InsufficientStock { key: "gir500", available: 10, requested: 15 }
    ///      │
    ///      ▼
    /// UI shows: "Only 10 gir500 in stock"
    /// ```
    #[error("Insufficient stock for {key}: available {available}, requested {requested}")]
    InsufficientStock {
        key: String,
        available: i64,
        requested: i64,
    },

    /// A product key has neither a mart-level override nor a catalog
    /// default price.
    ///
    /// ## Note
    /// Sale totalling does NOT raise this - unpriceable lines are skipped
    /// from the total and surfaced as warnings. It exists for callers that
    /// need a single price and must not treat absence as zero.
    #[error("No resolvable price for product: {0}")]
    UnresolvablePrice(String),

    /// A monetary amount is invalid (negative received amount, etc.).
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// Referenced sale entry does not exist on the mart.
    #[error("Sale entry not found: {0}")]
    SaleNotFound(String),

    /// Referenced mart does not exist.
    #[error("Mart not found: {0}")]
    MartNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before ledger logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid mobile number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            key: "gir500".to_string(),
            available: 10,
            requested: 15,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for gir500: available 10, requested 15"
        );

        let err = CoreError::InvalidQuantity {
            key: "gir500".to_string(),
            quantity: -3,
        };
        assert_eq!(err.to_string(), "Invalid quantity for gir500: -3");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::TooLong {
            field: "name".to_string(),
            max: 100,
        };
        assert_eq!(err.to_string(), "name must be at most 100 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "mobile".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
