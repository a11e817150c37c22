//! # Service Error Type
//!
//! Unified error type for aggregate operations.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Khata                                  │
//! │                                                                         │
//! │  Caller (presentation layer)        Rust Backend                        │
//! │  ───────────────────────────        ────────────                        │
//! │                                                                         │
//! │  record_sale(...)                                                       │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Service Method                                                  │  │
//! │  │  Result<T, ServiceError>                                         │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Gateway Error? ──── DbError::NotFound { .. } ─────┐            │  │
//! │  │         │                                          │            │  │
//! │  │         ▼                                          ▼            │  │
//! │  │  Engine Error? ── CoreError::InvalidQuantity ── ServiceError ──►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  The caller receives { code: "NOT_FOUND", message: "Mart not..." }     │
//! │  and decides whether the action is retryable.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use khata_core::CoreError;
use khata_db::DbError;

/// Error returned from aggregate operations.
///
/// ## Serialization
/// This is what the presentation layer receives when an operation fails:
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Mart not found: 550e8400-..."
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for service responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Record store operation failed (retryable)
    DatabaseError,

    /// Ledger rule violation
    BusinessLogic,

    /// Insufficient stock (Reject oversell policy only)
    InsufficientStock,

    /// Payment reconciliation error
    PaymentError,

    /// Internal error
    Internal,
}

impl ServiceError {
    /// Creates a new service error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ServiceError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ServiceError::new(ErrorCode::NotFound, format!("{resource} not found: {id}"))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::new(ErrorCode::Internal, message)
    }
}

/// Converts record-store errors to service errors.
impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ServiceError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ServiceError::new(
                ErrorCode::ValidationError,
                format!("{field} '{value}' already exists"),
            ),
            DbError::Serialization(e) => {
                tracing::error!("Document serialization failed: {}", e);
                ServiceError::new(ErrorCode::Internal, "Stored record is unreadable")
            }
            DbError::ConnectionFailed(_) => {
                ServiceError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ServiceError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ServiceError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                ServiceError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ServiceError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts ledger engine errors to service errors.
impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidQuantity { key, quantity } => ServiceError::new(
                ErrorCode::ValidationError,
                format!("Invalid quantity for {key}: {quantity}"),
            ),
            CoreError::InsufficientStock {
                key,
                available,
                requested,
            } => ServiceError::new(
                ErrorCode::InsufficientStock,
                format!("Insufficient stock for {key}: {available} available, {requested} requested"),
            ),
            CoreError::UnresolvablePrice(key) => ServiceError::new(
                ErrorCode::BusinessLogic,
                format!("No resolvable price for product: {key}"),
            ),
            CoreError::InvalidAmount { reason } => {
                ServiceError::new(ErrorCode::PaymentError, format!("Invalid amount: {reason}"))
            }
            CoreError::SaleNotFound(id) => ServiceError::not_found("Sale entry", &id),
            CoreError::MartNotFound(id) => ServiceError::not_found("Mart", &id),
            CoreError::Validation(e) => ServiceError::validation(e.to_string()),
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ServiceError {}

// =============================================================================
// Unit Tests
// =============================================================================
