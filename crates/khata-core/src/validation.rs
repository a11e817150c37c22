//! # Validation Module
//!
//! Input validation utilities for Khata.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend forms (out of scope)                                │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: khata-service                                                │
//! │  └── THIS MODULE: field validation before engine calls                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: khata-core ledger engine                                     │
//! │  └── Transaction-level rules (negative quantities, stock policy)       │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,no_run
//! use khata_core::validation::{validate_product_key, validate_quantity};
//!
//! // Validate a key before building a transaction line
//! validate_product_key("gir500").unwrap();
//!
//! // Validate a unit count from the form
//! validate_quantity(15).unwrap();
//! ```

use crate::error::ValidationError;
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product key.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 50 characters
/// - Should contain only lowercase alphanumerics, hyphens, underscores
///
/// ## Example
/// ```rust
/// use khata_core::validation::validate_product_key;
///
/// assert!(validate_product_key("gir500").is_ok());
/// assert!(validate_product_key("").is_err());
/// assert!(validate_product_key("has space").is_err());
/// ```
pub fn validate_product_key(key: &str) -> ValidationResult<()> {
    let key = key.trim();

    if key.is_empty() {
        return Err(ValidationError::Required {
            field: "productKey".to_string(),
        });
    }

    if key.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "productKey".to_string(),
            max: 50,
        });
    }

    if !key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "productKey".to_string(),
            reason: "must contain only lowercase letters, numbers, hyphens, and underscores"
                .to_string(),
        });
    }

    Ok(())
}

/// Validates a mart name.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 100 characters
pub fn validate_mart_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 100,
        });
    }

    Ok(())
}

/// Validates a contact mobile number.
///
/// ## Rules
/// - Must not be empty
/// - 7 to 15 digits, optional leading `+`
///
/// Orders are correlated to marts by this number (there is no foreign
/// key), so a malformed value silently orphans the mart from its orders.
pub fn validate_mobile(mobile: &str) -> ValidationResult<()> {
    let mobile = mobile.trim();

    if mobile.is_empty() {
        return Err(ValidationError::Required {
            field: "mobile".to_string(),
        });
    }

    let digits = mobile.strip_prefix('+').unwrap_or(mobile);
    if digits.len() < 7 || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "mobile".to_string(),
            reason: "must be 7-15 digits with an optional leading +".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a transaction line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (9,999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Refill Form: Add Line                                                  │
/// │                                                                         │
/// │  User enters quantity: 15                                              │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(15) ← THIS FUNCTION                                 │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       ├── qty > 9999? → Error: "quantity must be between 1 and 9999"   │
/// │       │                                                                 │
/// │       └── OK → Proceed with record_refill                              │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in paisa.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free promotional stock)
pub fn validate_price_paisa(paisa: i64) -> ValidationResult<()> {
    if paisa < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a received-payment amount in paisa.
///
/// ## Rules
/// - Must be non-negative (>= 0); zero clears a mistaken entry
/// - An upper bound against the sale total is deliberately NOT applied
pub fn validate_received_paisa(paisa: i64) -> ValidationResult<()> {
    if paisa < 0 {
        return Err(ValidationError::MustBePositive {
            field: "amountReceived".to_string(),
        });
    }

    Ok(())
}

/// Validates a commission rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
/// - The onboarding form captures 0-100 percent; conversion happens
///   before this check
pub fn validate_commission_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "commission".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use khata_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
