//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  In many retail systems:                                                │
//! │    Rs 10.00 / 3 = Rs 3.33 (×3 = Rs 9.99)  → Lost Rs 0.01!              │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paisa                                            │
//! │    1000 paisa / 3 = 333 paisa (×3 = 999 paisa)                         │
//! │    We KNOW we lost 1 paisa, and handle it explicitly                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use khata_core::money::Money;
//!
//! // Create from paisa (preferred) or whole rupees
//! let price = Money::from_rupees(900); // Rs 900.00, a unit price
//!
//! // Arithmetic operations
//! let line = price.multiply_quantity(15);          // Rs 13500.00
//! let total = line + Money::from_paisa(50);        // Rs 13500.50
//!
//! // NEVER do this:
//! // let bad = Money::from_float(10.99); // NO SUCH METHOD EXISTS!
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::CommissionRate;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (paisa).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for corrections and balances
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## User Workflow Context
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                    Where Money is Used                                  │
/// │                                                                         │
/// │  Product.default_unit_price ──┬──► resolved unit price ──► line total  │
/// │                               │                                         │
/// │  Mart.price_overrides ────────┘                                         │
/// │                                                                         │
/// │  SalesEntry.total_amount ──► SalesEntry.amount_received ──► outstanding│
/// │                                                                         │
/// │  EVERY monetary value in the system flows through this type            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paisa (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use khata_core::money::Money;
    ///
    /// let price = Money::from_paisa(1099); // Represents Rs 10.99
    /// assert_eq!(price.paisa(), 1099);
    /// ```
    ///
    /// ## Why Paisa?
    /// Using the smallest unit eliminates all floating-point concerns.
    /// The record store, calculations, and JSON contracts all use paisa.
    /// Only the UI converts to rupees for display.
    #[inline]
    pub const fn from_paisa(paisa: i64) -> Self {
        Money(paisa)
    }

    /// Creates a Money value from whole rupees.
    ///
    /// ## Example
    /// ```rust
    /// use khata_core::money::Money;
    ///
    /// let price = Money::from_rupees(900); // Rs 900.00
    /// assert_eq!(price.paisa(), 90_000);
    /// ```
    ///
    /// ## Note
    /// Catalog prices and override prices in this business are whole-rupee
    /// amounts; this constructor keeps call sites readable.
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * 100)
    }

    /// Returns the value in paisa (smallest currency unit).
    #[inline]
    pub const fn paisa(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (rupees) portion.
    ///
    /// ## Example
    /// ```rust
    /// use khata_core::money::Money;
    ///
    /// let price = Money::from_paisa(1099);
    /// assert_eq!(price.rupees(), 10);
    ///
    /// let negative = Money::from_paisa(-550);
    /// assert_eq!(negative.rupees(), -5);
    /// ```
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (paisa) portion (always 0-99).
    ///
    /// ## Example
    /// ```rust
    /// use khata_core::money::Money;
    ///
    /// let price = Money::from_paisa(1099);
    /// assert_eq!(price.paisa_part(), 99);
    /// ```
    #[inline]
    pub const fn paisa_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    ///
    /// ## Example
    /// ```rust
    /// use khata_core::money::Money;
    ///
    /// let zero = Money::zero();
    /// assert_eq!(zero.paisa(), 0);
    /// assert!(zero.is_zero());
    /// ```
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use khata_core::money::Money;
    ///
    /// let unit_price = Money::from_rupees(900);
    /// let line_total = unit_price.multiply_quantity(15);
    /// assert_eq!(line_total.rupees(), 13_500);
    /// ```
    ///
    /// ## User Workflow
    /// ```text
    /// Product: gir500 @ Rs 900
    /// Quantity: 15
    ///      │
    ///      ▼
    /// multiply_quantity(15) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Line Total: Rs 13,500
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Calculates the commission owed on this amount.
    ///
    /// ## Implementation
    /// Integer math with half-up rounding: `(amount * bps + 5000) / 10000`.
    /// The +5000 provides rounding (5000/10000 = 0.5). i128 intermediate
    /// prevents overflow on large amounts.
    ///
    /// ## Example
    /// ```rust
    /// use khata_core::money::Money;
    /// use khata_core::types::CommissionRate;
    ///
    /// let sales = Money::from_rupees(13_500);
    /// let rate = CommissionRate::from_percentage(5.0); // 5%
    ///
    /// let commission = sales.commission(rate);
    /// assert_eq!(commission.rupees(), 675);
    /// ```
    ///
    /// ## User Workflow
    /// ```text
    /// Mart monthly sales: Rs 13,500
    ///      │
    ///      ▼
    /// commission(5%) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Commission payable: Rs 675
    /// ```
    pub fn commission(&self, rate: CommissionRate) -> Money {
        let paisa = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_paisa(paisa as i64)
    }

    /// Saturating subtraction that never goes below zero.
    ///
    /// ## Example
    /// ```rust
    /// use khata_core::money::Money;
    ///
    /// let total = Money::from_rupees(13_500);
    /// let received = Money::from_rupees(14_000); // overpaid
    /// assert!(total.saturating_sub(received).is_zero());
    /// ```
    ///
    /// ## Usage
    /// Outstanding-balance math: an overpaid sale has zero outstanding,
    /// not a negative one.
    #[inline]
    pub fn saturating_sub(&self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for debugging and logs. Use frontend formatting for actual UI
/// display to handle localization properly.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}Rs {}.{:02}",
            sign,
            self.rupees().abs(),
            self.paisa_part()
        )
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Addition of two Money values.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Subtraction of two Money values.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Subtraction assignment (-=).
impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by integer (for quantity calculations).
impl Mul<i32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i32) -> Self {
        Money(self.0 * qty as i64)
    }
}

/// Multiplication by i64.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
