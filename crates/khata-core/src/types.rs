//! # Domain Types
//!
//! Core domain types used throughout Khata.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Mart        │   │   RefillEntry   │   │   SalesEntry    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  stock map      │   │  date           │   │  date           │       │
//! │  │  overrides map  │   │  quantities     │   │  quantities     │       │
//! │  │  refills, sales │   │  created_at     │   │  total, status  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ CommissionRate  │   │  PaymentStatus  │   │    Product      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Pending        │   │  key ("gir500") │       │
//! │  │  500 = 5%       │   │  PartialPaid    │   │  default price  │       │
//! │  └─────────────────┘   │  Paid           │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ledger/Snapshot Pairing
//! A Mart carries BOTH the append-only transaction logs (refills, sales)
//! and the derived stock snapshot. Every engine operation produces the new
//! snapshot and the new log entry together as one value - the two can
//! never disagree inside a single Mart record.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::money::Money;

/// Stable product identifier, e.g. `"gir500"`.
///
/// Plain strings, not UUIDs: these are the business keys the catalog,
/// stock maps, and ledger lines are all keyed by.
pub type ProductKey = String;

// =============================================================================
// Commission Rate
// =============================================================================

/// Commission rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 500 bps = 5% (a typical mart commission)
///
/// The onboarding form captures a percentage (0-100); it is converted once
/// at the boundary via [`CommissionRate::from_percentage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CommissionRate(u32);

impl CommissionRate {
    /// Creates a commission rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        CommissionRate(bps)
    }

    /// Creates a commission rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        CommissionRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero commission rate.
    #[inline]
    pub const fn zero() -> Self {
        CommissionRate(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for CommissionRate {
    fn default() -> Self {
        CommissionRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product. Reference data, externally owned.
///
/// The ledger engine reads the catalog through the
/// [`crate::catalog::ProductCatalog`] trait and never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    /// Stable business identifier, e.g. "gir500".
    pub key: ProductKey,

    /// Display name shown in forms and invoices.
    pub name: String,

    /// Pack size label, e.g. "500ml".
    pub size_label: String,

    /// Default unit price. A mart-level override takes precedence.
    pub default_unit_price: Money,
}

// =============================================================================
// Payment Status
// =============================================================================

/// Payment state of a sales entry.
///
/// ## Free-Form Transitions
/// The intended direction is `Pending → PartialPaid → Paid`, but NO
/// transition is forbidden: operators correct mistakes by moving a sale
/// from any status to any other. This is a plain field, not a state
/// machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum PaymentStatus {
    /// No payment received yet.
    Pending,
    /// Some payment received, balance outstanding.
    PartialPaid,
    /// Fully settled (as judged by the operator).
    Paid,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

// =============================================================================
// Refill Entry
// =============================================================================

/// A stock delivery to a mart. Immutable once created; append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RefillEntry {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business date of the delivery (from the form's date picker).
    #[ts(as = "String")]
    pub date: NaiveDate,

    /// Units delivered per product key. Zero/absent keys are omitted.
    pub quantities: BTreeMap<ProductKey, i64>,

    /// When the entry was recorded. Ledger replay order is carried by
    /// this timestamp, not by the business date.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl RefillEntry {
    /// Creates a refill entry dated and timestamped now.
    pub fn new(date: NaiveDate, quantities: BTreeMap<ProductKey, i64>) -> Self {
        RefillEntry {
            id: Uuid::new_v4().to_string(),
            date,
            quantities,
            created_at: Utc::now(),
        }
    }

    /// Creates a single-line refill dated today. Test and doc convenience.
    pub fn with_line(key: impl Into<ProductKey>, quantity: i64) -> Self {
        let mut quantities = BTreeMap::new();
        quantities.insert(key.into(), quantity);
        RefillEntry::new(Utc::now().date_naive(), quantities)
    }

    /// Total units across all lines.
    pub fn total_units(&self) -> i64 {
        self.quantities.values().sum()
    }
}

// =============================================================================
// Sales Entry
// =============================================================================

/// Units sold from a mart's stock, with the money owed for them.
///
/// ## Mutability Contract
/// `quantities`, `total_amount`, and `date` are frozen at creation.
/// Only `status` and `amount_received` change afterwards (payment
/// follow-up). The total is NEVER recomputed from current prices - an
/// invoice reflects the price in effect at sale time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesEntry {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business date of the sale.
    #[ts(as = "String")]
    pub date: NaiveDate,

    /// Units sold per product key. Zero/absent keys are omitted.
    pub quantities: BTreeMap<ProductKey, i64>,

    /// Total owed, computed from resolved prices × quantities at creation.
    pub total_amount: Money,

    /// Payment state. Mutable via reconciliation.
    pub status: PaymentStatus,

    /// Amount received so far. Mutable via reconciliation. Operator
    /// supplied - NOT derived from `status`.
    pub amount_received: Money,

    /// When the entry was recorded.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SalesEntry {
    /// Creates a sales entry dated and timestamped now, starting Pending
    /// with nothing received.
    pub fn new(
        date: NaiveDate,
        quantities: BTreeMap<ProductKey, i64>,
        total_amount: Money,
    ) -> Self {
        SalesEntry {
            id: Uuid::new_v4().to_string(),
            date,
            quantities,
            total_amount,
            status: PaymentStatus::Pending,
            amount_received: Money::zero(),
            created_at: Utc::now(),
        }
    }

    /// Total units across all lines.
    pub fn total_units(&self) -> i64 {
        self.quantities.values().sum()
    }

    /// Balance still owed, floored at zero.
    ///
    /// Overpayment (received > total) is legal - the engine does not
    /// enforce `amount_received <= total_amount` - so the floor keeps
    /// outstanding-balance reports from going negative.
    pub fn outstanding(&self) -> Money {
        self.total_amount.saturating_sub(self.amount_received)
    }

    /// Whether the received amount covers the total.
    ///
    /// ## Note
    /// Judged from the amounts, not from `status` - an operator may mark
    /// a sale Paid while the recorded amounts still show a balance.
    pub fn is_settled(&self) -> bool {
        self.amount_received >= self.total_amount
    }
}

// =============================================================================
// Mart
// =============================================================================

/// A retail partner that stocks and resells product units.
///
/// ## Record Shape
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                        Mart record                                      │
/// │                                                                         │
/// │  identity: id, name, mobile, sector, address, onboarding_date          │
/// │  commission: optional rate for settlement reports                      │
/// │                                                                         │
/// │  stock:           { "gir500": 10, "gir1000": 3 }   ← derived snapshot  │
/// │  price_overrides: { "gir500": Rs 850 }             ← beats catalog     │
/// │                                                                         │
/// │  refills: [ RefillEntry, ... ]   ← append-only                        │
/// │  sales:   [ SalesEntry,  ... ]   ← append-only (status/received       │
/// │                                     fields reconcilable)               │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
///
/// ## Invariants
/// - `stock[k] >= 0` for every key, always
/// - `stock` equals the ledger replay ([`crate::ledger::rebuild_stock`])
/// - refills/sales only ever grow; entries are never reordered
///
/// The whole record is read, transformed, and written back as one unit;
/// there are no partial updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Mart {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Mart/shop name.
    pub name: String,

    /// Contact mobile number. Also how orders are correlated to marts
    /// (no foreign keys between collections).
    pub mobile: String,

    /// City sector/area, e.g. "F-7".
    pub sector: String,

    /// Street address.
    pub address: String,

    /// When the partnership started.
    #[ts(as = "String")]
    pub onboarding_date: NaiveDate,

    /// Optional commission rate for settlement reports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission: Option<CommissionRate>,

    /// Current on-hand units per product key. Absent key ≡ 0.
    pub stock: BTreeMap<ProductKey, i64>,

    /// Mart-specific unit prices. Absent key falls back to the catalog
    /// default.
    pub price_overrides: BTreeMap<ProductKey, Money>,

    /// Delivery ledger. Append-only.
    pub refills: Vec<RefillEntry>,

    /// Sales ledger. Append-only; entries' payment fields reconcilable.
    pub sales: Vec<SalesEntry>,

    /// When the record was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the record was last written.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Mart {
    /// Creates a mart with empty stock and ledgers, onboarded today.
    pub fn new(
        name: impl Into<String>,
        mobile: impl Into<String>,
        sector: impl Into<String>,
        address: impl Into<String>,
        commission: Option<CommissionRate>,
    ) -> Self {
        let now = Utc::now();
        Mart {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            mobile: mobile.into(),
            sector: sector.into(),
            address: address.into(),
            onboarding_date: now.date_naive(),
            commission,
            stock: BTreeMap::new(),
            price_overrides: BTreeMap::new(),
            refills: Vec::new(),
            sales: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// On-hand units for a product key. Absent key reads as 0.
    pub fn stock_of(&self, key: &str) -> i64 {
        self.stock.get(key).copied().unwrap_or(0)
    }

    /// Finds a sales entry by id.
    pub fn find_sale(&self, sale_id: &str) -> Option<&SalesEntry> {
        self.sales.iter().find(|s| s.id == sale_id)
    }

    /// Total units ever delivered for a product key.
    pub fn total_units_refilled(&self, key: &str) -> i64 {
        self.refills
            .iter()
            .filter_map(|r| r.quantities.get(key))
            .sum()
    }

    /// Total units ever sold for a product key.
    pub fn total_units_sold(&self, key: &str) -> i64 {
        self.sales
            .iter()
            .filter_map(|s| s.quantities.get(key))
            .sum()
    }

    /// Lifetime sales value (sum of recorded totals, at sale-time prices).
    pub fn total_sales_amount(&self) -> Money {
        self.sales
            .iter()
            .fold(Money::zero(), |acc, s| acc + s.total_amount)
    }

    /// Lifetime payments received.
    pub fn total_amount_received(&self) -> Money {
        self.sales
            .iter()
            .fold(Money::zero(), |acc, s| acc + s.amount_received)
    }

    /// Outstanding balance across all sales (per-sale floors applied).
    pub fn total_outstanding(&self) -> Money {
        self.sales
            .iter()
            .fold(Money::zero(), |acc, s| acc + s.outstanding())
    }

    /// Commission payable on lifetime sales, when a rate is set.
    pub fn commission_due(&self) -> Option<Money> {
        self.commission
            .map(|rate| self.total_sales_amount().commission(rate))
    }

    /// Sales awaiting payment follow-up (anything not marked Paid).
    pub fn pending_sales(&self) -> impl Iterator<Item = &SalesEntry> {
        self.sales
            .iter()
            .filter(|s| s.status != PaymentStatus::Paid)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn mart_with_sales() -> Mart {
        let mut mart = Mart::new(
            "Bismillah Mart",
            "03001234567",
            "F-7",
            "Shop 12",
            Some(CommissionRate::from_percentage(5.0)),
        );

        mart.refills.push(RefillEntry::with_line("gir500", 12));
        mart.stock.insert("gir500".to_string(), 2);

        let mut q = BTreeMap::new();
        q.insert("gir500".to_string(), 5);
        let mut settled = SalesEntry::new(Utc::now().date_naive(), q.clone(), Money::from_rupees(4_500));
        settled.status = PaymentStatus::Paid;
        settled.amount_received = Money::from_rupees(4_500);

        let open = SalesEntry::new(Utc::now().date_naive(), q, Money::from_rupees(4_500));

        mart.sales.push(settled);
        mart.sales.push(open);
        mart
    }

    #[test]
    fn test_commission_rate_from_bps() {
        let rate = CommissionRate::from_bps(500);
        assert_eq!(rate.bps(), 500);
        assert!((rate.percentage() - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_commission_rate_from_percentage() {
        let rate = CommissionRate::from_percentage(5.0);
        assert_eq!(rate.bps(), 500);
    }

    #[test]
    fn test_payment_status_default() {
        assert_eq!(PaymentStatus::default(), PaymentStatus::Pending);
    }

    #[test]
    fn test_payment_status_wire_strings() {
        // The dashboard stores these exact strings; they must not drift.
        assert_eq!(
            serde_json::to_string(&PaymentStatus::PartialPaid).unwrap(),
            "\"PartialPaid\""
        );
        assert_eq!(serde_json::to_string(&PaymentStatus::Paid).unwrap(), "\"Paid\"");
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Pending).unwrap(),
            "\"Pending\""
        );
    }

    #[test]
    fn test_new_mart_is_empty() {
        let mart = Mart::new("Al-Madina Store", "03331234567", "G-9", "Main Rd", None);
        assert!(mart.stock.is_empty());
        assert!(mart.refills.is_empty());
        assert!(mart.sales.is_empty());
        assert_eq!(mart.stock_of("gir500"), 0);
    }

    #[test]
    fn test_sales_entry_outstanding() {
        let mut q = BTreeMap::new();
        q.insert("gir500".to_string(), 15);
        let mut sale = SalesEntry::new(Utc::now().date_naive(), q, Money::from_rupees(13_500));

        assert_eq!(sale.outstanding(), Money::from_rupees(13_500));
        assert!(!sale.is_settled());

        sale.amount_received = Money::from_rupees(5_000);
        assert_eq!(sale.outstanding(), Money::from_rupees(8_500));

        // Overpayment floors at zero rather than going negative
        sale.amount_received = Money::from_rupees(14_000);
        assert!(sale.outstanding().is_zero());
        assert!(sale.is_settled());
    }

    #[test]
    fn test_mart_totals() {
        let mart = mart_with_sales();
        assert_eq!(mart.total_sales_amount(), Money::from_rupees(9_000));
        assert_eq!(mart.total_amount_received(), Money::from_rupees(4_500));
        assert_eq!(mart.total_outstanding(), Money::from_rupees(4_500));
        assert_eq!(mart.total_units_refilled("gir500"), 12);
        assert_eq!(mart.total_units_sold("gir500"), 10);
        assert_eq!(mart.pending_sales().count(), 1);
        // 5% of Rs 9,000 lifetime sales
        assert_eq!(mart.commission_due(), Some(Money::from_rupees(450)));
    }

    #[test]
    fn test_mart_document_round_trip() {
        // The record store persists marts as JSON documents; the contract
        // uses camelCase keys.
        let mart = mart_with_sales();
        let doc = serde_json::to_string(&mart).unwrap();
        assert!(doc.contains("\"priceOverrides\""));
        assert!(doc.contains("\"onboardingDate\""));

        let back: Mart = serde_json::from_str(&doc).unwrap();
        assert_eq!(back, mart);
    }
}
