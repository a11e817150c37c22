//! # khata-core: Pure Ledger Engine for Khata
//!
//! This crate is the **heart** of Khata. It contains the mart inventory
//! ledger and stock-reconciliation logic as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Khata Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Dashboard Frontend (out of scope)              │   │
//! │  │    Mart Table ──► Refill Form ──► Sale Form ──► Payment UI     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    khata-service                                │   │
//! │  │    onboard_mart, record_refill, record_sale, payment update    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ khata-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  ledger   │  │ validation│  │   │
//! │  │   │   Mart    │  │   Money   │  │  refills  │  │   rules   │  │   │
//! │  │   │  Entries  │  │Commission │  │   sales   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    khata-db (Record Store)                      │   │
//! │  │          whole-document mart persistence, catalog table         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Mart, RefillEntry, SalesEntry, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`catalog`] - Injected read-only product catalog lookup
//! - [`ledger`] - The transaction engine (refills, sales, reconciliation)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every ledger operation is deterministic - same
//!    input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in paisa (i64) to avoid
//!    float errors
//! 4. **Atomic values**: a stock change and its ledger entry are produced
//!    together as one new [`types::Mart`] - there is no state where one
//!    exists without the other
//!
//! ## Example Usage
//!
//! ```rust
//! use khata_core::ledger;
//! use khata_core::types::{Mart, RefillEntry};
//!
//! let mart = Mart::new("Bismillah Mart", "03001234567", "F-7", "Shop 12", None);
//! let refill = RefillEntry::with_line("gir500", 10);
//!
//! let mart = ledger::apply_refill(&mart, refill).unwrap();
//! assert_eq!(mart.stock_of("gir500"), 10);
//! assert_eq!(mart.refills.len(), 1);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod error;
pub mod ledger;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use khata_core::Money` instead of
// `use khata_core::money::Money`

pub use catalog::{ProductCatalog, StaticCatalog};
pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::{OversellPolicy, SaleTotal};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum units allowed on a single refill or sale line
///
/// ## Business Reason
/// Prevents accidental over-entry (e.g., typing 10000 instead of 10).
/// A mart never moves more than this many units of one product at once.
pub const MAX_LINE_QUANTITY: i64 = 9_999;

/// Maximum distinct product lines allowed in a single transaction
///
/// ## Business Reason
/// The catalog is small (a handful of SKUs); a transaction touching more
/// lines than this is a data-entry mistake, not a real delivery.
pub const MAX_TRANSACTION_LINES: usize = 50;
