//! # Product Catalog Lookup
//!
//! Read-only catalog access for the ledger engine.
//!
//! ## Why a Trait?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Catalog Injection                                    │
//! │                                                                         │
//! │  A module-level constant product array would be a hidden global the   │
//! │  engine reaches into. Here the catalog is an explicit parameter:       │
//! │                                                                         │
//! │                                                                         │
//! │  resolve_unit_price(&mart, &catalog, "gir500")                         │
//! │                              │                                          │
//! │                              ├── production: StaticCatalog loaded      │
//! │                              │   from the products table               │
//! │                              │                                          │
//! │                              └── tests: StaticCatalog built inline     │
//! │                                  with synthetic products               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine only ever reads: there is no mutation path through this
//! trait, matching the catalog's externally-owned lifecycle.

use crate::types::Product;

/// Read-only product lookup by key.
pub trait ProductCatalog {
    /// Resolves a product by its stable key, `None` when unknown.
    fn resolve(&self, key: &str) -> Option<&Product>;
}

/// A catalog backed by an in-memory product list.
///
/// ## Usage
/// ```rust
/// use khata_core::catalog::{ProductCatalog, StaticCatalog};
/// use khata_core::types::Product;
/// use khata_core::money::Money;
///
/// let catalog = StaticCatalog::new(vec![Product {
///     key: "gir500".to_string(),
///     name: "Gir Ghee".to_string(),
///     size_label: "500ml".to_string(),
///     default_unit_price: Money::from_rupees(900),
/// }]);
///
/// assert!(catalog.resolve("gir500").is_some());
/// assert!(catalog.resolve("nope").is_none());
/// ```
///
/// The catalog is a handful of SKUs; a linear scan beats a map here and
/// keeps insertion order for listings.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    products: Vec<Product>,
}

impl StaticCatalog {
    /// Creates a catalog from a product list.
    pub fn new(products: Vec<Product>) -> Self {
        StaticCatalog { products }
    }

    /// All products, in load order.
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Number of products.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl ProductCatalog for StaticCatalog {
    fn resolve(&self, key: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.key == key)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
