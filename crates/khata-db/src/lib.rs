//! # khata-db: Persistence Gateway for Khata
//!
//! This crate provides record-store access for the Khata system.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Khata Data Flow                                  │
//! │                                                                         │
//! │  Service call (record_refill)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     khata-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │   (mart.rs)   │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ MartRepo      │    │ 001_init.sql │  │   │
//! │  │   │ Connection    │    │ ProductRepo   │    │              │  │   │
//! │  │   │ Management    │    │               │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   marts: one JSON document per row, overwritten wholesale       │   │
//! │  │   products: read-only catalog table                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Storage Contract
//!
//! A Mart is one opaque JSON document. Every mutation reads the full
//! record, derives a full new record in khata-core, and overwrites it
//! here in a single UPDATE - **last write wins**. Two concurrent editors
//! of the same mart race; the later write silently discards the earlier
//! one's change. There is no version column and no compare-and-swap.
//! This matches the single-editor-session model the system is built for.
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (mart, product)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use khata_db::{Database, DbConfig};
//!
//! // Create database with default config
//! let config = DbConfig::new("path/to/khata.db");
//! let db = Database::new(config).await?;
//!
//! // Use repositories
//! let marts = db.marts().list().await?;
//! let catalog = db.products().load_catalog().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::mart::MartRepository;
pub use repository::product::ProductRepository;
