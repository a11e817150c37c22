//! # Mart Aggregate Operations
//!
//! The orchestration layer for mart records: onboarding, refills, sales,
//! payment follow-up, deletion.
//!
//! ## Operation Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Mart Aggregate Operations                            │
//! │                                                                         │
//! │  Frontend Action        Service Method           Engine + Gateway      │
//! │  ───────────────        ──────────────           ────────────────      │
//! │                                                                         │
//! │  Onboarding Form ─────► onboard_mart() ────────► Mart::new + insert    │
//! │                                                                         │
//! │  Refill Form ─────────► record_refill() ───────► apply_refill + update │
//! │                                                                         │
//! │  Sale Form ───────────► record_sale() ─────────► resolve prices,       │
//! │                                                  compute total,         │
//! │                                                  apply_sale + update    │
//! │                                                                         │
//! │  Payment Dialog ──────► update_sale_payment() ─► apply_payment_update  │
//! │                                                  + update               │
//! │                                                                         │
//! │  Delete Button ───────► delete_mart() ─────────► delete (ledgers       │
//! │                                                  cascade with the doc)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Orders live in an independent collection correlated to marts only by
//! mobile number; deleting a mart therefore needs no cross-collection
//! cleanup.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use khata_core::{
    ledger, validation, CommissionRate, Mart, Money, OversellPolicy, PaymentStatus, ProductKey,
    RefillEntry, SalesEntry, MAX_TRANSACTION_LINES,
};
use khata_db::Database;

use crate::error::ServiceError;

// =============================================================================
// Request / Response DTOs
// =============================================================================

/// Onboarding form fields for a new mart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMart {
    pub name: String,
    pub mobile: String,
    pub sector: String,
    pub address: String,
    /// Defaults to today when the form leaves it blank.
    pub onboarding_date: Option<NaiveDate>,
    /// Commission percentage (0-100), as captured by the form.
    pub commission_percent: Option<f64>,
}

/// Partial profile edit. Present fields are applied; absent fields keep
/// their stored values. Stock and ledgers are never touched here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MartProfileUpdate {
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub sector: Option<String>,
    pub address: Option<String>,
    /// Commission percentage (0-100).
    pub commission_percent: Option<f64>,
    /// Replaces the whole override map when present (the edit form always
    /// submits the complete set).
    pub price_overrides: Option<BTreeMap<ProductKey, Money>>,
}

/// A refill form submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefillRequest {
    /// Defaults to today when the date picker is untouched.
    pub date: Option<NaiveDate>,
    pub quantities: BTreeMap<ProductKey, i64>,
}

/// A sale form submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRequest {
    pub date: Option<NaiveDate>,
    pub quantities: BTreeMap<ProductKey, i64>,
    /// Initial payment state; defaults to Pending with nothing received.
    pub status: Option<PaymentStatus>,
    pub amount_received: Option<Money>,
}

/// Payment follow-up on a recorded sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentUpdate {
    pub sale_id: String,
    pub status: PaymentStatus,
    /// Operator supplied - the UI may pre-fill the sale total as a
    /// convenience, but nothing here derives it from the status.
    pub amount_received: Money,
}

/// Result of recording a sale.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedSale {
    /// The persisted mart state after the sale.
    pub mart: Mart,
    /// Id of the new sales entry.
    pub sale_id: String,
    /// The frozen total, for immediate display.
    pub total_amount: Money,
    /// Product keys that had quantity but no resolvable price. Their
    /// lines were excluded from the total; the caller should surface a
    /// warning.
    pub unresolved: Vec<ProductKey>,
}

// =============================================================================
// Mart Service
// =============================================================================

/// Aggregate operations over mart records.
///
/// ## Usage
/// ```rust,ignore
/// let service = MartService::new(db);
///
/// let mart = service.onboard_mart(new_mart).await?;
/// let mart = service.record_refill(&mart.id, refill).await?;
/// ```
#[derive(Debug, Clone)]
pub struct MartService {
    db: Database,
    oversell: OversellPolicy,
}

impl MartService {
    /// Creates a service with the default (floor-at-zero) oversell policy.
    pub fn new(db: Database) -> Self {
        MartService {
            db,
            oversell: OversellPolicy::default(),
        }
    }

    /// Switches the oversell policy. `Reject` makes oversold sales fail
    /// with `INSUFFICIENT_STOCK` instead of flooring the snapshot.
    pub fn with_oversell_policy(mut self, policy: OversellPolicy) -> Self {
        self.oversell = policy;
        self
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Lists all marts.
    pub async fn list_marts(&self) -> Result<Vec<Mart>, ServiceError> {
        Ok(self.db.marts().list().await?)
    }

    /// Gets a mart by id.
    pub async fn get_mart(&self, mart_id: &str) -> Result<Mart, ServiceError> {
        self.load(mart_id).await
    }

    // -------------------------------------------------------------------------
    // Onboarding / profile
    // -------------------------------------------------------------------------

    /// Creates a mart with empty stock and ledgers.
    pub async fn onboard_mart(&self, req: NewMart) -> Result<Mart, ServiceError> {
        debug!(name = %req.name, "onboard_mart");

        validation::validate_mart_name(&req.name).map_err(khata_core::CoreError::from)?;
        validation::validate_mobile(&req.mobile).map_err(khata_core::CoreError::from)?;

        let commission = req
            .commission_percent
            .map(|pct| {
                let rate = CommissionRate::from_percentage(pct);
                validation::validate_commission_bps(rate.bps())
                    .map_err(khata_core::CoreError::from)?;
                Ok::<_, ServiceError>(rate)
            })
            .transpose()?;

        let mut mart = Mart::new(req.name, req.mobile, req.sector, req.address, commission);
        if let Some(date) = req.onboarding_date {
            mart.onboarding_date = date;
        }

        self.db.marts().insert(&mart).await?;

        info!(mart_id = %mart.id, name = %mart.name, "Mart onboarded");
        Ok(mart)
    }

    /// Edits identity fields, commission, and price overrides. Stock and
    /// ledgers pass through untouched.
    pub async fn update_mart_profile(
        &self,
        mart_id: &str,
        update: MartProfileUpdate,
    ) -> Result<Mart, ServiceError> {
        debug!(mart_id = %mart_id, "update_mart_profile");

        let mut mart = self.load(mart_id).await?;

        if let Some(name) = update.name {
            validation::validate_mart_name(&name).map_err(khata_core::CoreError::from)?;
            mart.name = name;
        }
        if let Some(mobile) = update.mobile {
            validation::validate_mobile(&mobile).map_err(khata_core::CoreError::from)?;
            mart.mobile = mobile;
        }
        if let Some(sector) = update.sector {
            mart.sector = sector;
        }
        if let Some(address) = update.address {
            mart.address = address;
        }
        if let Some(pct) = update.commission_percent {
            let rate = CommissionRate::from_percentage(pct);
            validation::validate_commission_bps(rate.bps())
                .map_err(khata_core::CoreError::from)?;
            mart.commission = Some(rate);
        }
        if let Some(overrides) = update.price_overrides {
            for (key, price) in &overrides {
                validation::validate_product_key(key).map_err(khata_core::CoreError::from)?;
                validation::validate_price_paisa(price.paisa())
                    .map_err(khata_core::CoreError::from)?;
            }
            mart.price_overrides = overrides;
        }

        mart.updated_at = Utc::now();
        self.db.marts().update(&mart).await?;

        info!(mart_id = %mart_id, "Mart profile updated");
        Ok(mart)
    }

    // -------------------------------------------------------------------------
    // Ledger operations
    // -------------------------------------------------------------------------

    /// Records a stock delivery: load → apply_refill → wholesale update.
    pub async fn record_refill(
        &self,
        mart_id: &str,
        req: RefillRequest,
    ) -> Result<Mart, ServiceError> {
        debug!(mart_id = %mart_id, lines = req.quantities.len(), "record_refill");

        let quantities = clean_lines(req.quantities)?;
        let mart = self.load(mart_id).await?;

        let refill = RefillEntry::new(req.date.unwrap_or_else(today), quantities);
        let refill_id = refill.id.clone();

        let mut next = ledger::apply_refill(&mart, refill)?;
        next.updated_at = Utc::now();
        self.db.marts().update(&next).await?;

        info!(
            mart_id = %mart_id,
            refill_id = %refill_id,
            units = next.refills.last().map(|r| r.total_units()).unwrap_or(0),
            "Refill recorded"
        );
        Ok(next)
    }

    /// Records a sale: load mart + catalog → resolve prices → freeze the
    /// total → apply_sale → wholesale update.
    ///
    /// Lines without a resolvable price are excluded from the total and
    /// returned in [`RecordedSale::unresolved`] - a warning, not an abort.
    pub async fn record_sale(
        &self,
        mart_id: &str,
        req: SaleRequest,
    ) -> Result<RecordedSale, ServiceError> {
        debug!(mart_id = %mart_id, lines = req.quantities.len(), "record_sale");

        let quantities = clean_lines(req.quantities)?;
        let mart = self.load(mart_id).await?;
        let catalog = self.db.products().load_catalog().await?;

        let total = ledger::compute_sale_total(&quantities, |key| {
            ledger::resolve_unit_price(&mart, &catalog, key)
        });
        if !total.unresolved.is_empty() {
            warn!(
                mart_id = %mart_id,
                keys = ?total.unresolved,
                "Sale lines skipped: no resolvable price"
            );
        }

        let mut sale = SalesEntry::new(req.date.unwrap_or_else(today), quantities, total.amount);
        if let Some(status) = req.status {
            sale.status = status;
        }
        if let Some(received) = req.amount_received {
            validation::validate_received_paisa(received.paisa())
                .map_err(khata_core::CoreError::from)?;
            sale.amount_received = received;
        }
        let sale_id = sale.id.clone();

        let mut next = ledger::apply_sale(&mart, sale, self.oversell)?;
        next.updated_at = Utc::now();
        self.db.marts().update(&next).await?;

        info!(
            mart_id = %mart_id,
            sale_id = %sale_id,
            total = %total.amount,
            "Sale recorded"
        );
        Ok(RecordedSale {
            mart: next,
            sale_id,
            total_amount: total.amount,
            unresolved: total.unresolved,
        })
    }

    /// Payment follow-up: the entry keeps its ledger position, only its
    /// payment fields change. Stock is untouched by construction.
    pub async fn update_sale_payment(
        &self,
        mart_id: &str,
        req: PaymentUpdate,
    ) -> Result<Mart, ServiceError> {
        debug!(mart_id = %mart_id, sale_id = %req.sale_id, "update_sale_payment");

        let mart = self.load(mart_id).await?;

        let mut next =
            ledger::apply_payment_update(&mart, &req.sale_id, req.status, req.amount_received)?;
        next.updated_at = Utc::now();
        self.db.marts().update(&next).await?;

        info!(
            mart_id = %mart_id,
            sale_id = %req.sale_id,
            status = ?req.status,
            received = %req.amount_received,
            "Sale payment updated"
        );
        Ok(next)
    }

    /// Deletes a mart as a whole unit. The embedded ledgers cascade with
    /// the document.
    pub async fn delete_mart(&self, mart_id: &str) -> Result<(), ServiceError> {
        debug!(mart_id = %mart_id, "delete_mart");

        self.db.marts().delete(mart_id).await?;

        info!(mart_id = %mart_id, "Mart deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Loads a mart or fails with NOT_FOUND.
    async fn load(&self, mart_id: &str) -> Result<Mart, ServiceError> {
        self.db
            .marts()
            .get_by_id(mart_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Mart", mart_id))
    }
}

/// Today's business date.
fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Drops zero lines (empty form boxes), validates the rest, and rejects
/// an effectively empty transaction.
fn clean_lines(
    quantities: BTreeMap<ProductKey, i64>,
) -> Result<BTreeMap<ProductKey, i64>, ServiceError> {
    let mut cleaned = BTreeMap::new();
    for (key, qty) in quantities {
        if qty == 0 {
            continue;
        }
        validation::validate_product_key(&key).map_err(khata_core::CoreError::from)?;
        validation::validate_quantity(qty).map_err(khata_core::CoreError::from)?;
        cleaned.insert(key, qty);
    }

    if cleaned.is_empty() {
        return Err(ServiceError::validation(
            "transaction needs at least one non-zero line",
        ));
    }
    if cleaned.len() > MAX_TRANSACTION_LINES {
        return Err(ServiceError::validation(format!(
            "transaction cannot have more than {MAX_TRANSACTION_LINES} lines"
        )));
    }

    Ok(cleaned)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use khata_core::Product;
    use khata_db::DbConfig;

    /// In-memory database with the two-product test catalog.
    async fn service() -> MartService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (key, rupees) in [("gir500", 900), ("gir1000", 1_700)] {
            db.products()
                .insert(&Product {
                    key: key.to_string(),
                    name: "Gir Cow Ghee".to_string(),
                    size_label: if key == "gir500" { "500ml" } else { "1L" }.to_string(),
                    default_unit_price: Money::from_rupees(rupees),
                })
                .await
                .unwrap();
        }
        MartService::new(db)
    }

    fn new_mart() -> NewMart {
        NewMart {
            name: "Bismillah Mart".to_string(),
            mobile: "03001234567".to_string(),
            sector: "F-7".to_string(),
            address: "Shop 12, Jinnah Market".to_string(),
            onboarding_date: None,
            commission_percent: Some(5.0),
        }
    }

    fn lines(pairs: &[(&str, i64)]) -> BTreeMap<ProductKey, i64> {
        pairs.iter().map(|(k, q)| (k.to_string(), *q)).collect()
    }

    #[tokio::test]
    async fn test_onboard_creates_empty_mart() {
        let service = service().await;
        let mart = service.onboard_mart(new_mart()).await.unwrap();

        assert!(mart.stock.is_empty());
        assert!(mart.refills.is_empty());
        assert!(mart.sales.is_empty());
        assert_eq!(mart.commission, Some(CommissionRate::from_bps(500)));

        let listed = service.list_marts().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mart.id);
    }

    #[tokio::test]
    async fn test_onboard_rejects_bad_mobile() {
        let service = service().await;
        let mut req = new_mart();
        req.mobile = "12345".to_string();

        let err = service.onboard_mart(req).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_refill_then_oversold_sale() {
        // Refill into empty stock, then an oversold sale, end to end
        // through the store.
        let service = service().await;
        let mart = service.onboard_mart(new_mart()).await.unwrap();

        let mart = service
            .record_refill(
                &mart.id,
                RefillRequest {
                    date: None,
                    quantities: lines(&[("gir500", 10)]),
                },
            )
            .await
            .unwrap();
        assert_eq!(mart.stock_of("gir500"), 10);
        assert_eq!(mart.refills.len(), 1);

        let recorded = service
            .record_sale(
                &mart.id,
                SaleRequest {
                    date: None,
                    quantities: lines(&[("gir500", 15)]),
                    status: None,
                    amount_received: None,
                },
            )
            .await
            .unwrap();

        // floored at zero, total frozen at 15 × Rs 900
        assert_eq!(recorded.mart.stock_of("gir500"), 0);
        assert_eq!(recorded.total_amount, Money::from_rupees(13_500));
        assert_eq!(recorded.mart.sales.len(), 1);
        assert_eq!(recorded.mart.sales[0].status, PaymentStatus::Pending);
        assert!(recorded.unresolved.is_empty());

        // persisted state matches the returned state
        let reloaded = service.get_mart(&mart.id).await.unwrap();
        assert_eq!(reloaded, recorded.mart);
    }

    #[tokio::test]
    async fn test_price_override_beats_catalog() {
        // Override 850 vs catalog 900: the override must win.
        let service = service().await;
        let mart = service.onboard_mart(new_mart()).await.unwrap();

        let mut overrides = BTreeMap::new();
        overrides.insert("gir500".to_string(), Money::from_rupees(850));
        service
            .update_mart_profile(
                &mart.id,
                MartProfileUpdate {
                    price_overrides: Some(overrides),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let recorded = service
            .record_sale(
                &mart.id,
                SaleRequest {
                    date: None,
                    quantities: lines(&[("gir500", 15)]),
                    status: None,
                    amount_received: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(recorded.total_amount, Money::from_rupees(12_750));
    }

    #[tokio::test]
    async fn test_unpriceable_line_is_warning_not_abort() {
        let service = service().await;
        let mart = service.onboard_mart(new_mart()).await.unwrap();

        let recorded = service
            .record_sale(
                &mart.id,
                SaleRequest {
                    date: None,
                    quantities: lines(&[("gir500", 15), ("almond250", 3)]),
                    status: None,
                    amount_received: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(recorded.total_amount, Money::from_rupees(13_500));
        assert_eq!(recorded.unresolved, vec!["almond250".to_string()]);
        // the unpriceable line still moved (zero) stock and is on the ledger
        assert_eq!(recorded.mart.sales[0].quantities.len(), 2);
    }

    #[tokio::test]
    async fn test_payment_update() {
        // Follow-up takes (Pending, 0) to (Paid, 13,500).
        let service = service().await;
        let mart = service.onboard_mart(new_mart()).await.unwrap();
        service
            .record_refill(
                &mart.id,
                RefillRequest {
                    date: None,
                    quantities: lines(&[("gir500", 20)]),
                },
            )
            .await
            .unwrap();
        let recorded = service
            .record_sale(
                &mart.id,
                SaleRequest {
                    date: None,
                    quantities: lines(&[("gir500", 15)]),
                    status: None,
                    amount_received: None,
                },
            )
            .await
            .unwrap();
        let stock_before = recorded.mart.stock.clone();

        let updated = service
            .update_sale_payment(
                &mart.id,
                PaymentUpdate {
                    sale_id: recorded.sale_id.clone(),
                    status: PaymentStatus::Paid,
                    amount_received: Money::from_rupees(13_500),
                },
            )
            .await
            .unwrap();

        let sale = updated.find_sale(&recorded.sale_id).unwrap();
        assert_eq!(sale.status, PaymentStatus::Paid);
        assert_eq!(sale.amount_received, Money::from_rupees(13_500));
        assert_eq!(sale.total_amount, Money::from_rupees(13_500));
        assert_eq!(sale.quantities, lines(&[("gir500", 15)]));
        // payment reconciliation never touches stock
        assert_eq!(updated.stock, stock_before);
    }

    #[tokio::test]
    async fn test_payment_update_unknown_sale() {
        let service = service().await;
        let mart = service.onboard_mart(new_mart()).await.unwrap();

        let err = service
            .update_sale_payment(
                &mart.id,
                PaymentUpdate {
                    sale_id: "no-such-sale".to_string(),
                    status: PaymentStatus::Paid,
                    amount_received: Money::zero(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_reject_policy_leaves_store_unchanged() {
        let service = service().await.with_oversell_policy(OversellPolicy::Reject);
        let mart = service.onboard_mart(new_mart()).await.unwrap();
        service
            .record_refill(
                &mart.id,
                RefillRequest {
                    date: None,
                    quantities: lines(&[("gir500", 10)]),
                },
            )
            .await
            .unwrap();

        let err = service
            .record_sale(
                &mart.id,
                SaleRequest {
                    date: None,
                    quantities: lines(&[("gir500", 15)]),
                    status: None,
                    amount_received: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        // the failed sale never reached the store
        let reloaded = service.get_mart(&mart.id).await.unwrap();
        assert_eq!(reloaded.stock_of("gir500"), 10);
        assert!(reloaded.sales.is_empty());
    }

    #[tokio::test]
    async fn test_refill_rejects_empty_transaction() {
        let service = service().await;
        let mart = service.onboard_mart(new_mart()).await.unwrap();

        let err = service
            .record_refill(
                &mart.id,
                RefillRequest {
                    date: None,
                    quantities: lines(&[("gir500", 0)]),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_refill_unknown_mart() {
        let service = service().await;
        let err = service
            .record_refill(
                "no-such-mart",
                RefillRequest {
                    date: None,
                    quantities: lines(&[("gir500", 5)]),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let service = service().await;
        let mart = service.onboard_mart(new_mart()).await.unwrap();
        service
            .record_refill(
                &mart.id,
                RefillRequest {
                    date: None,
                    quantities: lines(&[("gir500", 10)]),
                },
            )
            .await
            .unwrap();

        service.delete_mart(&mart.id).await.unwrap();

        let err = service.get_mart(&mart.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
