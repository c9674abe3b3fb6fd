//! Sell / undo orchestration over the lot and sale document stores.
//!
//! ```text
//! sell:  authorize → load lot → validate + decrement → save lot (versioned)
//!          → next sale ref → insert sale → audit (best-effort)
//! undo:  authorize → load sale → check lot → claim sale (versioned cancel)
//!          → restore lot (versioned) → audit (best-effort)
//! ```
//!
//! There is no multi-document transaction. Each document write is a
//! compare-and-swap on the stored version, and a lot write that loses the race
//! is re-read, re-validated and re-applied (bounded by
//! [`LedgerConfig::max_conflict_retries`]). When a later step fails after the
//! lot was already written, the lot write is compensated before the error is
//! returned.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use gemledger_auth::{Actor, AuthzError, Role, require_role};
use gemledger_core::{AggregateId, AggregateRoot, DomainError, ExpectedVersion, TenantId};
use gemledger_events::{AuditAction, AuditEntityType, AuditEntry, AuditSink, Event};
use gemledger_inventory::{InventoryLot, InventoryLotId, LedgerError, Quantity, ShapeLine, ShapeName};
use gemledger_sales::{Customer, SaleError, SaleId, SaleRef, SaleTransaction, SoldShapeInput};

use crate::config::LedgerConfig;
use crate::counter::CounterStore;
use crate::document_store::{DocumentStore, StoreError, Stored};
use crate::query::{DEFAULT_PAGE_LIMIT, Page, SaleQuery, SortOrder};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("inventory lot {serial_number} is already sold")]
    AlreadySold { serial_number: String },

    #[error("sale {sale_ref} is already cancelled")]
    AlreadyCancelled { sale_ref: SaleRef },

    #[error("insufficient stock for {}: requested {requested}, available {available}", describe_shape(.shape))]
    InsufficientStock {
        shape: Option<ShapeName>,
        requested: Quantity,
        available: Quantity,
    },

    #[error("shape \"{shape}\" not found in lot")]
    ShapeNotFound { shape: ShapeName },

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("sale {sale_ref} references inventory lot {inventory_id}, which no longer exists")]
    OrphanedReference {
        sale_ref: SaleRef,
        inventory_id: InventoryLotId,
    },

    #[error("inventory lot is inconsistent with its sales: {0}")]
    InconsistentLot(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("concurrent modification: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(StoreError),
}

impl OrchestratorError {
    fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

fn describe_shape(shape: &Option<ShapeName>) -> String {
    match shape {
        Some(name) => format!("shape \"{name}\""),
        None => "lot".to_string(),
    }
}

impl From<StoreError> for OrchestratorError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => OrchestratorError::Conflict(msg),
            other => OrchestratorError::Store(other),
        }
    }
}

impl From<AuthzError> for OrchestratorError {
    fn from(value: AuthzError) -> Self {
        OrchestratorError::PermissionDenied(value.to_string())
    }
}

impl From<DomainError> for OrchestratorError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                OrchestratorError::Validation(msg)
            }
        }
    }
}

impl From<LedgerError> for OrchestratorError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::InsufficientStock {
                shape,
                requested,
                available,
            } => OrchestratorError::InsufficientStock {
                shape,
                requested,
                available,
            },
            LedgerError::ShapeNotFound { shape } => OrchestratorError::ShapeNotFound { shape },
            other => OrchestratorError::Validation(other.to_string()),
        }
    }
}

impl From<SaleError> for OrchestratorError {
    fn from(value: SaleError) -> Self {
        match value {
            SaleError::AlreadyCancelled(sale_ref) => OrchestratorError::AlreadyCancelled { sale_ref },
            SaleError::NotCancelled(sale_ref) => {
                OrchestratorError::Conflict(format!("sale {sale_ref} is not cancelled"))
            }
            other => OrchestratorError::Validation(other.to_string()),
        }
    }
}

/// A request to sell from one lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellRequest {
    pub tenant_id: TenantId,
    pub lot_id: InventoryLotId,
    pub lines: Vec<SoldShapeInput>,
    #[serde(default)]
    pub customer: Customer,
    pub occurred_at: DateTime<Utc>,
}

/// A request to cancel a sale and put its stock back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoRequest {
    pub tenant_id: TenantId,
    pub sale_id: SaleId,
    /// Falls back to [`LedgerConfig::default_cancel_reason`] when absent or blank.
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Coordinates lots, sales, sale numbering and the audit trail.
///
/// Generic over its collaborators so tests run against the in-memory stores.
#[derive(Debug)]
pub struct SaleOrchestrator<L, S, C, A> {
    lots: L,
    sales: S,
    counters: C,
    audit: A,
    config: LedgerConfig,
}

impl<L, S, C, A> SaleOrchestrator<L, S, C, A> {
    pub fn new(lots: L, sales: S, counters: C, audit: A, config: LedgerConfig) -> Self {
        Self {
            lots,
            sales,
            counters,
            audit,
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }
}

impl<L, S, C, A> SaleOrchestrator<L, S, C, A>
where
    L: DocumentStore<InventoryLot>,
    S: DocumentStore<SaleTransaction>,
    C: CounterStore,
    A: AuditSink,
{
    /// Add a new lot. Serial numbers are unique within a tenant.
    #[instrument(skip_all, fields(tenant_id = %lot.tenant_id(), lot_id = %lot.id_typed()))]
    pub fn register_lot(
        &self,
        actor: &Actor,
        lot: InventoryLot,
    ) -> Result<InventoryLot, OrchestratorError> {
        let tenant_id = lot.tenant_id();
        require_role(actor, tenant_id, &[Role::ADMIN, Role::STAFF], "register inventory")?;

        let serial = lot.serial_number().to_string();
        let existing = self
            .lots
            .count_documents(tenant_id, &|l: &InventoryLot| l.serial_number() == serial)?;
        if existing > 0 {
            return Err(OrchestratorError::Validation(format!(
                "serial number '{serial}' already exists"
            )));
        }

        let stored = self.lots.insert(lot)?;
        info!(serial_number = %serial, "inventory lot registered");
        Ok(stored.into_document())
    }

    pub fn get_lot(
        &self,
        tenant_id: TenantId,
        lot_id: InventoryLotId,
    ) -> Result<InventoryLot, OrchestratorError> {
        self.lots
            .find_one(tenant_id, &lot_id)?
            .map(Stored::into_document)
            .ok_or_else(|| OrchestratorError::not_found("inventory lot", lot_id))
    }

    /// Toggle the pending workflow flag.
    pub fn set_lot_pending(
        &self,
        actor: &Actor,
        tenant_id: TenantId,
        lot_id: InventoryLotId,
        pending: bool,
    ) -> Result<InventoryLot, OrchestratorError> {
        require_role(actor, tenant_id, &[Role::ADMIN, Role::STAFF], "update inventory")?;
        let (stored, ()) = self.update_lot(tenant_id, lot_id, |lot| {
            if lot.is_deleted() {
                return Err(OrchestratorError::not_found("inventory lot", lot_id));
            }
            lot.set_pending(pending);
            Ok(())
        })?;
        debug!(%tenant_id, %lot_id, pending, "lot pending flag updated");
        Ok(stored.into_document())
    }

    /// Soft delete. The lot stops being sellable; existing sales can still be undone.
    pub fn delete_lot(
        &self,
        actor: &Actor,
        tenant_id: TenantId,
        lot_id: InventoryLotId,
    ) -> Result<InventoryLot, OrchestratorError> {
        require_role(actor, tenant_id, &[Role::ADMIN], "delete inventory")?;
        let (stored, ()) = self.update_lot(tenant_id, lot_id, |lot| {
            lot.mark_deleted();
            Ok(())
        })?;
        info!(%tenant_id, %lot_id, "inventory lot moved to recycle bin");
        Ok(stored.into_document())
    }

    /// Sell from a lot and record the sale.
    ///
    /// Every line is validated against the lot before anything is written. The
    /// returned sale carries the generated reference and derived totals.
    #[instrument(
        skip_all,
        fields(
            tenant_id = %request.tenant_id,
            lot_id = %request.lot_id,
            sale_id = tracing::field::Empty,
            sale_ref = tracing::field::Empty,
        )
    )]
    pub fn sell(
        &self,
        actor: &Actor,
        request: SellRequest,
    ) -> Result<SaleTransaction, OrchestratorError> {
        let SellRequest {
            tenant_id,
            lot_id,
            lines,
            customer,
            occurred_at,
        } = request;

        require_role(actor, tenant_id, &[Role::ADMIN, Role::STAFF], "sell inventory")?;
        if lines.is_empty() {
            return Err(SaleError::NoLines.into());
        }
        for line in &lines {
            line.validate()?;
        }
        let shape_lines: Vec<ShapeLine> = lines.iter().map(SoldShapeInput::to_shape_line).collect();

        let (lot, _delta) = self.update_lot(tenant_id, lot_id, |lot| {
            if lot.is_deleted() {
                return Err(OrchestratorError::not_found("inventory lot", lot_id));
            }
            if lot.is_sold() {
                return Err(OrchestratorError::AlreadySold {
                    serial_number: lot.serial_number().to_string(),
                });
            }
            Ok(lot.decrement(&shape_lines)?)
        })?;
        debug!(status = ?lot.document.status(), "lot decremented");

        let recorded = self.next_sale_ref(tenant_id, occurred_at).and_then(|sale_ref| {
            let sale = SaleTransaction::record(
                SaleId::new(AggregateId::new()),
                tenant_id,
                sale_ref,
                lot_id,
                &lines,
                customer,
                occurred_at,
            )?;
            Ok(self.sales.insert(sale)?)
        });
        let sale = match recorded {
            Ok(stored) => stored.into_document(),
            Err(err) => {
                error!(error = %err, "sale could not be recorded, returning stock to lot");
                self.compensate_decrement(tenant_id, lot_id, &shape_lines);
                return Err(err);
            }
        };

        let span = tracing::Span::current();
        span.record("sale_id", tracing::field::display(sale.id_typed()));
        span.record("sale_ref", sale.sale_ref().as_str());
        info!(
            total_pieces = sale.total_pieces(),
            total_weight = %sale.total_weight(),
            total_amount = %sale.total_amount(),
            "sale recorded"
        );

        self.record_audit(AuditEntry::new(
            tenant_id,
            AuditAction::CreateSale,
            AuditEntityType::Sale,
            Some(sale.id_typed().0),
            actor.user_id,
            json!({
                "saleRef": sale.sale_ref().as_str(),
                "serialNumber": lot.document.serial_number(),
                "customer": sale.customer().display_name(),
                "totalPieces": sale.total_pieces(),
                "totalWeight": sale.total_weight(),
                "totalAmount": sale.total_amount(),
                "soldShapes": sale.sold_shapes(),
            }),
            occurred_at,
        ));

        Ok(sale)
    }

    /// Cancel a sale and return its quantities to the lot. Admin only, once per sale.
    #[instrument(
        skip_all,
        fields(
            tenant_id = %request.tenant_id,
            sale_id = %request.sale_id,
            sale_ref = tracing::field::Empty,
            lot_id = tracing::field::Empty,
        )
    )]
    pub fn undo(
        &self,
        actor: &Actor,
        request: UndoRequest,
    ) -> Result<SaleTransaction, OrchestratorError> {
        let UndoRequest {
            tenant_id,
            sale_id,
            reason,
            occurred_at,
        } = request;

        require_role(actor, tenant_id, &[Role::ADMIN], "undo sales")?;
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| self.config.default_cancel_reason.clone());

        let stored = self
            .sales
            .find_one(tenant_id, &sale_id)?
            .ok_or_else(|| OrchestratorError::not_found("sale", sale_id))?;
        let sale_ref = stored.document.sale_ref().clone();
        let lot_id = stored.document.inventory_id();
        let span = tracing::Span::current();
        span.record("sale_ref", sale_ref.as_str());
        span.record("lot_id", tracing::field::display(lot_id));

        if stored.document.is_cancelled() {
            return Err(OrchestratorError::AlreadyCancelled { sale_ref });
        }
        if self.lots.find_one(tenant_id, &lot_id)?.is_none() {
            error!("sale references a lot that no longer exists");
            return Err(OrchestratorError::OrphanedReference {
                sale_ref,
                inventory_id: lot_id,
            });
        }

        let lines = stored.document.shape_lines().map_err(|err| {
            error!(error = %err, "recorded sale has a malformed line");
            OrchestratorError::InconsistentLot(format!("sale {sale_ref} has an invalid sold line: {err}"))
        })?;

        // Claim the sale first: only the undo that wins this write restores stock.
        let mut sale = stored.document;
        sale.cancel(actor.user_id, reason.as_str(), occurred_at)?;
        let claimed = match self.sales.save(sale, ExpectedVersion::Exact(stored.version)) {
            Ok(claimed) => claimed,
            Err(StoreError::Conflict(msg)) => {
                let current = self
                    .sales
                    .find_one(tenant_id, &sale_id)?
                    .ok_or_else(|| OrchestratorError::not_found("sale", sale_id))?;
                if current.document.is_cancelled() {
                    debug!("lost the race to another undo");
                    return Err(OrchestratorError::AlreadyCancelled { sale_ref });
                }
                return Err(OrchestratorError::Conflict(msg));
            }
            Err(err) => return Err(err.into()),
        };
        debug!("sale claimed for cancellation");

        let restored = self.update_lot(tenant_id, lot_id, |lot| {
            lot.restore(&lines).map_err(|err| match err {
                LedgerError::ShapeNotFound { shape } => OrchestratorError::InconsistentLot(format!(
                    "shape \"{shape}\" sold in {sale_ref} no longer exists in lot {}",
                    lot.serial_number()
                )),
                other => OrchestratorError::InconsistentLot(other.to_string()),
            })
        });
        let (lot, delta) = match restored {
            Ok(done) => done,
            Err(err) => {
                let err = match err {
                    OrchestratorError::NotFound { .. } => OrchestratorError::OrphanedReference {
                        sale_ref: sale_ref.clone(),
                        inventory_id: lot_id,
                    },
                    other => other,
                };
                error!(error = %err, "restore failed, reverting cancellation");
                self.revoke_claim(claimed);
                return Err(err);
            }
        };

        let restored_total = delta.total();
        info!(
            restored_pieces = restored_total.pieces(),
            restored_weight = %restored_total.weight(),
            status = ?lot.document.status(),
            "sale cancelled and stock restored"
        );

        let sale = claimed.into_document();
        self.record_audit(AuditEntry::new(
            tenant_id,
            AuditAction::CancelSale,
            AuditEntityType::Sale,
            Some(sale_id.0),
            actor.user_id,
            json!({
                "saleRef": sale_ref.as_str(),
                "serialNumber": lot.document.serial_number(),
                "reason": reason,
                "totalAmount": sale.total_amount(),
                "restoredPieces": restored_total.pieces(),
                "restoredWeight": restored_total.weight(),
            }),
            occurred_at,
        ));

        Ok(sale)
    }

    pub fn get_sale(
        &self,
        tenant_id: TenantId,
        sale_id: SaleId,
    ) -> Result<SaleTransaction, OrchestratorError> {
        self.sales
            .find_one(tenant_id, &sale_id)?
            .map(Stored::into_document)
            .ok_or_else(|| OrchestratorError::not_found("sale", sale_id))
    }

    /// Page through a tenant's sales ordered by `sold_at`.
    pub fn list_sales(
        &self,
        tenant_id: TenantId,
        query: &SaleQuery,
    ) -> Result<Page<SaleTransaction>, OrchestratorError> {
        if query.page < 1 {
            return Err(OrchestratorError::Validation(
                "page must be at least 1".to_string(),
            ));
        }
        let limit = match query.limit {
            0 => DEFAULT_PAGE_LIMIT,
            n => n,
        }
        .min(self.config.max_page_size);

        let include_cancelled = query.include_cancelled;
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let mut sales: Vec<SaleTransaction> = self
            .sales
            .find(tenant_id, &|s: &SaleTransaction| {
                (include_cancelled || !s.is_cancelled())
                    && search.is_none_or(|needle| s.matches_search(needle))
            })?
            .into_iter()
            .map(Stored::into_document)
            .collect();

        sales.sort_by_key(|s| (s.sold_at(), s.sale_ref().date(), s.sale_ref().sequence()));
        if query.sort == SortOrder::Desc {
            sales.reverse();
        }

        Ok(Page::slice(sales, query.page, limit))
    }

    /// Load, mutate and save a lot, re-reading on version conflicts.
    ///
    /// `apply` runs against every fresh snapshot, so its checks always see the
    /// state that is actually written.
    fn update_lot<T>(
        &self,
        tenant_id: TenantId,
        lot_id: InventoryLotId,
        mut apply: impl FnMut(&mut InventoryLot) -> Result<T, OrchestratorError>,
    ) -> Result<(Stored<InventoryLot>, T), OrchestratorError> {
        let mut attempt: u32 = 0;
        loop {
            let stored = self
                .lots
                .find_one(tenant_id, &lot_id)?
                .ok_or_else(|| OrchestratorError::not_found("inventory lot", lot_id))?;
            let mut lot = stored.document;
            let out = apply(&mut lot)?;

            match self.lots.save(lot, ExpectedVersion::Exact(stored.version)) {
                Ok(saved) => return Ok((saved, out)),
                Err(StoreError::Conflict(msg)) if attempt < self.config.max_conflict_retries => {
                    attempt += 1;
                    debug!(%lot_id, attempt, conflict = %msg, "lot write lost a race, retrying");
                }
                Err(err) => {
                    warn!(%lot_id, attempt, error = %err, "lot write failed");
                    return Err(err.into());
                }
            }
        }
    }

    fn next_sale_ref(
        &self,
        tenant_id: TenantId,
        at: DateTime<Utc>,
    ) -> Result<SaleRef, OrchestratorError> {
        let date = self.config.business_date(at);
        let sequence = self.counters.increment(tenant_id, &SaleRef::counter_key(date))?;
        Ok(SaleRef::new(date, sequence)?)
    }

    fn compensate_decrement(&self, tenant_id: TenantId, lot_id: InventoryLotId, lines: &[ShapeLine]) {
        let result = self.update_lot(tenant_id, lot_id, |lot| Ok(lot.restore(lines)?));
        if let Err(err) = result {
            error!(
                %tenant_id,
                %lot_id,
                error = %err,
                "compensation failed: lot is still decremented for a sale that was never recorded"
            );
        }
    }

    fn revoke_claim(&self, claimed: Stored<SaleTransaction>) {
        let version = claimed.version;
        let mut sale = claimed.into_document();
        let sale_ref = sale.sale_ref().clone();
        let result = sale
            .revoke_cancellation()
            .map_err(OrchestratorError::from)
            .and_then(|()| {
                self.sales
                    .save(sale, ExpectedVersion::Exact(version))
                    .map_err(OrchestratorError::from)
            });
        if let Err(err) = result {
            error!(
                sale_ref = %sale_ref,
                error = %err,
                "compensation failed: sale is cancelled but its stock was not restored"
            );
        }
    }

    fn record_audit(&self, entry: AuditEntry) {
        let action = entry.action;
        let event_type = entry.event_type();
        if let Err(err) = self.audit.record(entry) {
            warn!(%action, event_type, error = %err, "audit entry not recorded");
        }
    }
}
