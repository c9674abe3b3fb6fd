//! Audit trail entries and the sink they are written to.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use gemledger_core::{AggregateId, TenantId, UserId};

use crate::{Event, TenantScoped};

/// What happened to the audited entity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    SellItem,
    UndoSold,
    UpdateSold,
    CreateSale,
    CancelSale,
    RestoreItem,
    PermanentDelete,
    EmptyRecycleBin,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::SellItem => "SELL_ITEM",
            AuditAction::UndoSold => "UNDO_SOLD",
            AuditAction::UpdateSold => "UPDATE_SOLD",
            AuditAction::CreateSale => "CREATE_SALE",
            AuditAction::CancelSale => "CANCEL_SALE",
            AuditAction::RestoreItem => "RESTORE_ITEM",
            AuditAction::PermanentDelete => "PERMANENT_DELETE",
            AuditAction::EmptyRecycleBin => "EMPTY_RECYCLE_BIN",
        }
    }
}

impl core::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of entity an audit entry refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntityType {
    Inventory,
    Sold,
    Sale,
    Category,
    RecycleBin,
}

/// One append-only audit record.
///
/// `meta` is a free-form snapshot of the business facts at the time of the
/// action (sale reference, serial number, restored quantities, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entry_id: Uuid,
    pub tenant_id: TenantId,
    pub action: AuditAction,
    pub entity_type: AuditEntityType,
    pub entity_id: Option<AggregateId>,
    pub performed_by: UserId,
    pub meta: JsonValue,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        tenant_id: TenantId,
        action: AuditAction,
        entity_type: AuditEntityType,
        entity_id: Option<AggregateId>,
        performed_by: UserId,
        meta: JsonValue,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            entry_id: Uuid::now_v7(),
            tenant_id,
            action,
            entity_type,
            entity_id,
            performed_by,
            meta,
            occurred_at,
        }
    }
}

impl Event for AuditEntry {
    fn event_type(&self) -> &'static str {
        match self.action {
            AuditAction::SellItem => "audit.sold.sell_item",
            AuditAction::UndoSold => "audit.sold.undo",
            AuditAction::UpdateSold => "audit.sold.update",
            AuditAction::CreateSale => "audit.sale.created",
            AuditAction::CancelSale => "audit.sale.cancelled",
            AuditAction::RestoreItem => "audit.recycle_bin.restored",
            AuditAction::PermanentDelete => "audit.recycle_bin.deleted",
            AuditAction::EmptyRecycleBin => "audit.recycle_bin.emptied",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl TenantScoped for AuditEntry {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Audit sink failure.
///
/// Callers log this and carry on; it never fails a business operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),

    #[error("audit entry rejected: {0}")]
    Rejected(String),
}

/// Append-only destination for audit entries.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError>;
}

impl<S> AuditSink for Arc<S>
where
    S: AuditSink + ?Sized,
{
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        (**self).record(entry)
    }
}

/// In-memory append-only audit log.
///
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries recorded for one tenant, oldest first.
    pub fn entries_for(&self, tenant_id: TenantId) -> Vec<AuditEntry> {
        match self.entries.read() {
            Ok(entries) => entries
                .iter()
                .filter(|e| e.tenant_id() == tenant_id)
                .cloned()
                .collect(),
            Err(_) => vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for InMemoryAuditLog {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AuditError::Unavailable("lock poisoned".to_string()))?;
        tracing::debug!(action = %entry.action, tenant_id = %entry.tenant_id, "audit entry recorded");
        entries.push(entry);
        Ok(())
    }
}
