use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use gemledger_core::{AggregateId, AggregateRoot, DomainError, DomainResult, TenantId};

use crate::ledger::{LedgerError, ShapeLine, ValidatedDelta, validate_decrement, validate_restore};
use crate::quantity::{Quantity, ShapeName};

/// Inventory lot identifier (tenant-scoped via the lot's `tenant_id`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryLotId(pub AggregateId);

impl InventoryLotId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InventoryLotId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    Single,
    Multi,
}

/// Lot status. Derived from quantities and the pending flag, never set directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotStatus {
    InStock,
    Pending,
    PartiallySold,
    Sold,
}

/// Stock held in one bucket: what the lot was registered with and what is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBucket {
    pub initial: Quantity,
    pub available: Quantity,
}

impl StockBucket {
    pub fn new(initial: Quantity) -> Self {
        Self {
            initial,
            available: initial,
        }
    }

    fn is_consumed(&self) -> bool {
        self.available != self.initial
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeStock {
    pub shape: ShapeName,
    pub stock: StockBucket,
}

/// Quantity representation of a lot.
///
/// A lot is either one undivided quantity or an ordered list of named shape
/// buckets; there is no way to hold both at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape_type", rename_all = "snake_case")]
pub enum LotStock {
    Single { stock: StockBucket },
    Multi { shapes: Vec<ShapeStock> },
}

impl LotStock {
    pub fn shape_type(&self) -> ShapeType {
        match self {
            LotStock::Single { .. } => ShapeType::Single,
            LotStock::Multi { .. } => ShapeType::Multi,
        }
    }

    fn buckets(&self) -> Box<dyn Iterator<Item = &StockBucket> + '_> {
        match self {
            LotStock::Single { stock } => Box::new(std::iter::once(stock)),
            LotStock::Multi { shapes } => Box::new(shapes.iter().map(|s| &s.stock)),
        }
    }

    fn bucket(&self, shape: Option<&ShapeName>) -> Option<&StockBucket> {
        match (self, shape) {
            (LotStock::Single { stock }, None) => Some(stock),
            (LotStock::Multi { shapes }, Some(name)) => {
                shapes.iter().find(|s| &s.shape == name).map(|s| &s.stock)
            }
            _ => None,
        }
    }

    fn bucket_mut(&mut self, shape: Option<&ShapeName>) -> Option<&mut StockBucket> {
        match (self, shape) {
            (LotStock::Single { stock }, None) => Some(stock),
            (LotStock::Multi { shapes }, Some(name)) => shapes
                .iter_mut()
                .find(|s| &s.shape == name)
                .map(|s| &mut s.stock),
            _ => None,
        }
    }

    fn derive_status(&self, pending: bool) -> LotStatus {
        if self.buckets().all(|b| b.available.is_zero()) {
            LotStatus::Sold
        } else if self.buckets().any(StockBucket::is_consumed) {
            LotStatus::PartiallySold
        } else if pending {
            LotStatus::Pending
        } else {
            LotStatus::InStock
        }
    }
}

/// Aggregate root: InventoryLot.
///
/// `status` is written out for readers but never read back; deserializing
/// re-derives it from the stock and the pending flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LotRecord")]
pub struct InventoryLot {
    id: InventoryLotId,
    tenant_id: TenantId,
    serial_number: String,
    stock: LotStock,
    pending: bool,
    is_deleted: bool,
    status: LotStatus,
}

#[derive(Deserialize)]
struct LotRecord {
    id: InventoryLotId,
    tenant_id: TenantId,
    serial_number: String,
    stock: LotStock,
    #[serde(default)]
    pending: bool,
    #[serde(default)]
    is_deleted: bool,
}

impl TryFrom<LotRecord> for InventoryLot {
    type Error = DomainError;

    fn try_from(record: LotRecord) -> Result<Self, Self::Error> {
        let mut lot = Self::build(record.id, record.tenant_id, record.serial_number, record.stock)?;
        lot.pending = record.pending;
        lot.is_deleted = record.is_deleted;
        lot.refresh_status();
        Ok(lot)
    }
}

impl InventoryLot {
    /// Register a lot tracked as one undivided quantity.
    pub fn new_single(
        id: InventoryLotId,
        tenant_id: TenantId,
        serial_number: impl Into<String>,
        quantity: Quantity,
    ) -> DomainResult<Self> {
        Self::build(
            id,
            tenant_id,
            serial_number.into(),
            LotStock::Single {
                stock: StockBucket::new(quantity),
            },
        )
    }

    /// Register a lot split into named shape buckets.
    pub fn new_multi(
        id: InventoryLotId,
        tenant_id: TenantId,
        serial_number: impl Into<String>,
        shapes: Vec<(ShapeName, Quantity)>,
    ) -> DomainResult<Self> {
        if shapes.is_empty() {
            return Err(DomainError::validation(
                "a multi-shape lot needs at least one shape",
            ));
        }
        let mut seen = HashSet::new();
        for (name, _) in &shapes {
            if !seen.insert(name.clone()) {
                return Err(DomainError::validation(format!(
                    "shape '{name}' appears more than once"
                )));
            }
        }
        let shapes = shapes
            .into_iter()
            .map(|(shape, q)| ShapeStock {
                shape,
                stock: StockBucket::new(q),
            })
            .collect();
        Self::build(id, tenant_id, serial_number.into(), LotStock::Multi { shapes })
    }

    fn build(
        id: InventoryLotId,
        tenant_id: TenantId,
        serial_number: String,
        stock: LotStock,
    ) -> DomainResult<Self> {
        let serial_number = serial_number.trim().to_string();
        if serial_number.is_empty() {
            return Err(DomainError::validation("serial number cannot be empty"));
        }
        let status = stock.derive_status(false);
        Ok(Self {
            id,
            tenant_id,
            serial_number,
            stock,
            pending: false,
            is_deleted: false,
            status,
        })
    }

    pub fn id_typed(&self) -> InventoryLotId {
        self.id
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub fn stock(&self) -> &LotStock {
        &self.stock
    }

    pub fn shape_type(&self) -> ShapeType {
        self.stock.shape_type()
    }

    pub fn status(&self) -> LotStatus {
        self.status
    }

    pub fn is_sold(&self) -> bool {
        self.status == LotStatus::Sold
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    /// Current available quantity for a shape (`None` addresses a single-shape lot).
    pub fn available(&self, shape: Option<&ShapeName>) -> Option<Quantity> {
        self.stock.bucket(shape).map(|b| b.available)
    }

    /// Sum of available quantity over every bucket.
    pub fn total_available(&self) -> Quantity {
        self.stock
            .buckets()
            .fold(Quantity::ZERO, |acc, b| acc.checked_add(&b.available).unwrap_or(acc))
    }

    /// Workflow flag set outside the ledger; only visible while nothing is sold.
    pub fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
        self.refresh_status();
    }

    /// Soft delete: the lot can no longer be sold, but existing sales can still
    /// be undone into it.
    pub fn mark_deleted(&mut self) {
        self.is_deleted = true;
    }

    /// Subtract from one bucket. Callers validate first (see [`validate_decrement`]);
    /// an insufficient bucket is still refused here rather than clamped.
    pub fn reduce_quantity(
        &mut self,
        shape: Option<&ShapeName>,
        quantity: &Quantity,
    ) -> Result<(), LedgerError> {
        let bucket = self
            .stock
            .bucket_mut(shape)
            .ok_or_else(|| LedgerError::missing_bucket(shape))?;
        bucket.available =
            bucket
                .available
                .checked_sub(quantity)
                .ok_or_else(|| LedgerError::InsufficientStock {
                    shape: shape.cloned(),
                    requested: *quantity,
                    available: bucket.available,
                })?;
        self.refresh_status();
        Ok(())
    }

    /// Add back to one bucket. A bucket that no longer exists is a consistency
    /// failure, never skipped.
    pub fn restore_quantity(
        &mut self,
        shape: Option<&ShapeName>,
        quantity: &Quantity,
    ) -> Result<(), LedgerError> {
        let bucket = self
            .stock
            .bucket_mut(shape)
            .ok_or_else(|| LedgerError::missing_bucket(shape))?;
        bucket.available = bucket
            .available
            .checked_add(quantity)
            .ok_or_else(|| LedgerError::InvalidQuantity("restored quantity overflows".into()))?;
        self.refresh_status();
        Ok(())
    }

    /// Validate `lines` against this lot and, if every line passes, apply all of
    /// them. On error the lot is untouched.
    pub fn decrement(&mut self, lines: &[ShapeLine]) -> Result<ValidatedDelta, LedgerError> {
        let delta = validate_decrement(self, lines)?;
        self.apply_delta(&delta, Self::reduce_quantity)?;
        Ok(delta)
    }

    /// Re-add previously sold lines. On error the lot is untouched.
    pub fn restore(&mut self, lines: &[ShapeLine]) -> Result<ValidatedDelta, LedgerError> {
        let delta = validate_restore(self, lines)?;
        self.apply_delta(&delta, Self::restore_quantity)?;
        Ok(delta)
    }

    fn apply_delta(
        &mut self,
        delta: &ValidatedDelta,
        op: fn(&mut Self, Option<&ShapeName>, &Quantity) -> Result<(), LedgerError>,
    ) -> Result<(), LedgerError> {
        // Work on a copy so a failing line cannot leave half the shapes updated.
        let mut next = self.clone();
        for line in delta.lines() {
            op(&mut next, line.shape.as_ref(), &line.quantity)?;
        }
        *self = next;
        Ok(())
    }

    fn refresh_status(&mut self) {
        self.status = self.stock.derive_status(self.pending);
    }
}

impl AggregateRoot for InventoryLot {
    type Id = InventoryLotId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}
