use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gemledger_core::{AggregateId, AggregateRoot, DomainResult, TenantId, UserId};
use gemledger_inventory::{InventoryLotId, Quantity, ShapeLine, ShapeName};

use crate::SaleRef;

/// Sale identifier (tenant-scoped via the sale's `tenant_id`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaleId(pub AggregateId);

impl SaleId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SaleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SaleError {
    #[error("a sale needs at least one sold line")]
    NoLines,

    #[error("invalid sold line: {0}")]
    InvalidLine(String),

    #[error("sale {0} is already cancelled")]
    AlreadyCancelled(SaleRef),

    #[error("sale {0} is not cancelled")]
    NotCancelled(SaleRef),
}

/// Buyer details. All fields are trimmed and default to empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl Customer {
    pub fn new(name: impl AsRef<str>, email: impl AsRef<str>, phone: impl AsRef<str>) -> Self {
        Self {
            name: name.as_ref().trim().to_string(),
            email: email.as_ref().trim().to_string(),
            phone: phone.as_ref().trim().to_string(),
        }
    }

    /// Name shown in audit trails; anonymous counter sales are "Walk-in".
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { "Walk-in" } else { &self.name }
    }
}

/// What the caller asks to sell on one line. Totals are never accepted from
/// the caller; they are derived from these fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoldShapeInput {
    pub shape: Option<ShapeName>,
    pub quantity: Quantity,
    pub price_per_carat: Decimal,
}

impl SoldShapeInput {
    pub fn new(shape: Option<ShapeName>, quantity: Quantity, price_per_carat: Decimal) -> Self {
        Self {
            shape,
            quantity,
            price_per_carat,
        }
    }

    pub fn to_shape_line(&self) -> ShapeLine {
        ShapeLine::new(self.shape.clone(), self.quantity)
    }

    /// Check the line on its own, before any stock is touched.
    pub fn validate(&self) -> Result<(), SaleError> {
        if !self.quantity.is_positive() {
            return Err(SaleError::InvalidLine(format!(
                "pieces and weight must be positive (got {})",
                self.quantity
            )));
        }
        if self.price_per_carat.is_sign_negative() && !self.price_per_carat.is_zero() {
            return Err(SaleError::InvalidLine(format!(
                "price per carat cannot be negative (got {})",
                self.price_per_carat
            )));
        }
        Ok(())
    }
}

/// A recorded sold line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoldShape {
    pub shape: Option<ShapeName>,
    pub pieces: u32,
    pub weight: Decimal,
    pub price_per_carat: Decimal,
    /// `weight × price_per_carat`, rounded to paise.
    pub line_total: Decimal,
}

impl SoldShape {
    fn from_input(input: &SoldShapeInput) -> Result<Self, SaleError> {
        input.validate()?;
        let line_total = input
            .quantity
            .weight()
            .checked_mul(input.price_per_carat)
            .ok_or_else(|| SaleError::InvalidLine("line total overflows".to_string()))?
            .round_dp(2);

        Ok(Self {
            shape: input.shape.clone(),
            pieces: input.quantity.pieces(),
            weight: input.quantity.weight(),
            price_per_carat: input.price_per_carat,
            line_total,
        })
    }

    /// Fails if a stored line carries a negative weight.
    pub fn quantity(&self) -> DomainResult<Quantity> {
        Quantity::new(self.pieces, self.weight)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub cancelled_at: DateTime<Utc>,
    pub cancelled_by: UserId,
    pub reason: String,
}

/// Aggregate root: SaleTransaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTransaction {
    id: SaleId,
    tenant_id: TenantId,
    sale_ref: SaleRef,
    inventory_id: InventoryLotId,
    sold_shapes: Vec<SoldShape>,
    total_pieces: u32,
    total_weight: Decimal,
    total_amount: Decimal,
    customer: Customer,
    sold_at: DateTime<Utc>,
    cancellation: Option<Cancellation>,
}

impl SaleTransaction {
    /// Build a sale from requested lines, deriving every total.
    pub fn record(
        id: SaleId,
        tenant_id: TenantId,
        sale_ref: SaleRef,
        inventory_id: InventoryLotId,
        lines: &[SoldShapeInput],
        customer: Customer,
        sold_at: DateTime<Utc>,
    ) -> Result<Self, SaleError> {
        if lines.is_empty() {
            return Err(SaleError::NoLines);
        }
        let sold_shapes = lines
            .iter()
            .map(SoldShape::from_input)
            .collect::<Result<Vec<_>, _>>()?;

        let overflow = || SaleError::InvalidLine("sale totals overflow".to_string());
        let mut total_pieces: u32 = 0;
        let mut total_weight = Decimal::ZERO;
        let mut total_amount = Decimal::ZERO;
        for s in &sold_shapes {
            total_pieces = total_pieces.checked_add(s.pieces).ok_or_else(overflow)?;
            total_weight = total_weight.checked_add(s.weight).ok_or_else(overflow)?;
            total_amount = total_amount.checked_add(s.line_total).ok_or_else(overflow)?;
        }

        Ok(Self {
            id,
            tenant_id,
            sale_ref,
            inventory_id,
            sold_shapes,
            total_pieces,
            total_weight,
            total_amount,
            customer,
            sold_at,
            cancellation: None,
        })
    }

    pub fn id_typed(&self) -> SaleId {
        self.id
    }

    pub fn sale_ref(&self) -> &SaleRef {
        &self.sale_ref
    }

    pub fn inventory_id(&self) -> InventoryLotId {
        self.inventory_id
    }

    pub fn sold_shapes(&self) -> &[SoldShape] {
        &self.sold_shapes
    }

    pub fn total_pieces(&self) -> u32 {
        self.total_pieces
    }

    pub fn total_weight(&self) -> Decimal {
        self.total_weight
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn customer(&self) -> &Customer {
        &self.customer
    }

    pub fn sold_at(&self) -> DateTime<Utc> {
        self.sold_at
    }

    pub fn cancellation(&self) -> Option<&Cancellation> {
        self.cancellation.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_some()
    }

    /// Lines in the form the quantity ledger consumes.
    pub fn shape_lines(&self) -> DomainResult<Vec<ShapeLine>> {
        self.sold_shapes
            .iter()
            .map(|s| Ok(ShapeLine::new(s.shape.clone(), s.quantity()?)))
            .collect()
    }

    /// Flip the sale to cancelled. Allowed exactly once.
    pub fn cancel(
        &mut self,
        cancelled_by: UserId,
        reason: impl Into<String>,
        cancelled_at: DateTime<Utc>,
    ) -> Result<(), SaleError> {
        if self.is_cancelled() {
            return Err(SaleError::AlreadyCancelled(self.sale_ref.clone()));
        }
        self.cancellation = Some(Cancellation {
            cancelled_at,
            cancelled_by,
            reason: reason.into().trim().to_string(),
        });
        Ok(())
    }

    /// Undo a cancellation whose inventory restore never happened.
    ///
    /// Only the undo workflow calls this, to compensate its own claim.
    pub fn revoke_cancellation(&mut self) -> Result<(), SaleError> {
        if self.cancellation.take().is_none() {
            return Err(SaleError::NotCancelled(self.sale_ref.clone()));
        }
        Ok(())
    }

    /// Case-insensitive match on the sale reference and customer contact fields.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let fields: [&str; 4] = [
            self.sale_ref.as_str(),
            &self.customer.name,
            &self.customer.email,
            &self.customer.phone,
        ];
        fields
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

impl AggregateRoot for SaleTransaction {
    type Id = SaleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}
