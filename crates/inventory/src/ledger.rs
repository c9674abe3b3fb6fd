//! Quantity ledger: pure validation of decrements and restores against a lot.
//!
//! Requested lines are accumulated per shape first and the totals checked
//! against the lot snapshot, so two lines naming the same shape cannot each
//! pass on their own and oversell together.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lot::{InventoryLot, ShapeType};
use crate::quantity::{Quantity, ShapeName};

/// One requested line: which bucket (`None` for a single-shape lot) and how much.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeLine {
    pub shape: Option<ShapeName>,
    pub quantity: Quantity,
}

impl ShapeLine {
    pub fn new(shape: Option<ShapeName>, quantity: Quantity) -> Self {
        Self { shape, quantity }
    }
}

/// A per-bucket amount that has passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaLine {
    pub shape: Option<ShapeName>,
    pub quantity: Quantity,
}

/// The exact, non-negative change to apply to a lot, one line per bucket in
/// order of first appearance.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidatedDelta {
    lines: Vec<DeltaLine>,
}

impl ValidatedDelta {
    pub fn lines(&self) -> &[DeltaLine] {
        &self.lines
    }

    pub fn total(&self) -> Quantity {
        self.lines
            .iter()
            .fold(Quantity::ZERO, |acc, l| acc.checked_add(&l.quantity).unwrap_or(acc))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient stock for {}: requested {requested}, available {available}", shape_label(.shape))]
    InsufficientStock {
        shape: Option<ShapeName>,
        requested: Quantity,
        available: Quantity,
    },

    #[error("shape \"{shape}\" not found in lot")]
    ShapeNotFound { shape: ShapeName },

    #[error("shape type mismatch: {0}")]
    ShapeTypeMismatch(String),

    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),
}

impl LedgerError {
    pub(crate) fn missing_bucket(shape: Option<&ShapeName>) -> Self {
        match shape {
            Some(name) => LedgerError::ShapeNotFound {
                shape: name.clone(),
            },
            None => LedgerError::ShapeTypeMismatch(
                "lines against a multi-shape lot must name a shape".to_string(),
            ),
        }
    }
}

fn shape_label(shape: &Option<ShapeName>) -> String {
    match shape {
        Some(name) => format!("shape \"{name}\""),
        None => "lot".to_string(),
    }
}

/// Validate a sale of `requested` lines against the lot's current snapshot.
///
/// - single-shape lots take exactly one line with no shape name
/// - multi-shape lots take one or more lines, each naming an existing shape
/// - every line must carry positive pieces and weight
pub fn validate_decrement(
    lot: &InventoryLot,
    requested: &[ShapeLine],
) -> Result<ValidatedDelta, LedgerError> {
    check_line_shapes(lot, requested)?;
    for line in requested {
        if !line.quantity.is_positive() {
            return Err(LedgerError::InvalidQuantity(format!(
                "sold lines need positive pieces and weight (got {} for {})",
                line.quantity,
                shape_label(&line.shape)
            )));
        }
    }

    let delta = accumulate(requested)?;
    for line in delta.lines() {
        let available = lot
            .available(line.shape.as_ref())
            .ok_or_else(|| LedgerError::missing_bucket(line.shape.as_ref()))?;
        if !available.covers(&line.quantity) {
            return Err(LedgerError::InsufficientStock {
                shape: line.shape.clone(),
                requested: line.quantity,
                available,
            });
        }
    }
    Ok(delta)
}

/// Validate re-adding previously sold lines.
///
/// Restoring cannot drive a bucket negative, so the only failures are a lot
/// whose shape layout no longer matches the sale.
pub fn validate_restore(
    lot: &InventoryLot,
    sold: &[ShapeLine],
) -> Result<ValidatedDelta, LedgerError> {
    check_line_shapes(lot, sold)?;
    let delta = accumulate(sold)?;
    for line in delta.lines() {
        let available = lot
            .available(line.shape.as_ref())
            .ok_or_else(|| LedgerError::missing_bucket(line.shape.as_ref()))?;
        if available.checked_add(&line.quantity).is_none() {
            return Err(LedgerError::InvalidQuantity(
                "restored quantity overflows".to_string(),
            ));
        }
    }
    Ok(delta)
}

fn check_line_shapes(lot: &InventoryLot, lines: &[ShapeLine]) -> Result<(), LedgerError> {
    if lines.is_empty() {
        return Err(LedgerError::InvalidQuantity(
            "at least one sold line is required".to_string(),
        ));
    }
    match lot.shape_type() {
        ShapeType::Single => {
            if lines.len() != 1 {
                return Err(LedgerError::ShapeTypeMismatch(format!(
                    "a single-shape lot takes exactly one line (got {})",
                    lines.len()
                )));
            }
            if let Some(name) = &lines[0].shape {
                return Err(LedgerError::ShapeTypeMismatch(format!(
                    "a single-shape lot has no shape named \"{name}\""
                )));
            }
        }
        ShapeType::Multi => {
            if lines.iter().any(|l| l.shape.is_none()) {
                return Err(LedgerError::missing_bucket(None));
            }
        }
    }
    Ok(())
}

fn accumulate(lines: &[ShapeLine]) -> Result<ValidatedDelta, LedgerError> {
    let mut out: Vec<DeltaLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match out.iter_mut().find(|d| d.shape == line.shape) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(&line.quantity)
                    .ok_or_else(|| LedgerError::InvalidQuantity("line total overflows".into()))?;
            }
            None => out.push(DeltaLine {
                shape: line.shape.clone(),
                quantity: line.quantity,
            }),
        }
    }
    Ok(ValidatedDelta { lines: out })
}
