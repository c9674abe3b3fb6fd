//! Piece/weight quantities and shape names.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use gemledger_core::{DomainError, DomainResult, ValueObject};

/// A pair of piece count and carat weight.
///
/// Weight is a `Decimal` so that repeated sell/undo cycles conserve mass
/// exactly; both components are non-negative by construction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "QuantityRepr")]
pub struct Quantity {
    pieces: u32,
    weight: Decimal,
}

/// Wire form of [`Quantity`]; deserialization goes through [`Quantity::new`].
#[derive(Deserialize)]
struct QuantityRepr {
    pieces: u32,
    weight: Decimal,
}

impl TryFrom<QuantityRepr> for Quantity {
    type Error = DomainError;

    fn try_from(value: QuantityRepr) -> Result<Self, Self::Error> {
        Self::new(value.pieces, value.weight)
    }
}

impl ValueObject for Quantity {}

impl Quantity {
    pub const ZERO: Quantity = Quantity {
        pieces: 0,
        weight: Decimal::ZERO,
    };

    pub fn new(pieces: u32, weight: Decimal) -> DomainResult<Self> {
        if weight.is_sign_negative() && !weight.is_zero() {
            return Err(DomainError::validation(format!(
                "weight cannot be negative (got {weight})"
            )));
        }
        Ok(Self { pieces, weight })
    }

    pub fn pieces(&self) -> u32 {
        self.pieces
    }

    pub fn weight(&self) -> Decimal {
        self.weight
    }

    pub fn is_zero(&self) -> bool {
        self.pieces == 0 && self.weight.is_zero()
    }

    /// Both components strictly positive (what a sold line must carry).
    pub fn is_positive(&self) -> bool {
        self.pieces > 0 && self.weight > Decimal::ZERO
    }

    /// `self` has at least as many pieces and at least as much weight.
    pub fn covers(&self, other: &Quantity) -> bool {
        self.pieces >= other.pieces && self.weight >= other.weight
    }

    pub fn checked_add(&self, other: &Quantity) -> Option<Quantity> {
        Some(Quantity {
            pieces: self.pieces.checked_add(other.pieces)?,
            weight: self.weight.checked_add(other.weight)?,
        })
    }

    /// Subtract, refusing (never clamping) to go below zero in either component.
    pub fn checked_sub(&self, other: &Quantity) -> Option<Quantity> {
        if !self.covers(other) {
            return None;
        }
        Some(Quantity {
            pieces: self.pieces - other.pieces,
            weight: self.weight.checked_sub(other.weight)?,
        })
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} pcs / {} ct", self.pieces, self.weight)
    }
}

/// Name of a cut-shape bucket inside a multi-shape lot ("round", "oval", ...).
///
/// Matching is exact: "Round" and "round" are different shapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShapeName(String);

impl ValueObject for ShapeName {}

impl ShapeName {
    pub fn new(name: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("shape name cannot be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ShapeName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ShapeName> for String {
    fn from(value: ShapeName) -> Self {
        value.0
    }
}

impl core::fmt::Display for ShapeName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
