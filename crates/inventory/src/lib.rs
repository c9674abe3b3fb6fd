//! Inventory domain module: gemstone lots and the quantity ledger.
//!
//! This crate contains business rules for inventory, implemented purely as
//! deterministic domain logic (no IO, no storage). The ledger validates a
//! requested decrement or restore against a lot snapshot; the lot applies the
//! validated delta to itself in one step.

pub mod ledger;
pub mod lot;
pub mod quantity;

pub use ledger::{DeltaLine, LedgerError, ShapeLine, ValidatedDelta, validate_decrement, validate_restore};
pub use lot::{InventoryLot, InventoryLotId, LotStatus, LotStock, ShapeStock, ShapeType, StockBucket};
pub use quantity::{Quantity, ShapeName};
