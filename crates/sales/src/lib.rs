//! Sales domain module: sale transactions recorded against inventory lots.
//!
//! A sale is created once, with totals derived from its lines, and can later
//! be cancelled exactly once. Quantities never change after creation.

pub mod sale;
pub mod sale_ref;

pub use sale::{
    Cancellation, Customer, SaleError, SaleId, SaleTransaction, SoldShape, SoldShapeInput,
};
pub use sale_ref::SaleRef;
