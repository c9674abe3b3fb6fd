//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by value: two quantities of
/// `4 pcs / 2.00 ct` are the same quantity regardless of which lot they came
/// from. To "modify" one, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
