//! Tenant-scoped document store boundary.
//!
//! Lots and sales are persisted as whole documents. The store assigns each
//! document a version so writers can detect that someone else saved first.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryDocumentStore;
pub use r#trait::{DocumentStore, Stored, StoreError};
