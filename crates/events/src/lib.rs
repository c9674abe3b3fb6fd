//! Business events and the append-only audit boundary.
//!
//! The audit trail is an external collaborator: the ledger only needs
//! something that accepts [`AuditEntry`] values. Recording is best-effort and
//! callers never roll back business writes because of it.

pub mod audit;
pub mod event;
pub mod tenant;

pub use audit::{AuditAction, AuditEntityType, AuditEntry, AuditError, AuditSink, InMemoryAuditLog};
pub use event::Event;
pub use tenant::TenantScoped;
