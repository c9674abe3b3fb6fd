//! Infrastructure layer: document/counter stores, configuration, and the
//! sale orchestrator that ties lots, sales and the audit trail together.

pub mod config;
pub mod counter;
pub mod document_store;
pub mod query;
pub mod sale_orchestrator;


pub use config::LedgerConfig;
pub use counter::{CounterStore, InMemoryCounterStore};
pub use document_store::{DocumentStore, InMemoryDocumentStore, StoreError, Stored};
pub use query::{Page, SaleQuery, SortOrder};
pub use sale_orchestrator::{OrchestratorError, SaleOrchestrator, SellRequest, UndoRequest};
