use std::sync::Arc;

use thiserror::Error;

use gemledger_core::{AggregateRoot, ExpectedVersion, TenantId};

/// A document as held by the store, with the version the store assigned.
///
/// Versions start at 1 on insert and grow by one per successful save. They
/// are the handle for optimistic concurrency: pass the version you loaded
/// back into [`DocumentStore::save`] and a concurrent writer makes your write
/// fail instead of silently overwriting theirs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stored<D> {
    pub version: u64,
    pub document: D,
}

impl<D> Stored<D> {
    pub fn into_document(self) -> D {
        self.document
    }
}

/// Document store operation error.
///
/// These are **infrastructure errors** (storage, concurrency) as opposed to
/// domain errors (validation, invariants).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    #[error("document already exists: {0}")]
    Duplicate(String),

    #[error("document does not exist: {0}")]
    Missing(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Tenant-scoped document store.
///
/// Every read takes the tenant explicitly and every write takes it from the
/// document itself, so a caller cannot address another tenant's data.
///
/// `save` is a whole-document overwrite guarded by `ExpectedVersion`; there is
/// no multi-document transaction.
pub trait DocumentStore<D>: Send + Sync
where
    D: AggregateRoot,
{
    fn find_one(&self, tenant_id: TenantId, id: &D::Id) -> Result<Option<Stored<D>>, StoreError>;

    fn find(
        &self,
        tenant_id: TenantId,
        filter: &dyn Fn(&D) -> bool,
    ) -> Result<Vec<Stored<D>>, StoreError>;

    fn count_documents(
        &self,
        tenant_id: TenantId,
        filter: &dyn Fn(&D) -> bool,
    ) -> Result<usize, StoreError>;

    /// Create a new document at version 1.
    fn insert(&self, document: D) -> Result<Stored<D>, StoreError>;

    /// Overwrite an existing document if its stored version matches `expected`.
    fn save(&self, document: D, expected: ExpectedVersion) -> Result<Stored<D>, StoreError>;

    /// Permanently delete. Returns whether anything was removed.
    fn remove(&self, tenant_id: TenantId, id: &D::Id) -> Result<bool, StoreError>;
}

impl<D, S> DocumentStore<D> for Arc<S>
where
    D: AggregateRoot,
    S: DocumentStore<D> + ?Sized,
{
    fn find_one(&self, tenant_id: TenantId, id: &D::Id) -> Result<Option<Stored<D>>, StoreError> {
        (**self).find_one(tenant_id, id)
    }

    fn find(
        &self,
        tenant_id: TenantId,
        filter: &dyn Fn(&D) -> bool,
    ) -> Result<Vec<Stored<D>>, StoreError> {
        (**self).find(tenant_id, filter)
    }

    fn count_documents(
        &self,
        tenant_id: TenantId,
        filter: &dyn Fn(&D) -> bool,
    ) -> Result<usize, StoreError> {
        (**self).count_documents(tenant_id, filter)
    }

    fn insert(&self, document: D) -> Result<Stored<D>, StoreError> {
        (**self).insert(document)
    }

    fn save(&self, document: D, expected: ExpectedVersion) -> Result<Stored<D>, StoreError> {
        (**self).save(document, expected)
    }

    fn remove(&self, tenant_id: TenantId, id: &D::Id) -> Result<bool, StoreError> {
        (**self).remove(tenant_id, id)
    }
}
