use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use gemledger_core::{AggregateRoot, ExpectedVersion, TenantId};

use super::r#trait::{DocumentStore, StoreError, Stored};

/// In-memory document store.
///
/// Intended for tests/dev. Each call holds the lock for its whole duration,
/// so a versioned `save` is an atomic compare-and-swap.
#[derive(Debug)]
pub struct InMemoryDocumentStore<D>
where
    D: AggregateRoot,
{
    docs: RwLock<HashMap<(TenantId, D::Id), Stored<D>>>,
}

impl<D> InMemoryDocumentStore<D>
where
    D: AggregateRoot,
{
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
        }
    }
}

impl<D> Default for InMemoryDocumentStore<D>
where
    D: AggregateRoot,
{
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

impl<D> DocumentStore<D> for InMemoryDocumentStore<D>
where
    D: AggregateRoot + Clone + Send + Sync + 'static,
    D::Id: Hash + Send + Sync + 'static,
{
    fn find_one(&self, tenant_id: TenantId, id: &D::Id) -> Result<Option<Stored<D>>, StoreError> {
        let docs = self.docs.read().map_err(|_| poisoned())?;
        Ok(docs.get(&(tenant_id, id.clone())).cloned())
    }

    fn find(
        &self,
        tenant_id: TenantId,
        filter: &dyn Fn(&D) -> bool,
    ) -> Result<Vec<Stored<D>>, StoreError> {
        let docs = self.docs.read().map_err(|_| poisoned())?;
        Ok(docs
            .iter()
            .filter(|((t, _), s)| *t == tenant_id && filter(&s.document))
            .map(|(_, s)| s.clone())
            .collect())
    }

    fn count_documents(
        &self,
        tenant_id: TenantId,
        filter: &dyn Fn(&D) -> bool,
    ) -> Result<usize, StoreError> {
        let docs = self.docs.read().map_err(|_| poisoned())?;
        Ok(docs
            .iter()
            .filter(|((t, _), s)| *t == tenant_id && filter(&s.document))
            .count())
    }

    fn insert(&self, document: D) -> Result<Stored<D>, StoreError> {
        let key = (document.tenant_id(), document.id().clone());
        let mut docs = self.docs.write().map_err(|_| poisoned())?;
        if docs.contains_key(&key) {
            return Err(StoreError::Duplicate(format!("{:?}", key.1)));
        }
        let stored = Stored {
            version: 1,
            document,
        };
        docs.insert(key, stored.clone());
        Ok(stored)
    }

    fn save(&self, document: D, expected: ExpectedVersion) -> Result<Stored<D>, StoreError> {
        let key = (document.tenant_id(), document.id().clone());
        let mut docs = self.docs.write().map_err(|_| poisoned())?;
        let current = docs
            .get(&key)
            .ok_or_else(|| StoreError::Missing(format!("{:?}", key.1)))?
            .version;

        if !expected.matches(current) {
            return Err(StoreError::Conflict(format!(
                "expected {expected:?}, found {current}"
            )));
        }

        let stored = Stored {
            version: current + 1,
            document,
        };
        docs.insert(key, stored.clone());
        Ok(stored)
    }

    fn remove(&self, tenant_id: TenantId, id: &D::Id) -> Result<bool, StoreError> {
        let mut docs = self.docs.write().map_err(|_| poisoned())?;
        Ok(docs.remove(&(tenant_id, id.clone())).is_some())
    }
}
