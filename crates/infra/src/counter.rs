//! Per-tenant named counters (sale reference numbering).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use gemledger_core::TenantId;

use crate::document_store::StoreError;

/// Atomic counters keyed by `(tenant, name)`.
///
/// `increment` is a single atomic step that creates the counter at 1 on first
/// use; there is no separate read, so concurrent callers never see the same value.
pub trait CounterStore: Send + Sync {
    fn increment(&self, tenant_id: TenantId, name: &str) -> Result<u64, StoreError>;
}

impl<S> CounterStore for Arc<S>
where
    S: CounterStore + ?Sized,
{
    fn increment(&self, tenant_id: TenantId, name: &str) -> Result<u64, StoreError> {
        (**self).increment(tenant_id, name)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    counters: Mutex<HashMap<(TenantId, String), u64>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for InMemoryCounterStore {
    fn increment(&self, tenant_id: TenantId, name: &str) -> Result<u64, StoreError> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        let value = counters.entry((tenant_id, name.to_string())).or_insert(0);
        *value += 1;
        Ok(*value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_one_and_are_isolated() {
        let counters = InMemoryCounterStore::new();
        let a = TenantId::new();
        let b = TenantId::new();

        assert_eq!(counters.increment(a, "saleRef-20261018").unwrap(), 1);
        assert_eq!(counters.increment(a, "saleRef-20261018").unwrap(), 2);
        assert_eq!(counters.increment(a, "saleRef-20261019").unwrap(), 1);
        assert_eq!(counters.increment(b, "saleRef-20261018").unwrap(), 1);
    }

    #[test]
    fn concurrent_increments_never_repeat() {
        let counters = Arc::new(InMemoryCounterStore::new());
        let tenant = TenantId::new();

        let mut values: Vec<u64> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let counters = counters.clone();
                    s.spawn(move || {
                        (0..50)
                            .map(|_| counters.increment(tenant, "k").unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });

        values.sort_unstable();
        assert_eq!(values, (1..=400).collect::<Vec<u64>>());
    }
}
