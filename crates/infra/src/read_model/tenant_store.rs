use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tessera_core::TenantId;

use crate::store::{StoreError, StoreResult};

/// Tenant-partitioned key/value store.
///
/// Every operation names its tenant, so a lookup can never observe another
/// tenant's records. Values within a tenant are kept in key order.
pub trait TenantStore<K, V>: Send + Sync {
    fn get(&self, tenant_id: TenantId, key: &K) -> StoreResult<Option<V>>;
    fn upsert(&self, tenant_id: TenantId, key: K, value: V) -> StoreResult<()>;
    /// All values of one tenant, in key order.
    fn list(&self, tenant_id: TenantId) -> StoreResult<Vec<V>>;
    /// Number of a tenant's values satisfying `pred`.
    fn count_where(&self, tenant_id: TenantId, pred: &dyn Fn(&V) -> bool) -> StoreResult<u64>;
}

impl<K, V, S> TenantStore<K, V> for Arc<S>
where
    S: TenantStore<K, V> + ?Sized,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> StoreResult<Option<V>> {
        (**self).get(tenant_id, key)
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) -> StoreResult<()> {
        (**self).upsert(tenant_id, key, value)
    }

    fn list(&self, tenant_id: TenantId) -> StoreResult<Vec<V>> {
        (**self).list(tenant_id)
    }

    fn count_where(&self, tenant_id: TenantId, pred: &dyn Fn(&V) -> bool) -> StoreResult<u64> {
        (**self).count_where(tenant_id, pred)
    }
}

/// In-memory partitioned store for tests/dev.
#[derive(Debug)]
pub struct InMemoryTenantStore<K, V> {
    partitions: RwLock<HashMap<TenantId, BTreeMap<K, V>>>,
}

impl<K, V> InMemoryTenantStore<K, V> {
    pub fn new() -> Self {
        Self {
            partitions: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<TenantId, BTreeMap<K, V>>>> {
        self.partitions
            .read()
            .map_err(|_| StoreError::Backend("tenant store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<TenantId, BTreeMap<K, V>>>> {
        self.partitions
            .write()
            .map_err(|_| StoreError::Backend("tenant store lock poisoned".to_string()))
    }
}

impl<K, V> Default for InMemoryTenantStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TenantStore<K, V> for InMemoryTenantStore<K, V>
where
    K: Ord + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, tenant_id: TenantId, key: &K) -> StoreResult<Option<V>> {
        let partitions = self.read()?;
        Ok(partitions
            .get(&tenant_id)
            .and_then(|partition| partition.get(key))
            .cloned())
    }

    fn upsert(&self, tenant_id: TenantId, key: K, value: V) -> StoreResult<()> {
        let mut partitions = self.write()?;
        partitions.entry(tenant_id).or_default().insert(key, value);
        Ok(())
    }

    fn list(&self, tenant_id: TenantId) -> StoreResult<Vec<V>> {
        let partitions = self.read()?;
        Ok(partitions
            .get(&tenant_id)
            .map(|partition| partition.values().cloned().collect())
            .unwrap_or_default())
    }

    fn count_where(&self, tenant_id: TenantId, pred: &dyn Fn(&V) -> bool) -> StoreResult<u64> {
        let partitions = self.read()?;
        let count = partitions
            .get(&tenant_id)
            .map(|partition| partition.values().filter(|v| pred(v)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }
}
