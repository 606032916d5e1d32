//! Storage implementations for throttling state.
//!
//! Provides concurrent, sharded storage for per-key throttling trackers.

use crate::application::ports::Storage;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

/// Thread-safe sharded storage backed by DashMap.
///
/// Each key lives in one shard; holding a key's entry locks only that shard,
/// so decisions for unrelated keys do not contend.
#[derive(Debug)]
pub struct ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    map: DashMap<K, V>,
}

impl<K, V> ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a new sharded storage instance.
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
        }
    }
}

impl<K, V> Default for ShardedStorage<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Storage<K, V> for ShardedStorage<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + Debug,
    V: Send + Sync + Debug,
{
    fn with_entry_mut<R>(
        &self,
        key: K,
        on_vacant: impl FnOnce() -> (V, R),
        on_occupied: impl FnOnce(&mut V) -> R,
    ) -> R {
        match self.map.entry(key) {
            Entry::Occupied(mut occupied) => on_occupied(occupied.get_mut()),
            Entry::Vacant(vacant) => {
                let (value, result) = on_vacant();
                vacant.insert(value);
                result
            }
        }
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn clear(&self) {
        self.map.clear()
    }

    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        self.map.retain(f);
    }
}

// Lets several evaluators share one map by cloning the Arc.
impl<K, V> Storage<K, V> for Arc<ShardedStorage<K, V>>
where
    K: Hash + Eq + Clone + Send + Sync + Debug,
    V: Send + Sync + Debug,
{
    fn with_entry_mut<R>(
        &self,
        key: K,
        on_vacant: impl FnOnce() -> (V, R),
        on_occupied: impl FnOnce(&mut V) -> R,
    ) -> R {
        (**self).with_entry_mut(key, on_vacant, on_occupied)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }

    fn clear(&self) {
        (**self).clear()
    }

    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        (**self).retain(f)
    }
}
