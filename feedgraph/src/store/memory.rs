use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::errors::{GraphError, GraphResult};
use crate::keys::KeyContext;
use crate::store::{GraphStore, SERVICE};
use crate::types::{Entity, Relation, Sequence, UniqueField};

/// In-process keyspace laid out exactly like the Redis backend.
#[derive(Debug, Default)]
struct Keyspace {
    records: HashMap<String, String>,
    sets: HashMap<String, BTreeSet<String>>,
    lists: HashMap<String, Vec<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
}

/// Store used by tests and dry runs. Cloning shares the keyspace.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    prefix: String,
    inner: Arc<Mutex<Keyspace>>,
    fail_writes: Arc<AtomicBool>,
    fail_releases: Arc<AtomicBool>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("feedgraph")
    }
}

impl MemoryStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            inner: Arc::new(Mutex::new(Keyspace::default())),
            fail_writes: Arc::new(AtomicBool::new(false)),
            fail_releases: Arc::new(AtomicBool::new(false)),
        }
    }

    fn keys(&self) -> KeyContext<'_> {
        KeyContext::new(&self.prefix, SERVICE)
    }

    /// Makes every subsequent record write fail, simulating a storage outage.
    pub fn fail_record_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent unique-claim release fail.
    pub fn fail_unique_releases(&self, fail: bool) {
        self.fail_releases.store(fail, Ordering::SeqCst);
    }

    /// Number of keys currently holding data.
    pub fn key_count(&self) -> usize {
        let space = self.inner.lock();
        space.records.len()
            + space.sets.values().filter(|set| !set.is_empty()).count()
            + space.lists.values().filter(|list| !list.is_empty()).count()
            + space.hashes.values().filter(|hash| !hash.is_empty()).count()
    }
}

impl GraphStore for MemoryStore {
    async fn get<T: Entity>(&self, id: &str) -> GraphResult<Option<T>> {
        let key = self.keys().entity::<T>(id);
        let raw = self.inner.lock().records.get(&key).cloned();
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put<T: Entity>(&self, entity: &T) -> GraphResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GraphError::Other {
                message: "memory store rejected write".into(),
            });
        }
        let key = self.keys().entity::<T>(entity.entity_id());
        let json = serde_json::to_string(entity)?;
        self.inner.lock().records.insert(key, json);
        Ok(())
    }

    async fn remove<T: Entity>(&self, id: &str) -> GraphResult<bool> {
        let key = self.keys().entity::<T>(id);
        Ok(self.inner.lock().records.remove(&key).is_some())
    }

    async fn exists<T: Entity>(&self, id: &str) -> GraphResult<bool> {
        let key = self.keys().entity::<T>(id);
        Ok(self.inner.lock().records.contains_key(&key))
    }

    async fn add_member(&self, relation: Relation, owner: &str, member: &str) -> GraphResult<bool> {
        let keys = self.keys();
        let key = keys.relation(relation, owner);
        let mut space = self.inner.lock();
        let added = space.sets.entry(key).or_default().insert(member.to_string());
        if relation.tracks_reverse() {
            let reverse = keys.relation_reverse(relation, member);
            space.sets.entry(reverse).or_default().insert(owner.to_string());
        }
        Ok(added)
    }

    async fn remove_member(&self, relation: Relation, owner: &str, member: &str) -> GraphResult<bool> {
        let keys = self.keys();
        let key = keys.relation(relation, owner);
        let mut space = self.inner.lock();
        let removed = space.sets.get_mut(&key).is_some_and(|set| set.remove(member));
        if relation.tracks_reverse() {
            let reverse = keys.relation_reverse(relation, member);
            if let Some(set) = space.sets.get_mut(&reverse) {
                set.remove(owner);
            }
        }
        Ok(removed)
    }

    async fn is_member(&self, relation: Relation, owner: &str, member: &str) -> GraphResult<bool> {
        let key = self.keys().relation(relation, owner);
        Ok(self
            .inner
            .lock()
            .sets
            .get(&key)
            .is_some_and(|set| set.contains(member)))
    }

    async fn members(&self, relation: Relation, owner: &str) -> GraphResult<BTreeSet<String>> {
        let key = self.keys().relation(relation, owner);
        Ok(self.inner.lock().sets.get(&key).cloned().unwrap_or_default())
    }

    async fn reverse_members(&self, relation: Relation, member: &str) -> GraphResult<BTreeSet<String>> {
        if !relation.tracks_reverse() {
            return Ok(BTreeSet::new());
        }
        let key = self.keys().relation_reverse(relation, member);
        Ok(self.inner.lock().sets.get(&key).cloned().unwrap_or_default())
    }

    async fn clear_relation(&self, relation: Relation, owner: &str) -> GraphResult<()> {
        let keys = self.keys();
        let key = keys.relation(relation, owner);
        let mut space = self.inner.lock();
        let Some(members) = space.sets.remove(&key) else {
            return Ok(());
        };
        if relation.tracks_reverse() {
            for member in members {
                let reverse = keys.relation_reverse(relation, &member);
                if let Some(set) = space.sets.get_mut(&reverse) {
                    set.remove(owner);
                }
            }
        }
        Ok(())
    }

    async fn push_sequence(&self, sequence: Sequence, owner: &str, member: &str) -> GraphResult<()> {
        let key = self.keys().sequence(sequence, owner);
        self.inner
            .lock()
            .lists
            .entry(key)
            .or_default()
            .push(member.to_string());
        Ok(())
    }

    async fn remove_from_sequence(&self, sequence: Sequence, owner: &str, member: &str) -> GraphResult<bool> {
        let key = self.keys().sequence(sequence, owner);
        let mut space = self.inner.lock();
        let Some(list) = space.lists.get_mut(&key) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|id| id != member);
        Ok(list.len() != before)
    }

    async fn sequence(&self, sequence: Sequence, owner: &str) -> GraphResult<Vec<String>> {
        let key = self.keys().sequence(sequence, owner);
        Ok(self.inner.lock().lists.get(&key).cloned().unwrap_or_default())
    }

    async fn clear_sequence(&self, sequence: Sequence, owner: &str) -> GraphResult<()> {
        let key = self.keys().sequence(sequence, owner);
        self.inner.lock().lists.remove(&key);
        Ok(())
    }

    async fn claim_unique(&self, field: UniqueField, value: &str, owner: &str) -> GraphResult<Option<String>> {
        let key = self.keys().unique(field);
        let mut space = self.inner.lock();
        let hash = space.hashes.entry(key).or_default();
        match hash.get(value) {
            Some(holder) if holder != owner => Ok(Some(holder.clone())),
            Some(_) => Ok(None),
            None => {
                hash.insert(value.to_string(), owner.to_string());
                Ok(None)
            }
        }
    }

    async fn release_unique(&self, field: UniqueField, value: &str, owner: &str) -> GraphResult<()> {
        if self.fail_releases.load(Ordering::SeqCst) {
            return Err(GraphError::Other {
                message: "memory store rejected unique release".into(),
            });
        }
        let key = self.keys().unique(field);
        let mut space = self.inner.lock();
        if let Some(hash) = space.hashes.get_mut(&key)
            && hash.get(value).is_some_and(|holder| holder == owner)
        {
            hash.remove(value);
        }
        Ok(())
    }
}
