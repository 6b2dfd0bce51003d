//! Storage seam for the graph engine.
//!
//! Backends expose entity records plus two relation shapes: unordered id sets (atomic add/remove that
//! report whether anything changed) and insertion-ordered id lists. Nothing here knows about posts or
//! users beyond [`Entity`]; the engine composes the primitives.

pub mod memory;
pub mod redis;

use std::collections::BTreeSet;

use crate::errors::GraphResult;
use crate::types::{Entity, Relation, Sequence, UniqueField};

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Service segment used in every key written by the backends.
pub const SERVICE: &str = "graph";

#[allow(async_fn_in_trait)]
pub trait GraphStore {
    async fn get<T: Entity>(&self, id: &str) -> GraphResult<Option<T>>;

    async fn put<T: Entity>(&self, entity: &T) -> GraphResult<()>;

    /// Returns `true` when a record was deleted.
    async fn remove<T: Entity>(&self, id: &str) -> GraphResult<bool>;

    async fn exists<T: Entity>(&self, id: &str) -> GraphResult<bool>;

    /// Adds `member` to `relation` of `owner`; `true` if it was not present before.
    async fn add_member(&self, relation: Relation, owner: &str, member: &str) -> GraphResult<bool>;

    /// Removes `member` from `relation` of `owner`; `true` if it was present.
    async fn remove_member(&self, relation: Relation, owner: &str, member: &str) -> GraphResult<bool>;

    async fn is_member(&self, relation: Relation, owner: &str, member: &str) -> GraphResult<bool>;

    async fn members(&self, relation: Relation, owner: &str) -> GraphResult<BTreeSet<String>>;

    /// Owners whose `relation` set contains `member`. Only answered for relations that
    /// [`Relation::tracks_reverse`]; empty otherwise.
    async fn reverse_members(&self, relation: Relation, member: &str) -> GraphResult<BTreeSet<String>>;

    /// Drops the whole set, including its reverse entries.
    async fn clear_relation(&self, relation: Relation, owner: &str) -> GraphResult<()>;

    async fn push_sequence(&self, sequence: Sequence, owner: &str, member: &str) -> GraphResult<()>;

    /// Removes every occurrence of `member`; `true` if at least one was removed.
    async fn remove_from_sequence(&self, sequence: Sequence, owner: &str, member: &str) -> GraphResult<bool>;

    async fn sequence(&self, sequence: Sequence, owner: &str) -> GraphResult<Vec<String>>;

    async fn clear_sequence(&self, sequence: Sequence, owner: &str) -> GraphResult<()>;

    /// Claims `value` for `owner`. Returns the current holder when another entity already owns it.
    async fn claim_unique(&self, field: UniqueField, value: &str, owner: &str) -> GraphResult<Option<String>>;

    /// Releases `value` if `owner` holds it.
    async fn release_unique(&self, field: UniqueField, value: &str, owner: &str) -> GraphResult<()>;
}
