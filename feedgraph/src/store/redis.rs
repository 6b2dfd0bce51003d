use std::collections::BTreeSet;
use std::sync::LazyLock;

use ::redis::aio::ConnectionManager;
use ::redis::{Client, Script, cmd, pipe};
use log::debug;

use crate::errors::GraphResult;
use crate::keys::KeyContext;
use crate::store::{GraphStore, SERVICE};
use crate::types::{Entity, Relation, Sequence, UniqueField};

const SCAN_COUNT: usize = 1000;

/// Deletes a unique claim only while `owner` still holds it.
const RELEASE_UNIQUE_SCRIPT_BODY: &str = r#"
if redis.call('HGET', KEYS[1], ARGV[1]) == ARGV[2] then
  return redis.call('HDEL', KEYS[1], ARGV[1])
end
return 0
"#;

static RELEASE_UNIQUE_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(RELEASE_UNIQUE_SCRIPT_BODY));

/// Redis-backed store. Records are JSON strings, relations are sets, sequences are lists.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
        }
    }

    pub async fn connect(url: &str, prefix: impl Into<String>) -> GraphResult<Self> {
        let client = Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn, prefix))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn keys(&self) -> KeyContext<'_> {
        KeyContext::new(&self.prefix, SERVICE)
    }

    /// Deletes every key under the configured prefix. Returns the number of keys removed.
    pub async fn purge(&self) -> GraphResult<u64> {
        let pattern = self.keys().prefix_pattern();
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut total_deleted: u64 = 0;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let deleted: u64 = cmd("DEL").arg(&keys).query_async(&mut conn).await?;
                total_deleted += deleted;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!("purged {total_deleted} keys matching {pattern}");
        Ok(total_deleted)
    }
}

impl GraphStore for RedisStore {
    async fn get<T: Entity>(&self, id: &str) -> GraphResult<Option<T>> {
        let key = self.keys().entity::<T>(id);
        let mut conn = self.conn.clone();
        let raw: Option<String> = cmd("GET").arg(&key).query_async(&mut conn).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put<T: Entity>(&self, entity: &T) -> GraphResult<()> {
        let key = self.keys().entity::<T>(entity.entity_id());
        let json = serde_json::to_string(entity)?;
        let mut conn = self.conn.clone();
        cmd("SET").arg(&key).arg(json).query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn remove<T: Entity>(&self, id: &str) -> GraphResult<bool> {
        let key = self.keys().entity::<T>(id);
        let mut conn = self.conn.clone();
        let deleted: i64 = cmd("DEL").arg(&key).query_async(&mut conn).await?;
        Ok(deleted > 0)
    }

    async fn exists<T: Entity>(&self, id: &str) -> GraphResult<bool> {
        let key = self.keys().entity::<T>(id);
        let mut conn = self.conn.clone();
        let exists: i64 = cmd("EXISTS").arg(&key).query_async(&mut conn).await?;
        Ok(exists > 0)
    }

    async fn add_member(&self, relation: Relation, owner: &str, member: &str) -> GraphResult<bool> {
        let keys = self.keys();
        let key = keys.relation(relation, owner);
        let mut conn = self.conn.clone();
        let added: i64 = if relation.tracks_reverse() {
            let reverse = keys.relation_reverse(relation, member);
            let (added, _): (i64, i64) = pipe()
                .atomic()
                .cmd("SADD")
                .arg(&key)
                .arg(member)
                .cmd("SADD")
                .arg(&reverse)
                .arg(owner)
                .query_async(&mut conn)
                .await?;
            added
        } else {
            cmd("SADD").arg(&key).arg(member).query_async(&mut conn).await?
        };
        Ok(added > 0)
    }

    async fn remove_member(&self, relation: Relation, owner: &str, member: &str) -> GraphResult<bool> {
        let keys = self.keys();
        let key = keys.relation(relation, owner);
        let mut conn = self.conn.clone();
        let removed: i64 = if relation.tracks_reverse() {
            let reverse = keys.relation_reverse(relation, member);
            let (removed, _): (i64, i64) = pipe()
                .atomic()
                .cmd("SREM")
                .arg(&key)
                .arg(member)
                .cmd("SREM")
                .arg(&reverse)
                .arg(owner)
                .query_async(&mut conn)
                .await?;
            removed
        } else {
            cmd("SREM").arg(&key).arg(member).query_async(&mut conn).await?
        };
        Ok(removed > 0)
    }

    async fn is_member(&self, relation: Relation, owner: &str, member: &str) -> GraphResult<bool> {
        let key = self.keys().relation(relation, owner);
        let mut conn = self.conn.clone();
        let found: i64 = cmd("SISMEMBER").arg(&key).arg(member).query_async(&mut conn).await?;
        Ok(found > 0)
    }

    async fn members(&self, relation: Relation, owner: &str) -> GraphResult<BTreeSet<String>> {
        let key = self.keys().relation(relation, owner);
        let mut conn = self.conn.clone();
        let members: Vec<String> = cmd("SMEMBERS").arg(&key).query_async(&mut conn).await?;
        Ok(members.into_iter().collect())
    }

    async fn reverse_members(&self, relation: Relation, member: &str) -> GraphResult<BTreeSet<String>> {
        if !relation.tracks_reverse() {
            return Ok(BTreeSet::new());
        }
        let key = self.keys().relation_reverse(relation, member);
        let mut conn = self.conn.clone();
        let owners: Vec<String> = cmd("SMEMBERS").arg(&key).query_async(&mut conn).await?;
        Ok(owners.into_iter().collect())
    }

    async fn clear_relation(&self, relation: Relation, owner: &str) -> GraphResult<()> {
        let keys = self.keys();
        let key = keys.relation(relation, owner);
        let mut conn = self.conn.clone();
        if !relation.tracks_reverse() {
            cmd("DEL").arg(&key).query_async::<()>(&mut conn).await?;
            return Ok(());
        }

        let members: Vec<String> = cmd("SMEMBERS").arg(&key).query_async(&mut conn).await?;
        let mut batch = pipe();
        batch.atomic();
        for member in &members {
            batch
                .cmd("SREM")
                .arg(keys.relation_reverse(relation, member))
                .arg(owner)
                .ignore();
        }
        batch.cmd("DEL").arg(&key).ignore();
        batch.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn push_sequence(&self, sequence: Sequence, owner: &str, member: &str) -> GraphResult<()> {
        let key = self.keys().sequence(sequence, owner);
        let mut conn = self.conn.clone();
        cmd("RPUSH").arg(&key).arg(member).query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn remove_from_sequence(&self, sequence: Sequence, owner: &str, member: &str) -> GraphResult<bool> {
        let key = self.keys().sequence(sequence, owner);
        let mut conn = self.conn.clone();
        let removed: i64 = cmd("LREM").arg(&key).arg(0).arg(member).query_async(&mut conn).await?;
        Ok(removed > 0)
    }

    async fn sequence(&self, sequence: Sequence, owner: &str) -> GraphResult<Vec<String>> {
        let key = self.keys().sequence(sequence, owner);
        let mut conn = self.conn.clone();
        let ids: Vec<String> = cmd("LRANGE").arg(&key).arg(0).arg(-1).query_async(&mut conn).await?;
        Ok(ids)
    }

    async fn clear_sequence(&self, sequence: Sequence, owner: &str) -> GraphResult<()> {
        let key = self.keys().sequence(sequence, owner);
        let mut conn = self.conn.clone();
        cmd("DEL").arg(&key).query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn claim_unique(&self, field: UniqueField, value: &str, owner: &str) -> GraphResult<Option<String>> {
        let key = self.keys().unique(field);
        let mut conn = self.conn.clone();
        let claimed: i64 = cmd("HSETNX").arg(&key).arg(value).arg(owner).query_async(&mut conn).await?;
        if claimed > 0 {
            return Ok(None);
        }
        let holder: Option<String> = cmd("HGET").arg(&key).arg(value).query_async(&mut conn).await?;
        Ok(holder.filter(|holder| holder != owner))
    }

    async fn release_unique(&self, field: UniqueField, value: &str, owner: &str) -> GraphResult<()> {
        let key = self.keys().unique(field);
        let mut conn = self.conn.clone();
        let mut invocation = RELEASE_UNIQUE_SCRIPT.prepare_invoke();
        invocation.key(&key).arg(value).arg(owner);
        invocation.invoke_async::<()>(&mut conn).await?;
        Ok(())
    }
}
