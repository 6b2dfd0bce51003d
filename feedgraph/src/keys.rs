//! Key layout shared by the storage backends.
//!
//! ```text
//! {prefix}:{service}:{collection}:{id}        entity record
//! {prefix}:{service}:rel:{alias}:{owner}      relation set
//! {prefix}:{service}:rel:{alias}_reverse:{id} owners whose set holds id
//! {prefix}:{service}:seq:{alias}:{owner}      ordered id list
//! {prefix}:{service}:unique:{field}           value -> owner hash
//! ```

use crate::types::{Entity, Relation, Sequence, UniqueField};

#[derive(Debug, Clone, Copy)]
pub struct KeyContext<'a> {
    pub prefix: &'a str,
    pub service: &'a str,
}

impl<'a> KeyContext<'a> {
    pub fn new(prefix: &'a str, service: &'a str) -> Self {
        Self { prefix, service }
    }

    fn scoped(&self, rest: std::fmt::Arguments<'_>) -> String {
        format!("{}:{}:{rest}", self.prefix, self.service)
    }

    pub fn entity<T: Entity>(&self, id: &str) -> String {
        self.scoped(format_args!("{}:{id}", T::COLLECTION))
    }

    pub fn relation(&self, relation: Relation, owner: &str) -> String {
        self.scoped(format_args!("rel:{}:{owner}", relation.alias()))
    }

    pub fn relation_reverse(&self, relation: Relation, member: &str) -> String {
        self.scoped(format_args!("rel:{}_reverse:{member}", relation.alias()))
    }

    pub fn sequence(&self, sequence: Sequence, owner: &str) -> String {
        self.scoped(format_args!("seq:{}:{owner}", sequence.alias()))
    }

    pub fn unique(&self, field: UniqueField) -> String {
        self.scoped(format_args!("unique:{}", field.alias()))
    }

    /// Glob matching every key written under this prefix.
    pub fn prefix_pattern(&self) -> String {
        format!("{}:*", self.prefix)
    }
}
