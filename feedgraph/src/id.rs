use std::sync::LazyLock;

use nanoid::nanoid;
use regex::Regex;

/// Entity ids are lowercase hex so they stay interchangeable with 12-byte object ids.
const ENTITY_ID_ALPHABET: &[char] = &[
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f',
];
/// Default entity id length.
const ENTITY_ID_LENGTH: usize = 24;

static ENTITY_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{24}$").expect("valid id pattern"));

/// Generates a new entity identifier using the configured alphabet and length.
pub fn generate_entity_id() -> String {
    nanoid!(ENTITY_ID_LENGTH, ENTITY_ID_ALPHABET)
}

/// Returns `true` if `value` has the shape of an entity id.
pub fn is_valid_entity_id(value: &str) -> bool {
    ENTITY_ID_PATTERN.is_match(value)
}
