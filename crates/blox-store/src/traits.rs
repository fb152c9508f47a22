use crate::error::StoreResult;
use crate::item::{AttributeValue, Item, ItemKey};

/// Single-item conditional key-value store.
///
/// All implementations must satisfy these invariants:
/// - Each operation touches at most one item and is linearizable per key.
/// - Every successful put stamps the table's version attribute with the
///   stored version plus one, or `1` if no item existed. The version carried
///   by the caller's item is ignored.
/// - A failed condition returns [`StoreError::ConditionalCheckFailed`] and
///   leaves the stored item unchanged.
/// - Query and scan results are ordered by primary key; index queries are
///   ordered by index sort key, then primary key.
/// - Infrastructure failures surface as [`StoreError::Unavailable`] and are
///   never retried by the store.
///
/// Puts return the item as stored, version stamp included.
///
/// [`StoreError::ConditionalCheckFailed`]: crate::StoreError::ConditionalCheckFailed
/// [`StoreError::Unavailable`]: crate::StoreError::Unavailable
pub trait KeyValueStore: Send + Sync {
    /// Point read. Returns `Ok(None)` if no item has this key.
    fn get(&self, table: &str, key: &ItemKey) -> StoreResult<Option<Item>>;

    /// Insert only if no item with the same key exists.
    fn put_if_absent(&self, table: &str, item: Item) -> StoreResult<Item>;

    /// Unconditional overwrite.
    fn put_clobber(&self, table: &str, item: Item) -> StoreResult<Item>;

    /// Overwrite only if an item exists and its `field` equals `expected`.
    fn put_if_field_equals(
        &self,
        table: &str,
        item: Item,
        field: &str,
        expected: &AttributeValue,
    ) -> StoreResult<Item>;

    /// Overwrite only if an item exists and its version equals
    /// `expected_version`.
    fn put_if_version_matches(
        &self,
        table: &str,
        item: Item,
        expected_version: u64,
    ) -> StoreResult<Item>;

    /// Unconditional delete. Returns `true` if the item existed.
    fn delete(&self, table: &str, key: &ItemKey) -> StoreResult<bool>;

    /// All items in `partition` whose sort key starts with `sort_prefix`
    /// (every item in the partition when `None`).
    fn query(
        &self,
        table: &str,
        partition: &str,
        sort_prefix: Option<&str>,
    ) -> StoreResult<Vec<Item>>;

    /// Like [`query`](Self::query), but against a secondary index.
    fn query_index(
        &self,
        table: &str,
        index: &str,
        partition: &str,
        sort_prefix: Option<&str>,
    ) -> StoreResult<Vec<Item>>;

    /// Every item in the table.
    fn scan(&self, table: &str) -> StoreResult<Vec<Item>>;
}
