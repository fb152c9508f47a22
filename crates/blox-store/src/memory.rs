use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::item::{AttributeValue, Item, ItemKey};
use crate::schema::TableSchema;
use crate::traits::KeyValueStore;

type Tables = HashMap<String, BTreeMap<ItemKey, Item>>;

/// In-memory, `BTreeMap`-based key-value store.
///
/// Intended for tests and embedding. Every table is a `BTreeMap` ordered by
/// primary key; all tables share one `RwLock`, which makes each operation
/// trivially linearizable. Items are cloned on read and write.
pub struct InMemoryKeyValueStore {
    schemas: HashMap<String, TableSchema>,
    tables: RwLock<Tables>,
}

impl InMemoryKeyValueStore {
    /// Create a store with the given tables provisioned and empty.
    pub fn new(schemas: impl IntoIterator<Item = TableSchema>) -> Self {
        let schemas: HashMap<String, TableSchema> = schemas
            .into_iter()
            .map(|schema| (schema.name.clone(), schema))
            .collect();
        let tables = schemas
            .keys()
            .map(|name| (name.clone(), BTreeMap::new()))
            .collect();
        Self {
            schemas,
            tables: RwLock::new(tables),
        }
    }

    fn schema(&self, table: &str) -> StoreResult<&TableSchema> {
        self.schemas
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))
    }

    fn read_tables(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write_tables(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    /// Shared write path: check `condition` against the stored item, then
    /// stamp the next version and store.
    fn put_when<F>(&self, table: &str, mut item: Item, condition: F) -> StoreResult<Item>
    where
        F: FnOnce(Option<&Item>, &TableSchema) -> bool,
    {
        let schema = self.schema(table)?;
        let key = schema.key_of(&item)?;

        let mut tables = self.write_tables()?;
        let items = tables.entry(table.to_string()).or_default();
        let existing = items.get(&key);
        if !condition(existing, schema) {
            debug!(table, %key, "conditional check failed");
            return Err(StoreError::ConditionalCheckFailed {
                table: table.to_string(),
                key,
            });
        }

        let version = existing.map_or(0, |stored| schema.version_of(stored)) + 1;
        item.set(schema.version_attribute.clone(), version);
        items.insert(key.clone(), item.clone());
        debug!(table, %key, version, "item written");
        Ok(item)
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, table: &str, key: &ItemKey) -> StoreResult<Option<Item>> {
        self.schema(table)?;
        let tables = self.read_tables()?;
        Ok(tables.get(table).and_then(|items| items.get(key)).cloned())
    }

    fn put_if_absent(&self, table: &str, item: Item) -> StoreResult<Item> {
        self.put_when(table, item, |existing, _| existing.is_none())
    }

    fn put_clobber(&self, table: &str, item: Item) -> StoreResult<Item> {
        self.put_when(table, item, |_, _| true)
    }

    fn put_if_field_equals(
        &self,
        table: &str,
        item: Item,
        field: &str,
        expected: &AttributeValue,
    ) -> StoreResult<Item> {
        self.put_when(table, item, |existing, _| {
            existing.and_then(|stored| stored.get(field)) == Some(expected)
        })
    }

    fn put_if_version_matches(
        &self,
        table: &str,
        item: Item,
        expected_version: u64,
    ) -> StoreResult<Item> {
        self.put_when(table, item, |existing, schema| {
            existing.is_some_and(|stored| schema.version_of(stored) == expected_version)
        })
    }

    fn delete(&self, table: &str, key: &ItemKey) -> StoreResult<bool> {
        self.schema(table)?;
        let mut tables = self.write_tables()?;
        let removed = tables
            .get_mut(table)
            .is_some_and(|items| items.remove(key).is_some());
        debug!(table, %key, removed, "item deleted");
        Ok(removed)
    }

    fn query(
        &self,
        table: &str,
        partition: &str,
        sort_prefix: Option<&str>,
    ) -> StoreResult<Vec<Item>> {
        self.schema(table)?;
        let tables = self.read_tables()?;
        let Some(items) = tables.get(table) else {
            return Ok(Vec::new());
        };
        let prefix = sort_prefix.unwrap_or("");
        Ok(items
            .range(ItemKey::new(partition, "")..)
            .take_while(|(key, _)| key.partition == partition)
            .filter(|(key, _)| key.sort.starts_with(prefix))
            .map(|(_, item)| item.clone())
            .collect())
    }

    fn query_index(
        &self,
        table: &str,
        index: &str,
        partition: &str,
        sort_prefix: Option<&str>,
    ) -> StoreResult<Vec<Item>> {
        let index = self.schema(table)?.index(index)?;
        let tables = self.read_tables()?;
        let Some(items) = tables.get(table) else {
            return Ok(Vec::new());
        };
        let prefix = sort_prefix.unwrap_or("");
        let mut matched: Vec<(ItemKey, Item)> = items
            .values()
            .filter_map(|item| index.key_of(item).map(|key| (key, item)))
            .filter(|(key, _)| key.partition == partition && key.sort.starts_with(prefix))
            .map(|(key, item)| (key, item.clone()))
            .collect();
        // Stable sort keeps primary-key order among equal index keys.
        matched.sort_by(|(a, _), (b, _)| a.sort.cmp(&b.sort));
        Ok(matched.into_iter().map(|(_, item)| item).collect())
    }

    fn scan(&self, table: &str) -> StoreResult<Vec<Item>> {
        self.schema(table)?;
        let tables = self.read_tables()?;
        Ok(tables
            .get(table)
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default())
    }
}

impl std::fmt::Debug for InMemoryKeyValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tables: Vec<&String> = self.schemas.keys().collect();
        tables.sort();
        f.debug_struct("InMemoryKeyValueStore")
            .field("tables", &tables)
            .finish()
    }
}
