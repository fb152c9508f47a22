use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::item::{Item, ItemKey};

/// A secondary index over a table.
///
/// Indexes are sparse: items lacking either index attribute as a string are
/// not visible through the index. Indexes are derived from the table and are
/// never written directly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    pub name: String,
    pub partition_key: String,
    pub sort_key: String,
}

impl IndexSchema {
    pub fn new(
        name: impl Into<String>,
        partition_key: impl Into<String>,
        sort_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
        }
    }

    /// Index key of an item, or `None` if the item is not projected.
    pub fn key_of(&self, item: &Item) -> Option<ItemKey> {
        let partition = item.get_s(&self.partition_key)?;
        let sort = item.get_s(&self.sort_key)?;
        Some(ItemKey::new(partition, sort))
    }
}

/// Key layout of a table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    /// Attribute holding the partition key.
    pub partition_key: String,
    /// Attribute holding the sort key.
    pub sort_key: String,
    /// Attribute the store stamps with the item version on every write.
    pub version_attribute: String,
    #[serde(default)]
    pub indexes: Vec<IndexSchema>,
}

impl TableSchema {
    pub fn new(
        name: impl Into<String>,
        partition_key: impl Into<String>,
        sort_key: impl Into<String>,
        version_attribute: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
            version_attribute: version_attribute.into(),
            indexes: Vec::new(),
        }
    }

    /// Add a secondary index.
    pub fn with_index(mut self, index: IndexSchema) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn index(&self, name: &str) -> StoreResult<&IndexSchema> {
        self.indexes
            .iter()
            .find(|index| index.name == name)
            .ok_or_else(|| StoreError::UnknownIndex {
                table: self.name.clone(),
                index: name.to_string(),
            })
    }

    /// Primary key of an item under this schema.
    pub fn key_of(&self, item: &Item) -> StoreResult<ItemKey> {
        let partition = self.key_attribute(item, &self.partition_key)?;
        let sort = self.key_attribute(item, &self.sort_key)?;
        Ok(ItemKey::new(partition, sort))
    }

    /// Version stamp of a stored item (`0` if never stamped).
    pub fn version_of(&self, item: &Item) -> u64 {
        item.get_n(&self.version_attribute).unwrap_or(0)
    }

    fn key_attribute<'a>(&self, item: &'a Item, attribute: &str) -> StoreResult<&'a str> {
        item.get_s(attribute)
            .ok_or_else(|| StoreError::MissingKeyAttribute {
                table: self.name.clone(),
                attribute: attribute.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> TableSchema {
        TableSchema::new("Things", "pk", "sk", "version")
            .with_index(IndexSchema::new("byOwner", "owner", "name"))
    }

    #[test]
    fn key_of_reads_key_attributes() {
        let item = Item::new().with("pk", "p").with("sk", "s");
        assert_eq!(schema().key_of(&item).unwrap(), ItemKey::new("p", "s"));
    }

    #[test]
    fn key_of_rejects_missing_or_non_string_key() {
        let missing = Item::new().with("pk", "p");
        assert!(matches!(
            schema().key_of(&missing),
            Err(StoreError::MissingKeyAttribute { attribute, .. }) if attribute == "sk"
        ));

        let numeric = Item::new().with("pk", "p").with("sk", 7u64);
        assert!(schema().key_of(&numeric).is_err());
    }

    #[test]
    fn index_lookup() {
        let schema = schema();
        assert_eq!(schema.index("byOwner").unwrap().partition_key, "owner");
        assert!(matches!(
            schema.index("nope"),
            Err(StoreError::UnknownIndex { .. })
        ));
    }

    #[test]
    fn sparse_index_skips_unprojected_items() {
        let schema = schema();
        let index = schema.index("byOwner").unwrap();
        let projected = Item::new().with("owner", "o").with("name", "n");
        let unprojected = Item::new().with("owner", "o");
        assert_eq!(index.key_of(&projected), Some(ItemKey::new("o", "n")));
        assert_eq!(index.key_of(&unprojected), None);
    }

    #[test]
    fn version_defaults_to_zero() {
        let schema = schema();
        assert_eq!(schema.version_of(&Item::new()), 0);
        assert_eq!(schema.version_of(&Item::new().with("version", 4u64)), 4);
    }
}
