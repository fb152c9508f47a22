//! Conditional-write key-value storage for the Blox data service.
//!
//! This crate models the subset of a DynamoDB-style store that the
//! environment repository relies on: single-item reads, single-item
//! conditional writes, partition queries, and a sparse secondary index. There
//! are no multi-item transactions.
//!
//! # Items
//!
//! - [`Item`] -- an attribute map; key attributes are named by the table schema
//! - [`AttributeValue`] -- string, number or boolean attribute
//! - [`ItemKey`] -- partition key + sort key of an item
//!
//! # Storage Backends
//!
//! All backends implement the [`KeyValueStore`] trait:
//!
//! - [`InMemoryKeyValueStore`] -- `BTreeMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Every write is a single-item operation and is linearizable per key.
//! 2. Every successful write stamps the table's version attribute with the
//!    previous version plus one (or `1` for a fresh item). Callers never set it.
//! 3. A failed condition leaves the stored item untouched and surfaces as
//!    [`StoreError::ConditionalCheckFailed`].
//! 4. Query results are ordered by sort key.

pub mod error;
pub mod item;
pub mod memory;
pub mod schema;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use item::{AttributeValue, Item, ItemKey};
pub use memory::InMemoryKeyValueStore;
pub use schema::{IndexSchema, TableSchema};
pub use traits::KeyValueStore;
