use serde::{Deserialize, Serialize};

use blox_store::{IndexSchema, TableSchema};

use crate::mapping::{environment_record as env, revision_record as rev};

/// Table and index names used by the environment repository.
///
/// Every field has a default, so a TOML document only needs the names it
/// overrides (for example per-stage table prefixes).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub environments_table: String,
    pub environment_revisions_table: String,
    /// Index on the environments table keyed by account, ranged by cluster.
    pub environment_cluster_index: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            environments_table: "Environments".into(),
            environment_revisions_table: "EnvironmentRevisions".into(),
            environment_cluster_index: "environmentClusterIndex".into(),
        }
    }
}

impl RepositoryConfig {
    /// Parse a configuration from a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Schemas of the tables this configuration names, for provisioning a
    /// store.
    pub fn table_schemas(&self) -> Vec<TableSchema> {
        vec![
            TableSchema::new(
                self.environments_table.as_str(),
                env::ACCOUNT_ID_CLUSTER,
                env::ENVIRONMENT_NAME,
                env::RECORD_VERSION,
            )
            .with_index(IndexSchema::new(
                self.environment_cluster_index.as_str(),
                env::ACCOUNT_ID,
                env::CLUSTER_NAME,
            )),
            TableSchema::new(
                self.environment_revisions_table.as_str(),
                rev::ACCOUNT_ID_CLUSTER_ENVIRONMENT_NAME,
                rev::ENVIRONMENT_REVISION_ID,
                rev::RECORD_VERSION,
            ),
        ]
    }
}
