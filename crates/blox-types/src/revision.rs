use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::EnvironmentId;

/// A placement attribute an instance must carry to host the environment.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// An attribute matched on presence only.
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }
}

/// Placement constraints for a revision.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceGroup {
    pub attributes: BTreeSet<Attribute>,
}

impl InstanceGroup {
    pub fn new(attributes: impl IntoIterator<Item = Attribute>) -> Self {
        Self {
            attributes: attributes.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// An immutable snapshot of an environment's deployable configuration.
///
/// Revisions are only ever created and deleted. There is no update path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvironmentRevision {
    pub environment_id: EnvironmentId,
    pub environment_revision_id: String,
    pub task_definition: String,
    pub instance_group: InstanceGroup,
    pub created_time: DateTime<Utc>,
    /// Store-managed stamp. `None` until first written.
    pub record_version: Option<u64>,
}

impl EnvironmentRevision {
    /// Generate a fresh, time-ordered revision id (UUID v7).
    pub fn generate_id() -> String {
        uuid::Uuid::now_v7().to_string()
    }
}
