//! Translation between domain entities and stored items.
//!
//! Every attribute is written and read by hand. Enumerations use their fixed
//! string tables, timestamps are RFC 3339 strings, and the instance-group
//! attribute set is a JSON string. Anything unreadable is a [`MappingError`];
//! nothing is silently defaulted.

use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use blox_store::{Item, ItemKey};
use blox_types::{
    Attribute, Cluster, Environment, EnvironmentId, EnvironmentRevision, InstanceGroup, TypeError,
};

/// Attribute names of the environments table.
pub mod environment_record {
    /// Partition key: `account#cluster`.
    pub const ACCOUNT_ID_CLUSTER: &str = "accountIdCluster";
    /// Sort key.
    pub const ENVIRONMENT_NAME: &str = "environmentName";
    /// Cluster index partition key.
    pub const ACCOUNT_ID: &str = "accountId";
    /// Cluster index sort key.
    pub const CLUSTER_NAME: &str = "clusterName";
    pub const RECORD_VERSION: &str = "recordVersion";
    pub const ROLE: &str = "role";
    pub const TASK_DEFINITION: &str = "taskDefinition";
    pub const TYPE: &str = "type";
    pub const STATUS: &str = "status";
    pub const HEALTH: &str = "health";
    pub const CREATED_TIME: &str = "createdTime";
    pub const LAST_UPDATED_TIME: &str = "lastUpdatedTime";
    pub const LATEST_ENVIRONMENT_REVISION_ID: &str = "latestEnvironmentRevisionId";
    pub const ACTIVE_ENVIRONMENT_REVISION_ID: &str = "activeEnvironmentRevisionId";
    pub const DEPLOYMENT_METHOD: &str = "deploymentMethod";
    pub const VALID_ENVIRONMENT: &str = "validEnvironment";
}

/// Attribute names of the environment revisions table.
pub mod revision_record {
    /// Partition key: `account#cluster#environment`.
    pub const ACCOUNT_ID_CLUSTER_ENVIRONMENT_NAME: &str = "accountIdClusterEnvironmentName";
    /// Sort key.
    pub const ENVIRONMENT_REVISION_ID: &str = "environmentRevisionId";
    pub const ACCOUNT_ID: &str = "accountId";
    pub const CLUSTER_NAME: &str = "clusterName";
    pub const ENVIRONMENT_NAME: &str = "environmentName";
    pub const RECORD_VERSION: &str = "recordVersion";
    pub const TASK_DEFINITION: &str = "taskDefinition";
    pub const ATTRIBUTES: &str = "attributes";
    pub const CREATED_TIME: &str = "createdTime";
}

use environment_record as env;
use revision_record as rev;

/// A stored item could not be turned into a domain entity.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("record is missing attribute {0}")]
    MissingAttribute(&'static str),

    #[error("attribute {attribute} holds an invalid value: {source}")]
    InvalidValue {
        attribute: &'static str,
        #[source]
        source: TypeError,
    },

    #[error("attribute {attribute} is not an RFC 3339 timestamp: {source}")]
    InvalidTimestamp {
        attribute: &'static str,
        #[source]
        source: chrono::ParseError,
    },

    #[error("attribute {attribute} is not a valid attribute set: {source}")]
    InvalidAttributeSet {
        attribute: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Primary key of an environment row.
pub fn environment_key(id: &EnvironmentId) -> ItemKey {
    ItemKey::new(id.account_id_cluster(), id.environment_name())
}

/// Primary key of a revision row.
pub fn revision_key(id: &EnvironmentId, environment_revision_id: &str) -> ItemKey {
    ItemKey::new(id.account_id_cluster_environment_name(), environment_revision_id)
}

pub fn environment_to_item(environment: &Environment) -> Item {
    let id = &environment.id;
    Item::new()
        .with(env::ACCOUNT_ID_CLUSTER, id.account_id_cluster())
        .with(env::ENVIRONMENT_NAME, id.environment_name())
        .with(env::ACCOUNT_ID, id.account_id())
        .with(env::CLUSTER_NAME, id.cluster_name())
        .with(env::ROLE, environment.role.as_str())
        .with_opt(env::TASK_DEFINITION, environment.task_definition.as_deref())
        .with(env::TYPE, environment.environment_type.as_str())
        .with(env::STATUS, environment.status.as_str())
        .with(env::HEALTH, environment.health.as_str())
        .with(env::CREATED_TIME, encode_timestamp(&environment.created_time))
        .with(
            env::LAST_UPDATED_TIME,
            encode_timestamp(&environment.last_updated_time),
        )
        .with(
            env::LATEST_ENVIRONMENT_REVISION_ID,
            environment.latest_environment_revision_id.as_str(),
        )
        .with_opt(
            env::ACTIVE_ENVIRONMENT_REVISION_ID,
            environment.active_environment_revision_id.as_deref(),
        )
        .with(env::DEPLOYMENT_METHOD, environment.deployment_method.as_str())
        .with(env::VALID_ENVIRONMENT, environment.valid_environment)
        .with_opt(env::RECORD_VERSION, environment.record_version)
}

pub fn item_to_environment(item: &Item) -> Result<Environment, MappingError> {
    let id = EnvironmentId::new(
        required_s(item, env::ACCOUNT_ID)?,
        required_s(item, env::CLUSTER_NAME)?,
        required_s(item, env::ENVIRONMENT_NAME)?,
    )
    .map_err(|source| MappingError::InvalidValue {
        attribute: env::ENVIRONMENT_NAME,
        source,
    })?;

    Ok(Environment {
        id,
        role: required_s(item, env::ROLE)?.to_string(),
        task_definition: item.get_s(env::TASK_DEFINITION).map(str::to_string),
        environment_type: parse_enum(item, env::TYPE)?,
        status: parse_enum(item, env::STATUS)?,
        health: parse_enum(item, env::HEALTH)?,
        created_time: required_timestamp(item, env::CREATED_TIME)?,
        last_updated_time: required_timestamp(item, env::LAST_UPDATED_TIME)?,
        latest_environment_revision_id: required_s(item, env::LATEST_ENVIRONMENT_REVISION_ID)?
            .to_string(),
        active_environment_revision_id: item
            .get_s(env::ACTIVE_ENVIRONMENT_REVISION_ID)
            .map(str::to_string),
        deployment_method: required_s(item, env::DEPLOYMENT_METHOD)?.to_string(),
        valid_environment: item
            .get_bool(env::VALID_ENVIRONMENT)
            .ok_or(MappingError::MissingAttribute(env::VALID_ENVIRONMENT))?,
        record_version: item.get_n(env::RECORD_VERSION),
    })
}

pub fn revision_to_item(revision: &EnvironmentRevision) -> Result<Item, MappingError> {
    let id = &revision.environment_id;
    let attributes = serde_json::to_string(&revision.instance_group.attributes).map_err(
        |source| MappingError::InvalidAttributeSet {
            attribute: rev::ATTRIBUTES,
            source,
        },
    )?;

    Ok(Item::new()
        .with(
            rev::ACCOUNT_ID_CLUSTER_ENVIRONMENT_NAME,
            id.account_id_cluster_environment_name(),
        )
        .with(
            rev::ENVIRONMENT_REVISION_ID,
            revision.environment_revision_id.as_str(),
        )
        .with(rev::ACCOUNT_ID, id.account_id())
        .with(rev::CLUSTER_NAME, id.cluster_name())
        .with(rev::ENVIRONMENT_NAME, id.environment_name())
        .with(rev::TASK_DEFINITION, revision.task_definition.as_str())
        .with(rev::ATTRIBUTES, attributes)
        .with(rev::CREATED_TIME, encode_timestamp(&revision.created_time))
        .with_opt(rev::RECORD_VERSION, revision.record_version))
}

pub fn item_to_revision(item: &Item) -> Result<EnvironmentRevision, MappingError> {
    let environment_id = EnvironmentId::new(
        required_s(item, rev::ACCOUNT_ID)?,
        required_s(item, rev::CLUSTER_NAME)?,
        required_s(item, rev::ENVIRONMENT_NAME)?,
    )
    .map_err(|source| MappingError::InvalidValue {
        attribute: rev::ENVIRONMENT_NAME,
        source,
    })?;

    let attributes: BTreeSet<Attribute> = serde_json::from_str(required_s(item, rev::ATTRIBUTES)?)
        .map_err(|source| MappingError::InvalidAttributeSet {
            attribute: rev::ATTRIBUTES,
            source,
        })?;

    Ok(EnvironmentRevision {
        environment_id,
        environment_revision_id: required_s(item, rev::ENVIRONMENT_REVISION_ID)?.to_string(),
        task_definition: required_s(item, rev::TASK_DEFINITION)?.to_string(),
        instance_group: InstanceGroup { attributes },
        created_time: required_timestamp(item, rev::CREATED_TIME)?,
        record_version: item.get_n(rev::RECORD_VERSION),
    })
}

/// Cluster projected by the cluster index from an environment row.
pub fn item_to_cluster(item: &Item) -> Result<Cluster, MappingError> {
    Cluster::new(
        required_s(item, env::ACCOUNT_ID)?,
        required_s(item, env::CLUSTER_NAME)?,
    )
    .map_err(|source| MappingError::InvalidValue {
        attribute: env::CLUSTER_NAME,
        source,
    })
}

fn required_s<'a>(item: &'a Item, attribute: &'static str) -> Result<&'a str, MappingError> {
    item.get_s(attribute)
        .ok_or(MappingError::MissingAttribute(attribute))
}

fn parse_enum<T>(item: &Item, attribute: &'static str) -> Result<T, MappingError>
where
    T: std::str::FromStr<Err = TypeError>,
{
    required_s(item, attribute)?
        .parse()
        .map_err(|source| MappingError::InvalidValue { attribute, source })
}

fn encode_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn required_timestamp(
    item: &Item,
    attribute: &'static str,
) -> Result<DateTime<Utc>, MappingError> {
    DateTime::parse_from_rfc3339(required_s(item, attribute)?)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|source| MappingError::InvalidTimestamp { attribute, source })
}
