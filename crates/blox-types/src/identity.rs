use std::fmt;

use crate::error::TypeError;

/// Separator joining key components into storage partition keys.
pub const KEY_SEPARATOR: char = '#';

fn validate_component(field: &'static str, value: &str) -> Result<(), TypeError> {
    if value.is_empty() {
        return Err(TypeError::InvalidIdentifier {
            field,
            reason: "must not be empty".into(),
        });
    }
    if value.contains(KEY_SEPARATOR) {
        return Err(TypeError::InvalidIdentifier {
            field,
            reason: format!("must not contain '{KEY_SEPARATOR}'"),
        });
    }
    Ok(())
}

/// An account-scoped cluster.
///
/// Clusters are not stored on their own; they are derived from the
/// environments that live in them.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cluster {
    account_id: String,
    cluster_name: String,
}

impl Cluster {
    /// Create a cluster, rejecting empty components and components that
    /// contain the key separator.
    pub fn new(
        account_id: impl Into<String>,
        cluster_name: impl Into<String>,
    ) -> Result<Self, TypeError> {
        let account_id = account_id.into();
        let cluster_name = cluster_name.into();
        validate_component("account id", &account_id)?;
        validate_component("cluster name", &cluster_name)?;
        Ok(Self {
            account_id,
            cluster_name,
        })
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// Partition key of the environments in this cluster (`account#cluster`).
    pub fn account_id_cluster(&self) -> String {
        format!("{}{KEY_SEPARATOR}{}", self.account_id, self.cluster_name)
    }
}

impl fmt::Debug for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cluster({self})")
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.account_id, self.cluster_name)
    }
}

/// Identity of an environment: account, cluster and environment name.
///
/// Two environments with the same name in different clusters are distinct.
/// The identity doubles as the storage key: the environment row lives under
/// [`account_id_cluster`](Self::account_id_cluster) and its revisions under
/// [`account_id_cluster_environment_name`](Self::account_id_cluster_environment_name).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnvironmentId {
    cluster: Cluster,
    environment_name: String,
}

impl EnvironmentId {
    pub fn new(
        account_id: impl Into<String>,
        cluster_name: impl Into<String>,
        environment_name: impl Into<String>,
    ) -> Result<Self, TypeError> {
        let cluster = Cluster::new(account_id, cluster_name)?;
        Self::in_cluster(cluster, environment_name)
    }

    /// Create an identity for an environment inside an existing cluster.
    pub fn in_cluster(
        cluster: Cluster,
        environment_name: impl Into<String>,
    ) -> Result<Self, TypeError> {
        let environment_name = environment_name.into();
        validate_component("environment name", &environment_name)?;
        Ok(Self {
            cluster,
            environment_name,
        })
    }

    pub fn account_id(&self) -> &str {
        self.cluster.account_id()
    }

    pub fn cluster_name(&self) -> &str {
        self.cluster.cluster_name()
    }

    pub fn environment_name(&self) -> &str {
        &self.environment_name
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    /// Partition key of the environment row (`account#cluster`).
    pub fn account_id_cluster(&self) -> String {
        self.cluster.account_id_cluster()
    }

    /// Partition key shared by all revisions of this environment
    /// (`account#cluster#name`).
    pub fn account_id_cluster_environment_name(&self) -> String {
        format!(
            "{}{KEY_SEPARATOR}{}",
            self.cluster.account_id_cluster(),
            self.environment_name
        )
    }
}

impl fmt::Debug for EnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnvironmentId({self})")
    }
}

impl fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.cluster, self.environment_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn partition_keys_use_separator() {
        let id = EnvironmentId::new("123456789012", "mycluster", "myenv").unwrap();
        assert_eq!(id.account_id_cluster(), "123456789012#mycluster");
        assert_eq!(
            id.account_id_cluster_environment_name(),
            "123456789012#mycluster#myenv"
        );
    }

    #[test]
    fn same_name_in_different_clusters_is_distinct() {
        let a = EnvironmentId::new("123456789012", "cluster1", "env").unwrap();
        let b = EnvironmentId::new("123456789012", "cluster2", "env").unwrap();
        assert_ne!(a, b);
        assert_ne!(a.account_id_cluster(), b.account_id_cluster());
    }

    #[test]
    fn rejects_empty_components() {
        let err = EnvironmentId::new("", "cluster", "env").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidIdentifier {
                field: "account id",
                reason: "must not be empty".into(),
            }
        );
        assert!(EnvironmentId::new("acct", "", "env").is_err());
        assert!(EnvironmentId::new("acct", "cluster", "").is_err());
    }

    #[test]
    fn rejects_separator_in_components() {
        assert!(Cluster::new("acct", "a#b").is_err());
        assert!(EnvironmentId::new("acct", "cluster", "env#1").is_err());
    }

    #[test]
    fn display_format() {
        let id = EnvironmentId::new("123456789012", "mycluster", "myenv").unwrap();
        assert_eq!(format!("{id}"), "123456789012/mycluster/myenv");
        assert_eq!(format!("{}", id.cluster()), "123456789012/mycluster");
    }

    proptest! {
        #[test]
        fn environment_key_extends_cluster_key(
            account in "[0-9]{12}",
            cluster in "[A-Za-z0-9_-]{1,32}",
            name in "[A-Za-z0-9_-]{1,32}",
        ) {
            let id = EnvironmentId::new(&account, &cluster, &name).unwrap();
            let revisions_key = id.account_id_cluster_environment_name();
            let expected = format!("{}#{}", id.account_id_cluster(), name);
            prop_assert_eq!(revisions_key, expected);
            prop_assert_eq!(id.cluster().account_id(), account.as_str());
        }
    }
}
