//! The [`EnvironmentRepository`] trait defining the persistence interface.
//!
//! The API layer and the scheduler only ever talk to this trait; the
//! store-backed implementation lives in [`crate::repository`].

use blox_types::{Cluster, Environment, EnvironmentId, EnvironmentRevision};

use crate::error::Result;

/// Persistence for environments and their revisions.
///
/// Environments that were never committed (`valid_environment == false`),
/// and their revisions, are invisible through every method except
/// [`create_environment_and_revision`](Self::create_environment_and_revision),
/// which replaces them.
pub trait EnvironmentRepository: Send + Sync {
    /// Create an environment together with its first revision.
    ///
    /// The caller passes the environment with `valid_environment == false`
    /// and `latest_environment_revision_id` set to the revision's id. The
    /// returned environment is committed.
    ///
    /// Fails with `AlreadyExists` if a committed environment (or a revision
    /// with the same id) exists, and with `Internal` if a concurrent creation
    /// replaced the row before this one could commit.
    fn create_environment_and_revision(
        &self,
        environment: &Environment,
        revision: &EnvironmentRevision,
    ) -> Result<Environment>;

    /// Create a revision for an existing environment. Revisions are
    /// immutable: an existing id fails with `AlreadyExists`.
    fn create_environment_revision(
        &self,
        revision: &EnvironmentRevision,
    ) -> Result<EnvironmentRevision>;

    fn get_environment(&self, id: &EnvironmentId) -> Result<Environment>;

    /// Write new field values with an optimistic-concurrency check.
    ///
    /// If `environment.record_version` is set it must match the stored
    /// version; otherwise the version read at the start of the call is used.
    /// A concurrent write in between fails with `Internal`.
    fn update_environment(&self, environment: &Environment) -> Result<Environment>;

    /// Fails with `NotFound` for the environment if it is missing or
    /// uncommitted, and for the revision if only the revision is missing.
    fn get_environment_revision(
        &self,
        id: &EnvironmentId,
        environment_revision_id: &str,
    ) -> Result<EnvironmentRevision>;

    /// All revisions of a committed environment, ordered by revision id.
    fn list_environment_revisions(&self, id: &EnvironmentId) -> Result<Vec<EnvironmentRevision>>;

    /// Unconditional delete; deleting an absent revision succeeds.
    fn delete_environment_revision(&self, revision: &EnvironmentRevision) -> Result<()>;

    /// Committed environments in `cluster`, ordered by name, optionally
    /// restricted to names starting with `environment_name_prefix`.
    fn list_environments(
        &self,
        cluster: &Cluster,
        environment_name_prefix: Option<&str>,
    ) -> Result<Vec<Environment>>;

    /// Distinct clusters that contain at least one committed environment.
    ///
    /// With an account, lists that account's clusters (optionally by cluster
    /// name prefix). Without one, lists every cluster; a prefix then fails
    /// with `InvalidParameter`.
    fn list_clusters(
        &self,
        account_id: Option<&str>,
        cluster_name_prefix: Option<&str>,
    ) -> Result<Vec<Cluster>>;

    /// Unconditional delete of the environment row only. Revisions must be
    /// deleted first by the caller.
    fn delete_environment(&self, id: &EnvironmentId) -> Result<()>;
}
