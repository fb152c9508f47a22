//! Store-backed [`EnvironmentRepository`].
//!
//! The store only offers single-item conditional writes, so creating an
//! environment together with its first revision is a small saga with the
//! environment row's `validEnvironment` flag as the commit marker:
//!
//! 1. insert the environment row uncommitted (`validEnvironment = false`);
//! 2. on collision, fail if the existing row is committed; otherwise it is
//!    the leftover of an interrupted creation, so delete its revisions and
//!    overwrite it;
//! 3. insert the revision;
//! 4. commit by rewriting the row with `validEnvironment = true`, on the
//!    condition that it still points at the revision from step 3.
//!
//! Recovery in step 2 is not fenced: two creators that both find the same
//! uncommitted row can both overwrite it. The loser of that race fails in
//! step 4, but a creator that already committed can still be overwritten by
//! a recoverer that read the row before the commit landed.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use blox_store::{AttributeValue, Item, KeyValueStore};
use blox_types::{Cluster, Environment, EnvironmentId, EnvironmentRevision};

use crate::config::RepositoryConfig;
use crate::error::{RepositoryError, ResourceType, Result};
use crate::mapping::{self, environment_record as env, revision_record as rev};
use crate::traits::EnvironmentRepository;

/// [`EnvironmentRepository`] over any [`KeyValueStore`].
///
/// Holds no state besides the store handle and table names; all
/// coordination happens through the store's conditional writes.
#[derive(Debug)]
pub struct StoreEnvironmentRepository<S> {
    store: S,
    config: RepositoryConfig,
}

impl<S: KeyValueStore> StoreEnvironmentRepository<S> {
    pub fn new(store: S, config: RepositoryConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    fn environments(&self) -> &str {
        &self.config.environments_table
    }

    fn revisions(&self) -> &str {
        &self.config.environment_revisions_table
    }

    /// Step 2 of creation: the environment row already exists.
    fn replace_uncommitted_environment(
        &self,
        environment: &Environment,
        pending: Item,
    ) -> Result<()> {
        let id = &environment.id;
        let existing = self
            .store
            .get(self.environments(), &mapping::environment_key(id))
            .map_err(|e| {
                RepositoryError::internal(format!("could not read environment {id}"), e)
            })?;

        let Some(existing) = existing else {
            // Deleted between the insert and the read: one more insert.
            debug!(environment = %id, "existing environment vanished; retrying insert");
            return self
                .store
                .put_if_absent(self.environments(), pending)
                .map(|_| ())
                .map_err(|e| {
                    RepositoryError::internal(
                        format!("environment {id} is being created concurrently"),
                        e,
                    )
                });
        };

        if existing.get_bool(env::VALID_ENVIRONMENT) == Some(true) {
            return Err(RepositoryError::already_exists(
                ResourceType::Environment,
                id,
            ));
        }

        warn!(
            environment = %id,
            stale_revision = existing
                .get_s(env::LATEST_ENVIRONMENT_REVISION_ID)
                .unwrap_or(""),
            "replacing uncommitted environment left by an interrupted creation"
        );
        self.delete_orphaned_revisions(id);

        self.store
            .put_clobber(self.environments(), pending)
            .map(|_| ())
            .map_err(|e| {
                RepositoryError::internal(
                    format!("could not save record with environment id {id}"),
                    e,
                )
            })
    }

    /// Best effort: failures are logged and skipped.
    fn delete_orphaned_revisions(&self, id: &EnvironmentId) {
        let partition = id.account_id_cluster_environment_name();
        let orphans = match self.store.query(self.revisions(), &partition, None) {
            Ok(items) => items,
            Err(error) => {
                warn!(
                    environment = %id,
                    %error,
                    "could not list orphaned revisions; skipping cleanup"
                );
                return;
            }
        };

        let mut deleted = 0usize;
        for orphan in &orphans {
            let Some(revision_id) = orphan.get_s(rev::ENVIRONMENT_REVISION_ID) else {
                warn!(environment = %id, "orphaned revision without revision id; skipping");
                continue;
            };
            match self
                .store
                .delete(self.revisions(), &mapping::revision_key(id, revision_id))
            {
                Ok(_) => deleted += 1,
                Err(error) => {
                    warn!(
                        environment = %id,
                        revision = revision_id,
                        %error,
                        "could not delete orphaned revision; skipping"
                    );
                }
            }
        }
        info!(
            environment = %id,
            found = orphans.len(),
            deleted,
            "orphaned revisions cleaned up"
        );
    }

    fn put_revision(&self, revision: &EnvironmentRevision) -> Result<Item> {
        let revision_id = &revision.environment_revision_id;
        let item = mapping::revision_to_item(revision).map_err(|e| {
            RepositoryError::internal(
                format!("could not map environment revision {revision_id}"),
                e,
            )
        })?;

        self.store
            .put_if_absent(self.revisions(), item)
            .map_err(|e| {
                if e.is_conditional_check_failed() {
                    RepositoryError::already_exists(ResourceType::EnvironmentRevision, revision_id)
                } else {
                    RepositoryError::internal(
                        format!("could not save record with environment revision id {revision_id}"),
                        e,
                    )
                }
            })
    }

    /// Read an environment row, committed or not.
    fn load_environment(&self, id: &EnvironmentId) -> Result<Option<Environment>> {
        let item = self
            .store
            .get(self.environments(), &mapping::environment_key(id))
            .map_err(|e| {
                RepositoryError::internal(format!("could not read environment {id}"), e)
            })?;
        item.as_ref().map(to_environment).transpose()
    }

    /// Revisions are only visible through a committed environment.
    fn require_committed(&self, id: &EnvironmentId) -> Result<()> {
        self.get_environment(id).map(|_| ())
    }
}

fn to_environment(item: &Item) -> Result<Environment> {
    mapping::item_to_environment(item)
        .map_err(|e| RepositoryError::internal("could not map environment record", e))
}

fn to_revision(item: &Item) -> Result<EnvironmentRevision> {
    mapping::item_to_revision(item)
        .map_err(|e| RepositoryError::internal("could not map environment revision record", e))
}

fn check_creation_preconditions(
    environment: &Environment,
    revision: &EnvironmentRevision,
) -> Result<()> {
    if environment.valid_environment {
        return Err(RepositoryError::InvalidParameter(
            "environment must not be marked valid before its revision exists".into(),
        ));
    }
    if environment.latest_environment_revision_id != revision.environment_revision_id {
        return Err(RepositoryError::InvalidParameter(format!(
            "latest environment revision id {} does not match revision {}",
            environment.latest_environment_revision_id, revision.environment_revision_id
        )));
    }
    if environment.id != revision.environment_id {
        return Err(RepositoryError::InvalidParameter(format!(
            "revision belongs to {}, not {}",
            revision.environment_id, environment.id
        )));
    }
    Ok(())
}

impl<S: KeyValueStore> EnvironmentRepository for StoreEnvironmentRepository<S> {
    fn create_environment_and_revision(
        &self,
        environment: &Environment,
        revision: &EnvironmentRevision,
    ) -> Result<Environment> {
        check_creation_preconditions(environment, revision)?;
        let id = &environment.id;
        let revision_id = &revision.environment_revision_id;
        let pending = mapping::environment_to_item(environment);

        match self.store.put_if_absent(self.environments(), pending.clone()) {
            Ok(_) => debug!(environment = %id, "uncommitted environment written"),
            Err(e) if e.is_conditional_check_failed() => {
                self.replace_uncommitted_environment(environment, pending)?
            }
            Err(e) => {
                return Err(RepositoryError::internal(
                    format!("could not save record with environment id {id}"),
                    e,
                ))
            }
        }

        self.put_revision(revision)?;
        debug!(environment = %id, revision = %revision_id, "revision written");

        let committed = Environment {
            valid_environment: true,
            ..environment.clone()
        };
        let expected = AttributeValue::from(revision_id.as_str());
        let stored = self
            .store
            .put_if_field_equals(
                self.environments(),
                mapping::environment_to_item(&committed),
                env::LATEST_ENVIRONMENT_REVISION_ID,
                &expected,
            )
            .map_err(|e| {
                let message = if e.is_conditional_check_failed() {
                    format!(
                        "environment {id} was replaced by a concurrent creation \
                         before it could be committed"
                    )
                } else {
                    format!("could not commit environment {id}")
                };
                RepositoryError::internal(message, e)
            })?;

        info!(environment = %id, revision = %revision_id, "environment committed");
        to_environment(&stored)
    }

    fn create_environment_revision(
        &self,
        revision: &EnvironmentRevision,
    ) -> Result<EnvironmentRevision> {
        let stored = self.put_revision(revision)?;
        debug!(
            environment = %revision.environment_id,
            revision = %revision.environment_revision_id,
            "revision written"
        );
        to_revision(&stored)
    }

    fn get_environment(&self, id: &EnvironmentId) -> Result<Environment> {
        match self.load_environment(id)? {
            Some(environment) if environment.valid_environment => Ok(environment),
            Some(_) => {
                debug!(environment = %id, "environment is uncommitted; reporting not found");
                Err(RepositoryError::not_found(ResourceType::Environment, id))
            }
            None => Err(RepositoryError::not_found(ResourceType::Environment, id)),
        }
    }

    fn update_environment(&self, environment: &Environment) -> Result<Environment> {
        let id = &environment.id;
        let current = self.get_environment(id)?;
        let current_version = current.record_version.unwrap_or(0);
        let expected_version = environment.record_version.unwrap_or(current_version);

        // Updates never move a committed environment back to uncommitted.
        let updated = Environment {
            valid_environment: true,
            ..environment.clone()
        };
        let stored = self
            .store
            .put_if_version_matches(
                self.environments(),
                mapping::environment_to_item(&updated),
                expected_version,
            )
            .map_err(|e| {
                let message = if e.is_conditional_check_failed() {
                    format!(
                        "environment {id} was modified concurrently \
                         (expected version {expected_version})"
                    )
                } else {
                    format!("could not update environment {id}")
                };
                RepositoryError::internal(message, e)
            })?;

        debug!(
            environment = %id,
            version = ?stored.get_n(env::RECORD_VERSION),
            "environment updated"
        );
        to_environment(&stored)
    }

    fn get_environment_revision(
        &self,
        id: &EnvironmentId,
        environment_revision_id: &str,
    ) -> Result<EnvironmentRevision> {
        self.require_committed(id)?;
        let item = self
            .store
            .get(
                self.revisions(),
                &mapping::revision_key(id, environment_revision_id),
            )
            .map_err(|e| {
                RepositoryError::internal(
                    format!(
                        "could not read environment revision {environment_revision_id} of {id}"
                    ),
                    e,
                )
            })?
            .ok_or_else(|| {
                RepositoryError::not_found(
                    ResourceType::EnvironmentRevision,
                    environment_revision_id,
                )
            })?;
        to_revision(&item)
    }

    fn list_environment_revisions(&self, id: &EnvironmentId) -> Result<Vec<EnvironmentRevision>> {
        self.require_committed(id)?;
        self.store
            .query(
                self.revisions(),
                &id.account_id_cluster_environment_name(),
                None,
            )
            .map_err(|e| {
                RepositoryError::internal(
                    format!("could not query revisions of environment {id}"),
                    e,
                )
            })?
            .iter()
            .map(to_revision)
            .collect()
    }

    fn delete_environment_revision(&self, revision: &EnvironmentRevision) -> Result<()> {
        let key = mapping::revision_key(
            &revision.environment_id,
            &revision.environment_revision_id,
        );
        let existed = self.store.delete(self.revisions(), &key).map_err(|e| {
            RepositoryError::internal(
                format!(
                    "could not delete environment revision {} of {}",
                    revision.environment_revision_id, revision.environment_id
                ),
                e,
            )
        })?;
        debug!(
            environment = %revision.environment_id,
            revision = %revision.environment_revision_id,
            existed,
            "revision deleted"
        );
        Ok(())
    }

    fn list_environments(
        &self,
        cluster: &Cluster,
        environment_name_prefix: Option<&str>,
    ) -> Result<Vec<Environment>> {
        let items = self
            .store
            .query(
                self.environments(),
                &cluster.account_id_cluster(),
                environment_name_prefix,
            )
            .map_err(|e| {
                RepositoryError::internal(
                    format!("could not query environments for cluster {cluster}"),
                    e,
                )
            })?;

        let mut environments = Vec::with_capacity(items.len());
        for item in &items {
            let environment = to_environment(item)?;
            if environment.valid_environment {
                environments.push(environment);
            }
        }
        Ok(environments)
    }

    fn list_clusters(
        &self,
        account_id: Option<&str>,
        cluster_name_prefix: Option<&str>,
    ) -> Result<Vec<Cluster>> {
        let items = match (account_id, cluster_name_prefix) {
            (Some(account_id), prefix) => self
                .store
                .query_index(
                    self.environments(),
                    &self.config.environment_cluster_index,
                    account_id,
                    prefix,
                )
                .map_err(|e| {
                    RepositoryError::internal(
                        format!("could not query clusters for account {account_id}"),
                        e,
                    )
                })?,
            (None, Some(_)) => {
                return Err(RepositoryError::InvalidParameter(
                    "accountId must be specified when filtering clusters by name prefix".into(),
                ))
            }
            (None, None) => self
                .store
                .scan(self.environments())
                .map_err(|e| RepositoryError::internal("could not scan environments", e))?,
        };

        let mut clusters = BTreeSet::new();
        for item in items
            .iter()
            .filter(|item| item.get_bool(env::VALID_ENVIRONMENT) == Some(true))
        {
            let cluster = mapping::item_to_cluster(item)
                .map_err(|e| RepositoryError::internal("could not map cluster record", e))?;
            clusters.insert(cluster);
        }
        Ok(clusters.into_iter().collect())
    }

    fn delete_environment(&self, id: &EnvironmentId) -> Result<()> {
        let existed = self
            .store
            .delete(self.environments(), &mapping::environment_key(id))
            .map_err(|e| {
                RepositoryError::internal(format!("could not delete environment {id}"), e)
            })?;
        debug!(environment = %id, existed, "environment deleted");
        Ok(())
    }
}
