//! Environment workflows built on an [`EnvironmentRepository`].
//!
//! These are the multi-step operations the API exposes: create, update,
//! deploy and delete. Each step is a single repository call; only creation
//! is atomic from the caller's point of view.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use blox_types::{
    Environment, EnvironmentHealth, EnvironmentId, EnvironmentRevision, EnvironmentStatus,
    EnvironmentType, InstanceGroup,
};

use crate::error::Result;
use crate::traits::EnvironmentRepository;

/// Caller-supplied fields for a new environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEnvironment {
    pub id: EnvironmentId,
    pub role: String,
    pub environment_type: EnvironmentType,
    pub deployment_method: String,
    pub task_definition: String,
    pub instance_group: InstanceGroup,
}

/// A request to roll an environment onto one of its revisions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deployment {
    pub deployment_id: String,
    pub environment_name: String,
    pub environment_revision_id: String,
}

pub struct EnvironmentService<R> {
    repository: R,
}

impl<R: EnvironmentRepository> EnvironmentService<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Create an environment and its first revision. The environment starts
    /// inactive and healthy, with no active revision.
    ///
    /// The revision is returned as submitted; nothing is read back once the
    /// creation has committed.
    pub fn create_environment(
        &self,
        request: NewEnvironment,
    ) -> Result<(Environment, EnvironmentRevision)> {
        let now = Utc::now();
        let revision = EnvironmentRevision {
            environment_id: request.id.clone(),
            environment_revision_id: EnvironmentRevision::generate_id(),
            task_definition: request.task_definition.clone(),
            instance_group: request.instance_group,
            created_time: now,
            record_version: None,
        };
        let environment = Environment {
            id: request.id,
            role: request.role,
            task_definition: Some(request.task_definition),
            environment_type: request.environment_type,
            status: EnvironmentStatus::Inactive,
            health: EnvironmentHealth::Healthy,
            created_time: now,
            last_updated_time: now,
            latest_environment_revision_id: revision.environment_revision_id.clone(),
            active_environment_revision_id: None,
            deployment_method: request.deployment_method,
            valid_environment: false,
            record_version: None,
        };

        let created = self
            .repository
            .create_environment_and_revision(&environment, &revision)?;
        info!(
            environment = %created.id,
            revision = %revision.environment_revision_id,
            "environment created"
        );
        Ok((created, revision))
    }

    /// Record a new revision and make it the environment's latest.
    ///
    /// Without an explicit instance group the latest revision's group is
    /// carried over.
    pub fn update_environment(
        &self,
        id: &EnvironmentId,
        task_definition: impl Into<String>,
        instance_group: Option<InstanceGroup>,
    ) -> Result<EnvironmentRevision> {
        let environment = self.repository.get_environment(id)?;
        let instance_group = match instance_group {
            Some(group) => group,
            None => {
                self.repository
                    .get_environment_revision(id, &environment.latest_environment_revision_id)?
                    .instance_group
            }
        };

        let now = Utc::now();
        let task_definition = task_definition.into();
        let revision = self.repository.create_environment_revision(&EnvironmentRevision {
            environment_id: id.clone(),
            environment_revision_id: EnvironmentRevision::generate_id(),
            task_definition: task_definition.clone(),
            instance_group,
            created_time: now,
            record_version: None,
        })?;

        self.repository.update_environment(&Environment {
            task_definition: Some(task_definition),
            latest_environment_revision_id: revision.environment_revision_id.clone(),
            last_updated_time: now,
            ..environment
        })?;
        info!(
            environment = %id,
            revision = %revision.environment_revision_id,
            "environment updated"
        );
        Ok(revision)
    }

    /// Make `environment_revision_id` the active revision.
    pub fn start_deployment(
        &self,
        id: &EnvironmentId,
        environment_revision_id: &str,
    ) -> Result<Deployment> {
        let environment = self.repository.get_environment(id)?;
        let revision = self
            .repository
            .get_environment_revision(id, environment_revision_id)?;

        self.repository.update_environment(&Environment {
            active_environment_revision_id: Some(revision.environment_revision_id.clone()),
            status: EnvironmentStatus::Active,
            last_updated_time: Utc::now(),
            ..environment
        })?;

        let deployment = Deployment {
            deployment_id: Uuid::now_v7().to_string(),
            environment_name: id.environment_name().to_string(),
            environment_revision_id: revision.environment_revision_id,
        };
        info!(
            environment = %id,
            deployment = %deployment.deployment_id,
            revision = %deployment.environment_revision_id,
            "deployment started"
        );
        Ok(deployment)
    }

    /// Delete an environment and all of its revisions, returning the
    /// environment as it was.
    ///
    /// Not atomic: a failure part way leaves some revisions deleted.
    pub fn delete_environment(&self, id: &EnvironmentId) -> Result<Environment> {
        let environment = self.repository.get_environment(id)?;
        let revisions = self.repository.list_environment_revisions(id)?;
        for revision in &revisions {
            self.repository.delete_environment_revision(revision)?;
        }
        self.repository.delete_environment(id)?;
        info!(environment = %id, revisions = revisions.len(), "environment deleted");
        Ok(environment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use blox_store::{InMemoryKeyValueStore, KeyValueStore, StoreError};
    use blox_types::{Attribute, Cluster};

    use crate::config::RepositoryConfig;
    use crate::error::RepositoryError;
    use crate::repository::StoreEnvironmentRepository;

    type Repository = StoreEnvironmentRepository<InMemoryKeyValueStore>;
    type Service = EnvironmentService<Repository>;

    fn repository() -> Repository {
        let config = RepositoryConfig::default();
        let store = InMemoryKeyValueStore::new(config.table_schemas());
        StoreEnvironmentRepository::new(store, config)
    }

    fn service() -> Service {
        EnvironmentService::new(repository())
    }

    fn stored_revision_count(service: &Service) -> usize {
        let repository = service.repository();
        repository
            .store()
            .scan(&repository.config().environment_revisions_table)
            .unwrap()
            .len()
    }

    /// Repository whose revision reads always fail.
    struct UnreadableRevisions(Repository);

    impl EnvironmentRepository for UnreadableRevisions {
        fn create_environment_and_revision(
            &self,
            environment: &Environment,
            revision: &EnvironmentRevision,
        ) -> Result<Environment> {
            self.0.create_environment_and_revision(environment, revision)
        }

        fn create_environment_revision(
            &self,
            revision: &EnvironmentRevision,
        ) -> Result<EnvironmentRevision> {
            self.0.create_environment_revision(revision)
        }

        fn get_environment(&self, id: &EnvironmentId) -> Result<Environment> {
            self.0.get_environment(id)
        }

        fn update_environment(&self, environment: &Environment) -> Result<Environment> {
            self.0.update_environment(environment)
        }

        fn get_environment_revision(
            &self,
            _id: &EnvironmentId,
            _environment_revision_id: &str,
        ) -> Result<EnvironmentRevision> {
            Err(RepositoryError::internal(
                "could not read environment revision",
                StoreError::Unavailable("get throttled".into()),
            ))
        }

        fn list_environment_revisions(
            &self,
            id: &EnvironmentId,
        ) -> Result<Vec<EnvironmentRevision>> {
            self.0.list_environment_revisions(id)
        }

        fn delete_environment_revision(&self, revision: &EnvironmentRevision) -> Result<()> {
            self.0.delete_environment_revision(revision)
        }

        fn list_environments(
            &self,
            cluster: &Cluster,
            environment_name_prefix: Option<&str>,
        ) -> Result<Vec<Environment>> {
            self.0.list_environments(cluster, environment_name_prefix)
        }

        fn list_clusters(
            &self,
            account_id: Option<&str>,
            cluster_name_prefix: Option<&str>,
        ) -> Result<Vec<Cluster>> {
            self.0.list_clusters(account_id, cluster_name_prefix)
        }

        fn delete_environment(&self, id: &EnvironmentId) -> Result<()> {
            self.0.delete_environment(id)
        }
    }

    fn id(name: &str) -> EnvironmentId {
        EnvironmentId::new("123456789012", "mycluster", name).unwrap()
    }

    fn request(name: &str) -> NewEnvironment {
        NewEnvironment {
            id: id(name),
            role: "arn:aws:iam::123456789012:role/blox".into(),
            environment_type: EnvironmentType::Daemon,
            deployment_method: "ReplaceAfterTerminate".into(),
            task_definition: "web:1".into(),
            instance_group: InstanceGroup::new(vec![Attribute::new("stack", "prod")]),
        }
    }

    // -----------------------------------------------------------------------
    // create
    // -----------------------------------------------------------------------

    #[test]
    fn create_starts_inactive_and_committed() {
        let service = service();
        let (environment, revision) = service.create_environment(request("web")).unwrap();

        assert!(environment.valid_environment);
        assert_eq!(environment.status, EnvironmentStatus::Inactive);
        assert_eq!(environment.health, EnvironmentHealth::Healthy);
        assert_eq!(environment.active_environment_revision_id, None);
        assert_eq!(
            environment.latest_environment_revision_id,
            revision.environment_revision_id
        );
        assert_eq!(environment.task_definition.as_deref(), Some("web:1"));
        assert_eq!(revision.task_definition, "web:1");

        let stored = service
            .repository()
            .get_environment_revision(&id("web"), &revision.environment_revision_id)
            .unwrap();
        assert_eq!(stored.task_definition, revision.task_definition);
        assert_eq!(stored.instance_group, revision.instance_group);
    }

    #[test]
    fn create_succeeds_when_revision_reads_fail() {
        let service = EnvironmentService::new(UnreadableRevisions(repository()));

        let (environment, revision) = service.create_environment(request("web")).unwrap();
        assert!(environment.valid_environment);
        assert_eq!(
            environment.latest_environment_revision_id,
            revision.environment_revision_id
        );
        assert!(service.repository().get_environment(&id("web")).is_ok());
    }

    #[test]
    fn create_twice_fails() {
        let service = service();
        service.create_environment(request("web")).unwrap();
        assert!(service
            .create_environment(request("web"))
            .unwrap_err()
            .is_already_exists());
    }

    // -----------------------------------------------------------------------
    // update
    // -----------------------------------------------------------------------

    #[test]
    fn update_adds_revision_and_moves_latest() {
        let service = service();
        let (_, first) = service.create_environment(request("web")).unwrap();

        let second = service.update_environment(&id("web"), "web:2", None).unwrap();
        assert_ne!(second.environment_revision_id, first.environment_revision_id);
        assert_eq!(second.instance_group, first.instance_group);

        let environment = service.repository().get_environment(&id("web")).unwrap();
        assert_eq!(
            environment.latest_environment_revision_id,
            second.environment_revision_id
        );
        assert_eq!(environment.task_definition.as_deref(), Some("web:2"));
        assert_eq!(
            service
                .repository()
                .list_environment_revisions(&id("web"))
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn update_with_new_instance_group() {
        let service = service();
        service.create_environment(request("web")).unwrap();
        let group = InstanceGroup::new(vec![Attribute::flag("gpu")]);

        let revision = service
            .update_environment(&id("web"), "web:2", Some(group.clone()))
            .unwrap();
        assert_eq!(revision.instance_group, group);
    }

    #[test]
    fn update_of_missing_environment_is_not_found() {
        let service = service();
        let err = service
            .update_environment(&id("missing"), "web:2", None)
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(stored_revision_count(&service), 0);
    }

    // -----------------------------------------------------------------------
    // deploy
    // -----------------------------------------------------------------------

    #[test]
    fn start_deployment_activates_revision() {
        let service = service();
        let (_, revision) = service.create_environment(request("web")).unwrap();

        let deployment = service
            .start_deployment(&id("web"), &revision.environment_revision_id)
            .unwrap();
        assert_eq!(deployment.environment_name, "web");
        assert_eq!(
            deployment.environment_revision_id,
            revision.environment_revision_id
        );
        assert!(Uuid::parse_str(&deployment.deployment_id).is_ok());

        let environment = service.repository().get_environment(&id("web")).unwrap();
        assert_eq!(environment.status, EnvironmentStatus::Active);
        assert_eq!(
            environment.active_environment_revision_id.as_deref(),
            Some(revision.environment_revision_id.as_str())
        );
    }

    #[test]
    fn start_deployment_of_unknown_revision_is_not_found() {
        let service = service();
        service.create_environment(request("web")).unwrap();
        let err = service.start_deployment(&id("web"), "nope").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "environment revision with id nope could not be found"
        );
    }

    #[test]
    fn start_deployment_of_missing_environment_is_not_found() {
        let service = service();
        assert!(service
            .start_deployment(&id("missing"), "R1")
            .unwrap_err()
            .is_not_found());
    }

    // -----------------------------------------------------------------------
    // delete
    // -----------------------------------------------------------------------

    #[test]
    fn delete_removes_environment_and_revisions() {
        let service = service();
        service.create_environment(request("web")).unwrap();
        service.update_environment(&id("web"), "web:2", None).unwrap();

        let deleted = service.delete_environment(&id("web")).unwrap();
        assert_eq!(deleted.id, id("web"));
        assert!(service
            .repository()
            .get_environment(&id("web"))
            .unwrap_err()
            .is_not_found());
        assert_eq!(stored_revision_count(&service), 0);

        // The name is free again.
        service.create_environment(request("web")).unwrap();
    }

    #[test]
    fn delete_of_missing_environment_is_not_found() {
        let service = service();
        assert!(service
            .delete_environment(&id("missing"))
            .unwrap_err()
            .is_not_found());
    }
}
