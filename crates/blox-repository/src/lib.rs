//! Environment repository for the Blox data service.
//!
//! Environments and their revisions live in two tables of a conditional-write
//! [`KeyValueStore`](blox_store::KeyValueStore). The store cannot write both
//! rows atomically, so an environment row carries a commit flag
//! (`validEnvironment`) that is only set once its first revision exists.
//! Uncommitted rows are invisible to readers and are replaced by the next
//! creation under the same id.
//!
//! # Modules
//!
//! - [`error`] — [`RepositoryError`]: not found, already exists, internal
//! - [`traits`] — The [`EnvironmentRepository`] trait
//! - [`repository`] — [`StoreEnvironmentRepository`], the store-backed implementation
//! - [`mapping`] — Record layout and entity/item conversion
//! - [`config`] — Table and index names, loadable from TOML
//! - [`service`] — [`EnvironmentService`] workflows (create, update, deploy, delete)

pub mod config;
pub mod error;
pub mod mapping;
pub mod repository;
pub mod service;
pub mod traits;

pub use config::RepositoryConfig;
pub use error::{RepositoryError, ResourceType, Result};
pub use mapping::MappingError;
pub use repository::StoreEnvironmentRepository;
pub use service::{Deployment, EnvironmentService, NewEnvironment};
pub use traits::EnvironmentRepository;
