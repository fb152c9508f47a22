//! Domain types for the Blox data service.
//!
//! This crate provides the identity and entity types shared by the store
//! adapter and the environment repository. Every other Blox crate depends on
//! `blox-types`.
//!
//! # Key Types
//!
//! - [`EnvironmentId`] — Account + cluster + name key of an environment
//! - [`Cluster`] — Account + cluster pair used for listing
//! - [`Environment`] — Mutable workload configuration with a commit flag
//! - [`EnvironmentRevision`] — Immutable task definition + placement snapshot
//! - [`EnvironmentType`], [`EnvironmentStatus`], [`EnvironmentHealth`] —
//!   Tagged enumerations with fixed string encodings

pub mod environment;
pub mod error;
pub mod identity;
pub mod revision;

pub use environment::{Environment, EnvironmentHealth, EnvironmentStatus, EnvironmentType};
pub use error::TypeError;
pub use identity::{Cluster, EnvironmentId, KEY_SEPARATOR};
pub use revision::{Attribute, EnvironmentRevision, InstanceGroup};
