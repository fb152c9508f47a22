use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::TypeError;
use crate::identity::EnvironmentId;

/// How the scheduler places tasks for an environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnvironmentType {
    /// One task on every instance matching the instance group.
    Daemon,
    /// A single task somewhere in the instance group.
    SingleTask,
}

impl EnvironmentType {
    pub const ALL: [Self; 2] = [Self::Daemon, Self::SingleTask];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daemon => "Daemon",
            Self::SingleTask => "SingleTask",
        }
    }
}

/// Whether a deployment has been started for the environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnvironmentStatus {
    Inactive,
    Active,
}

impl EnvironmentStatus {
    pub const ALL: [Self; 2] = [Self::Inactive, Self::Active];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "Inactive",
            Self::Active => "Active",
        }
    }
}

/// Health as last reported for the environment's workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnvironmentHealth {
    Healthy,
    Unhealthy,
}

impl EnvironmentHealth {
    pub const ALL: [Self; 2] = [Self::Healthy, Self::Unhealthy];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::Unhealthy => "Unhealthy",
        }
    }
}

macro_rules! string_encoded_enum {
    ($ty:ty, $kind:literal) => {
        impl FromStr for $ty {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .into_iter()
                    .find(|variant| variant.as_str() == s)
                    .ok_or_else(|| TypeError::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_encoded_enum!(EnvironmentType, "environment type");
string_encoded_enum!(EnvironmentStatus, "environment status");
string_encoded_enum!(EnvironmentHealth, "environment health");

/// A named workload configuration within a cluster.
///
/// An environment row is written in two phases. It is first stored with
/// `valid_environment == false`, and only flips to `true` once its first
/// revision exists. Rows that never flipped are leftovers of an interrupted
/// creation and are treated as absent by every reader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Environment {
    pub id: EnvironmentId,
    /// IAM role the scheduler assumes on behalf of the environment.
    pub role: String,
    /// Legacy task definition; the latest revision is authoritative.
    pub task_definition: Option<String>,
    pub environment_type: EnvironmentType,
    pub status: EnvironmentStatus,
    pub health: EnvironmentHealth,
    pub created_time: DateTime<Utc>,
    pub last_updated_time: DateTime<Utc>,
    pub latest_environment_revision_id: String,
    /// Set once a deployment has been started.
    pub active_environment_revision_id: Option<String>,
    pub deployment_method: String,
    /// Commit marker of the creation protocol.
    pub valid_environment: bool,
    /// Store-managed optimistic-concurrency stamp. `None` until first written.
    pub record_version: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_strings_parse_back() {
        for t in EnvironmentType::ALL {
            assert_eq!(t.as_str().parse::<EnvironmentType>().unwrap(), t);
        }
        for s in EnvironmentStatus::ALL {
            assert_eq!(s.as_str().parse::<EnvironmentStatus>().unwrap(), s);
        }
        for h in EnvironmentHealth::ALL {
            assert_eq!(h.as_str().parse::<EnvironmentHealth>().unwrap(), h);
        }
    }

    #[test]
    fn unknown_enum_string_is_rejected() {
        let err = "Sometimes".parse::<EnvironmentStatus>().unwrap_err();
        assert_eq!(
            err,
            TypeError::UnknownVariant {
                kind: "environment status",
                value: "Sometimes".into(),
            }
        );
    }

    #[test]
    fn parsing_is_case_sensitive() {
        assert!("daemon".parse::<EnvironmentType>().is_err());
        assert!("HEALTHY".parse::<EnvironmentHealth>().is_err());
    }

    #[test]
    fn display_matches_encoding() {
        assert_eq!(EnvironmentType::SingleTask.to_string(), "SingleTask");
        assert_eq!(EnvironmentHealth::Unhealthy.to_string(), "Unhealthy");
    }
}
