//! Domain types for managed compute groups.
//!
//! These mirror the records a cloud control plane returns for groups,
//! their members, launch configurations, and scaling activities. The
//! state of record lives in the provider; these values are snapshots
//! taken for the duration of a single operation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name of a managed group, unique per region.
pub type GroupName = String;

/// Provider-assigned identifier of a member instance.
pub type InstanceId = String;

// ── Group ─────────────────────────────────────────────────────────

/// Snapshot of an elastic compute group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManagedGroup {
    pub name: GroupName,
    pub min_size: u32,
    pub max_size: u32,
    pub desired_capacity: u32,
    #[serde(default)]
    pub launch_configuration_name: Option<String>,
    /// Unix timestamp (seconds) when the group was created.
    pub created_time: u64,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub instances: Vec<GroupInstance>,
    /// Classic load balancer names attached to the group.
    #[serde(default)]
    pub load_balancer_names: Vec<String>,
    /// Target group ARNs attached to the group.
    #[serde(default)]
    pub target_group_arns: Vec<String>,
}

impl ManagedGroup {
    /// Whether the group carries `tag_key` with a value starting with `identifier`.
    pub fn is_owned_by(&self, tag_key: &str, identifier: &str) -> bool {
        self.tags
            .get(tag_key)
            .is_some_and(|value| value.starts_with(identifier))
    }

    /// Identifiers of every member instance, in provider order.
    pub fn instance_ids(&self) -> Vec<InstanceId> {
        self.instances.iter().map(|i| i.instance_id.clone()).collect()
    }

    /// `min_size <= desired_capacity <= max_size`.
    pub fn limits_hold(&self) -> bool {
        self.min_size <= self.desired_capacity && self.desired_capacity <= self.max_size
    }

    /// The capacity descriptor of this group.
    pub fn capacity(&self) -> GroupCapacity {
        GroupCapacity {
            name: self.name.clone(),
            min: self.min_size,
            max: self.max_size,
            desired: self.desired_capacity,
        }
    }
}

/// A member of a group as reported by the group API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupInstance {
    pub instance_id: InstanceId,
    #[serde(default)]
    pub lifecycle_state: Option<LifecycleState>,
    #[serde(default)]
    pub health_status: Option<HealthStatus>,
}

/// Lifecycle of an instance inside its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    Pending,
    InService,
    Terminating,
    Terminated,
    Detaching,
    Detached,
    EnteringStandby,
    Standby,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::InService => "InService",
            Self::Terminating => "Terminating",
            Self::Terminated => "Terminated",
            Self::Detaching => "Detaching",
            Self::Detached => "Detached",
            Self::EnteringStandby => "EnteringStandby",
            Self::Standby => "Standby",
        };
        f.write_str(s)
    }
}

/// Health of an instance as judged by the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Machine state of an instance as reported by the compute inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunState {
    Pending,
    Running,
    ShuttingDown,
    Terminated,
    Stopping,
    Stopped,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::ShuttingDown => "shutting-down",
            Self::Terminated => "terminated",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Machine state of a single instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstanceRunStatus {
    pub instance_id: InstanceId,
    pub state: RunState,
}

// ── Capacity descriptors ──────────────────────────────────────────

/// Name and capacity bounds of a group, or of the defaults used in its place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupCapacity {
    pub name: GroupName,
    pub min: u32,
    pub max: u32,
    pub desired: u32,
}

/// Everything needed to create a new group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GroupSpec {
    pub name: GroupName,
    pub min_size: u32,
    pub max_size: u32,
    pub desired_capacity: u32,
    pub launch_configuration_name: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub load_balancer_names: Vec<String>,
    #[serde(default)]
    pub target_group_arns: Vec<String>,
    #[serde(default)]
    pub availability_zones: Vec<String>,
    /// "EC2" or "ELB".
    pub health_check_type: Option<String>,
    pub health_check_grace_period_secs: Option<u32>,
}

// ── Launch configuration ─────────────────────────────────────────

/// Immutable instance template referenced by a group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LaunchConfiguration {
    pub name: String,
    pub image_id: String,
    pub instance_type: String,
    #[serde(default)]
    pub security_groups: Vec<String>,
    pub key_name: Option<String>,
    pub user_data: Option<String>,
    pub created_time: u64,
}

// ── Activities ────────────────────────────────────────────────────

/// A scaling activity reported by the provider for a group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Activity {
    pub activity_id: String,
    pub description: String,
    #[serde(default)]
    pub details: Option<String>,
    /// Completion percentage (0–100).
    pub progress: u8,
    pub status_code: String,
    #[serde(default)]
    pub cause: Option<String>,
}

impl Activity {
    pub fn is_complete(&self) -> bool {
        self.progress >= 100
    }
}
