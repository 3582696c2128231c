//! The group API boundary.
//!
//! `GroupClient` is the set of control-plane calls the lifecycle engine
//! consumes. Every call is a single request/response; list calls return
//! one [`Page`] at a time and the caller drains continuation tokens (see
//! [`crate::paginate`]).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use groupshift_core::{
    Activity, GroupSpec, InstanceRunStatus, LaunchConfiguration, ManagedGroup, PortablePolicy,
    PortableScheduledAction, ProviderError, ScalingPolicy, ScheduledAction,
};

/// Result type alias for raw client calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// One page of a paginated list call.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Continuation token; `None` on the last page.
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    /// A final page holding `items`.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

/// Describe-groups request. An empty `names` list describes every group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescribeGroups {
    pub names: Vec<String>,
    pub next_token: Option<String>,
    pub max_records: Option<u32>,
}

impl DescribeGroups {
    pub fn named(name: &str) -> Self {
        Self {
            names: vec![name.to_string()],
            ..Default::default()
        }
    }
}

/// Partial update of a group's capacity bounds. `None` fields are left as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupUpdate {
    pub name: String,
    pub min_size: Option<u32>,
    pub max_size: Option<u32>,
    pub desired_capacity: Option<u32>,
}

/// A tag write against a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTag {
    pub group_name: String,
    pub key: String,
    pub value: String,
    pub propagate_at_launch: bool,
}

/// Parameters for a new launch configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchConfigurationSpec {
    pub name: String,
    pub image_id: String,
    pub instance_type: String,
    #[serde(default)]
    pub security_groups: Vec<String>,
    pub key_name: Option<String>,
    pub user_data: Option<String>,
}

/// Control-plane calls for groups and everything attached to them.
#[async_trait]
pub trait GroupClient: Send + Sync {
    // ── Describe / list ────────────────────────────────────────────

    async fn describe_groups(&self, request: &DescribeGroups) -> ProviderResult<Page<ManagedGroup>>;

    async fn describe_launch_configurations(
        &self,
        names: &[String],
        next_token: Option<String>,
    ) -> ProviderResult<Page<LaunchConfiguration>>;

    async fn describe_policies(
        &self,
        group: &str,
        next_token: Option<String>,
    ) -> ProviderResult<Page<ScalingPolicy>>;

    async fn describe_scheduled_actions(
        &self,
        group: &str,
        next_token: Option<String>,
        max_records: Option<u32>,
    ) -> ProviderResult<Page<ScheduledAction>>;

    async fn describe_scaling_activities(
        &self,
        group: &str,
        next_token: Option<String>,
    ) -> ProviderResult<Page<Activity>>;

    /// Machine states from the compute inventory.
    async fn describe_instance_states(
        &self,
        instance_ids: &[String],
    ) -> ProviderResult<Vec<InstanceRunStatus>>;

    // ── Groups ─────────────────────────────────────────────────────

    async fn create_group(&self, spec: &GroupSpec) -> ProviderResult<()>;

    async fn update_group(&self, update: &GroupUpdate) -> ProviderResult<()>;

    async fn delete_group(&self, name: &str) -> ProviderResult<()>;

    async fn set_desired_capacity(&self, group: &str, desired: u32) -> ProviderResult<()>;

    async fn create_or_update_tags(&self, tags: &[GroupTag]) -> ProviderResult<()>;

    // ── Launch configurations ─────────────────────────────────────

    async fn create_launch_configuration(&self, spec: &LaunchConfigurationSpec) -> ProviderResult<()>;

    async fn delete_launch_configuration(&self, name: &str) -> ProviderResult<()>;

    // ── Policies and scheduled actions ─────────────────────────────

    /// Returns the ARN the provider assigned to the policy.
    async fn put_scaling_policy(&self, group: &str, policy: &PortablePolicy) -> ProviderResult<String>;

    /// `policy` may be the policy name or its ARN.
    async fn delete_policy(&self, group: &str, policy: &str) -> ProviderResult<()>;

    async fn put_scheduled_action(
        &self,
        group: &str,
        action: &PortableScheduledAction,
    ) -> ProviderResult<()>;

    async fn delete_scheduled_action(&self, group: &str, name: &str) -> ProviderResult<()>;

    // ── Load balancing ─────────────────────────────────────────────

    async fn attach_load_balancers(&self, group: &str, names: &[String]) -> ProviderResult<()>;

    async fn detach_load_balancers(&self, group: &str, names: &[String]) -> ProviderResult<()>;

    async fn attach_target_groups(&self, group: &str, arns: &[String]) -> ProviderResult<()>;

    async fn detach_target_groups(&self, group: &str, arns: &[String]) -> ProviderResult<()>;
}
