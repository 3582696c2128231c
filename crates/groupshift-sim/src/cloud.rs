//! `SimulatedCloud` — an in-memory control plane behind the client traits.
//!
//! Cheap to clone; every clone and every session it hands out share the
//! same world. Sessions are counted so callers can assert that none leak.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use groupshift_client::{
    DescribeGroups, GroupClient, GroupTag, GroupUpdate, LaunchConfigurationSpec, Page,
    ProviderResult, SessionProvider,
};
use groupshift_core::{
    Activity, GroupSpec, InstanceRunStatus, LaunchConfiguration, ManagedGroup, PortablePolicy,
    PortableScheduledAction, ProviderError, ScalingPolicy, ScheduledAction,
};

use crate::faults::{Call, Fault, FaultPlan};
use crate::world::{paginate, World};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Shared {
    world: Mutex<World>,
    faults: Mutex<FaultPlan>,
    calls: Mutex<BTreeMap<Call, usize>>,
    open_fault: Mutex<Option<ProviderError>>,
    sessions_opened: AtomicUsize,
    sessions_active: AtomicUsize,
}

/// In-memory control plane. Implements [`SessionProvider`].
#[derive(Clone, Default)]
pub struct SimulatedCloud {
    shared: Arc<Shared>,
}

impl SimulatedCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_world(world: World) -> Self {
        let cloud = Self::default();
        *lock(&cloud.shared.world) = world;
        cloud
    }

    /// Load a world snapshot from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let world: World = serde_json::from_str(&content)?;
        debug!(?path, groups = world.groups.len(), "simulated world loaded");
        Ok(Self::from_world(world))
    }

    /// Write the current world to a JSON file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn snapshot(&self) -> World {
        lock(&self.shared.world).clone()
    }

    /// Mutate the world directly, bypassing faults and call accounting.
    pub fn with_world<R>(&self, f: impl FnOnce(&mut World) -> R) -> R {
        f(&mut lock(&self.shared.world))
    }

    pub fn seed_group(&self, group: ManagedGroup) {
        self.with_world(|w| w.seed_group(group));
    }

    pub fn inject(&self, fault: Fault) {
        lock(&self.shared.faults).push(fault);
    }

    pub fn clear_faults(&self) {
        lock(&self.shared.faults).clear();
    }

    /// Make the next session acquisitions fail with `err` until cleared.
    pub fn fail_open(&self, err: Option<ProviderError>) {
        *lock(&self.shared.open_fault) = err;
    }

    /// Number of times `call` was issued (including faulted calls).
    pub fn calls(&self, call: Call) -> usize {
        lock(&self.shared.calls).get(&call).copied().unwrap_or(0)
    }

    pub fn sessions_opened(&self) -> usize {
        self.shared.sessions_opened.load(Ordering::SeqCst)
    }

    /// Sessions handed out and not yet dropped.
    pub fn sessions_active(&self) -> usize {
        self.shared.sessions_active.load(Ordering::SeqCst)
    }

    pub fn group(&self, name: &str) -> Option<ManagedGroup> {
        lock(&self.shared.world).groups.get(name).cloned()
    }
}

#[async_trait]
impl SessionProvider for SimulatedCloud {
    async fn open(&self, region: &str) -> ProviderResult<Box<dyn GroupClient>> {
        if let Some(err) = lock(&self.shared.open_fault).clone() {
            return Err(err);
        }
        let home = lock(&self.shared.world).region.clone();
        if region != home {
            return Err(ProviderError::client(format!(
                "no simulated endpoint for region {region} (world is {home})"
            )));
        }
        self.shared.sessions_opened.fetch_add(1, Ordering::SeqCst);
        self.shared.sessions_active.fetch_add(1, Ordering::SeqCst);
        debug!(%region, "simulated session opened");
        Ok(Box::new(SimulatedSession {
            shared: self.shared.clone(),
        }))
    }
}

/// One open session against the simulated world.
pub struct SimulatedSession {
    shared: Arc<Shared>,
}

impl Drop for SimulatedSession {
    fn drop(&mut self) {
        self.shared.sessions_active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SimulatedSession {
    /// Account for `call`, fire any matching fault, and lock the world.
    fn enter(&self, call: Call, target: Option<&str>) -> ProviderResult<MutexGuard<'_, World>> {
        *lock(&self.shared.calls).entry(call).or_insert(0) += 1;
        if let Some(err) = lock(&self.shared.faults).fire(call, target) {
            debug!(?call, ?target, error = %err, "injected fault");
            return Err(err);
        }
        Ok(lock(&self.shared.world))
    }
}

#[async_trait]
impl GroupClient for SimulatedSession {
    async fn describe_groups(&self, request: &DescribeGroups) -> ProviderResult<Page<ManagedGroup>> {
        let target = request.names.first().map(String::as_str);
        let mut world = self.enter(Call::DescribeGroups, target)?;
        let groups = world.describe_groups(&request.names);
        let page_size = request.max_records.map_or(world.page_size, |m| m as usize);
        let (items, next_token) = paginate(&groups, request.next_token.as_deref(), page_size)?;
        Ok(Page { items, next_token })
    }

    async fn describe_launch_configurations(
        &self,
        names: &[String],
        next_token: Option<String>,
    ) -> ProviderResult<Page<LaunchConfiguration>> {
        let world = self.enter(Call::DescribeLaunchConfigurations, names.first().map(String::as_str))?;
        let configs: Vec<LaunchConfiguration> = world
            .launch_configurations
            .values()
            .filter(|lc| names.is_empty() || names.contains(&lc.name))
            .cloned()
            .collect();
        let (items, next_token) = paginate(&configs, next_token.as_deref(), world.page_size)?;
        Ok(Page { items, next_token })
    }

    async fn describe_policies(
        &self,
        group: &str,
        next_token: Option<String>,
    ) -> ProviderResult<Page<ScalingPolicy>> {
        let world = self.enter(Call::DescribePolicies, Some(group))?;
        let policies: Vec<ScalingPolicy> = world
            .policies
            .iter()
            .filter(|p| p.group_name == group)
            .cloned()
            .collect();
        let (items, next_token) = paginate(&policies, next_token.as_deref(), world.page_size)?;
        Ok(Page { items, next_token })
    }

    async fn describe_scheduled_actions(
        &self,
        group: &str,
        next_token: Option<String>,
        max_records: Option<u32>,
    ) -> ProviderResult<Page<ScheduledAction>> {
        let world = self.enter(Call::DescribeScheduledActions, Some(group))?;
        let actions: Vec<ScheduledAction> = world
            .scheduled_actions
            .iter()
            .filter(|a| a.group_name == group)
            .cloned()
            .collect();
        let page_size = max_records.map_or(world.page_size, |m| m as usize);
        let (items, next_token) = paginate(&actions, next_token.as_deref(), page_size)?;
        Ok(Page { items, next_token })
    }

    async fn describe_scaling_activities(
        &self,
        group: &str,
        next_token: Option<String>,
    ) -> ProviderResult<Page<Activity>> {
        let world = self.enter(Call::DescribeScalingActivities, Some(group))?;
        let activities = world.activities.get(group).cloned().unwrap_or_default();
        let (items, next_token) = paginate(&activities, next_token.as_deref(), world.page_size)?;
        Ok(Page { items, next_token })
    }

    async fn describe_instance_states(
        &self,
        instance_ids: &[String],
    ) -> ProviderResult<Vec<InstanceRunStatus>> {
        let world = self.enter(Call::DescribeInstanceStates, None)?;
        Ok(world.instance_states(instance_ids))
    }

    async fn create_group(&self, spec: &GroupSpec) -> ProviderResult<()> {
        self.enter(Call::CreateGroup, Some(&spec.name))?.create_group(spec)
    }

    async fn update_group(&self, update: &GroupUpdate) -> ProviderResult<()> {
        self.enter(Call::UpdateGroup, Some(&update.name))?.update_group(update)
    }

    async fn delete_group(&self, name: &str) -> ProviderResult<()> {
        self.enter(Call::DeleteGroup, Some(name))?.delete_group(name)
    }

    async fn set_desired_capacity(&self, group: &str, desired: u32) -> ProviderResult<()> {
        self.enter(Call::SetDesiredCapacity, Some(group))?
            .set_desired_capacity(group, desired)
    }

    async fn create_or_update_tags(&self, tags: &[GroupTag]) -> ProviderResult<()> {
        let target = tags.first().map(|t| t.group_name.as_str());
        self.enter(Call::CreateOrUpdateTags, target)?.tag(tags)
    }

    async fn create_launch_configuration(&self, spec: &LaunchConfigurationSpec) -> ProviderResult<()> {
        self.enter(Call::CreateLaunchConfiguration, Some(&spec.name))?
            .create_launch_configuration(spec)
    }

    async fn delete_launch_configuration(&self, name: &str) -> ProviderResult<()> {
        self.enter(Call::DeleteLaunchConfiguration, Some(name))?
            .delete_launch_configuration(name)
    }

    async fn put_scaling_policy(&self, group: &str, policy: &PortablePolicy) -> ProviderResult<String> {
        self.enter(Call::PutScalingPolicy, Some(group))?
            .put_policy(group, policy)
    }

    async fn delete_policy(&self, group: &str, policy: &str) -> ProviderResult<()> {
        self.enter(Call::DeletePolicy, Some(group))?
            .delete_policy(group, policy)
    }

    async fn put_scheduled_action(
        &self,
        group: &str,
        action: &PortableScheduledAction,
    ) -> ProviderResult<()> {
        self.enter(Call::PutScheduledAction, Some(group))?
            .put_scheduled_action(group, action)
    }

    async fn delete_scheduled_action(&self, group: &str, name: &str) -> ProviderResult<()> {
        self.enter(Call::DeleteScheduledAction, Some(group))?
            .delete_scheduled_action(group, name)
    }

    async fn attach_load_balancers(&self, group: &str, names: &[String]) -> ProviderResult<()> {
        self.enter(Call::AttachLoadBalancers, Some(group))?
            .attach(group, names, true)
    }

    async fn detach_load_balancers(&self, group: &str, names: &[String]) -> ProviderResult<()> {
        self.enter(Call::DetachLoadBalancers, Some(group))?
            .detach(group, names, true)
    }

    async fn attach_target_groups(&self, group: &str, arns: &[String]) -> ProviderResult<()> {
        self.enter(Call::AttachTargetGroups, Some(group))?
            .attach(group, arns, false)
    }

    async fn detach_target_groups(&self, group: &str, arns: &[String]) -> ProviderResult<()> {
        self.enter(Call::DetachTargetGroups, Some(group))?
            .detach(group, arns, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupshift_core::Service;

    #[tokio::test]
    async fn sessions_are_counted_until_dropped() {
        let cloud = SimulatedCloud::new();
        let session = cloud.open("us-east-1").await.unwrap();
        assert_eq!(cloud.sessions_active(), 1);
        drop(session);
        assert_eq!(cloud.sessions_active(), 0);
        assert_eq!(cloud.sessions_opened(), 1);
    }

    #[tokio::test]
    async fn sessions_only_open_in_the_world_region() {
        let cloud = SimulatedCloud::new();
        assert!(cloud.open("eu-west-1").await.is_err());
        assert_eq!(cloud.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn injected_fault_replaces_response_and_is_counted() {
        let cloud = SimulatedCloud::new();
        cloud.inject(Fault::times(
            Call::DescribeGroups,
            1,
            ProviderError::service(Service::AutoScaling, "Throttling", "Rate exceeded"),
        ));
        let session = cloud.open("us-east-1").await.unwrap();

        assert!(session.describe_groups(&DescribeGroups::default()).await.is_err());
        assert!(session.describe_groups(&DescribeGroups::default()).await.is_ok());
        assert_eq!(cloud.calls(Call::DescribeGroups), 2);
    }

    #[tokio::test]
    async fn world_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");

        let cloud = SimulatedCloud::new();
        let session = cloud.open("us-east-1").await.unwrap();
        session
            .create_group(&GroupSpec {
                name: "web__1".to_string(),
                max_size: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        cloud.save(&path).unwrap();

        let reloaded = SimulatedCloud::load(&path).unwrap();
        assert!(reloaded.group("web__1").is_some());
    }
}
