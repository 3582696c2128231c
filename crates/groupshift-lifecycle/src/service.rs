//! `GroupLifecycle` — the public face of the engine.
//!
//! Every operation opens its own session from the injected provider, runs
//! one component against it, and releases the session on return whether
//! the operation succeeded, failed, or timed out.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use groupshift_client::{GroupClient, LaunchConfigurationSpec, SessionProvider};
use groupshift_core::{
    GroupInstance, GroupResult, GroupSpec, InstanceRunStatus, LaunchConfiguration,
    LifecycleConfig, ManagedGroup,
};
use tracing::debug;

use crate::batch::BatchOutcome;
use crate::context::OpContext;
use crate::convergence::{self, Converged, ConvergenceCriteria};
use crate::groups::{self, Balancer};
use crate::locator::{self, Located};
use crate::log::{ExecutionLog, LogSink};
use crate::portability;
use crate::recorder::{CallRecorder, NoopRecorder};
use crate::teardown::{self, TeardownReport};

pub struct GroupLifecycle {
    provider: Arc<dyn SessionProvider>,
    region: String,
    config: LifecycleConfig,
    log: ExecutionLog,
    recorder: Arc<dyn CallRecorder>,
}

impl GroupLifecycle {
    pub fn new(provider: Arc<dyn SessionProvider>, region: &str, config: LifecycleConfig) -> Self {
        Self {
            provider,
            region: region.to_string(),
            config,
            log: ExecutionLog::default(),
            recorder: Arc::new(NoopRecorder),
        }
    }

    /// Send operator-facing messages to `sink`.
    pub fn with_log_sink(mut self, sink: LogSink) -> Self {
        self.log = ExecutionLog::new(Some(sink));
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn CallRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    async fn session(&self) -> GroupResult<Box<dyn GroupClient>> {
        self.session_in(&self.region).await
    }

    async fn session_in(&self, region: &str) -> GroupResult<Box<dyn GroupClient>> {
        debug!(%region, "opening session");
        Ok(self.provider.open(region).await?)
    }

    fn context<'a>(&'a self, client: &'a dyn GroupClient) -> OpContext<'a> {
        OpContext::new(client, &self.log, self.recorder.as_ref(), &self.config)
    }

    /// Criteria for converging to `target` within `deadline` using the
    /// configured predicate, poll interval and retry policy.
    pub fn criteria(&self, target: u32, deadline: Duration) -> ConvergenceCriteria {
        ConvergenceCriteria::from_config(&self.config, target, deadline)
    }

    // ── Lookup ─────────────────────────────────────────────────────

    /// The newest group owned by `identifier` that still has capacity, or the
    /// configured defaults.
    pub async fn find_owned_group(&self, identifier: &str) -> GroupResult<Located> {
        self.find_owned_group_in(identifier, &self.region).await
    }

    /// [`find_owned_group`](Self::find_owned_group) against another region.
    pub async fn find_owned_group_in(&self, identifier: &str, region: &str) -> GroupResult<Located> {
        let session = self.session_in(region).await?;
        locator::find_owned_group(&self.context(session.as_ref()), identifier).await
    }

    pub async fn list_group_names(&self) -> GroupResult<Vec<String>> {
        let session = self.session().await?;
        groups::list_group_names(&self.context(session.as_ref())).await
    }

    pub async fn list_groups(&self) -> GroupResult<Vec<ManagedGroup>> {
        let session = self.session().await?;
        locator::list_all_groups(&self.context(session.as_ref())).await
    }

    pub async fn get_group(&self, name: &str) -> GroupResult<Option<ManagedGroup>> {
        let session = self.session().await?;
        groups::get_group(&self.context(session.as_ref()), name).await
    }

    pub async fn list_instances(&self, name: &str) -> GroupResult<Vec<GroupInstance>> {
        let session = self.session().await?;
        groups::list_instances(&self.context(session.as_ref()), name).await
    }

    pub async fn list_instance_ids(&self, name: &str) -> GroupResult<Vec<String>> {
        Ok(self
            .list_instances(name)
            .await?
            .into_iter()
            .map(|i| i.instance_id)
            .collect())
    }

    pub async fn list_instance_states(&self, name: &str) -> GroupResult<Vec<InstanceRunStatus>> {
        let session = self.session().await?;
        groups::list_instance_states(&self.context(session.as_ref()), name).await
    }

    pub async fn desired_capacities(&self, names: &[String]) -> GroupResult<BTreeMap<String, u32>> {
        let session = self.session().await?;
        groups::desired_capacities(&self.context(session.as_ref()), names).await
    }

    pub async fn get_launch_configuration(
        &self,
        name: &str,
    ) -> GroupResult<Option<LaunchConfiguration>> {
        let session = self.session().await?;
        groups::get_launch_configuration(&self.context(session.as_ref()), name).await
    }

    // ── Groups ─────────────────────────────────────────────────────

    pub async fn create_group(&self, spec: &GroupSpec) -> GroupResult<ManagedGroup> {
        let session = self.session().await?;
        groups::create_group(&self.context(session.as_ref()), spec).await
    }

    pub async fn create_launch_configuration(
        &self,
        spec: &LaunchConfigurationSpec,
    ) -> GroupResult<()> {
        let session = self.session().await?;
        groups::create_launch_configuration(&self.context(session.as_ref()), spec).await
    }

    pub async fn delete_launch_configuration(&self, name: &str) -> GroupResult<()> {
        let session = self.session().await?;
        groups::delete_launch_configuration(&self.context(session.as_ref()), name).await
    }

    /// Delete every group in order, then its launch configuration. Individual
    /// failures are reported, never raised; only a session failure errors.
    pub async fn delete_groups(&self, groups: &[ManagedGroup]) -> GroupResult<TeardownReport> {
        let session = self.session().await?;
        Ok(teardown::delete_groups(&self.context(session.as_ref()), groups).await)
    }

    /// Set `name`'s desired capacity and wait until steady state or the
    /// criteria's deadline.
    pub async fn set_desired_capacity_and_wait(
        &self,
        name: &str,
        criteria: &ConvergenceCriteria,
    ) -> GroupResult<Converged> {
        let session = self.session().await?;
        convergence::converge(&self.context(session.as_ref()), name, criteria).await
    }

    pub async fn set_group_limits(&self, name: &str, desired: u32) -> GroupResult<()> {
        let session = self.session().await?;
        groups::set_group_limits(&self.context(session.as_ref()), name, desired).await
    }

    pub async fn set_min_size(&self, name: &str, min: u32) -> GroupResult<()> {
        if name.is_empty() {
            return Ok(());
        }
        let session = self.session().await?;
        groups::set_min_size(&self.context(session.as_ref()), name, min).await
    }

    pub async fn tag_group(&self, name: &str, key: &str, value: &str) -> GroupResult<()> {
        let session = self.session().await?;
        groups::tag_group(&self.context(session.as_ref()), name, key, value).await
    }

    // ── Load balancing ─────────────────────────────────────────────

    pub async fn register_with_load_balancers(&self, name: &str, lbs: &[String]) -> GroupResult<()> {
        let session = self.session().await?;
        groups::attach(&self.context(session.as_ref()), name, Balancer::Classic, lbs).await
    }

    pub async fn deregister_from_load_balancers(&self, name: &str, lbs: &[String]) -> GroupResult<()> {
        let session = self.session().await?;
        groups::detach(&self.context(session.as_ref()), name, Balancer::Classic, lbs).await
    }

    pub async fn register_with_target_groups(&self, name: &str, arns: &[String]) -> GroupResult<()> {
        let session = self.session().await?;
        groups::attach(&self.context(session.as_ref()), name, Balancer::TargetGroup, arns).await
    }

    pub async fn deregister_from_target_groups(&self, name: &str, arns: &[String]) -> GroupResult<()> {
        let session = self.session().await?;
        groups::detach(&self.context(session.as_ref()), name, Balancer::TargetGroup, arns).await
    }

    // ── Policies and scheduled actions ─────────────────────────────

    pub async fn export_policies(&self, name: &str) -> GroupResult<Vec<String>> {
        let session = self.session().await?;
        portability::export_policies(&self.context(session.as_ref()), name).await
    }

    pub async fn import_policies(&self, name: &str, snapshots: &[String]) -> GroupResult<BatchOutcome> {
        let session = self.session().await?;
        portability::import_policies(&self.context(session.as_ref()), name, snapshots).await
    }

    pub async fn clear_policies(&self, name: &str) -> GroupResult<usize> {
        let session = self.session().await?;
        portability::clear_policies(&self.context(session.as_ref()), name).await
    }

    pub async fn export_scheduled_actions(&self, name: &str) -> GroupResult<Vec<String>> {
        let session = self.session().await?;
        portability::export_scheduled_actions(&self.context(session.as_ref()), name).await
    }

    pub async fn import_scheduled_actions(
        &self,
        name: &str,
        snapshots: &[String],
    ) -> GroupResult<BatchOutcome> {
        let session = self.session().await?;
        portability::import_scheduled_actions(&self.context(session.as_ref()), name, snapshots).await
    }

    pub async fn clear_scheduled_actions(&self, name: &str) -> GroupResult<usize> {
        let session = self.session().await?;
        portability::clear_scheduled_actions(&self.context(session.as_ref()), name).await
    }
}
