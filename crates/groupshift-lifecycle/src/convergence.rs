//! Capacity convergence.
//!
//! Drives a group to a target member count and waits until every member
//! satisfies the configured health predicate, bounded by a deadline. Each
//! tick re-asserts the desired capacity, lists members, refreshes the
//! activity log, and evaluates the predicate. Listing and evaluation are
//! retried per [`RetryPolicy`] before an error aborts the run.

use std::collections::BTreeMap;
use std::time::Duration;

use groupshift_client::DescribeGroups;
use groupshift_core::{
    GroupError, GroupInstance, GroupResult, HealthPredicate, HealthStatus, LifecycleConfig,
    LifecycleState, RunState,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::activity::{self, ActivityTracker};
use crate::context::OpContext;
use crate::retry::RetryPolicy;

/// What "converged" means for one run and how long to wait for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergenceCriteria {
    pub target: u32,
    pub predicate: HealthPredicate,
    pub poll_interval: Duration,
    pub deadline: Duration,
    pub retry: RetryPolicy,
}

impl ConvergenceCriteria {
    /// Criteria using the configured predicate, poll interval and retry policy.
    pub fn from_config(config: &LifecycleConfig, target: u32, deadline: Duration) -> Self {
        Self {
            target,
            predicate: config.health_predicate,
            poll_interval: config.poll_interval(),
            deadline,
            retry: RetryPolicy::from_config(config),
        }
    }
}

/// Where a convergence run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ConvergencePhase {
    Polling,
    Converged,
    TimedOut,
    Aborted,
}

/// Summary of a run that reached steady state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converged {
    pub polls: u32,
    pub elapsed: Duration,
}

/// One evaluation of the group's members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberReport {
    pub member_count: usize,
    pub satisfied: bool,
    /// Member count per observed state; empty when the count was off target.
    pub histogram: BTreeMap<String, usize>,
}

impl MemberReport {
    fn waiting_line(&self, predicate: HealthPredicate) -> String {
        let counts = self
            .histogram
            .iter()
            .map(|(state, count)| format!("{state}={count}"))
            .collect::<Vec<_>>()
            .join(",");
        match predicate {
            HealthPredicate::AllRunning => {
                format!("Waiting for instances to be in running state. {counts}")
            }
            HealthPredicate::AllInServiceAndHealthy => {
                format!("Waiting for instances to be in InService and Healthy state. {counts}")
            }
        }
    }
}

struct ConvergenceRun {
    phase: ConvergencePhase,
    polls: u32,
    tracker: ActivityTracker,
}

/// Set `group`'s desired capacity to `criteria.target` and wait for steady
/// state.
///
/// Provider errors outside the retried step abort the run. When the deadline
/// passes first, the run ends with [`GroupError::Timeout`] and an error line
/// in the operator log.
pub async fn converge(
    ctx: &OpContext<'_>,
    group: &str,
    criteria: &ConvergenceCriteria,
) -> GroupResult<Converged> {
    let started = Instant::now();
    let mut run = ConvergenceRun {
        phase: ConvergencePhase::Polling,
        polls: 0,
        tracker: ActivityTracker::new(),
    };
    ctx.log.info(&format!(
        "Set group [{group}] desired capacity to [{}]",
        criteria.target
    ));

    let outcome = tokio::time::timeout(
        criteria.deadline,
        poll_until_steady(ctx, group, criteria, &mut run),
    )
    .await;

    let result = match outcome {
        Ok(Ok(())) => {
            run.phase = ConvergencePhase::Converged;
            ctx.log.info("Group reached steady state");
            Ok(Converged {
                polls: run.polls,
                elapsed: started.elapsed(),
            })
        }
        Ok(Err(e)) => {
            run.phase = ConvergencePhase::Aborted;
            ctx.log.error(&format!("Group [{group}] failed to converge: {e}"));
            activity::refresh(ctx, group, &mut run.tracker, true).await;
            Err(e)
        }
        Err(_) => {
            run.phase = ConvergencePhase::TimedOut;
            ctx.log.error("Request timeout. Group couldn't reach steady state");
            Err(GroupError::Timeout {
                operation: format!("converging group {group} to {} members", criteria.target),
                waited: criteria.deadline,
            })
        }
    };
    info!(
        group,
        target = criteria.target,
        phase = ?run.phase,
        polls = run.polls,
        "convergence finished"
    );
    result
}

async fn poll_until_steady(
    ctx: &OpContext<'_>,
    group: &str,
    criteria: &ConvergenceCriteria,
    run: &mut ConvergenceRun,
) -> GroupResult<()> {
    loop {
        run.polls += 1;
        ctx.track("Set Desired Capacity");
        ctx.client.set_desired_capacity(group, criteria.target).await?;
        if run.polls == 1 {
            ctx.log.info("Successfully set desired capacity");
        }

        let report = criteria
            .retry
            .run("evaluate group members", |_| {
                evaluate_members(ctx, group, criteria.target, criteria.predicate)
            })
            .await?;

        activity::refresh(ctx, group, &mut run.tracker, false).await;

        debug!(
            group,
            poll = run.polls,
            members = report.member_count,
            satisfied = report.satisfied,
            "convergence tick"
        );
        if report.satisfied {
            return Ok(());
        }
        if !report.histogram.is_empty() {
            ctx.log.info(&report.waiting_line(criteria.predicate));
        }
        tokio::time::sleep(criteria.poll_interval).await;
    }
}

/// List the group's members and check them against `predicate`.
///
/// The predicate is only evaluated once the member count equals `target`.
pub async fn evaluate_members(
    ctx: &OpContext<'_>,
    group: &str,
    target: u32,
    predicate: HealthPredicate,
) -> GroupResult<MemberReport> {
    ctx.track("Describe Groups");
    let page = ctx.client.describe_groups(&DescribeGroups::named(group)).await?;
    let members = page
        .items
        .into_iter()
        .find(|g| g.name == group)
        .map(|g| g.instances)
        .unwrap_or_default();

    if members.len() != target as usize {
        return Ok(MemberReport {
            member_count: members.len(),
            satisfied: false,
            histogram: BTreeMap::new(),
        });
    }

    let (satisfied, histogram) = match predicate {
        HealthPredicate::AllRunning => all_running(ctx, &members).await?,
        HealthPredicate::AllInServiceAndHealthy => all_in_service_and_healthy(&members),
    };
    Ok(MemberReport {
        member_count: members.len(),
        satisfied,
        histogram: if satisfied { BTreeMap::new() } else { histogram },
    })
}

async fn all_running(
    ctx: &OpContext<'_>,
    members: &[GroupInstance],
) -> GroupResult<(bool, BTreeMap<String, usize>)> {
    if members.is_empty() {
        return Ok((true, BTreeMap::new()));
    }
    let ids: Vec<String> = members.iter().map(|m| m.instance_id.clone()).collect();
    ctx.track("Describe Instances");
    let statuses = ctx.client.describe_instance_states(&ids).await?;

    let mut histogram = BTreeMap::new();
    let mut satisfied = true;
    for id in &ids {
        let state = statuses.iter().find(|s| &s.instance_id == id).map(|s| s.state);
        if state != Some(RunState::Running) {
            satisfied = false;
        }
        let key = state.map_or_else(|| "unknown".to_string(), |s| s.to_string());
        *histogram.entry(key).or_insert(0) += 1;
    }
    if statuses.len() < ids.len() {
        warn!(
            expected = ids.len(),
            reported = statuses.len(),
            "compute inventory is missing group members"
        );
    }
    Ok((satisfied, histogram))
}

fn all_in_service_and_healthy(members: &[GroupInstance]) -> (bool, BTreeMap<String, usize>) {
    let satisfied = members.iter().all(|m| {
        m.lifecycle_state == Some(LifecycleState::InService)
            && m.health_status == Some(HealthStatus::Healthy)
    });
    let mut histogram = BTreeMap::new();
    for member in members {
        let key = member
            .lifecycle_state
            .map_or_else(|| "unknown".to_string(), |s| s.to_string());
        *histogram.entry(key).or_insert(0) += 1;
    }
    (satisfied, histogram)
}
