use std::time::Duration;

use groupshift_core::HealthPredicate;
use serde_json::json;

use super::{print_json, Env};
use crate::HealthArg;

pub async fn run(
    env: &Env,
    group: &str,
    desired: u32,
    timeout_mins: u64,
    health: Option<HealthArg>,
) -> anyhow::Result<()> {
    let lifecycle = &env.lifecycle;
    if lifecycle.get_group(group).await?.is_none() {
        anyhow::bail!("group {group} does not exist in region {}", lifecycle.region());
    }
    lifecycle.set_group_limits(group, desired).await?;

    let mut criteria = lifecycle.criteria(desired, Duration::from_secs(timeout_mins * 60));
    if let Some(health) = health {
        criteria.predicate = match health {
            HealthArg::Running => HealthPredicate::AllRunning,
            HealthArg::InService => HealthPredicate::AllInServiceAndHealthy,
        };
    }
    let converged = lifecycle.set_desired_capacity_and_wait(group, &criteria).await?;
    print_json(&json!({
        "group": group,
        "desired": desired,
        "polls": converged.polls,
        "elapsed_secs": converged.elapsed.as_secs(),
    }))
}
