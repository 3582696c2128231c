//! Group teardown.
//!
//! Groups are deleted one at a time. After each delete the group is polled
//! until it disappears or the wait bound passes. Launch configurations are
//! removed independently of whether their group's wait finished. Nothing
//! here fails the batch: every failure lands in the report.

use groupshift_core::{GroupError, GroupResult, ManagedGroup};
use serde::Serialize;
use tracing::{info, warn};

use crate::activity::{self, ActivityTracker};
use crate::batch::BatchOutcome;
use crate::context::OpContext;
use crate::locator::describe_group;

/// What a teardown removed and what it left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    pub groups: BatchOutcome,
    pub launch_configurations: BatchOutcome,
}

pub async fn delete_groups(ctx: &OpContext<'_>, groups: &[ManagedGroup]) -> TeardownReport {
    let mut report = TeardownReport::default();
    for group in groups {
        let mut tracker = ActivityTracker::new();
        match delete_and_wait(ctx, &group.name, &mut tracker).await {
            Ok(()) => report.groups.succeed(&group.name),
            Err(e) => {
                warn!(group = %group.name, error = %e, "group deletion did not complete");
                ctx.log.warn(&format!("Failed to delete group [{}]: {e}", group.name));
                activity::refresh(ctx, &group.name, &mut tracker, true).await;
                report.groups.skip(&group.name, e);
            }
        }

        let Some(launch_config) = group
            .launch_configuration_name
            .as_deref()
            .filter(|name| !name.is_empty())
        else {
            continue;
        };
        ctx.log.info(&format!("Deleting launch configuration [{launch_config}]"));
        ctx.track("Delete Launch Configuration");
        match ctx.client.delete_launch_configuration(launch_config).await {
            Ok(()) => report.launch_configurations.succeed(launch_config),
            Err(e) => {
                warn!(launch_config, error = %e, "launch configuration deletion failed");
                ctx.log.warn(&format!(
                    "Failed to delete launch configuration [{launch_config}]: {e}"
                ));
                activity::refresh(ctx, &group.name, &mut tracker, true).await;
                report.launch_configurations.skip(launch_config, e);
            }
        }
    }
    info!(
        deleted = report.groups.succeeded.len(),
        failed = report.groups.skipped.len(),
        "teardown finished"
    );
    report
}

async fn delete_and_wait(
    ctx: &OpContext<'_>,
    name: &str,
    tracker: &mut ActivityTracker,
) -> GroupResult<()> {
    ctx.log.info(&format!("Deleting group [{name}]"));
    ctx.track("Delete Group");
    match ctx.client.delete_group(name).await.map_err(GroupError::from) {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {
            ctx.log.info(&format!("Group [{name}] does not exist, nothing to delete"));
            return Ok(());
        }
        Err(e) => return Err(e),
    }

    let wait = ctx.config.delete_wait();
    let poll = ctx.config.poll_interval();
    let gone = tokio::time::timeout(wait, async {
        loop {
            if describe_group(ctx, name).await?.is_none() {
                return Ok::<_, GroupError>(());
            }
            activity::refresh(ctx, name, tracker, false).await;
            tokio::time::sleep(poll).await;
        }
    })
    .await;

    match gone {
        Ok(Ok(())) => {
            ctx.log.info(&format!("Group [{name}] deleted"));
            Ok(())
        }
        Ok(Err(e)) => Err(e),
        Err(_) => Err(GroupError::Timeout {
            operation: format!("waiting for group {name} to be deleted"),
            waited: wait,
        }),
    }
}
