//! Moving scaling policies and scheduled actions between groups.
//!
//! Export turns every attached item into a self-contained JSON snapshot with
//! group identity removed. Import recreates snapshots on another group one
//! by one; an entry that cannot be decoded or written is skipped and the
//! rest still proceed.

use groupshift_client::drain;
use groupshift_core::{
    GroupResult, PortablePolicy, PortableScheduledAction, ScalingPolicy, ScheduledAction,
};
use tracing::{debug, info, warn};

use crate::batch::BatchOutcome;
use crate::context::OpContext;

async fn list_policies(ctx: &OpContext<'_>, group: &str) -> GroupResult<Vec<ScalingPolicy>> {
    let policies = drain(|next_token| {
        ctx.track("Describe Policies");
        async move { ctx.client.describe_policies(group, next_token).await }
    })
    .await?;
    Ok(policies)
}

async fn list_scheduled_actions(
    ctx: &OpContext<'_>,
    group: &str,
) -> GroupResult<Vec<ScheduledAction>> {
    let page_size = ctx.config.scheduled_actions_page_size;
    let actions = drain(|next_token| {
        ctx.track("Describe Scheduled Actions");
        async move {
            ctx.client
                .describe_scheduled_actions(group, next_token, Some(page_size))
                .await
        }
    })
    .await?;
    Ok(actions)
}

// ── Scaling policies ──────────────────────────────────────────────

/// Portable snapshots of every scaling policy attached to `group`.
pub async fn export_policies(ctx: &OpContext<'_>, group: &str) -> GroupResult<Vec<String>> {
    ctx.log.info(&format!("Extracting scaling policy JSONs from: [{group}]"));
    let policies = list_policies(ctx, group).await?;
    if policies.is_empty() {
        ctx.log.info("No scaling policy found");
        return Ok(Vec::new());
    }

    let mut snapshots = Vec::with_capacity(policies.len());
    for policy in &policies {
        ctx.log.info(&format!("Found scaling policy: [{}]", policy.policy_arn));
        match PortablePolicy::from(policy).to_json() {
            Ok(json) => snapshots.push(json),
            Err(e) => warn!(policy = %policy.policy_arn, error = %e, "policy snapshot failed"),
        }
    }
    Ok(snapshots)
}

/// Recreate each snapshot as a policy on `group`.
pub async fn import_policies(
    ctx: &OpContext<'_>,
    group: &str,
    snapshots: &[String],
) -> GroupResult<BatchOutcome> {
    ctx.log.info(&format!("Attaching scaling policies to group: [{group}]"));
    let mut outcome = BatchOutcome::default();
    if snapshots.is_empty() {
        ctx.log.info("No scaling policy to attach");
        return Ok(outcome);
    }

    for (index, snapshot) in snapshots.iter().enumerate() {
        let entry = format!("entry #{index}");
        if snapshot.trim().is_empty() {
            outcome.skip(entry, "empty snapshot");
            continue;
        }
        let policy = match PortablePolicy::from_json(snapshot) {
            Ok(policy) => policy,
            Err(e) => {
                ctx.log.warn(&format!("Skipping unreadable scaling policy {entry}: {e}"));
                outcome.skip(entry, e);
                continue;
            }
        };
        ctx.track("Put Scaling Policy");
        match ctx.client.put_scaling_policy(group, &policy).await {
            Ok(arn) => {
                ctx.log.info(&format!("Created policy with Arn: [{arn}]"));
                outcome.succeed(policy.policy_name);
            }
            Err(e) => {
                ctx.log.warn(&format!(
                    "Failed to attach scaling policy [{}]: {e}",
                    policy.policy_name
                ));
                outcome.skip(policy.policy_name, e);
            }
        }
    }
    info!(
        group,
        attached = outcome.succeeded.len(),
        skipped = outcome.skipped.len(),
        "scaling policies imported"
    );
    Ok(outcome)
}

/// Delete every scaling policy attached to `group`. Returns how many were
/// removed.
pub async fn clear_policies(ctx: &OpContext<'_>, group: &str) -> GroupResult<usize> {
    let policies = list_policies(ctx, group).await?;
    if policies.is_empty() {
        ctx.log.info(&format!("No scaling policies to delete from group: [{group}]"));
        return Ok(0);
    }
    for policy in &policies {
        ctx.log.info(&format!("Deleting scaling policy: [{}]", policy.policy_arn));
        ctx.track("Delete Policy");
        ctx.client.delete_policy(group, &policy.policy_arn).await?;
    }
    debug!(group, count = policies.len(), "scaling policies cleared");
    Ok(policies.len())
}

// ── Scheduled actions ─────────────────────────────────────────────

/// Portable snapshots of every scheduled action of `group`.
pub async fn export_scheduled_actions(
    ctx: &OpContext<'_>,
    group: &str,
) -> GroupResult<Vec<String>> {
    ctx.log.info(&format!("Extracting scheduled action JSONs from: [{group}]"));
    let actions = list_scheduled_actions(ctx, group).await?;
    if actions.is_empty() {
        ctx.log.info("No scheduled action found");
        return Ok(Vec::new());
    }

    let mut snapshots = Vec::with_capacity(actions.len());
    for action in &actions {
        ctx.log.info(&format!(
            "Found scheduled action: [{}]",
            action.scheduled_action_arn
        ));
        match PortableScheduledAction::from(action).to_json() {
            Ok(json) => snapshots.push(json),
            Err(e) => {
                warn!(action = %action.scheduled_action_arn, error = %e, "scheduled action snapshot failed")
            }
        }
    }
    Ok(snapshots)
}

/// Recreate each snapshot as a scheduled action on `group`.
pub async fn import_scheduled_actions(
    ctx: &OpContext<'_>,
    group: &str,
    snapshots: &[String],
) -> GroupResult<BatchOutcome> {
    ctx.log.info(&format!("Attaching scheduled actions to group: [{group}]"));
    let mut outcome = BatchOutcome::default();
    if snapshots.is_empty() {
        ctx.log.info("No scheduled action to attach");
        return Ok(outcome);
    }

    for (index, snapshot) in snapshots.iter().enumerate() {
        let entry = format!("entry #{index}");
        if snapshot.trim().is_empty() {
            outcome.skip(entry, "empty snapshot");
            continue;
        }
        let action = match PortableScheduledAction::from_json(snapshot) {
            Ok(action) => action,
            Err(e) => {
                ctx.log.warn(&format!("Skipping unreadable scheduled action {entry}: {e}"));
                outcome.skip(entry, e);
                continue;
            }
        };
        ctx.track("Put Scheduled Action");
        match ctx.client.put_scheduled_action(group, &action).await {
            Ok(()) => {
                ctx.log.info(&format!(
                    "Created scheduled action: [{}]",
                    action.scheduled_action_name
                ));
                outcome.succeed(action.scheduled_action_name);
            }
            Err(e) => {
                ctx.log.warn(&format!(
                    "Failed to attach scheduled action [{}]: {e}",
                    action.scheduled_action_name
                ));
                outcome.skip(action.scheduled_action_name, e);
            }
        }
    }
    info!(
        group,
        attached = outcome.succeeded.len(),
        skipped = outcome.skipped.len(),
        "scheduled actions imported"
    );
    Ok(outcome)
}

/// Delete every scheduled action of `group`. Returns how many were removed.
pub async fn clear_scheduled_actions(ctx: &OpContext<'_>, group: &str) -> GroupResult<usize> {
    let actions = list_scheduled_actions(ctx, group).await?;
    if actions.is_empty() {
        ctx.log.info(&format!("No scheduled actions to delete from group: [{group}]"));
        return Ok(0);
    }
    for action in &actions {
        ctx.log.info(&format!(
            "Deleting scheduled action: [{}]",
            action.body.scheduled_action_name
        ));
        ctx.track("Delete Scheduled Action");
        ctx.client
            .delete_scheduled_action(group, &action.body.scheduled_action_name)
            .await?;
    }
    Ok(actions.len())
}
