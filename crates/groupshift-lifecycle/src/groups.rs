//! Single-group operations: creation, lookup, bounds, tags, and load
//! balancer attachment.

use std::collections::BTreeMap;

use groupshift_client::{drain, DescribeGroups, GroupTag, GroupUpdate, LaunchConfigurationSpec};
use groupshift_core::{
    absorb, GroupError, GroupInstance, GroupResult, GroupSpec, InstanceRunStatus,
    LaunchConfiguration, ManagedGroup,
};
use tracing::{debug, info};

use crate::activity::{self, ActivityTracker};
use crate::context::OpContext;
use crate::locator::{describe_group, list_all_groups};

/// Create a group and return its first snapshot.
///
/// On failure the group's recent activities, causes included, are written
/// to the operator log before the error is returned.
pub async fn create_group(ctx: &OpContext<'_>, spec: &GroupSpec) -> GroupResult<ManagedGroup> {
    ctx.log.info(&format!("Creating group [{}]", spec.name));
    ctx.track("Create Group");
    if let Err(e) = ctx.client.create_group(spec).await {
        activity::refresh(ctx, &spec.name, &mut ActivityTracker::new(), true).await;
        return Err(e.into());
    }
    match describe_group(ctx, &spec.name).await? {
        Some(group) => Ok(group),
        None => {
            debug!(group = %spec.name, "created group not visible yet");
            Ok(ManagedGroup {
                name: spec.name.clone(),
                min_size: spec.min_size,
                max_size: spec.max_size,
                desired_capacity: spec.desired_capacity,
                launch_configuration_name: spec.launch_configuration_name.clone(),
                created_time: 0,
                tags: spec.tags.clone(),
                instances: Vec::new(),
                load_balancer_names: spec.load_balancer_names.clone(),
                target_group_arns: spec.target_group_arns.clone(),
            })
        }
    }
}

pub async fn list_group_names(ctx: &OpContext<'_>) -> GroupResult<Vec<String>> {
    Ok(list_all_groups(ctx)
        .await?
        .into_iter()
        .map(|g| g.name)
        .collect())
}

/// Snapshot of one group; an empty name looks nothing up.
pub async fn get_group(ctx: &OpContext<'_>, name: &str) -> GroupResult<Option<ManagedGroup>> {
    if name.is_empty() {
        return Ok(None);
    }
    describe_group(ctx, name).await
}

/// Members of `name`; empty when the group does not exist.
pub async fn list_instances(ctx: &OpContext<'_>, name: &str) -> GroupResult<Vec<GroupInstance>> {
    Ok(get_group(ctx, name)
        .await?
        .map(|g| g.instances)
        .unwrap_or_default())
}

/// Machine states of every member of `name`.
pub async fn list_instance_states(
    ctx: &OpContext<'_>,
    name: &str,
) -> GroupResult<Vec<InstanceRunStatus>> {
    let ids: Vec<String> = list_instances(ctx, name)
        .await?
        .into_iter()
        .map(|i| i.instance_id)
        .collect();
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    ctx.track("Describe Instances");
    Ok(ctx.client.describe_instance_states(&ids).await?)
}

/// Desired capacity of each named group the provider knows.
pub async fn desired_capacities(
    ctx: &OpContext<'_>,
    names: &[String],
) -> GroupResult<BTreeMap<String, u32>> {
    if names.is_empty() {
        return Ok(BTreeMap::new());
    }
    let groups = drain(|next_token| {
        ctx.track("Describe Groups");
        let request = DescribeGroups {
            names: names.to_vec(),
            next_token,
            max_records: None,
        };
        async move { ctx.client.describe_groups(&request).await }
    })
    .await?;
    Ok(groups
        .into_iter()
        .map(|g| (g.name, g.desired_capacity))
        .collect())
}

/// Widen `name`'s bounds just enough that `desired` fits. A missing group
/// is left alone.
pub async fn set_group_limits(ctx: &OpContext<'_>, name: &str, desired: u32) -> GroupResult<()> {
    let Some(group) = describe_group(ctx, name).await? else {
        debug!(group = name, "no such group, limits unchanged");
        return Ok(());
    };
    let update = if desired < group.min_size {
        ctx.log.info(&format!(
            "Group [{name}] has min size [{}] > desired capacity [{desired}]. Updating",
            group.min_size
        ));
        GroupUpdate {
            name: name.to_string(),
            min_size: Some(desired),
            ..Default::default()
        }
    } else if desired > group.max_size {
        ctx.log.info(&format!(
            "Group [{name}] has max size [{}] < desired capacity [{desired}]. Updating",
            group.max_size
        ));
        GroupUpdate {
            name: name.to_string(),
            max_size: Some(desired),
            ..Default::default()
        }
    } else {
        return Ok(());
    };
    ctx.track("Update Group");
    ctx.client.update_group(&update).await.map_err(|e| {
        ctx.log.warn(&format!("Exception: [{e}] while setting group limits"));
        GroupError::from(e)
    })
}

/// Set the lower bound of `name`. An empty name or a missing group is a
/// no-op.
pub async fn set_min_size(ctx: &OpContext<'_>, name: &str, min: u32) -> GroupResult<()> {
    if get_group(ctx, name).await?.is_none() {
        return Ok(());
    }
    ctx.log.info(&format!("Setting min capacity of group [{name}] to [{min}]"));
    ctx.track("Update Group");
    let update = GroupUpdate {
        name: name.to_string(),
        min_size: Some(min),
        ..Default::default()
    };
    ctx.client.update_group(&update).await.map_err(|e| {
        ctx.log.warn(&format!("Exception: [{e}] while setting group limits"));
        GroupError::from(e)
    })
}

/// Add or overwrite one tag; the tag propagates to new members.
pub async fn tag_group(ctx: &OpContext<'_>, name: &str, key: &str, value: &str) -> GroupResult<()> {
    ctx.log.info(&format!(
        "Tagging group [{name}] with tag: [{key}] -> [{value}]"
    ));
    ctx.track("Create Or Update Tags");
    let tag = GroupTag {
        group_name: name.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        propagate_at_launch: true,
    };
    Ok(ctx.client.create_or_update_tags(&[tag]).await?)
}

// ── Launch configurations ─────────────────────────────────────────

pub async fn create_launch_configuration(
    ctx: &OpContext<'_>,
    spec: &LaunchConfigurationSpec,
) -> GroupResult<()> {
    ctx.track("Create Launch Configuration");
    ctx.client.create_launch_configuration(spec).await?;
    info!(launch_config = %spec.name, "launch configuration created");
    Ok(())
}

pub async fn get_launch_configuration(
    ctx: &OpContext<'_>,
    name: &str,
) -> GroupResult<Option<LaunchConfiguration>> {
    let names = [name.to_string()];
    ctx.track("Describe Launch Configurations");
    let page = ctx.client.describe_launch_configurations(&names, None).await?;
    Ok(page.items.into_iter().find(|lc| lc.name == name))
}

pub async fn delete_launch_configuration(ctx: &OpContext<'_>, name: &str) -> GroupResult<()> {
    ctx.track("Delete Launch Configuration");
    Ok(ctx.client.delete_launch_configuration(name).await?)
}

// ── Load balancing ────────────────────────────────────────────────

/// Which kind of load balancer a group is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Balancer {
    Classic,
    TargetGroup,
}

impl Balancer {
    fn plural(self) -> &'static str {
        match self {
            Self::Classic => "classic load balancers",
            Self::TargetGroup => "Target Groups",
        }
    }
}

pub async fn attach(
    ctx: &OpContext<'_>,
    group: &str,
    kind: Balancer,
    targets: &[String],
) -> GroupResult<()> {
    if targets.is_empty() {
        ctx.log.info(&format!("No {} to attach to: [{group}]", kind.plural()));
        return Ok(());
    }
    ctx.log.info(&format!(
        "Attaching {} [{}] to group [{group}]",
        kind.plural(),
        targets.join(",")
    ));
    match kind {
        Balancer::Classic => {
            ctx.track("Attach Load Balancers");
            ctx.client.attach_load_balancers(group, targets).await?;
        }
        Balancer::TargetGroup => {
            ctx.track("Attach Target Groups");
            ctx.client.attach_target_groups(group, targets).await?;
        }
    }
    Ok(())
}

/// Detach `targets`; targets already gone count as detached.
pub async fn detach(
    ctx: &OpContext<'_>,
    group: &str,
    kind: Balancer,
    targets: &[String],
) -> GroupResult<()> {
    if targets.is_empty() {
        ctx.log.info(&format!("No {} to detach from: [{group}]", kind.plural()));
        return Ok(());
    }
    ctx.log.info(&format!(
        "Detaching {} [{}] from group [{group}]",
        kind.plural(),
        targets.join(",")
    ));
    let result = match kind {
        Balancer::Classic => {
            ctx.track("Detach Load Balancers");
            ctx.client.detach_load_balancers(group, targets).await
        }
        Balancer::TargetGroup => {
            ctx.track("Detach Target Groups");
            ctx.client.detach_target_groups(group, targets).await
        }
    };
    if absorb(result)?.is_none() {
        ctx.log.info(&format!(
            "{} already detached from group [{group}]",
            kind.plural()
        ));
    }
    Ok(())
}
