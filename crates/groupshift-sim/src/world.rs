//! The simulated region: groups, members, launch configurations,
//! policies, scheduled actions, and scaling activities.
//!
//! Members do not appear instantly. Capacity changes enqueue `Pending`
//! instances that become `InService`/`Healthy` (machine state `running`)
//! after `boot_ticks` describes of their group, and deleted groups stay
//! visible for `delete_ticks` describes. This gives the lifecycle engine
//! the same eventual consistency it sees from a real control plane.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use groupshift_client::{GroupTag, GroupUpdate, LaunchConfigurationSpec, ProviderResult};
use groupshift_core::{
    Activity, GroupInstance, GroupSpec, HealthStatus, InstanceRunStatus, LaunchConfiguration,
    LifecycleState, ManagedGroup, PortablePolicy, PortableScheduledAction, ProviderError, RunState,
    ScalingPolicy, ScheduledAction, Service,
};

fn validation(message: String) -> ProviderError {
    ProviderError::service(Service::AutoScaling, "ValidationError", message).with_status(400)
}

fn group_not_found(name: &str) -> ProviderError {
    validation(format!("AutoScalingGroup name not found - {name}"))
}

/// Per-instance bookkeeping the provider would not expose directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimMember {
    /// Describes observed since launch.
    pub age: u32,
    pub run_state: RunState,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct World {
    pub region: String,
    /// Logical clock used for creation timestamps.
    pub clock: u64,
    pub next_id: u64,
    pub boot_ticks: u32,
    pub delete_ticks: u32,
    pub page_size: usize,
    pub groups: BTreeMap<String, ManagedGroup>,
    pub members: BTreeMap<String, SimMember>,
    /// Groups being deleted → describes left before they vanish.
    pub deleting: BTreeMap<String, u32>,
    pub launch_configurations: BTreeMap<String, LaunchConfiguration>,
    pub policies: Vec<ScalingPolicy>,
    pub scheduled_actions: Vec<ScheduledAction>,
    pub activities: BTreeMap<String, Vec<Activity>>,
}

impl Default for World {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            clock: 1_000,
            next_id: 1,
            boot_ticks: 1,
            delete_ticks: 0,
            page_size: 50,
            groups: BTreeMap::new(),
            members: BTreeMap::new(),
            deleting: BTreeMap::new(),
            launch_configurations: BTreeMap::new(),
            policies: Vec::new(),
            scheduled_actions: Vec::new(),
            activities: BTreeMap::new(),
        }
    }
}

/// Slice `items` into a page starting at the offset encoded in `token`.
pub(crate) fn paginate<T: Clone>(
    items: &[T],
    token: Option<&str>,
    page_size: usize,
) -> ProviderResult<(Vec<T>, Option<String>)> {
    let start = match token {
        Some(t) => t
            .parse::<usize>()
            .map_err(|_| validation(format!("invalid NextToken: {t}")))?,
        None => 0,
    };
    let page_size = page_size.max(1);
    let end = (start + page_size).min(items.len());
    let page = items.get(start..end).unwrap_or_default().to_vec();
    let next = (end < items.len()).then(|| end.to_string());
    Ok((page, next))
}

impl World {
    fn tick_clock(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}-{:08x}", self.next_id);
        self.next_id += 1;
        id
    }

    fn record_activity(&mut self, group: &str, description: String, progress: u8) -> String {
        let activity_id = self.fresh_id("act");
        self.activities
            .entry(group.to_string())
            .or_default()
            .push(Activity {
                activity_id: activity_id.clone(),
                description,
                details: None,
                progress,
                status_code: if progress >= 100 { "Successful" } else { "InProgress" }.to_string(),
                cause: Some(format!("At {} a user request changed the desired capacity.", self.clock)),
            });
        activity_id
    }

    /// Add a group directly (seeding, not a provider call).
    pub fn seed_group(&mut self, group: ManagedGroup) {
        for instance in &group.instances {
            let run_state = match instance.lifecycle_state {
                Some(LifecycleState::InService) => RunState::Running,
                Some(LifecycleState::Terminated) => RunState::Terminated,
                _ => RunState::Pending,
            };
            self.members
                .insert(instance.instance_id.clone(), SimMember { age: 0, run_state });
        }
        self.groups.insert(group.name.clone(), group);
    }

    /// Bring one group one step closer to its desired capacity.
    pub(crate) fn advance(&mut self, name: &str) {
        if let Some(left) = self.deleting.get_mut(name) {
            if *left == 0 {
                self.deleting.remove(name);
                self.groups.remove(name);
                return;
            }
            *left -= 1;
        }

        let Some(group) = self.groups.get(name) else {
            return;
        };
        let desired = group.desired_capacity as usize;
        let current = group.instances.len();

        if current < desired {
            for _ in current..desired {
                let id = self.fresh_id("i");
                self.members.insert(
                    id.clone(),
                    SimMember { age: 0, run_state: RunState::Pending },
                );
                self.record_activity(name, format!("Launching a new EC2 instance: {id}"), 0);
                if let Some(group) = self.groups.get_mut(name) {
                    group.instances.push(GroupInstance {
                        instance_id: id,
                        lifecycle_state: Some(LifecycleState::Pending),
                        health_status: Some(HealthStatus::Healthy),
                    });
                }
            }
        } else if current > desired {
            let removed: Vec<GroupInstance> = match self.groups.get_mut(name) {
                Some(group) => group.instances.drain(desired..).collect(),
                None => Vec::new(),
            };
            for instance in removed {
                if let Some(member) = self.members.get_mut(&instance.instance_id) {
                    member.run_state = RunState::Terminated;
                }
                self.record_activity(
                    name,
                    format!("Terminating EC2 instance: {}", instance.instance_id),
                    100,
                );
            }
        }

        let boot_ticks = self.boot_ticks;
        let mut booted = Vec::new();
        if let Some(group) = self.groups.get_mut(name) {
            for instance in &mut group.instances {
                let Some(member) = self.members.get_mut(&instance.instance_id) else {
                    continue;
                };
                if instance.lifecycle_state != Some(LifecycleState::Pending) {
                    continue;
                }
                member.age = member.age.saturating_add(1);
                if member.age >= boot_ticks {
                    member.run_state = RunState::Running;
                    instance.lifecycle_state = Some(LifecycleState::InService);
                    booted.push(instance.instance_id.clone());
                }
            }
        }
        if let Some(activities) = self.activities.get_mut(name) {
            for activity in activities.iter_mut() {
                if booted.iter().any(|id| activity.description.ends_with(id.as_str())) {
                    activity.progress = 100;
                    activity.status_code = "Successful".to_string();
                }
            }
        }
    }

    // ── Describe ───────────────────────────────────────────────────

    pub(crate) fn describe_groups(&mut self, names: &[String]) -> Vec<ManagedGroup> {
        let targets: Vec<String> = if names.is_empty() {
            self.groups.keys().cloned().collect()
        } else {
            names.to_vec()
        };
        for name in &targets {
            self.advance(name);
        }
        targets
            .iter()
            .filter_map(|name| self.groups.get(name).cloned())
            .collect()
    }

    pub(crate) fn instance_states(&self, ids: &[String]) -> Vec<InstanceRunStatus> {
        ids.iter()
            .filter_map(|id| {
                self.members.get(id).map(|m| InstanceRunStatus {
                    instance_id: id.clone(),
                    state: m.run_state,
                })
            })
            .collect()
    }

    // ── Groups ─────────────────────────────────────────────────────

    pub(crate) fn create_group(&mut self, spec: &GroupSpec) -> ProviderResult<()> {
        if self.groups.contains_key(&spec.name) {
            return Err(ProviderError::service(
                Service::AutoScaling,
                "AlreadyExists",
                format!("AutoScalingGroup by this name already exists - {}", spec.name),
            ));
        }
        if let Some(lc) = &spec.launch_configuration_name
            && !self.launch_configurations.contains_key(lc)
        {
            return Err(validation(format!("Launch configuration name not found - {lc}")));
        }
        if !(spec.min_size <= spec.desired_capacity && spec.desired_capacity <= spec.max_size) {
            return Err(validation(format!(
                "Desired capacity:{} must be between the specified min size:{} and max size:{}",
                spec.desired_capacity, spec.min_size, spec.max_size
            )));
        }
        let created_time = self.tick_clock();
        self.groups.insert(
            spec.name.clone(),
            ManagedGroup {
                name: spec.name.clone(),
                min_size: spec.min_size,
                max_size: spec.max_size,
                desired_capacity: spec.desired_capacity,
                launch_configuration_name: spec.launch_configuration_name.clone(),
                created_time,
                tags: spec.tags.clone(),
                instances: Vec::new(),
                load_balancer_names: spec.load_balancer_names.clone(),
                target_group_arns: spec.target_group_arns.clone(),
            },
        );
        Ok(())
    }

    fn group_mut(&mut self, name: &str) -> ProviderResult<&mut ManagedGroup> {
        if self.deleting.contains_key(name) {
            return Err(validation(format!(
                "AutoScalingGroup {name} is pending delete"
            )));
        }
        self.groups.get_mut(name).ok_or_else(|| group_not_found(name))
    }

    pub(crate) fn update_group(&mut self, update: &GroupUpdate) -> ProviderResult<()> {
        let group = self.group_mut(&update.name)?;
        let min = update.min_size.unwrap_or(group.min_size);
        let max = update.max_size.unwrap_or(group.max_size);
        let mut desired = update.desired_capacity.unwrap_or(group.desired_capacity);
        if min > max {
            return Err(validation(format!(
                "Max bound, {max}, must be greater than or equal to min bound, {min}"
            )));
        }
        // Narrowed bounds pull desired capacity along with them.
        desired = desired.clamp(min, max);
        group.min_size = min;
        group.max_size = max;
        group.desired_capacity = desired;
        Ok(())
    }

    pub(crate) fn set_desired_capacity(&mut self, name: &str, desired: u32) -> ProviderResult<()> {
        let group = self.group_mut(name)?;
        if desired > group.max_size {
            return Err(validation(format!(
                "New SetDesiredCapacity value {desired} is above max value {} for the AutoScalingGroup.",
                group.max_size
            )));
        }
        if desired < group.min_size {
            return Err(validation(format!(
                "New SetDesiredCapacity value {desired} is below min value {} for the AutoScalingGroup.",
                group.min_size
            )));
        }
        group.desired_capacity = desired;
        Ok(())
    }

    pub(crate) fn delete_group(&mut self, name: &str) -> ProviderResult<()> {
        if !self.groups.contains_key(name) {
            return Err(group_not_found(name));
        }
        if self.deleting.contains_key(name) {
            return Ok(());
        }
        let instances = self
            .groups
            .get(name)
            .map(|g| g.instance_ids())
            .unwrap_or_default();
        for id in instances {
            if let Some(member) = self.members.get_mut(&id) {
                member.run_state = RunState::ShuttingDown;
            }
        }
        self.policies.retain(|p| p.group_name != name);
        self.scheduled_actions.retain(|a| a.group_name != name);
        self.record_activity(name, format!("Deleting AutoScalingGroup {name}"), 0);
        if self.delete_ticks == 0 {
            self.groups.remove(name);
        } else {
            self.deleting.insert(name.to_string(), self.delete_ticks);
        }
        Ok(())
    }

    pub(crate) fn tag(&mut self, tags: &[GroupTag]) -> ProviderResult<()> {
        for tag in tags {
            let group = self.group_mut(&tag.group_name)?;
            group.tags.insert(tag.key.clone(), tag.value.clone());
        }
        Ok(())
    }

    // ── Launch configurations ─────────────────────────────────────

    pub(crate) fn create_launch_configuration(
        &mut self,
        spec: &LaunchConfigurationSpec,
    ) -> ProviderResult<()> {
        if self.launch_configurations.contains_key(&spec.name) {
            return Err(ProviderError::service(
                Service::AutoScaling,
                "AlreadyExists",
                format!("Launch Configuration by this name already exists - {}", spec.name),
            ));
        }
        let created_time = self.tick_clock();
        self.launch_configurations.insert(
            spec.name.clone(),
            LaunchConfiguration {
                name: spec.name.clone(),
                image_id: spec.image_id.clone(),
                instance_type: spec.instance_type.clone(),
                security_groups: spec.security_groups.clone(),
                key_name: spec.key_name.clone(),
                user_data: spec.user_data.clone(),
                created_time,
            },
        );
        Ok(())
    }

    pub(crate) fn delete_launch_configuration(&mut self, name: &str) -> ProviderResult<()> {
        let in_use = self
            .groups
            .iter()
            .filter(|(group, _)| !self.deleting.contains_key(*group))
            .any(|(_, g)| g.launch_configuration_name.as_deref() == Some(name));
        if in_use {
            return Err(ProviderError::service(
                Service::AutoScaling,
                "ResourceInUse",
                format!("Cannot delete launch configuration {name} because it is attached to AutoScalingGroup"),
            ));
        }
        self.launch_configurations
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| validation(format!("Launch configuration name not found - {name}")))
    }

    // ── Policies and scheduled actions ─────────────────────────────

    pub(crate) fn put_policy(&mut self, group: &str, policy: &PortablePolicy) -> ProviderResult<String> {
        self.group_mut(group)?;
        let id = self.fresh_id("pol");
        let policy_arn = format!(
            "arn:sim:autoscaling:{}:scalingPolicy:{id}:autoScalingGroupName/{group}:policyName/{}",
            self.region, policy.policy_name
        );
        self.policies
            .retain(|p| !(p.group_name == group && p.body.policy_name == policy.policy_name));
        self.policies.push(ScalingPolicy {
            policy_arn: policy_arn.clone(),
            group_name: group.to_string(),
            body: policy.clone(),
        });
        Ok(policy_arn)
    }

    pub(crate) fn delete_policy(&mut self, group: &str, policy: &str) -> ProviderResult<()> {
        self.group_mut(group)?;
        let before = self.policies.len();
        self.policies.retain(|p| {
            !(p.group_name == group && (p.policy_arn == policy || p.body.policy_name == policy))
        });
        if self.policies.len() == before {
            return Err(validation(format!("Policy {policy} not found for group {group}")));
        }
        Ok(())
    }

    pub(crate) fn put_scheduled_action(
        &mut self,
        group: &str,
        action: &PortableScheduledAction,
    ) -> ProviderResult<()> {
        self.group_mut(group)?;
        let id = self.fresh_id("sch");
        self.scheduled_actions.retain(|a| {
            !(a.group_name == group && a.body.scheduled_action_name == action.scheduled_action_name)
        });
        self.scheduled_actions.push(ScheduledAction {
            scheduled_action_arn: format!(
                "arn:sim:autoscaling:{}:scheduledUpdateGroupAction:{id}:autoScalingGroupName/{group}:scheduledActionName/{}",
                self.region, action.scheduled_action_name
            ),
            group_name: group.to_string(),
            body: action.clone(),
        });
        Ok(())
    }

    pub(crate) fn delete_scheduled_action(&mut self, group: &str, name: &str) -> ProviderResult<()> {
        self.group_mut(group)?;
        let before = self.scheduled_actions.len();
        self.scheduled_actions
            .retain(|a| !(a.group_name == group && a.body.scheduled_action_name == name));
        if self.scheduled_actions.len() == before {
            return Err(validation(format!("Scheduled action name not found - {name}")));
        }
        Ok(())
    }

    // ── Load balancing ─────────────────────────────────────────────

    pub(crate) fn attach(&mut self, group: &str, targets: &[String], classic: bool) -> ProviderResult<()> {
        let group = self.group_mut(group)?;
        let attached = if classic {
            &mut group.load_balancer_names
        } else {
            &mut group.target_group_arns
        };
        for target in targets {
            if !attached.contains(target) {
                attached.push(target.clone());
            }
        }
        Ok(())
    }

    pub(crate) fn detach(&mut self, group: &str, targets: &[String], classic: bool) -> ProviderResult<()> {
        let group_name = group.to_string();
        let group = self.group_mut(group)?;
        let attached = if classic {
            &mut group.load_balancer_names
        } else {
            &mut group.target_group_arns
        };
        if targets.iter().any(|t| !attached.contains(t)) {
            let kind = if classic { "Load Balancers" } else { "Target Groups" };
            return Err(validation(format!(
                "Trying to remove {kind} that are not part of the group {group_name}"
            )));
        }
        attached.retain(|t| !targets.contains(t));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, desired: u32) -> GroupSpec {
        GroupSpec {
            name: name.to_string(),
            min_size: 0,
            max_size: 5,
            desired_capacity: desired,
            ..Default::default()
        }
    }

    #[test]
    fn members_boot_after_configured_ticks() {
        let mut world = World { boot_ticks: 2, ..Default::default() };
        world.create_group(&spec("web__1", 2)).unwrap();

        let first = world.describe_groups(&["web__1".to_string()]);
        assert_eq!(first[0].instances.len(), 2);
        assert!(first[0]
            .instances
            .iter()
            .all(|i| i.lifecycle_state == Some(LifecycleState::Pending)));

        let second = world.describe_groups(&["web__1".to_string()]);
        assert!(second[0]
            .instances
            .iter()
            .all(|i| i.lifecycle_state == Some(LifecycleState::InService)));
        let states = world.instance_states(&second[0].instance_ids());
        assert!(states.iter().all(|s| s.state == RunState::Running));
    }

    #[test]
    fn scale_in_terminates_excess_members() {
        let mut world = World::default();
        world.create_group(&spec("web__1", 3)).unwrap();
        world.describe_groups(&[]);
        world.set_desired_capacity("web__1", 1).unwrap();
        let groups = world.describe_groups(&[]);
        assert_eq!(groups[0].instances.len(), 1);
    }

    #[test]
    fn delayed_delete_keeps_group_visible() {
        let mut world = World { delete_ticks: 2, ..Default::default() };
        world.create_group(&spec("web__1", 0)).unwrap();
        world.delete_group("web__1").unwrap();

        assert_eq!(world.describe_groups(&["web__1".to_string()]).len(), 1);
        assert_eq!(world.describe_groups(&["web__1".to_string()]).len(), 1);
        assert!(world.describe_groups(&["web__1".to_string()]).is_empty());
    }

    #[test]
    fn detaching_unknown_target_group_reports_not_part_of_group() {
        let mut world = World::default();
        world.create_group(&spec("web__1", 0)).unwrap();
        let err = world
            .detach("web__1", &["arn:tg/blue".to_string()], false)
            .unwrap_err();
        assert!(err.message.contains("not part of the group"));
    }

    #[test]
    fn set_desired_capacity_respects_bounds() {
        let mut world = World::default();
        world.create_group(&spec("web__1", 0)).unwrap();
        assert!(world.set_desired_capacity("web__1", 9).is_err());
        assert!(world.set_desired_capacity("web__1", 4).is_ok());
    }

    #[test]
    fn paginate_walks_offsets() {
        let items: Vec<u32> = (0..5).collect();
        let (page, next) = paginate(&items, None, 2).unwrap();
        assert_eq!(page, vec![0, 1]);
        let (page, next) = paginate(&items, next.as_deref(), 2).unwrap();
        assert_eq!(page, vec![2, 3]);
        let (page, next) = paginate(&items, next.as_deref(), 2).unwrap();
        assert_eq!(page, vec![4]);
        assert!(next.is_none());
    }
}
