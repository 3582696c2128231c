//! Scripted failures for the simulated control plane.

use groupshift_core::ProviderError;

/// Every client call the simulator answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Call {
    DescribeGroups,
    DescribeLaunchConfigurations,
    DescribePolicies,
    DescribeScheduledActions,
    DescribeScalingActivities,
    DescribeInstanceStates,
    CreateGroup,
    UpdateGroup,
    DeleteGroup,
    SetDesiredCapacity,
    CreateOrUpdateTags,
    CreateLaunchConfiguration,
    DeleteLaunchConfiguration,
    PutScalingPolicy,
    DeletePolicy,
    PutScheduledAction,
    DeleteScheduledAction,
    AttachLoadBalancers,
    DetachLoadBalancers,
    AttachTargetGroups,
    DetachTargetGroups,
}

/// A failure returned in place of a call's normal response.
#[derive(Debug, Clone)]
pub struct Fault {
    pub call: Call,
    /// Only fire when the call targets this resource name. `None` matches any.
    pub target: Option<String>,
    /// Remaining firings; `None` fires forever.
    pub remaining: Option<usize>,
    pub error: ProviderError,
}

impl Fault {
    /// A fault that fires on every matching call.
    pub fn always(call: Call, error: ProviderError) -> Self {
        Self {
            call,
            target: None,
            remaining: None,
            error,
        }
    }

    /// A fault that fires on the next `times` matching calls.
    pub fn times(call: Call, times: usize, error: ProviderError) -> Self {
        Self {
            call,
            target: None,
            remaining: Some(times),
            error,
        }
    }

    /// Restrict the fault to calls targeting `name`.
    pub fn on(mut self, name: &str) -> Self {
        self.target = Some(name.to_string());
        self
    }

    fn matches(&self, call: Call, target: Option<&str>) -> bool {
        self.call == call
            && self.remaining != Some(0)
            && match (&self.target, target) {
                (None, _) => true,
                (Some(want), Some(got)) => want == got,
                (Some(_), None) => false,
            }
    }
}

/// Ordered set of pending faults.
#[derive(Debug, Default, Clone)]
pub struct FaultPlan {
    faults: Vec<Fault>,
}

impl FaultPlan {
    pub fn push(&mut self, fault: Fault) {
        self.faults.push(fault);
    }

    pub fn clear(&mut self) {
        self.faults.clear();
    }

    /// Consume the first fault matching `call`/`target`, if any.
    pub fn fire(&mut self, call: Call, target: Option<&str>) -> Option<ProviderError> {
        let fault = self.faults.iter_mut().find(|f| f.matches(call, target))?;
        if let Some(remaining) = fault.remaining.as_mut() {
            *remaining -= 1;
        }
        Some(fault.error.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupshift_core::Service;

    fn boom() -> ProviderError {
        ProviderError::service(Service::AutoScaling, "InternalFailure", "boom")
    }

    #[test]
    fn counted_fault_fires_then_expires() {
        let mut plan = FaultPlan::default();
        plan.push(Fault::times(Call::DeleteGroup, 1, boom()));

        assert!(plan.fire(Call::DeleteGroup, Some("a")).is_some());
        assert!(plan.fire(Call::DeleteGroup, Some("a")).is_none());
    }

    #[test]
    fn targeted_fault_ignores_other_resources() {
        let mut plan = FaultPlan::default();
        plan.push(Fault::always(Call::DeleteGroup, boom()).on("web__2"));

        assert!(plan.fire(Call::DeleteGroup, Some("web__1")).is_none());
        assert!(plan.fire(Call::DeleteGroup, None).is_none());
        assert!(plan.fire(Call::DeleteGroup, Some("web__2")).is_some());
        assert!(plan.fire(Call::DeleteGroup, Some("web__2")).is_some());
        assert!(plan.fire(Call::SetDesiredCapacity, Some("web__2")).is_none());
    }
}
