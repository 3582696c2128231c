//! Scaling policies, scheduled actions, and their portable snapshots.
//!
//! The provider records carry identifiers (ARNs) that are only valid for
//! the group they were created on. The `Portable*` snapshots drop those
//! identifiers so the same configuration can be replayed onto another
//! group during a blue/green swap.

use serde::{Deserialize, Serialize};

use crate::error::{GroupError, GroupResult};

// ── Scaling policies ──────────────────────────────────────────────

/// One step of a step-scaling policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepAdjustment {
    pub metric_interval_lower_bound: Option<f64>,
    pub metric_interval_upper_bound: Option<f64>,
    pub scaling_adjustment: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredefinedMetric {
    /// e.g. "ASGAverageCPUUtilization".
    pub metric_type: String,
    pub resource_label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricDimension {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomizedMetric {
    pub metric_name: String,
    pub namespace: String,
    pub statistic: String,
    pub unit: Option<String>,
    #[serde(default)]
    pub dimensions: Vec<MetricDimension>,
}

/// Target-tracking parameters of a policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetTrackingConfiguration {
    pub predefined_metric: Option<PredefinedMetric>,
    pub customized_metric: Option<CustomizedMetric>,
    pub target_value: f64,
    #[serde(default)]
    pub disable_scale_in: bool,
}

/// A scaling policy as attached to a specific group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalingPolicy {
    pub policy_arn: String,
    pub group_name: String,
    #[serde(flatten)]
    pub body: PortablePolicy,
}

/// Every tunable field of a scaling policy, without provider identifiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortablePolicy {
    pub policy_name: String,
    /// "SimpleScaling", "StepScaling", "TargetTrackingScaling", ...
    pub policy_type: Option<String>,
    pub adjustment_type: Option<String>,
    pub cooldown: Option<u32>,
    pub estimated_instance_warmup: Option<u32>,
    pub metric_aggregation_type: Option<String>,
    pub min_adjustment_magnitude: Option<i32>,
    pub min_adjustment_step: Option<i32>,
    pub scaling_adjustment: Option<i32>,
    #[serde(default)]
    pub step_adjustments: Vec<StepAdjustment>,
    pub target_tracking: Option<TargetTrackingConfiguration>,
}

impl PortablePolicy {
    pub fn to_json(&self) -> GroupResult<String> {
        serde_json::to_string(self).map_err(|e| GroupError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> GroupResult<Self> {
        serde_json::from_str(json).map_err(|e| GroupError::Serialization(e.to_string()))
    }
}

impl From<&ScalingPolicy> for PortablePolicy {
    fn from(policy: &ScalingPolicy) -> Self {
        policy.body.clone()
    }
}

// ── Scheduled actions ─────────────────────────────────────────────

/// A scheduled capacity change as attached to a specific group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledAction {
    pub scheduled_action_arn: String,
    pub group_name: String,
    #[serde(flatten)]
    pub body: PortableScheduledAction,
}

/// Every tunable field of a scheduled action, without provider identifiers.
///
/// Times are unix timestamps (seconds). `recurrence` is a cron expression.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortableScheduledAction {
    pub scheduled_action_name: String,
    pub time: Option<u64>,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    pub recurrence: Option<String>,
    pub min_size: Option<u32>,
    pub max_size: Option<u32>,
    pub desired_capacity: Option<u32>,
}

impl PortableScheduledAction {
    pub fn to_json(&self) -> GroupResult<String> {
        serde_json::to_string(self).map_err(|e| GroupError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> GroupResult<Self> {
        serde_json::from_str(json).map_err(|e| GroupError::Serialization(e.to_string()))
    }
}

impl From<&ScheduledAction> for PortableScheduledAction {
    fn from(action: &ScheduledAction) -> Self {
        action.body.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target_tracking_policy() -> ScalingPolicy {
        ScalingPolicy {
            policy_arn: "arn:policy/cpu".to_string(),
            group_name: "web__1".to_string(),
            body: PortablePolicy {
                policy_name: "cpu".to_string(),
                policy_type: Some("TargetTrackingScaling".to_string()),
                adjustment_type: None,
                cooldown: None,
                estimated_instance_warmup: Some(300),
                metric_aggregation_type: None,
                min_adjustment_magnitude: None,
                min_adjustment_step: None,
                scaling_adjustment: None,
                step_adjustments: Vec::new(),
                target_tracking: Some(TargetTrackingConfiguration {
                    predefined_metric: Some(PredefinedMetric {
                        metric_type: "ASGAverageCPUUtilization".to_string(),
                        resource_label: None,
                    }),
                    customized_metric: None,
                    target_value: 55.0,
                    disable_scale_in: false,
                }),
            },
        }
    }

    #[test]
    fn portable_snapshot_drops_identifiers() {
        let policy = target_tracking_policy();
        let json = PortablePolicy::from(&policy).to_json().unwrap();
        assert!(!json.contains("arn:policy/cpu"));
        assert!(!json.contains("web__1"));
        assert!(json.contains("ASGAverageCPUUtilization"));
    }

    #[test]
    fn provider_record_flattens_body() {
        let json = serde_json::to_value(target_tracking_policy()).unwrap();
        assert_eq!(json["policy_name"], "cpu");
        assert_eq!(json["policy_arn"], "arn:policy/cpu");
    }

    #[test]
    fn corrupted_snapshot_is_a_serialization_error() {
        let err = PortablePolicy::from_json("{\"policy_name\": 4").unwrap_err();
        assert!(matches!(err, GroupError::Serialization(_)));

        let err = PortableScheduledAction::from_json("not json").unwrap_err();
        assert!(matches!(err, GroupError::Serialization(_)));
    }
}
