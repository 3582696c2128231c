//! Moving scaling policies and scheduled actions between groups.

mod common;

use common::{group, lifecycle};
use groupshift_core::{
    PortablePolicy, PortableScheduledAction, PredefinedMetric, ProviderError, Service,
    StepAdjustment, TargetTrackingConfiguration,
};
use groupshift_sim::{Call, Fault, SimulatedCloud};

fn step_policy() -> PortablePolicy {
    PortablePolicy {
        policy_name: "scale-out".to_string(),
        policy_type: Some("StepScaling".to_string()),
        adjustment_type: Some("ChangeInCapacity".to_string()),
        cooldown: None,
        estimated_instance_warmup: Some(120),
        metric_aggregation_type: Some("Average".to_string()),
        min_adjustment_magnitude: None,
        min_adjustment_step: None,
        scaling_adjustment: None,
        step_adjustments: vec![StepAdjustment {
            metric_interval_lower_bound: Some(0.0),
            metric_interval_upper_bound: None,
            scaling_adjustment: 2,
        }],
        target_tracking: None,
    }
}

fn tracking_policy() -> PortablePolicy {
    PortablePolicy {
        policy_name: "cpu-50".to_string(),
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
            target_value: 50.0,
            disable_scale_in: false,
        }),
    }
}

fn nightly() -> PortableScheduledAction {
    PortableScheduledAction {
        scheduled_action_name: "nightly".to_string(),
        time: None,
        start_time: Some(1_700_000_000),
        end_time: None,
        recurrence: Some("0 2 * * *".to_string()),
        min_size: Some(0),
        max_size: Some(2),
        desired_capacity: Some(1),
    }
}

fn blue_green() -> SimulatedCloud {
    let cloud = SimulatedCloud::new();
    cloud.seed_group(group("web__1", Some("id-1"), 1, 100));
    cloud.seed_group(group("web__2", Some("id-1"), 0, 200));
    cloud
}

async fn attach(cloud: &SimulatedCloud, policies: &[PortablePolicy]) {
    let (lifecycle, _) = lifecycle(cloud);
    let snapshots: Vec<String> = policies.iter().map(|p| p.to_json().unwrap()).collect();
    let outcome = lifecycle.import_policies("web__1", &snapshots).await.unwrap();
    assert!(outcome.is_clean());
}

#[tokio::test]
async fn policies_survive_migration_without_identity() {
    let cloud = blue_green();
    attach(&cloud, &[step_policy(), tracking_policy()]).await;
    let (lifecycle, log) = lifecycle(&cloud);

    let exported = lifecycle.export_policies("web__1").await.unwrap();
    assert_eq!(exported.len(), 2);
    assert!(exported.iter().all(|json| !json.contains("arn:")));

    let outcome = lifecycle.import_policies("web__2", &exported).await.unwrap();
    assert_eq!(outcome.succeeded, vec!["scale-out", "cpu-50"]);

    let world = cloud.snapshot();
    let moved: Vec<&PortablePolicy> = world
        .policies
        .iter()
        .filter(|p| p.group_name == "web__2")
        .map(|p| &p.body)
        .collect();
    assert_eq!(moved, vec![&step_policy(), &tracking_policy()]);
    assert!(log.contains("Created policy with Arn: [arn:sim:autoscaling"));
    assert_eq!(cloud.sessions_active(), 0);
}

#[tokio::test]
async fn corrupted_entry_is_skipped_and_the_rest_applied() {
    let cloud = blue_green();
    attach(&cloud, &[step_policy(), tracking_policy()]).await;
    let (lifecycle, _log) = lifecycle(&cloud);

    let mut exported = lifecycle.export_policies("web__1").await.unwrap();
    exported[1] = exported[1].replace('{', "<");

    let outcome = lifecycle.import_policies("web__2", &exported).await.unwrap();
    assert_eq!(outcome.succeeded, vec!["scale-out"]);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].item, "entry #1");
    assert!(outcome.skipped[0].reason.starts_with("serialization error"));
    assert_eq!(cloud.calls(Call::PutScalingPolicy), 2 + 1);
}

#[tokio::test]
async fn rejected_put_does_not_stop_the_batch() {
    let cloud = blue_green();
    cloud.inject(Fault::times(
        Call::PutScalingPolicy,
        1,
        ProviderError::service(Service::AutoScaling, "LimitExceeded", "too many policies"),
    ));
    let (lifecycle, _log) = lifecycle(&cloud);
    let snapshots = vec![
        step_policy().to_json().unwrap(),
        String::new(),
        tracking_policy().to_json().unwrap(),
    ];

    let outcome = lifecycle.import_policies("web__2", &snapshots).await.unwrap();
    assert_eq!(outcome.succeeded, vec!["cpu-50"]);
    assert!(outcome.was_skipped("scale-out"));
    assert!(outcome.was_skipped("entry #1"));
    assert_eq!(outcome.total(), 3);
}

#[tokio::test]
async fn empty_exports_and_imports_are_quiet() {
    let cloud = blue_green();
    let (lifecycle, log) = lifecycle(&cloud);

    assert!(lifecycle.export_policies("web__1").await.unwrap().is_empty());
    assert!(log.contains("No scaling policy found"));
    let outcome = lifecycle.import_policies("web__2", &[]).await.unwrap();
    assert_eq!(outcome.total(), 0);
    assert_eq!(cloud.calls(Call::PutScalingPolicy), 0);
}

#[tokio::test]
async fn clearing_removes_every_policy() {
    let cloud = blue_green();
    attach(&cloud, &[step_policy(), tracking_policy()]).await;
    let (lifecycle, _log) = lifecycle(&cloud);

    assert_eq!(lifecycle.clear_policies("web__1").await.unwrap(), 2);
    assert!(lifecycle.export_policies("web__1").await.unwrap().is_empty());
    assert_eq!(lifecycle.clear_policies("web__1").await.unwrap(), 0);
}

#[tokio::test]
async fn scheduled_actions_migrate_and_clear() {
    let cloud = blue_green();
    let (lifecycle, log) = lifecycle(&cloud);
    let seeded = lifecycle
        .import_scheduled_actions("web__1", &[nightly().to_json().unwrap()])
        .await
        .unwrap();
    assert_eq!(seeded.succeeded, vec!["nightly"]);

    let exported = lifecycle.export_scheduled_actions("web__1").await.unwrap();
    assert_eq!(exported.len(), 1);
    let outcome = lifecycle
        .import_scheduled_actions("web__2", &exported)
        .await
        .unwrap();
    assert!(outcome.is_clean());

    let world = cloud.snapshot();
    let moved = world
        .scheduled_actions
        .iter()
        .find(|a| a.group_name == "web__2")
        .unwrap();
    assert_eq!(moved.body, nightly());
    assert!(log.contains("Found scheduled action: [arn:sim:autoscaling"));

    assert_eq!(lifecycle.clear_scheduled_actions("web__1").await.unwrap(), 1);
    assert!(lifecycle.export_scheduled_actions("web__1").await.unwrap().is_empty());
}

#[tokio::test]
async fn export_from_missing_group_is_empty() {
    let cloud = SimulatedCloud::new();
    let (lifecycle, _log) = lifecycle(&cloud);
    assert!(lifecycle.export_policies("ghost").await.unwrap().is_empty());
}
