#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use groupshift_core::{LifecycleConfig, ManagedGroup};
use groupshift_lifecycle::{CallRecorder, GroupLifecycle, LogLevel};
use groupshift_sim::SimulatedCloud;

pub const OWNER_KEY: &str = "groupshift:owner";

/// Operator log lines captured from a facade.
#[derive(Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<(String, LogLevel)>>>);

impl Captured {
    pub fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn at(&self, level: LogLevel) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, l)| *l == level)
            .map(|(m, _)| m.clone())
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

/// Counts calls by name.
#[derive(Default)]
pub struct CountingRecorder {
    pub calls: Mutex<BTreeMap<&'static str, usize>>,
}

impl CountingRecorder {
    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().get(call).copied().unwrap_or(0)
    }

    pub fn names(&self) -> BTreeSet<&'static str> {
        self.calls.lock().unwrap().keys().copied().collect()
    }
}

impl CallRecorder for CountingRecorder {
    fn record(&self, call: &'static str) {
        *self.calls.lock().unwrap().entry(call).or_insert(0) += 1;
    }
}

pub fn lifecycle(cloud: &SimulatedCloud) -> (GroupLifecycle, Captured) {
    lifecycle_with(cloud, LifecycleConfig::default())
}

pub fn lifecycle_with(cloud: &SimulatedCloud, config: LifecycleConfig) -> (GroupLifecycle, Captured) {
    let captured = Captured::default();
    let sink = captured.0.clone();
    let lifecycle = GroupLifecycle::new(Arc::new(cloud.clone()), "us-east-1", config)
        .with_log_sink(Arc::new(move |msg: &str, level: LogLevel| {
            sink.lock().unwrap().push((msg.to_string(), level));
        }));
    (lifecycle, captured)
}

pub fn group(name: &str, owner: Option<&str>, desired: u32, created: u64) -> ManagedGroup {
    let mut tags = BTreeMap::new();
    if let Some(owner) = owner {
        tags.insert(OWNER_KEY.to_string(), owner.to_string());
    }
    ManagedGroup {
        name: name.to_string(),
        min_size: 0,
        max_size: 10,
        desired_capacity: desired,
        launch_configuration_name: None,
        created_time: created,
        tags,
        instances: Vec::new(),
        load_balancer_names: Vec::new(),
        target_group_arns: Vec::new(),
    }
}
