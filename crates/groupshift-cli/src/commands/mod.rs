use std::path::{Path, PathBuf};
use std::sync::Arc;

use groupshift_core::LifecycleConfig;
use groupshift_lifecycle::{GroupLifecycle, LogLevel, TracingRecorder};
use groupshift_sim::SimulatedCloud;
use tracing::debug;

pub mod locate;
pub mod migrate;
pub mod scale;
pub mod tag;
pub mod teardown;

/// The simulated region a command runs against and where it is persisted.
pub struct Env {
    pub lifecycle: GroupLifecycle,
    cloud: SimulatedCloud,
    world_path: PathBuf,
}

impl Env {
    pub fn open(world: &Path, config: Option<&Path>, region: Option<&str>) -> anyhow::Result<Self> {
        let cloud = if world.exists() {
            SimulatedCloud::load(world)?
        } else {
            debug!(path = %world.display(), "world file missing, starting empty");
            SimulatedCloud::new()
        };
        let config = match config {
            Some(path) => LifecycleConfig::from_file(path)?,
            None => LifecycleConfig::default(),
        };
        let region = region
            .map(str::to_string)
            .unwrap_or_else(|| cloud.snapshot().region);

        let lifecycle = GroupLifecycle::new(Arc::new(cloud.clone()), &region, config)
            .with_log_sink(Arc::new(print_operator_line))
            .with_recorder(Arc::new(TracingRecorder));
        Ok(Self {
            lifecycle,
            cloud,
            world_path: world.to_path_buf(),
        })
    }

    /// Write the world back, including changes made by a failed command.
    pub fn persist(&self) -> anyhow::Result<()> {
        self.cloud.save(&self.world_path)
    }
}

fn print_operator_line(message: &str, level: LogLevel) {
    let label = match level {
        LogLevel::Info => "INFO",
        LogLevel::Warn => "WARN",
        LogLevel::Error => "ERROR",
    };
    eprintln!("{label:>5} {message}");
}

pub fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
