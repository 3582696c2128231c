//! groupshift-lifecycle — reconciliation engine for elastic compute groups.
//!
//! # Components
//!
//! - **`locator`** — finds the newest serving group owned by a deployment unit
//! - **`convergence`** — drives a group to a target capacity and waits for health
//! - **`portability`** — exports and imports scaling policies and scheduled actions
//! - **`teardown`** — deletes groups and their launch configurations
//! - **`groups`** — single-group bounds, tags, and load balancer attachment
//! - **`service`** — `GroupLifecycle`, opening one session per operation

pub mod activity;
pub mod batch;
pub mod context;
pub mod convergence;
pub mod groups;
pub mod locator;
pub mod log;
pub mod portability;
pub mod recorder;
pub mod retry;
pub mod service;
pub mod teardown;

pub use batch::{BatchOutcome, Skipped};
pub use context::OpContext;
pub use convergence::{Converged, ConvergenceCriteria, ConvergencePhase, MemberReport};
pub use groups::Balancer;
pub use locator::Located;
pub use log::{ExecutionLog, LogLevel, LogSink};
pub use recorder::{CallRecorder, NoopRecorder, TracingRecorder};
pub use retry::RetryPolicy;
pub use service::GroupLifecycle;
pub use teardown::TeardownReport;
