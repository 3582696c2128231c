//! groupshift-core — shared types for the group lifecycle engine.
//!
//! Holds the snapshot model of managed groups, the portable form of
//! scaling policies and scheduled actions, the configuration file model,
//! and the error taxonomy with its classifier.

pub mod classify;
pub mod config;
pub mod error;
pub mod policy;
pub mod types;

pub use classify::{absorb, classify, ErrorClass};
pub use config::{HealthPredicate, LifecycleConfig, RetryConfig};
pub use error::{ErrorOrigin, GroupError, GroupResult, NotFoundCode, ProviderError, Service};
pub use policy::*;
pub use types::*;
