//! groupshift-client — the control-plane boundary of the lifecycle engine.
//!
//! # Components
//!
//! - **`client`** — `GroupClient` trait and its request/record types
//! - **`paginate`** — continuation-token draining for list calls
//! - **`session`** — `SessionProvider`, per-operation session acquisition

pub mod client;
pub mod paginate;
pub mod session;

pub use client::{
    DescribeGroups, GroupClient, GroupTag, GroupUpdate, LaunchConfigurationSpec, Page,
    ProviderResult,
};
pub use paginate::drain;
pub use session::SessionProvider;
