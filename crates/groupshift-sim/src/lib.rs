//! groupshift-sim — a simulated control plane for groups.
//!
//! Implements [`groupshift_client::SessionProvider`] over an in-memory
//! region. Used as the test double for the lifecycle engine and as the
//! backend of the CLI's offline world files.
//!
//! # Components
//!
//! - **`world`** — region state and its eventually-consistent transitions
//! - **`cloud`** — `SimulatedCloud` / `SimulatedSession` client implementations
//! - **`faults`** — scripted call failures

pub mod cloud;
pub mod faults;
pub mod world;

pub use cloud::{SimulatedCloud, SimulatedSession};
pub use faults::{Call, Fault, FaultPlan};
pub use world::{SimMember, World};
