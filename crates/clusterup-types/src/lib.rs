//! Shared domain types for clusterup.
//!
//! Node topology, phase plans, parameter entries, configuration, run events,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod parameter;
pub mod plan;
pub mod secret;
pub mod topology;
