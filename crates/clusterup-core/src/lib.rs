//! Bring-up orchestration logic and collaborator traits for clusterup.
//!
//! This crate defines the "ports" the infrastructure layer implements
//! (`ProcessRunner`, `ChainQuery`) and everything that runs on top of them:
//! the parameter store, output extraction, readiness polling, trust parameter
//! resolution, cluster topology, and the phase sequencer. It never spawns a
//! process or opens a socket itself.

pub mod chain;
pub mod connection;
pub mod event;
pub mod extract;
pub mod params;
pub mod plans;
pub mod process;
pub mod readiness;
pub mod sequencer;
pub mod topology;
pub mod trust;
