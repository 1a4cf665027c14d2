//! Run event distribution.
//!
//! The sequencer publishes `RunEvent`s on an `EventBus`; the CLI subscribes
//! to render progress.

pub mod bus;

pub use bus::EventBus;
