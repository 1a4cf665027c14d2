//! Observability setup for clusterup: tracing subscriber installation and
//! optional OpenTelemetry export.

pub mod attrs;
pub mod tracing_setup;
