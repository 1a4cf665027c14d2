//! Names the OpenTelemetry pipeline is tagged with.

/// `service.name` resource value on every exported span.
pub const SERVICE_NAME: &str = "clusterup";

/// Instrumentation scope of the tracer bridged from `tracing`.
pub const TRACER_NAME: &str = "clusterup";

/// Crate targets that follow the CLI verbosity flags.
///
/// Dependencies stay at `warn` unless `RUST_LOG` says otherwise.
pub const WORKSPACE_TARGETS: &[&str] = &[
    "clusterup_core",
    "clusterup_infra",
    "clusterup_observe",
    "cup",
];
