//! Phase plan types.
//!
//! A [`PhasePlan`] is the canonical description of a bring-up or test run:
//! an ordered list of phases, each holding steps and an optional cleanup hook.
//! Built-in plans are constructed in code; custom plans load from YAML and
//! convert to the same structs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Plan and phase
// ---------------------------------------------------------------------------

/// An ordered list of phases executed by the sequencer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhasePlan {
    /// Plan name (e.g. "bringup", "sync-test").
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub phases: Vec<PhaseDefinition>,
}

/// A named unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseDefinition {
    /// Unique phase name; surfaced in diagnostics when the phase fails.
    pub name: String,
    /// Steps run concurrently and are joined before the phase completes.
    #[serde(default)]
    pub forked: bool,
    /// Always-run teardown phase: executes exactly once at the end of the run
    /// regardless of outcome. At most one per plan, and it must be last.
    #[serde(default)]
    pub always_run: bool,
    /// Step failures inside this phase are logged and do not abort the run.
    #[serde(default)]
    pub best_effort: bool,
    pub steps: Vec<StepDefinition>,
    /// Hooks invoked during teardown if this phase started, in order.
    /// Each must be idempotent.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cleanup: Vec<StepDefinition>,
}

impl PhaseDefinition {
    /// A sequential, fatal-on-failure phase with the given steps.
    pub fn new(name: impl Into<String>, steps: Vec<StepDefinition>) -> Self {
        Self {
            name: name.into(),
            forked: false,
            always_run: false,
            best_effort: false,
            steps,
            cleanup: Vec::new(),
        }
    }

    /// Mark the phase as forked (steps run concurrently).
    pub fn forked(mut self) -> Self {
        self.forked = true;
        self
    }

    /// Append a cleanup hook.
    pub fn with_cleanup(mut self, cleanup: StepDefinition) -> Self {
        self.cleanup.push(cleanup);
        self
    }

    /// Mark as the always-run teardown phase.
    pub fn always_run(mut self) -> Self {
        self.always_run = true;
        self.best_effort = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// A single unit of execution within a phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Step ID, unique within the plan.
    pub id: String,
    /// Failure is logged but not fatal (e.g. stopping a service that never ran).
    #[serde(default)]
    pub best_effort: bool,
    pub config: StepConfig,
}

impl StepDefinition {
    pub fn new(id: impl Into<String>, config: StepConfig) -> Self {
        Self {
            id: id.into(),
            best_effort: false,
            config,
        }
    }

    pub fn best_effort(mut self) -> Self {
        self.best_effort = true;
        self
    }

    /// Keys this step writes into the parameter store on success.
    pub fn produced_keys(&self) -> Vec<String> {
        match &self.config {
            StepConfig::Command(cmd) => cmd.extract.iter().map(|r| r.key.clone()).collect(),
            StepConfig::TrustParams {
                height_key,
                hash_key,
                ..
            } => vec![height_key.clone(), hash_key.clone()],
            StepConfig::Record { entries } => entries.iter().map(|b| b.name.clone()).collect(),
            StepConfig::Readiness { .. } | StepConfig::Delay { .. } | StepConfig::UpdateConfig { .. } => {
                Vec::new()
            }
        }
    }
}

/// Step-specific configuration, internally tagged by `type`.
///
/// ```yaml
/// config:
///   type: delay
///   millis: 15000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepConfig {
    /// Invoke an external command and mine its output.
    Command(CommandStep),
    /// Poll a condition until it holds or the deadline passes.
    Readiness {
        condition: ReadinessCondition,
        #[serde(default = "default_interval_ms")]
        interval_ms: u64,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
    /// Fixed wait.
    Delay { millis: u64 },
    /// Compute state-sync trust height/hash from a running node.
    TrustParams {
        /// CometBFT RPC URL of the node to query (template).
        rpc: String,
        /// Trust window subtracted from the latest height.
        window: u64,
        #[serde(default = "default_trust_height_key")]
        height_key: String,
        #[serde(default = "default_trust_hash_key")]
        hash_key: String,
    },
    /// Read-modify-write of the persisted connection table.
    UpdateConfig {
        /// Path of the config document (template).
        path: String,
        /// Subnet ID whose entry is updated (template).
        subnet: String,
        #[serde(default)]
        fields: Vec<ConfigField>,
        /// Also write the configured auth token into the entry.
        #[serde(default)]
        auth_token: bool,
        /// Append a new entry when none matches `subnet`.
        #[serde(default)]
        create_if_missing: bool,
    },
    /// Write computed values into the parameter store.
    Record { entries: Vec<ParamBinding> },
}

fn default_interval_ms() -> u64 {
    2_000
}

fn default_timeout_ms() -> u64 {
    120_000
}

fn default_trust_height_key() -> String {
    crate::parameter::keys::TRUST_HEIGHT.to_string()
}

fn default_trust_hash_key() -> String {
    crate::parameter::keys::TRUST_HASH.to_string()
}

/// An external command invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandStep {
    pub program: String,
    /// Fixed leading arguments (e.g. `["make", "--profile", "ci", "node-start"]`).
    #[serde(default)]
    pub args: Vec<String>,
    /// Named parameters, rendered according to `param_style`.
    #[serde(default)]
    pub params: Vec<ParamBinding>,
    #[serde(default)]
    pub param_style: ParamStyle,
    /// Environment overlay for the child process.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, ParamValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    /// Extraction rules applied to the captured output on success.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extract: Vec<ExtractionRule>,
}

impl CommandStep {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            params: Vec::new(),
            param_style: ParamStyle::default(),
            env: BTreeMap::new(),
            working_dir: None,
            extract: Vec::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.params.push(ParamBinding {
            name: name.into(),
            value,
        });
        self
    }

    pub fn style(mut self, style: ParamStyle) -> Self {
        self.param_style = style;
        self
    }

    pub fn extract(mut self, rule: ExtractionRule) -> Self {
        self.extract.push(rule);
        self
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// A named parameter and its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamBinding {
    pub name: String,
    pub value: ParamValue,
}

/// Where a parameter value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamValue {
    /// Used as-is.
    Literal(String),
    /// The value stored under this key.
    Ref(String),
    /// Text with `{{ params.<key> }}` placeholders.
    Template(String),
}

impl ParamValue {
    pub fn literal(value: impl Into<String>) -> Self {
        ParamValue::Literal(value.into())
    }

    pub fn key(key: impl Into<String>) -> Self {
        ParamValue::Ref(key.into())
    }

    pub fn template(text: impl Into<String>) -> Self {
        ParamValue::Template(text.into())
    }
}

/// How named parameters are passed to a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum ParamStyle {
    /// `--name value`
    Flag,
    /// `<flag> NAME=value` (e.g. `-e`, `--param`)
    KeyValue { flag: String },
    /// Exported as environment variables.
    Env,
}

impl Default for ParamStyle {
    fn default() -> Self {
        ParamStyle::Flag
    }
}

/// A field written into a connection-table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigField {
    pub field: String,
    pub value: ParamValue,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Describes where in free-form output a value of interest appears.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRule {
    /// Parameter store key the value is written to.
    pub key: String,
    /// Human-readable label used in diagnostics.
    pub label: String,
    /// Fixed marker text located in the output.
    pub marker: String,
    #[serde(default)]
    pub kind: ExtractionKind,
    /// Reduce a multiaddress ending in `/p2p/<id>` to `<id>`.
    #[serde(default)]
    pub strip_p2p_suffix: bool,
    /// A missing marker fails the step instead of writing nothing.
    #[serde(default = "default_mandatory")]
    pub mandatory: bool,
}

fn default_mandatory() -> bool {
    true
}

/// Position of the value relative to the marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionKind {
    /// The first non-empty line after the marker line.
    NextLine,
    /// The rest of the marker line.
    SameLine,
}

impl Default for ExtractionKind {
    fn default() -> Self {
        ExtractionKind::NextLine
    }
}

// ---------------------------------------------------------------------------
// Readiness
// ---------------------------------------------------------------------------

/// A condition gating a phase transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReadinessCondition {
    /// The RPC endpoint answers and reports a block height.
    RpcHeight { rpc: String },
    /// Two successive height observations differ.
    ChainAdvancing { rpc: String },
    /// The directory exists and has at least one entry.
    DirNonEmpty { path: String },
}

impl fmt::Display for ReadinessCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadinessCondition::RpcHeight { rpc } => write!(f, "rpc height at {rpc}"),
            ReadinessCondition::ChainAdvancing { rpc } => write!(f, "chain advancing at {rpc}"),
            ReadinessCondition::DirNonEmpty { path } => write!(f, "non-empty directory {path}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle of one phase within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    Running,
    Completed,
    Failed,
    /// Never started because the run aborted earlier.
    Skipped,
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseStatus::Pending => write!(f, "pending"),
            PhaseStatus::Running => write!(f, "running"),
            PhaseStatus::Completed => write!(f, "completed"),
            PhaseStatus::Failed => write!(f, "failed"),
            PhaseStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Aggregate lifecycle of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Running,
    Succeeded,
    Aborted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Idle => write!(f, "idle"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Succeeded => write!(f, "succeeded"),
            RunStatus::Aborted => write!(f, "aborted"),
        }
    }
}

/// Failure taxonomy surfaced in run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A collaborator process exited non-zero (or could not be spawned).
    ExternalCommand,
    /// A mandatory pattern was absent from the output.
    Extraction,
    /// A polled condition never held within its deadline.
    ReadinessTimeout,
    /// A required parameter or setting is missing or invalid.
    Configuration,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::ExternalCommand => write!(f, "external command failure"),
            FailureKind::Extraction => write!(f, "extraction failure"),
            FailureKind::ReadinessTimeout => write!(f, "readiness timeout"),
            FailureKind::Configuration => write!(f, "configuration error"),
        }
    }
}
