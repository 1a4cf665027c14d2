//! Process runner port.
//!
//! The core never spawns processes itself. It renders a [`CommandSpec`] from a
//! plan step and the parameter store, and hands it to a [`ProcessRunner`]
//! implementation (a tokio subprocess adapter in production, a scripted fake
//! in tests).

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use clusterup_types::error::ParamError;
use clusterup_types::plan::{CommandStep, ParamStyle};
use thiserror::Error;

use crate::params::ParameterStore;

/// A fully rendered command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Environment overlay applied on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env: BTreeMap::new(),
            working_dir: None,
        }
    }

    /// Render a plan command step against the current parameter store.
    ///
    /// Every `Ref` and `Template` binding must resolve; a missing key fails
    /// here, before anything is spawned.
    pub fn render(step: &CommandStep, store: &ParameterStore) -> Result<Self, ParamError> {
        let mut spec = CommandSpec::new(step.program.clone(), step.args.clone());

        for binding in &step.params {
            let value = store.resolve(&binding.value)?;
            match &step.param_style {
                ParamStyle::Flag => {
                    spec.args.push(format!("--{}", binding.name));
                    spec.args.push(value);
                }
                ParamStyle::KeyValue { flag } => {
                    spec.args.push(flag.clone());
                    spec.args.push(format!("{}={}", binding.name, value));
                }
                ParamStyle::Env => {
                    spec.env.insert(binding.name.clone(), value);
                }
            }
        }

        for (name, value) in &step.env {
            spec.env.insert(name.clone(), store.resolve(value)?);
        }

        if let Some(dir) = &step.working_dir {
            spec.working_dir = Some(PathBuf::from(store.render(dir)?));
        }

        Ok(spec)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Exit status and merged stdout/stderr of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    pub output: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// The command could not be run at all. A non-zero exit is not an error.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to collect output of '{program}': {source}")]
    Output {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs external commands to completion.
///
/// Implementations are stateless and never retry. A non-zero exit code is
/// returned in [`ProcessOutput`], never as an `Err`.
pub trait ProcessRunner: Send + Sync {
    fn run(
        &self,
        spec: &CommandSpec,
    ) -> impl std::future::Future<Output = Result<ProcessOutput, RunnerError>> + Send;
}
