//! Scripted process runner shared by sequencer and plan tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::process::{CommandSpec, ProcessOutput, ProcessRunner, RunnerError};

struct Rule {
    pattern: String,
    exit_code: i32,
    output: String,
    delay: Duration,
}

/// Answers commands from a script of `(pattern, exit code, output)` rules.
///
/// The first rule whose pattern is a substring of the rendered command line
/// (env overlay included) wins. Unmatched commands succeed with no output.
/// Every invocation is recorded in call order.
pub(crate) struct ScriptedRunner {
    rules: Vec<Rule>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self {
            rules: Vec::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn respond(self, pattern: &str, exit_code: i32, output: &str) -> Self {
        self.respond_after(pattern, 0, exit_code, output)
    }

    pub(crate) fn respond_after(
        mut self,
        pattern: &str,
        delay_ms: u64,
        exit_code: i32,
        output: &str,
    ) -> Self {
        self.rules.push(Rule {
            pattern: pattern.to_string(),
            exit_code,
            output: output.to_string(),
            delay: Duration::from_millis(delay_ms),
        });
        self
    }

    pub(crate) fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }
}

/// `program args [K=V ...]`
pub(crate) fn describe(spec: &CommandSpec) -> String {
    let mut line = spec.to_string();
    if !spec.env.is_empty() {
        let env: Vec<String> = spec.env.iter().map(|(k, v)| format!("{k}={v}")).collect();
        line.push_str(&format!(" [{}]", env.join(" ")));
    }
    line
}

impl ProcessRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<ProcessOutput, RunnerError> {
        let line = describe(spec);
        self.calls.lock().unwrap().push(line.clone());

        let Some(rule) = self.rules.iter().find(|r| line.contains(&r.pattern)) else {
            return Ok(ProcessOutput {
                exit_code: 0,
                output: String::new(),
            });
        };
        if !rule.delay.is_zero() {
            tokio::time::sleep(rule.delay).await;
        }
        Ok(ProcessOutput {
            exit_code: rule.exit_code,
            output: rule.output.clone(),
        })
    }
}
