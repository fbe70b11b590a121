//! Scripted command executor (testing only)
//!
//! Provides `ScriptedExecutor`, a `CommandExecutor` that answers from a rule
//! table instead of spawning processes, and records every invocation for
//! later inspection.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::MatrixResult;
use crate::exec::{CapturedOutput, CommandExecutor, Invocation};

// ---------------------------------------------------------------------------
// ScriptedExecutor
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Rule {
    pattern: String,
    output: CapturedOutput,
}

/// In-memory executor that matches each invocation's command line against
/// registered substring rules, in insertion order; the first match wins.
/// Unmatched invocations succeed with empty streams.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    rules: Mutex<Vec<Rule>>,
    log: Mutex<Vec<Invocation>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scripted response for command lines containing `pattern`.
    pub fn respond(&self, pattern: &str, exit_code: i32, stdout: &str, stderr: &str) {
        self.rules.lock().unwrap().push(Rule {
            pattern: pattern.to_string(),
            output: CapturedOutput {
                exit_code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        });
    }

    /// Every invocation seen so far, in order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.log.lock().unwrap().clone()
    }

    /// Command lines of every invocation seen so far, in order.
    pub fn command_lines(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .map(|inv| inv.command_line())
            .collect()
    }

    /// Number of recorded invocations whose command line contains `pattern`.
    pub fn count_matching(&self, pattern: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|inv| inv.command_line().contains(pattern))
            .count()
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn run(&self, invocation: &Invocation) -> MatrixResult<CapturedOutput> {
        self.log.lock().unwrap().push(invocation.clone());

        let line = invocation.command_line();
        let rules = self.rules.lock().unwrap();
        for rule in rules.iter() {
            if line.contains(&rule.pattern) {
                return Ok(rule.output.clone());
            }
        }
        Ok(CapturedOutput::empty_success())
    }
}
