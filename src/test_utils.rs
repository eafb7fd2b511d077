//! Test utilities
//!
//! A recording [`CommandRunner`] and fixture helpers shared by unit tests.

use std::cell::RefCell;
use std::path::Path;

use crate::error::ProcessError;
use crate::infra::process::{CommandOutput, CommandRunner, CommandSpec};

type Responder = Box<dyn Fn(&CommandSpec) -> CommandOutput>;

/// Command runner that records every call and answers from a closure
///
/// By default every command succeeds with empty output.
pub struct RecordingRunner {
    calls: RefCell<Vec<CommandSpec>>,
    responder: Responder,
    streamed_lines: Vec<String>,
}

impl RecordingRunner {
    /// Runner where every command succeeds
    pub fn new() -> Self {
        Self::with_responder(|_| CommandOutput::with_code(0))
    }

    /// Runner answering with `responder`
    pub fn with_responder(responder: impl Fn(&CommandSpec) -> CommandOutput + 'static) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            responder: Box::new(responder),
            streamed_lines: Vec::new(),
        }
    }

    /// Lines fed to the callback of streaming runs
    pub fn with_streamed_lines(mut self, lines: &[&str]) -> Self {
        self.streamed_lines = lines.iter().map(ToString::to_string).collect();
        self
    }

    /// All recorded calls, in order
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    /// Recorded calls whose program or arguments contain `needle`
    pub fn calls_mentioning(&self, needle: &str) -> Vec<CommandSpec> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.program == needle || c.args.iter().any(|a| a == needle))
            .cloned()
            .collect()
    }
}

impl Default for RecordingRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        self.calls.borrow_mut().push(spec.clone());
        Ok((self.responder)(spec))
    }

    fn run_streaming(
        &self,
        spec: &CommandSpec,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<CommandOutput, ProcessError> {
        self.calls.borrow_mut().push(spec.clone());
        for line in &self.streamed_lines {
            on_line(line);
        }
        Ok((self.responder)(spec))
    }
}

/// Write a binfmt_misc registration file for `entry` under `dir`
pub fn write_binfmt_entry(dir: &Path, entry: &str, enabled: bool, interpreter: &Path) {
    let content = format!(
        "{}\ninterpreter {}\nflags: OCF\noffset 0\n",
        if enabled { "enabled" } else { "disabled" },
        interpreter.display()
    );
    std::fs::write(dir.join(entry), content).unwrap();
}
