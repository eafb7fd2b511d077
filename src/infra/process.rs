//! External process execution
//!
//! Every program this tool launches (tar, mkdir, rm, systemd-nspawn, apt,
//! dpkg) goes through a [`CommandRunner`]. The system implementation
//! prefixes privileged commands with the configured escalation program;
//! tests substitute a recording fake.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};

use crate::config::defaults;
use crate::error::ProcessError;

/// Description of a command to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program name or path
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Run with elevated privileges
    pub privileged: bool,
    /// Attach the child to the terminal instead of capturing output
    pub interactive: bool,
}

impl CommandSpec {
    /// Create a new command
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            privileged: false,
            interactive: false,
        }
    }

    /// Add a single argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add a path as an argument
    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.to_string_lossy().into_owned());
        self
    }

    /// Mark the command as needing elevated privileges
    pub fn privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    /// Attach the command to the terminal
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Shell-like rendering for log messages
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of running a command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, -1 if terminated by a signal
    pub code: i32,
    /// Captured stdout (empty for interactive runs)
    pub stdout: String,
    /// Captured stderr (empty for interactive runs)
    pub stderr: String,
}

impl CommandOutput {
    /// Output of a command that exited with `code` and printed nothing
    pub fn with_code(code: i32) -> Self {
        Self {
            code,
            ..Self::default()
        }
    }

    /// Returns true if the command exited successfully
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Capability to run external commands
///
/// Non-zero exit codes are reported through [`CommandOutput::code`], not as
/// errors; `Err` means the program could not be run at all.
pub trait CommandRunner {
    /// Run a command to completion
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError>;

    /// Run a command, handing each stdout line to `on_line` as it arrives
    ///
    /// The returned output carries the exit code and stderr; stdout is left
    /// empty since it has already been consumed.
    fn run_streaming(
        &self,
        spec: &CommandSpec,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<CommandOutput, ProcessError>;
}

/// Runs commands on the host
#[derive(Debug, Clone)]
pub struct SystemRunner {
    escalation: Option<String>,
}

impl SystemRunner {
    /// Create a runner escalating privileged commands through `escalation`
    pub fn new(escalation: impl Into<String>) -> Self {
        Self {
            escalation: Some(escalation.into()),
        }
    }

    /// Create a runner that executes privileged commands as the current user
    pub fn without_escalation() -> Self {
        Self { escalation: None }
    }

    /// Escalation program, if any
    pub fn escalation(&self) -> Option<&str> {
        self.escalation.as_deref()
    }

    /// Build the `std::process::Command` for a spec
    fn command(&self, spec: &CommandSpec) -> Command {
        match (&self.escalation, spec.privileged) {
            (Some(escalation), true) => {
                let mut cmd = Command::new(escalation);
                cmd.arg(&spec.program).args(&spec.args);
                cmd
            }
            _ => {
                let mut cmd = Command::new(&spec.program);
                cmd.args(&spec.args);
                cmd
            }
        }
    }

    fn spawn_error(spec: &CommandSpec, error: &std::io::Error) -> ProcessError {
        ProcessError::Spawn {
            program: spec.program.clone(),
            error: error.to_string(),
        }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(defaults::ESCALATION_PROGRAM)
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        tracing::debug!(privileged = spec.privileged, "Running: {}", spec.display());
        let mut cmd = self.command(spec);

        if spec.interactive {
            let status = cmd.status().map_err(|e| Self::spawn_error(spec, &e))?;
            return Ok(CommandOutput::with_code(status.code().unwrap_or(-1)));
        }

        let output = cmd.output().map_err(|e| Self::spawn_error(spec, &e))?;
        Ok(CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn run_streaming(
        &self,
        spec: &CommandSpec,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<CommandOutput, ProcessError> {
        tracing::debug!(privileged = spec.privileged, "Running: {}", spec.display());
        let io_error = |e: std::io::Error| ProcessError::Io {
            program: spec.program.clone(),
            error: e.to_string(),
        };

        let mut child = self
            .command(spec)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Self::spawn_error(spec, &e))?;

        // Drain stderr separately so a chatty child cannot block on a full pipe
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf);
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        // File names are not necessarily UTF-8; stdout is read to the end
        // before waiting so the child never sees a closed pipe
        let mut read_result = Ok(());
        if let Some(stdout) = child.stdout.take() {
            let mut reader = BufReader::new(stdout);
            let mut line = Vec::new();
            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        if line.last() == Some(&b'\n') {
                            line.pop();
                        }
                        on_line(&String::from_utf8_lossy(&line));
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        read_result = Err(e);
                        // Keep the pipe open and emptied until the child exits
                        let _ = std::io::copy(&mut reader, &mut std::io::sink());
                        break;
                    }
                }
            }
        }

        let status = child.wait().map_err(io_error)?;
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        read_result.map_err(io_error)?;

        Ok(CommandOutput {
            code: status.code().unwrap_or(-1),
            stdout: String::new(),
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_builder() {
        let spec = CommandSpec::new("tar")
            .arg("-x")
            .args(["-f", "base.tar.xz"])
            .arg_path(Path::new("/tmp/root"))
            .privileged(true);
        assert_eq!(spec.program, "tar");
        assert_eq!(spec.args, vec!["-x", "-f", "base.tar.xz", "/tmp/root"]);
        assert!(spec.privileged);
        assert!(!spec.interactive);
        assert_eq!(spec.display(), "tar -x -f base.tar.xz /tmp/root");
    }

    #[test]
    fn test_escalation_prefix() {
        let runner = SystemRunner::new("doas");
        let spec = CommandSpec::new("mkdir").arg("-p").arg("/x").privileged(true);
        let cmd = runner.command(&spec);
        assert_eq!(cmd.get_program(), "doas");
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["mkdir", "-p", "/x"]);
    }

    #[test]
    fn test_unprivileged_spec_not_escalated() {
        let runner = SystemRunner::default();
        let cmd = runner.command(&CommandSpec::new("uname").arg("-m"));
        assert_eq!(cmd.get_program(), "uname");
    }

    #[test]
    fn test_without_escalation_runs_directly() {
        let runner = SystemRunner::without_escalation();
        assert_eq!(runner.escalation(), None);
        let cmd = runner.command(&CommandSpec::new("rm").privileged(true));
        assert_eq!(cmd.get_program(), "rm");
    }

    #[test]
    fn test_run_captures_output_and_code() {
        let runner = SystemRunner::without_escalation();
        let output = runner
            .run(&CommandSpec::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]))
            .unwrap();
        assert_eq!(output.code, 3);
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
        assert!(!output.success());
    }

    #[test]
    fn test_run_streaming_yields_lines() {
        let runner = SystemRunner::without_escalation();
        let mut lines = Vec::new();
        let output = runner
            .run_streaming(
                &CommandSpec::new("sh").args(["-c", "printf 'a\\nb\\nc\\n'"]),
                &mut |line: &str| lines.push(line.to_string()),
            )
            .unwrap();
        assert!(output.success());
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_run_streaming_non_utf8_line_lets_child_finish() {
        let temp = tempfile::TempDir::new().unwrap();
        let marker = temp.path().join("finished");
        let script = format!(
            "printf 'a\\n\\377\\n'; sleep 1; i=0; while [ $i -lt 2000 ]; do echo line$i; i=$((i+1)); done; touch '{}'",
            marker.display()
        );

        let runner = SystemRunner::without_escalation();
        let mut lines = Vec::new();
        let output = runner
            .run_streaming(
                &CommandSpec::new("sh").args(["-c", script.as_str()]),
                &mut |line: &str| lines.push(line.to_string()),
            )
            .unwrap();

        assert!(output.success());
        assert_eq!(lines.len(), 2002);
        assert_eq!(lines[0], "a");
        assert_eq!(lines[1], "\u{fffd}");
        assert_eq!(lines[2001], "line1999");
        assert!(marker.exists());
    }

    #[test]
    fn test_run_streaming_keeps_non_utf8_stderr() {
        let runner = SystemRunner::without_escalation();
        let output = runner
            .run_streaming(
                &CommandSpec::new("sh").args(["-c", "printf 'bad \\377 name\\n' >&2; exit 2"]),
                &mut |_line: &str| {},
            )
            .unwrap();

        assert_eq!(output.code, 2);
        assert_eq!(output.stderr.trim(), "bad \u{fffd} name");
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let runner = SystemRunner::without_escalation();
        let result = runner.run(&CommandSpec::new("definitely-not-a-real-program-abcross"));
        assert!(matches!(result, Err(ProcessError::Spawn { .. })));
    }
}
