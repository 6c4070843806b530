//! External tool invocation.
//!
//! Build steps describe a child process as an [`Invocation`] and hand it to a
//! [`ToolRunner`]. The working directory is set on the child only; this
//! process never changes its own.

use super::BuildError;
use anyhow::Result;
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread::ScopedJoinHandle;
use std::time::{Duration, Instant};

/// A fully resolved external command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: PathBuf,
}

impl Invocation {
    pub fn new(program: impl Into<String>, current_dir: impl Into<PathBuf>) -> Self {
        Invocation {
            program: program.into(),
            args: Vec::new(),
            current_dir: current_dir.into(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Printable command line.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of a finished child process.
#[derive(Clone, Debug)]
pub struct ToolOutput {
    /// `None` when the child was killed by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub duration: Duration,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a non-zero exit into [`BuildError::ToolFailed`].
    pub fn check(self, program: &str) -> Result<Self, BuildError> {
        if self.success() {
            Ok(self)
        } else {
            log::debug!(
                "{program} output ({} bytes stdout, {} bytes stderr):\n{}",
                self.stdout.len(),
                self.stderr.len(),
                String::from_utf8_lossy(&self.stderr)
            );
            Err(BuildError::ToolFailed {
                program: program.to_string(),
                code: self.code,
            })
        }
    }
}

/// Runs external tools to completion.
pub trait ToolRunner {
    /// Run the invocation and wait for it. Only a failure to start the
    /// process is an error here; the exit status is left to the caller.
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, BuildError>;
}

/// Spawns real child processes. Their output is echoed to this process's
/// stdout/stderr as it arrives and also kept for the [`ToolOutput`]; stdin is
/// inherited so a tool can still prompt.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput, BuildError> {
        log::debug!(
            "Running `{}` in {}",
            invocation.command_line(),
            invocation.current_dir.display()
        );
        let spawn_error = |source: std::io::Error| BuildError::ToolSpawn {
            program: invocation.program.clone(),
            source,
        };

        let start = Instant::now();
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.current_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        let child_stdout = child.stdout.take();
        let child_stderr = child.stderr.take();
        let (stdout, stderr) = std::thread::scope(|scope| {
            let out = scope.spawn(|| child_stdout.map(|pipe| tee(pipe, std::io::stdout())));
            let err = scope.spawn(|| child_stderr.map(|pipe| tee(pipe, std::io::stderr())));
            (join_capture(out), join_capture(err))
        });

        let status = child.wait().map_err(spawn_error)?;
        let duration = start.elapsed();
        log::debug!(
            "{} finished in {:.2?} with {status}",
            invocation.program,
            duration
        );

        Ok(ToolOutput {
            code: status.code(),
            stdout,
            stderr,
            duration,
        })
    }
}

/// Copy `source` into `sink` chunk by chunk until EOF and return everything
/// read. Tool output is informational, so a closed sink does not stop the
/// capture.
fn tee(mut source: impl Read, mut sink: impl Write) -> Vec<u8> {
    let mut captured = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                captured.extend_from_slice(&buf[..n]);
                let _ = sink.write_all(&buf[..n]).and_then(|()| sink.flush());
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => {
                log::warn!("Lost tool output: {err}");
                break;
            }
        }
    }
    captured
}

fn join_capture(handle: ScopedJoinHandle<'_, Option<Vec<u8>>>) -> Vec<u8> {
    match handle.join() {
        Ok(captured) => captured.unwrap_or_default(),
        Err(_) => {
            log::warn!("Output reader thread panicked");
            Vec::new()
        }
    }
}
