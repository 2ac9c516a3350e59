//! Command execution.
//!
//! [`Executor::run`] replays a compiled [`Program`] against an
//! [`OutputSink`] in strict program order. `wait` commands do not block
//! dispatch: each one spawns a timer into a [`JoinSet`] owned by the run,
//! and the run suspends only once, after the last command, until every
//! timer has resolved. Waits therefore overlap — the total delay of a run
//! is the maximum of its wait durations, not their sum — and no timer can
//! outlive the run that scheduled it.

use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::trace;

use crate::script::command::{Command, CommandKind, Program};
use crate::script::eval::{self, Mode};

// ── OutputSink ────────────────────────────────────────────────────────────────

/// The rendering collaborator, consumed (not implemented) by the core.
///
/// Program output and diagnostics travel through the same sink, in
/// dispatch order.
pub trait OutputSink {
    /// Emit one line of program output.
    fn append_line(&mut self, text: &str);

    /// Discard all output produced so far.
    fn clear_all(&mut self);

    /// Report a non-fatal diagnostic. `line` is the 1-based source line,
    /// or `None` when unknown.
    fn report_diagnostic(&mut self, message: &str, line: Option<usize>);
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// A non-fatal error raised while dispatching one compiled command.
#[derive(Debug)]
pub struct ExecError {
    pub line: Option<usize>,
    pub message: String,
}

impl std::fmt::Display for ExecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.message),
            None => write!(f, "line unknown: {}", self.message),
        }
    }
}

impl std::error::Error for ExecError {}

// ── Executor ──────────────────────────────────────────────────────────────────

/// Replays one compiled program. The program is an immutable snapshot;
/// the executor never mutates the variable table or branches on it.
pub struct Executor<'a, S: OutputSink> {
    program: &'a Program,
    sink: &'a mut S,
}

impl<'a, S: OutputSink> Executor<'a, S> {
    pub fn new(program: &'a Program, sink: &'a mut S) -> Self {
        Self { program, sink }
    }

    /// Dispatch every command in order, then wait for all timers.
    ///
    /// A failure while dispatching one command is reported through the
    /// sink and does not stop the commands after it.
    pub async fn run(mut self) {
        let mut waits: JoinSet<()> = JoinSet::new();

        for cmd in &self.program.commands {
            trace!(line = cmd.line, command = %cmd.kind, "dispatch");
            if let Err(e) = self.dispatch(cmd, &mut waits) {
                self.sink.report_diagnostic(&e.message, e.line);
            }
        }

        while let Some(res) = waits.join_next().await {
            if let Err(e) = res {
                self.sink.report_diagnostic(&format!("wait timer failed: {e}"), None);
            }
        }
    }

    fn dispatch(&mut self, cmd: &Command, waits: &mut JoinSet<()>) -> Result<(), ExecError> {
        match &cmd.kind {
            CommandKind::Clear => self.sink.clear_all(),
            CommandKind::Print { raw } => {
                let text = eval::eval(raw, &self.program.vars, Mode::Template).to_string();
                self.sink.append_line(&text);
            }
            CommandKind::Wait { seconds } => {
                let secs = *seconds;
                waits.spawn(async move {
                    sleep(Duration::from_secs(secs)).await;
                });
            }
            // The table was built at compile time; nothing to do here.
            CommandKind::Assign { .. } => {}
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
