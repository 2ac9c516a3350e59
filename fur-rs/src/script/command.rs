//! The compiled command sequence — the IR handed from compiler to
//! executor.
//!
//! A [`Program`] is an immutable snapshot: the final variable table plus
//! the fully unrolled command list. Its length and contents are fixed at
//! compile time; the executor never branches on variable values. The pair
//! is a stable surface other tooling may introspect — [`Program::dump`]
//! is what `fur -d` prints.

use std::fmt;

use crate::var::VarTable;

use super::value::Value;

/// One compiled executable instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// 1-based source line the command was compiled from.
    pub line: usize,
    pub kind: CommandKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// Clear all output.
    Clear,
    /// Render `raw` against the final variable table at execution time.
    Print { raw: String },
    /// Schedule a non-blocking delay.
    Wait { seconds: u64 },
    /// Variable assignment, already applied to the table at compile time.
    Assign { key: String, value: Value },
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Clear => write!(f, "clear"),
            CommandKind::Print { raw } => write!(f, "print({raw})"),
            CommandKind::Wait { seconds } => write!(f, "wait({seconds})"),
            CommandKind::Assign { key, value } => write!(f, "{key} = {}", value.quoted()),
        }
    }
}

/// Compiler output: `{variable table, command sequence}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub vars: VarTable,
    pub commands: Vec<Command>,
}

impl Program {
    /// Human-readable dump of the IR, one command per line.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        out.push_str("variables: ");
        out.push_str(&self.vars.dump());
        out.push('\n');
        out.push_str("commands:\n");
        for cmd in &self.commands {
            out.push_str(&format!("  {:>4}  {}\n", cmd.line, cmd.kind));
        }
        out
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
