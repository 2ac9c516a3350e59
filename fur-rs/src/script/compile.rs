//! The Furscript compiler: line classification and repeat unrolling.
//!
//! Source text is processed one line at a time. Everything from the first
//! `//` onward is a comment; blank lines are skipped. The first matching
//! form wins:
//!
//! | Form | Effect |
//! |------|--------|
//! | `clear` | emit [`CommandKind::Clear`] |
//! | `print(<expr>)` | emit `Print` with the unevaluated text up to the next `)` |
//! | `wait(<digits>)` | emit `Wait` |
//! | `repeat <count-or-var>` | open a repeat block, capture what follows |
//! | `end` (block open) | splice the captured buffer `count` times |
//! | `<key> = <expr>` | evaluate now, update the table, emit `Assign` |
//! | anything else | silently ignored |
//!
//! A malformed line never aborts the pass: per-line failures become
//! [`CompileError`] diagnostics and compilation continues. The compiler's
//! whole state (variable table, command list, active repeat block) is
//! owned by one [`compile`] call; nothing persists between calls.

use regex::Regex;
use tracing::debug;

use crate::var::VarTable;

use super::command::{Command, CommandKind, Program};
use super::eval::{self, Mode};
use super::value::Value;

/// Upper bound on repeat unrolling. Counts above this are reported and
/// treated as zero.
pub const MAX_REPEAT: u64 = 100_000;

// ── Errors ────────────────────────────────────────────────────────────────────

/// A non-fatal error raised while compiling one source line.
#[derive(Debug)]
pub struct CompileError {
    /// 1-based source line.
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for CompileError {}

// ── Compiler ──────────────────────────────────────────────────────────────────

/// Compile Furscript source into a [`Program`] plus any per-line
/// diagnostics. Compilation itself never fails.
pub fn compile(src: &str) -> (Program, Vec<CompileError>) {
    Compiler::new().run(src)
}

#[derive(Debug)]
struct Compiler {
    vars: VarTable,
    commands: Vec<Command>,
    repeat: Option<RepeatBlock>,
    errors: Vec<CompileError>,
    repeat_re: Regex,
}

/// Transient compile-time state for an open `repeat … end` span. Never
/// reaches the final sequence; the buffer is spliced inline at `end`.
#[derive(Debug)]
struct RepeatBlock {
    count: u64,
    buf: Vec<Command>,
}

impl Compiler {
    fn new() -> Self {
        Self {
            vars: VarTable::new(),
            commands: Vec::new(),
            repeat: None,
            errors: Vec::new(),
            repeat_re: Regex::new(r"^repeat\s+(.+)$").expect("repeat line pattern"),
        }
    }

    fn run(mut self, src: &str) -> (Program, Vec<CompileError>) {
        for (i, raw) in src.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.split_once("//").map_or(raw, |(head, _)| head).trim();
            if line.is_empty() {
                continue;
            }
            if let Err(e) = self.classify(line, lineno) {
                self.errors.push(e);
            }
        }
        // An unterminated repeat block discards its captured buffer.
        debug!(
            commands = self.commands.len(),
            vars = self.vars.len(),
            errors = self.errors.len(),
            "compiled script"
        );
        let program = Program { vars: self.vars, commands: self.commands };
        (program, self.errors)
    }

    fn classify(&mut self, line: &str, lineno: usize) -> Result<(), CompileError> {
        if line == "clear" {
            self.push(Command { line: lineno, kind: CommandKind::Clear });
        } else if let Some(rest) = line.strip_prefix("print(") {
            // Text between the first `(` and the next `)`. No `)` means no
            // command and no error.
            if let Some((raw, _)) = rest.split_once(')') {
                self.push(Command {
                    line: lineno,
                    kind: CommandKind::Print { raw: raw.to_owned() },
                });
            }
        } else if let Some(rest) = line.strip_prefix("wait(") {
            if let Some((payload, _)) = rest.split_once(')') {
                if !payload.is_empty() && payload.bytes().all(|b| b.is_ascii_digit()) {
                    let seconds: u64 = payload.parse().map_err(|_| CompileError {
                        line: lineno,
                        message: format!("wait duration out of range: {payload}"),
                    })?;
                    self.push(Command { line: lineno, kind: CommandKind::Wait { seconds } });
                }
            }
        } else if let Some(caps) = self.repeat_re.captures(line) {
            // A new `repeat` silently replaces any block already open.
            let count = self.resolve_repeat_count(caps[1].trim(), lineno);
            self.repeat = Some(RepeatBlock { count, buf: Vec::new() });
        } else if line == "end" && self.repeat.is_some() {
            if let Some(block) = self.repeat.take() {
                for _ in 0..block.count {
                    self.commands.extend(block.buf.iter().cloned());
                }
            }
        } else if let Some((key, rhs)) = line.split_once('=') {
            let key = key.trim().to_owned();
            let value = eval::eval(rhs.trim(), &self.vars, Mode::Arithmetic);
            self.vars.set(key.clone(), value.clone());
            self.push(Command { line: lineno, kind: CommandKind::Assign { key, value } });
        }
        // Anything else: silently ignored.
        Ok(())
    }

    /// Route a command into the open repeat buffer, or the main sequence.
    fn push(&mut self, cmd: Command) {
        match &mut self.repeat {
            Some(block) => block.buf.push(cmd),
            None => self.commands.push(cmd),
        }
    }

    /// Resolve a repeat count: a known variable's value, or the token as a
    /// literal. Anything that is not a valid non-negative integer counts
    /// as zero; counts above [`MAX_REPEAT`] are reported and zeroed.
    fn resolve_repeat_count(&mut self, token: &str, lineno: usize) -> u64 {
        let count = match self.vars.get(token) {
            Some(Value::Num(n)) if *n >= 0.0 && n.is_finite() => n.trunc() as u64,
            Some(Value::Num(_)) => 0,
            Some(Value::Str(s)) => parse_count(s),
            None => parse_count(token),
        };
        if count > MAX_REPEAT {
            self.errors.push(CompileError {
                line: lineno,
                message: format!("repeat count {count} exceeds limit {MAX_REPEAT}; block unrolls zero times"),
            });
            return 0;
        }
        count
    }
}

fn parse_count(token: &str) -> u64 {
    token
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|n| *n >= 0)
        .map_or(0, |n| n as u64)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<CommandKind> {
        let (program, errors) = compile(src);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        program.commands.into_iter().map(|c| c.kind).collect()
    }

    #[test]
    fn empty_source_compiles_to_nothing() {
        let (program, errors) = compile("");
        assert!(program.commands.is_empty());
        assert!(program.vars.is_empty());
        assert!(errors.is_empty());
    }

    #[test]
    fn comments_and_blanks_are_skipped() {
        let (program, errors) = compile("// nothing here\n\n   \n// more\n");
        assert!(program.commands.is_empty());
        assert!(program.vars.is_empty());
        assert!(errors.is_empty());
    }

    #[test]
    fn trailing_comment_stripped() {
        assert_eq!(kinds("clear // wipe"), vec![CommandKind::Clear]);
    }

    #[test]
    fn clear_must_match_exactly() {
        assert!(kinds("clearx").is_empty());
    }

    #[test]
    fn print_keeps_raw_expression() {
        assert_eq!(
            kinds("print($x + 1)"),
            vec![CommandKind::Print { raw: "$x + 1".into() }]
        );
    }

    #[test]
    fn print_without_close_paren_is_ignored() {
        assert!(kinds("print('hello").is_empty());
    }

    #[test]
    fn print_stops_at_first_close_paren() {
        assert_eq!(
            kinds("print(a(b)c)"),
            vec![CommandKind::Print { raw: "a(b".into() }]
        );
    }

    #[test]
    fn wait_parses_seconds() {
        assert_eq!(kinds("wait(10)"), vec![CommandKind::Wait { seconds: 10 }]);
    }

    #[test]
    fn wait_with_non_digits_is_ignored() {
        assert!(kinds("wait(2s)").is_empty());
        assert!(kinds("wait()").is_empty());
        assert!(kinds("wait(-1)").is_empty());
    }

    #[test]
    fn wait_overflow_is_reported() {
        let (program, errors) = compile("wait(99999999999999999999999)");
        assert!(program.commands.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 1);
    }

    #[test]
    fn assignment_builds_table_and_command() {
        let (program, errors) = compile("x = 2\ny = 3\nz = $x + $y");
        assert!(errors.is_empty());
        assert_eq!(program.vars.get("z"), Some(&Value::Num(5.0)));
        assert_eq!(program.commands.len(), 3);
        assert_eq!(
            program.commands[2].kind,
            CommandKind::Assign { key: "z".into(), value: Value::Num(5.0) }
        );
    }

    #[test]
    fn mixed_assignment_concatenates() {
        let (program, _) = compile("a = 'hi'\nb = $a + 1");
        assert_eq!(program.vars.get("b"), Some(&Value::Str("hi1".into())));
    }

    #[test]
    fn assignment_splits_on_first_equals() {
        let (program, _) = compile("x = 'a=b'");
        assert_eq!(program.vars.get("x"), Some(&Value::Str("a=b".into())));
    }

    #[test]
    fn repeat_unrolls_inline() {
        let cmds = kinds("repeat 3\nprint(hi)\nend");
        assert_eq!(
            cmds,
            vec![
                CommandKind::Print { raw: "hi".into() },
                CommandKind::Print { raw: "hi".into() },
                CommandKind::Print { raw: "hi".into() },
            ]
        );
    }

    #[test]
    fn repeat_count_from_variable() {
        let cmds = kinds("n = 2\nrepeat n\nclear\nend");
        assert_eq!(
            cmds,
            vec![
                CommandKind::Assign { key: "n".into(), value: Value::Num(2.0) },
                CommandKind::Clear,
                CommandKind::Clear,
            ]
        );
    }

    #[test]
    fn repeat_with_undefined_variable_unrolls_nothing() {
        let (program, errors) = compile("repeat x\nprint(hi)\nend");
        assert!(program.commands.is_empty());
        assert!(errors.is_empty());
    }

    #[test]
    fn repeat_zero_unrolls_nothing() {
        assert!(kinds("repeat 0\nprint(hi)\nend").is_empty());
    }

    #[test]
    fn repeat_preserves_command_order() {
        let cmds = kinds("repeat 2\nclear\nprint(a)\nend");
        assert_eq!(
            cmds,
            vec![
                CommandKind::Clear,
                CommandKind::Print { raw: "a".into() },
                CommandKind::Clear,
                CommandKind::Print { raw: "a".into() },
            ]
        );
    }

    #[test]
    fn new_repeat_discards_open_block() {
        // The first block's captured print is thrown away.
        let cmds = kinds("repeat 2\nprint(a)\nrepeat 3\nprint(b)\nend");
        assert_eq!(
            cmds,
            vec![
                CommandKind::Print { raw: "b".into() },
                CommandKind::Print { raw: "b".into() },
                CommandKind::Print { raw: "b".into() },
            ]
        );
    }

    #[test]
    fn end_without_repeat_is_ignored() {
        assert!(kinds("end").is_empty());
    }

    #[test]
    fn unterminated_repeat_discards_buffer() {
        assert!(kinds("repeat 3\nprint(hi)").is_empty());
    }

    #[test]
    fn repeat_over_limit_is_reported_and_zeroed() {
        let (program, errors) = compile("repeat 9999999\nprint(hi)\nend");
        assert!(program.commands.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("exceeds limit"));
    }

    #[test]
    fn assignment_inside_repeat_applies_once_to_table() {
        let (program, _) = compile("repeat 2\nx = 1\nend");
        assert_eq!(program.vars.get("x"), Some(&Value::Num(1.0)));
        // …but the assign command itself is replayed twice.
        assert_eq!(program.commands.len(), 2);
    }

    #[test]
    fn unknown_lines_are_silently_ignored() {
        let (program, errors) = compile("frobnicate\n???\n)(");
        assert!(program.commands.is_empty());
        assert!(errors.is_empty());
    }

    #[test]
    fn line_numbers_are_one_based() {
        let (program, _) = compile("// header\nclear\n\nprint(hi)");
        assert_eq!(program.commands[0].line, 2);
        assert_eq!(program.commands[1].line, 4);
    }

    #[test]
    fn compilation_is_deterministic() {
        let src = "x = 1\nrepeat 2\nprint($x)\nend\nwait(1)";
        let (a, _) = compile(src);
        let (b, _) = compile(src);
        assert_eq!(a, b);
    }
}
