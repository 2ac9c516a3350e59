//! Expression evaluation, in both of the language's substitution modes.
//!
//! The same evaluator serves two callers, selected by [`Mode`]:
//!
//! - [`Mode::Arithmetic`] — assignment right-hand sides, at compile time.
//!   The text is split blindly on `+` into operands; quoted pieces are
//!   string literals, known names take their stored value, numeric pieces
//!   are numbers; the result is the arithmetic sum when every operand is
//!   numeric, string concatenation otherwise.
//! - [`Mode::Template`] — `print(...)` payloads, at execution time.
//!   Every `+` is deleted together with the whitespace around it, then
//!   `$name` tokens *and* word-boundary occurrences of bare variable
//!   names substitute their values. Quotes are not special in this mode.
//!
//! Both modes resolve `$name` the same way: the reference goes through
//! the value's display text (undefined references stay as written). One
//! arithmetic-mode consequence: `x = '5'` then `$x + 1` is the number 6,
//! while `x + 1` keeps the stored string and concatenates to `"51"`.
//!
//! Substitution never operates on its own output: expressions are parsed
//! once into operands/segments, and template rendering is a single
//! left-to-right pass locating bare names with one leftmost-longest
//! aho-corasick sweep. Values containing `$`, other variables' names, or
//! regex metacharacters therefore come through verbatim.

use aho_corasick::{AhoCorasickBuilder, MatchKind};

use crate::var::VarTable;

use super::value::Value;

/// Which substitution policy to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Assignment-time: `+` is polymorphic addition/concatenation.
    Arithmetic,
    /// Print-time: `+` joins, bare names substitute, quotes are literal.
    Template,
}

/// Evaluate `raw` against a variable snapshot. Pure: same inputs, same
/// result.
pub fn eval(raw: &str, vars: &VarTable, mode: Mode) -> Value {
    match mode {
        Mode::Arithmetic => parse(raw).eval(vars),
        Mode::Template => Value::Str(render_template(raw, vars)),
    }
}

// ── Arithmetic mode ───────────────────────────────────────────────────────────

/// One segment of an operand: literal text or a `$name` reference.
#[derive(Debug, Clone, PartialEq)]
enum Seg {
    Text(String),
    Var(String),
}

/// One `+`-separated operand, already trimmed and scanned for `$name`
/// references.
#[derive(Debug, Clone, PartialEq)]
pub struct Operand {
    segs: Vec<Seg>,
}

/// A parsed assignment right-hand side.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    operands: Vec<Operand>,
}

/// Parse an expression into its operand list. The split is blind: quotes
/// do not protect a `+`.
pub fn parse(src: &str) -> Expr {
    let operands = src.split('+').map(|p| parse_operand(p.trim())).collect();
    Expr { operands }
}

fn parse_operand(piece: &str) -> Operand {
    let mut segs = Vec::new();
    let mut text = String::new();
    let mut chars = piece.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some(c) if is_ident_start(*c)) {
            if !text.is_empty() {
                segs.push(Seg::Text(std::mem::take(&mut text)));
            }
            let mut name = String::new();
            while matches!(chars.peek(), Some(c) if is_ident_continue(*c)) {
                name.push(chars.next().unwrap());
            }
            segs.push(Seg::Var(name));
        } else {
            text.push(ch);
        }
    }
    if !text.is_empty() || segs.is_empty() {
        segs.push(Seg::Text(text));
    }
    Operand { segs }
}

impl Expr {
    /// Evaluate against a variable snapshot: the arithmetic sum when all
    /// operands resolve numeric, concatenation otherwise.
    pub fn eval(&self, vars: &VarTable) -> Value {
        let resolved: Vec<Value> = self.operands.iter().map(|op| op.resolve(vars)).collect();
        if !resolved.is_empty() && resolved.iter().all(Value::is_num) {
            let sum = resolved.iter().filter_map(Value::as_num).sum();
            Value::Num(sum)
        } else {
            let mut s = String::new();
            for v in &resolved {
                s.push_str(&v.to_string());
            }
            Value::Str(s)
        }
    }
}

impl Operand {
    /// Resolution order: quoted literal, known variable, number, raw
    /// text — after substituting any `$name` segments.
    fn resolve(&self, vars: &VarTable) -> Value {
        let mut s = String::new();
        for seg in &self.segs {
            match seg {
                Seg::Text(t) => s.push_str(t),
                Seg::Var(name) => match vars.get(name) {
                    Some(v) => s.push_str(&v.to_string()),
                    None => {
                        s.push('$');
                        s.push_str(name);
                    }
                },
            }
        }

        if let Some(inner) = strip_quotes(&s) {
            return Value::Str(inner.to_owned());
        }
        if let Some(v) = vars.get(&s) {
            return v.clone();
        }
        if let Ok(n) = s.parse::<f64>() {
            if n.is_finite() {
                return Value::Num(n);
            }
        }
        Value::Str(s)
    }
}

/// If `s` starts and ends with the same quote character, return the text
/// between the quotes.
fn strip_quotes(s: &str) -> Option<&str> {
    for q in ['\'', '"'] {
        if s.starts_with(q) && s.ends_with(q) {
            return if s.len() >= 2 { Some(&s[1..s.len() - 1]) } else { Some("") };
        }
    }
    None
}

// ── Template mode ─────────────────────────────────────────────────────────────

fn render_template(raw: &str, vars: &VarTable) -> String {
    let text = strip_joins(raw.trim());
    substitute(&text, vars)
}

/// Delete every `+` and the whitespace immediately around it.
fn strip_joins(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut pending_ws = String::new();
    let mut after_plus = false;

    for ch in src.chars() {
        if ch == '+' {
            pending_ws.clear();
            after_plus = true;
        } else if ch.is_whitespace() {
            if !after_plus {
                pending_ws.push(ch);
            }
        } else {
            out.push_str(&pending_ws);
            pending_ws.clear();
            after_plus = false;
            out.push(ch);
        }
    }
    if !after_plus {
        out.push_str(&pending_ws);
    }
    out
}

/// The single substitution pass over the joined template.
fn substitute(text: &str, vars: &VarTable) -> String {
    let matches = bare_matches(text, vars);
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    let mut mi = 0;

    while pos < text.len() {
        while mi < matches.len() && matches[mi].start < pos {
            mi += 1;
        }

        // `$name` token.
        if bytes[pos] == b'$' {
            if let Some(end) = scan_ident(text, pos + 1) {
                let name = &text[pos + 1..end];
                if let Some(v) = vars.get(name) {
                    out.push_str(&v.to_string());
                    pos = end;
                    continue;
                }
            }
            // Undefined or no identifier: keep the `$` and rescan from
            // the next character, so a known bare name right after it
            // still substitutes.
            out.push('$');
            pos += 1;
            continue;
        }

        // Bare variable name at a word boundary.
        if mi < matches.len() && matches[mi].start == pos {
            let m = &matches[mi];
            if let Some(v) = vars.get(m.name) {
                out.push_str(&v.to_string());
            }
            pos = m.end;
            mi += 1;
            continue;
        }

        let ch = text[pos..].chars().next().unwrap();
        out.push(ch);
        pos += ch.len_utf8();
    }
    out
}

struct BareMatch<'a> {
    start: usize,
    end: usize,
    name: &'a str,
}

/// All word-boundary occurrences of variable names in `text`, in order,
/// non-overlapping, longest name winning on ties.
fn bare_matches<'a>(text: &str, vars: &'a VarTable) -> Vec<BareMatch<'a>> {
    let names = vars.names();
    if names.is_empty() {
        return Vec::new();
    }
    let ac = AhoCorasickBuilder::new()
        .match_kind(MatchKind::LeftmostLongest)
        .build(&names);
    ac.find_iter(text)
        .filter(|m| word_boundary(text, m.start(), m.end()))
        .map(|m| BareMatch {
            start: m.start(),
            end: m.end(),
            name: names[m.pattern()],
        })
        .collect()
}

// ── Shared scanning helpers ───────────────────────────────────────────────────

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Identifier scan starting at byte `from`; returns the end offset, or
/// `None` if no identifier starts there.
fn scan_ident(text: &str, from: usize) -> Option<usize> {
    let mut chars = text[from..].char_indices();
    match chars.next() {
        Some((_, c)) if is_ident_start(c) => {}
        _ => return None,
    }
    for (i, c) in chars {
        if !is_ident_continue(c) {
            return Some(from + i);
        }
    }
    Some(text.len())
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `\b` semantics at both edges of `text[start..end]`: each edge must be
/// a word/non-word transition.
fn word_boundary(text: &str, start: usize, end: usize) -> bool {
    let side = |inner: Option<char>, outer: Option<char>| {
        inner.is_some_and(is_word) != outer.is_some_and(is_word)
    };
    let first = text[start..end].chars().next();
    let last = text[start..end].chars().next_back();
    let prev = text[..start].chars().next_back();
    let next = text[end..].chars().next();
    side(first, prev) && side(last, next)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
