//! Command-line argument parsing.
//!
//! Usage:
//!   fur [-c<code>] [-d] [-q] [<file>]
//!
//! With no file argument (or `-`), the script is read from stdin.

use std::path::PathBuf;

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Where the script comes from.
    pub source: SourceSpec,
    /// Compile only and dump the IR (`-d`).
    pub debug: bool,
    /// Suppress compile/execute diagnostics (`-q`).
    pub quiet: bool,
}

/// Where to read the script from.
#[derive(Debug, Default, PartialEq)]
pub enum SourceSpec {
    /// No file argument, or `-`.
    #[default]
    Stdin,
    /// A script file path.
    File(PathBuf),
    /// Inline code from `-c<code>`.
    Inline(String),
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(&raw[1..])
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut positional: Vec<String> = Vec::new();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing.
        if arg == "--" {
            i += 1;
            positional.extend(argv[i..].iter().cloned());
            break;
        }

        if let Some(rest) = arg.strip_prefix("-c") {
            let code = if !rest.is_empty() {
                rest.to_owned()
            } else {
                i += 1;
                argv.get(i).cloned().ok_or("missing code after -c")?
            };
            args.source = SourceSpec::Inline(code);
        } else if arg.starts_with('-') && arg.len() > 1 {
            for flag in arg[1..].chars() {
                match flag {
                    'd' => args.debug = true,
                    'q' => args.quiet = true,
                    other => return Err(format!("unknown option -{other}")),
                }
            }
        } else {
            positional.push(arg.to_owned());
        }
        i += 1;
    }

    match positional.len() {
        0 => {}
        1 => {
            if matches!(args.source, SourceSpec::Inline(_)) {
                return Err("cannot combine -c with a script file".into());
            }
            if positional[0] != "-" {
                args.source = SourceSpec::File(PathBuf::from(&positional[0]));
            }
        }
        _ => return Err(format!("unexpected argument: {}", positional[1])),
    }

    Ok(args)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs, String> {
        let owned: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        parse_argv(&owned)
    }

    #[test]
    fn no_args_reads_stdin() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.source, SourceSpec::Stdin);
        assert!(!args.debug);
        assert!(!args.quiet);
    }

    #[test]
    fn file_argument() {
        let args = parse(&["script.fur"]).unwrap();
        assert_eq!(args.source, SourceSpec::File(PathBuf::from("script.fur")));
    }

    #[test]
    fn dash_means_stdin() {
        let args = parse(&["-"]).unwrap();
        assert_eq!(args.source, SourceSpec::Stdin);
    }

    #[test]
    fn inline_code_attached() {
        let args = parse(&["-cprint(hi)"]).unwrap();
        assert_eq!(args.source, SourceSpec::Inline("print(hi)".into()));
    }

    #[test]
    fn inline_code_detached() {
        let args = parse(&["-c", "print(hi)"]).unwrap();
        assert_eq!(args.source, SourceSpec::Inline("print(hi)".into()));
    }

    #[test]
    fn missing_inline_code_is_an_error() {
        assert!(parse(&["-c"]).is_err());
    }

    #[test]
    fn clustered_flags() {
        let args = parse(&["-dq"]).unwrap();
        assert!(args.debug);
        assert!(args.quiet);
    }

    #[test]
    fn unknown_flag_is_an_error() {
        assert!(parse(&["-z"]).is_err());
    }

    #[test]
    fn double_dash_ends_flags() {
        let args = parse(&["--", "-weird"]).unwrap();
        assert_eq!(args.source, SourceSpec::File(PathBuf::from("-weird")));
    }

    #[test]
    fn two_files_is_an_error() {
        assert!(parse(&["a.fur", "b.fur"]).is_err());
    }

    #[test]
    fn inline_code_with_file_is_an_error() {
        assert!(parse(&["-cprint(hi)", "a.fur"]).is_err());
    }
}
