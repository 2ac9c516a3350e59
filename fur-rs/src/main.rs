use std::io::Read;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use fur::cli::{self, SourceSpec};
use fur::exec::{Executor, OutputSink};
use fur::script::compile;

/// Sink for interactive runs: program output on stdout, diagnostics on
/// stderr. `clear` wipes the terminal with the standard escape sequence.
struct StdoutSink {
    quiet: bool,
}

impl OutputSink for StdoutSink {
    fn append_line(&mut self, text: &str) {
        println!("{text}");
    }

    fn clear_all(&mut self) {
        print!("\x1b[2J\x1b[H");
    }

    fn report_diagnostic(&mut self, message: &str, line: Option<usize>) {
        if self.quiet {
            return;
        }
        match line {
            Some(line) => eprintln!("fur: error: {message} (line {line})"),
            None => eprintln!("fur: error: {message} (line unknown)"),
        }
    }
}

fn load_source(spec: &SourceSpec) -> Result<String, String> {
    match spec {
        SourceSpec::Inline(code) => Ok(code.clone()),
        SourceSpec::File(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("{}: {e}", path.display())),
        SourceSpec::Stdin => {
            let mut src = String::new();
            std::io::stdin()
                .read_to_string(&mut src)
                .map_err(|e| format!("stdin: {e}"))?;
            Ok(src)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("fur: {e}");
            eprintln!("Usage: fur [-c<code>] [-d] [-q] [<file>]");
            return ExitCode::FAILURE;
        }
    };

    let source = match load_source(&args.source) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("fur: {e}");
            return ExitCode::FAILURE;
        }
    };

    let (program, errors) = compile(&source);

    let mut sink = StdoutSink { quiet: args.quiet };
    for e in &errors {
        sink.report_diagnostic(&e.message, Some(e.line));
    }

    if args.debug {
        print!("{}", program.dump());
        return ExitCode::SUCCESS;
    }

    Executor::new(&program, &mut sink).run().await;
    ExitCode::SUCCESS
}
