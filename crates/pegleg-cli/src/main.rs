//! CLI driver for `pegleg-core`.
//!
//! The PEG-text front-end is out of core scope, so the input this binary
//! reads is a JSON-serialized `Tree` (the builder's own output format, see
//! `pegleg_core::ast::Tree`'s `Serialize`/`Deserialize` derive) rather than
//! `.peg`/`.leg` grammar source. This mirrors `plotnik-cli`'s `check`/`dump`
//! commands: read input, analyze, emit, report diagnostics to stderr, exit
//! nonzero on any error-severity diagnostic or host failure.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;

use pegleg_core::Tree;

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to read '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read stdin: {0}")]
    ReadStdin(#[source] io::Error),
    #[error("failed to parse grammar AST as JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("failed to write '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write to stdout: {0}")]
    WriteStdout(#[source] io::Error),
    #[error(transparent)]
    Codegen(#[from] pegleg_core::error::CodegenError),
}

/// Compiles a JSON-serialized grammar AST into a recursive-descent
/// recognizer.
#[derive(Debug, Parser)]
#[command(name = "pegleg", version, about)]
struct Args {
    /// Path to a JSON-serialized `Tree`, or `-` for stdin.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Where to write the generated recognizer. Defaults to stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Runs the full pipeline, returning whether compilation succeeded (no
/// error-severity diagnostics). A host-I/O or internal-generator failure is
/// an `Err` instead — the two failure domains are kept separate so a
/// grammar with warnings still produces output.
fn run(args: Args) -> Result<bool, CliError> {
    let input = read_input(&args.input)?;
    let mut tree: Tree = serde_json::from_str(&input).map_err(CliError::InvalidJson)?;

    let diagnostics = pegleg_core::analyze::analyze(&mut tree);
    let has_errors = diagnostics.has_errors();
    for diagnostic in diagnostics.iter() {
        eprintln!("{diagnostic}");
    }

    let generated = pegleg_core::codegen::generate(&mut tree)?;
    write_output(args.output.as_deref(), &generated)?;

    Ok(!has_errors)
}

fn read_input(path: &PathBuf) -> Result<String, CliError> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).map_err(CliError::ReadStdin)?;
        return Ok(buf);
    }
    fs::read_to_string(path).map_err(|source| CliError::ReadFile { path: path.clone(), source })
}

fn write_output(path: Option<&std::path::Path>, text: &str) -> Result<(), CliError> {
    match path {
        Some(path) => fs::write(path, text)
            .map_err(|source| CliError::WriteFile { path: path.to_path_buf(), source }),
        None => io::stdout().write_all(text.as_bytes()).map_err(CliError::WriteStdout),
    }
}

#[cfg(test)]
mod main_tests;
