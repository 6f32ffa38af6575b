use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;

/// A tree-walking interpreter for the Las scripting language.
#[derive(Parser)]
#[command(name = "interp")]
struct Cli {
    /// Path to a Las source file.
    source_file: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let source = match fs::read_to_string(&cli.source_file) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("\n{}: {e}", cli.source_file);
            return ExitCode::FAILURE;
        }
    };

    let stdout = io::stdout();
    match las::run(&cli.source_file, &source, stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let _ = io::stdout().flush();
            eprintln!("\n{e}");
            ExitCode::FAILURE
        }
    }
}
