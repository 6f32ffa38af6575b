//! A tree-walking interpreter for Las, a small statically-typed imperative
//! scripting language.
//!
//! The pipeline is linear: source text is lexed into tokens, parsed into a
//! statement list, then executed directly against a mutable scope stack.
//! There is no bytecode and no separate type-checking pass — type errors
//! surface as ordinary runtime errors at the point of evaluation.

pub mod ast;
pub mod builtins;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod span;
pub mod token;
pub mod types;
pub mod value;

use std::io::Write;

use error::LasError;
use interpreter::Interpreter;
use lexer::Lexer;
use parser::Parser;

/// Runs a Las source file to completion, writing `print`/`println` output to
/// `stdout`. Returns the first error encountered, already carrying its
/// source location for the caller to render.
pub fn run<W: Write>(file: &str, source: &str, stdout: W) -> Result<(), LasError> {
    let tokens = Lexer::new(file, source).tokenize()?;
    let program = Parser::new(tokens).parse_program()?;
    let mut interpreter = Interpreter::new(stdout);
    interpreter.run(&program)?;
    Ok(())
}

/// Parses and runs `source`, returning everything written to stdout as a
/// `String`. Convenient for tests that only care about program output.
pub fn run_to_string(file: &str, source: &str) -> Result<String, LasError> {
    let mut buf = Vec::new();
    run(file, source, &mut buf)?;
    Ok(String::from_utf8(buf).expect("interpreter output is always valid UTF-8"))
}
