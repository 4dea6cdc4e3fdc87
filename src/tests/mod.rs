//! End-to-end suites: whole programs built as statement trees and run
//! against a captured sink.


use crate::{Interpreter, Statement};

/// Runs a program with a fresh interpreter and returns everything it printed.
pub(crate) fn run(program: Statement) -> String {
    let mut out = String::new();
    Interpreter::new()
        .run(&program, &mut out)
        .expect("program runs");
    out
}
