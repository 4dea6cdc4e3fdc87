#![forbid(unsafe_code)]

//! MiraScript – the runtime core of a small dynamically-typed,
//! object-oriented scripting language.
//!
//! The crate exposes three building blocks:
//!
//! * [`runtime`] – the object model: boxed values behind the universal
//!   [`ObjectHandle`], classes with single inheritance and
//!   `(name, arity)` method resolution, flat [`Scope`] frames, and the
//!   ambient [`Context`] carrying the output sink.
//! * [`ast`] – the executable [`Statement`] tree a front end hands to the
//!   evaluator. Lexing and parsing live outside this crate; the tree is
//!   plain data.
//! * [`interpreter`] – the tree-walking evaluator plus the [`Interpreter`]
//!   facade an embedder drives. Failures surface as a single coded
//!   [`ScriptError`].
//!
//! The core is single-threaded and synchronous. Values are reference
//! counted; instance graphs may form cycles, which leak until the program
//! ends, since the language has no finalizer protocol.
//!
//! ```
//! use mirascript::{Interpreter, Statement};
//!
//! let program = Statement::compound(vec![
//!     Statement::assignment("x", Statement::NumericConst(2)),
//!     Statement::print(vec![Statement::variable("x")]),
//! ]);
//! let mut output = String::new();
//! Interpreter::new().run(&program, &mut output).unwrap();
//! assert_eq!(output, "2\n");
//! ```

pub mod ast;
pub mod interpreter;
pub mod runtime;

pub use ast::{BinaryOp, CompareOp, Statement, VariableValue};
pub use interpreter::errors::{runtime_error_code, ErrorCode, RuntimeError, ScriptError};
pub use interpreter::{run_program, Flow, Interpreter};
pub use runtime::class::{Class, ClassInstance, Method};
pub use runtime::{Context, Object, ObjectHandle, Scope, DEFAULT_MAX_CALL_DEPTH};

#[cfg(test)]
mod tests;
