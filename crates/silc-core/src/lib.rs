//! # silc Core
//!
//! Symbols, evaluator, builtins, reader and printer for the silc Lisp
//! runtime, on top of the `silc-gc` heap.
//!
//! ## Design Principles
//!
//! - **Explicit context**: all state lives in a [`Context`]; nothing is global
//! - **Dynamic binding**: a symbol's binding slot is its value, saved and
//!   restored around lambda calls
//! - **Rooted by construction**: the argument stack, the symbol table and the
//!   binding chain are the only roots, and every intermediate value is kept on
//!   one of them across allocations
//! - **Closed builtin set**: dispatch by enum index, never by name

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod binding;
pub mod builtins;
pub mod context;
pub mod error;
pub mod format;
pub mod hash_table;
pub mod interpreter;
pub mod object;
pub mod reader;
pub mod stack;
pub mod symbol;

pub use builtins::Builtin;
pub use context::{Context, ContextConfig};
pub use error::{SilcError, SilcResult};
pub use reader::Reader;
pub use silc_gc::{HeapStats, Value};
