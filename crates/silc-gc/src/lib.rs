//! # silc Garbage Collector
//!
//! Tagged 32-bit value words and the single-buffer heap they point into.
//!
//! ## Design
//!
//! - **Values**: two type bits, inline nil/bool/int/error or a heap handle
//! - **Handles**: index into a position table, so objects can move freely
//! - **Collection**: worklist mark, then in-place compaction of the object area

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod collector;
pub mod error;
pub mod heap;
pub mod object;
pub mod value;

pub use collector::{GcStats, NoRoots, RootSet};
pub use error::{GcError, GcResult};
pub use heap::{GcConfig, Heap, HeapDump, HeapStats, PositionInfo};
pub use object::{CONS_SUBTYPE, Content, ObjectKind};
pub use value::{InlineSubtype, MAX_INT, Value, ValueType};
