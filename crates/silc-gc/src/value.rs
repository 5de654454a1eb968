//! Tagged value words
//!
//! Every silc value is a single 32-bit word. The two low bits select the
//! primary type; heap references carry a position-table index in the
//! remaining bits, inline values carry a subtype and their content.
//!
//! ## Encoding Scheme
//!
//! ```text
//! heap reference:  [ position index : 30 ][ type : 2 ]
//! inline value:    [ content : 28 ][ subtype : 2 ][ type = 0 : 2 ]
//!
//! type:     0 = inline, 1 = cons, 2 = object ref, 3 = byte ref
//! subtype:  0 = nil, 1 = bool, 2 = int, 3 = error
//! int:      [ sign : 1 ][ magnitude : 27 ] (sign-magnitude, never -0)
//! ```
//!
//! `NIL` is the all-zero word, so a zero-filled slot reads back as nil.

use std::fmt;

use crate::error::{GcError, GcResult};

/// Number of bits holding the primary type
pub const TYPE_BITS: u32 = 2;
const TYPE_MASK: u32 = (1 << TYPE_BITS) - 1;

/// Number of bits available after the primary type
pub const CONTENT_BITS: u32 = u32::BITS - TYPE_BITS;

const SUBTYPE_BITS: u32 = 2;
const SUBTYPE_MASK: u32 = (1 << SUBTYPE_BITS) - 1;
const INLINE_SHIFT: u32 = TYPE_BITS + SUBTYPE_BITS;

/// Number of content bits of an inline value
pub const INLINE_CONTENT_BITS: u32 = CONTENT_BITS - SUBTYPE_BITS;

const INT_SIGN_BIT: u32 = 1 << (INLINE_CONTENT_BITS - 1);

/// Largest magnitude an inline integer can hold
pub const MAX_INT: i32 = (INT_SIGN_BIT - 1) as i32;

/// Largest error code an inline error can carry
pub const MAX_ERROR_CODE: u32 = (1 << INLINE_CONTENT_BITS) - 1;

/// Largest position index a heap reference can carry
pub const MAX_HANDLE_INDEX: usize = (1 << CONTENT_BITS) - 1;

/// Primary type of a value word
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Immediate value: nil, bool, int or error
    Inline = 0,
    /// Handle to a two-slot cons cell
    Cons = 1,
    /// Handle to a sequence of values
    ObjRef = 2,
    /// Handle to a sequence of bytes
    ByteRef = 3,
}

impl ValueType {
    /// Decode from the two low bits of a word
    pub const fn from_bits(bits: u32) -> Self {
        match bits & TYPE_MASK {
            0 => ValueType::Inline,
            1 => ValueType::Cons,
            2 => ValueType::ObjRef,
            _ => ValueType::ByteRef,
        }
    }

    /// Whether values of this type live on the heap
    pub const fn is_heap_ref(self) -> bool {
        !matches!(self, ValueType::Inline)
    }
}

/// Subtype of an inline value
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InlineSubtype {
    /// The empty list
    Nil = 0,
    /// `true` / `false`
    Bool = 1,
    /// Bounded signed fixnum
    Int = 2,
    /// Error code (also the quit signal and the unresolved-symbol marker)
    Err = 3,
}

/// A tagged silc value
///
/// Values are plain words: copying one never allocates and never touches
/// the heap. A heap reference stays valid across compaction because it
/// names a position-table cell, not an address.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Value(u32);

impl Value {
    /// The empty list
    pub const NIL: Value = Value::inline(0, InlineSubtype::Nil);
    /// Boolean false
    pub const FALSE: Value = Value::inline(0, InlineSubtype::Bool);
    /// Boolean true
    pub const TRUE: Value = Value::inline(1, InlineSubtype::Bool);
    /// Integer zero
    pub const ZERO: Value = Value::inline(0, InlineSubtype::Int);

    const fn inline(content: u32, subtype: InlineSubtype) -> Value {
        Value((content << INLINE_SHIFT) | ((subtype as u32) << TYPE_BITS))
    }

    /// Reinterpret a raw word
    pub const fn from_bits(bits: u32) -> Value {
        Value(bits)
    }

    /// The raw word
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Build a heap reference for a position-table index
    pub(crate) const fn from_handle(index: usize, value_type: ValueType) -> Value {
        debug_assert!(index <= MAX_HANDLE_INDEX);
        Value(((index as u32) << TYPE_BITS) | value_type as u32)
    }

    /// Primary type
    pub const fn value_type(self) -> ValueType {
        ValueType::from_bits(self.0)
    }

    /// Inline subtype, or `None` for heap references
    pub const fn inline_subtype(self) -> Option<InlineSubtype> {
        if !matches!(self.value_type(), ValueType::Inline) {
            return None;
        }
        Some(match (self.0 >> TYPE_BITS) & SUBTYPE_MASK {
            0 => InlineSubtype::Nil,
            1 => InlineSubtype::Bool,
            2 => InlineSubtype::Int,
            _ => InlineSubtype::Err,
        })
    }

    const fn inline_content(self) -> u32 {
        self.0 >> INLINE_SHIFT
    }

    /// Position-table index of a heap reference
    pub const fn handle_index(self) -> Option<usize> {
        if self.value_type().is_heap_ref() {
            Some((self.0 >> TYPE_BITS) as usize)
        } else {
            None
        }
    }

    /// Is this the empty list
    pub const fn is_nil(self) -> bool {
        self.0 == Value::NIL.0
    }

    /// Is this a cons cell
    pub const fn is_cons(self) -> bool {
        matches!(self.value_type(), ValueType::Cons)
    }

    /// Does this value live on the heap
    pub const fn is_heap_ref(self) -> bool {
        self.value_type().is_heap_ref()
    }

    /// Encode a boolean
    pub const fn bool(b: bool) -> Value {
        if b { Value::TRUE } else { Value::FALSE }
    }

    /// Decode a boolean
    pub fn as_bool(self) -> Option<bool> {
        match self.inline_subtype()? {
            InlineSubtype::Bool => Some(self.inline_content() != 0),
            _ => None,
        }
    }

    /// Encode an integer, failing when `|v| > MAX_INT`
    pub fn int(v: i32) -> GcResult<Value> {
        let magnitude = v.unsigned_abs();
        if magnitude > MAX_INT as u32 {
            return Err(GcError::IntOutOfRange(v as i64));
        }
        let sign = if v < 0 { INT_SIGN_BIT } else { 0 };
        Ok(Value::inline(magnitude | sign, InlineSubtype::Int))
    }

    /// Encode an integer known to be in range
    ///
    /// # Panics
    /// Panics if `|v| > MAX_INT`.
    pub fn int_unchecked(v: i32) -> Value {
        match Value::int(v) {
            Ok(value) => value,
            Err(e) => panic!("{e}"),
        }
    }

    /// Decode an integer
    pub fn as_int(self) -> Option<i32> {
        match self.inline_subtype()? {
            InlineSubtype::Int => Some(self.decode_int()),
            _ => None,
        }
    }

    /// Decode an integer without checking the subtype in release builds
    pub fn decode_int(self) -> i32 {
        debug_assert_eq!(self.inline_subtype(), Some(InlineSubtype::Int));
        let content = self.inline_content();
        let magnitude = (content & !INT_SIGN_BIT) as i32;
        if content & INT_SIGN_BIT != 0 {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Encode an error code
    ///
    /// # Panics
    /// Panics if `code` is zero or exceeds [`MAX_ERROR_CODE`].
    pub fn error(code: u32) -> Value {
        assert!(
            code > 0 && code <= MAX_ERROR_CODE,
            "error code {code} out of range"
        );
        Value::inline(code, InlineSubtype::Err)
    }

    /// Error code carried by this value, if it is an error
    pub fn error_code(self) -> Option<u32> {
        match self.inline_subtype()? {
            InlineSubtype::Err => Some(self.inline_content()),
            _ => None,
        }
    }

    /// Is this an error value
    pub fn is_error(self) -> bool {
        self.error_code().is_some()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inline_subtype() {
            Some(InlineSubtype::Nil) => write!(f, "Nil"),
            Some(InlineSubtype::Bool) => write!(f, "Bool({})", self.inline_content() != 0),
            Some(InlineSubtype::Int) => write!(f, "Int({})", self.decode_int()),
            Some(InlineSubtype::Err) => write!(f, "Err({})", self.inline_content()),
            None => write!(
                f,
                "{:?}#{}",
                self.value_type(),
                self.handle_index().unwrap_or_default()
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::bool(b)
    }
}

impl TryFrom<i32> for Value {
    type Error = GcError;

    fn try_from(v: i32) -> GcResult<Self> {
        Value::int(v)
    }
}
