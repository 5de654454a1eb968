//! Heap object layout
//!
//! ```text
//! cons:     [car][cdr]
//! obj ref:  [subtype:int][length:int][value 0]...[value length-1]
//! byte ref: [subtype:int][byte length:int][bytes, padded to a word]
//! ```
//!
//! Each live object owns one position cell at the top of the heap buffer:
//! `[offset : 29][gc mark : 1][type : 2]`. A free cell holds `u32::MAX`.

use crate::value::{TYPE_BITS, Value, ValueType};

/// Subtype reported for cons cells, which carry no header
pub const CONS_SUBTYPE: u32 = 0;

/// Words taken by the `(subtype, length)` header of obj and byte refs
pub const HEADER_WORDS: usize = 2;

/// Bytes per heap word
pub const WORD_BYTES: usize = std::mem::size_of::<u32>();

const MARK_BIT: u32 = 1 << TYPE_BITS;
const OFFSET_SHIFT: u32 = TYPE_BITS + 1;
const TYPE_MASK: u32 = (1 << TYPE_BITS) - 1;

/// Largest object-area offset a position cell can hold. The top value is
/// excluded so no live cell can collide with the free marker.
pub const MAX_OFFSET: usize = (1 << (u32::BITS - OFFSET_SHIFT)) - 2;

/// What kind of object to allocate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Two value slots
    Cons,
    /// Variable number of value slots with a subtype tag
    Object(u32),
    /// Variable number of bytes with a subtype tag
    Bytes(u32),
}

impl ObjectKind {
    /// Primary type of references to objects of this kind
    pub fn value_type(self) -> ValueType {
        match self {
            ObjectKind::Cons => ValueType::Cons,
            ObjectKind::Object(_) => ValueType::ObjRef,
            ObjectKind::Bytes(_) => ValueType::ByteRef,
        }
    }

    /// Object-area words needed for `length` slots (or bytes)
    pub fn size_in_words(self, length: usize) -> usize {
        match self {
            ObjectKind::Cons => 2,
            ObjectKind::Object(_) => HEADER_WORDS + length,
            ObjectKind::Bytes(_) => HEADER_WORDS + words_for_bytes(length),
        }
    }
}

/// Initial content of a freshly allocated object
#[derive(Debug, Clone, Copy)]
pub enum Content<'a> {
    /// Nil slots or zero bytes
    Empty,
    /// Slot values, for cons cells and obj refs
    Values(&'a [Value]),
    /// Payload, for byte refs
    Bytes(&'a [u8]),
}

impl<'a> Content<'a> {
    /// Values that must survive a collection triggered by this allocation
    pub fn values(&self) -> &'a [Value] {
        match *self {
            Content::Values(values) => values,
            _ => &[],
        }
    }
}

/// Words needed to hold `byte_count` bytes
pub const fn words_for_bytes(byte_count: usize) -> usize {
    byte_count.div_ceil(WORD_BYTES)
}

/// One entry of the position table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PosCell(u32);

impl PosCell {
    pub(crate) const FREE: PosCell = PosCell(u32::MAX);

    pub(crate) fn new(offset: usize, value_type: ValueType) -> Self {
        debug_assert!(offset <= MAX_OFFSET);
        PosCell(((offset as u32) << OFFSET_SHIFT) | value_type as u32)
    }

    pub(crate) fn from_bits(bits: u32) -> Self {
        PosCell(bits)
    }

    pub(crate) fn bits(self) -> u32 {
        self.0
    }

    pub(crate) fn is_free(self) -> bool {
        self == PosCell::FREE
    }

    pub(crate) fn offset(self) -> usize {
        (self.0 >> OFFSET_SHIFT) as usize
    }

    pub(crate) fn value_type(self) -> ValueType {
        ValueType::from_bits(self.0 & TYPE_MASK)
    }

    pub(crate) fn is_marked(self) -> bool {
        self.0 & MARK_BIT != 0
    }

    pub(crate) fn marked(self) -> Self {
        PosCell(self.0 | MARK_BIT)
    }

    pub(crate) fn unmarked(self) -> Self {
        PosCell(self.0 & !MARK_BIT)
    }

    /// Same cell with its offset moved down by `words`, mark and type kept
    pub(crate) fn shifted_down(self, words: usize) -> Self {
        let flags = self.0 & (MARK_BIT | TYPE_MASK);
        PosCell((((self.offset() - words) as u32) << OFFSET_SHIFT) | flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_marking() {
        let cell = PosCell::new(42, ValueType::ObjRef);
        assert!(!cell.is_marked());
        assert!(!cell.is_free());

        let marked = cell.marked();
        assert!(marked.is_marked());
        assert_eq!(marked.offset(), 42);
        assert_eq!(marked.value_type(), ValueType::ObjRef);
        assert_eq!(marked.unmarked(), cell);
    }

    #[test]
    fn test_cell_shift_keeps_flags() {
        let cell = PosCell::new(100, ValueType::ByteRef).marked();
        let moved = cell.shifted_down(7);
        assert_eq!(moved.offset(), 93);
        assert!(moved.is_marked());
        assert_eq!(moved.value_type(), ValueType::ByteRef);
    }

    #[test]
    fn test_max_offset_is_not_free() {
        let cell = PosCell::new(MAX_OFFSET, ValueType::ByteRef).marked();
        assert!(!cell.is_free());
    }

    #[test]
    fn test_sizes() {
        assert_eq!(ObjectKind::Cons.size_in_words(2), 2);
        assert_eq!(ObjectKind::Object(10).size_in_words(3), 5);
        assert_eq!(ObjectKind::Bytes(1000).size_in_words(0), 2);
        assert_eq!(ObjectKind::Bytes(1000).size_in_words(5), 4);
        assert_eq!(ObjectKind::Bytes(1000).size_in_words(8), 4);
    }
}
