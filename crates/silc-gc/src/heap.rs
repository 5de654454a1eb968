//! GC Heap management
//!
//! One word buffer holds both halves of the heap:
//!
//! ```text
//! [object 0][object 1]...[object N] ...free... [pos N]...[pos 1][pos 0]
//!  ^ 0                               ^ avail_index                ^ last_index
//! ```
//!
//! The object area grows upward, the position table grows downward and the
//! two never overlap. A heap reference names a position cell; only that
//! cell changes when the collector moves the object.

use std::fmt;

use crate::collector::{GcStats, ProtectedRoots, RootSet};
use crate::error::{GcError, GcResult};
use crate::object::{
    CONS_SUBTYPE, Content, HEADER_WORDS, MAX_OFFSET, ObjectKind, PosCell, words_for_bytes,
};
use crate::value::{MAX_HANDLE_INDEX, MAX_INT, Value, ValueType};

/// Smallest heap that can hold anything at all
pub const MIN_CAPACITY_WORDS: usize = 4;

/// Largest heap a position cell can address
pub const MAX_CAPACITY_WORDS: usize = 1 << 28;

/// GC configuration
#[derive(Debug, Clone)]
pub struct GcConfig {
    /// Heap size in words (default: 1M words)
    pub capacity_words: usize,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            capacity_words: 1024 * 1024,
        }
    }
}

/// Heap occupancy, measured in words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeapStats {
    /// Size of the whole buffer
    pub total_memory: usize,
    /// Words between the object area and the position table
    pub usable_memory: usize,
    /// Usable words plus vacant position cells
    pub free_memory: usize,
    /// Position cells in use, vacant ones included
    pub pos_count: usize,
    /// Vacant position cells
    pub free_pos_count: usize,
}

impl HeapStats {
    /// Number of objects currently holding a position cell
    pub fn live_objects(&self) -> usize {
        self.pos_count - self.free_pos_count
    }
}

impl fmt::Display for HeapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, ";; ====================================")?;
        writeln!(f, ";; GC statistics:")?;
        writeln!(f, ";;   Total Memory:     {:8} unit(s)", self.total_memory)?;
        writeln!(f, ";;   Free Memory:      {:8} unit(s)", self.free_memory)?;
        writeln!(f, ";;   Usable Memory:    {:8} unit(s)", self.usable_memory)?;
        writeln!(f, ";;   Pos Count:        {:8} unit(s)", self.pos_count)?;
        writeln!(f, ";;   Free Pos Count:   {:8} unit(s)", self.free_pos_count)?;
        write!(f, ";;")
    }
}

/// Where a live object currently sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionInfo {
    /// Position-table index (the handle)
    pub index: usize,
    /// Object-area offset of the first word
    pub offset: usize,
    /// Object size in words
    pub size: usize,
    /// Primary type of the object
    pub value_type: ValueType,
    /// GC mark bit (only set while a collection is running)
    pub marked: bool,
}

impl PositionInfo {
    /// Handle referring to this object
    pub fn value(&self) -> Value {
        Value::from_handle(self.index, self.value_type)
    }
}

/// Compacting heap with a position (handle) table
pub struct Heap {
    /// Object area at the bottom, position table at the top
    pub(crate) buf: Vec<u32>,
    /// Index of the last buffer word, where position cell 0 lives
    pub(crate) last_index: usize,
    /// Next free object-area word
    pub(crate) avail_index: usize,
    /// Position cells in use, scanned from the top downward
    pub(crate) pos_count: usize,
    /// Every cell below this index is occupied
    pub(crate) free_hint: usize,
    /// Collection statistics
    pub(crate) stats: GcStats,
}

impl Heap {
    /// Create new heap with default config
    pub fn new() -> Self {
        Self::with_config(GcConfig::default())
    }

    /// Create new heap with custom config
    ///
    /// # Panics
    /// Panics if the capacity is outside
    /// `MIN_CAPACITY_WORDS..=MAX_CAPACITY_WORDS`.
    pub fn with_config(config: GcConfig) -> Self {
        let capacity = config.capacity_words;
        assert!(
            (MIN_CAPACITY_WORDS..=MAX_CAPACITY_WORDS).contains(&capacity),
            "heap capacity {capacity} must be within {MIN_CAPACITY_WORDS}..={MAX_CAPACITY_WORDS} words"
        );
        Self {
            buf: vec![0; capacity],
            last_index: capacity - 1,
            avail_index: 0,
            pos_count: 0,
            free_hint: 0,
            stats: GcStats::default(),
        }
    }

    /// Heap size in words
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Collection statistics
    pub fn gc_stats(&self) -> &GcStats {
        &self.stats
    }

    pub(crate) fn cell(&self, index: usize) -> PosCell {
        PosCell::from_bits(self.buf[self.last_index - index])
    }

    pub(crate) fn set_cell(&mut self, index: usize, cell: PosCell) {
        self.buf[self.last_index - index] = cell.bits();
    }

    /// Words left between the object area and the position table
    fn available_words(&self) -> usize {
        self.buf.len() - self.avail_index - self.pos_count
    }

    /// Claim a position cell and `words` object-area words.
    ///
    /// Returns `None` when the object area would run into the position table.
    fn try_reserve(&mut self, words: usize, value_type: ValueType) -> Option<usize> {
        let vacant = (self.free_hint..self.pos_count).find(|&i| self.cell(i).is_free());
        let (index, new_pos_count) = match vacant {
            Some(i) => (i, self.pos_count),
            None => (self.pos_count, self.pos_count + 1),
        };

        let new_avail_index = self.avail_index + words;
        if new_avail_index + new_pos_count > self.buf.len() || index > MAX_HANDLE_INDEX {
            return None;
        }
        debug_assert!(self.avail_index <= MAX_OFFSET);

        self.set_cell(index, PosCell::new(self.avail_index, value_type));
        self.pos_count = new_pos_count;
        self.avail_index = new_avail_index;
        self.free_hint = index + 1;
        Some(index)
    }

    /// Allocate an object, collecting once if the heap is full.
    ///
    /// Values in `content` stay alive across that collection even when
    /// `roots` does not reach them.
    ///
    /// # Panics
    /// Panics if `content` does not match `kind` (values for cons cells and
    /// obj refs, bytes for byte refs), if a cons is not given exactly two
    /// slots, or if a subtype does not fit into a fixnum.
    pub fn try_allocate(
        &mut self,
        kind: ObjectKind,
        length: usize,
        content: Content<'_>,
        roots: &dyn RootSet,
    ) -> GcResult<Value> {
        check_request(kind, length, content);
        let words = kind.size_in_words(length);
        let value_type = kind.value_type();

        let index = match self.try_reserve(words, value_type) {
            Some(index) => index,
            None => {
                self.collect(&ProtectedRoots::new(roots, content.values()));
                self.try_reserve(words, value_type)
                    .ok_or(GcError::OutOfMemory {
                        requested: words + 1,
                        available: self.available_words(),
                    })?
            }
        };

        let offset = self.cell(index).offset();
        self.initialize(offset, kind, length, content);
        Ok(Value::from_handle(index, value_type))
    }

    /// Allocate an object; running out of heap after a collection aborts
    /// the process.
    pub fn allocate(
        &mut self,
        kind: ObjectKind,
        length: usize,
        content: Content<'_>,
        roots: &dyn RootSet,
    ) -> Value {
        match self.try_allocate(kind, length, content, roots) {
            Ok(value) => value,
            Err(e) => out_of_heap(e),
        }
    }

    /// Allocate a cons cell
    pub fn alloc_cons(&mut self, car: Value, cdr: Value, roots: &dyn RootSet) -> Value {
        self.allocate(ObjectKind::Cons, 2, Content::Values(&[car, cdr]), roots)
    }

    /// Allocate an obj ref holding `values`
    pub fn alloc_object(&mut self, subtype: u32, values: &[Value], roots: &dyn RootSet) -> Value {
        self.allocate(
            ObjectKind::Object(subtype),
            values.len(),
            Content::Values(values),
            roots,
        )
    }

    /// Allocate a byte ref holding `bytes`
    pub fn alloc_bytes(&mut self, subtype: u32, bytes: &[u8], roots: &dyn RootSet) -> Value {
        self.allocate(
            ObjectKind::Bytes(subtype),
            bytes.len(),
            Content::Bytes(bytes),
            roots,
        )
    }

    fn initialize(&mut self, offset: usize, kind: ObjectKind, length: usize, content: Content<'_>) {
        let body = match kind {
            ObjectKind::Cons => offset,
            ObjectKind::Object(subtype) | ObjectKind::Bytes(subtype) => {
                self.buf[offset] = Value::int_unchecked(subtype as i32).bits();
                self.buf[offset + 1] = Value::int_unchecked(length as i32).bits();
                offset + HEADER_WORDS
            }
        };
        let end = offset + kind.size_in_words(length);
        self.buf[body..end].fill(0);

        match content {
            Content::Empty => {}
            Content::Values(values) => {
                for (slot, value) in self.buf[body..end].iter_mut().zip(values) {
                    *slot = value.bits();
                }
            }
            Content::Bytes(bytes) => {
                words_as_bytes_mut(&mut self.buf[body..end])[..bytes.len()].copy_from_slice(bytes);
            }
        }
    }

    /// Position cell and its object offset for a live handle
    ///
    /// # Panics
    /// Panics on inline values and on handles whose cell is vacant.
    fn resolve(&self, value: Value) -> PosCell {
        let index = match value.handle_index() {
            Some(index) if index < self.pos_count => index,
            _ => panic!("{value:?} is not a live heap reference"),
        };
        let cell = self.cell(index);
        assert!(!cell.is_free(), "{value:?} refers to a vacant position");
        debug_assert_eq!(cell.value_type(), value.value_type());
        cell
    }

    /// Whether a value is a heap reference to an allocated object
    pub fn is_live(&self, value: Value) -> bool {
        match value.handle_index() {
            Some(index) if index < self.pos_count => !self.cell(index).is_free(),
            _ => false,
        }
    }

    fn header(&self, offset: usize) -> (u32, usize) {
        let subtype = Value::from_bits(self.buf[offset]).decode_int();
        let length = Value::from_bits(self.buf[offset + 1]).decode_int();
        (subtype as u32, length as usize)
    }

    /// Subtype of a heap object, `None` for inline values
    pub fn subtype(&self, value: Value) -> Option<u32> {
        match value.value_type() {
            ValueType::Inline => None,
            ValueType::Cons => Some(CONS_SUBTYPE),
            ValueType::ObjRef | ValueType::ByteRef => {
                Some(self.header(self.resolve(value).offset()).0)
            }
        }
    }

    /// Slot count (or byte count) of a heap object, `None` for inline values
    pub fn length(&self, value: Value) -> Option<usize> {
        match value.value_type() {
            ValueType::Inline => None,
            ValueType::Cons => Some(2),
            ValueType::ObjRef | ValueType::ByteRef => {
                Some(self.header(self.resolve(value).offset()).1)
            }
        }
    }

    fn slot_range(&self, value: Value) -> Option<(usize, usize)> {
        match value.value_type() {
            ValueType::Cons => {
                let offset = self.resolve(value).offset();
                Some((offset, offset + 2))
            }
            ValueType::ObjRef => {
                let offset = self.resolve(value).offset();
                let (_, length) = self.header(offset);
                Some((offset + HEADER_WORDS, offset + HEADER_WORDS + length))
            }
            _ => None,
        }
    }

    /// Value slots of a cons cell or obj ref; empty for anything else
    pub fn value_slots(&self, value: Value) -> &[Value] {
        match self.slot_range(value) {
            Some((start, end)) => words_as_values(&self.buf[start..end]),
            None => &[],
        }
    }

    /// Mutable value slots of a cons cell or obj ref; empty for anything else
    pub fn value_slots_mut(&mut self, value: Value) -> &mut [Value] {
        match self.slot_range(value) {
            Some((start, end)) => words_as_values_mut(&mut self.buf[start..end]),
            None => &mut [],
        }
    }

    fn byte_range(&self, value: Value) -> Option<(usize, usize, usize)> {
        if value.value_type() != ValueType::ByteRef {
            return None;
        }
        let offset = self.resolve(value).offset();
        let (_, length) = self.header(offset);
        let start = offset + HEADER_WORDS;
        Some((start, start + words_for_bytes(length), length))
    }

    /// Payload of a byte ref; empty for anything else
    pub fn byte_slice(&self, value: Value) -> &[u8] {
        match self.byte_range(value) {
            Some((start, end, length)) => &words_as_bytes(&self.buf[start..end])[..length],
            None => &[],
        }
    }

    /// Mutable payload of a byte ref; empty for anything else
    pub fn byte_slice_mut(&mut self, value: Value) -> &mut [u8] {
        match self.byte_range(value) {
            Some((start, end, length)) => {
                &mut words_as_bytes_mut(&mut self.buf[start..end])[..length]
            }
            None => &mut [],
        }
    }

    /// Size in words of the object a position cell points at
    pub(crate) fn object_size(&self, cell: PosCell) -> usize {
        let offset = cell.offset();
        match cell.value_type() {
            ValueType::Cons => 2,
            ValueType::ObjRef => ObjectKind::Object(0).size_in_words(self.header(offset).1),
            ValueType::ByteRef => ObjectKind::Bytes(0).size_in_words(self.header(offset).1),
            ValueType::Inline => corrupt_heap(offset),
        }
    }

    /// Current occupancy
    pub fn stats(&self) -> HeapStats {
        let total_memory = self.buf.len();
        let free_pos_count = (0..self.pos_count)
            .filter(|&i| self.cell(i).is_free())
            .count();
        let usable_memory = total_memory - self.pos_count - self.avail_index;
        HeapStats {
            total_memory,
            usable_memory,
            free_memory: usable_memory + free_pos_count,
            pos_count: self.pos_count,
            free_pos_count,
        }
    }

    /// Every allocated object in position-table order
    pub fn positions(&self) -> impl Iterator<Item = PositionInfo> + '_ {
        (0..self.pos_count).filter_map(move |index| {
            let cell = self.cell(index);
            if cell.is_free() {
                return None;
            }
            Some(PositionInfo {
                index,
                offset: cell.offset(),
                size: self.object_size(cell),
                value_type: cell.value_type(),
                marked: cell.is_marked(),
            })
        })
    }

    /// Position table and object words, one line per cell
    pub fn dump(&self) -> HeapDump<'_> {
        HeapDump { heap: self }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

/// Display adapter listing the position table
pub struct HeapDump<'a> {
    heap: &'a Heap,
}

impl fmt::Display for HeapDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heap = self.heap;
        writeln!(f, ";; Heap:")?;
        for index in 0..heap.pos_count {
            let cell = heap.cell(index);
            if cell.is_free() {
                writeln!(f, ";;   pos[{index}]=FREE")?;
                continue;
            }
            let offset = cell.offset();
            write!(
                f,
                ";;   pos[{index}]=0x{:08X} offset={offset} mark={} type={:?} |",
                cell.bits(),
                if cell.is_marked() { "yes" } else { "no" },
                cell.value_type()
            )?;
            let value = Value::from_handle(index, cell.value_type());
            match cell.value_type() {
                ValueType::ByteRef => {
                    let (subtype, length) = heap.header(offset);
                    write!(f, " bytes subtype={subtype} len={length} |")?;
                    for b in heap.byte_slice(value) {
                        write!(f, " {b:02X}")?;
                    }
                }
                ValueType::ObjRef => {
                    let (subtype, length) = heap.header(offset);
                    write!(f, " obj subtype={subtype} len={length} |")?;
                    for slot in heap.value_slots(value) {
                        write!(f, " {:X}", slot.bits())?;
                    }
                }
                _ => {
                    for slot in heap.value_slots(value) {
                        write!(f, " {:X}", slot.bits())?;
                    }
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn check_request(kind: ObjectKind, length: usize, content: Content<'_>) {
    match (kind, content) {
        (ObjectKind::Cons, Content::Values(values)) => {
            assert!(length == 2 && values.len() == 2, "cons cells have two slots")
        }
        (ObjectKind::Cons, Content::Empty) => assert_eq!(length, 2, "cons cells have two slots"),
        (ObjectKind::Object(_), Content::Values(values)) => {
            assert!(values.len() <= length, "more values than slots")
        }
        (ObjectKind::Bytes(_), Content::Bytes(bytes)) => {
            assert!(bytes.len() <= length, "more bytes than the payload holds")
        }
        (_, Content::Empty) => {}
        (kind, content) => panic!("{content:?} cannot initialize {kind:?}"),
    }
    if let ObjectKind::Object(subtype) | ObjectKind::Bytes(subtype) = kind {
        assert!(subtype <= MAX_INT as u32, "subtype {subtype} does not fit a fixnum");
    }
    assert!(length <= MAX_INT as usize, "object length {length} does not fit a fixnum");
}

fn out_of_heap(error: GcError) -> ! {
    #[cfg(feature = "gc_logging")]
    tracing::error!(target: "silc::gc", %error, "heap exhausted");
    eprintln!(";; Out of heap: {error}");
    std::process::abort()
}

pub(crate) fn corrupt_heap(offset: usize) -> ! {
    eprintln!(";; Internal error: unrecognized object type at offset {offset}");
    std::process::abort()
}

fn words_as_values(words: &[u32]) -> &[Value] {
    // SAFETY: Value is #[repr(transparent)] over u32 and every u32 is a valid Value
    unsafe { std::slice::from_raw_parts(words.as_ptr().cast::<Value>(), words.len()) }
}

fn words_as_values_mut(words: &mut [u32]) -> &mut [Value] {
    // SAFETY: Value is #[repr(transparent)] over u32 and every u32 is a valid Value
    unsafe { std::slice::from_raw_parts_mut(words.as_mut_ptr().cast::<Value>(), words.len()) }
}

fn words_as_bytes(words: &[u32]) -> &[u8] {
    // SAFETY: u8 has no alignment requirement and the byte length covers the same memory
    unsafe { std::slice::from_raw_parts(words.as_ptr().cast::<u8>(), std::mem::size_of_val(words)) }
}

fn words_as_bytes_mut(words: &mut [u32]) -> &mut [u8] {
    let len = std::mem::size_of_val(words);
    // SAFETY: u8 has no alignment requirement and the byte length covers the same memory
    unsafe { std::slice::from_raw_parts_mut(words.as_mut_ptr().cast::<u8>(), len) }
}
