//! Mark-compact garbage collector
//!
//! Marking walks an explicit worklist from the roots, setting the mark bit
//! in each reachable object's position cell. Compaction then scans the
//! position table from the highest index down: every unmarked object is
//! squeezed out of the object area, every live cell above it is shifted
//! down, and vacant cells at the top of the table are dropped.

use std::collections::VecDeque;
use std::time::Instant;

use crate::heap::{Heap, corrupt_heap};
use crate::object::{HEADER_WORDS, PosCell};
use crate::value::{Value, ValueType};

/// Anything that can enumerate the values a collection must keep alive
pub trait RootSet {
    /// Call `visitor` with every slice of root values
    fn visit_roots(&self, visitor: &mut dyn FnMut(&[Value]));
}

/// Empty root set
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRoots;

impl RootSet for NoRoots {
    fn visit_roots(&self, _visitor: &mut dyn FnMut(&[Value])) {}
}

impl RootSet for Vec<Value> {
    fn visit_roots(&self, visitor: &mut dyn FnMut(&[Value])) {
        visitor(self);
    }
}

impl<const N: usize> RootSet for [Value; N] {
    fn visit_roots(&self, visitor: &mut dyn FnMut(&[Value])) {
        visitor(self);
    }
}

/// Root set extended with values that are not yet stored anywhere
pub(crate) struct ProtectedRoots<'a> {
    base: &'a dyn RootSet,
    extra: &'a [Value],
}

impl<'a> ProtectedRoots<'a> {
    pub(crate) fn new(base: &'a dyn RootSet, extra: &'a [Value]) -> Self {
        Self { base, extra }
    }
}

impl RootSet for ProtectedRoots<'_> {
    fn visit_roots(&self, visitor: &mut dyn FnMut(&[Value])) {
        self.base.visit_roots(visitor);
        visitor(self.extra);
    }
}

/// GC statistics
#[derive(Debug, Default, Clone)]
pub struct GcStats {
    /// Number of collections
    pub collections: u64,
    /// Objects marked in last collection
    pub last_marked: usize,
    /// Objects reclaimed in last collection
    pub last_reclaimed_objects: usize,
    /// Words reclaimed in last collection
    pub last_reclaimed_words: usize,
    /// Total time spent in GC (nanoseconds)
    pub total_pause_ns: u64,
}

impl Heap {
    /// Run a full collection, keeping everything reachable from `roots`
    pub fn collect(&mut self, roots: &dyn RootSet) {
        let start = Instant::now();

        #[cfg(feature = "gc_logging")]
        tracing::debug!(
            target: "silc::gc",
            pos_count = self.pos_count,
            used_words = self.avail_index,
            "GC cycle starting"
        );

        let marked = self.mark(roots);
        let (reclaimed_objects, reclaimed_words) = self.compact();

        let elapsed = start.elapsed();
        self.stats.collections += 1;
        self.stats.last_marked = marked;
        self.stats.last_reclaimed_objects = reclaimed_objects;
        self.stats.last_reclaimed_words = reclaimed_words;
        self.stats.total_pause_ns += elapsed.as_nanos() as u64;

        #[cfg(feature = "gc_logging")]
        tracing::info!(
            target: "silc::gc",
            collection = self.stats.collections,
            live_objects = marked,
            freed_objects = reclaimed_objects,
            reclaimed_words,
            pause_us = elapsed.as_micros() as u64,
            "GC cycle complete"
        );
    }

    /// Set the mark bit of a cell if `value` refers to an unmarked object.
    /// Returns the cell index when it was newly marked.
    fn try_mark(&mut self, value: Value) -> Option<usize> {
        let index = value.handle_index()?;
        if index >= self.pos_count {
            debug_assert!(false, "root {value:?} is past the position table");
            return None;
        }
        let cell = self.cell(index);
        if cell.is_free() {
            debug_assert!(false, "root {value:?} refers to a vacant position");
            return None;
        }
        if cell.is_marked() {
            return None;
        }
        self.set_cell(index, cell.marked());
        Some(index)
    }

    /// Mark phase. Returns the number of objects marked.
    fn mark(&mut self, roots: &dyn RootSet) -> usize {
        let mut worklist = VecDeque::new();
        let mut marked = 0;

        roots.visit_roots(&mut |values| {
            for &value in values {
                if let Some(index) = self.try_mark(value) {
                    worklist.push_back(index);
                }
            }
        });
        marked += worklist.len();

        while let Some(index) = worklist.pop_front() {
            let cell = self.cell(index);
            let offset = cell.offset();
            let (start, end) = match cell.value_type() {
                ValueType::Cons => (offset, offset + 2),
                ValueType::ObjRef => {
                    let length = Value::from_bits(self.buf[offset + 1]).decode_int() as usize;
                    (offset + HEADER_WORDS, offset + HEADER_WORDS + length)
                }
                ValueType::ByteRef => continue,
                ValueType::Inline => corrupt_heap(offset),
            };
            for slot in start..end {
                let child = Value::from_bits(self.buf[slot]);
                if let Some(child_index) = self.try_mark(child) {
                    worklist.push_back(child_index);
                    marked += 1;
                }
            }
        }

        marked
    }

    /// Compaction phase. Returns reclaimed objects and words.
    fn compact(&mut self) -> (usize, usize) {
        let mut can_shrink = true;
        let mut reclaimed_objects = 0;
        let mut reclaimed_words = 0;

        for index in (0..self.pos_count).rev() {
            let cell = self.cell(index);

            if cell.is_free() {
                if can_shrink {
                    self.pos_count -= 1;
                }
                continue;
            }

            if cell.is_marked() {
                self.set_cell(index, cell.unmarked());
                can_shrink = false;
                continue;
            }

            let offset = cell.offset();
            let size = self.object_size(cell);

            self.set_cell(index, PosCell::FREE);
            if can_shrink {
                self.pos_count -= 1;
            }

            self.buf.copy_within(offset + size..self.avail_index, offset);
            for other in 0..self.pos_count {
                let moved = self.cell(other);
                if !moved.is_free() && moved.offset() > offset {
                    self.set_cell(other, moved.shifted_down(size));
                }
            }
            self.avail_index -= size;
            self.free_hint = self.free_hint.min(index);

            reclaimed_objects += 1;
            reclaimed_words += size;
        }

        self.free_hint = self.free_hint.min(self.pos_count);
        (reclaimed_objects, reclaimed_words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::GcConfig;

    fn int(v: i32) -> Value {
        Value::int(v).unwrap()
    }

    #[test]
    fn test_collect_empty_heap() {
        let mut heap = Heap::with_config(GcConfig { capacity_words: 32 });
        heap.collect(&NoRoots);
        assert_eq!(heap.stats().pos_count, 0);
        assert_eq!(heap.gc_stats().collections, 1);
    }

    #[test]
    fn test_unrooted_objects_are_reclaimed() {
        let mut heap = Heap::with_config(GcConfig { capacity_words: 64 });
        heap.alloc_cons(int(1), Value::NIL, &NoRoots);
        heap.alloc_cons(int(2), Value::NIL, &NoRoots);

        heap.collect(&NoRoots);

        let stats = heap.stats();
        assert_eq!(stats.pos_count, 0);
        assert_eq!(stats.usable_memory, 64);
        assert_eq!(heap.gc_stats().last_reclaimed_objects, 2);
        assert_eq!(heap.gc_stats().last_reclaimed_words, 4);
    }

    #[test]
    fn test_survivor_moves_down_keeping_handle() {
        let mut heap = Heap::with_config(GcConfig { capacity_words: 64 });
        heap.alloc_bytes(1000, b"garbage!", &NoRoots);
        let keep = heap.alloc_cons(int(7), Value::TRUE, &NoRoots);
        assert_eq!(heap.positions().nth(1).map(|p| p.offset), Some(4));

        heap.collect(&[keep]);

        assert!(heap.is_live(keep));
        assert_eq!(heap.value_slots(keep), &[int(7), Value::TRUE]);
        let info: Vec<_> = heap.positions().collect();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].offset, 0);
        assert!(!info[0].marked);

        // The vacated low cell is reused first.
        let next = heap.alloc_cons(Value::NIL, Value::NIL, &NoRoots);
        assert_eq!(next.handle_index(), Some(0));
    }

    #[test]
    fn test_cycles_are_traced() {
        let mut heap = Heap::with_config(GcConfig { capacity_words: 64 });
        let a = heap.alloc_cons(int(1), Value::NIL, &NoRoots);
        let b = heap.alloc_cons(int(2), a, &[a]);
        heap.value_slots_mut(a)[1] = b;

        heap.collect(&[a]);
        assert_eq!(heap.stats().live_objects(), 2);
        assert_eq!(heap.gc_stats().last_marked, 2);
    }

    #[test]
    fn test_allocation_collects_when_full() {
        // 12 words: each cons costs 3 with its cell, so four fit.
        let mut heap = Heap::with_config(GcConfig { capacity_words: 12 });
        for i in 0..10 {
            heap.alloc_cons(int(i), Value::NIL, &NoRoots);
        }
        assert!(heap.gc_stats().collections >= 2);
        assert!(heap.stats().pos_count <= 4);
    }

    #[test]
    fn test_content_survives_triggered_collection() {
        let mut heap = Heap::with_config(GcConfig { capacity_words: 12 });
        let first = heap.alloc_cons(int(1), Value::NIL, &NoRoots);
        let mut list = first;
        for i in 2..=3 {
            let roots = [list];
            list = heap.alloc_cons(int(i), list, &roots);
        }
        heap.alloc_cons(int(99), Value::NIL, &NoRoots);

        // Heap is full; the new cell's content keeps `list` alive.
        let head = heap.alloc_cons(int(4), list, &NoRoots);
        assert_eq!(heap.gc_stats().collections, 1);

        let mut seen = Vec::new();
        let mut cursor = head;
        while !cursor.is_nil() {
            let slots = heap.value_slots(cursor);
            seen.push(slots[0].as_int().unwrap());
            cursor = slots[1];
        }
        assert_eq!(seen, vec![4, 3, 2, 1]);
    }
}
