//! Chained hash tables
//!
//! Layout `{count, bucket 0..N}`. Each bucket is a cons list. The symbol
//! table chains symbols directly; user tables chain `(key . value)` pairs
//! and compare keys with [`Context::eq`].

use silc_gc::{Content, MAX_INT, ObjectKind, Value, ValueType};

use crate::context::Context;
use crate::error::{SilcError, SilcResult};
use crate::object::subtype;
use crate::symbol::hash_bytes;

const COUNT_SLOT: usize = 0;
const FIRST_BUCKET: usize = 1;

/// Heap objects visited when hashing one key
const HASH_NODE_LIMIT: usize = 64;

/// Default bucket count of `make-hash-table`
pub const DEFAULT_BUCKETS: usize = 31;

impl Context {
    pub(crate) fn new_hash_table(&mut self, buckets: usize) -> Value {
        let buckets = buckets.max(1);
        let t = self.alloc(
            ObjectKind::Object(subtype::HASH_TABLE),
            buckets + FIRST_BUCKET,
            Content::Empty,
        );
        self.heap.value_slots_mut(t)[COUNT_SLOT] = Value::ZERO;
        t
    }

    /// Allocate an empty hash table with `buckets` chains
    pub fn make_hash_table(&mut self, buckets: usize) -> Value {
        self.new_hash_table(buckets)
    }

    /// Allocate a table for a runtime-supplied bucket count
    ///
    /// Counts whose object length would not fit a fixnum, or that do not fit
    /// the heap even after a collection, are `ValueOutOfRange`.
    pub fn try_make_hash_table(&mut self, buckets: usize) -> SilcResult<Value> {
        let length = buckets
            .max(1)
            .checked_add(FIRST_BUCKET)
            .filter(|&n| n <= MAX_INT as usize)
            .ok_or(SilcError::ValueOutOfRange)?;
        let t = self
            .try_alloc(ObjectKind::Object(subtype::HASH_TABLE), length, Content::Empty)
            .map_err(|_| SilcError::ValueOutOfRange)?;
        self.heap.value_slots_mut(t)[COUNT_SLOT] = Value::ZERO;
        Ok(t)
    }

    /// Slot of the bucket a hash falls into
    pub(crate) fn bucket_slot(&self, table: Value, hash: i32) -> usize {
        let buckets = self.heap.value_slots(table).len() - FIRST_BUCKET;
        FIRST_BUCKET + hash.unsigned_abs() as usize % buckets
    }

    pub(crate) fn bump_count(&mut self, table: Value) {
        let count = &mut self.heap.value_slots_mut(table)[COUNT_SLOT];
        *count = Value::int_unchecked(count.decode_int() + 1);
    }

    /// Number of entries, `None` for anything but a hash table
    pub fn hash_count(&self, table: Value) -> Option<usize> {
        self.is_hash_table(table)
            .then(|| self.heap.value_slots(table)[COUNT_SLOT].decode_int() as usize)
    }

    /// Hash consistent with [`Context::eq`]
    pub fn hash_code(&self, key: Value) -> i32 {
        let mut h: u32 = 17;
        let mut pending = vec![key];
        let mut visited = 0;
        while let Some(v) = pending.pop() {
            let part = match v.value_type() {
                ValueType::Inline => v.bits(),
                ValueType::ByteRef => hash_bytes(self.heap.byte_slice(v)) as u32,
                ValueType::ObjRef if self.is_symbol(v) => self.symbol_hash(v) as u32,
                ValueType::Cons | ValueType::ObjRef => {
                    visited += 1;
                    if visited <= HASH_NODE_LIMIT {
                        pending.extend(self.heap.value_slots(v).iter().rev());
                    }
                    self.heap.subtype(v).unwrap_or(0)
                }
            };
            h = h.wrapping_mul(31).wrapping_add(part);
        }
        (h % MAX_INT as u32) as i32
    }

    fn find_entry(&self, table: Value, bucket: usize, key: Value) -> Option<Value> {
        let mut cell = self.heap.value_slots(table)[bucket];
        while cell.is_cons() {
            let entry = self.car(cell);
            if self.eq(self.car(entry), key) {
                return Some(entry);
            }
            cell = self.cdr(cell);
        }
        None
    }

    /// Value stored under `key`
    ///
    /// # Panics
    /// Panics if `table` is not a hash table.
    pub fn hash_get(&self, table: Value, key: Value) -> Option<Value> {
        assert!(self.is_hash_table(table), "{table:?} is not a hash table");
        let bucket = self.bucket_slot(table, self.hash_code(key));
        self.find_entry(table, bucket, key).map(|entry| self.cdr(entry))
    }

    /// Store `value` under `key`, returning the value it replaced
    ///
    /// The table must be reachable from the roots; key and value need not be.
    ///
    /// # Panics
    /// Panics if `table` is not a hash table.
    pub fn hash_put(&mut self, table: Value, key: Value, value: Value) -> Option<Value> {
        assert!(self.is_hash_table(table), "{table:?} is not a hash table");
        let bucket = self.bucket_slot(table, self.hash_code(key));
        if let Some(entry) = self.find_entry(table, bucket, key) {
            let prev = self.cdr(entry);
            self.set_cdr(entry, value);
            return Some(prev);
        }

        let entry = self.cons(key, value);
        let head = self.heap.value_slots(table)[bucket];
        let cell = self.cons(entry, head);
        self.heap.value_slots_mut(table)[bucket] = cell;
        self.bump_count(table);
        None
    }
}
