//! Object subtypes and accessors
//!
//! The heap only knows cons cells, obj refs and byte refs. The subtypes
//! below give those shapes their runtime meaning:
//!
//! | subtype | shape | slots |
//! |---|---|---|
//! | `SYMBOL` | obj ref | hash, name string, binding |
//! | `HASH_TABLE` | obj ref | count, bucket 0..N |
//! | `FUNCTION` | obj ref | flags, env, body or builtin index, params |
//! | `STR` | byte ref | bytes |
//! | `BUFFER` | byte ref | bytes |

use std::collections::HashSet;

use silc_gc::{Content, ObjectKind, Value, ValueType};

use crate::context::Context;

/// Subtype codes
pub mod subtype {
    /// Interned symbol
    pub const SYMBOL: u32 = 10;
    /// Chained hash table
    pub const HASH_TABLE: u32 = 20;
    /// Builtin or lambda
    pub const FUNCTION: u32 = 21;
    /// Byte string
    pub const STR: u32 = 1000;
    /// Raw byte area
    pub const BUFFER: u32 = 1001;
}

/// Function object layout
pub mod function {
    /// Native function from the builtin table
    pub const BUILTIN: i32 = 1;
    /// Receives its arguments unevaluated
    pub const SPECIAL: i32 = 2;

    pub(crate) const FLAGS_SLOT: usize = 0;
    pub(crate) const ENV_SLOT: usize = 1;
    pub(crate) const BODY_SLOT: usize = 2;
    pub(crate) const PARAMS_SLOT: usize = 3;
    pub(crate) const SLOT_COUNT: usize = 4;
}

impl Context {
    /// Allocate a cons cell
    pub fn cons(&mut self, car: Value, cdr: Value) -> Value {
        self.alloc(ObjectKind::Cons, 2, Content::Values(&[car, cdr]))
    }

    /// First slot of a cons cell, nil for anything else
    pub fn car(&self, cons: Value) -> Value {
        match cons.value_type() {
            ValueType::Cons => self.heap.value_slots(cons)[0],
            _ => Value::NIL,
        }
    }

    /// Second slot of a cons cell, nil for anything else
    pub fn cdr(&self, cons: Value) -> Value {
        match cons.value_type() {
            ValueType::Cons => self.heap.value_slots(cons)[1],
            _ => Value::NIL,
        }
    }

    /// Overwrite the car of a cons cell
    pub fn set_car(&mut self, cons: Value, value: Value) {
        debug_assert!(cons.is_cons());
        if let Some(slot) = self.heap.value_slots_mut(cons).first_mut() {
            *slot = value;
        }
    }

    /// Overwrite the cdr of a cons cell
    pub fn set_cdr(&mut self, cons: Value, value: Value) {
        debug_assert!(cons.is_cons());
        if let Some(slot) = self.heap.value_slots_mut(cons).get_mut(1) {
            *slot = value;
        }
    }

    /// Allocate a function object
    pub(crate) fn alloc_function(&mut self, flags: i32, env: Value, body: Value, params: Value) -> Value {
        let mut slots = [Value::NIL; function::SLOT_COUNT];
        slots[function::FLAGS_SLOT] = Value::int_unchecked(flags);
        slots[function::ENV_SLOT] = env;
        slots[function::BODY_SLOT] = body;
        slots[function::PARAMS_SLOT] = params;
        self.alloc_object(subtype::FUNCTION, &slots)
    }

    /// Allocate a string
    pub fn str(&mut self, bytes: &[u8]) -> Value {
        self.alloc_bytes(subtype::STR, bytes)
    }

    /// Bytes of a string, `None` for anything else
    pub fn str_bytes(&self, value: Value) -> Option<&[u8]> {
        (value.value_type() == ValueType::ByteRef && self.heap.subtype(value) == Some(subtype::STR))
            .then(|| self.heap.byte_slice(value))
    }

    /// Subtype of a heap object; cons cells report `CONS_SUBTYPE`
    pub fn ref_subtype(&self, value: Value) -> Option<u32> {
        self.heap.subtype(value)
    }

    pub(crate) fn has_subtype(&self, value: Value, expected: u32) -> bool {
        value.value_type() == ValueType::ObjRef && self.heap.subtype(value) == Some(expected)
    }

    /// Whether a value is an interned symbol
    pub fn is_symbol(&self, value: Value) -> bool {
        self.has_subtype(value, subtype::SYMBOL)
    }

    /// Whether a value is a builtin or lambda
    pub fn is_function(&self, value: Value) -> bool {
        self.has_subtype(value, subtype::FUNCTION)
    }

    /// Whether a value is a hash table
    pub fn is_hash_table(&self, value: Value) -> bool {
        self.has_subtype(value, subtype::HASH_TABLE)
    }

    /// Structural equality
    ///
    /// Identical words are equal. Cons cells compare car and cdr, obj refs
    /// compare subtype and every slot, byte refs compare subtype and bytes.
    /// Inline values and symbols are equal only when identical. A pair
    /// reached again while it is still being compared counts as equal, so
    /// cyclic structures terminate.
    pub fn eq(&self, lhs: Value, rhs: Value) -> bool {
        let mut pending = vec![(lhs, rhs)];
        let mut seen = HashSet::new();
        while let Some((a, b)) = pending.pop() {
            if a == b || !seen.insert((a, b)) {
                continue;
            }
            if a.value_type() != b.value_type() {
                return false;
            }
            match a.value_type() {
                ValueType::Inline => return false,
                ValueType::Cons => {
                    let (x, y) = (self.heap.value_slots(a), self.heap.value_slots(b));
                    pending.push((x[1], y[1]));
                    pending.push((x[0], y[0]));
                }
                ValueType::ObjRef => {
                    let kind = self.heap.subtype(a);
                    if kind != self.heap.subtype(b) || kind == Some(subtype::SYMBOL) {
                        return false;
                    }
                    let (x, y) = (self.heap.value_slots(a), self.heap.value_slots(b));
                    if x.len() != y.len() {
                        return false;
                    }
                    pending.extend(x.iter().copied().zip(y.iter().copied()).rev());
                }
                ValueType::ByteRef => {
                    if self.heap.subtype(a) != self.heap.subtype(b)
                        || self.heap.byte_slice(a) != self.heap.byte_slice(b)
                    {
                        return false;
                    }
                }
            }
        }
        true
    }
}
