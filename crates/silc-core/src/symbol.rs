//! Symbol interning and dynamic bindings
//!
//! A symbol is `{hash, name, binding}`. The binding slot is the variable:
//! reading a symbol returns it, lambda application overwrites it and puts
//! the old value back on exit. A fresh symbol is bound to the
//! `UnresolvedSymbol` error value.

use silc_gc::{MAX_INT, Value};

use crate::context::Context;
use crate::error::{SilcError, SilcResult};
use crate::object::subtype;

pub(crate) const HASH_SLOT: usize = 0;
pub(crate) const NAME_SLOT: usize = 1;
pub(crate) const BINDING_SLOT: usize = 2;

/// Longest symbol name the reader accepts
pub const MAX_SYMBOL_LEN: usize = 256;

/// String hash shared by symbols and string keys
pub fn hash_bytes(bytes: &[u8]) -> i32 {
    let h = bytes
        .iter()
        .fold(0u32, |h, &b| h.wrapping_mul(31).wrapping_add(u32::from(b)));
    (h % MAX_INT as u32) as i32
}

impl Context {
    /// Symbol named `name`, created on first use
    ///
    /// Interning the same bytes twice yields the identical handle.
    pub fn intern(&mut self, name: &[u8]) -> Value {
        let hash = hash_bytes(name);
        let hash_value = Value::int_unchecked(hash);
        let table = self.symbols;
        let bucket = self.bucket_slot(table, hash);

        let mut cell = self.heap.value_slots(table)[bucket];
        while cell.is_cons() {
            let sym = self.car(cell);
            let slots = self.heap.value_slots(sym);
            if slots[HASH_SLOT] == hash_value && self.heap.byte_slice(slots[NAME_SLOT]) == name {
                return sym;
            }
            cell = self.cdr(cell);
        }

        let name_str = self.str(name);
        let sym = self.alloc_object(
            subtype::SYMBOL,
            &[hash_value, name_str, SilcError::UnresolvedSymbol.to_value()],
        );
        let head = self.heap.value_slots(table)[bucket];
        let entry = self.cons(sym, head);
        self.heap.value_slots_mut(table)[bucket] = entry;
        self.bump_count(table);
        sym
    }

    /// Current binding of a symbol
    ///
    /// An unbound symbol fails with `UnresolvedSymbol`; a non-symbol with
    /// `InvalidArgs`.
    pub fn symbol_binding(&self, sym: Value) -> SilcResult<Value> {
        if !self.is_symbol(sym) {
            return Err(SilcError::InvalidArgs);
        }
        let binding = self.heap.value_slots(sym)[BINDING_SLOT];
        match SilcError::from_value(binding) {
            Some(e) => Err(e),
            None => Ok(binding),
        }
    }

    /// Overwrite a symbol's binding, returning the previous one
    /// (possibly the unresolved marker)
    pub fn set_binding(&mut self, sym: Value, value: Value) -> SilcResult<Value> {
        if !self.is_symbol(sym) {
            return Err(SilcError::InvalidArgs);
        }
        let slot = &mut self.heap.value_slots_mut(sym)[BINDING_SLOT];
        Ok(std::mem::replace(slot, value))
    }

    /// Name of a symbol, `None` for anything else
    pub fn symbol_name(&self, sym: Value) -> Option<&[u8]> {
        if !self.is_symbol(sym) {
            return None;
        }
        self.str_bytes(self.heap.value_slots(sym)[NAME_SLOT])
    }

    /// Stored hash of a symbol
    pub(crate) fn symbol_hash(&self, sym: Value) -> i32 {
        self.heap.value_slots(sym)[HASH_SLOT].decode_int()
    }

    /// Number of interned symbols
    pub fn symbol_count(&self) -> usize {
        self.hash_count(self.symbols).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextConfig;

    fn ctx() -> Context {
        Context::with_config(ContextConfig {
            heap_words: 16 * 1024,
            symbol_table_buckets: 7,
            ..ContextConfig::default()
        })
    }

    #[test]
    fn test_hash_is_bounded() {
        assert_eq!(hash_bytes(b""), 0);
        assert_eq!(hash_bytes(b"a"), 97);
        assert_eq!(hash_bytes(b"ab"), 97 * 31 + 98);
        let long = [0xffu8; 300];
        assert!((0..MAX_INT).contains(&hash_bytes(&long)));
    }

    #[test]
    fn test_intern_is_identity_preserving() {
        let mut c = ctx();
        let before = c.symbol_count();
        let a = c.intern(b"some-name");
        let b = c.intern(b"some-name");
        let other = c.intern(b"other-name");
        assert_eq!(a, b);
        assert_ne!(a, other);
        assert_eq!(c.symbol_count(), before + 2);
        assert_eq!(c.symbol_name(a), Some(&b"some-name"[..]));
    }

    #[test]
    fn test_fresh_symbol_is_unresolved() {
        let mut c = ctx();
        let sym = c.intern(b"nothing-here");
        assert_eq!(c.symbol_binding(sym), Err(SilcError::UnresolvedSymbol));

        let prev = c.set_binding(sym, Value::TRUE).unwrap();
        assert_eq!(prev, SilcError::UnresolvedSymbol.to_value());
        assert_eq!(c.symbol_binding(sym), Ok(Value::TRUE));
    }

    #[test]
    fn test_binding_requires_symbol() {
        let mut c = ctx();
        assert_eq!(c.symbol_binding(Value::ZERO), Err(SilcError::InvalidArgs));
        assert_eq!(c.set_binding(Value::NIL, Value::TRUE), Err(SilcError::InvalidArgs));
        assert_eq!(c.symbol_name(Value::TRUE), None);
    }

    #[test]
    fn test_symbols_survive_collection() {
        let mut c = ctx();
        let sym = c.intern(b"kept");
        c.set_binding(sym, Value::int(42).unwrap()).unwrap();
        for _ in 0..100 {
            c.cons(Value::TRUE, Value::NIL);
        }
        c.gc();
        assert_eq!(c.intern(b"kept"), sym);
        assert_eq!(c.symbol_binding(sym), Ok(Value::int(42).unwrap()));
    }
}
