//! Dynamic binding scopes
//!
//! Lambda application saves each parameter's previous binding as a
//! `(symbol . previous)` pair on the context's binding chain. The chain is
//! a GC root, so saved values stay alive while the body runs. Dropping the
//! scope writes the saved values back and unlinks the pairs, whether the
//! body returned a value or an error.
//!
//! Saved values are written back in the order they were recorded. A
//! parameter list naming the same symbol twice therefore leaves the
//! symbol holding the value bound by the first occurrence, not the value
//! from before the call.

use std::ops::{Deref, DerefMut};

use silc_gc::Value;
use smallvec::SmallVec;

use crate::context::Context;
use crate::error::SilcResult;

/// Bindings made by one lambda call
pub struct BindingScope<'a> {
    ctx: &'a mut Context,
    saved_chain: Value,
}

impl<'a> BindingScope<'a> {
    /// Open a scope on top of the current binding chain
    pub fn enter(ctx: &'a mut Context) -> Self {
        let saved_chain = ctx.bindings;
        Self { ctx, saved_chain }
    }

    /// Bind `sym` to `value` until the scope is dropped
    pub fn bind(&mut self, sym: Value, value: Value) -> SilcResult<()> {
        let ctx = &mut *self.ctx;
        let previous = ctx.set_binding(sym, value)?;
        let pair = ctx.cons(sym, previous);
        ctx.bindings = ctx.cons(pair, ctx.bindings);
        Ok(())
    }
}

impl Deref for BindingScope<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        self.ctx
    }
}

impl DerefMut for BindingScope<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        self.ctx
    }
}

impl Drop for BindingScope<'_> {
    fn drop(&mut self) {
        let ctx = &mut *self.ctx;
        let mut pairs: SmallVec<[Value; 8]> = SmallVec::new();
        let mut cell = ctx.bindings;
        while cell != self.saved_chain && cell.is_cons() {
            pairs.push(ctx.car(cell));
            cell = ctx.cdr(cell);
        }
        debug_assert_eq!(cell, self.saved_chain, "binding chain lost its base");

        // The chain is newest first; restore in recording order.
        for &pair in pairs.iter().rev() {
            let (sym, previous) = (ctx.car(pair), ctx.cdr(pair));
            let _ = ctx.set_binding(sym, previous);
        }
        ctx.bindings = self.saved_chain;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextConfig;
    use crate::error::SilcError;

    fn ctx() -> Context {
        Context::with_config(ContextConfig {
            heap_words: 16 * 1024,
            symbol_table_buckets: 31,
            ..ContextConfig::default()
        })
    }

    fn int(v: i32) -> Value {
        Value::int(v).unwrap()
    }

    #[test]
    fn test_scope_restores_previous_values() {
        let mut c = ctx();
        let a = c.intern(b"a");
        let b = c.intern(b"b");
        c.set_binding(a, int(1)).unwrap();

        {
            let mut scope = BindingScope::enter(&mut c);
            scope.bind(a, int(10)).unwrap();
            scope.bind(b, int(20)).unwrap();
            assert_eq!(scope.symbol_binding(a), Ok(int(10)));
            assert_eq!(scope.symbol_binding(b), Ok(int(20)));
            assert!(scope.binding_chain().is_cons());
        }

        assert_eq!(c.symbol_binding(a), Ok(int(1)));
        assert_eq!(c.symbol_binding(b), Err(SilcError::UnresolvedSymbol));
        assert!(c.binding_chain().is_nil());
    }

    #[test]
    fn test_nested_scopes_unwind_independently() {
        let mut c = ctx();
        let x = c.intern(b"x");
        c.set_binding(x, int(0)).unwrap();

        let mut outer = BindingScope::enter(&mut c);
        outer.bind(x, int(1)).unwrap();
        {
            let mut inner = BindingScope::enter(&mut outer);
            inner.bind(x, int(2)).unwrap();
            inner.gc();
            assert_eq!(inner.symbol_binding(x), Ok(int(2)));
        }
        assert_eq!(outer.symbol_binding(x), Ok(int(1)));
        drop(outer);
        assert_eq!(c.symbol_binding(x), Ok(int(0)));
    }

    #[test]
    fn test_repeated_symbol_keeps_first_binding() {
        let mut c = ctx();
        let a = c.intern(b"a");
        c.set_binding(a, int(5)).unwrap();
        {
            let mut scope = BindingScope::enter(&mut c);
            scope.bind(a, int(1)).unwrap();
            scope.bind(a, int(2)).unwrap();
        }
        assert_eq!(c.symbol_binding(a), Ok(int(1)));
    }

    #[test]
    fn test_non_symbol_is_rejected() {
        let mut c = ctx();
        let mut scope = BindingScope::enter(&mut c);
        assert_eq!(scope.bind(int(3), Value::NIL), Err(SilcError::InvalidArgs));
        assert!(scope.binding_chain().is_nil());
    }
}
