//! Argument stack and evaluation frames
//!
//! The argument stack is fixed-size: pushing past its capacity is a
//! `StackOverflow` error, never a reallocation. Everything between the
//! bottom and the top is a GC root.

use std::ops::{Deref, DerefMut};

use silc_gc::Value;

use crate::context::Context;
use crate::error::{SilcError, SilcResult};

/// Fixed-capacity value stack
pub struct ArgStack {
    slots: Box<[Value]>,
    top: usize,
}

impl ArgStack {
    /// Create a stack holding at most `capacity` values
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Value::NIL; capacity].into_boxed_slice(),
            top: 0,
        }
    }

    /// Maximum number of values
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Current height
    pub fn len(&self) -> usize {
        self.top
    }

    /// Whether nothing is pushed
    pub fn is_empty(&self) -> bool {
        self.top == 0
    }

    /// Push a value, returning its slot index
    pub fn push(&mut self, value: Value) -> SilcResult<usize> {
        let slot = self.top;
        *self.slots.get_mut(slot).ok_or(SilcError::StackOverflow)? = value;
        self.top += 1;
        Ok(slot)
    }

    /// Value at `slot`
    pub fn get(&self, slot: usize) -> SilcResult<Value> {
        self.live().get(slot).copied().ok_or(SilcError::StackAccess)
    }

    /// Overwrite the value at `slot`
    pub fn set(&mut self, slot: usize, value: Value) -> SilcResult<()> {
        let top = self.top;
        *self.slots[..top]
            .get_mut(slot)
            .ok_or(SilcError::StackAccess)? = value;
        Ok(())
    }

    /// Drop everything above `height`
    pub fn truncate(&mut self, height: usize) {
        debug_assert!(height <= self.top);
        self.top = self.top.min(height);
    }

    /// Pushed values, bottom first
    pub fn live(&self) -> &[Value] {
        &self.slots[..self.top]
    }
}

/// Stack segment holding a builtin's arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Args {
    base: usize,
    len: usize,
}

impl Args {
    pub(crate) fn new(base: usize, len: usize) -> Self {
        Self { base, len }
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no arguments were passed
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stack slot of argument `index`
    pub fn slot(&self, index: usize) -> usize {
        self.base + index
    }
}

/// Scope of one evaluation step
///
/// Entering counts against the depth limit. Dropping the frame puts the
/// argument stack back to the height it had on entry, on success and on
/// error alike.
pub struct Frame<'a> {
    ctx: &'a mut Context,
    height: usize,
}

impl<'a> Frame<'a> {
    /// Enter a frame, failing with `StackOverflow` past the depth limit
    pub fn enter(ctx: &'a mut Context) -> SilcResult<Self> {
        if ctx.depth >= ctx.config.max_eval_depth {
            return Err(SilcError::StackOverflow);
        }
        ctx.depth += 1;
        let height = ctx.stack.len();
        Ok(Self { ctx, height })
    }
}

impl Deref for Frame<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        self.ctx
    }
}

impl DerefMut for Frame<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        self.ctx
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        self.ctx.stack.truncate(self.height);
        self.ctx.depth -= 1;
    }
}
