//! Runtime context
//!
//! The context owns the heap, the argument stack and the dynamic binding
//! chain. There is no global state: independent contexts never share a
//! heap and can live side by side.

use std::fmt;
use std::io::{self, Write};
use std::path::Path;

use silc_gc::{
    Content, GcConfig, GcResult, Heap, HeapDump, HeapStats, ObjectKind, RootSet, Value,
};

use crate::builtins::Builtin;
use crate::error::{SilcError, SilcResult};
use crate::object::function;
use crate::reader::Reader;
use crate::stack::ArgStack;

/// Default argument stack size in values
pub const DEFAULT_STACK_SIZE: usize = 1024;

/// Default limit on nested evaluation frames
pub const DEFAULT_MAX_EVAL_DEPTH: usize = 512;

/// Default symbol table bucket count (prime)
pub const DEFAULT_SYMBOL_BUCKETS: usize = 8179;

/// Context configuration
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Heap size in words
    pub heap_words: usize,
    /// Argument stack capacity in values
    pub stack_size: usize,
    /// Maximum nesting of evaluation frames
    pub max_eval_depth: usize,
    /// Bucket count of the symbol table
    pub symbol_table_buckets: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            heap_words: GcConfig::default().capacity_words,
            stack_size: DEFAULT_STACK_SIZE,
            max_eval_depth: DEFAULT_MAX_EVAL_DEPTH,
            symbol_table_buckets: DEFAULT_SYMBOL_BUCKETS,
        }
    }
}

/// Interpreter state
pub struct Context {
    pub(crate) heap: Heap,
    pub(crate) stack: ArgStack,
    /// `(symbol-table begin-function)`, rooted for the context's lifetime
    pub(crate) service: Value,
    pub(crate) symbols: Value,
    pub(crate) begin_fn: Value,
    /// Chain of `(symbol . previous-binding)` pairs of active lambda calls
    pub(crate) bindings: Value,
    /// Captured by `lambda`; nothing reads it yet
    pub(crate) env: Value,
    pub(crate) depth: usize,
    pub(crate) config: ContextConfig,
    exit_code: i32,
    out: Box<dyn Write>,
}

/// The three root arrays the collector sees
struct ContextRoots<'a> {
    stack: &'a [Value],
    service: [Value; 1],
    chain: [Value; 2],
}

impl RootSet for ContextRoots<'_> {
    fn visit_roots(&self, visitor: &mut dyn FnMut(&[Value])) {
        visitor(self.stack);
        visitor(&self.service);
        visitor(&self.chain);
    }
}

impl Context {
    /// Create a context with default settings
    pub fn new() -> Self {
        Self::with_config(ContextConfig::default())
    }

    /// Create a context, its symbol table and the builtin functions
    ///
    /// # Panics
    /// Panics if the heap size is out of range. A heap too small for the
    /// symbol table aborts like any other exhausted heap.
    pub fn with_config(config: ContextConfig) -> Self {
        assert!(config.symbol_table_buckets > 0, "symbol table needs buckets");
        let mut ctx = Self {
            heap: Heap::with_config(GcConfig {
                capacity_words: config.heap_words,
            }),
            stack: ArgStack::new(config.stack_size),
            service: Value::NIL,
            symbols: Value::NIL,
            begin_fn: Value::NIL,
            bindings: Value::NIL,
            env: Value::NIL,
            depth: 0,
            exit_code: 0,
            out: Box::new(io::stdout()),
            config,
        };

        let symbols = ctx.new_hash_table(ctx.config.symbol_table_buckets);
        ctx.service = ctx.cons(symbols, Value::NIL);
        ctx.symbols = symbols;

        for builtin in Builtin::ALL {
            let name = builtin.name().as_bytes();
            let sym = ctx.intern(name);
            let flags = if builtin.is_special() {
                function::BUILTIN | function::SPECIAL
            } else {
                function::BUILTIN
            };
            let index = Value::int_unchecked(builtin as i32);
            let f = ctx.alloc_function(flags, Value::NIL, index, Value::NIL);
            ctx.set_global(sym, f);
            if builtin == Builtin::Begin {
                ctx.begin_fn = f;
            }
        }
        let tail = ctx.cons(ctx.begin_fn, Value::NIL);
        ctx.set_cdr(ctx.service, tail);

        tracing::debug!(
            heap_words = ctx.config.heap_words,
            stack_capacity = ctx.stack.capacity(),
            builtins = Builtin::ALL.len(),
            "context created"
        );
        ctx
    }

    /// Configuration this context was created with
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    fn set_global(&mut self, sym: Value, value: Value) {
        self.heap.value_slots_mut(sym)[crate::symbol::BINDING_SLOT] = value;
    }

    /// Allocate through the heap with this context's roots
    pub(crate) fn alloc(&mut self, kind: ObjectKind, length: usize, content: Content<'_>) -> Value {
        let Context {
            heap,
            stack,
            service,
            bindings,
            env,
            ..
        } = self;
        let roots = ContextRoots {
            stack: stack.live(),
            service: [*service],
            chain: [*bindings, *env],
        };
        heap.allocate(kind, length, content, &roots)
    }

    /// Like `alloc`, but a heap still full after collecting is an error
    /// instead of fatal
    pub(crate) fn try_alloc(
        &mut self,
        kind: ObjectKind,
        length: usize,
        content: Content<'_>,
    ) -> GcResult<Value> {
        let Context {
            heap,
            stack,
            service,
            bindings,
            env,
            ..
        } = self;
        let roots = ContextRoots {
            stack: stack.live(),
            service: [*service],
            chain: [*bindings, *env],
        };
        heap.try_allocate(kind, length, content, &roots)
    }

    /// Allocate an obj ref holding `values`
    pub fn alloc_object(&mut self, subtype: u32, values: &[Value]) -> Value {
        self.alloc(ObjectKind::Object(subtype), values.len(), Content::Values(values))
    }

    /// Allocate a byte ref holding `bytes`
    pub fn alloc_bytes(&mut self, subtype: u32, bytes: &[u8]) -> Value {
        self.alloc(ObjectKind::Bytes(subtype), bytes.len(), Content::Bytes(bytes))
    }

    /// Run a full collection
    pub fn gc(&mut self) {
        let Context {
            heap,
            stack,
            service,
            bindings,
            env,
            ..
        } = self;
        heap.collect(&ContextRoots {
            stack: stack.live(),
            service: [*service],
            chain: [*bindings, *env],
        });
        let gc = self.heap.gc_stats();
        tracing::debug!(
            collections = gc.collections,
            reclaimed_objects = gc.last_reclaimed_objects,
            reclaimed_words = gc.last_reclaimed_words,
            "manual collection"
        );
    }

    /// The heap
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Heap occupancy
    pub fn heap_stats(&self) -> HeapStats {
        self.heap.stats()
    }

    /// Position table listing
    pub fn heap_dump(&self) -> HeapDump<'_> {
        self.heap.dump()
    }

    /// Current argument stack height
    pub fn stack_height(&self) -> usize {
        self.stack.len()
    }

    /// Head of the dynamic binding chain
    pub fn binding_chain(&self) -> Value {
        self.bindings
    }

    /// The symbol table
    pub fn symbol_table(&self) -> Value {
        self.symbols
    }

    /// The `begin` builtin, head of multi-form lambda bodies
    pub fn begin_function(&self) -> Value {
        self.begin_fn
    }

    /// Record the code the process should exit with
    pub fn set_exit_code(&mut self, code: i32) {
        self.exit_code = code;
    }

    /// Code recorded by `quit` (0 unless set)
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Replace the sink `print` writes to
    pub fn set_output(&mut self, out: Box<dyn Write>) {
        self.out = out;
    }

    pub(crate) fn write_line(&mut self, args: fmt::Arguments<'_>) -> SilcResult<()> {
        self.out
            .write_fmt(args)
            .and_then(|()| self.out.write_all(b"\n"))
            .map_err(|_| SilcError::Internal)
    }

    /// Read and evaluate every form in `src`, returning the last result
    /// (nil for empty input)
    pub fn eval_str(&mut self, src: &str) -> SilcResult<Value> {
        self.eval_bytes(src.as_bytes())
    }

    fn eval_bytes(&mut self, src: &[u8]) -> SilcResult<Value> {
        let mut reader = Reader::new(src);
        let mut last = Value::NIL;
        while let Some(form) = reader.read(self)? {
            last = self.eval(form)?;
        }
        Ok(last)
    }

    /// Read a file and evaluate every form in it
    pub fn load(&mut self, path: impl AsRef<Path>) -> SilcResult<Value> {
        let path = path.as_ref();
        let src = std::fs::read(path).map_err(|e| {
            tracing::debug!(path = %path.display(), error = %e, "cannot read source file");
            SilcError::LoadFailed
        })?;
        tracing::debug!(path = %path.display(), bytes = src.len(), "loading file");
        self.eval_bytes(&src)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Context {
        Context::with_config(ContextConfig {
            heap_words: 64 * 1024,
            symbol_table_buckets: 31,
            ..ContextConfig::default()
        })
    }

    #[test]
    fn test_builtins_are_bound() {
        let mut ctx = small();
        for builtin in Builtin::ALL {
            let sym = ctx.intern(builtin.name().as_bytes());
            let f = ctx.symbol_binding(sym).unwrap();
            assert_eq!(ctx.builtin_of(f), Some(builtin));
        }
        assert_eq!(ctx.stack_height(), 0);
    }

    #[test]
    fn test_service_roots_survive_collection() {
        let mut ctx = small();
        let before = ctx.heap_stats();
        ctx.gc();
        assert_eq!(ctx.heap_stats().live_objects(), before.live_objects());

        let sym = ctx.intern(b"begin");
        assert_eq!(ctx.symbol_binding(sym), Ok(ctx.begin_function()));
    }

    #[test]
    fn test_exit_code() {
        let mut ctx = small();
        assert_eq!(ctx.exit_code(), 0);
        ctx.set_exit_code(3);
        assert_eq!(ctx.exit_code(), 3);
    }
}
