//! GC integration tests
//!
//! Collections triggered from inside evaluation, with roots coming from
//! the argument stack, the symbol table and the binding chain.

use proptest::prelude::*;
use silc_core::{Context, ContextConfig, Value};

fn small_context(heap_words: usize) -> Context {
    Context::with_config(ContextConfig {
        heap_words,
        symbol_table_buckets: 31,
        ..ContextConfig::default()
    })
}

fn eval_printed(ctx: &mut Context, src: &str) -> String {
    let v = ctx.eval_str(src).unwrap();
    ctx.display(v).to_string()
}

// ============================================================================
// Rooting During Evaluation
// ============================================================================

#[test]
fn test_globals_survive_allocation_pressure() {
    let mut ctx = small_context(8 * 1024);
    ctx.eval_str("(define keep (cons 1 (cons 2 nil)))").unwrap();

    for _ in 0..500 {
        ctx.eval_str("(cons 1 (cons 2 (cons 3 nil)))").unwrap();
    }

    assert!(ctx.heap().gc_stats().collections > 0);
    assert_eq!(eval_printed(&mut ctx, "keep"), "(1 2)");
}

#[test]
fn test_evaluated_arguments_are_rooted() {
    let mut ctx = small_context(16 * 1024);
    assert_eq!(
        eval_printed(&mut ctx, "(cons (cons 1 2) (begin (gc) (cons 3 4)))"),
        "((1 . 2) 3 . 4)"
    );
    assert_eq!(ctx.stack_height(), 0);
}

#[test]
fn test_lambda_parameters_are_rooted() {
    let mut ctx = small_context(16 * 1024);
    ctx.eval_str("(define f (lambda (x) (gc) (cons x x)))").unwrap();
    assert_eq!(eval_printed(&mut ctx, "(f (cons 5 nil))"), "((5) 5)");
    assert!(ctx.binding_chain().is_nil());
}

#[test]
fn test_hash_table_contents_survive_collection() {
    let mut ctx = small_context(16 * 1024);
    ctx.eval_str(r#"(define h (make-hash-table 3))"#).unwrap();
    for i in 0..50 {
        ctx.eval_str(&format!(r#"(hash-put h {i} "value-{i}")"#))
            .unwrap();
    }
    ctx.gc();
    assert_eq!(eval_printed(&mut ctx, "(hash-get h 42)"), r#""value-42""#);
    assert_eq!(eval_printed(&mut ctx, "h"), "#<hash-table:50>");
}

// ============================================================================
// Symbol Table
// ============================================================================

#[test]
fn test_interning_is_stable_across_collections() {
    let mut ctx = small_context(16 * 1024);
    let before = ctx.symbol_count();
    let sym = ctx.intern(b"alpha");
    assert_eq!(ctx.symbol_count(), before + 1);

    for _ in 0..200 {
        ctx.eval_str("(cons 1 2)").unwrap();
    }
    ctx.gc();

    assert_eq!(ctx.intern(b"alpha"), sym);
    assert_eq!(ctx.symbol_count(), before + 1);
    assert_eq!(ctx.symbol_name(sym), Some(&b"alpha"[..]));
}

// ============================================================================
// Heap Statistics
// ============================================================================

#[test]
fn test_collection_is_idempotent() {
    let mut ctx = small_context(16 * 1024);
    ctx.eval_str("(define xs (cons 1 (cons 2 nil))) (cons 3 4) (cons 5 6)")
        .unwrap();

    ctx.gc();
    let first = ctx.heap_stats();
    ctx.gc();
    assert_eq!(ctx.heap_stats(), first);
}

#[test]
fn test_garbage_is_reclaimed() {
    let mut ctx = small_context(16 * 1024);
    ctx.gc();
    let baseline = ctx.heap_stats();

    ctx.eval_str("(cons 1 (cons 2 (cons 3 nil)))").unwrap();
    assert!(ctx.heap_stats().free_memory < baseline.free_memory);

    ctx.gc();
    let after = ctx.heap_stats();
    assert_eq!(after.live_objects(), baseline.live_objects());
    assert_eq!(after.free_memory, baseline.free_memory);
    assert!(ctx.heap().gc_stats().last_reclaimed_objects >= 3);
}

#[test]
fn test_heap_dump_lists_every_position() {
    let mut ctx = small_context(16 * 1024);
    ctx.gc();
    let stats = ctx.heap_stats();
    let dump = ctx.heap_dump().to_string();
    assert!(dump.starts_with(";; Heap:"));
    assert_eq!(dump.matches(";;   pos[").count(), stats.pos_count);
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    #[test]
    fn prop_addition_matches_host(a in -100_000i32..100_000, b in -100_000i32..100_000) {
        let mut ctx = small_context(16 * 1024);
        let v = ctx.eval_str(&format!("(+ {a} {b})")).unwrap();
        prop_assert_eq!(v, Value::int(a + b).unwrap());
    }

    #[test]
    fn prop_interning_returns_one_symbol_per_name(
        names in prop::collection::vec("[a-z][a-z0-9-]{0,20}", 1..40)
    ) {
        let mut ctx = small_context(16 * 1024);
        let first: Vec<Value> = names.iter().map(|n| ctx.intern(n.as_bytes())).collect();
        ctx.gc();
        for (name, sym) in names.iter().zip(&first) {
            prop_assert_eq!(ctx.intern(name.as_bytes()), *sym);
            prop_assert_eq!(ctx.symbol_name(*sym), Some(name.as_bytes()));
        }
    }
}
