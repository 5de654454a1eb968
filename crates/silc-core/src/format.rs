//! Printer
//!
//! [`Context::display`] renders a value in reader syntax where one exists
//! and as `#<...>` otherwise.

use std::fmt::{self, Write};

use silc_gc::{InlineSubtype, Value, ValueType};

use crate::context::Context;
use crate::error::SilcError;
use crate::object::subtype;

/// Nesting beyond which list elements print as `...`
const MAX_PRINT_DEPTH: usize = 256;

/// Display adapter returned by [`Context::display`]
pub struct Printed<'a> {
    ctx: &'a Context,
    value: Value,
}

impl Context {
    /// Printed form of a value
    pub fn display(&self, value: Value) -> Printed<'_> {
        Printed { ctx: self, value }
    }
}

impl fmt::Display for Printed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(self.ctx, self.value, f, 0)
    }
}

fn write_value(ctx: &Context, v: Value, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    match v.value_type() {
        ValueType::Inline => write_inline(v, f),
        ValueType::Cons => write_list(ctx, v, f, depth),
        ValueType::ObjRef => write_object(ctx, v, f),
        ValueType::ByteRef => match ctx.heap.subtype(v) {
            Some(subtype::STR) => write_str(ctx.heap.byte_slice(v), f),
            Some(subtype::BUFFER) => write!(f, "#<buffer:{}>", ctx.heap.byte_slice(v).len()),
            _ => write!(f, "#<unknown:{:X}>", v.bits()),
        },
    }
}

fn write_inline(v: Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match v.inline_subtype() {
        Some(InlineSubtype::Nil) => f.write_str("nil"),
        Some(InlineSubtype::Bool) => match v.as_bool() {
            Some(true) => f.write_str("true"),
            Some(false) => f.write_str("false"),
            None => write!(f, "#<unknown:{:X}>", v.bits()),
        },
        Some(InlineSubtype::Int) => write!(f, "{}", v.decode_int()),
        Some(InlineSubtype::Err) => match SilcError::from_value(v) {
            Some(e) => write!(f, "#<error {}: {e}>", e.code()),
            None => write!(f, "#<unknown:{:X}>", v.bits()),
        },
        None => write!(f, "#<unknown:{:X}>", v.bits()),
    }
}

fn write_list(ctx: &Context, list: Value, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    if depth >= MAX_PRINT_DEPTH {
        return f.write_str("(...)");
    }
    f.write_char('(')?;
    let mut cell = list;
    loop {
        write_value(ctx, ctx.car(cell), f, depth + 1)?;
        cell = ctx.cdr(cell);
        if cell.is_nil() {
            break;
        }
        if cell.is_cons() {
            f.write_char(' ')?;
            continue;
        }
        f.write_str(" . ")?;
        write_value(ctx, cell, f, depth + 1)?;
        break;
    }
    f.write_char(')')
}

fn write_object(ctx: &Context, v: Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match ctx.heap.subtype(v) {
        Some(subtype::SYMBOL) => match ctx.symbol_name(v) {
            Some(name) => f.write_str(&String::from_utf8_lossy(name)),
            None => write!(f, "#<unknown:{:X}>", v.bits()),
        },
        Some(subtype::FUNCTION) => match ctx.builtin_of(v) {
            Some(builtin) => write!(f, "#<builtin {}>", builtin.name()),
            None => f.write_str("#<lambda>"),
        },
        Some(subtype::HASH_TABLE) => {
            write!(f, "#<hash-table:{}>", ctx.hash_count(v).unwrap_or(0))
        }
        _ => write!(f, "#<unknown:{:X}>", v.bits()),
    }
}

fn write_str(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_char('"')?;
    for chunk in bytes.utf8_chunks() {
        for c in chunk.valid().chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                c => f.write_char(c)?,
            }
        }
        if !chunk.invalid().is_empty() {
            f.write_char(char::REPLACEMENT_CHARACTER)?;
        }
    }
    f.write_char('"')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextConfig;

    fn ctx() -> Context {
        Context::with_config(ContextConfig {
            heap_words: 64 * 1024,
            symbol_table_buckets: 31,
            ..ContextConfig::default()
        })
    }

    fn printed(c: &mut Context, src: &str) -> String {
        let v = crate::reader::Reader::new(src.as_bytes())
            .read(c)
            .unwrap()
            .unwrap();
        c.display(v).to_string()
    }

    #[test]
    fn test_print_atoms() {
        let c = ctx();
        assert_eq!(c.display(Value::NIL).to_string(), "nil");
        assert_eq!(c.display(Value::TRUE).to_string(), "true");
        assert_eq!(c.display(Value::FALSE).to_string(), "false");
        assert_eq!(c.display(Value::int(-12).unwrap()).to_string(), "-12");
        assert_eq!(
            c.display(SilcError::NotAFunction.to_value()).to_string(),
            "#<error 471: not a function>"
        );
    }

    #[test]
    fn test_print_round_trips_reader_syntax() {
        let mut c = ctx();
        for src in ["(1 2 3)", "(a (b c) d)", "foo-bar", r#""a \"q\"\n""#, "(nil true)"] {
            assert_eq!(printed(&mut c, src), src);
        }
    }

    #[test]
    fn test_print_dotted_pair() {
        let mut c = ctx();
        let one = Value::int(1).unwrap();
        let pair = c.cons(one, Value::int(2).unwrap());
        assert_eq!(c.display(pair).to_string(), "(1 . 2)");
    }

    #[test]
    fn test_print_functions_and_tables() {
        let mut c = ctx();
        assert_eq!(printed(&mut c, "car"), "car");
        let car = c.eval_str("car").unwrap();
        assert_eq!(c.display(car).to_string(), "#<builtin car>");
        let lambda = c.eval_str("(lambda (x) x)").unwrap();
        assert_eq!(c.display(lambda).to_string(), "#<lambda>");
        let table = c.eval_str("(make-hash-table)").unwrap();
        assert_eq!(c.display(table).to_string(), "#<hash-table:0>");
        let buffer = c.alloc_bytes(subtype::BUFFER, &[0; 16]);
        assert_eq!(c.display(buffer).to_string(), "#<buffer:16>");
    }
}
