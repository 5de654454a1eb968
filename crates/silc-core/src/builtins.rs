//! Builtin functions
//!
//! Each builtin is a variant of [`Builtin`]; its function object stores
//! the variant's index, and dispatch goes through a fixed table indexed by
//! it. Names are only used once, to bind each function to its symbol when
//! the context is created.

use silc_gc::{MAX_INT, Value};

use crate::context::Context;
use crate::error::{SilcError, SilcResult};
use crate::hash_table::DEFAULT_BUCKETS;
use crate::object::function;
use crate::stack::Args;

/// Native entry point
pub type BuiltinFn = fn(&mut Context, Args) -> SilcResult<Value>;

/// Builtin function identities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Builtin {
    /// `(define sym expr)`
    Define,
    /// `(lambda (params...) body...)`
    Lambda,
    /// `(begin forms...)`
    Begin,
    /// `(quit [code])`
    Quit,
    /// `(+ ints...)`
    Add,
    /// `(- int ints...)`
    Sub,
    /// `(* ints...)`
    Mul,
    /// `(/ int ints...)`
    Div,
    /// `(cons car cdr)`
    Cons,
    /// `(car cons)`
    Car,
    /// `(cdr cons)`
    Cdr,
    /// `(eq a b)`
    Eq,
    /// `(print value)`
    Print,
    /// `(inc int)`
    Inc,
    /// `(gc)`
    Gc,
    /// `(load path)`
    Load,
    /// `(make-hash-table [buckets])`
    MakeHashTable,
    /// `(hash-get table key [default])`
    HashGet,
    /// `(hash-put table key value)`
    HashPut,
}

struct Entry {
    name: &'static str,
    special: bool,
    call: BuiltinFn,
}

const TABLE: [Entry; Builtin::ALL.len()] = [
    Entry { name: "define", special: true, call: define },
    Entry { name: "lambda", special: true, call: lambda },
    Entry { name: "begin", special: false, call: begin },
    Entry { name: "quit", special: false, call: quit },
    Entry { name: "+", special: false, call: add },
    Entry { name: "-", special: false, call: sub },
    Entry { name: "*", special: false, call: mul },
    Entry { name: "/", special: false, call: div },
    Entry { name: "cons", special: false, call: cons },
    Entry { name: "car", special: false, call: car },
    Entry { name: "cdr", special: false, call: cdr },
    Entry { name: "eq", special: false, call: eq },
    Entry { name: "print", special: false, call: print },
    Entry { name: "inc", special: false, call: inc },
    Entry { name: "gc", special: false, call: gc },
    Entry { name: "load", special: false, call: load },
    Entry { name: "make-hash-table", special: false, call: make_hash_table },
    Entry { name: "hash-get", special: false, call: hash_get },
    Entry { name: "hash-put", special: false, call: hash_put },
];

impl Builtin {
    /// Every builtin, in table order
    pub const ALL: [Builtin; 19] = [
        Builtin::Define,
        Builtin::Lambda,
        Builtin::Begin,
        Builtin::Quit,
        Builtin::Add,
        Builtin::Sub,
        Builtin::Mul,
        Builtin::Div,
        Builtin::Cons,
        Builtin::Car,
        Builtin::Cdr,
        Builtin::Eq,
        Builtin::Print,
        Builtin::Inc,
        Builtin::Gc,
        Builtin::Load,
        Builtin::MakeHashTable,
        Builtin::HashGet,
        Builtin::HashPut,
    ];

    /// Builtin stored under `index`
    pub fn from_index(index: i32) -> Option<Builtin> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Builtin::ALL.get(i).copied())
    }

    fn entry(self) -> &'static Entry {
        &TABLE[self as usize]
    }

    /// Symbol the builtin is bound to
    pub fn name(self) -> &'static str {
        self.entry().name
    }

    /// Whether arguments are passed unevaluated
    pub fn is_special(self) -> bool {
        self.entry().special
    }

    /// Invoke with the arguments in `args`
    pub fn call(self, ctx: &mut Context, args: Args) -> SilcResult<Value> {
        (self.entry().call)(ctx, args)
    }
}

impl Context {
    /// Builtin behind a function object, `None` for lambdas and non-functions
    pub fn builtin_of(&self, f: Value) -> Option<Builtin> {
        if !self.is_function(f) {
            return None;
        }
        let slots = self.heap.value_slots(f);
        if slots[function::FLAGS_SLOT].as_int()? & function::BUILTIN == 0 {
            return None;
        }
        Builtin::from_index(slots[function::BODY_SLOT].as_int()?)
    }

    /// Argument `index` of a builtin call
    pub fn arg(&self, args: Args, index: usize) -> SilcResult<Value> {
        if index >= args.len() {
            return Err(SilcError::StackAccess);
        }
        self.stack.get(args.slot(index))
    }

    fn int_arg(&self, args: Args, index: usize) -> SilcResult<i64> {
        self.arg(args, index)?
            .as_int()
            .map(i64::from)
            .ok_or(SilcError::InvalidArgs)
    }
}

fn expect_len(args: Args, range: std::ops::RangeInclusive<usize>) -> SilcResult<()> {
    if range.contains(&args.len()) {
        Ok(())
    } else {
        Err(SilcError::InvalidArgs)
    }
}

fn to_int(v: i64) -> SilcResult<Value> {
    if v.unsigned_abs() > MAX_INT as u64 {
        return Err(SilcError::ValueOutOfRange);
    }
    Ok(Value::int(v as i32)?)
}

fn define(ctx: &mut Context, args: Args) -> SilcResult<Value> {
    expect_len(args, 2..=2)?;
    let sym = ctx.arg(args, 0)?;
    if !ctx.is_symbol(sym) {
        return Err(SilcError::InvalidArgs);
    }
    let value = ctx.eval(ctx.arg(args, 1)?)?;
    ctx.set_binding(sym, value)?;
    Ok(sym)
}

fn lambda(ctx: &mut Context, args: Args) -> SilcResult<Value> {
    expect_len(args, 2..=usize::MAX)?;
    let params = ctx.arg(args, 0)?;
    if !(params.is_nil() || params.is_cons()) {
        return Err(SilcError::InvalidArgs);
    }

    let body = if args.len() == 2 {
        ctx.arg(args, 1)?
    } else {
        let mut forms = Value::NIL;
        for i in (1..args.len()).rev() {
            forms = ctx.cons(ctx.arg(args, i)?, forms);
        }
        ctx.cons(ctx.begin_fn, forms)
    };

    let env = ctx.env;
    Ok(ctx.alloc_function(0, env, body, params))
}

fn begin(ctx: &mut Context, args: Args) -> SilcResult<Value> {
    match args.len() {
        0 => Ok(Value::NIL),
        n => ctx.arg(args, n - 1),
    }
}

fn quit(ctx: &mut Context, args: Args) -> SilcResult<Value> {
    expect_len(args, 0..=1)?;
    let code = if args.is_empty() {
        0
    } else {
        ctx.int_arg(args, 0)? as i32
    };
    ctx.set_exit_code(code);
    Err(SilcError::Quit)
}

fn fold_ints(
    ctx: &Context,
    args: Args,
    init: i64,
    op: fn(i64, i64) -> Option<i64>,
) -> SilcResult<Value> {
    let mut acc = init;
    for i in 0..args.len() {
        acc = op(acc, ctx.int_arg(args, i)?).ok_or(SilcError::ValueOutOfRange)?;
        if acc.unsigned_abs() > MAX_INT as u64 {
            return Err(SilcError::ValueOutOfRange);
        }
    }
    to_int(acc)
}

fn add(ctx: &mut Context, args: Args) -> SilcResult<Value> {
    fold_ints(ctx, args, 0, i64::checked_add)
}

fn mul(ctx: &mut Context, args: Args) -> SilcResult<Value> {
    fold_ints(ctx, args, 1, i64::checked_mul)
}

fn sub(ctx: &mut Context, args: Args) -> SilcResult<Value> {
    match args.len() {
        0 => Ok(Value::ZERO),
        1 => to_int(-ctx.int_arg(args, 0)?),
        _ => {
            let mut acc = ctx.int_arg(args, 0)?;
            for i in 1..args.len() {
                acc -= ctx.int_arg(args, i)?;
                if acc.unsigned_abs() > MAX_INT as u64 {
                    return Err(SilcError::ValueOutOfRange);
                }
            }
            to_int(acc)
        }
    }
}

fn div(ctx: &mut Context, args: Args) -> SilcResult<Value> {
    expect_len(args, 1..=usize::MAX)?;
    let (mut acc, rest) = if args.len() == 1 {
        (1, 0)
    } else {
        (ctx.int_arg(args, 0)?, 1)
    };
    for i in rest..args.len() {
        let divisor = ctx.int_arg(args, i)?;
        if divisor == 0 {
            return Err(SilcError::InvalidArgs);
        }
        acc /= divisor;
    }
    to_int(acc)
}

fn cons(ctx: &mut Context, args: Args) -> SilcResult<Value> {
    expect_len(args, 2..=2)?;
    let (car, cdr) = (ctx.arg(args, 0)?, ctx.arg(args, 1)?);
    Ok(ctx.cons(car, cdr))
}

fn car(ctx: &mut Context, args: Args) -> SilcResult<Value> {
    expect_len(args, 1..=1)?;
    Ok(ctx.car(ctx.arg(args, 0)?))
}

fn cdr(ctx: &mut Context, args: Args) -> SilcResult<Value> {
    expect_len(args, 1..=1)?;
    Ok(ctx.cdr(ctx.arg(args, 0)?))
}

fn eq(ctx: &mut Context, args: Args) -> SilcResult<Value> {
    expect_len(args, 2..=2)?;
    let (a, b) = (ctx.arg(args, 0)?, ctx.arg(args, 1)?);
    Ok(Value::bool(ctx.eq(a, b)))
}

fn print(ctx: &mut Context, args: Args) -> SilcResult<Value> {
    expect_len(args, 1..=1)?;
    let value = ctx.arg(args, 0)?;
    let text = ctx.display(value).to_string();
    ctx.write_line(format_args!("{text}"))?;
    Ok(Value::NIL)
}

fn inc(ctx: &mut Context, args: Args) -> SilcResult<Value> {
    expect_len(args, 1..=1)?;
    to_int(ctx.int_arg(args, 0)? + 1)
}

fn gc(ctx: &mut Context, args: Args) -> SilcResult<Value> {
    expect_len(args, 0..=0)?;
    ctx.gc();
    Ok(Value::NIL)
}

fn load(ctx: &mut Context, args: Args) -> SilcResult<Value> {
    expect_len(args, 1..=1)?;
    let path = ctx.arg(args, 0)?;
    let path = ctx
        .str_bytes(path)
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
        .map(std::path::PathBuf::from)
        .ok_or(SilcError::InvalidArgs)?;
    ctx.load(path)
}

fn make_hash_table(ctx: &mut Context, args: Args) -> SilcResult<Value> {
    expect_len(args, 0..=1)?;
    let buckets = if args.is_empty() {
        DEFAULT_BUCKETS
    } else {
        match ctx.int_arg(args, 0)? {
            n if n > 0 => n as usize,
            _ => return Err(SilcError::InvalidArgs),
        }
    };
    ctx.try_make_hash_table(buckets)
}

fn hash_get(ctx: &mut Context, args: Args) -> SilcResult<Value> {
    expect_len(args, 2..=3)?;
    let (table, key) = (ctx.arg(args, 0)?, ctx.arg(args, 1)?);
    if !ctx.is_hash_table(table) {
        return Err(SilcError::InvalidArgs);
    }
    match ctx.hash_get(table, key) {
        Some(value) => Ok(value),
        None if args.len() == 3 => ctx.arg(args, 2),
        None => Ok(Value::NIL),
    }
}

fn hash_put(ctx: &mut Context, args: Args) -> SilcResult<Value> {
    expect_len(args, 3..=3)?;
    let (table, key, value) = (ctx.arg(args, 0)?, ctx.arg(args, 1)?, ctx.arg(args, 2)?);
    if !ctx.is_hash_table(table) {
        return Err(SilcError::InvalidArgs);
    }
    Ok(ctx.hash_put(table, key, value).unwrap_or(Value::NIL))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_enum() {
        for (i, builtin) in Builtin::ALL.iter().enumerate() {
            assert_eq!(*builtin as usize, i);
            assert_eq!(Builtin::from_index(i as i32), Some(*builtin));
        }
        assert_eq!(Builtin::from_index(-1), None);
        assert_eq!(Builtin::from_index(Builtin::ALL.len() as i32), None);
    }

    #[test]
    fn test_only_define_and_lambda_are_special() {
        let special: Vec<_> = Builtin::ALL
            .iter()
            .filter(|b| b.is_special())
            .map(|b| b.name())
            .collect();
        assert_eq!(special, ["define", "lambda"]);
    }

    #[test]
    fn test_to_int_bounds() {
        assert_eq!(to_int(MAX_INT as i64), Ok(Value::int(MAX_INT).unwrap()));
        assert_eq!(to_int(MAX_INT as i64 + 1), Err(SilcError::ValueOutOfRange));
        assert_eq!(to_int(-(MAX_INT as i64) - 1), Err(SilcError::ValueOutOfRange));
    }
}
