//! Tree-walking evaluator
//!
//! - A cons is an application: the head must evaluate to a function.
//! - A symbol evaluates to its current binding.
//! - Everything else evaluates to itself.
//!
//! Every step runs inside a [`Frame`], so the argument stack is back at
//! its entry height when the step returns, and nesting is bounded by the
//! configured depth.

use silc_gc::{Value, ValueType};

use crate::binding::BindingScope;
use crate::builtins::Builtin;
use crate::context::Context;
use crate::error::{SilcError, SilcResult};
use crate::object::function;
use crate::stack::{Args, Frame};

/// Decoded function object
#[derive(Debug, Clone, Copy)]
enum Callee {
    Builtin(Builtin),
    Lambda { params: Value, body: Value },
}

impl Context {
    /// Evaluate a form
    ///
    /// The form is kept rooted while it is evaluated.
    pub fn eval(&mut self, form: Value) -> SilcResult<Value> {
        let mut frame = Frame::enter(self)?;
        match form.value_type() {
            ValueType::Cons => {
                frame.stack.push(form)?;
                frame.apply(form)
            }
            ValueType::ObjRef if frame.is_symbol(form) => frame.symbol_binding(form),
            _ => Ok(form),
        }
    }

    fn callee(&self, f: Value) -> SilcResult<Callee> {
        if !self.is_function(f) {
            return Err(SilcError::NotAFunction);
        }
        let slots = self.heap.value_slots(f);
        let flags = slots[function::FLAGS_SLOT]
            .as_int()
            .ok_or(SilcError::Internal)?;
        if flags & function::BUILTIN != 0 {
            let index = slots[function::BODY_SLOT]
                .as_int()
                .ok_or(SilcError::Internal)?;
            return Builtin::from_index(index)
                .map(Callee::Builtin)
                .ok_or(SilcError::Internal);
        }
        Ok(Callee::Lambda {
            params: slots[function::PARAMS_SLOT],
            body: slots[function::BODY_SLOT],
        })
    }

    /// Apply the head of `form` to its arguments. `form` is rooted by the
    /// caller.
    fn apply(&mut self, form: Value) -> SilcResult<Value> {
        let f = self.eval(self.car(form))?;
        self.stack.push(f)?;
        let actuals = self.cdr(form);
        match self.callee(f)? {
            Callee::Builtin(builtin) => self.call_builtin(builtin, actuals),
            Callee::Lambda { params, body } => self.call_lambda(params, body, actuals),
        }
    }

    fn call_builtin(&mut self, builtin: Builtin, actuals: Value) -> SilcResult<Value> {
        let base = self.stack.len();
        let special = builtin.is_special();
        let mut rest = actuals;
        while rest.is_cons() {
            let arg = self.car(rest);
            let value = if special { arg } else { self.eval(arg)? };
            self.stack.push(value)?;
            rest = self.cdr(rest);
        }
        if !rest.is_nil() {
            return Err(SilcError::InvalidArgs);
        }
        let args = Args::new(base, self.stack.len() - base);
        builtin.call(self, args)
    }

    fn call_lambda(&mut self, params: Value, body: Value, actuals: Value) -> SilcResult<Value> {
        let mut scope = BindingScope::enter(self);
        let (mut param, mut actual) = (params, actuals);
        while param.is_cons() {
            let sym = scope.car(param);
            if !scope.is_symbol(sym) || !actual.is_cons() {
                return Err(SilcError::InvalidArgs);
            }
            let arg = scope.car(actual);
            let value = scope.eval(arg)?;
            scope.bind(sym, value)?;
            param = scope.cdr(param);
            actual = scope.cdr(actual);
        }
        if !param.is_nil() {
            return Err(SilcError::InvalidArgs);
        }
        scope.eval(body)
    }
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

    fn int(v: i32) -> Value {
        Value::int(v).unwrap()
    }

    #[test]
    fn test_atoms_evaluate_to_themselves() {
        let mut c = ctx();
        assert_eq!(c.eval(int(4)), Ok(int(4)));
        assert_eq!(c.eval(Value::NIL), Ok(Value::NIL));
        assert_eq!(c.eval(Value::TRUE), Ok(Value::TRUE));
        let s = c.str(b"text");
        assert_eq!(c.eval(s), Ok(s));
    }

    #[test]
    fn test_function_object_in_head_position() {
        let mut c = ctx();
        let inc = c.intern(b"inc");
        let f = c.symbol_binding(inc).unwrap();
        let args = c.cons(int(41), Value::NIL);
        let form = c.cons(f, args);
        assert_eq!(c.eval(form), Ok(int(42)));
        assert_eq!(c.stack_height(), 0);
    }

    #[test]
    fn test_lambda_with_extra_actuals_ignores_them() {
        let mut c = ctx();
        let v = c.eval_str("((lambda (x) x) 1 undefined-symbol)");
        assert_eq!(v, Ok(int(1)));
    }

    #[test]
    fn test_lambda_with_missing_actuals() {
        let mut c = ctx();
        assert_eq!(c.eval_str("((lambda (x y) x) 1)"), Err(SilcError::InvalidArgs));
        assert!(c.binding_chain().is_nil());
    }

    #[test]
    fn test_depth_limit() {
        let mut c = Context::with_config(ContextConfig {
            heap_words: 64 * 1024,
            max_eval_depth: 16,
            symbol_table_buckets: 31,
            ..ContextConfig::default()
        });
        let deep = "(inc ".repeat(20) + "0" + &")".repeat(20);
        assert_eq!(c.eval_str(&deep), Err(SilcError::StackOverflow));
        assert_eq!(c.stack_height(), 0);
        assert_eq!(c.eval_str("(inc (inc 0))"), Ok(int(2)));
    }
}
