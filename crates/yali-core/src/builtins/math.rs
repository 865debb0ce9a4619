use std::cmp::Ordering;

use crate::ast::{FnArity, Value};
use crate::builtins::{def_builtin, err};
use crate::env::Env;
use crate::error::YaliError;
use crate::eval::Interpreter;

fn numbers(interp: &Interpreter, args: &[Value]) -> Result<Vec<f64>, YaliError> {
    args.iter().map(|arg| interp.to_num(arg)).collect()
}

fn fold(
    interp: &Interpreter,
    args: &[Value],
    unit: f64,
    unary: impl Fn(f64) -> f64,
    op: impl Fn(f64, f64) -> f64,
) -> Result<Value, YaliError> {
    let nums = numbers(interp, args)?;
    Ok(Value::Num(match nums.as_slice() {
        [] => unit,
        [single] => unary(*single),
        [first, rest @ ..] => rest.iter().fold(*first, |acc, n| op(acc, *n)),
    }))
}

fn compare(a: &Value, b: &Value, interp: &Interpreter) -> Result<Option<Ordering>, YaliError> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(Some(x.cmp(y))),
        _ => Ok(interp.to_num(a)?.partial_cmp(&interp.to_num(b)?)),
    }
}

/// True when every adjacent pair satisfies `accept`.
fn chain(
    interp: &Interpreter,
    args: &[Value],
    accept: impl Fn(Ordering) -> bool,
) -> Result<Value, YaliError> {
    for pair in args.windows(2) {
        match compare(&pair[0], &pair[1], interp)? {
            Some(ordering) if accept(ordering) => {}
            _ => return Ok(Value::Bool(false)),
        }
    }
    Ok(Value::Bool(true))
}

fn all_equal(interp: &Interpreter, args: &[Value]) -> Result<bool, YaliError> {
    let equals = &interp.core().equals;
    for pair in args.windows(2) {
        if !interp.dispatch_bool(equals, pair)? {
            return Ok(false);
        }
    }
    Ok(true)
}

pub(crate) fn install(env: &mut Env) {
    env.define_builtin("PI", Value::Num(std::f64::consts::PI));

    def_builtin!(env, "+", FnArity::at_least(0), |interp, args| {
        if let Some(Value::Str(_)) = args.first() {
            let mut out = String::new();
            for arg in args {
                out.push_str(&interp.to_str(arg)?);
            }
            return Ok(Value::from(out));
        }
        fold(interp, args, 0.0, |n| n, |a, b| a + b)
    });
    def_builtin!(env, "-", FnArity::at_least(0), |interp, args| {
        fold(interp, args, 0.0, |n| -n, |a, b| a - b)
    });
    def_builtin!(env, "*", FnArity::at_least(0), |interp, args| {
        fold(interp, args, 1.0, |n| n, |a, b| a * b)
    });
    def_builtin!(env, "/", FnArity::at_least(1), |interp, args| {
        fold(interp, args, 1.0, |n| 1.0 / n, |a, b| a / b)
    });
    def_builtin!(env, "%", FnArity::exact(2), |interp, args| {
        Ok(Value::Num(interp.to_num(&args[0])? % interp.to_num(&args[1])?))
    });
    def_builtin!(env, "**", FnArity::exact(2), |interp, args| {
        Ok(Value::Num(interp.to_num(&args[0])?.powf(interp.to_num(&args[1])?)))
    });
    def_builtin!(env, "floor", FnArity::exact(1), |interp, args| {
        Ok(Value::Num(interp.to_num(&args[0])?.floor()))
    });

    def_builtin!(env, "<", FnArity::at_least(1), |interp, args| {
        chain(interp, args, |o| o == Ordering::Less)
    });
    def_builtin!(env, "<=", FnArity::at_least(1), |interp, args| {
        chain(interp, args, |o| o != Ordering::Greater)
    });
    def_builtin!(env, ">", FnArity::at_least(1), |interp, args| {
        chain(interp, args, |o| o == Ordering::Greater)
    });
    def_builtin!(env, ">=", FnArity::at_least(1), |interp, args| {
        chain(interp, args, |o| o != Ordering::Less)
    });

    def_builtin!(env, "=", FnArity::at_least(1), |interp, args| {
        Ok(Value::Bool(all_equal(interp, args)?))
    });
    def_builtin!(env, "not=", FnArity::at_least(1), |interp, args| {
        Ok(Value::Bool(!all_equal(interp, args)?))
    });
    def_builtin!(env, "not", FnArity::exact(1), |interp, args| {
        Ok(Value::Bool(!interp.truthy(&args[0])?))
    });
    def_builtin!(env, "num?", FnArity::exact(1), |_, args| {
        Ok(Value::Bool(matches!(args[0], Value::Num(_))))
    });
    def_builtin!(env, "integer?", FnArity::exact(1), |_, args| match args[0] {
        Value::Num(n) => Ok(Value::Bool(n.is_finite() && n.fract() == 0.0)),
        _ => err("integer? expects a Num"),
    });
}
