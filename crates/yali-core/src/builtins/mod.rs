use tracing::debug;

use crate::ast::Value;
use crate::env::write_env;
use crate::error::YaliError;
use crate::eval::Interpreter;

mod errors;
mod math;
mod reflect;
mod seq;
mod types;

/// Binds a native procedure under `$name` in `$env`.
macro_rules! def_builtin {
    ($env:expr, $name:expr, $arity:expr, |$interp:tt, $args:tt| $body:expr) => {
        $env.define_builtin(
            $name,
            $crate::ast::Value::native(
                $name,
                $arity,
                move |$interp: &$crate::eval::Interpreter,
                      $args: &[$crate::ast::Value]|
                      -> Result<$crate::ast::Value, $crate::error::YaliError> { $body },
            ),
        );
    };
}

pub(crate) use def_builtin;

pub(crate) fn err<T>(msg: impl Into<String>) -> Result<T, YaliError> {
    Err(YaliError::type_mismatch(msg))
}

/// Integral index argument.
pub(crate) fn as_index(name: &str, value: &Value) -> Result<usize, YaliError> {
    match value {
        Value::Num(n) if n.fract() == 0.0 && *n >= 0.0 => Ok(*n as usize),
        other => err(format!(
            "{} expects a non-negative integer index, got {}",
            name, other
        )),
    }
}

pub(crate) fn install(interp: &Interpreter) -> Result<(), YaliError> {
    interp.register_core_impls()?;
    let mut env = write_env(interp.global());
    types::install(&mut env, interp.core());
    math::install(&mut env);
    seq::install(&mut env);
    errors::install(&mut env);
    reflect::install(&mut env);
    debug!("builtins installed");
    Ok(())
}
