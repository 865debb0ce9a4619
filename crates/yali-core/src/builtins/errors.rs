use std::sync::Arc;

use crate::ast::{ErrorValue, FnArity, Value};
use crate::builtins::{def_builtin, err};
use crate::env::Env;
use crate::error::YaliError;

fn expect_error<'a>(name: &str, value: &'a Value) -> Result<&'a ErrorValue, YaliError> {
    match value {
        Value::Error(error) => Ok(error.as_ref()),
        other => err(format!("{} expects an Error, got {}", name, other)),
    }
}

pub(crate) fn install(env: &mut Env) {
    def_builtin!(env, "error", FnArity::range(0, 3), |interp, args| {
        let message = match args.first() {
            Some(message) => interp.to_str(message)?,
            None => String::new(),
        };
        let data = args.get(1).cloned().unwrap_or(Value::Nil);
        let kind = match args.get(2) {
            Some(kind) => Some(interp.to_keyword(kind)?),
            None => None,
        };
        Ok(Value::Error(Arc::new(ErrorValue::new(&message, data, kind))))
    });
    def_builtin!(env, "get-message", FnArity::exact(1), |_, args| {
        Ok(Value::Str(expect_error("get-message", &args[0])?.message.clone()))
    });
    def_builtin!(env, "get-data", FnArity::exact(1), |_, args| {
        Ok(expect_error("get-data", &args[0])?.data.clone())
    });
    def_builtin!(env, "get-stack", FnArity::exact(1), |_, args| {
        Ok(expect_error("get-stack", &args[0])?
            .stack()
            .map(|frames| Value::from(frames.clone()))
            .unwrap_or_else(Value::empty_list))
    });
    def_builtin!(env, "error-kind", FnArity::exact(1), |_, args| {
        Ok(expect_error("error-kind", &args[0])?
            .kind
            .clone()
            .map(Value::Keyword)
            .unwrap_or(Value::Nil))
    });
    def_builtin!(env, "error?", FnArity::exact(1), |_, args| {
        Ok(Value::Bool(matches!(args[0], Value::Error(_))))
    });
}
