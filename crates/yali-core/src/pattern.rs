use crate::ast::{List, Value};
use crate::env::{define, EnvRef};
use crate::error::YaliError;
use crate::eval::{is_splice_marker, spread_operand, Interpreter};
use crate::symbols::{is_splice, SpecialForm, LIST_SYM, MAP_SYM};

/// `Assert` binds or fails with an error (`let`, parameters, `catch`).
/// `Test` reports a mismatch as `false` (`match`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BindMode {
    Assert,
    Test,
}

impl Interpreter {
    pub(crate) fn bind_pattern(
        &self,
        pattern: &Value,
        value: Value,
        env: &EnvRef,
    ) -> Result<(), YaliError> {
        self.destructure(pattern, value, env, BindMode::Assert)
            .map(|_| ())
    }

    /// Tries `pattern` against `value`. Bindings made before a mismatch stay
    /// in `env`, so callers pass a scratch frame per attempt.
    pub(crate) fn match_pattern(
        &self,
        pattern: &Value,
        value: Value,
        env: &EnvRef,
    ) -> Result<bool, YaliError> {
        self.destructure(pattern, value, env, BindMode::Test)
    }

    /// Binds procedure parameters. Missing arguments bind nil.
    pub(crate) fn bind_sequence(
        &self,
        patterns: &[Value],
        values: Vec<Value>,
        env: &EnvRef,
    ) -> Result<(), YaliError> {
        self.destructure_sequence(patterns, values, env, BindMode::Assert)
            .map(|_| ())
    }

    fn destructure(
        &self,
        pattern: &Value,
        value: Value,
        env: &EnvRef,
        mode: BindMode,
    ) -> Result<bool, YaliError> {
        match pattern {
            Value::Symbol(_) if is_splice_marker(pattern) => Err(YaliError::control_flow(
                "... in a pattern must be followed by the pattern for the rest",
            )),
            Value::Symbol(sym) => {
                define(env, sym.clone(), value);
                Ok(true)
            }
            Value::List(list) if !list.is_empty() => self.destructure_form(list, value, env, mode),
            literal => {
                if self.values_equal(literal, &value)? {
                    Ok(true)
                } else {
                    mismatch(mode, || {
                        format!("Cannot bind value {} to pattern {}", value, literal)
                    })
                }
            }
        }
    }

    fn destructure_form(
        &self,
        list: &List,
        value: Value,
        env: &EnvRef,
        mode: BindMode,
    ) -> Result<bool, YaliError> {
        let head = list.head_symbol();
        let parts = list.operands();
        if head.is_some_and(is_splice) {
            return Err(YaliError::control_flow(
                "...rest may only appear inside a sequence pattern",
            ));
        }
        if head == Some(&*LIST_SYM) {
            return self.destructure_iterable(&parts, value, env, mode);
        }
        if head == Some(&*MAP_SYM) {
            return self.destructure_map(&parts, value, env, mode);
        }
        if head == Some(&SpecialForm::Quote.symbol()) {
            let literal = parts.first().cloned().unwrap_or(Value::Nil);
            if self.values_equal(&literal, &value)? {
                return Ok(true);
            }
            return mismatch(mode, || {
                format!("Cannot bind value {} to pattern '{}", value, literal)
            });
        }
        let head_form = list.head().cloned().unwrap_or(Value::Nil);
        let tag = match self.eval_value(&head_form, env)? {
            Value::Type(tag) => tag,
            other => {
                return Err(YaliError::type_mismatch(format!(
                    "Pattern head {} must be a type, got {}",
                    head_form, other
                )))
            }
        };
        if value.type_tag() != tag {
            return mismatch(mode, || {
                format!("Expected a {}, got {}", tag.name(), value)
            });
        }
        self.destructure_iterable(&parts, value, env, mode)
    }

    fn destructure_iterable(
        &self,
        patterns: &[Value],
        value: Value,
        env: &EnvRef,
        mode: BindMode,
    ) -> Result<bool, YaliError> {
        let values = match self.iterate(&value) {
            Ok(values) => values,
            Err(YaliError::TypeMismatch(_)) if mode == BindMode::Test => return Ok(false),
            Err(err) => return Err(err),
        };
        self.destructure_sequence(patterns, values, env, mode)
    }

    fn destructure_sequence(
        &self,
        patterns: &[Value],
        values: Vec<Value>,
        env: &EnvRef,
        mode: BindMode,
    ) -> Result<bool, YaliError> {
        let mut values = values.into_iter();
        let mut idx = 0;
        while idx < patterns.len() {
            let pattern = &patterns[idx];
            let rest_pattern = match spread_operand(pattern) {
                Some(inner) => Some(inner),
                None if is_splice_marker(pattern) => Some(patterns.get(idx + 1).ok_or_else(|| {
                    YaliError::control_flow(
                        "... in a pattern must be followed by the pattern for the rest",
                    )
                })?),
                None => None,
            };
            if let Some(rest_pattern) = rest_pattern {
                let rest = Value::list(values.by_ref());
                return self.destructure(rest_pattern, rest, env, mode);
            }
            let value = match values.next() {
                Some(value) => value,
                None if mode == BindMode::Test => return Ok(false),
                None => Value::Nil,
            };
            if !self.destructure(pattern, value, env, mode)? {
                return Ok(false);
            }
            idx += 1;
        }
        Ok(mode == BindMode::Assert || values.next().is_none())
    }

    /// Map patterns read each key with `get`, so they also pick list
    /// elements by index and record fields by name.
    fn destructure_map(
        &self,
        parts: &[Value],
        value: Value,
        env: &EnvRef,
        mode: BindMode,
    ) -> Result<bool, YaliError> {
        if parts.len() % 2 != 0 {
            return Err(YaliError::arity("Map patterns take key/pattern pairs"));
        }
        if mode == BindMode::Test && !matches!(value, Value::Map(_) | Value::Record(_)) {
            return Ok(false);
        }
        for pair in parts.chunks(2) {
            let key = self.eval_value(&pair[0], env)?;
            let entry = self.get(&value, &key)?;
            if !self.destructure(&pair[1], entry, env, mode)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn mismatch(mode: BindMode, message: impl FnOnce() -> String) -> Result<bool, YaliError> {
    match mode {
        BindMode::Test => Ok(false),
        BindMode::Assert => Err(YaliError::type_mismatch(message())),
    }
}
