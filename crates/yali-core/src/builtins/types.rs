use crate::ast::{FnArity, TypeTag, Value};
use crate::builtins::{def_builtin, err};
use crate::env::Env;
use crate::types::CoreInterfaces;

pub(crate) fn install(env: &mut Env, core: &CoreInterfaces) {
    for tag in TypeTag::BUILTIN {
        env.define_builtin(tag.name(), Value::Type(tag.clone()));
    }
    for iface in core.all() {
        env.define_builtin(iface.name().name(), Value::Interface(iface.clone()));
    }

    def_builtin!(env, "type-of", FnArity::exact(1), |_, args| {
        Ok(Value::Type(args[0].type_tag()))
    });
    def_builtin!(env, "type-name", FnArity::exact(1), |_, args| match &args[0] {
        Value::Type(tag) => Ok(Value::str(tag.name())),
        other => err(format!("Cannot find type-name of non type: {}!", other)),
    });
    def_builtin!(env, "assert-type", FnArity::exact(2), |_, args| {
        let Value::Type(expected) = &args[0] else {
            return err(format!("assert-type expects a type, got {}", args[0]));
        };
        if args[1].type_tag() == *expected {
            Ok(args[1].clone())
        } else {
            err(format!(
                "Expected type: {}, but received: {}!",
                expected.name(),
                args[1]
            ))
        }
    });
    def_builtin!(env, "impl?", FnArity::at_least(1), |_, args| {
        let Value::Interface(iface) = &args[0] else {
            return err(format!("impl? expects an interface, got {}", args[0]));
        };
        let mut key = Vec::with_capacity(args.len() - 1);
        for arg in &args[1..] {
            match arg {
                Value::Type(tag) => key.push(tag.clone()),
                other => return err(format!("impl? expects types, got {}", other)),
            }
        }
        Ok(Value::Bool(iface.lookup_exact(&key).is_some()))
    });
    def_builtin!(env, "interface-name", FnArity::exact(1), |_, args| match &args[0] {
        Value::Interface(iface) => Ok(Value::str(iface.name().name())),
        other => err(format!("interface-name expects an interface, got {}", other)),
    });
    def_builtin!(env, "interface-signature", FnArity::exact(1), |_, args| {
        match &args[0] {
            Value::Interface(iface) => Ok(Value::list(
                std::iter::once(Value::Symbol(iface.name().clone()))
                    .chain(iface.params().iter().cloned().map(Value::Symbol)),
            )),
            other => err(format!(
                "interface-signature expects an interface, got {}",
                other
            )),
        }
    });
}
