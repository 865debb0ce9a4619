use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::ast::{TypeTag, Value};
use crate::error::YaliError;
use crate::symbols::Symbol;

/// Hook run by the host after an implementation is registered.
pub type NativeHook = fn(&[TypeTag], &Value);

#[derive(Clone)]
pub enum OnDefine {
    Native(NativeHook),
    Proc(Value),
}

/// A named open generic function dispatched on the exact type tags of its
/// leading arguments. There is no subtype search: a key either has an
/// implementation, or the default applies, or dispatch fails.
pub struct Interface {
    name: Symbol,
    params: Vec<Symbol>,
    impls: RwLock<HashMap<Vec<TypeTag>, Value>>,
    default: Option<Value>,
    on_define: Option<OnDefine>,
}

impl Interface {
    pub fn new(
        name: Symbol,
        params: Vec<Symbol>,
        default: Option<Value>,
        on_define: Option<OnDefine>,
    ) -> Self {
        Self {
            name,
            params,
            impls: RwLock::new(HashMap::new()),
            default,
            on_define,
        }
    }

    pub fn name(&self) -> &Symbol {
        &self.name
    }

    pub fn params(&self) -> &[Symbol] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn default_impl(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn on_define(&self) -> Option<&OnDefine> {
        self.on_define.as_ref()
    }

    pub fn lookup_exact(&self, key: &[TypeTag]) -> Option<Value> {
        self.impls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Exact implementation for `key`, else the default.
    pub fn implementation(&self, key: &[TypeTag]) -> Option<Value> {
        self.lookup_exact(key).or_else(|| self.default.clone())
    }

    pub fn dispatch_key(&self, args: &[Value]) -> Result<Vec<TypeTag>, YaliError> {
        if args.len() < self.arity() {
            return Err(YaliError::arity(format!(
                "{} dispatches on {} argument(s) {}, got {}",
                self.name,
                self.arity(),
                self.signature(),
                args.len()
            )));
        }
        Ok(args[..self.arity()].iter().map(Value::type_tag).collect())
    }

    /// Registers `imp` under `key`, replacing an earlier implementation for
    /// the same key.
    pub fn register(&self, key: Vec<TypeTag>, imp: Value) -> Result<(), YaliError> {
        if key.len() != self.arity() {
            return Err(YaliError::arity(format!(
                "Cannot define {} as it does not conform to the signature {}",
                describe_key(&self.name, &key),
                self.signature()
            )));
        }
        debug!(
            interface = %self.name,
            key = %describe_key(&self.name, &key),
            "registered implementation"
        );
        self.impls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, imp);
        Ok(())
    }

    pub fn implemented_keys(&self) -> Vec<Vec<TypeTag>> {
        let mut keys: Vec<Vec<TypeTag>> = self
            .impls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort_by_key(|key| describe_key(&self.name, key));
        keys
    }

    /// `(name a b)`
    pub fn signature(&self) -> String {
        let mut out = format!("({}", self.name);
        for param in &self.params {
            out.push(' ');
            out.push_str(param.name());
        }
        out.push(')');
        out
    }

    pub fn not_implemented(&self, key: &[TypeTag], args: &[Value]) -> YaliError {
        let printed: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        let mut message = format!(
            "The method {} is not implemented for arguments: ({})! Add it with (def-impl {} ({}) impl)",
            describe_key(&self.name, key),
            printed.join(" "),
            self.name,
            key.iter().map(TypeTag::name).collect::<Vec<_>>().join(" ")
        );
        let known = self.implemented_keys();
        if !known.is_empty() {
            let listed: Vec<String> = known
                .iter()
                .map(|key| describe_key(&self.name, key))
                .collect();
            message.push_str(&format!(". Implemented: {}", listed.join(", ")));
        }
        YaliError::dispatch(message)
    }
}

/// `(name Num Str)`
pub fn describe_key(name: &Symbol, key: &[TypeTag]) -> String {
    let mut out = format!("({}", name);
    for tag in key {
        out.push(' ');
        out.push_str(tag.name());
    }
    out.push(')');
    out
}
