use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::ast::Value;
use crate::symbols::Symbol;

pub type EnvRef = Arc<RwLock<Env>>;

/// One frame of the lexical environment. Lookups that miss locally continue
/// in the outer frame; definitions always land in this frame.
#[derive(Default)]
pub struct Env {
    vars: HashMap<Symbol, Value>,
    outer: Option<EnvRef>,
    label: Option<&'static str>,
}

impl Env {
    pub fn new_child(outer: EnvRef, label: &'static str) -> Self {
        Self {
            vars: HashMap::new(),
            outer: Some(outer),
            label: Some(label),
        }
    }

    pub fn define(&mut self, key: Symbol, value: Value) {
        self.vars.insert(key, value);
    }

    pub fn define_builtin(&mut self, name: &str, value: Value) {
        self.define(Symbol::intern(name), value);
    }

    pub fn get_local(&self, key: &Symbol) -> Option<Value> {
        self.vars.get(key).cloned()
    }

    pub fn contains_local(&self, key: &Symbol) -> bool {
        self.vars.contains_key(key)
    }

    pub fn outer_ref(&self) -> Option<EnvRef> {
        self.outer.clone()
    }

    pub fn label(&self) -> &'static str {
        self.label.unwrap_or("global")
    }

    pub fn local_names(&self) -> Vec<Symbol> {
        self.vars.keys().cloned().collect()
    }
}

pub fn new_ref(env: Env) -> EnvRef {
    Arc::new(RwLock::new(env))
}

pub fn read_env(env: &EnvRef) -> RwLockReadGuard<'_, Env> {
    env.read().unwrap_or_else(PoisonError::into_inner)
}

pub fn write_env(env: &EnvRef) -> RwLockWriteGuard<'_, Env> {
    env.write().unwrap_or_else(PoisonError::into_inner)
}

/// Pushes a child frame onto `parent`.
pub fn extend(parent: &EnvRef, label: &'static str) -> EnvRef {
    new_ref(Env::new_child(parent.clone(), label))
}

pub fn define(env: &EnvRef, key: Symbol, value: Value) {
    write_env(env).define(key, value);
}

/// Walks the frame chain. `None` means the name is not bound anywhere, which
/// is distinct from a binding to `nil`.
pub fn lookup(env: &EnvRef, key: &Symbol) -> Option<Value> {
    let mut current = env.clone();
    loop {
        let next = {
            let frame = read_env(&current);
            if let Some(value) = frame.get_local(key) {
                return Some(value);
            }
            frame.outer_ref()
        };
        current = next?;
    }
}

pub fn has(env: &EnvRef, key: &Symbol) -> bool {
    let mut current = env.clone();
    loop {
        let next = {
            let frame = read_env(&current);
            if frame.contains_local(key) {
                return true;
            }
            frame.outer_ref()
        };
        match next {
            Some(outer) => current = outer,
            None => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_shadows_without_touching_parent() {
        let root = new_ref(Env::default());
        let x = Symbol::intern("env-test-x");
        define(&root, x.clone(), Value::Num(4.0));
        let child = extend(&root, "let");
        define(&child, x.clone(), Value::Num(2.0));
        assert_eq!(lookup(&child, &x), Some(Value::Num(2.0)));
        assert_eq!(lookup(&root, &x), Some(Value::Num(4.0)));
    }

    #[test]
    fn nil_binding_differs_from_missing() {
        let root = new_ref(Env::default());
        let child = extend(&root, "proc");
        let bound = Symbol::intern("env-test-bound");
        define(&root, bound.clone(), Value::Nil);
        assert!(has(&child, &bound));
        assert_eq!(lookup(&child, &bound), Some(Value::Nil));
        let missing = Symbol::intern("env-test-missing");
        assert!(!has(&child, &missing));
        assert_eq!(lookup(&child, &missing), None);
    }
}
