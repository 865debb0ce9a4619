use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::ast::{FnArity, List, Map, Record, TypeTag, Value, Vector};
use crate::error::YaliError;
use crate::eval::Interpreter;
use crate::interface::{Interface, OnDefine};
use crate::printer;
use crate::symbols::{Keyword, Symbol};

/// Interfaces the evaluator itself dispatches through: conversions, the
/// sequence protocol, hashing and equality.
pub struct CoreInterfaces {
    pub to_bool: Arc<Interface>,
    pub to_num: Arc<Interface>,
    pub to_str: Arc<Interface>,
    pub to_proc: Arc<Interface>,
    pub first: Arc<Interface>,
    pub rest: Arc<Interface>,
    pub is_empty: Arc<Interface>,
    pub hash: Arc<Interface>,
    pub equals: Arc<Interface>,
}

fn unary(name: &str, default: Option<Value>, hook: Option<OnDefine>) -> Arc<Interface> {
    Arc::new(Interface::new(
        Symbol::intern(name),
        vec![Symbol::intern("a")],
        default,
        hook,
    ))
}

fn record_hash_hook(key: &[TypeTag], imp: &Value) {
    if let [TypeTag::Record(ty)] = key {
        ty.set_hash_override(imp.clone());
    }
}

fn record_eq_hook(key: &[TypeTag], imp: &Value) {
    if let [TypeTag::Record(a), TypeTag::Record(b)] = key {
        if a == b {
            a.set_eq_override(imp.clone());
        }
    }
}

impl CoreInterfaces {
    pub fn new() -> Self {
        let print_default = Value::native("print", FnArity::exact(1), |_, args| {
            Ok(Value::from(printer::print(&args[0])))
        });
        let hash_default = Value::native("hash", FnArity::exact(1), |interp, args| {
            Ok(hash_to_num(interp.hash_of(&args[0])?))
        });
        let eq_default = Value::native("equals", FnArity::exact(2), |interp, args| {
            Ok(Value::Bool(interp.values_equal(&args[0], &args[1])?))
        });
        Self {
            to_bool: unary("to-Bool", None, None),
            to_num: unary("to-Num", None, None),
            to_str: unary("to-Str", Some(print_default), None),
            to_proc: unary("to-Proc", None, None),
            first: unary("first", None, None),
            rest: unary("rest", None, None),
            is_empty: unary("empty?", None, None),
            hash: unary(
                "hash",
                Some(hash_default),
                Some(OnDefine::Native(record_hash_hook)),
            ),
            equals: Arc::new(Interface::new(
                Symbol::intern("binary="),
                vec![Symbol::intern("a"), Symbol::intern("b")],
                Some(eq_default),
                Some(OnDefine::Native(record_eq_hook)),
            )),
        }
    }

    pub fn all(&self) -> [&Arc<Interface>; 9] {
        [
            &self.to_bool,
            &self.to_num,
            &self.to_str,
            &self.to_proc,
            &self.first,
            &self.rest,
            &self.is_empty,
            &self.hash,
            &self.equals,
        ]
    }
}

impl Default for CoreInterfaces {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps hashes inside the exactly representable integer range of a Num.
pub(crate) fn hash_to_num(hash: u64) -> Value {
    Value::Num((hash & ((1u64 << 53) - 1)) as f64)
}

fn expect_single<'a>(tag: &TypeTag, args: &'a [Value]) -> Result<&'a Value, YaliError> {
    match args {
        [single] => Ok(single),
        _ => Err(YaliError::arity(format!(
            "{} expects 1 argument, got {}",
            tag.name(),
            args.len()
        ))),
    }
}

impl Interpreter {
    /// Runs the conversion interface `iface` on `value`, failing with a
    /// conversion error when the value's type has no implementation.
    fn convert(&self, iface: &Interface, target: &str, value: &Value) -> Result<Value, YaliError> {
        let key = vec![value.type_tag()];
        match iface.implementation(&key) {
            Some(imp) => self.apply(&imp, vec![value.clone()]),
            None => Err(YaliError::type_mismatch(format!(
                "Cannot convert {} to {}! Add (def-impl {} ({}) impl)",
                value,
                target,
                iface.name(),
                value.type_name()
            ))),
        }
    }

    fn conversion_result(value: &Value, converted: &Value, target: &str) -> YaliError {
        YaliError::type_mismatch(format!(
            "The to-{} conversion of {} produced {}, not a {}!",
            target,
            value,
            converted,
            target
        ))
    }

    pub fn to_bool(&self, value: &Value) -> Result<bool, YaliError> {
        if let Value::Bool(b) = value {
            return Ok(*b);
        }
        match self.convert(&self.core().to_bool, "Bool", value)? {
            Value::Bool(b) => Ok(b),
            other => Err(Self::conversion_result(value, &other, "Bool")),
        }
    }

    /// Condition test used by `if` and the higher-order builtins.
    pub fn truthy(&self, value: &Value) -> Result<bool, YaliError> {
        self.to_bool(value)
    }

    pub fn to_num(&self, value: &Value) -> Result<f64, YaliError> {
        if let Value::Num(n) = value {
            return Ok(*n);
        }
        match self.convert(&self.core().to_num, "Num", value)? {
            Value::Num(n) => Ok(n),
            other => Err(Self::conversion_result(value, &other, "Num")),
        }
    }

    pub fn to_str(&self, value: &Value) -> Result<String, YaliError> {
        if let Value::Str(s) = value {
            return Ok(s.to_string());
        }
        match self.convert(&self.core().to_str, "Str", value)? {
            Value::Str(s) => Ok(s.to_string()),
            other => Err(Self::conversion_result(value, &other, "Str")),
        }
    }

    pub fn to_proc(&self, value: &Value) -> Result<Value, YaliError> {
        if value.is_callable() {
            return Ok(value.clone());
        }
        let converted = self.convert(&self.core().to_proc, "Proc", value)?;
        if converted.is_callable() {
            Ok(converted)
        } else {
            Err(Self::conversion_result(value, &converted, "Proc"))
        }
    }

    /// Call-position coercion for values that are not directly callable.
    pub(crate) fn coerce_callable(&self, value: &Value) -> Result<Value, YaliError> {
        if self.core().to_proc.lookup_exact(&[value.type_tag()]).is_none() {
            return Err(YaliError::not_callable(format!(
                "{} is not callable! Add (def-impl to-Proc ({}) impl) to call it",
                value,
                value.type_name()
            )));
        }
        self.to_proc(value)
    }

    pub fn to_sym(&self, value: &Value) -> Result<Symbol, YaliError> {
        match value {
            Value::Symbol(sym) => Ok(sym.clone()),
            Value::Str(name) if name.starts_with('#') => Err(YaliError::type_mismatch(format!(
                "Cannot create symbol {:?}: names starting with # are reserved for unique-sym",
                name
            ))),
            Value::Str(name) => Ok(Symbol::intern(name)),
            other => Err(YaliError::type_mismatch(format!(
                "Cannot convert {} to Sym",
                other
            ))),
        }
    }

    pub fn to_keyword(&self, value: &Value) -> Result<Keyword, YaliError> {
        match value {
            Value::Keyword(kw) => Ok(kw.clone()),
            Value::Str(name) => Ok(Keyword::intern(name)),
            Value::Symbol(sym) => Ok(Keyword::intern(sym.name())),
            other => Err(YaliError::type_mismatch(format!(
                "Cannot convert {} to Keyword",
                other
            ))),
        }
    }

    /// Applies a type value as a constructor.
    pub fn construct(&self, tag: &TypeTag, args: &[Value]) -> Result<Value, YaliError> {
        match tag {
            TypeTag::Nil => Ok(Value::Nil),
            TypeTag::Bool => Ok(Value::Bool(self.to_bool(expect_single(tag, args)?)?)),
            TypeTag::Num => Ok(Value::Num(self.to_num(expect_single(tag, args)?)?)),
            TypeTag::Str => {
                let mut out = String::new();
                for arg in args {
                    out.push_str(&self.to_str(arg)?);
                }
                Ok(Value::from(out))
            }
            TypeTag::Sym => Ok(Value::Symbol(self.to_sym(expect_single(tag, args)?)?)),
            TypeTag::Keyword => Ok(Value::Keyword(self.to_keyword(expect_single(tag, args)?)?)),
            TypeTag::List => Ok(Value::list(args.iter().cloned())),
            TypeTag::Map => {
                if args.len() % 2 != 0 {
                    return Err(YaliError::arity(format!(
                        "Map expects key/value pairs, got {} argument(s)",
                        args.len()
                    )));
                }
                let mut map = Map::default();
                for pair in args.chunks(2) {
                    self.map_insert(&mut map, pair[0].clone(), pair[1].clone())?;
                }
                Ok(Value::Map(map))
            }
            TypeTag::Proc => self.to_proc(expect_single(tag, args)?),
            TypeTag::Interface => Err(YaliError::type_mismatch(
                "Interfaces are created with (def-interface (name params...))",
            )),
            TypeTag::Type => Ok(Value::Type(expect_single(tag, args)?.type_tag())),
            TypeTag::Error => {
                let message = match args.first() {
                    Some(message) => self.to_str(message)?,
                    None => String::new(),
                };
                let data = args.get(1).cloned().unwrap_or(Value::Nil);
                Ok(Value::error(&message, data))
            }
            TypeTag::Record(ty) => {
                if args.len() != ty.fields().len() {
                    return Err(YaliError::arity(format!(
                        "{} expects {} field value(s), got {}",
                        ty.name(),
                        ty.fields().len(),
                        args.len()
                    )));
                }
                Ok(Value::Record(Arc::new(Record {
                    ty: ty.clone(),
                    values: args.to_vec(),
                })))
            }
        }
    }

    /// Dispatches `iface` on `args` and requires a Bool answer.
    pub(crate) fn dispatch_bool(
        &self,
        iface: &Interface,
        args: &[Value],
    ) -> Result<bool, YaliError> {
        let result = self.dispatch(iface, args)?;
        self.to_bool(&result)
    }

    /// Elements of an iterable value. Lists, maps (as `(k v)` entries),
    /// strings (characters) and nil iterate directly. Records iterate their
    /// field values unless their type implements `empty?`. Anything else goes
    /// through the `empty?`/`first`/`rest` interfaces.
    pub fn iterate(&self, value: &Value) -> Result<Vec<Value>, YaliError> {
        match value {
            Value::Nil => Ok(Vec::new()),
            Value::List(list) => Ok(list.iter().cloned().collect()),
            Value::Map(map) => Ok(map
                .iter()
                .map(|(k, v)| Value::list([k.clone(), v.clone()]))
                .collect()),
            Value::Record(record)
                if self
                    .core()
                    .is_empty
                    .lookup_exact(&[value.type_tag()])
                    .is_none() =>
            {
                Ok(record.values.clone())
            }
            Value::Str(text) => Ok(text
                .chars()
                .map(|c| Value::from(c.to_string()))
                .collect()),
            other => self.iterate_protocol(other),
        }
    }

    fn iterate_protocol(&self, value: &Value) -> Result<Vec<Value>, YaliError> {
        let core = self.core();
        let key = [value.type_tag()];
        let implemented = [&core.is_empty, &core.first, &core.rest]
            .iter()
            .all(|iface| iface.implementation(&key).is_some());
        if !implemented {
            return Err(YaliError::type_mismatch(format!(
                "{} is not iterable! Implement empty?, first and rest for {}",
                value,
                value.type_name()
            )));
        }
        let mut items = Vec::new();
        let mut current = value.clone();
        while !self.dispatch_bool(&core.is_empty, std::slice::from_ref(&current))? {
            items.push(self.dispatch(&core.first, std::slice::from_ref(&current))?);
            current = self.dispatch(&core.rest, std::slice::from_ref(&current))?;
            if matches!(current, Value::Nil) {
                break;
            }
        }
        Ok(items)
    }

    /// Indexed read shared by `get` and member access.
    pub fn get(&self, target: &Value, key: &Value) -> Result<Value, YaliError> {
        match (target, key) {
            (Value::Nil, _) => Ok(Value::Nil),
            (Value::Map(map), _) => Ok(self.map_get(map, key)?.unwrap_or(Value::Nil)),
            (Value::List(list), Value::Num(n)) => Ok(index(*n, list.len())
                .and_then(|idx| list.get(idx).cloned())
                .unwrap_or(Value::Nil)),
            (Value::Str(text), Value::Num(n)) => Ok(index(*n, text.chars().count())
                .and_then(|idx| text.chars().nth(idx))
                .map(|c| Value::from(c.to_string()))
                .unwrap_or(Value::Nil)),
            (Value::Record(record), Value::Symbol(_) | Value::Keyword(_) | Value::Str(_)) => {
                Ok(field_name(key)
                    .and_then(|name| record.field(name).cloned())
                    .unwrap_or(Value::Nil))
            }
            (Value::Record(record), Value::Num(n)) => Ok(index(*n, record.values.len())
                .and_then(|idx| record.values.get(idx).cloned())
                .unwrap_or(Value::Nil)),
            (Value::Error(err), _) => Ok(match field_name(key) {
                Some("message") => Value::Str(err.message.clone()),
                Some("data") => err.data.clone(),
                Some("kind") => err.kind.clone().map(Value::Keyword).unwrap_or(Value::Nil),
                Some("stack") => err
                    .stack()
                    .map(|frames| Value::from(frames.clone()))
                    .unwrap_or(Value::Nil),
                _ => Value::Nil,
            }),
            (Value::Type(TypeTag::Record(ty)), _) if field_name(key) == Some("fields") => Ok(
                Value::list(ty.fields().iter().cloned().map(Value::Symbol)),
            ),
            _ => Err(YaliError::type_mismatch(format!(
                "Cannot get {} from {}",
                key,
                target.type_name()
            ))),
        }
    }

    /// Structural equality honoring user equality declared for record types.
    pub fn values_equal(&self, a: &Value, b: &Value) -> Result<bool, YaliError> {
        match (a, b) {
            (Value::Record(ra), Value::Record(rb)) if ra.ty == rb.ty => {
                if let Some(imp) = ra.ty.eq_override() {
                    let result = self.apply(&imp, vec![a.clone(), b.clone()])?;
                    return self.to_bool(&result);
                }
                self.all_equal(ra.values.iter(), rb.values.iter(), ra.values.len(), rb.values.len())
            }
            (Value::List(la), Value::List(lb)) => {
                self.all_equal(la.iter(), lb.iter(), la.len(), lb.len())
            }
            (Value::Map(ma), Value::Map(mb)) => {
                if ma.len() != mb.len() {
                    return Ok(false);
                }
                for (key, value) in ma.iter() {
                    match self.map_get(mb, key)? {
                        Some(other) if self.values_equal(value, &other)? => {}
                        _ => return Ok(false),
                    }
                }
                Ok(true)
            }
            _ => Ok(a == b),
        }
    }

    /// The key `map` stores for `key`. Keys holding records with a user
    /// equality are matched by that equality, since their structural hash
    /// can differ from that of an equal key.
    fn map_key(&self, map: &Map, key: &Value) -> Result<Option<Value>, YaliError> {
        if map.contains_key(key) {
            return Ok(Some(key.clone()));
        }
        if !has_user_equality(key) {
            return Ok(None);
        }
        for candidate in map.keys() {
            if self.values_equal(candidate, key)? {
                return Ok(Some(candidate.clone()));
            }
        }
        Ok(None)
    }

    pub fn map_get(&self, map: &Map, key: &Value) -> Result<Option<Value>, YaliError> {
        Ok(self
            .map_key(map, key)?
            .and_then(|stored| map.get(&stored).cloned()))
    }

    pub fn map_contains(&self, map: &Map, key: &Value) -> Result<bool, YaliError> {
        Ok(self.map_key(map, key)?.is_some())
    }

    /// Inserts under the key already stored for an equal `key`, if any.
    pub fn map_insert(&self, map: &mut Map, key: Value, value: Value) -> Result<(), YaliError> {
        let key = self.map_key(map, &key)?.unwrap_or(key);
        map.insert(key, value);
        Ok(())
    }

    pub fn map_remove(&self, map: &mut Map, key: &Value) -> Result<(), YaliError> {
        if let Some(stored) = self.map_key(map, key)? {
            map.remove(&stored);
        }
        Ok(())
    }

    /// Adds `(k v)` entries to `map`.
    pub(crate) fn insert_entries(&self, map: &mut Map, entries: &[Value]) -> Result<(), YaliError> {
        for entry in entries {
            match entry {
                Value::List(pair) if pair.len() == 2 => {
                    let key = pair.get(0).cloned().unwrap_or(Value::Nil);
                    let value = pair.get(1).cloned().unwrap_or(Value::Nil);
                    self.map_insert(map, key, value)?;
                }
                other => {
                    return Err(YaliError::type_mismatch(format!(
                        "Expected a (key value) entry, got {}",
                        other
                    )))
                }
            }
        }
        Ok(())
    }

    fn all_equal<'a>(
        &self,
        left: impl Iterator<Item = &'a Value>,
        right: impl Iterator<Item = &'a Value>,
        left_len: usize,
        right_len: usize,
    ) -> Result<bool, YaliError> {
        if left_len != right_len {
            return Ok(false);
        }
        for (x, y) in left.zip(right) {
            if !self.values_equal(x, y)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Hash consistent with [`Interpreter::values_equal`] for records that
    /// declare both a hash and an equality.
    pub fn hash_of(&self, value: &Value) -> Result<u64, YaliError> {
        match value {
            Value::Record(record) => {
                if let Some(imp) = record.ty.hash_override() {
                    let result = self.apply(&imp, vec![value.clone()])?;
                    return Ok(self.to_num(&result)? as u64);
                }
                let mut hasher = DefaultHasher::new();
                record.ty.hash(&mut hasher);
                for item in &record.values {
                    self.hash_of(item)?.hash(&mut hasher);
                }
                Ok(hasher.finish())
            }
            Value::List(list) => {
                let mut hasher = DefaultHasher::new();
                list.len().hash(&mut hasher);
                for item in list.iter() {
                    self.hash_of(item)?.hash(&mut hasher);
                }
                Ok(hasher.finish())
            }
            other => {
                let mut hasher = DefaultHasher::new();
                other.hash(&mut hasher);
                Ok(hasher.finish())
            }
        }
    }

    /// Builtin implementations of the core interfaces for builtin types.
    pub(crate) fn register_core_impls(&self) -> Result<(), YaliError> {
        let core = self.core();
        let impls: Vec<(&Arc<Interface>, TypeTag, Value)> = vec![
            (
                &core.to_bool,
                TypeTag::Nil,
                Value::native("nil->bool", FnArity::exact(1), |_, _| Ok(Value::Bool(false))),
            ),
            (
                &core.to_bool,
                TypeTag::Num,
                Value::native("num->bool", FnArity::exact(1), |_, args| {
                    Ok(Value::Bool(matches!(args[0], Value::Num(n) if n != 0.0 && !n.is_nan())))
                }),
            ),
            (
                &core.to_bool,
                TypeTag::Str,
                Value::native("str->bool", FnArity::exact(1), |_, args| {
                    Ok(Value::Bool(matches!(&args[0], Value::Str(s) if !s.is_empty())))
                }),
            ),
            (
                &core.to_bool,
                TypeTag::List,
                Value::native("list->bool", FnArity::exact(1), |_, args| {
                    Ok(Value::Bool(matches!(&args[0], Value::List(l) if !l.is_empty())))
                }),
            ),
            (
                &core.to_bool,
                TypeTag::Map,
                Value::native("map->bool", FnArity::exact(1), |_, args| {
                    Ok(Value::Bool(matches!(&args[0], Value::Map(m) if !m.is_empty())))
                }),
            ),
            (
                &core.to_num,
                TypeTag::Bool,
                Value::native("bool->num", FnArity::exact(1), |_, args| {
                    Ok(Value::Num(if matches!(args[0], Value::Bool(true)) { 1.0 } else { 0.0 }))
                }),
            ),
            (
                &core.to_num,
                TypeTag::Str,
                Value::native("str->num", FnArity::exact(1), |_, args| {
                    let Value::Str(text) = &args[0] else {
                        return Ok(Value::Nil);
                    };
                    text.trim().parse::<f64>().map(Value::Num).map_err(|_| {
                        YaliError::type_mismatch(format!("Cannot parse {:?} as a Num", text))
                    })
                }),
            ),
            (
                &core.to_proc,
                TypeTag::Keyword,
                Value::native("keyword->proc", FnArity::exact(1), |_, args| {
                    let key = args[0].clone();
                    Ok(Value::native("keyword-lookup", FnArity::exact(1), move |interp, args| {
                        interp.get(&args[0], &key)
                    }))
                }),
            ),
            (
                &core.to_proc,
                TypeTag::Map,
                Value::native("map->proc", FnArity::exact(1), |_, args| {
                    let map = args[0].clone();
                    Ok(Value::native("map-lookup", FnArity::exact(1), move |interp, args| {
                        interp.get(&map, &args[0])
                    }))
                }),
            ),
            (
                &core.to_proc,
                TypeTag::List,
                Value::native("list->proc", FnArity::exact(1), |_, args| {
                    let list = args[0].clone();
                    Ok(Value::native("list-index", FnArity::exact(1), move |interp, args| {
                        interp.get(&list, &args[0])
                    }))
                }),
            ),
            (
                &core.first,
                TypeTag::List,
                Value::native("list-first", FnArity::exact(1), |_, args| {
                    Ok(args[0]
                        .as_list()
                        .and_then(List::head)
                        .cloned()
                        .unwrap_or(Value::Nil))
                }),
            ),
            (
                &core.rest,
                TypeTag::List,
                Value::native("list-rest", FnArity::exact(1), |_, args| {
                    Ok(args[0]
                        .as_list()
                        .map(|list| list.iter().skip(1).cloned().collect::<Vector<Value>>())
                        .map(Value::from)
                        .unwrap_or_else(Value::empty_list))
                }),
            ),
            (
                &core.is_empty,
                TypeTag::List,
                Value::native("list-empty?", FnArity::exact(1), |_, args| {
                    Ok(Value::Bool(args[0].as_list().map(List::is_empty).unwrap_or(true)))
                }),
            ),
            (
                &core.first,
                TypeTag::Nil,
                Value::native("nil-first", FnArity::exact(1), |_, _| Ok(Value::Nil)),
            ),
            (
                &core.rest,
                TypeTag::Nil,
                Value::native("nil-rest", FnArity::exact(1), |_, _| Ok(Value::empty_list())),
            ),
            (
                &core.is_empty,
                TypeTag::Nil,
                Value::native("nil-empty?", FnArity::exact(1), |_, _| Ok(Value::Bool(true))),
            ),
            (
                &core.is_empty,
                TypeTag::Map,
                Value::native("map-empty?", FnArity::exact(1), |_, args| {
                    Ok(Value::Bool(matches!(&args[0], Value::Map(m) if m.is_empty())))
                }),
            ),
        ];
        for (iface, tag, imp) in impls {
            iface.register(vec![tag], imp)?;
        }
        let always_true =
            Value::native("always-true", FnArity::exact(1), |_, _| Ok(Value::Bool(true)));
        for tag in [
            TypeTag::Sym,
            TypeTag::Keyword,
            TypeTag::Proc,
            TypeTag::Interface,
            TypeTag::Type,
            TypeTag::Error,
        ] {
            core.to_bool.register(vec![tag], always_true.clone())?;
        }
        Ok(())
    }
}

fn index(n: f64, len: usize) -> Option<usize> {
    if n.fract() != 0.0 || n < 0.0 || n >= len as f64 {
        return None;
    }
    Some(n as usize)
}

fn field_name(key: &Value) -> Option<&str> {
    match key {
        Value::Symbol(sym) => Some(sym.name()),
        Value::Keyword(kw) => Some(kw.name()),
        Value::Str(name) => Some(&**name),
        _ => None,
    }
}

fn has_user_equality(value: &Value) -> bool {
    match value {
        Value::Record(record) => {
            record.ty.eq_override().is_some() || record.values.iter().any(has_user_equality)
        }
        Value::List(list) => list.iter().any(has_user_equality),
        Value::Map(map) => map
            .iter()
            .any(|(key, value)| has_user_equality(key) || has_user_equality(value)),
        _ => false,
    }
}
