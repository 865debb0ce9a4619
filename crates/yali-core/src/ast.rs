use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{BuildHasherDefault, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::OnceCell;

use crate::env::EnvRef;
use crate::error::YaliError;
use crate::eval::Interpreter;
use crate::interface::Interface;
use crate::printer;
use crate::scanner::SourceRef;
use crate::symbols::{Keyword, Symbol};

pub type Vector<T> = im::Vector<T>;
/// Persistent map with a fixed hasher so printing order is stable between runs.
pub type Map = im::HashMap<Value, Value, BuildHasherDefault<DefaultHasher>>;

/// A list form. The source reference is carried along for diagnostics and
/// is ignored by equality and hashing.
#[derive(Clone, Default)]
pub struct List {
    items: Vector<Value>,
    source: Option<Arc<SourceRef>>,
}

impl List {
    pub fn new(items: Vector<Value>) -> Self {
        Self {
            items,
            source: None,
        }
    }

    pub fn with_source(mut self, source: Option<Arc<SourceRef>>) -> Self {
        self.source = source;
        self
    }

    pub fn items(&self) -> &Vector<Value> {
        &self.items
    }

    pub fn into_items(self) -> Vector<Value> {
        self.items
    }

    pub fn source(&self) -> Option<&Arc<SourceRef>> {
        self.source.as_ref()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn head(&self) -> Option<&Value> {
        self.items.front()
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.items.get(idx)
    }

    pub fn iter(&self) -> im::vector::Iter<'_, Value> {
        self.items.iter()
    }

    /// Everything after the head.
    pub fn operands(&self) -> Vec<Value> {
        self.items.iter().skip(1).cloned().collect()
    }

    pub fn head_symbol(&self) -> Option<&Symbol> {
        match self.head() {
            Some(Value::Symbol(sym)) => Some(sym),
            _ => None,
        }
    }
}

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl FromIterator<Value> for List {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        List::new(iter.into_iter().collect())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FnArity {
    min: usize,
    max: Option<usize>,
}

impl FnArity {
    pub const fn exact(count: usize) -> Self {
        Self {
            min: count,
            max: Some(count),
        }
    }

    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    pub const fn range(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.map(|max| count <= max).unwrap_or(true)
    }

    pub fn describe(&self) -> String {
        match self.max {
            Some(max) if max == self.min => format!("{}", max),
            Some(max) => format!("{} to {}", self.min, max),
            None => format!("at least {}", self.min),
        }
    }
}

pub type NativeFnImpl = dyn Fn(&Interpreter, &[Value]) -> Result<Value, YaliError> + Send + Sync;

pub struct NativeFn {
    name: Arc<str>,
    arity: FnArity,
    func: Box<NativeFnImpl>,
}

impl NativeFn {
    pub fn new(
        name: &str,
        arity: FnArity,
        func: impl Fn(&Interpreter, &[Value]) -> Result<Value, YaliError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: Arc::from(name),
            arity,
            func: Box::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> FnArity {
        self.arity
    }

    pub fn call(&self, interp: &Interpreter, args: &[Value]) -> Result<Value, YaliError> {
        if !self.arity.accepts(args.len()) {
            return Err(YaliError::arity(format!(
                "{} expects {} argument(s), got {}",
                self.name,
                self.arity.describe(),
                args.len()
            )));
        }
        (self.func)(interp, args)
    }
}

/// A user procedure or macro closing over its defining environment.
pub struct Closure {
    pub params: Vec<Value>,
    pub body: Vec<Value>,
    pub env: EnvRef,
    pub is_macro: bool,
    name: OnceCell<Symbol>,
}

impl Closure {
    pub fn new(params: Vec<Value>, body: Vec<Value>, env: EnvRef, is_macro: bool) -> Self {
        Self {
            params,
            body,
            env,
            is_macro,
            name: OnceCell::new(),
        }
    }

    pub fn name(&self) -> Option<&Symbol> {
        self.name.get()
    }

    /// Names the closure after the first `def` that binds it.
    pub fn name_once(&self, name: &Symbol) {
        let _ = self.name.set(name.clone());
    }

    pub fn display_name(&self) -> String {
        self.name()
            .map(|sym| sym.name().to_string())
            .unwrap_or_else(|| "anonymous".to_string())
    }
}

/// A procedure fetched through a member-access step, remembering the object
/// it was fetched from.
pub struct BoundMethod {
    pub receiver: Value,
    pub target: Value,
}

static NEXT_RECORD_TYPE_ID: AtomicU64 = AtomicU64::new(1);

pub struct RecordType {
    id: u64,
    name: Symbol,
    fields: Vec<Symbol>,
    eq_override: RwLock<Option<Value>>,
    hash_override: RwLock<Option<Value>>,
}

impl RecordType {
    pub fn new(name: Symbol, fields: Vec<Symbol>) -> Self {
        Self {
            id: NEXT_RECORD_TYPE_ID.fetch_add(1, Ordering::Relaxed),
            name,
            fields,
            eq_override: RwLock::new(None),
            hash_override: RwLock::new(None),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &Symbol {
        &self.name
    }

    pub fn fields(&self) -> &[Symbol] {
        &self.fields
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name() == name)
    }

    pub fn eq_override(&self) -> Option<Value> {
        self.eq_override
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_eq_override(&self, imp: Value) {
        *self
            .eq_override
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(imp);
    }

    pub fn hash_override(&self) -> Option<Value> {
        self.hash_override
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_hash_override(&self, imp: Value) {
        *self
            .hash_override
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(imp);
    }
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RecordType {}

impl Hash for RecordType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

pub struct Record {
    pub ty: Arc<RecordType>,
    pub values: Vec<Value>,
}

impl Record {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.ty.field_index(name).and_then(|idx| self.values.get(idx))
    }
}

/// Error value produced by `error` or by reifying an evaluator error inside
/// `catch`.
pub struct ErrorValue {
    pub message: Arc<str>,
    pub data: Value,
    pub kind: Option<Keyword>,
    stack: OnceCell<Vector<Value>>,
}

impl ErrorValue {
    pub fn new(message: &str, data: Value, kind: Option<Keyword>) -> Self {
        Self {
            message: Arc::from(message),
            data,
            kind,
            stack: OnceCell::new(),
        }
    }

    pub fn stack(&self) -> Option<&Vector<Value>> {
        self.stack.get()
    }

    /// Keeps the first stack snapshot attached to this error.
    pub fn attach_stack(&self, frames: Vector<Value>) {
        let _ = self.stack.set(frames);
    }
}

/// One tag per runtime value kind; the key of interface dispatch tables.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Nil,
    Bool,
    Num,
    Str,
    Sym,
    Keyword,
    List,
    Map,
    Proc,
    Interface,
    Type,
    Error,
    Record(Arc<RecordType>),
}

impl TypeTag {
    pub const BUILTIN: [TypeTag; 12] = [
        TypeTag::Nil,
        TypeTag::Bool,
        TypeTag::Num,
        TypeTag::Str,
        TypeTag::Sym,
        TypeTag::Keyword,
        TypeTag::List,
        TypeTag::Map,
        TypeTag::Proc,
        TypeTag::Interface,
        TypeTag::Type,
        TypeTag::Error,
    ];

    pub fn name(&self) -> &str {
        match self {
            TypeTag::Nil => "Nil",
            TypeTag::Bool => "Bool",
            TypeTag::Num => "Num",
            TypeTag::Str => "Str",
            TypeTag::Sym => "Sym",
            TypeTag::Keyword => "Keyword",
            TypeTag::List => "List",
            TypeTag::Map => "Map",
            TypeTag::Proc => "Proc",
            TypeTag::Interface => "Interface",
            TypeTag::Type => "Type",
            TypeTag::Error => "Error",
            TypeTag::Record(ty) => ty.name().name(),
        }
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Num(f64),
    Str(Arc<str>),
    Symbol(Symbol),
    Keyword(Keyword),
    List(List),
    Map(Map),
    Proc(Arc<Closure>),
    Native(Arc<NativeFn>),
    Bound(Arc<BoundMethod>),
    Interface(Arc<Interface>),
    Type(TypeTag),
    Record(Arc<Record>),
    Error(Arc<ErrorValue>),
}

impl Value {
    pub fn str(text: &str) -> Value {
        Value::Str(Arc::from(text))
    }

    pub fn symbol(name: &str) -> Value {
        Value::Symbol(Symbol::intern(name))
    }

    pub fn keyword(name: &str) -> Value {
        Value::Keyword(Keyword::intern(name))
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Value {
        Value::List(items.into_iter().collect())
    }

    pub fn empty_list() -> Value {
        Value::List(List::default())
    }

    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Value {
        Value::Map(entries.into_iter().collect())
    }

    pub fn native(
        name: &str,
        arity: FnArity,
        func: impl Fn(&Interpreter, &[Value]) -> Result<Value, YaliError> + Send + Sync + 'static,
    ) -> Value {
        Value::Native(Arc::new(NativeFn::new(name, arity, func)))
    }

    pub fn error(message: &str, data: Value) -> Value {
        Value::Error(Arc::new(ErrorValue::new(message, data, None)))
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Nil => TypeTag::Nil,
            Value::Bool(_) => TypeTag::Bool,
            Value::Num(_) => TypeTag::Num,
            Value::Str(_) => TypeTag::Str,
            Value::Symbol(_) => TypeTag::Sym,
            Value::Keyword(_) => TypeTag::Keyword,
            Value::List(_) => TypeTag::List,
            Value::Map(_) => TypeTag::Map,
            Value::Proc(_) | Value::Native(_) | Value::Bound(_) => TypeTag::Proc,
            Value::Interface(_) => TypeTag::Interface,
            Value::Type(_) => TypeTag::Type,
            Value::Error(_) => TypeTag::Error,
            Value::Record(record) => TypeTag::Record(record.ty.clone()),
        }
    }

    pub fn type_name(&self) -> String {
        self.type_tag().name().to_string()
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Proc(_)
                | Value::Native(_)
                | Value::Bound(_)
                | Value::Interface(_)
                | Value::Type(_)
        )
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Value::Symbol(sym) => Some(sym),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// True for a list whose head is the given interned symbol.
    pub fn is_form_headed_by(&self, sym: &Symbol) -> bool {
        self.as_list()
            .and_then(|list| list.head_symbol())
            .map(|head| head == sym)
            .unwrap_or(false)
    }

    /// Identity used by the printer to notice a value nested in itself.
    pub(crate) fn same_identity(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => !a.is_empty() && a.items().ptr_eq(b.items()),
            (Value::Map(a), Value::Map(b)) => !a.is_empty() && a.ptr_eq(b),
            (Value::Record(a), Value::Record(b)) => Arc::ptr_eq(a, b),
            (Value::Error(a), Value::Error(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn num_eq(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => num_eq(*a, *b),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Keyword(a), Value::Keyword(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Proc(a), Value::Proc(b)) => Arc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Arc::ptr_eq(a, b),
            (Value::Bound(a), Value::Bound(b)) => {
                a.receiver == b.receiver && a.target == b.target
            }
            (Value::Interface(a), Value::Interface(b)) => Arc::ptr_eq(a, b),
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a.ty == b.ty && a.values == b.values,
            (Value::Error(a), Value::Error(b)) => {
                Arc::ptr_eq(a, b) || (a.message == b.message && a.data == b.data)
            }
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Nil => {}
            Value::Bool(b) => b.hash(state),
            Value::Num(n) => {
                let normalized = if *n == 0.0 {
                    0.0
                } else if n.is_nan() {
                    f64::NAN
                } else {
                    *n
                };
                normalized.to_bits().hash(state)
            }
            Value::Str(s) => s.hash(state),
            Value::Symbol(sym) => sym.hash(state),
            Value::Keyword(kw) => kw.hash(state),
            Value::List(list) => {
                list.len().hash(state);
                for item in list.iter() {
                    item.hash(state);
                }
            }
            Value::Map(map) => {
                // Entry order depends on the map's shape; combine order-free.
                let mut acc: u64 = 0;
                for (key, value) in map.iter() {
                    let mut entry = DefaultHasher::new();
                    key.hash(&mut entry);
                    value.hash(&mut entry);
                    acc = acc.wrapping_add(entry.finish());
                }
                map.len().hash(state);
                acc.hash(state);
            }
            Value::Proc(p) => (Arc::as_ptr(p) as usize).hash(state),
            Value::Native(p) => (Arc::as_ptr(p) as usize).hash(state),
            Value::Bound(b) => {
                b.receiver.hash(state);
                b.target.hash(state);
            }
            Value::Interface(i) => (Arc::as_ptr(i) as usize).hash(state),
            Value::Type(tag) => tag.hash(state),
            Value::Record(record) => {
                record.ty.hash(state);
                for value in &record.values {
                    value.hash(state);
                }
            }
            Value::Error(err) => {
                err.message.hash(state);
                err.data.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", printer::print(self))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", printer::print(self))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Num(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::str(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Arc::from(value))
    }
}

impl From<Vector<Value>> for Value {
    fn from(value: Vector<Value>) -> Self {
        Value::List(List::new(value))
    }
}
