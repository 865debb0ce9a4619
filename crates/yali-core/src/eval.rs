use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::ast::{
    BoundMethod, Closure, ErrorValue, FnArity, List, NativeFn, RecordType, TypeTag, Value,
    Vector,
};
use crate::builtins;
use crate::env::{define, extend, lookup, new_ref, Env, EnvRef};
use crate::error::{StackFrame, YaliError};
use crate::interface::{Interface, OnDefine};
use crate::options::EvalOptions;
use crate::reader::Reader;
use crate::scanner::SourceRef;
use crate::symbols::{is_splice, SpecialForm, Symbol, THIS_SYM};
use crate::types::CoreInterfaces;

/// Cache key for macro expansions: the macro itself plus the structure of the
/// operands it was handed.
struct MacroKey {
    mac: Arc<Closure>,
    operands: Vector<Value>,
}

impl PartialEq for MacroKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.mac, &other.mac) && self.operands == other.operands
    }
}

impl Eq for MacroKey {}

impl Hash for MacroKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.mac) as usize).hash(state);
        self.operands.hash(state);
    }
}

/// Evaluation grows the native stack in segments, so nesting is bounded by
/// `max_depth` rather than by the size of the calling thread's stack.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

struct DepthGuard<'a> {
    depth: &'a Cell<usize>,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

pub struct Interpreter {
    global: EnvRef,
    core: CoreInterfaces,
    options: EvalOptions,
    stack: RefCell<Vec<StackFrame>>,
    depth: Cell<usize>,
    macro_cache: RefCell<HashMap<MacroKey, Value>>,
}

impl Interpreter {
    /// Builds an interpreter with the builtins and core interface impls
    /// installed in its global environment.
    pub fn new(options: EvalOptions) -> Result<Self, YaliError> {
        let interp = Self {
            global: new_ref(Env::default()),
            core: CoreInterfaces::new(),
            options,
            stack: RefCell::new(Vec::new()),
            depth: Cell::new(0),
            macro_cache: RefCell::new(HashMap::new()),
        };
        builtins::install(&interp)?;
        Ok(interp)
    }

    pub fn global(&self) -> &EnvRef {
        &self.global
    }

    pub fn core(&self) -> &CoreInterfaces {
        &self.core
    }

    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    pub fn define_global(&self, name: &str, value: Value) {
        define(&self.global, Symbol::intern(name), value);
    }

    /// Reads `source` with this interpreter's reader settings.
    pub fn read(&self, source: &str, file: &str) -> Result<Vec<Value>, YaliError> {
        Reader::new(source, file)
            .with_dot_access(self.options.dot_access)
            .read_all()
    }

    /// Evaluates one top-level form.
    pub fn interpret(&self, form: &Value, env: &EnvRef) -> Result<Value, YaliError> {
        self.eval(form, env).map_err(|err| match err {
            YaliError::RecurSignal { .. } => {
                YaliError::control_flow("recur used outside of a procedure body")
            }
            other => other,
        })
    }

    /// Reads and evaluates every form of `source` in the global environment,
    /// returning the last value.
    pub fn eval_str(&self, source: &str) -> Result<Value, YaliError> {
        let label = self.options.source_label().to_string();
        self.eval_str_in(source, &label, &self.global)
    }

    pub fn eval_str_in(&self, source: &str, file: &str, env: &EnvRef) -> Result<Value, YaliError> {
        let mut result = Value::Nil;
        for form in self.read(source, file)? {
            result = self.interpret(&form, env)?;
        }
        Ok(result)
    }

    pub fn stack_snapshot(&self) -> Vec<StackFrame> {
        self.stack.borrow().clone()
    }

    pub fn macro_cache_len(&self) -> usize {
        self.macro_cache.borrow().len()
    }

    fn enter(&self) -> Result<DepthGuard<'_>, YaliError> {
        let next = self.depth.get() + 1;
        if next > self.options.max_depth {
            warn!(limit = self.options.max_depth, "evaluation depth limit reached");
            return Err(YaliError::stack_exhausted(self.options.max_depth));
        }
        self.depth.set(next);
        Ok(DepthGuard { depth: &self.depth })
    }

    fn push_frame(&self, function: String, source: Option<&Arc<SourceRef>>) {
        self.stack.borrow_mut().push(StackFrame {
            function,
            source: source.cloned(),
        });
    }

    fn pop_frame(&self) {
        self.stack.borrow_mut().pop();
    }

    fn attach_stack(&self, err: YaliError) -> YaliError {
        if err.wants_stack() {
            let snapshot = self.stack_snapshot();
            err.with_stack(snapshot)
        } else {
            err
        }
    }

    pub fn eval(&self, form: &Value, env: &EnvRef) -> Result<Value, YaliError> {
        match form {
            Value::Symbol(sym) => self.resolve(sym, env),
            Value::List(list) if !list.is_empty() => {
                let _guard = self.enter()?;
                stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_list(list, env))
                    .map_err(|err| self.attach_stack(err.with_source(list.source())))
            }
            _ => Ok(form.clone()),
        }
    }

    /// Evaluates a form whose value is consumed in place, so a recur signal
    /// escaping from it is a misuse.
    pub(crate) fn eval_value(&self, form: &Value, env: &EnvRef) -> Result<Value, YaliError> {
        self.eval(form, env).map_err(|err| match err {
            YaliError::RecurSignal { .. } => YaliError::control_flow(
                "recur may only appear in tail position of a procedure body",
            ),
            other => other,
        })
    }

    fn resolve(&self, sym: &Symbol, env: &EnvRef) -> Result<Value, YaliError> {
        lookup(env, sym).ok_or_else(|| YaliError::unbound(sym.name()))
    }

    /// Evaluates forms in order; only the last one is in tail position.
    pub(crate) fn eval_body(&self, forms: &[Value], env: &EnvRef) -> Result<Value, YaliError> {
        let Some((last, init)) = forms.split_last() else {
            return Ok(Value::Nil);
        };
        for form in init {
            self.eval_value(form, env)?;
        }
        self.eval(last, env)
    }

    fn eval_list(&self, list: &List, env: &EnvRef) -> Result<Value, YaliError> {
        if let Some(form) = list.head_symbol().and_then(SpecialForm::from_symbol) {
            trace!(form = form.name(), "special form");
            return self.eval_special(form, list, env);
        }
        let head = list.head().cloned().unwrap_or(Value::Nil);
        let callee = self.eval_value(&head, env)?;
        if let Value::Proc(closure) = &callee {
            if closure.is_macro {
                let operands: Vector<Value> = list.iter().skip(1).cloned().collect();
                let expansion = self.expand_macro(closure, operands, list.source())?;
                return self.eval(&expansion, env);
            }
        }
        let args = self.eval_operands(&list.operands(), env)?;
        self.apply_at(&callee, args, list.source())
    }

    /// Evaluates call operands left to right, spreading `...expr` (or the
    /// spaced `... expr`) in place.
    pub(crate) fn eval_operands(
        &self,
        operands: &[Value],
        env: &EnvRef,
    ) -> Result<Vec<Value>, YaliError> {
        let mut args = Vec::with_capacity(operands.len());
        let mut iter = operands.iter();
        while let Some(operand) = iter.next() {
            let spread = match spread_operand(operand) {
                Some(inner) => Some(inner),
                None if is_splice_marker(operand) => Some(iter.next().ok_or_else(|| {
                    YaliError::control_flow("... must be followed by the expression to spread")
                })?),
                None => None,
            };
            match spread {
                Some(spread) => {
                    let value = self.eval_value(spread, env)?;
                    args.extend(self.iterate(&value)?);
                }
                None => args.push(self.eval_value(operand, env)?),
            }
        }
        Ok(args)
    }

    /// Applies any callable value to already evaluated arguments.
    pub fn apply(&self, callee: &Value, args: Vec<Value>) -> Result<Value, YaliError> {
        self.apply_at(callee, args, None)
    }

    fn apply_at(
        &self,
        callee: &Value,
        args: Vec<Value>,
        source: Option<&Arc<SourceRef>>,
    ) -> Result<Value, YaliError> {
        match callee {
            Value::Proc(closure) => self.call_closure(closure.clone(), args, None, source),
            Value::Native(native) => self.call_native(native, &args, source),
            Value::Bound(bound) => match &bound.target {
                Value::Proc(closure) => {
                    self.call_closure(closure.clone(), args, Some(bound.receiver.clone()), source)
                }
                Value::Native(native) => {
                    let mut with_receiver = Vec::with_capacity(args.len() + 1);
                    with_receiver.push(bound.receiver.clone());
                    with_receiver.extend(args);
                    self.call_native(native, &with_receiver, source)
                }
                other => self.apply_at(other, args, source),
            },
            Value::Type(tag) => self.construct(tag, &args),
            Value::Interface(iface) => self.dispatch(iface, &args),
            other => {
                let converted = self.coerce_callable(other)?;
                self.apply_at(&converted, args, source)
            }
        }
    }

    fn call_native(
        &self,
        native: &NativeFn,
        args: &[Value],
        source: Option<&Arc<SourceRef>>,
    ) -> Result<Value, YaliError> {
        self.push_frame(native.name().to_string(), source);
        let result = native
            .call(self, args)
            .map_err(|err| self.attach_stack(err));
        self.pop_frame();
        result
    }

    /// Procedure application. A recur signal from the body re-enters this
    /// loop instead of growing the host stack.
    fn call_closure(
        &self,
        closure: Arc<Closure>,
        args: Vec<Value>,
        receiver: Option<Value>,
        source: Option<&Arc<SourceRef>>,
    ) -> Result<Value, YaliError> {
        let mut closure = closure;
        let mut args = args;
        let mut receiver = receiver;
        loop {
            self.push_frame(closure.display_name(), source);
            let result = self
                .run_closure(&closure, args, receiver.take())
                .map_err(|err| self.attach_stack(err));
            self.pop_frame();
            match result {
                Err(YaliError::RecurSignal { target, args: next }) => match target {
                    Value::Proc(next_closure) if !next_closure.is_macro => {
                        closure = next_closure;
                        args = next;
                    }
                    other => return self.apply_at(&other, next, source),
                },
                other => return other,
            }
        }
    }

    fn run_closure(
        &self,
        closure: &Closure,
        args: Vec<Value>,
        receiver: Option<Value>,
    ) -> Result<Value, YaliError> {
        let frame = extend(&closure.env, if closure.is_macro { "macro" } else { "proc" });
        if let Some(receiver) = receiver {
            define(&frame, THIS_SYM.clone(), receiver);
        }
        self.bind_sequence(&closure.params, args, &frame)?;
        self.eval_body(&closure.body, &frame)
    }

    fn expand_macro(
        &self,
        mac: &Arc<Closure>,
        operands: Vector<Value>,
        source: Option<&Arc<SourceRef>>,
    ) -> Result<Value, YaliError> {
        if !self.options.macro_cache {
            return self.call_closure(mac.clone(), operands.into_iter().collect(), None, source);
        }
        let key = MacroKey {
            mac: mac.clone(),
            operands,
        };
        let cached = self.macro_cache.borrow().get(&key).cloned();
        if let Some(expansion) = cached {
            debug!(name = %mac.display_name(), "macro expansion cache hit");
            return Ok(expansion);
        }
        let expansion =
            self.call_closure(mac.clone(), key.operands.iter().cloned().collect(), None, source)?;
        debug!(name = %mac.display_name(), "macro expanded");
        self.macro_cache.borrow_mut().insert(key, expansion.clone());
        Ok(expansion)
    }

    /// Calls an interface on `args`, dispatching on the exact type tags of
    /// its leading arguments.
    pub fn dispatch(&self, iface: &Interface, args: &[Value]) -> Result<Value, YaliError> {
        let key = iface.dispatch_key(args)?;
        match iface.implementation(&key) {
            Some(imp) => self.apply(&imp, args.to_vec()),
            None => Err(iface.not_implemented(&key, &args[..iface.arity()])),
        }
    }

    /// Registers an implementation and runs the interface's on-define hook.
    pub fn define_impl(
        &self,
        iface: &Interface,
        key: Vec<TypeTag>,
        imp: Value,
    ) -> Result<(), YaliError> {
        iface.register(key.clone(), imp.clone())?;
        match iface.on_define() {
            Some(OnDefine::Native(hook)) => hook(&key, &imp),
            Some(OnDefine::Proc(hook)) => {
                let types = Value::list(key.into_iter().map(Value::Type));
                self.apply(hook, vec![types, imp])?;
            }
            None => {}
        }
        Ok(())
    }

    fn eval_special(
        &self,
        form: SpecialForm,
        list: &List,
        env: &EnvRef,
    ) -> Result<Value, YaliError> {
        let ops = list.operands();
        match form {
            SpecialForm::Def => self.eval_def(&ops, env),
            SpecialForm::If => self.eval_if(&ops, env),
            SpecialForm::Do => self.eval_body(&ops, env),
            SpecialForm::Let => self.eval_let(&ops, env),
            SpecialForm::Proc => self.eval_proc(form, &ops, env, false),
            SpecialForm::Macro => self.eval_proc(form, &ops, env, true),
            SpecialForm::MacroExpand => self.eval_macro_expand(&ops, env),
            SpecialForm::Quote => {
                expect_operands(form, &ops, FnArity::exact(1))?;
                Ok(ops[0].clone())
            }
            SpecialForm::QuasiQuote => {
                expect_operands(form, &ops, FnArity::exact(1))?;
                self.quasi(&ops[0], env)
            }
            SpecialForm::Unquote | SpecialForm::UnquoteSplice => Err(YaliError::control_flow(
                format!("{} may only appear inside quasi-quote", form.name()),
            )),
            SpecialForm::Splice => Err(YaliError::control_flow(
                "... may only appear among call operands or inside a binding pattern",
            )),
            SpecialForm::Try => self.eval_try(&ops, env),
            SpecialForm::Catch => Err(YaliError::control_flow(
                "catch may only appear as the last operand of try",
            )),
            SpecialForm::Throw => self.eval_throw(&ops, env),
            SpecialForm::Recur => self.eval_recur(&ops, env),
            SpecialForm::Match => self.eval_match(&ops, env),
            SpecialForm::DefType => self.eval_def_type(&ops, env),
            SpecialForm::DefInterface => self.eval_def_interface(&ops, env),
            SpecialForm::DefImpl => self.eval_def_impl(&ops, env),
            SpecialForm::Dot => self.eval_dot(&ops, env),
        }
    }

    fn eval_def(&self, ops: &[Value], env: &EnvRef) -> Result<Value, YaliError> {
        expect_operands(SpecialForm::Def, ops, FnArity::exact(2))?;
        let Value::Symbol(name) = &ops[0] else {
            return Err(YaliError::type_mismatch(format!(
                "def expects a symbol name, got {}",
                ops[0]
            )));
        };
        let value = self.eval_value(&ops[1], env)?;
        if let Value::Proc(closure) = &value {
            closure.name_once(name);
        }
        define(env, name.clone(), value.clone());
        Ok(value)
    }

    fn eval_if(&self, ops: &[Value], env: &EnvRef) -> Result<Value, YaliError> {
        expect_operands(SpecialForm::If, ops, FnArity::range(0, 3))?;
        let Some(test) = ops.first() else {
            return Ok(Value::Nil);
        };
        let test = self.eval_value(test, env)?;
        let branch = if self.truthy(&test)? {
            ops.get(1)
        } else {
            ops.get(2)
        };
        match branch {
            Some(form) => self.eval(form, env),
            None => Ok(Value::Nil),
        }
    }

    /// Bindings are visible to the value expressions that follow them.
    fn eval_let(&self, ops: &[Value], env: &EnvRef) -> Result<Value, YaliError> {
        expect_operands(SpecialForm::Let, ops, FnArity::at_least(1))?;
        let Value::List(bindings) = &ops[0] else {
            return Err(YaliError::type_mismatch(format!(
                "let expects a list of bindings, got {}",
                ops[0]
            )));
        };
        if bindings.len() % 2 != 0 {
            return Err(YaliError::arity(
                "let bindings must come in pattern/value pairs",
            ));
        }
        let let_env = extend(env, "let");
        let items: Vec<Value> = bindings.iter().cloned().collect();
        for pair in items.chunks(2) {
            let value = self.eval_value(&pair[1], &let_env)?;
            self.bind_pattern(&pair[0], value, &let_env)?;
        }
        self.eval_body(&ops[1..], &let_env)
    }

    fn eval_proc(
        &self,
        form: SpecialForm,
        ops: &[Value],
        env: &EnvRef,
        is_macro: bool,
    ) -> Result<Value, YaliError> {
        expect_operands(form, ops, FnArity::at_least(1))?;
        let Value::List(params) = &ops[0] else {
            return Err(YaliError::type_mismatch(format!(
                "{} expects a parameter list, got {}",
                form.name(),
                ops[0]
            )));
        };
        Ok(Value::Proc(Arc::new(Closure::new(
            params.iter().cloned().collect(),
            ops[1..].to_vec(),
            env.clone(),
            is_macro,
        ))))
    }

    fn eval_macro_expand(&self, ops: &[Value], env: &EnvRef) -> Result<Value, YaliError> {
        expect_operands(SpecialForm::MacroExpand, ops, FnArity::exact(1))?;
        let call = match &ops[0] {
            Value::List(call) if !call.is_empty() => call,
            other => {
                return Err(YaliError::type_mismatch(format!(
                    "macro-expand expects a macro call, got {}",
                    other
                )))
            }
        };
        let head = call.head().cloned().unwrap_or(Value::Nil);
        match self.eval_value(&head, env)? {
            Value::Proc(mac) if mac.is_macro => {
                self.expand_macro(&mac, call.iter().skip(1).cloned().collect(), call.source())
            }
            other => Err(YaliError::type_mismatch(format!(
                "macro-expand expects a macro call, but {} is not a macro",
                other
            ))),
        }
    }

    fn quasi(&self, form: &Value, env: &EnvRef) -> Result<Value, YaliError> {
        let Value::List(list) = form else {
            return Ok(form.clone());
        };
        match list.head_symbol().and_then(SpecialForm::from_symbol) {
            Some(SpecialForm::Unquote) => {
                let inner = unquoted_operand(list, SpecialForm::Unquote)?;
                return self.eval_value(inner, env);
            }
            Some(SpecialForm::UnquoteSplice) => {
                return Err(YaliError::control_flow(
                    "unquote-splice must appear inside a quasi-quoted list",
                ))
            }
            _ => {}
        }
        let splice_sym = SpecialForm::UnquoteSplice.symbol();
        let mut out = Vector::new();
        for item in list.iter() {
            if item.is_form_headed_by(&splice_sym) {
                let inner = item
                    .as_list()
                    .ok_or_else(|| YaliError::control_flow("malformed unquote-splice"))
                    .and_then(|spliced| unquoted_operand(spliced, SpecialForm::UnquoteSplice))?;
                let value = self.eval_value(inner, env)?;
                out.extend(self.iterate(&value)?);
            } else {
                out.push_back(self.quasi(item, env)?);
            }
        }
        Ok(Value::List(List::new(out).with_source(list.source().cloned())))
    }

    fn eval_try(&self, ops: &[Value], env: &EnvRef) -> Result<Value, YaliError> {
        let catch_sym = SpecialForm::Catch.symbol();
        let clause = match ops.last() {
            Some(Value::List(last)) if last.head_symbol() == Some(&catch_sym) => last,
            _ => return self.eval_body(ops, env),
        };
        let body = &ops[..ops.len() - 1];
        let err = match self.eval_body(body, env) {
            Ok(value) => return Ok(value),
            Err(err @ YaliError::RecurSignal { .. }) => return Err(err),
            Err(err) => err,
        };
        debug!(kind = err.kind().name(), "caught error");
        let caught = self.error_value(&err);
        let handler = clause.operands();
        let Some((pattern, handler_body)) = handler.split_first() else {
            return Err(YaliError::arity("catch expects a binding pattern"));
        };
        let catch_env = extend(env, "catch");
        self.bind_pattern(pattern, caught, &catch_env)?;
        self.eval_body(handler_body, &catch_env)
    }

    fn eval_throw(&self, ops: &[Value], env: &EnvRef) -> Result<Value, YaliError> {
        expect_operands(SpecialForm::Throw, ops, FnArity::exact(1))?;
        let value = self.eval_value(&ops[0], env)?;
        let stack = self.stack_snapshot();
        if let Value::Error(err) = &value {
            err.attach_stack(frames_value(&stack));
        }
        Err(YaliError::thrown(value).with_stack(stack))
    }

    fn eval_recur(&self, ops: &[Value], env: &EnvRef) -> Result<Value, YaliError> {
        expect_operands(SpecialForm::Recur, ops, FnArity::exact(1))?;
        let call = match &ops[0] {
            Value::List(call) if !call.is_empty() => call,
            other => {
                return Err(YaliError::control_flow(format!(
                    "recur expects a call form such as (recur (f x)), got {}",
                    other
                )))
            }
        };
        let head = call.head().cloned().unwrap_or(Value::Nil);
        let target = self.eval_value(&head, env)?;
        let args = self.eval_operands(&call.operands(), env)?;
        Err(YaliError::RecurSignal { target, args })
    }

    fn eval_match(&self, ops: &[Value], env: &EnvRef) -> Result<Value, YaliError> {
        expect_operands(SpecialForm::Match, ops, FnArity::at_least(1))?;
        let value = self.eval_value(&ops[0], env)?;
        let clauses = &ops[1..];
        if clauses.len() % 2 != 0 {
            return Err(YaliError::arity("match expects pattern/result pairs"));
        }
        for clause in clauses.chunks(2) {
            let clause_env = extend(env, "match");
            if self.match_pattern(&clause[0], value.clone(), &clause_env)? {
                return self.eval(&clause[1], &clause_env);
            }
        }
        Err(YaliError::match_exhausted(format!(
            "no pattern matched {}",
            value
        )))
    }

    fn eval_def_type(&self, ops: &[Value], env: &EnvRef) -> Result<Value, YaliError> {
        expect_operands(SpecialForm::DefType, ops, FnArity::exact(1))?;
        let names = symbol_list(SpecialForm::DefType, &ops[0])?;
        let Some((name, fields)) = names.split_first() else {
            return Err(YaliError::arity("def-type expects (Name field...)"));
        };
        let ty = Arc::new(RecordType::new(name.clone(), fields.to_vec()));
        debug!(name = %name, id = ty.id(), fields = fields.len(), "declared record type");
        let value = Value::Type(TypeTag::Record(ty));
        define(env, name.clone(), value.clone());
        Ok(value)
    }

    fn eval_def_interface(&self, ops: &[Value], env: &EnvRef) -> Result<Value, YaliError> {
        expect_operands(SpecialForm::DefInterface, ops, FnArity::range(1, 3))?;
        let names = symbol_list(SpecialForm::DefInterface, &ops[0])?;
        let Some((name, params)) = names.split_first() else {
            return Err(YaliError::arity("def-interface expects (name param...)"));
        };
        if params.is_empty() {
            return Err(YaliError::arity(format!(
                "interface {} needs at least one dispatch parameter",
                name
            )));
        }
        let default = self.optional_operand(ops.get(1), env)?;
        let hook = self.optional_operand(ops.get(2), env)?.map(OnDefine::Proc);
        let iface = Value::Interface(Arc::new(Interface::new(
            name.clone(),
            params.to_vec(),
            default,
            hook,
        )));
        define(env, name.clone(), iface.clone());
        Ok(iface)
    }

    fn optional_operand(
        &self,
        form: Option<&Value>,
        env: &EnvRef,
    ) -> Result<Option<Value>, YaliError> {
        match form {
            None => Ok(None),
            Some(form) => match self.eval_value(form, env)? {
                Value::Nil => Ok(None),
                value => Ok(Some(value)),
            },
        }
    }

    fn eval_def_impl(&self, ops: &[Value], env: &EnvRef) -> Result<Value, YaliError> {
        expect_operands(SpecialForm::DefImpl, ops, FnArity::exact(3))?;
        let iface = match self.eval_value(&ops[0], env)? {
            Value::Interface(iface) => iface,
            other => {
                return Err(YaliError::type_mismatch(format!(
                    "def-impl expects an interface, got {}",
                    other
                )))
            }
        };
        let Value::List(types) = &ops[1] else {
            return Err(YaliError::type_mismatch(format!(
                "def-impl expects a list of types, got {}",
                ops[1]
            )));
        };
        let mut key = Vec::with_capacity(types.len());
        for form in types.iter() {
            match self.eval_value(form, env)? {
                Value::Type(tag) => key.push(tag),
                other => {
                    return Err(YaliError::type_mismatch(format!(
                        "def-impl expects types, got {}",
                        other
                    )))
                }
            }
        }
        let imp = self.eval_value(&ops[2], env)?;
        self.define_impl(&iface, key, imp.clone())?;
        Ok(imp)
    }

    fn eval_dot(&self, ops: &[Value], env: &EnvRef) -> Result<Value, YaliError> {
        expect_operands(SpecialForm::Dot, ops, FnArity::at_least(1))?;
        let mut target = self.eval_value(&ops[0], env)?;
        let mut receiver = None;
        for key_form in &ops[1..] {
            let key = match key_form {
                Value::List(_) => self.eval_value(key_form, env)?,
                literal => literal.clone(),
            };
            let next = self.member(&target, &key)?;
            receiver = Some(std::mem::replace(&mut target, next));
        }
        match receiver {
            Some(receiver) if matches!(target, Value::Proc(_) | Value::Native(_)) => {
                Ok(Value::Bound(Arc::new(BoundMethod { receiver, target })))
            }
            _ => Ok(target),
        }
    }

    /// One member-access step. Symbol keys name map entries (as keyword,
    /// string, then symbol), record fields or error parts.
    fn member(&self, target: &Value, key: &Value) -> Result<Value, YaliError> {
        match (target, key) {
            (Value::Map(map), Value::Symbol(sym)) => Ok([
                Value::keyword(sym.name()),
                Value::str(sym.name()),
                key.clone(),
            ]
            .iter()
            .find_map(|candidate| map.get(candidate).cloned())
            .unwrap_or(Value::Nil)),
            _ => self.get(target, key),
        }
    }

    /// Turns a caught error into the value bound by `catch`.
    pub fn error_value(&self, err: &YaliError) -> Value {
        match err {
            YaliError::Thrown(value, _) => value.clone(),
            other => {
                let reified = ErrorValue::new(&other.message(), Value::Nil, Some(other.kind()));
                reified.attach_stack(frames_value(other.stack()));
                Value::Error(Arc::new(reified))
            }
        }
    }
}

fn expect_operands(form: SpecialForm, ops: &[Value], arity: FnArity) -> Result<(), YaliError> {
    if arity.accepts(ops.len()) {
        Ok(())
    } else {
        Err(YaliError::arity(format!(
            "{} expects {} operand(s), got {}",
            form.name(),
            arity.describe(),
            ops.len()
        )))
    }
}

fn unquoted_operand(list: &List, form: SpecialForm) -> Result<&Value, YaliError> {
    if list.len() != 2 {
        return Err(YaliError::arity(format!(
            "{} expects exactly one operand",
            form.name()
        )));
    }
    list.get(1)
        .ok_or_else(|| YaliError::arity(format!("{} expects exactly one operand", form.name())))
}

fn symbol_list(form: SpecialForm, shape: &Value) -> Result<Vec<Symbol>, YaliError> {
    let Value::List(list) = shape else {
        return Err(YaliError::type_mismatch(format!(
            "{} expects a list of symbols, got {}",
            form.name(),
            shape
        )));
    };
    list.iter()
        .map(|item| {
            item.as_symbol().cloned().ok_or_else(|| {
                YaliError::type_mismatch(format!(
                    "{} expects symbols, got {}",
                    form.name(),
                    item
                ))
            })
        })
        .collect()
}

pub(crate) fn is_splice_marker(form: &Value) -> bool {
    matches!(form, Value::Symbol(sym) if is_splice(sym))
}

/// The operand of a `(... x)` form, as read from `...x`.
pub(crate) fn spread_operand(form: &Value) -> Option<&Value> {
    let list = form.as_list()?;
    if list.len() == 2 && list.head_symbol().is_some_and(is_splice) {
        list.get(1)
    } else {
        None
    }
}

pub(crate) fn frames_value(frames: &[StackFrame]) -> Vector<Value> {
    frames
        .iter()
        .rev()
        .map(|frame| Value::str(&frame.describe()))
        .collect()
}

/// Evaluates a form, or every form read from a string, in a fresh child of
/// the global environment. The caller's local frames are not visible.
pub(crate) fn eval_isolated(interp: &Interpreter, form: &Value) -> Result<Value, YaliError> {
    let scratch = extend(interp.global(), "eval");
    match form {
        Value::Str(source) => {
            let mut result = Value::Nil;
            for form in interp.read(source, "<eval>")? {
                result = interp.interpret(&form, &scratch)?;
            }
            Ok(result)
        }
        other => interp.interpret(other, &scratch),
    }
}
