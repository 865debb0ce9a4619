use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::ast::Value;
use crate::scanner::SourceRef;
use crate::symbols::Keyword;

pub const ERROR_TAG: &str = "\x1b[31m[ERROR]\x1b[0m";

#[derive(Clone, Debug)]
pub struct StackFrame {
    pub function: String,
    pub source: Option<Arc<SourceRef>>,
}

impl StackFrame {
    pub fn describe(&self) -> String {
        match &self.source {
            Some(source) => format!("{} ({})", self.function, source.location()),
            None => self.function.clone(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ErrorContext {
    pub source: Option<Arc<SourceRef>>,
    pub stack: Vec<StackFrame>,
}

impl ErrorContext {
    fn set_source(&mut self, source: Arc<SourceRef>) {
        if self.source.is_none() {
            self.source = Some(source);
        }
    }

    fn set_stack(&mut self, stack: Vec<StackFrame>) {
        if self.stack.is_empty() && !stack.is_empty() {
            self.stack = stack;
        }
    }
}

#[derive(Clone, Debug)]
pub struct ErrorData {
    pub message: String,
    pub context: ErrorContext,
}

impl ErrorData {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    fn at(message: impl Into<String>, source: SourceRef) -> Self {
        let mut data = Self::new(message);
        data.context.source = Some(Arc::new(source));
        data
    }
}

impl fmt::Display for ErrorData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context.source {
            Some(source) => write!(f, "{} at {}", self.message, source.location()),
            None => write!(f, "{}", self.message),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum YaliError {
    #[error("Syntax error: {0}")]
    Syntax(ErrorData),

    #[error("Incomplete input: {0}")]
    Incomplete(ErrorData),

    #[error("Symbol {name} is not defined!")]
    UnboundSymbol { name: String, context: ErrorContext },

    #[error("Type mismatch: {0}")]
    TypeMismatch(ErrorData),

    #[error("Arity mismatch: {0}")]
    Arity(ErrorData),

    #[error("{0}")]
    Dispatch(ErrorData),

    #[error("Not callable: {0}")]
    NotCallable(ErrorData),

    #[error("Control flow misuse: {0}")]
    ControlFlow(ErrorData),

    #[error("Match exhausted: {0}")]
    MatchExhausted(ErrorData),

    #[error("Thrown: {0}")]
    Thrown(Value, ErrorContext),

    #[error("Stack exhausted: evaluation nested deeper than {limit} levels")]
    StackExhausted { limit: usize, context: ErrorContext },

    #[error("Runtime error: {0}")]
    Runtime(ErrorData),

    #[error("internal recur signal")]
    RecurSignal { target: Value, args: Vec<Value> },
}

impl YaliError {
    pub fn syntax(message: impl Into<String>, at: SourceRef) -> Self {
        YaliError::Syntax(ErrorData::at(message, at))
    }

    pub fn incomplete(message: impl Into<String>, at: SourceRef) -> Self {
        YaliError::Incomplete(ErrorData::at(message, at))
    }

    pub fn unbound(name: impl Into<String>) -> Self {
        YaliError::UnboundSymbol {
            name: name.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        YaliError::TypeMismatch(ErrorData::new(message))
    }

    pub fn arity(message: impl Into<String>) -> Self {
        YaliError::Arity(ErrorData::new(message))
    }

    pub fn dispatch(message: impl Into<String>) -> Self {
        YaliError::Dispatch(ErrorData::new(message))
    }

    pub fn not_callable(message: impl Into<String>) -> Self {
        YaliError::NotCallable(ErrorData::new(message))
    }

    pub fn control_flow(message: impl Into<String>) -> Self {
        YaliError::ControlFlow(ErrorData::new(message))
    }

    pub fn match_exhausted(message: impl Into<String>) -> Self {
        YaliError::MatchExhausted(ErrorData::new(message))
    }

    pub fn thrown(value: Value) -> Self {
        YaliError::Thrown(value, ErrorContext::default())
    }

    pub fn stack_exhausted(limit: usize) -> Self {
        YaliError::StackExhausted {
            limit,
            context: ErrorContext::default(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        YaliError::Runtime(ErrorData::new(message))
    }

    pub fn is_incomplete(&self) -> bool {
        matches!(self, YaliError::Incomplete(_))
    }

    pub fn with_source(mut self, source: Option<&Arc<SourceRef>>) -> Self {
        if let (Some(ctx), Some(source)) = (self.context_mut(), source) {
            ctx.set_source(source.clone());
        }
        self
    }

    pub fn with_stack(mut self, stack: Vec<StackFrame>) -> Self {
        if let Some(ctx) = self.context_mut() {
            ctx.set_stack(stack);
        }
        self
    }

    /// True when a stack snapshot is still wanted for this error.
    pub fn wants_stack(&self) -> bool {
        self.context_ref()
            .map(|ctx| ctx.stack.is_empty())
            .unwrap_or(false)
    }

    pub fn source(&self) -> Option<&Arc<SourceRef>> {
        self.context_ref().and_then(|ctx| ctx.source.as_ref())
    }

    pub fn stack(&self) -> &[StackFrame] {
        self.context_ref()
            .map(|ctx| ctx.stack.as_slice())
            .unwrap_or(&[])
    }

    /// Message without the kind prefix or location suffix.
    pub fn message(&self) -> String {
        match self {
            YaliError::Syntax(data)
            | YaliError::Incomplete(data)
            | YaliError::TypeMismatch(data)
            | YaliError::Arity(data)
            | YaliError::Dispatch(data)
            | YaliError::NotCallable(data)
            | YaliError::ControlFlow(data)
            | YaliError::MatchExhausted(data)
            | YaliError::Runtime(data) => data.message.clone(),
            YaliError::Thrown(Value::Error(err), _) => err.message.to_string(),
            other => other.to_string(),
        }
    }

    /// Stable keyword naming the error kind.
    pub fn kind(&self) -> Keyword {
        Keyword::intern(match self {
            YaliError::Syntax(_) => "syntax",
            YaliError::Incomplete(_) => "incomplete-input",
            YaliError::UnboundSymbol { .. } => "unbound-symbol",
            YaliError::TypeMismatch(_) => "type-mismatch",
            YaliError::Arity(_) => "arity",
            YaliError::Dispatch(_) => "signature",
            YaliError::NotCallable(_) => "not-callable",
            YaliError::ControlFlow(_) => "control-flow",
            YaliError::MatchExhausted(_) => "match-exhausted",
            YaliError::Thrown(..) => "thrown",
            YaliError::StackExhausted { .. } => "stack-exhausted",
            YaliError::Runtime(_) => "runtime",
            YaliError::RecurSignal { .. } => "recur",
        })
    }

    fn context_ref(&self) -> Option<&ErrorContext> {
        match self {
            YaliError::Syntax(data)
            | YaliError::Incomplete(data)
            | YaliError::TypeMismatch(data)
            | YaliError::Arity(data)
            | YaliError::Dispatch(data)
            | YaliError::NotCallable(data)
            | YaliError::ControlFlow(data)
            | YaliError::MatchExhausted(data)
            | YaliError::Runtime(data) => Some(&data.context),
            YaliError::UnboundSymbol { context, .. }
            | YaliError::StackExhausted { context, .. }
            | YaliError::Thrown(_, context) => Some(context),
            YaliError::RecurSignal { .. } => None,
        }
    }

    fn context_mut(&mut self) -> Option<&mut ErrorContext> {
        match self {
            YaliError::Syntax(data)
            | YaliError::Incomplete(data)
            | YaliError::TypeMismatch(data)
            | YaliError::Arity(data)
            | YaliError::Dispatch(data)
            | YaliError::NotCallable(data)
            | YaliError::ControlFlow(data)
            | YaliError::MatchExhausted(data)
            | YaliError::Runtime(data) => Some(&mut data.context),
            YaliError::UnboundSymbol { context, .. }
            | YaliError::StackExhausted { context, .. }
            | YaliError::Thrown(_, context) => Some(context),
            YaliError::RecurSignal { .. } => None,
        }
    }
}

/// Stable keyword naming the kind of `err`.
pub fn error_kind(err: &YaliError) -> Keyword {
    err.kind()
}

/// Renders an error for a terminal: headline, location with snippet, then
/// the logical call stack innermost first.
pub fn format_error(err: &YaliError) -> Vec<String> {
    let mut lines = vec![format!("{} {}", ERROR_TAG, err)];
    if let Some(source) = err.source() {
        if !matches!(err, YaliError::Syntax(_) | YaliError::Incomplete(_)) {
            lines.push(format!("  --> {}", source.location()));
        }
        lines.extend(source.snippet(2));
    }
    for frame in err.stack().iter().rev() {
        lines.push(format!("    at {}", frame.describe()));
    }
    lines
}
