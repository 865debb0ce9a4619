use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{List, Value, Vector};
use crate::error::YaliError;
use crate::scanner::{Scanner, SourceRef};
use crate::symbols::{SpecialForm, Symbol, LIST_SYM, MAP_SYM};

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\s|;[^\n]*)+").expect("whitespace regex"));
static STRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^"(?s:\\.|[^"\\])*""#).expect("string regex"));
static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[^\s#;()\[\]{}"]+"#).expect("token regex"));
static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[+-]?(?:\d+|\.\d+|\d+\.\d+|\d+\.)(?:e[+-]?\d+)?$").expect("number regex")
});

/// Aggregates and prefixes nested deeper than this are rejected.
pub const MAX_NESTING: usize = 1_000;

const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROW_SIZE: usize = 1024 * 1024;

const PREFIXES: [(&str, SpecialForm); 4] = [
    ("'", SpecialForm::Quote),
    ("`", SpecialForm::QuasiQuote),
    (",,,", SpecialForm::UnquoteSplice),
    (",", SpecialForm::Unquote),
];

pub struct Reader {
    scanner: Scanner,
    dot_access: bool,
    depth: usize,
}

impl Reader {
    pub fn new(source: &str, file: &str) -> Self {
        Self {
            scanner: Scanner::new(source, file),
            dot_access: true,
            depth: 0,
        }
    }

    pub fn with_dot_access(mut self, enabled: bool) -> Self {
        self.dot_access = enabled;
        self
    }

    /// Reads every form of the input.
    pub fn read_all(&mut self) -> Result<Vec<Value>, YaliError> {
        let mut forms = Vec::new();
        loop {
            self.skip_whitespace();
            if self.scanner.at_end() {
                return Ok(forms);
            }
            forms.push(self.read_form()?);
        }
    }

    fn skip_whitespace(&mut self) {
        self.scanner.scan_pattern(&WHITESPACE);
    }

    fn read_form(&mut self) -> Result<Value, YaliError> {
        if self.depth >= MAX_NESTING {
            return Err(YaliError::syntax(
                format!("Forms nest deeper than {} levels", MAX_NESTING),
                self.scanner.here(),
            ));
        }
        self.depth += 1;
        let form = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.read_nested());
        self.depth -= 1;
        form
    }

    fn read_nested(&mut self) -> Result<Value, YaliError> {
        self.skip_whitespace();
        if self.scanner.at_end() {
            return Err(YaliError::incomplete(
                "Unexpected end of input",
                self.scanner.here(),
            ));
        }
        if let Some(open) = self.scanner.scan_literal("(") {
            return self.read_sequence(open, ")", None);
        }
        if let Some(open) = self.scanner.scan_literal("[") {
            return self.read_sequence(open, "]", Some(LIST_SYM.clone()));
        }
        if let Some(open) = self.scanner.scan_literal("{") {
            return self.read_sequence(open, "}", Some(MAP_SYM.clone()));
        }
        for (prefix, form) in PREFIXES {
            if let Some(start) = self.scanner.scan_literal(prefix) {
                return self.read_prefixed(start, form);
            }
        }
        if let Some(start) = self.scanner.scan_literal("...") {
            self.skip_whitespace();
            if self.scanner.at_end() || self.closer_ahead() {
                return Ok(Value::Symbol(SpecialForm::Splice.symbol()));
            }
            return self.read_prefixed(start, SpecialForm::Splice);
        }
        if self.scanner.lookahead("\"") {
            let at = self.scanner.here();
            return match self.scanner.scan_pattern(&STRING) {
                Some(literal) => decode_string(&literal),
                None => Err(YaliError::incomplete("Unterminated string literal", at)),
            };
        }
        if let Some(token) = self.scanner.scan_pattern(&TOKEN) {
            return self.classify(&token);
        }
        let at = self.scanner.here();
        let found = self.scanner.peek_char().unwrap_or(' ');
        Err(YaliError::syntax(
            format!("Unexpected character {:?}", found),
            at,
        ))
    }

    /// `'x` style sugar: reads the next form and wraps it as `(form x)`.
    fn read_prefixed(&mut self, start: SourceRef, form: SpecialForm) -> Result<Value, YaliError> {
        let inner = self.read_form()?;
        let source = start.through(&self.scanner.here());
        Ok(Value::List(
            List::new(Vector::from(vec![Value::Symbol(form.symbol()), inner]))
                .with_source(Some(Arc::new(source))),
        ))
    }

    /// A `...` with nothing after it in its list stays a bare marker.
    fn closer_ahead(&self) -> bool {
        [")", "]", "}"].iter().any(|closer| self.scanner.lookahead(closer))
    }

    fn read_sequence(
        &mut self,
        open: SourceRef,
        close: &str,
        constructor: Option<Symbol>,
    ) -> Result<Value, YaliError> {
        let mut items = Vector::new();
        if let Some(sym) = constructor {
            items.push_back(Value::Symbol(sym));
        }
        loop {
            self.skip_whitespace();
            if self.scanner.at_end() {
                return Err(YaliError::incomplete(
                    format!(
                        "Unexpected end of input, {} opened at {} is never closed",
                        open.image(),
                        open.location()
                    ),
                    self.scanner.here(),
                ));
            }
            if let Some(end) = self.scanner.scan_literal(close) {
                let source = open.through(&end);
                return Ok(Value::List(
                    List::new(items).with_source(Some(Arc::new(source))),
                ));
            }
            items.push_back(self.read_form()?);
        }
    }

    fn classify(&self, token: &SourceRef) -> Result<Value, YaliError> {
        let image = token.image();
        if self.dot_access {
            if let Some(segments) = dot_segments(image) {
                let mut items = vec![Value::Symbol(SpecialForm::Dot.symbol())];
                for segment in segments {
                    items.push(classify_atom(segment, token)?);
                }
                return Ok(Value::List(
                    List::new(Vector::from(items)).with_source(Some(Arc::new(token.clone()))),
                ));
            }
        }
        classify_atom(image, token)
    }
}

/// Splits `a.b.c` into its segments. Tokens that are numbers, that start or
/// end with a dot, or that contain an empty segment stay plain symbols.
fn dot_segments(image: &str) -> Option<Vec<&str>> {
    if !image.contains('.')
        || image.starts_with('.')
        || image.ends_with('.')
        || NUMBER.is_match(image)
    {
        return None;
    }
    let segments: Vec<&str> = image.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return None;
    }
    Some(segments)
}

fn classify_atom(image: &str, at: &SourceRef) -> Result<Value, YaliError> {
    match image {
        "nil" => Ok(Value::Nil),
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        "infinity" => Ok(Value::Num(f64::INFINITY)),
        "-infinity" => Ok(Value::Num(f64::NEG_INFINITY)),
        "nan" => Ok(Value::Num(f64::NAN)),
        _ => {
            if let Some(name) = image.strip_prefix(':') {
                return Ok(Value::keyword(name));
            }
            if NUMBER.is_match(image) {
                return image
                    .parse::<f64>()
                    .map(Value::Num)
                    .map_err(|err| {
                        YaliError::syntax(format!("Invalid number {}: {}", image, err), at.clone())
                    });
            }
            Ok(Value::symbol(image))
        }
    }
}

fn decode_string(literal: &SourceRef) -> Result<Value, YaliError> {
    let escaped = literal
        .image()
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t");
    serde_json::from_str::<String>(&escaped)
        .map(Value::from)
        .map_err(|err| {
            YaliError::syntax(format!("Invalid string literal: {}", err), literal.clone())
        })
}

/// Reads all forms of `source`, labelling locations with `file`.
pub fn read(source: &str, file: &str) -> Result<Vec<Value>, YaliError> {
    Reader::new(source, file).read_all()
}
