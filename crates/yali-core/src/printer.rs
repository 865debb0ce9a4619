use nu_ansi_term::{Color, Style};

use crate::ast::Value;
use crate::symbols::is_splice;

#[derive(Clone, Copy)]
enum Token {
    Nil,
    Bool,
    Num,
    Str,
    Sym,
    Keyword,
    Punct,
    Opaque,
}

impl Token {
    fn style(self) -> Option<Style> {
        let color = match self {
            Token::Nil | Token::Bool => Color::Red,
            Token::Num => Color::Yellow,
            Token::Str | Token::Keyword => Color::Green,
            Token::Punct => Color::Magenta,
            Token::Opaque => Color::Blue,
            Token::Sym => return None,
        };
        Some(Style::new().fg(color))
    }
}

/// Renders values as re-readable source text. Values currently being
/// printed are kept on a stack; meeting one of them again prints `...`.
struct Printer {
    colored: bool,
    active: Vec<Value>,
    out: String,
}

impl Printer {
    fn new(colored: bool) -> Self {
        Self {
            colored,
            active: Vec::new(),
            out: String::new(),
        }
    }

    fn emit(&mut self, token: Token, text: &str) {
        if text.is_empty() {
            return;
        }
        match token.style().filter(|_| self.colored) {
            Some(style) => self.out.push_str(&style.paint(text).to_string()),
            None => self.out.push_str(text),
        }
    }

    fn render(&mut self, value: &Value) {
        if self.active.iter().any(|seen| seen.same_identity(value)) {
            self.emit(Token::Punct, "...");
            return;
        }
        match value {
            Value::Nil => self.emit(Token::Nil, "nil"),
            Value::Bool(b) => self.emit(Token::Bool, if *b { "true" } else { "false" }),
            Value::Num(n) => self.emit(Token::Num, &format_num(*n)),
            Value::Str(s) => self.emit(Token::Str, &quote(s)),
            Value::Symbol(sym) => self.emit(Token::Sym, sym.name()),
            Value::Keyword(kw) => self.emit(Token::Keyword, &format!(":{}", kw.name())),
            Value::List(list) if list.len() == 2 && list.head_symbol().is_some_and(is_splice) => {
                self.nested(value, "...", "", |printer| {
                    if let Some(spread) = list.get(1) {
                        printer.render(spread);
                    }
                });
            }
            Value::List(list) => {
                self.nested(value, "(", ")", |printer| {
                    printer.render_spaced(list.iter());
                });
            }
            Value::Map(map) => {
                self.nested(value, "{", "}", |printer| {
                    printer.render_spaced(map.iter().flat_map(|(k, v)| [k, v]));
                });
            }
            Value::Record(record) => {
                self.nested(value, "(", ")", |printer| {
                    printer.emit(Token::Sym, record.ty.name().name());
                    for field in &record.values {
                        printer.out.push(' ');
                        printer.render(field);
                    }
                });
            }
            Value::Type(tag) => self.emit(Token::Sym, tag.name()),
            Value::Proc(closure) => {
                let kind = if closure.is_macro { "macro" } else { "proc" };
                self.emit(
                    Token::Opaque,
                    &format!("#<{}::{}>", closure.display_name(), kind),
                );
            }
            Value::Native(native) => {
                self.emit(Token::Opaque, &format!("#<{}::proc>", native.name()))
            }
            Value::Bound(bound) => self.render(&bound.target),
            Value::Interface(iface) => {
                self.emit(Token::Opaque, &format!("#<{}::interface>", iface.name()))
            }
            Value::Error(err) => {
                self.emit(Token::Opaque, &format!("#<Error::{}>", quote(&err.message)))
            }
        }
    }

    fn nested(&mut self, value: &Value, open: &str, close: &str, body: impl FnOnce(&mut Self)) {
        self.active.push(value.clone());
        self.emit(Token::Punct, open);
        body(self);
        self.emit(Token::Punct, close);
        self.active.pop();
    }

    fn render_spaced<'a>(&mut self, items: impl Iterator<Item = &'a Value>) {
        for (idx, item) in items.enumerate() {
            if idx > 0 {
                self.out.push(' ');
            }
            self.render(item);
        }
    }
}

fn format_num(n: f64) -> String {
    if n.is_nan() {
        "nan".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "infinity" } else { "-infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{}", n)
    }
}

fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("{:?}", text))
}

pub fn print(value: &Value) -> String {
    let mut printer = Printer::new(false);
    printer.render(value);
    printer.out
}

pub fn print_colored(value: &Value) -> String {
    let mut printer = Printer::new(true);
    printer.render(value);
    printer.out
}
