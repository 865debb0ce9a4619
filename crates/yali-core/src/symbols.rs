use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::Lazy;

static SYMBOL_TABLE: Lazy<Mutex<HashSet<Arc<str>>>> = Lazy::new(|| Mutex::new(HashSet::new()));
static KEYWORD_TABLE: Lazy<Mutex<HashSet<Arc<str>>>> = Lazy::new(|| Mutex::new(HashSet::new()));

fn intern_in(table: &Mutex<HashSet<Arc<str>>>, name: &str) -> Arc<str> {
    let mut guard = table.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(existing) = guard.get(name) {
        return existing.clone();
    }
    let shared: Arc<str> = Arc::from(name);
    guard.insert(shared.clone());
    shared
}

/// Number of distinct interned symbol names. Interned names live for the
/// rest of the process.
pub fn interned_symbol_count() -> usize {
    SYMBOL_TABLE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .len()
}

/// A symbol compared by identity. Interned symbols with equal names share one
/// allocation; symbols made by [`Symbol::uninterned`] equal only themselves.
#[derive(Clone)]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn intern(name: &str) -> Self {
        Symbol(intern_in(&SYMBOL_TABLE, name))
    }

    pub fn uninterned(name: &str) -> Self {
        Symbol(Arc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_interned(&self) -> bool {
        let guard = SYMBOL_TABLE.lock().unwrap_or_else(PoisonError::into_inner);
        guard
            .get(self.name())
            .map(|shared| Arc::ptr_eq(shared, &self.0))
            .unwrap_or(false)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A self-evaluating keyword such as `:x`, interned like [`Symbol`].
#[derive(Clone)]
pub struct Keyword(Arc<str>);

impl Keyword {
    pub fn intern(name: &str) -> Self {
        Keyword(intern_in(&KEYWORD_TABLE, name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Keyword {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Keyword {}

impl Hash for Keyword {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Debug for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpecialForm {
    Def,
    If,
    Do,
    Let,
    Proc,
    Macro,
    MacroExpand,
    Quote,
    QuasiQuote,
    Unquote,
    UnquoteSplice,
    Splice,
    Try,
    Catch,
    Throw,
    Recur,
    Match,
    DefType,
    DefInterface,
    DefImpl,
    Dot,
}

impl SpecialForm {
    pub const ALL: [SpecialForm; 21] = [
        SpecialForm::Def,
        SpecialForm::If,
        SpecialForm::Do,
        SpecialForm::Let,
        SpecialForm::Proc,
        SpecialForm::Macro,
        SpecialForm::MacroExpand,
        SpecialForm::Quote,
        SpecialForm::QuasiQuote,
        SpecialForm::Unquote,
        SpecialForm::UnquoteSplice,
        SpecialForm::Splice,
        SpecialForm::Try,
        SpecialForm::Catch,
        SpecialForm::Throw,
        SpecialForm::Recur,
        SpecialForm::Match,
        SpecialForm::DefType,
        SpecialForm::DefInterface,
        SpecialForm::DefImpl,
        SpecialForm::Dot,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SpecialForm::Def => "def",
            SpecialForm::If => "if",
            SpecialForm::Do => "do",
            SpecialForm::Let => "let",
            SpecialForm::Proc => "proc",
            SpecialForm::Macro => "macro",
            SpecialForm::MacroExpand => "macro-expand",
            SpecialForm::Quote => "quote",
            SpecialForm::QuasiQuote => "quasi-quote",
            SpecialForm::Unquote => "unquote",
            SpecialForm::UnquoteSplice => "unquote-splice",
            SpecialForm::Splice => "...",
            SpecialForm::Try => "try",
            SpecialForm::Catch => "catch",
            SpecialForm::Throw => "throw",
            SpecialForm::Recur => "recur",
            SpecialForm::Match => "match",
            SpecialForm::DefType => "def-type",
            SpecialForm::DefInterface => "def-interface",
            SpecialForm::DefImpl => "def-impl",
            SpecialForm::Dot => ".",
        }
    }

    /// Recognizes a special form by the identity of its interned head symbol.
    pub fn from_symbol(sym: &Symbol) -> Option<SpecialForm> {
        SPECIAL_FORMS.get(sym).copied()
    }

    pub fn symbol(self) -> Symbol {
        Symbol::intern(self.name())
    }
}

static SPECIAL_FORMS: Lazy<HashMap<Symbol, SpecialForm>> = Lazy::new(|| {
    SpecialForm::ALL
        .iter()
        .map(|form| (Symbol::intern(form.name()), *form))
        .collect()
});

pub static LIST_SYM: Lazy<Symbol> = Lazy::new(|| Symbol::intern("List"));
pub static MAP_SYM: Lazy<Symbol> = Lazy::new(|| Symbol::intern("Map"));
pub static THIS_SYM: Lazy<Symbol> = Lazy::new(|| Symbol::intern("this"));

pub fn splice_symbol() -> Symbol {
    SpecialForm::Splice.symbol()
}

pub fn is_splice(sym: &Symbol) -> bool {
    SpecialForm::from_symbol(sym) == Some(SpecialForm::Splice)
}
