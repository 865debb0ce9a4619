pub mod ast;
mod builtins;
pub mod env;
pub mod error;
pub mod eval;
pub mod interface;
pub mod options;
mod pattern;
pub mod printer;
pub mod reader;
pub mod scanner;
pub mod symbols;
pub mod types;

use error::YaliError;
use options::EvalOptions;

pub use ast::Value;
pub use error::{error_kind, format_error};
pub use eval::Interpreter;
pub use printer::{print, print_colored};
pub use reader::read;

/// Evaluates every form of `src` in a fresh interpreter and returns the
/// value of the last one.
pub fn eval_source(src: &str, options: Option<EvalOptions>) -> Result<Value, YaliError> {
    Interpreter::new(options.unwrap_or_default())?.eval_str(src)
}
