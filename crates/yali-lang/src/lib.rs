use tracing::debug;
use yali_core::error::YaliError;
use yali_core::options::EvalOptions;
use yali_core::{Interpreter, Value};

pub mod io;
pub mod repl;

pub const PRELUDE: &str = include_str!("prelude.yali");
pub const PRELUDE_LABEL: &str = "<prelude>";

/// Builds an interpreter with the I/O builtins bound and, when asked, the
/// prelude evaluated in its global environment.
pub fn create_interpreter(
    options: EvalOptions,
    load_prelude: bool,
) -> Result<Interpreter, YaliError> {
    let interp = Interpreter::new(options)?;
    io::install(&interp);
    if load_prelude {
        let global = interp.global().clone();
        interp.eval_str_in(PRELUDE, PRELUDE_LABEL, &global)?;
        debug!("prelude loaded");
    }
    Ok(interp)
}

/// Evaluates `src` in a fresh interpreter with the prelude loaded.
pub fn eval_with_prelude(src: &str, options: Option<EvalOptions>) -> Result<Value, YaliError> {
    create_interpreter(options.unwrap_or_default(), true)?.eval_str(src)
}
