use crate::ast::{FnArity, Value};
use crate::builtins::{def_builtin, err};
use crate::env::Env;
use crate::eval::eval_isolated;
use crate::printer;
use crate::symbols::Symbol;

pub(crate) fn install(env: &mut Env) {
    def_builtin!(env, "read", FnArity::range(1, 2), |interp, args| {
        let Value::Str(source) = &args[0] else {
            return err(format!("read expects source text, got {}", args[0]));
        };
        let file = match args.get(1) {
            Some(file) => interp.to_str(file)?,
            None => "<read>".to_string(),
        };
        Ok(Value::list(interp.read(source, &file)?))
    });
    def_builtin!(env, "eval", FnArity::exact(1), |interp, args| {
        eval_isolated(interp, &args[0])
    });
    def_builtin!(env, "print", FnArity::exact(1), |_, args| {
        Ok(Value::from(printer::print(&args[0])))
    });
    def_builtin!(env, "color-print", FnArity::exact(1), |_, args| {
        Ok(Value::from(printer::print_colored(&args[0])))
    });
    def_builtin!(env, "unique-sym", FnArity::range(0, 1), |interp, args| {
        let name = match args.first() {
            Some(Value::Symbol(sym)) => sym.name().to_string(),
            Some(other) => interp.to_str(other)?,
            None => "sym".to_string(),
        };
        Ok(Value::Symbol(Symbol::uninterned(&format!("#{}", name))))
    });
}
