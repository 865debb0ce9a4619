use std::fs::OpenOptions;
use std::io::Write;
use std::process::{Command, Stdio};

use tracing::debug;
use yali_core::ast::{FnArity, Value};
use yali_core::error::YaliError;
use yali_core::Interpreter;

fn def_io(
    interp: &Interpreter,
    name: &str,
    arity: FnArity,
    func: impl Fn(&Interpreter, &[Value]) -> Result<Value, YaliError> + Send + Sync + 'static,
) {
    interp.define_global(name, Value::native(name, arity, func));
}

fn path_arg(interp: &Interpreter, name: &str, value: &Value) -> Result<String, YaliError> {
    match value {
        Value::Str(path) => Ok(path.to_string()),
        Value::Symbol(_) | Value::Keyword(_) => interp.to_str(value),
        other => Err(YaliError::type_mismatch(format!(
            "{} expects a path string, got {}",
            name, other
        ))),
    }
}

/// Binds `println`, `read-file`, `write-file` and `exec`.
pub fn install(interp: &Interpreter) {
    def_io(interp, "println", FnArity::at_least(0), |interp, args| {
        let mut rendered = Vec::with_capacity(args.len());
        for arg in args {
            rendered.push(interp.to_str(arg)?);
        }
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", rendered.join(" "))
            .map_err(|e| YaliError::runtime(format!("println failed: {}", e)))?;
        Ok(Value::Nil)
    });
    def_io(interp, "read-file", FnArity::exact(1), |interp, args| {
        let path = path_arg(interp, "read-file", &args[0])?;
        std::fs::read_to_string(&path)
            .map(Value::from)
            .map_err(|e| YaliError::runtime(format!("read-file {} failed: {}", path, e)))
    });
    // (write-file path content) truncates; a third argument "a" appends.
    def_io(interp, "write-file", FnArity::range(2, 3), |interp, args| {
        let path = path_arg(interp, "write-file", &args[0])?;
        let content = interp.to_str(&args[1])?;
        let append = match args.get(2) {
            None | Some(Value::Nil) => false,
            Some(flag) => interp.to_str(flag)? == "a",
        };
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .append(append)
            .truncate(!append)
            .open(&path)
            .map_err(|e| YaliError::runtime(format!("write-file {} failed: {}", path, e)))?;
        file.write_all(content.as_bytes())
            .map_err(|e| YaliError::runtime(format!("write-file {} failed: {}", path, e)))?;
        Ok(Value::from(path))
    });
    def_io(interp, "exec", FnArity::at_least(1), |interp, args| {
        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            parts.push(interp.to_str(arg)?);
        }
        let command_line = parts.join(" ");
        debug!(command = %command_line, "exec");
        let output = shell(&command_line)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| YaliError::runtime(format!("exec failed to start: {}", e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(YaliError::runtime(format!(
                "exec `{}` exited with {}: {}",
                command_line,
                output.status,
                stderr.trim_end()
            )));
        }
        Ok(Value::from(
            String::from_utf8_lossy(&output.stdout).into_owned(),
        ))
    });
}

#[cfg(windows)]
fn shell(command_line: &str) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", command_line]);
    command
}

#[cfg(not(windows))]
fn shell(command_line: &str) -> Command {
    let mut command = Command::new("sh");
    command.args(["-c", command_line]);
    command
}
