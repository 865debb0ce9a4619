use std::borrow::Cow;
use std::env;
use std::path::PathBuf;

use nu_ansi_term::{Color, Style};
use reedline::{
    FileBackedHistory, Prompt, PromptEditMode, PromptHistorySearch, Reedline, Signal,
    ValidationResult, Validator,
};
use yali_core::env::extend;
use yali_core::error::{YaliError, ERROR_TAG};
use yali_core::{format_error, print_colored, read, Interpreter};

const HISTORY_SIZE: usize = 1_000;
const REPL_SOURCE: &str = "<repl>";

struct ReplPrompt {
    seq: usize,
}

impl ReplPrompt {
    fn label(&self) -> String {
        format!("yali:{:03}", self.seq)
    }
}

impl Prompt for ReplPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Owned(self.label())
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _prompt_mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed("> ")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Owned(format!("{}* ", self.label()))
    }

    fn render_prompt_history_search_indicator(
        &self,
        _history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        Cow::Borrowed("(search) ")
    }
}

/// Keeps the editor open while the buffer is an unfinished form.
struct ReplValidator;

impl Validator for ReplValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        match read(line, REPL_SOURCE) {
            Err(err) if err.is_incomplete() => ValidationResult::Incomplete,
            _ => ValidationResult::Complete,
        }
    }
}

fn history_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("YALI_HISTORY") {
        return Some(PathBuf::from(path));
    }
    env::var_os("HOME").map(|home| PathBuf::from(home).join(".yali_history"))
}

pub fn print_error(err: &YaliError) {
    for line in format_error(err) {
        eprintln!("{}", line);
    }
}

/// Runs the interactive loop. Input is evaluated in a child of the global
/// environment so REPL definitions shadow, not replace, globals.
pub fn interactive_repl(interp: &Interpreter) {
    let repl_env = extend(interp.global(), "repl");
    let mut rl = Reedline::create().with_validator(Box::new(ReplValidator));
    let history = history_path()
        .and_then(|path| FileBackedHistory::with_file(HISTORY_SIZE, path).ok());
    if let Some(history) = history {
        rl = rl.with_history(Box::new(history));
    }

    let hint = Style::new().fg(Color::DarkGray);
    println!("{}", hint.paint("yali REPL. :q or Ctrl-D to quit."));
    let mut seq = 1usize;
    loop {
        let prompt = ReplPrompt { seq };
        match rl.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if matches!(trimmed, ":q" | ":quit") {
                    break;
                }
                match interp.eval_str_in(&line, REPL_SOURCE, &repl_env) {
                    Ok(value) => println!("{}", print_colored(&value)),
                    Err(err) => print_error(&err),
                }
                seq += 1;
            }
            Ok(Signal::CtrlC) => println!("; interrupted"),
            Ok(Signal::CtrlD) => break,
            Err(err) => {
                eprintln!("{} repl: {}", ERROR_TAG, err);
                break;
            }
        }
    }
}
