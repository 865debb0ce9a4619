use std::env;

pub const DEFAULT_MAX_DEPTH: usize = 2_000;
pub const DEFAULT_SOURCE_NAME: &str = "<anonymous>";

fn env_flag(name: &str) -> Option<bool> {
    let value = env::var(name).ok()?;
    Some(matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    ))
}

pub fn max_depth_from_env() -> usize {
    env::var("YALI_MAX_DEPTH")
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|depth| *depth > 0)
        .unwrap_or(DEFAULT_MAX_DEPTH)
}

pub fn macro_cache_from_env() -> bool {
    env_flag("YALI_MACRO_CACHE").unwrap_or(true)
}

#[derive(Clone, Debug)]
pub struct EvalOptions {
    /// Evaluation nesting at which deep non-tail recursion is reported as
    /// stack exhaustion.
    pub max_depth: usize,
    pub macro_cache: bool,
    /// Rewrite `a.b.c` tokens into member-access forms while reading.
    pub dot_access: bool,
    pub source_name: Option<String>,
}

impl EvalOptions {
    pub fn source_label(&self) -> &str {
        self.source_name.as_deref().unwrap_or(DEFAULT_SOURCE_NAME)
    }
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            max_depth: max_depth_from_env(),
            macro_cache: macro_cache_from_env(),
            dot_access: true,
            source_name: None,
        }
    }
}
