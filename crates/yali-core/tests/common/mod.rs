#![allow(dead_code)]

use std::thread;

use pretty_assertions::assert_eq;

use yali_core::error::YaliError;
use yali_core::options::EvalOptions;
use yali_core::{eval_source, print, Value};

const TEST_STACK_BYTES: usize = 64 * 1024 * 1024;

/// Runs `f` on a thread with a stack large enough for deep evaluation.
pub fn run_with_large_stack<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    thread::Builder::new()
        .stack_size(TEST_STACK_BYTES)
        .spawn(f)
        .expect("spawn test thread")
        .join()
        .expect("test thread panicked")
}

pub fn eval(src: &str) -> Result<Value, YaliError> {
    let src = src.to_string();
    run_with_large_stack(move || eval_source(&src, None))
}

pub fn eval_with(src: &str, options: EvalOptions) -> Result<Value, YaliError> {
    let src = src.to_string();
    run_with_large_stack(move || eval_source(&src, Some(options)))
}

pub fn eval_ok(src: &str) -> Value {
    eval(src).unwrap_or_else(|err| panic!("failed to evaluate {}: {}", src, err))
}

pub fn eval_err(src: &str) -> YaliError {
    match eval(src) {
        Ok(value) => panic!("expected {} to fail, got {}", src, value),
        Err(err) => err,
    }
}

/// Evaluates `src` and returns the printed form of the result.
pub fn eval_printed(src: &str) -> String {
    print(&eval_ok(src))
}

pub fn assert_printed(cases: &[(&str, &str)]) {
    for (src, expected) in cases {
        assert_eq!(eval_printed(src), *expected, "{}", src);
    }
}

pub fn assert_error_contains(src: &str, needle: &str) {
    let err = eval_err(src);
    assert!(
        err.to_string().contains(needle),
        "unexpected error for {}: {}",
        src,
        err
    );
}
