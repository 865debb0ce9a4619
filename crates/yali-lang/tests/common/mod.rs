#![allow(dead_code)]

use std::thread;

use pretty_assertions::assert_eq;

use yali_core::error::YaliError;
use yali_core::print;
use yali_lang::eval_with_prelude;

const TEST_STACK_BYTES: usize = 64 * 1024 * 1024;

pub fn eval(src: &str) -> Result<String, YaliError> {
    let src = src.to_string();
    thread::Builder::new()
        .stack_size(TEST_STACK_BYTES)
        .spawn(move || eval_with_prelude(&src, None).map(|value| print(&value)))
        .expect("spawn test thread")
        .join()
        .expect("test thread panicked")
}

pub fn assert_printed(cases: &[(&str, &str)]) {
    for (src, expected) in cases {
        let out = eval(src).unwrap_or_else(|err| panic!("failed to evaluate {}: {}", src, err));
        assert_eq!(out, *expected, "{}", src);
    }
}
