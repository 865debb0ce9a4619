mod common;

use common::{assert_error_contains, assert_printed, eval_err, eval_ok};
use pretty_assertions::assert_eq;
use yali_core::error::YaliError;
use yali_core::{error_kind, format_error, Value};

#[test]
fn try_returns_the_body_value_without_errors() {
    assert_printed(&[
        ("(try 1 2 3)", "3"),
        ("(try (+ 1 1) (catch e :caught))", "2"),
        ("(try)", "nil"),
    ]);
}

#[test]
fn thrown_values_reach_catch_unchanged() {
    assert_printed(&[
        ("(try (throw 42) (catch e e))", "42"),
        ("(try (throw (error \"test\")) (catch e (get-message e)))", "\"test\""),
        ("(try (throw (error \"m\" {:a 1})) (catch e (get-data e)))", "{:a 1}"),
        (
            "(try (throw (error \"m\" nil :custom)) (catch e (error-kind e)))",
            ":custom",
        ),
        ("(try (throw (error \"m\")) (catch e e.message))", "\"m\""),
    ]);
}

#[test]
fn evaluator_errors_are_reified_with_their_kind() {
    assert_printed(&[
        ("(try undefined-thing (catch e (error-kind e)))", ":unbound-symbol"),
        (
            "(try undefined-thing (catch e (get-message e)))",
            "\"Symbol undefined-thing is not defined!\"",
        ),
        ("(try (+ 1 :k) (catch e (error-kind e)))", ":type-mismatch"),
        ("(try (match 1 2 3) (catch e (error-kind e)))", ":match-exhausted"),
        ("(try (1 2) (catch e (error-kind e)))", ":not-callable"),
        ("(try (read \"(a\") (catch e (error-kind e)))", ":incomplete-input"),
        ("(try (error? (error \"x\")) (catch e e))", "true"),
    ]);
}

#[test]
fn stack_exhaustion_is_catchable() {
    assert_printed(&[(
        "(def f (proc (n) (+ 1 (f (- n 1))))) (try (f 1) (catch e (error-kind e)))",
        ":stack-exhausted",
    )]);
    // The interpreter keeps working after unwinding.
    assert_printed(&[(
        "(def f (proc (n) (+ 1 (f (- n 1))))) (try (f 1) (catch e nil)) (+ 1 2)",
        "3",
    )]);
}

#[test]
fn thrown_errors_carry_the_call_stack_innermost_first() {
    let value = eval_ok(
        "(def inner (proc () (throw (error \"boom\")))) \
         (def outer (proc () (inner))) \
         (try (outer) (catch e (get-stack e)))",
    );
    let Value::List(frames) = value else {
        panic!("expected a list of frames, got {}", value);
    };
    let described: Vec<String> = frames.iter().map(|frame| frame.to_string()).collect();
    assert_eq!(described.len(), 2, "{:?}", described);
    assert!(described[0].starts_with("\"inner"), "{:?}", described);
    assert!(described[1].starts_with("\"outer"), "{:?}", described);
}

#[test]
fn uncaught_errors_keep_the_stack_and_location() {
    let err = eval_err("(def f (proc (x) (+ x :k)))\n(f 1)");
    assert!(matches!(err, YaliError::TypeMismatch(_)), "{}", err);
    let functions: Vec<&str> = err.stack().iter().map(|frame| frame.function.as_str()).collect();
    assert_eq!(functions, vec!["f", "+"]);
    let lines = format_error(&err);
    assert!(lines[0].contains("Cannot convert :k to Num!"), "{:?}", lines);
    assert!(lines.iter().any(|line| line.contains("--> <anonymous>:1:")), "{:?}", lines);
    assert!(lines.iter().any(|line| line.contains("    at + (")), "{:?}", lines);
    assert!(lines.last().is_some_and(|line| line.starts_with("    at f (")), "{:?}", lines);
}

#[test]
fn uncaught_throw_reports_the_value() {
    let err = eval_err("(throw (error \"bad\"))");
    assert_eq!(error_kind(&err).name(), "thrown");
    assert_eq!(err.message(), "bad");
    assert_error_contains("(throw 7)", "Thrown: 7");
}

#[test]
fn catch_outside_try_is_rejected() {
    assert_error_contains("(catch e 1)", "catch may only appear as the last operand of try");
}

#[test]
fn recur_passes_through_try() {
    assert_printed(&[(
        "(def loop (proc (n) (try (if (= n 0) :done (recur (loop (- n 1)))) (catch e :failed)))) (loop 5000)",
        ":done",
    )]);
}
