mod common;

use common::{assert_error_contains, assert_printed, eval_err};
use yali_core::error::YaliError;

#[test]
fn sequence_patterns_destructure_iterables() {
    assert_printed(&[
        ("(let ([a b] [1 2]) (+ a b))", "3"),
        ("(let ([first ... rest] [1 2 3]) rest)", "(2 3)"),
        ("(let ([a ...more] [1 2 3]) more)", "(2 3)"),
        ("(let ([a ...[b c]] [1 2 3]) (+ b c))", "5"),
        ("(let ([a b c] [1]) [a b c])", "(1 nil nil)"),
        ("(let ([a] [1 2 3]) a)", "1"),
        ("(let ([a [b c]] [1 [2 3]]) (Str a b c))", "\"123\""),
        ("(let ([k v] (first (List ... {:only 1}))) v)", "1"),
    ]);
}

#[test]
fn map_patterns_read_keys_with_get() {
    assert_printed(&[
        ("(let ({ :x x :y y :z z } {:x 4 :z :z}) (Str y z))", "\"nil:z\""),
        ("(let ({ 2 x } [1 2 3]) x)", "3"),
        ("(def-type (Pt x y)) (let ({ :y y } (Pt 1 2)) y)", "2"),
    ]);
}

#[test]
fn typed_patterns_check_the_constructor() {
    assert_printed(&[
        ("(def-type (Pt x y)) (let ((Pt a b) (Pt 3 4)) (* a b))", "12"),
        ("(let ((List a) [5]) a)", "5"),
    ]);
    assert_error_contains(
        "(def-type (Pt x y)) (let ((Pt a b) [1 2]) a)",
        "Expected a Pt",
    );
}

#[test]
fn literal_patterns_must_be_equal() {
    assert_printed(&[("(let ([1 x] [1 2]) x)", "2")]);
    assert_error_contains("(let ([1 x] [3 2]) x)", "Cannot bind value 3 to pattern 1");
}

#[test]
fn catch_binds_with_a_pattern() {
    assert_printed(&[(
        "(try (throw [1 2]) (catch [a b] (+ a b)))",
        "3",
    )]);
}

#[test]
fn match_takes_the_first_matching_clause() {
    assert_printed(&[
        ("(match [1 2] [a b] (+ a b) _ 0)", "3"),
        ("(match 5 1 :one 5 :five)", ":five"),
        ("(match [1 2 3] [a b] 1 [a b c] 2)", "2"),
        ("(match [1] [a b] 1 [a] 2)", "2"),
        ("(match 'a 'a 1 _ 2)", "1"),
        ("(match :k 'k 1 _ 2)", "2"),
        ("(def-type (Pt x y)) (match [1 2] (Pt a b) :pt [a b] (+ a b))", "3"),
        ("(def-type (Pt x y)) (match (Pt 1 2) (Pt a b) (+ a b))", "3"),
        ("(match {:x 1} { :x 2 } :two { :x x } x)", "1"),
        ("(match 3 { :x x } x _ :other)", ":other"),
        ("(match [1 2 3] [h ... t] t)", "(2 3)"),
    ]);
}

#[test]
fn match_clause_bindings_do_not_leak() {
    assert_error_contains("(match [1 2] [a 3] a [b c] b) a", "Symbol a is not defined!");
}

#[test]
fn exhausted_match_is_an_error() {
    let err = eval_err("(match 3 1 :one)");
    assert!(matches!(err, YaliError::MatchExhausted(_)), "{}", err);
    assert!(err.to_string().contains("no pattern matched 3"), "{}", err);
}

#[test]
fn dangling_splice_in_a_pattern_is_rejected() {
    assert_error_contains("(let ([a ...] [1 2]) a)", "must be followed");
    assert_error_contains("(let (...rest [1 2]) rest)", "sequence pattern");
}
