mod common;

use common::{assert_error_contains, assert_printed, eval_err, eval_ok, eval_with, run_with_large_stack};
use pretty_assertions::assert_eq;
use yali_core::error::YaliError;
use yali_core::options::EvalOptions;
use yali_core::{eval_source, Interpreter, Value};

#[test]
fn literals_evaluate_to_themselves() {
    assert_printed(&[
        ("nil", "nil"),
        ("3", "3"),
        ("\"s\"", "\"s\""),
        (":k", ":k"),
        ("()", "()"),
        ("[1 [2]]", "(1 (2))"),
        ("{:a 1}", "{:a 1}"),
    ]);
}

#[test]
fn def_binds_and_rebinds_in_the_current_frame() {
    assert_printed(&[
        ("(def x 1) x", "1"),
        ("(do (def x 1) (def x (Str 2 x)) x)", "\"21\""),
        ("(def x 2) (let () (def x 3)) x", "2"),
    ]);
}

#[test]
fn if_follows_truthiness() {
    assert_printed(&[
        ("(if)", "nil"),
        ("(if true 1 2)", "1"),
        ("(if nil 4)", "nil"),
        ("(if 0 :t :f)", ":f"),
        ("(if \"\" :t :f)", ":f"),
        ("(if [0] :t :f)", ":t"),
        ("(if {} :t :f)", ":f"),
    ]);
    assert_printed(&[("(if :k 1 2)", "1"), ("(if (proc () 1) 1 2)", "1")]);
    assert_error_contains("(def-type (Box v)) (if (Box 1) 1 2)", "Cannot convert (Box 1) to Bool!");
}

#[test]
fn str_constructor_prints_its_arguments() {
    assert_printed(&[
        ("(Str nil \"x\" :x 3)", "\"nilx:x3\""),
        ("(Str)", "\"\""),
        ("(Str [1 \"a\"])", "\"(1 \\\"a\\\")\""),
    ]);
}

#[test]
fn let_binds_sequentially() {
    assert_printed(&[
        ("(let (x 1 y (+ x 1)) y)", "2"),
        ("(let (x 1) (let (x 2) x))", "2"),
        ("(def x 1) (let (x 2) x) x", "1"),
    ]);
    assert_error_contains("(let (x) x)", "pattern/value pairs");
}

#[test]
fn procedures_close_over_their_environment() {
    assert_printed(&[
        ("(def add (proc (a) (proc (b) (+ a b)))) ((add 2) 3)", "5"),
        ("((proc (x y) y) 1)", "nil"),
        ("((proc (x) x) 1 2 3)", "1"),
        ("((proc (x y ... rest) rest) ... [:x :y 1 2 3])", "(1 2 3)"),
        ("(def p (proc (x) x)) (print p)", "\"#<p::proc>\""),
        ("(print (proc () 1))", "\"#<anonymous::proc>\""),
    ]);
}

#[test]
fn spread_expands_operands_in_place() {
    assert_printed(&[
        ("(+ ... [1 2] 3)", "6"),
        ("(List 0 ... [1 2] ... [] 3)", "(0 1 2 3)"),
    ]);
    assert_error_contains("(+ 1 ...)", "must be followed");
}

#[test]
fn prefixed_spread_works_in_calls_and_parameters() {
    assert_printed(&[
        ("(def xs [3 4]) (+ ...xs)", "7"),
        ("(def f (proc (a ...rest) rest)) (f 1 2 3)", "(2 3)"),
        ("(List 0 ...[1 2] ...(List 3))", "(0 1 2 3)"),
        ("((macro (x ...rest) ['List ...rest]) z 1 2)", "(1 2)"),
    ]);
    assert_error_contains("(...[1 2])", "call operands");
}

#[test]
fn macros_receive_unevaluated_operands() {
    assert_printed(&[
        ("(def x 4) ((macro () 'x) y z ... rest)", "4"),
        ("((macro (x ... rest) ['List ... rest]) z 1 2 3)", "(1 2 3)"),
        ("(macro-expand ((macro () 'x) x y z ... rest))", "x"),
        (
            "(def unless (macro (c body) `(if ,c nil ,body))) (unless false :ran)",
            ":ran",
        ),
    ]);
    assert_error_contains("(macro-expand (+ 1 2))", "is not a macro");
}

#[test]
fn quasi_quote_fills_holes() {
    assert_printed(&[
        ("(def x 4) `(x y ,x)", "(x y 4)"),
        ("(def x [1 2 3]) `(x y ,,, x)", "(x y 1 2 3)"),
        ("`(a (b ,(+ 1 1)))", "(a (b 2))"),
        ("`plain", "plain"),
    ]);
    assert_error_contains(",x", "inside quasi-quote");
}

#[test]
fn eval_runs_in_a_child_of_the_global_environment() {
    assert_printed(&[
        ("(def x 2) (eval \"(def x 4)\") x", "2"),
        ("(def x 2) (eval \"x\")", "2"),
        ("(eval '(+ 1 2))", "3"),
        ("(let () (def x 4) (try (eval \"x\") (catch e 2)))", "2"),
    ]);
}

#[test]
fn member_access_reads_maps_and_records() {
    assert_printed(&[
        ("(def m {:name \"x\"}) m.name", "\"x\""),
        ("(def m {\"k\" 1}) m.k", "1"),
        ("(def m {:a {:b 2}}) m.a.b", "2"),
        ("(def-type (Pt x y)) (def p (Pt 1 2)) p.y", "2"),
        ("(def l [1 2 3]) (. l 0)", "1"),
    ]);
}

#[test]
fn member_procedures_bind_this() {
    assert_printed(&[(
        "(def obj {:greet (proc () (Str \"hi \" this.name)) :name \"bob\"}) (obj.greet)",
        "\"hi bob\"",
    )]);
}

#[test]
fn dot_access_can_be_disabled() {
    let options = EvalOptions {
        dot_access: false,
        ..EvalOptions::default()
    };
    let value = eval_with("(def a.b 1) a.b", options).expect("dotted symbol");
    assert_eq!(value, Value::Num(1.0));
}

#[test]
fn callable_coercion_through_to_proc() {
    assert_printed(&[
        ("(:a {:a 1})", "1"),
        ("({:a 1} :a)", "1"),
        ("([10 20 30] 1)", "20"),
        ("(let ([[x] ... rest] [[1 2 3] 0 -1]) (rest x))", "-1"),
    ]);
    assert_error_contains("(1 2)", "is not callable");
}

#[test]
fn recur_runs_in_constant_stack() {
    assert_printed(&[
        (
            "(def count-down (proc (n) (if (= n 0) :done (recur (count-down (- n 1)))))) (count-down 100000)",
            ":done",
        ),
        (
            "(def f (proc (x n) (if x (recur (f false (+ n 1))) n))) (f true 3)",
            "4",
        ),
        (
            "(def even? (proc (n) (if (= n 0) true (recur (odd? (- n 1)))))) (def odd? (proc (n) (if (= n 0) false (recur (even? (- n 1)))))) (even? 10001)",
            "false",
        ),
        ("(def f (proc (n) (recur (+ n 1)))) (f 1)", "2"),
    ]);
}

#[test]
fn recur_outside_tail_position_is_rejected() {
    assert_error_contains(
        "(def f (proc (n) (+ 1 (recur (f n))))) (f 1)",
        "tail position",
    );
    assert_error_contains("(recur (+ 1 2))", "outside of a procedure body");
    assert_error_contains("(recur 1)", "call form");
}

#[test]
fn deep_non_tail_recursion_reports_stack_exhaustion() {
    let err = eval_err("(def f (proc (n) (+ 1 (f (- n 1))))) (f 1)");
    assert!(
        matches!(err, YaliError::StackExhausted { .. }),
        "unexpected error: {}",
        err
    );
    assert!(!err.stack().is_empty());
}

#[test]
fn stack_exhaustion_is_reported_on_a_default_thread() {
    let src = "(def f (proc (n) (if (= n 0) 0 (+ 1 (f (- n 1)))))) (f 5000)";
    let err = eval_source(src, None).expect_err("deep recursion");
    assert!(
        matches!(err, YaliError::StackExhausted { .. }),
        "unexpected error: {}",
        err
    );
}

#[test]
fn depth_limit_is_configurable() {
    let options = EvalOptions {
        max_depth: 50,
        ..EvalOptions::default()
    };
    let src = "(def f (proc (n) (if (= n 0) 0 (+ 1 (f (- n 1)))))) (f 100)";
    let err = eval_with(src, options).expect_err("shallow limit");
    assert!(matches!(err, YaliError::StackExhausted { limit: 50, .. }));
    assert_eq!(eval_ok(src), Value::Num(100.0));
}

#[test]
fn unbound_symbols_point_at_the_calling_form() {
    let err = eval_err("(+ 1 undefined)");
    assert!(matches!(err, YaliError::UnboundSymbol { .. }));
    assert_eq!(err.to_string(), "Symbol undefined is not defined!");
    let source = err.source().expect("error location");
    assert_eq!(source.location(), "<anonymous>:1:1");
}

#[test]
fn special_form_operand_counts_are_checked() {
    assert_error_contains("(def x)", "def expects 2 operand(s), got 1");
    assert_error_contains("(quote)", "quote expects 1 operand(s)");
    assert_error_contains("(if 1 2 3 4)", "if expects");
}

#[test]
fn macro_expansions_are_cached_per_call() {
    let (cached, uncached) = run_with_large_stack(|| {
        let src = "(def m (macro (x) `(+ ,x 1))) (m 1) (m 1) (m 2)";
        let interp = Interpreter::new(EvalOptions {
            macro_cache: true,
            ..EvalOptions::default()
        })
        .expect("interpreter");
        let value = interp.eval_str(src).expect("cached macro");
        assert_eq!(value, Value::Num(3.0));
        let cached = interp.macro_cache_len();

        let interp = Interpreter::new(EvalOptions {
            macro_cache: false,
            ..EvalOptions::default()
        })
        .expect("interpreter");
        interp.eval_str(src).expect("uncached macro");
        (cached, interp.macro_cache_len())
    });
    assert_eq!(cached, 2);
    assert_eq!(uncached, 0);
}

#[test]
fn host_defined_globals_are_visible() {
    let value = run_with_large_stack(|| {
        let interp = Interpreter::new(EvalOptions::default()).expect("interpreter");
        interp.define_global("answer", Value::Num(42.0));
        interp.eval_str("(+ answer 1)").expect("host global")
    });
    assert_eq!(value, Value::Num(43.0));
}
