mod common;

use common::{assert_error_contains, assert_printed, eval_err, eval_ok};
use pretty_assertions::assert_eq;
use yali_core::error::YaliError;
use yali_core::Value;

const DOG: &str = "(def-interface (speak x)) (def-type (Dog name)) \
    (def-impl speak (Dog) (proc (d) (Str \"woof \" d.name)))";

fn with_dog(src: &str) -> String {
    format!("{} {}", DOG, src)
}

#[test]
fn dispatch_uses_the_exact_type_of_each_argument() {
    let rex = with_dog("(speak (Dog \"rex\"))");
    assert_printed(&[
        (rex.as_str(), "\"woof rex\""),
        (
            "(def-interface (combine a b)) \
             (def-impl combine (Num Str) (proc (a b) :num-str)) \
             (def-impl combine (Str Num) (proc (a b) :str-num)) \
             [(combine 1 \"a\") (combine \"a\" 1)]",
            "(:num-str :str-num)",
        ),
        (
            "(def-interface (size x)) (def-impl size (Nil) (proc (_) 0)) (size nil)",
            "0",
        ),
    ]);
}

#[test]
fn missing_implementation_names_the_signature() {
    let err = eval_err(&with_dog("(speak 1)"));
    assert!(matches!(err, YaliError::Dispatch(_)), "{}", err);
    let message = err.to_string();
    assert!(message.contains("(speak Num)"), "{}", message);
    assert!(message.contains("(def-impl speak (Num) impl)"), "{}", message);
    assert!(message.contains("Implemented: (speak Dog)"), "{}", message);
}

#[test]
fn defaults_apply_when_no_implementation_matches() {
    assert_printed(&[(
        "(def-interface (describe x) (proc (x) \"thing\")) \
         (def-impl describe (Num) (proc (x) \"number\")) \
         [(describe 1) (describe :k)]",
        "(\"number\" \"thing\")",
    )]);
}

#[test]
fn later_implementations_replace_earlier_ones() {
    assert_printed(&[(
        "(def-interface (f x)) (def-impl f (Num) (proc (x) 1)) (def-impl f (Num) (proc (x) 2)) (f 0)",
        "2",
    )]);
}

#[test]
fn implementations_must_match_the_interface_arity() {
    assert_error_contains(
        &with_dog("(def-impl speak (Num Num) (proc (a b) 1))"),
        "does not conform to the signature (speak x)",
    );
    assert_error_contains(&with_dog("(speak)"), "dispatches on 1 argument(s)");
}

#[test]
fn definition_hooks_see_the_registered_types() {
    assert_printed(&[(
        "(def-interface (tag x y) nil (proc (types imp) (throw types))) \
         (try (def-impl tag (Num Str) (proc (x y) x)) (catch e e))",
        "(Num Str)",
    )]);
    // Registration happens before the hook runs.
    assert_printed(&[(
        "(def-interface (tag x y) nil (proc (types imp) (throw types))) \
         (try (def-impl tag (Num Str) (proc (x y) :tagged)) (catch e nil)) \
         (tag 1 \"a\")",
        ":tagged",
    )]);
}

#[test]
fn interfaces_are_values() {
    assert_printed(&[
        ("(def-interface (area shape)) (interface-name area)", "\"area\""),
        ("(def-interface (area shape)) (interface-signature area)", "(area shape)"),
        ("(def-interface (area shape)) (print area)", "\"#<area::interface>\""),
        (
            "(def-interface (area shape)) (def-impl area (Num) (proc (n) n)) [(impl? area Num) (impl? area Str)]",
            "(true false)",
        ),
        ("(map type-of [1 \"a\" nil :k 'k])", "(Num Str Nil Keyword Sym)"),
    ]);
}

#[test]
fn conversions_dispatch_through_core_interfaces() {
    assert_printed(&[
        (
            "(def-type (Box v)) (def-impl to-Bool (Box) (proc (b) b.v)) (if (Box false) 1 2)",
            "2",
        ),
        (
            "(def-type (Meters n)) (def-impl to-Num (Meters) (proc (m) m.n)) (+ 1 (Meters 2))",
            "3",
        ),
        (
            "(def-type (Name s)) (def-impl to-Str (Name) (proc (n) (Str \"<\" n.s \">\"))) (Str (Name \"x\"))",
            "\"<x>\"",
        ),
        ("(Num \"2.5\")", "2.5"),
        ("(+ 1 true)", "2"),
    ]);
    assert_error_contains(
        "(def-type (Box v)) (def-impl to-Bool (Box) (proc (b) 1)) (if (Box 1) 1 2)",
        "The to-Bool conversion of (Box 1) produced 1, not a Bool!",
    );
    assert_error_contains("(+ 1 :k)", "Cannot convert :k to Num!");
}

#[test]
fn records_can_define_callable_behaviour() {
    assert_printed(&[(
        "(def-type (Adder n)) \
         (def-impl to-Proc (Adder) (proc (a) (proc (x) (+ x a.n)))) \
         ((Adder 5) 10)",
        "15",
    )]);
}

#[test]
fn user_types_can_join_the_iteration_protocol() {
    assert_printed(&[
        (
            "(def-type (Countdown n)) \
             (def-impl empty? (Countdown) (proc (c) (= c.n 0))) \
             (def-impl first (Countdown) (proc (c) c.n)) \
             (def-impl rest (Countdown) (proc (c) (Countdown (- c.n 1)))) \
             (map (proc (x) (* x 10)) (Countdown 3))",
            "(30 20 10)",
        ),
        ("(def-type (Pair a b)) (map (proc (x) x) (Pair 1 2))", "(1 2)"),
    ]);
    assert_error_contains("(map (proc (x) x) 5)", "is not iterable");
}

#[test]
fn record_equality_and_hash_can_be_overridden() {
    assert_printed(&[
        ("(def-type (Pt x y)) (= (Pt 1 2) (Pt 1 2))", "true"),
        ("(def-type (Pt x y)) (= (Pt 1 2) (Pt 1 3))", "false"),
        (
            "(def-type (Pt x y)) (def-impl binary= (Pt Pt) (proc (a b) (= a.x b.x))) \
             [(= (Pt 1 2) (Pt 1 3)) (contains? [(Pt 1 5)] (Pt 1 9))]",
            "(true true)",
        ),
        (
            "(def-type (Pt x y)) (def-impl hash (Pt) (proc (p) p.x)) (= (hash (Pt 1 2)) (hash (Pt 1 3)))",
            "true",
        ),
        ("(= (hash [1 2]) (hash [1 2]))", "true"),
    ]);
}

const P_BY_X: &str = "(def-type (P x y)) \
     (def-impl binary= (P P) (proc (a b) (= (get a 'x) (get b 'x)))) \
     (def-impl hash (P) (proc (p) (hash (get p 'x)))) ";

#[test]
fn map_keys_use_record_equality() {
    let cases = [
        ("[(= (P 1 2) (P 1 3)) (get {(P 1 2) :hit} (P 1 3))]", "(true :hit)"),
        ("(contains? {(P 1 2) :a} (P 1 9))", "true"),
        ("(count (assoc {(P 1 2) :a} (P 1 3) :b))", "1"),
        ("(get (assoc {(P 1 2) :a} (P 1 3) :b) (P 1 0))", ":b"),
        ("(dissoc {(P 1 2) :a :k 1} (P 1 3))", "{:k 1}"),
        ("(count {(P 1 2) :a (P 1 3) :b})", "1"),
        ("(get (conj {} [(P 1 2) :a]) (P 1 7))", ":a"),
        ("(= {(P 1 2) :a} {(P 1 3) :a})", "true"),
        ("(get {(P 2 2) :a} (P 1 2))", "nil"),
    ];
    for (src, expected) in cases {
        let src = format!("{}{}", P_BY_X, src);
        assert_printed(&[(src.as_str(), expected)]);
    }
}

#[test]
fn distinct_record_types_with_the_same_name_do_not_mix() {
    let value = eval_ok(
        "(def-type (T v)) (def old (T 1)) (def-type (T v)) (def-interface (f x)) \
         (def-impl f (T) (proc (x) :new)) (try (f old) (catch e (error-kind e)))",
    );
    assert_eq!(value, Value::keyword("signature"));
}
