mod common;

use common::{assert_error_contains, assert_printed};

#[test]
fn arithmetic_and_comparison() {
    assert_printed(&[
        ("(+)", "0"),
        ("(+ 1 2 3)", "6"),
        ("(+ \"a\" 1 :b)", "\"a1:b\""),
        ("(- 5)", "-5"),
        ("(- 10 1 2)", "7"),
        ("(* 2 3 4)", "24"),
        ("(/ 4)", "0.25"),
        ("(/ 9 3)", "3"),
        ("(% 7 3)", "1"),
        ("(** 2 10)", "1024"),
        ("(floor 2.7)", "2"),
        ("(< 1 2 3)", "true"),
        ("(< 1 3 2)", "false"),
        ("(>= 3 3 1)", "true"),
        ("(< \"a\" \"b\")", "true"),
        ("(= 1 1 1)", "true"),
        ("(= [1 {:a 2}] [1 {:a 2}])", "true"),
        ("(not= 1 2)", "true"),
        ("(not nil)", "true"),
        ("[(num? 1) (num? \"1\") (integer? 2) (integer? 2.5)]", "(true false true false)"),
    ]);
}

#[test]
fn collection_access() {
    assert_printed(&[
        ("(get {:a 1} :a)", "1"),
        ("(get {:a 1} :b :none)", ":none"),
        ("(get [1 2] 5)", "nil"),
        ("(get \"abc\" 1)", "\"b\""),
        ("(count [1 2 3])", "3"),
        ("(count \"héllo\")", "5"),
        ("(count nil)", "0"),
        ("(nth [1 2 3] 2)", "3"),
        ("(nth [1 2 3] 7 :missing)", ":missing"),
        ("(contains? {:a 1} :a)", "true"),
        ("(contains? [1 2] 3)", "false"),
        ("(keys {:a 1})", "(:a)"),
        ("(vals {:a 1})", "(1)"),
    ]);
    assert_error_contains("(nth [1] 4)", "nth index 4 is out of range");
}

#[test]
fn collection_building() {
    assert_printed(&[
        ("(cons 0 [1 2])", "(0 1 2)"),
        ("(conj [1] 2 3)", "(1 2 3)"),
        ("(conj nil 1)", "(1)"),
        ("(conj {} [:a 1])", "{:a 1}"),
        ("(concat [1] nil [2 3])", "(1 2 3)"),
        ("(assoc {} :a 1)", "{:a 1}"),
        ("(assoc [1 2] 1 :x)", "(1 :x)"),
        ("(assoc [1 2] 2 3)", "(1 2 3)"),
        ("(dissoc {:a 1} :a)", "{}"),
        ("(flatten [[1 2] [3] []])", "(1 2 3)"),
        ("(chunk 2 [1 2 3 4 5])", "((1 2) (3 4) (5))"),
    ]);
    assert_error_contains("(assoc [1] 5 2)", "out of range");
}

#[test]
fn higher_order_procedures() {
    assert_printed(&[
        ("(map (proc (x) (* x x)) [1 2 3])", "(1 4 9)"),
        ("(map :a [{:a 1} {:a 2}])", "(1 2)"),
        ("(filter (proc (x) (> x 1)) [1 2 3])", "(2 3)"),
        ("(reduce + 0 [1 2 3 4])", "10"),
        ("(apply + 1 [2 3])", "6"),
        ("(for-each (proc (x) x) [1 2 3])", "3"),
        ("(map (proc (entry) (first entry)) {:only 1})", "(:only)"),
        ("(map (proc (c) c) \"ab\")", "(\"a\" \"b\")"),
    ]);
}

#[test]
fn reflection() {
    assert_printed(&[
        ("(read \"(a b) c\")", "((a b) c)"),
        ("(type-name (type-of 1))", "\"Num\""),
        ("(assert-type Num 1)", "1"),
        ("(Sym \"abc\")", "abc"),
        ("(Keyword \"abc\")", ":abc"),
        ("(= (unique-sym) (unique-sym))", "false"),
        ("(def-type (Pt x y)) Pt.fields", "(x y)"),
    ]);
    assert_error_contains("(assert-type Str 1)", "Expected type: Str, but received: 1!");
    assert_error_contains("(Sym \"#x\")", "reserved for unique-sym");
}
