mod common;

use common::{assert_printed, eval_ok};
use pretty_assertions::assert_eq;
use yali_core::{print, print_colored, read};

#[test]
fn printed_values_read_back() {
    let cases = [
        "(1 \"two\" :three (4.5))",
        "nil",
        "-0.25",
        "(a (b c))",
        "(infinity -infinity nan)",
        "(f ...xs)",
    ];
    for src in cases {
        let forms = read(src, "print.yali").expect("read source");
        let printed = print(&forms[0]);
        assert_eq!(printed, src);
        assert_eq!(read(&printed, "print.yali").expect("read printed"), forms);
    }
}

#[test]
fn opaque_values_print_their_names() {
    assert_printed(&[
        ("(print +)", "\"#<+::proc>\""),
        ("(def m (macro () nil)) (print m)", "\"#<m::macro>\""),
        ("(print (error \"bad\"))", "\"#<Error::\\\"bad\\\">\""),
        ("(def-type (Pt x y)) (print (Pt 1 \"a\"))", "\"(Pt 1 \\\"a\\\")\""),
        ("(print Num)", "\"Num\""),
        ("(print (/ 1 0))", "\"infinity\""),
        ("(print [(/ -1 0) (- (/ 1 0) (/ 1 0))])", "\"(-infinity nan)\""),
    ]);
}

#[test]
fn procedures_keep_their_first_name() {
    assert_printed(&[("(def a (proc () 1)) (def b a) (print b)", "\"#<a::proc>\"")]);
}

#[test]
fn colored_printing_keeps_the_text() {
    let value = eval_ok("[1 :k \"s\"]");
    let colored = print_colored(&value);
    assert!(colored.contains("\u{1b}["), "{:?}", colored);
    for part in ["1", ":k", "\"s\""] {
        assert!(colored.contains(part), "{:?}", colored);
    }
    assert_eq!(print(&value), "(1 :k \"s\")");
}
