use pretty_assertions::assert_eq;
use yali_core::error::YaliError;
use yali_core::reader::Reader;
use yali_core::{print, read, Value};

fn read_printed(src: &str) -> Vec<String> {
    read(src, "test.yali")
        .unwrap_or_else(|err| panic!("failed to read {}: {}", src, err))
        .iter()
        .map(print)
        .collect()
}

fn read_err(src: &str) -> YaliError {
    match read(src, "test.yali") {
        Ok(forms) => panic!("expected {} to fail, got {:?}", src, forms),
        Err(err) => err,
    }
}

#[test]
fn reads_atoms() {
    let cases = [
        ("nil", "nil"),
        ("true false", "true false"),
        ("42 -1.5 +3 .5 1e3 1E5 2.5E-1", "42 -1.5 3 0.5 1000 100000 0.25"),
        ("infinity -infinity nan", "infinity -infinity nan"),
        (":key", ":key"),
        ("\"a\\nb\"", "\"a\\nb\""),
        ("sym -12c +inc? <=", "sym -12c +inc? <="),
    ];
    for (src, expected) in cases {
        assert_eq!(read_printed(src).join(" "), expected, "{}", src);
    }
}

#[test]
fn brackets_expand_to_constructor_calls() {
    assert_eq!(read_printed("[1 2 [3]]"), vec!["(List 1 2 (List 3))"]);
    assert_eq!(read_printed("{:a 1}"), vec!["(Map :a 1)"]);
    assert_eq!(read_printed("()"), vec!["()"]);
}

#[test]
fn prefixes_wrap_the_next_form() {
    assert_eq!(
        read_printed("'x `(a ,b ,,,c)"),
        vec![
            "(quote x)",
            "(quasi-quote (a (unquote b) (unquote-splice c)))"
        ]
    );
}

#[test]
fn spread_prefix_wraps_the_next_form() {
    let forms = read("(f ...xs ... [1])", "test.yali").expect("read spread");
    let list = forms[0].as_list().expect("call form");
    assert_eq!(
        list.get(1),
        Some(&Value::list(vec![Value::symbol("..."), Value::symbol("xs")]))
    );
    assert_eq!(read_printed("(f ...xs ... [1])"), vec!["(f ...xs ...(List 1))"]);
    assert_eq!(read_printed("(f ...)"), vec!["(f ...)"]);
}

#[test]
fn comments_are_skipped() {
    assert_eq!(read_printed("; header\n(a ; trailing\n b)"), vec!["(a b)"]);
}

#[test]
fn dotted_tokens_become_member_access() {
    assert_eq!(read_printed("a.b.c"), vec!["(. a b c)"]);
    assert_eq!(read_printed("."), vec!["."]);
    assert_eq!(read_printed("1.5"), vec!["1.5"]);
    assert_eq!(read_printed("a..b"), vec!["a..b"]);
}

#[test]
fn dot_access_can_be_disabled() {
    let forms = Reader::new("a.b", "test.yali")
        .with_dot_access(false)
        .read_all()
        .expect("read without dot access");
    assert_eq!(forms, vec![Value::symbol("a.b")]);
}

#[test]
fn unclosed_input_is_incomplete() {
    for src in ["(1 2", "[a (b", "\"open", "'"] {
        let err = read_err(src);
        assert!(err.is_incomplete(), "{} should be incomplete: {}", src, err);
    }
}

#[test]
fn stray_characters_are_syntax_errors() {
    for src in [")", "#", "(a ]"] {
        let err = read_err(src);
        assert!(
            matches!(err, YaliError::Syntax(_)),
            "{} should be a syntax error: {}",
            src,
            err
        );
    }
}

#[test]
fn nesting_past_the_limit_is_a_syntax_error() {
    let src = "(".repeat(200_000) + &")".repeat(200_000);
    let err = read_err(&src);
    assert!(matches!(err, YaliError::Syntax(_)), "{}", err);
    assert!(err.to_string().contains("nest deeper"), "{}", err);

    let shallow = "[".repeat(100) + &"]".repeat(100);
    assert!(read(&shallow, "test.yali").is_ok());
}

#[test]
fn syntax_errors_carry_their_location() {
    let err = read("(a #b)", "f.yali").expect_err("hash is not readable");
    let source = err.source().expect("syntax error location");
    assert_eq!(source.location(), "f.yali:1:4");
    assert!(err.to_string().contains("f.yali:1:4"), "{}", err);
}

#[test]
fn list_sources_span_the_whole_form() {
    let forms = read("\n  (f\n x)", "f.yali").expect("read");
    let list = forms[0].as_list().expect("list form");
    let source = list.source().expect("list source");
    assert_eq!(source.location(), "f.yali:2:3");
    assert_eq!(source.image(), "(f\n x)");
}
