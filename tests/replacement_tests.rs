use vimregex::{compile, expand_tilde, Regex};

fn subst(pattern: &str, text: &str, template: &str) -> String {
    let re = Regex::new(pattern).unwrap();
    let m = re.find(text).unwrap().expect("Failed to match");
    re.substitute(&m, text, template, true, false)
}

#[test]
fn test_replace_whole_match() {
    assert_eq!(subst("world", "hello world", "[&]"), "[world]");
    assert_eq!(subst("world", "hello world", "[\\0]"), "[world]");
    assert_eq!(subst("world", "hello world", "[\\&]"), "[&]");
}

#[test]
fn test_replace_nomagic() {
    let re = compile("world", false).unwrap();
    let text = "hello world";
    let m = re.find(text).unwrap().unwrap();
    assert_eq!(re.substitute(&m, text, "[&]", false, false), "[&]");
    assert_eq!(re.substitute(&m, text, "[\\&]", false, false), "[world]");
}

#[test]
fn test_replace_with_capture_groups() {
    assert_eq!(
        subst("\\(\\w\\+\\)\\s\\+\\(\\w\\+\\)", "hello world", "\\2 \\1"),
        "world hello"
    );
    assert_eq!(subst("\\(a\\)\\|\\(b\\)", "b", "<\\1>"), "<>");
}

#[test]
fn test_replace_date_format() {
    assert_eq!(
        subst(
            "\\v(\\d{4})-(\\d{2})-(\\d{2})",
            "Date: 2023-12-25",
            "\\3/\\2/\\1"
        ),
        "25/12/2023"
    );
}

#[test]
fn test_replace_case_modifiers() {
    assert_eq!(subst("\\w\\+", "hello", "\\u&"), "Hello");
    assert_eq!(subst("\\w\\+", "hello", "\\U&"), "HELLO");
    assert_eq!(subst("\\w\\+", "HELLO", "\\L&"), "hello");
    assert_eq!(subst("\\w\\+", "HELLO", "\\l&"), "hELLO");
    assert_eq!(subst("\\w\\+", "hello", "\\U&\\E!"), "HELLO!");
    assert_eq!(
        subst("\\(\\w\\+\\) \\(\\w\\+\\)", "hello world", "\\u\\2 \\U\\1"),
        "World HELLO"
    );
}

#[test]
fn test_replace_special_chars() {
    assert_eq!(subst("x", "x", "a\\tb"), "a\tb");
    assert_eq!(subst("x", "x", "a\\rb"), "a\rb");
    assert_eq!(subst("x", "x", "a\\nb"), "a\nb");
    assert_eq!(subst("x", "x", "a\\\\b"), "a\\b");
}

#[test]
fn test_replace_keep_backslash() {
    let re = Regex::new("x").unwrap();
    let m = re.find("x").unwrap().unwrap();
    assert_eq!(re.substitute(&m, "x", "\\y&", true, true), "\\yx");
    assert_eq!(re.substitute(&m, "x", "\\y&", true, false), "yx");
}

#[test]
fn test_replace_unicode() {
    assert_eq!(subst("caf\u{e9}", "un caf\u{e9}", "\\U&"), "CAF\u{c9}");
    assert_eq!(subst("\u{e9}t\u{e9}", "\u{e9}t\u{e9}", "\\u&"), "\u{c9}t\u{e9}");
}

#[test]
fn test_previous_substitute() {
    let prev = expand_tilde("one", true, None);
    assert_eq!(prev, "one");
    let next = expand_tilde("~ two", true, Some(&prev));
    assert_eq!(next, "one two");
    assert_eq!(expand_tilde("\\~", false, Some("x")), "x");

    let re = Regex::with_prev_sub("a~", "", Some(&next)).unwrap();
    let m = re.find("xaone two").unwrap().unwrap();
    assert_eq!(m.range(), 1..9);
    assert_eq!(Regex::new("a~").unwrap_err().code(), 33);
}
