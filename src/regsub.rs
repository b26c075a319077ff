//! Substitution templates: `&`, `\1`, case modifiers and friends.

/// Access to the text of capture groups while formatting.
pub trait Captures {
    /// The text of group `no`, one piece per line it spans, or None when
    /// the group did not participate.
    fn pieces(&self, no: usize) -> Option<Vec<&str>>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum CaseMod {
    Upper,
    Lower,
}

/// Append `c`, applying the one-shot case modifier if set, else the
/// sticky one.
fn put(out: &mut String, one: &mut Option<CaseMod>, all: Option<CaseMod>, c: char) {
    match one.take().or(all) {
        Some(CaseMod::Upper) => out.extend(c.to_uppercase()),
        Some(CaseMod::Lower) => out.extend(c.to_lowercase()),
        None => out.push(c),
    }
}

/// Expand `template` using the groups in `caps`.
///
/// With `magic`, `&` is the whole match and `\&` a literal; without, the
/// other way around. With `backslash`, unknown escapes keep their
/// backslash, and CR and backslash in inserted group text are escaped, so
/// that a later pass can tell inserted line breaks from real ones.
pub fn substitute(template: &str, caps: &dyn Captures, magic: bool, backslash: bool) -> String {
    let mut out = String::with_capacity(template.len());
    let mut one = None;
    let mut all = None;
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        let mut no = None;
        if c == '&' && magic {
            no = Some(0);
        } else if c == '\\' {
            match chars.peek().copied() {
                Some('&') if !magic => {
                    chars.next();
                    no = Some(0);
                }
                Some(d @ '0'..='9') => {
                    chars.next();
                    no = d.to_digit(10).map(|d| d as usize);
                }
                Some(m @ ('u' | 'U' | 'l' | 'L' | 'e' | 'E')) => {
                    chars.next();
                    match m {
                        'u' => one = Some(CaseMod::Upper),
                        'U' => all = Some(CaseMod::Upper),
                        'l' => one = Some(CaseMod::Lower),
                        'L' => all = Some(CaseMod::Lower),
                        _ => {
                            one = None;
                            all = None;
                        }
                    }
                    continue;
                }
                _ => {}
            }
        }

        let no = match no {
            Some(no) => no,
            None => {
                let c = if c == '\\' {
                    match chars.next() {
                        None => '\\',
                        Some('r') => '\r',
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('b') => '\u{8}',
                        Some(other) => {
                            if backslash {
                                out.push('\\');
                            }
                            other
                        }
                    }
                } else {
                    c
                };
                put(&mut out, &mut one, all, c);
                continue;
            }
        };

        let pieces = match caps.pieces(no) {
            Some(pieces) => pieces,
            None => continue,
        };
        for (idx, piece) in pieces.iter().enumerate() {
            if idx > 0 {
                out.push('\r');
            }
            for c in piece.chars() {
                if backslash && (c == '\r' || c == '\\') {
                    out.push('\\');
                    out.push(c);
                } else {
                    put(&mut out, &mut one, all, c);
                }
            }
        }
    }
    out
}

/// Replace `~` (`\~` when not `magic`) in a substitute string with the
/// previous substitute string. Without one, the tilde is dropped.
/// The result becomes the next previous substitute string.
pub fn expand_tilde(source: &str, magic: bool, prev_sub: Option<&str>) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        let tilde = if c == '~' && magic {
            true
        } else if c == '\\' && !magic && chars.peek() == Some(&'~') {
            chars.next();
            true
        } else {
            false
        };
        if tilde {
            out.push_str(prev_sub.unwrap_or(""));
            continue;
        }
        out.push(c);
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Groups(Vec<Option<Vec<&'static str>>>);

    impl Captures for Groups {
        fn pieces(&self, no: usize) -> Option<Vec<&str>> {
            self.0.get(no).cloned().flatten()
        }
    }

    fn groups() -> Groups {
        Groups(vec![
            Some(vec!["Hello World"]),
            Some(vec!["Hello"]),
            None,
            Some(vec!["one", "two"]),
            Some(vec!["a\\b\rc"]),
        ])
    }

    #[test]
    fn whole_match_and_groups() {
        let g = groups();
        assert_eq!(substitute("[&]", &g, true, false), "[Hello World]");
        assert_eq!(substitute("[&]", &g, false, false), "[&]");
        assert_eq!(substitute("[\\&]", &g, false, false), "[Hello World]");
        assert_eq!(substitute("\\1-\\2-\\0", &g, true, false), "Hello--Hello World");
        assert_eq!(substitute("\\9", &g, true, false), "");
    }

    #[test]
    fn case_modifiers() {
        let g = groups();
        assert_eq!(substitute("\\u\\1x", &g, true, false), "Hellox");
        assert_eq!(substitute("\\U\\1\\Ex", &g, true, false), "HELLOx");
        assert_eq!(substitute("\\L&", &g, true, false), "hello world");
        assert_eq!(substitute("\\U\\lAB", &g, true, false), "aB");
        assert_eq!(substitute("\\uabc", &g, true, false), "Abc");
    }

    #[test]
    fn escapes() {
        let g = groups();
        assert_eq!(substitute("a\\tb\\rc\\nd\\b", &g, true, false), "a\tb\rc\nd\u{8}");
        assert_eq!(substitute("\\x\\\\", &g, true, false), "x\\");
        assert_eq!(substitute("\\x", &g, true, true), "\\x");
        assert_eq!(substitute("end\\", &g, true, false), "end\\");
    }

    #[test]
    fn multiline_groups() {
        let g = groups();
        assert_eq!(substitute("<\\3>", &g, true, false), "<one\rtwo>");
        assert_eq!(substitute("\\4", &g, true, false), "a\\b\rc");
        assert_eq!(substitute("\\4", &g, true, true), "a\\\\b\\\rc");
    }

    #[test]
    fn tilde() {
        assert_eq!(expand_tilde("a~b", true, Some("XY")), "aXYb");
        assert_eq!(expand_tilde("a~b", true, None), "ab");
        assert_eq!(expand_tilde("a\\~b", true, Some("XY")), "a\\~b");
        assert_eq!(expand_tilde("a\\~b", false, Some("XY")), "aXYb");
        assert_eq!(expand_tilde("a~b", false, Some("XY")), "a~b");
    }
}
