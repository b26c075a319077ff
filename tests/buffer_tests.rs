use std::sync::atomic::AtomicBool;
use vimregex::{ExtMatch, LinePos, LineSource, MatchError, MatchOptions, Regex};

fn lp(lnum: usize, col: usize) -> LinePos {
    LinePos::new(lnum, col)
}

const LINES: [&str; 3] = ["foo", "bar", "baz"];

#[test]
fn test_match_across_lines() {
    let re = Regex::new("foo\\nbar").unwrap();
    let m = re.match_buffer(&LINES, 0, 3, 0, false).unwrap().unwrap();
    assert_eq!(m.range(), lp(0, 0)..lp(1, 3));
    assert_eq!(m.lines(), 2);

    let re = Regex::new("o\\_.*z").unwrap();
    let m = re.match_buffer(&LINES, 0, 3, 0, false).unwrap().unwrap();
    assert_eq!(m.range(), lp(0, 1)..lp(2, 3));
    assert_eq!(m.lines(), 3);

    // Not allowed past line_count.
    let m = re.match_buffer(&LINES, 0, 2, 0, false).unwrap();
    assert!(m.is_none());
}

#[test]
fn test_line_break_at_end_of_buffer() {
    let re = Regex::new("baz\\n").unwrap();
    let m = re.match_buffer(&LINES, 2, 1, 0, false).unwrap().unwrap();
    assert_eq!(m.range(), lp(2, 0)..lp(3, 0));
    assert_eq!(m.lines(), 2);
}

#[test]
fn test_dollar_and_caret_per_line() {
    let re = Regex::new("o$").unwrap();
    let m = re.match_buffer(&LINES, 0, 3, 0, false).unwrap().unwrap();
    assert_eq!(m.range(), lp(0, 2)..lp(0, 3));

    let re = Regex::new("o\\n^b").unwrap();
    let m = re.match_buffer(&LINES, 0, 3, 0, false).unwrap().unwrap();
    assert_eq!(m.range(), lp(0, 2)..lp(1, 1));

    let re = Regex::new("\\%^foo").unwrap();
    assert!(re.match_buffer(&LINES, 0, 3, 0, false).unwrap().is_some());
    assert!(re.match_buffer(&LINES, 1, 2, 0, false).unwrap().is_none());

    let re = Regex::new("baz\\%$").unwrap();
    assert!(re.match_buffer(&LINES, 2, 1, 0, false).unwrap().is_some());
}

#[test]
fn test_line_numbers() {
    let re = Regex::new("\\%2lbar").unwrap();
    let m = re.match_buffer(&LINES, 1, 2, 0, false).unwrap().unwrap();
    assert_eq!(m.range(), lp(1, 0)..lp(1, 3));
    assert!(re.match_buffer(&LINES, 0, 3, 0, false).unwrap().is_none());

    let re = Regex::new("\\%>1l.").unwrap();
    assert!(re.match_buffer(&LINES, 0, 1, 0, false).unwrap().is_none());
    assert!(re.match_buffer(&LINES, 2, 1, 0, false).unwrap().is_some());

    // Never true for a single line.
    let re = Regex::new("\\%1l.").unwrap();
    assert!(re.find("x").unwrap().is_none());
}

#[test]
fn test_lookbehind_into_previous_line() {
    let re = Regex::new("\\(foo\\n\\)\\@<=bar").unwrap();
    let m = re.match_buffer(&LINES, 1, 2, 0, false).unwrap().unwrap();
    assert_eq!(m.range(), lp(1, 0)..lp(1, 3));
    assert!(re.match_buffer(&LINES, 2, 1, 0, false).unwrap().is_none());
}

#[test]
fn test_backref_across_lines() {
    let lines = ["ab", "cxab", "cy"];
    let re = Regex::new("\\(b\\nc\\)x.\\1").unwrap();
    let m = re.match_buffer(&lines, 0, 3, 0, false).unwrap().unwrap();
    assert_eq!(m.range(), lp(0, 1)..lp(2, 1));
    assert_eq!(m.group(1), Some(lp(0, 1)..lp(1, 1)));
}

#[test]
fn test_substitute_buffer() {
    let re = Regex::new("\\(o\\nb\\)a").unwrap();
    let m = re.match_buffer(&LINES, 0, 3, 0, false).unwrap().unwrap();
    assert_eq!(re.substitute_buffer(&m, &LINES, "[\\1]", true, false), "[o\rb]");
    // The line break joining the pieces is not escaped.
    assert_eq!(re.substitute_buffer(&m, &LINES, "[\\1]", true, true), "[o\rb]");
    assert_eq!(re.substitute_buffer(&m, &LINES, "<&>", true, false), "<o\rba>");
}

/// A buffer with a cursor, marks and a Visual area.
struct Editor {
    lines: Vec<String>,
    cursor: LinePos,
    mark_a: LinePos,
    visual: (LinePos, LinePos),
}

impl LineSource for Editor {
    fn line(&self, lnum: usize) -> Option<&str> {
        self.lines.get(lnum).map(String::as_str)
    }

    fn cursor(&self) -> Option<LinePos> {
        Some(self.cursor)
    }

    fn mark(&self, name: char) -> Option<LinePos> {
        if name == 'a' {
            Some(self.mark_a)
        } else {
            None
        }
    }

    fn in_visual(&self, pos: LinePos) -> bool {
        self.visual.0 <= pos && pos <= self.visual.1
    }
}

fn editor() -> Editor {
    Editor {
        lines: vec!["one two".into(), "three four".into()],
        cursor: lp(1, 6),
        mark_a: lp(0, 4),
        visual: (lp(0, 4), lp(1, 2)),
    }
}

#[test]
fn test_cursor_and_marks() {
    let ed = editor();
    let re = Regex::new("\\%#\\w\\+").unwrap();
    assert!(re.match_buffer(&ed, 0, 2, 0, false).unwrap().is_none());
    let m = re.match_buffer(&ed, 1, 1, 0, false).unwrap().unwrap();
    assert_eq!(m.range(), lp(1, 6)..lp(1, 10));

    let re = Regex::new("\\%'a\\w\\+").unwrap();
    let m = re.match_buffer(&ed, 0, 2, 0, false).unwrap().unwrap();
    assert_eq!(m.range(), lp(0, 4)..lp(0, 7));

    let re = Regex::new("\\%>'a\\w").unwrap();
    let m = re.match_buffer(&ed, 0, 2, 0, false).unwrap().unwrap();
    assert_eq!(m.range(), lp(0, 5)..lp(0, 6));

    let re = Regex::new("\\%'q.").unwrap();
    assert!(re.match_buffer(&ed, 0, 2, 0, false).unwrap().is_none());

    let re = Regex::new("\\%.l\\w\\+").unwrap();
    let m = re.match_buffer(&ed, 0, 2, 0, false).unwrap();
    assert!(m.is_none());
    let m = re.match_buffer(&ed, 1, 1, 0, false).unwrap().unwrap();
    assert_eq!(m.range(), lp(1, 0)..lp(1, 5));

    // A zero count after the dot still means the cursor line.
    let re = Regex::new("\\%.0l\\w\\+").unwrap();
    assert!(re.match_buffer(&ed, 0, 2, 0, false).unwrap().is_none());
    assert!(re.match_buffer(&ed, 1, 1, 0, false).unwrap().is_some());
}

#[test]
fn test_visual_area() {
    let ed = editor();
    let re = Regex::new("\\%V\\w\\+").unwrap();
    let m = re.match_buffer(&ed, 0, 2, 0, false).unwrap().unwrap();
    assert_eq!(m.range(), lp(0, 4)..lp(0, 7));
    let re = Regex::new("\\%V\\w\\+\\%V").unwrap();
    assert!(re.match_buffer(&ed, 1, 1, 3, false).unwrap().is_none());
}

#[test]
fn test_extmatch_groups() {
    let re = Regex::with_flags("start \\z(\\w\\+\\)", "z").unwrap();
    let m = re.find("start block").unwrap().unwrap();
    let ext = m.extmatch.clone().unwrap();
    assert_eq!(ext.matches[1].as_deref(), Some("block"));

    let end = Regex::with_flags("end \\z1", "Z").unwrap();
    let opts = MatchOptions {
        extmatch: Some(&ext),
        ..MatchOptions::default()
    };
    assert!(end.match_line_with("end block", 0, &opts).unwrap().is_some());
    assert!(end.match_line_with("end other", 0, &opts).unwrap().is_none());

    let empty = ExtMatch::default();
    let opts = MatchOptions {
        extmatch: Some(&empty),
        ..MatchOptions::default()
    };
    assert!(end.match_line_with("end ", 0, &opts).unwrap().is_some());
}

#[test]
fn test_limits() {
    let re = Regex::new("\\(a*\\)*[bc]d").unwrap();
    let text = format!("{}d", "a".repeat(40));
    let opts = MatchOptions {
        max_steps: 1000,
        ..MatchOptions::default()
    };
    assert_eq!(re.match_line_with(&text, 0, &opts), Err(MatchError::StackExhausted));

    let flag = AtomicBool::new(true);
    let opts = MatchOptions {
        interrupt: Some(&flag),
        ..MatchOptions::default()
    };
    assert_eq!(re.match_line_with(&text, 0, &opts), Err(MatchError::Interrupted));

    let re = Regex::new("b").unwrap();
    let opts = MatchOptions {
        max_col: 2,
        ..MatchOptions::default()
    };
    assert_eq!(re.match_line_with("aab", 0, &opts), Ok(None));
    assert!(re.match_line_with("abb", 0, &opts).unwrap().is_some());
}

#[test]
fn test_concurrent_matching() {
    let re = std::sync::Arc::new(Regex::new("\\(\\w\\)\\1").unwrap());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let re = re.clone();
            std::thread::spawn(move || {
                (0..100)
                    .filter(|_| re.find("a bb c").unwrap().is_some())
                    .count()
            })
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), 100);
    }
}
