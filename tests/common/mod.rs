#![allow(clippy::uninlined_format_args)]

use std::ops::Range;
use vimregex::{Flags, LinePos, Match, Regex};

/// Test that \p pattern fails to parse with default flags.
#[track_caller]
pub fn test_parse_fails(pattern: &str) {
    let res = Regex::new(pattern);
    assert!(res.is_err(), "Pattern should not have parsed: {}", pattern);
}

/// Test that \p pattern fails to parse with flags.
#[track_caller]
pub fn test_parse_fails_flags(pattern: &str, flags: &str) {
    let res = Regex::with_flags(pattern, flags);
    assert!(res.is_err(), "Pattern should not have parsed: {}", pattern);
}

/// Format a Match by inserting commas between all capture groups.
fn format_match(r: &Found, input: &str) -> String {
    let mut result = input[r.range()].to_string();
    let used = r
        .captures
        .iter()
        .rposition(Option::is_some)
        .map_or(0, |idx| idx + 1);
    for cg in r.captures[..used].iter() {
        result.push(',');
        if let Some(cg) = cg {
            result.push_str(&input[cg.clone()])
        }
    }
    result
}

pub trait StringTestHelpers {
    /// "Fluent" style helper for testing that a String is equal to a str.
    fn test_eq(&self, s: &str);
}

impl StringTestHelpers for String {
    #[track_caller]
    fn test_eq(&self, rhs: &str) {
        assert_eq!(self.as_str(), rhs)
    }
}

pub trait VecTestHelpers {
    /// "Fluent" style helper for testing that a Vec<&str> is equal to a
    /// Vec<&str>.
    fn test_eq(&self, rhs: Vec<&str>);
}

impl VecTestHelpers for Vec<&str> {
    #[track_caller]
    fn test_eq(&self, rhs: Vec<&str>) {
        assert_eq!(*self, rhs)
    }
}

/// How the input is handed to the matcher.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    /// As one line.
    Line,
    /// As a buffer holding just that line.
    Buffer,
}

/// A compiled regex which remembers a TestConfig.
#[derive(Debug, Clone)]
pub struct TestCompiledRegex {
    re: Regex,
    tc: TestConfig,
}

/// A match in byte offsets, from either mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found {
    pub range: Range<usize>,
    pub captures: Vec<Option<Range<usize>>>,
    pub match_col: usize,
}

impl Found {
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn end(&self) -> usize {
        self.range.end
    }

    pub fn group(&self, idx: usize) -> Option<Range<usize>> {
        if idx == 0 {
            Some(self.range())
        } else {
            self.captures.get(idx - 1).cloned().flatten()
        }
    }
}

impl From<Match<usize>> for Found {
    fn from(m: Match<usize>) -> Self {
        Found {
            range: m.range(),
            captures: m.captures,
            match_col: m.match_col,
        }
    }
}

impl From<Match<LinePos>> for Found {
    /// Convert a buffer match on line 0 to byte offsets.
    fn from(m: Match<LinePos>) -> Self {
        let col = |p: LinePos| {
            assert_eq!(p.lnum, 0, "Match left the only line");
            p.col
        };
        Found {
            range: col(m.start())..col(m.end()),
            captures: m
                .captures
                .iter()
                .map(|cg| cg.clone().map(|r| col(r.start)..col(r.end)))
                .collect(),
            match_col: m.match_col,
        }
    }
}

impl TestCompiledRegex {
    fn match_at(&self, input: &str, start: usize) -> Option<Found> {
        let icase = self.re.flags().icase;
        match self.tc.mode {
            Mode::Line => self.re.match_line(input, start, icase).unwrap().map(Found::from),
            Mode::Buffer => {
                let lines = vec![input];
                self.re
                    .match_buffer(&lines, 0, 1, start, icase)
                    .unwrap()
                    .map(Found::from)
            }
        }
    }

    /// Search for self in \p input, returning a list of all matches.
    #[track_caller]
    pub fn matches(&self, input: &str, start: usize) -> Vec<Found> {
        let mut result = Vec::new();
        let mut next = Some(start);
        while let Some(start) = next {
            let m = match self.match_at(input, start) {
                Some(m) => m,
                None => break,
            };
            next = if m.end() > m.match_col {
                Some(m.end())
            } else {
                input[m.match_col..]
                    .chars()
                    .next()
                    .map(|c| m.match_col + c.len_utf8())
            };
            result.push(m);
        }
        if self.tc.mode == Mode::Line {
            let iterated: Vec<Found> = self
                .re
                .find_from(input, start)
                .map(|m| Found::from(m.unwrap()))
                .collect();
            assert_eq!(result, iterated, "find_iter disagrees");
        }
        result
    }

    /// Search for self in \p input, returning the first Match, or None if
    /// none.
    pub fn find(&self, input: &str) -> Option<Found> {
        self.match_at(input, 0)
    }

    /// Match against a string, returning the first formatted match.
    #[track_caller]
    pub fn match1f(&self, input: &str) -> String {
        match self.find(input) {
            Some(m) => format_match(&m, input),
            None => panic!("Failed to match {}", input),
        }
    }

    /// Match against a string, returning the match as a Vec containing None
    /// for unmatched groups, or the matched strings.
    #[track_caller]
    pub fn match1_vec<'b>(&self, input: &'b str) -> Vec<Option<&'b str>> {
        let m = match self.find(input) {
            Some(m) => m,
            None => panic!("Failed to match {}", input),
        };
        (0..=m.captures.len())
            .map(|idx| m.group(idx).map(|r| &input[r]))
            .collect()
    }

    /// Test that matching against \p input fails.
    #[track_caller]
    pub fn test_fails(&self, input: &str) {
        assert!(self.find(input).is_none(), "Should not have matched")
    }

    /// Test that matching against \p input succeeds.
    #[track_caller]
    pub fn test_succeeds(&self, input: &str) {
        assert!(self.find(input).is_some(), "Should have matched")
    }

    /// Return a list of all non-overlapping matches.
    #[track_caller]
    pub fn match_all<'a>(&self, input: &'a str) -> Vec<&'a str> {
        self.matches(input, 0)
            .into_iter()
            .map(move |m| &input[m.range()])
            .collect()
    }

    /// Collect all matches into a String, separated by commas.
    #[track_caller]
    pub fn run_global_match(&self, input: &str) -> String {
        self.matches(input, 0)
            .into_iter()
            .map(move |m| format_match(&m, input))
            .collect::<Vec<String>>()
            .join(",")
    }

    /// Substitute \p template for the first match in \p input.
    #[track_caller]
    pub fn subst(&self, input: &str, template: &str) -> String {
        match self.find(input) {
            Some(_) => {
                let m = self.re.match_line(input, 0, self.re.flags().icase).unwrap().unwrap();
                self.re.substitute(&m, input, template, true, false)
            }
            None => panic!("Failed to match {}", input),
        }
    }
}

/// A struct which exists only to let tests run with various settings.
#[derive(Debug, Copy, Clone)]
pub struct TestConfig {
    optimize: bool,
    mode: Mode,
}

impl TestConfig {
    /// Compile a pattern to a regex, with default flags.
    #[track_caller]
    pub fn compile(&self, pattern: &str) -> TestCompiledRegex {
        self.compilef(pattern, "")
    }

    /// Compile a pattern to a regex, with given flags.
    #[track_caller]
    pub fn compilef(&self, pattern: &str, flags_str: &str) -> TestCompiledRegex {
        let mut flags = Flags::from(flags_str);
        flags.no_opt = !self.optimize;
        let re = Regex::with_flags(pattern, flags);
        assert!(
            re.is_ok(),
            "Failed to parse! flags: {} pattern: {}, error: {}",
            flags_str,
            pattern,
            re.unwrap_err()
        );
        TestCompiledRegex {
            re: re.unwrap(),
            tc: *self,
        }
    }

    /// Test that \p pattern and \p flags successfully parses, and matches
    /// \p input.
    #[track_caller]
    pub fn test_match_succeeds(&self, pattern: &str, flags_str: &str, input: &str) {
        self.compilef(pattern, flags_str).test_succeeds(input)
    }

    /// Test that \p pattern and \p flags successfully parses, and does not
    /// match \p input.
    #[track_caller]
    pub fn test_match_fails(&self, pattern: &str, flags_str: &str, input: &str) {
        self.compilef(pattern, flags_str).test_fails(input)
    }
}

/// Invoke \p F with each test config, in turn.
pub fn test_with_configs<F>(func: F)
where
    F: Fn(TestConfig),
{
    for optimize in [false, true] {
        for mode in [Mode::Line, Mode::Buffer] {
            func(TestConfig { optimize, mode })
        }
    }
}
