use crate::classicalbacktrack::{BacktrackExecutor, RawMatch};
use crate::cursor::{Cursor, LineSource, SingleLine};
use crate::exec;
use crate::insn::CompiledRegex;
use crate::parse;
use crate::regsub;
use crate::types::{LinePos, Pos, NSUBEXP};

use core::{fmt, ops, str::FromStr};
use std::sync::atomic::AtomicBool;

pub use crate::error::{Error, MatchError};

/// Default for [`MatchOptions::max_steps`].
pub const DEFAULT_MAX_STEPS: u64 = 10_000_000;

/// Default for [`MatchOptions::max_stack`].
pub const DEFAULT_MAX_STACK: usize = 100_000;

/// Flags used to control pattern compilation.
/// The default flags are magic, case-sensitive, without extmatch groups and
/// optimizing.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Flags {
    /// If set, searches that don't say otherwise ignore case.
    /// `\c` and `\C` in the pattern still win.
    pub icase: bool,

    /// If set, the pattern starts out 'nomagic', as if it began with `\M`.
    pub nomagic: bool,

    /// If set, `\z(` groups may be defined.
    pub extmatch_set: bool,

    /// If set, `\z1`..`\z9` may be used.
    pub extmatch_use: bool,

    /// If set, a `[` without a matching `]` is an error instead of a
    /// literal.
    pub strict: bool,

    /// If set, don't compute the start hints.
    pub no_opt: bool,
}

impl Flags {
    /// Construct a Flags from letters: 'i' ignores case, 'M' is nomagic,
    /// 'z' allows `\z(`, 'Z' allows `\z1`, 's' is strict.
    /// Other letters are ignored.
    #[inline]
    pub fn new<T: Iterator<Item = char>>(chars: T) -> Self {
        let mut result = Self::default();
        for c in chars {
            match c {
                'i' => {
                    result.icase = true;
                }
                'M' => {
                    result.nomagic = true;
                }
                'z' => {
                    result.extmatch_set = true;
                }
                'Z' => {
                    result.extmatch_use = true;
                }
                's' => {
                    result.strict = true;
                }
                _ => {
                    // Silently skip unsupported flags.
                }
            }
        }
        result
    }
}

impl From<&str> for Flags {
    /// Construct a Flags from a string of letters.
    ///
    /// See also: [`Flags::new`].
    #[inline]
    fn from(s: &str) -> Self {
        Self::new(s.chars())
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.icase {
            f.write_str("i")?;
        }
        if self.nomagic {
            f.write_str("M")?;
        }
        if self.extmatch_set {
            f.write_str("z")?;
        }
        if self.extmatch_use {
            f.write_str("Z")?;
        }
        if self.strict {
            f.write_str("s")?;
        }
        Ok(())
    }
}

/// The text of `\z(` groups from a successful match. Passed back in
/// through [`MatchOptions::extmatch`] for `\z1`..`\z9` of another pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtMatch {
    pub matches: [Option<String>; NSUBEXP],
}

/// Options for one search.
#[derive(Debug, Clone)]
pub struct MatchOptions<'a> {
    /// Ignore case, unless the pattern has `\c` or `\C`.
    pub ignore_case: bool,

    /// Don't start a match at or after this byte column. 0 is no limit.
    pub max_col: usize,

    /// Give up with [`MatchError::StackExhausted`] after this many
    /// program steps.
    pub max_steps: u64,

    /// Give up with [`MatchError::StackExhausted`] when the backtracking
    /// stack holds this many items.
    pub max_stack: usize,

    /// Give up with [`MatchError::Interrupted`] once this is set.
    pub interrupt: Option<&'a AtomicBool>,

    /// Text for `\z1`..`\z9`.
    pub extmatch: Option<&'a ExtMatch>,
}

impl Default for MatchOptions<'_> {
    fn default() -> Self {
        MatchOptions {
            ignore_case: false,
            max_col: 0,
            max_steps: DEFAULT_MAX_STEPS,
            max_stack: DEFAULT_MAX_STACK,
            interrupt: None,
            extmatch: None,
        }
    }
}

impl MatchOptions<'_> {
    /// Default options, ignoring case or not.
    pub fn with_ignore_case(ignore_case: bool) -> Self {
        MatchOptions {
            ignore_case,
            ..MatchOptions::default()
        }
    }
}

/// Range is used to express the extent of a match: byte offsets into a
/// line, or [`LinePos`] positions in a buffer.
pub type Range<P = usize> = ops::Range<P>;

/// An iterator type which yields `Match`es found in a line.
pub type Matches<'r, 't> = exec::Matches<exec::LineProducer<'r, 't>>;

/// A Match represents a portion of text which was found to match a Regex.
/// `P` is `usize` for a single line and [`LinePos`] for a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<P> {
    /// The total range of the match, after `\zs` and `\ze`. Note this may
    /// be empty, if the regex matched an empty string.
    pub range: Range<P>,

    /// The list of captures `\1`..`\9`. For each capture, if the value is
    /// None, that group did not match.
    pub captures: Vec<Option<Range<P>>>,

    /// Byte column where the pattern started matching. Differs from the
    /// start of `range` when `\zs` was used.
    pub match_col: usize,

    /// The `\z(` groups, when the pattern defines any.
    pub extmatch: Option<ExtMatch>,

    lines: usize,
}

impl<P: Copy> Match<P> {
    pub(crate) fn from_raw<F: Fn(Pos) -> P>(raw: RawMatch, conv: F) -> Option<Self> {
        let mut groups = raw.groups.iter().map(|gd| {
            gd.as_range().map(|r| Range {
                start: conv(r.start),
                end: conv(r.end),
            })
        });
        let range = groups.next().flatten()?;
        Some(Match {
            range,
            captures: groups.collect(),
            match_col: raw.match_col,
            extmatch: raw.extmatch,
            lines: (raw.last_lnum.max(0) + 1) as usize,
        })
    }

    /// Access a group by index. Index 0 is the total match, index 1 is
    /// the first capture group.
    #[inline]
    pub fn group(&self, idx: usize) -> Option<Range<P>> {
        if idx == 0 {
            Some(self.range.clone())
        } else {
            self.captures.get(idx - 1).cloned().flatten()
        }
    }

    /// This is a convenience function to work around the fact that Range
    /// does not support Copy.
    #[inline]
    pub fn range(&self) -> Range<P> {
        self.range.clone()
    }

    #[inline]
    pub fn start(&self) -> P {
        self.range.start
    }

    #[inline]
    pub fn end(&self) -> P {
        self.range.end
    }

    /// The number of lines from the search line to the line the match
    /// ended on, inclusive. Always 1 for a single line.
    #[inline]
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Return an iterator over a Match. The first returned value is the
    /// total match, and subsequent values represent the capture groups.
    #[inline]
    pub fn groups(&self) -> Groups<'_, P> {
        Groups::new(self)
    }
}

/// An iterator over the capture groups of a [`Match`]
///
/// This struct is created by the [`groups`] method on [`Match`].
///
/// [`Match`]: ../struct.Match.html
/// [`groups`]: ../struct.Match.html#method.groups
#[derive(Clone)]
pub struct Groups<'m, P> {
    mat: &'m Match<P>,
    i: usize,
    max: usize,
}

impl<'m, P> Groups<'m, P> {
    #[inline]
    fn new(mat: &'m Match<P>) -> Self {
        Self {
            mat,
            i: 0,
            max: mat.captures.len() + 1,
        }
    }
}

impl<P: Copy> Iterator for Groups<'_, P> {
    type Item = Option<Range<P>>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let i = self.i;
        if i < self.max {
            self.i += 1;
            Some(self.mat.group(i))
        } else {
            None
        }
    }
}

/// Group text of a match in one line.
struct LineCaptures<'a> {
    mat: &'a Match<usize>,
    line: &'a str,
}

impl regsub::Captures for LineCaptures<'_> {
    fn pieces(&self, no: usize) -> Option<Vec<&str>> {
        let r = self.mat.group(no)?;
        Some(vec![self.line.get(r).unwrap_or("")])
    }
}

/// Group text of a match in a buffer; may span lines.
struct BufferCaptures<'a> {
    mat: &'a Match<LinePos>,
    source: &'a dyn LineSource,
}

impl regsub::Captures for BufferCaptures<'_> {
    fn pieces(&self, no: usize) -> Option<Vec<&str>> {
        let r = self.mat.group(no)?;
        let (start, end) = (r.start, r.end);
        if end < start {
            return Some(Vec::new());
        }
        let line = |lnum| self.source.line(lnum).unwrap_or("");
        if start.lnum == end.lnum {
            return Some(vec![line(start.lnum).get(start.col..end.col).unwrap_or("")]);
        }
        let mut pieces = vec![line(start.lnum).get(start.col..).unwrap_or("")];
        for lnum in start.lnum + 1..end.lnum {
            pieces.push(line(lnum));
        }
        pieces.push(line(end.lnum).get(..end.col).unwrap_or(""));
        Some(pieces)
    }
}

/// A Regex is the compiled version of a pattern.
#[derive(Debug, Clone)]
pub struct Regex {
    cr: CompiledRegex,
    flags: Flags,
}

impl Regex {
    /// Construct a regex by parsing `pattern` using the default flags.
    /// An Error may be returned if the syntax is invalid.
    /// Note that this is rather expensive; prefer to cache a Regex which is
    /// intended to be used more than once.
    #[inline]
    pub fn new(pattern: &str) -> Result<Regex, Error> {
        Self::with_flags(pattern, Flags::default())
    }

    /// Construct a regex by parsing `pattern` with `flags`.
    /// An Error may be returned if the syntax is invalid.
    #[inline]
    pub fn with_flags<F>(pattern: &str, flags: F) -> Result<Regex, Error>
    where
        F: Into<Flags>,
    {
        Self::with_prev_sub(pattern, flags, None)
    }

    /// Construct a regex whose `~` stands for `prev_sub`, the previous
    /// substitute string. Without one, `~` is an error.
    pub fn with_prev_sub<F>(pattern: &str, flags: F, prev_sub: Option<&str>) -> Result<Regex, Error>
    where
        F: Into<Flags>,
    {
        let flags = flags.into();
        let cr = parse::compile(pattern, &flags, prev_sub)?;
        Ok(Regex { cr, flags })
    }

    /// The flags the regex was compiled with.
    #[inline]
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// \return whether the pattern can match a line break.
    #[inline]
    pub fn has_newline(&self) -> bool {
        self.cr.flags.has_nl
    }

    /// Search `line` from byte `col` for the first match.
    #[inline]
    pub fn match_line(
        &self,
        line: &str,
        col: usize,
        ignore_case: bool,
    ) -> Result<Option<Match<usize>>, MatchError> {
        self.match_line_with(line, col, &MatchOptions::with_ignore_case(ignore_case))
    }

    /// Search `line` from byte `col` for the first match, with options.
    /// A '\n' in `line` is matched by `\n` and the `\_x` classes.
    pub fn match_line_with(
        &self,
        line: &str,
        col: usize,
        opts: &MatchOptions,
    ) -> Result<Option<Match<usize>>, MatchError> {
        let src = SingleLine(line);
        let mut exec = BacktrackExecutor::new(&self.cr, Cursor::single(&src), opts);
        Ok(exec
            .search(col)?
            .and_then(|raw| Match::from_raw(raw, |p| p.col)))
    }

    /// Search line `first_line` of `source` from byte `col` for the first
    /// match. The match may continue into the following lines, up to
    /// `line_count` lines in all.
    #[inline]
    pub fn match_buffer(
        &self,
        source: &dyn LineSource,
        first_line: usize,
        line_count: usize,
        col: usize,
        ignore_case: bool,
    ) -> Result<Option<Match<LinePos>>, MatchError> {
        self.match_buffer_with(
            source,
            first_line,
            line_count,
            col,
            &MatchOptions::with_ignore_case(ignore_case),
        )
    }

    /// Like [`Regex::match_buffer`], with options.
    pub fn match_buffer_with(
        &self,
        source: &dyn LineSource,
        first_line: usize,
        line_count: usize,
        col: usize,
        opts: &MatchOptions,
    ) -> Result<Option<Match<LinePos>>, MatchError> {
        let cur = Cursor::multi(source, first_line, line_count);
        let mut exec = BacktrackExecutor::new(&self.cr, cur, opts);
        Ok(exec.search(col)?.and_then(|raw| {
            Match::from_raw(raw, |p| {
                LinePos::new((first_line as isize + p.lnum).max(0) as usize, p.col)
            })
        }))
    }

    /// Searches `text` to find the first match, ignoring case if the regex
    /// was compiled with the 'i' flag.
    #[inline]
    pub fn find(&self, text: &str) -> Result<Option<Match<usize>>, MatchError> {
        self.match_line(text, 0, self.flags.icase)
    }

    /// Searches `text`, returning an iterator over non-overlapping matches.
    /// Note that the resulting Iterator borrows both the regex `'r` and the
    /// input string as `'t`.
    #[inline]
    pub fn find_iter<'r, 't>(&'r self, text: &'t str) -> Matches<'r, 't> {
        self.find_from(text, 0)
    }

    /// Returns an iterator for matches found in `text` starting at byte
    /// index `start`. Note this may be different from passing a sliced
    /// `text`, since `^`, `\<` and lookbehind see the text before `start`.
    #[inline]
    pub fn find_from<'r, 't>(&'r self, text: &'t str, start: usize) -> Matches<'r, 't> {
        self.find_from_with(text, start, MatchOptions::with_ignore_case(self.flags.icase))
    }

    /// Like [`Regex::find_from`], with options. Every search in the
    /// iteration uses the same `opts`.
    pub fn find_from_with<'r, 't>(
        &'r self,
        text: &'t str,
        start: usize,
        opts: MatchOptions<'t>,
    ) -> Matches<'r, 't> {
        exec::Matches::new(exec::LineProducer::new(&self.cr, text, opts), start)
    }

    /// Expand `template` for a match in `line`. See [`substitute`] for
    /// `magic` and `backslash`.
    ///
    /// [`substitute`]: crate::substitute
    pub fn substitute(
        &self,
        mat: &Match<usize>,
        line: &str,
        template: &str,
        magic: bool,
        backslash: bool,
    ) -> String {
        let caps = LineCaptures { mat, line };
        regsub::substitute(template, &caps, magic, backslash)
    }

    /// Expand `template` for a match in a buffer. Group text spanning
    /// lines is joined with CR.
    pub fn substitute_buffer(
        &self,
        mat: &Match<LinePos>,
        source: &dyn LineSource,
        template: &str,
        magic: bool,
        backslash: bool,
    ) -> String {
        let caps = BufferCaptures { mat, source };
        regsub::substitute(template, &caps, magic, backslash)
    }
}

impl FromStr for Regex {
    type Err = Error;

    /// Attempts to parse a string into a regular expression
    #[inline]
    fn from_str(s: &str) -> Result<Self, Error> {
        Self::new(s)
    }
}

impl fmt::Display for Regex {
    /// Dump the compiled program.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.cr, f)
    }
}

/// Compile `pattern`, starting out 'magic' or 'nomagic'.
pub fn compile(pattern: &str, magic: bool) -> Result<Regex, Error> {
    let flags = Flags {
        nomagic: !magic,
        ..Flags::default()
    };
    Regex::with_flags(pattern, flags)
}

/// Replace the tilde in a substitute string with the previous one.
/// See [`crate::substitute`].
pub use regsub::expand_tilde;
