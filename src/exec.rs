//! Execution engine bits.

use crate::api::{Match, MatchOptions};
use crate::classicalbacktrack::BacktrackExecutor;
use crate::cursor::{Cursor, SingleLine};
use crate::error::MatchError;
use crate::insn::CompiledRegex;

/// A trait for finding the next match in a line.
/// This is broken out from the executor to avoid needing to thread
/// lifetimes around.
pub trait MatchProducer: std::fmt::Debug {
    /// Attempt to match at the given location.
    /// \return either the Match and the position to start looking for the next
    /// match, or None on failure.
    fn next_match(
        &mut self,
        pos: usize,
        next_start: &mut Option<usize>,
    ) -> Option<Result<Match<usize>, MatchError>>;
}

/// Produces successive matches in one line.
#[derive(Debug)]
pub struct LineProducer<'r, 't> {
    re: &'r CompiledRegex,
    line: SingleLine<'t>,
    opts: MatchOptions<'t>,
}

impl<'r, 't> LineProducer<'r, 't> {
    pub fn new(re: &'r CompiledRegex, text: &'t str, opts: MatchOptions<'t>) -> Self {
        LineProducer {
            re,
            line: SingleLine(text),
            opts,
        }
    }
}

impl MatchProducer for LineProducer<'_, '_> {
    fn next_match(
        &mut self,
        pos: usize,
        next_start: &mut Option<usize>,
    ) -> Option<Result<Match<usize>, MatchError>> {
        let mut exec = BacktrackExecutor::new(self.re, Cursor::single(&self.line), &self.opts);
        let raw = match exec.search(pos) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                *next_start = None;
                return None;
            }
            Err(err) => {
                *next_start = None;
                return Some(Err(err));
            }
        };
        let mat = match Match::from_raw(raw, |p| p.col) {
            Some(mat) => mat,
            None => {
                *next_start = None;
                return None;
            }
        };
        let text = self.line.0;
        // Resume after the match; after an empty match, one character past
        // where it started.
        *next_start = if mat.end() > mat.match_col {
            Some(mat.end())
        } else {
            text.get(mat.match_col..)
                .and_then(|rest| rest.chars().next())
                .map(|c| mat.match_col + c.len_utf8())
        };
        Some(Ok(mat))
    }
}

/// A struct which enables iteration over matches.
#[derive(Debug)]
pub struct Matches<Producer: MatchProducer> {
    mp: Producer,
    offset: Option<usize>,
}

impl<Producer: MatchProducer> Matches<Producer> {
    pub fn new(mp: Producer, start: usize) -> Self {
        Matches {
            mp,
            offset: Some(start),
        }
    }
}

impl<Producer: MatchProducer> Iterator for Matches<Producer> {
    type Item = Result<Match<usize>, MatchError>;
    fn next(&mut self) -> Option<Self::Item> {
        let start = self.offset?;
        self.mp.next_match(start, &mut self.offset)
    }
}
