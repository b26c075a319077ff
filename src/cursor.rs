//! The text a match runs over, and the matcher's place in it.

use crate::types::{LinePos, Pos};

/// Width of a tab for `\%v`, unless a source says otherwise.
pub const DEFAULT_TABSTOP: usize = 8;

/// Lines of text to match against, plus the editor state that the
/// position atoms (`\%#`, `\%'m`, `\%V`, `\%v`) look at.
/// Line numbers are absolute and start at 0.
pub trait LineSource {
    /// \return line `lnum`, without its line break, or None past the end.
    fn line(&self, lnum: usize) -> Option<&str>;

    /// The cursor position, for `\%#` and `\%.l`.
    fn cursor(&self) -> Option<LinePos> {
        None
    }

    /// The position of mark `name`, for `\%'m`.
    fn mark(&self, _name: char) -> Option<LinePos> {
        None
    }

    /// \return whether a position is inside the Visual area, for `\%V`.
    fn in_visual(&self, _pos: LinePos) -> bool {
        false
    }

    /// The screen column (from 0) at which byte `col` of `line` starts.
    fn virtual_col(&self, line: &str, col: usize) -> usize {
        let mut vcol = 0;
        for c in line.get(..col).unwrap_or(line).chars() {
            if c == '\t' {
                vcol += DEFAULT_TABSTOP - vcol % DEFAULT_TABSTOP;
            } else {
                vcol += 1;
            }
        }
        vcol
    }
}

/// A lone string: line 0 is the string, there are no other lines.
#[derive(Debug, Copy, Clone)]
pub struct SingleLine<'a>(pub &'a str);

impl LineSource for SingleLine<'_> {
    fn line(&self, lnum: usize) -> Option<&str> {
        if lnum == 0 {
            Some(self.0)
        } else {
            None
        }
    }
}

impl LineSource for Vec<&str> {
    fn line(&self, lnum: usize) -> Option<&str> {
        self.get(lnum).copied()
    }
}

impl<const N: usize> LineSource for [&str; N] {
    fn line(&self, lnum: usize) -> Option<&str> {
        self.get(lnum).copied()
    }
}

impl LineSource for Vec<String> {
    fn line(&self, lnum: usize) -> Option<&str> {
        self.get(lnum).map(String::as_str)
    }
}

/// The matcher's position in a LineSource.
/// `lnum` is relative to the line the search started on.
pub struct Cursor<'s> {
    source: &'s dyn LineSource,

    /// Absolute number of relative line 0.
    first_line: usize,

    /// Last relative line a match may reach.
    maxline: isize,

    /// Lines are separate; a line break is the end of one line. When
    /// false there is one line, in which a '\n' is a line break.
    multi: bool,

    pub lnum: isize,
    pub line: &'s str,
    pub col: usize,
}

impl core::fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Cursor")
            .field("first_line", &self.first_line)
            .field("lnum", &self.lnum)
            .field("col", &self.col)
            .finish()
    }
}

impl<'s> Cursor<'s> {
    /// A cursor over one string.
    pub fn single(source: &'s dyn LineSource) -> Self {
        Cursor {
            source,
            first_line: 0,
            maxline: 0,
            multi: false,
            lnum: 0,
            line: source.line(0).unwrap_or(""),
            col: 0,
        }
    }

    /// A cursor over `line_count` lines of `source` from `first_line`.
    pub fn multi(source: &'s dyn LineSource, first_line: usize, line_count: usize) -> Self {
        Cursor {
            source,
            first_line,
            maxline: line_count.max(1) as isize - 1,
            multi: true,
            lnum: 0,
            line: source.line(first_line).unwrap_or(""),
            col: 0,
        }
    }

    #[inline]
    pub fn is_multi(&self) -> bool {
        self.multi
    }

    /// A '\n' in the text is a line break.
    #[inline]
    pub fn line_lbr(&self) -> bool {
        !self.multi
    }

    #[inline]
    pub fn maxline(&self) -> isize {
        self.maxline
    }

    #[inline]
    pub fn first_line(&self) -> usize {
        self.first_line
    }

    pub fn source(&self) -> &'s dyn LineSource {
        self.source
    }

    /// \return relative line `lnum`. None before the first line of the
    /// source; empty past the last line a match may reach.
    pub fn getline(&self, lnum: isize) -> Option<&'s str> {
        let abs = self.first_line as isize + lnum;
        if abs < 0 {
            return None;
        }
        if lnum > self.maxline {
            return Some("");
        }
        if !self.multi && lnum != 0 {
            return None;
        }
        Some(self.source.line(abs as usize).unwrap_or(""))
    }

    /// Absolute position of a relative one.
    pub fn absolute(&self, pos: Pos) -> LinePos {
        LinePos::new((self.first_line as isize + pos.lnum).max(0) as usize, pos.col)
    }

    #[inline]
    pub fn pos(&self) -> Pos {
        Pos::new(self.lnum, self.col)
    }

    /// Move to `pos`, fetching its line if it is a different one.
    pub fn set_pos(&mut self, pos: Pos) {
        if pos.lnum != self.lnum {
            self.lnum = pos.lnum;
            self.line = self.getline(pos.lnum).unwrap_or("");
        }
        self.col = pos.col.min(self.line.len());
    }

    /// The text after the cursor on this line.
    #[inline]
    pub fn rest(&self) -> &'s str {
        self.line.get(self.col..).unwrap_or("")
    }

    /// The character under the cursor; None at the end of the line.
    #[inline]
    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// The character before the cursor; None at the start of the line.
    #[inline]
    pub fn peek_back(&self) -> Option<char> {
        self.line.get(..self.col)?.chars().next_back()
    }

    #[inline]
    pub fn at_line_start(&self) -> bool {
        self.col == 0
    }

    #[inline]
    pub fn at_line_end(&self) -> bool {
        self.col >= self.line.len()
    }

    /// Step over the character under the cursor.
    #[inline]
    pub fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.col += c.len_utf8();
        }
    }

    /// Step back one character. \return false at the start of the line.
    #[inline]
    pub fn back(&mut self) -> bool {
        match self.peek_back() {
            Some(c) => {
                self.col -= c.len_utf8();
                true
            }
            None => false,
        }
    }

    /// Go to the start of the next line.
    pub fn nextline(&mut self) {
        self.lnum += 1;
        self.line = self.getline(self.lnum).unwrap_or("");
        self.col = 0;
    }

    /// \return whether the end of this line is a line break a match may
    /// cross.
    #[inline]
    pub fn can_cross_line(&self) -> bool {
        self.multi && self.lnum <= self.maxline
    }

    /// Screen column (from 0) of the cursor.
    pub fn virtual_col(&self) -> usize {
        self.source.virtual_col(self.line, self.col)
    }
}
