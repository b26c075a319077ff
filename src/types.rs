use crate::charclasses::PosixClass;
use core::ops;

/// Number of capture slots, including slot 0 for the whole match.
pub const NSUBEXP: usize = 10;

/// Number of slots for complex `\{}` loops.
pub const MAX_COMPLEX_BRACES: usize = 10;

/// The "unbounded" repeat count.
pub const MAX_LIMIT: u32 = 32767 << 16;

/// Index of a node in the program.
pub type NodeId = usize;

/// A position inside a multi-line match.
/// `lnum` is relative to the first line of the search and may be negative
/// while a lookbehind scans backwards.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Pos {
    pub lnum: isize,
    pub col: usize,
}

impl Pos {
    pub fn new(lnum: isize, col: usize) -> Pos {
        Pos { lnum, col }
    }
}

/// A position in a buffer: an absolute line number and a byte column,
/// both counted from 0.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct LinePos {
    pub lnum: usize,
    pub col: usize,
}

impl LinePos {
    pub fn new(lnum: usize, col: usize) -> LinePos {
        LinePos { lnum, col }
    }
}

/// Representation of a capture group during matching.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct GroupData {
    pub start: Option<Pos>,
    pub end: Option<Pos>,
}

impl GroupData {
    pub fn as_range(&self) -> Option<ops::Range<Pos>> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(ops::Range { start, end }),
            _ => None,
        }
    }
}

/// One element of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionItem {
    /// An inclusive range of chars; a single char is a range of one.
    Range(char, char),
    /// A named class like `[:alpha:]`.
    Class(PosixClass),
}

/// The stuff in a bracket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BracketContents {
    pub invert: bool,
    pub items: Vec<CollectionItem>,
}

impl BracketContents {
    pub fn add_char(&mut self, c: char) {
        self.items.push(CollectionItem::Range(c, c))
    }

    fn contains_exact(&self, c: char) -> bool {
        self.items.iter().any(|item| match *item {
            CollectionItem::Range(first, last) => first <= c && c <= last,
            CollectionItem::Class(class) => class.contains(c),
        })
    }

    /// \return whether the bracket matches the given character, respecting
    /// `icase` and `invert`.
    pub fn matches(&self, c: char, icase: bool) -> bool {
        let mut contained = self.contains_exact(c);
        if !contained && icase {
            contained = crate::matchers::case_variants(c)
                .into_iter()
                .flatten()
                .any(|v| self.contains_exact(v));
        }
        contained != self.invert
    }
}

/// Comparison used by `\%23l`, `\%<23c`, `\%>'m` and friends.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Comparator {
    Equal,
    Less,
    Greater,
}

impl Comparator {
    pub fn from_char(c: char) -> Comparator {
        match c {
            '<' => Comparator::Less,
            '>' => Comparator::Greater,
            _ => Comparator::Equal,
        }
    }

    /// \return whether `val` compares to `n` as requested.
    pub fn test(self, val: u64, n: u64) -> bool {
        match self {
            Comparator::Less => val < n,
            Comparator::Greater => val > n,
            Comparator::Equal => val == n,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Comparator::Equal => "",
            Comparator::Less => "<",
            Comparator::Greater => ">",
        }
    }
}

/// The number argument of a `\%l`, `\%c` or `\%v` item.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PosArg {
    Number(u64),
    /// `\%.l`: compare with the cursor.
    Cursor,
}
