//! Program nodes for a compiled regex

use crate::charclasses::ClassType;
use crate::types::{BracketContents, Comparator, NodeId, PosArg};
use core::fmt;
use memchr::memmem;

/// Header byte of every program. Checked before each search.
pub const REGMAGIC: u8 = 0o234;

/// One operation. Ops that take an operand (BRANCH, the repeats and the
/// lookarounds) find it at the node right after them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// End of the program, or of a lookaround operand.
    End,

    /// Start of line, `^`.
    Bol,

    /// End of line, `$`.
    Eol,

    /// Try the operand; on failure go on with the next BRANCH.
    Branch,

    /// Loop back to a BRANCH or BRACE_COMPLEX. Fails when the loop came
    /// around without consuming anything.
    Back,

    /// A literal string.
    Exactly(Box<str>),

    /// Match the empty string.
    Nothing,

    /// The single-character operand, any number of times.
    Star,

    /// The single-character operand, at least once.
    Plus,

    /// `\@=`: the operand must match here.
    Match,

    /// `\@!`: the operand must not match here.
    NoMatch,

    /// `\@<=`: the operand must match just before here. `limit` is the
    /// maximum number of bytes to look back; 0 is unlimited.
    Behind { limit: u32 },

    /// `\@<!`.
    NoBehind { limit: u32 },

    /// `\@>`: match the operand as an atomic whole.
    SubPat,

    /// The single-character operand, between the limits of the preceding
    /// BRACE_LIMITS.
    BraceSimple,

    /// Start of word, `\<`.
    Bow,

    /// End of word, `\>`.
    Eow,

    /// Limits for the BRACE_SIMPLE or BRACE_COMPLEX that its `next`
    /// points to. min > max means lazy.
    BraceLimits { min: u32, max: u32 },

    /// A line break.
    Newl,

    /// End of a lookbehind operand: must be at the saved position.
    BhPos,

    /// A character class; with `nl` it also matches a line break.
    Class { class: ClassType, nl: bool },

    /// A collection; with `nl` it also matches a line break.
    AnyOf { bracket: Box<BracketContents>, nl: bool },

    /// Start and end of capture group N. Group 0 is `\zs` and `\ze`.
    MOpen(u8),
    MClose(u8),

    /// `\1`..`\9`.
    BackRef(u8),

    /// Start and end of `\z(` group N.
    ZOpen(u8),
    ZClose(u8),

    /// `\z1`..`\z9`.
    ZRef(u8),

    /// A complex `\{}` loop, using counter slot N.
    BraceComplex(u8),

    /// `\%(` and its close.
    NOpen,
    NClose,

    /// `\%^` and `\%$`.
    Bof,
    Eof,

    /// `\%#`.
    Cursor,

    /// `\%V`.
    Visual,

    /// `\%23l`.
    Lnum { cmp: Comparator, arg: PosArg },

    /// `\%23c`.
    Col { cmp: Comparator, arg: PosArg },

    /// `\%23v`.
    VCol { cmp: Comparator, arg: PosArg },

    /// `\%'m`.
    Mark { cmp: Comparator, name: char },
}

impl Op {
    /// \return whether this op's operand is the following node.
    pub fn has_operand(&self) -> bool {
        matches!(
            self,
            Op::Branch
                | Op::Star
                | Op::Plus
                | Op::Match
                | Op::NoMatch
                | Op::Behind { .. }
                | Op::NoBehind { .. }
                | Op::SubPat
                | Op::BraceSimple
                | Op::BraceComplex(_)
        )
    }

    /// \return whether this op matches something that can cross a line.
    pub fn matches_newline(&self) -> bool {
        match self {
            Op::Newl => true,
            Op::Class { nl, .. } | Op::AnyOf { nl, .. } => *nl,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub op: Op,
    /// The node to go to after this one. None only for END.
    pub next: Option<NodeId>,
}

/// Pattern-wide flags recorded during compilation.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ProgramFlags {
    /// `\c` appeared: ignore case.
    pub icase: bool,
    /// `\C` appeared: match case.
    pub noicase: bool,
    /// `\Z` appeared. Accepted, no effect.
    pub icombine: bool,
    /// The pattern can match a line break.
    pub has_nl: bool,
    /// The pattern contains a lookbehind.
    pub has_lookbehind: bool,
    /// `\z(` groups are defined.
    pub z_set: bool,
    /// `\z1`..`\z9` are used.
    pub z_use: bool,
}

#[derive(Debug, Clone)]
pub struct CompiledRegex {
    /// Always REGMAGIC.
    pub magic: u8,

    /// The nodes. Execution starts at node 0.
    pub nodes: Vec<Node>,

    /// Only try at the start of the line (or file).
    pub anchored: bool,

    /// The match must start with this character.
    pub regstart: Option<char>,

    /// A literal that any match must contain.
    pub regmust: Option<Box<str>>,

    /// Searcher for `regmust`.
    pub must_finder: Option<memmem::Finder<'static>>,

    pub flags: ProgramFlags,
}

impl CompiledRegex {
    /// \return the node after `id` in the chain, if any.
    #[inline]
    pub fn regnext(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.next)
    }

    /// \return the operand of `id`.
    #[inline]
    pub fn operand(id: NodeId) -> NodeId {
        id + 1
    }

    /// \return the op at `id`, if it exists.
    #[inline]
    pub fn op(&self, id: NodeId) -> Option<&Op> {
        self.nodes.get(id).map(|n| &n.op)
    }
}

fn write_op(op: &Op, f: &mut fmt::Formatter) -> fmt::Result {
    match op {
        Op::Exactly(s) => write!(f, "EXACTLY {:?}", s),
        Op::Behind { limit } => write!(f, "BEHIND {}", limit),
        Op::NoBehind { limit } => write!(f, "NOBEHIND {}", limit),
        Op::BraceLimits { min, max } => write!(f, "BRACE_LIMITS {} {}", min, max),
        Op::Class { class, nl } => {
            let prefix = if *nl { "\\_" } else { "\\" };
            write!(f, "CLASS {}{}", prefix, class.as_char())
        }
        Op::AnyOf { bracket, nl } => {
            let kind = if bracket.invert { "ANYBUT" } else { "ANYOF" };
            let nl = if *nl { "+NL" } else { "" };
            write!(f, "{}{} {:?}", kind, nl, bracket.items)
        }
        Op::MOpen(n) => write!(f, "MOPEN{}", n),
        Op::MClose(n) => write!(f, "MCLOSE{}", n),
        Op::BackRef(n) => write!(f, "BACKREF{}", n),
        Op::ZOpen(n) => write!(f, "ZOPEN{}", n),
        Op::ZClose(n) => write!(f, "ZCLOSE{}", n),
        Op::ZRef(n) => write!(f, "ZREF{}", n),
        Op::BraceComplex(n) => write!(f, "BRACE_COMPLEX{}", n),
        Op::Lnum { cmp, arg } => write!(f, "LNUM {}{:?}", cmp.as_str(), arg),
        Op::Col { cmp, arg } => write!(f, "COL {}{:?}", cmp.as_str(), arg),
        Op::VCol { cmp, arg } => write!(f, "VCOL {}{:?}", cmp.as_str(), arg),
        Op::Mark { cmp, name } => write!(f, "MARK {}'{}", cmp.as_str(), name),
        Op::End => f.write_str("END"),
        Op::Bol => f.write_str("BOL"),
        Op::Eol => f.write_str("EOL"),
        Op::Branch => f.write_str("BRANCH"),
        Op::Back => f.write_str("BACK"),
        Op::Nothing => f.write_str("NOTHING"),
        Op::Star => f.write_str("STAR"),
        Op::Plus => f.write_str("PLUS"),
        Op::Match => f.write_str("MATCH"),
        Op::NoMatch => f.write_str("NOMATCH"),
        Op::SubPat => f.write_str("SUBPAT"),
        Op::BraceSimple => f.write_str("BRACE_SIMPLE"),
        Op::Bow => f.write_str("BOW"),
        Op::Eow => f.write_str("EOW"),
        Op::Newl => f.write_str("NEWL"),
        Op::BhPos => f.write_str("BHPOS"),
        Op::NOpen => f.write_str("NOPEN"),
        Op::NClose => f.write_str("NCLOSE"),
        Op::Bof => f.write_str("BOF"),
        Op::Eof => f.write_str("EOF"),
        Op::Cursor => f.write_str("CURSOR"),
        Op::Visual => f.write_str("VISUAL"),
    }
}

impl fmt::Display for CompiledRegex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (idx, node) in self.nodes.iter().enumerate() {
            write!(f, "{:3}: ", idx)?;
            write_op(&node.op, f)?;
            match node.next {
                Some(next) => writeln!(f, " ({})", next)?,
                None => writeln!(f, " (0)")?,
            }
        }
        if self.anchored {
            writeln!(f, "anchored")?;
        }
        if let Some(c) = self.regstart {
            writeln!(f, "start {:?}", c)?;
        }
        if let Some(must) = &self.regmust {
            writeln!(f, "must have {:?}", must)?;
        }
        Ok(())
    }
}
