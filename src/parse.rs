//! Parses a Vim pattern and compiles it to a program.
//!
//! This is a recursive descent compiler that emits nodes directly. It runs
//! twice over the pattern: once to find the size and report errors, then
//! again to emit into a buffer of that size.

use crate::api;
use crate::charclasses::{self, ClassType, PosixClass};
use crate::emit::Emitter;
use crate::error::Error;
use crate::insn::{CompiledRegex, Op, ProgramFlags, REGMAGIC};
use crate::lexer::{backslash_trans, Lexer, MagicLevel, Token};
use crate::startpredicate;
use crate::types::{
    BracketContents, CollectionItem, Comparator, NodeId, PosArg, MAX_COMPLEX_BRACES, MAX_LIMIT,
    NSUBEXP,
};
use log::debug;

// Properties of a compiled piece, passed up the descent.
const WORST: u32 = 0;
/// Known never to match the empty string.
const HASWIDTH: u32 = 0x1;
/// Matches exactly one character, so it can be the operand of STAR.
const SIMPLE: u32 = 0x2;
/// Starts with a `*` or `+`.
const SPSTART: u32 = 0x4;
/// Can match a line break.
const HASNL: u32 = 0x8;
/// Contains a lookbehind.
const HASLOOKBH: u32 = 0x10;

/// Largest program we are willing to build.
const MAX_NODES: usize = 1 << 16;

/// Deepest group nesting.
const MAX_DEPTH: usize = 250;

/// Characters a backslash escapes inside a collection.
const INRANGE: &str = "]^-n\\";
const ABBR: &str = "nrtebdoxuU";

type ParseResult = Result<(NodeId, u32), Error>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Paren {
    /// The whole pattern.
    None,
    /// `\(`.
    Capture,
    /// `\%(`.
    NonCapture,
    /// `\z(`.
    Z,
}

fn is_multi(t: Token) -> bool {
    matches!(
        t,
        Token::Magic('@' | '=' | '?' | '*' | '+' | '{')
    )
}

/// Multis that repeat, as opposed to the zero-or-one ones.
fn is_multi_mult(t: Token) -> bool {
    matches!(t, Token::Magic('*' | '+' | '{'))
}

/// Parse leading decimal digits of `s`. \return the value and digit count.
fn get_digits(s: &[u8]) -> (u64, usize) {
    let len = s.iter().take_while(|b| b.is_ascii_digit()).count();
    let value = s[..len].iter().fold(0u64, |acc, b| {
        acc.saturating_mul(10).saturating_add(u64::from(b - b'0'))
    });
    (value, len)
}

/// Parse a `[:name:]` at the start of `s`. \return the class and its length.
fn get_char_class(s: &str) -> Option<(PosixClass, usize)> {
    let inner = s.strip_prefix("[:")?;
    let end = inner.find(":]")?;
    let class = PosixClass::from_name(&inner[..end])?;
    Some((class, end + 4))
}

/// Parse `[=x=]` or `[.x.]` at the start of `s`, depending on `delim`.
fn get_bracketed_char(s: &str, delim: char) -> Option<(char, usize)> {
    let mut chars = s.chars();
    if chars.next()? != '[' || chars.next()? != delim {
        return None;
    }
    let c = chars.next()?;
    if chars.next()? == delim && chars.next()? == ']' {
        Some((c, c.len_utf8() + 4))
    } else {
        None
    }
}

/// \return the length of a class, equivalence class or collating element
/// at the start of `s`.
fn bracket_item_len(s: &str) -> Option<usize> {
    get_char_class(s)
        .map(|(_, len)| len)
        .or_else(|| get_bracketed_char(s, '=').map(|(_, len)| len))
        .or_else(|| get_bracketed_char(s, '.').map(|(_, len)| len))
}

fn char_len_at(s: &str, p: usize) -> usize {
    s.get(p..)
        .and_then(|rest| rest.chars().next())
        .map_or(1, char::len_utf8)
}

/// \return whether the collection body at the start of `s` has a closing
/// `]`.
fn has_collection_end(s: &str) -> bool {
    let b = s.as_bytes();
    let mut p = 0;
    if b.first() == Some(&b'^') {
        p += 1;
    }
    if matches!(b.get(p), Some(b']' | b'-')) {
        p += 1;
    }
    while let Some(&c) = b.get(p) {
        if c == b']' {
            break;
        }
        if c >= 0x80 {
            p += char_len_at(s, p);
        } else if c == b'-' {
            p += 1;
            if matches!(b.get(p), Some(&n) if n != b']') {
                p += char_len_at(s, p);
            }
        } else if c == b'\\'
            && b
                .get(p + 1)
                .map_or(false, |&n| INRANGE.as_bytes().contains(&n) || ABBR.as_bytes().contains(&n))
        {
            p += 2;
        } else if c == b'[' {
            p += bracket_item_len(&s[p..]).unwrap_or(1);
        } else {
            p += 1;
        }
    }
    b.get(p) == Some(&b']')
}

/// \return the pattern with a leading `\%#=N` engine selector removed.
fn strip_engine_selector(pattern: &str) -> &str {
    match pattern.strip_prefix("\\%#=") {
        Some(rest) if matches!(rest.as_bytes().first(), Some(b'0'..=b'2')) => &rest[1..],
        _ => pattern,
    }
}

struct Parser<'a> {
    lex: Lexer<'a>,
    em: Emitter,
    flags: &'a api::Flags,

    /// The text that `~` stands for.
    prev_sub: Option<&'a str>,

    /// Next `\(` and `\z(` numbers.
    regnpar: usize,
    regnzpar: usize,

    num_complex_braces: usize,

    /// Which `\(` groups have been closed; a backref needs one of these.
    had_endbrace: [bool; NSUBEXP],

    /// Inside `\%[]`: each atom must be a single item.
    one_exactly: bool,

    pflags: ProgramFlags,

    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(
        pattern: &'a str,
        flags: &'a api::Flags,
        prev_sub: Option<&'a str>,
        em: Emitter,
    ) -> Self {
        let magic = if flags.nomagic {
            MagicLevel::NoMagic
        } else {
            MagicLevel::Magic
        };
        Parser {
            lex: Lexer::new(pattern, magic),
            em,
            flags,
            prev_sub,
            regnpar: 1,
            regnzpar: 1,
            num_complex_braces: 0,
            had_endbrace: [false; NSUBEXP],
            one_exactly: false,
            pflags: ProgramFlags::default(),
            depth: 0,
        }
    }

    fn group_prefix(&self) -> String {
        self.lex.group_prefix().to_string()
    }

    fn invalid_in_optional(&self) -> Error {
        Error::InvalidInOptional(self.group_prefix())
    }

    /// Parse a regular expression: the body of a group, or the whole
    /// pattern. Alternatives are linked through their BRANCH nodes, and
    /// every alternative ends at the closing node.
    fn reg(&mut self, paren: Paren) -> ParseResult {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(Error::PatternTooLong);
        }
        let result = self.reg_body(paren);
        self.depth -= 1;
        result
    }

    fn reg_body(&mut self, paren: Paren) -> ParseResult {
        let mut flagp = HASWIDTH;
        let mut parno = 0;
        let open = match paren {
            Paren::Z => {
                if self.regnzpar >= NSUBEXP {
                    return Err(Error::TooManyZGroups);
                }
                parno = self.regnzpar;
                self.regnzpar += 1;
                Some(self.em.node(Op::ZOpen(parno as u8)))
            }
            Paren::Capture => {
                if self.regnpar >= NSUBEXP {
                    return Err(Error::TooManyGroups(self.group_prefix()));
                }
                parno = self.regnpar;
                self.regnpar += 1;
                Some(self.em.node(Op::MOpen(parno as u8)))
            }
            Paren::NonCapture => Some(self.em.node(Op::NOpen)),
            Paren::None => None,
        };

        let (br, flags) = self.regbranch()?;
        let ret = match open {
            Some(open) => {
                self.em.tail(open, br);
                open
            }
            None => br,
        };
        if flags & HASWIDTH == 0 {
            flagp &= !HASWIDTH;
        }
        flagp |= flags & (SPSTART | HASNL | HASLOOKBH);
        while self.lex.peekchr() == Token::Magic('|') {
            self.lex.skipchr();
            let (br, flags) = self.regbranch()?;
            self.em.tail(ret, br);
            if flags & HASWIDTH == 0 {
                flagp &= !HASWIDTH;
            }
            flagp |= flags & (SPSTART | HASNL | HASLOOKBH);
        }

        let ender = self.em.node(match paren {
            Paren::Z => Op::ZClose(parno as u8),
            Paren::Capture => Op::MClose(parno as u8),
            Paren::NonCapture => Op::NClose,
            Paren::None => Op::End,
        });
        self.em.tail(ret, ender);

        // Hook the end of each alternative to the closing node.
        let mut br = Some(ret);
        while let Some(b) = br {
            self.em.op_tail(b, ender);
            br = self.em.next_of(b);
        }

        if paren != Paren::None {
            if self.lex.getchr() != Token::Magic(')') {
                return Err(match paren {
                    Paren::Z => Error::UnmatchedZOpen,
                    Paren::NonCapture => Error::UnmatchedNonCapture(self.group_prefix()),
                    _ => Error::UnmatchedOpen(self.group_prefix()),
                });
            }
        } else if self.lex.peekchr() != Token::End {
            return Err(if self.lex.peekchr() == Token::Magic(')') {
                Error::UnmatchedClose(self.group_prefix())
            } else {
                Error::TrailingCharacters
            });
        }
        if paren == Paren::Capture {
            self.had_endbrace[parno] = true;
        }
        Ok((ret, flagp))
    }

    /// Parse one alternative: concats separated by `\&`. Each concat but
    /// the last becomes the operand of a MATCH.
    fn regbranch(&mut self) -> ParseResult {
        let mut flagp = WORST | HASNL;
        let ret = self.em.node(Op::Branch);
        let mut chain = None;
        loop {
            let (latest, flags) = self.regconcat()?;
            flagp |= flags & (HASWIDTH | SPSTART | HASLOOKBH);
            flagp &= !HASNL | (flags & HASNL);
            if let Some(chain) = chain {
                self.em.tail(chain, latest);
            }
            if self.lex.peekchr() != Token::Magic('&') {
                break;
            }
            self.lex.skipchr();
            let end = self.em.node(Op::End);
            self.em.tail(latest, end);
            self.em.insert(Op::Match, latest);
            chain = Some(latest);
        }
        Ok((ret, flagp))
    }

    /// Parse a sequence of pieces, handling the flag items in between.
    fn regconcat(&mut self) -> ParseResult {
        let mut flagp = WORST;
        let mut first = None;
        let mut chain: Option<NodeId> = None;
        loop {
            match self.lex.peekchr() {
                Token::End | Token::Magic('|' | '&' | ')') => break,
                Token::Magic('Z') => {
                    self.pflags.icombine = true;
                    self.lex.skipchr_keepstart();
                }
                Token::Magic('c') => {
                    self.pflags.icase = true;
                    self.lex.skipchr_keepstart();
                }
                Token::Magic('C') => {
                    self.pflags.noicase = true;
                    self.lex.skipchr_keepstart();
                }
                Token::Magic(m @ ('v' | 'm' | 'M' | 'V')) => {
                    self.lex.magic = match m {
                        'v' => MagicLevel::VeryMagic,
                        'm' => MagicLevel::Magic,
                        'M' => MagicLevel::NoMagic,
                        _ => MagicLevel::VeryNoMagic,
                    };
                    self.lex.skipchr_keepstart();
                    self.lex.forget_peek();
                }
                _ => {
                    let (latest, flags) = self.regpiece()?;
                    if self.em.size() > MAX_NODES {
                        return Err(Error::PatternTooLong);
                    }
                    flagp |= flags & (HASWIDTH | HASNL | HASLOOKBH);
                    match chain {
                        None => flagp |= flags & SPSTART,
                        Some(chain) => self.em.tail(chain, latest),
                    }
                    chain = Some(latest);
                    first.get_or_insert(latest);
                }
            }
        }
        let first = match first {
            Some(first) => first,
            None => self.em.node(Op::Nothing),
        };
        Ok((first, flagp))
    }

    /// Parse an atom and the multi that may follow it.
    fn regpiece(&mut self) -> ParseResult {
        let (ret, flags) = self.regatom()?;
        let op = self.lex.peekchr();
        if !is_multi(op) {
            return Ok((ret, flags));
        }
        let mut flagp = WORST | SPSTART | (flags & (HASNL | HASLOOKBH));
        self.lex.skipchr();
        match op {
            Token::Magic('*') => {
                if flags & SIMPLE != 0 {
                    self.em.insert(Op::Star, ret);
                } else {
                    // x* is (x&|), where & loops back to the BRANCH.
                    self.em.insert(Op::Branch, ret);
                    let back = self.em.node(Op::Back);
                    self.em.op_tail(ret, back);
                    self.em.op_tail(ret, ret);
                    let br = self.em.node(Op::Branch);
                    self.em.tail(ret, br);
                    let nothing = self.em.node(Op::Nothing);
                    self.em.tail(ret, nothing);
                }
            }
            Token::Magic('+') => {
                if flags & SIMPLE != 0 {
                    self.em.insert(Op::Plus, ret);
                } else {
                    // x+ is x(&|).
                    let next = self.em.node(Op::Branch);
                    self.em.tail(ret, next);
                    let back = self.em.node(Op::Back);
                    self.em.tail(back, ret);
                    let br = self.em.node(Op::Branch);
                    self.em.tail(next, br);
                    let nothing = self.em.node(Op::Nothing);
                    self.em.tail(ret, nothing);
                }
                flagp = WORST | HASWIDTH | (flags & (HASNL | HASLOOKBH));
            }
            Token::Magic('@') => {
                let nr = self.lex.get_dec();
                let lop = match self.lex.getchr().no_magic() {
                    Some('=') => Some(Op::Match),
                    Some('!') => Some(Op::NoMatch),
                    Some('>') => Some(Op::SubPat),
                    Some('<') => {
                        let limit = nr.map_or(0, |n| n.min(u64::from(u32::MAX)) as u32);
                        match self.lex.getchr().no_magic() {
                            Some('=') => Some(Op::Behind { limit }),
                            Some('!') => Some(Op::NoBehind { limit }),
                            _ => None,
                        }
                    }
                    _ => None,
                };
                let lop = lop.ok_or_else(|| Error::InvalidAfterAt(self.group_prefix()))?;
                let behind = matches!(lop, Op::Behind { .. } | Op::NoBehind { .. });
                if behind {
                    let bhpos = self.em.node(Op::BhPos);
                    self.em.tail(ret, bhpos);
                    flagp |= HASLOOKBH;
                }
                let end = self.em.node(Op::End);
                self.em.tail(ret, end);
                self.em.insert(lop, ret);
            }
            Token::Magic('?' | '=') => {
                // x= is (x|).
                self.em.insert(Op::Branch, ret);
                let br = self.em.node(Op::Branch);
                self.em.tail(ret, br);
                let next = self.em.node(Op::Nothing);
                self.em.tail(ret, next);
                self.em.op_tail(ret, next);
            }
            Token::Magic('{') => {
                let (min, max) = self.read_limits()?;
                if flags & SIMPLE != 0 {
                    self.em.insert(Op::BraceSimple, ret);
                    self.em.insert_limits(min, max, ret);
                } else {
                    if self.num_complex_braces >= MAX_COMPLEX_BRACES {
                        return Err(Error::TooManyComplexBraces(self.group_prefix()));
                    }
                    self.em
                        .insert(Op::BraceComplex(self.num_complex_braces as u8), ret);
                    let back = self.em.node(Op::Back);
                    self.em.op_tail(ret, back);
                    self.em.op_tail(ret, ret);
                    self.em.insert_limits(min, max, ret);
                    self.num_complex_braces += 1;
                }
                if min > 0 && max > 0 {
                    flagp = HASWIDTH | (flags & (HASNL | HASLOOKBH));
                }
            }
            _ => {}
        }

        let next = self.lex.peekchr();
        if is_multi(next) {
            return Err(if next == Token::Magic('*') {
                Error::NestedStar(self.lex.magic_prefix().to_string())
            } else {
                Error::NestedMulti(self.group_prefix(), next.no_magic().unwrap_or('?'))
            });
        }
        Ok((ret, flagp))
    }

    /// Parse the bounds of `\{n,m}` after the opening brace.
    /// \return (min, max); min > max means lazy.
    fn read_limits(&mut self) -> Result<(u32, u32), Error> {
        let rest = self.lex.rest().as_bytes();
        let mut p = 0;
        let reverse = rest.first() == Some(&b'-');
        if reverse {
            p += 1;
        }
        let first_is_digit = rest.get(p).map_or(false, u8::is_ascii_digit);
        let (min, len) = get_digits(&rest[p..]);
        p += len;
        let max = if rest.get(p) == Some(&b',') {
            p += 1;
            if rest.get(p).map_or(false, u8::is_ascii_digit) {
                let (max, len) = get_digits(&rest[p..]);
                p += len;
                max
            } else {
                u64::from(MAX_LIMIT)
            }
        } else if first_is_digit {
            min
        } else {
            u64::from(MAX_LIMIT)
        };
        if rest.get(p) == Some(&b'\\') {
            p += 1;
        }
        if rest.get(p) != Some(&b'}') {
            return Err(Error::BraceSyntax(self.group_prefix()));
        }
        let clamp = |n: u64| n.min(u64::from(MAX_LIMIT)) as u32;
        let (mut min, mut max) = (clamp(min), clamp(max));
        if (!reverse && min > max) || (reverse && min < max) {
            std::mem::swap(&mut min, &mut max);
        }
        self.lex.advance_raw(p);
        self.lex.skipchr();
        Ok((min, max))
    }

    /// A backref must come after its group closed, or be inside a
    /// lookbehind that follows the group.
    fn seen_endbrace(&self, refnum: usize) -> Result<(), Error> {
        if self.had_endbrace[refnum]
            || self.lex.rest().contains("@<=")
            || self.lex.rest().contains("@<!")
        {
            Ok(())
        } else {
            Err(Error::InvalidBackref)
        }
    }

    fn class_node(&mut self, c: char, nl: bool) -> ParseResult {
        let class = ClassType::from_char(c).ok_or(Error::InvalidNewlineClass)?;
        let flags = if nl { HASWIDTH | SIMPLE | HASNL } else { HASWIDTH | SIMPLE };
        Ok((self.em.node(Op::Class { class, nl }), flags))
    }

    /// Parse the smallest unit: a literal run, a class, a group, an anchor
    /// and so on.
    fn regatom(&mut self) -> ParseResult {
        let save_prev_at_start = self.lex.prev_at_start();
        let c = self.lex.getchr();
        let node = |s: &mut Self, op: Op| -> ParseResult { Ok((s.em.node(op), WORST)) };
        match c {
            Token::Magic('^') => node(self, Op::Bol),
            Token::Magic('$') => node(self, Op::Eol),
            Token::Magic('<') => node(self, Op::Bow),
            Token::Magic('>') => node(self, Op::Eow),
            Token::Magic('_') => match self.lex.getchr().no_magic() {
                Some('^') => node(self, Op::Bol),
                Some('$') => node(self, Op::Eol),
                Some('[') => match self.collection(true)? {
                    Some(result) => Ok(result),
                    None => self.literal_run(Token::Lit('['), HASNL),
                },
                Some(c) => self.class_node(c, true),
                None => Err(Error::InvalidNewlineClass),
            },
            Token::Magic(c) if charclasses::CLASS_CHARS.contains(c) => self.class_node(c, false),
            Token::Magic('n') => Ok((self.em.node(Op::Newl), HASWIDTH | HASNL)),
            Token::Magic('(') => {
                if self.one_exactly {
                    return Err(self.invalid_in_optional());
                }
                let (ret, flags) = self.reg(Paren::Capture)?;
                Ok((ret, flags & (HASWIDTH | SPSTART | HASNL | HASLOOKBH)))
            }
            Token::End | Token::Magic('|' | '&' | ')') => {
                if self.one_exactly {
                    Err(self.invalid_in_optional())
                } else {
                    // regconcat() stops before these.
                    Err(Error::TrailingCharacters)
                }
            }
            Token::Magic(m @ ('=' | '?' | '+' | '@' | '{' | '*')) => {
                let prefix = if m == '*' {
                    self.lex.magic_prefix()
                } else {
                    self.lex.group_prefix()
                };
                Err(Error::FollowsNothing(prefix.to_string(), m))
            }
            Token::Magic('~') => {
                let sub = self.prev_sub.ok_or(Error::NoPreviousSubstitute)?;
                let ret = self.em.node(Op::Exactly(sub.into()));
                let flags = match sub.chars().count() {
                    0 => WORST,
                    1 => HASWIDTH | SIMPLE,
                    _ => HASWIDTH,
                };
                Ok((ret, flags))
            }
            Token::Magic(d @ '1'..='9') => {
                let refnum = d as usize - '0' as usize;
                self.seen_endbrace(refnum)?;
                node(self, Op::BackRef(refnum as u8))
            }
            Token::Magic('z') => self.z_atom(),
            Token::Magic('%') => self.percent_atom(save_prev_at_start),
            Token::Magic('[') => match self.collection(false)? {
                Some(result) => Ok(result),
                None => self.literal_run(c, WORST),
            },
            _ => self.literal_run(c, WORST),
        }
    }

    /// Parse the item after `\z`.
    fn z_atom(&mut self) -> ParseResult {
        match self.lex.getchr().no_magic() {
            Some('(') => {
                if !self.flags.extmatch_set {
                    return Err(Error::ZOpenNotAllowed);
                }
                if self.one_exactly {
                    return Err(self.invalid_in_optional());
                }
                let (ret, flags) = self.reg(Paren::Z)?;
                self.pflags.z_set = true;
                Ok((ret, flags & (HASWIDTH | SPSTART | HASNL | HASLOOKBH)))
            }
            Some(d @ '1'..='9') => {
                if !self.flags.extmatch_use {
                    return Err(Error::ZRefNotAllowed);
                }
                self.pflags.z_use = true;
                let n = d as u8 - b'0';
                Ok((self.em.node(Op::ZRef(n)), WORST))
            }
            Some(c @ ('s' | 'e')) => {
                let (op, what) = if c == 's' {
                    (Op::MOpen(0), "\\zs")
                } else {
                    (Op::MClose(0), "\\ze")
                };
                let ret = self.em.node(op);
                if is_multi_mult(self.lex.peekchr()) {
                    return Err(Error::CannotRepeat(what.to_string()));
                }
                Ok((ret, WORST))
            }
            _ => Err(Error::InvalidAfterZ),
        }
    }

    /// Parse the item after `\%`.
    fn percent_atom(&mut self, save_prev_at_start: bool) -> ParseResult {
        let c = self.lex.getchr().no_magic();
        let node = |s: &mut Self, op: Op| -> ParseResult { Ok((s.em.node(op), WORST)) };
        match c {
            Some('(') => {
                if self.one_exactly {
                    return Err(self.invalid_in_optional());
                }
                let (ret, flags) = self.reg(Paren::NonCapture)?;
                Ok((ret, flags & (HASWIDTH | SPSTART | HASNL | HASLOOKBH)))
            }
            Some('^') => node(self, Op::Bof),
            Some('$') => node(self, Op::Eof),
            Some('#') => {
                let rest = self.lex.rest().as_bytes();
                if rest.first() == Some(&b'=') {
                    if let Some(&d @ b'0'..=b'2') = rest.get(1) {
                        return Err(Error::EngineNotAtStart(d as char));
                    }
                }
                node(self, Op::Cursor)
            }
            Some('V') => node(self, Op::Visual),
            // Composing characters are not treated specially.
            Some('C') => node(self, Op::Nothing),
            Some('[') => self.optional_sequence(),
            Some(k @ ('d' | 'o' | 'x' | 'u' | 'U')) => {
                let nr = match k {
                    'd' => self.lex.get_dec(),
                    'o' => self.lex.get_oct(),
                    'x' => self.lex.get_hex(2),
                    'u' => self.lex.get_hex(4),
                    _ => self.lex.get_hex(8),
                };
                let ch = nr
                    .filter(|&n| n <= i32::MAX as u64)
                    .and_then(|n| if n == 0 { Some('\n') } else { char::from_u32(n as u32) })
                    .ok_or_else(|| Error::InvalidNumberEscape(self.group_prefix()))?;
                let ret = self.em.node(Op::Exactly(ch.to_string().into_boxed_str()));
                Ok((ret, HASWIDTH))
            }
            Some(first) if first.is_ascii_digit() || matches!(first, '<' | '>' | '\'' | '.') => {
                self.position_atom(first, save_prev_at_start)
            }
            _ => Err(Error::InvalidAfterPercent(self.group_prefix())),
        }
    }

    /// Parse `\%23l`, `\%<.c`, `\%>'m` and friends, starting at the
    /// character after the `%`.
    fn position_atom(&mut self, first: char, save_prev_at_start: bool) -> ParseResult {
        let cmp = Comparator::from_char(first);
        let mut c = Token::Lit(first);
        if matches!(first, '<' | '>') {
            c = self.lex.getchr();
        }
        let mut cur = false;
        if c.no_magic() == Some('.') {
            cur = true;
            c = self.lex.getchr();
        }
        let mut n: u64 = 0;
        let mut got_digit = false;
        while let Token::Lit(d @ '0'..='9') = c {
            got_digit = true;
            n = n
                .saturating_mul(10)
                .saturating_add(u64::from(d as u32 - '0' as u32));
            c = self.lex.getchr();
        }
        if c.no_magic() == Some('\'') && !cur && !got_digit {
            let name = self
                .lex
                .getchr()
                .no_magic()
                .ok_or_else(|| Error::InvalidAfterPercent(self.group_prefix()))?;
            return Ok((self.em.node(Op::Mark { cmp, name }), WORST));
        }
        // A bare `\%l` has no line to compare with.
        let kind = match c {
            Token::Lit(k @ ('l' | 'c' | 'v')) if cur || got_digit => k,
            _ => return Err(Error::InvalidAfterPercent(self.group_prefix())),
        };
        if cur && n != 0 {
            return Err(Error::NumberAfterDot(kind));
        }
        let arg = if cur {
            PosArg::Cursor
        } else {
            PosArg::Number(n)
        };
        let op = match kind {
            'l' => {
                if save_prev_at_start {
                    self.lex.set_at_start();
                }
                Op::Lnum { cmp, arg }
            }
            'c' => Op::Col { cmp, arg },
            _ => Op::VCol { cmp, arg },
        };
        Ok((self.em.node(op), WORST))
    }

    /// Parse `\%[abc]`: a chain of branches, each taking one more atom,
    /// all ending at a final empty branch.
    fn optional_sequence(&mut self) -> ParseResult {
        if self.one_exactly {
            return Err(self.invalid_in_optional());
        }
        let mut first = None;
        let mut lastnode = None;
        let mut flagp = WORST;
        loop {
            match self.lex.getchr() {
                Token::Lit(']') => break,
                Token::End => return Err(Error::MissingOptionalEnd(self.group_prefix())),
                _ => {}
            }
            let br = self.em.node(Op::Branch);
            match lastnode {
                None => first = Some(br),
                Some(last) => self.em.tail(last, br),
            }
            self.lex.ungetchr();
            self.one_exactly = true;
            let atom = self.regatom();
            self.one_exactly = false;
            let (node, flags) = atom?;
            flagp = flags;
            lastnode = Some(node);
        }
        let (ret, lastnode) = match (first, lastnode) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(Error::EmptyOptional(self.group_prefix())),
        };
        let lastbranch = self.em.node(Op::Branch);
        let nothing = self.em.node(Op::Nothing);
        if self.em.is_emitting() {
            self.em.tail(lastnode, nothing);
            self.em.tail(lastbranch, nothing);
            // Every branch skips to the final empty one.
            let mut scan = ret;
            while scan != lastnode {
                if self.em.op_at(scan) == Some(&Op::Branch) {
                    self.em.tail(scan, lastbranch);
                    scan += 1;
                } else {
                    match self.em.next_of(scan) {
                        Some(next) => scan = next,
                        None => break,
                    }
                }
            }
        }
        Ok((ret, flagp & !(HASWIDTH | SIMPLE)))
    }

    /// Parse a `[]` collection; the lexer is just past the `[`.
    /// \return None if there is no closing `]`, in which case the `[` is a
    /// literal.
    fn collection(&mut self, nl: bool) -> Result<Option<(NodeId, u32)>, Error> {
        if !has_collection_end(self.lex.rest()) {
            if self.flags.strict {
                return Err(Error::MissingCollectionEnd(
                    self.lex.magic_prefix().to_string(),
                ));
            }
            return Ok(None);
        }
        let mut flags = if nl { HASNL } else { WORST };
        let mut nl = nl;
        let mut bracket = BracketContents::default();
        if self.lex.raw_peek() == Some('^') {
            bracket.invert = true;
            self.lex.advance_raw(1);
        }
        // The last char added; a following '-' makes a range from it.
        let mut startc = None;
        if let Some(c @ (']' | '-')) = self.lex.raw_peek() {
            startc = Some(c);
            bracket.add_char(c);
            self.lex.advance_raw(1);
        }

        while let Some(c) = self.lex.raw_peek() {
            if c == ']' {
                break;
            }
            let rest = self.lex.rest();
            if c == '-' {
                self.lex.advance_raw(1);
                let rest = self.lex.rest();
                let start = match startc {
                    Some(start) if !rest.is_empty() && !rest.starts_with(']') && !rest.starts_with("\\n") => start,
                    _ => {
                        bracket.add_char('-');
                        startc = Some('-');
                        continue;
                    }
                };
                let mut endc = None;
                if rest.starts_with('[') {
                    if let Some((ch, len)) = get_bracketed_char(rest, '.') {
                        endc = Some(ch);
                        self.lex.advance_raw(len);
                    }
                }
                let mut endc = match endc {
                    Some(endc) => endc,
                    None => {
                        let ch = rest.chars().next().unwrap_or('-');
                        self.lex.advance_raw(ch.len_utf8());
                        ch
                    }
                };
                if endc == '\\' {
                    endc = self.coll_get_char();
                }
                if start > endc {
                    return Err(Error::ReverseRange);
                }
                if (!start.is_ascii() || !endc.is_ascii()) && endc as u32 > start as u32 + 256 {
                    return Err(Error::RangeTooLarge);
                }
                bracket.items.push(CollectionItem::Range(start, endc));
                startc = None;
            } else if c == '\\'
                && rest[1..]
                    .chars()
                    .next()
                    .map_or(false, |n| INRANGE.contains(n) || ABBR.contains(n))
            {
                self.lex.advance_raw(1);
                match self.lex.raw_peek() {
                    Some('n') => {
                        // "[^\n]" is the same as ".".
                        if !bracket.invert && !nl {
                            nl = true;
                            flags |= HASNL;
                        }
                        self.lex.advance_raw(1);
                        startc = None;
                    }
                    Some('d' | 'o' | 'x' | 'u' | 'U') => {
                        let ch = self.coll_get_char();
                        bracket.add_char(if ch == '\0' { '\n' } else { ch });
                        startc = Some(ch);
                    }
                    Some(e) => {
                        let ch = backslash_trans(e);
                        self.lex.advance_raw(e.len_utf8());
                        bracket.add_char(ch);
                        startc = Some(ch);
                    }
                    None => break,
                }
            } else if c == '[' {
                startc = None;
                if let Some((class, len)) = get_char_class(rest) {
                    bracket.items.push(CollectionItem::Class(class));
                    self.lex.advance_raw(len);
                } else if let Some((ch, len)) = get_bracketed_char(rest, '=') {
                    for e in charclasses::equivalents(ch) {
                        bracket.add_char(e);
                    }
                    self.lex.advance_raw(len);
                } else if let Some((ch, len)) = get_bracketed_char(rest, '.') {
                    bracket.add_char(ch);
                    self.lex.advance_raw(len);
                } else {
                    // A literal '[', which may start a range.
                    bracket.add_char('[');
                    startc = Some('[');
                    self.lex.advance_raw(1);
                }
            } else {
                bracket.add_char(c);
                startc = Some(c);
                self.lex.advance_raw(c.len_utf8());
            }
        }
        // Consume the ']'.
        self.lex.skipchr();
        let ret = self.em.node(Op::AnyOf {
            bracket: Box::new(bracket),
            nl,
        });
        Ok(Some((ret, flags | HASWIDTH | SIMPLE)))
    }

    /// Read `d123`, `o40`, `x20`, `u20AC` or `U1F600` in a collection.
    /// On failure nothing is consumed and the result is a backslash.
    fn coll_get_char(&mut self) -> char {
        let start = self.lex.offset();
        let kind = self.lex.raw_peek();
        self.lex.advance_raw(1);
        let nr = match kind {
            Some('d') => self.lex.get_dec(),
            Some('o') => self.lex.get_oct(),
            Some('x') => self.lex.get_hex(2),
            Some('u') => self.lex.get_hex(4),
            Some('U') => self.lex.get_hex(8),
            _ => None,
        };
        match nr
            .filter(|&n| n <= i32::MAX as u64)
            .and_then(|n| char::from_u32(n as u32))
        {
            Some(c) => c,
            None => {
                self.lex.seek(start);
                '\\'
            }
        }
    }

    /// Collect a run of literal characters, starting with `first`. A
    /// character right before a multi is left for its own atom.
    fn literal_run(&mut self, first: Token, extra: u32) -> ParseResult {
        let mut text = String::new();
        let mut c = first;
        let mut len = 0;
        while let Some(ch) = c.no_magic() {
            if len > 0
                && (is_multi(self.lex.peekchr())
                    || self.one_exactly
                    || matches!(c, Token::Magic(_)))
            {
                break;
            }
            text.push(ch);
            len += 1;
            c = self.lex.getchr();
        }
        self.lex.ungetchr();
        let ret = self.em.node(Op::Exactly(text.into_boxed_str()));
        let mut flags = extra | HASWIDTH;
        if len == 1 {
            flags |= SIMPLE;
        }
        Ok((ret, flags))
    }

    fn program_flags(&self, top: u32) -> ProgramFlags {
        ProgramFlags {
            has_nl: top & HASNL != 0,
            has_lookbehind: top & HASLOOKBH != 0,
            ..self.pflags
        }
    }
}

/// Compile `pattern` with the given flags. `prev_sub` is what `~` matches.
pub fn compile(
    pattern: &str,
    flags: &api::Flags,
    prev_sub: Option<&str>,
) -> Result<CompiledRegex, Error> {
    let pattern = strip_engine_selector(pattern);

    // First pass: check the syntax and find the size.
    let mut sizing = Parser::new(pattern, flags, prev_sub, Emitter::sizing());
    sizing.reg(Paren::None)?;
    let size = sizing.em.size();

    // Second pass: emit.
    let mut parser = Parser::new(pattern, flags, prev_sub, Emitter::emitting(size));
    let (_, top) = parser.reg(Paren::None)?;
    let pflags = parser.program_flags(top);
    let nodes = parser.em.finish();
    debug_assert_eq!(nodes.len(), size, "sizing and emitting passes disagree");

    let mut re = CompiledRegex {
        magic: REGMAGIC,
        nodes,
        anchored: false,
        regstart: None,
        regmust: None,
        must_finder: None,
        flags: pflags,
    };
    if !flags.no_opt {
        startpredicate::compute_hints(&mut re, top & SPSTART != 0);
    }
    debug!(
        "compiled {:?} to {} nodes (anchored: {}, start: {:?}, must: {:?})",
        pattern,
        re.nodes.len(),
        re.anchored,
        re.regstart,
        re.regmust
    );
    Ok(re)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_str(pattern: &str) -> Result<CompiledRegex, Error> {
        compile(pattern, &api::Flags::default(), None)
    }

    fn ops(pattern: &str) -> Vec<Op> {
        compile_str(pattern)
            .unwrap()
            .nodes
            .into_iter()
            .map(|n| n.op)
            .collect()
    }

    fn code(pattern: &str) -> u32 {
        compile_str(pattern).unwrap_err().code()
    }

    #[test]
    fn literal_before_multi_is_split() {
        assert_eq!(
            ops("abc*"),
            vec![
                Op::Branch,
                Op::Exactly("ab".into()),
                Op::Star,
                Op::Exactly("c".into()),
                Op::End
            ]
        );
    }

    #[test]
    fn complex_star_builds_loop() {
        let re = compile_str("\\(ab\\)*").unwrap();
        let ops: Vec<&Op> = re.nodes.iter().map(|n| &n.op).collect();
        assert_eq!(ops[1], &Op::Branch);
        let back = re.nodes.iter().position(|n| n.op == Op::Back).unwrap();
        assert_eq!(re.nodes[back].next, Some(1));
    }

    #[test]
    fn braces() {
        let ops = ops("a\\{2,5}");
        assert_eq!(ops[1], Op::BraceLimits { min: 2, max: 5 });
        assert_eq!(ops[2], Op::BraceSimple);
        let lazy = self::ops("a\\{-}");
        assert_eq!(lazy[1], Op::BraceLimits { min: MAX_LIMIT, max: 0 });
        let swapped = self::ops("a\\{5,2}");
        assert_eq!(swapped[1], Op::BraceLimits { min: 2, max: 5 });
        let complex = self::ops("\\(ab\\)\\{3}");
        assert_eq!(complex[1], Op::BraceLimits { min: 3, max: 3 });
        assert_eq!(complex[2], Op::BraceComplex(0));
    }

    #[test]
    fn lookbehind_limit() {
        let ops = ops("\\(foo\\)\\@3<=bar");
        assert_eq!(ops[1], Op::Behind { limit: 3 });
        assert!(ops.contains(&Op::BhPos));
    }

    #[test]
    fn collections() {
        let ops = ops("[^a-c[:digit:]]");
        match &ops[1] {
            Op::AnyOf { bracket, nl } => {
                assert!(bracket.invert);
                assert!(!nl);
                assert!(bracket.matches('z', false));
                assert!(!bracket.matches('b', false));
                assert!(!bracket.matches('7', false));
            }
            other => panic!("unexpected {:?}", other),
        }
        match &self::ops("[]x\\n]")[1] {
            Op::AnyOf { bracket, nl } => {
                assert!(*nl);
                assert!(bracket.matches(']', false));
            }
            other => panic!("unexpected {:?}", other),
        }
        // No closing bracket: a literal.
        assert_eq!(self::ops("[ab")[1], Op::Exactly("[ab".into()));
    }

    #[test]
    fn magic_switches() {
        let plus = self::ops("\\v(a)+");
        assert_eq!(plus[1], Op::MOpen(1));
        assert!(plus.contains(&Op::Back));
        assert_eq!(self::ops("\\Va.b")[1], Op::Exactly("a.b".into()));
        assert!(compile_str("\\ca").unwrap().flags.icase);
    }

    #[test]
    fn engine_selector_is_skipped() {
        assert_eq!(ops("\\%#=1ab")[1], Op::Exactly("ab".into()));
        assert_eq!(code("a\\%#=1"), 1281);
    }

    #[test]
    fn errors() {
        assert_eq!(code("\\(a"), 54);
        assert_eq!(code("a\\)"), 55);
        assert_eq!(code("\\%(a"), 53);
        assert_eq!(code("a**"), 61);
        assert_eq!(code("a*\\+"), 62);
        assert_eq!(code("\\+"), 64);
        assert_eq!(code("\\1\\(a\\)"), 65);
        assert_eq!(code("\\z(a\\)"), 66);
        assert_eq!(code("\\z1"), 67);
        assert_eq!(code("\\zq"), 68);
        assert_eq!(code("\\%[ab"), 69);
        assert_eq!(code("\\%[]"), 70);
        assert_eq!(code("\\%q"), 71);
        assert_eq!(code("\\%[\\(a\\)]"), 369);
        assert_eq!(code("a\\{1,2"), 554);
        assert_eq!(code("\\%dx"), 678);
        assert_eq!(code("\\zs*"), 888);
        assert_eq!(code("[z-a]"), 944);
        assert_eq!(code("\\%.3l"), 1204);
        assert_eq!(code("\\%>c"), 71);
        assert!(compile_str("\\%.0l").is_ok());
        assert_eq!(code("\\_q"), 63);
        assert_eq!(code("~"), 33);
        assert_eq!(code("a\\@x"), 59);
        assert_eq!(code("\\(a\\)\\(b\\)\\(c\\)\\(d\\)\\(e\\)\\(f\\)\\(g\\)\\(h\\)\\(i\\)\\(j\\)"), 51);
    }

    #[test]
    fn backref_before_group_in_lookbehind() {
        assert!(compile_str("\\(\\1\\)\\@<=\\(a\\)").is_ok());
    }

    #[test]
    fn strict_collection() {
        let flags = api::Flags {
            strict: true,
            ..Default::default()
        };
        assert_eq!(compile("[ab", &flags, None).unwrap_err().code(), 769);
    }

    #[test]
    fn tilde_uses_previous_substitute() {
        let re = compile("a~", &api::Flags::default(), Some("xy")).unwrap();
        assert_eq!(re.nodes[2].op, Op::Exactly("xy".into()));
    }
}
