//! Pattern lexer: turns the pattern into tokens according to the current
//! magic level.

/// Characters that a backslash may make magic (or, at a high magic level,
/// literal). `^` and `$` are handled separately.
const META: &str = "%&()*+.123456789<=>?@ACDFHIKLMOPSUVWXZ[_acdfhiklmnopsuvwxz{|~";

/// Backslash abbreviations for control characters.
const ABBREVIATIONS: &str = "nrtebdoxuU";

/// How many punctuation characters are metacharacters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum MagicLevel {
    /// `\V`: only the backslash is special.
    VeryNoMagic,
    /// `\M`: like 'nomagic'.
    NoMagic,
    /// `\m`: the default.
    Magic,
    /// `\v`: everything except letters, digits and `_` is special.
    VeryMagic,
}

/// One logical pattern character.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Token {
    /// A character taken literally.
    Lit(char),
    /// A character with its special meaning, written plain or with a
    /// backslash depending on the magic level.
    Magic(char),
    /// End of the pattern.
    End,
}

impl Token {
    /// Flip between the literal and magic meaning.
    pub fn toggled(self) -> Token {
        match self {
            Token::Lit(c) => Token::Magic(c),
            Token::Magic(c) => Token::Lit(c),
            Token::End => Token::End,
        }
    }

    /// The character with the magic stripped.
    pub fn no_magic(self) -> Option<char> {
        match self {
            Token::Lit(c) | Token::Magic(c) => Some(c),
            Token::End => None,
        }
    }
}

/// Translate `\r`, `\t`, `\e` and `\b`; anything else is returned as is.
pub fn backslash_trans(c: char) -> char {
    match c {
        'r' => '\r',
        't' => '\t',
        'e' => '\u{1b}',
        'b' => '\u{8}',
        _ => c,
    }
}

#[derive(Debug)]
pub struct Lexer<'a> {
    pattern: &'a str,

    /// Byte offset of the next unconsumed character.
    pos: usize,

    pub magic: MagicLevel,

    curchr: Option<Token>,
    nextchr: Option<Token>,
    prevchr: Option<Token>,
    prevprevchr: Option<Token>,

    at_start: bool,
    prev_at_start: bool,

    /// Bytes consumed by the last `skipchr()`, for `ungetchr()`.
    prevchr_len: usize,

    /// Nonzero while classifying the character after a backslash.
    after_slash: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(pattern: &'a str, magic: MagicLevel) -> Self {
        Lexer {
            pattern,
            pos: 0,
            magic,
            curchr: None,
            nextchr: None,
            prevchr: None,
            prevprevchr: None,
            at_start: true,
            prev_at_start: false,
            prevchr_len: 0,
            after_slash: 0,
        }
    }

    /// The unconsumed remainder of the pattern.
    #[inline]
    pub fn rest(&self) -> &'a str {
        &self.pattern[self.pos..]
    }

    /// The byte offset of the next unconsumed character.
    #[inline]
    pub fn offset(&self) -> usize {
        self.pos
    }

    #[inline]
    fn raw_at(&self, pos: usize) -> Option<char> {
        self.pattern.get(pos..).and_then(|s| s.chars().next())
    }

    /// Peek at the raw next character, bypassing tokenization.
    #[inline]
    pub fn raw_peek(&self) -> Option<char> {
        self.raw_at(self.pos)
    }

    /// Skip `len` raw bytes. Any peeked token is discarded.
    pub fn advance_raw(&mut self, len: usize) {
        self.pos = (self.pos + len).min(self.pattern.len());
        self.curchr = None;
    }

    /// Move back to a byte offset returned by `offset()`.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.pattern.len());
        self.curchr = None;
    }

    /// Raw access wants the peeked token forgotten, as after `\v`.
    pub fn forget_peek(&mut self) {
        self.curchr = None;
    }

    pub fn prev_at_start(&self) -> bool {
        self.prev_at_start
    }

    /// Let a following `^` or `*` behave as at the start of the pattern.
    pub fn set_at_start(&mut self) {
        self.at_start = true;
        self.curchr = None;
    }

    /// "" at very magic, else a backslash: how group items are written.
    pub fn group_prefix(&self) -> &'static str {
        if self.magic == MagicLevel::VeryMagic {
            ""
        } else {
            "\\"
        }
    }

    /// "" at magic and above, else a backslash: how `*`, `[` and `~` are
    /// written.
    pub fn magic_prefix(&self) -> &'static str {
        if self.magic >= MagicLevel::Magic {
            ""
        } else {
            "\\"
        }
    }

    /// Look at the next token without consuming it.
    pub fn peekchr(&mut self) -> Token {
        if let Some(t) = self.curchr {
            return t;
        }
        let t = self.classify();
        self.curchr = Some(t);
        t
    }

    fn classify(&mut self) -> Token {
        let c = match self.raw_at(self.pos) {
            Some(c) => c,
            None => return Token::End,
        };
        match c {
            '.' | '[' | '~' => {
                if self.magic >= MagicLevel::Magic {
                    return Token::Magic(c);
                }
            }
            '(' | ')' | '{' | '%' | '+' | '=' | '?' | '@' | '!' | '&' | '|' | '<' | '>'
            | '#' | '"' | '\'' | ',' | '-' | ':' | ';' | '`' | '/' => {
                if self.magic == MagicLevel::VeryMagic {
                    return Token::Magic(c);
                }
            }
            '*' => {
                // Literal as the very first character, right after a leading
                // '^', and right after "\(", "\|" and "\&"; but "\(\*" has
                // the backslash form and must come out literal.
                let prev = self.prevchr;
                if self.magic >= MagicLevel::Magic
                    && !self.at_start
                    && !(self.prev_at_start && prev == Some(Token::Magic('^')))
                    && (self.after_slash > 0
                        || (prev != Some(Token::Magic('('))
                            && prev != Some(Token::Magic('&'))
                            && prev != Some(Token::Magic('|'))))
                {
                    return Token::Magic('*');
                }
            }
            '^' => {
                let prev = self.prevchr;
                let after_percent_paren = prev.and_then(Token::no_magic) == Some('(')
                    && self.prevprevchr == Some(Token::Magic('%'));
                if self.magic >= MagicLevel::NoMagic
                    && (self.at_start
                        || self.magic == MagicLevel::VeryMagic
                        || prev == Some(Token::Magic('('))
                        || prev == Some(Token::Magic('|'))
                        || prev == Some(Token::Magic('&'))
                        || prev == Some(Token::Magic('n'))
                        || after_percent_paren)
                {
                    self.at_start = true;
                    self.prev_at_start = false;
                    return Token::Magic('^');
                }
            }
            '$' => {
                if self.magic >= MagicLevel::NoMagic && self.dollar_is_magic() {
                    return Token::Magic('$');
                }
            }
            '\\' => return self.classify_backslash(),
            _ => {}
        }
        Token::Lit(c)
    }

    /// '$' is magic at the end of the pattern and in front of "\|", "\)",
    /// "\&" or "\n", skipping flag items in between.
    fn dollar_is_magic(&self) -> bool {
        let bytes = self.pattern.as_bytes();
        let mut p = self.pos + 1;
        let mut very_magic = self.magic == MagicLevel::VeryMagic;
        while bytes.get(p) == Some(&b'\\') {
            match bytes.get(p + 1) {
                Some(b'v') => very_magic = true,
                Some(b'm') | Some(b'M') | Some(b'V') => very_magic = false,
                Some(b'c') | Some(b'C') | Some(b'Z') => {}
                _ => break,
            }
            p += 2;
        }
        match (bytes.get(p), bytes.get(p + 1)) {
            (None, _) => true,
            (Some(b'\\'), Some(b'|' | b'&' | b')' | b'n')) => true,
            (Some(b'|' | b'&' | b')'), _) if very_magic => true,
            _ => self.magic == MagicLevel::VeryMagic,
        }
    }

    fn classify_backslash(&mut self) -> Token {
        let c = match self.raw_at(self.pos + 1) {
            // Trailing backslash.
            None => return Token::Lit('\\'),
            Some(c) => c,
        };
        if c.is_ascii() && META.contains(c) {
            // Classify the next character as if it were unescaped, then
            // flip it.
            self.prev_at_start = self.at_start;
            self.at_start = false;
            self.pos += 1;
            self.after_slash += 1;
            let inner = self.classify();
            self.pos -= 1;
            self.after_slash -= 1;
            inner.toggled()
        } else if ABBREVIATIONS.contains(c) {
            Token::Lit(backslash_trans(c))
        } else if self.magic == MagicLevel::VeryNoMagic && (c == '$' || c == '^') {
            Token::Magic(c)
        } else {
            // Backslashing a character that can never be magic does nothing.
            Token::Lit(c)
        }
    }

    /// Consume the peeked token.
    pub fn skipchr(&mut self) {
        // peekchr() eats a backslash, so do the same here.
        let mut len = if self.pattern.as_bytes().get(self.pos) == Some(&b'\\') {
            1
        } else {
            0
        };
        if let Some(c) = self.raw_at(self.pos + len) {
            len += c.len_utf8();
        }
        self.pos += len;
        self.prevchr_len = len;
        self.prev_at_start = self.at_start;
        self.at_start = false;
        self.prevprevchr = self.prevchr;
        self.prevchr = self.curchr;
        self.curchr = self.nextchr.take();
    }

    /// Consume the peeked token without changing what counts as "previous",
    /// for flag items like `\c` that must not affect `^` and `*`.
    pub fn skipchr_keepstart(&mut self) {
        let as_ = self.prev_at_start;
        let pr = self.prevchr;
        let prpr = self.prevprevchr;
        self.skipchr();
        self.at_start = as_;
        self.prevchr = pr;
        self.prevprevchr = prpr;
    }

    /// Consume and return the next token.
    pub fn getchr(&mut self) -> Token {
        let t = self.peekchr();
        self.skipchr();
        t
    }

    /// Push back the token just returned by `getchr()`. Works once.
    pub fn ungetchr(&mut self) {
        self.nextchr = self.curchr;
        self.curchr = self.prevchr;
        self.prevchr = self.prevprevchr;
        self.at_start = self.prev_at_start;
        self.prev_at_start = false;
        self.pos -= self.prevchr_len;
    }

    /// Read decimal digits. None if there are none.
    pub fn get_dec(&mut self) -> Option<u64> {
        let digits = self
            .rest()
            .bytes()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits == 0 {
            return None;
        }
        let mut nr: u64 = 0;
        for b in self.rest().as_bytes()[..digits].iter() {
            nr = nr.saturating_mul(10).saturating_add(u64::from(b - b'0'));
        }
        self.advance_raw(digits);
        Some(nr)
    }

    /// Read up to `max_len` hex digits.
    pub fn get_hex(&mut self, max_len: usize) -> Option<u64> {
        let mut nr: u64 = 0;
        let mut count = 0;
        for b in self.rest().bytes().take(max_len) {
            match (b as char).to_digit(16) {
                Some(d) => {
                    nr = (nr << 4) | u64::from(d);
                    count += 1;
                }
                None => break,
            }
        }
        if count == 0 {
            return None;
        }
        self.advance_raw(count);
        Some(nr)
    }

    /// Read up to three octal digits, stopping before the value would
    /// exceed 0o377.
    pub fn get_oct(&mut self) -> Option<u64> {
        let mut nr: u64 = 0;
        let mut count = 0;
        for b in self.rest().bytes() {
            if count >= 3 || nr >= 0o40 || !(b'0'..=b'7').contains(&b) {
                break;
            }
            nr = (nr << 3) | u64::from(b - b'0');
            count += 1;
        }
        if count == 0 {
            return None;
        }
        self.advance_raw(count);
        Some(nr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(pattern: &str, magic: MagicLevel) -> Vec<Token> {
        let mut lex = Lexer::new(pattern, magic);
        let mut result = Vec::new();
        loop {
            match lex.getchr() {
                Token::End => break,
                t => result.push(t),
            }
        }
        result
    }

    #[test]
    fn magic_levels() {
        use Token::*;
        assert_eq!(
            tokens("a.*", MagicLevel::Magic),
            vec![Lit('a'), Magic('.'), Magic('*')]
        );
        assert_eq!(
            tokens("a.*", MagicLevel::NoMagic),
            vec![Lit('a'), Lit('.'), Lit('*')]
        );
        assert_eq!(
            tokens("a\\.\\*", MagicLevel::NoMagic),
            vec![Lit('a'), Magic('.'), Magic('*')]
        );
        assert_eq!(
            tokens("(a)+", MagicLevel::VeryMagic),
            vec![Magic('('), Lit('a'), Magic(')'), Magic('+')]
        );
        assert_eq!(tokens("\\(", MagicLevel::Magic), vec![Magic('(')]);
        assert_eq!(tokens("\\(", MagicLevel::VeryMagic), vec![Lit('(')]);
    }

    #[test]
    fn star_at_start_is_literal() {
        use Token::*;
        assert_eq!(tokens("*a", MagicLevel::Magic), vec![Lit('*'), Lit('a')]);
        assert_eq!(tokens("^*", MagicLevel::Magic), vec![Magic('^'), Lit('*')]);
        assert_eq!(
            tokens("\\(*", MagicLevel::Magic),
            vec![Magic('('), Lit('*')]
        );
        assert_eq!(
            tokens("\\(\\*", MagicLevel::Magic),
            vec![Magic('('), Lit('*')]
        );
    }

    #[test]
    fn anchors_depend_on_context() {
        use Token::*;
        assert_eq!(tokens("a^", MagicLevel::Magic), vec![Lit('a'), Lit('^')]);
        assert_eq!(
            tokens("a\\|^b", MagicLevel::Magic),
            vec![Lit('a'), Magic('|'), Magic('^'), Lit('b')]
        );
        assert_eq!(tokens("a$", MagicLevel::Magic), vec![Lit('a'), Magic('$')]);
        assert_eq!(
            tokens("a$b", MagicLevel::Magic),
            vec![Lit('a'), Lit('$'), Lit('b')]
        );
        assert_eq!(
            tokens("a$\\c", MagicLevel::Magic),
            vec![Lit('a'), Magic('$'), Magic('c')]
        );
        assert_eq!(tokens("$", MagicLevel::VeryNoMagic), vec![Lit('$')]);
        assert_eq!(tokens("\\$", MagicLevel::VeryNoMagic), vec![Magic('$')]);
    }

    #[test]
    fn escapes() {
        use Token::*;
        assert_eq!(tokens("\\t\\e", MagicLevel::Magic), vec![Lit('\t'), Lit('\u{1b}')]);
        assert_eq!(tokens("\\q", MagicLevel::Magic), vec![Lit('q')]);
        assert_eq!(tokens("a\\", MagicLevel::Magic), vec![Lit('a'), Lit('\\')]);
        assert_eq!(tokens("\\d", MagicLevel::Magic), vec![Magic('d')]);
        assert_eq!(tokens("\u{e9}x", MagicLevel::Magic), vec![Lit('\u{e9}'), Lit('x')]);
    }

    #[test]
    fn unget_restores() {
        let mut lex = Lexer::new("\\(ab", MagicLevel::Magic);
        assert_eq!(lex.getchr(), Token::Magic('('));
        assert_eq!(lex.getchr(), Token::Lit('a'));
        lex.ungetchr();
        assert_eq!(lex.rest(), "ab");
        assert_eq!(lex.getchr(), Token::Lit('a'));
        assert_eq!(lex.getchr(), Token::Lit('b'));
        assert_eq!(lex.getchr(), Token::End);
    }

    #[test]
    fn numbers() {
        let mut lex = Lexer::new("123x", MagicLevel::Magic);
        assert_eq!(lex.get_dec(), Some(123));
        assert_eq!(lex.get_dec(), None);
        let mut lex = Lexer::new("4aZ", MagicLevel::Magic);
        assert_eq!(lex.get_hex(2), Some(0x4a));
        let mut lex = Lexer::new("3777", MagicLevel::Magic);
        assert_eq!(lex.get_oct(), Some(0o377));
        assert_eq!(lex.rest(), "7");
        let mut lex = Lexer::new("777", MagicLevel::Magic);
        assert_eq!(lex.get_oct(), Some(0o77));
    }
}
