//! Character classes: the backslash shorthands and the bracket names.

/// The backslash character classes, like `\d` or `\k`.
/// The order follows the letters in `CLASS_CHARS`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClassType {
    Any,
    Ident,
    SIdent,
    Keyword,
    SKeyword,
    Fname,
    SFname,
    Print,
    SPrint,
    White,
    NWhite,
    Digit,
    NDigit,
    Hex,
    NHex,
    Octal,
    NOctal,
    Word,
    NWord,
    Head,
    NHead,
    Alpha,
    NAlpha,
    Lower,
    NLower,
    Upper,
    NUpper,
}

/// The letters that may follow a backslash to form a class, in the order of
/// the `ClassType` variants.
pub const CLASS_CHARS: &str = ".iIkKfFpPsSdDxXoOwWhHaAlLuU";

const CLASS_TYPES: [ClassType; 27] = [
    ClassType::Any,
    ClassType::Ident,
    ClassType::SIdent,
    ClassType::Keyword,
    ClassType::SKeyword,
    ClassType::Fname,
    ClassType::SFname,
    ClassType::Print,
    ClassType::SPrint,
    ClassType::White,
    ClassType::NWhite,
    ClassType::Digit,
    ClassType::NDigit,
    ClassType::Hex,
    ClassType::NHex,
    ClassType::Octal,
    ClassType::NOctal,
    ClassType::Word,
    ClassType::NWord,
    ClassType::Head,
    ClassType::NHead,
    ClassType::Alpha,
    ClassType::NAlpha,
    ClassType::Lower,
    ClassType::NLower,
    ClassType::Upper,
    ClassType::NUpper,
];

impl ClassType {
    /// Map the letter after a backslash (or `.`) to a class.
    pub fn from_char(c: char) -> Option<ClassType> {
        CLASS_CHARS
            .chars()
            .position(|x| x == c)
            .map(|idx| CLASS_TYPES[idx])
    }

    /// The letter that spells this class.
    pub fn as_char(self) -> char {
        let idx = CLASS_TYPES
            .iter()
            .position(|&t| t == self)
            .unwrap_or_default();
        CLASS_CHARS.chars().nth(idx).unwrap_or('.')
    }

    /// \return whether `c` is a member. Case is always respected.
    /// `Any` matches everything; the caller handles end of line.
    pub fn matches(self, c: char) -> bool {
        match self {
            ClassType::Any => true,
            ClassType::Ident => is_ident_char(c),
            ClassType::SIdent => is_ident_char(c) && !c.is_ascii_digit(),
            ClassType::Keyword => is_keyword_char(c),
            ClassType::SKeyword => is_keyword_char(c) && !c.is_ascii_digit(),
            ClassType::Fname => is_fname_char(c),
            ClassType::SFname => is_fname_char(c) && !c.is_ascii_digit(),
            ClassType::Print => is_print_char(c),
            ClassType::SPrint => is_print_char(c) && !c.is_ascii_digit(),
            ClassType::White => is_white(c),
            ClassType::NWhite => !is_white(c),
            ClassType::Digit => c.is_ascii_digit(),
            ClassType::NDigit => !c.is_ascii_digit(),
            ClassType::Hex => c.is_ascii_hexdigit(),
            ClassType::NHex => !c.is_ascii_hexdigit(),
            ClassType::Octal => ('0'..='7').contains(&c),
            ClassType::NOctal => !('0'..='7').contains(&c),
            ClassType::Word => is_word_char(c),
            ClassType::NWord => !is_word_char(c),
            ClassType::Head => is_head_char(c),
            ClassType::NHead => !is_head_char(c),
            ClassType::Alpha => c.is_ascii_alphabetic(),
            ClassType::NAlpha => !c.is_ascii_alphabetic(),
            ClassType::Lower => c.is_ascii_lowercase(),
            ClassType::NLower => !c.is_ascii_lowercase(),
            ClassType::Upper => c.is_ascii_uppercase(),
            ClassType::NUpper => !c.is_ascii_uppercase(),
        }
    }
}

/// Default 'isident': "@,48-57,_,192-255".
pub fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || ('\u{c0}'..='\u{ff}').contains(&c)
}

/// Default 'iskeyword': "@,48-57,_,192-255", plus alphanumeric code points
/// above 0xff.
pub fn is_keyword_char(c: char) -> bool {
    is_ident_char(c) || (c as u32 > 0xff && c.is_alphanumeric())
}

/// Default 'isfname': "@,48-57,/,.,-,_,+,,,#,$,%,~,=", and everything above
/// 0xff.
pub fn is_fname_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || "/.-_+,#$%~=".contains(c)
        || ('\u{c0}'..='\u{ff}').contains(&c)
        || c as u32 > 0xff
}

pub fn is_print_char(c: char) -> bool {
    if c.is_ascii() {
        (' '..='~').contains(&c)
    } else {
        !c.is_control()
    }
}

pub fn is_white(c: char) -> bool {
    c == ' ' || c == '\t'
}

pub fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub fn is_head_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// Word class of a character for `\<` and `\>`: 0 for blanks and the end of
/// the line, 1 for punctuation, 2 and up for word characters. Scripts
/// written without spaces get a class of their own, so a word ends where
/// the script changes.
pub fn word_class(c: Option<char>) -> u32 {
    let c = match c {
        None => return 0,
        Some(c) => c,
    };
    if (c as u32) < 0x100 {
        return match c {
            ' ' | '\t' | '\0' | '\u{a0}' => 0,
            _ if is_keyword_char(c) => 2,
            _ => 1,
        };
    }
    match c as u32 {
        0x3040..=0x309f => 0x3040,
        0x30a0..=0x30ff => 0x30a0,
        0x3400..=0x4dbf | 0x4e00..=0x9fff | 0xf900..=0xfaff => 0x4e00,
        0xac00..=0xd7a3 => 0xac00,
        _ if c.is_whitespace() => 0,
        _ if c.is_alphanumeric() => 2,
        _ => 1,
    }
}

/// Letters that `[=x=]` treats as equivalent: a base letter and its
/// accented forms.
const EQUIVALENCE_CLASSES: [&str; 22] = [
    "A\u{c0}\u{c1}\u{c2}\u{c3}\u{c4}\u{c5}\u{100}\u{102}\u{104}",
    "C\u{c7}\u{106}\u{108}\u{10a}\u{10c}",
    "E\u{c8}\u{c9}\u{ca}\u{cb}\u{112}\u{114}\u{116}\u{118}\u{11a}",
    "I\u{cc}\u{cd}\u{ce}\u{cf}\u{128}\u{12a}\u{12c}\u{12e}\u{130}",
    "N\u{d1}\u{143}\u{145}\u{147}",
    "O\u{d2}\u{d3}\u{d4}\u{d5}\u{d6}\u{d8}\u{14c}\u{14e}\u{150}",
    "S\u{15a}\u{15c}\u{15e}\u{160}",
    "U\u{d9}\u{da}\u{db}\u{dc}\u{168}\u{16a}\u{16c}\u{16e}\u{170}\u{172}",
    "Y\u{dd}\u{176}\u{178}",
    "Z\u{179}\u{17b}\u{17d}",
    "G\u{11c}\u{11e}\u{120}\u{122}",
    "a\u{e0}\u{e1}\u{e2}\u{e3}\u{e4}\u{e5}\u{101}\u{103}\u{105}",
    "c\u{e7}\u{107}\u{109}\u{10b}\u{10d}",
    "e\u{e8}\u{e9}\u{ea}\u{eb}\u{113}\u{115}\u{117}\u{119}\u{11b}",
    "i\u{ec}\u{ed}\u{ee}\u{ef}\u{129}\u{12b}\u{12d}\u{12f}",
    "n\u{f1}\u{144}\u{146}\u{148}",
    "o\u{f2}\u{f3}\u{f4}\u{f5}\u{f6}\u{f8}\u{14d}\u{14f}\u{151}",
    "s\u{15b}\u{15d}\u{15f}\u{161}",
    "u\u{f9}\u{fa}\u{fb}\u{fc}\u{169}\u{16b}\u{16d}\u{16f}\u{171}\u{173}",
    "y\u{fd}\u{ff}\u{177}",
    "z\u{17a}\u{17c}\u{17e}",
    "g\u{11d}\u{11f}\u{121}\u{123}",
];

/// \return the characters equivalent to `c` for `[=c=]`, or just `c`.
pub fn equivalents(c: char) -> Vec<char> {
    EQUIVALENCE_CLASSES
        .iter()
        .find(|class| class.contains(c))
        .map_or_else(|| vec![c], |class| class.chars().collect())
}

/// Named classes allowed inside a collection, like `[[:alpha:]]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PosixClass {
    Alnum,
    Alpha,
    Blank,
    Cntrl,
    Digit,
    Graph,
    Lower,
    Print,
    Punct,
    Space,
    Upper,
    Xdigit,
    Tab,
    Return,
    Backspace,
    Escape,
    Ident,
    Keyword,
    Fname,
}

const POSIX_NAMES: [(&str, PosixClass); 19] = [
    ("alnum", PosixClass::Alnum),
    ("alpha", PosixClass::Alpha),
    ("blank", PosixClass::Blank),
    ("cntrl", PosixClass::Cntrl),
    ("digit", PosixClass::Digit),
    ("graph", PosixClass::Graph),
    ("lower", PosixClass::Lower),
    ("print", PosixClass::Print),
    ("punct", PosixClass::Punct),
    ("space", PosixClass::Space),
    ("upper", PosixClass::Upper),
    ("xdigit", PosixClass::Xdigit),
    ("tab", PosixClass::Tab),
    ("return", PosixClass::Return),
    ("backspace", PosixClass::Backspace),
    ("escape", PosixClass::Escape),
    ("ident", PosixClass::Ident),
    ("keyword", PosixClass::Keyword),
    ("fname", PosixClass::Fname),
];

impl PosixClass {
    /// Look up a class by the name between `[:` and `:]`.
    pub fn from_name(name: &str) -> Option<PosixClass> {
        POSIX_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, class)| class)
    }

    pub fn name(self) -> &'static str {
        POSIX_NAMES
            .iter()
            .find(|(_, class)| *class == self)
            .map_or("", |(n, _)| n)
    }

    pub fn contains(self, c: char) -> bool {
        match self {
            PosixClass::Alnum => c.is_ascii_alphanumeric(),
            PosixClass::Alpha => c.is_ascii_alphabetic(),
            PosixClass::Blank => is_white(c),
            PosixClass::Cntrl => c.is_ascii_control(),
            PosixClass::Digit => c.is_ascii_digit(),
            PosixClass::Graph => c.is_ascii_graphic(),
            PosixClass::Lower => c.is_lowercase(),
            PosixClass::Print => is_print_char(c),
            PosixClass::Punct => c.is_ascii_punctuation(),
            PosixClass::Space => matches!(c, ' ' | '\t'..='\r'),
            PosixClass::Upper => c.is_uppercase(),
            PosixClass::Xdigit => c.is_ascii_hexdigit(),
            PosixClass::Tab => c == '\t',
            PosixClass::Return => c == '\r',
            PosixClass::Backspace => c == '\u{8}',
            PosixClass::Escape => c == '\u{1b}',
            PosixClass::Ident => is_ident_char(c),
            PosixClass::Keyword => is_keyword_char(c),
            PosixClass::Fname => is_fname_char(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_letters_round_trip() {
        for c in CLASS_CHARS.chars() {
            let class = ClassType::from_char(c).unwrap();
            assert_eq!(class.as_char(), c);
        }
        assert!(ClassType::from_char('q').is_none());
    }

    #[test]
    fn class_membership() {
        assert!(ClassType::Digit.matches('7'));
        assert!(!ClassType::Digit.matches('a'));
        assert!(ClassType::SIdent.matches('a'));
        assert!(!ClassType::SIdent.matches('1'));
        assert!(ClassType::Keyword.matches('\u{e9}'));
        assert!(ClassType::Keyword.matches('\u{3b1}'));
        assert!(!ClassType::Word.matches('\u{e9}'));
        assert!(ClassType::White.matches('\t'));
        assert!(!ClassType::Upper.matches('a'));
        assert!(ClassType::NUpper.matches('a'));
    }

    #[test]
    fn posix_names() {
        assert_eq!(PosixClass::from_name("xdigit"), Some(PosixClass::Xdigit));
        assert_eq!(PosixClass::from_name("nope"), None);
        assert!(PosixClass::Space.contains('\u{b}'));
        assert!(PosixClass::Escape.contains('\u{1b}'));
        assert_eq!(PosixClass::Keyword.name(), "keyword");
    }

    #[test]
    fn equivalence_classes() {
        assert!(equivalents('e').contains(&'\u{e9}'));
        assert!(equivalents('\u{e9}').contains(&'e'));
        assert!(!equivalents('e').contains(&'E'));
        assert_eq!(equivalents('q'), vec!['q']);
    }

    #[test]
    fn word_classes() {
        assert_eq!(word_class(None), 0);
        assert_eq!(word_class(Some(' ')), 0);
        assert_eq!(word_class(Some('.')), 1);
        assert_eq!(word_class(Some('x')), 2);
        assert_eq!(word_class(Some('\u{3b1}')), 2);
        assert_eq!(word_class(Some('\u{2014}')), 1);
        assert_eq!(word_class(Some('\u{3042}')), 0x3040);
    }
}
