//! Compile and match errors.
//!
//! Each error carries the number Vim uses for it, so a host can render its
//! own localized text. The `Display` text is a plain English fallback.

use thiserror::Error;

/// An error encountered while compiling a pattern.
/// Items that depend on the magic level (like `\(` versus `(`) are reported
/// in the form written in the pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("no previous substitute regular expression")]
    NoPreviousSubstitute,

    #[error("too many \\z(")]
    TooManyZGroups,

    #[error("too many {0}(")]
    TooManyGroups(String),

    #[error("unmatched \\z(")]
    UnmatchedZOpen,

    #[error("unmatched {0}%(")]
    UnmatchedNonCapture(String),

    #[error("unmatched {0}(")]
    UnmatchedOpen(String),

    #[error("unmatched {0})")]
    UnmatchedClose(String),

    #[error("invalid character after {0}@")]
    InvalidAfterAt(String),

    #[error("too many complex {0}{{...}}s")]
    TooManyComplexBraces(String),

    #[error("nested {0}*")]
    NestedStar(String),

    #[error("nested {0}{1}")]
    NestedMulti(String, char),

    #[error("invalid use of \\_")]
    InvalidNewlineClass,

    #[error("{0}{1} follows nothing")]
    FollowsNothing(String, char),

    #[error("invalid back reference")]
    InvalidBackref,

    #[error("\\z( not allowed here")]
    ZOpenNotAllowed,

    #[error("\\z1 - \\z9 not allowed here")]
    ZRefNotAllowed,

    #[error("invalid character after \\z")]
    InvalidAfterZ,

    #[error("missing ] after {0}%[")]
    MissingOptionalEnd(String),

    #[error("empty {0}%[]")]
    EmptyOptional(String),

    #[error("pattern too long")]
    PatternTooLong,

    #[error("invalid item in {0}%[]")]
    InvalidInOptional(String),

    #[error("trailing characters")]
    TrailingCharacters,

    #[error("syntax error in {0}{{...}}")]
    BraceSyntax(String),

    #[error("invalid character after {0}%[dxouU]")]
    InvalidNumberEscape(String),

    #[error("invalid character after {0}%")]
    InvalidAfterPercent(String),

    #[error("missing ] after {0}[")]
    MissingCollectionEnd(String),

    #[error("cannot repeat {0}")]
    CannotRepeat(String),

    #[error("reverse range in character class")]
    ReverseRange,

    #[error("range too large in character class")]
    RangeTooLarge,

    #[error("no number allowed after .: '\\%{0}'")]
    NumberAfterDot(char),

    #[error("atom '\\%#={0}' must be at the start of the pattern")]
    EngineNotAtStart(char),
}

impl Error {
    /// The Vim error number of this error.
    pub fn code(&self) -> u32 {
        match self {
            Error::NoPreviousSubstitute => 33,
            Error::TooManyZGroups => 50,
            Error::TooManyGroups(_) => 51,
            Error::UnmatchedZOpen => 52,
            Error::UnmatchedNonCapture(_) => 53,
            Error::UnmatchedOpen(_) => 54,
            Error::UnmatchedClose(_) => 55,
            Error::InvalidAfterAt(_) => 59,
            Error::TooManyComplexBraces(_) => 60,
            Error::NestedStar(_) => 61,
            Error::NestedMulti(..) => 62,
            Error::InvalidNewlineClass => 63,
            Error::FollowsNothing(..) => 64,
            Error::InvalidBackref => 65,
            Error::ZOpenNotAllowed => 66,
            Error::ZRefNotAllowed => 67,
            Error::InvalidAfterZ => 68,
            Error::MissingOptionalEnd(_) => 69,
            Error::EmptyOptional(_) => 70,
            Error::InvalidAfterPercent(_) => 71,
            Error::PatternTooLong => 339,
            Error::InvalidInOptional(_) => 369,
            Error::TrailingCharacters => 488,
            Error::BraceSyntax(_) => 554,
            Error::InvalidNumberEscape(_) => 678,
            Error::MissingCollectionEnd(_) => 769,
            Error::CannotRepeat(_) => 888,
            Error::ReverseRange => 944,
            Error::RangeTooLarge => 945,
            Error::NumberAfterDot(_) => 1204,
            Error::EngineNotAtStart(_) => 1281,
        }
    }
}

/// An error that aborts a whole search.
/// A search that simply finds nothing is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MatchError {
    /// The program failed its integrity checks.
    #[error("corrupted regexp program")]
    Corrupt,

    /// The backtracking stack or the step budget ran out.
    #[error("pattern uses more memory than allowed")]
    StackExhausted,

    /// The caller's interrupt flag was raised.
    #[error("interrupted")]
    Interrupted,
}

impl MatchError {
    /// The Vim error number, if there is one.
    pub fn code(&self) -> Option<u32> {
        match self {
            MatchError::Corrupt => Some(44),
            MatchError::StackExhausted => Some(363),
            MatchError::Interrupted => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_item() {
        let e = Error::UnmatchedOpen("\\".to_string());
        assert_eq!(e.to_string(), "unmatched \\(");
        assert_eq!(e.code(), 54);
        let e = Error::FollowsNothing(String::new(), '*');
        assert_eq!(e.to_string(), "* follows nothing");
        assert_eq!(Error::BraceSyntax("\\".into()).to_string(), "syntax error in \\{...}");
    }

    #[test]
    fn match_error_codes() {
        assert_eq!(MatchError::Corrupt.code(), Some(44));
        assert_eq!(MatchError::StackExhausted.code(), Some(363));
        assert_eq!(MatchError::Interrupted.code(), None);
    }
}
