use crate::insn::CompiledRegex;
use crate::matchers;
use memchr::memmem;

/// Facilities for searching bytes.
pub trait ByteSearcher {
    /// Search for ourselves in a slice of bytes.
    /// The length of the slice is unspecified and may be 0.
    /// \return the next index of ourselves in the slice, or None.
    fn find_in(&self, rhs: &[u8]) -> Option<usize>;
}

impl ByteSearcher for memmem::Finder<'_> {
    #[inline(always)]
    fn find_in(&self, rhs: &[u8]) -> Option<usize> {
        self.find(rhs)
    }
}

impl ByteSearcher for char {
    #[inline(always)]
    fn find_in(&self, rhs: &[u8]) -> Option<usize> {
        if self.is_ascii() {
            return memchr::memchr(*self as u8, rhs);
        }
        let mut buf = [0; 4];
        memmem::find(rhs, self.encode_utf8(&mut buf).as_bytes())
    }
}

/// Find the first `c` in `line` at or after byte offset `from`.
/// \return the byte offset of the match.
pub fn find_start_char(line: &str, from: usize, c: char, icase: bool) -> Option<usize> {
    if icase && matchers::case_variants(c) != [None, None] {
        return matchers::find_char_icase(line, from, c);
    }
    let hay = line.as_bytes().get(from..)?;
    c.find_in(hay).map(|idx| idx + from)
}

/// \return whether the literal every match of `re` contains occurs in
/// `line` at or after `from`. True when there is no such literal.
pub fn contains_must(re: &CompiledRegex, line: &str, from: usize, icase: bool) -> bool {
    let must = match &re.regmust {
        Some(must) => must,
        None => return true,
    };
    let hay = match line.get(from..) {
        Some(hay) => hay,
        None => return false,
    };
    if !icase {
        if let Some(finder) = &re.must_finder {
            return finder.find_in(hay.as_bytes()).is_some();
        }
        return hay.contains(&**must);
    }
    let first = match must.chars().next() {
        Some(c) => c,
        None => return true,
    };
    let mut pos = 0;
    while let Some(found) = matchers::find_char_icase(hay, pos, first) {
        if matchers::cstrncmp(must, &hay[found..], true).is_some() {
            return true;
        }
        pos = found + hay[found..].chars().next().map_or(1, char::len_utf8);
    }
    false
}
