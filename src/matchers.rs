//! Character comparison helpers shared by the compiler and the matcher.

/// Simple case fold: the lowercase form, if it is a single character.
#[inline]
pub fn fold(c: char) -> char {
    if c.is_ascii() {
        return c.to_ascii_lowercase();
    }
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// \return whether these two chars fold to the same value.
#[inline]
pub fn fold_equals(c1: char, c2: char) -> bool {
    c1 == c2 || fold(c1) == fold(c2)
}

fn single(mut it: impl Iterator<Item = char>) -> Option<char> {
    match (it.next(), it.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// \return the single-character lowercase and uppercase forms of `c`, where
/// they differ from `c`.
pub fn case_variants(c: char) -> [Option<char>; 2] {
    let lower = single(c.to_lowercase()).filter(|&l| l != c);
    let upper = single(c.to_uppercase()).filter(|&u| u != c);
    [lower, upper]
}

/// Compare the literal `needle` with the start of `hay`.
/// \return the number of bytes of `hay` that matched, or None.
/// With `icase` the byte lengths of the two may differ.
#[inline]
pub fn cstrncmp(needle: &str, hay: &str, icase: bool) -> Option<usize> {
    if !icase {
        return if hay.as_bytes().starts_with(needle.as_bytes()) {
            Some(needle.len())
        } else {
            None
        };
    }
    let mut hay_chars = hay.char_indices();
    for nc in needle.chars() {
        let (_, hc) = hay_chars.next()?;
        if !fold_equals(nc, hc) {
            return None;
        }
    }
    Some(hay_chars.next().map_or(hay.len(), |(idx, _)| idx))
}

/// \return whether `c` equals `target`, optionally ignoring case.
#[inline]
pub fn char_eq(c: char, target: char, icase: bool) -> bool {
    if icase {
        fold_equals(c, target)
    } else {
        c == target
    }
}

/// Find the first occurrence of `c` in `hay` at or after byte offset `from`,
/// ignoring case. \return the byte offset.
pub fn find_char_icase(hay: &str, from: usize, c: char) -> Option<usize> {
    let folded = fold(c);
    hay.get(from..)?
        .char_indices()
        .find(|&(_, hc)| fold(hc) == folded)
        .map(|(idx, _)| idx + from)
}
