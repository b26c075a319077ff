//! Hints for quickly rejecting start positions.
//!
//! These never change what matches; a search with all hints cleared finds
//! the same matches, only slower.

use crate::insn::{CompiledRegex, Op};
use memchr::memmem;

/// \return whether `op` matches nothing and may precede the first literal
/// of a match.
fn is_transparent(op: &Op) -> bool {
    matches!(
        op,
        Op::Bow | Op::Eow | Op::Nothing | Op::MOpen(0) | Op::NOpen | Op::MClose(0) | Op::NClose
    )
}

/// Fill in the anchored flag, the start character and the required
/// literal. Only done when there is a single top-level alternative.
/// `expensive` is set when the pattern starts with a repeat.
pub fn compute_hints(re: &mut CompiledRegex, expensive: bool) {
    // Node 0 is the first BRANCH.
    match re.regnext(0).and_then(|next| re.op(next)) {
        Some(Op::End) => {}
        _ => return,
    }
    let mut scan = Some(CompiledRegex::operand(0));

    if matches!(scan.and_then(|s| re.op(s)), Some(Op::Bol) | Some(Op::Bof)) {
        re.anchored = true;
        scan = scan.and_then(|s| re.regnext(s));
    }

    let first = scan.and_then(|s| re.op(s));
    let after_first = scan.and_then(|s| re.regnext(s)).and_then(|s| re.op(s));
    let regstart = match (first, after_first) {
        (Some(Op::Exactly(s)), _) => s.chars().next(),
        (Some(op), Some(Op::Exactly(s))) if is_transparent(op) => s.chars().next(),
        _ => None,
    };

    let at_word_edge = matches!(first, Some(Op::Bow) | Some(Op::Eow));
    let mut must = None;
    if (expensive || at_word_edge) && !re.flags.has_nl {
        let mut longest: Option<&str> = None;
        while let Some(s) = scan {
            if let Some(Op::Exactly(text)) = re.op(s) {
                let text: &str = text;
                // Later strings win ties.
                if longest.map_or(true, |l| text.len() >= l.len()) {
                    longest = Some(text);
                }
            }
            scan = re.regnext(s);
        }
        must = longest.filter(|l| !l.is_empty()).map(Box::<str>::from);
    }

    re.regstart = regstart;
    re.must_finder = must
        .as_ref()
        .map(|m| memmem::Finder::new(m.as_bytes()).into_owned());
    re.regmust = must;
}

#[cfg(test)]
mod tests {
    use crate::api::Flags;
    use crate::parse::compile;

    fn hints(pattern: &str) -> (bool, Option<char>, Option<String>) {
        let re = compile(pattern, &Flags::default(), None).unwrap();
        (re.anchored, re.regstart, re.regmust.map(String::from))
    }

    #[test]
    fn anchored_and_start() {
        assert_eq!(hints("^foo"), (true, Some('f'), None));
        assert_eq!(hints("\\%^x"), (true, Some('x'), None));
        assert_eq!(hints("\\<word"), (false, Some('w'), Some("word".into())));
        assert_eq!(hints("a\\|b"), (false, None, None));
        assert_eq!(hints("\\zsab"), (false, Some('a'), None));
    }

    #[test]
    fn longest_literal() {
        assert_eq!(hints("x*abc.de").2, Some("abc".to_string()));
        // Ties go to the later string.
        assert_eq!(hints("x*ab.cd").2, Some("cd".to_string()));
        // A pattern that may match a line break gets none.
        assert_eq!(hints("x*abc\\n").2, None);
    }

    #[test]
    fn disabled() {
        let flags = Flags {
            no_opt: true,
            ..Flags::default()
        };
        let re = compile("^foo", &flags, None).unwrap();
        assert!(!re.anchored);
        assert_eq!(re.regstart, None);
    }
}
