/*!

# vimregex - Vim's regular expressions in Rust

This crate provides a backtracking regular expression engine for the regex dialect of the Vim editor: 'magic' levels, `\zs` and `\ze`, `\{n,m}` braces, `\@<=` lookbehind, `\%[...]` optional sequences, position atoms like `\%23l`, and patterns which match across lines.

# Example: test if a string contains a match

```rust
use vimregex::Regex;
let re = Regex::new(r"\d\{4}").unwrap();
let matched = re.find("2020-20-05").unwrap().is_some();
assert!(matched);
```

# Example: iterating over matches

Here we use a backreference to find doubled characters:

```rust
use vimregex::Regex;
let re = Regex::new(r"\(\w\)\1").unwrap();
let text = "Frankly, Miss Piggy, I don't give a hoot!";
for m in re.find_iter(text) {
    println!("{}", &text[m.unwrap().range()])
}
// Output: ss
// Output: gg
// Output: oo
```

# Example: matching in a buffer

A [`LineSource`] supplies the lines. A match starts on the given line and may continue into later ones; positions are [`LinePos`].

```rust
use vimregex::{LinePos, Regex};
let lines = vec!["first", "second"];
let re = Regex::new(r"st\nse").unwrap();
let m = re.match_buffer(&lines, 0, 2, 0, false).unwrap().unwrap();
assert_eq!(m.range(), LinePos::new(0, 3)..LinePos::new(1, 2));
```

# Example: substitution

```rust
use vimregex::Regex;
let re = Regex::new(r"\(\w\+\) \(\w\+\)").unwrap();
let text = "hello world";
let m = re.find(text).unwrap().unwrap();
assert_eq!(re.substitute(&m, text, r"\u\2 \U\1", true, false), "World HELLO");
```

# Matching limits

Backtracking can take exponential time. Every search runs under a step budget and a stack limit, and can be interrupted through an `AtomicBool`; see [`MatchOptions`]. Running out yields [`MatchError::StackExhausted`].

# Architecture

vimregex has a lexer, a recursive-descent compiler emitting a linked node program with start hints, and a classical backtracking interpreter which uses an explicit backtracking stack instead of recursion. A separate formatter expands substitution templates.

*/

#![warn(clippy::all)]
#![allow(clippy::upper_case_acronyms, clippy::match_like_matches_macro)]
// Clippy's manual_range_contains suggestion produces worse codegen.
#![allow(clippy::manual_range_contains)]

pub use crate::api::*;
pub use crate::cursor::{LineSource, SingleLine, DEFAULT_TABSTOP};
pub use crate::regsub::{substitute, Captures};
pub use crate::types::LinePos;

mod api;
mod bytesearch;
mod charclasses;
mod classicalbacktrack;
mod cursor;
mod emit;
mod error;
mod exec;
mod insn;
mod lexer;
mod matchers;
mod parse;
mod regsub;
mod startpredicate;
mod types;
