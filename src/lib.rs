//! A byte-oriented Thompson-NFA regular expression engine.
//!
//! The pipeline is the classic four stages: an infix pattern string is
//! lexed and rewritten into postfix ([`preprocess`]), the postfix stream
//! is compiled into an NFA over an arena of states ([`graph`], [`builder`]),
//! and the NFA is run with Thompson's set-of-states simulation
//! ([`simulator`]) rather than backtracking, so match time is linear in
//! the input regardless of the pattern.
//!
//! ```
//! use thompson_regex::Regex;
//!
//! let mut re = Regex::new("a(b|c)+d").unwrap();
//! assert!(re.is_match(b"xx abcbcd xx"));
//! assert_eq!(re.capture(0), b"c");
//! ```

pub mod builder;
pub mod error;
pub mod graph;
pub mod preprocess;
pub mod simulator;
pub mod token;

pub use builder::{Builder, Nfa};
pub use error::{PatternError, PatternResult};
pub use simulator::Simulator;
pub use token::Token;

/// A compiled pattern, ready to be matched against byte strings.
///
/// Owns its `Nfa`; each match call builds a fresh [`Simulator`] over it, so
/// a `Regex` is cheap to keep around and match with repeatedly, and several
/// independent `Simulator`s can share one `Nfa` for concurrent matching.
pub struct Regex {
    nfa: Nfa,
    last_captures: Option<Vec<Vec<u8>>>,
}

impl Regex {
    /// Compiles `pattern` (ordinary infix regex syntax, see [`preprocess`])
    /// into a `Regex`.
    pub fn new(pattern: &str) -> PatternResult<Self> {
        let postfix = preprocess::compile(pattern)?;
        let nfa = Builder::new().build(&postfix)?;
        Ok(Regex {
            nfa,
            last_captures: None,
        })
    }

    /// Builds a `Regex` directly from an already-postfix token stream,
    /// bypassing [`preprocess`]. Useful for callers with their own front end.
    pub fn from_postfix(postfix: &[Token]) -> PatternResult<Self> {
        let nfa = Builder::new().build(postfix)?;
        Ok(Regex {
            nfa,
            last_captures: None,
        })
    }

    /// Reports whether `input` contains a match anywhere (unanchored
    /// search). On a match, capture groups are available via
    /// [`Regex::capture`] until the next call.
    pub fn is_match(&mut self, input: &[u8]) -> bool {
        let mut sim = Simulator::new(&self.nfa);
        let matched = sim.is_match(input);
        self.last_captures = if matched { Some(sim.captured_texts()) } else { None };
        matched
    }

    /// The bytes captured by group `index` in the most recent successful
    /// match, or an empty slice if there was no match or the group didn't
    /// participate.
    pub fn capture(&self, index: usize) -> &[u8] {
        self.last_captures
            .as_ref()
            .and_then(|caps| caps.get(index))
            .map(|s| s.as_slice())
            .unwrap_or(&[])
    }

    /// Number of capturing groups the pattern declared.
    pub fn capture_count(&self) -> usize {
        self.nfa.capture_count()
    }
}
