//! Set-of-states NFA simulation: unanchored search, greedy/non-greedy
//! ε-expansion bias, zero-width assertions and per-thread capture
//! bookkeeping (spec §4.2).
//!
//! The `lastList` generation tag spec §3/§9 describes as living on each
//! `State` is kept here instead, as a `Vec<u32>` indexed by `StateId` —
//! the arena graph is immutable once built, so a shared `Nfa` can back
//! several `Simulator`s, each with its own side table (spec §5).

use log::trace;

use crate::builder::Nfa;
use crate::graph::{AssertionKind, StateId, StateKind};

/// The `[start, end)` byte range captured by one group, plus the copied
/// text (cheaper than re-slicing the input after the fact once multiple
/// unanchored start positions are in play).
#[derive(Debug, Clone)]
pub struct CaptureSlot {
    pub start: usize,
    pub end: usize,
    pub text: Vec<u8>,
}

type Captures = Vec<Option<CaptureSlot>>;

#[derive(Debug, Clone)]
struct Thread {
    state: StateId,
    captures: Captures,
}

/// Runs repeated match attempts against one compiled `Nfa`. Holds the
/// generation side table and the captures from the most recent successful
/// match.
pub struct Simulator<'a> {
    nfa: &'a Nfa,
    generation: Vec<u32>,
    gen_id: u32,
    captures: Captures,
}

impl<'a> Simulator<'a> {
    pub fn new(nfa: &'a Nfa) -> Self {
        Simulator {
            nfa,
            generation: vec![0; nfa.len()],
            gen_id: 0,
            captures: vec![None; nfa.capture_count()],
        }
    }

    /// Unanchored search: tries every start position `i` in `[0, |input|]`
    /// in order and returns on the first that accepts.
    pub fn is_match(&mut self, input: &[u8]) -> bool {
        for start in 0..=input.len() {
            if self.try_match_at(input, start) {
                return true;
            }
        }
        false
    }

    pub fn capture(&self, index: usize) -> &[u8] {
        self.captures
            .get(index)
            .and_then(|slot| slot.as_ref())
            .map(|slot| slot.text.as_slice())
            .unwrap_or(&[])
    }

    pub fn capture_count(&self) -> usize {
        self.nfa.capture_count()
    }

    /// Snapshots every capture group's matched text (empty where the group
    /// didn't participate) after a successful match, as owned bytes that
    /// outlive this `Simulator`.
    pub fn captured_texts(&self) -> Vec<Vec<u8>> {
        self.captures
            .iter()
            .map(|slot| slot.as_ref().map(|s| s.text.clone()).unwrap_or_default())
            .collect()
    }

    fn try_match_at(&mut self, input: &[u8], start: usize) -> bool {
        let mut clist = Vec::new();
        self.gen_id += 1;
        let fresh: Captures = vec![None; self.nfa.capture_count()];
        self.add_state(&mut clist, self.nfa.start, input, start, fresh);

        if let Some(caps) = first_match(&clist, self.nfa) {
            self.captures = caps;
            return true;
        }

        for pos in start..input.len() {
            let byte = input[pos];
            let mut nlist = Vec::new();
            self.gen_id += 1;

            for thread in &clist {
                let state = self.nfa.state(thread.state);
                let advances = match &state.kind {
                    StateKind::Char(c) => *c == byte,
                    StateKind::CharClass(cc) => cc.matches(byte),
                    _ => false,
                };
                if advances {
                    if let Some(next) = state.out {
                        self.add_state(&mut nlist, next, input, pos + 1, thread.captures.clone());
                    }
                }
            }

            clist = nlist;
            if clist.is_empty() {
                trace!("simulator: thread set died at position {}", pos);
                return false;
            }
            if let Some(caps) = first_match(&clist, self.nfa) {
                self.captures = caps;
                return true;
            }
        }

        false
    }

    /// ε-expansion: adds `id` and everything ε-reachable from it to `list`,
    /// using the generation tag to dedupe within one step and to stop
    /// infinite ε-loops.
    fn add_state(&mut self, list: &mut Vec<Thread>, id: StateId, input: &[u8], pos: usize, caps: Captures) {
        if self.generation[id.index()] == self.gen_id {
            return;
        }
        self.generation[id.index()] = self.gen_id;

        let state = self.nfa.state(id);
        match state.kind {
            StateKind::Split => {
                let (first, second) = if state.greedy {
                    (state.out, state.out1)
                } else {
                    (state.out1, state.out)
                };
                if let Some(a) = first {
                    self.add_state(list, a, input, pos, caps.clone());
                }
                if let Some(b) = second {
                    self.add_state(list, b, input, pos, caps);
                }
            }

            StateKind::Assertion(kind) => {
                if assertion_holds(kind, input, pos) {
                    if let Some(next) = state.out {
                        self.add_state(list, next, input, pos, caps);
                    }
                }
            }

            StateKind::CaptureStart(index) => {
                let next = state.out;
                let mut caps = caps;
                caps[index] = Some(CaptureSlot {
                    start: pos,
                    end: pos,
                    text: Vec::new(),
                });
                if let Some(next) = next {
                    self.add_state(list, next, input, pos, caps);
                }
            }

            StateKind::CaptureEnd(index) => {
                let next = state.out;
                let mut caps = caps;
                if let Some(slot) = caps[index].as_mut() {
                    slot.end = pos;
                    slot.text = input[slot.start..pos].to_vec();
                }
                if let Some(next) = next {
                    self.add_state(list, next, input, pos, caps);
                }
            }

            StateKind::Char(_) | StateKind::CharClass(_) | StateKind::Match => {
                list.push(Thread { state: id, captures: caps });
            }
        }
    }
}

fn first_match(list: &[Thread], nfa: &Nfa) -> Option<Captures> {
    list.iter()
        .find(|thread| matches!(nfa.state(thread.state).kind, StateKind::Match))
        .map(|thread| thread.captures.clone())
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn assertion_holds(kind: AssertionKind, input: &[u8], pos: usize) -> bool {
    match kind {
        AssertionKind::StartLine => pos == 0,
        AssertionKind::EndLine => pos == input.len(),
        AssertionKind::WordBoundary => {
            let before = pos > 0 && is_word_byte(input[pos - 1]);
            let after = pos < input.len() && is_word_byte(input[pos]);
            before != after
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::token::Token;

    fn lit(b: u8) -> Token {
        Token::Literal(b)
    }

    #[test]
    fn matches_concatenated_literals_anywhere_in_input() {
        let nfa = Builder::new()
            .build(&[lit(b'a'), lit(b'b'), Token::Concat, lit(b'c'), Token::Concat])
            .unwrap();
        let mut sim = Simulator::new(&nfa);
        assert!(sim.is_match(b"xxabcxx"));
        assert!(!sim.is_match(b"xxacbxx"));
    }

    #[test]
    fn greedy_star_matches_empty_input() {
        let nfa = Builder::new()
            .build(&[lit(b'a'), Token::Star { greedy: true }])
            .unwrap();
        let mut sim = Simulator::new(&nfa);
        assert!(sim.is_match(b""));
    }

    #[test]
    fn plus_requires_at_least_one() {
        let nfa = Builder::new().build(&[lit(b'a'), Token::Plus]).unwrap();
        let mut sim = Simulator::new(&nfa);
        assert!(!sim.is_match(b""));
        assert!(sim.is_match(b"a"));
        assert!(sim.is_match(b"aa"));
    }

    #[test]
    fn bounded_quantifier_respects_min_and_max() {
        let nfa = Builder::new()
            .build(&[lit(b'a'), Token::Quantifier { min: 2, max: Some(3) }])
            .unwrap();
        let mut sim = Simulator::new(&nfa);
        assert!(sim.is_match(b"aa"));
        assert!(!sim.is_match(b"a"));
    }

    #[test]
    fn capture_group_records_matched_text() {
        // (a|b)+ abb (.)  -- mirrors scenario #7's shape without needing the preprocessor
        let nfa = Builder::new()
            .build(&[
                Token::CaptureOpen,
                lit(b'a'),
                lit(b'b'),
                Token::Concat,
                Token::CaptureClose,
            ])
            .unwrap();
        let mut sim = Simulator::new(&nfa);
        assert!(sim.is_match(b"ab"));
        assert_eq!(sim.capture(0), b"ab");
    }

    #[test]
    fn word_boundary_matches_at_alnum_transitions() {
        let nfa = Builder::new().build(&[Token::WordBoundary]).unwrap();
        let mut sim = Simulator::new(&nfa);
        assert!(sim.is_match(b"a b"));
    }

    #[test]
    fn start_line_assertion_only_matches_at_position_zero() {
        let nfa = Builder::new()
            .build(&[Token::StartLine, lit(b'a'), Token::Concat])
            .unwrap();
        let mut sim = Simulator::new(&nfa);
        assert!(sim.is_match(b"abc"));
        assert!(!sim.is_match(b"xabc"));
    }
}
