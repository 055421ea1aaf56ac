//! Postfix token stream → NFA.
//!
//! Consumes a `Vec<Token>` left to right over a capacity-bounded fragment
//! stack, exactly as described by spec §4.1. The fiddly part is bounded
//! quantifier expansion (§4.1.1), which clones the operand fragment rather
//! than looping a shared `Split`, so each repetition gets its own `Split`
//! with its own `greedy` bit.

use log::{debug, trace};

use crate::error::{PatternError, PatternResult};
use crate::graph::{AssertionKind, CharClass, Fragment, Graph, PatchSite, Slot, StateId, StateKind};
use crate::token::{ClassItem, ClassSpec, Token};

const DEFAULT_CAPACITY: usize = 1000;

/// A compiled NFA: the state arena, the start state, and the number of
/// capturing groups the pattern declared.
pub struct Nfa {
    graph: Graph,
    pub start: StateId,
    capture_count: usize,
}

impl Nfa {
    pub fn state(&self, id: StateId) -> &crate::graph::State {
        self.graph.state(id)
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    /// The handle for the state at arena index `index`, for callers that
    /// want to walk every state (e.g. to check structural invariants).
    pub fn state_id(&self, index: usize) -> StateId {
        self.graph.state_id(index)
    }

    pub fn capture_count(&self) -> usize {
        self.capture_count
    }
}

/// Builds an `Nfa` from a postfix token stream, one fragment stack entry
/// at a time.
pub struct Builder {
    graph: Graph,
    stack: Vec<Fragment>,
    capacity: usize,
    next_capture: usize,
}

impl Builder {
    pub fn new() -> Self {
        Builder::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Builder {
            graph: Graph::new(),
            stack: Vec::new(),
            capacity,
            next_capture: 0,
        }
    }

    pub fn build(mut self, postfix: &[Token]) -> PatternResult<Nfa> {
        for token in postfix {
            trace!("builder: consuming {:?}", token);
            self.step(token)?;
        }

        if self.stack.len() != 1 {
            return Err(PatternError::TrailingFragments(self.stack.len()));
        }

        let fragment = self.stack.pop().unwrap();
        let match_state = self.graph.alloc(StateKind::Match);
        self.graph.patch(&fragment.out, match_state);

        debug!(
            "builder: compiled {} states, {} capture groups",
            self.graph.len(),
            self.next_capture
        );

        Ok(Nfa {
            graph: self.graph,
            start: fragment.start,
            capture_count: self.next_capture,
        })
    }

    fn push(&mut self, fragment: Fragment) -> PatternResult<()> {
        if self.stack.len() >= self.capacity {
            return Err(PatternError::StackOverflow {
                capacity: self.capacity,
            });
        }
        self.stack.push(fragment);
        Ok(())
    }

    fn pop(&mut self, operator: &'static str) -> PatternResult<Fragment> {
        self.stack
            .pop()
            .ok_or(PatternError::StackUnderflow { operator })
    }

    fn step(&mut self, token: &Token) -> PatternResult<()> {
        match token {
            Token::Literal(byte) => {
                let id = self.graph.alloc(StateKind::Char(*byte));
                self.push(Fragment::new(id, vec![PatchSite(id, Slot::Out)]))?;
            }

            Token::Class(spec) => {
                let class = expand_class(spec);
                let id = self.graph.alloc(StateKind::CharClass(class));
                self.push(Fragment::new(id, vec![PatchSite(id, Slot::Out)]))?;
            }

            Token::StartLine => self.push_assertion(AssertionKind::StartLine)?,
            Token::EndLine => self.push_assertion(AssertionKind::EndLine)?,
            Token::WordBoundary => self.push_assertion(AssertionKind::WordBoundary)?,

            Token::CaptureOpen => {
                let index = self.next_capture;
                self.next_capture += 1;
                let id = self.graph.alloc(StateKind::CaptureStart(index));
                self.push(Fragment::new(id, vec![PatchSite(id, Slot::Out)]))?;
            }

            Token::CaptureClose => {
                let content = self.pop(")")?;
                let opener = self.pop(")")?;
                let index = match self.graph.state(opener.start).kind {
                    StateKind::CaptureStart(i) => i,
                    _ => return Err(PatternError::UnbalancedGroup),
                };

                let end = self.graph.alloc(StateKind::CaptureEnd(index));
                self.graph.patch(&opener.out, content.start);
                self.graph.patch(&content.out, end);
                self.push(Fragment::new(opener.start, vec![PatchSite(end, Slot::Out)]))?;
            }

            Token::Concat => {
                let e2 = self.pop(".")?;
                let e1 = self.pop(".")?;
                self.graph.patch(&e1.out, e2.start);
                self.push(Fragment::new(e1.start, e2.out))?;
            }

            Token::Alternate => {
                let e2 = self.pop("|")?;
                let e1 = self.pop("|")?;
                let split = self.graph.alloc(StateKind::Split);
                self.graph.set_greedy(split, true);
                self.graph.state_mut(split).out = Some(e1.start);
                self.graph.state_mut(split).out1 = Some(e2.start);
                self.push(Fragment::new(split, Graph::append(e1.out, e2.out)))?;
            }

            Token::Optional { greedy } => {
                let e1 = self.pop("?")?;
                let split = self.graph.alloc(StateKind::Split);
                self.graph.set_greedy(split, *greedy);

                let dangling_slot;
                if *greedy {
                    self.graph.state_mut(split).out = Some(e1.start);
                    dangling_slot = Slot::Out1;
                } else {
                    self.graph.state_mut(split).out1 = Some(e1.start);
                    dangling_slot = Slot::Out;
                }

                let out = Graph::append(e1.out, vec![PatchSite(split, dangling_slot)]);
                self.push(Fragment::new(split, out))?;
            }

            Token::Star { greedy } => {
                let e1 = self.pop("*")?;
                let split = self.graph.alloc(StateKind::Split);
                self.graph.set_greedy(split, *greedy);

                let dangling_slot;
                if *greedy {
                    self.graph.state_mut(split).out = Some(e1.start);
                    dangling_slot = Slot::Out1;
                } else {
                    self.graph.state_mut(split).out1 = Some(e1.start);
                    dangling_slot = Slot::Out;
                }

                self.graph.patch(&e1.out, split);
                self.push(Fragment::new(split, vec![PatchSite(split, dangling_slot)]))?;
            }

            Token::Plus => {
                let e1 = self.pop("+")?;
                let split = self.graph.alloc(StateKind::Split);
                self.graph.set_greedy(split, true);
                self.graph.state_mut(split).out = Some(e1.start);
                self.graph.patch(&e1.out, split);
                self.push(Fragment::new(e1.start, vec![PatchSite(split, Slot::Out1)]))?;
            }

            Token::Quantifier { min, max } => {
                if let Some(m) = max {
                    if min > m {
                        return Err(PatternError::MalformedQuantifier(format!(
                            "min {} exceeds max {}",
                            min, m
                        )));
                    }
                }
                let e = self.pop("#")?;
                let result = self.quantify(&e, *min, *max);
                self.push(result)?;
            }
        }

        Ok(())
    }

    fn push_assertion(&mut self, kind: AssertionKind) -> PatternResult<()> {
        let id = self.graph.alloc(StateKind::Assertion(kind));
        self.push(Fragment::new(id, vec![PatchSite(id, Slot::Out)]))
    }

    /// Implements §4.1.1's clone-expansion algorithm for `{n,m}` /
    /// `{n,}`. `e` is never mutated directly — every repetition is a
    /// fresh deep clone so that each has its own `Split`.
    fn quantify(&mut self, e: &Fragment, min: usize, max: Option<usize>) -> Fragment {
        let mut result = if min == 0 {
            let eps = self.graph.alloc(StateKind::Split);
            Fragment::new(eps, vec![PatchSite(eps, Slot::Out), PatchSite(eps, Slot::Out1)])
        } else {
            let mut acc = self.graph.clone_fragment(e);
            for _ in 1..min {
                let next = self.graph.clone_fragment(e);
                self.graph.patch(&acc.out, next.start);
                acc = Fragment::new(acc.start, next.out);
            }
            acc
        };

        match max {
            None => {
                let loop_frag = self.graph.clone_fragment(e);
                let split = self.graph.alloc(StateKind::Split);
                self.graph.set_greedy(split, true);
                self.graph.state_mut(split).out = Some(loop_frag.start);
                self.graph.patch(&result.out, split);
                self.graph.patch(&loop_frag.out, split);
                result = Fragment::new(result.start, vec![PatchSite(split, Slot::Out1)]);
            }

            Some(m) => {
                let mut tail = result.out;
                for _ in min..m {
                    let opt = self.graph.clone_fragment(e);
                    let split = self.graph.alloc(StateKind::Split);
                    self.graph.set_greedy(split, true);
                    self.graph.state_mut(split).out = Some(opt.start);
                    self.graph.patch(&tail, split);
                    tail = Graph::append(opt.out, vec![PatchSite(split, Slot::Out1)]);
                }
                result = Fragment::new(result.start, tail);
            }
        }

        result
    }
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

/// Eagerly expands a `ClassSpec` (as parsed from a `[...]` token) into the
/// graph's byte-set representation.
fn expand_class(spec: &ClassSpec) -> CharClass {
    let mut class = CharClass::new(spec.negated);
    for item in &spec.items {
        match item {
            ClassItem::Single(b) => class.insert(*b),
            ClassItem::Range(lo, hi) => class.insert_range(*lo, *hi),
        }
    }
    class
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(b: u8) -> Token {
        Token::Literal(b)
    }

    #[test]
    fn concatenation_chains_two_literals() {
        let nfa = Builder::new()
            .build(&[lit(b'a'), lit(b'b'), Token::Concat])
            .unwrap();
        assert!(matches!(nfa.state(nfa.start).kind, StateKind::Char(b'a')));
    }

    #[test]
    fn underflow_on_binary_operator_with_empty_stack() {
        let err = Builder::new().build(&[Token::Concat]).unwrap_err();
        assert_eq!(err, PatternError::StackUnderflow { operator: "." });
    }

    #[test]
    fn trailing_fragments_is_an_error() {
        let err = Builder::new().build(&[lit(b'a'), lit(b'b')]).unwrap_err();
        assert_eq!(err, PatternError::TrailingFragments(2));
    }

    #[test]
    fn capture_close_without_open_is_unbalanced() {
        let err = Builder::new()
            .build(&[lit(b'a'), lit(b'b'), Token::CaptureClose])
            .unwrap_err();
        assert!(matches!(err, PatternError::UnbalancedGroup));
    }

    #[test]
    fn exact_quantifier_allocates_min_copies() {
        // a#2 -> "aa" only
        let before = Builder::new();
        let nfa = before
            .build(&[lit(b'a'), Token::Quantifier { min: 2, max: Some(2) }])
            .unwrap();
        // start -> a -> a -> match, three Char/Match states beyond the eps-less path
        let mut count = 0;
        let mut cur = Some(nfa.start);
        while let Some(id) = cur {
            count += 1;
            cur = nfa.state(id).out;
            if count > 10 {
                break;
            }
        }
        assert_eq!(count, 3); // a, a, Match
    }

    #[test]
    fn stack_capacity_is_enforced() {
        let mut tokens = vec![lit(b'a')];
        for _ in 0..5 {
            tokens.push(lit(b'a'));
        }
        let err = Builder::with_capacity(2).build(&tokens).unwrap_err();
        assert_eq!(err, PatternError::StackOverflow { capacity: 2 });
    }
}
