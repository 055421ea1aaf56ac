//! Arena-based NFA graph primitives: states, character classes, fragments
//! and patch lists.
//!
//! States live in a single growable arena (`Graph`) and are referenced by
//! the dense handle `StateId` rather than by pointer. This sidesteps the
//! `Rc<RefCell<_>>` cyclic-ownership dance a pointer-graph needs for loops
//! (`*`, `+`, `{n,}`): a cycle here is just two arena indices pointing at
//! each other.

use std::collections::HashMap;

/// Handle into a `Graph`'s state arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateId(u32);

impl StateId {
    fn new(index: usize) -> Self {
        StateId(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which outgoing edge of a state a patch site refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Out,
    Out1,
}

/// A single dangling output: the state and edge slot that still needs a target.
#[derive(Debug, Clone, Copy)]
pub struct PatchSite(pub StateId, pub Slot);

/// A list of dangling output sites waiting to be bound to a target state.
pub type PatchList = Vec<PatchSite>;

/// Zero-width assertion kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertionKind {
    StartLine,
    EndLine,
    WordBoundary,
}

/// A set of bytes, expanded eagerly at build time, plus a negation flag.
///
/// `matches(b) = negated XOR (b in set)`.
#[derive(Debug, Clone)]
pub struct CharClass {
    set: Box<[bool; 256]>,
    pub negated: bool,
}

impl CharClass {
    pub fn new(negated: bool) -> Self {
        CharClass {
            set: Box::new([false; 256]),
            negated,
        }
    }

    pub fn insert(&mut self, byte: u8) {
        self.set[byte as usize] = true;
    }

    pub fn insert_range(&mut self, lo: u8, hi: u8) {
        for b in lo..=hi {
            self.set[b as usize] = true;
        }
    }

    pub fn matches(&self, byte: u8) -> bool {
        self.negated ^ self.set[byte as usize]
    }
}

/// The tagged variants a state can take.
#[derive(Debug, Clone)]
pub enum StateKind {
    Char(u8),
    CharClass(CharClass),
    Split,
    Match,
    Assertion(AssertionKind),
    CaptureStart(usize),
    CaptureEnd(usize),
}

/// A single NFA node. `out`/`out1` are both used only by `Split`; every
/// other kind that has a successor uses `out` alone. `greedy` is only
/// meaningful on `Split` nodes and records which edge ε-expansion should
/// prefer.
#[derive(Debug, Clone)]
pub struct State {
    pub kind: StateKind,
    pub out: Option<StateId>,
    pub out1: Option<StateId>,
    pub greedy: bool,
}

/// An in-progress subgraph: an owned start state plus the list of output
/// sites that haven't been wired to anything yet.
#[derive(Debug)]
pub struct Fragment {
    pub start: StateId,
    pub out: PatchList,
}

impl Fragment {
    pub fn new(start: StateId, out: PatchList) -> Self {
        Fragment { start, out }
    }
}

/// Owns the state arena and the low-level operations the builder composes
/// fragments with: allocation, patching, and deep clone.
#[derive(Debug, Default)]
pub struct Graph {
    states: Vec<State>,
}

impl Graph {
    pub fn new() -> Self {
        Graph { states: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn state_id(&self, index: usize) -> StateId {
        assert!(index < self.states.len(), "state index {} out of range", index);
        StateId::new(index)
    }

    pub fn alloc(&mut self, kind: StateKind) -> StateId {
        let id = StateId::new(self.states.len());
        self.states.push(State {
            kind,
            out: None,
            out1: None,
            greedy: false,
        });
        id
    }

    pub fn state(&self, id: StateId) -> &State {
        &self.states[id.index()]
    }

    pub fn state_mut(&mut self, id: StateId) -> &mut State {
        &mut self.states[id.index()]
    }

    pub fn set_greedy(&mut self, id: StateId, greedy: bool) {
        self.state_mut(id).greedy = greedy;
    }

    /// Walks `list` and assigns every dangling site to `target`.
    pub fn patch(&mut self, list: &PatchList, target: StateId) {
        for site in list {
            match site.1 {
                Slot::Out => self.state_mut(site.0).out = Some(target),
                Slot::Out1 => self.state_mut(site.0).out1 = Some(target),
            }
        }
    }

    pub fn append(mut a: PatchList, b: PatchList) -> PatchList {
        a.extend(b);
        a
    }

    /// Deep-clones the subgraph reachable from `fragment.start`, producing a
    /// fresh, independently-patchable fragment. Used by bounded-quantifier
    /// expansion, which needs one physical `Split` (with its own `greedy`
    /// bit) per repetition rather than a shared back-edge.
    pub fn clone_fragment(&mut self, fragment: &Fragment) -> Fragment {
        let mut map: HashMap<StateId, StateId> = HashMap::new();
        let mut stack = vec![fragment.start];

        while let Some(old) = stack.pop() {
            if map.contains_key(&old) {
                continue;
            }
            let old_state = self.state(old).clone();
            let new_id = self.alloc(old_state.kind);
            self.state_mut(new_id).greedy = old_state.greedy;
            map.insert(old, new_id);

            if let Some(next) = old_state.out {
                stack.push(next);
            }
            if let Some(next) = old_state.out1 {
                stack.push(next);
            }
        }

        let wiring: Vec<(StateId, Option<StateId>, Option<StateId>)> = map
            .iter()
            .map(|(&old, &new)| {
                let old_state = self.state(old);
                (new, old_state.out, old_state.out1)
            })
            .collect();

        for (new_id, old_out, old_out1) in wiring {
            let new_out = old_out.map(|o| *map.get(&o).unwrap_or(&o));
            let new_out1 = old_out1.map(|o| *map.get(&o).unwrap_or(&o));
            self.state_mut(new_id).out = new_out;
            self.state_mut(new_id).out1 = new_out1;
        }

        let new_out_list = fragment
            .out
            .iter()
            .map(|site| PatchSite(*map.get(&site.0).expect("dangling site outside cloned subgraph"), site.1))
            .collect();

        Fragment::new(*map.get(&fragment.start).unwrap(), new_out_list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_class_matches_respects_negation() {
        let mut cc = CharClass::new(false);
        cc.insert_range(b'a', b'z');
        assert!(cc.matches(b'm'));
        assert!(!cc.matches(b'M'));

        let mut negated = CharClass::new(true);
        negated.insert(b'x');
        assert!(!negated.matches(b'x'));
        assert!(negated.matches(b'y'));
    }

    #[test]
    fn patch_wires_all_dangling_sites() {
        let mut graph = Graph::new();
        let a = graph.alloc(StateKind::Char(b'a'));
        let b = graph.alloc(StateKind::Char(b'b'));
        let target = graph.alloc(StateKind::Match);

        graph.patch(&vec![PatchSite(a, Slot::Out), PatchSite(b, Slot::Out)], target);

        assert_eq!(graph.state(a).out, Some(target));
        assert_eq!(graph.state(b).out, Some(target));
    }

    #[test]
    fn clone_fragment_duplicates_states_and_preserves_shape() {
        let mut graph = Graph::new();
        let a = graph.alloc(StateKind::Char(b'a'));
        let split = graph.alloc(StateKind::Split);
        graph.set_greedy(split, true);
        graph.state_mut(split).out = Some(a);
        // out1 left dangling

        let fragment = Fragment::new(split, vec![PatchSite(split, Slot::Out1), PatchSite(a, Slot::Out)]);
        let clone = graph.clone_fragment(&fragment);

        assert_ne!(clone.start, fragment.start);
        assert!(graph.state(clone.start).greedy);
        let cloned_a = graph.state(clone.start).out.unwrap();
        assert_ne!(cloned_a, a);
        assert!(matches!(graph.state(cloned_a).kind, StateKind::Char(b'a')));
        assert_eq!(clone.out.len(), 2);
    }
}
