//! Beam hypotheses and decoded results.

use crate::trie::NodeId;
use std::cmp::Ordering;

/// Handle of a hypothesis in a session arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HypId(usize);

impl HypId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// One search candidate.
#[derive(Clone, Debug)]
pub(crate) struct Hypothesis<S> {
    /// Total score (acoustic + weighted LM + word/unk/sil bonuses)
    pub score: f64,
    /// Acoustic part of the score
    pub am_score: f64,
    /// Unweighted LM part of the score, including smearing increments
    pub lm_score: f64,
    pub lm_state: S,
    pub node: NodeId,
    pub parent: Option<HypId>,
    /// Token emitted at this frame
    pub token: usize,
    /// Word closed at this frame
    pub word: Option<usize>,
    pub prev_blank: bool,
}

impl<S: Ord> Hypothesis<S> {
    /// Order by merge key, ignoring scores.
    ///
    /// Hypotheses comparing equal behave identically from here on.
    pub fn cmp_state(&self, other: &Self) -> Ordering {
        self.lm_state
            .cmp(&other.lm_state)
            .then(self.node.cmp(&other.node))
            .then(self.token.cmp(&other.token))
            .then(self.prev_blank.cmp(&other.prev_blank))
    }
}

/// A decoded path, reconstructed by walking back-pointers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodeResult {
    pub score: f64,
    pub am_score: f64,
    pub lm_score: f64,
    /// Token emitted at each frame, the start and end frames included
    pub tokens: Vec<usize>,
    /// Word closed at each frame, if any
    pub words: Vec<Option<usize>>,
}

impl DecodeResult {
    /// Closed words in order.
    pub fn word_sequence(&self) -> Vec<usize> {
        self.words.iter().flatten().copied().collect()
    }

    /// Emitted tokens with consecutive repeats and `skip` tokens removed.
    pub fn token_sequence(&self, skip: &[usize]) -> Vec<usize> {
        let mut out: Vec<usize> = Vec::new();
        let mut last = None;

        for &token in &self.tokens {
            if last != Some(token) && !skip.contains(&token) {
                out.push(token);
            }
            last = Some(token);
        }

        out
    }
}
