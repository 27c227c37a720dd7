//! Lexicon prefix tree over token-index spellings.

use crate::error::{Result, TrieError};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Handle of a node inside a [`LexiconTrie`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub const ROOT: Self = Self(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Word attached to a node whose root path spells it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrieLabel {
    /// Word index
    pub word: usize,
    /// Language model seed score of the word
    pub score: f32,
}

/// How smearing aggregates label scores up the tree.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmearingMode {
    /// Clear max scores
    None,
    /// Maximum over the subtree
    #[default]
    Max,
    /// Log-sum-exp over the subtree
    Logadd,
}

#[derive(Clone, Debug)]
pub struct TrieNode {
    token: usize,
    children: BTreeMap<usize, NodeId>,
    labels: Vec<TrieLabel>,
    max_score: Option<f32>,
}

impl TrieNode {
    fn new(token: usize) -> Self {
        Self {
            token,
            children: BTreeMap::new(),
            labels: Vec::new(),
            max_score: None,
        }
    }

    /// Token on the edge leading into this node.
    pub fn token(&self) -> usize {
        self.token
    }

    pub fn child(&self, token: usize) -> Option<NodeId> {
        self.children.get(&token).copied()
    }

    pub fn children(&self) -> impl Iterator<Item = (usize, NodeId)> + '_ {
        self.children.iter().map(|(&t, &id)| (t, id))
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn labels(&self) -> &[TrieLabel] {
        &self.labels
    }

    /// Smeared bound over this subtree, `None` until smeared.
    pub fn max_score(&self) -> Option<f32> {
        self.max_score
    }
}

/// Prefix tree of word spellings.
///
/// Nodes live in an arena and are only ever appended, so a child always has a
/// larger [`NodeId`] than its parent.
#[derive(Clone, Debug)]
pub struct LexiconTrie {
    nodes: Vec<TrieNode>,
    alphabet_size: usize,
    separator: usize,
    smearing: Option<SmearingMode>,
}

impl LexiconTrie {
    /// Create an empty trie over tokens `0..alphabet_size`.
    pub fn new(alphabet_size: usize, separator: usize) -> Self {
        Self {
            nodes: vec![TrieNode::new(separator)],
            alphabet_size,
            separator,
            smearing: None,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn node(&self, id: NodeId) -> &TrieNode {
        &self.nodes[id.index()]
    }

    pub fn alphabet_size(&self) -> usize {
        self.alphabet_size
    }

    /// Silence/separator token index.
    pub fn separator(&self) -> usize {
        self.separator
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Mode of the last smearing pass, if any.
    pub fn smearing(&self) -> Option<SmearingMode> {
        self.smearing
    }

    /// Insert a spelling, appending `(word, score)` to its terminal node.
    ///
    /// Repeated inserts of the same path keep every label.
    pub fn insert(&mut self, path: &[usize], word: usize, score: f32) -> Result<NodeId> {
        if let Some(&token) = path.iter().find(|&&t| t >= self.alphabet_size) {
            return Err(TrieError::InvalidToken {
                token,
                size: self.alphabet_size,
            }
            .into());
        }

        let mut id = self.root();
        for &token in path {
            id = match self.node(id).child(token) {
                Some(child) => child,
                None => {
                    let child = NodeId(
                        u32::try_from(self.nodes.len()).map_err(|_| TrieError::TooManyNodes)?,
                    );
                    self.nodes.push(TrieNode::new(token));
                    self.nodes[id.index()].children.insert(token, child);
                    child
                }
            };
        }

        self.nodes[id.index()].labels.push(TrieLabel { word, score });
        Ok(id)
    }

    /// Walk `path` from the root without modifying the trie.
    pub fn search(&self, path: &[usize]) -> Option<&TrieNode> {
        path.iter()
            .try_fold(self.root(), |id, &token| self.node(id).child(token))
            .map(|id| self.node(id))
    }

    /// Propagate label scores from the leaves toward the root.
    ///
    /// Recomputes every node from scratch, so repeated calls give the same
    /// result.
    pub fn smear(&mut self, mode: SmearingMode) {
        let merge: fn(f32, f32) -> f32 = match mode {
            SmearingMode::None => {
                for node in &mut self.nodes {
                    node.max_score = None;
                }
                self.smearing = Some(mode);
                return;
            }
            SmearingMode::Max => f32::max,
            SmearingMode::Logadd => log_add,
        };

        // Reverse arena order visits children before parents.
        for i in (0..self.nodes.len()).rev() {
            let node = &self.nodes[i];
            let children = node
                .children
                .values()
                .filter_map(|&child| self.nodes[child.index()].max_score);

            let scores = node.labels.iter().map(|l| l.score).chain(children);

            let max_score = scores.fold(f32::NEG_INFINITY, merge);

            self.nodes[i].max_score = Some(max_score);
        }

        self.smearing = Some(mode);

        tracing::debug!(nodes = self.nodes.len(), ?mode, "trie smeared");
    }
}

/// `ln(exp(a) + exp(b))` without overflow.
pub(crate) fn log_add(a: f32, b: f32) -> f32 {
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    if lo == f32::NEG_INFINITY {
        return hi;
    }
    hi + (lo - hi).exp().ln_1p()
}
