//! Lexicon decoder definition and construction.

use crate::decoder::hypothesis::DecodeResult;
use crate::decoder::options::{CriterionType, LexiconDecoderOptions};
use crate::decoder::session::DecodeSession;
use crate::error::{ConfigError, DecodeError, Result};
use crate::lm::LanguageModel;
use crate::trie::LexiconTrie;
use ndarray::{Array2, ArrayView2};
use std::sync::Arc;

/// Designated token and word indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpecialIndices {
    /// Silence/separator token
    pub separator: usize,
    /// Blank token, required by CTC
    pub blank: Option<usize>,
    /// Unknown word
    pub unk: usize,
}

/// Beam-search decoder constrained by a lexicon trie.
///
/// Holds only configuration and shared read-only components; every decode
/// runs in its own [`DecodeSession`], so one decoder can serve concurrent
/// calls.
pub struct LexiconDecoder<L: LanguageModel> {
    pub(crate) options: LexiconDecoderOptions,
    pub(crate) trie: Arc<LexiconTrie>,
    pub(crate) lm: Arc<L>,
    pub(crate) indices: SpecialIndices,
    pub(crate) transitions: Array2<f32>,
    pub(crate) token_lm: bool,
}

impl<L: LanguageModel> LexiconDecoder<L> {
    /// Create a decoder.
    ///
    /// # Arguments
    ///
    /// * `trie` - Smeared lexicon trie; its alphabet size fixes the emission width
    /// * `transitions` - Token transition scores (row = next token, column =
    ///   previous token), alphabet x alphabet under ASG; ignored under CTC
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the beam parameters are invalid, a
    /// designated token lies outside the alphabet, CTC has no blank, or the
    /// ASG transition matrix has the wrong shape.
    pub fn new(
        options: LexiconDecoderOptions,
        trie: Arc<LexiconTrie>,
        lm: Arc<L>,
        indices: SpecialIndices,
        transitions: Array2<f32>,
    ) -> Result<Self> {
        options.validate()?;

        let n_tokens = trie.alphabet_size();
        check_index("separator", indices.separator, n_tokens)?;

        match (options.criterion, indices.blank) {
            (CriterionType::Ctc, None) => return Err(ConfigError::MissingBlank.into()),
            (_, Some(blank)) => check_index("blank", blank, n_tokens)?,
            (CriterionType::Asg, None) => {}
        }

        if options.criterion == CriterionType::Asg && transitions.dim() != (n_tokens, n_tokens) {
            let (rows, cols) = transitions.dim();
            return Err(ConfigError::TransitionShape {
                expected: n_tokens,
                rows,
                cols,
            }
            .into());
        }

        if trie.smearing().is_none() {
            tracing::warn!("decoding with an unsmeared trie, partial words are not bounded");
        }

        tracing::debug!(
            ?options,
            n_tokens,
            trie_nodes = trie.len(),
            "lexicon decoder constructed"
        );

        Ok(Self {
            options,
            trie,
            lm,
            indices,
            transitions,
            token_lm: false,
        })
    }

    /// Score the language model per token instead of per word.
    pub fn with_token_lm(mut self, token_lm: bool) -> Self {
        self.token_lm = token_lm;
        self
    }

    pub fn options(&self) -> &LexiconDecoderOptions {
        &self.options
    }

    pub fn trie(&self) -> &LexiconTrie {
        &self.trie
    }

    pub fn lm(&self) -> &L {
        &self.lm
    }

    pub fn indices(&self) -> SpecialIndices {
        self.indices
    }

    /// Number of tokens per emission frame.
    pub fn n_tokens(&self) -> usize {
        self.trie.alphabet_size()
    }

    /// Start an incremental decode.
    pub fn begin(&self) -> DecodeSession<'_, L> {
        DecodeSession::new(self)
    }

    /// Decode a full utterance of `frames x tokens` emissions.
    ///
    /// Returns every surviving hypothesis, best first. An empty result means
    /// no admissible transcription survived pruning.
    pub fn decode(&self, emissions: ArrayView2<f32>) -> Result<Vec<DecodeResult>> {
        let mut session = self.begin();
        session.step(emissions)?;
        session.finish()?;
        Ok(session.final_hypotheses())
    }

    /// Decode a flat row-major emission buffer of `frames x tokens` scores.
    pub fn decode_slice(
        &self,
        emissions: &[f32],
        frames: usize,
        tokens: usize,
    ) -> Result<Vec<DecodeResult>> {
        if frames.checked_mul(tokens) != Some(emissions.len()) {
            return Err(DecodeError::EmissionLength {
                frames,
                tokens,
                got: emissions.len(),
            }
            .into());
        }

        let emissions = ArrayView2::from_shape((frames, tokens), emissions)?;
        self.decode(emissions)
    }
}

fn check_index(name: &'static str, index: usize, size: usize) -> Result<()> {
    if index >= size {
        return Err(ConfigError::IndexOutOfRange { name, index, size }.into());
    }
    Ok(())
}
