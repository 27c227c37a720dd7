//! Language model scoring contract.

/// External scoring oracle consumed by the decoder.
///
/// States are opaque to the decoder: it only clones, stores and orders them.
/// Two hypotheses whose states compare equal are treated as equivalent for
/// merging, so the `Ord` implementation defines state identity. All scores are
/// natural-log domain and additive.
pub trait LanguageModel: Send + Sync {
    /// Opaque language model state.
    type State: Clone + Ord + Send + Sync;

    /// Initial state for a new utterance.
    fn start(&self, start_with_nothing: bool) -> Self::State;

    /// Advance `state` by one word (or token, for token-level models).
    fn score(&self, state: &Self::State, index: usize) -> (Self::State, f32);

    /// Score the end-of-sequence transition from `state`.
    fn finish(&self, state: &Self::State) -> (Self::State, f32);
}

/// Language model that scores every word as zero.
///
/// All states are identical, so hypotheses differing only in word history
/// merge.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZeroLm;

impl LanguageModel for ZeroLm {
    type State = ();

    fn start(&self, _start_with_nothing: bool) -> Self::State {}

    fn score(&self, _state: &Self::State, _index: usize) -> (Self::State, f32) {
        ((), 0.0)
    }

    fn finish(&self, _state: &Self::State) -> (Self::State, f32) {
        ((), 0.0)
    }
}
