//! Lexicon-constrained beam-search decoding.
//!
//! [`LexiconDecoder`] holds the immutable configuration; each decode runs in a
//! [`DecodeSession`] that owns the hypothesis arena.

mod candidates;
mod hypothesis;
mod lexicon_decoder;
pub mod options;
mod scoring;
mod session;

pub use hypothesis::{DecodeResult, HypId};
pub use lexicon_decoder::{LexiconDecoder, SpecialIndices};
pub use options::{CriterionType, LexiconDecoderOptions};
pub use session::DecodeSession;
