//! lexdec: Lexicon-constrained beam-search decoding for frame-level acoustic models.
//!
//! This crate turns per-frame token scores into ranked word transcriptions.
//! Word hypotheses are restricted to spellings in a lexicon and scored by an
//! external language model.
//!
//! # Architecture
//!
//! - [`dictionary::TokenIndex`]: Bidirectional entry/index mapping for tokens and words
//! - [`replabel::ReplabelCodec`]: Packs runs of repeated tokens into repetition labels
//! - [`trie::LexiconTrie`]: Prefix tree of word spellings with smeared score bounds
//! - [`lm::LanguageModel`]: Scoring contract over opaque states
//! - [`decoder::LexiconDecoder`]: Frame-synchronous beam search over all of the above
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use lexdec::decoder::{LexiconDecoder, LexiconDecoderOptions, SpecialIndices};
//! use lexdec::dictionary::TokenIndex;
//! use lexdec::lexicon::{build_trie, create_word_dict, load_words_file};
//! use lexdec::lm::ZeroLm;
//! use lexdec::replabel::ReplabelCodec;
//! use lexdec::trie::SmearingMode;
//!
//! let tokens = TokenIndex::from_file("tokens.txt")?;
//! let lexicon = load_words_file("lexicon.txt", None)?;
//! let words = create_word_dict(&lexicon);
//! let codec = ReplabelCodec::new(&tokens, 0)?;
//!
//! let separator = tokens.index("|")?;
//! let mut trie = build_trie(&lexicon, &tokens, &words, &ZeroLm, &codec, separator)?;
//! trie.smear(SmearingMode::Max);
//!
//! let decoder = LexiconDecoder::new(
//!     LexiconDecoderOptions::default(),
//!     Arc::new(trie),
//!     Arc::new(ZeroLm),
//!     SpecialIndices { separator, blank: None, unk: words.index("<unk>")? },
//!     transitions,
//! )?;
//! let results = decoder.decode(emissions.view())?;
//! ```

pub mod decoder;
pub mod dictionary;
pub mod error;
pub mod fixture;
pub mod lexicon;
pub mod lm;
pub mod replabel;
pub mod trie;
