//! Error types for lexdec organized by processing stage.

use ndarray::ShapeError;
use thiserror::Error;

/// Decoder error variants organized by processing stage.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration stage error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Token or word index error
    #[error(transparent)]
    Dictionary(#[from] DictionaryError),

    /// Replabel packing or unpacking error
    #[error(transparent)]
    Replabel(#[from] ReplabelError),

    /// Trie construction error
    #[error(transparent)]
    Trie(#[from] TrieError),

    /// Decoding precondition error
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Emission fixture error
    #[error(transparent)]
    Fixture(#[from] FixtureError),
}

/// Decoder configuration errors, raised before any decoding starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Beam must retain at least one hypothesis
    #[error("invalid beam size: {0} (minimum 1)")]
    InvalidBeamSize(usize),

    /// Each frame must consider at least one token
    #[error("invalid beam size per token: {0} (minimum 1)")]
    InvalidBeamSizeToken(usize),

    /// Threshold is a margin below the best score
    #[error("invalid beam threshold: {0} (must be non-negative)")]
    InvalidBeamThreshold(f64),

    /// Blank-aware scoring needs a blank token
    #[error("CTC criterion requires a blank token index")]
    MissingBlank,

    /// Transition matrix is not alphabet x alphabet
    #[error("invalid transition matrix shape: expected {expected}x{expected}, got {rows}x{cols}")]
    TransitionShape {
        expected: usize,
        rows: usize,
        cols: usize,
    },

    /// Designated index lies outside its index space
    #[error("{name} index {index} out of range (size {size})")]
    IndexOutOfRange {
        name: &'static str,
        index: usize,
        size: usize,
    },
}

/// Token and word index errors.
#[derive(Debug, Error)]
pub enum DictionaryError {
    /// Entry not present and no default index configured
    #[error("unknown entry: {0:?}")]
    UnknownEntry(String),

    /// Index has no entry
    #[error("invalid index: {0}")]
    InvalidIndex(usize),

    /// Entry already mapped
    #[error("duplicate entry {entry:?} (already at index {index})")]
    DuplicateEntry { entry: String, index: usize },

    /// Line could not be parsed
    #[error("invalid line {line_no}: {line:?}")]
    InvalidLine { line_no: usize, line: String },

    /// IO error while reading a word or token list
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Replabel codec errors.
#[derive(Debug, Error)]
pub enum ReplabelError {
    /// Replabel token not registered in the token index
    #[error("replabel token {0:?} missing from token index")]
    MissingReplabel(String),

    /// Replabel at the start of a sequence or after another replabel
    #[error("replabel at position {position} has no preceding token")]
    OrphanReplabel { position: usize },

    /// Replabel value exceeds the configured maximum
    #[error("replabel value {value} exceeds max repeats {max_reps}")]
    RepeatOutOfRange { value: usize, max_reps: usize },
}

/// Trie construction errors.
#[derive(Debug, Error)]
pub enum TrieError {
    /// Token index outside the trie alphabet
    #[error("invalid token index {token} (alphabet size {size})")]
    InvalidToken { token: usize, size: usize },

    /// Node handles are 32-bit
    #[error("trie node limit exceeded")]
    TooManyNodes,
}

/// Decoding precondition errors.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Emission buffer length disagrees with the declared dimensions
    #[error("emission length {got} does not match {frames} frames x {tokens} tokens")]
    EmissionLength {
        frames: usize,
        tokens: usize,
        got: usize,
    },

    /// Emission width disagrees with the decoder alphabet
    #[error("emission has {got} tokens per frame, decoder expects {expected}")]
    TokenCountMismatch { expected: usize, got: usize },

    /// Session already consumed its end of sequence
    #[error("decode session already finished")]
    SessionFinished,

    /// ndarray shape error
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Binary emission fixture errors.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// File holds fewer bytes than its dimensions require
    #[error("truncated fixture {name}: expected {expected} bytes, got {got}")]
    Truncated {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    /// Dimension header is negative or zero-width
    #[error("invalid fixture dimensions: {frames} frames x {tokens} tokens")]
    InvalidDimensions { frames: i32, tokens: i32 },

    /// IO error while reading or writing fixture files
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// ndarray shape error
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Result type alias for lexdec operations.
pub type Result<T> = std::result::Result<T, Error>;

// Nested From implementations for automatic error conversion chains

// std::io::Error → DictionaryError → Error
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Dictionary(DictionaryError::Io(e))
    }
}

// ShapeError → DecodeError → Error
impl From<ShapeError> for Error {
    fn from(e: ShapeError) -> Self {
        Error::Decode(DecodeError::Shape(e))
    }
}
