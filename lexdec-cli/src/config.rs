//! Vocabulary arguments shared by subcommands.
//!
//! `VocabArgs` is parsed by clap and resolved into a loaded `Vocab` via
//! TryFrom.

use eyre::{Context, Result};
use lexdec::dictionary::TokenIndex;
use lexdec::lexicon::{Lexicon, UNK_TOKEN, create_word_dict, load_words_file};
use lexdec::replabel::ReplabelCodec;
use std::path::PathBuf;

/// CLI arguments locating the token list and lexicon.
#[derive(clap::Args, Debug, Clone)]
pub struct VocabArgs {
    /// Token list, one token (or alias group) per line
    #[arg(long)]
    pub tokens: PathBuf,

    /// Lexicon file, one `word tok tok ...` spelling per line
    #[arg(long)]
    pub lexicon: PathBuf,

    /// Maximum repeats packed into one replabel token (0 disables packing)
    #[arg(long, default_value_t = 0)]
    pub max_reps: usize,

    /// Word separator (silence) token
    #[arg(long, default_value = "|")]
    pub separator: String,

    /// Blank token, required by the CTC criterion
    #[arg(long)]
    pub blank: Option<String>,

    /// Read at most this many lexicon words
    #[arg(long)]
    pub max_words: Option<usize>,
}

/// Loaded vocabulary.
#[derive(Debug)]
pub struct Vocab {
    pub tokens: TokenIndex,
    pub lexicon: Lexicon,
    pub words: TokenIndex,
    pub codec: ReplabelCodec,
    pub separator: usize,
    pub blank: Option<usize>,
    pub unk: usize,
}

impl TryFrom<VocabArgs> for Vocab {
    type Error = eyre::Error;

    fn try_from(args: VocabArgs) -> Result<Self> {
        let tokens = TokenIndex::from_file(&args.tokens)
            .wrap_err_with(|| format!("failed to load tokens: {:?}", args.tokens.display()))?;

        let lexicon = load_words_file(&args.lexicon, args.max_words)
            .wrap_err_with(|| format!("failed to load lexicon: {:?}", args.lexicon.display()))?;

        let words = create_word_dict(&lexicon);

        let codec = ReplabelCodec::new(&tokens, args.max_reps)
            .wrap_err_with(|| format!("invalid replabel setup (max reps {})", args.max_reps))?;

        let separator = tokens
            .index(&args.separator)
            .wrap_err_with(|| format!("separator {:?} is not a token", args.separator))?;

        let blank = args
            .blank
            .as_deref()
            .map(|blank| {
                tokens
                    .index(blank)
                    .wrap_err_with(|| format!("blank {blank:?} is not a token"))
            })
            .transpose()?;

        let unk = words.index(UNK_TOKEN)?;

        tracing::info!(
            tokens = tokens.index_size(),
            words = words.index_size(),
            max_reps = args.max_reps,
            "vocabulary loaded"
        );

        Ok(Self {
            tokens,
            lexicon,
            words,
            codec,
            separator,
            blank,
            unk,
        })
    }
}

impl Vocab {
    /// Render a token sequence as text, separators becoming spaces.
    pub fn spell_tokens(&self, tokens: &[usize]) -> Result<String> {
        let unpacked = self.codec.unpack(tokens)?;

        let mut text = String::new();
        for token in unpacked {
            if token == self.separator {
                text.push(' ');
            } else {
                text.push_str(self.tokens.entry(token)?);
            }
        }

        Ok(text.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    /// Join word indices into text.
    pub fn spell_words(&self, words: &[usize]) -> Result<String> {
        Ok(self.words.map_indices_to_entries(words)?.join(" "))
    }
}
