//! Spell subcommand - print token spellings of words.

use crate::config::{Vocab, VocabArgs};
use eyre::{Context, Result};
use lexdec::lexicon::{split_word, spelling_to_indices};

/// CLI arguments for spelling words.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Words to spell; words missing from the lexicon are split into characters
    #[arg(required = true)]
    pub words: Vec<String>,

    #[command(flatten)]
    pub vocab: VocabArgs,
}

/// Resolved configuration for spelling words.
#[derive(Debug)]
pub struct Config {
    pub words: Vec<String>,
    pub vocab: Vocab,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        Ok(Self {
            words: args.words,
            vocab: args.vocab.try_into()?,
        })
    }
}

pub fn execute(config: Config) -> Result<()> {
    let vocab = &config.vocab;

    for word in &config.words {
        for spelling in spellings(word, vocab)? {
            let indices = spelling_to_indices(&spelling, &vocab.tokens, &vocab.codec)
                .wrap_err_with(|| format!("cannot spell {word:?}"))?;
            let packed = vocab.tokens.map_indices_to_entries(&indices)?;

            let indices: Vec<String> = indices.iter().map(usize::to_string).collect();
            println!("{word}\t{}\t{}", packed.join(" "), indices.join(" "));
        }
    }

    Ok(())
}

/// Lexicon spellings of `word`, or its characters followed by the separator.
fn spellings(word: &str, vocab: &Vocab) -> Result<Vec<Vec<String>>> {
    match vocab.lexicon.get(word) {
        Some(spellings) if !spellings.is_empty() => Ok(spellings.clone()),
        _ => {
            tracing::warn!(word, "not in lexicon, splitting into characters");

            let mut spelling = split_word(word);
            spelling.push(vocab.tokens.entry(vocab.separator)?.to_string());
            Ok(vec![spelling])
        }
    }
}
