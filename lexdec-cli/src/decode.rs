//! Decode subcommand - decode an emission fixture into ranked transcriptions.

use crate::config::{Vocab, VocabArgs};
use eyre::{Context, Result};
use lexdec::decoder::{DecodeResult, LexiconDecoder, LexiconDecoderOptions, SpecialIndices};
use lexdec::fixture::EmissionSet;
use lexdec::lexicon::build_trie;
use lexdec::lm::ZeroLm;
use lexdec::trie::SmearingMode;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// CLI arguments for fixture decoding.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Fixture directory holding TN.bin, emission.bin and transition.bin
    pub fixture: PathBuf,

    #[command(flatten)]
    pub vocab: VocabArgs,

    /// Trie smearing mode
    #[arg(long, value_enum, default_value_t = SmearingMode::Max)]
    pub smearing: SmearingMode,

    /// JSON file of decoder options, replacing those given on the command line
    #[arg(long)]
    pub options_file: Option<PathBuf>,

    /// Number of hypotheses to print
    #[arg(long, default_value_t = 1)]
    pub top: usize,

    #[command(flatten)]
    pub options: LexiconDecoderOptions,
}

/// Resolved configuration for fixture decoding.
#[derive(Debug)]
pub struct Config {
    pub emissions: EmissionSet,
    pub vocab: Vocab,
    pub smearing: SmearingMode,
    pub options: LexiconDecoderOptions,
    pub top: usize,
}

impl TryFrom<Args> for Config {
    type Error = eyre::Error;

    fn try_from(args: Args) -> Result<Self> {
        let options = match args.options_file.as_deref() {
            Some(path) => read_options(path)?,
            None => args.options,
        };
        options.validate()?;

        let emissions = EmissionSet::read_dir(&args.fixture)
            .wrap_err_with(|| format!("failed to load fixture: {:?}", args.fixture.display()))?;

        Ok(Self {
            emissions,
            vocab: args.vocab.try_into()?,
            smearing: args.smearing,
            options,
            top: args.top,
        })
    }
}

pub fn execute(config: Config) -> Result<()> {
    let Config {
        emissions,
        vocab,
        smearing,
        options,
        top,
    } = config;

    tracing::info!(
        frames = emissions.frames(),
        tokens = emissions.tokens(),
        ?options,
        "decoding fixture"
    );

    let s = Instant::now();

    let decoder = build_decoder(&vocab, smearing, options, &emissions)?;

    let d = s.elapsed();
    tracing::info!(
        duration = %format_secs(d.as_secs_f32()),
        nodes = decoder.trie().len(),
        "decoder built"
    );

    let s = Instant::now();

    let results = decoder
        .decode(emissions.emissions.view())
        .wrap_err("decoding failed")?;

    let d = s.elapsed();
    tracing::info!(
        duration = %format_secs(d.as_secs_f32()),
        hypotheses = results.len(),
        "decoding completed"
    );

    if results.is_empty() {
        tracing::warn!("no hypothesis survived pruning");
    }

    for (rank, result) in results.iter().take(top).enumerate() {
        println!("{}", format_result(rank + 1, result, &vocab)?);
    }

    Ok(())
}

/// Plant the lexicon and wrap it in a decoder scored by [`ZeroLm`].
fn build_decoder(
    vocab: &Vocab,
    smearing: SmearingMode,
    options: LexiconDecoderOptions,
    emissions: &EmissionSet,
) -> Result<LexiconDecoder<ZeroLm>> {
    let mut trie = build_trie(
        &vocab.lexicon,
        &vocab.tokens,
        &vocab.words,
        &ZeroLm,
        &vocab.codec,
        vocab.separator,
    )
    .wrap_err("failed to build lexicon trie")?;
    trie.smear(smearing);

    let indices = SpecialIndices {
        separator: vocab.separator,
        blank: vocab.blank,
        unk: vocab.unk,
    };

    let decoder = LexiconDecoder::new(
        options,
        Arc::new(trie),
        Arc::new(ZeroLm),
        indices,
        emissions.transitions.clone(),
    )?;

    Ok(decoder)
}

fn read_options(path: &Path) -> Result<LexiconDecoderOptions> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read options: {:?}", path.display()))?;

    serde_json::from_str(&text)
        .wrap_err_with(|| format!("invalid decoder options: {:?}", path.display()))
}

/// One output line: rank, score, words and the collapsed spelling.
fn format_result(rank: usize, result: &DecodeResult, vocab: &Vocab) -> Result<String> {
    let skip: Vec<usize> = vocab.blank.into_iter().collect();
    let words = vocab.spell_words(&result.word_sequence())?;
    let spelling = vocab.spell_tokens(&result.token_sequence(&skip))?;

    Ok(format!("{rank}\t{:.4}\t{words}\t{spelling}", result.score))
}

/// Format seconds as a string with two decimal places.
fn format_secs(secs: f32) -> String {
    format!("{:.2}s", secs)
}
