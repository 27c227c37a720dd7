//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use eyre::Result;

#[derive(Debug, Parser)]
#[command(name = "lexdec")]
#[command(about = "Lexicon-constrained beam-search decoding tools")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Decode an emission fixture directory into ranked transcriptions
    Decode(crate::decode::Args),

    /// Print the token spelling of words as planted in the trie
    Spell(crate::spell::Args),
}

/// Execute CLI command - separated for testing.
pub fn run(cli: Cli) -> Result<()> {
    tracing::debug!(?cli, "parsed arguments");

    match cli.command {
        Commands::Decode(args) => crate::decode::execute(args.try_into()?),
        Commands::Spell(args) => crate::spell::execute(args.try_into()?),
    }
}
