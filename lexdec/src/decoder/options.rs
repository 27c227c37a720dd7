//! Lexicon decoder configuration.

use crate::error::{ConfigError, Result};
use serde::Deserialize;

/// Default number of hypotheses kept per frame
const DEFAULT_BEAM_SIZE: usize = 2500;

/// Default number of tokens expanded per frame
const DEFAULT_BEAM_SIZE_TOKEN: usize = 250_000;

/// Default pruning margin below the best score
const DEFAULT_BEAM_THRESHOLD: f64 = 25.0;

/// Frame scoring convention of the upstream model.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CriterionType {
    /// Transition matrix scores token changes, repeats collapse without blank
    #[default]
    Asg,
    /// Blank token separates repeats, no transition scores
    Ctc,
}

/// Configuration for lexicon-constrained beam search.
#[derive(clap::Args, Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LexiconDecoderOptions {
    /// Maximum hypotheses retained per frame
    #[arg(long, default_value_t = DEFAULT_BEAM_SIZE)]
    pub beam_size: usize,

    /// Maximum tokens expanded per frame, ranked by emission score
    #[arg(long, default_value_t = DEFAULT_BEAM_SIZE_TOKEN)]
    pub beam_size_token: usize,

    /// Drop hypotheses scoring more than this below the frame best
    #[arg(long, default_value_t = DEFAULT_BEAM_THRESHOLD)]
    pub beam_threshold: f64,

    /// Language model weight
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub lm_weight: f64,

    /// Word insertion score
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub word_score: f64,

    /// Unknown word score, -inf disables unknown words
    #[arg(long, default_value_t = f64::NEG_INFINITY, allow_hyphen_values = true)]
    pub unk_score: f64,

    /// Silence score added whenever the separator token is emitted
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub sil_score: f64,

    /// Merge equivalent hypotheses by log-sum-exp instead of max
    #[arg(long)]
    pub log_add: bool,

    /// Frame scoring convention
    #[arg(long, value_enum, default_value_t = CriterionType::Asg)]
    pub criterion: CriterionType,
}

impl Default for LexiconDecoderOptions {
    fn default() -> Self {
        Self {
            beam_size: DEFAULT_BEAM_SIZE,
            beam_size_token: DEFAULT_BEAM_SIZE_TOKEN,
            beam_threshold: DEFAULT_BEAM_THRESHOLD,
            lm_weight: 0.0,
            word_score: 0.0,
            unk_score: f64::NEG_INFINITY,
            sil_score: 0.0,
            log_add: false,
            criterion: CriterionType::Asg,
        }
    }
}

impl LexiconDecoderOptions {
    /// Check beam parameters.
    pub fn validate(&self) -> Result<()> {
        if self.beam_size == 0 {
            return Err(ConfigError::InvalidBeamSize(self.beam_size).into());
        }

        if self.beam_size_token == 0 {
            return Err(ConfigError::InvalidBeamSizeToken(self.beam_size_token).into());
        }

        if self.beam_threshold.is_nan() || self.beam_threshold < 0.0 {
            return Err(ConfigError::InvalidBeamThreshold(self.beam_threshold).into());
        }

        Ok(())
    }

    /// Whether unknown-word branches are proposed at all.
    pub fn unk_enabled(&self) -> bool {
        self.unk_score > f64::NEG_INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn defaults_are_valid() {
        let options = LexiconDecoderOptions::default();

        assert!(options.validate().is_ok());
        assert!(!options.unk_enabled());
        assert_eq!(options.criterion, CriterionType::Asg);
    }

    #[test]
    fn rejects_empty_beam() {
        let options = LexiconDecoderOptions {
            beam_size: 0,
            ..Default::default()
        };

        assert!(matches!(
            options.validate(),
            Err(Error::Config(ConfigError::InvalidBeamSize(0)))
        ));
    }

    #[test]
    fn rejects_negative_threshold() {
        let options = LexiconDecoderOptions {
            beam_threshold: -1.0,
            ..Default::default()
        };

        assert!(matches!(
            options.validate(),
            Err(Error::Config(ConfigError::InvalidBeamThreshold(_)))
        ));
    }

    #[test]
    fn deserializes_partial_json() {
        let json = r#"{ "beam_size": 16, "lm_weight": 2.0, "criterion": "ctc" }"#;

        let options: LexiconDecoderOptions = serde_json::from_str(json).unwrap();

        assert_eq!(options.beam_size, 16);
        assert!((options.lm_weight - 2.0).abs() < 1e-9);
        assert_eq!(options.criterion, CriterionType::Ctc);
        assert_eq!(options.beam_size_token, DEFAULT_BEAM_SIZE_TOKEN);
        assert_eq!(options.unk_score, f64::NEG_INFINITY);
    }
}
