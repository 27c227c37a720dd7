//! Binary emission fixtures.
//!
//! A fixture directory holds three little-endian files:
//!
//! - `TN.bin`: frame count `T` and token count `N` as two `i32`
//! - `emission.bin`: `T x N` row-major `f32` emissions
//! - `transition.bin`: `N x N` row-major `f32` transitions

use crate::error::{FixtureError, Result};
use ndarray::Array2;
use std::fs;
use std::path::Path;

pub const DIMENSIONS_FILE: &str = "TN.bin";
pub const EMISSION_FILE: &str = "emission.bin";
pub const TRANSITION_FILE: &str = "transition.bin";

/// Emission and transition matrices of one utterance.
#[derive(Clone, Debug, PartialEq)]
pub struct EmissionSet {
    /// Frames x tokens
    pub emissions: Array2<f32>,
    /// Tokens x tokens, row = next token
    pub transitions: Array2<f32>,
}

impl EmissionSet {
    pub fn frames(&self) -> usize {
        self.emissions.nrows()
    }

    pub fn tokens(&self) -> usize {
        self.emissions.ncols()
    }

    /// Read a fixture directory.
    pub fn read_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();

        let header = read_file(&dir.join(DIMENSIONS_FILE))?;
        let (t, n) = decode_dims(&header)?;
        let invalid = FixtureError::InvalidDimensions { frames: t, tokens: n };
        let (frames, tokens) = match (usize::try_from(t), usize::try_from(n)) {
            (Ok(frames), Ok(tokens)) if tokens > 0 => (frames, tokens),
            _ => return Err(invalid.into()),
        };
        let (Some(emission_count), Some(transition_count)) =
            (frames.checked_mul(tokens), tokens.checked_mul(tokens))
        else {
            return Err(invalid.into());
        };

        let emissions = decode_f32(
            EMISSION_FILE,
            &read_file(&dir.join(EMISSION_FILE))?,
            emission_count,
        )?;
        let transitions = decode_f32(
            TRANSITION_FILE,
            &read_file(&dir.join(TRANSITION_FILE))?,
            transition_count,
        )?;

        tracing::debug!(dir = %dir.display(), frames, tokens, "fixture loaded");

        Ok(Self {
            emissions: Array2::from_shape_vec((frames, tokens), emissions)
                .map_err(FixtureError::from)?,
            transitions: Array2::from_shape_vec((tokens, tokens), transitions)
                .map_err(FixtureError::from)?,
        })
    }

    /// Write a fixture directory, creating it if needed.
    pub fn write_dir(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(FixtureError::from)?;

        let mut header = Vec::with_capacity(8);
        for dim in [self.frames(), self.tokens()] {
            let dim = i32::try_from(dim).map_err(|_| FixtureError::InvalidDimensions {
                frames: i32::try_from(self.frames()).unwrap_or(i32::MAX),
                tokens: i32::try_from(self.tokens()).unwrap_or(i32::MAX),
            })?;
            header.extend_from_slice(&dim.to_le_bytes());
        }

        write_file(&dir.join(DIMENSIONS_FILE), &header)?;
        write_file(&dir.join(EMISSION_FILE), &encode_f32(self.emissions.iter()))?;
        write_file(&dir.join(TRANSITION_FILE), &encode_f32(self.transitions.iter()))?;

        Ok(())
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    Ok(fs::read(path).map_err(FixtureError::from)?)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    Ok(fs::write(path, bytes).map_err(FixtureError::from)?)
}

fn check_len(name: &'static str, bytes: &[u8], count: usize) -> Result<()> {
    // No file can reach a saturated length.
    let expected = count.saturating_mul(4);
    if bytes.len() < expected {
        return Err(FixtureError::Truncated {
            name,
            expected,
            got: bytes.len(),
        }
        .into());
    }
    Ok(())
}

fn decode_dims(bytes: &[u8]) -> Result<(i32, i32)> {
    check_len(DIMENSIONS_FILE, bytes, 2)?;
    let word = |i: usize| i32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
    Ok((word(0), word(4)))
}

fn decode_f32(name: &'static str, bytes: &[u8], count: usize) -> Result<Vec<f32>> {
    check_len(name, bytes, count)?;
    Ok(bytes
        .chunks_exact(4)
        .take(count)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

fn encode_f32<'a>(values: impl Iterator<Item = &'a f32>) -> Vec<u8> {
    values.flat_map(|v| v.to_le_bytes()).collect()
}
