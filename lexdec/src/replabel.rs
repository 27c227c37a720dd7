//! Replabel packing of repeated-token runs.
//!
//! A replabel token `<k>` following a regular token means "repeat the previous
//! token `k` more times". Packing `a b b c c c` with `max_reps >= 2` yields
//! `a b <1> c <2>`. Runs longer than `max_reps + 1` are packed in chunks.

use crate::dictionary::TokenIndex;
use crate::error::{ReplabelError, Result};
use std::collections::HashMap;

/// Name of the replabel token for a repeat count.
pub fn replabel_token(value: usize) -> String {
    format!("<{value}>")
}

/// Parse a replabel token name back into its repeat count.
fn parse_replabel(entry: &str) -> Option<usize> {
    entry
        .strip_prefix('<')?
        .strip_suffix('>')?
        .parse()
        .ok()
        .filter(|&value| value > 0)
}

/// Stateless pack/unpack transform bound to one token index.
#[derive(Clone, Debug)]
pub struct ReplabelCodec {
    max_reps: usize,
    /// Token index of `<k>` at position `k`; position 0 is unused.
    value_to_index: Vec<usize>,
    /// Every replabel-named token in the index, in range or not.
    index_to_value: HashMap<usize, usize>,
}

impl ReplabelCodec {
    /// Bind a codec to `tokens`.
    ///
    /// Fails if any of `<1>`..`<max_reps>` is missing from the index.
    pub fn new(tokens: &TokenIndex, max_reps: usize) -> Result<Self> {
        let mut value_to_index = vec![0; max_reps + 1];

        for (value, slot) in value_to_index.iter_mut().enumerate().skip(1) {
            let name = replabel_token(value);
            if !tokens.contains(&name) {
                return Err(ReplabelError::MissingReplabel(name).into());
            }
            *slot = tokens.index(&name)?;
        }

        let index_to_value = tokens
            .iter()
            .filter_map(|(entry, index)| parse_replabel(entry).map(|value| (index, value)))
            .collect();

        Ok(Self {
            max_reps,
            value_to_index,
            index_to_value,
        })
    }

    pub fn max_reps(&self) -> usize {
        self.max_reps
    }

    /// Whether `token` is one of this codec's replabels (`<1>`..`<max_reps>`).
    pub fn is_replabel(&self, token: usize) -> bool {
        self.index_to_value
            .get(&token)
            .is_some_and(|&value| value <= self.max_reps)
    }

    /// Replace runs of repeated tokens with replabels.
    pub fn pack(&self, tokens: &[usize]) -> Vec<usize> {
        if self.max_reps == 0 {
            return tokens.to_vec();
        }

        let mut packed = Vec::with_capacity(tokens.len());
        let mut prev = None;
        let mut reps = 0;

        for &token in tokens {
            if prev == Some(token) && reps < self.max_reps {
                reps += 1;
                continue;
            }

            if reps > 0 {
                packed.push(self.value_to_index[reps]);
                reps = 0;
            }
            packed.push(token);
            prev = Some(token);
        }

        if reps > 0 {
            packed.push(self.value_to_index[reps]);
        }

        packed
    }

    /// Expand replabels back into repeated tokens.
    pub fn unpack(&self, tokens: &[usize]) -> Result<Vec<usize>> {
        if self.max_reps == 0 {
            return Ok(tokens.to_vec());
        }

        let mut unpacked = Vec::with_capacity(tokens.len());
        let mut prev = None;

        for (position, &token) in tokens.iter().enumerate() {
            let Some(&value) = self.index_to_value.get(&token) else {
                unpacked.push(token);
                prev = Some(token);
                continue;
            };

            if value > self.max_reps {
                return Err(ReplabelError::RepeatOutOfRange {
                    value,
                    max_reps: self.max_reps,
                }
                .into());
            }

            let target = prev
                .take()
                .ok_or(ReplabelError::OrphanReplabel { position })?;
            unpacked.extend(std::iter::repeat_n(target, value));
        }

        Ok(unpacked)
    }
}
