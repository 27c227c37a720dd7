//! Per-frame candidate collection, merging and pruning.

use crate::decoder::hypothesis::Hypothesis;

/// Candidates proposed for one frame.
pub(crate) struct Candidates<S> {
    items: Vec<Hypothesis<S>>,
    best: f64,
    threshold: f64,
}

impl<S: Ord> Candidates<S> {
    pub fn new(threshold: f64) -> Self {
        Self {
            items: Vec::new(),
            best: f64::NEG_INFINITY,
            threshold,
        }
    }

    /// Keep `hyp` unless it is already beyond the threshold of the running best.
    pub fn add(&mut self, hyp: Hypothesis<S>) {
        if hyp.score >= self.best {
            self.best = hyp.score;
        }
        if hyp.score >= self.best - self.threshold {
            self.items.push(hyp);
        }
    }

    #[cfg(test)]
    pub fn best(&self) -> f64 {
        self.best
    }

    /// Merge equivalent candidates and keep the `beam_size` best.
    ///
    /// The output is ordered by score, highest first; ties keep merge-key
    /// order.
    pub fn store(self, beam_size: usize, log_add: bool) -> Vec<Hypothesis<S>> {
        let cutoff = self.best - self.threshold;
        let mut items: Vec<_> = self
            .items
            .into_iter()
            .filter(|h| h.score >= cutoff)
            .collect();

        // Group equal states, best score first within each group.
        items.sort_by(|a, b| a.cmp_state(b).then(b.score.total_cmp(&a.score)));

        let mut merged: Vec<Hypothesis<S>> = Vec::with_capacity(items.len());
        for hyp in items {
            match merged.last_mut() {
                Some(last) if last.cmp_state(&hyp).is_eq() => {
                    last.score = merge_scores(last.score, hyp.score, log_add);
                }
                _ => merged.push(hyp),
            }
        }

        merged.sort_by(|a, b| b.score.total_cmp(&a.score));
        merged.truncate(beam_size);
        merged
    }
}

fn merge_scores(a: f64, b: f64, log_add: bool) -> f64 {
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    if !log_add || lo == f64::NEG_INFINITY {
        return hi;
    }
    hi + (lo - hi).exp().ln_1p()
}
