//! Frame scoring conventions, selected once per decode step.

use ndarray::ArrayView2;

/// How emitted tokens are scored against the previous token.
pub(crate) trait FrameScoring: Sync {
    /// Whether a blank token separates repeats.
    const BLANK_AWARE: bool;

    /// Transition score from `prev` to `next`.
    fn transition(&self, next: usize, prev: usize) -> f32;

    /// Blank token index, if the convention has one.
    fn blank(&self) -> Option<usize>;
}

/// Transition-scored convention without blank.
pub(crate) struct AsgScoring<'a> {
    /// Row is the next token, column the previous one.
    pub transitions: ArrayView2<'a, f32>,
}

impl FrameScoring for AsgScoring<'_> {
    const BLANK_AWARE: bool = false;

    #[inline]
    fn transition(&self, next: usize, prev: usize) -> f32 {
        self.transitions[[next, prev]]
    }

    fn blank(&self) -> Option<usize> {
        None
    }
}

/// Blank-aware convention without transition scores.
pub(crate) struct CtcScoring {
    pub blank: usize,
}

impl FrameScoring for CtcScoring {
    const BLANK_AWARE: bool = true;

    #[inline]
    fn transition(&self, _next: usize, _prev: usize) -> f32 {
        0.0
    }

    fn blank(&self) -> Option<usize> {
        Some(self.blank)
    }
}
