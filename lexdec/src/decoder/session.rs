//! Frame-synchronous beam search over the lexicon trie.

use crate::decoder::candidates::Candidates;
use crate::decoder::lexicon_decoder::LexiconDecoder;
use crate::decoder::hypothesis::{DecodeResult, HypId, Hypothesis};
use crate::decoder::options::CriterionType;
use crate::decoder::scoring::{AsgScoring, CtcScoring, FrameScoring};
use crate::error::{ConfigError, DecodeError, Result};
use crate::lm::LanguageModel;
use ndarray::{ArrayView1, ArrayView2};

/// Extra frames searched past `look_back` for a word boundary.
const LOOK_BACK_LIMIT: usize = 100;

/// Arena size below which unreachable hypotheses are left in place.
const MIN_COLLECT_SIZE: usize = 4096;

/// State of one (possibly incremental) decode.
///
/// Hypotheses live in an arena and point at their predecessor by handle.
/// `frames[i]` holds the beam after the i-th retained frame; frame 0 is the
/// start state, or the oldest frame kept by [`DecodeSession::prune`].
pub struct DecodeSession<'d, L: LanguageModel> {
    decoder: &'d LexiconDecoder<L>,
    arena: Vec<Hypothesis<L::State>>,
    frames: Vec<Vec<HypId>>,
    decoded_frames: usize,
    pruned_frames: usize,
    finished: bool,
    /// Arena size that triggers the next collection
    collect_at: usize,
}

impl<'d, L: LanguageModel> DecodeSession<'d, L> {
    pub(crate) fn new(decoder: &'d LexiconDecoder<L>) -> Self {
        let start = Hypothesis {
            score: 0.0,
            am_score: 0.0,
            lm_score: 0.0,
            lm_state: decoder.lm.start(false),
            node: decoder.trie.root(),
            parent: None,
            token: decoder.indices.separator,
            word: None,
            prev_blank: false,
        };

        Self {
            decoder,
            arena: vec![start],
            frames: vec![vec![HypId::new(0)]],
            decoded_frames: 0,
            pruned_frames: 0,
            finished: false,
            collect_at: MIN_COLLECT_SIZE,
        }
    }

    /// Frames consumed so far, end of sequence included.
    pub fn decoded_frames(&self) -> usize {
        self.decoded_frames
    }

    /// Frames dropped by [`DecodeSession::prune`].
    pub fn pruned_frames(&self) -> usize {
        self.pruned_frames
    }

    /// Size of the current beam.
    pub fn num_hypotheses(&self) -> usize {
        self.current_beam().len()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn current_beam(&self) -> &[HypId] {
        self.frames.last().map(Vec::as_slice).unwrap_or_default()
    }

    fn hyp(&self, id: HypId) -> &Hypothesis<L::State> {
        &self.arena[id.index()]
    }

    /// Consume a chunk of `frames x tokens` emissions.
    pub fn step(&mut self, emissions: ArrayView2<f32>) -> Result<()> {
        if self.finished {
            return Err(DecodeError::SessionFinished.into());
        }

        let decoder = self.decoder;
        let expected = decoder.n_tokens();
        if emissions.ncols() != expected {
            return Err(DecodeError::TokenCountMismatch {
                expected,
                got: emissions.ncols(),
            }
            .into());
        }

        match decoder.options.criterion {
            CriterionType::Asg => {
                let scoring = AsgScoring {
                    transitions: decoder.transitions.view(),
                };
                self.step_with(&scoring, emissions);
            }
            CriterionType::Ctc => {
                let blank = decoder.indices.blank.ok_or(ConfigError::MissingBlank)?;
                self.step_with(&CtcScoring { blank }, emissions);
            }
        }

        Ok(())
    }

    fn step_with<C: FrameScoring>(&mut self, scoring: &C, emissions: ArrayView2<f32>) {
        let options = self.decoder.options;
        let n_tokens = emissions.ncols();
        let fanout = options.beam_size_token.min(n_tokens);
        let mut order: Vec<usize> = Vec::with_capacity(n_tokens);

        for row in emissions.rows() {
            rank_tokens(&mut order, row, fanout);

            let mut candidates = Candidates::new(options.beam_threshold);
            self.expand(scoring, row, &order[..fanout], &mut candidates);

            let beam = candidates.store(options.beam_size, options.log_add);
            let best = beam.first().map(|h| h.score);
            self.push_frame(beam);
            self.decoded_frames += 1;

            if self.arena.len() >= self.collect_at {
                self.collect_garbage();
            }

            tracing::trace!(
                frame = self.decoded_frames,
                beam = self.num_hypotheses(),
                best,
                "frame decoded"
            );
        }
    }

    #[cfg(not(feature = "rayon"))]
    fn expand<C: FrameScoring>(
        &self,
        scoring: &C,
        row: ArrayView1<f32>,
        tokens: &[usize],
        candidates: &mut Candidates<L::State>,
    ) {
        for &id in self.current_beam() {
            self.propose(scoring, row, tokens, id, &mut |hyp| candidates.add(hyp));
        }
    }

    #[cfg(feature = "rayon")]
    fn expand<C: FrameScoring>(
        &self,
        scoring: &C,
        row: ArrayView1<f32>,
        tokens: &[usize],
        candidates: &mut Candidates<L::State>,
    ) {
        use rayon::prelude::*;

        // Proposals are gathered per hypothesis and added in beam order, so
        // the merged beam matches the sequential path exactly.
        let proposals: Vec<Vec<_>> = self
            .current_beam()
            .par_iter()
            .map(|&id| {
                let mut out = Vec::new();
                self.propose(scoring, row, tokens, id, &mut |hyp| out.push(hyp));
                out
            })
            .collect();

        for hyp in proposals.into_iter().flatten() {
            candidates.add(hyp);
        }
    }

    /// Propose every successor of hypothesis `id` for one frame.
    fn propose<C: FrameScoring>(
        &self,
        scoring: &C,
        row: ArrayView1<f32>,
        tokens: &[usize],
        id: HypId,
        emit: &mut impl FnMut(Hypothesis<L::State>),
    ) {
        let decoder = self.decoder;
        let options = &decoder.options;
        let trie = &*decoder.trie;
        let lm = &*decoder.lm;
        let separator = decoder.indices.separator;
        let root = trie.root();

        let prev = self.hyp(id);
        let prev_node = trie.node(prev.node);
        let at_root = prev.node == root;
        let prev_max = if at_root {
            0.0
        } else {
            f64::from(prev_node.max_score().unwrap_or(0.0))
        };

        // No transition into the very first frame.
        let with_transition = self.decoded_frames > 0;
        let acoustic = |token: usize| {
            let mut am = f64::from(row[token]);
            if with_transition {
                am += f64::from(scoring.transition(token, prev.token));
            }
            am
        };

        // (1) Enter a child node, closing words where the child carries labels.
        for &token in tokens {
            let Some(child_id) = prev_node.child(token) else {
                continue;
            };
            let child = trie.node(child_id);

            let am = acoustic(token);
            let mut score = prev.score + am;
            if token == separator {
                score += options.sil_score;
            }

            let token_lm = decoder
                .token_lm
                .then(|| lm.score(&prev.lm_state, token))
                .map(|(state, s)| (state, f64::from(s)));

            if (!C::BLANK_AWARE || prev.prev_blank || token != prev.token) && child.has_children() {
                let (lm_state, lm_score) = match &token_lm {
                    Some((state, s)) => (state.clone(), *s),
                    None => (
                        prev.lm_state.clone(),
                        f64::from(child.max_score().unwrap_or(0.0)) - prev_max,
                    ),
                };

                emit(Hypothesis {
                    score: score + options.lm_weight * lm_score,
                    am_score: prev.am_score + am,
                    lm_score: prev.lm_score + lm_score,
                    lm_state,
                    node: child_id,
                    parent: Some(id),
                    token,
                    word: None,
                    prev_blank: false,
                });
            }

            for label in child.labels() {
                // A single-token word held over several frames is one word.
                if at_root && prev.token == token {
                    continue;
                }

                let (lm_state, lm_score) = match &token_lm {
                    Some((state, s)) => (state.clone(), *s),
                    None => {
                        let (state, s) = lm.score(&prev.lm_state, label.word);
                        (state, f64::from(s) - prev_max)
                    }
                };

                emit(Hypothesis {
                    score: score + options.lm_weight * lm_score + options.word_score,
                    am_score: prev.am_score + am,
                    lm_score: prev.lm_score + lm_score,
                    lm_state,
                    node: root,
                    parent: Some(id),
                    token,
                    word: Some(label.word),
                    prev_blank: false,
                });
            }

            if child.labels().is_empty() && options.unk_enabled() {
                let unk = decoder.indices.unk;
                let (lm_state, lm_score) = match token_lm {
                    Some(scored) => scored,
                    None => {
                        let (state, s) = lm.score(&prev.lm_state, unk);
                        (state, f64::from(s) - prev_max)
                    }
                };

                emit(Hypothesis {
                    score: score + options.lm_weight * lm_score + options.unk_score,
                    am_score: prev.am_score + am,
                    lm_score: prev.lm_score + lm_score,
                    lm_state,
                    node: root,
                    parent: Some(id),
                    token,
                    word: Some(unk),
                    prev_blank: false,
                });
            }
        }

        // (2) Stay on the same node: repeat the last token, or silence at the root.
        if !C::BLANK_AWARE || !prev.prev_blank || at_root {
            let token = if at_root { separator } else { prev.token };
            let am = acoustic(token);
            let mut score = prev.score + am;
            if token == separator {
                score += options.sil_score;
            }

            emit(Hypothesis {
                score,
                am_score: prev.am_score + am,
                lm_score: prev.lm_score,
                lm_state: prev.lm_state.clone(),
                node: prev.node,
                parent: Some(id),
                token,
                word: None,
                prev_blank: false,
            });
        }

        // (3) Emit blank.
        if let Some(blank) = scoring.blank() {
            let am = f64::from(row[blank]);

            emit(Hypothesis {
                score: prev.score + am,
                am_score: prev.am_score + am,
                lm_score: prev.lm_score,
                lm_state: prev.lm_state.clone(),
                node: prev.node,
                parent: Some(id),
                token: blank,
                word: None,
                prev_blank: true,
            });
        }
    }

    fn push_frame(&mut self, beam: Vec<Hypothesis<L::State>>) {
        let start = self.arena.len();
        self.frames
            .push((start..start + beam.len()).map(HypId::new).collect());
        self.arena.extend(beam);
    }

    /// Apply the end-of-sequence language model score.
    ///
    /// Hypotheses resting at the trie root are preferred: if any exists, only
    /// those are finished. The final beam is sorted best first.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Err(DecodeError::SessionFinished.into());
        }

        let decoder = self.decoder;
        let options = &decoder.options;
        let root = decoder.trie.root();

        let beam = self.current_beam();
        let nice_ending = beam.iter().any(|&id| self.hyp(id).node == root);

        let mut candidates = Candidates::new(options.beam_threshold);
        for &id in beam {
            let prev = self.hyp(id);
            if nice_ending && prev.node != root {
                continue;
            }

            let (lm_state, lm_score) = decoder.lm.finish(&prev.lm_state);
            let lm_score = f64::from(lm_score);

            candidates.add(Hypothesis {
                score: prev.score + options.lm_weight * lm_score,
                am_score: prev.am_score,
                lm_score: prev.lm_score + lm_score,
                lm_state,
                node: prev.node,
                parent: Some(id),
                token: decoder.indices.separator,
                word: None,
                prev_blank: false,
            });
        }

        let beam = candidates.store(options.beam_size, options.log_add);
        self.push_frame(beam);
        self.decoded_frames += 1;
        self.finished = true;

        tracing::debug!(
            frames = self.decoded_frames,
            hypotheses = self.num_hypotheses(),
            "decode finished"
        );

        Ok(())
    }

    /// All hypotheses of the last frame, best first once finished.
    pub fn final_hypotheses(&self) -> Vec<DecodeResult> {
        if self.frames.len() < 2 {
            return Vec::new();
        }

        self.current_beam()
            .iter()
            .map(|&id| self.backtrack(id))
            .collect()
    }

    /// Best path ending `look_back` frames before the current one.
    ///
    /// The end point is moved further back, up to a limit, until it follows a
    /// completed word.
    pub fn best_hypothesis(&self, look_back: usize) -> Option<DecodeResult> {
        if self.frames.len() <= look_back + 1 {
            return None;
        }

        self.find_best_ancestor(look_back)
            .map(|(id, _)| self.backtrack(id))
    }

    /// Drop frames older than `look_back` to bound memory in streaming use.
    ///
    /// Back-pointers are cut at the new first frame and current scores are
    /// shifted so the best is zero. Call [`DecodeSession::best_hypothesis`]
    /// first to keep the words about to be dropped.
    pub fn prune(&mut self, look_back: usize) {
        if self.frames.len() <= look_back + 1 {
            return;
        }

        let Some((_, look_back)) = self.find_best_ancestor(look_back) else {
            return;
        };

        let current = self.frames.len() - 1;
        if current <= look_back {
            return;
        }

        let start = current - look_back;
        self.compact(start);
        self.normalize();
        self.pruned_frames += start;

        tracing::debug!(
            dropped = start,
            kept = self.frames.len(),
            arena = self.arena.len(),
            "session pruned"
        );
    }

    /// Ancestor of the current best hypothesis and its distance back.
    fn find_best_ancestor(&self, look_back: usize) -> Option<(HypId, usize)> {
        let mut best = *self
            .current_beam()
            .iter()
            .reduce(|a, b| if self.hyp(*b).score > self.hyp(*a).score { b } else { a })?;

        let mut n = 0;
        while n < look_back {
            best = self.hyp(best).parent?;
            n += 1;
        }

        let max_look_back = look_back + LOOK_BACK_LIMIT;
        loop {
            let hyp = self.hyp(best);
            let complete = hyp.parent.is_none_or(|p| self.hyp(p).word.is_some());
            if complete || n == max_look_back {
                break;
            }

            best = hyp.parent?;
            n += 1;
        }

        Some((best, n))
    }

    /// Drop hypotheses no current hypothesis descends from.
    ///
    /// Frame count and back-pointers are preserved; only dead branches go.
    fn collect_garbage(&mut self) {
        let before = self.arena.len();
        let mut live = vec![false; before];

        for &id in self.current_beam() {
            let mut cursor = Some(id);
            while let Some(current) = cursor {
                if live[current.index()] {
                    break;
                }
                live[current.index()] = true;
                cursor = self.hyp(current).parent;
            }
        }

        self.retain(0, &live);
        self.collect_at = (2 * self.arena.len()).max(MIN_COLLECT_SIZE);

        tracing::trace!(before, after = self.arena.len(), "arena collected");
    }

    /// Keep frames from `start` on, renumbering the arena.
    fn compact(&mut self, start: usize) {
        let live = vec![true; self.arena.len()];
        self.retain(start, &live);
    }

    /// Keep `live` hypotheses of frames `start..`, renumbering the arena.
    ///
    /// Back-pointers are cut at the new first frame. A live hypothesis must
    /// not point at a dead one.
    fn retain(&mut self, start: usize, live: &[bool]) {
        let mut old: Vec<Option<Hypothesis<L::State>>> =
            std::mem::take(&mut self.arena).into_iter().map(Some).collect();
        let mut remap: Vec<Option<HypId>> = vec![None; old.len()];
        let kept = self.frames.split_off(start);
        self.frames.clear();

        for (i, frame) in kept.into_iter().enumerate() {
            let mut ids = Vec::with_capacity(frame.len());

            for old_id in frame {
                if !live[old_id.index()] {
                    continue;
                }
                let Some(mut hyp) = old[old_id.index()].take() else {
                    continue;
                };

                hyp.parent = match i {
                    0 => None,
                    _ => hyp.parent.and_then(|p| remap[p.index()]),
                };

                let new_id = HypId::new(self.arena.len());
                remap[old_id.index()] = Some(new_id);
                self.arena.push(hyp);
                ids.push(new_id);
            }

            self.frames.push(ids);
        }
    }

    /// Shift current scores so the best is zero.
    fn normalize(&mut self) {
        let Some(ids) = self.frames.last() else {
            return;
        };

        let best = ids
            .iter()
            .map(|id| self.arena[id.index()].score)
            .fold(f64::NEG_INFINITY, f64::max);
        if best == f64::NEG_INFINITY {
            return;
        }

        for id in ids {
            self.arena[id.index()].score -= best;
        }
    }

    /// Rebuild the path ending at `id`.
    fn backtrack(&self, id: HypId) -> DecodeResult {
        let end = self.hyp(id);
        let mut tokens = Vec::with_capacity(self.frames.len());
        let mut words = Vec::with_capacity(self.frames.len());

        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let hyp = self.hyp(current);
            tokens.push(hyp.token);
            words.push(hyp.word);
            cursor = hyp.parent;
        }

        tokens.reverse();
        words.reverse();

        DecodeResult {
            score: end.score,
            am_score: end.am_score,
            lm_score: end.lm_score,
            tokens,
            words,
        }
    }
}

/// Order tokens by emission score, keeping the best `fanout` in front.
fn rank_tokens(order: &mut Vec<usize>, row: ArrayView1<f32>, fanout: usize) {
    order.clear();
    order.extend(0..row.len());

    if fanout >= row.len() {
        return;
    }

    let by_score = |a: &usize, b: &usize| row[*b].total_cmp(&row[*a]).then(a.cmp(b));
    order.select_nth_unstable_by(fanout, by_score);
    order[..fanout].sort_unstable_by(by_score);
}
