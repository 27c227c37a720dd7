//! End-to-end decoding over a small synthetic lexicon.

use lexdec::decoder::{
    CriterionType, DecodeResult, LexiconDecoder, LexiconDecoderOptions, SpecialIndices,
};
use lexdec::dictionary::TokenIndex;
use lexdec::error::{DecodeError, Error};
use lexdec::lexicon::{UNK_TOKEN, build_trie, create_word_dict, load_words};
use lexdec::lm::{LanguageModel, ZeroLm};
use lexdec::replabel::ReplabelCodec;
use lexdec::trie::SmearingMode;
use ndarray::{Array2, array, s};
use std::sync::Arc;

const LEXICON: &str = "\
cat c a t |
at a t |
";

// Token indices
const SEP: usize = 0;
const A: usize = 1;
const C: usize = 2;
const T: usize = 3;
const BLANK: usize = 4;

// Word indices, in lexicon order after <unk>
const UNK: usize = 0;
const AT: usize = 1;
const CAT: usize = 2;

/// Scores `cat` -2 and `at` -1, with -1 at the end of sentence.
struct FixedLm;

impl LanguageModel for FixedLm {
    type State = ();

    fn start(&self, _start_with_nothing: bool) -> Self::State {}

    fn score(&self, _state: &Self::State, index: usize) -> (Self::State, f32) {
        let score = match index {
            CAT => -2.0,
            AT => -1.0,
            _ => 0.0,
        };
        ((), score)
    }

    fn finish(&self, _state: &Self::State) -> (Self::State, f32) {
        ((), -1.0)
    }
}

/// Charges -0.5 for every scored index.
struct FlatLm;

impl LanguageModel for FlatLm {
    type State = ();

    fn start(&self, _start_with_nothing: bool) -> Self::State {}

    fn score(&self, _state: &Self::State, _index: usize) -> (Self::State, f32) {
        ((), -0.5)
    }

    fn finish(&self, _state: &Self::State) -> (Self::State, f32) {
        ((), 0.0)
    }
}

/// Zero scores, but every word history is a distinct state.
struct HistoryLm;

impl LanguageModel for HistoryLm {
    type State = Vec<usize>;

    fn start(&self, _start_with_nothing: bool) -> Self::State {
        Vec::new()
    }

    fn score(&self, state: &Self::State, index: usize) -> (Self::State, f32) {
        let mut next = state.clone();
        next.push(index);
        (next, 0.0)
    }

    fn finish(&self, state: &Self::State) -> (Self::State, f32) {
        (state.clone(), 0.0)
    }
}

fn decoder_with<L: LanguageModel>(
    token_list: &str,
    options: LexiconDecoderOptions,
    lm: L,
    transitions: Array2<f32>,
) -> LexiconDecoder<L> {
    let tokens = TokenIndex::from_reader(token_list.as_bytes()).unwrap();
    let lexicon = load_words(LEXICON.as_bytes(), None).unwrap();
    let words = create_word_dict(&lexicon);
    let max_reps = usize::from(tokens.contains("<1>"));
    let codec = ReplabelCodec::new(&tokens, max_reps).unwrap();

    assert_eq!(words.index(UNK_TOKEN).unwrap(), UNK);
    assert_eq!(words.index("cat").unwrap(), CAT);

    let mut trie = build_trie(&lexicon, &tokens, &words, &lm, &codec, SEP).unwrap();
    trie.smear(SmearingMode::Max);

    let blank = tokens.contains("#").then_some(BLANK);
    let indices = SpecialIndices {
        separator: SEP,
        blank,
        unk: UNK,
    };

    LexiconDecoder::new(options, Arc::new(trie), Arc::new(lm), indices, transitions).unwrap()
}

/// ASG decoder over `| a c t <1>`.
fn asg_decoder<L: LanguageModel>(options: LexiconDecoderOptions, lm: L) -> LexiconDecoder<L> {
    decoder_with("|\na\nc\nt\n<1>\n", options, lm, Array2::zeros((5, 5)))
}

/// Emissions that score `path[t]` 0 and every other token -10.
fn emissions(path: &[usize], n_tokens: usize) -> Array2<f32> {
    Array2::from_shape_fn((path.len(), n_tokens), |(t, k)| {
        if path[t] == k { 0.0 } else { -10.0 }
    })
}

fn best(results: &[DecodeResult]) -> &DecodeResult {
    results.first().expect("no surviving hypothesis")
}

#[test]
fn decodes_lexicon_word() {
    let decoder = asg_decoder(LexiconDecoderOptions::default(), ZeroLm);

    let results = decoder
        .decode(emissions(&[C, A, T, SEP, SEP], 5).view())
        .unwrap();

    let top = best(&results);
    assert_eq!(top.word_sequence(), vec![CAT]);
    assert_eq!(top.score, 0.0);
    // Start and end of sequence frames included
    assert_eq!(top.tokens.len(), 7);
    assert_eq!(top.token_sequence(&[SEP]), vec![C, A, T]);
}

#[test]
fn results_are_sorted_best_first() {
    let decoder = asg_decoder(LexiconDecoderOptions::default(), HistoryLm);

    let results = decoder
        .decode(emissions(&[C, A, T, SEP, SEP], 5).view())
        .unwrap();

    assert!(results.len() > 1);
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(best(&results).word_sequence(), vec![CAT]);
}

#[test]
fn language_model_scores_follow_smearing() {
    let options = LexiconDecoderOptions {
        lm_weight: 1.0,
        ..Default::default()
    };
    let decoder = asg_decoder(options, FixedLm);

    let results = decoder
        .decode(emissions(&[C, A, T, SEP, SEP], 5).view())
        .unwrap();

    // Smeared -2 on entering `c`, word closes at no extra cost, -1 at the end.
    let top = best(&results);
    assert_eq!(top.word_sequence(), vec![CAT]);
    assert!((top.score + 3.0).abs() < 1e-9);
    assert!((top.lm_score + 3.0).abs() < 1e-9);
    assert!(top.am_score.abs() < 1e-9);
}

#[test]
fn token_level_lm_scores_every_trie_step() {
    let options = LexiconDecoderOptions {
        lm_weight: 1.0,
        ..Default::default()
    };
    let decoder = asg_decoder(options, FlatLm).with_token_lm(true);

    let results = decoder
        .decode(emissions(&[C, A, T, SEP, SEP], 5).view())
        .unwrap();

    // c, a, t and the closing separator are each scored once.
    let top = best(&results);
    assert_eq!(top.word_sequence(), vec![CAT]);
    assert!((top.lm_score + 2.0).abs() < 1e-9);
    assert!((top.score + 2.0).abs() < 1e-9);
}

#[test]
fn transitions_are_indexed_next_then_prev() {
    let mut transitions = Array2::zeros((5, 5));
    transitions[[A, C]] = -1.0;
    transitions[[C, A]] = -100.0;
    let decoder = decoder_with(
        "|\na\nc\nt\n<1>\n",
        LexiconDecoderOptions::default(),
        ZeroLm,
        transitions,
    );

    let results = decoder
        .decode(emissions(&[C, A, T, SEP, SEP], 5).view())
        .unwrap();

    let top = best(&results);
    assert_eq!(top.word_sequence(), vec![CAT]);
    assert!((top.am_score + 1.0).abs() < 1e-9);
}

#[test]
fn word_and_silence_scores_apply() {
    let options = LexiconDecoderOptions {
        word_score: 1.5,
        sil_score: -1.0,
        ..Default::default()
    };
    let decoder = asg_decoder(options, ZeroLm);

    let results = decoder
        .decode(emissions(&[C, A, T, SEP, SEP], 5).view())
        .unwrap();

    // One word, two separator frames
    let top = best(&results);
    assert_eq!(top.word_sequence(), vec![CAT]);
    assert!((top.score + 0.5).abs() < 1e-9);
}

#[test]
fn decoding_is_deterministic() {
    let decoder = asg_decoder(LexiconDecoderOptions::default(), HistoryLm);
    let input = emissions(&[C, A, T, SEP, A, T, SEP], 5);

    let first = decoder.decode(input.view()).unwrap();
    let second = decoder.decode(input.view()).unwrap();

    assert_eq!(first, second);
}

#[test]
fn beam_of_one_is_greedy() {
    let options = LexiconDecoderOptions {
        beam_size: 1,
        ..Default::default()
    };
    let decoder = asg_decoder(options, HistoryLm);

    let results = decoder
        .decode(emissions(&[C, A, T, SEP, SEP], 5).view())
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].word_sequence(), vec![CAT]);
}

#[test]
fn token_fanout_limits_reachable_words() {
    const M: f32 = -10.0;
    // `t` outscores `a` on the second frame.
    let input = array![
        [M, M, 0.0, M, M],
        [M, -1.0, M, 0.0, M],
        [M, M, M, 0.0, M],
        [0.0, M, M, M, M],
        [0.0, M, M, M, M],
    ];

    let open = asg_decoder(LexiconDecoderOptions::default(), ZeroLm);
    let results = open.decode(input.view()).unwrap();
    assert_eq!(best(&results).word_sequence(), vec![CAT]);
    assert_eq!(best(&results).score, -1.0);

    let options = LexiconDecoderOptions {
        beam_size_token: 1,
        ..Default::default()
    };
    let capped = asg_decoder(options, ZeroLm);
    let results = capped.decode(input.view()).unwrap();
    assert!(results.iter().all(|r| r.word_sequence().is_empty()));
}

#[test]
fn log_add_merges_equivalent_paths() {
    const M: f32 = -100.0;
    // `c a t | |` and `c a t t |` both score zero and end at the root.
    let input = array![
        [M, M, 0.0, M, M],
        [M, 0.0, M, M, M],
        [M, M, M, 0.0, M],
        [0.0, M, M, 0.0, M],
        [0.0, M, M, M, M],
    ];

    let max = asg_decoder(LexiconDecoderOptions::default(), ZeroLm);
    let results = max.decode(input.view()).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].score, 0.0);

    let options = LexiconDecoderOptions {
        log_add: true,
        ..Default::default()
    };
    let summed = asg_decoder(options, ZeroLm);
    let results = summed.decode(input.view()).unwrap();
    assert_eq!(results.len(), 1);
    assert!((results[0].score - 2f64.ln()).abs() < 1e-9);
    assert_eq!(results[0].word_sequence(), vec![CAT]);
}

#[test]
fn tight_threshold_drops_distant_hypotheses() {
    let input = emissions(&[C, A, T, SEP, SEP], 5);

    let loose = asg_decoder(LexiconDecoderOptions::default(), HistoryLm)
        .decode(input.view())
        .unwrap();

    let options = LexiconDecoderOptions {
        beam_threshold: 5.0,
        ..Default::default()
    };
    let tight = asg_decoder(options, HistoryLm).decode(input.view()).unwrap();

    assert!(tight.len() < loose.len());
    assert_eq!(tight.len(), 1);
    assert_eq!(best(&tight).word_sequence(), vec![CAT]);
    assert_eq!(best(&tight).score, 0.0);
}

#[test]
fn nan_emissions_leave_no_result() {
    let mut input = emissions(&[C, A, T, SEP], 5);
    input.row_mut(1).fill(f32::NAN);

    let decoder = asg_decoder(LexiconDecoderOptions::default(), ZeroLm);
    let results = decoder.decode(input.view()).unwrap();

    assert_eq!(results, Vec::<DecodeResult>::new());
}

#[test]
fn disabled_unknown_words_never_surface() {
    let decoder = asg_decoder(LexiconDecoderOptions::default(), HistoryLm);

    let results = decoder
        .decode(emissions(&[C, A, T, SEP, SEP], 5).view())
        .unwrap();

    assert!(results.iter().all(|r| !r.word_sequence().contains(&UNK)));
}

#[test]
fn enabled_unknown_words_are_proposed() {
    let options = LexiconDecoderOptions {
        unk_score: 0.0,
        ..Default::default()
    };
    let decoder = asg_decoder(options, HistoryLm);

    let results = decoder
        .decode(emissions(&[C, A, T, SEP, SEP], 5).view())
        .unwrap();

    // `c` alone is an unknown word, after which `at` spells a known one.
    assert!(
        results
            .iter()
            .any(|r| r.word_sequence() == vec![UNK, AT] && r.score == 0.0)
    );
}

#[test]
fn ctc_collapses_repeats_and_blanks() {
    let options = LexiconDecoderOptions {
        criterion: CriterionType::Ctc,
        ..Default::default()
    };
    let decoder = decoder_with("|\na\nc\nt\n#\n", options, ZeroLm, Array2::zeros((0, 0)));

    let results = decoder
        .decode(emissions(&[A, A, BLANK, T, SEP], 5).view())
        .unwrap();

    let top = best(&results);
    assert_eq!(top.word_sequence(), vec![AT]);
    assert_eq!(top.token_sequence(&[SEP, BLANK]), vec![A, T]);
    assert_eq!(top.score, 0.0);
}

#[test]
fn ctc_requires_blank() {
    let options = LexiconDecoderOptions {
        criterion: CriterionType::Ctc,
        ..Default::default()
    };
    let tokens = TokenIndex::from_reader("|\na\nc\nt\n".as_bytes()).unwrap();
    let lexicon = load_words(LEXICON.as_bytes(), None).unwrap();
    let words = create_word_dict(&lexicon);
    let codec = ReplabelCodec::new(&tokens, 0).unwrap();
    let trie = build_trie(&lexicon, &tokens, &words, &ZeroLm, &codec, SEP).unwrap();

    let indices = SpecialIndices {
        separator: SEP,
        blank: None,
        unk: UNK,
    };
    let result = LexiconDecoder::new(
        options,
        Arc::new(trie),
        Arc::new(ZeroLm),
        indices,
        Array2::zeros((0, 0)),
    );

    assert!(result.is_err());
}

#[test]
fn empty_input_yields_silence() {
    let decoder = asg_decoder(LexiconDecoderOptions::default(), ZeroLm);

    let results = decoder.decode(Array2::zeros((0, 5)).view()).unwrap();

    let top = best(&results);
    assert_eq!(top.tokens, vec![SEP, SEP]);
    assert!(top.word_sequence().is_empty());
}

#[test]
fn rejects_mismatched_buffers() {
    let decoder = asg_decoder(LexiconDecoderOptions::default(), ZeroLm);

    let err = decoder.decode_slice(&[0.0; 7], 2, 5).unwrap_err();
    assert!(matches!(
        err,
        Error::Decode(DecodeError::EmissionLength {
            frames: 2,
            tokens: 5,
            got: 7
        })
    ));

    let err = decoder.decode_slice(&[0.0; 4], usize::MAX, 2).unwrap_err();
    assert!(matches!(
        err,
        Error::Decode(DecodeError::EmissionLength { got: 4, .. })
    ));

    let err = decoder.decode(Array2::zeros((3, 4)).view()).unwrap_err();
    assert!(matches!(
        err,
        Error::Decode(DecodeError::TokenCountMismatch {
            expected: 5,
            got: 4
        })
    ));
}

#[test]
fn decode_slice_matches_decode() {
    let decoder = asg_decoder(LexiconDecoderOptions::default(), HistoryLm);
    let input = emissions(&[C, A, T, SEP, SEP], 5);
    let flat: Vec<f32> = input.iter().copied().collect();

    let from_slice = decoder.decode_slice(&flat, 5, 5).unwrap();
    let from_view = decoder.decode(input.view()).unwrap();

    assert_eq!(from_slice, from_view);
}

#[test]
fn streaming_matches_single_call() {
    let decoder = asg_decoder(LexiconDecoderOptions::default(), HistoryLm);
    let input = emissions(&[C, A, T, SEP, A, T, SEP, SEP], 5);

    let mut session = decoder.begin();
    for t in 0..input.nrows() {
        session.step(input.slice(s![t..t + 1, ..])).unwrap();
    }
    session.finish().unwrap();

    assert_eq!(session.final_hypotheses(), decoder.decode(input.view()).unwrap());
}

#[test]
fn pruning_keeps_recent_frames() {
    let decoder = asg_decoder(LexiconDecoderOptions::default(), ZeroLm);
    let input = emissions(&[C, A, T, SEP, A, T, SEP, SEP], 5);

    let mut session = decoder.begin();
    session.step(input.view()).unwrap();
    assert_eq!(session.decoded_frames(), 8);

    // The best path two frames back is inside `at`; the cut moves back to
    // just after `cat` closed.
    let committed = session.best_hypothesis(2).unwrap();
    assert_eq!(committed.word_sequence(), vec![CAT]);
    assert_eq!(committed.tokens, vec![SEP, C, A, T, SEP, A]);

    session.prune(2);
    assert_eq!(session.pruned_frames(), 5);

    session.finish().unwrap();
    let results = session.final_hypotheses();

    let top = best(&results);
    assert_eq!(top.word_sequence(), vec![AT]);
    assert_eq!(top.tokens, vec![A, T, SEP, SEP, SEP]);
    assert_eq!(top.score, 0.0);
}

#[test]
fn session_lifecycle() {
    let decoder = asg_decoder(LexiconDecoderOptions::default(), ZeroLm);

    let mut session = decoder.begin();
    assert!(session.final_hypotheses().is_empty());
    assert_eq!(session.num_hypotheses(), 1);
    assert!(session.best_hypothesis(0).is_none());

    session.finish().unwrap();
    assert!(session.is_finished());

    let err = session.step(Array2::zeros((1, 5)).view()).unwrap_err();
    assert!(matches!(err, Error::Decode(DecodeError::SessionFinished)));
}
