//! Word lexicon loading and trie planting.

use crate::dictionary::TokenIndex;
use crate::error::{DictionaryError, Result};
use crate::lm::LanguageModel;
use crate::replabel::ReplabelCodec;
use crate::trie::LexiconTrie;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Unknown word entry, always present in a loaded lexicon.
pub const UNK_TOKEN: &str = "<unk>";

/// Word to list of spellings, each an ordered token sequence.
pub type Lexicon = BTreeMap<String, Vec<Vec<String>>>;

/// Load a lexicon from a reader.
///
/// Each line is `word tok tok ...`; a word repeated on several lines gets
/// several spellings. At most `max_words` distinct words are read.
pub fn load_words<R: BufRead>(reader: R, max_words: Option<usize>) -> Result<Lexicon> {
    let mut lexicon = Lexicon::new();

    for (line_no, line) in reader.lines().enumerate() {
        if max_words.is_some_and(|max| lexicon.len() >= max) {
            break;
        }

        let line = line?;
        let mut fields = line.split_whitespace();
        let Some(word) = fields.next() else {
            continue;
        };

        let spelling: Vec<String> = fields.map(str::to_string).collect();
        if spelling.is_empty() {
            return Err(DictionaryError::InvalidLine {
                line_no: line_no + 1,
                line,
            }
            .into());
        }

        lexicon.entry(word.to_string()).or_default().push(spelling);
    }

    lexicon.insert(UNK_TOKEN.to_string(), Vec::new());

    Ok(lexicon)
}

/// Load a lexicon file.
pub fn load_words_file(path: impl AsRef<Path>, max_words: Option<usize>) -> Result<Lexicon> {
    let file = File::open(path)?;
    load_words(BufReader::new(file), max_words)
}

/// Build the word index of a lexicon, with [`UNK_TOKEN`] as default index.
pub fn create_word_dict(lexicon: &Lexicon) -> TokenIndex {
    let mut words = TokenIndex::new();
    for word in lexicon.keys() {
        words.add_entry(word);
    }
    let unk = words.add_entry(UNK_TOKEN);
    words.set_default_index(unk);
    words
}

/// Split a word into single-character tokens.
pub fn split_word(word: &str) -> Vec<String> {
    word.chars().map(String::from).collect()
}

/// Map a spelling to token indices and pack repeats.
pub fn spelling_to_indices<S: AsRef<str>>(
    spelling: &[S],
    tokens: &TokenIndex,
    codec: &ReplabelCodec,
) -> Result<Vec<usize>> {
    let indices = tokens.map_entries_to_indices(spelling)?;
    Ok(codec.pack(&indices))
}

/// Plant every spelling of every lexicon word into a fresh trie.
///
/// Each word is seeded with its language model score from the start state.
pub fn build_trie<L: LanguageModel>(
    lexicon: &Lexicon,
    tokens: &TokenIndex,
    words: &TokenIndex,
    lm: &L,
    codec: &ReplabelCodec,
    separator: usize,
) -> Result<LexiconTrie> {
    let mut trie = LexiconTrie::new(tokens.index_size(), separator);
    let start = lm.start(false);

    for (word, spellings) in lexicon {
        let word = words.index(word)?;
        let (_, score) = lm.score(&start, word);

        for spelling in spellings {
            let path = spelling_to_indices(spelling, tokens, codec)?;
            trie.insert(&path, word, score)?;
        }
    }

    tracing::debug!(words = lexicon.len(), nodes = trie.len(), "trie planted");

    Ok(trie)
}
