//! The vocabulary: word counts, pruning, and Huffman codes.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::ops::Index;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WordVecError};
use crate::huffman;
use crate::reader::{Token, WordReader};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabWord {
    pub word: String,
    /// Number of occurrences in the training data.
    pub count: u64,
    /// Huffman code, root to leaf. Empty until the vocabulary is encoded.
    pub code: Vec<u8>,
    /// Output-layer rows along the code, plus the root's row at the end.
    /// `path.len() == code.len() + 1` once encoded, unless the vocabulary has
    /// a single word.
    pub path: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Collecting,
    Pruned,
    Encoded,
}

impl Stage {
    fn name(self) -> &'static str {
        match self {
            Stage::Collecting => "collecting",
            Stage::Pruned => "pruned",
            Stage::Encoded => "encoded",
        }
    }
}

#[derive(Debug)]
pub struct Vocabulary {
    words: Vec<VocabWord>,
    /// Position of each word in `words`.
    index: HashMap<String, usize>,
    /// Total words read, or after pruning, total occurrences of surviving words.
    train_words: u64,
    stage: Stage,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Vocabulary::new()
    }
}

impl Index<usize> for Vocabulary {
    type Output = VocabWord;

    fn index(&self, i: usize) -> &VocabWord {
        &self.words[i]
    }
}

impl Vocabulary {
    pub fn new() -> Self {
        Vocabulary {
            words: Vec::with_capacity(1000),
            index: HashMap::new(),
            train_words: 0,
            stage: Stage::Collecting,
        }
    }

    /// Counts one occurrence of `word`, adding it if it's new.
    pub fn add_word(&mut self, word: &str) {
        self.add_count(word, 1);
    }

    fn add_count(&mut self, word: &str, count: u64) {
        self.train_words += count;
        if let Some(&a) = self.index.get(word) {
            self.words[a].count += count;
        } else {
            self.index.insert(word.to_string(), self.words.len());
            self.words.push(VocabWord {
                word: word.to_string(),
                count,
                code: Vec::new(),
                path: Vec::new(),
            });
        }
    }

    /// Counts every word in every file.
    ///
    /// Files that can't be read are logged and skipped; their paths are returned.
    /// Words counted from a file before a read error stay counted.
    pub fn build_from_files(&mut self, files: &[PathBuf]) -> Vec<PathBuf> {
        let start = Instant::now();
        let mut skipped = vec![];
        for file in files {
            info!("loading {}", file.display());
            if let Err(err) = self.learn_from_file(file) {
                warn!("skipping {}: {err}", file.display());
                skipped.push(file.clone());
            }
        }
        info!(
            "read {} files in {:.2}s; vocabulary size: {}; words in training data: {}",
            files.len() - skipped.len(),
            start.elapsed().as_secs_f64(),
            self.len(),
            self.train_words,
        );
        skipped
    }

    fn learn_from_file(&mut self, path: &Path) -> Result<()> {
        let reader = WordReader::open(path).map_err(|err| WordVecError::io(err, path))?;
        self.learn_from_reader(reader).map_err(|err| WordVecError::io(err, path))
    }

    fn learn_from_reader<R: Read>(&mut self, reader: WordReader<R>) -> io::Result<()> {
        for token in reader {
            if let Token::Word(word) = token? {
                self.add_word(&word);
            }
        }
        Ok(())
    }

    /// Sorts the vocabulary by descending count and discards words seen fewer
    /// than `min_count` times.
    pub fn prune(&mut self, min_count: u64) -> Result<()> {
        self.expect_stage(Stage::Collecting, "prune vocabulary")?;
        let before = self.words.len();
        self.words.sort_unstable_by_key(|vw| Reverse(vw.count));
        let keep = self.words.partition_point(|vw| vw.count >= min_count);
        self.words.truncate(keep);

        // The index is stale after sorting.
        self.index.clear();
        self.train_words = 0;
        for (i, vw) in self.words.iter().enumerate() {
            self.index.insert(vw.word.clone(), i);
            self.train_words += vw.count;
        }
        self.stage = Stage::Pruned;
        info!(
            "pruned vocabulary from {before} to {} words (min count {min_count})",
            self.words.len()
        );
        Ok(())
    }

    /// Assigns each word its Huffman code and output-layer path.
    pub fn encode(&mut self) -> Result<()> {
        self.expect_stage(Stage::Pruned, "encode vocabulary")?;
        let counts: Vec<u64> = self.words.iter().map(|vw| vw.count).collect();
        for (vw, codeword) in self.words.iter_mut().zip(huffman::encode(&counts)) {
            vw.code = codeword.code;
            vw.path = codeword.path;
        }
        self.stage = Stage::Encoded;
        Ok(())
    }

    fn expect_stage(&self, expected: Stage, action: &'static str) -> Result<()> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(WordVecError::InvalidState {
                action,
                expected: expected.name(),
                found: self.stage.name(),
            })
        }
    }

    pub fn is_encoded(&self) -> bool {
        self.stage == Stage::Encoded
    }

    /// Returns the position of a word in the vocabulary, or `None` if it's unknown.
    pub fn search(&self, word: &str) -> Option<usize> {
        self.index.get(word).copied()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[VocabWord] {
        &self.words
    }

    /// Number of words in the training data that training will see.
    pub fn train_words(&self) -> u64 {
        self.train_words
    }

    /// Writes one `word count` line per entry.
    pub fn save(&self, path: &Path) -> Result<()> {
        let io_err = |err: io::Error| WordVecError::io(err, path);
        let mut fo = BufWriter::new(File::create(path).map_err(io_err)?);
        for vw in &self.words {
            writeln!(fo, "{} {}", vw.word, vw.count).map_err(io_err)?;
        }
        fo.flush().map_err(io_err)
    }

    /// Reads a file written by `save`. The result still needs pruning and encoding.
    pub fn load(path: &Path) -> Result<Self> {
        let fin = BufReader::new(File::open(path).map_err(|err| WordVecError::io(err, path))?);
        let mut vocab = Vocabulary::new();
        for (line_num, line) in fin.lines().enumerate() {
            let line = line.map_err(|err| WordVecError::io(err, path))?;
            if line.trim().is_empty() {
                continue;
            }
            let fields = line.split_whitespace().collect::<Vec<&str>>();
            let [word, count] = fields.as_slice() else {
                return Err(WordVecError::format(
                    path,
                    line_num + 1,
                    "expected a word and a count",
                ));
            };
            let count = count.parse::<u64>().map_err(|_| {
                WordVecError::format(path, line_num + 1, format!("bad count {count:?}"))
            })?;
            vocab.add_count(word, count);
        }
        info!(
            "loaded {} words ({} occurrences) from {}",
            vocab.len(),
            vocab.train_words,
            path.display()
        );
        Ok(vocab)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn vocab_of(counts: &[(&str, u64)]) -> Vocabulary {
        let mut vocab = Vocabulary::new();
        for &(word, n) in counts {
            for _ in 0..n {
                vocab.add_word(word);
            }
        }
        vocab
    }

    #[test]
    fn add_word_counts_distinct_words() {
        let mut vocab = Vocabulary::new();
        for word in "to be or not to be".split(' ') {
            vocab.add_word(word);
        }
        assert_eq!(vocab.len(), 4);
        assert_eq!(vocab.train_words(), 6);
        assert_eq!(vocab.search("to"), Some(0));
        assert_eq!(vocab.search("be"), Some(1));
        assert_eq!(vocab[vocab.search("be").unwrap()].count, 2);
        assert_eq!(vocab[3].word, "not");
        assert_eq!(vocab.search("question"), None);
    }

    #[test]
    fn repeated_word_frequency() {
        let mut vocab = Vocabulary::new();
        for _ in 0..100_000 {
            vocab.add_word("abc");
        }
        let i = vocab.search("abc").unwrap();
        assert_eq!(vocab[i].count, 100_000);
    }

    #[test]
    fn prune_sorts_and_discards() {
        let mut vocab = vocab_of(&[("c", 1), ("b", 3), ("d", 2), ("a", 5)]);
        vocab.prune(2).unwrap();
        let words: Vec<&str> = vocab.words().iter().map(|vw| vw.word.as_str()).collect();
        assert_eq!(words, ["a", "b", "d"]);
        assert!(vocab.words().iter().all(|vw| vw.count >= 2));
        assert_eq!(vocab.train_words(), 10);
        assert_eq!(vocab.search("c"), None);
        for (i, vw) in vocab.words().iter().enumerate() {
            assert_eq!(vocab.search(&vw.word), Some(i));
        }
    }

    #[test]
    fn prune_with_zero_min_count_keeps_everything() {
        let mut vocab = vocab_of(&[("x", 1), ("y", 1)]);
        vocab.prune(0).unwrap();
        assert_eq!(vocab.len(), 2);
    }

    #[test]
    fn steps_must_run_in_order() {
        let mut vocab = vocab_of(&[("x", 2), ("y", 1)]);
        assert!(matches!(
            vocab.encode(),
            Err(WordVecError::InvalidState { .. })
        ));
        vocab.prune(1).unwrap();
        assert!(vocab.prune(1).is_err());
        vocab.encode().unwrap();
        assert!(vocab.encode().is_err());
        assert!(vocab.is_encoded());
    }

    #[test]
    fn prune_then_encode_small_vocabulary() {
        let mut vocab = vocab_of(&[("a", 5), ("b", 3), ("c", 1)]);
        vocab.prune(2).unwrap();
        vocab.encode().unwrap();
        assert_eq!(vocab.len(), 2);
        let a = &vocab[vocab.search("a").unwrap()];
        let b = &vocab[vocab.search("b").unwrap()];
        assert_eq!(a.code.len(), 1);
        assert_eq!(b.code.len(), 1);
        assert_ne!(a.code, b.code);
        assert_eq!(a.path, vec![0, 0]);
        assert_eq!(b.path, vec![0, 0]);
    }

    #[test]
    fn encoded_paths_are_one_longer_than_codes() {
        let mut vocab = Vocabulary::new();
        for (i, word) in "a b c d e f g h i j k l".split(' ').enumerate() {
            for _ in 0..(i * 3 + 1) {
                vocab.add_word(word);
            }
        }
        vocab.prune(1).unwrap();
        vocab.encode().unwrap();
        for vw in vocab.words() {
            assert_eq!(vw.path.len(), vw.code.len() + 1);
        }
    }

    #[test]
    fn build_from_files_skips_missing_files() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.txt");
        fs::write(&good, "one two\ntwo three three\n").unwrap();
        let missing = dir.path().join("missing.txt");

        let mut vocab = Vocabulary::new();
        let skipped = vocab.build_from_files(&[missing.clone(), good]);
        assert_eq!(skipped, vec![missing]);
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.train_words(), 5);
        assert_eq!(vocab[vocab.search("three").unwrap()].count, 2);
    }

    struct BrokenPipe;

    impl Read for BrokenPipe {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "connection lost"))
        }
    }

    #[test]
    fn words_before_a_read_error_stay_counted() {
        let mut vocab = Vocabulary::new();
        let input = (&b"a b a\nc"[..]).chain(BrokenPipe);
        assert!(vocab.learn_from_reader(WordReader::new(input)).is_err());
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.train_words(), 3);
        assert_eq!(vocab[vocab.search("a").unwrap()].count, 2);
        assert_eq!(vocab.search("c"), None);
    }

    #[test]
    fn save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vocab.txt");
        let mut vocab = vocab_of(&[("x", 4), ("y", 2), ("z", 1)]);
        vocab.prune(2).unwrap();
        vocab.save(&path).unwrap();

        let loaded = Vocabulary::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.train_words(), 6);
        assert_eq!(loaded[loaded.search("x").unwrap()].count, 4);
        assert!(!loaded.is_encoded());
    }

    #[test]
    fn load_rejects_malformed_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vocab.txt");
        fs::write(&path, "x 4\ny two\n").unwrap();
        match Vocabulary::load(&path) {
            Err(WordVecError::Format { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected a format error, got {other:?}"),
        }
    }
}
