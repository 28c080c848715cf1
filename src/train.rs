//! Training a network with hierarchical softmax.
//!
//! A `Trainer` goes through its steps exactly once, in order:
//! build (or load) the vocabulary, prune it, encode it, initialize the
//! network, and run. `Trainer::train` does all of that.
//!
//! During `run`, worker threads each take one file at a time and update the
//! shared `ParameterStore` without locking (see `params`). The only shared
//! counter is the number of words processed so far, which drives the
//! learning-rate decay.

use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};

use crate::config::{ModelType, TrainerConfig};
use crate::error::{Result, WordVecError};
use crate::params::{dot, ParameterStore};
use crate::reader::{Token, WordReader};
use crate::real;
use crate::vocab::{VocabWord, Vocabulary};

/// How many words a worker processes between updates to the shared word count.
pub const PROGRESS_INTERVAL: u64 = 10_000;

/// The logistic function, `e^x / (1 + e^x)`.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// The learning rate after `processed` of `planned` words.
///
/// Decays linearly from `alpha` and stops at `alpha * min_fraction`.
pub fn decayed_alpha(alpha: real, min_fraction: real, processed: u64, planned: u64) -> real {
    if planned == 0 {
        return alpha;
    }
    let remaining = 1.0 - processed as f64 / planned as f64;
    alpha * (remaining as real).max(min_fraction)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    Idle,
    VocabBuilt,
    Pruned,
    Encoded,
    Initialized,
    Running,
    Done,
}

impl TrainerState {
    fn name(self) -> &'static str {
        match self {
            TrainerState::Idle => "idle",
            TrainerState::VocabBuilt => "vocabulary built",
            TrainerState::Pruned => "pruned",
            TrainerState::Encoded => "encoded",
            TrainerState::Initialized => "initialized",
            TrainerState::Running => "running",
            TrainerState::Done => "done",
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub epochs: usize,
    /// Files trained on, summed over epochs.
    pub files_trained: usize,
    /// Files that couldn't be read, summed over epochs.
    pub files_skipped: usize,
    pub words_processed: u64,
    pub elapsed: Duration,
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Epochs: {}", self.epochs)?;
        writeln!(
            f,
            "Files trained: {} (skipped: {})",
            self.files_trained, self.files_skipped
        )?;
        writeln!(f, "Words processed: {}", self.words_processed)?;
        writeln!(f, "Training time: {:.2}s", self.elapsed.as_secs_f64())?;
        Ok(())
    }
}

pub struct Trainer {
    config: TrainerConfig,
    state: TrainerState,
    vocab: Vocabulary,
    params: Option<ParameterStore>,
    /// Words processed by all workers, across epochs. Updated every
    /// `PROGRESS_INTERVAL` words per worker, so it lags a little.
    words_processed: AtomicU64,
    /// `vocab.train_words() * epochs`.
    planned_words: u64,
    progress: ProgressBar,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Trainer {
            config,
            state: TrainerState::Idle,
            vocab: Vocabulary::new(),
            params: None,
            words_processed: AtomicU64::new(0),
            planned_words: 0,
            progress: ProgressBar::hidden(),
        })
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn state(&self) -> TrainerState {
        self.state
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// The network, once initialized.
    pub fn params(&self) -> Option<&ParameterStore> {
        self.params.as_ref()
    }

    pub fn words_processed(&self) -> u64 {
        self.words_processed.load(Ordering::Relaxed)
    }

    /// The learning rate given the progress so far.
    pub fn current_alpha(&self) -> real {
        decayed_alpha(
            self.config.alpha,
            self.config.min_alpha_fraction,
            self.words_processed(),
            self.planned_words,
        )
    }

    fn expect_state(&self, expected: TrainerState, action: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(WordVecError::InvalidState {
                action,
                expected: expected.name(),
                found: self.state.name(),
            })
        }
    }

    /// Runs every step: vocabulary, pruning, encoding, initialization, training.
    pub fn train(&mut self, files: &[PathBuf]) -> Result<TrainingReport> {
        self.build_vocab(files)?;
        self.prune()?;
        self.encode()?;
        self.initialize_parameters()?;
        self.run(files)
    }

    /// Counts the words in `files`. Returns the files that couldn't be read.
    pub fn build_vocab(&mut self, files: &[PathBuf]) -> Result<Vec<PathBuf>> {
        self.expect_state(TrainerState::Idle, "build vocabulary")?;
        let skipped = self.vocab.build_from_files(files);
        self.state = TrainerState::VocabBuilt;
        Ok(skipped)
    }

    /// Uses a vocabulary saved by `Vocabulary::save` instead of counting words.
    pub fn load_vocab(&mut self, path: &Path) -> Result<()> {
        self.expect_state(TrainerState::Idle, "load vocabulary")?;
        self.vocab = Vocabulary::load(path)?;
        self.state = TrainerState::VocabBuilt;
        Ok(())
    }

    pub fn prune(&mut self) -> Result<()> {
        self.expect_state(TrainerState::VocabBuilt, "prune vocabulary")?;
        self.vocab.prune(self.config.min_count)?;
        self.state = TrainerState::Pruned;
        Ok(())
    }

    pub fn encode(&mut self) -> Result<()> {
        self.expect_state(TrainerState::Pruned, "encode vocabulary")?;
        self.vocab.encode()?;
        self.state = TrainerState::Encoded;
        Ok(())
    }

    pub fn initialize_parameters(&mut self) -> Result<()> {
        self.expect_state(TrainerState::Encoded, "initialize network")?;
        if self.vocab.is_empty() {
            return Err(WordVecError::EmptyVocabulary {
                min_count: self.config.min_count,
            });
        }
        if self.vocab.len() == 1 {
            warn!("vocabulary has a single word; there is nothing to predict");
        }
        self.params = Some(ParameterStore::new(
            self.vocab.len(),
            self.config.hidden_size,
            self.config.init,
            self.config.seed,
        )?);
        self.state = TrainerState::Initialized;
        Ok(())
    }

    /// Trains on `files` for the configured number of epochs.
    ///
    /// A file that can't be read is logged and skipped; it doesn't stop the run.
    /// If the error comes partway through a file, the updates already made from
    /// it are kept, its words still count toward progress, and it is reported
    /// as skipped.
    pub fn run(&mut self, files: &[PathBuf]) -> Result<TrainingReport> {
        self.expect_state(TrainerState::Initialized, "run training")?;
        self.state = TrainerState::Running;

        let epochs = self.config.epochs;
        self.planned_words = self.vocab.train_words() * epochs as u64;
        self.words_processed.store(0, Ordering::Relaxed);
        self.progress = self.progress_bar();

        let num_threads = self.config.threads.min(files.len()).max(1);
        info!(
            "training {:?} model on {} files with {num_threads} threads for {epochs} epochs",
            self.config.model,
            files.len(),
        );

        let files_trained = AtomicUsize::new(0);
        let files_skipped = AtomicUsize::new(0);
        let start = Instant::now();
        {
            let this: &Trainer = self;
            let params = this.params.as_ref().ok_or(WordVecError::InvalidState {
                action: "run training",
                expected: TrainerState::Initialized.name(),
                found: "uninitialized network",
            })?;
            for epoch in 0..epochs {
                let next_file = AtomicUsize::new(0);
                thread::scope(|s| {
                    for _ in 0..num_threads {
                        s.spawn(|| {
                            let mut worker = Worker::new(this, params);
                            loop {
                                let i = next_file.fetch_add(1, Ordering::Relaxed);
                                let Some(file) = files.get(i) else {
                                    break;
                                };
                                match worker.train_file(file) {
                                    Ok(words) => {
                                        files_trained.fetch_add(1, Ordering::Relaxed);
                                        debug!(
                                            "epoch {}: finished {} ({words} words)",
                                            epoch + 1,
                                            file.display()
                                        );
                                    }
                                    Err(err) => {
                                        files_skipped.fetch_add(1, Ordering::Relaxed);
                                        warn!("skipping {}: {err}", file.display());
                                    }
                                }
                            }
                        });
                    }
                });
            }
        }
        let elapsed = start.elapsed();
        self.progress.finish_and_clear();

        let words_processed = self.words_processed();
        info!(
            "training took {:.2}s; {:.1}k words/thread/sec",
            elapsed.as_secs_f64(),
            words_processed as f64 / (elapsed.as_secs_f64() + 1e-9) / num_threads as f64 / 1000.0,
        );
        self.state = TrainerState::Done;
        Ok(TrainingReport {
            epochs,
            files_trained: files_trained.into_inner(),
            files_skipped: files_skipped.into_inner(),
            words_processed,
            elapsed,
        })
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(self.planned_words);
        if let Ok(style) =
            ProgressStyle::with_template("[{elapsed_precise}] {wide_bar} {percent:>3}% {msg}")
        {
            pb.set_style(style);
        }
        pb
    }

    /// Adds a worker's recent word count to the total, and returns the new learning rate.
    fn report_progress(&self, words: u64) -> real {
        let total = self.words_processed.fetch_add(words, Ordering::Relaxed) + words;
        let alpha = decayed_alpha(
            self.config.alpha,
            self.config.min_alpha_fraction,
            total,
            self.planned_words,
        );
        self.progress.set_position(total);
        self.progress.set_message(format!("alpha {alpha:.6}"));
        alpha
    }
}

/// One training thread's private state.
struct Worker<'a> {
    trainer: &'a Trainer,
    params: &'a ParameterStore,
    /// Word indexes of the current sentence.
    sentence: Vec<usize>,
    /// Hidden layer activation.
    neu1: Vec<real>,
    /// Error to propagate back to the input layer.
    neu1e: Vec<real>,
    /// Learning rate as of the last update to the shared word count.
    alpha: real,
}

impl<'a> Worker<'a> {
    fn new(trainer: &'a Trainer, params: &'a ParameterStore) -> Self {
        let hidden_size = params.hidden_size();
        Worker {
            trainer,
            params,
            sentence: Vec::with_capacity(trainer.config.max_sentence_size),
            neu1: vec![0.0; hidden_size],
            neu1e: vec![0.0; hidden_size],
            alpha: trainer.config.alpha,
        }
    }

    /// Trains on one file. Returns the number of vocabulary words read.
    fn train_file(&mut self, path: &Path) -> Result<u64> {
        let mut reader = WordReader::open(path).map_err(|err| WordVecError::io(err, path))?;
        self.train_reader(&mut reader).map_err(|err| WordVecError::io(err, path))
    }

    fn train_reader<R: Read>(&mut self, reader: &mut WordReader<R>) -> io::Result<u64> {
        let mut word_count: u64 = 0;
        let mut last_word_count: u64 = 0;
        self.alpha = self.trainer.current_alpha();

        let result = loop {
            let at_end_of_file = match self.read_sentence(reader, &mut word_count) {
                Ok(eof) => eof,
                Err(err) => break Err(err),
            };

            if word_count - last_word_count >= PROGRESS_INTERVAL {
                self.alpha = self.trainer.report_progress(word_count - last_word_count);
                last_word_count = word_count;
            }

            if !self.sentence.is_empty() {
                match self.trainer.config.model {
                    ModelType::Cbow => self.train_cbow(self.alpha),
                    ModelType::SkipGram => self.train_skip_gram(self.alpha),
                }
            }

            if at_end_of_file {
                break Ok(word_count);
            }
        };

        self.trainer.report_progress(word_count - last_word_count);
        result
    }

    /// Fills `self.sentence` with the next line, or up to `max_sentence_size` words of it.
    /// Unknown words are dropped. Returns `Ok(true)` at end of file.
    fn read_sentence<R: Read>(
        &mut self,
        reader: &mut WordReader<R>,
        word_count: &mut u64,
    ) -> io::Result<bool> {
        self.sentence.clear();
        while self.sentence.len() < self.trainer.config.max_sentence_size {
            match reader.next() {
                None => return Ok(true),
                Some(Err(err)) => return Err(err),
                Some(Ok(Token::EndOfSentence)) => break,
                Some(Ok(Token::Word(word))) => {
                    if let Some(i) = self.trainer.vocab.search(&word) {
                        self.sentence.push(i);
                        *word_count += 1;
                    }
                }
            }
        }
        Ok(false)
    }

    /// Positions within `window` of `t`, not counting `t` itself.
    fn context(&self, t: usize) -> impl Iterator<Item = usize> {
        let window = self.trainer.config.window;
        let left = t.saturating_sub(window);
        let right = t.saturating_add(window).min(self.sentence.len() - 1);
        (left..=right).filter(move |&c| c != t)
    }

    /// Predicts each word from the sum of its context's embeddings.
    fn train_cbow(&mut self, alpha: real) {
        let params = self.params;
        let vocab = &self.trainer.vocab;
        for t in 0..self.sentence.len() {
            self.neu1.fill(0.0);
            self.neu1e.fill(0.0);

            // in -> hidden
            let mut cw = 0;
            for c in self.context(t) {
                let row = params.input_row(self.sentence[c]);
                for (h, w) in self.neu1.iter_mut().zip(row) {
                    *h += w.get();
                }
                cw += 1;
            }
            if cw == 0 {
                continue;
            }

            hierarchical_softmax(
                params,
                &vocab[self.sentence[t]],
                &self.neu1,
                &mut self.neu1e,
                alpha,
            );

            // hidden -> in
            for c in self.context(t) {
                let row = params.input_row(self.sentence[c]);
                for (w, &e) in row.iter().zip(&self.neu1e) {
                    w.add(e);
                }
            }
        }
    }

    /// Predicts each context word from the center word's embedding.
    fn train_skip_gram(&mut self, alpha: real) {
        let params = self.params;
        let vocab = &self.trainer.vocab;
        for t in 0..self.sentence.len() {
            let center = params.input_row(self.sentence[t]);
            for c in self.context(t) {
                for (h, w) in self.neu1.iter_mut().zip(center) {
                    *h = w.get();
                }
                self.neu1e.fill(0.0);

                hierarchical_softmax(
                    params,
                    &vocab[self.sentence[c]],
                    &self.neu1,
                    &mut self.neu1e,
                    alpha,
                );

                // Learn weights input -> hidden
                for (w, &e) in center.iter().zip(&self.neu1e) {
                    w.add(e);
                }
            }
        }
    }
}

/// Walks `target`'s Huffman path, training each predictor on the branch taken.
///
/// Output rows are updated as we go. The error to apply to the input layer is
/// added to `err`.
fn hierarchical_softmax(
    params: &ParameterStore,
    target: &VocabWord,
    hidden: &[real],
    err: &mut [real],
    alpha: real,
) {
    for (&bit, &node) in target.code.iter().zip(&target.path) {
        let row = params.output_row(node as usize);
        // Propagate hidden -> output
        let f = sigmoid(dot(hidden, row) as f64) as real;
        // 'g' is the gradient multiplied by the learning rate
        let g = (bit as real - f) * alpha;
        // Propagate errors output -> hidden
        for (e, w) in err.iter_mut().zip(row) {
            *e += g * w.get();
        }
        // Learn weights hidden -> output
        for (w, &h) in row.iter().zip(hidden) {
            w.add(g * h);
        }
    }
}
