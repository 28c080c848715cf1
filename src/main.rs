use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{ArgAction, ArgGroup, Parser, ValueEnum};
use env_logger::Env;
use log::{info, warn};

use wordvec::{
    collect_files, real, save_vectors, InitMode, Model, ModelType, Trainer, TrainerConfig,
    VectorFormat,
};

#[derive(Clone, Copy, ValueEnum)]
enum Init {
    /// Uniform in [0, 1)
    Uniform,
    /// Uniform in [-0.5, 0.5), divided by the vector size
    Centered,
}

#[derive(Parser)]
#[command(about = "Word vector training with hierarchical softmax", long_about = None, version)]
#[command(group(ArgGroup::new("format").args(["binary", "bincode"])))]
struct Options {
    /// Train on FILE, or on the files in directory FILE
    #[arg(long = "train", value_name = "FILE")]
    train_path: PathBuf,

    /// When training on a directory, only use files whose names start with STR
    #[arg(long, value_name = "STR", default_value = "")]
    prefix: String,

    /// Use FILE to save the resulting word vectors
    #[arg(long = "output", value_name = "FILE")]
    output_file: Option<PathBuf>,

    /// Set size of word vectors
    #[arg(long = "size", value_name = "N", default_value_t = 100)]
    layer1_size: usize,

    /// Set max skip length between words
    #[arg(long, value_name = "N", default_value_t = 5)]
    window: usize,

    /// Split lines into sentences of at most N words
    #[arg(long = "sentence-size", value_name = "N", default_value_t = 1000)]
    max_sentence_size: usize,

    /// Discard words that appear less than N times
    #[arg(long = "min-count", value_name = "N", default_value_t = 5)]
    min_count: u64,

    /// Number of passes over the training data
    #[arg(long, value_name = "N", default_value_t = 1)]
    iter: usize,

    /// Use N threads
    #[arg(long = "threads", value_name = "N", default_value_t = 4)]
    num_threads: usize,

    /// Use the skip-gram model (otherwise, use continuous bag of words)
    #[arg(long)]
    skipgram: bool,

    /// Set the starting learning rate
    #[arg(long, default_value_t = 0.025)]
    alpha: real,

    /// The learning rate never drops below this fraction of its starting value
    #[arg(long = "min-alpha-fraction", value_name = "X", default_value_t = 0.001)]
    min_alpha_fraction: real,

    /// How to initialize word vectors
    #[arg(long, value_enum, default_value_t = Init::Uniform)]
    init: Init,

    /// Seed for initializing word vectors
    #[arg(long, value_name = "N", default_value_t = 1)]
    seed: u64,

    /// Save the resulting vectors in binary mode
    #[arg(long)]
    binary: bool,

    /// Save the whole network, including Huffman codes and softmax weights, with bincode
    #[arg(long)]
    bincode: bool,

    /// The vocabulary will be saved to FILE
    #[arg(long = "save-vocab", value_name = "FILE")]
    save_vocab_file: Option<PathBuf>,

    /// The vocabulary will be read from FILE, not constructed from the training data
    #[arg(long = "read-vocab", value_name = "FILE")]
    read_vocab_file: Option<PathBuf>,

    /// Don't show a progress bar
    #[arg(long = "no-progress")]
    no_progress: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, action = ArgAction::Count)]
    quiet: u8,
}

impl Options {
    fn config(&self) -> TrainerConfig {
        TrainerConfig {
            hidden_size: self.layer1_size,
            window: self.window,
            max_sentence_size: self.max_sentence_size,
            min_count: self.min_count,
            epochs: self.iter,
            threads: self.num_threads,
            model: if self.skipgram {
                ModelType::SkipGram
            } else {
                ModelType::Cbow
            },
            alpha: self.alpha,
            min_alpha_fraction: self.min_alpha_fraction,
            init: match self.init {
                Init::Uniform => InitMode::Uniform,
                Init::Centered => InitMode::Centered,
            },
            seed: self.seed,
            show_progress: !self.no_progress,
            ..TrainerConfig::default()
        }
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    use log::LevelFilter;

    let level = match (quiet, verbose) {
        (0, 0) => LevelFilter::Info,
        (0, 1) => LevelFilter::Debug,
        (0, _) => LevelFilter::Trace,
        (1, _) => LevelFilter::Warn,
        _ => LevelFilter::Error,
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    builder.filter_level(level);
    let _ = builder.try_init();
}

fn train_model(options: &Options) -> Result<()> {
    let files = collect_files(&options.train_path, &options.prefix)
        .with_context(|| format!("no training data at {}", options.train_path.display()))?;
    info!("starting training using {} files", files.len());

    let mut trainer = Trainer::new(options.config()).context("invalid options")?;
    match &options.read_vocab_file {
        Some(path) => trainer.load_vocab(path).context("failed to read vocabulary")?,
        None => {
            trainer.build_vocab(&files)?;
        }
    }
    trainer.prune()?;
    if let Some(path) = &options.save_vocab_file {
        trainer
            .vocab()
            .save(path)
            .context("failed to save vocabulary")?;
    }
    trainer.encode()?;
    trainer.initialize_parameters()?;

    let Some(output_file) = &options.output_file else {
        warn!("no --output file given; skipping training");
        return Ok(());
    };
    let report = trainer.run(&files)?;
    info!("{report}");

    let params = trainer.params().context("network was not initialized")?;
    let saved = if options.bincode {
        Model::new(trainer.vocab(), params, options.window).save(output_file)
    } else {
        let format = if options.binary {
            VectorFormat::Binary
        } else {
            VectorFormat::Text
        };
        save_vectors(output_file, trainer.vocab(), params, format)
    };
    saved.with_context(|| format!("failed to write {}", output_file.display()))
}

fn main() {
    let options = Options::parse();
    init_logging(options.verbose, options.quiet);

    if let Err(err) = train_model(&options) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}
