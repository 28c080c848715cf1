//! Training options.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WordVecError};
use crate::real;

/// Which word predicts which.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelType {
    /// Continuous bag of words: predict a word from the sum of its context.
    Cbow,
    /// Predict each context word from the center word.
    SkipGram,
}

/// Output-layer objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Objective {
    HierarchicalSoftmax,
    /// Not implemented; `validate` rejects it.
    NegativeSampling,
}

/// How the input-layer embeddings are seeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitMode {
    /// Uniform on `0.0 .. 1.0`.
    Uniform,
    /// Uniform on `-0.5 / hidden_size .. 0.5 / hidden_size`.
    Centered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Number of dimensions in each word vector.
    pub hidden_size: usize,
    /// Max distance between a word and its context words.
    pub window: usize,
    /// Sentences longer than this are split.
    pub max_sentence_size: usize,
    /// Words seen fewer than this many times are discarded.
    pub min_count: u64,
    pub epochs: usize,
    /// Number of worker threads. Each works on one file at a time.
    pub threads: usize,
    pub model: ModelType,
    pub objective: Objective,
    /// Starting learning rate.
    pub alpha: real,
    /// The learning rate never decays below `alpha * min_alpha_fraction`.
    pub min_alpha_fraction: real,
    pub init: InitMode,
    /// Seed for the embedding initializer.
    pub seed: u64,
    pub show_progress: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            hidden_size: 100,
            window: 5,
            max_sentence_size: 1000,
            min_count: 5,
            epochs: 1,
            threads: 4,
            model: ModelType::Cbow,
            objective: Objective::HierarchicalSoftmax,
            alpha: 0.025,
            min_alpha_fraction: 0.001,
            init: InitMode::Uniform,
            seed: 1,
            show_progress: true,
        }
    }
}

impl TrainerConfig {
    pub fn builder() -> TrainerBuilder {
        TrainerBuilder::default()
    }

    /// Checks everything that would otherwise fail after allocation.
    pub fn validate(&self) -> Result<()> {
        if self.hidden_size == 0 {
            return Err(WordVecError::InvalidConfig(
                "hidden_size must be greater than zero".into(),
            ));
        }
        if self.max_sentence_size == 0 {
            return Err(WordVecError::InvalidConfig(
                "max_sentence_size must be greater than zero".into(),
            ));
        }
        if self.epochs == 0 {
            return Err(WordVecError::InvalidConfig(
                "epochs must be at least 1".into(),
            ));
        }
        if self.threads == 0 {
            return Err(WordVecError::InvalidConfig(
                "threads must be at least 1".into(),
            ));
        }
        if !self.alpha.is_finite() || self.alpha <= 0.0 {
            return Err(WordVecError::InvalidConfig(format!(
                "alpha must be a positive number, got {}",
                self.alpha
            )));
        }
        if !(self.min_alpha_fraction > 0.0 && self.min_alpha_fraction <= 1.0) {
            return Err(WordVecError::InvalidConfig(format!(
                "min_alpha_fraction must be in (0, 1], got {}",
                self.min_alpha_fraction
            )));
        }
        if self.objective == Objective::NegativeSampling {
            return Err(WordVecError::InvalidConfig(
                "negative sampling is not supported; use hierarchical softmax".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct TrainerBuilder {
    cfg: TrainerConfig,
}

impl TrainerBuilder {
    pub fn hidden_size(mut self, value: usize) -> Self {
        self.cfg.hidden_size = value;
        self
    }

    pub fn window(mut self, value: usize) -> Self {
        self.cfg.window = value;
        self
    }

    pub fn max_sentence_size(mut self, value: usize) -> Self {
        self.cfg.max_sentence_size = value;
        self
    }

    pub fn min_count(mut self, value: u64) -> Self {
        self.cfg.min_count = value;
        self
    }

    pub fn epochs(mut self, value: usize) -> Self {
        self.cfg.epochs = value;
        self
    }

    pub fn threads(mut self, value: usize) -> Self {
        self.cfg.threads = value;
        self
    }

    pub fn model(mut self, value: ModelType) -> Self {
        self.cfg.model = value;
        self
    }

    pub fn objective(mut self, value: Objective) -> Self {
        self.cfg.objective = value;
        self
    }

    pub fn alpha(mut self, value: real) -> Self {
        self.cfg.alpha = value;
        self
    }

    pub fn min_alpha_fraction(mut self, value: real) -> Self {
        self.cfg.min_alpha_fraction = value;
        self
    }

    pub fn init(mut self, value: InitMode) -> Self {
        self.cfg.init = value;
        self
    }

    pub fn seed(mut self, value: u64) -> Self {
        self.cfg.seed = value;
        self
    }

    pub fn show_progress(mut self, value: bool) -> Self {
        self.cfg.show_progress = value;
        self
    }

    pub fn build(self) -> Result<TrainerConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        TrainerConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_zero_hidden_size() {
        let err = TrainerConfig::builder().hidden_size(0).build().unwrap_err();
        assert!(matches!(err, WordVecError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_negative_sampling() {
        let err = TrainerConfig::builder()
            .objective(Objective::NegativeSampling)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("negative sampling"));
    }

    #[test]
    fn rejects_bad_alpha_floor() {
        assert!(TrainerConfig::builder()
            .min_alpha_fraction(0.0)
            .build()
            .is_err());
        assert!(TrainerConfig::builder()
            .min_alpha_fraction(1.5)
            .build()
            .is_err());
        assert!(TrainerConfig::builder().alpha(real::NAN).build().is_err());
    }

    #[test]
    fn builder_sets_fields() {
        let cfg = TrainerConfig::builder()
            .hidden_size(4)
            .window(2)
            .model(ModelType::SkipGram)
            .threads(2)
            .build()
            .unwrap();
        assert_eq!(cfg.hidden_size, 4);
        assert_eq!(cfg.window, 2);
        assert_eq!(cfg.model, ModelType::SkipGram);
        assert_eq!(cfg.threads, 2);
    }
}
