//! Word vectors trained with CBOW or Skip-Gram over a Huffman-coded
//! hierarchical softmax, with lock-free multithreaded updates.

pub mod config;
pub mod corpus;
pub mod error;
pub mod huffman;
pub mod output;
pub mod params;
pub mod reader;
pub mod train;
pub mod vectors;
pub mod vocab;

#[allow(non_camel_case_types)]
pub type real = f32; // Precision of float numbers

pub use config::{InitMode, ModelType, Objective, TrainerBuilder, TrainerConfig};
pub use corpus::collect_files;
pub use error::{Result, WordVecError};
pub use output::{save_vectors, write_vectors, Model, VectorFormat};
pub use params::ParameterStore;
pub use train::{Trainer, TrainerState, TrainingReport};
pub use vectors::Vectors;
pub use vocab::{VocabWord, Vocabulary};
