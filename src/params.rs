//! The network's weights, shared between training threads.
//!
//! Training threads read and update rows without taking locks. Each element is
//! stored in an atomic so the race is not undefined behavior, but `Real::add`
//! is a separate load and store: when two threads update the same element at
//! once, one of the updates may be lost. Training tolerates that noise, and
//! adding locks here would change how it converges.

use std::sync::atomic::{AtomicU32, Ordering};

use aligned_box::AlignedBox;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::InitMode;
use crate::error::{Result, WordVecError};
use crate::real;

const ALIGNMENT: usize = 128;

/// A weight that can be read and written from many threads without synchronization.
#[derive(Default)]
#[repr(transparent)]
pub struct Real {
    bits: AtomicU32,
}

impl Real {
    pub fn get(&self) -> real {
        real::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn set(&self, value: real) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Not atomic; see the module docs.
    pub fn add(&self, x: real) {
        let a = self.get();
        self.set(a + x);
    }
}

fn alloc(len: usize) -> Result<AlignedBox<[Real]>> {
    // The allocator rejects empty requests; a one-word vocabulary has no
    // output rows, so pad to at least one element and never index it.
    AlignedBox::slice_from_default(ALIGNMENT, len.max(1)).map_err(|err| {
        WordVecError::InvalidConfig(format!("failed to allocate {len} weights: {err:?}"))
    })
}

pub struct ParameterStore {
    vocab_size: usize,
    hidden_size: usize,
    /// Word embeddings, `vocab_size` rows.
    input: AlignedBox<[Real]>,
    /// Hierarchical softmax weights, one row per internal tree node (`vocab_size - 1` rows).
    output: AlignedBox<[Real]>,
}

impl ParameterStore {
    /// Allocates the network. Input rows are random; output rows are zero.
    pub fn new(vocab_size: usize, hidden_size: usize, init: InitMode, seed: u64) -> Result<Self> {
        if vocab_size == 0 || hidden_size == 0 {
            return Err(WordVecError::InvalidConfig(format!(
                "cannot allocate a {vocab_size}x{hidden_size} network"
            )));
        }
        let too_big = || {
            WordVecError::InvalidConfig(format!(
                "a {vocab_size}x{hidden_size} network is too large"
            ))
        };
        let input = alloc(vocab_size.checked_mul(hidden_size).ok_or_else(too_big)?)?;
        let output = alloc((vocab_size - 1).checked_mul(hidden_size).ok_or_else(too_big)?)?;

        let mut rng = StdRng::seed_from_u64(seed);
        for w in input.iter() {
            let u: real = rng.gen();
            w.set(match init {
                InitMode::Uniform => u,
                InitMode::Centered => (u - 0.5) / hidden_size as real,
            });
        }

        Ok(ParameterStore {
            vocab_size,
            hidden_size,
            input,
            output,
        })
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Number of rows in the output layer.
    pub fn output_rows(&self) -> usize {
        self.vocab_size - 1
    }

    /// The embedding for word `i`.
    pub fn input_row(&self, i: usize) -> &[Real] {
        debug_assert!(i < self.vocab_size);
        &self.input[i * self.hidden_size..][..self.hidden_size]
    }

    /// The predictor weights for internal node `i`.
    pub fn output_row(&self, i: usize) -> &[Real] {
        debug_assert!(i < self.output_rows());
        &self.output[i * self.hidden_size..][..self.hidden_size]
    }

    /// Snapshot of the input layer, row-major.
    pub fn input_matrix(&self) -> Vec<real> {
        self.input[..self.vocab_size * self.hidden_size]
            .iter()
            .map(Real::get)
            .collect()
    }

    /// Snapshot of the output layer, row-major.
    pub fn output_matrix(&self) -> Vec<real> {
        self.output[..self.output_rows() * self.hidden_size]
            .iter()
            .map(Real::get)
            .collect()
    }
}

pub fn dot(a: &[real], b: &[Real]) -> real {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(&a, b)| a * b.get()).sum()
}
