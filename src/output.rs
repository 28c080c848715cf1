//! Saving trained vectors.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WordVecError};
use crate::params::{ParameterStore, Real};
use crate::real;
use crate::vocab::{VocabWord, Vocabulary};

/// Layout of a word vector file.
///
/// Both start with a `"<words> <size>"` line, then one line per word: the word,
/// a space, and its vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorFormat {
    /// Values as decimal text, each followed by a space.
    Text,
    /// Values as native-endian `f32`s.
    Binary,
}

/// Writes the input-layer embeddings, one row per word in vocabulary order.
pub fn write_vectors<W: Write>(
    fo: &mut W,
    vocab: &Vocabulary,
    params: &ParameterStore,
    format: VectorFormat,
) -> io::Result<()> {
    if vocab.len() != params.vocab_size() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "vocabulary has {} words but the network has {} rows",
                vocab.len(),
                params.vocab_size()
            ),
        ));
    }
    let layer1_size = params.hidden_size();
    writeln!(fo, "{} {}", vocab.len(), layer1_size)?;
    for (a, vw) in vocab.words().iter().enumerate() {
        write!(fo, "{} ", vw.word)?;
        let word_vec = params.input_row(a);
        match format {
            VectorFormat::Binary => {
                let word_vec = word_vec.iter().map(Real::get).collect::<Vec<real>>();
                fo.write_all(bytemuck::cast_slice::<real, u8>(&word_vec))?;
            }
            VectorFormat::Text => {
                for f in word_vec {
                    write!(fo, "{} ", f.get())?;
                }
            }
        }
        writeln!(fo)?;
    }
    Ok(())
}

pub fn save_vectors(
    output_file: &Path,
    vocab: &Vocabulary,
    params: &ParameterStore,
    format: VectorFormat,
) -> Result<()> {
    let io_err = |err: io::Error| WordVecError::io(err, output_file);
    let mut fo = BufWriter::new(File::create(output_file).map_err(io_err)?);
    write_vectors(&mut fo, vocab, params, format).map_err(io_err)?;
    fo.flush().map_err(io_err)
}

/// Everything needed to evaluate a trained network: the vocabulary with its
/// Huffman paths, and both layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub size: usize,
    pub window: usize,
    pub vocab: Vec<VocabWord>,
    pub embeddings: Vec<real>,
    /// Weights for hierarchical softmax predictors.
    pub weights: Vec<real>,
}

impl Model {
    pub fn new(vocab: &Vocabulary, params: &ParameterStore, window: usize) -> Self {
        Model {
            size: params.hidden_size(),
            window,
            vocab: vocab.words().to_vec(),
            embeddings: params.input_matrix(),
            weights: params.output_matrix(),
        }
    }

    /// Saves the model in bincode format.
    pub fn save(&self, filename: &Path) -> Result<()> {
        let io_err = |err: io::Error| WordVecError::io(err, filename);
        let mut fo = BufWriter::new(File::create(filename).map_err(io_err)?);
        bincode::serialize_into(&mut fo, self)?;
        fo.flush().map_err(io_err)
    }

    pub fn load(filename: &Path) -> Result<Self> {
        let f =
            BufReader::new(File::open(filename).map_err(|err| WordVecError::io(err, filename))?);
        Ok(bincode::deserialize_from(f)?)
    }

    /// The embedding for word `i`.
    pub fn embedding(&self, i: usize) -> &[real] {
        &self.embeddings[i * self.size..][..self.size]
    }
}
