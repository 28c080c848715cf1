//! Reading saved word vectors back, for queries.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::ops::Index;
use std::path::Path;

use ordered_float::OrderedFloat;

use crate::error::{Result, WordVecError};
use crate::output::VectorFormat;
use crate::real;

pub struct Vectors {
    /// Embedding vector length (number of dimensions).
    size: usize,

    /// The vocabulary.
    vocab: Vec<String>,

    index: HashMap<String, usize>,

    /// `embeddings[k * size..(k+1) * size]` is the vector embedding for word `k`,
    /// normalized to length 1.
    embeddings: Vec<real>,
}

pub fn norm(v: &[real]) -> real {
    v.iter().copied().map(|e| e * e).sum::<real>().sqrt()
}

/// Scales `v` to length 1. Leaves a zero vector alone.
pub fn normalize(v: &mut [real]) {
    let len = norm(v);
    if len > 0.0 {
        for e in v {
            *e /= len;
        }
    }
}

pub fn dot(a: &[real], b: &[real]) -> real {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(&a, &b)| a * b).sum()
}

impl Index<usize> for Vectors {
    type Output = [real];

    fn index(&self, i: usize) -> &[real] {
        &self.embeddings[i * self.size..][..self.size]
    }
}

fn parse_header(path: &Path, line: &str) -> Result<(usize, usize)> {
    let mut fields = line.split_whitespace().map(str::parse::<usize>);
    match (fields.next(), fields.next(), fields.next()) {
        (Some(Ok(num_words)), Some(Ok(size)), None) => Ok((num_words, size)),
        _ => Err(WordVecError::format(path, 1, "expected \"<words> <size>\" header")),
    }
}

impl Vectors {
    pub fn load(file_name: &Path, format: VectorFormat) -> Result<Self> {
        let io_err = |err: io::Error| WordVecError::io(err, file_name);
        let mut f = BufReader::new(File::open(file_name).map_err(io_err)?);
        let mut line = String::new();
        f.read_line(&mut line).map_err(io_err)?;
        let (num_words, size) = parse_header(file_name, &line)?;

        let mut vocab: Vec<String> = Vec::with_capacity(num_words);
        let mut m = vec![0.0; num_words * size];
        for b in 0..num_words {
            let line_num = b + 2;
            let mut vocab_word = Vec::<u8>::new();
            let count = f.read_until(b' ', &mut vocab_word).map_err(io_err)?;
            if count == 0 {
                return Err(WordVecError::format(
                    file_name,
                    line_num,
                    format!("expected {num_words} words, found {b}"),
                ));
            }
            if vocab_word.last() == Some(&b' ') {
                vocab_word.pop();
            }
            vocab_word.retain(|c| *c != b'\n');
            let word = String::from_utf8(vocab_word).map_err(|_| {
                WordVecError::format(file_name, line_num, "invalid UTF-8 in word")
            })?;
            vocab.push(word);

            let row = &mut m[b * size..][..size];
            match format {
                VectorFormat::Binary => {
                    f.read_exact(bytemuck::cast_slice_mut::<real, u8>(row))
                        .map_err(io_err)?;
                }
                VectorFormat::Text => {
                    line.clear();
                    f.read_line(&mut line).map_err(io_err)?;
                    let values = line
                        .split_whitespace()
                        .map(str::parse::<real>)
                        .collect::<Result<Vec<real>, _>>()
                        .map_err(|err| {
                            WordVecError::format(file_name, line_num, err.to_string())
                        })?;
                    if values.len() != size {
                        return Err(WordVecError::format(
                            file_name,
                            line_num,
                            format!("expected {size} values, found {}", values.len()),
                        ));
                    }
                    row.copy_from_slice(&values);
                }
            }
            normalize(row);
        }

        let index = vocab
            .iter()
            .enumerate()
            .map(|(i, word)| (word.clone(), i))
            .collect();
        Ok(Vectors {
            size,
            vocab,
            index,
            embeddings: m,
        })
    }

    pub fn num_words(&self) -> usize {
        self.vocab.len()
    }

    /// Returns the vector size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the index for a word as string. Exact match only, case-sensitive.
    pub fn lookup_word(&self, word: &str) -> Option<usize> {
        self.index.get(word).copied()
    }

    /// Get the word for a word-index. Panics if `word` is out of range.
    pub fn word(&self, word: usize) -> &str {
        &self.vocab[word]
    }

    /// The `n` words most similar to `query` by cosine similarity, best first,
    /// leaving out the words in `exclude`.
    pub fn nearest(&self, query: &[real], n: usize, exclude: &[usize]) -> Vec<(&str, real)> {
        let mut query = query.to_vec();
        normalize(&mut query);
        let mut best: Vec<(&str, real)> = (0..self.num_words())
            .filter(|c| !exclude.contains(c))
            .map(|c| (self.word(c), dot(&query, &self[c])))
            .collect();
        best.sort_by_key(|&(_word, dist)| std::cmp::Reverse(OrderedFloat(dist)));
        best.truncate(n);
        best
    }
}
