//! Splitting training text into words.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::mem;
use std::path::Path;

/// Words longer than this (in bytes, counting a terminator) are truncated.
pub const MAX_STRING: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    /// A newline was read.
    EndOfSentence,
}

/// Reads words from a byte stream, assuming space + tab + EOL to be word boundaries.
///
/// `\r` is ignored everywhere. Each newline produces a `Token::EndOfSentence`
/// after the word it terminates, if any.
pub struct WordReader<R> {
    bytes: io::Bytes<R>,
    pending_end: bool,
}

impl WordReader<BufReader<File>> {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(WordReader::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: Read> WordReader<R> {
    pub fn new(reader: R) -> Self {
        WordReader {
            bytes: reader.bytes(),
            pending_end: false,
        }
    }
}

fn to_word(bytes: &[u8]) -> Token {
    Token::Word(String::from_utf8_lossy(bytes).into_owned())
}

impl<R: Read> Iterator for WordReader<R> {
    type Item = io::Result<Token>;

    fn next(&mut self) -> Option<io::Result<Token>> {
        if mem::take(&mut self.pending_end) {
            return Some(Ok(Token::EndOfSentence));
        }

        let mut word = Vec::<u8>::new();
        for byte in self.bytes.by_ref() {
            let ch = match byte {
                Ok(ch) => ch,
                Err(err) => return Some(Err(err)),
            };
            match ch {
                b'\r' => {}
                b'\n' => {
                    if word.is_empty() {
                        return Some(Ok(Token::EndOfSentence));
                    }
                    self.pending_end = true;
                    return Some(Ok(to_word(&word)));
                }
                b' ' | b'\t' => {
                    if !word.is_empty() {
                        return Some(Ok(to_word(&word)));
                    }
                }
                _ => {
                    if word.len() < MAX_STRING - 1 {
                        word.push(ch); // Truncate too long words
                    }
                }
            }
        }

        if word.is_empty() {
            None
        } else {
            Some(Ok(to_word(&word)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<Token> {
        WordReader::new(text.as_bytes())
            .collect::<io::Result<Vec<Token>>>()
            .unwrap()
    }

    fn w(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    #[test]
    fn splits_on_spaces_tabs_and_newlines() {
        assert_eq!(
            tokens("the quick\tbrown\nfox  jumps\n"),
            vec![
                w("the"),
                w("quick"),
                w("brown"),
                Token::EndOfSentence,
                w("fox"),
                w("jumps"),
                Token::EndOfSentence,
            ]
        );
    }

    #[test]
    fn ignores_carriage_returns() {
        assert_eq!(
            tokens("a\r\nb\r"),
            vec![w("a"), Token::EndOfSentence, w("b")]
        );
    }

    #[test]
    fn blank_lines_still_end_sentences() {
        assert_eq!(
            tokens("\n\nx"),
            vec![Token::EndOfSentence, Token::EndOfSentence, w("x")]
        );
    }

    #[test]
    fn empty_input() {
        assert!(tokens("").is_empty());
        assert!(tokens("   \t ").is_empty());
    }

    #[test]
    fn long_words_are_truncated() {
        let long = "x".repeat(250);
        match &tokens(&long)[..] {
            [Token::Word(word)] => assert_eq!(word.len(), MAX_STRING - 1),
            other => panic!("unexpected tokens {other:?}"),
        }
    }
}
