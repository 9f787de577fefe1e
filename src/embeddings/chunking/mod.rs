
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfigError;

/// Separators tried in order by the character splitter. The empty separator
/// is a hard cut between characters.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " ", ""];

/// Characters that end a sentence when followed by whitespace or end of text
const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', '。', '！', '？'];

/// Unit in which chunk size and overlap are measured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkUnit {
    /// Unicode characters, split recursively on paragraph, line, sentence and word boundaries
    #[default]
    Characters,
    /// Whole sentences
    Sentences,
}

/// Configuration for content chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub unit: ChunkUnit,
    /// Maximum chunk length, in `unit`s
    pub chunk_size: usize,
    /// Length shared between consecutive chunks, in `unit`s
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            unit: ChunkUnit::Characters,
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

impl ChunkingConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::OverlapTooLarge(
                self.chunk_overlap,
                self.chunk_size,
            ));
        }
        Ok(())
    }
}

/// Splits documents into ordered, overlapping chunks
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    #[inline]
    pub fn new(config: ChunkingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[inline]
    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split a document. Empty or whitespace-only input yields no chunks.
    #[inline]
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let normalized = text.replace("\r\n", "\n");
        let chunks = match self.config.unit {
            ChunkUnit::Characters => self.split_recursive(&normalized, SEPARATORS),
            ChunkUnit::Sentences => self.split_sentence_windows(&normalized),
        };

        debug!(
            "Chunked {} characters into {} chunks ({:?}, size {}, overlap {})",
            normalized.chars().count(),
            chunks.len(),
            self.config.unit,
            self.config.chunk_size,
            self.config.chunk_overlap
        );

        chunks
    }

    /// Split on the first separator present in `text`, merge the pieces up to
    /// the size budget, and recurse with finer separators into any piece that
    /// is still too long.
    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let position = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(position).copied().unwrap_or("");
        let finer = separators.get(position + 1..).unwrap_or(&[]);

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) <= self.config.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge_pieces(&fitting));
                fitting.clear();
            }

            if finer.is_empty() {
                push_trimmed(&mut chunks, piece);
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge_pieces(&fitting));
        }

        chunks
    }

    /// Greedily pack pieces into chunks of at most `chunk_size` characters,
    /// starting each new chunk with up to `chunk_overlap` characters of the
    /// previous chunk's trailing pieces.
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > size && !window.is_empty() {
                push_trimmed(&mut chunks, &window.iter().copied().collect::<String>());

                while total > overlap || (total + len > size && total > 0) {
                    match window.pop_front() {
                        Some(dropped) => total -= char_len(dropped),
                        None => break,
                    }
                }
            }

            window.push_back(piece);
            total += len;
        }

        if !window.is_empty() {
            push_trimmed(&mut chunks, &window.iter().copied().collect::<String>());
        }

        chunks
    }

    /// Slide a window of `chunk_size` sentences forward by
    /// `chunk_size - chunk_overlap` sentences at a time.
    fn split_sentence_windows(&self, text: &str) -> Vec<String> {
        let sentences = split_sentences(text);
        let size = self.config.chunk_size;
        let step = size - self.config.chunk_overlap;

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < sentences.len() {
            let end = (start + size).min(sentences.len());
            chunks.push(sentences[start..end].join(" "));
            if end == sentences.len() {
                break;
            }
            start += step;
        }

        chunks
    }
}

/// Split `text` at every occurrence of `separator`, keeping the separator at
/// the start of the piece that follows it. An empty separator splits into
/// single characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (index, _) in text.match_indices(separator) {
        if index > start {
            pieces.push(&text[start..index]);
            start = index;
        }
    }
    pieces.push(&text[start..]);
    pieces.retain(|p| !p.is_empty());
    pieces
}

/// Split text into trimmed sentences
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        let at_boundary = SENTENCE_TERMINATORS.contains(&c)
            && chars.peek().is_none_or(|next| next.is_whitespace());
        if at_boundary {
            push_trimmed(&mut sentences, &current);
            current.clear();
        }
    }
    push_trimmed(&mut sentences, &current);

    sentences
}

fn push_trimmed(chunks: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
