// Index store module
// Exact nearest-neighbour index over chunk embeddings, persisted as a
// vectors/chunks pair per knowledge base generation

mod codec;
mod generation;


use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{debug, info, warn};

pub use generation::KnowledgeBaseInfo;
use generation::KnowledgeBaseLock;

use crate::embeddings::common_dimension;
use crate::{KnowledgeError, Result};

pub const VECTORS_FILE: &str = "vectors.bin";
pub const CHUNKS_FILE: &str = "chunks.json";

/// Flat index of equal-length vectors, each paired with the chunk text it
/// embeds. Position `i` in the vector table always corresponds to chunk `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexStore {
    dimension: usize,
    values: Vec<f32>,
    chunks: Vec<String>,
}

/// One search result, borrowed from the store it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit<'a> {
    pub position: usize,
    /// Squared Euclidean distance to the query
    pub distance: f32,
    pub chunk: &'a str,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f32,
    position: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.position.cmp(&other.position))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl IndexStore {
    /// Build an in-memory index from parallel vector and chunk sequences
    #[inline]
    pub fn build(vectors: Vec<Vec<f32>>, chunks: Vec<String>) -> Result<Self> {
        if vectors.len() != chunks.len() {
            return Err(KnowledgeError::CountMismatch {
                vectors: vectors.len(),
                chunks: chunks.len(),
            });
        }
        let dimension = common_dimension(&vectors)?;
        if dimension == 0 && !vectors.is_empty() {
            return Err(KnowledgeError::DimensionMismatch {
                expected: 1,
                actual: 0,
            });
        }
        let values = vectors.into_iter().flatten().collect();

        Ok(Self {
            dimension,
            values,
            chunks,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Dimensionality of every stored vector; 0 for an empty index
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    #[inline]
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        (position < self.len()).then(|| self.row(position))
    }

    /// Return up to `k` chunks nearest to `query`, nearest first.
    ///
    /// Distance is squared L2 over every stored vector. Equal distances are
    /// ordered by ascending position, so results are fully deterministic.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit<'_>>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(KnowledgeError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let k = k.min(self.len());
        let mut heap = BinaryHeap::with_capacity(k);
        for position in 0..self.len() {
            let candidate = Candidate {
                distance: squared_l2(query, self.row(position)),
                position,
            };
            if heap.len() < k {
                heap.push(candidate);
            } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                heap.pop();
                heap.push(candidate);
            }
        }

        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| SearchHit {
                position: c.position,
                distance: c.distance,
                chunk: &self.chunks[c.position],
            })
            .collect())
    }

    /// Write this index as a new generation of the knowledge base at `path`
    /// and make it current. Returns the generation name.
    ///
    /// Until the final pointer swap, a failure leaves whatever was current
    /// before untouched.
    #[inline]
    pub fn persist(&self, path: &Path) -> Result<String> {
        fs::create_dir_all(path)?;
        let _lock = KnowledgeBaseLock::exclusive(path)?;

        let generation = generation::new_generation_name();
        let generation_dir = path.join(&generation);
        debug!(
            "Writing {} vectors to {}",
            self.len(),
            generation_dir.display()
        );

        let written = self
            .write_artifacts(&generation_dir)
            .and_then(|()| generation::publish(path, &generation));
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_dir_all(&generation_dir) {
                warn!(
                    "Failed to remove partial generation {}: {}",
                    generation_dir.display(),
                    cleanup
                );
            }
            return Err(e);
        }

        generation::remove_stale(path, &generation);
        info!(
            "Persisted knowledge base {} ({} chunks, dimension {}, generation {})",
            path.display(),
            self.len(),
            self.dimension,
            generation
        );
        Ok(generation)
    }

    /// Load the current generation of the knowledge base at `path`
    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_generation(path).map(|(store, _)| store)
    }

    /// Whether `path` holds a published knowledge base
    #[inline]
    pub fn exists(path: &Path) -> bool {
        generation::has_current(path)
    }

    #[inline]
    pub fn describe(path: &Path) -> Result<KnowledgeBaseInfo> {
        let (store, generation) = Self::load_with_generation(path)?;
        Ok(KnowledgeBaseInfo {
            path: path.to_path_buf(),
            generation,
            chunk_count: store.len(),
            dimension: store.dimension,
        })
    }

    fn load_with_generation(path: &Path) -> Result<(Self, String)> {
        if !generation::has_current(path) {
            return Err(KnowledgeError::KnowledgeBaseNotFound(path.to_path_buf()));
        }
        let _lock = KnowledgeBaseLock::shared(path)?;

        let generation = generation::read_current(path)?;
        let generation_dir = path.join(&generation);
        let vectors_path = generation_dir.join(VECTORS_FILE);
        let chunks_path = generation_dir.join(CHUNKS_FILE);
        if !vectors_path.is_file() || !chunks_path.is_file() {
            return Err(KnowledgeError::KnowledgeBaseNotFound(path.to_path_buf()));
        }

        let decoded = codec::read_vectors(&read_artifact(&vectors_path)?)?;
        let chunks: Vec<String> = serde_json::from_slice(&read_artifact(&chunks_path)?)
            .map_err(|e| KnowledgeError::CorruptIndex(format!("invalid chunk file: {}", e)))?;

        if decoded.count != chunks.len() {
            return Err(KnowledgeError::CorruptIndex(format!(
                "{} vectors stored for {} chunks",
                decoded.count,
                chunks.len()
            )));
        }

        debug!(
            "Loaded generation {} from {} ({} chunks)",
            generation,
            path.display(),
            chunks.len()
        );
        Ok((
            Self {
                dimension: if chunks.is_empty() { 0 } else { decoded.dimension },
                values: decoded.values,
                chunks,
            },
            generation,
        ))
    }

    fn write_artifacts(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;

        let mut vectors = BufWriter::new(File::create(dir.join(VECTORS_FILE))?);
        codec::write_vectors(&mut vectors, self.dimension, self.len(), &self.values)?;
        vectors.flush()?;
        vectors.get_ref().sync_all()?;

        let mut chunks = BufWriter::new(File::create(dir.join(CHUNKS_FILE))?);
        serde_json::to_writer(&mut chunks, &self.chunks).map_err(std::io::Error::from)?;
        chunks.flush()?;
        chunks.get_ref().sync_all()?;

        generation::sync_dir(dir)?;
        Ok(())
    }

    fn row(&self, position: usize) -> &[f32] {
        let start = position * self.dimension;
        &self.values[start..start + self.dimension]
    }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| {
        KnowledgeError::CorruptIndex(format!("unreadable {}: {}", path.display(), e))
    })
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
