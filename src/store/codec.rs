//! Binary layout of `vectors.bin`.
//!
//! Little-endian header of four `u32` words (magic, format version,
//! dimension, vector count) followed by `count * dimension` `f32` values in
//! row-major order.

use std::io::Write;

use crate::{KnowledgeError, Result};

const MAGIC: u32 = u32::from_le_bytes(*b"AKBV");
const VERSION: u32 = 1;
const HEADER_LEN: usize = 16;
const VALUE_LEN: usize = size_of::<f32>();

pub(super) fn write_vectors<W: Write>(
    writer: &mut W,
    dimension: usize,
    count: usize,
    values: &[f32],
) -> Result<()> {
    let dimension_word = u32::try_from(dimension)
        .map_err(|_| anyhow::anyhow!("Vector dimension {} does not fit the index format", dimension))?;
    let count_word = u32::try_from(count)
        .map_err(|_| anyhow::anyhow!("Vector count {} does not fit the index format", count))?;

    writer.write_all(&MAGIC.to_le_bytes())?;
    writer.write_all(&VERSION.to_le_bytes())?;
    writer.write_all(&dimension_word.to_le_bytes())?;
    writer.write_all(&count_word.to_le_bytes())?;
    for value in values {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

/// Decoded contents of `vectors.bin`
#[derive(Debug)]
pub(super) struct DecodedVectors {
    pub dimension: usize,
    pub count: usize,
    pub values: Vec<f32>,
}

pub(super) fn read_vectors(bytes: &[u8]) -> Result<DecodedVectors> {
    if bytes.len() < HEADER_LEN {
        return Err(KnowledgeError::CorruptIndex(format!(
            "vector file is {} bytes, shorter than its header",
            bytes.len()
        )));
    }

    let magic = read_u32(bytes, 0);
    if magic != MAGIC {
        return Err(KnowledgeError::CorruptIndex(format!(
            "invalid vector file magic {:#X} (expected {:#X})",
            magic, MAGIC
        )));
    }

    let version = read_u32(bytes, 4);
    if version != VERSION {
        return Err(KnowledgeError::CorruptIndex(format!(
            "unsupported vector file version {}",
            version
        )));
    }

    let dimension = read_u32(bytes, 8) as usize;
    let count = read_u32(bytes, 12) as usize;
    if dimension == 0 && count > 0 {
        return Err(KnowledgeError::CorruptIndex(format!(
            "{} vectors stored with dimension 0",
            count
        )));
    }

    let expected_len = dimension
        .checked_mul(count)
        .and_then(|n| n.checked_mul(VALUE_LEN))
        .and_then(|n| n.checked_add(HEADER_LEN));
    if expected_len != Some(bytes.len()) {
        return Err(KnowledgeError::CorruptIndex(format!(
            "vector file is {} bytes, expected {:?} for {} vectors of dimension {}",
            bytes.len(),
            expected_len,
            count,
            dimension
        )));
    }

    let values = bytes[HEADER_LEN..]
        .chunks_exact(VALUE_LEN)
        .map(|word| f32::from_le_bytes([word[0], word[1], word[2], word[3]]))
        .collect();

    Ok(DecodedVectors {
        dimension,
        count,
        values,
    })
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(word)
}
