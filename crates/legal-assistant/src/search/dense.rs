use anyhow::{ensure, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use ndarray::{Array2, ArrayView1};

use crate::storage::IndexLoadError;

const MAGIC: &[u8; 8] = b"LAWDENSE";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 8 + 4 + 4 + 8;

/// Exact inner-product index over row vectors. With unit-normalized embeddings
/// the score is cosine similarity.
#[derive(Debug, Clone)]
pub struct DenseIndex {
    vectors: Array2<f32>,
}

impl DenseIndex {
    pub fn empty(dimension: usize) -> Self {
        Self {
            vectors: Array2::zeros((0, dimension)),
        }
    }

    pub fn from_embeddings(dimension: usize, embeddings: Vec<Vec<f32>>) -> Result<Self> {
        let rows = embeddings.len();
        let mut flat = Vec::with_capacity(rows * dimension);
        for (i, embedding) in embeddings.into_iter().enumerate() {
            ensure!(
                embedding.len() == dimension,
                "Embedding {} has dimension {}, expected {}",
                i,
                embedding.len(),
                dimension
            );
            flat.extend(embedding);
        }
        Ok(Self {
            vectors: Array2::from_shape_vec((rows, dimension), flat)?,
        })
    }

    pub fn len(&self) -> usize {
        self.vectors.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    /// Top `k` rows by inner product with `query`, best first. Equal scores
    /// keep row order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if k == 0 || self.is_empty() || query.len() != self.dimension() {
            return Vec::new();
        }
        let scores = self.vectors.dot(&ArrayView1::from(query));
        let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(k);
        ranked
    }

    /// Binary layout: magic, version u32, dimension u32, count u64, then
    /// `count * dimension` little-endian f32 values.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.vectors.len() * 4);
        buf.put_slice(MAGIC);
        buf.put_u32_le(FORMAT_VERSION);
        buf.put_u32_le(self.dimension() as u32);
        buf.put_u64_le(self.len() as u64);
        for value in self.vectors.iter() {
            buf.put_f32_le(*value);
        }
        buf.freeze()
    }

    pub fn from_bytes(mut data: &[u8]) -> Result<Self, IndexLoadError> {
        if data.len() < HEADER_LEN || &data[..MAGIC.len()] != MAGIC {
            return Err(IndexLoadError::BadHeader);
        }
        data.advance(MAGIC.len());
        if data.get_u32_le() != FORMAT_VERSION {
            return Err(IndexLoadError::BadHeader);
        }
        let dimension = data.get_u32_le() as usize;
        let count = data.get_u64_le() as usize;

        let expected = count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(4))
            .ok_or(IndexLoadError::BadHeader)?;
        if data.remaining() != expected {
            return Err(IndexLoadError::Truncated {
                expected,
                found: data.remaining(),
            });
        }

        let mut flat = Vec::with_capacity(count * dimension);
        while data.has_remaining() {
            flat.push(data.get_f32_le());
        }
        let vectors = Array2::from_shape_vec((count, dimension), flat)
            .map_err(|_| IndexLoadError::BadHeader)?;
        Ok(Self { vectors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DenseIndex {
        DenseIndex::from_embeddings(
            2,
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.6, 0.8], vec![1.0, 0.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_search_orders_by_inner_product() {
        let hits = sample().search(&[1.0, 0.0], 3);
        let positions: Vec<usize> = hits.iter().map(|h| h.0).collect();
        assert_eq!(positions, vec![0, 3, 2]);
    }

    #[test]
    fn test_search_guards() {
        let index = sample();
        assert!(index.search(&[1.0, 0.0], 0).is_empty());
        assert!(index.search(&[1.0, 0.0, 0.0], 3).is_empty());
        assert!(DenseIndex::empty(2).search(&[1.0, 0.0], 3).is_empty());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        assert!(DenseIndex::from_embeddings(3, vec![vec![1.0, 0.0]]).is_err());
    }

    #[test]
    fn test_bytes_round_trip() {
        let index = sample();
        let restored = DenseIndex::from_bytes(&index.to_bytes()).unwrap();
        assert_eq!(restored.len(), 4);
        assert_eq!(restored.dimension(), 2);
        assert_eq!(restored.search(&[0.0, 1.0], 1), index.search(&[0.0, 1.0], 1));
    }

    #[test]
    fn test_truncated_or_foreign_bytes_rejected() {
        let bytes = sample().to_bytes();
        assert!(matches!(
            DenseIndex::from_bytes(&bytes[..bytes.len() - 4]),
            Err(IndexLoadError::Truncated { .. })
        ));
        assert!(matches!(
            DenseIndex::from_bytes(b"not an index at all, definitely"),
            Err(IndexLoadError::BadHeader)
        ));
    }
}
