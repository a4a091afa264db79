//! Exact brute-force [`VectorIndex`] implementation.
//!
//! No graph, no approximation: `search` scores every stored vector against
//! the query and keeps the best `k`. Good enough to serve as the one
//! concrete engine behind both the `flat` and `hnsw` CLI index types.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::IndexError,
    index::{Neighbor, SimilarityMethod, VectorIndex},
};

/// Exact linear-scan vector index.
#[derive(Debug)]
pub struct FlatIndex {
    dims: usize,
    method: SimilarityMethod,
    vectors: HashMap<u64, Vec<f32>>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotEntry {
    id: u64,
    vector: Vec<f32>,
}

impl FlatIndex {
    /// Allocate an empty index for `dims`-dimensional vectors.
    #[must_use]
    pub fn alloc(dims: usize, method: SimilarityMethod) -> Self {
        Self { dims, method, vectors: HashMap::new() }
    }

    /// Load a checkpoint previously written by [`VectorIndex::export`].
    ///
    /// # Errors
    ///
    /// [`IndexError::System`] if the file cannot be opened or does not
    /// contain a valid snapshot.
    pub fn import(path: &Path, dims: usize, method: SimilarityMethod) -> Result<Self, IndexError> {
        let file = File::open(path).map_err(|err| IndexError::System(err.to_string()))?;
        let entries: Vec<SnapshotEntry> = ciborium::de::from_reader(BufReader::new(file))
            .map_err(|err| IndexError::System(err.to_string()))?;

        let mut vectors = HashMap::with_capacity(entries.len());
        for entry in entries {
            if entry.vector.len() != dims {
                return Err(IndexError::InvalidDims { expected: dims, actual: entry.vector.len() });
            }
            vectors.insert(entry.id, entry.vector);
        }
        Ok(Self { dims, method, vectors })
    }

    fn distance(&self, query: &[f32], candidate: &[f32]) -> f32 {
        match self.method {
            SimilarityMethod::Cosine => {
                let dot: f32 = query.iter().zip(candidate).map(|(a, b)| a * b).sum();
                let qn: f32 = query.iter().map(|v| v * v).sum::<f32>().sqrt();
                let cn: f32 = candidate.iter().map(|v| v * v).sum::<f32>().sqrt();
                if qn == 0.0 || cn == 0.0 { 1.0 } else { 1.0 - dot / (qn * cn) }
            },
            SimilarityMethod::DotProduct => -query.iter().zip(candidate).map(|(a, b)| a * b).sum::<f32>(),
            SimilarityMethod::L2Norm => {
                query.iter().zip(candidate).map(|(a, b)| (a - b) * (a - b)).sum()
            },
        }
    }
}

impl VectorIndex for FlatIndex {
    fn insert(&mut self, id: u64, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() != self.dims {
            return Err(IndexError::InvalidDims { expected: self.dims, actual: vector.len() });
        }
        if self.vectors.contains_key(&id) {
            return Err(IndexError::Duplicate(id));
        }
        self.vectors.insert(id, vector.to_vec());
        Ok(())
    }

    fn delete(&mut self, id: u64) -> Result<(), IndexError> {
        self.vectors.remove(&id).map(|_| ()).ok_or(IndexError::NotFound(id))
    }

    fn search(&self, vector: &[f32], k: u32) -> Result<Vec<Neighbor>, IndexError> {
        if vector.len() != self.dims {
            return Err(IndexError::InvalidDims { expected: self.dims, actual: vector.len() });
        }
        let mut scored: Vec<Neighbor> = self
            .vectors
            .iter()
            .map(|(&id, candidate)| Neighbor { id, distance: self.distance(vector, candidate) })
            .collect();
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
        scored.truncate(k as usize);
        Ok(scored)
    }

    fn size(&self) -> u64 {
        self.vectors.len() as u64
    }

    fn dims(&self) -> usize {
        self.dims
    }

    fn export(&self, path: &Path) -> Result<(), IndexError> {
        let file = File::create(path).map_err(|err| IndexError::System(err.to_string()))?;
        ciborium::ser::into_writer(&serialize_entries(&self.vectors), BufWriter::new(file))
            .map_err(|err| IndexError::System(err.to_string()))?;
        Ok(())
    }
}

fn serialize_entries(vectors: &HashMap<u64, Vec<f32>>) -> Vec<SnapshotEntry> {
    vectors.iter().map(|(&id, vector)| SnapshotEntry { id, vector: vector.clone() }).collect()
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn insert_then_search_returns_nearest_first() {
        let mut index = FlatIndex::alloc(2, SimilarityMethod::L2Norm);
        index.insert(1, &[0.0, 0.0]).unwrap();
        index.insert(2, &[10.0, 10.0]).unwrap();
        index.insert(3, &[1.0, 0.0]).unwrap();

        let results = index.search(&[0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 1);
        assert_eq!(results[1].id, 3);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut index = FlatIndex::alloc(2, SimilarityMethod::Cosine);
        index.insert(1, &[1.0, 0.0]).unwrap();
        assert_eq!(index.insert(1, &[0.0, 1.0]), Err(IndexError::Duplicate(1)));
    }

    #[test]
    fn dimension_mismatch_is_rejected_on_insert_and_search() {
        let mut index = FlatIndex::alloc(3, SimilarityMethod::Cosine);
        assert_eq!(index.insert(1, &[1.0, 0.0]), Err(IndexError::InvalidDims { expected: 3, actual: 2 }));
        assert_eq!(
            index.search(&[1.0, 0.0], 1),
            Err(IndexError::InvalidDims { expected: 3, actual: 2 })
        );
    }

    #[test]
    fn delete_missing_id_is_not_found() {
        let mut index = FlatIndex::alloc(2, SimilarityMethod::Cosine);
        assert_eq!(index.delete(42), Err(IndexError::NotFound(42)));
    }

    #[test]
    fn export_then_import_round_trips_vectors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db.index");

        let mut index = FlatIndex::alloc(2, SimilarityMethod::DotProduct);
        index.insert(1, &[1.0, 2.0]).unwrap();
        index.insert(2, &[3.0, 4.0]).unwrap();
        index.export(&path).unwrap();

        let reloaded = FlatIndex::import(&path, 2, SimilarityMethod::DotProduct).unwrap();
        assert_eq!(reloaded.size(), 2);
        assert_eq!(reloaded.search(&[1.0, 2.0], 1).unwrap()[0].id, 1);
    }
}
