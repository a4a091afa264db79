//! Vector-index collaborator: `alloc/import/export/insert/delete/search/size`.
//!
//! The index data structure itself (HNSW's graph, FLAT's plain scan) is an
//! opaque collaborator; [`flat`] supplies the one concrete, in-process
//! implementation this workspace ships so the index server is end-to-end
//! runnable and testable. `destroy()` from the collaborator interface has no
//! counterpart here: a Rust value's `Drop` impl plays that role.

pub mod flat;

use std::path::Path;

pub use flat::FlatIndex;

use crate::error::IndexError;

/// Similarity method an index was allocated with (CLI `-m`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityMethod {
    /// `1 - cosine_similarity`: ascending distance, 0.0 = identical direction.
    Cosine,
    /// `-dot_product`: ascending distance surfaces the highest dot product.
    DotProduct,
    /// Squared Euclidean distance: naturally ascending.
    L2Norm,
}

impl SimilarityMethod {
    /// Parse the CLI `-m` value. Accepts `cosine`, `dotp`, `l2norm`.
    pub fn parse(raw: &str) -> Result<Self, IndexError> {
        match raw {
            "cosine" => Ok(Self::Cosine),
            "dotp" => Ok(Self::DotProduct),
            "l2norm" => Ok(Self::L2Norm),
            other => Err(IndexError::System(format!("unknown similarity method `{other}`"))),
        }
    }
}

/// Index structure kind an index was allocated with (CLI `-t`).
///
/// Both values resolve to [`FlatIndex`]: the approximate HNSW graph itself
/// is out of scope for this workspace, so `-t hnsw` runs the same exact
/// engine as `-t flat` rather than a real approximate structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Exact brute-force scan.
    Flat,
    /// Approximate nearest-neighbor graph. Maps to the same exact engine.
    Hnsw,
}

impl IndexKind {
    /// Parse the CLI `-t` value. Accepts `flat`, `hnsw`.
    pub fn parse(raw: &str) -> Result<Self, IndexError> {
        match raw {
            "flat" => Ok(Self::Flat),
            "hnsw" => Ok(Self::Hnsw),
            other => Err(IndexError::System(format!("unknown index type `{other}`"))),
        }
    }
}

/// One ranked search result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Identifier of the matched vector.
    pub id: u64,
    /// Distance under the index's configured [`SimilarityMethod`]. Smaller
    /// is always more similar; see [`SimilarityMethod`] for how each method
    /// is mapped onto that convention.
    pub distance: f32,
}

/// The opaque vector-index collaborator interface.
pub trait VectorIndex: Send {
    /// Insert `(id, vector)`. `vector.len()` is already validated against
    /// `dims()` by the caller; implementations should still reject a
    /// mismatch defensively with [`IndexError::InvalidDims`].
    ///
    /// # Errors
    ///
    /// [`IndexError::Duplicate`] if `id` already exists,
    /// [`IndexError::InvalidDims`] on a dimension mismatch.
    fn insert(&mut self, id: u64, vector: &[f32]) -> Result<(), IndexError>;

    /// Remove `id`.
    ///
    /// # Errors
    ///
    /// [`IndexError::NotFound`] if `id` does not exist.
    fn delete(&mut self, id: u64) -> Result<(), IndexError>;

    /// Return up to `k` nearest neighbors to `vector`, ascending by distance.
    ///
    /// # Errors
    ///
    /// [`IndexError::InvalidDims`] on a dimension mismatch.
    fn search(&self, vector: &[f32], k: u32) -> Result<Vec<Neighbor>, IndexError>;

    /// Number of vectors currently stored.
    fn size(&self) -> u64;

    /// Dimensionality this index was allocated with.
    fn dims(&self) -> usize;

    /// Write the full committed state to `path` (checkpoint export).
    ///
    /// # Errors
    ///
    /// [`IndexError::System`] on I/O or serialization failure.
    fn export(&self, path: &Path) -> Result<(), IndexError>;
}
