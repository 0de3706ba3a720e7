//! Batch-level tree over per-record commitment roots.

use super::MerkleError;
use super::tree::{MerkleProof, MerkleTree};
use crate::crypto::Hash;

/// Aggregate tree over the commitment roots of one batch.
///
/// The root is independent of the order roots are supplied in. Proofs are
/// addressed by the caller's index into the supplied sequence.
#[derive(Debug, Clone)]
pub struct AggregateTree {
    tree: MerkleTree,
    supplied: Vec<Hash>,
}

impl AggregateTree {
    /// Builds the aggregate tree.
    ///
    /// # Errors
    ///
    /// Returns [`MerkleError::EmptyTree`] if `roots` is empty.
    pub fn build(roots: &[Hash]) -> Result<Self, MerkleError> {
        let tree = MerkleTree::from_leaves(roots.to_vec())?;
        Ok(Self {
            tree,
            supplied: roots.to_vec(),
        })
    }

    /// The aggregate root.
    #[must_use]
    pub fn root(&self) -> Hash {
        self.tree.root()
    }

    /// Number of commitment roots in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.supplied.len()
    }

    /// Always `false`; an aggregate tree cannot be empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.supplied.is_empty()
    }

    /// Commitment root at `index` in the supplied order.
    #[must_use]
    pub fn root_at(&self, index: usize) -> Option<Hash> {
        self.supplied.get(index).copied()
    }

    /// Inclusion proof for the commitment root at `index` in the supplied
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`MerkleError::IndexOutOfRange`] if `index` is past the end of
    /// the batch.
    pub fn proof_for(&self, index: usize) -> Result<MerkleProof, MerkleError> {
        let root = self
            .supplied
            .get(index)
            .ok_or(MerkleError::IndexOutOfRange {
                index,
                len: self.supplied.len(),
            })?;
        self.tree.proof_for_leaf(root)
    }

    /// Inclusion proof for a commitment root by value.
    ///
    /// # Errors
    ///
    /// Returns [`MerkleError::LeafNotFound`] if `root` is not in the batch.
    pub fn proof_for_root(&self, root: &Hash) -> Result<MerkleProof, MerkleError> {
        self.tree.proof_for_leaf(root)
    }
}
