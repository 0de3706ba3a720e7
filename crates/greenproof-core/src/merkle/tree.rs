//! Sorted-leaf binary Merkle tree with promote-on-odd levels.

use serde::{Deserialize, Serialize};

use super::MerkleError;
use crate::crypto::{Hash, hash_concat, serde_hex};

// ──────────────────────────────────────────────────────────────
// Domain separation constants
// ──────────────────────────────────────────────────────────────

/// Domain separator for the bottom level of a tree.
const LEAF_DOMAIN_SEPARATOR: &[u8] = b"greenproof:merkle_leaf:v1\0";

/// Domain separator for internal nodes.
const NODE_DOMAIN_SEPARATOR: &[u8] = b"greenproof:merkle_node:v1\0";

/// Maximum number of steps accepted in a proof.
///
/// A 64-step proof already covers more leaves than can be addressed.
pub const MAX_PROOF_DEPTH: usize = 64;

/// Hashes a leaf into its bottom-level node.
///
/// Leaves and internal nodes live in separate domains, so an internal node
/// presented as a leaf never reproduces the root.
#[must_use]
pub fn hash_leaf(leaf: &Hash) -> Hash {
    hash_concat(&[LEAF_DOMAIN_SEPARATOR, leaf.as_slice()])
}

/// Hashes two child nodes into their parent.
#[must_use]
pub fn hash_node(left: &Hash, right: &Hash) -> Hash {
    hash_concat(&[NODE_DOMAIN_SEPARATOR, left.as_slice(), right.as_slice()])
}

/// One sibling on the path from a leaf to the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProofStep {
    /// Hash of the sibling node.
    #[serde(with = "serde_hex")]
    pub hash: Hash,
    /// Whether the sibling is on the left side.
    pub is_left: bool,
}

/// Inclusion proof for one leaf.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Siblings ordered from leaf level to just below the root.
    pub steps: Vec<ProofStep>,
}

impl MerkleProof {
    /// Recomputes the root implied by `leaf` and this proof.
    ///
    /// # Errors
    ///
    /// Returns [`MerkleError::ProofTooDeep`] if the proof has more than
    /// [`MAX_PROOF_DEPTH`] steps.
    pub fn compute_root(&self, leaf: &Hash) -> Result<Hash, MerkleError> {
        if self.steps.len() > MAX_PROOF_DEPTH {
            return Err(MerkleError::ProofTooDeep {
                depth: self.steps.len(),
                max: MAX_PROOF_DEPTH,
            });
        }

        let root = self.steps.iter().fold(hash_leaf(leaf), |current, step| {
            if step.is_left {
                hash_node(&step.hash, &current)
            } else {
                hash_node(&current, &step.hash)
            }
        });
        Ok(root)
    }

    /// Number of steps in the proof.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` for the proof of a single-leaf tree.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Returns `true` if `proof` links `leaf` to `root`.
#[must_use]
pub fn verify_proof(root: &Hash, leaf: &Hash, proof: &MerkleProof) -> bool {
    proof.compute_root(leaf).is_ok_and(|computed| computed == *root)
}

/// A binary Merkle tree over digest-sorted leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    /// Sorted leaves as supplied.
    leaves: Vec<Hash>,
    /// `levels[0]` holds the leaf nodes; the last level holds the root.
    levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
    /// Builds a tree over `leaves`, sorting them first.
    ///
    /// Duplicate leaves are kept.
    ///
    /// # Errors
    ///
    /// Returns [`MerkleError::EmptyTree`] if `leaves` is empty.
    pub fn from_leaves(mut leaves: Vec<Hash>) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyTree);
        }
        leaves.sort_unstable();

        let mut levels = vec![leaves.iter().map(hash_leaf).collect::<Vec<_>>()];
        while let Some(current) = levels.last().filter(|level| level.len() > 1) {
            let next = current
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_node(left, right),
                    [single] => *single,
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            levels.push(next);
        }

        Ok(Self { leaves, levels })
    }

    /// Returns the root hash.
    #[must_use]
    pub fn root(&self) -> Hash {
        // levels is never empty and the last level has exactly one node
        self.levels[self.levels.len() - 1][0]
    }

    /// Returns the leaves in sorted order.
    #[must_use]
    pub fn leaves(&self) -> &[Hash] {
        &self.leaves
    }

    /// Sorted position of `leaf`, if present.
    #[must_use]
    pub fn position_of(&self, leaf: &Hash) -> Option<usize> {
        self.leaves.binary_search(leaf).ok()
    }

    /// Builds the proof for the leaf at sorted `position`.
    ///
    /// # Errors
    ///
    /// Returns [`MerkleError::IndexOutOfRange`] if `position` is past the
    /// last leaf.
    pub fn proof_at(&self, position: usize) -> Result<MerkleProof, MerkleError> {
        let len = self.leaves.len();
        if position >= len {
            return Err(MerkleError::IndexOutOfRange {
                index: position,
                len,
            });
        }

        let mut steps = Vec::with_capacity(self.levels.len() - 1);
        let mut index = position;
        for level in &self.levels[..self.levels.len() - 1] {
            if index % 2 == 1 {
                steps.push(ProofStep {
                    hash: level[index - 1],
                    is_left: true,
                });
            } else if let Some(sibling) = level.get(index + 1) {
                steps.push(ProofStep {
                    hash: *sibling,
                    is_left: false,
                });
            }
            index /= 2;
        }

        Ok(MerkleProof { steps })
    }

    /// Builds the proof for `leaf`.
    ///
    /// # Errors
    ///
    /// Returns [`MerkleError::LeafNotFound`] if `leaf` is not in the tree.
    pub fn proof_for_leaf(&self, leaf: &Hash) -> Result<MerkleProof, MerkleError> {
        let position = self.position_of(leaf).ok_or(MerkleError::LeafNotFound)?;
        self.proof_at(position)
    }
}
