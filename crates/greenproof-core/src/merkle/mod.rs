//! Two-tier Merkle commitments ("precise proofs").
//!
//! - [`FieldTree`]: one tree per record. Each top-level field becomes the leaf
//!   `blake3(field_name || canonical_value)`; the root commits to every field
//!   and a [`PreciseProof`] discloses exactly one of them.
//! - [`AggregateTree`]: one tree per batch. Leaves are the per-record
//!   commitment roots; the root is the value workers vote on.
//!
//! # Construction
//!
//! Both tiers share [`MerkleTree`]:
//!
//! 1. Leaves are sorted by digest before pairing, so the root does not depend
//!    on field insertion order or on the order a batch was enumerated in.
//! 2. Each leaf enters the tree as `blake3(LEAF_TAG || leaf)` ([`hash_leaf`]).
//! 3. Adjacent nodes are combined as `blake3(NODE_TAG || left || right)`
//!    ([`hash_node`]).
//! 4. An unpaired node at the end of a level is promoted unchanged to the next
//!    level. Proofs skip the levels at which their path was promoted.
//!
//! The two tags keep leaves and internal nodes apart: a subtree root can never
//! be passed off as a leaf with a shortened proof.
//!
//! # Verification
//!
//! [`verify_proof`] takes the raw leaf (a field leaf or a commitment root),
//! applies the leaf tag, folds the [`MerkleProof`] upward and compares the
//! result to the expected root. It is the only call the issuance side
//! needs to accept a disclosed field.

mod aggregate;
mod precise;
mod tree;

use thiserror::Error;

pub use aggregate::AggregateTree;
pub use precise::{FieldLeaf, FieldTree, PreciseProof, field_leaf};
pub use tree::{
    MAX_PROOF_DEPTH, MerkleProof, MerkleTree, ProofStep, hash_leaf, hash_node, verify_proof,
};

/// Errors produced when building trees or extracting proofs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MerkleError {
    /// A tree was requested over zero leaves.
    #[error("cannot build a merkle tree without leaves")]
    EmptyTree,

    /// A proof was requested for a field the record does not contain.
    #[error("field not found: {field}")]
    FieldNotFound {
        /// The requested field name.
        field: String,
    },

    /// A proof was requested for a position outside the supplied batch.
    #[error("index {index} out of range for batch of {len}")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of leaves in the batch.
        len: usize,
    },

    /// A proof was requested for a leaf that is not in the tree.
    #[error("leaf not found in tree")]
    LeafNotFound,

    /// A proof exceeds the maximum supported depth.
    #[error("proof depth {depth} exceeds maximum {max}")]
    ProofTooDeep {
        /// Number of steps in the proof.
        depth: usize,
        /// Maximum allowed.
        max: usize,
    },
}
