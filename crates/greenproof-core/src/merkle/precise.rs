//! Per-record commitment trees and single-field disclosures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::MerkleError;
use super::tree::{MerkleProof, MerkleTree, verify_proof};
use crate::crypto::{Hash, hash_concat, serde_hex};
use crate::determinism::{Record, canonical_value};

/// Computes the leaf for a field: `blake3(field_name || canonical_value)`.
#[must_use]
pub fn field_leaf(field: &str, canonical_value: &str) -> Hash {
    hash_concat(&[field.as_bytes(), canonical_value.as_bytes()])
}

/// A committed field and its leaf hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLeaf {
    /// Field name.
    pub field: String,
    /// Canonical text of the field value.
    pub value: String,
    /// Leaf hash.
    #[serde(with = "serde_hex")]
    pub leaf: Hash,
}

/// Everything needed to disclose one field against a commitment root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreciseProof {
    /// Field name.
    pub field: String,
    /// Canonical text of the field value.
    pub value: String,
    /// Leaf hash.
    #[serde(with = "serde_hex")]
    pub leaf: Hash,
    /// Path from the leaf to the commitment root.
    pub proof: MerkleProof,
}

impl PreciseProof {
    /// Checks that `field` and `value` hash to `leaf` and that `leaf` is
    /// committed under `root`.
    #[must_use]
    pub fn verify(&self, root: &Hash) -> bool {
        field_leaf(&self.field, &self.value) == self.leaf
            && verify_proof(root, &self.leaf, &self.proof)
    }
}

/// Commitment tree over the top-level fields of a [`Record`].
///
/// Fields whose value has no canonical form are not committed.
#[derive(Debug, Clone)]
pub struct FieldTree {
    tree: MerkleTree,
    fields: BTreeMap<String, FieldLeaf>,
}

impl FieldTree {
    /// Builds the commitment tree for `record`.
    ///
    /// # Errors
    ///
    /// Returns [`MerkleError::EmptyTree`] if the record has no supported
    /// fields.
    pub fn build(record: &Record) -> Result<Self, MerkleError> {
        let fields: BTreeMap<String, FieldLeaf> = record
            .iter()
            .filter_map(|(name, value)| {
                let value = canonical_value(value)?;
                let leaf = field_leaf(name, &value);
                Some((
                    name.to_owned(),
                    FieldLeaf {
                        field: name.to_owned(),
                        value,
                        leaf,
                    },
                ))
            })
            .collect();

        let tree = MerkleTree::from_leaves(fields.values().map(|f| f.leaf).collect())?;
        Ok(Self { tree, fields })
    }

    /// The commitment root.
    #[must_use]
    pub fn root(&self) -> Hash {
        self.tree.root()
    }

    /// Committed fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldLeaf> {
        self.fields.values()
    }

    /// Leaf hash for `field`.
    ///
    /// # Errors
    ///
    /// Returns [`MerkleError::FieldNotFound`] if the field is absent or was
    /// not committed.
    pub fn leaf_for(&self, field: &str) -> Result<Hash, MerkleError> {
        self.entry(field).map(|f| f.leaf)
    }

    /// Sibling path from `field`'s leaf to the root.
    ///
    /// # Errors
    ///
    /// Returns [`MerkleError::FieldNotFound`] if the field is absent or was
    /// not committed.
    pub fn proof_for(&self, field: &str) -> Result<MerkleProof, MerkleError> {
        let entry = self.entry(field)?;
        self.tree.proof_for_leaf(&entry.leaf)
    }

    /// Disclosure bundle for `field`.
    ///
    /// # Errors
    ///
    /// Returns [`MerkleError::FieldNotFound`] if the field is absent or was
    /// not committed.
    pub fn precise_proof(&self, field: &str) -> Result<PreciseProof, MerkleError> {
        let entry = self.entry(field)?;
        Ok(PreciseProof {
            field: entry.field.clone(),
            value: entry.value.clone(),
            leaf: entry.leaf,
            proof: self.tree.proof_for_leaf(&entry.leaf)?,
        })
    }

    /// Disclosure bundles for every committed field, in name order.
    ///
    /// # Errors
    ///
    /// Propagates [`MerkleTree::proof_for_leaf`] failures, which cannot occur
    /// for leaves taken from this tree.
    pub fn precise_proofs(&self) -> Result<Vec<PreciseProof>, MerkleError> {
        self.fields
            .keys()
            .map(|field| self.precise_proof(field))
            .collect()
    }

    fn entry(&self, field: &str) -> Result<&FieldLeaf, MerkleError> {
        self.fields.get(field).ok_or_else(|| MerkleError::FieldNotFound {
            field: field.to_owned(),
        })
    }
}
