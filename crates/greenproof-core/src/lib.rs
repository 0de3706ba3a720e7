//! Greenproof consensus-and-integrity core.
//!
//! A federation of permissioned workers computes the energy match for a
//! timeframe, commits the result as a two-tier Merkle root, and votes that
//! root into a timeframe-scoped majority round. The finalized root is the
//! match output that downstream issuance consumes, together with precise
//! (single-field) proofs against the per-record commitment roots.
//!
//! # Layers
//!
//! - [`determinism`]: order-independent canonical encoding of records
//! - [`merkle`]: field-level commitment trees and batch aggregate trees
//! - [`registry`]: the authorized worker set
//! - [`voting`]: the consensus engine and its round state machine
//! - [`economics`]: the reward pool and winner payouts
//! - [`config`]: engine configuration
//! - [`snapshot`]: persisted engine state
//!
//! # Example
//!
//! ```
//! use greenproof_core::determinism::Record;
//! use greenproof_core::merkle::{AggregateTree, FieldTree, verify_proof};
//! use serde_json::json;
//!
//! let consumption = Record::from_json(json!({ "id": "c-1", "volume": 120 }));
//! let generation = Record::from_json(json!({ "id": "g-7", "volume": 150 }));
//!
//! let consumption_tree = FieldTree::build(&consumption).unwrap();
//! let generation_tree = FieldTree::build(&generation).unwrap();
//!
//! let batch = AggregateTree::build(&[consumption_tree.root(), generation_tree.root()]).unwrap();
//! let batch_root = batch.root();
//!
//! let disclosure = consumption_tree.precise_proof("volume").unwrap();
//! assert!(verify_proof(&consumption_tree.root(), &disclosure.leaf, &disclosure.proof));
//! assert_ne!(batch_root, consumption_tree.root());
//! ```

pub mod config;
pub mod crypto;
pub mod determinism;
pub mod economics;
pub mod merkle;
pub mod registry;
pub mod snapshot;
pub mod voting;
