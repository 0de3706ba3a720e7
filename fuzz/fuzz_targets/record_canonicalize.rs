//! Fuzz harness for record canonicalization and field commitment.
//!
//! Arbitrary bytes are parsed as JSON; any object becomes a record. The
//! canonical form must be valid JSON, stable under a second pass, and the
//! field tree must build (or report an empty tree) without panicking.

#![no_main]
use greenproof_core::determinism::{Record, canonicalize};
use greenproof_core::merkle::{FieldTree, MerkleError};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let record = Record::from_json(value);
    let canonical = canonicalize(&record);

    let reparsed: serde_json::Value =
        serde_json::from_slice(&canonical).expect("canonical form must be valid JSON");
    assert_eq!(canonicalize(&Record::from_json(reparsed)), canonical);

    match FieldTree::build(&record) {
        Ok(tree) => {
            for proof in tree.precise_proofs().expect("committed fields have proofs") {
                assert!(proof.verify(&tree.root()));
            }
        },
        Err(MerkleError::EmptyTree) => {},
        Err(err) => panic!("unexpected error: {err}"),
    }
});
