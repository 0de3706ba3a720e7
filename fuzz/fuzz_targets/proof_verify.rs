//! Fuzz harness for `verify_proof` on untrusted proof input.
//!
//! The first 64 bytes are a root and a leaf; the rest is parsed as a JSON
//! proof. Verification must return a bool without panicking, including
//! for proofs longer than the depth limit.

#![no_main]
use greenproof_core::merkle::{MerkleProof, verify_proof};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 64 {
        return;
    }
    let (keys, rest) = data.split_at(64);
    let mut root = [0u8; 32];
    let mut leaf = [0u8; 32];
    root.copy_from_slice(&keys[..32]);
    leaf.copy_from_slice(&keys[32..]);

    if let Ok(proof) = serde_json::from_slice::<MerkleProof>(rest) {
        let _ = verify_proof(&root, &leaf, &proof);
    }
});
