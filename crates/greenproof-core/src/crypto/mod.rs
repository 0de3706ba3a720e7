//! Hashing primitives shared by the commitment and voting layers.
//!
//! All digests are 32-byte Blake3 outputs. Field leaves, internal Merkle
//! nodes and aggregate roots use the same [`Hash`] type so a finalized match
//! output can be compared byte-for-byte with a locally computed root.

mod hash;

pub use hash::{
    HASH_SIZE, Hash, HexError, ZERO_HASH, hash_concat, hash_content, hex_encode, parse_hex,
    serde_hex,
};
