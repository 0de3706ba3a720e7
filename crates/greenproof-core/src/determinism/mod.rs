//! Deterministic record encoding.
//!
//! Independent workers build the same logical dataset in whatever order their
//! data sources return it. This module turns a [`Record`] into canonical bytes
//! that depend only on content:
//!
//! - **Tagged values**: a record is a map of [`FieldValue`]s, a closed union of
//!   strings, numbers, booleans, dates, arrays and nested records. Encoding
//!   dispatches on the tag.
//! - **Sorted keys**: object keys are emitted in ascending byte order at every
//!   nesting level.
//! - **Value-sorted arrays**: array elements are canonicalized independently
//!   and emitted in ascending order of their canonical text, so element order
//!   never affects the output.
//! - **Dropped values**: [`FieldValue::Unsupported`] (JSON `null` and anything
//!   without a canonical form) is omitted from objects and arrays. This is the
//!   contract, not an error path; canonicalization cannot fail.
//! - **Kept falsy scalars**: `0`, `false` and `""` are real values and stay in
//!   the output. Workers that strip falsy fields before encoding produce
//!   different canonical bytes, and therefore different commitment roots,
//!   for any record containing them. All workers in a federation must use
//!   the same encoder.
//!
//! # Example
//!
//! ```
//! use greenproof_core::determinism::{Record, canonicalize_to_string};
//! use serde_json::json;
//!
//! let record = Record::from_json(json!({ "name": "object", "id": 1, "empty": null }));
//! assert_eq!(canonicalize_to_string(&record), r#"{"id":1,"name":"object"}"#);
//! ```

mod canonicalize;
mod record;

pub use canonicalize::{canonical_value, canonicalize, canonicalize_to_string};
pub use record::{FieldValue, Record};
