//! # Manuscript Common
//!
//! Shared building blocks for every Manuscript package:
//!
//! - [`canonical`]: the single canonical JSON encoding used before hashing
//! - [`digest`]: SHA-256 content digests over canonical bytes
//! - [`envelope`]: the `{code, op, reason, details}` error/conflict shape

pub mod canonical;
pub mod digest;
pub mod envelope;
pub mod error;

pub use canonical::{canonical_string, to_canonical_string, to_canonical_value};
pub use digest::{digest_bytes, digest_value, is_digest, DIGEST_HEX_LEN};
pub use envelope::{Details, ErrorEnvelope};
pub use error::{CanonicalError, CommonResult};
