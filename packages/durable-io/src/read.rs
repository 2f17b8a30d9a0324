//! # Bounded Markdown Read
//!
//! Checks run in a fixed order so a file with several problems always
//! reports the same one: size, NUL bytes, UTF-8, then integrity.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use manuscript_common::digest_bytes;
use serde::{Deserialize, Serialize};

use crate::error::{DurableIoError, IoErrorCode, IoOp};

/// 8 MiB
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 8 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    pub max_bytes: u64,

    /// Lowercase hex SHA-256 the content must match
    pub expected_sha256: Option<String>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_INPUT_BYTES,
            expected_sha256: None,
        }
    }
}

impl ReadOptions {
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn expecting(mut self, sha256: impl Into<String>) -> Self {
        self.expected_sha256 = Some(sha256.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkdownDocument {
    pub path: PathBuf,
    pub content: String,
    pub bytes: usize,
    pub sha256: String,
}

/// Read `path` as UTF-8 markdown within `options`' limits.
pub fn read_markdown_with_limits(
    path: &Path,
    options: &ReadOptions,
) -> Result<MarkdownDocument, DurableIoError> {
    read_checked(path, options).map_err(|err| err.reported(None))
}

/// [`read_markdown_with_limits`] without emitting a reliability record,
/// for callers that decide themselves whether a failure is final
pub(crate) fn read_checked(
    path: &Path,
    options: &ReadOptions,
) -> Result<MarkdownDocument, DurableIoError> {
    let fail = |code| DurableIoError::new(code, IoOp::Read, path);

    let metadata = fs::metadata(path).map_err(|e| fail(IoErrorCode::ReadFail).with_source(e))?;
    if metadata.len() > options.max_bytes {
        return Err(too_large(path, options.max_bytes, metadata.len()));
    }

    // the file may grow between stat and read
    let mut bytes = Vec::new();
    fs::File::open(path)
        .and_then(|file| {
            file.take(options.max_bytes.saturating_add(1))
                .read_to_end(&mut bytes)
        })
        .map_err(|e| fail(IoErrorCode::ReadFail).with_source(e))?;
    if bytes.len() as u64 > options.max_bytes {
        return Err(too_large(path, options.max_bytes, bytes.len() as u64));
    }

    if let Some(offset) = bytes.iter().position(|b| *b == 0) {
        return Err(fail(IoErrorCode::CorruptInput)
            .with_reason("corrupt_input_null_byte")
            .with_detail("offset", offset));
    }

    let sha256 = digest_bytes(&bytes);
    let byte_len = bytes.len();

    let content = String::from_utf8(bytes).map_err(|e| {
        let utf8 = e.utf8_error();
        let code = match utf8.error_len() {
            None => IoErrorCode::TruncatedInput,
            Some(_) => IoErrorCode::InvalidEncoding,
        };
        fail(code).with_detail("validUpTo", utf8.valid_up_to())
    })?;

    if let Some(expected) = &options.expected_sha256 {
        if !expected.eq_ignore_ascii_case(&sha256) {
            return Err(fail(IoErrorCode::IntegrityMismatch)
                .with_detail("expected", expected.to_ascii_lowercase())
                .with_detail("actual", sha256));
        }
    }

    Ok(MarkdownDocument {
        path: path.to_path_buf(),
        content,
        bytes: byte_len,
        sha256,
    })
}

fn too_large(path: &Path, max_bytes: u64, actual: u64) -> DurableIoError {
    DurableIoError::new(IoErrorCode::InputTooLarge, IoOp::Read, path)
        .with_detail("maxBytes", max_bytes)
        .with_detail("actualBytes", actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_reads_valid_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "ok.md", "# Título\n".as_bytes());

        let doc = read_markdown_with_limits(&path, &ReadOptions::default()).unwrap();
        assert_eq!(doc.content, "# Título\n");
        assert_eq!(doc.bytes, 10);
        assert_eq!(doc.sha256, digest_bytes("# Título\n".as_bytes()));
    }

    #[test]
    fn test_size_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "big.md", &[b'a'; 33]);

        let err = read_markdown_with_limits(&path, &ReadOptions::default().with_max_bytes(32))
            .unwrap_err();
        assert_eq!(err.code, IoErrorCode::InputTooLarge);
        assert_eq!(err.details["actualBytes"], 33);

        assert!(read_markdown_with_limits(&path, &ReadOptions::default().with_max_bytes(33)).is_ok());
    }

    #[test]
    fn test_unbounded_ceiling_reads_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "all.md", b"# Hello");

        let doc = read_markdown_with_limits(&path, &ReadOptions::default().with_max_bytes(u64::MAX))
            .unwrap();
        assert_eq!(doc.content, "# Hello");
        assert_eq!(doc.bytes, 7);
    }

    #[test]
    fn test_null_byte() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "nul.md", b"abc\0def");

        let err = read_markdown_with_limits(&path, &ReadOptions::default()).unwrap_err();
        assert_eq!(err.code, IoErrorCode::CorruptInput);
        assert_eq!(err.reason, "corrupt_input_null_byte");
        assert_eq!(err.details["offset"], 3);
    }

    #[test]
    fn test_truncated_versus_invalid() {
        let dir = tempfile::tempdir().unwrap();
        // "é" is C3 A9; keep only the lead byte at the end
        let truncated = write(&dir, "cut.md", b"caf\xC3");
        let invalid = write(&dir, "bad.md", b"caf\xC3(x");

        let err = read_markdown_with_limits(&truncated, &ReadOptions::default()).unwrap_err();
        assert_eq!(err.code, IoErrorCode::TruncatedInput);

        let err = read_markdown_with_limits(&invalid, &ReadOptions::default()).unwrap_err();
        assert_eq!(err.code, IoErrorCode::InvalidEncoding);
        assert_eq!(err.details["validUpTo"], 3);
    }

    #[test]
    fn test_null_reported_before_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "both.md", b"\xFF\0");

        let err = read_markdown_with_limits(&path, &ReadOptions::default()).unwrap_err();
        assert_eq!(err.code, IoErrorCode::CorruptInput);
    }

    #[test]
    fn test_integrity() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "sum.md", b"content");
        let good = digest_bytes(b"content");

        let options = ReadOptions::default().expecting(good.to_ascii_uppercase());
        assert!(read_markdown_with_limits(&path, &options).is_ok());

        let options = ReadOptions::default().expecting(digest_bytes(b"other"));
        let err = read_markdown_with_limits(&path, &options).unwrap_err();
        assert_eq!(err.code, IoErrorCode::IntegrityMismatch);
        assert_eq!(err.details["actual"], good);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_markdown_with_limits(&dir.path().join("gone.md"), &ReadOptions::default())
            .unwrap_err();
        assert_eq!(err.code, IoErrorCode::ReadFail);
        assert!(err.source.is_some());
    }
}
