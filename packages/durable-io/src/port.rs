//! # FileSystemPort
//!
//! The three operations a host must provide when the editor runs behind a
//! platform boundary. [`StdFileSystem`] is the local implementation;
//! embedders can supply their own.

use std::fs;
use std::path::Path;

use crate::atomic::{atomic_write_file, SafetyMode, WriteOptions};
use crate::error::{DurableIoError, IoErrorCode, IoOp};

pub trait FileSystemPort {
    fn read(&self, path: &Path) -> Result<Vec<u8>, DurableIoError>;

    fn write(&self, path: &Path, data: &[u8]) -> Result<(), DurableIoError>;

    fn exists(&self, path: &Path) -> bool;

    /// Read and decode as UTF-8
    fn read_text(&self, path: &Path) -> Result<String, DurableIoError> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| {
            DurableIoError::new(IoErrorCode::InvalidEncoding, IoOp::Read, path)
                .with_detail("validUpTo", e.utf8_error().valid_up_to())
        })
    }
}

/// Local disk; writes go through [`atomic_write_file`]
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem {
    pub safety_mode: SafetyMode,
}

impl StdFileSystem {
    pub fn new(safety_mode: SafetyMode) -> Self {
        Self { safety_mode }
    }
}

impl FileSystemPort for StdFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>, DurableIoError> {
        fs::read(path)
            .map_err(|e| DurableIoError::new(IoErrorCode::ReadFail, IoOp::Read, path).with_source(e))
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<(), DurableIoError> {
        atomic_write_file(path, data, &WriteOptions::new(self.safety_mode)).map(|_| ())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}
