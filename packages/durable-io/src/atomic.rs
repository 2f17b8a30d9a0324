//! # Atomic Write
//!
//! Write to a temporary sibling, flush, then rename over the target. A
//! reader sees the old bytes or the new bytes, never a mix. The temporary
//! file is owned by a [`tempfile::NamedTempFile`], so every early return
//! (including an injected fault) deletes it.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DurableIoError, IoErrorCode, IoOp};

/// How hard a write tries to reach stable storage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyMode {
    /// fsync the file and its directory before reporting success
    #[default]
    Durable,
    /// rename only; atomic but may be lost on power failure
    Atomic,
}

impl SafetyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyMode::Durable => "durable",
            SafetyMode::Atomic => "atomic",
        }
    }
}

impl std::fmt::Display for SafetyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SafetyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "durable" => Ok(SafetyMode::Durable),
            "atomic" => Ok(SafetyMode::Atomic),
            other => Err(format!("unknown safety mode `{}`", other)),
        }
    }
}

/// Fault-injection points inside [`atomic_write_file`].
///
/// An `Err` from either hook aborts the write as if the filesystem had
/// failed at that point.
pub trait WriteHooks {
    fn after_temp_write(&self, _temp_path: &Path) -> std::io::Result<()> {
        Ok(())
    }

    fn before_rename(&self, _temp_path: &Path, _target_path: &Path) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Clone, Copy, Default)]
pub struct WriteOptions<'a> {
    pub safety_mode: SafetyMode,
    pub hooks: Option<&'a dyn WriteHooks>,
}

impl<'a> WriteOptions<'a> {
    pub fn new(safety_mode: SafetyMode) -> Self {
        Self {
            safety_mode,
            hooks: None,
        }
    }

    pub fn with_hooks(mut self, hooks: &'a dyn WriteHooks) -> Self {
        self.hooks = Some(hooks);
        self
    }
}

impl std::fmt::Debug for WriteOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteOptions")
            .field("safety_mode", &self.safety_mode)
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReport {
    pub target_path: PathBuf,
    pub bytes_written: usize,
    pub safety_mode: SafetyMode,
}

/// Prefix of temporary siblings for `path`: `.{basename}.tmp.`
pub fn temp_prefix(path: &Path) -> String {
    let basename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!(".{}.tmp.", basename)
}

/// Directory a sibling of `path` lives in
pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Replace `path` with `bytes`, atomically.
pub fn atomic_write_file(
    path: &Path,
    bytes: &[u8],
    options: &WriteOptions<'_>,
) -> Result<WriteReport, DurableIoError> {
    write_via_temp(path, bytes, options).map_err(|source| {
        DurableIoError::new(IoErrorCode::AtomicWriteFail, IoOp::AtomicWrite, path)
            .with_source(source)
            .reported(Some(options.safety_mode))
    })?;

    tracing::debug!(
        path = %path.display(),
        bytes = bytes.len(),
        mode = %options.safety_mode,
        "atomic write complete"
    );

    Ok(WriteReport {
        target_path: path.to_path_buf(),
        bytes_written: bytes.len(),
        safety_mode: options.safety_mode,
    })
}

fn write_via_temp(path: &Path, bytes: &[u8], options: &WriteOptions<'_>) -> std::io::Result<()> {
    let dir = parent_dir(path);
    let prefix = temp_prefix(path);
    let durable = options.safety_mode == SafetyMode::Durable;

    let mut temp = tempfile::Builder::new().prefix(&prefix).tempfile_in(dir)?;
    temp.write_all(bytes)?;
    temp.flush()?;
    if durable {
        temp.as_file().sync_all()?;
    }

    if let Some(hooks) = options.hooks {
        hooks.after_temp_write(temp.path())?;
        hooks.before_rename(temp.path(), path)?;
    }

    temp.persist(path).map_err(|err| err.error)?;

    #[cfg(unix)]
    {
        if durable {
            fs::File::open(dir)?.sync_all()?;
        }
    }

    Ok(())
}
