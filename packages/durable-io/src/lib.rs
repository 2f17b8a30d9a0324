//! # Manuscript Durable I/O
//!
//! Crash-safe persistence for markdown files.
//!
//! ```text
//! save_markdown
//!   ├── create_recovery_snapshot   .draft.md.bak.{tick}
//!   └── atomic_write_file          .draft.md.tmp.XXXX ──rename──> draft.md
//!
//! read_markdown_with_recovery
//!   ├── read_markdown_with_limits  size → NUL → UTF-8 → integrity
//!   └── newest readable snapshot   (content damage only)
//! ```
//!
//! Every failure is a [`DurableIoError`] with a stable code, the recovery
//! actions a user may take, and a [`ReliabilityRecord`] emitted on the
//! `manuscript::reliability` tracing target.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use manuscript_io::{read_markdown_with_recovery, save_markdown, ReadOptions, SnapshotOptions, WriteOptions};
//!
//! let path = Path::new("draft.md");
//! let now = || 1u64;
//! save_markdown(path, "# Draft", &WriteOptions::default(), &SnapshotOptions::new(5, &now))?;
//!
//! let doc = read_markdown_with_recovery(path, &ReadOptions::default())?;
//! assert_eq!(doc.content, "# Draft");
//! # Ok::<(), manuscript_io::DurableIoError>(())
//! ```

mod actions;
mod atomic;
mod error;
mod port;
mod read;
mod recover;
mod reliability;
mod save;
mod snapshot;

pub use actions::{normalize_recovery_actions, RecoveryAction};
pub use atomic::{atomic_write_file, temp_prefix, SafetyMode, WriteHooks, WriteOptions, WriteReport};
pub use error::{DurableIoError, IoErrorCode, IoOp};
pub use port::{FileSystemPort, StdFileSystem};
pub use read::{read_markdown_with_limits, MarkdownDocument, ReadOptions, DEFAULT_MAX_INPUT_BYTES};
pub use recover::{read_markdown_with_recovery, replay_markdown_recovery, RecoveredDocument, SourceKind};
pub use reliability::{ReliabilityRecord, RELIABILITY_SCHEMA_VERSION, RELIABILITY_TARGET};
pub use save::{save_markdown, SaveReport};
pub use snapshot::{create_recovery_snapshot, list_recovery_snapshots, SnapshotInfo, SnapshotOptions};
