//! # Manuscript Core
//!
//! Deterministic command reducer over the versioned project state.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ host: UI / CLI / collab pipeline            │
//! └─────────────────────────────────────────────┘
//!                     ↓  Command {type, payload}
//! ┌─────────────────────────────────────────────┐
//! │ core: reduce(state, command)                │
//! │  - validate payload                         │
//! │  - produce a new CoreState value            │
//! │  - hash the result (canonical JSON, SHA-256)│
//! └─────────────────────────────────────────────┘
//!                     ↓  Reduction
//! ┌─────────────────────────────────────────────┐
//! │ collab: event log, views, persistence       │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **State is a value**: `reduce` borrows the input and returns a new state
//! 2. **Closed command set**: every command is a variant of [`Command`]
//! 3. **Total**: every `(state, command)` pair yields `Applied` or `Rejected`
//! 4. **Hash is identity**: two states are the same iff their hashes match
//!
//! ## Usage
//!
//! ```rust
//! use manuscript_core::{create_initial_core_state, hash_state, reduce, Command};
//!
//! let state = create_initial_core_state();
//! let reduction = reduce(&state, &Command::create_project("p-1", "Draft"));
//!
//! let next = reduction.state().unwrap();
//! assert_eq!(reduction.state_hash(), hash_state(next));
//! ```

mod command;
mod errors;
mod hasher;
mod reducer;
mod state;

pub use command::{
    ApplyTextEdit, Command, CommandId, CreateProject, CreateScene, DeleteProject, DeleteScene,
    RenameProject, TextRange,
};
pub use errors::CoreError;
pub use hasher::hash_state;
pub use reducer::{apply_core_sequence, reduce, Reduction};
pub use state::{create_initial_core_state, CoreData, CoreState, Project, Scene, CORE_STATE_VERSION};
