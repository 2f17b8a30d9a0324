//! # Manuscript Derived Views
//!
//! Read-only projections of a [`CoreState`](manuscript_core::CoreState).
//!
//! ```text
//! DeriveInput { coreState, params, capabilitySnapshot }
//!        │
//!        ├──> invalidationKey = digest({view, stateHash, params, capabilities})
//!        │
//!        └──> view ──> value ──> outputHash = digest(value)
//! ```
//!
//! Views never persist anything and hold no state of their own: every call
//! recomputes from the given input. Hosts that want memoization own a
//! [`ViewCache`] and pass it around explicitly.
//!
//! ## Example
//!
//! ```rust
//! use manuscript_core::{apply_core_sequence, create_initial_core_state, Command};
//! use manuscript_views::{derive_reference_outline, CapabilitySnapshot, DeriveInput};
//! use serde_json::json;
//!
//! let state = apply_core_sequence(
//!     &create_initial_core_state(),
//!     &[
//!         Command::create_project("p-1", "Novel"),
//!         Command::create_scene("p-1", "s-1"),
//!         Command::apply_text_edit("p-1", "s-1", "# Chapter One\n## Arrival"),
//!     ],
//! );
//! let state = state.state().unwrap();
//!
//! let params = json!({ "maxDepth": 1 });
//! let caps = CapabilitySnapshot::default();
//! let result = derive_reference_outline(DeriveInput::new(state, &params, &caps));
//!
//! assert!(result.ok);
//! assert_eq!(result.value.unwrap()["headings"][0]["text"], "Chapter One");
//! ```

mod cache;
mod comments;
mod engine;
mod errors;
mod history;
mod mind_map;
mod outline;

pub use cache::ViewCache;
pub use comments::derive_comments;
pub use engine::{
    derive_view, invalidation_key, CapabilitySnapshot, DeriveInput, DerivedViewResult, ViewKind,
    ViewMeta,
};
pub use errors::ViewError;
pub use history::derive_history;
pub use mind_map::{derive_mind_map_graph, Layout};
pub use outline::derive_reference_outline;
