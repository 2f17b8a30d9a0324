//! # View Engine
//!
//! Shared plumbing for every view: capability gate, params decoding,
//! invalidation key and output hash.

use std::collections::BTreeMap;

use manuscript_common::{digest_value, ErrorEnvelope};
use manuscript_core::{hash_state, CoreState, Project};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::errors::ViewError;

/// The derived views this crate knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewKind {
    ReferenceOutline,
    Comments,
    History,
    MindMapGraph,
}

impl ViewKind {
    pub const ALL: [ViewKind; 4] = [
        ViewKind::ReferenceOutline,
        ViewKind::Comments,
        ViewKind::History,
        ViewKind::MindMapGraph,
    ];

    /// Name used in invalidation keys and as the capability flag
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::ReferenceOutline => "referenceOutline",
            ViewKind::Comments => "comments",
            ViewKind::History => "history",
            ViewKind::MindMapGraph => "mindMapGraph",
        }
    }

    /// Envelope `op` for failures of this view
    pub fn op(&self) -> &'static str {
        match self {
            ViewKind::ReferenceOutline => "view.referenceOutline",
            ViewKind::Comments => "view.comments",
            ViewKind::History => "view.history",
            ViewKind::MindMapGraph => "view.mindMapGraph",
        }
    }
}

impl std::fmt::Display for ViewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ViewKind {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ViewError::InvalidParams {
                message: format!("unknown view `{}`", s),
            })
    }
}

/// Feature flags the host has resolved for this session.
///
/// A view is disabled only when its flag is present and `false`; an absent
/// flag means enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySnapshot {
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
}

impl CapabilitySnapshot {
    pub fn from_features<I, K>(features: I) -> Self
    where
        I: IntoIterator<Item = (K, bool)>,
        K: Into<String>,
    {
        Self {
            features: features.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn with(mut self, feature: impl Into<String>, enabled: bool) -> Self {
        self.features.insert(feature.into(), enabled);
        self
    }

    pub fn is_disabled(&self, feature: &str) -> bool {
        self.features.get(feature) == Some(&false)
    }

    pub fn to_value(&self) -> Value {
        let features: Map<String, Value> = self
            .features
            .iter()
            .map(|(k, v)| (k.clone(), Value::Bool(*v)))
            .collect();
        json!({ "features": features })
    }
}

/// Everything a view may look at
#[derive(Debug, Clone, Copy)]
pub struct DeriveInput<'a> {
    pub core_state: &'a CoreState,
    pub params: &'a Value,
    pub capability_snapshot: &'a CapabilitySnapshot,
}

impl<'a> DeriveInput<'a> {
    pub fn new(
        core_state: &'a CoreState,
        params: &'a Value,
        capability_snapshot: &'a CapabilitySnapshot,
    ) -> Self {
        Self {
            core_state,
            params,
            capability_snapshot,
        }
    }

    /// Decode params into a view's typed form; `null` means defaults.
    pub(crate) fn params<T: DeserializeOwned + Default>(&self) -> Result<T, ViewError> {
        if self.params.is_null() {
            return Ok(T::default());
        }
        serde_json::from_value(self.params.clone()).map_err(|e| ViewError::InvalidParams {
            message: e.to_string(),
        })
    }

    /// Projects selected by an optional `projectId` param, in id order
    pub(crate) fn projects(&self, project_id: Option<&str>) -> Result<Vec<&'a Project>, ViewError> {
        match project_id {
            Some(id) => self
                .core_state
                .project(id)
                .map(|p| vec![p])
                .ok_or_else(|| ViewError::ProjectNotFound {
                    project_id: id.to_string(),
                }),
            None => Ok(self.core_state.data.projects.values().collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewMeta {
    pub output_hash: String,
    pub invalidation_key: String,
}

/// `{ok, value, error, meta}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedViewResult {
    pub ok: bool,
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
    pub meta: ViewMeta,
}

/// Cache key for `view` over `input`.
///
/// Covers the state hash, the params and the whole capability snapshot, all
/// canonically encoded, so it changes exactly when one of them does.
pub fn invalidation_key(view: ViewKind, input: &DeriveInput<'_>) -> String {
    let params = if input.params.is_null() {
        json!({})
    } else {
        input.params.clone()
    };

    digest_value(&json!({
        "view": view.as_str(),
        "stateHash": hash_state(input.core_state),
        "params": params,
        "capabilities": input.capability_snapshot.to_value(),
    }))
}

/// Dispatch to the view named by `view`
pub fn derive_view(view: ViewKind, input: DeriveInput<'_>) -> DerivedViewResult {
    match view {
        ViewKind::ReferenceOutline => crate::outline::derive_reference_outline(input),
        ViewKind::Comments => crate::comments::derive_comments(input),
        ViewKind::History => crate::history::derive_history(input),
        ViewKind::MindMapGraph => crate::mind_map::derive_mind_map_graph(input),
    }
}

pub(crate) fn run<F>(view: ViewKind, input: DeriveInput<'_>, build: F) -> DerivedViewResult
where
    F: FnOnce(&DeriveInput<'_>) -> Result<Value, ViewError>,
{
    let invalidation_key = invalidation_key(view, &input);

    let outcome = if input.capability_snapshot.is_disabled(view.as_str()) {
        Err(ViewError::CapabilityDisabled {
            capability: view.as_str().to_string(),
        })
    } else {
        build(&input)
    };

    match outcome {
        Ok(value) => DerivedViewResult {
            ok: true,
            meta: ViewMeta {
                output_hash: digest_value(&value),
                invalidation_key,
            },
            value: Some(value),
            error: None,
        },
        Err(err) => {
            tracing::debug!(view = %view, code = err.code(), "view derivation refused");
            let envelope = err.to_envelope(view.op());
            DerivedViewResult {
                ok: false,
                meta: ViewMeta {
                    output_hash: digest_value(&envelope.to_value()),
                    invalidation_key,
                },
                value: None,
                error: Some(envelope),
            }
        }
    }
}
