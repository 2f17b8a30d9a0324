//! # Core State
//!
//! The single authoritative snapshot of all project and scene content.
//!
//! `data` is the only source of truth: no side tables, no caches. Maps are
//! ordered so iteration (and therefore every derived view) is stable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Schema version stamped on every state produced by this crate
pub const CORE_STATE_VERSION: u64 = 1;

/// Versioned snapshot `{version, data}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreState {
    /// State schema version (not a revision counter)
    pub version: u64,

    pub data: CoreData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreData {
    #[serde(default)]
    pub projects: BTreeMap<String, Project>,

    /// Incremented by exactly one per applied command
    #[serde(default)]
    pub last_command_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub scenes: BTreeMap<String, Scene>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub text: String,
}

/// Fresh, empty state
pub fn create_initial_core_state() -> CoreState {
    CoreState {
        version: CORE_STATE_VERSION,
        data: CoreData::default(),
    }
}

impl CoreState {
    pub fn project(&self, project_id: &str) -> Option<&Project> {
        self.data.projects.get(project_id)
    }

    pub fn scene(&self, project_id: &str, scene_id: &str) -> Option<&Scene> {
        self.project(project_id)
            .and_then(|project| project.scenes.get(scene_id))
    }

    /// JSON form of the state, identical to its serde encoding.
    ///
    /// Built by hand so hashing never has to go through a fallible
    /// serializer.
    pub fn to_value(&self) -> Value {
        let projects: Map<String, Value> = self
            .data
            .projects
            .iter()
            .map(|(id, project)| (id.clone(), project.to_value()))
            .collect();

        json!({
            "version": self.version,
            "data": {
                "projects": projects,
                "lastCommandId": self.data.last_command_id,
            },
        })
    }
}

impl Project {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            scenes: BTreeMap::new(),
        }
    }

    fn to_value(&self) -> Value {
        let scenes: Map<String, Value> = self
            .scenes
            .iter()
            .map(|(id, scene)| (id.clone(), json!({ "id": scene.id, "text": scene.text })))
            .collect();

        json!({
            "id": self.id,
            "title": self.title,
            "scenes": scenes,
        })
    }
}

impl Scene {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}
