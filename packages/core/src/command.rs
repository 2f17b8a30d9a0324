//! # Commands
//!
//! The closed set of state transitions the reducer understands.
//!
//! Wire shape is `{ "type": "<command id>", "payload": { ... } }`. New
//! commands are added as new variants; there is no runtime registration.
//!
//! ## Command Semantics
//!
//! ### project.create
//! - Creates a project with an optional list of empty scenes
//! - Fails if the project id is taken
//!
//! ### project.applyTextEdit
//! - Without `range`: atomic replacement of the scene text
//! - With `range`: replaces characters `[start, end)` (Unicode scalar offsets)
//! - Last write wins, no merge attempts

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::CoreError;

/// Identifier of a command variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CommandId {
    #[serde(rename = "project.create")]
    ProjectCreate,
    #[serde(rename = "project.rename")]
    ProjectRename,
    #[serde(rename = "project.delete")]
    ProjectDelete,
    #[serde(rename = "project.createScene")]
    SceneCreate,
    #[serde(rename = "project.deleteScene")]
    SceneDelete,
    #[serde(rename = "project.applyTextEdit")]
    ApplyTextEdit,
}

impl CommandId {
    pub const ALL: [CommandId; 6] = [
        CommandId::ProjectCreate,
        CommandId::ProjectRename,
        CommandId::ProjectDelete,
        CommandId::SceneCreate,
        CommandId::SceneDelete,
        CommandId::ApplyTextEdit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandId::ProjectCreate => "project.create",
            CommandId::ProjectRename => "project.rename",
            CommandId::ProjectDelete => "project.delete",
            CommandId::SceneCreate => "project.createScene",
            CommandId::SceneDelete => "project.deleteScene",
            CommandId::ApplyTextEdit => "project.applyTextEdit",
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| CoreError::UnknownCommand {
                command_id: s.to_string(),
            })
    }
}

/// A state transition request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Command {
    #[serde(rename = "project.create")]
    CreateProject(CreateProject),

    #[serde(rename = "project.rename")]
    RenameProject(RenameProject),

    #[serde(rename = "project.delete")]
    DeleteProject(DeleteProject),

    #[serde(rename = "project.createScene")]
    CreateScene(CreateScene),

    #[serde(rename = "project.deleteScene")]
    DeleteScene(DeleteScene),

    #[serde(rename = "project.applyTextEdit")]
    ApplyTextEdit(ApplyTextEdit),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateProject {
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub scene_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RenameProject {
    pub project_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeleteProject {
    pub project_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateScene {
    pub project_id: String,
    pub scene_id: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeleteScene {
    pub project_id: String,
    pub scene_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApplyTextEdit {
    pub project_id: String,
    pub scene_id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<TextRange>,
}

/// Half-open character range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl Command {
    /// Decode raw ingress `{type, payload}` into a typed command
    pub fn from_parts(command_id: &str, payload: Value) -> Result<Self, CoreError> {
        let id: CommandId = command_id.parse()?;
        let raw = json!({ "type": id.as_str(), "payload": payload });

        serde_json::from_value(raw).map_err(|e| CoreError::invalid("payload", e.to_string()))
    }

    pub fn id(&self) -> CommandId {
        match self {
            Command::CreateProject(_) => CommandId::ProjectCreate,
            Command::RenameProject(_) => CommandId::ProjectRename,
            Command::DeleteProject(_) => CommandId::ProjectDelete,
            Command::CreateScene(_) => CommandId::SceneCreate,
            Command::DeleteScene(_) => CommandId::SceneDelete,
            Command::ApplyTextEdit(_) => CommandId::ApplyTextEdit,
        }
    }

    /// Payload as JSON, identical to the `payload` half of the serde encoding
    pub fn payload(&self) -> Value {
        match self {
            Command::CreateProject(p) => json!({
                "projectId": p.project_id,
                "title": p.title,
                "sceneIds": p.scene_ids,
            }),
            Command::RenameProject(p) => json!({
                "projectId": p.project_id,
                "title": p.title,
            }),
            Command::DeleteProject(p) => json!({ "projectId": p.project_id }),
            Command::CreateScene(p) => json!({
                "projectId": p.project_id,
                "sceneId": p.scene_id,
                "text": p.text,
            }),
            Command::DeleteScene(p) => json!({
                "projectId": p.project_id,
                "sceneId": p.scene_id,
            }),
            Command::ApplyTextEdit(p) => {
                let mut payload = json!({
                    "projectId": p.project_id,
                    "sceneId": p.scene_id,
                    "text": p.text,
                });
                if let (Some(range), Some(obj)) = (p.range, payload.as_object_mut()) {
                    obj.insert("range".to_string(), json!({ "start": range.start, "end": range.end }));
                }
                payload
            }
        }
    }

    /// Structural checks that do not need the state
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            Command::CreateProject(p) => {
                require_id("projectId", &p.project_id)?;
                for (i, scene_id) in p.scene_ids.iter().enumerate() {
                    require_id("sceneIds", scene_id)?;
                    if p.scene_ids[..i].contains(scene_id) {
                        return Err(CoreError::invalid(
                            "sceneIds",
                            format!("duplicate scene id `{}`", scene_id),
                        ));
                    }
                }
                Ok(())
            }
            Command::RenameProject(p) => require_id("projectId", &p.project_id),
            Command::DeleteProject(p) => require_id("projectId", &p.project_id),
            Command::CreateScene(p) => {
                require_id("projectId", &p.project_id)?;
                require_id("sceneId", &p.scene_id)
            }
            Command::DeleteScene(p) => {
                require_id("projectId", &p.project_id)?;
                require_id("sceneId", &p.scene_id)
            }
            Command::ApplyTextEdit(p) => {
                require_id("projectId", &p.project_id)?;
                require_id("sceneId", &p.scene_id)?;
                match p.range {
                    Some(range) if range.start > range.end => Err(CoreError::invalid(
                        "range",
                        format!("start {} is after end {}", range.start, range.end),
                    )),
                    _ => Ok(()),
                }
            }
        }
    }

    pub fn create_project(project_id: impl Into<String>, title: impl Into<String>) -> Self {
        Command::CreateProject(CreateProject {
            project_id: project_id.into(),
            title: title.into(),
            scene_ids: Vec::new(),
        })
    }

    pub fn create_scene(project_id: impl Into<String>, scene_id: impl Into<String>) -> Self {
        Command::CreateScene(CreateScene {
            project_id: project_id.into(),
            scene_id: scene_id.into(),
            text: String::new(),
        })
    }

    pub fn apply_text_edit(
        project_id: impl Into<String>,
        scene_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Command::ApplyTextEdit(ApplyTextEdit {
            project_id: project_id.into(),
            scene_id: scene_id.into(),
            text: text.into(),
            range: None,
        })
    }
}

fn require_id(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        Err(CoreError::invalid(field, "must be a non-empty id"))
    } else {
        Ok(())
    }
}
