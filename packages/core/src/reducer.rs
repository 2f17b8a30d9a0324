//! # Reducer
//!
//! `(state, command) -> Reduction`. The input state is borrowed and never
//! touched; a successful transition yields a fresh value, a failed one leaves
//! the caller holding the state it started with.

use manuscript_common::ErrorEnvelope;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::command::{ApplyTextEdit, Command, CreateProject, CreateScene, TextRange};
use crate::errors::CoreError;
use crate::hasher::hash_state;
use crate::state::{CoreData, CoreState, Project, Scene};

/// Outcome of reducing one command (or a sequence)
#[derive(Debug, Clone, PartialEq)]
pub enum Reduction {
    Applied {
        state: CoreState,
        state_hash: String,
    },
    /// `state_hash` is the hash of the unchanged input state
    Rejected {
        error: ErrorEnvelope,
        state_hash: String,
    },
}

impl Reduction {
    pub fn is_applied(&self) -> bool {
        matches!(self, Reduction::Applied { .. })
    }

    pub fn state_hash(&self) -> &str {
        match self {
            Reduction::Applied { state_hash, .. } | Reduction::Rejected { state_hash, .. } => {
                state_hash
            }
        }
    }

    pub fn state(&self) -> Option<&CoreState> {
        match self {
            Reduction::Applied { state, .. } => Some(state),
            Reduction::Rejected { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorEnvelope> {
        match self {
            Reduction::Applied { .. } => None,
            Reduction::Rejected { error, .. } => Some(error),
        }
    }

    /// `{ok, state|error, stateHash}`
    pub fn to_value(&self) -> Value {
        match self {
            Reduction::Applied { state, state_hash } => json!({
                "ok": true,
                "state": state.to_value(),
                "stateHash": state_hash,
            }),
            Reduction::Rejected { error, state_hash } => json!({
                "ok": false,
                "error": error.to_value(),
                "stateHash": state_hash,
            }),
        }
    }
}

impl Serialize for Reduction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Apply a single command
pub fn reduce(state: &CoreState, command: &Command) -> Reduction {
    let op = command.id();

    match transition(state, command) {
        Ok(next) => {
            let state_hash = hash_state(&next);
            tracing::debug!(
                command = %op,
                last_command_id = next.data.last_command_id,
                "command applied"
            );
            Reduction::Applied {
                state: next,
                state_hash,
            }
        }
        Err(err) => {
            tracing::debug!(command = %op, code = err.code(), "command rejected");
            Reduction::Rejected {
                error: err.to_envelope(op.as_str()),
                state_hash: hash_state(state),
            }
        }
    }
}

/// Fold `commands` over `state`, stopping at the first failure.
///
/// The sequence is all-or-nothing: on failure the reported hash is that of
/// the original input and the error carries `commandIndex`.
pub fn apply_core_sequence(state: &CoreState, commands: &[Command]) -> Reduction {
    let mut current = state.clone();

    for (index, command) in commands.iter().enumerate() {
        match transition(&current, command) {
            Ok(next) => current = next,
            Err(err) => {
                tracing::debug!(
                    command = %command.id(),
                    index,
                    code = err.code(),
                    "command sequence rejected"
                );
                return Reduction::Rejected {
                    error: err
                        .to_envelope(command.id().as_str())
                        .with_detail("commandIndex", index),
                    state_hash: hash_state(state),
                };
            }
        }
    }

    let state_hash = hash_state(&current);
    Reduction::Applied {
        state: current,
        state_hash,
    }
}

fn transition(state: &CoreState, command: &Command) -> Result<CoreState, CoreError> {
    command.validate()?;

    let mut next = state.clone();
    let data = &mut next.data;

    match command {
        Command::CreateProject(p) => create_project(data, p)?,
        Command::RenameProject(p) => project_mut(data, &p.project_id)?.title = p.title.clone(),
        Command::DeleteProject(p) => {
            data.projects
                .remove(&p.project_id)
                .ok_or_else(|| CoreError::ProjectNotFound {
                    project_id: p.project_id.clone(),
                })?;
        }
        Command::CreateScene(p) => create_scene(data, p)?,
        Command::DeleteScene(p) => {
            project_mut(data, &p.project_id)?
                .scenes
                .remove(&p.scene_id)
                .ok_or_else(|| CoreError::SceneNotFound {
                    project_id: p.project_id.clone(),
                    scene_id: p.scene_id.clone(),
                })?;
        }
        Command::ApplyTextEdit(edit) => apply_text_edit(data, edit)?,
    }

    data.last_command_id = data
        .last_command_id
        .checked_add(1)
        .ok_or(CoreError::CommandIdExhausted)?;
    Ok(next)
}

fn project_mut<'a>(data: &'a mut CoreData, project_id: &str) -> Result<&'a mut Project, CoreError> {
    data.projects
        .get_mut(project_id)
        .ok_or_else(|| CoreError::ProjectNotFound {
            project_id: project_id.to_string(),
        })
}

fn create_project(data: &mut CoreData, payload: &CreateProject) -> Result<(), CoreError> {
    if data.projects.contains_key(&payload.project_id) {
        return Err(CoreError::ProjectExists {
            project_id: payload.project_id.clone(),
        });
    }

    let mut project = Project::new(payload.project_id.clone(), payload.title.clone());
    for scene_id in &payload.scene_ids {
        project
            .scenes
            .insert(scene_id.clone(), Scene::new(scene_id.clone(), ""));
    }

    data.projects.insert(payload.project_id.clone(), project);
    Ok(())
}

fn create_scene(data: &mut CoreData, payload: &CreateScene) -> Result<(), CoreError> {
    let project = project_mut(data, &payload.project_id)?;

    if project.scenes.contains_key(&payload.scene_id) {
        return Err(CoreError::SceneExists {
            project_id: payload.project_id.clone(),
            scene_id: payload.scene_id.clone(),
        });
    }

    project.scenes.insert(
        payload.scene_id.clone(),
        Scene::new(payload.scene_id.clone(), payload.text.clone()),
    );
    Ok(())
}

fn apply_text_edit(data: &mut CoreData, edit: &ApplyTextEdit) -> Result<(), CoreError> {
    let scene = project_mut(data, &edit.project_id)?
        .scenes
        .get_mut(&edit.scene_id)
        .ok_or_else(|| CoreError::SceneNotFound {
            project_id: edit.project_id.clone(),
            scene_id: edit.scene_id.clone(),
        })?;

    match edit.range {
        None => scene.text = edit.text.clone(),
        Some(range) => splice(&mut scene.text, range, &edit.text)?,
    }

    Ok(())
}

fn splice(text: &mut String, range: TextRange, replacement: &str) -> Result<(), CoreError> {
    let char_len = text.chars().count();
    if range.end > char_len {
        return Err(CoreError::invalid(
            "range",
            format!("end {} exceeds text length {}", range.end, char_len),
        ));
    }

    let start = byte_offset(text, range.start);
    let end = byte_offset(text, range.end);
    text.replace_range(start..end, replacement);
    Ok(())
}

fn byte_offset(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}
