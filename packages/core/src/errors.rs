//! Error types for the reducer

use manuscript_common::{Details, ErrorEnvelope};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Project not found: {project_id}")]
    ProjectNotFound { project_id: String },

    #[error("Scene not found: {project_id}/{scene_id}")]
    SceneNotFound { project_id: String, scene_id: String },

    #[error("Project already exists: {project_id}")]
    ProjectExists { project_id: String },

    #[error("Scene already exists: {project_id}/{scene_id}")]
    SceneExists { project_id: String, scene_id: String },

    #[error("Invalid payload field `{field}`: {message}")]
    InvalidPayload { field: String, message: String },

    #[error("Unknown command: {command_id}")]
    UnknownCommand { command_id: String },

    #[error("Command counter exhausted")]
    CommandIdExhausted,
}

impl CoreError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::InvalidPayload {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CoreError::ProjectNotFound { .. } => "E_CORE_PROJECT_NOT_FOUND",
            CoreError::SceneNotFound { .. } => "E_CORE_SCENE_NOT_FOUND",
            CoreError::ProjectExists { .. } => "E_CORE_PROJECT_EXISTS",
            CoreError::SceneExists { .. } => "E_CORE_SCENE_EXISTS",
            CoreError::InvalidPayload { .. } => "E_CORE_PAYLOAD_INVALID",
            CoreError::UnknownCommand { .. } => "E_CORE_COMMAND_UNKNOWN",
            CoreError::CommandIdExhausted => "E_CORE_COMMAND_ID_EXHAUSTED",
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            CoreError::ProjectNotFound { .. } => "PROJECT_NOT_FOUND",
            CoreError::SceneNotFound { .. } => "SCENE_NOT_FOUND",
            CoreError::ProjectExists { .. } => "PROJECT_ALREADY_EXISTS",
            CoreError::SceneExists { .. } => "SCENE_ALREADY_EXISTS",
            CoreError::InvalidPayload { .. } => "PAYLOAD_INVALID",
            CoreError::UnknownCommand { .. } => "COMMAND_UNKNOWN",
            CoreError::CommandIdExhausted => "COMMAND_ID_EXHAUSTED",
        }
    }

    pub fn details(&self) -> Details {
        let mut details = Details::new();
        let mut put = |key: &str, value: &str| {
            details.insert(key.to_string(), Value::String(value.to_string()));
        };

        match self {
            CoreError::ProjectNotFound { project_id } | CoreError::ProjectExists { project_id } => {
                put("projectId", project_id);
            }
            CoreError::SceneNotFound { project_id, scene_id }
            | CoreError::SceneExists { project_id, scene_id } => {
                put("projectId", project_id);
                put("sceneId", scene_id);
            }
            CoreError::InvalidPayload { field, message } => {
                put("field", field);
                put("message", message);
            }
            CoreError::UnknownCommand { command_id } => {
                put("commandId", command_id);
            }
            CoreError::CommandIdExhausted => {}
        }

        if let CoreError::CommandIdExhausted = self {
            details.insert("lastCommandId".to_string(), Value::from(u64::MAX));
        }

        details
    }

    /// Serializable envelope for the failed operation `op`
    pub fn to_envelope(&self, op: &str) -> ErrorEnvelope {
        ErrorEnvelope {
            code: self.code().to_string(),
            op: op.to_string(),
            reason: self.reason().to_string(),
            details: self.details(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_not_found_envelope() {
        let err = CoreError::ProjectNotFound {
            project_id: "p-9".to_string(),
        };
        let envelope = err.to_envelope("project.applyTextEdit");

        assert_eq!(envelope.code, "E_CORE_PROJECT_NOT_FOUND");
        assert_eq!(envelope.op, "project.applyTextEdit");
        assert_eq!(envelope.reason, "PROJECT_NOT_FOUND");
        assert_eq!(envelope.detail_str("projectId"), Some("p-9"));
        assert_eq!(envelope.details.len(), 1);
    }

    #[test]
    fn test_display_is_human_readable() {
        let err = CoreError::SceneNotFound {
            project_id: "p".to_string(),
            scene_id: "s".to_string(),
        };
        assert_eq!(err.to_string(), "Scene not found: p/s");
    }
}
