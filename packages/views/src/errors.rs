use manuscript_common::ErrorEnvelope;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewError {
    #[error("View disabled by capability: {capability}")]
    CapabilityDisabled { capability: String },

    #[error("Project not found: {project_id}")]
    ProjectNotFound { project_id: String },

    #[error("Scene not found: {project_id}/{scene_id}")]
    SceneNotFound {
        project_id: String,
        scene_id: String,
    },

    #[error("Invalid view params: {message}")]
    InvalidParams { message: String },
}

impl ViewError {
    pub fn code(&self) -> &'static str {
        match self {
            ViewError::CapabilityDisabled { .. } => "E_VIEW_CAPABILITY_DISABLED",
            ViewError::ProjectNotFound { .. } => "E_VIEW_PROJECT_NOT_FOUND",
            ViewError::SceneNotFound { .. } => "E_VIEW_SCENE_NOT_FOUND",
            ViewError::InvalidParams { .. } => "E_VIEW_PARAMS_INVALID",
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            ViewError::CapabilityDisabled { .. } => "CAPABILITY_DISABLED",
            ViewError::ProjectNotFound { .. } => "PROJECT_NOT_FOUND",
            ViewError::SceneNotFound { .. } => "SCENE_NOT_FOUND",
            ViewError::InvalidParams { .. } => "PARAMS_INVALID",
        }
    }

    pub fn to_envelope(&self, op: &str) -> ErrorEnvelope {
        let envelope = ErrorEnvelope::new(self.code(), op, self.reason());
        match self {
            ViewError::CapabilityDisabled { capability } => {
                envelope.with_detail("capability", capability.clone())
            }
            ViewError::ProjectNotFound { project_id } => {
                envelope.with_detail("projectId", project_id.clone())
            }
            ViewError::SceneNotFound {
                project_id,
                scene_id,
            } => envelope
                .with_detail("projectId", project_id.clone())
                .with_detail("sceneId", scene_id.clone()),
            ViewError::InvalidParams { message } => envelope.with_detail("message", message.clone()),
        }
    }
}
