//! Comment annotations: `<!-- ... -->` blocks embedded in scene text.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::engine::{run, DeriveInput, DerivedViewResult, ViewKind};
use crate::errors::ViewError;

const OPEN: &str = "<!--";
const CLOSE: &str = "-->";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CommentParams {
    project_id: Option<String>,
    scene_id: Option<String>,
}

/// Params: `projectId`, `sceneId` (the latter requires the former).
pub fn derive_comments(input: DeriveInput<'_>) -> DerivedViewResult {
    run(ViewKind::Comments, input, build)
}

fn build(input: &DeriveInput<'_>) -> Result<Value, ViewError> {
    let params: CommentParams = input.params()?;

    if params.scene_id.is_some() && params.project_id.is_none() {
        return Err(ViewError::InvalidParams {
            message: "sceneId requires projectId".to_string(),
        });
    }

    let mut comments = Vec::new();
    for project in input.projects(params.project_id.as_deref())? {
        let scenes: Vec<_> = match &params.scene_id {
            Some(scene_id) => vec![project.scenes.get(scene_id).ok_or_else(|| {
                ViewError::SceneNotFound {
                    project_id: project.id.clone(),
                    scene_id: scene_id.clone(),
                }
            })?],
            None => project.scenes.values().collect(),
        };

        for scene in scenes {
            for annotation in scan_comments(&scene.text) {
                comments.push(json!({
                    "projectId": project.id,
                    "sceneId": scene.id,
                    "line": annotation.line,
                    "offset": annotation.offset,
                    "text": annotation.body,
                }));
            }
        }
    }

    Ok(json!({ "comments": comments }))
}

#[derive(Debug, PartialEq)]
struct Annotation<'a> {
    /// 1-based line of the opening marker
    line: usize,
    /// Char offset of the opening marker
    offset: usize,
    body: &'a str,
}

/// Closed comments only; an unterminated `<!--` ends the scan.
fn scan_comments(text: &str) -> Vec<Annotation<'_>> {
    let mut out = Vec::new();
    let mut cursor = 0;

    while let Some(found) = text[cursor..].find(OPEN) {
        let open = cursor + found;
        let body_start = open + OPEN.len();
        let Some(len) = text[body_start..].find(CLOSE) else {
            break;
        };

        let prefix = &text[..open];
        out.push(Annotation {
            line: prefix.matches('\n').count() + 1,
            offset: prefix.chars().count(),
            body: text[body_start..body_start + len].trim(),
        });
        cursor = body_start + len + CLOSE.len();
    }

    out
}
