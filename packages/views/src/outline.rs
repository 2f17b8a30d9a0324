//! Reference outline: the ATX heading skeleton of every scene.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::engine::{run, DeriveInput, DerivedViewResult, ViewKind};
use crate::errors::ViewError;

const MAX_HEADING_LEVEL: u8 = 6;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct OutlineParams {
    project_id: Option<String>,
    max_depth: Option<u8>,
}

/// Headings in project, scene, line order.
///
/// Params: `projectId` (optional), `maxDepth` (1..=6, optional).
pub fn derive_reference_outline(input: DeriveInput<'_>) -> DerivedViewResult {
    run(ViewKind::ReferenceOutline, input, build)
}

fn build(input: &DeriveInput<'_>) -> Result<Value, ViewError> {
    let params: OutlineParams = input.params()?;

    let max_depth = match params.max_depth {
        Some(depth) if depth == 0 || depth > MAX_HEADING_LEVEL => {
            return Err(ViewError::InvalidParams {
                message: format!("maxDepth must be between 1 and {}", MAX_HEADING_LEVEL),
            })
        }
        Some(depth) => depth,
        None => MAX_HEADING_LEVEL,
    };

    let mut headings = Vec::new();
    for project in input.projects(params.project_id.as_deref())? {
        for scene in project.scenes.values() {
            for (line, level, text) in scan_headings(&scene.text) {
                if level <= max_depth {
                    headings.push(json!({
                        "projectId": project.id,
                        "sceneId": scene.id,
                        "level": level,
                        "text": text,
                        "line": line,
                    }));
                }
            }
        }
    }

    Ok(json!({ "headings": headings }))
}

/// `(line, level, text)` for each heading outside fenced code blocks
fn scan_headings(text: &str) -> Vec<(usize, u8, &str)> {
    let mut out = Vec::new();
    let mut fence: Option<char> = None;

    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim_start();
        if let Some(marker) = fence_marker(trimmed) {
            fence = match fence {
                None => Some(marker),
                Some(open) if open == marker => None,
                other => other,
            };
            continue;
        }
        if fence.is_some() {
            continue;
        }
        if let Some((level, heading)) = parse_heading(line) {
            out.push((index + 1, level, heading));
        }
    }

    out
}

fn fence_marker(line: &str) -> Option<char> {
    if line.starts_with("```") {
        Some('`')
    } else if line.starts_with("~~~") {
        Some('~')
    } else {
        None
    }
}

fn parse_heading(line: &str) -> Option<(u8, &str)> {
    let rest = line.trim_start_matches(' ');
    if line.len() - rest.len() > 3 {
        return None;
    }

    let level = rest.bytes().take_while(|b| *b == b'#').count();
    if level == 0 || level > MAX_HEADING_LEVEL as usize {
        return None;
    }

    let after = &rest[level..];
    if !after.is_empty() && !after.starts_with(|c: char| c == ' ' || c == '\t') {
        return None;
    }

    Some((level as u8, strip_closing_hashes(after.trim())))
}

fn strip_closing_hashes(text: &str) -> &str {
    let without = text.trim_end_matches('#');
    if without.len() == text.len() {
        text
    } else if without.is_empty() {
        ""
    } else if without.ends_with(|c: char| c == ' ' || c == '\t') {
        without.trim_end()
    } else {
        text
    }
}
