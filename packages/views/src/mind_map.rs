//! # Mind Map Graph
//!
//! Projects and scenes as nodes; containment edges from a project to its
//! scenes and reference edges for `[[sceneId]]` links between scenes of the
//! same project. Positions are integers so the output hash does not depend
//! on float formatting.

use std::collections::BTreeSet;
use std::f64::consts::PI;

use manuscript_core::{Project, Scene};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::{run, DeriveInput, DerivedViewResult, ViewKind};
use crate::errors::ViewError;

const ROW_HEIGHT: i64 = 80;
const SCENE_INDENT: i64 = 240;
const RADIAL_SPACING: i64 = 600;
const RADIAL_RADIUS: f64 = 200.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Tree,
    Radial,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct MindMapParams {
    project_id: Option<String>,
    #[serde(default)]
    layout: Layout,
}

/// Params: `projectId` (optional), `layout` (`tree` | `radial`, default tree).
pub fn derive_mind_map_graph(input: DeriveInput<'_>) -> DerivedViewResult {
    run(ViewKind::MindMapGraph, input, build)
}

fn build(input: &DeriveInput<'_>) -> Result<Value, ViewError> {
    let params: MindMapParams = input.params()?;

    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let mut row = 0i64;

    for (index, project) in input.projects(params.project_id.as_deref())?.into_iter().enumerate() {
        let project_node = project_node_id(project);
        let positions = match params.layout {
            Layout::Tree => tree_positions(project, &mut row),
            Layout::Radial => radial_positions(project, index as i64),
        };

        nodes.push(json!({
            "id": project_node,
            "kind": "project",
            "label": project.title,
            "x": positions.project.0,
            "y": positions.project.1,
        }));

        for (scene, (x, y)) in project.scenes.values().zip(positions.scenes) {
            let scene_node = scene_node_id(&project.id, &scene.id);
            nodes.push(json!({
                "id": scene_node,
                "kind": "scene",
                "label": scene_label(scene),
                "x": x,
                "y": y,
            }));
            edges.push(json!({ "from": project_node, "to": scene_node, "kind": "contains" }));
        }

        for (from, to) in reference_pairs(project) {
            edges.push(json!({
                "from": scene_node_id(&project.id, from),
                "to": scene_node_id(&project.id, to),
                "kind": "references",
            }));
        }
    }

    Ok(json!({
        "layout": params.layout,
        "nodes": nodes,
        "edges": edges,
    }))
}

struct Positions {
    project: (i64, i64),
    scenes: Vec<(i64, i64)>,
}

fn tree_positions(project: &Project, row: &mut i64) -> Positions {
    let project_pos = (0, *row * ROW_HEIGHT);
    if project.scenes.is_empty() {
        *row += 1;
    }

    let scenes = project
        .scenes
        .values()
        .map(|_| {
            let pos = (SCENE_INDENT, *row * ROW_HEIGHT);
            *row += 1;
            pos
        })
        .collect();

    Positions {
        project: project_pos,
        scenes,
    }
}

fn radial_positions(project: &Project, index: i64) -> Positions {
    let center = (index * RADIAL_SPACING, 0);
    let count = project.scenes.len();

    let scenes = (0..count)
        .map(|k| {
            let angle = 2.0 * PI * k as f64 / count as f64;
            (
                center.0 + (RADIAL_RADIUS * angle.cos()).round() as i64,
                center.1 + (RADIAL_RADIUS * angle.sin()).round() as i64,
            )
        })
        .collect();

    Positions {
        project: center,
        scenes,
    }
}

fn project_node_id(project: &Project) -> String {
    format!("project:{}", project.id)
}

fn scene_node_id(project_id: &str, scene_id: &str) -> String {
    format!("scene:{}/{}", project_id, scene_id)
}

/// First non-empty line with heading markers stripped, else the scene id
fn scene_label(scene: &Scene) -> String {
    scene
        .text
        .lines()
        .map(|line| line.trim().trim_start_matches('#').trim())
        .find(|line| !line.is_empty())
        .unwrap_or(scene.id.as_str())
        .to_string()
}

/// Distinct `(from, to)` scene id pairs, sorted; self-links and dangling
/// targets dropped
fn reference_pairs(project: &Project) -> BTreeSet<(&str, &str)> {
    let mut pairs = BTreeSet::new();
    for scene in project.scenes.values() {
        for target in scan_links(&scene.text) {
            if target != scene.id && project.scenes.contains_key(target) {
                pairs.insert((scene.id.as_str(), target));
            }
        }
    }
    pairs
}

/// Targets of `[[target]]` and `[[target|label]]` links
fn scan_links(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("[[") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("]]") else {
            break;
        };
        let inner = &after[..close];
        let target = inner.split('|').next().unwrap_or_default().trim();
        if !target.is_empty() && !target.contains('\n') {
            out.push(target);
        }
        rest = &after[close + 2..];
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_links() {
        assert_eq!(
            scan_links("see [[s-2]] and [[ s-3 | the end ]] but not [[]] or [[open"),
            vec!["s-2", "s-3"]
        );
    }

    #[test]
    fn test_radial_positions_are_integral_and_centered() {
        let mut project = Project::new("p", "P");
        for id in ["a", "b", "c", "d"] {
            project.scenes.insert(id.to_string(), Scene::new(id, ""));
        }

        let positions = radial_positions(&project, 1);
        assert_eq!(positions.project, (600, 0));
        assert_eq!(
            positions.scenes,
            vec![(800, 0), (600, 200), (400, 0), (600, -200)]
        );
    }

    #[test]
    fn test_scene_label() {
        assert_eq!(scene_label(&Scene::new("s", "\n## Storm\nrain")), "Storm");
        assert_eq!(scene_label(&Scene::new("s", "   ")), "s");
    }
}
