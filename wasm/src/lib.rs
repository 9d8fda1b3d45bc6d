use std::collections::HashMap;

use okr_canvas::issues::{InMemoryIssues, StatusCategory};
use okr_canvas::render::render_svg;
use okr_canvas::scene_dump::scene_to_json;
use okr_canvas::{Config, Document, MergeReport, apply_change_set, compute_document_scene, parse_change_set, parse_config};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanvasOptions {
    /// Same shape as the CLI's config file.
    config: Option<serde_json::Value>,
    /// Issue key to Jira status-category key.
    issues: Option<HashMap<String, String>>,
}

struct Prepared {
    config: Config,
    issues: InMemoryIssues,
}

fn prepare(options_json: Option<String>) -> Result<Prepared, String> {
    let options = match options_json {
        Some(raw) => serde_json::from_str::<CanvasOptions>(&raw).map_err(|error| error.to_string())?,
        None => CanvasOptions::default(),
    };
    let config = match options.config {
        Some(value) => parse_config(&value.to_string()).map_err(|error| error.to_string())?,
        None => Config::default(),
    };
    let mut issues = InMemoryIssues::new();
    for (key, category) in options.issues.unwrap_or_default() {
        issues.insert(key, StatusCategory::from_jira_key(&category));
    }
    Ok(Prepared { config, issues })
}

fn scene_json(document: &str, key_result_id: &str, options_json: Option<String>) -> Result<String, String> {
    let prepared = prepare(options_json)?;
    let document = Document::from_json(document).map_err(|error| error.to_string())?;
    let scene = compute_document_scene(&document, key_result_id, &prepared.issues, &prepared.config.canvas)
        .unwrap_or_default();
    scene_to_json(&scene).map_err(|error| error.to_string())
}

fn canvas_svg(document: &str, key_result_id: &str, options_json: Option<String>) -> Result<String, String> {
    let prepared = prepare(options_json)?;
    let document = Document::from_json(document).map_err(|error| error.to_string())?;
    let config = &prepared.config;
    let scene = compute_document_scene(&document, key_result_id, &prepared.issues, &config.canvas)
        .unwrap_or_default();
    Ok(render_svg(&scene, &config.theme, &config.canvas.groups, &config.render))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MergeOutput {
    document: Document,
    report: MergeReport,
}

fn merge_json(
    document: &str,
    key_result_id: &str,
    changes: &str,
    options_json: Option<String>,
) -> Result<String, String> {
    let prepared = prepare(options_json)?;
    let mut document = Document::from_json(document).map_err(|error| error.to_string())?;
    let set = parse_change_set(changes).map_err(|error| error.to_string())?;
    let report = apply_change_set(&mut document, key_result_id, &set, &prepared.config.canvas);
    serde_json::to_string(&MergeOutput { document, report }).map_err(|error| error.to_string())
}

/// Absolute geometry and routed paths of one canvas, as JSON.
#[wasm_bindgen]
pub fn compute_scene_json(
    document: &str,
    key_result_id: &str,
    options_json: Option<String>,
) -> Result<String, JsValue> {
    scene_json(document, key_result_id, options_json).map_err(|error| JsValue::from_str(&error))
}

#[wasm_bindgen]
pub fn render_canvas_svg(
    document: &str,
    key_result_id: &str,
    options_json: Option<String>,
) -> Result<String, JsValue> {
    canvas_svg(document, key_result_id, options_json).map_err(|error| JsValue::from_str(&error))
}

/// Merge a change set; returns `{ document, report }`.
#[wasm_bindgen]
pub fn apply_change_set_json(
    document: &str,
    key_result_id: &str,
    changes: &str,
    options_json: Option<String>,
) -> Result<String, JsValue> {
    merge_json(document, key_result_id, changes, options_json).map_err(|error| JsValue::from_str(&error))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "keyResults": [{ "id": "kr-1", "objectiveId": "o-1", "title": "Grow" }],
        "canvases": {
            "kr-1": {
                "cards": [
                    { "id": "c1", "source": { "kind": "issue", "key": "OKR-1" }, "x": 0, "y": 0 },
                    { "id": "c2", "source": { "kind": "issue", "key": "OKR-2" }, "x": 400, "y": 0 }
                ],
                "relations": [{
                    "id": "r1",
                    "from": { "type": "link", "id": "c1", "anchor": "right" },
                    "to": { "type": "link", "id": "c2", "anchor": "left" }
                }]
            }
        }
    }"#;

    #[test]
    fn scene_json_reports_routed_relation() {
        let options = r#"{ "issues": { "OKR-1": "done" }, "config": { "theme": "classic" } }"#;
        let json = scene_json(DOCUMENT, "kr-1", Some(options.to_string())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["cards"][0]["status"], "done");
        assert_eq!(value["cards"][1]["status"], "unknown");
        assert!(value["relations"][0]["path"].as_str().unwrap().starts_with("M "));
    }

    #[test]
    fn svg_contains_cards() {
        let svg = canvas_svg(DOCUMENT, "kr-1", None).unwrap();
        assert!(svg.contains("data-card=\"c2\""));
    }

    #[test]
    fn merge_returns_document_and_report() {
        let changes = r#"[{ action: "addVirtualTicket", tempId: "t1", summary: "Spike" },
                          { action: "addCard", tempId: "n1", ticketId: "t1", x: 0, y: 200 }]"#;
        let json = merge_json(DOCUMENT, "kr-1", changes, None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["report"]["applied"], 2);
        assert_eq!(value["document"]["canvases"]["kr-1"]["cards"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn bad_options_are_reported() {
        assert!(prepare(Some("{ nope".to_string())).is_err());
    }
}
