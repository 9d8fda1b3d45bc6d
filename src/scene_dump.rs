use crate::canvas::Scene;
use crate::geometry::Rect;
use crate::issues::StatusCategory;
use crate::model::Endpoint;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDump {
    pub bounds: Option<Rect>,
    pub groups: Vec<GroupDump>,
    pub cards: Vec<CardDump>,
    pub relations: Vec<RelationDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDump {
    pub id: String,
    pub name: String,
    pub parent_group_id: Option<String>,
    pub depth: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDump {
    pub id: String,
    pub label: String,
    pub status: StatusCategory,
    pub is_virtual: bool,
    pub group_id: Option<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationDump {
    pub id: String,
    pub from: Endpoint,
    pub to: Endpoint,
    pub path: String,
    pub points: Vec<[f32; 2]>,
    pub start: [f32; 2],
    pub end: [f32; 2],
    pub routed: bool,
    pub manual: bool,
}

impl SceneDump {
    pub fn from_scene(scene: &Scene) -> Self {
        let groups = scene
            .groups
            .iter()
            .map(|group| GroupDump {
                id: group.id.clone(),
                name: group.name.clone(),
                parent_group_id: group.parent_group_id.clone(),
                depth: group.depth,
                x: group.rect.x,
                y: group.rect.y,
                width: group.rect.width,
                height: group.rect.height,
            })
            .collect();

        let cards = scene
            .cards
            .iter()
            .map(|card| CardDump {
                id: card.id.clone(),
                label: card.label.clone(),
                status: card.status,
                is_virtual: card.is_virtual,
                group_id: card.group_id.clone(),
                x: card.rect.x,
                y: card.rect.y,
                width: card.rect.width,
                height: card.rect.height,
            })
            .collect();

        let relations = scene
            .relations
            .iter()
            .map(|relation| RelationDump {
                id: relation.id.clone(),
                from: relation.from.clone(),
                to: relation.to.clone(),
                path: relation.path.clone(),
                points: relation.waypoints.iter().map(|(x, y)| [*x, *y]).collect(),
                start: [relation.start.0, relation.start.1],
                end: [relation.end.0, relation.end.1],
                routed: relation.routed,
                manual: relation.manual,
            })
            .collect();

        SceneDump {
            bounds: scene.bounds,
            groups,
            cards,
            relations,
        }
    }
}

pub fn scene_to_json(scene: &Scene) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&SceneDump::from_scene(scene))?)
}

pub fn write_scene_dump(path: &Path, scene: &Scene) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = SceneDump::from_scene(scene);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
