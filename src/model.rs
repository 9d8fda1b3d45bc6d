use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geometry::AnchorPosition;
use crate::issues::StatusCategory;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (f32, f32) {
    fn from(point: Point) -> Self {
        (point.x, point.y)
    }
}

/// What a relation endpoint refers to: an issue card or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    Link,
    Group,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(rename = "type")]
    pub kind: EndpointKind,
    pub id: String,
    pub anchor: AnchorPosition,
}

impl Endpoint {
    pub fn new(kind: EndpointKind, id: impl Into<String>, anchor: AnchorPosition) -> Self {
        Self {
            kind,
            id: id.into(),
            anchor,
        }
    }

    pub fn card(id: impl Into<String>, anchor: AnchorPosition) -> Self {
        Self::new(EndpointKind::Link, id, anchor)
    }

    pub fn group(id: impl Into<String>, anchor: AnchorPosition) -> Self {
        Self::new(EndpointKind::Group, id, anchor)
    }

    /// Same element, regardless of anchor.
    pub fn same_element(&self, other: &Endpoint) -> bool {
        self.kind == other.kind && self.id == other.id
    }

    pub fn refers_to(&self, kind: EndpointKind, id: &str) -> bool {
        self.kind == kind && self.id == id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub id: String,
    pub from: Endpoint,
    pub to: Endpoint,
    /// Manual bend points in canvas coordinates. `None` means automatic routing;
    /// an empty list is never stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waypoints: Option<Vec<Point>>,
}

impl Relation {
    pub fn touches(&self, kind: EndpointKind, id: &str) -> bool {
        self.from.refers_to(kind, id) || self.to.refers_to(kind, id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CardSource {
    /// A synced Jira issue.
    Issue { key: String },
    /// A local placeholder ticket.
    #[serde(rename_all = "camelCase")]
    Virtual { ticket_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub source: CardSource,
    /// Relative to the owning group's content origin when `group_id` is set,
    /// canvas-absolute otherwise.
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Relative to the immediate parent's content origin, canvas-absolute
    /// for top-level groups.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualTicket {
    pub id: String,
    pub summary: String,
    #[serde(default)]
    pub status: StatusCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objective {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyResult {
    pub id: String,
    pub objective_id: String,
    #[serde(default)]
    pub title: String,
}

/// Everything placed on one key result's canvas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Canvas {
    #[serde(default)]
    pub cards: Vec<Card>,
    /// Flat list; nesting is expressed through `parent_group_id`. Order is
    /// paint order.
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub relations: Vec<Relation>,
    #[serde(default)]
    pub next_id: u64,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == id)
    }

    pub fn card_mut(&mut self, id: &str) -> Option<&mut Card> {
        self.cards.iter_mut().find(|card| card.id == id)
    }

    pub fn group(&self, id: &str) -> Option<&Group> {
        self.groups.iter().find(|group| group.id == id)
    }

    pub fn group_mut(&mut self, id: &str) -> Option<&mut Group> {
        self.groups.iter_mut().find(|group| group.id == id)
    }

    pub fn relation(&self, id: &str) -> Option<&Relation> {
        self.relations.iter().find(|relation| relation.id == id)
    }

    pub fn relation_mut(&mut self, id: &str) -> Option<&mut Relation> {
        self.relations.iter_mut().find(|relation| relation.id == id)
    }

    pub fn has_endpoint(&self, kind: EndpointKind, id: &str) -> bool {
        match kind {
            EndpointKind::Link => self.card(id).is_some(),
            EndpointKind::Group => self.group(id).is_some(),
        }
    }

    fn id_in_use(&self, id: &str) -> bool {
        self.card(id).is_some() || self.group(id).is_some() || self.relation(id).is_some()
    }

    /// Next unused `prefix-N` id. The counter is part of the snapshot so ids
    /// stay unique across sessions.
    pub fn mint_id(&mut self, prefix: &str) -> String {
        loop {
            self.next_id += 1;
            let candidate = format!("{prefix}-{}", self.next_id);
            if !self.id_in_use(&candidate) {
                return candidate;
            }
        }
    }
}

/// Full persisted document. The persistence collaborator stores it verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub objectives: Vec<Objective>,
    #[serde(default)]
    pub key_results: Vec<KeyResult>,
    #[serde(default)]
    pub virtual_tickets: Vec<VirtualTicket>,
    /// Keyed by key result id.
    #[serde(default)]
    pub canvases: BTreeMap<String, Canvas>,
    #[serde(default)]
    pub next_ticket_id: u64,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(contents: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn canvas(&self, key_result_id: &str) -> Option<&Canvas> {
        self.canvases.get(key_result_id)
    }

    pub fn canvas_mut(&mut self, key_result_id: &str) -> &mut Canvas {
        self.canvases.entry(key_result_id.to_string()).or_default()
    }

    pub fn virtual_ticket(&self, id: &str) -> Option<&VirtualTicket> {
        self.virtual_tickets.iter().find(|ticket| ticket.id == id)
    }

    pub fn mint_ticket_id(&mut self) -> String {
        loop {
            self.next_ticket_id += 1;
            let candidate = format!("vt-{}", self.next_ticket_id);
            if self.virtual_ticket(&candidate).is_none() {
                return candidate;
            }
        }
    }
}
