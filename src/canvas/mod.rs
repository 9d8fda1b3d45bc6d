//! The canvas engine: resolves every card, group and relation of one canvas
//! to absolute geometry and routed arrow paths.

pub mod changeset;
pub mod coords;
pub mod drag;
pub mod editing;
pub mod error;
pub mod fallback;
pub mod placement;
pub mod relations;
pub mod routing;
pub mod scheduler;
pub mod simplify;
pub mod viewport;
pub mod waypoints;

use std::collections::{HashMap, HashSet};

use crate::config::CanvasConfig;
use crate::geometry::{AnchorPosition, Rect};
use crate::issues::{IssueRepository, StatusCategory};
use crate::log::warn;
use crate::model::{Canvas, CardSource, Document, Endpoint, EndpointKind, VirtualTicket};

use self::coords::GroupTree;
use self::routing::route_edge;
use self::waypoints::route_through_waypoints;

/// Resolves an element to its absolute rect. The router only ever sees
/// rects through this seam.
pub trait RectLookup {
    fn rect(&self, kind: EndpointKind, id: &str) -> Option<Rect>;
}

impl<F> RectLookup for F
where
    F: Fn(EndpointKind, &str) -> Option<Rect>,
{
    fn rect(&self, kind: EndpointKind, id: &str) -> Option<Rect> {
        self(kind, id)
    }
}

/// Absolute rects of every card and group on a canvas.
#[derive(Debug, Clone, Default)]
pub struct SceneIndex {
    cards: HashMap<String, Rect>,
    groups: HashMap<String, Rect>,
}

impl SceneIndex {
    pub fn build(canvas: &Canvas, config: &CanvasConfig) -> Self {
        let tree = GroupTree::new(&canvas.groups, &config.groups);
        let groups = canvas
            .groups
            .iter()
            .filter_map(|group| Some((group.id.clone(), tree.absolute_rect(&group.id)?)))
            .collect();
        let cards = canvas
            .cards
            .iter()
            .map(|card| {
                let (x, y) = tree.to_absolute_coords((card.x, card.y), card.group_id.as_deref());
                (
                    card.id.clone(),
                    Rect::new(x, y, config.cards.width, config.cards.height),
                )
            })
            .collect();
        Self { cards, groups }
    }
}

impl RectLookup for SceneIndex {
    fn rect(&self, kind: EndpointKind, id: &str) -> Option<Rect> {
        match kind {
            EndpointKind::Link => self.cards.get(id).copied(),
            EndpointKind::Group => self.groups.get(id).copied(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardView {
    pub id: String,
    /// Issue key, or the virtual ticket's summary.
    pub label: String,
    pub status: StatusCategory,
    pub is_virtual: bool,
    pub group_id: Option<String>,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupView {
    pub id: String,
    pub name: String,
    pub parent_group_id: Option<String>,
    pub depth: usize,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationView {
    pub id: String,
    pub from: Endpoint,
    pub to: Endpoint,
    /// SVG `d` attribute.
    pub path: String,
    pub waypoints: Vec<(f32, f32)>,
    pub start: (f32, f32),
    pub end: (f32, f32),
    pub routed: bool,
    pub manual: bool,
}

/// Everything the render boundary needs for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    /// Paint order: groups first, then cards, then relations.
    pub groups: Vec<GroupView>,
    pub cards: Vec<CardView>,
    pub relations: Vec<RelationView>,
    pub bounds: Option<Rect>,
}

impl Scene {
    pub fn relation(&self, id: &str) -> Option<&RelationView> {
        self.relations.iter().find(|relation| relation.id == id)
    }

    pub fn card(&self, id: &str) -> Option<&CardView> {
        self.cards.iter().find(|card| card.id == id)
    }

    pub fn group(&self, id: &str) -> Option<&GroupView> {
        self.groups.iter().find(|group| group.id == id)
    }
}

impl RectLookup for Scene {
    fn rect(&self, kind: EndpointKind, id: &str) -> Option<Rect> {
        match kind {
            EndpointKind::Link => self.card(id).map(|card| card.rect),
            EndpointKind::Group => self.group(id).map(|group| group.rect),
        }
    }
}

pub fn compute_scene(
    canvas: &Canvas,
    issues: &dyn IssueRepository,
    tickets: &[VirtualTicket],
    config: &CanvasConfig,
) -> Scene {
    let tree = GroupTree::new(&canvas.groups, &config.groups);
    let index = SceneIndex::build(canvas, config);

    let groups: Vec<GroupView> = canvas
        .groups
        .iter()
        .filter_map(|group| {
            Some(GroupView {
                id: group.id.clone(),
                name: group.name.clone(),
                parent_group_id: group.parent_group_id.clone(),
                depth: tree.group_depth(&group.id),
                rect: index.rect(EndpointKind::Group, &group.id)?,
            })
        })
        .collect();

    let cards: Vec<CardView> = canvas
        .cards
        .iter()
        .filter_map(|card| {
            let (label, status, is_virtual) = match &card.source {
                CardSource::Issue { key } => (
                    key.clone(),
                    issues.status_category(key).unwrap_or_default(),
                    false,
                ),
                CardSource::Virtual { ticket_id } => {
                    match tickets.iter().find(|ticket| &ticket.id == ticket_id) {
                        Some(ticket) => (ticket.summary.clone(), ticket.status, true),
                        None => (ticket_id.clone(), StatusCategory::Unknown, true),
                    }
                }
            };
            Some(CardView {
                id: card.id.clone(),
                label,
                status,
                is_virtual,
                group_id: card.group_id.clone(),
                rect: index.rect(EndpointKind::Link, &card.id)?,
            })
        })
        .collect();

    let mut relations = Vec::with_capacity(canvas.relations.len());
    for relation in &canvas.relations {
        let (Some(from_rect), Some(to_rect)) = (
            index.rect(relation.from.kind, &relation.from.id),
            index.rect(relation.to.kind, &relation.to.id),
        ) else {
            warn!(relation = %relation.id, "skipping relation with a missing endpoint");
            continue;
        };
        let edge = match relation.waypoints.as_deref() {
            Some(points) if !points.is_empty() => {
                let points: Vec<(f32, f32)> = points.iter().map(|&p| p.into()).collect();
                route_through_waypoints(
                    &from_rect,
                    relation.from.anchor,
                    &to_rect,
                    relation.to.anchor,
                    &points,
                    &config.routing,
                )
            }
            _ => {
                let obstacles = relation_obstacles(canvas, &tree, &groups, &cards, relation);
                route_edge(
                    &from_rect,
                    relation.from.anchor,
                    &to_rect,
                    relation.to.anchor,
                    &obstacles,
                    &config.routing,
                )
            }
        };
        let start = edge.waypoints.first().copied().unwrap_or_default();
        let end = edge.waypoints.last().copied().unwrap_or_default();
        relations.push(RelationView {
            id: relation.id.clone(),
            from: relation.from.clone(),
            to: relation.to.clone(),
            path: edge.path,
            waypoints: edge.waypoints,
            start,
            end,
            routed: edge.routed,
            manual: edge.manual,
        });
    }

    let bounds = scene_bounds(&groups, &cards, &relations);
    Scene {
        groups,
        cards,
        relations,
        bounds,
    }
}

/// Scene for one key result's canvas, with virtual tickets taken from the
/// document.
pub fn compute_document_scene(
    document: &Document,
    key_result_id: &str,
    issues: &dyn IssueRepository,
    config: &CanvasConfig,
) -> Option<Scene> {
    let canvas = document.canvas(key_result_id)?;
    Some(compute_scene(
        canvas,
        issues,
        &document.virtual_tickets,
        config,
    ))
}

/// Rects a relation must avoid: every card and group except its two
/// endpoints and the groups enclosing either of them.
fn relation_obstacles(
    canvas: &Canvas,
    tree: &GroupTree<'_>,
    groups: &[GroupView],
    cards: &[CardView],
    relation: &crate::model::Relation,
) -> Vec<Rect> {
    let mut skip_groups: HashSet<&str> = HashSet::new();
    let mut skip_cards: HashSet<&str> = HashSet::new();
    for endpoint in [&relation.from, &relation.to] {
        match endpoint.kind {
            EndpointKind::Link => {
                skip_cards.insert(endpoint.id.as_str());
                if let Some(owner) = canvas
                    .card(&endpoint.id)
                    .and_then(|card| card.group_id.as_deref())
                {
                    skip_groups.insert(owner);
                    skip_groups.extend(tree.ancestors(owner));
                }
            }
            EndpointKind::Group => {
                skip_groups.insert(endpoint.id.as_str());
                skip_groups.extend(tree.ancestors(&endpoint.id));
            }
        }
    }
    groups
        .iter()
        .filter(|group| !skip_groups.contains(group.id.as_str()))
        .map(|group| group.rect)
        .chain(
            cards
                .iter()
                .filter(|card| !skip_cards.contains(card.id.as_str()))
                .map(|card| card.rect),
        )
        .collect()
}

fn scene_bounds(groups: &[GroupView], cards: &[CardView], relations: &[RelationView]) -> Option<Rect> {
    let rects = groups
        .iter()
        .map(|group| group.rect)
        .chain(cards.iter().map(|card| card.rect));
    let mut bounds: Option<Rect> = None;
    for rect in rects {
        bounds = Some(match bounds {
            Some(current) => current.union(&rect),
            None => rect,
        });
    }
    for relation in relations {
        if let Some(path_box) = Rect::bounding(&relation.waypoints) {
            bounds = Some(match bounds {
                Some(current) => current.union(&path_box),
                None => path_box,
            });
        }
    }
    bounds
}

/// Anchors for a relation between two resolved elements.
pub fn suggest_anchors(
    lookup: &impl RectLookup,
    from: (EndpointKind, &str),
    to: (EndpointKind, &str),
) -> Option<(AnchorPosition, AnchorPosition)> {
    let from_rect = lookup.rect(from.0, from.1)?;
    let to_rect = lookup.rect(to.0, to.1)?;
    Some(crate::geometry::suggest_anchor_pair(&from_rect, &to_rect))
}
