//! Creating and deleting relations, the two-click connect tool, cascades
//! on element deletion, and waypoint editing.

use crate::config::GroupConfig;
use crate::model::{Canvas, Endpoint, EndpointKind, Point, Relation};

use super::RectLookup;
use super::coords::GroupTree;
use super::error::CanvasError;
use super::waypoints::{find_best_insert_index, manual_control_points, waypoint_insert_position};

/// Whether a relation already joins the two elements, in either direction.
/// Anchors are ignored.
pub fn relation_exists(
    relations: &[Relation],
    from_kind: EndpointKind,
    from_id: &str,
    to_kind: EndpointKind,
    to_id: &str,
) -> bool {
    relations.iter().any(|relation| {
        (relation.from.refers_to(from_kind, from_id) && relation.to.refers_to(to_kind, to_id))
            || (relation.from.refers_to(to_kind, to_id) && relation.to.refers_to(from_kind, from_id))
    })
}

/// What deleting a group removed or changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupDeletion {
    /// The group itself first, then its descendants.
    pub removed_groups: Vec<String>,
    /// Member cards moved onto the canvas.
    pub detached_cards: Vec<String>,
    pub removed_relations: Vec<String>,
}

impl Canvas {
    pub fn add_relation(&mut self, from: Endpoint, to: Endpoint) -> Result<String, CanvasError> {
        self.validate_relation(&from, &to)?;
        let id = self.mint_id("rel");
        self.relations.push(Relation {
            id: id.clone(),
            from,
            to,
            waypoints: None,
        });
        Ok(id)
    }

    pub fn add_relation_with_id(
        &mut self,
        id: String,
        from: Endpoint,
        to: Endpoint,
    ) -> Result<(), CanvasError> {
        self.validate_relation(&from, &to)?;
        self.relations.push(Relation {
            id,
            from,
            to,
            waypoints: None,
        });
        Ok(())
    }

    fn validate_relation(&self, from: &Endpoint, to: &Endpoint) -> Result<(), CanvasError> {
        for endpoint in [from, to] {
            if !self.has_endpoint(endpoint.kind, &endpoint.id) {
                return Err(CanvasError::UnknownEndpoint {
                    kind: endpoint.kind,
                    id: endpoint.id.clone(),
                });
            }
        }
        if from.same_element(to) {
            return Err(CanvasError::SelfRelation);
        }
        if relation_exists(&self.relations, from.kind, &from.id, to.kind, &to.id) {
            return Err(CanvasError::DuplicateRelation);
        }
        Ok(())
    }

    pub fn delete_relation(&mut self, id: &str) -> Result<Relation, CanvasError> {
        let idx = self
            .relations
            .iter()
            .position(|relation| relation.id == id)
            .ok_or_else(|| CanvasError::UnknownRelation(id.to_string()))?;
        Ok(self.relations.remove(idx))
    }

    /// Remove every relation touching the element; returns their ids.
    fn remove_relations_touching(&mut self, kind: EndpointKind, id: &str) -> Vec<String> {
        let mut removed = Vec::new();
        self.relations.retain(|relation| {
            if relation.touches(kind, id) {
                removed.push(relation.id.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Delete a card and the relations attached to it. Returns the ids of
    /// the removed relations.
    pub fn delete_card(&mut self, id: &str) -> Result<Vec<String>, CanvasError> {
        let idx = self
            .cards
            .iter()
            .position(|card| card.id == id)
            .ok_or_else(|| CanvasError::UnknownCard(id.to_string()))?;
        self.cards.remove(idx);
        Ok(self.remove_relations_touching(EndpointKind::Link, id))
    }

    /// Delete a group with all of its descendant groups. Member cards stay
    /// on the canvas at their current absolute position.
    pub fn delete_group(
        &mut self,
        id: &str,
        config: &GroupConfig,
    ) -> Result<GroupDeletion, CanvasError> {
        if self.group(id).is_none() {
            return Err(CanvasError::UnknownGroup(id.to_string()));
        }
        let (removed_groups, detached) = {
            let tree = GroupTree::new(&self.groups, config);
            let mut removed_groups = vec![id.to_string()];
            removed_groups.extend(tree.descendants(id).into_iter().map(str::to_string));
            let detached: Vec<(String, (f32, f32))> = self
                .cards
                .iter()
                .filter_map(|card| {
                    let owner = card.group_id.as_deref()?;
                    if !removed_groups.iter().any(|group| group == owner) {
                        return None;
                    }
                    let absolute = tree.to_absolute_coords((card.x, card.y), Some(owner));
                    Some((card.id.clone(), absolute))
                })
                .collect();
            (removed_groups, detached)
        };

        let mut detached_cards = Vec::with_capacity(detached.len());
        for (card_id, (x, y)) in detached {
            if let Some(card) = self.card_mut(&card_id) {
                card.x = x;
                card.y = y;
                card.group_id = None;
            }
            detached_cards.push(card_id);
        }

        self.groups
            .retain(|group| !removed_groups.iter().any(|removed| removed == &group.id));
        let mut removed_relations = Vec::new();
        for group_id in &removed_groups {
            removed_relations.extend(self.remove_relations_touching(EndpointKind::Group, group_id));
        }

        Ok(GroupDeletion {
            removed_groups,
            detached_cards,
            removed_relations,
        })
    }

    /// Insert a bend point on the segment of the relation's path nearest to
    /// `point`. Returns the index of the new waypoint.
    pub fn add_waypoint(
        &mut self,
        relation_id: &str,
        point: (f32, f32),
        rects: &impl RectLookup,
        stub_length: f32,
    ) -> Result<usize, CanvasError> {
        let relation = self
            .relation_mut(relation_id)
            .ok_or_else(|| CanvasError::UnknownRelation(relation_id.to_string()))?;
        let current: Vec<(f32, f32)> = match relation.waypoints.as_deref() {
            Some(points) if !points.is_empty() => points.iter().map(|&p| p.into()).collect(),
            _ => {
                relation.waypoints = Some(vec![point.into()]);
                return Ok(0);
            }
        };

        let rect_for = |endpoint: &Endpoint| {
            rects
                .rect(endpoint.kind, &endpoint.id)
                .ok_or_else(|| CanvasError::UnknownEndpoint {
                    kind: endpoint.kind,
                    id: endpoint.id.clone(),
                })
        };
        let from_rect = rect_for(&relation.from)?;
        let to_rect = rect_for(&relation.to)?;
        let control = manual_control_points(
            &from_rect,
            relation.from.anchor,
            &to_rect,
            relation.to.anchor,
            &current,
            stub_length,
        );
        let segment = find_best_insert_index(&control, point);
        let index = waypoint_insert_position(segment, current.len());
        relation
            .waypoints
            .get_or_insert_with(Vec::new)
            .insert(index, point.into());
        Ok(index)
    }

    pub fn move_waypoint(
        &mut self,
        relation_id: &str,
        index: usize,
        point: (f32, f32),
    ) -> Result<(), CanvasError> {
        let points = self.waypoints_mut(relation_id, index)?;
        let len = points.len();
        let slot = points
            .get_mut(index)
            .ok_or(CanvasError::WaypointOutOfRange { index, len })?;
        *slot = Point::from(point);
        Ok(())
    }

    /// Remove one waypoint. Removing the last one returns the relation to
    /// automatic routing.
    pub fn remove_waypoint(&mut self, relation_id: &str, index: usize) -> Result<Point, CanvasError> {
        let points = self.waypoints_mut(relation_id, index)?;
        let len = points.len();
        if index >= len {
            return Err(CanvasError::WaypointOutOfRange { index, len });
        }
        let removed = points.remove(index);
        if points.is_empty()
            && let Some(relation) = self.relation_mut(relation_id)
        {
            relation.waypoints = None;
        }
        Ok(removed)
    }

    pub fn clear_waypoints(&mut self, relation_id: &str) -> Result<(), CanvasError> {
        let relation = self
            .relation_mut(relation_id)
            .ok_or_else(|| CanvasError::UnknownRelation(relation_id.to_string()))?;
        relation.waypoints = None;
        Ok(())
    }

    fn waypoints_mut(
        &mut self,
        relation_id: &str,
        index: usize,
    ) -> Result<&mut Vec<Point>, CanvasError> {
        let relation = self
            .relation_mut(relation_id)
            .ok_or_else(|| CanvasError::UnknownRelation(relation_id.to_string()))?;
        relation
            .waypoints
            .as_mut()
            .ok_or(CanvasError::WaypointOutOfRange { index, len: 0 })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ConnectState {
    #[default]
    Idle,
    ArmedWithSource(Endpoint),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectOutcome {
    /// Connect mode is off; the click is not ours.
    Inactive,
    SourceArmed,
    /// Second click on the armed element.
    Cancelled,
    Created(String),
    /// The two elements are already related; the pending source is dropped.
    Duplicate,
}

/// Two-click relation authoring. Stays enabled after each relation so
/// several can be drawn in a row.
#[derive(Debug, Clone, Default)]
pub struct ConnectTool {
    enabled: bool,
    state: ConnectState,
}

impl ConnectTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.state = ConnectState::Idle;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn state(&self) -> &ConnectState {
        &self.state
    }

    pub fn click_anchor(
        &mut self,
        endpoint: Endpoint,
        canvas: &mut Canvas,
    ) -> Result<ConnectOutcome, CanvasError> {
        if !self.enabled {
            return Ok(ConnectOutcome::Inactive);
        }
        if !canvas.has_endpoint(endpoint.kind, &endpoint.id) {
            return Err(CanvasError::UnknownEndpoint {
                kind: endpoint.kind,
                id: endpoint.id,
            });
        }
        match std::mem::take(&mut self.state) {
            ConnectState::Idle => {
                self.state = ConnectState::ArmedWithSource(endpoint);
                Ok(ConnectOutcome::SourceArmed)
            }
            ConnectState::ArmedWithSource(source) if source.same_element(&endpoint) => {
                Ok(ConnectOutcome::Cancelled)
            }
            ConnectState::ArmedWithSource(source) => match canvas.add_relation(source, endpoint) {
                Ok(id) => Ok(ConnectOutcome::Created(id)),
                Err(CanvasError::DuplicateRelation) => Ok(ConnectOutcome::Duplicate),
                Err(err) => Err(err),
            },
        }
    }
}
