//! Pointer-driven move of a single card or group.
//!
//! Nothing touches the document until [`DragEngine::pointer_up`]; the live
//! position is only reported back so the caller can paint a preview.

use crate::config::{CanvasConfig, DragConfig};
use crate::log::debug;
use crate::model::Canvas;

use super::coords::GroupTree;
use super::error::CanvasError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragTarget {
    Card(String),
    Group(String),
}

impl DragTarget {
    pub fn id(&self) -> &str {
        match self {
            DragTarget::Card(id) | DragTarget::Group(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub target: DragTarget,
    /// Group whose content space the item's stored position lives in.
    pub origin_group: Option<String>,
    pub start_pointer: (f32, f32),
    pub start_position: (f32, f32),
    /// Live position in the same space as `start_position`.
    pub current: (f32, f32),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    /// Pointer is down but has not travelled past the threshold.
    Armed(DragSession),
    Dragging(DragSession),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// Pointer released with no session.
    None,
    /// Threshold never exceeded; nothing changed.
    Click(DragTarget),
    GroupMoved {
        id: String,
        position: (f32, f32),
    },
    /// Card stayed with its owner (or stayed ungrouped).
    CardMoved {
        id: String,
        position: (f32, f32),
    },
    CardReparented {
        id: String,
        from: Option<String>,
        to: String,
    },
    CardDetached {
        id: String,
        from: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DragEngine {
    threshold: f32,
    state: DragState,
}

impl DragEngine {
    pub fn new(config: &DragConfig) -> Self {
        Self {
            threshold: config.threshold,
            state: DragState::Idle,
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    pub fn pointer_down(
        &mut self,
        target: DragTarget,
        pointer: (f32, f32),
        canvas: &Canvas,
    ) -> Result<(), CanvasError> {
        if self.is_active() {
            return Err(CanvasError::DragInProgress);
        }
        let (start_position, origin_group) = match &target {
            DragTarget::Card(id) => {
                let card = canvas
                    .card(id)
                    .ok_or_else(|| CanvasError::UnknownCard(id.clone()))?;
                ((card.x, card.y), card.group_id.clone())
            }
            DragTarget::Group(id) => {
                let group = canvas
                    .group(id)
                    .ok_or_else(|| CanvasError::UnknownGroup(id.clone()))?;
                ((group.x, group.y), group.parent_group_id.clone())
            }
        };
        self.state = DragState::Armed(DragSession {
            target,
            origin_group,
            start_pointer: pointer,
            start_position,
            current: start_position,
        });
        Ok(())
    }

    /// Feed a pointer position in screen pixels. Returns the live item
    /// position once the drag threshold has been exceeded.
    pub fn pointer_move(&mut self, pointer: (f32, f32), zoom: f32) -> Option<(f32, f32)> {
        let threshold = self.threshold;
        let state = std::mem::take(&mut self.state);
        let mut session = match state {
            DragState::Idle => return None,
            DragState::Armed(session) => {
                let dx = pointer.0 - session.start_pointer.0;
                let dy = pointer.1 - session.start_pointer.1;
                if dx.hypot(dy) <= threshold {
                    self.state = DragState::Armed(session);
                    return None;
                }
                session
            }
            DragState::Dragging(session) => session,
        };

        let scale = if zoom > f32::EPSILON { 1.0 / zoom } else { 1.0 };
        let mut x = session.start_position.0 + (pointer.0 - session.start_pointer.0) * scale;
        let mut y = session.start_position.1 + (pointer.1 - session.start_pointer.1) * scale;
        if session.origin_group.is_none() {
            x = x.max(0.0);
            y = y.max(0.0);
        }
        session.current = (x, y);
        self.state = DragState::Dragging(session);
        Some((x, y))
    }

    /// End the session and commit the result to `canvas`.
    pub fn pointer_up(
        &mut self,
        canvas: &mut Canvas,
        config: &CanvasConfig,
    ) -> Result<DropOutcome, CanvasError> {
        match std::mem::take(&mut self.state) {
            DragState::Idle => Ok(DropOutcome::None),
            DragState::Armed(session) => Ok(DropOutcome::Click(session.target)),
            DragState::Dragging(session) => commit(session, canvas, config),
        }
    }
}

fn commit(
    session: DragSession,
    canvas: &mut Canvas,
    config: &CanvasConfig,
) -> Result<DropOutcome, CanvasError> {
    match session.target {
        DragTarget::Group(id) => {
            let group = canvas
                .group_mut(&id)
                .ok_or_else(|| CanvasError::UnknownGroup(id.clone()))?;
            group.x = session.current.0;
            group.y = session.current.1;
            Ok(DropOutcome::GroupMoved {
                id,
                position: session.current,
            })
        }
        DragTarget::Card(id) => {
            let (position, owner) = {
                let tree = GroupTree::new(&canvas.groups, &config.groups);
                let absolute =
                    tree.to_absolute_coords(session.current, session.origin_group.as_deref());
                let owner = tree.group_at(absolute, None).map(|group| group.id.clone());
                let local = owner
                    .as_deref()
                    .map(|owner| tree.to_local_coords(absolute, Some(owner)));
                (local.unwrap_or(absolute), owner)
            };
            let card = canvas
                .card_mut(&id)
                .ok_or_else(|| CanvasError::UnknownCard(id.clone()))?;
            let previous = card.group_id.clone();
            card.x = position.0;
            card.y = position.1;
            card.group_id = owner.clone();

            let outcome = match (previous, owner) {
                (prev, next) if prev == next => DropOutcome::CardMoved { id, position },
                (from, Some(to)) => {
                    debug!(card = %id, to = %to, "card dropped into group");
                    DropOutcome::CardReparented { id, from, to }
                }
                (Some(from), None) => {
                    debug!(card = %id, from = %from, "card dropped onto canvas");
                    DropOutcome::CardDetached { id, from }
                }
                (None, None) => DropOutcome::CardMoved { id, position },
            };
            Ok(outcome)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Card, CardSource, Group};

    fn canvas() -> Canvas {
        let mut canvas = Canvas::new();
        canvas.groups.push(Group {
            id: "g1".to_string(),
            name: "Team".to_string(),
            x: 100.0,
            y: 100.0,
            width: 400.0,
            height: 300.0,
            parent_group_id: None,
        });
        canvas.groups.push(Group {
            id: "g2".to_string(),
            name: "Other".to_string(),
            x: 700.0,
            y: 100.0,
            width: 400.0,
            height: 300.0,
            parent_group_id: None,
        });
        canvas.cards.push(Card {
            id: "c1".to_string(),
            source: CardSource::Issue {
                key: "OKR-1".to_string(),
            },
            x: 10.0,
            y: 10.0,
            group_id: Some("g1".to_string()),
        });
        canvas.cards.push(Card {
            id: "c2".to_string(),
            source: CardSource::Issue {
                key: "OKR-2".to_string(),
            },
            x: 20.0,
            y: 20.0,
            group_id: None,
        });
        canvas
    }

    fn engine() -> DragEngine {
        DragEngine::new(&DragConfig { threshold: 4.0 })
    }

    #[test]
    fn small_movement_is_a_click() {
        let mut canvas = canvas();
        let before = canvas.clone();
        let mut drag = engine();
        drag.pointer_down(DragTarget::Card("c2".into()), (50.0, 50.0), &canvas)
            .unwrap();
        assert_eq!(drag.pointer_move((52.0, 52.0), 1.0), None);
        let outcome = drag.pointer_up(&mut canvas, &CanvasConfig::default()).unwrap();
        assert_eq!(outcome, DropOutcome::Click(DragTarget::Card("c2".into())));
        assert_eq!(canvas, before);
        assert!(!drag.is_active());
    }

    #[test]
    fn second_session_is_rejected() {
        let canvas = canvas();
        let mut drag = engine();
        drag.pointer_down(DragTarget::Card("c2".into()), (0.0, 0.0), &canvas)
            .unwrap();
        assert_eq!(
            drag.pointer_down(DragTarget::Card("c1".into()), (0.0, 0.0), &canvas),
            Err(CanvasError::DragInProgress)
        );
    }

    #[test]
    fn rejected_press_leaves_the_drag_running_until_release() {
        let mut canvas = canvas();
        let mut drag = engine();
        drag.pointer_down(DragTarget::Card("c2".into()), (0.0, 0.0), &canvas)
            .unwrap();
        assert_eq!(drag.pointer_move((10.0, 20.0), 1.0), Some((30.0, 40.0)));
        assert!(drag
            .pointer_down(DragTarget::Group("g1".into()), (5.0, 5.0), &canvas)
            .is_err());
        assert!(drag.is_dragging());

        let outcome = drag.pointer_up(&mut canvas, &CanvasConfig::default()).unwrap();
        assert_eq!(
            outcome,
            DropOutcome::CardMoved {
                id: "c2".into(),
                position: (30.0, 40.0)
            }
        );
        assert!(!drag.is_active());
        assert!(drag
            .pointer_down(DragTarget::Group("g1".into()), (5.0, 5.0), &canvas)
            .is_ok());
    }

    #[test]
    fn delta_is_scaled_by_zoom_and_clamped_when_ungrouped() {
        let canvas = canvas();
        let mut drag = engine();
        drag.pointer_down(DragTarget::Card("c2".into()), (100.0, 100.0), &canvas)
            .unwrap();
        assert_eq!(drag.pointer_move((120.0, 140.0), 2.0), Some((30.0, 40.0)));
        assert_eq!(drag.pointer_move((0.0, 0.0), 1.0), Some((0.0, 0.0)));
    }

    #[test]
    fn grouped_card_may_go_negative() {
        let canvas = canvas();
        let mut drag = engine();
        drag.pointer_down(DragTarget::Card("c1".into()), (0.0, 0.0), &canvas)
            .unwrap();
        assert_eq!(drag.pointer_move((-30.0, -50.0), 1.0), Some((-20.0, -40.0)));
    }

    #[test]
    fn dragging_grouped_card_to_empty_canvas_detaches_it() {
        let mut canvas = canvas();
        let config = CanvasConfig::default();
        let mut drag = engine();
        drag.pointer_down(DragTarget::Card("c1".into()), (0.0, 0.0), &canvas)
            .unwrap();
        // Local (10, 10) in g1 is absolute (110, 142); move to local (10, 510).
        drag.pointer_move((0.0, 500.0), 1.0);
        let outcome = drag.pointer_up(&mut canvas, &config).unwrap();
        assert_eq!(
            outcome,
            DropOutcome::CardDetached {
                id: "c1".into(),
                from: "g1".into()
            }
        );
        let card = canvas.card("c1").unwrap();
        assert_eq!(card.group_id, None);
        assert_eq!((card.x, card.y), (110.0, 642.0));
    }

    #[test]
    fn dropping_into_another_group_reparents() {
        let mut canvas = canvas();
        let config = CanvasConfig::default();
        let mut drag = engine();
        drag.pointer_down(DragTarget::Card("c2".into()), (0.0, 0.0), &canvas)
            .unwrap();
        // Absolute (750, 150) lies in g2's content area (starts at y = 132).
        drag.pointer_move((730.0, 130.0), 1.0);
        let outcome = drag.pointer_up(&mut canvas, &config).unwrap();
        assert_eq!(
            outcome,
            DropOutcome::CardReparented {
                id: "c2".into(),
                from: None,
                to: "g2".into()
            }
        );
        let card = canvas.card("c2").unwrap();
        assert_eq!(card.group_id.as_deref(), Some("g2"));
        assert_eq!((card.x, card.y), (50.0, 18.0));
    }

    #[test]
    fn moving_within_owner_keeps_group() {
        let mut canvas = canvas();
        let config = CanvasConfig::default();
        let mut drag = engine();
        drag.pointer_down(DragTarget::Card("c1".into()), (0.0, 0.0), &canvas)
            .unwrap();
        drag.pointer_move((40.0, 30.0), 1.0);
        let outcome = drag.pointer_up(&mut canvas, &config).unwrap();
        assert_eq!(
            outcome,
            DropOutcome::CardMoved {
                id: "c1".into(),
                position: (50.0, 40.0)
            }
        );
        assert_eq!(canvas.card("c1").unwrap().group_id.as_deref(), Some("g1"));
    }

    #[test]
    fn group_drag_commits_position_without_reparenting() {
        let mut canvas = canvas();
        let config = CanvasConfig::default();
        let mut drag = engine();
        drag.pointer_down(DragTarget::Group("g1".into()), (0.0, 0.0), &canvas)
            .unwrap();
        // Drop g1 over g2; groups never reparent on drop.
        drag.pointer_move((650.0, 20.0), 1.0);
        let outcome = drag.pointer_up(&mut canvas, &config).unwrap();
        assert_eq!(
            outcome,
            DropOutcome::GroupMoved {
                id: "g1".into(),
                position: (750.0, 120.0)
            }
        );
        assert_eq!(canvas.group("g1").unwrap().parent_group_id, None);
    }
}
