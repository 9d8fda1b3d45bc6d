//! Structural edits on cards, groups and virtual tickets.
//!
//! Positions are always stored in the owner's content space; every edit
//! that changes ownership converts through [`GroupTree`] so the element does
//! not jump on screen.

use crate::config::{CanvasConfig, GroupConfig};
use crate::geometry::Rect;
use crate::issues::StatusCategory;
use crate::log::debug;
use crate::model::{Canvas, Card, CardSource, Document, Group, VirtualTicket};

use super::coords::GroupTree;
use super::error::CanvasError;
use super::placement::assign_default_position;

impl Canvas {
    /// Rects already occupying the content space of `owner` (or the canvas
    /// root), in that space's local coordinates.
    fn occupied_in(&self, owner: Option<&str>, config: &CanvasConfig) -> Vec<Rect> {
        let cards = self
            .cards
            .iter()
            .filter(|card| card.group_id.as_deref() == owner)
            .map(|card| Rect::new(card.x, card.y, config.cards.width, config.cards.height));
        let groups = self
            .groups
            .iter()
            .filter(|group| group.parent_group_id.as_deref() == owner)
            .map(|group| Rect::new(group.x, group.y, group.width, group.height));
        cards.chain(groups).collect()
    }

    fn container_width(&self, owner: Option<&str>, config: &CanvasConfig) -> f32 {
        owner
            .and_then(|id| self.group(id))
            .map(|group| group.width)
            .unwrap_or(config.placement.container_width)
    }

    fn default_position(
        &self,
        owner: Option<&str>,
        width: f32,
        height: f32,
        config: &CanvasConfig,
    ) -> (f32, f32) {
        assign_default_position(
            &self.occupied_in(owner, config),
            width,
            height,
            self.container_width(owner, config),
            &config.placement,
        )
    }

    pub fn add_group(
        &mut self,
        name: &str,
        parent: Option<&str>,
        position: Option<(f32, f32)>,
        config: &CanvasConfig,
    ) -> Result<String, CanvasError> {
        self.check_new_group(name, parent, &config.groups)?;
        let id = self.mint_id("group");
        self.insert_group(id.clone(), name, parent, position, config);
        Ok(id)
    }

    pub fn add_group_with_id(
        &mut self,
        id: String,
        name: &str,
        parent: Option<&str>,
        position: Option<(f32, f32)>,
        config: &CanvasConfig,
    ) -> Result<(), CanvasError> {
        self.check_new_group(&id, parent, &config.groups)?;
        self.insert_group(id, name, parent, position, config);
        Ok(())
    }

    fn check_new_group(
        &self,
        label: &str,
        parent: Option<&str>,
        config: &GroupConfig,
    ) -> Result<(), CanvasError> {
        let Some(parent) = parent else {
            return Ok(());
        };
        if self.group(parent).is_none() {
            return Err(CanvasError::UnknownGroup(parent.to_string()));
        }
        let depth = GroupTree::new(&self.groups, config).group_depth(parent) + 1;
        if depth >= config.max_depth {
            return Err(CanvasError::DepthExceeded {
                group: label.to_string(),
                depth,
                max: config.max_depth,
            });
        }
        Ok(())
    }

    fn insert_group(
        &mut self,
        id: String,
        name: &str,
        parent: Option<&str>,
        position: Option<(f32, f32)>,
        config: &CanvasConfig,
    ) {
        let width = config.groups.default_width;
        let height = config.groups.default_height;
        let (x, y) =
            position.unwrap_or_else(|| self.default_position(parent, width, height, config));
        self.groups.push(Group {
            id,
            name: name.to_string(),
            x,
            y,
            width,
            height,
            parent_group_id: parent.map(str::to_string),
        });
    }

    pub fn rename_group(&mut self, id: &str, name: &str) -> Result<(), CanvasError> {
        let group = self
            .group_mut(id)
            .ok_or_else(|| CanvasError::UnknownGroup(id.to_string()))?;
        group.name = name.to_string();
        Ok(())
    }

    /// Resize, never below the configured minimum.
    pub fn resize_group(
        &mut self,
        id: &str,
        width: f32,
        height: f32,
        config: &GroupConfig,
    ) -> Result<(f32, f32), CanvasError> {
        let group = self
            .group_mut(id)
            .ok_or_else(|| CanvasError::UnknownGroup(id.to_string()))?;
        group.width = width.max(config.min_width);
        group.height = height.max(config.min_height);
        Ok((group.width, group.height))
    }

    /// Move within the current parent's content space.
    pub fn move_group(&mut self, id: &str, x: f32, y: f32) -> Result<(), CanvasError> {
        let group = self
            .group_mut(id)
            .ok_or_else(|| CanvasError::UnknownGroup(id.to_string()))?;
        group.x = x;
        group.y = y;
        Ok(())
    }

    /// Move a group under `new_parent` (or to the canvas root) keeping its
    /// absolute position. Rejects cycles and any move that would push the
    /// group or one of its descendants to `max_depth` or deeper.
    pub fn reparent_group(
        &mut self,
        id: &str,
        new_parent: Option<&str>,
        config: &GroupConfig,
    ) -> Result<(), CanvasError> {
        let (x, y) = {
            let tree = GroupTree::new(&self.groups, config);
            let rect = tree
                .absolute_rect(id)
                .ok_or_else(|| CanvasError::UnknownGroup(id.to_string()))?;
            if let Some(parent) = new_parent {
                if tree.get(parent).is_none() {
                    return Err(CanvasError::UnknownGroup(parent.to_string()));
                }
                if parent == id || tree.is_ancestor(id, parent) {
                    return Err(CanvasError::GroupCycle {
                        group: id.to_string(),
                        parent: parent.to_string(),
                    });
                }
                let depth = tree.group_depth(parent) + 1;
                let deepest = depth + tree.subtree_height(id) - 1;
                if deepest >= config.max_depth {
                    return Err(CanvasError::DepthExceeded {
                        group: id.to_string(),
                        depth: deepest,
                        max: config.max_depth,
                    });
                }
            }
            tree.to_local_coords((rect.x, rect.y), new_parent)
        };
        let group = self
            .group_mut(id)
            .ok_or_else(|| CanvasError::UnknownGroup(id.to_string()))?;
        group.x = x;
        group.y = y;
        group.parent_group_id = new_parent.map(str::to_string);
        Ok(())
    }

    /// Grow a group so every member card and child group fits inside its
    /// content area with `content_padding` to spare. Never shrinks. Returns
    /// whether the size changed.
    pub fn fit_group_to_content(&mut self, id: &str, config: &CanvasConfig) -> Result<bool, CanvasError> {
        if self.group(id).is_none() {
            return Err(CanvasError::UnknownGroup(id.to_string()));
        }
        let members = self.occupied_in(Some(id), config);
        let padding = config.groups.content_padding;
        let needed_width = members
            .iter()
            .map(|rect| rect.right() + padding)
            .fold(0.0f32, f32::max);
        let needed_height = members
            .iter()
            .map(|rect| rect.bottom() + padding)
            .fold(0.0f32, f32::max)
            + config.groups.header_height;
        let group = self
            .group_mut(id)
            .ok_or_else(|| CanvasError::UnknownGroup(id.to_string()))?;
        let width = group.width.max(needed_width);
        let height = group.height.max(needed_height);
        let changed = width != group.width || height != group.height;
        group.width = width;
        group.height = height;
        Ok(changed)
    }

    pub fn add_card(
        &mut self,
        source: CardSource,
        group: Option<&str>,
        position: Option<(f32, f32)>,
        config: &CanvasConfig,
    ) -> Result<String, CanvasError> {
        if let Some(group) = group
            && self.group(group).is_none()
        {
            return Err(CanvasError::UnknownGroup(group.to_string()));
        }
        let id = self.mint_id("card");
        self.insert_card(id.clone(), source, group, position, config);
        Ok(id)
    }

    pub fn add_card_with_id(
        &mut self,
        id: String,
        source: CardSource,
        group: Option<&str>,
        position: Option<(f32, f32)>,
        config: &CanvasConfig,
    ) -> Result<(), CanvasError> {
        if let Some(group) = group
            && self.group(group).is_none()
        {
            return Err(CanvasError::UnknownGroup(group.to_string()));
        }
        self.insert_card(id, source, group, position, config);
        Ok(())
    }

    fn insert_card(
        &mut self,
        id: String,
        source: CardSource,
        group: Option<&str>,
        position: Option<(f32, f32)>,
        config: &CanvasConfig,
    ) {
        let (x, y) = position.unwrap_or_else(|| {
            self.default_position(group, config.cards.width, config.cards.height, config)
        });
        self.cards.push(Card {
            id,
            source,
            x,
            y,
            group_id: group.map(str::to_string),
        });
    }

    /// Move within the owning group's content space.
    pub fn move_card(&mut self, id: &str, x: f32, y: f32) -> Result<(), CanvasError> {
        let card = self
            .card_mut(id)
            .ok_or_else(|| CanvasError::UnknownCard(id.to_string()))?;
        card.x = x;
        card.y = y;
        Ok(())
    }

    /// Hand a card to another owner. Without an explicit `position` (given
    /// in the new owner's space) the card keeps its absolute location.
    pub fn assign_card_to_group(
        &mut self,
        id: &str,
        group: Option<&str>,
        position: Option<(f32, f32)>,
        config: &GroupConfig,
    ) -> Result<(), CanvasError> {
        let (x, y) = {
            let card = self
                .card(id)
                .ok_or_else(|| CanvasError::UnknownCard(id.to_string()))?;
            let tree = GroupTree::new(&self.groups, config);
            if let Some(group) = group
                && tree.get(group).is_none()
            {
                return Err(CanvasError::UnknownGroup(group.to_string()));
            }
            match position {
                Some(position) => position,
                None => {
                    let absolute =
                        tree.to_absolute_coords((card.x, card.y), card.group_id.as_deref());
                    tree.to_local_coords(absolute, group)
                }
            }
        };
        let card = self
            .card_mut(id)
            .ok_or_else(|| CanvasError::UnknownCard(id.to_string()))?;
        card.x = x;
        card.y = y;
        card.group_id = group.map(str::to_string);
        Ok(())
    }
}

impl Document {
    pub fn add_virtual_ticket(&mut self, summary: &str, status: StatusCategory) -> String {
        let id = self.mint_ticket_id();
        self.add_virtual_ticket_with_id(id.clone(), summary, status);
        id
    }

    pub fn add_virtual_ticket_with_id(&mut self, id: String, summary: &str, status: StatusCategory) {
        self.virtual_tickets.push(VirtualTicket {
            id,
            summary: summary.to_string(),
            status,
        });
    }

    pub fn update_virtual_ticket(
        &mut self,
        id: &str,
        summary: Option<&str>,
        status: Option<StatusCategory>,
    ) -> Result<(), CanvasError> {
        let ticket = self
            .virtual_tickets
            .iter_mut()
            .find(|ticket| ticket.id == id)
            .ok_or_else(|| CanvasError::UnknownVirtualTicket(id.to_string()))?;
        if let Some(summary) = summary {
            ticket.summary = summary.to_string();
        }
        if let Some(status) = status {
            ticket.status = status;
        }
        Ok(())
    }

    /// Delete a ticket along with every card showing it, on every canvas.
    /// Returns the number of cards removed.
    pub fn delete_virtual_ticket(&mut self, id: &str) -> Result<usize, CanvasError> {
        let idx = self
            .virtual_tickets
            .iter()
            .position(|ticket| ticket.id == id)
            .ok_or_else(|| CanvasError::UnknownVirtualTicket(id.to_string()))?;
        self.virtual_tickets.remove(idx);

        let mut removed = 0usize;
        for canvas in self.canvases.values_mut() {
            let doomed: Vec<String> = canvas
                .cards
                .iter()
                .filter(|card| {
                    matches!(&card.source, CardSource::Virtual { ticket_id } if ticket_id == id)
                })
                .map(|card| card.id.clone())
                .collect();
            if !doomed.is_empty() {
                debug!(ticket = %id, cards = doomed.len(), "removing virtual ticket cards");
            }
            for card_id in doomed {
                canvas.delete_card(&card_id)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::AnchorPosition;
    use crate::model::Endpoint;

    fn issue(key: &str) -> CardSource {
        CardSource::Issue { key: key.into() }
    }

    #[test]
    fn new_cards_fill_the_grid() {
        let mut canvas = Canvas::new();
        let config = CanvasConfig::default();
        let first = canvas.add_card(issue("A-1"), None, None, &config).unwrap();
        let second = canvas.add_card(issue("A-2"), None, None, &config).unwrap();
        let a = canvas.card(&first).unwrap();
        let b = canvas.card(&second).unwrap();
        assert_eq!((a.x, a.y), (24.0, 24.0));
        assert_eq!((b.x, b.y), (268.0, 24.0));
    }

    #[test]
    fn cards_inside_a_group_are_placed_in_its_content_space() {
        let mut canvas = Canvas::new();
        let config = CanvasConfig::default();
        let group = canvas
            .add_group("Team", None, Some((500.0, 500.0)), &config)
            .unwrap();
        let card = canvas.add_card(issue("A-1"), Some(&group), None, &config).unwrap();
        let card = canvas.card(&card).unwrap();
        assert_eq!((card.x, card.y), (24.0, 24.0));
        assert_eq!(card.group_id.as_deref(), Some(group.as_str()));
    }

    #[test]
    fn nesting_stops_at_max_depth() {
        let mut canvas = Canvas::new();
        let config = CanvasConfig::default();
        let g0 = canvas.add_group("0", None, None, &config).unwrap();
        let g1 = canvas.add_group("1", Some(&g0), None, &config).unwrap();
        let g2 = canvas.add_group("2", Some(&g1), None, &config).unwrap();
        let err = canvas.add_group("3", Some(&g2), None, &config);
        assert!(matches!(err, Err(CanvasError::DepthExceeded { depth: 3, max: 3, .. })));
    }

    #[test]
    fn reparent_keeps_absolute_position_and_rejects_cycles() {
        let mut canvas = Canvas::new();
        let config = CanvasConfig::default();
        let outer = canvas
            .add_group("outer", None, Some((100.0, 100.0)), &config)
            .unwrap();
        let inner = canvas
            .add_group("inner", None, Some((150.0, 200.0)), &config)
            .unwrap();
        canvas.reparent_group(&inner, Some(&outer), &config.groups).unwrap();
        let moved = canvas.group(&inner).unwrap();
        assert_eq!((moved.x, moved.y), (50.0, 68.0));

        let err = canvas.reparent_group(&outer, Some(&inner), &config.groups);
        assert!(matches!(err, Err(CanvasError::GroupCycle { .. })));

        canvas.reparent_group(&inner, None, &config.groups).unwrap();
        let back = canvas.group(&inner).unwrap();
        assert_eq!((back.x, back.y), (150.0, 200.0));
    }

    #[test]
    fn reparent_counts_the_moved_subtree() {
        let mut canvas = Canvas::new();
        let config = CanvasConfig::default();
        let a = canvas.add_group("a", None, None, &config).unwrap();
        let b = canvas.add_group("b", Some(&a), None, &config).unwrap();
        let c = canvas.add_group("c", None, None, &config).unwrap();
        // c (depth 0) is fine under b (depth 1) on its own: it would sit at 2.
        canvas.reparent_group(&c, Some(&b), &config.groups).unwrap();
        canvas.reparent_group(&c, None, &config.groups).unwrap();
        // With a child of its own, c's subtree would reach depth 3.
        canvas.add_group("d", Some(&c), None, &config).unwrap();
        let err = canvas.reparent_group(&c, Some(&b), &config.groups);
        assert!(matches!(err, Err(CanvasError::DepthExceeded { depth: 3, .. })));
    }

    #[test]
    fn resize_respects_minimum() {
        let mut canvas = Canvas::new();
        let config = CanvasConfig::default();
        let g = canvas.add_group("g", None, None, &config).unwrap();
        assert_eq!(
            canvas.resize_group(&g, 10.0, 500.0, &config.groups),
            Ok((160.0, 500.0))
        );
    }

    #[test]
    fn fit_grows_group_around_members() {
        let mut canvas = Canvas::new();
        let config = CanvasConfig::default();
        let g = canvas.add_group("g", None, Some((0.0, 0.0)), &config).unwrap();
        canvas
            .add_card(issue("A-1"), Some(&g), Some((300.0, 250.0)), &config)
            .unwrap();
        assert_eq!(canvas.fit_group_to_content(&g, &config), Ok(true));
        let group = canvas.group(&g).unwrap();
        // 300 + 220 + 16, 32 + 250 + 72 + 16
        assert_eq!((group.width, group.height), (536.0, 370.0));
        assert_eq!(canvas.fit_group_to_content(&g, &config), Ok(false));
    }

    #[test]
    fn assigning_without_position_keeps_card_in_place() {
        let mut canvas = Canvas::new();
        let config = CanvasConfig::default();
        let g = canvas
            .add_group("g", None, Some((100.0, 100.0)), &config)
            .unwrap();
        let card = canvas
            .add_card(issue("A-1"), None, Some((150.0, 200.0)), &config)
            .unwrap();
        canvas.assign_card_to_group(&card, Some(&g), None, &config.groups).unwrap();
        let placed = canvas.card(&card).unwrap();
        assert_eq!((placed.x, placed.y), (50.0, 68.0));
        canvas
            .assign_card_to_group(&card, None, Some((5.0, 5.0)), &config.groups)
            .unwrap();
        let placed = canvas.card(&card).unwrap();
        assert_eq!((placed.x, placed.y, placed.group_id.clone()), (5.0, 5.0, None));
    }

    #[test]
    fn deleting_ticket_removes_cards_everywhere() {
        let mut doc = Document::new();
        let config = CanvasConfig::default();
        let ticket = doc.add_virtual_ticket("Spike", StatusCategory::ToDo);
        for kr in ["kr-1", "kr-2"] {
            let canvas = doc.canvas_mut(kr);
            let placeholder = canvas
                .add_card(
                    CardSource::Virtual {
                        ticket_id: ticket.clone(),
                    },
                    None,
                    None,
                    &config,
                )
                .unwrap();
            let other = canvas.add_card(issue("A-1"), None, None, &config).unwrap();
            canvas
                .add_relation(
                    Endpoint::card(placeholder, AnchorPosition::Right),
                    Endpoint::card(other, AnchorPosition::Left),
                )
                .unwrap();
        }
        assert_eq!(doc.delete_virtual_ticket(&ticket), Ok(2));
        for kr in ["kr-1", "kr-2"] {
            let canvas = doc.canvas(kr).unwrap();
            assert_eq!(canvas.cards.len(), 1);
            assert!(canvas.relations.is_empty());
        }
        assert_eq!(
            doc.update_virtual_ticket(&ticket, Some("x"), None),
            Err(CanvasError::UnknownVirtualTicket(ticket.clone()))
        );
    }
}
