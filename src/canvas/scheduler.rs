//! Coalesces route recomputation to at most once per animation frame.

use crate::config::CanvasConfig;
use crate::issues::IssueRepository;
use crate::model::{Canvas, VirtualTicket};

use super::{Scene, compute_scene};

/// Why the cached scene went stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    CardChanged,
    GroupChanged,
    RelationChanged,
    ViewportChanged,
    Resized,
}

#[derive(Debug, Default)]
pub struct RouteScheduler {
    dirty: bool,
    generation: u64,
    pending: Vec<Invalidation>,
    scene: Option<Scene>,
}

impl RouteScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&mut self, cause: Invalidation) {
        self.dirty = true;
        if !self.pending.contains(&cause) {
            self.pending.push(cause);
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty || self.scene.is_none()
    }

    /// Number of recomputations so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Causes collected since the last recompute.
    pub fn pending(&self) -> &[Invalidation] {
        &self.pending
    }

    /// Call once per animation frame. Recomputes only when something was
    /// invalidated since the previous frame.
    pub fn frame(
        &mut self,
        canvas: &Canvas,
        issues: &dyn IssueRepository,
        tickets: &[VirtualTicket],
        config: &CanvasConfig,
    ) -> &Scene {
        if self.is_dirty() {
            self.generation += 1;
            self.dirty = false;
            self.pending.clear();
            self.scene = Some(compute_scene(canvas, issues, tickets, config));
        }
        self.scene.get_or_insert_with(Scene::default)
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::NoIssues;
    use crate::model::{Card, CardSource};

    #[test]
    fn many_invalidations_cost_one_recompute() {
        let mut canvas = Canvas::new();
        canvas.cards.push(Card {
            id: "c1".into(),
            source: CardSource::Issue { key: "A-1".into() },
            x: 0.0,
            y: 0.0,
            group_id: None,
        });
        let config = CanvasConfig::default();
        let mut scheduler = RouteScheduler::new();
        scheduler.frame(&canvas, &NoIssues, &[], &config);
        assert_eq!(scheduler.generation(), 1);

        for step in 0..10 {
            canvas.cards[0].x = step as f32 * 5.0;
            scheduler.invalidate(Invalidation::CardChanged);
        }
        scheduler.invalidate(Invalidation::ViewportChanged);
        assert_eq!(
            scheduler.pending(),
            &[Invalidation::CardChanged, Invalidation::ViewportChanged]
        );
        let scene = scheduler.frame(&canvas, &NoIssues, &[], &config);
        assert_eq!(scene.cards[0].rect.x, 45.0);
        assert_eq!(scheduler.generation(), 2);

        scheduler.frame(&canvas, &NoIssues, &[], &config);
        assert_eq!(scheduler.generation(), 2);
        assert!(scheduler.pending().is_empty());
    }
}
