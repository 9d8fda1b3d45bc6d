//! Group nesting and the transforms between canvas-absolute and
//! group-relative coordinates.
//!
//! A group's `(x, y)` is relative to its immediate parent's content origin,
//! which sits `header_height` below the parent's top edge. Every walk up the
//! parent chain is capped at `max_depth` steps so a dangling or cyclic
//! `parent_group_id` cannot loop forever.

use std::collections::{HashMap, HashSet};

use crate::config::GroupConfig;
use crate::geometry::Rect;
use crate::model::Group;

/// Per-frame index over the flat group list.
#[derive(Debug, Clone)]
pub struct GroupTree<'a> {
    groups: &'a [Group],
    by_id: HashMap<&'a str, usize>,
    children: HashMap<&'a str, Vec<usize>>,
    header_height: f32,
    max_depth: usize,
}

impl<'a> GroupTree<'a> {
    pub fn new(groups: &'a [Group], config: &GroupConfig) -> Self {
        Self::with_limits(groups, config.header_height, config.max_depth)
    }

    pub fn with_limits(groups: &'a [Group], header_height: f32, max_depth: usize) -> Self {
        let mut by_id = HashMap::with_capacity(groups.len());
        let mut children: HashMap<&'a str, Vec<usize>> = HashMap::new();
        for (idx, group) in groups.iter().enumerate() {
            by_id.insert(group.id.as_str(), idx);
            if let Some(parent) = group.parent_group_id.as_deref() {
                children.entry(parent).or_default().push(idx);
            }
        }
        Self {
            groups,
            by_id,
            children,
            header_height,
            max_depth,
        }
    }

    pub fn header_height(&self) -> f32 {
        self.header_height
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn get(&self, id: &str) -> Option<&'a Group> {
        self.by_id.get(id).map(|&idx| &self.groups[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Group> + 'a {
        self.groups.iter()
    }

    /// Sum of content-origin offsets from `parent` up to the root.
    fn chain_offset(&self, parent: Option<&str>) -> (f32, f32) {
        let mut dx = 0.0;
        let mut dy = 0.0;
        let mut current = parent;
        for _ in 0..self.max_depth {
            let Some(group) = current.and_then(|id| self.get(id)) else {
                break;
            };
            dx += group.x;
            dy += group.y + self.header_height;
            current = group.parent_group_id.as_deref();
        }
        (dx, dy)
    }

    /// Local coordinates inside `parent`'s content area to canvas-absolute.
    pub fn to_absolute_coords(&self, local: (f32, f32), parent: Option<&str>) -> (f32, f32) {
        let (dx, dy) = self.chain_offset(parent);
        (local.0 + dx, local.1 + dy)
    }

    /// Exact inverse of [`GroupTree::to_absolute_coords`].
    pub fn to_local_coords(&self, absolute: (f32, f32), parent: Option<&str>) -> (f32, f32) {
        let (dx, dy) = self.chain_offset(parent);
        (absolute.0 - dx, absolute.1 - dy)
    }

    /// Number of ancestors; a top-level group has depth 0.
    pub fn group_depth(&self, id: &str) -> usize {
        let mut depth = 0;
        let mut current = self.get(id).and_then(|group| group.parent_group_id.as_deref());
        while let Some(parent) = current.and_then(|pid| self.get(pid)) {
            if depth >= self.max_depth {
                break;
            }
            depth += 1;
            current = parent.parent_group_id.as_deref();
        }
        depth
    }

    pub fn absolute_rect(&self, id: &str) -> Option<Rect> {
        let group = self.get(id)?;
        let (x, y) = self.to_absolute_coords((group.x, group.y), group.parent_group_id.as_deref());
        Some(Rect::new(x, y, group.width, group.height))
    }

    /// Absolute rect below the header band, where members live.
    pub fn content_rect(&self, id: &str) -> Option<Rect> {
        let rect = self.absolute_rect(id)?;
        let header = self.header_height.min(rect.height);
        Some(Rect::new(
            rect.x,
            rect.y + header,
            rect.width,
            rect.height - header,
        ))
    }

    pub fn children(&self, id: &str) -> Vec<&'a Group> {
        self.children
            .get(id)
            .map(|idxs| idxs.iter().map(|&idx| &self.groups[idx]).collect())
            .unwrap_or_default()
    }

    /// All transitive descendants, breadth first. Safe on cyclic input.
    pub fn descendants(&self, id: &str) -> Vec<&'a str> {
        let mut out = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(id);
        let mut queue = vec![id];
        while let Some(current) = queue.pop() {
            for child in self.children(current) {
                if seen.insert(child.id.as_str()) {
                    out.push(child.id.as_str());
                    queue.insert(0, child.id.as_str());
                }
            }
        }
        out
    }

    /// Whether `ancestor` appears on `id`'s parent chain.
    pub fn is_ancestor(&self, ancestor: &str, id: &str) -> bool {
        let mut current = self.get(id).and_then(|group| group.parent_group_id.as_deref());
        for _ in 0..self.max_depth {
            let Some(parent) = current else {
                return false;
            };
            if parent == ancestor {
                return true;
            }
            current = self.get(parent).and_then(|group| group.parent_group_id.as_deref());
        }
        false
    }

    /// Ids of the groups enclosing a group, nearest first.
    pub fn ancestors(&self, id: &str) -> Vec<&'a str> {
        let mut out = Vec::new();
        let mut current = self.get(id).and_then(|group| group.parent_group_id.as_deref());
        for _ in 0..self.max_depth {
            let Some(group) = current.and_then(|pid| self.get(pid)) else {
                break;
            };
            out.push(group.id.as_str());
            current = group.parent_group_id.as_deref();
        }
        out
    }

    /// Levels of nesting below `id`, counting `id` itself as 1.
    pub fn subtree_height(&self, id: &str) -> usize {
        fn walk(tree: &GroupTree<'_>, id: &str, budget: usize) -> usize {
            if budget == 0 {
                return 1;
            }
            1 + tree
                .children(id)
                .iter()
                .map(|child| walk(tree, &child.id, budget - 1))
                .max()
                .unwrap_or(0)
        }
        walk(self, id, self.max_depth)
    }

    /// Deepest group whose content area contains `point`. Among groups at the
    /// same depth the one painted last wins. `exclude` removes a group and
    /// everything inside it from consideration.
    pub fn group_at(&self, point: (f32, f32), exclude: Option<&str>) -> Option<&'a Group> {
        let excluded: HashSet<&str> = match exclude {
            Some(id) => {
                let mut set: HashSet<&str> = self.descendants(id).into_iter().collect();
                set.insert(id);
                set
            }
            None => HashSet::new(),
        };
        let mut best: Option<(&'a Group, usize)> = None;
        for group in self.groups {
            if excluded.contains(group.id.as_str()) {
                continue;
            }
            let Some(content) = self.content_rect(&group.id) else {
                continue;
            };
            if !content.contains(point) {
                continue;
            }
            let depth = self.group_depth(&group.id);
            if best.is_none_or(|(_, best_depth)| depth >= best_depth) {
                best = Some((group, depth));
            }
        }
        best.map(|(group, _)| group)
    }
}

pub fn to_absolute_coords(
    local_x: f32,
    local_y: f32,
    parent_group_id: Option<&str>,
    groups: &[Group],
    config: &GroupConfig,
) -> (f32, f32) {
    GroupTree::new(groups, config).to_absolute_coords((local_x, local_y), parent_group_id)
}

pub fn to_local_coords(
    abs_x: f32,
    abs_y: f32,
    parent_group_id: Option<&str>,
    groups: &[Group],
    config: &GroupConfig,
) -> (f32, f32) {
    GroupTree::new(groups, config).to_local_coords((abs_x, abs_y), parent_group_id)
}

pub fn get_group_depth(group_id: &str, groups: &[Group], config: &GroupConfig) -> usize {
    GroupTree::new(groups, config).group_depth(group_id)
}
