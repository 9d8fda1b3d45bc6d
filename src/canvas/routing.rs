use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::config::RoutingConfig;
use crate::geometry::{
    AnchorPosition, Rect, get_anchor_point, rects_overlap, segment_crosses_interior, stub_point,
};
use crate::log::debug;

use super::fallback::orthogonal_fallback;
use super::simplify::{reduce_orthogonal_bends_with, simplify_path, waypoints_to_svg_path};

/// Path produced for one relation.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedEdge {
    /// SVG `d` attribute.
    pub path: String,
    /// Polyline from the source anchor to the target anchor.
    pub waypoints: Vec<(f32, f32)>,
    /// True when grid search produced the path.
    pub routed: bool,
    /// True when the path follows user-placed waypoints.
    pub manual: bool,
}

impl RoutedEdge {
    pub(super) fn from_points(points: Vec<(f32, f32)>, corner_radius: f32, routed: bool) -> Self {
        Self {
            path: waypoints_to_svg_path(&points, corner_radius),
            waypoints: points,
            routed,
            manual: false,
        }
    }
}

/// Binary occupancy raster over the routed region.
#[derive(Debug, Clone)]
pub struct ObstacleGrid {
    cell: f32,
    min_x: f32,
    min_y: f32,
    cols: i32,
    rows: i32,
    blocked: Vec<bool>,
}

impl ObstacleGrid {
    /// Rasterize `obstacles` (grown by the obstacle padding) over the bounding
    /// box of the two stubs and all obstacles. `None` when the grid would be
    /// degenerate or larger than `max_grid_cells`.
    pub fn build(
        stubs: [(f32, f32); 2],
        obstacles: &[Rect],
        config: &RoutingConfig,
    ) -> Option<Self> {
        let mut bounds = Rect::bounding(&stubs)?;
        for obs in obstacles {
            bounds = bounds.union(obs);
        }
        let bounds = bounds.expand(config.bounds_padding);
        let cell = config.grid_size.max(1.0);
        let cols = (bounds.width / cell).ceil() as i32 + 1;
        let rows = (bounds.height / cell).ceil() as i32 + 1;
        if cols <= 1 || rows <= 1 {
            return None;
        }
        let total_cells = (cols as usize).saturating_mul(rows as usize);
        if total_cells > config.max_grid_cells {
            debug!(cols, rows, "routing grid too large");
            return None;
        }
        let mut grid = Self {
            cell,
            min_x: bounds.x,
            min_y: bounds.y,
            cols,
            rows,
            blocked: vec![false; total_cells],
        };
        for obs in obstacles {
            grid.block_rect(&obs.expand(config.obstacle_padding));
        }
        Some(grid)
    }

    /// Mark every cell whose area overlaps `rect`.
    fn block_rect(&mut self, rect: &Rect) {
        let start_x = ((rect.x - self.min_x) / self.cell).floor().max(0.0) as i32;
        let end_x = (((rect.right() - self.min_x) / self.cell).ceil() as i32 - 1).min(self.cols - 1);
        let start_y = ((rect.y - self.min_y) / self.cell).floor().max(0.0) as i32;
        let end_y =
            (((rect.bottom() - self.min_y) / self.cell).ceil() as i32 - 1).min(self.rows - 1);
        for iy in start_y..=end_y {
            for ix in start_x..=end_x {
                let idx = self.index(ix, iy);
                self.blocked[idx] = true;
            }
        }
    }

    fn index(&self, ix: i32, iy: i32) -> usize {
        (iy * self.cols + ix) as usize
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cell_for_point(&self, x: f32, y: f32) -> Option<(i32, i32)> {
        let ix = ((x - self.min_x) / self.cell).floor() as i32;
        let iy = ((y - self.min_y) / self.cell).floor() as i32;
        if ix < 0 || iy < 0 || ix >= self.cols || iy >= self.rows {
            return None;
        }
        Some((ix, iy))
    }

    pub fn cell_center(&self, ix: i32, iy: i32) -> (f32, f32) {
        (
            self.min_x + (ix as f32 + 0.5) * self.cell,
            self.min_y + (iy as f32 + 0.5) * self.cell,
        )
    }

    pub fn is_blocked(&self, ix: i32, iy: i32) -> bool {
        if ix < 0 || iy < 0 || ix >= self.cols || iy >= self.rows {
            return true;
        }
        self.blocked[self.index(ix, iy)]
    }

    fn unblock(&mut self, ix: i32, iy: i32) {
        let idx = self.index(ix, iy);
        self.blocked[idx] = false;
    }

    /// Uniform-cost, 4-connected A* between two cells. Returns the cell
    /// sequence including both ends. The start and end cells are always
    /// treated as free.
    pub fn find_path(&mut self, start: (i32, i32), end: (i32, i32)) -> Option<Vec<(i32, i32)>> {
        if !self.in_bounds(start) || !self.in_bounds(end) {
            return None;
        }
        self.unblock(start.0, start.1);
        self.unblock(end.0, end.1);
        if start == end {
            return Some(vec![start]);
        }

        let dirs: [(i32, i32); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];
        let total = self.blocked.len();
        let mut best_cost = vec![u32::MAX; total];
        let mut prev: Vec<Option<usize>> = vec![None; total];
        let mut heap = BinaryHeap::new();

        let start_idx = self.index(start.0, start.1);
        best_cost[start_idx] = 0;
        heap.push(GridEntry {
            est: manhattan(start, end),
            cost: 0,
            x: start.0,
            y: start.1,
        });

        let mut found = false;
        while let Some(entry) = heap.pop() {
            let idx = self.index(entry.x, entry.y);
            if entry.cost != best_cost[idx] {
                continue;
            }
            if (entry.x, entry.y) == end {
                found = true;
                break;
            }
            for (dx, dy) in dirs {
                let nx = entry.x + dx;
                let ny = entry.y + dy;
                if self.is_blocked(nx, ny) {
                    continue;
                }
                let next_idx = self.index(nx, ny);
                let next_cost = entry.cost + 1;
                if next_cost >= best_cost[next_idx] {
                    continue;
                }
                best_cost[next_idx] = next_cost;
                prev[next_idx] = Some(idx);
                heap.push(GridEntry {
                    est: next_cost + manhattan((nx, ny), end),
                    cost: next_cost,
                    x: nx,
                    y: ny,
                });
            }
        }
        if !found {
            return None;
        }

        let mut cells = Vec::new();
        let mut cur = Some(self.index(end.0, end.1));
        while let Some(idx) = cur {
            let idx_i32 = idx as i32;
            cells.push((idx_i32 % self.cols, idx_i32 / self.cols));
            cur = prev[idx];
        }
        cells.reverse();
        Some(cells)
    }

    fn in_bounds(&self, cell: (i32, i32)) -> bool {
        cell.0 >= 0 && cell.1 >= 0 && cell.0 < self.cols && cell.1 < self.rows
    }
}

fn manhattan(a: (i32, i32), b: (i32, i32)) -> u32 {
    (a.0 - b.0).unsigned_abs() + (a.1 - b.1).unsigned_abs()
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct GridEntry {
    est: u32,
    cost: u32,
    x: i32,
    y: i32,
}

impl Ord for GridEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on the estimate; deeper nodes first on ties so the search
        // runs straight at the goal.
        other
            .est
            .cmp(&self.est)
            .then_with(|| self.cost.cmp(&other.cost))
            .then_with(|| other.y.cmp(&self.y))
            .then_with(|| other.x.cmp(&self.x))
    }
}

impl PartialOrd for GridEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Whether any obstacle touches the padded box spanned by the two stubs.
pub fn corridor_blocked(s1: (f32, f32), s2: (f32, f32), obstacles: &[Rect], padding: f32) -> bool {
    let Some(corridor) = Rect::bounding(&[s1, s2]) else {
        return false;
    };
    let corridor = corridor.expand(padding);
    obstacles.iter().any(|obs| rects_overlap(obs, &corridor))
}

/// Route one relation between two anchored rects around `obstacles` (which
/// must not contain the endpoints themselves). Never fails: any problem in
/// the grid search degrades to [`orthogonal_fallback`].
pub fn route_edge(
    from_rect: &Rect,
    from_anchor: AnchorPosition,
    to_rect: &Rect,
    to_anchor: AnchorPosition,
    obstacles: &[Rect],
    config: &RoutingConfig,
) -> RoutedEdge {
    let fallback = || {
        RoutedEdge::from_points(
            orthogonal_fallback(from_rect, from_anchor, to_rect, to_anchor, config.stub_length),
            config.corner_radius,
            false,
        )
    };

    let start = get_anchor_point(from_rect, from_anchor);
    let end = get_anchor_point(to_rect, to_anchor);
    let s1 = stub_point(start, from_anchor, config.stub_length);
    let s2 = stub_point(end, to_anchor, config.stub_length);

    if !config.enable_grid_router || obstacles.is_empty() {
        return fallback();
    }
    if !corridor_blocked(s1, s2, obstacles, config.obstacle_padding) {
        return fallback();
    }

    match route_with_grid(start, s1, from_anchor, end, s2, to_anchor, obstacles, config) {
        Some(points) => RoutedEdge::from_points(points, config.corner_radius, true),
        None => {
            debug!("grid search found no route, using fallback");
            fallback()
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn route_with_grid(
    start: (f32, f32),
    s1: (f32, f32),
    from_anchor: AnchorPosition,
    end: (f32, f32),
    s2: (f32, f32),
    to_anchor: AnchorPosition,
    obstacles: &[Rect],
    config: &RoutingConfig,
) -> Option<Vec<(f32, f32)>> {
    let mut grid = ObstacleGrid::build([s1, s2], obstacles, config)?;
    let start_cell = grid.cell_for_point(s1.0, s1.1)?;
    let end_cell = grid.cell_for_point(s2.0, s2.1)?;
    if start_cell == end_cell {
        return None;
    }
    let cells = grid.find_path(start_cell, end_cell)?;

    // Leave each stub along its anchor axis before joining the cell centers,
    // so the path stays perpendicular to the element edge.
    let mut points: Vec<(f32, f32)> = Vec::with_capacity(cells.len() + 4);
    points.push(s1);
    if let Some(&(ix, iy)) = cells.first() {
        let (cx, cy) = grid.cell_center(ix, iy);
        if from_anchor.is_horizontal() {
            points.push((cx, s1.1));
        } else {
            points.push((s1.0, cy));
        }
    }
    points.extend(cells.iter().map(|&(ix, iy)| grid.cell_center(ix, iy)));
    if let Some(&(ix, iy)) = cells.last() {
        let (cx, cy) = grid.cell_center(ix, iy);
        if to_anchor.is_horizontal() {
            points.push((cx, s2.1));
        } else {
            points.push((s2.0, cy));
        }
    }
    points.push(s2);

    let clearance: Vec<Rect> = obstacles
        .iter()
        .map(|obs| obs.expand(config.obstacle_padding / 2.0))
        .collect();
    let reduced = reduce_orthogonal_bends_with(&points, |a, b| {
        !clearance.iter().any(|obs| segment_crosses_interior(a, b, obs))
    });

    let mut full = Vec::with_capacity(reduced.len() + 2);
    full.push(start);
    full.extend(reduced);
    full.push(end);
    let full = simplify_path(&full);
    if full.len() < 2 || full.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return None;
    }
    Some(full)
}
