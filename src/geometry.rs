use serde::{Deserialize, Serialize};

/// Axis-aligned box in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Grow the rect by `pad` on every side.
    pub fn expand(&self, pad: f32) -> Self {
        Self {
            x: self.x - pad,
            y: self.y - pad,
            width: self.width + pad * 2.0,
            height: self.height + pad * 2.0,
        }
    }

    /// Half-open containment: the left/top edges are inside, the right/bottom edges are not.
    pub fn contains(&self, point: (f32, f32)) -> bool {
        point.0 >= self.x && point.0 < self.right() && point.1 >= self.y && point.1 < self.bottom()
    }

    /// Strict interior test; points on the border are outside.
    pub fn contains_interior(&self, point: (f32, f32)) -> bool {
        point.0 > self.x && point.0 < self.right() && point.1 > self.y && point.1 < self.bottom()
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    /// Bounding box of a set of points. `None` for an empty slice.
    pub fn bounding(points: &[(f32, f32)]) -> Option<Rect> {
        let first = points.first()?;
        let mut min_x = first.0;
        let mut min_y = first.1;
        let mut max_x = first.0;
        let mut max_y = first.1;
        for &(x, y) in &points[1..] {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }
}

/// Touching edges do not count as overlap.
pub fn rects_overlap(a: &Rect, b: &Rect) -> bool {
    a.x < b.right() && a.right() > b.x && a.y < b.bottom() && a.bottom() > b.y
}

/// One of the four fixed attachment points on a rectangle's perimeter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorPosition {
    Top,
    Bottom,
    Left,
    Right,
}

impl AnchorPosition {
    /// Enumeration order; also the tie-break order for nearest-anchor lookups.
    pub const ALL: [AnchorPosition; 4] = [
        AnchorPosition::Top,
        AnchorPosition::Bottom,
        AnchorPosition::Left,
        AnchorPosition::Right,
    ];

    /// Left/right anchors leave the element horizontally.
    pub fn is_horizontal(self) -> bool {
        matches!(self, AnchorPosition::Left | AnchorPosition::Right)
    }

    /// Unit vector pointing away from the element.
    pub fn outward(self) -> (f32, f32) {
        match self {
            AnchorPosition::Top => (0.0, -1.0),
            AnchorPosition::Bottom => (0.0, 1.0),
            AnchorPosition::Left => (-1.0, 0.0),
            AnchorPosition::Right => (1.0, 0.0),
        }
    }

    pub fn opposite(self) -> AnchorPosition {
        match self {
            AnchorPosition::Top => AnchorPosition::Bottom,
            AnchorPosition::Bottom => AnchorPosition::Top,
            AnchorPosition::Left => AnchorPosition::Right,
            AnchorPosition::Right => AnchorPosition::Left,
        }
    }
}

pub fn get_anchor_point(rect: &Rect, anchor: AnchorPosition) -> (f32, f32) {
    let (cx, cy) = rect.center();
    match anchor {
        AnchorPosition::Top => (cx, rect.y),
        AnchorPosition::Bottom => (cx, rect.bottom()),
        AnchorPosition::Left => (rect.x, cy),
        AnchorPosition::Right => (rect.right(), cy),
    }
}

/// Placement of the anchor handle inside the element's own box, in percent
/// of its width and height.
pub fn get_anchor_offset(anchor: AnchorPosition) -> (f32, f32) {
    match anchor {
        AnchorPosition::Top => (50.0, 0.0),
        AnchorPosition::Bottom => (50.0, 100.0),
        AnchorPosition::Left => (0.0, 50.0),
        AnchorPosition::Right => (100.0, 50.0),
    }
}

pub fn find_nearest_anchor(rect: &Rect, point: (f32, f32)) -> AnchorPosition {
    let mut best = AnchorPosition::Top;
    let mut best_dist = f32::INFINITY;
    for anchor in AnchorPosition::ALL {
        let dist = distance(get_anchor_point(rect, anchor), point);
        if dist < best_dist {
            best = anchor;
            best_dist = dist;
        }
    }
    best
}

/// Anchors for a new relation: the dominant axis between the two centers
/// decides horizontal or vertical, the sign decides which side faces which.
pub fn suggest_anchor_pair(from: &Rect, to: &Rect) -> (AnchorPosition, AnchorPosition) {
    let (fx, fy) = from.center();
    let (tx, ty) = to.center();
    let dx = tx - fx;
    let dy = ty - fy;
    if dx.abs() > dy.abs() {
        if dx >= 0.0 {
            (AnchorPosition::Right, AnchorPosition::Left)
        } else {
            (AnchorPosition::Left, AnchorPosition::Right)
        }
    } else if dy >= 0.0 {
        (AnchorPosition::Bottom, AnchorPosition::Top)
    } else {
        (AnchorPosition::Top, AnchorPosition::Bottom)
    }
}

/// Anchor point pushed `length` pixels outward.
pub fn stub_point(point: (f32, f32), anchor: AnchorPosition, length: f32) -> (f32, f32) {
    let (nx, ny) = anchor.outward();
    (point.0 + nx * length, point.1 + ny * length)
}

pub fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

pub fn point_segment_distance(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f32::EPSILON {
        return distance(p, a);
    }
    let t = (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0);
    distance(p, (a.0 + dx * t, a.1 + dy * t))
}

/// Whether the segment `a`-`b` passes through the open interior of `rect`.
/// Segments running along the border do not count.
pub fn segment_crosses_interior(a: (f32, f32), b: (f32, f32), rect: &Rect) -> bool {
    // Liang-Barsky clip against the open box.
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    let mut t0 = 0.0f32;
    let mut t1 = 1.0f32;
    let checks = [
        (-dx, a.0 - rect.x),
        (dx, rect.right() - a.0),
        (-dy, a.1 - rect.y),
        (dy, rect.bottom() - a.1),
    ];
    for (p, q) in checks {
        if p.abs() <= f32::EPSILON {
            if q <= 0.0 {
                return false;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return false;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return false;
            }
            t1 = t1.min(r);
        }
    }
    if t1 - t0 <= 1e-6 {
        return false;
    }
    let mid_t = (t0 + t1) / 2.0;
    rect.contains_interior((a.0 + dx * mid_t, a.1 + dy * mid_t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rect_strategy() -> impl Strategy<Value = Rect> {
        (
            -1000.0f32..1000.0,
            -1000.0f32..1000.0,
            1.0f32..400.0,
            1.0f32..400.0,
        )
            .prop_map(|(x, y, w, h)| Rect::new(x.round(), y.round(), w.round(), h.round()))
    }

    #[test]
    fn anchor_points_sit_on_edge_midpoints() {
        let rect = Rect::new(10.0, 20.0, 100.0, 40.0);
        assert_eq!(get_anchor_point(&rect, AnchorPosition::Top), (60.0, 20.0));
        assert_eq!(get_anchor_point(&rect, AnchorPosition::Bottom), (60.0, 60.0));
        assert_eq!(get_anchor_point(&rect, AnchorPosition::Left), (10.0, 40.0));
        assert_eq!(get_anchor_point(&rect, AnchorPosition::Right), (110.0, 40.0));
    }

    #[test]
    fn touching_rects_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(100.0, 0.0, 100.0, 100.0);
        assert!(!rects_overlap(&a, &b));
        assert!(!rects_overlap(&b, &a));
        let c = Rect::new(99.0, 99.0, 10.0, 10.0);
        assert!(rects_overlap(&a, &c));
    }

    #[test]
    fn nearest_anchor_ties_resolve_in_enumeration_order() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        // The center is equidistant to all four anchors.
        assert_eq!(find_nearest_anchor(&rect, (50.0, 50.0)), AnchorPosition::Top);
        assert_eq!(find_nearest_anchor(&rect, (140.0, 55.0)), AnchorPosition::Right);
        assert_eq!(find_nearest_anchor(&rect, (50.0, 130.0)), AnchorPosition::Bottom);
    }

    #[test]
    fn suggested_pair_follows_dominant_axis() {
        let a = Rect::new(0.0, 0.0, 100.0, 50.0);
        let right = Rect::new(400.0, 30.0, 100.0, 50.0);
        let above = Rect::new(20.0, -300.0, 100.0, 50.0);
        assert_eq!(
            suggest_anchor_pair(&a, &right),
            (AnchorPosition::Right, AnchorPosition::Left)
        );
        assert_eq!(
            suggest_anchor_pair(&right, &a),
            (AnchorPosition::Left, AnchorPosition::Right)
        );
        assert_eq!(
            suggest_anchor_pair(&a, &above),
            (AnchorPosition::Top, AnchorPosition::Bottom)
        );
    }

    #[test]
    fn segment_along_border_is_not_a_crossing() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(!segment_crosses_interior((0.0, -10.0), (0.0, 200.0), &rect));
        assert!(segment_crosses_interior((-10.0, 50.0), (200.0, 50.0), &rect));
        assert!(!segment_crosses_interior((-10.0, 150.0), (200.0, 150.0), &rect));
    }

    #[test]
    fn point_segment_distance_clamps_to_endpoints() {
        assert_eq!(point_segment_distance((0.0, 5.0), (0.0, 0.0), (10.0, 0.0)), 5.0);
        assert_eq!(point_segment_distance((-3.0, 4.0), (0.0, 0.0), (10.0, 0.0)), 5.0);
    }

    proptest! {
        #[test]
        fn prop_anchor_point_lies_on_boundary(rect in rect_strategy()) {
            let top = get_anchor_point(&rect, AnchorPosition::Top);
            let bottom = get_anchor_point(&rect, AnchorPosition::Bottom);
            let left = get_anchor_point(&rect, AnchorPosition::Left);
            let right = get_anchor_point(&rect, AnchorPosition::Right);
            prop_assert_eq!(top.1, rect.y);
            prop_assert_eq!(bottom.1, rect.bottom());
            prop_assert_eq!(left.0, rect.x);
            prop_assert_eq!(right.0, rect.right());
            prop_assert!((bottom.1 - top.1 - rect.height).abs() < 1e-3);
            prop_assert!((right.0 - left.0 - rect.width).abs() < 1e-3);
        }

        #[test]
        fn prop_overlap_is_symmetric(a in rect_strategy(), b in rect_strategy()) {
            prop_assert_eq!(rects_overlap(&a, &b), rects_overlap(&b, &a));
        }
    }
}
