//! Relations bent through user-placed waypoints. Grid search is skipped
//! entirely; the user's points are trusted as given.

use crate::config::RoutingConfig;
use crate::geometry::{AnchorPosition, Rect, get_anchor_point, point_segment_distance, stub_point};

use super::routing::RoutedEdge;
use super::simplify::simplify_path;

/// `[start, start stub, waypoints.., end stub, end]`.
pub fn manual_control_points(
    from_rect: &Rect,
    from_anchor: AnchorPosition,
    to_rect: &Rect,
    to_anchor: AnchorPosition,
    waypoints: &[(f32, f32)],
    stub_length: f32,
) -> Vec<(f32, f32)> {
    let start = get_anchor_point(from_rect, from_anchor);
    let end = get_anchor_point(to_rect, to_anchor);
    let mut points = Vec::with_capacity(waypoints.len() + 4);
    points.push(start);
    points.push(stub_point(start, from_anchor, stub_length));
    points.extend_from_slice(waypoints);
    points.push(stub_point(end, to_anchor, stub_length));
    points.push(end);
    points
}

pub fn route_through_waypoints(
    from_rect: &Rect,
    from_anchor: AnchorPosition,
    to_rect: &Rect,
    to_anchor: AnchorPosition,
    waypoints: &[(f32, f32)],
    config: &RoutingConfig,
) -> RoutedEdge {
    let points = manual_control_points(
        from_rect,
        from_anchor,
        to_rect,
        to_anchor,
        waypoints,
        config.stub_length,
    );
    let mut edge = RoutedEdge::from_points(simplify_path(&points), config.corner_radius, false);
    edge.manual = true;
    edge
}

/// Index of the segment `points[i]..points[i + 1]` closest to `point`.
/// Ties go to the earlier segment.
pub fn find_best_insert_index(points: &[(f32, f32)], point: (f32, f32)) -> usize {
    let mut best = 0usize;
    let mut best_dist = f32::INFINITY;
    for (idx, window) in points.windows(2).enumerate() {
        let dist = point_segment_distance(point, window[0], window[1]);
        if dist < best_dist {
            best = idx;
            best_dist = dist;
        }
    }
    best
}

/// Map a segment of [`manual_control_points`] to the position in the
/// waypoint list where a new point belongs. Segments on either stub insert
/// at the nearest end of the list.
pub fn waypoint_insert_position(segment: usize, waypoint_count: usize) -> usize {
    segment.saturating_sub(1).min(waypoint_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rects() -> (Rect, Rect) {
        (
            Rect::new(0.0, 0.0, 100.0, 50.0),
            Rect::new(400.0, 200.0, 100.0, 50.0),
        )
    }

    #[test]
    fn manual_path_goes_through_every_waypoint() {
        let (a, b) = rects();
        let edge = route_through_waypoints(
            &a,
            AnchorPosition::Right,
            &b,
            AnchorPosition::Left,
            &[(200.0, 25.0), (200.0, 225.0)],
            &RoutingConfig::default(),
        );
        assert!(edge.manual);
        assert!(!edge.routed);
        // Stubs are collinear with the waypoints and drop out.
        assert_eq!(
            edge.waypoints,
            vec![(100.0, 25.0), (200.0, 25.0), (200.0, 225.0), (400.0, 225.0)]
        );
        assert!(edge.path.starts_with("M 100.00 25.00"));
    }

    #[test]
    fn insert_index_picks_nearest_segment() {
        let points = [(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)];
        assert_eq!(find_best_insert_index(&points, (50.0, 5.0)), 0);
        assert_eq!(find_best_insert_index(&points, (95.0, 50.0)), 1);
        assert_eq!(find_best_insert_index(&points, (40.0, 90.0)), 2);
    }

    #[test]
    fn insert_index_tie_prefers_earlier_segment() {
        // Equidistant from the end of segment 0 and the start of segment 1.
        let points = [(0.0, 0.0), (100.0, 0.0), (100.0, 100.0)];
        assert_eq!(find_best_insert_index(&points, (110.0, -10.0)), 0);
        assert_eq!(find_best_insert_index(&[(0.0, 0.0)], (5.0, 5.0)), 0);
    }

    #[test]
    fn segment_maps_to_waypoint_slot() {
        // start, s1, w0, w1, s2, end
        assert_eq!(waypoint_insert_position(0, 2), 0);
        assert_eq!(waypoint_insert_position(1, 2), 0);
        assert_eq!(waypoint_insert_position(2, 2), 1);
        assert_eq!(waypoint_insert_position(3, 2), 2);
        assert_eq!(waypoint_insert_position(4, 2), 2);
    }

    proptest! {
        #[test]
        fn prop_insert_index_is_minimal(
            coords in proptest::collection::vec((-500i32..500, -500i32..500), 2..8),
            px in -600i32..600,
            py in -600i32..600,
        ) {
            let points: Vec<(f32, f32)> =
                coords.into_iter().map(|(x, y)| (x as f32, y as f32)).collect();
            let p = (px as f32, py as f32);
            let idx = find_best_insert_index(&points, p);
            let best = point_segment_distance(p, points[idx], points[idx + 1]);
            for (other, window) in points.windows(2).enumerate() {
                let dist = point_segment_distance(p, window[0], window[1]);
                prop_assert!(best <= dist);
                if other < idx {
                    prop_assert!(dist > best);
                }
            }
        }
    }
}
