//! Closed-form orthogonal routes used whenever grid search is skipped or
//! fails. Every branch is O(1).

use crate::geometry::{AnchorPosition, Rect, get_anchor_point, stub_point};

use super::simplify::simplify_path;

pub fn orthogonal_fallback(
    from_rect: &Rect,
    from_anchor: AnchorPosition,
    to_rect: &Rect,
    to_anchor: AnchorPosition,
    stub_length: f32,
) -> Vec<(f32, f32)> {
    let start = get_anchor_point(from_rect, from_anchor);
    let end = get_anchor_point(to_rect, to_anchor);
    let s1 = stub_point(start, from_anchor, stub_length);
    let s2 = stub_point(end, to_anchor, stub_length);
    let from_horizontal = from_anchor.is_horizontal();

    let middle: Vec<(f32, f32)> = if from_horizontal != to_anchor.is_horizontal() {
        vec![one_bend_corner(from_anchor, to_anchor, s1, s2)]
    } else if from_anchor == to_anchor && !share_lane(from_rect, to_rect, from_horizontal) {
        u_shape(from_anchor, s1, s2)
    } else if from_anchor != to_anchor && converging(from_anchor, s1, s2) {
        if from_horizontal {
            let mid_x = (start.0 + end.0) / 2.0;
            vec![(mid_x, start.1), (mid_x, end.1)]
        } else {
            let mid_y = (start.1 + end.1) / 2.0;
            vec![(start.0, mid_y), (end.0, mid_y)]
        }
    } else if from_horizontal {
        let y = horizontal_channel(from_rect, to_rect, s1, s2, stub_length);
        vec![(s1.0, y), (s2.0, y)]
    } else {
        let x = vertical_channel(from_rect, to_rect, s1, s2, stub_length);
        vec![(x, s1.1), (x, s2.1)]
    };

    let mut points = Vec::with_capacity(middle.len() + 4);
    points.push(start);
    points.push(s1);
    points.extend(middle);
    points.push(s2);
    points.push(end);
    simplify_path(&points)
}

/// Perpendicular anchors meet at a single corner. The corner in line with the
/// source stub is used when both stubs keep heading forward into it; otherwise
/// the corner in line with the target stub, so the arrow still lands on the
/// target from outside.
fn one_bend_corner(
    from_anchor: AnchorPosition,
    to_anchor: AnchorPosition,
    s1: (f32, f32),
    s2: (f32, f32),
) -> (f32, f32) {
    let (direct, other) = if from_anchor.is_horizontal() {
        ((s2.0, s1.1), (s1.0, s2.1))
    } else {
        ((s1.0, s2.1), (s2.0, s1.1))
    };
    if heads_along(s1, direct, from_anchor.outward()) && heads_along(s2, direct, to_anchor.outward()) {
        direct
    } else {
        other
    }
}

/// `to` lies on the `dir` side of `from`, or on it.
fn heads_along(from: (f32, f32), to: (f32, f32), dir: (f32, f32)) -> bool {
    (to.0 - from.0) * dir.0 + (to.1 - from.1) * dir.1 >= 0.0
}

/// The rects overlap across the anchor axis: rows for horizontal anchors,
/// columns for vertical ones.
fn share_lane(a: &Rect, b: &Rect, horizontal: bool) -> bool {
    if horizontal {
        a.y < b.bottom() && b.y < a.bottom()
    } else {
        a.x < b.right() && b.x < a.right()
    }
}

/// Opposite anchors whose stubs still face each other.
fn converging(from_anchor: AnchorPosition, s1: (f32, f32), s2: (f32, f32)) -> bool {
    heads_along(s1, s2, from_anchor.outward())
}

/// Both anchors point the same way from rects in different lanes: loop out
/// past the further stub.
fn u_shape(anchor: AnchorPosition, s1: (f32, f32), s2: (f32, f32)) -> Vec<(f32, f32)> {
    match anchor {
        AnchorPosition::Right => {
            let x = s1.0.max(s2.0);
            vec![(x, s1.1), (x, s2.1)]
        }
        AnchorPosition::Left => {
            let x = s1.0.min(s2.0);
            vec![(x, s1.1), (x, s2.1)]
        }
        AnchorPosition::Bottom => {
            let y = s1.1.max(s2.1);
            vec![(s1.0, y), (s2.0, y)]
        }
        AnchorPosition::Top => {
            let y = s1.1.min(s2.1);
            vec![(s1.0, y), (s2.0, y)]
        }
    }
}

/// Horizontal line for routes between horizontally anchored rects that
/// cannot meet head on: the vertical gap between them when there is one,
/// otherwise the cheaper of above or below both.
fn horizontal_channel(from: &Rect, to: &Rect, s1: (f32, f32), s2: (f32, f32), margin: f32) -> f32 {
    if from.bottom() <= to.y {
        return (from.bottom() + to.y) / 2.0;
    }
    if to.bottom() <= from.y {
        return (to.bottom() + from.y) / 2.0;
    }
    let above = from.y.min(to.y) - margin;
    let below = from.bottom().max(to.bottom()) + margin;
    let cost_above = (s1.1 - above).abs() + (s2.1 - above).abs();
    let cost_below = (s1.1 - below).abs() + (s2.1 - below).abs();
    if cost_below < cost_above { below } else { above }
}

fn vertical_channel(from: &Rect, to: &Rect, s1: (f32, f32), s2: (f32, f32), margin: f32) -> f32 {
    if from.right() <= to.x {
        return (from.right() + to.x) / 2.0;
    }
    if to.right() <= from.x {
        return (to.right() + from.x) / 2.0;
    }
    let left = from.x.min(to.x) - margin;
    let right = from.right().max(to.right()) + margin;
    let cost_left = (s1.0 - left).abs() + (s2.0 - left).abs();
    let cost_right = (s1.0 - right).abs() + (s2.0 - right).abs();
    if cost_right < cost_left { right } else { left }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::simplify::path_bend_count;
    use crate::geometry::{rects_overlap, segment_crosses_interior};
    use proptest::prelude::*;

    const STUB: f32 = 20.0;

    fn crossing(points: &[(f32, f32)], rects: &[Rect]) -> Option<((f32, f32), (f32, f32))> {
        points
            .windows(2)
            .find(|pair| rects.iter().any(|rect| segment_crosses_interior(pair[0], pair[1], rect)))
            .map(|pair| (pair[0], pair[1]))
    }

    /// Signed distance of the second to last point from the end anchor along
    /// the anchor's outward normal, and its offset across it.
    fn final_approach(points: &[(f32, f32)], anchor: AnchorPosition) -> (f32, f32) {
        let end = points[points.len() - 1];
        let prev = points[points.len() - 2];
        let (nx, ny) = anchor.outward();
        let (dx, dy) = (prev.0 - end.0, prev.1 - end.1);
        (dx * nx + dy * ny, dx * ny - dy * nx)
    }

    fn doubles_back(points: &[(f32, f32)]) -> bool {
        points.windows(3).any(|w| {
            let (d1, d2) = ((w[1].0 - w[0].0, w[1].1 - w[0].1), (w[2].0 - w[1].0, w[2].1 - w[1].1));
            let cross = d1.0 * d2.1 - d1.1 * d2.0;
            let dot = d1.0 * d2.0 + d1.1 * d2.1;
            cross.abs() <= 1e-3 && dot <= 0.0
        })
    }

    #[test]
    fn converging_horizontal_anchors_jog_at_gap_midpoint() {
        let a = Rect::new(0.0, 0.0, 100.0, 50.0);
        let b = Rect::new(400.0, 80.0, 100.0, 50.0);
        let points = orthogonal_fallback(&a, AnchorPosition::Right, &b, AnchorPosition::Left, 20.0);
        assert_eq!(
            points,
            vec![(100.0, 25.0), (250.0, 25.0), (250.0, 105.0), (400.0, 105.0)]
        );
    }

    #[test]
    fn aligned_converging_anchors_are_straight() {
        let a = Rect::new(0.0, 0.0, 100.0, 50.0);
        let b = Rect::new(400.0, 0.0, 100.0, 50.0);
        let points = orthogonal_fallback(&a, AnchorPosition::Right, &b, AnchorPosition::Left, 20.0);
        assert_eq!(points, vec![(100.0, 25.0), (400.0, 25.0)]);
    }

    #[test]
    fn perpendicular_anchors_bend_once() {
        let a = Rect::new(0.0, 0.0, 100.0, 50.0);
        let b = Rect::new(300.0, 200.0, 100.0, 50.0);
        let points = orthogonal_fallback(&a, AnchorPosition::Right, &b, AnchorPosition::Top, 20.0);
        assert_eq!(points, vec![(100.0, 25.0), (350.0, 25.0), (350.0, 200.0)]);
        assert_eq!(path_bend_count(&points), 1);
    }

    #[test]
    fn perpendicular_corner_behind_the_source_turns_at_the_target_stub() {
        // The target sits up and to the left, so the corner level with the
        // source would meet the target's top anchor from below.
        let a = Rect::new(300.0, 200.0, 100.0, 50.0);
        let b = Rect::new(0.0, 0.0, 100.0, 50.0);
        let points = orthogonal_fallback(&a, AnchorPosition::Right, &b, AnchorPosition::Top, 20.0);
        assert_eq!(
            points,
            vec![(400.0, 225.0), (420.0, 225.0), (420.0, -20.0), (50.0, -20.0), (50.0, 0.0)]
        );
    }

    #[test]
    fn same_direction_anchors_loop_past_both() {
        let a = Rect::new(0.0, 0.0, 100.0, 50.0);
        let b = Rect::new(50.0, 200.0, 200.0, 50.0);
        let points = orthogonal_fallback(&a, AnchorPosition::Right, &b, AnchorPosition::Right, 20.0);
        assert_eq!(
            points,
            vec![(100.0, 25.0), (270.0, 25.0), (270.0, 225.0), (250.0, 225.0)]
        );
    }

    #[test]
    fn same_direction_anchors_on_one_row_go_over_the_target() {
        let a = Rect::new(0.0, 0.0, 100.0, 50.0);
        let b = Rect::new(300.0, 0.0, 100.0, 50.0);
        let points = orthogonal_fallback(&a, AnchorPosition::Right, &b, AnchorPosition::Right, 20.0);
        assert_eq!(
            points,
            vec![
                (100.0, 25.0),
                (120.0, 25.0),
                (120.0, -20.0),
                (420.0, -20.0),
                (420.0, 25.0),
                (400.0, 25.0),
            ]
        );
    }

    #[test]
    fn same_direction_anchors_in_one_lane_avoid_both_rects() {
        let row = (Rect::new(0.0, 0.0, 100.0, 50.0), Rect::new(300.0, 10.0, 100.0, 50.0));
        let column = (Rect::new(0.0, 0.0, 100.0, 50.0), Rect::new(30.0, 200.0, 100.0, 50.0));
        let cases = [
            (AnchorPosition::Right, row),
            (AnchorPosition::Left, row),
            (AnchorPosition::Top, column),
            (AnchorPosition::Bottom, column),
        ];
        for (anchor, (a, b)) in cases {
            for (from, to) in [(a, b), (b, a)] {
                let points = orthogonal_fallback(&from, anchor, &to, anchor, STUB);
                assert_eq!(points.first(), Some(&get_anchor_point(&from, anchor)));
                assert_eq!(points.last(), Some(&get_anchor_point(&to, anchor)));
                assert_eq!(crossing(&points, &[from, to]), None, "{anchor:?}: {points:?}");
                assert!(!doubles_back(&points), "{anchor:?}: {points:?}");
                let (along, across) = final_approach(&points, anchor);
                assert!(along > 0.0 && across.abs() < 1e-3, "{anchor:?}: {points:?}");
            }
        }
    }

    #[test]
    fn diverging_anchors_use_vertical_gap() {
        // Target sits left of the source but the source exits to the right.
        let a = Rect::new(300.0, 0.0, 100.0, 50.0);
        let b = Rect::new(0.0, 150.0, 100.0, 50.0);
        let points = orthogonal_fallback(&a, AnchorPosition::Right, &b, AnchorPosition::Left, 20.0);
        assert_eq!(
            points,
            vec![
                (400.0, 25.0),
                (420.0, 25.0),
                (420.0, 100.0),
                (-20.0, 100.0),
                (-20.0, 175.0),
                (0.0, 175.0),
            ]
        );
    }

    #[test]
    fn diverging_overlapping_rects_go_around() {
        let a = Rect::new(300.0, 0.0, 100.0, 50.0);
        let b = Rect::new(0.0, 10.0, 100.0, 50.0);
        let points = orthogonal_fallback(&a, AnchorPosition::Right, &b, AnchorPosition::Left, 20.0);
        // Above both rects: y = 0 - 20.
        assert!(points.iter().any(|p| p.1 == -20.0));
        assert_eq!(points.first(), Some(&(400.0, 25.0)));
        assert_eq!(points.last(), Some(&(0.0, 35.0)));
    }

    fn rect_strategy() -> impl Strategy<Value = Rect> {
        (-300i32..300, -300i32..300, 20i32..160, 20i32..160)
            .prop_map(|(x, y, w, h)| Rect::new(x as f32, y as f32, w as f32, h as f32))
    }

    proptest! {
        #[test]
        fn prop_fallback_stays_outside_its_endpoints(a in rect_strategy(), b in rect_strategy()) {
            // Stubs need room: the rects are at least two stubs apart on some axis.
            prop_assume!(!rects_overlap(&a.expand(STUB), &b.expand(STUB)));
            for from_anchor in AnchorPosition::ALL {
                for to_anchor in AnchorPosition::ALL {
                    let points = orthogonal_fallback(&a, from_anchor, &b, to_anchor, STUB);
                    prop_assert!(points.len() >= 2);
                    prop_assert_eq!(points[0], get_anchor_point(&a, from_anchor));
                    prop_assert_eq!(points[points.len() - 1], get_anchor_point(&b, to_anchor));

                    // A single perpendicular bend may clip a rect.
                    if from_anchor.is_horizontal() == to_anchor.is_horizontal() {
                        let hit = crossing(&points, &[a, b]);
                        prop_assert!(hit.is_none(), "{:?}->{:?} {:?} crosses at {:?}", from_anchor, to_anchor, points, hit);
                    }
                    let (along, across) = final_approach(&points, to_anchor);
                    prop_assert!(
                        along > 0.0 && across.abs() < 1e-3,
                        "{:?}->{:?} {:?} enters from inside", from_anchor, to_anchor, points
                    );
                }
            }
        }
    }
}
