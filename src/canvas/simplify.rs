//! Polyline clean-up and SVG path emission for relation arrows.

use crate::geometry::distance;

/// Cross products smaller than this count as collinear.
const COLLINEAR_EPS: f32 = 0.01;
/// Coordinates closer than this are treated as equal.
const AXIS_EPS: f32 = 1e-3;

/// Drop interior points that sit on the line through their neighbours,
/// including zero-length steps and spikes that double back. Endpoints are
/// always kept.
///
/// Kept points form a stack: after a removal the new top is checked again
/// against the incoming point, so one pass leaves nothing for a second to do.
pub fn simplify_path(points: &[(f32, f32)]) -> Vec<(f32, f32)> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let mut out: Vec<(f32, f32)> = Vec::with_capacity(points.len());
    out.push(points[0]);
    for &next in &points[1..] {
        while out.len() >= 2 {
            let prev = out[out.len() - 2];
            let curr = out[out.len() - 1];
            let cross =
                (curr.0 - prev.0) * (next.1 - curr.1) - (curr.1 - prev.1) * (next.0 - curr.0);
            if cross.abs() > COLLINEAR_EPS {
                break;
            }
            out.pop();
        }
        out.push(next);
    }
    out
}

fn is_axis_aligned(a: (f32, f32), b: (f32, f32)) -> bool {
    (a.0 - b.0).abs() <= AXIS_EPS || (a.1 - b.1).abs() <= AXIS_EPS
}

fn is_horizontal(a: (f32, f32), b: (f32, f32)) -> bool {
    (a.1 - b.1).abs() <= AXIS_EPS && (a.0 - b.0).abs() > AXIS_EPS
}

/// Collapse grid staircases into the fewest orthogonal bends with the same
/// start and end.
pub fn reduce_orthogonal_bends(points: &[(f32, f32)]) -> Vec<(f32, f32)> {
    reduce_orthogonal_bends_with(points, |_, _| true)
}

/// Greedy bend reduction. From the current point, jump to the furthest later
/// point reachable by a straight run or a single bend whose segments all
/// satisfy `is_clear`; otherwise fall back to the next original point.
pub fn reduce_orthogonal_bends_with<F>(points: &[(f32, f32)], is_clear: F) -> Vec<(f32, f32)>
where
    F: Fn((f32, f32), (f32, f32)) -> bool,
{
    let points = simplify_path(points);
    if points.len() <= 3 {
        return points;
    }
    let last = points.len() - 1;
    let mut out: Vec<(f32, f32)> = vec![points[0]];
    let mut current = points[0];
    let mut heading_horizontal: Option<bool> = None;
    let mut idx = 0usize;

    while idx < last {
        let mut advanced = false;
        for target_idx in (idx + 1..=last).rev() {
            let target = points[target_idx];
            if is_axis_aligned(current, target) && is_clear(current, target) {
                heading_horizontal = Some(is_horizontal(current, target));
                out.push(target);
                current = target;
                idx = target_idx;
                advanced = true;
                break;
            }
            // Keep running in the current heading before turning.
            let corners = if heading_horizontal == Some(false) {
                [(current.0, target.1), (target.0, current.1)]
            } else {
                [(target.0, current.1), (current.0, target.1)]
            };
            let found = corners
                .into_iter()
                .find(|&corner| is_clear(current, corner) && is_clear(corner, target));
            if let Some(corner) = found {
                heading_horizontal = Some(is_horizontal(corner, target));
                out.push(corner);
                out.push(target);
                current = target;
                idx = target_idx;
                advanced = true;
                break;
            }
        }
        if !advanced {
            idx += 1;
            current = points[idx];
            heading_horizontal = None;
            out.push(current);
        }
    }

    dedupe(&simplify_path(&out))
}

fn dedupe(points: &[(f32, f32)]) -> Vec<(f32, f32)> {
    let mut out: Vec<(f32, f32)> = Vec::with_capacity(points.len());
    for &point in points {
        if let Some(&prev) = out.last()
            && distance(prev, point) <= AXIS_EPS
        {
            continue;
        }
        out.push(point);
    }
    if out.len() == 1 && points.len() > 1 {
        out.push(points[points.len() - 1]);
    }
    out
}

/// Straight segments joined by quadratic rounded corners. Each corner radius
/// is clamped to half of the shorter adjacent segment.
pub fn waypoints_to_svg_path(points: &[(f32, f32)], corner_radius: f32) -> String {
    let Some(&first) = points.first() else {
        return String::new();
    };
    let mut d = format!("M {:.2} {:.2}", first.0, first.1);
    if points.len() == 1 {
        return d;
    }
    for idx in 1..points.len() - 1 {
        let prev = points[idx - 1];
        let curr = points[idx];
        let next = points[idx + 1];
        let len_in = distance(prev, curr);
        let len_out = distance(curr, next);
        let radius = corner_radius.min(len_in / 2.0).min(len_out / 2.0);
        if radius <= AXIS_EPS {
            d.push_str(&format!(" L {:.2} {:.2}", curr.0, curr.1));
            continue;
        }
        let before = (
            curr.0 + (prev.0 - curr.0) / len_in * radius,
            curr.1 + (prev.1 - curr.1) / len_in * radius,
        );
        let after = (
            curr.0 + (next.0 - curr.0) / len_out * radius,
            curr.1 + (next.1 - curr.1) / len_out * radius,
        );
        d.push_str(&format!(
            " L {:.2} {:.2} Q {:.2} {:.2} {:.2} {:.2}",
            before.0, before.1, curr.0, curr.1, after.0, after.1
        ));
    }
    let last = points[points.len() - 1];
    d.push_str(&format!(" L {:.2} {:.2}", last.0, last.1));
    d
}

/// Direction changes along a polyline.
pub fn path_bend_count(points: &[(f32, f32)]) -> usize {
    if points.len() < 3 {
        return 0;
    }
    let mut bends = 0usize;
    for idx in 1..points.len() - 1 {
        let p0 = points[idx - 1];
        let p1 = points[idx];
        let p2 = points[idx + 1];
        let dx1 = p1.0 - p0.0;
        let dy1 = p1.1 - p0.1;
        let dx2 = p2.0 - p1.0;
        let dy2 = p2.1 - p1.1;
        if (dx1.abs() <= 1e-4 && dy1.abs() <= 1e-4) || (dx2.abs() <= 1e-4 && dy2.abs() <= 1e-4) {
            continue;
        }
        let cross = dx1 * dy2 - dy1 * dx2;
        if cross.abs() > 1e-4 {
            bends += 1;
        }
    }
    bends
}
