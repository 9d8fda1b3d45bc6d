use crate::config::PlacementConfig;
use crate::geometry::{Rect, rects_overlap};

/// First free cell of a row-major grid, or below everything when the grid is
/// exhausted. `occupied` and the result share one coordinate space (canvas or
/// a group's content area).
pub fn assign_default_position(
    occupied: &[Rect],
    item_width: f32,
    item_height: f32,
    container_width: f32,
    config: &PlacementConfig,
) -> (f32, f32) {
    let gap = config.gap.max(0.0);
    let step_x = item_width + gap;
    let step_y = item_height + gap;
    let columns = if step_x > 0.0 {
        ((container_width - gap) / step_x).floor().max(1.0) as usize
    } else {
        1
    };

    for row in 0..config.max_rows {
        for col in 0..columns {
            let candidate = Rect::new(
                gap + col as f32 * step_x,
                gap + row as f32 * step_y,
                item_width,
                item_height,
            );
            if !occupied.iter().any(|rect| rects_overlap(rect, &candidate)) {
                return (candidate.x, candidate.y);
            }
        }
    }

    let lowest = occupied
        .iter()
        .map(Rect::bottom)
        .fold(f32::NEG_INFINITY, f32::max);
    if lowest.is_finite() {
        (gap, lowest + gap)
    } else {
        (gap, gap)
    }
}
