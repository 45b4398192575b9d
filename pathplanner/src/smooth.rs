//! smooth.rs — Line-of-sight path smoothing
//!
//! String-pulling: from each kept waypoint, jump straight to the farthest
//! later waypoint still visible. Visibility is integer Bresenham; a segment
//! is clear iff every enumerated cell lies outside the blocked set, so
//! smoothing never trades obstacle clearance for straightness.

use crate::grid::{GridCell, ObstacleGrid};

/// Cells along the segment a → b, inclusive of both endpoints.
pub fn bresenham_cells(a: GridCell, b: GridCell) -> Vec<GridCell> {
    let (mut x0, mut y0) = a;
    let (x1, y1) = b;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut cells = Vec::new();
    loop {
        cells.push((x0, y0));
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
    cells
}

/// True when the straight segment a → b stays in free space.
pub fn line_of_sight(grid: &ObstacleGrid, a: GridCell, b: GridCell) -> bool {
    bresenham_cells(a, b).into_iter().all(|c| !grid.is_blocked(c))
}

/// Keep turning points only: from waypoint i, advance to the farthest j with
/// a clear chord, never less than i + 1.
pub fn smooth_path(grid: &ObstacleGrid, path: &[GridCell]) -> Vec<GridCell> {
    if path.is_empty() {
        return Vec::new();
    }
    let last = path.len() - 1;
    let mut out = vec![path[0]];
    let mut i = 0;
    while i < last {
        let mut j = last;
        while j > i + 1 && !line_of_sight(grid, path[i], path[j]) {
            j -= 1;
        }
        out.push(path[j]);
        i = j;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Point2;
    use crate::grid::{GridBounds, InflatedObstacle, ObstacleGrid};

    fn grid_with(obstacles: &[InflatedObstacle]) -> ObstacleGrid {
        ObstacleGrid::rasterize(
            GridBounds { x_min: -20, x_max: 40, y_min: -20, y_max: 20 },
            obstacles,
        )
    }

    #[test]
    fn bresenham_includes_both_endpoints() {
        assert_eq!(bresenham_cells((3, 4), (3, 4)), vec![(3, 4)]);
        assert_eq!(
            bresenham_cells((0, 0), (3, 1)),
            vec![(0, 0), (1, 0), (2, 1), (3, 1)]
        );
    }

    #[test]
    fn bresenham_covers_cardinals_and_diagonals() {
        assert_eq!(bresenham_cells((0, 0), (0, 3)), vec![(0, 0), (0, 1), (0, 2), (0, 3)]);
        assert_eq!(bresenham_cells((0, 0), (-3, 0)), vec![(0, 0), (-1, 0), (-2, 0), (-3, 0)]);
        assert_eq!(bresenham_cells((0, 0), (3, 3)), vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn line_of_sight_sees_through_free_space_only() {
        let grid = grid_with(&[InflatedObstacle {
            center: Point2::new(2.0, 0.0),
            radius_units: 0.5,
        }]);
        // Scaled centre (4, 0), scaled radius 1.
        assert!(!line_of_sight(&grid, (0, 0), (8, 0)));
        assert!(line_of_sight(&grid, (0, 3), (8, 3)));
    }

    #[test]
    fn staircase_collapses_to_endpoints() {
        let grid = grid_with(&[]);
        let path = vec![(0, 0), (1, 0), (1, 1), (2, 1), (2, 2), (3, 2), (3, 3)];
        assert_eq!(smooth_path(&grid, &path), vec![(0, 0), (3, 3)]);
    }

    #[test]
    fn smoothing_keeps_detour_turning_points() {
        let grid = grid_with(&[InflatedObstacle {
            center: Point2::new(2.0, 0.0),
            radius_units: 0.5,
        }]);
        // Staircase over the disc at scaled (4, 0): direct sight from start
        // to goal is blocked, so an interior waypoint must survive.
        let path = vec![
            (0, 0), (1, 1), (2, 2), (3, 2), (4, 2), (5, 2), (6, 1), (7, 0), (8, 0),
        ];
        let smoothed = smooth_path(&grid, &path);
        assert!(smoothed.len() > 2);
        assert_eq!(smoothed[0], (0, 0));
        assert_eq!(*smoothed.last().unwrap(), (8, 0));
        // Obstacle safety: every smoothed chord is Bresenham-clear.
        for w in smoothed.windows(2) {
            assert!(line_of_sight(&grid, w[0], w[1]));
        }
    }

    #[test]
    fn short_paths_pass_through() {
        let grid = grid_with(&[]);
        assert_eq!(smooth_path(&grid, &[]), Vec::<(i64, i64)>::new());
        assert_eq!(smooth_path(&grid, &[(1, 1)]), vec![(1, 1)]);
        assert_eq!(smooth_path(&grid, &[(1, 1), (2, 2)]), vec![(1, 1), (2, 2)]);
    }
}
