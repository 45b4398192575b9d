//! astar.rs — Grid A* search
//!
//! 8-connected search over the free cells of an [`ObstacleGrid`]. Cardinal
//! moves cost 1, diagonals √2; the heuristic is Euclidean distance to the
//! goal, admissible and monotone for this edge set. Ties on f break on g,
//! then insertion order, which keeps expansion fully deterministic.
//!
//! Diagonal moves between two free cells are permitted even when one of the
//! orthogonally adjacent cells is blocked (corner-cutting).

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::grid::{GridCell, ObstacleGrid};

const DIRECTIONS: [(i64, i64); 8] = [
    (0, 1), (0, -1), (1, 0), (-1, 0),     // cardinal
    (1, 1), (1, -1), (-1, 1), (-1, -1),   // diagonal
];

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    f: FloatOrd,
    g: FloatOrd,
    seq: u64,
    cell: GridCell,
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f
            .cmp(&other.f)
            .then_with(|| self.g.cmp(&other.g))
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Shortest cell path start..=goal, or None when the open set drains before
/// the goal is reached. Start = goal yields `[start]`.
pub fn astar(grid: &ObstacleGrid, start: GridCell, goal: GridCell) -> Option<Vec<GridCell>> {
    let h = |c: GridCell| {
        let dx = (c.0 - goal.0) as f64;
        let dy = (c.1 - goal.1) as f64;
        (dx * dx + dy * dy).sqrt()
    };

    let mut open: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
    let mut seq: u64 = 0;
    open.push(Reverse(OpenNode { f: FloatOrd(h(start)), g: FloatOrd(0.0), seq, cell: start }));

    let mut g_score: HashMap<GridCell, f64> = HashMap::from([(start, 0.0)]);
    let mut came_from: HashMap<GridCell, GridCell> = HashMap::new();
    let mut closed: HashSet<GridCell> = HashSet::new();

    while let Some(Reverse(node)) = open.pop() {
        let current = node.cell;

        if current == goal {
            let mut path = vec![current];
            let mut cur = current;
            while let Some(&prev) = came_from.get(&cur) {
                path.push(prev);
                cur = prev;
            }
            path.reverse();
            return Some(path);
        }

        // Lazy deletion: stale heap entries are dropped here.
        if !closed.insert(current) {
            continue;
        }
        let g_current = node.g.0;

        for (dx, dy) in DIRECTIONS {
            let neighbor = (current.0 + dx, current.1 + dy);
            if !grid.in_bounds(neighbor) || closed.contains(&neighbor) || grid.is_blocked(neighbor)
            {
                continue;
            }

            let edge_cost = if dx != 0 && dy != 0 { std::f64::consts::SQRT_2 } else { 1.0 };
            let tentative = g_current + edge_cost;

            if g_score.get(&neighbor).map_or(true, |&g| tentative < g) {
                g_score.insert(neighbor, tentative);
                came_from.insert(neighbor, current);
                seq += 1;
                open.push(Reverse(OpenNode {
                    f: FloatOrd(tentative + h(neighbor)),
                    g: FloatOrd(tentative),
                    seq,
                    cell: neighbor,
                }));
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Point2;
    use crate::grid::{GridBounds, InflatedObstacle, ObstacleGrid};

    fn empty_grid(lo: i64, hi: i64) -> ObstacleGrid {
        ObstacleGrid::rasterize(
            GridBounds { x_min: lo, x_max: hi, y_min: lo, y_max: hi },
            &[],
        )
    }

    fn chebyshev(a: (i64, i64), b: (i64, i64)) -> i64 {
        (a.0 - b.0).abs().max((a.1 - b.1).abs())
    }

    #[test]
    fn start_equals_goal() {
        let grid = empty_grid(-5, 5);
        assert_eq!(astar(&grid, (2, 2), (2, 2)), Some(vec![(2, 2)]));
    }

    #[test]
    fn unobstructed_paths_are_optimal() {
        // Without obstacles the cell count is max(|Δi|, |Δj|) + 1.
        let grid = empty_grid(-20, 20);
        for goal in [(10, 0), (0, 10), (7, 7), (10, 3), (-5, 8), (-10, -4)] {
            let path = astar(&grid, (0, 0), goal).expect("path must exist");
            assert_eq!(path.len() as i64, chebyshev((0, 0), goal) + 1, "goal {goal:?}");
            assert_eq!(path[0], (0, 0));
            assert_eq!(*path.last().unwrap(), goal);
        }
    }

    #[test]
    fn consecutive_cells_are_neighbors() {
        let grid = empty_grid(-20, 20);
        let path = astar(&grid, (-8, 3), (9, -6)).unwrap();
        for w in path.windows(2) {
            assert_eq!(chebyshev(w[0], w[1]), 1);
        }
    }

    #[test]
    fn path_detours_around_a_disc() {
        let grid = ObstacleGrid::rasterize(
            GridBounds { x_min: -20, x_max: 40, y_min: -20, y_max: 20 },
            &[InflatedObstacle { center: Point2::new(5.0, 0.0), radius_units: 2.0 }],
        );
        let path = astar(&grid, (0, 0), (20, 0)).expect("detour must exist");
        assert!(path.len() as i64 > chebyshev((0, 0), (20, 0)) + 1);
        for cell in &path {
            assert!(!grid.is_blocked(*cell));
        }
    }

    #[test]
    fn sealed_goal_is_unreachable() {
        // The goal cell itself lies inside the disc; blocked cells never
        // enter the open set, so it drains without reaching the goal.
        let grid = ObstacleGrid::rasterize(
            GridBounds { x_min: -10, x_max: 10, y_min: -10, y_max: 10 },
            &[InflatedObstacle { center: Point2::new(5.0, 0.0), radius_units: 2.0 }],
        );
        assert_eq!(astar(&grid, (-5, 0), (10, 0)), None);
    }

    #[test]
    fn search_is_deterministic() {
        let grid = ObstacleGrid::rasterize(
            GridBounds { x_min: -20, x_max: 40, y_min: -20, y_max: 20 },
            &[
                InflatedObstacle { center: Point2::new(4.0, 1.0), radius_units: 1.5 },
                InflatedObstacle { center: Point2::new(8.0, -2.0), radius_units: 2.0 },
            ],
        );
        let a = astar(&grid, (-10, -5), (30, 10));
        let b = astar(&grid, (-10, -5), (30, 10));
        assert_eq!(a, b);
    }
}
