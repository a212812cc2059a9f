//! Grid pathfinding using the A* algorithm.
//!
//! Movement is 4-connected with uniform step cost. The heuristic is the
//! same Chebyshev distance used everywhere else, which never overestimates
//! the number of orthogonal steps. Equal-priority nodes are expanded in the
//! order they were discovered, so results are fully deterministic.
//!
//! Failure is an empty path, never an error.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::grid::{Coord, Rect};

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    coord: Coord,
    /// g + h
    f_score: u32,
    /// Discovery sequence number, lower wins ties.
    discovered: u64,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: reverse for min-heap behavior.
        match other.f_score.cmp(&self.f_score) {
            Ordering::Equal => other.discovered.cmp(&self.discovered),
            ord => ord,
        }
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find a path from `start` to `goal` avoiding the `blocked` set.
///
/// Returns the full coordinate sequence including both endpoints, `[start]`
/// when they coincide, or an empty vector when the goal is unreachable.
/// The start tile is never treated as blocked.
#[must_use]
pub fn find_path(bounds: Rect, start: Coord, goal: Coord, blocked: &HashSet<Coord>) -> Vec<Coord> {
    find_path_with(bounds, start, goal, |c| blocked.contains(&c))
}

/// Same as [`find_path`] with an arbitrary blocking predicate.
#[must_use]
pub fn find_path_with<F>(bounds: Rect, start: Coord, goal: Coord, is_blocked: F) -> Vec<Coord>
where
    F: Fn(Coord) -> bool,
{
    if !bounds.contains(start) || !bounds.contains(goal) {
        return Vec::new();
    }
    if start == goal {
        return vec![start];
    }
    if is_blocked(goal) {
        return Vec::new();
    }

    let mut open_set: BinaryHeap<AStarNode> = BinaryHeap::new();
    let mut came_from: HashMap<Coord, Coord> = HashMap::new();
    let mut g_score: HashMap<Coord, u32> = HashMap::new();
    let mut closed: HashSet<Coord> = HashSet::new();
    let mut sequence: u64 = 0;

    g_score.insert(start, 0);
    open_set.push(AStarNode {
        coord: start,
        f_score: start.distance(goal),
        discovered: sequence,
    });

    while let Some(current) = open_set.pop() {
        if current.coord == goal {
            return reconstruct_path(&came_from, goal);
        }
        if !closed.insert(current.coord) {
            continue;
        }

        let current_g = g_score.get(&current.coord).copied().unwrap_or(u32::MAX);

        for next in current.coord.neighbors() {
            if !bounds.contains(next) || closed.contains(&next) || is_blocked(next) {
                continue;
            }

            let tentative_g = current_g + 1;
            let neighbor_g = g_score.get(&next).copied().unwrap_or(u32::MAX);

            if tentative_g < neighbor_g {
                came_from.insert(next, current.coord);
                g_score.insert(next, tentative_g);
                sequence += 1;
                open_set.push(AStarNode {
                    coord: next,
                    f_score: tentative_g + next.distance(goal),
                    discovered: sequence,
                });
            }
        }
    }

    Vec::new()
}

/// Reconstruct path from the came_from map.
fn reconstruct_path(came_from: &HashMap<Coord, Coord>, goal: Coord) -> Vec<Coord> {
    let mut path = vec![goal];
    let mut current = goal;

    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }

    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Rect {
        Rect::from_size(10, 10)
    }

    #[test]
    fn test_same_cell_returns_start() {
        let a = Coord::new(5, 5);
        assert_eq!(find_path(bounds(), a, a, &HashSet::new()), vec![a]);
    }

    #[test]
    fn test_adjacent_path_is_two_steps() {
        let a = Coord::new(5, 5);
        let b = Coord::new(6, 5);
        assert_eq!(find_path(bounds(), a, b, &HashSet::new()), vec![a, b]);
    }

    #[test]
    fn test_diagonal_goal_uses_orthogonal_steps() {
        let a = Coord::new(0, 0);
        let b = Coord::new(3, 3);
        let path = find_path(bounds(), a, b, &HashSet::new());
        assert_eq!(path.len(), 7);
        for pair in path.windows(2) {
            let d = (pair[0].col - pair[1].col).abs() + (pair[0].row - pair[1].row).abs();
            assert_eq!(d, 1, "step {} -> {} is not orthogonal", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_path_around_obstacle() {
        let blocked: HashSet<Coord> = (2..8).map(|r| Coord::new(5, r)).collect();
        let path = find_path(bounds(), Coord::new(2, 5), Coord::new(8, 5), &blocked);

        assert!(!path.is_empty());
        assert_eq!(path.first(), Some(&Coord::new(2, 5)));
        assert_eq!(path.last(), Some(&Coord::new(8, 5)));
        for c in &path {
            assert!(!blocked.contains(c), "path goes through blocked cell {c}");
        }
    }

    #[test]
    fn test_no_path_exists() {
        let blocked: HashSet<Coord> = (0..10).map(|r| Coord::new(5, r)).collect();
        let path = find_path(bounds(), Coord::new(2, 5), Coord::new(8, 5), &blocked);
        assert!(path.is_empty());
    }

    #[test]
    fn test_blocked_goal_is_unreachable() {
        let blocked: HashSet<Coord> = [Coord::new(5, 5)].into_iter().collect();
        assert!(find_path(bounds(), Coord::new(0, 0), Coord::new(5, 5), &blocked).is_empty());
    }

    #[test]
    fn test_out_of_bounds_goal() {
        assert!(find_path(bounds(), Coord::new(0, 0), Coord::new(10, 0), &HashSet::new()).is_empty());
    }

    #[test]
    fn test_determinism() {
        let blocked: HashSet<Coord> = (2..8).map(|r| Coord::new(4, r)).collect();
        let a = find_path(bounds(), Coord::new(1, 5), Coord::new(8, 5), &blocked);
        let b = find_path(bounds(), Coord::new(1, 5), Coord::new(8, 5), &blocked);
        assert_eq!(a, b);
    }

    #[test]
    fn test_path_is_shortest_on_open_grid() {
        let a = Coord::new(1, 2);
        let b = Coord::new(7, 4);
        let path = find_path(bounds(), a, b, &HashSet::new());
        // Manhattan distance + 1 for the start tile
        assert_eq!(path.len(), 6 + 2 + 1);
    }
}
