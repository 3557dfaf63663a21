use super::construct_moves;
use crate::common::{Cell, Connectivity, Heuristic, Move};
use crate::map::CostField;
use crate::stat::Stats;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::Instant;
use tracing::{debug, instrument, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PursuerTarget {
    Direct,
    // Toward the evader's goal.
    Intercept { lookahead: usize },
}

#[derive(Debug, Clone)]
struct OpenNode {
    position: Cell,
    f_cost: f64,
    g_cost: f64,
    sequence: usize,
}

// Reversed for BinaryHeap: lowest f, then lowest g, then oldest entry first.
impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_cost
            .total_cmp(&self.f_cost)
            .then_with(|| other.g_cost.total_cmp(&self.g_cost))
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

#[derive(Debug, Clone)]
pub struct ResetSearch {
    connectivity: Connectivity,
    heuristic: Heuristic,
    target: PursuerTarget,
    stats: Stats,
}

impl ResetSearch {
    pub fn new(connectivity: Connectivity, target: PursuerTarget) -> Self {
        ResetSearch {
            connectivity,
            heuristic: connectivity.heuristic(),
            target,
            stats: Stats::default(),
        }
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn target_cell(&self, terrain: &CostField, evader_pos: Cell, evader_goal: Cell) -> Cell {
        let PursuerTarget::Intercept { lookahead } = self.target else {
            return evader_pos;
        };

        let mut target = evader_pos;
        for _ in 0..lookahead {
            if target == evader_goal {
                break;
            }
            let step = Move::new(
                (evader_goal.x as isize - target.x as isize).signum() as i8,
                (evader_goal.y as isize - target.y as isize).signum() as i8,
            );
            target = target.offset_clamped(step, terrain.size());
        }

        if terrain.is_blocked(target) {
            evader_pos
        } else {
            target
        }
    }

    #[instrument(skip_all, name = "pursuer_plan", fields(start = %start, evader = %evader_pos), level = "debug")]
    pub fn plan(
        &mut self,
        terrain: &CostField,
        start: Cell,
        evader_pos: Cell,
        evader_goal: Cell,
    ) -> Vec<Move> {
        let plan_start_time = Instant::now();
        let target = self.target_cell(terrain, evader_pos, evader_goal);

        let moves = match self.search(terrain, start, target) {
            Some((trace, _)) => construct_moves(&trace, start, target),
            None => Vec::new(),
        };

        self.stats.plan_calls += 1;
        self.stats.record_time(plan_start_time.elapsed());
        debug!("chasing {target}: {} moves", moves.len());
        moves
    }

    // Both ends included.
    pub fn shortest_path(
        &mut self,
        terrain: &CostField,
        start: Cell,
        goal: Cell,
    ) -> Option<(Vec<Cell>, f64)> {
        let (trace, cost) = self.search(terrain, start, goal)?;
        let mut path = vec![goal];
        let mut current = goal;
        while let Some(&prev) = trace.get(&current) {
            path.push(prev);
            current = prev;
        }
        path.reverse();
        Some((path, cost))
    }

    fn search(
        &mut self,
        terrain: &CostField,
        start: Cell,
        goal: Cell,
    ) -> Option<(HashMap<Cell, Cell>, f64)> {
        if !terrain.contains(start) || terrain.is_blocked(goal) {
            return None;
        }

        let mut open_list = BinaryHeap::new();
        let mut closed_list = HashSet::new();
        let mut trace = HashMap::new();
        let mut g_cost_map = HashMap::new();
        let mut sequence = 0;

        g_cost_map.insert(start, 0.0);
        open_list.push(OpenNode {
            position: start,
            f_cost: self.heuristic.distance(start, goal),
            g_cost: 0.0,
            sequence,
        });

        while let Some(current) = open_list.pop() {
            if !closed_list.insert(current.position) {
                continue;
            }
            self.stats.expansions += 1;
            trace!("expand node: {:?}", current.position);

            if current.position == goal {
                return Some((trace, current.g_cost));
            }

            for neighbor in terrain.neighbors(current.position, self.connectivity) {
                if closed_list.contains(&neighbor) || terrain.is_blocked(neighbor) {
                    continue;
                }

                let tentative_g_cost = current.g_cost + terrain.get_cost(neighbor);
                let old_g_cost = *g_cost_map.get(&neighbor).unwrap_or(&f64::INFINITY);
                if tentative_g_cost < old_g_cost {
                    trace.insert(neighbor, current.position);
                    g_cost_map.insert(neighbor, tentative_g_cost);
                    sequence += 1;
                    open_list.push(OpenNode {
                        position: neighbor,
                        f_cost: tentative_g_cost + self.heuristic.distance(neighbor, goal),
                        g_cost: tentative_g_cost,
                        sequence,
                    });
                }
            }
        }

        debug!("cannot reach {goal} from {start}");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    // Plain Dijkstra over the same graph.
    fn dijkstra(terrain: &CostField, start: Cell, goal: Cell, connectivity: Connectivity) -> Option<f64> {
        let size = terrain.size();
        let mut dist = vec![f64::INFINITY; size * size];
        let mut done = vec![false; size * size];
        dist[start.index(size)] = 0.0;
        loop {
            let next = (0..size * size)
                .filter(|&i| !done[i] && dist[i].is_finite())
                .min_by(|&a, &b| dist[a].total_cmp(&dist[b]))?;
            done[next] = true;
            let cell = Cell::from_index(next, size);
            if cell == goal {
                return Some(dist[next]);
            }
            for neighbor in terrain.neighbors(cell, connectivity) {
                if terrain.is_blocked(neighbor) {
                    continue;
                }
                let candidate = dist[next] + terrain.get_cost(neighbor);
                let index = neighbor.index(size);
                if candidate < dist[index] {
                    dist[index] = candidate;
                }
            }
        }
    }

    #[test]
    fn test_chase_on_open_grid() {
        let terrain = CostField::open(8);
        let mut search = ResetSearch::new(Connectivity::Eight, PursuerTarget::Direct);
        let moves = search.plan(&terrain, Cell::new(7, 0), Cell::new(0, 0), Cell::new(7, 7));
        assert_eq!(moves.len(), 7);
        assert!(moves.iter().all(|&mv| mv == Move::new(-1, 0)));
    }

    #[test]
    fn test_chase_reached_target() {
        let terrain = CostField::open(4);
        let mut search = ResetSearch::new(Connectivity::Eight, PursuerTarget::Direct);
        let cell = Cell::new(2, 2);
        assert!(search.plan(&terrain, cell, cell, Cell::new(3, 3)).is_empty());
    }

    #[test]
    fn test_shortest_path_detour() {
        let terrain = CostField::from_file("map_file/test/hills-5.csv", 5).unwrap();
        let mut search = ResetSearch::new(Connectivity::Eight, PursuerTarget::Direct);
        let (path, cost) = search
            .shortest_path(&terrain, Cell::new(1, 2), Cell::new(3, 2))
            .unwrap();
        assert_eq!(path.first(), Some(&Cell::new(1, 2)));
        assert_eq!(path.last(), Some(&Cell::new(3, 2)));
        assert!(!path.iter().any(|&cell| terrain.is_blocked(cell)));
        // (2,3) then (3,2).
        assert_eq!(cost, 2.0);
    }

    #[test]
    fn test_unreachable_goal() {
        let rows = vec![
            vec![1, 0, 1],
            vec![0, 0, 1],
            vec![1, 1, 1],
        ];
        let terrain = CostField::from_rows(&rows).unwrap();
        let mut search = ResetSearch::new(Connectivity::Eight, PursuerTarget::Direct);
        assert!(search
            .plan(&terrain, Cell::new(0, 0), Cell::new(2, 2), Cell::new(2, 2))
            .is_empty());
        assert!(search
            .shortest_path(&terrain, Cell::new(0, 0), Cell::new(1, 1))
            .is_none());
    }

    #[test]
    fn test_intercept_target() {
        let mut terrain = CostField::open(10);
        let search = ResetSearch::new(Connectivity::Eight, PursuerTarget::Intercept { lookahead: 3 });
        let goal = Cell::new(9, 5);
        assert_eq!(search.target_cell(&terrain, Cell::new(2, 2), goal), Cell::new(5, 5));
        assert_eq!(search.target_cell(&terrain, Cell::new(8, 5), goal), goal);

        terrain.set_cost(Cell::new(5, 5), f64::INFINITY).unwrap();
        assert_eq!(search.target_cell(&terrain, Cell::new(2, 2), goal), Cell::new(2, 2));

        let direct = ResetSearch::new(Connectivity::Eight, PursuerTarget::Direct);
        assert_eq!(direct.target_cell(&terrain, Cell::new(2, 2), goal), Cell::new(2, 2));
    }

    #[test]
    fn test_matches_dijkstra_on_random_terrain() {
        let mut rng = StdRng::seed_from_u64(0);
        for connectivity in [Connectivity::Eight, Connectivity::Four] {
            for _ in 0..10 {
                let size = 10;
                let rows: Vec<Vec<u32>> = (0..size)
                    .map(|_| (0..size).map(|_| rng.gen_range(0..6)).collect())
                    .collect();
                let terrain = CostField::from_rows(&rows).unwrap();
                let start = Cell::new(0, 0);
                let goal = Cell::new(size - 1, size - 1);

                let mut search = ResetSearch::new(connectivity, PursuerTarget::Direct);
                let expected = if terrain.is_blocked(goal) {
                    None
                } else {
                    dijkstra(&terrain, start, goal, connectivity)
                };
                let found = search.shortest_path(&terrain, start, goal).map(|(_, cost)| cost);
                assert_eq!(found, expected);
            }
        }
    }

    #[test]
    fn test_plan_is_deterministic() {
        let terrain = CostField::open(9);
        let mut search = ResetSearch::new(Connectivity::Eight, PursuerTarget::Direct);
        let first = search.plan(&terrain, Cell::new(0, 8), Cell::new(8, 0), Cell::new(8, 8));
        let second = search.plan(&terrain, Cell::new(0, 8), Cell::new(8, 0), Cell::new(8, 8));
        assert_eq!(first, second);
        assert_eq!(search.stats().plan_calls, 2);
    }
}
