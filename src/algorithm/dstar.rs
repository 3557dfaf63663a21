use super::frontier::{Key, PriorityFrontier};
use super::{EdgeCost, Observation};
use crate::common::{Cell, Connectivity, Heuristic, Move};
use crate::error::PlanError;
use crate::map::CostField;
use crate::stat::Stats;

use std::time::Instant;
use tracing::{debug, instrument, trace};

/// D* Lite searching backwards from a fixed goal. Every terrain edit must be
/// reported through `notify_cost_changed` before the next `plan`.
#[derive(Debug, Clone)]
pub struct IncrementalReplanner<C: EdgeCost> {
    size: usize,
    connectivity: Connectivity,
    heuristic: Heuristic,
    start: Cell,
    last: Cell,
    goal: Cell,
    km: f64,
    g: Vec<f64>,
    rhs: Vec<f64>,
    frontier: PriorityFrontier,
    policy: C,
    stats: Stats,
}

impl<C: EdgeCost> IncrementalReplanner<C> {
    pub fn new(
        terrain: &CostField,
        start: Cell,
        goal: Cell,
        connectivity: Connectivity,
        policy: C,
    ) -> Result<Self, PlanError> {
        Self::with_heuristic(
            terrain,
            start,
            goal,
            connectivity,
            connectivity.heuristic(),
            policy,
        )
    }

    // `heuristic` must not overestimate under `connectivity`.
    pub fn with_heuristic(
        terrain: &CostField,
        start: Cell,
        goal: Cell,
        connectivity: Connectivity,
        heuristic: Heuristic,
        policy: C,
    ) -> Result<Self, PlanError> {
        let size = terrain.size();
        if size == 0 {
            return Err(PlanError::EmptyGrid);
        }
        for (role, cell) in [("start", start), ("goal", goal)] {
            if !cell.in_bounds(size) {
                return Err(PlanError::OutOfBounds { role, cell, size });
            }
        }
        if terrain.is_blocked(goal) {
            return Err(PlanError::GoalBlocked(goal));
        }
        policy.check(size)?;

        let cells = size * size;
        let mut planner = IncrementalReplanner {
            size,
            connectivity,
            heuristic,
            start,
            last: start,
            goal,
            km: 0.0,
            g: vec![f64::INFINITY; cells],
            rhs: vec![f64::INFINITY; cells],
            frontier: PriorityFrontier::new(cells),
            policy,
            stats: Stats::default(),
        };
        planner.initialize(terrain);
        Ok(planner)
    }

    pub fn initialize(&mut self, terrain: &CostField) {
        self.g.fill(f64::INFINITY);
        self.rhs.fill(f64::INFINITY);
        let goal = self.goal.index(self.size);
        self.rhs[goal] = 0.0;
        self.km = 0.0;
        self.last = self.start;
        self.frontier.clear();
        self.frontier.insert(goal, self.calculate_key(goal));
        self.compute_shortest_path(terrain);
        debug!(
            "initialized {0}x{0} planner, goal {1}, g(start) = {2}",
            self.size,
            self.goal,
            self.g[self.start.index(self.size)]
        );
    }

    #[instrument(skip_all, name = "evader_plan", fields(start = %new_start), level = "debug")]
    pub fn plan(
        &mut self,
        terrain: &CostField,
        new_start: Cell,
        pursuer: Option<Cell>,
    ) -> Result<Vec<Move>, PlanError> {
        if !new_start.in_bounds(self.size) {
            return Err(PlanError::OutOfBounds {
                role: "start",
                cell: new_start,
                size: self.size,
            });
        }
        let plan_start_time = Instant::now();

        let changed = self.policy.observe(&Observation {
            start: new_start,
            goal: self.goal,
            pursuer,
            heuristic: self.heuristic,
        })?;

        self.start = new_start;
        self.km += self.heuristic.distance(self.last, self.start);
        self.last = self.start;

        trace!("{} cells changed edge cost, km = {}", changed.len(), self.km);
        self.update_region(terrain, &changed);
        self.update_vertex(terrain, self.start);
        self.compute_shortest_path(terrain);

        let moves = self.extract_moves(terrain);

        self.stats.plan_calls += 1;
        self.stats.record_time(plan_start_time.elapsed());
        debug!("planned {} moves", moves.len());
        Ok(moves)
    }

    pub fn notify_cost_changed(&mut self, terrain: &CostField, cell: Cell) {
        if !cell.in_bounds(self.size) {
            return;
        }
        self.update_vertex(terrain, cell);
        for neighbor in terrain.neighbors(cell, self.connectivity) {
            self.update_vertex(terrain, neighbor);
        }
    }

    pub fn start(&self) -> Cell {
        self.start
    }

    pub fn goal(&self) -> Cell {
        self.goal
    }

    pub fn key_modifier(&self) -> f64 {
        self.km
    }

    pub fn g(&self, cell: Cell) -> f64 {
        self.g[cell.index(self.size)]
    }

    pub fn rhs(&self, cell: Cell) -> f64 {
        self.rhs[cell.index(self.size)]
    }

    pub fn is_consistent(&self, cell: Cell) -> bool {
        let index = cell.index(self.size);
        self.g[index] == self.rhs[index]
    }

    pub fn in_frontier(&self, cell: Cell) -> bool {
        self.frontier.contains(cell.index(self.size))
    }

    pub fn policy(&self) -> &C {
        &self.policy
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    // Under this planner's edge costs, risk included.
    pub fn path_cost(&self, terrain: &CostField, start: Cell, moves: &[Move]) -> f64 {
        let mut current = start;
        let mut total = 0.0;
        for &mv in moves {
            let Some(next) = current.offset(mv, self.size) else {
                return f64::INFINITY;
            };
            total += self.policy.cost(terrain, current, next);
            current = next;
        }
        total
    }

    fn calculate_key(&self, index: usize) -> Key {
        let k2 = self.g[index].min(self.rhs[index]);
        let cell = Cell::from_index(index, self.size);
        Key::new(k2 + self.heuristic.distance(self.start, cell) + self.km, k2)
    }

    fn best_successor(&self, terrain: &CostField, cell: Cell) -> Option<(Cell, f64)> {
        let mut best: Option<(Cell, f64)> = None;
        for next in terrain.neighbors(cell, self.connectivity) {
            if terrain.is_blocked(next) {
                continue;
            }
            let value = self.policy.cost(terrain, cell, next) + self.g[next.index(self.size)];
            if best.map_or(true, |(_, best_value)| value < best_value) {
                best = Some((next, value));
            }
        }
        best
    }

    fn update_vertex(&mut self, terrain: &CostField, cell: Cell) {
        self.stats.vertex_updates += 1;
        let index = cell.index(self.size);
        if cell != self.goal {
            self.rhs[index] = self
                .best_successor(terrain, cell)
                .map_or(f64::INFINITY, |(_, value)| value);
        }
        if self.g[index] != self.rhs[index] {
            self.frontier.insert(index, self.calculate_key(index));
        } else {
            self.frontier.remove(index);
        }
    }

    // Each cell once.
    fn update_region(&mut self, terrain: &CostField, cells: &[Cell]) {
        if cells.is_empty() {
            return;
        }
        let mut touched = vec![false; self.size * self.size];
        for &cell in cells {
            let around = std::iter::once(cell).chain(terrain.neighbors(cell, self.connectivity));
            for affected in around {
                let index = affected.index(self.size);
                if !touched[index] {
                    touched[index] = true;
                    self.update_vertex(terrain, affected);
                }
            }
        }
    }

    fn compute_shortest_path(&mut self, terrain: &CostField) {
        let start = self.start.index(self.size);
        while let Some((top_key, _)) = self.frontier.peek_valid() {
            if top_key >= self.calculate_key(start) && self.rhs[start] == self.g[start] {
                break;
            }
            let Some((k_old, index)) = self.frontier.pop_valid() else {
                break;
            };
            self.stats.expansions += 1;

            let cell = Cell::from_index(index, self.size);
            let k_new = self.calculate_key(index);
            if k_old < k_new {
                // Queued before the start moved.
                self.frontier.insert(index, k_new);
            } else if self.g[index] > self.rhs[index] {
                self.g[index] = self.rhs[index];
                for neighbor in terrain.neighbors(cell, self.connectivity) {
                    self.update_vertex(terrain, neighbor);
                }
            } else {
                self.g[index] = f64::INFINITY;
                self.update_vertex(terrain, cell);
                for neighbor in terrain.neighbors(cell, self.connectivity) {
                    self.update_vertex(terrain, neighbor);
                }
            }
        }
    }

    fn extract_moves(&self, terrain: &CostField) -> Vec<Move> {
        let mut moves = Vec::new();
        let mut current = self.start;
        let limit = self.size * self.size;

        while current != self.goal
            && self.g[current.index(self.size)].is_finite()
            && moves.len() < limit
        {
            let Some((next, value)) = self.best_successor(terrain, current) else {
                break;
            };
            if value.is_infinite() {
                break;
            }
            moves.push(current.move_to(next));
            current = next;
        }

        if current != self.goal {
            debug!("goal {} unreachable from {}", self.goal, self.start);
        }
        moves
    }
}
