use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::algorithm::{EdgeCost, IncrementalReplanner, ResetSearch};
use crate::common::{Cell, Move};
use crate::error::PlanError;
use crate::map::CostField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Running,
    Captured,
    GoalReached,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct Environment {
    pub size: usize,
    pub max_steps: usize,
    // 0 means same cell.
    pub capture_radius: usize,
    pub step_count: usize,
    pub evader_pos: Cell,
    pub pursuer_pos: Cell,
    pub evader_goal: Cell,
    pub outcome: Outcome,
}

impl Environment {
    pub fn new(
        size: usize,
        max_steps: usize,
        capture_radius: usize,
        evader_start: Cell,
        evader_goal: Cell,
        pursuer_start: Cell,
    ) -> Self {
        Environment {
            size,
            max_steps,
            capture_radius,
            step_count: 0,
            evader_pos: evader_start,
            pursuer_pos: pursuer_start,
            evader_goal,
            outcome: Outcome::Running,
        }
    }

    pub fn is_done(&self) -> bool {
        self.outcome != Outcome::Running
    }

    pub fn is_captured(&self) -> bool {
        self.evader_pos.chebyshev(self.pursuer_pos) <= self.capture_radius
    }

    // Capture, then goal, then step budget.
    pub fn step(&mut self, evader_move: Move, pursuer_move: Move) -> Outcome {
        if self.is_done() {
            return self.outcome;
        }

        self.evader_pos = self.evader_pos.offset_clamped(evader_move, self.size);
        self.pursuer_pos = self.pursuer_pos.offset_clamped(pursuer_move, self.size);
        self.step_count += 1;

        self.outcome = if self.is_captured() {
            Outcome::Captured
        } else if self.evader_pos == self.evader_goal {
            Outcome::GoalReached
        } else if self.step_count >= self.max_steps {
            Outcome::TimedOut
        } else {
            Outcome::Running
        };
        self.outcome
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub step: usize,
    pub evader_move: Move,
    pub pursuer_move: Move,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub steps: usize,
    pub outcome: Outcome,
    pub path_cost: f64,
    // Seconds.
    pub avg_plan_time: f64,
}

// Terrain edits go through `set_cost` so the evader's planner hears about them.
pub struct Simulation<C: EdgeCost> {
    terrain: CostField,
    env: Environment,
    evader: IncrementalReplanner<C>,
    pursuer: ResetSearch,
    path_cost: f64,
    plan_time: Duration,
}

impl<C: EdgeCost> Simulation<C> {
    pub fn new(
        terrain: CostField,
        env: Environment,
        evader: IncrementalReplanner<C>,
        pursuer: ResetSearch,
    ) -> Self {
        Simulation {
            terrain,
            env,
            evader,
            pursuer,
            path_cost: 0.0,
            plan_time: Duration::ZERO,
        }
    }

    pub fn terrain(&self) -> &CostField {
        &self.terrain
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn evader(&self) -> &IncrementalReplanner<C> {
        &self.evader
    }

    pub fn pursuer(&self) -> &ResetSearch {
        &self.pursuer
    }

    pub fn path_cost(&self) -> f64 {
        self.path_cost
    }

    pub fn set_cost(&mut self, cell: Cell, cost: f64) -> anyhow::Result<f64> {
        let cost = self.terrain.set_cost(cell, cost)?;
        self.evader.notify_cost_changed(&self.terrain, cell);
        Ok(cost)
    }

    pub fn tick(&mut self) -> Result<Tick, PlanError> {
        let plan_start_time = Instant::now();
        let evader_path = self.evader.plan(
            &self.terrain,
            self.env.evader_pos,
            Some(self.env.pursuer_pos),
        )?;
        self.plan_time += plan_start_time.elapsed();
        let evader_move = evader_path.first().copied().unwrap_or(Move::STAY);

        let chase_path = self.pursuer.plan(
            &self.terrain,
            self.env.pursuer_pos,
            self.env.evader_pos,
            self.env.evader_goal,
        );
        let pursuer_move = chase_path.first().copied().unwrap_or(Move::STAY);

        self.path_cost += self
            .terrain
            .get_cost(self.env.evader_pos.offset_clamped(evader_move, self.env.size));

        let outcome = self.env.step(evader_move, pursuer_move);
        debug!(
            "Step {}: Evader at {}, Pursuer at {}",
            self.env.step_count, self.env.evader_pos, self.env.pursuer_pos
        );

        Ok(Tick {
            step: self.env.step_count,
            evader_move,
            pursuer_move,
            outcome,
        })
    }

    pub fn run(&mut self) -> Result<TrialOutcome, PlanError> {
        if self.env.is_captured() {
            self.env.outcome = Outcome::Captured;
        }
        while !self.env.is_done() {
            self.tick()?;
        }

        let summary = self.summary();
        info!(
            "Steps: {} | Outcome: {:?} | Path cost: {}",
            summary.steps, summary.outcome, summary.path_cost
        );
        Ok(summary)
    }

    pub fn summary(&self) -> TrialOutcome {
        let steps = self.env.step_count;
        TrialOutcome {
            steps,
            outcome: self.env.outcome,
            path_cost: self.path_cost,
            avg_plan_time: if steps == 0 {
                0.0
            } else {
                self.plan_time.as_secs_f64() / steps as f64
            },
        }
    }
}
