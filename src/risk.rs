use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::common::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RiskScaling {
    /// `λ · d(evader, goal) · (r − d)`: the closer to the goal, the bolder the evader.
    Distance,
    /// `λ · (r − d)`.
    Constant,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskParams {
    pub lambda: f64,
    pub radius: usize,
    pub scaling: RiskScaling,
}

#[derive(Debug, Clone)]
pub struct RiskField {
    size: usize,
    params: RiskParams,
    risk: Vec<f64>,
}

impl RiskField {
    pub fn new(size: usize, params: RiskParams) -> Self {
        RiskField {
            size,
            params,
            risk: vec![0.0; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn params(&self) -> &RiskParams {
        &self.params
    }

    pub fn penalty(&self, cell: Cell) -> f64 {
        if !cell.in_bounds(self.size) {
            return 0.0;
        }
        self.risk[cell.index(self.size)]
    }

    pub fn penalty_at(&self, distance: usize, evader_to_goal: f64) -> f64 {
        let RiskParams {
            lambda,
            radius,
            scaling,
        } = self.params;
        if distance > radius {
            return 0.0;
        }
        let scale = match scaling {
            RiskScaling::Distance => evader_to_goal,
            RiskScaling::Constant => 1.0,
        };
        lambda * scale * (radius - distance) as f64
    }

    // Returns the cells whose penalty changed.
    pub fn update(&mut self, pursuer: Cell, evader_to_goal: f64) -> Vec<Cell> {
        let mut changed = Vec::new();
        for index in 0..self.risk.len() {
            let cell = Cell::from_index(index, self.size);
            let penalty = self.penalty_at(cell.chebyshev(pursuer), evader_to_goal);
            if penalty != self.risk[index] {
                self.risk[index] = penalty;
                changed.push(cell);
            }
        }
        trace!(
            "risk update around {pursuer}: {} cells changed",
            changed.len()
        );
        changed
    }
}
