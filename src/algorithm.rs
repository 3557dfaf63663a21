mod astar;
mod dstar;
mod frontier;

pub use astar::{PursuerTarget, ResetSearch};
pub use dstar::IncrementalReplanner;
pub use frontier::{Key, PriorityFrontier};

use std::collections::HashMap;

use crate::common::{Cell, Heuristic, Move};
use crate::error::PlanError;
use crate::map::CostField;
use crate::risk::{RiskField, RiskParams};

#[derive(Debug, Clone, Copy)]
pub struct Observation {
    pub start: Cell,
    pub goal: Cell,
    pub pursuer: Option<Cell>,
    pub heuristic: Heuristic,
}

pub trait EdgeCost {
    fn cost(&self, terrain: &CostField, from: Cell, to: Cell) -> f64;

    // Returns the cells whose incoming edge costs changed.
    fn observe(&mut self, observation: &Observation) -> Result<Vec<Cell>, PlanError>;

    // Checked once when a planner is built over a `size`x`size` terrain.
    fn check(&self, _size: usize) -> Result<(), PlanError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TerrainCost;

impl EdgeCost for TerrainCost {
    fn cost(&self, terrain: &CostField, _from: Cell, to: Cell) -> f64 {
        terrain.get_cost(to)
    }

    fn observe(&mut self, _observation: &Observation) -> Result<Vec<Cell>, PlanError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone)]
pub struct RiskAwareCost {
    risk: RiskField,
}

impl RiskAwareCost {
    pub fn new(size: usize, params: RiskParams) -> Self {
        RiskAwareCost {
            risk: RiskField::new(size, params),
        }
    }

    pub fn risk(&self) -> &RiskField {
        &self.risk
    }
}

impl EdgeCost for RiskAwareCost {
    fn cost(&self, terrain: &CostField, _from: Cell, to: Cell) -> f64 {
        terrain.get_cost(to) + self.risk.penalty(to)
    }

    fn observe(&mut self, observation: &Observation) -> Result<Vec<Cell>, PlanError> {
        let pursuer = observation.pursuer.ok_or(PlanError::MissingPursuer)?;
        let evader_to_goal = observation
            .heuristic
            .distance(observation.start, observation.goal);
        Ok(self.risk.update(pursuer, evader_to_goal))
    }

    fn check(&self, size: usize) -> Result<(), PlanError> {
        if self.risk.size() != size {
            return Err(PlanError::SizeMismatch {
                terrain: size,
                policy: self.risk.size(),
            });
        }
        let lambda = self.risk.params().lambda;
        if !lambda.is_finite() || lambda < 0.0 {
            return Err(PlanError::InvalidLambda(lambda));
        }
        Ok(())
    }
}

fn construct_moves(trace: &HashMap<Cell, Cell>, start: Cell, goal: Cell) -> Vec<Move> {
    let mut moves = Vec::new();
    let mut current = goal;
    while current != start {
        let Some(&prev) = trace.get(&current) else {
            break;
        };
        moves.push(prev.move_to(current));
        current = prev;
    }
    moves.reverse();
    moves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::RiskScaling;

    #[test]
    fn test_construct_moves() {
        let mut trace = HashMap::new();
        trace.insert(Cell::new(1, 1), Cell::new(0, 0));
        trace.insert(Cell::new(2, 1), Cell::new(1, 1));
        let moves = construct_moves(&trace, Cell::new(0, 0), Cell::new(2, 1));
        assert_eq!(moves, vec![Move::new(1, 1), Move::new(1, 0)]);
        assert!(construct_moves(&trace, Cell::new(0, 0), Cell::new(0, 0)).is_empty());
    }

    #[test]
    fn test_risk_aware_cost_requires_pursuer() {
        let mut policy = RiskAwareCost::new(
            4,
            RiskParams {
                lambda: 1.0,
                radius: 2,
                scaling: RiskScaling::Constant,
            },
        );
        let mut observation = Observation {
            start: Cell::new(0, 0),
            goal: Cell::new(3, 3),
            pursuer: None,
            heuristic: Heuristic::Chebyshev,
        };
        assert_eq!(policy.observe(&observation), Err(PlanError::MissingPursuer));

        observation.pursuer = Some(Cell::new(3, 0));
        assert!(!policy.observe(&observation).unwrap().is_empty());

        let terrain = CostField::open(4);
        assert_eq!(policy.cost(&terrain, Cell::new(2, 1), Cell::new(3, 0)), 3.0);
        assert_eq!(policy.cost(&terrain, Cell::new(0, 1), Cell::new(0, 0)), 1.0);
    }

    #[test]
    fn test_risk_aware_cost_check() {
        let params = RiskParams {
            lambda: 1.0,
            radius: 2,
            scaling: RiskScaling::Distance,
        };
        assert_eq!(RiskAwareCost::new(6, params).check(6), Ok(()));
        assert_eq!(
            RiskAwareCost::new(8, params).check(6),
            Err(PlanError::SizeMismatch {
                terrain: 6,
                policy: 8
            })
        );

        let unbounded = RiskParams {
            lambda: f64::INFINITY,
            ..params
        };
        assert_eq!(
            RiskAwareCost::new(6, unbounded).check(6),
            Err(PlanError::InvalidLambda(f64::INFINITY))
        );
        assert_eq!(TerrainCost.check(6), Ok(()));
    }
}
