use thiserror::Error;

use crate::common::Cell;

/// Errors raised by the search engines. Unreachable goals are not errors,
/// planners report them as an empty move sequence.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("grid size must be positive")]
    EmptyGrid,

    #[error("{role} {cell} is outside the {size}x{size} grid")]
    OutOfBounds {
        role: &'static str,
        cell: Cell,
        size: usize,
    },

    #[error("goal {0} is a wall")]
    GoalBlocked(Cell),

    #[error("edge-cost policy is sized for a {policy}x{policy} grid, terrain is {terrain}x{terrain}")]
    SizeMismatch { terrain: usize, policy: usize },

    #[error("risk lambda must be finite and non-negative, got {0}")]
    InvalidLambda(f64),

    #[error("risk-aware planning requires the current pursuer position")]
    MissingPursuer,
}
