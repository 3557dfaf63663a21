use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

impl Cell {
    pub const fn new(x: usize, y: usize) -> Self {
        Cell { x, y }
    }

    pub fn in_bounds(&self, size: usize) -> bool {
        self.x < size && self.y < size
    }

    // y * size + x
    pub fn index(&self, size: usize) -> usize {
        self.y * size + self.x
    }

    pub fn from_index(index: usize, size: usize) -> Self {
        Cell {
            x: index % size,
            y: index / size,
        }
    }

    pub fn offset(&self, mv: Move, size: usize) -> Option<Cell> {
        let x = self.x as isize + mv.dx as isize;
        let y = self.y as isize + mv.dy as isize;
        if x < 0 || y < 0 || x >= size as isize || y >= size as isize {
            return None;
        }
        Some(Cell::new(x as usize, y as usize))
    }

    pub fn offset_clamped(&self, mv: Move, size: usize) -> Cell {
        let clamp = |v: usize, d: i8| -> usize {
            (v as isize + d as isize).clamp(0, size as isize - 1) as usize
        };
        Cell::new(clamp(self.x, mv.dx), clamp(self.y, mv.dy))
    }

    pub fn move_to(&self, to: Cell) -> Move {
        Move::new(
            (to.x as isize - self.x as isize) as i8,
            (to.y as isize - self.y as isize) as i8,
        )
    }

    pub fn chebyshev(&self, other: Cell) -> usize {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    pub fn manhattan(&self, other: Cell) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl From<[usize; 2]> for Cell {
    fn from([x, y]: [usize; 2]) -> Self {
        Cell::new(x, y)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub dx: i8,
    pub dy: i8,
}

impl Move {
    pub const STAY: Move = Move::new(0, 0);

    pub const fn new(dx: i8, dy: i8) -> Self {
        Move { dx, dy }
    }
}

const AXIS_MOVES: [Move; 4] = [
    Move::new(1, 0),
    Move::new(-1, 0),
    Move::new(0, 1),
    Move::new(0, -1),
];

const KING_MOVES: [Move; 8] = [
    Move::new(-1, -1),
    Move::new(-1, 0),
    Move::new(-1, 1),
    Move::new(0, -1),
    Move::new(0, 1),
    Move::new(1, -1),
    Move::new(1, 0),
    Move::new(1, 1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Four,
    Eight,
}

impl Connectivity {
    pub fn moves(&self) -> &'static [Move] {
        match self {
            Connectivity::Four => &AXIS_MOVES,
            Connectivity::Eight => &KING_MOVES,
        }
    }

    // Admissible while every step costs at least 1.
    pub fn heuristic(&self) -> Heuristic {
        match self {
            Connectivity::Four => Heuristic::Manhattan,
            Connectivity::Eight => Heuristic::Chebyshev,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heuristic {
    Chebyshev,
    Manhattan,
}

impl Heuristic {
    pub fn distance(&self, a: Cell, b: Cell) -> f64 {
        match self {
            Heuristic::Chebyshev => a.chebyshev(b) as f64,
            Heuristic::Manhattan => a.manhattan(b) as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_index_round_trip_corners() {
        let size = 7;
        let cell = Cell::new(6, 3);
        assert_eq!(cell.index(size), 27);
        assert_eq!(Cell::from_index(27, size), cell);
    }

    #[test]
    fn test_offset_respects_bounds() {
        let corner = Cell::new(0, 0);
        assert_eq!(corner.offset(Move::new(-1, 0), 3), None);
        assert_eq!(corner.offset(Move::new(1, 1), 3), Some(Cell::new(1, 1)));
        assert_eq!(Cell::new(2, 2).offset(Move::new(0, 1), 3), None);
    }

    #[test]
    fn test_offset_clamped() {
        assert_eq!(Cell::new(0, 2).offset_clamped(Move::new(-1, 1), 3), Cell::new(0, 2));
        assert_eq!(Cell::new(1, 1).offset_clamped(Move::new(1, -1), 3), Cell::new(2, 0));
    }

    #[test]
    fn test_distances() {
        let a = Cell::new(1, 5);
        let b = Cell::new(4, 1);
        assert_eq!(a.chebyshev(b), 4);
        assert_eq!(a.manhattan(b), 7);
        assert_eq!(Connectivity::Eight.heuristic().distance(a, b), 4.0);
        assert_eq!(Connectivity::Four.heuristic().distance(a, b), 7.0);
    }

    #[test]
    fn test_move_sets() {
        assert_eq!(Connectivity::Four.moves().len(), 4);
        assert_eq!(Connectivity::Eight.moves().len(), 8);
        assert!(!Connectivity::Eight.moves().contains(&Move::STAY));
        assert!(Connectivity::Four
            .moves()
            .iter()
            .all(|m| m.dx.abs() + m.dy.abs() == 1));
    }

    #[test]
    fn test_move_to() {
        let from = Cell::new(3, 3);
        assert_eq!(from.move_to(Cell::new(2, 4)), Move::new(-1, 1));
        assert_eq!(from.offset(from.move_to(Cell::new(4, 3)), 5), Some(Cell::new(4, 3)));
    }
}
