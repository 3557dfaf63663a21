use std::path::Path;

use anyhow::{anyhow, bail, Context};
use tracing::{debug, info};

use crate::common::{Cell, Connectivity, Move};

pub const WALL: u32 = 0;

#[derive(Debug, Clone, PartialEq)]
pub struct CostField {
    size: usize,
    costs: Vec<f64>,
}

impl CostField {
    pub fn open(size: usize) -> Self {
        CostField {
            size,
            costs: vec![1.0; size * size],
        }
    }

    pub fn from_rows(rows: &[Vec<u32>]) -> anyhow::Result<Self> {
        let size = rows.len();
        if size == 0 {
            bail!("terrain table is empty");
        }

        let mut costs = Vec::with_capacity(size * size);
        for (y, row) in rows.iter().enumerate() {
            if row.len() != size {
                bail!(
                    "terrain must be square: row {y} has {} columns, expected {size}",
                    row.len()
                );
            }
            costs.extend(row.iter().map(|&value| terrain_cost(value)));
        }

        Ok(CostField { size, costs })
    }

    pub fn from_file<P: AsRef<Path>>(path: P, expected_size: usize) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("failed to open terrain file {}", path.display()))?;

        let mut rows = Vec::new();
        for (y, record) in reader.records().enumerate() {
            let record =
                record.with_context(|| format!("bad record {y} in {}", path.display()))?;
            let row = record
                .iter()
                .enumerate()
                .map(|(x, field)| {
                    field.parse::<u32>().map_err(|err| {
                        anyhow!("cell ({x}, {y}) in {}: {field:?}: {err}", path.display())
                    })
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            rows.push(row);
        }

        let field = Self::from_rows(&rows)
            .with_context(|| format!("invalid terrain in {}", path.display()))?;
        if field.size != expected_size {
            bail!(
                "terrain {} is {size}x{size}, expected {expected_size}x{expected_size}",
                path.display(),
                size = field.size
            );
        }

        info!(
            "loaded terrain {} ({} walls)",
            path.display(),
            field.costs.iter().filter(|c| c.is_infinite()).count()
        );
        Ok(field)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.in_bounds(self.size)
    }

    // Out-of-grid cells behave as walls.
    pub fn get_cost(&self, cell: Cell) -> f64 {
        if !self.contains(cell) {
            return f64::INFINITY;
        }
        self.costs[cell.index(self.size)]
    }

    pub fn is_blocked(&self, cell: Cell) -> bool {
        self.get_cost(cell).is_infinite()
    }

    // Finite costs below 1 are raised to 1. Planners reading this field must be
    // told about `cell` before their next plan.
    pub fn set_cost(&mut self, cell: Cell, cost: f64) -> anyhow::Result<f64> {
        if !self.contains(cell) {
            bail!("cell {cell} is outside the {0}x{0} grid", self.size);
        }
        if cost.is_nan() {
            bail!("cost for {cell} is NaN");
        }
        let cost = cost.max(1.0);
        debug!("set cost {cell} = {cost}");
        self.costs[cell.index(self.size)] = cost;
        Ok(cost)
    }

    pub fn neighbors(
        &self,
        cell: Cell,
        connectivity: Connectivity,
    ) -> impl Iterator<Item = Cell> + 'static {
        let size = self.size;
        connectivity
            .moves()
            .iter()
            .filter_map(move |&mv| cell.offset(mv, size))
    }

    pub fn path_cost(&self, start: Cell, moves: &[Move]) -> f64 {
        let mut current = start;
        let mut total = 0.0;
        for &mv in moves {
            current = current.offset_clamped(mv, self.size);
            total += self.get_cost(current);
        }
        total
    }
}

fn terrain_cost(value: u32) -> f64 {
    match value {
        WALL => f64::INFINITY,
        cost => cost as f64,
    }
}
