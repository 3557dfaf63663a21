use std::fs::{self, File};
use std::path::Path;

use anyhow::{bail, Context};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::common::Cell;
use crate::map::WALL;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneratorParams {
    pub wall_prob: f64,
    pub hill_prob: f64,
    // Hills are uniform in `[2, hill_max]`.
    pub hill_max: u32,
}

impl Default for GeneratorParams {
    fn default() -> Self {
        GeneratorParams {
            wall_prob: 0.1,
            hill_prob: 0.15,
            hill_max: 5,
        }
    }
}

impl GeneratorParams {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.wall_prob) || !(0.0..=1.0).contains(&self.hill_prob) {
            bail!(
                "wall and hill probabilities must lie in [0, 1], got {} and {}",
                self.wall_prob,
                self.hill_prob
            );
        }
        if self.wall_prob + self.hill_prob > 1.0 {
            bail!(
                "wall_prob + hill_prob must not exceed 1, got {}",
                self.wall_prob + self.hill_prob
            );
        }
        if self.hill_max < 2 {
            bail!("hill_max must be at least 2, got {}", self.hill_max);
        }
        Ok(())
    }
}

pub fn generate_map<R: Rng + ?Sized>(
    size: usize,
    params: &GeneratorParams,
    keep_free: &[Cell],
    rng: &mut R,
) -> Vec<Vec<u32>> {
    let mut rows: Vec<Vec<u32>> = (0..size)
        .map(|_| {
            (0..size)
                .map(|_| {
                    let roll: f64 = rng.gen();
                    if roll < params.wall_prob {
                        WALL
                    } else if roll < params.wall_prob + params.hill_prob {
                        rng.gen_range(2..=params.hill_max)
                    } else {
                        1
                    }
                })
                .collect()
        })
        .collect();

    for cell in keep_free.iter().filter(|cell| cell.in_bounds(size)) {
        rows[cell.y][cell.x] = 1;
    }
    rows
}

pub fn save_map<P: AsRef<Path>>(path: P, rows: &[Vec<u32>]) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!("wrote {0}x{0} terrain to {1}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::CostField;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generate_respects_params() {
        let mut rng = StdRng::seed_from_u64(9);
        let params = GeneratorParams {
            wall_prob: 0.2,
            hill_prob: 0.3,
            hill_max: 4,
        };
        let keep = [Cell::new(0, 0), Cell::new(15, 15), Cell::new(15, 0)];
        let rows = generate_map(16, &params, &keep, &mut rng);

        assert_eq!(rows.len(), 16);
        assert!(rows.iter().all(|row| row.len() == 16));
        assert!(rows.iter().flatten().all(|&value| value <= 4));
        assert!(rows.iter().flatten().any(|&value| value == WALL));
        for cell in keep {
            assert_eq!(rows[cell.y][cell.x], 1);
        }
    }

    #[test]
    fn test_generate_is_reproducible() {
        let params = GeneratorParams::default();
        let a = generate_map(8, &params, &[], &mut StdRng::seed_from_u64(1));
        let b = generate_map(8, &params, &[], &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_save_and_load() {
        let mut rng = StdRng::seed_from_u64(2);
        let rows = generate_map(6, &GeneratorParams::default(), &[], &mut rng);
        let path = std::env::temp_dir().join("pursuit_evasion_generator_test.csv");
        save_map(&path, &rows).unwrap();

        let loaded = CostField::from_file(&path, 6).unwrap();
        assert_eq!(loaded, CostField::from_rows(&rows).unwrap());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_validate() {
        assert!(GeneratorParams::default().validate().is_ok());
        let bad = GeneratorParams {
            wall_prob: 0.7,
            hill_prob: 0.5,
            hill_max: 5,
        };
        assert!(bad.validate().is_err());
        let bad = GeneratorParams {
            hill_max: 1,
            ..GeneratorParams::default()
        };
        assert!(bad.validate().is_err());
    }
}
