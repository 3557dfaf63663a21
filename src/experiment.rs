use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, instrument};

use crate::algorithm::{IncrementalReplanner, ResetSearch, RiskAwareCost};
use crate::config::Config;
use crate::map::CostField;
use crate::simulation::{Environment, Outcome, Simulation};
use crate::stat::SummaryRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub map: String,
    pub lambda: f64,
    pub r: usize,
    pub steps: usize,
    pub caught: bool,
    pub reached: bool,
    pub path_cost: f64,
    // Seconds per evader planning call.
    pub avg_plan_time: f64,
}

pub fn load_maps<P: AsRef<Path>>(
    dir: P,
    size: usize,
) -> anyhow::Result<Vec<(String, Arc<CostField>)>> {
    let dir = dir.as_ref();
    let mut paths = fs::read_dir(dir)
        .with_context(|| format!("failed to read map directory {}", dir.display()))?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()?;
    paths.retain(|path| path.extension().is_some_and(|ext| ext == "csv"));
    paths.sort();

    if paths.is_empty() {
        return Err(anyhow!("no terrain files in {}", dir.display()));
    }

    paths
        .into_iter()
        .map(|path| {
            let terrain = CostField::from_file(&path, size)?;
            Ok((path.display().to_string(), Arc::new(terrain)))
        })
        .collect()
}

#[instrument(skip_all, name = "trial", fields(map = map, lambda = lambda, r = radius), level = "debug")]
pub fn run_trial(
    map: &str,
    terrain: &CostField,
    config: &Config,
    lambda: f64,
    radius: usize,
) -> anyhow::Result<TrialRecord> {
    let env = Environment::new(
        terrain.size(),
        config.max_steps,
        config.capture_radius,
        config.evader_start(),
        config.evader_goal(),
        config.pursuer_start(),
    );
    let policy = RiskAwareCost::new(terrain.size(), config.risk_params_with(lambda, radius));
    let evader = IncrementalReplanner::new(
        terrain,
        env.evader_pos,
        env.evader_goal,
        config.connectivity,
        policy,
    )?;
    let pursuer = ResetSearch::new(config.connectivity, config.pursuer_target);

    let mut simulation = Simulation::new(terrain.clone(), env, evader, pursuer);
    let outcome = simulation.run()?;

    Ok(TrialRecord {
        map: map.to_string(),
        lambda,
        r: radius,
        steps: outcome.steps,
        caught: outcome.outcome == Outcome::Captured,
        reached: outcome.outcome == Outcome::GoalReached,
        path_cost: outcome.path_cost,
        avg_plan_time: outcome.avg_plan_time,
    })
}

// Failed trials are logged and left out.
pub async fn run_batch(
    config: Arc<Config>,
    maps: Vec<(String, Arc<CostField>)>,
) -> anyhow::Result<Vec<TrialRecord>> {
    let permits = Arc::new(Semaphore::new(config.workers));
    let mut trials = JoinSet::new();
    let mut index = 0;

    for (map, terrain) in &maps {
        for &lambda in &config.lambdas {
            for &radius in &config.radii {
                let permit = permits.clone().acquire_owned().await?;
                let config = config.clone();
                let map = map.clone();
                let terrain = terrain.clone();
                let trial_index = index;
                index += 1;

                trials.spawn_blocking(move || {
                    let _permit = permit;
                    let result = run_trial(&map, &terrain, &config, lambda, radius)
                        .with_context(|| format!("trial {map} lambda {lambda} r {radius}"));
                    (trial_index, result)
                });
            }
        }
    }

    let mut records = Vec::with_capacity(index);
    while let Some(joined) = trials.join_next().await {
        let (trial_index, result) = joined.context("trial worker panicked")?;
        match result {
            Ok(record) => {
                info!(
                    "{} lambda {} r {}: steps {} caught {} reached {}",
                    record.map, record.lambda, record.r, record.steps, record.caught, record.reached
                );
                records.push((trial_index, record));
            }
            Err(err) => error!("{err:#}"),
        }
    }

    records.sort_by_key(|(trial_index, _)| *trial_index);
    Ok(records.into_iter().map(|(_, record)| record).collect())
}

fn create_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

pub fn write_records<P: AsRef<Path>>(path: P, records: &[TrialRecord]) -> anyhow::Result<()> {
    let path = path.as_ref();
    create_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    info!("wrote {} trial records to {}", records.len(), path.display());
    Ok(())
}

pub fn read_records<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<TrialRecord>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let records = reader
        .deserialize()
        .collect::<Result<Vec<TrialRecord>, _>>()
        .with_context(|| format!("bad trial record in {}", path.display()))?;
    Ok(records)
}

pub fn write_summary<P: AsRef<Path>>(path: P, rows: &[SummaryRow]) -> anyhow::Result<()> {
    let path = path.as_ref();
    create_parent_dir(path)?;
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, rows)?;
    info!("wrote summary of {} settings to {}", rows.len(), path.display());
    Ok(())
}
