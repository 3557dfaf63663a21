use pursuit_evasion::algorithm::{
    EdgeCost, IncrementalReplanner, ResetSearch, RiskAwareCost, TerrainCost,
};
use pursuit_evasion::config::{Cli, Config, EvaderPolicy, Mode};
use pursuit_evasion::experiment::{load_maps, run_batch, write_records, write_summary};
use pursuit_evasion::generator::{generate_map, save_map};
use pursuit_evasion::map::CostField;
use pursuit_evasion::simulation::{Environment, Outcome, Simulation};
use pursuit_evasion::stat::{print_summary, summarize};

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let cli = Cli::parse();

    let config = if let Some(config_file) = cli.config.as_ref() {
        let config_str = std::fs::read_to_string(config_file)
            .with_context(|| format!("failed to read config file: {config_file}"))?;
        Config::from_yaml_str(&config_str)
            .with_context(|| format!("error with config file: {config_file}"))?
    } else {
        info!("No config file specified, using default config");
        Config::default()
    }
    .override_from_command_line(&cli)?;

    match config.mode {
        Mode::Simulate => simulate(&config),
        Mode::Experiment => experiment(config),
        Mode::Generate => generate(&config),
    }
}

fn simulate(config: &Config) -> anyhow::Result<()> {
    let terrain = match &config.map_path {
        Some(map_path) => CostField::from_file(map_path, config.grid_size)?,
        None => CostField::open(config.grid_size),
    };

    match config.evader {
        EvaderPolicy::Vanilla => simulate_with(config, terrain, TerrainCost),
        EvaderPolicy::RiskAware => {
            let policy = RiskAwareCost::new(config.grid_size, config.risk_params());
            simulate_with(config, terrain, policy)
        }
    }
}

fn simulate_with<C: EdgeCost>(config: &Config, terrain: CostField, policy: C) -> anyhow::Result<()> {
    let env = Environment::new(
        config.grid_size,
        config.max_steps,
        config.capture_radius,
        config.evader_start(),
        config.evader_goal(),
        config.pursuer_start(),
    );
    let evader = IncrementalReplanner::new(
        &terrain,
        env.evader_pos,
        env.evader_goal,
        config.connectivity,
        policy,
    )?;
    let pursuer = ResetSearch::new(config.connectivity, config.pursuer_target);

    let mut simulation = Simulation::new(terrain, env, evader, pursuer);
    while !simulation.environment().is_done() {
        let env = simulation.environment();
        info!(
            "Step {}: Evader at {}, Pursuer at {}",
            env.step_count, env.evader_pos, env.pursuer_pos
        );
        simulation.tick()?;
    }

    let summary = simulation.summary();
    info!(
        "Steps: {} | Caught: {} | Reached Goal: {} | Path cost: {}",
        summary.steps,
        summary.outcome == Outcome::Captured,
        summary.outcome == Outcome::GoalReached,
        summary.path_cost
    );
    simulation.evader().stats().print("evader");
    simulation.pursuer().stats().print("pursuer");
    Ok(())
}

fn experiment(config: Config) -> anyhow::Result<()> {
    let maps = load_maps(&config.map_dir, config.grid_size)?;
    info!(
        "running {} trials on {} workers",
        maps.len() * config.lambdas.len() * config.radii.len(),
        config.workers
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .max_blocking_threads(config.workers)
        .enable_all()
        .build()?;
    let config = Arc::new(config);
    let records = runtime.block_on(run_batch(config.clone(), maps))?;

    write_records(&config.output_path, &records)?;
    let summary = summarize(&records);
    print_summary(&summary);
    if let Some(summary_path) = &config.summary_path {
        write_summary(summary_path, &summary)?;
    }
    Ok(())
}

fn generate(config: &Config) -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let keep_free = [
        config.evader_start(),
        config.evader_goal(),
        config.pursuer_start(),
    ];
    let rows = generate_map(config.grid_size, &config.generator, &keep_free, &mut rng);
    save_map(&config.output_path, &rows)
}
