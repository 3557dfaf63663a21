use anyhow::{anyhow, Context};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::algorithm::PursuerTarget;
use crate::common::{Cell, Connectivity};
use crate::generator::GeneratorParams;
use crate::risk::{RiskParams, RiskScaling};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Run a single pursuit and log every step.
    Simulate,
    /// Run every map x lambda x radius combination and write the result table.
    Experiment,
    /// Write a random terrain file.
    Generate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum EvaderPolicy {
    /// Terrain cost only.
    Vanilla,
    /// Terrain cost plus the pursuer's risk field.
    RiskAware,
}

#[derive(Parser, Debug)]
#[command(
    name = "Pursuit Evasion",
    about = "Risk-aware D* Lite evader against an A* pursuer on a weighted grid.",
    version = "1.0"
)]
pub struct Cli {
    #[arg(long, help = "Path to a YAML config file")]
    pub config: Option<String>,

    #[arg(long, value_enum, help = "What to run")]
    pub mode: Option<Mode>,

    #[arg(long, help = "Dimension N for an NxN grid")]
    pub grid_size: Option<usize>,

    #[arg(long, help = "Maximum number of time steps before timeout")]
    pub max_steps: Option<usize>,

    #[arg(long, help = "Seed for the random number generator")]
    pub seed: Option<u64>,

    #[arg(long, help = "Terrain CSV for a single simulation; open grid if absent")]
    pub map_path: Option<String>,

    #[arg(long, help = "Directory of terrain CSV files for experiments")]
    pub map_dir: Option<String>,

    #[arg(long, help = "Path to the output file")]
    pub output_path: Option<String>,

    #[arg(long, help = "Path to the aggregated experiment summary (JSON)")]
    pub summary_path: Option<String>,

    #[arg(long, value_enum, help = "Grid connectivity")]
    pub connectivity: Option<Connectivity>,

    #[arg(long, value_enum, help = "Evader edge-cost policy")]
    pub evader: Option<EvaderPolicy>,

    #[arg(long, help = "Risk scale lambda")]
    pub risk_lambda: Option<f64>,

    #[arg(long, help = "Risk radius r (Chebyshev cells)")]
    pub risk_radius: Option<usize>,

    #[arg(long, value_enum, help = "Risk penalty scaling")]
    pub risk_scaling: Option<RiskScaling>,

    #[arg(long, help = "Capture distance (Chebyshev), 0 for same cell")]
    pub capture_radius: Option<usize>,

    #[arg(long, help = "Pursuer aims this many steps ahead of the evader; 0 chases directly")]
    pub intercept_lookahead: Option<usize>,

    #[arg(long, help = "Lambdas swept by experiments", use_value_delimiter = true)]
    pub lambdas: Option<Vec<f64>>,

    #[arg(long, help = "Risk radii swept by experiments", use_value_delimiter = true)]
    pub radii: Option<Vec<usize>>,

    #[arg(long, help = "Parallel experiment trials")]
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: Mode,
    pub grid_size: usize,
    pub max_steps: usize,
    pub seed: u64,
    pub map_path: Option<String>,
    pub map_dir: String,
    pub output_path: String,
    pub summary_path: Option<String>,
    pub connectivity: Connectivity,
    pub evader: EvaderPolicy,
    pub risk_lambda: f64,
    pub risk_radius: usize,
    pub risk_scaling: RiskScaling,
    pub capture_radius: usize,
    pub pursuer_target: PursuerTarget,
    pub evader_start: Option<[usize; 2]>,
    pub evader_goal: Option<[usize; 2]>,
    pub pursuer_start: Option<[usize; 2]>,
    pub lambdas: Vec<f64>,
    pub radii: Vec<usize>,
    pub workers: usize,
    pub generator: GeneratorParams,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mode: Mode::Simulate,
            grid_size: 64,
            max_steps: 500,
            seed: 0,
            map_path: None,
            map_dir: "setup".to_string(),
            output_path: "result/experiment_results.csv".to_string(),
            summary_path: Some("result/summary.json".to_string()),
            connectivity: Connectivity::Eight,
            evader: EvaderPolicy::RiskAware,
            risk_lambda: 1.0,
            risk_radius: 4,
            risk_scaling: RiskScaling::Distance,
            capture_radius: 0,
            pursuer_target: PursuerTarget::Direct,
            evader_start: None,
            evader_goal: None,
            pursuer_start: None,
            lambdas: vec![1.0, 2.0, 3.0],
            radii: (2..=12).collect(),
            workers: 4,
            generator: GeneratorParams::default(),
        }
    }
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_str(yaml).context("failed to parse config")?;
        Ok(config)
    }

    pub fn override_from_command_line(mut self, cli: &Cli) -> anyhow::Result<Self> {
        if let Some(mode) = cli.mode {
            self.mode = mode;
        }
        if let Some(grid_size) = cli.grid_size {
            self.grid_size = grid_size;
        }
        if let Some(max_steps) = cli.max_steps {
            self.max_steps = max_steps;
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        if let Some(map_path) = &cli.map_path {
            self.map_path = Some(map_path.clone());
        }
        if let Some(map_dir) = &cli.map_dir {
            self.map_dir = map_dir.clone();
        }
        if let Some(output_path) = &cli.output_path {
            self.output_path = output_path.clone();
        }
        if let Some(summary_path) = &cli.summary_path {
            self.summary_path = Some(summary_path.clone());
        }
        if let Some(connectivity) = cli.connectivity {
            self.connectivity = connectivity;
        }
        if let Some(evader) = cli.evader {
            self.evader = evader;
        }
        if let Some(risk_lambda) = cli.risk_lambda {
            self.risk_lambda = risk_lambda;
        }
        if let Some(risk_radius) = cli.risk_radius {
            self.risk_radius = risk_radius;
        }
        if let Some(risk_scaling) = cli.risk_scaling {
            self.risk_scaling = risk_scaling;
        }
        if let Some(capture_radius) = cli.capture_radius {
            self.capture_radius = capture_radius;
        }
        if let Some(lookahead) = cli.intercept_lookahead {
            self.pursuer_target = match lookahead {
                0 => PursuerTarget::Direct,
                lookahead => PursuerTarget::Intercept { lookahead },
            };
        }
        if let Some(lambdas) = &cli.lambdas {
            self.lambdas = lambdas.clone();
        }
        if let Some(radii) = &cli.radii {
            self.radii = radii.clone();
        }
        if let Some(workers) = cli.workers {
            self.workers = workers;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.grid_size == 0 {
            return Err(anyhow!("Grid size must be positive"));
        }
        if self.max_steps == 0 {
            return Err(anyhow!("Max steps must be positive"));
        }
        if self.workers == 0 {
            return Err(anyhow!("Worker count must be positive"));
        }
        if !valid_lambda(self.risk_lambda) {
            return Err(anyhow!(
                "Risk lambda must be finite and non-negative, got {}",
                self.risk_lambda
            ));
        }
        if let Some(lambda) = self.lambdas.iter().find(|lambda| !valid_lambda(**lambda)) {
            return Err(anyhow!(
                "Experiment lambdas must be finite and non-negative, got {lambda}"
            ));
        }
        if self.mode == Mode::Experiment && (self.lambdas.is_empty() || self.radii.is_empty()) {
            return Err(anyhow!("Experiments need at least one lambda and one radius"));
        }

        for (role, cell) in [
            ("evader start", self.evader_start()),
            ("evader goal", self.evader_goal()),
            ("pursuer start", self.pursuer_start()),
        ] {
            if !cell.in_bounds(self.grid_size) {
                return Err(anyhow!(
                    "{role} {cell} lies outside the {0}x{0} grid",
                    self.grid_size
                ));
            }
        }

        self.generator.validate()
    }

    pub fn evader_start(&self) -> Cell {
        self.evader_start.map_or(Cell::new(0, 0), Cell::from)
    }

    pub fn evader_goal(&self) -> Cell {
        let last = self.grid_size.saturating_sub(1);
        self.evader_goal.map_or(Cell::new(last, last), Cell::from)
    }

    pub fn pursuer_start(&self) -> Cell {
        let last = self.grid_size.saturating_sub(1);
        self.pursuer_start.map_or(Cell::new(last, 0), Cell::from)
    }

    pub fn risk_params(&self) -> RiskParams {
        self.risk_params_with(self.risk_lambda, self.risk_radius)
    }

    pub fn risk_params_with(&self, lambda: f64, radius: usize) -> RiskParams {
        RiskParams {
            lambda,
            radius,
            scaling: self.risk_scaling,
        }
    }
}

fn valid_lambda(lambda: f64) -> bool {
    lambda.is_finite() && lambda >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.evader_start(), Cell::new(0, 0));
        assert_eq!(config.evader_goal(), Cell::new(63, 63));
        assert_eq!(config.pursuer_start(), Cell::new(63, 0));
        assert_eq!(config.radii.len(), 11);
    }

    #[test]
    fn test_from_yaml_str() {
        let yaml = r#"
mode: experiment
grid_size: 16
connectivity: four
risk_scaling: constant
pursuer_target:
  mode: intercept
  lookahead: 2
pursuer_start: [0, 15]
lambdas: [0.5, 1.5]
generator:
  wall_prob: 0.15
  hill_prob: 0.15
  hill_max: 5
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.mode, Mode::Experiment);
        assert_eq!(config.grid_size, 16);
        assert_eq!(config.connectivity, Connectivity::Four);
        assert_eq!(config.risk_scaling, RiskScaling::Constant);
        assert_eq!(config.pursuer_target, PursuerTarget::Intercept { lookahead: 2 });
        assert_eq!(config.pursuer_start(), Cell::new(0, 15));
        assert_eq!(config.evader_goal(), Cell::new(15, 15));
        assert_eq!(config.lambdas, vec![0.5, 1.5]);
        assert_eq!(config.max_steps, 500);
        config.validate().unwrap();
    }

    #[test]
    fn test_command_line_overrides() {
        let cli = Cli::parse_from([
            "pursuit_evasion",
            "--grid-size",
            "8",
            "--intercept-lookahead",
            "3",
            "--radii",
            "2,3",
            "--evader",
            "vanilla",
        ]);
        let config = Config::default().override_from_command_line(&cli).unwrap();
        assert_eq!(config.grid_size, 8);
        assert_eq!(config.pursuer_target, PursuerTarget::Intercept { lookahead: 3 });
        assert_eq!(config.radii, vec![2, 3]);
        assert_eq!(config.evader, EvaderPolicy::Vanilla);
        assert_eq!(config.pursuer_start(), Cell::new(7, 0));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            evader_goal: Some([64, 0]),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            risk_lambda: -1.0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            risk_lambda: f64::INFINITY,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            lambdas: vec![1.0, f64::INFINITY],
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let cli = Cli::parse_from(["pursuit_evasion", "--risk-lambda", "inf"]);
        assert!(Config::default().override_from_command_line(&cli).is_err());

        let config = Config {
            mode: Mode::Experiment,
            radii: Vec::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
