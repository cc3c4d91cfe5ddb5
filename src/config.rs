use crate::chemotaxis::Chemotaxis;
use crate::field::Domain;
use crate::microbe::MicrobeParams;
use crate::motility::Motility;
use crate::utils::check_num;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Model parameters.
    pub model: ModelConfig,
    /// Simulation box and concentration field.
    pub domain: Domain,
    /// Initialization parameters.
    #[serde(default)]
    pub init: InitConfig,
    /// Output parameters.
    pub output: OutputConfig,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Dimensionality of space (1, 2 or 3).
    pub dim: usize,
    /// Integration timestep.
    pub timestep: f64,
    /// Number of microbes.
    pub n_microbes: usize,
    /// Kinetic parameters of every microbe.
    #[serde(default)]
    pub microbe: MicrobeParams,
    /// Motile pattern.
    pub motility: Motility,
    /// Chemotactic response (none by default).
    #[serde(default)]
    pub chemotaxis: Chemotaxis,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct InitConfig {
    /// Seed of the random streams, drawn from the OS if absent.
    pub seed: Option<u64>,
    /// Scatter microbes uniformly in the box instead of placing them at its center.
    #[serde(default = "default_random_positions")]
    pub random_positions: bool,
}

fn default_random_positions() -> bool {
    true
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            seed: None,
            random_positions: default_random_positions(),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Number of simulation steps per trajectory file.
    pub steps_per_file: usize,
    /// Number of simulation steps between saves.
    pub steps_per_save: usize,
    /// Largest lag (in saves) of the analysis observables.
    pub max_lag: usize,
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let model = &self.model;
        check_num(model.dim, 1..=3).context("invalid dimensionality")?;
        check_num(model.timestep, f64::MIN_POSITIVE..1e3).context("invalid timestep")?;
        check_num(model.n_microbes, 1..1_000_000).context("invalid number of microbes")?;
        model
            .microbe
            .validate()
            .context("invalid microbe parameters")?;
        model
            .motility
            .validate()
            .context("invalid motility parameters")?;
        model
            .chemotaxis
            .validate()
            .context("invalid chemotaxis parameters")?;

        self.domain
            .validate(model.dim)
            .context("invalid domain parameters")?;

        let output = &self.output;
        check_num(output.steps_per_save, 1..1_000_000).context("invalid number of steps per save")?;
        check_num(output.steps_per_file, 1..1_000_000_000)
            .context("invalid number of steps per file")?;
        if output.steps_per_file % output.steps_per_save != 0 {
            bail!("steps_per_file must be a multiple of steps_per_save");
        }
        check_num(output.max_lag, 1..100_000).context("invalid maximum lag")?;

        let travel = self.travel_per_save();
        if self.domain.periodic && travel >= 0.25 * self.domain.extent {
            log::warn!(
                "microbes travel about {travel} between saves in a box of extent {}, \
                 trajectories may not unfold correctly",
                self.domain.extent
            );
        }

        Ok(())
    }

    /// Typical distance swum between consecutive saves.
    ///
    /// Unfolding periodic trajectories needs this to stay well below half
    /// the box extent.
    pub fn travel_per_save(&self) -> f64 {
        self.output.steps_per_save as f64
            * self.model.timestep
            * self.model.motility.max_mean_speed()
    }

    /// Number of saves written per trajectory file.
    pub fn saves_per_file(&self) -> usize {
        self.output.steps_per_file / self.output.steps_per_save
    }
}
