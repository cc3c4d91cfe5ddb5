use crate::config::Config;
use crate::model::Snapshot;
use crate::qoi::{self, Frame};
use crate::stats::Accumulator;
use crate::utils::norm;
use anyhow::{Context, Result, bail};
use rmp_serde::decode;
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

pub trait Obs {
    fn update(&mut self, snapshot: &Snapshot) -> Result<()>;
    fn report(&self) -> serde_json::Value;
}

/// Lags, in simulation time, of the lagged observables.
fn lag_times(n_lags: usize, save_interval: f64) -> Vec<f64> {
    (0..n_lags).map(|lag| lag as f64 * save_interval).collect()
}

/// Mean-squared displacement, from the origin and time-averaged.
pub struct Msd {
    frames: Vec<Frame>,
    extent: Option<f64>,
    max_lag: usize,
    save_interval: f64,
}

impl Msd {
    pub fn new(cfg: &Config) -> Self {
        Self {
            frames: Vec::new(),
            extent: cfg.domain.periodic.then_some(cfg.domain.extent),
            max_lag: cfg.output.max_lag,
            save_interval: save_interval(cfg),
        }
    }
}

impl Obs for Msd {
    fn update(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.frames.push(snapshot.positions());
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        let frames = match self.extent {
            Some(extent) => qoi::unfold(&self.frames, extent),
            None => self.frames.clone(),
        };
        let msd = qoi::msd(&frames);
        let windowed_msd = qoi::windowed_msd(&frames, self.max_lag);
        serde_json::json!({
            "msd": {
                "time": lag_times(msd.len(), self.save_interval),
                "value": msd,
            },
            "windowed_msd": {
                "time": lag_times(windowed_msd.len(), self.save_interval),
                "value": windowed_msd,
            },
        })
    }
}

/// Normalized velocity autocorrelation.
pub struct VelAutocorr {
    frames: Vec<Frame>,
    max_lag: usize,
    save_interval: f64,
}

impl VelAutocorr {
    pub fn new(cfg: &Config) -> Self {
        Self {
            frames: Vec::new(),
            max_lag: cfg.output.max_lag,
            save_interval: save_interval(cfg),
        }
    }
}

impl Obs for VelAutocorr {
    fn update(&mut self, snapshot: &Snapshot) -> Result<()> {
        self.frames.push(snapshot.velocities());
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        let acf = qoi::autocorrelation(&self.frames, self.max_lag);
        serde_json::json!({
            "autocorrelation": {
                "time": lag_times(acf.len(), self.save_interval),
                "value": acf,
            }
        })
    }
}

/// Distribution of instantaneous swimming speeds.
pub struct Speed {
    acc: Accumulator,
}

impl Speed {
    pub fn new() -> Self {
        Self {
            acc: Accumulator::new(),
        }
    }
}

impl Obs for Speed {
    fn update(&mut self, snapshot: &Snapshot) -> Result<()> {
        for mcb in &snapshot.microbes {
            self.acc.add(norm(mcb.vel.view()));
        }
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({ "speed": self.acc.report() })
    }
}

/// Measured reorientation rate per microbe.
pub struct TurnRate {
    first: Option<(u64, f64)>,
    last: Option<(u64, f64)>,
    n_microbes: usize,
}

impl TurnRate {
    pub fn new(cfg: &Config) -> Self {
        Self {
            first: None,
            last: None,
            n_microbes: cfg.model.n_microbes,
        }
    }
}

impl Obs for TurnRate {
    fn update(&mut self, snapshot: &Snapshot) -> Result<()> {
        let point = (snapshot.n_reorientations, snapshot.time);
        if let Some((n_prev, time_prev)) = self.last {
            if point.0 < n_prev || point.1 <= time_prev {
                bail!("snapshots are not in chronological order");
            }
        }
        self.first.get_or_insert(point);
        self.last = Some(point);
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        let rate = match (self.first, self.last) {
            (Some((n_0, t_0)), Some((n_1, t_1))) if t_1 > t_0 => {
                (n_1 - n_0) as f64 / (self.n_microbes as f64 * (t_1 - t_0))
            }
            _ => f64::NAN,
        };
        serde_json::json!({ "turn_rate": rate })
    }
}

fn save_interval(cfg: &Config) -> f64 {
    cfg.output.steps_per_save as f64 * cfg.model.timestep
}

pub struct Analyzer {
    cfg: Config,
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new(cfg: Config) -> Self {
        let obs_ptr_vec: Vec<Box<dyn Obs>> = vec![
            Box::new(Msd::new(&cfg)),
            Box::new(VelAutocorr::new(&cfg)),
            Box::new(Speed::new()),
            Box::new(TurnRate::new(&cfg)),
        ];
        Self { cfg, obs_ptr_vec }
    }

    pub fn add_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        for obs in &mut self.obs_ptr_vec {
            obs.update(snapshot).context("failed to update observable")?;
        }
        Ok(())
    }

    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        for _ in 0..self.cfg.saves_per_file() {
            let snapshot: Snapshot =
                decode::from_read(&mut reader).context("failed to read snapshot")?;
            self.add_snapshot(&snapshot)?;
        }
        Ok(())
    }

    pub fn reports(&self) -> Vec<serde_json::Value> {
        self.obs_ptr_vec.iter().map(|obs| obs.report()).collect()
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, &self.reports())
            .context("failed to serialize results")?;
        Ok(())
    }
}
