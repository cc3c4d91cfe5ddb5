use crate::config::Config;
use crate::error::ModelError;
use crate::microbe::Microbe;
use crate::model::{Snapshot, State};
use crate::step::microbe_step;
use anyhow::{Context, Result};
use ndarray::Array1;
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rayon::prelude::*;
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Simulation engine.
///
/// Holds the configuration, current state, and one random number generator
/// per microbe, and provides methods to initialize, run, save, and load
/// simulations.
#[derive(Serialize, Deserialize)]
pub struct Engine {
    cfg: Config,
    seed: u64,
    state: State,
    rng_vec: Vec<ChaCha12Rng>,
}

/// Random stream `stream` of the generator seeded with `seed`.
///
/// Stream 0 draws the initial condition and stream `id + 1` belongs to
/// microbe `id`, so results do not depend on the order microbes are stepped in.
fn stream_rng(seed: u64, stream: u64) -> ChaCha12Rng {
    let mut rng = ChaCha12Rng::seed_from_u64(seed);
    rng.set_stream(stream);
    rng
}

impl Engine {
    /// Create a new `Engine` with the given configuration and a random initial state.
    pub fn generate_initial_condition(cfg: Config) -> Result<Self> {
        let seed = cfg.init.seed.unwrap_or_else(rand::random);
        log::info!("seed = {seed}");

        let model = &cfg.model;
        let mut rng = stream_rng(seed, 0);

        let mut microbes = Vec::with_capacity(model.n_microbes);
        let mut rng_vec = Vec::with_capacity(model.n_microbes);
        for id in 0..model.n_microbes {
            let pos = if cfg.init.random_positions {
                Array1::from_shape_fn(model.dim, |_| rng.random_range(0.0..cfg.domain.extent))
            } else {
                cfg.domain.center(model.dim)
            };
            let mcb = Microbe::new(
                id,
                pos,
                &model.microbe,
                &model.motility,
                &model.chemotaxis,
                &mut rng,
            )
            .with_context(|| format!("failed to create microbe {id}"))?;
            microbes.push(mcb);
            rng_vec.push(stream_rng(seed, id as u64 + 1));
        }
        log::debug!("created {} microbes in {}D", microbes.len(), model.dim);

        let state = State {
            step: 0,
            n_reorientations: 0,
            microbes,
        };

        Ok(Self {
            cfg,
            seed,
            state,
            rng_vec,
        })
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.state, self.cfg.model.timestep)
    }

    /// Perform the simulation and save the resulting snapshots to a binary file.
    ///
    /// A snapshot is written at the start of every save interval, so the
    /// final state of one file is the first snapshot of the next.
    pub fn perform_simulation<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let saves_per_file = self.cfg.saves_per_file();
        for i_save in 0..saves_per_file {
            encode::write_named(&mut writer, &self.snapshot())
                .context("failed to serialize snapshot")?;

            for _ in 0..self.cfg.output.steps_per_save {
                self.perform_step().context("failed to perform step")?;
            }

            let progress = 100.0 * (i_save + 1) as f64 / saves_per_file as f64;
            log::info!("completed {progress:06.2}%");
        }

        writer.flush().context("failed to flush writer stream")?;

        Ok(())
    }

    /// Save a checkpoint of the entire engine state.
    ///
    /// Can be used to resume the simulation later.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write_named(&mut writer, &self).context("failed to serialize engine")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }

    /// Load a previously saved engine checkpoint.
    pub fn load_checkpoint<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let engine = decode::from_read(&mut reader).context("failed to deserialize engine")?;
        Ok(engine)
    }

    /// Advance every microbe by one timestep.
    pub fn perform_step(&mut self) -> Result<()> {
        let model = &self.cfg.model;
        let domain = &self.cfg.domain;
        let step = self.state.step;
        let microbes = &mut self.state.microbes;

        // Every microbe senses the field before any of them moves.
        let conc_vec: Vec<Option<f64>> = if model.chemotaxis.is_active() {
            microbes
                .iter()
                .map(|mcb| Some(domain.field.sample(mcb.pos())))
                .collect()
        } else {
            vec![None; microbes.len()]
        };

        let reoriented = microbes
            .par_iter_mut()
            .zip(self.rng_vec.par_iter_mut())
            .zip(conc_vec.par_iter())
            .map(|((mcb, rng), &conc)| -> Result<bool, ModelError> {
                let reoriented = microbe_step(
                    mcb,
                    &model.motility,
                    &model.chemotaxis,
                    conc,
                    model.timestep,
                    rng,
                )?;
                domain.wrap(&mut mcb.pos);
                Ok(reoriented)
            })
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("failed to step microbes at step {step}"))?;

        self.state.n_reorientations += reoriented.iter().filter(|&&r| r).count() as u64;
        self.state.step += 1;

        Ok(())
    }
}
