//! Simulation data types.

use crate::microbe::Microbe;
use crate::motility::MotilityState;
use crate::qoi::Frame;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// State of the simulation at a given step.
///
/// Contains the step counter and all microbes, stored contiguously and
/// indexed by id.
#[derive(Clone, Serialize, Deserialize)]
pub struct State {
    /// Current simulation step.
    pub step: usize,

    /// Total number of reorientation events since the start of the run.
    pub n_reorientations: u64,

    /// Population of the simulation.
    pub microbes: Vec<Microbe>,
}

/// Recorded fields of one microbe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicrobeSnapshot {
    pub id: usize,
    pub pos: Array1<f64>,
    pub vel: Array1<f64>,
    pub state: MotilityState,
}

/// Record of the simulation at a single step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Simulation step.
    pub step: usize,

    /// Simulation time.
    pub time: f64,

    /// Total number of reorientation events so far.
    pub n_reorientations: u64,

    /// Recorded microbes, in id order.
    pub microbes: Vec<MicrobeSnapshot>,
}

impl Snapshot {
    pub fn capture(state: &State, timestep: f64) -> Self {
        let microbes = state
            .microbes
            .iter()
            .map(|mcb| MicrobeSnapshot {
                id: mcb.id(),
                pos: mcb.pos().to_owned(),
                vel: mcb.vel(),
                state: mcb.state(),
            })
            .collect();
        Self {
            step: state.step,
            time: state.step as f64 * timestep,
            n_reorientations: state.n_reorientations,
            microbes,
        }
    }

    /// Positions as a frame with one row per microbe.
    pub fn positions(&self) -> Frame {
        self.frame(|mcb| &mcb.pos)
    }

    /// Velocities as a frame with one row per microbe.
    pub fn velocities(&self) -> Frame {
        self.frame(|mcb| &mcb.vel)
    }

    fn frame<F>(&self, field: F) -> Frame
    where
        F: Fn(&MicrobeSnapshot) -> &Array1<f64>,
    {
        let dim = self.microbes.first().map_or(0, |mcb| field(mcb).len());
        Array2::from_shape_fn((self.microbes.len(), dim), |(i, j)| {
            field(&self.microbes[i])[j]
        })
    }
}
