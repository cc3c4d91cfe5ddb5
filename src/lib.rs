//! Agent-based simulation of bacterial motility and chemotaxis.
//!
//! Microbes swim in 1, 2 or 3 dimensions following a [`motility::Motility`]
//! pattern, optionally biasing their reorientation rate through a
//! [`chemotaxis::Chemotaxis`] model. [`step::microbe_step`] advances a single
//! microbe; [`engine::Engine`] steps a whole population and records
//! trajectories, and [`qoi`] reduces them to mean-squared displacements and
//! velocity autocorrelations.

pub mod analysis;
pub mod chemotaxis;
pub mod config;
pub mod engine;
pub mod error;
pub mod field;
pub mod manager;
pub mod microbe;
pub mod model;
pub mod motility;
pub mod qoi;
pub mod stats;
pub mod step;
pub mod utils;

pub use chemotaxis::{ChemoState, Chemotaxis};
pub use error::{ModelError, ModelResult};
pub use microbe::{Microbe, MicrobeParams};
pub use motility::{Motility, MotilityState, Speed};
pub use step::microbe_step;
