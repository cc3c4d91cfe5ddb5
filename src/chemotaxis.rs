//! Chemotactic sensing and response.
//!
//! A [`Chemotaxis`] model is a causal filter over the concentration samples a
//! microbe perceives along its path. Every step it consumes one sample,
//! updates the microbe's own [`ChemoState`], and returns a factor that scales
//! the base turn rate. Perception is continuous: the filter is updated every
//! step whether or not the microbe reorients.

use crate::error::{ModelError, ModelResult};
use crate::utils::check_param;
use serde::{Deserialize, Serialize};

/// Default lower bound of the turn-rate multiplier.
pub const DEFAULT_MIN_MULTIPLIER: f64 = 0.05;

fn default_min_multiplier() -> f64 {
    DEFAULT_MIN_MULTIPLIER
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Chemotaxis {
    /// No sensing; the turn rate is left unchanged.
    #[default]
    None,
    /// Single exponential memory of the concentration.
    ///
    /// The perceived gradient is the difference between the current sample
    /// and its moving average over the time scale `memory`.
    BrownBerg {
        gain: f64,
        memory: f64,
        #[serde(default = "default_min_multiplier")]
        min_multiplier: f64,
    },
    /// Two-pathway sensing with independent fast and slow filters.
    ///
    /// Each pathway measures how far the sample sits above its own filtered
    /// level; the response is the slow deviation minus the fast one, each
    /// with its own gain. This is a band-pass estimate of the temporal
    /// gradient that vanishes for a constant signal whatever the gains.
    Brumley {
        tau_fast: f64,
        tau_slow: f64,
        gain_fast: f64,
        gain_slow: f64,
        #[serde(default = "default_min_multiplier")]
        min_multiplier: f64,
    },
}

/// Internal memory of one microbe's chemotactic filter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChemoState {
    /// Fast (or only) filter accumulator.
    pub filt_fast: f64,
    /// Slow filter accumulator, unused by single-filter models.
    pub filt_slow: f64,
    /// Last perceived gradient signal.
    pub response: f64,
    /// Whether the filters have seen a first sample.
    pub primed: bool,
}

impl Chemotaxis {
    pub fn brown_berg(gain: f64, memory: f64, min_multiplier: f64) -> ModelResult<Self> {
        let chemotaxis = Chemotaxis::BrownBerg {
            gain,
            memory,
            min_multiplier,
        };
        chemotaxis.validate()?;
        Ok(chemotaxis)
    }

    pub fn brumley(
        tau_fast: f64,
        tau_slow: f64,
        gain_fast: f64,
        gain_slow: f64,
        min_multiplier: f64,
    ) -> ModelResult<Self> {
        let chemotaxis = Chemotaxis::Brumley {
            tau_fast,
            tau_slow,
            gain_fast,
            gain_slow,
            min_multiplier,
        };
        chemotaxis.validate()?;
        Ok(chemotaxis)
    }

    pub fn validate(&self) -> ModelResult<()> {
        match *self {
            Chemotaxis::None => Ok(()),
            Chemotaxis::BrownBerg {
                gain,
                memory,
                min_multiplier,
            } => {
                check_param("gain", gain, f64::MIN..=f64::MAX)?;
                check_param("memory", memory, f64::MIN_POSITIVE..f64::INFINITY)?;
                check_param("minimum multiplier", min_multiplier, f64::MIN_POSITIVE..=1.0)
            }
            Chemotaxis::Brumley {
                tau_fast,
                tau_slow,
                gain_fast,
                gain_slow,
                min_multiplier,
            } => {
                let positive = f64::MIN_POSITIVE..f64::INFINITY;
                check_param("fast time constant", tau_fast, positive.clone())?;
                check_param("slow time constant", tau_slow, positive)?;
                if tau_fast >= tau_slow {
                    return Err(ModelError::InvalidConfiguration(format!(
                        "fast time constant ({tau_fast}) must be smaller than slow one ({tau_slow})"
                    )));
                }
                check_param("fast gain", gain_fast, f64::MIN..=f64::MAX)?;
                check_param("slow gain", gain_slow, f64::MIN..=f64::MAX)?;
                check_param("minimum multiplier", min_multiplier, f64::MIN_POSITIVE..=1.0)
            }
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Chemotaxis::None)
    }

    /// Fresh filter memory for a microbe, or `None` if sensing is disabled.
    pub fn init_state(&self) -> Option<ChemoState> {
        self.is_active().then(ChemoState::default)
    }

    /// Feed one concentration sample and return the turn-rate multiplier.
    ///
    /// The first sample primes the filters, so it is perceived as no change.
    ///
    /// # Errors
    /// Returns [`ModelError::NumericDivergence`] if the sample or any filter
    /// quantity is not finite.
    pub fn update(&self, state: &mut ChemoState, conc: f64, dt: f64) -> ModelResult<f64> {
        if !conc.is_finite() {
            return Err(ModelError::NumericDivergence(format!(
                "concentration sample is {conc}"
            )));
        }
        if !state.primed {
            state.filt_fast = conc;
            state.filt_slow = conc;
            state.response = 0.0;
            state.primed = true;
        }

        let multiplier = match *self {
            Chemotaxis::None => return Ok(1.0),
            Chemotaxis::BrownBerg {
                gain,
                memory,
                min_multiplier,
            } => {
                let gradient = conc - state.filt_fast;
                state.filt_fast += relaxation(dt, memory) * gradient;
                state.response = gain * gradient;
                (1.0 - state.response).clamp(min_multiplier, 1.0)
            }
            Chemotaxis::Brumley {
                tau_fast,
                tau_slow,
                gain_fast,
                gain_slow,
                min_multiplier,
            } => {
                state.filt_fast += relaxation(dt, tau_fast) * (conc - state.filt_fast);
                state.filt_slow += relaxation(dt, tau_slow) * (conc - state.filt_slow);
                state.response =
                    gain_slow * (conc - state.filt_slow) - gain_fast * (conc - state.filt_fast);
                (1.0 - state.response).clamp(min_multiplier, 1.0)
            }
        };

        if !(state.filt_fast.is_finite()
            && state.filt_slow.is_finite()
            && state.response.is_finite())
        {
            return Err(ModelError::NumericDivergence(format!(
                "chemotaxis filter state is not finite: {state:?}"
            )));
        }
        Ok(multiplier)
    }
}

/// Explicit relaxation factor of an exponential filter, capped at one so a
/// large timestep jumps straight to the sample instead of overshooting.
fn relaxation(dt: f64, tau: f64) -> f64 {
    (dt / tau).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn brown_berg() -> Chemotaxis {
        Chemotaxis::brown_berg(2.0, 1.0, 0.1).unwrap()
    }

    fn brumley() -> Chemotaxis {
        Chemotaxis::brumley(0.5, 2.0, 3.0, 3.0, 0.1).unwrap()
    }

    #[test]
    fn non_positive_time_constants_are_rejected() {
        assert!(matches!(
            Chemotaxis::brown_berg(1.0, 0.0, 0.1),
            Err(ModelError::InvalidConfiguration(_))
        ));
        assert!(Chemotaxis::brown_berg(1.0, -1.0, 0.1).is_err());
        assert!(Chemotaxis::brumley(0.0, 1.0, 1.0, 1.0, 0.1).is_err());
        assert!(Chemotaxis::brumley(1.0, -1.0, 1.0, 1.0, 0.1).is_err());
        assert!(Chemotaxis::brumley(2.0, 1.0, 1.0, 1.0, 0.1).is_err());
        assert!(Chemotaxis::brown_berg(1.0, 1.0, 0.0).is_err());
        assert!(Chemotaxis::brown_berg(f64::NAN, 1.0, 0.1).is_err());
    }

    #[test]
    fn none_model_is_pass_through() {
        let mut state = ChemoState::default();
        let multiplier = Chemotaxis::None.update(&mut state, 42.0, 0.1).unwrap();
        assert_eq!(multiplier, 1.0);
        assert!(Chemotaxis::None.init_state().is_none());
    }

    #[test]
    fn constant_signal_adapts_to_unit_multiplier() {
        for model in [brown_berg(), brumley()] {
            let mut state = model.init_state().unwrap();
            for _ in 0..1000 {
                let multiplier = model.update(&mut state, 5.0, 0.1).unwrap();
                assert_eq!(multiplier, 1.0);
            }
        }
    }

    #[test]
    fn brumley_adapts_to_any_constant_level_with_unequal_gains() {
        let model = Chemotaxis::brumley(0.5, 2.0, 2.0, 1.0, 0.05).unwrap();
        for conc in [0.0, 0.5, 1.0, 250.0] {
            let mut state = model.init_state().unwrap();
            for _ in 0..1000 {
                let multiplier = model.update(&mut state, conc, 0.1).unwrap();
                assert_eq!(multiplier, 1.0, "conc = {conc}");
            }
            assert_eq!(state.response, 0.0);
        }
    }

    #[test]
    fn brumley_responds_to_change_not_level() {
        let model = Chemotaxis::brumley(0.5, 2.0, 2.0, 1.0, 0.05).unwrap();
        let mut low = model.init_state().unwrap();
        let mut high = model.init_state().unwrap();
        for i in 0..200 {
            let ramp = 0.01 * i as f64;
            let m_low = model.update(&mut low, ramp, 0.1).unwrap();
            let m_high = model.update(&mut high, 100.0 + ramp, 0.1).unwrap();
            assert!((m_low - m_high).abs() < 1e-9);
        }
        assert!(low.response > 0.0);
    }

    #[test]
    fn rising_signal_suppresses_turning() {
        let model = brown_berg();
        let mut state = model.init_state().unwrap();
        let mut multiplier = 1.0;
        for i in 0..50 {
            multiplier = model.update(&mut state, 0.1 * i as f64, 0.1).unwrap();
        }
        assert!(multiplier < 1.0, "multiplier: {multiplier}");

        let model = brumley();
        let mut state = model.init_state().unwrap();
        for i in 0..50 {
            multiplier = model.update(&mut state, 0.1 * i as f64, 0.1).unwrap();
        }
        assert!(multiplier < 1.0, "multiplier: {multiplier}");
    }

    #[test]
    fn filters_follow_the_signal_after_a_step() {
        let model = brown_berg();
        let mut state = model.init_state().unwrap();
        model.update(&mut state, 0.0, 0.1).unwrap();
        for _ in 0..200 {
            model.update(&mut state, 1.0, 0.1).unwrap();
        }
        assert!((state.filt_fast - 1.0).abs() < 1e-6);
    }

    #[test]
    fn large_timesteps_do_not_overshoot() {
        let model = brumley();
        let mut state = model.init_state().unwrap();
        model.update(&mut state, 0.0, 10.0).unwrap();
        model.update(&mut state, 1.0, 10.0).unwrap();
        assert_eq!(state.filt_fast, 1.0);
        assert_eq!(state.filt_slow, 1.0);
    }

    #[test]
    fn non_finite_sample_is_a_divergence() {
        let model = brown_berg();
        let mut state = model.init_state().unwrap();
        assert!(matches!(
            model.update(&mut state, f64::NAN, 0.1),
            Err(ModelError::NumericDivergence(_))
        ));
    }

    proptest! {
        #[test]
        fn multiplier_stays_within_bounds(
            samples in prop::collection::vec(-1e6f64..1e6, 1..64),
            dt in 1e-3f64..1.0,
            gain in -10.0f64..10.0,
        ) {
            let min_multiplier = 0.1;
            let models = [
                Chemotaxis::brown_berg(gain, 1.0, min_multiplier).unwrap(),
                Chemotaxis::brumley(0.3, 3.0, gain, 0.5 * gain, min_multiplier).unwrap(),
            ];
            for model in models {
                let mut state = model.init_state().unwrap();
                for &conc in &samples {
                    let multiplier = model.update(&mut state, conc, dt).unwrap();
                    prop_assert!((min_multiplier..=1.0).contains(&multiplier));
                }
            }
        }
    }
}
