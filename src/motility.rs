//! Motile patterns.
//!
//! A [`Motility`] describes how a microbe swims between reorientation events
//! and how it picks a new direction and speed when one occurs. It is shared
//! read-only by every microbe that uses it; the only per-microbe piece is the
//! current [`MotilityState`].

use crate::error::ModelResult;
use crate::utils::{check_param, fill_random_direction, random_perpendicular};
use ndarray::Array1;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Scalar distribution of swimming speeds, sampled at every reorientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Speed {
    Fixed { value: f64 },
    /// Normal distribution truncated to positive values.
    Normal { mean: f64, std_dev: f64 },
    Uniform { min: f64, max: f64 },
}

impl Speed {
    /// Check that the distribution has positive support.
    pub fn validate(&self) -> ModelResult<()> {
        match *self {
            Speed::Fixed { value } => {
                check_param("fixed speed", value, f64::MIN_POSITIVE..f64::INFINITY)
            }
            Speed::Normal { mean, std_dev } => {
                check_param("mean speed", mean, f64::MIN_POSITIVE..f64::INFINITY)?;
                check_param("speed standard deviation", std_dev, 0.0..f64::INFINITY)
            }
            Speed::Uniform { min, max } => {
                check_param("minimum speed", min, f64::MIN_POSITIVE..f64::INFINITY)?;
                check_param("maximum speed", max, min..f64::INFINITY)
            }
        }
    }

    /// Mean of the untruncated distribution.
    pub fn mean(&self) -> f64 {
        match *self {
            Speed::Fixed { value } => value,
            Speed::Normal { mean, .. } => mean,
            Speed::Uniform { min, max } => 0.5 * (min + max),
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            Speed::Fixed { value } => value,
            Speed::Normal { mean, std_dev } => loop {
                let z: f64 = rng.sample(StandardNormal);
                let speed = mean + std_dev * z;
                if speed > 0.0 {
                    return speed;
                }
            },
            Speed::Uniform { min, max } => rng.random_range(min..=max),
        }
    }
}

/// Discrete swimming state of a microbe.
///
/// Run-and-tumble swimmers stay in `Forward`; reversing swimmers alternate
/// between `Forward` and `Backward`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotilityState {
    #[default]
    Forward,
    Backward,
}

/// Motile pattern: speed distributions per state and the turning rule.
///
/// Turn rates given here override the microbe's base turn rate while the
/// microbe is in the corresponding state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Motility {
    /// Single run state; each tumble picks an isotropic random direction.
    RunTumble {
        speed: Speed,
        #[serde(default)]
        turn_rate: Option<f64>,
    },
    /// Each event reverses the swimming direction.
    RunReverse {
        speed_forward: Speed,
        speed_backward: Speed,
        #[serde(default)]
        turn_rate_forward: Option<f64>,
        #[serde(default)]
        turn_rate_backward: Option<f64>,
    },
    /// Reversals alternate with flicks onto a random perpendicular direction.
    RunReverseFlick {
        speed_forward: Speed,
        speed_backward: Speed,
        #[serde(default)]
        turn_rate_forward: Option<f64>,
        #[serde(default)]
        turn_rate_backward: Option<f64>,
    },
}

impl Motility {
    pub fn run_tumble(speed: Speed) -> ModelResult<Self> {
        let motility = Motility::RunTumble {
            speed,
            turn_rate: None,
        };
        motility.validate()?;
        Ok(motility)
    }

    pub fn run_reverse(speed_forward: Speed, speed_backward: Speed) -> ModelResult<Self> {
        let motility = Motility::RunReverse {
            speed_forward,
            speed_backward,
            turn_rate_forward: None,
            turn_rate_backward: None,
        };
        motility.validate()?;
        Ok(motility)
    }

    pub fn run_reverse_flick(speed_forward: Speed, speed_backward: Speed) -> ModelResult<Self> {
        let motility = Motility::RunReverseFlick {
            speed_forward,
            speed_backward,
            turn_rate_forward: None,
            turn_rate_backward: None,
        };
        motility.validate()?;
        Ok(motility)
    }

    /// Override the turn rate of `state`.
    ///
    /// Run-and-tumble swimmers have a single state, so `state` is ignored.
    pub fn with_turn_rate(mut self, state: MotilityState, rate: f64) -> ModelResult<Self> {
        let slot = match (&mut self, state) {
            (Motility::RunTumble { turn_rate, .. }, _) => turn_rate,
            (
                Motility::RunReverse {
                    turn_rate_forward, ..
                }
                | Motility::RunReverseFlick {
                    turn_rate_forward, ..
                },
                MotilityState::Forward,
            ) => turn_rate_forward,
            (
                Motility::RunReverse {
                    turn_rate_backward,
                    ..
                }
                | Motility::RunReverseFlick {
                    turn_rate_backward,
                    ..
                },
                MotilityState::Backward,
            ) => turn_rate_backward,
        };
        *slot = Some(rate);
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> ModelResult<()> {
        let check_rate = |name: &str, rate: Option<f64>| match rate {
            Some(rate) => check_param(name, rate, 0.0..f64::INFINITY),
            None => Ok(()),
        };
        match *self {
            Motility::RunTumble { speed, turn_rate } => {
                speed.validate()?;
                check_rate("turn rate", turn_rate)
            }
            Motility::RunReverse {
                speed_forward,
                speed_backward,
                turn_rate_forward,
                turn_rate_backward,
            }
            | Motility::RunReverseFlick {
                speed_forward,
                speed_backward,
                turn_rate_forward,
                turn_rate_backward,
            } => {
                speed_forward.validate()?;
                speed_backward.validate()?;
                check_rate("forward turn rate", turn_rate_forward)?;
                check_rate("backward turn rate", turn_rate_backward)
            }
        }
    }

    /// Turn rate of the given state, if overridden.
    pub fn turn_rate(&self, state: MotilityState) -> Option<f64> {
        match (self, state) {
            (Motility::RunTumble { turn_rate, .. }, _) => *turn_rate,
            (
                Motility::RunReverse {
                    turn_rate_forward, ..
                }
                | Motility::RunReverseFlick {
                    turn_rate_forward, ..
                },
                MotilityState::Forward,
            ) => *turn_rate_forward,
            (
                Motility::RunReverse {
                    turn_rate_backward,
                    ..
                }
                | Motility::RunReverseFlick {
                    turn_rate_backward,
                    ..
                },
                MotilityState::Backward,
            ) => *turn_rate_backward,
        }
    }

    /// Largest mean speed over all states.
    pub fn max_mean_speed(&self) -> f64 {
        match self {
            Motility::RunTumble { speed, .. } => speed.mean(),
            Motility::RunReverse {
                speed_forward,
                speed_backward,
                ..
            }
            | Motility::RunReverseFlick {
                speed_forward,
                speed_backward,
                ..
            } => speed_forward.mean().max(speed_backward.mean()),
        }
    }

    /// Speed distribution of the given state.
    pub fn speed(&self, state: MotilityState) -> &Speed {
        match (self, state) {
            (Motility::RunTumble { speed, .. }, _) => speed,
            (
                Motility::RunReverse { speed_forward, .. }
                | Motility::RunReverseFlick { speed_forward, .. },
                MotilityState::Forward,
            ) => speed_forward,
            (
                Motility::RunReverse { speed_backward, .. }
                | Motility::RunReverseFlick { speed_backward, .. },
                MotilityState::Backward,
            ) => speed_backward,
        }
    }

    /// Apply one reorientation event.
    ///
    /// Updates `state` and the unit vector `dir` in place and returns the new
    /// speed, sampled from the distribution of the state entered.
    pub fn reorient<R: Rng + ?Sized>(
        &self,
        state: &mut MotilityState,
        dir: &mut Array1<f64>,
        rng: &mut R,
    ) -> f64 {
        match self {
            Motility::RunTumble { .. } => {
                fill_random_direction(dir, rng);
            }
            Motility::RunReverse { .. } => {
                reverse(dir);
                *state = match *state {
                    MotilityState::Forward => MotilityState::Backward,
                    MotilityState::Backward => MotilityState::Forward,
                };
            }
            Motility::RunReverseFlick { .. } => match *state {
                MotilityState::Forward => {
                    reverse(dir);
                    *state = MotilityState::Backward;
                }
                MotilityState::Backward => {
                    match random_perpendicular(dir.view(), rng) {
                        Some(perp) => *dir = perp,
                        // No perpendicular exists in 1D.
                        None => fill_random_direction(dir, rng),
                    }
                    *state = MotilityState::Forward;
                }
            },
        }
        self.speed(*state).sample(rng)
    }
}

fn reverse(dir: &mut Array1<f64>) {
    dir.mapv_inplace(|ele| -ele);
}

/// Probability of at least one Poisson event of rate `rate` within `dt`.
pub fn turn_probability(rate: f64, dt: f64) -> f64 {
    1.0 - (-rate * dt).exp()
}

/// Decide whether a reorientation occurs within `dt` at the given rate.
pub fn reorientation_occurs<R: Rng + ?Sized>(rate: f64, dt: f64, rng: &mut R) -> bool {
    rng.random::<f64>() < turn_probability(rate, dt)
}

impl From<Speed> for Motility {
    fn from(speed: Speed) -> Self {
        Motility::RunTumble {
            speed,
            turn_rate: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::utils::{norm, random_direction};
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    const UNIT: Speed = Speed::Fixed { value: 1.0 };

    #[test]
    fn degenerate_speeds_are_rejected() {
        let bad = [
            Speed::Fixed { value: 0.0 },
            Speed::Fixed { value: -2.0 },
            Speed::Normal {
                mean: -1.0,
                std_dev: 0.1,
            },
            Speed::Normal {
                mean: 1.0,
                std_dev: -0.1,
            },
            Speed::Uniform { min: 0.0, max: 1.0 },
            Speed::Uniform { min: 2.0, max: 1.0 },
            Speed::Fixed { value: f64::NAN },
        ];
        for speed in bad {
            assert!(
                matches!(
                    Motility::run_tumble(speed),
                    Err(ModelError::InvalidConfiguration(_))
                ),
                "accepted {speed:?}"
            );
        }
        assert!(Motility::run_reverse(UNIT, Speed::Fixed { value: -1.0 }).is_err());
    }

    #[test]
    fn sampled_speeds_are_positive() {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let speed = Speed::Normal {
            mean: 0.5,
            std_dev: 2.0,
        };
        assert!((0..1000).all(|_| speed.sample(&mut rng) > 0.0));
        let speed = Speed::Uniform { min: 1.0, max: 2.0 };
        assert!((0..1000).all(|_| (1.0..=2.0).contains(&speed.sample(&mut rng))));
    }

    #[test]
    fn run_reverse_flips_direction_and_state() {
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        let motility = Motility::run_reverse(UNIT, Speed::Fixed { value: 0.5 }).unwrap();
        let mut state = MotilityState::Forward;
        let mut dir = random_direction(3, &mut rng);
        let old_dir = dir.clone();

        let speed = motility.reorient(&mut state, &mut dir, &mut rng);
        assert_eq!(state, MotilityState::Backward);
        assert_eq!(speed, 0.5);
        assert!((dir.dot(&old_dir) + 1.0).abs() < 1e-12);

        let speed = motility.reorient(&mut state, &mut dir, &mut rng);
        assert_eq!(state, MotilityState::Forward);
        assert_eq!(speed, 1.0);
        assert_eq!(dir, old_dir);
    }

    #[test]
    fn run_reverse_flick_alternates_reversal_and_flick() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let motility = Motility::run_reverse_flick(UNIT, UNIT).unwrap();
        let mut state = MotilityState::Forward;
        let mut dir = random_direction(2, &mut rng);

        let before = dir.clone();
        motility.reorient(&mut state, &mut dir, &mut rng);
        assert_eq!(state, MotilityState::Backward);
        assert!((dir.dot(&before) + 1.0).abs() < 1e-12);

        let before = dir.clone();
        motility.reorient(&mut state, &mut dir, &mut rng);
        assert_eq!(state, MotilityState::Forward);
        assert!(dir.dot(&before).abs() < 1e-12);
        assert!((norm(dir.view()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn run_tumble_stays_in_forward_state() {
        let mut rng = ChaCha12Rng::seed_from_u64(4);
        let motility = Motility::from(UNIT);
        let mut state = MotilityState::Forward;
        let mut dir = array![1.0, 0.0];
        for _ in 0..10 {
            motility.reorient(&mut state, &mut dir, &mut rng);
            assert_eq!(state, MotilityState::Forward);
            assert!((norm(dir.view()) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn one_dimensional_flick_keeps_a_unit_direction() {
        let mut rng = ChaCha12Rng::seed_from_u64(6);
        let motility = Motility::run_reverse_flick(UNIT, UNIT).unwrap();
        let mut state = MotilityState::Backward;
        let mut dir = array![1.0];
        motility.reorient(&mut state, &mut dir, &mut rng);
        assert_eq!(state, MotilityState::Forward);
        assert_eq!(dir[0].abs(), 1.0);
    }

    #[test]
    fn negative_turn_rates_are_rejected() {
        let tumble = Motility::run_tumble(UNIT).unwrap();
        assert!(matches!(
            tumble.clone().with_turn_rate(MotilityState::Forward, -1.0),
            Err(ModelError::InvalidConfiguration(_))
        ));
        assert!(tumble.with_turn_rate(MotilityState::Forward, f64::NAN).is_err());

        let reverse = Motility::run_reverse(UNIT, UNIT).unwrap();
        assert!(
            reverse
                .clone()
                .with_turn_rate(MotilityState::Backward, -1.0)
                .is_err()
        );
        let reverse = reverse
            .with_turn_rate(MotilityState::Backward, 3.0)
            .unwrap();
        assert_eq!(reverse.turn_rate(MotilityState::Forward), None);
        assert_eq!(reverse.turn_rate(MotilityState::Backward), Some(3.0));

        let parsed: Motility = toml::from_str(
            r#"
type = "run_reverse"
speed_forward = { type = "fixed", value = 1.0 }
speed_backward = { type = "fixed", value = 1.0 }
turn_rate_forward = -1.0
"#,
        )
        .unwrap();
        assert!(matches!(
            parsed.validate(),
            Err(ModelError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn turn_probability_matches_poisson_law() {
        assert_eq!(turn_probability(0.0, 0.1), 0.0);
        assert!((turn_probability(1.0, 0.1) - (1.0 - (-0.1f64).exp())).abs() < 1e-15);
        assert!(turn_probability(1e6, 1.0) <= 1.0);
    }

    #[test]
    fn motility_deserializes_from_tagged_toml() {
        let motility: Motility = toml::from_str(
            r#"
type = "run_reverse_flick"
speed_forward = { type = "normal", mean = 30.0, std_dev = 3.0 }
speed_backward = { type = "fixed", value = 20.0 }
"#,
        )
        .unwrap();
        assert!(motility.validate().is_ok());
        assert_eq!(motility.turn_rate(MotilityState::Forward), None);
        assert_eq!(motility.max_mean_speed(), 30.0);
        assert_eq!(
            motility.speed(MotilityState::Backward),
            &Speed::Fixed { value: 20.0 }
        );
    }
}
