use crate::chemotaxis::{ChemoState, Chemotaxis};
use crate::error::{ModelError, ModelResult};
use crate::motility::{Motility, MotilityState};
use crate::utils::{check_dim, check_param, fill_random_direction, norm};
use ndarray::{Array1, ArrayView1};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Kinetic parameters shared by all microbes of a population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicrobeParams {
    /// Base rate of reorientation events, used by every motility state
    /// without its own rate.
    pub turn_rate: f64,
    /// Rotational diffusion coefficient.
    #[serde(default)]
    pub rotational_diffusivity: f64,
    /// Equivalent spherical radius (informational).
    #[serde(default)]
    pub radius: f64,
}

impl Default for MicrobeParams {
    fn default() -> Self {
        Self {
            turn_rate: 1.0,
            rotational_diffusivity: 0.0,
            radius: 0.0,
        }
    }
}

impl MicrobeParams {
    pub fn validate(&self) -> ModelResult<()> {
        let non_negative = 0.0..f64::INFINITY;
        check_param("turn rate", self.turn_rate, non_negative.clone())?;
        check_param(
            "rotational diffusivity",
            self.rotational_diffusivity,
            non_negative.clone(),
        )?;
        check_param("radius", self.radius, non_negative)
    }
}

/// Single bacterium.
///
/// The velocity is kept as a unit direction and a speed so that the
/// direction survives reorientations with arbitrary speeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Microbe {
    id: usize,
    pub(crate) pos: Array1<f64>,
    pub(crate) dir: Array1<f64>,
    pub(crate) speed: f64,
    pub(crate) state: MotilityState,
    turn_rate: f64,
    rotational_diffusivity: f64,
    radius: f64,
    pub(crate) chemo: Option<ChemoState>,
}

impl Microbe {
    /// Create a microbe at `pos` swimming in a random direction.
    ///
    /// The initial speed is drawn from the forward speed distribution of
    /// `motility`, and chemotactic memory is allocated iff `chemotaxis` is active.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidConfiguration`] for an unsupported
    /// dimensionality or out-of-range parameters.
    pub fn new<R: Rng + ?Sized>(
        id: usize,
        pos: Array1<f64>,
        params: &MicrobeParams,
        motility: &Motility,
        chemotaxis: &Chemotaxis,
        rng: &mut R,
    ) -> ModelResult<Self> {
        check_dim(pos.len())?;
        params.validate()?;
        motility.validate()?;
        chemotaxis.validate()?;
        if pos.iter().any(|x| !x.is_finite()) {
            return Err(ModelError::InvalidConfiguration(format!(
                "position must be finite, but is {pos}"
            )));
        }

        let mut dir = Array1::zeros(pos.len());
        fill_random_direction(&mut dir, rng);
        let state = MotilityState::default();
        let speed = motility.speed(state).sample(rng);

        Ok(Self {
            id,
            pos,
            dir,
            speed,
            state,
            turn_rate: params.turn_rate,
            rotational_diffusivity: params.rotational_diffusivity,
            radius: params.radius,
            chemo: chemotaxis.init_state(),
        })
    }

    /// Replace the initial velocity.
    pub fn with_velocity(mut self, vel: ArrayView1<f64>) -> ModelResult<Self> {
        if vel.len() != self.dim() {
            return Err(ModelError::InvalidConfiguration(format!(
                "velocity must have {} components, but has {}",
                self.dim(),
                vel.len()
            )));
        }
        let speed = norm(vel);
        check_param("initial speed", speed, f64::MIN_POSITIVE..f64::INFINITY)?;
        self.dir = &vel / speed;
        self.speed = speed;
        Ok(self)
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn dim(&self) -> usize {
        self.pos.len()
    }

    pub fn pos(&self) -> ArrayView1<f64> {
        self.pos.view()
    }

    /// Unit vector along the swimming direction.
    pub fn dir(&self) -> ArrayView1<f64> {
        self.dir.view()
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn vel(&self) -> Array1<f64> {
        &self.dir * self.speed
    }

    pub fn state(&self) -> MotilityState {
        self.state
    }

    pub fn turn_rate(&self) -> f64 {
        self.turn_rate
    }

    pub fn rotational_diffusivity(&self) -> f64 {
        self.rotational_diffusivity
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn chemo(&self) -> Option<&ChemoState> {
        self.chemo.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motility::Speed;
    use ndarray::{Array1, array};
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn motility() -> Motility {
        Motility::run_tumble(Speed::Fixed { value: 2.0 }).unwrap()
    }

    #[test]
    fn new_microbe_has_unit_direction_and_sampled_speed() {
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        let params = MicrobeParams::default();
        let mcb = Microbe::new(
            3,
            array![1.0, 2.0, 3.0],
            &params,
            &motility(),
            &Chemotaxis::None,
            &mut rng,
        )
        .unwrap();
        assert_eq!(mcb.id(), 3);
        assert_eq!(mcb.dim(), 3);
        assert_eq!(mcb.speed(), 2.0);
        assert!((norm(mcb.dir()) - 1.0).abs() < 1e-12);
        assert!((norm(mcb.vel().view()) - 2.0).abs() < 1e-12);
        assert!(mcb.chemo().is_none());
    }

    #[test]
    fn negative_turn_rate_is_rejected() {
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        let params = MicrobeParams {
            turn_rate: -1.0,
            ..Default::default()
        };
        let result = Microbe::new(0, array![0.0], &params, &motility(), &Chemotaxis::None, &mut rng);
        assert!(matches!(result, Err(ModelError::InvalidConfiguration(_))));
    }

    #[test]
    fn unsupported_dimensionality_is_rejected() {
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        let params = MicrobeParams::default();
        for pos in [Array1::zeros(0), Array1::zeros(4)] {
            let result = Microbe::new(0, pos, &params, &motility(), &Chemotaxis::None, &mut rng);
            assert!(result.is_err());
        }
    }

    #[test]
    fn non_finite_position_is_rejected() {
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        let result = Microbe::new(
            0,
            array![0.0, f64::INFINITY],
            &MicrobeParams::default(),
            &motility(),
            &Chemotaxis::None,
            &mut rng,
        );
        assert!(matches!(result, Err(ModelError::InvalidConfiguration(_))));
    }

    #[test]
    fn chemotactic_memory_follows_model() {
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        let chemotaxis = Chemotaxis::brown_berg(1.0, 1.0, 0.1).unwrap();
        let mcb = Microbe::new(
            0,
            array![0.0, 0.0],
            &MicrobeParams::default(),
            &motility(),
            &chemotaxis,
            &mut rng,
        )
        .unwrap();
        assert!(mcb.chemo().is_some());
    }

    #[test]
    fn with_velocity_splits_direction_and_speed() {
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        let mcb = Microbe::new(
            0,
            array![0.0, 0.0],
            &MicrobeParams::default(),
            &motility(),
            &Chemotaxis::None,
            &mut rng,
        )
        .unwrap()
        .with_velocity(array![3.0, 4.0].view())
        .unwrap();
        assert_eq!(mcb.speed(), 5.0);
        assert_eq!(mcb.dir(), array![0.6, 0.8]);
        assert!(mcb.clone().with_velocity(array![0.0, 0.0].view()).is_err());
        assert!(mcb.with_velocity(array![1.0].view()).is_err());
    }
}
