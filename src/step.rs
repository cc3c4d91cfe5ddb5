//! Per-timestep update of a single microbe.
//!
//! One call performs, in order: chemotactic sensing, the reorientation event
//! test, rotational diffusion and the explicit Euler position update. The
//! microbe is only touched through the `&mut` borrow, so a population can be
//! stepped in parallel as long as every microbe has its own random stream.

use crate::chemotaxis::Chemotaxis;
use crate::error::{ModelError, ModelResult};
use crate::microbe::Microbe;
use crate::motility::{Motility, reorientation_occurs};
use crate::utils::{norm, normalize};
use ndarray::Array1;
use rand::Rng;
use rand_distr::StandardNormal;

/// Advance `mcb` by one timestep `dt`.
///
/// `conc` is the concentration at the microbe's current position. It must be
/// given whenever `chemotaxis` is active and is ignored otherwise. The turn
/// rate is the motility's rate for the current state, falling back to the
/// microbe's base rate. Positions are never wrapped here.
///
/// Returns whether a reorientation event occurred.
///
/// # Errors
/// Returns [`ModelError::InvalidConfiguration`] if `chemotaxis` is active but
/// the sample or the microbe's chemotactic memory is missing, and
/// [`ModelError::NumericDivergence`] if the chemotactic filter, the
/// effective turn rate or the new position stops being finite.
pub fn microbe_step<R: Rng + ?Sized>(
    mcb: &mut Microbe,
    motility: &Motility,
    chemotaxis: &Chemotaxis,
    conc: Option<f64>,
    dt: f64,
    rng: &mut R,
) -> ModelResult<bool> {
    let id = mcb.id();
    let multiplier = if chemotaxis.is_active() {
        match (mcb.chemo.as_mut(), conc) {
            (Some(chemo), Some(conc)) => chemotaxis.update(chemo, conc, dt)?,
            (None, _) => {
                return Err(ModelError::InvalidConfiguration(format!(
                    "microbe {id} has no chemotactic memory"
                )));
            }
            (_, None) => {
                return Err(ModelError::InvalidConfiguration(format!(
                    "microbe {id} got no concentration sample"
                )));
            }
        }
    } else {
        1.0
    };

    let base_rate = motility.turn_rate(mcb.state).unwrap_or(mcb.turn_rate());
    let rate = base_rate * multiplier;
    if !rate.is_finite() {
        return Err(ModelError::NumericDivergence(format!(
            "effective turn rate of microbe {id} is {rate}"
        )));
    }

    let reoriented = reorientation_occurs(rate, dt, rng);
    if reoriented {
        mcb.speed = motility.reorient(&mut mcb.state, &mut mcb.dir, rng);
    }

    let diffusivity = mcb.rotational_diffusivity();
    rotational_diffusion(&mut mcb.dir, diffusivity, dt, rng);

    mcb.pos.scaled_add(mcb.speed * dt, &mcb.dir);
    if mcb.pos.iter().any(|x| !x.is_finite()) {
        return Err(ModelError::NumericDivergence(format!(
            "position of microbe {id} is {}",
            mcb.pos
        )));
    }

    Ok(reoriented)
}

/// Rotate the unit vector `dir` by a random angle of variance
/// `2 * diffusivity * dt` per rotational degree of freedom.
///
/// The kick is a Gaussian vector projected onto the plane tangent to `dir`,
/// and the rotation is taken along it. No-op in 1D.
fn rotational_diffusion<R: Rng + ?Sized>(
    dir: &mut Array1<f64>,
    diffusivity: f64,
    dt: f64,
    rng: &mut R,
) {
    let dim = dir.len();
    if diffusivity == 0.0 || dim < 2 {
        return;
    }
    let std_dev = (2.0 * diffusivity * dt).sqrt();

    let mut kick = Array1::from_shape_fn(dim, |_| {
        let z: f64 = rng.sample(StandardNormal);
        std_dev * z
    });
    let proj = kick.dot(&*dir);
    kick.scaled_add(-proj, &*dir);

    let angle = norm(kick.view());
    if angle == 0.0 {
        return;
    }
    let (sin, cos) = angle.sin_cos();
    *dir *= cos;
    dir.scaled_add(sin / angle, &kick);
    normalize(dir);
}
