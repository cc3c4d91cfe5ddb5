use crate::error::{ModelError, ModelResult};
use anyhow::{Result, bail};
use ndarray::{Array1, ArrayView1};
use rand::Rng;
use rand_distr::StandardNormal;
use std::{fmt::Debug, ops::RangeBounds};

pub fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

/// Range check for model parameters, failing with [`ModelError::InvalidConfiguration`].
pub fn check_param<T, R>(name: &str, num: T, range: R) -> ModelResult<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        return Err(ModelError::InvalidConfiguration(format!(
            "{name} must be in the range {range:?}, but is {num:?}"
        )));
    }
    Ok(())
}

pub fn check_dim(dim: usize) -> ModelResult<()> {
    check_param("dimensionality", dim, 1..=3)
}

pub fn norm(vec: ArrayView1<f64>) -> f64 {
    vec.dot(&vec).sqrt()
}

/// Rescale `vec` to unit length in place. Returns `false` if the norm vanishes.
pub fn normalize(vec: &mut Array1<f64>) -> bool {
    let len = norm(vec.view());
    if len == 0.0 || !len.is_finite() {
        return false;
    }
    *vec /= len;
    true
}

fn fill_standard_normal<R: Rng + ?Sized>(vec: &mut Array1<f64>, rng: &mut R) {
    vec.map_inplace(|ele| *ele = rng.sample(StandardNormal));
}

/// Overwrite `dir` with an isotropically distributed unit vector.
///
/// Draws one standard normal per component and normalizes the result,
/// which is uniform on the unit sphere in any dimension (a random sign in 1D).
pub fn fill_random_direction<R: Rng + ?Sized>(dir: &mut Array1<f64>, rng: &mut R) {
    loop {
        fill_standard_normal(dir, rng);
        if normalize(dir) {
            return;
        }
    }
}

pub fn random_direction<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> Array1<f64> {
    let mut dir = Array1::zeros(dim);
    fill_random_direction(&mut dir, rng);
    dir
}

/// Uniformly random unit vector orthogonal to the unit vector `dir`.
///
/// Returns `None` in 1D, where no such vector exists.
pub fn random_perpendicular<R: Rng + ?Sized>(
    dir: ArrayView1<f64>,
    rng: &mut R,
) -> Option<Array1<f64>> {
    if dir.len() < 2 {
        return None;
    }
    let mut perp = Array1::zeros(dir.len());
    loop {
        fill_standard_normal(&mut perp, rng);
        let proj = perp.dot(&dir);
        perp.scaled_add(-proj, &dir);
        if normalize(&mut perp) {
            return Some(perp);
        }
    }
}
