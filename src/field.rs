use crate::error::{ModelError, ModelResult};
use crate::utils::check_param;
use ndarray::{Array1, ArrayView1, aview1};
use serde::{Deserialize, Serialize};

/// Cubic simulation box `[0, extent)^dim`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    pub extent: f64,
    /// Wrap positions back into the box after every step.
    #[serde(default = "default_periodic")]
    pub periodic: bool,
    #[serde(default)]
    pub field: Field,
}

fn default_periodic() -> bool {
    true
}

impl Domain {
    pub fn validate(&self, dim: usize) -> ModelResult<()> {
        check_param("domain extent", self.extent, f64::MIN_POSITIVE..f64::INFINITY)?;
        self.field.validate(dim)
    }

    pub fn center(&self, dim: usize) -> Array1<f64> {
        Array1::from_elem(dim, self.extent / 2.0)
    }

    /// Map `pos` back into the box if the domain is periodic.
    pub fn wrap(&self, pos: &mut Array1<f64>) {
        if !self.periodic {
            return;
        }
        let extent = self.extent;
        pos.mapv_inplace(|x| {
            let wrapped = x.rem_euclid(extent);
            // Rounding can land tiny negative values exactly on the upper edge.
            if wrapped < extent { wrapped } else { 0.0 }
        });
    }
}

/// Static scalar concentration field.
///
/// Vector parameters are plain lists so they read naturally in TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Field {
    Uniform {
        value: f64,
    },
    /// `base + slope · x`.
    Linear {
        base: f64,
        slope: Vec<f64>,
    },
    /// Gaussian point source.
    Gaussian {
        center: Vec<f64>,
        amplitude: f64,
        width: f64,
    },
}

impl Default for Field {
    fn default() -> Self {
        Field::Uniform { value: 0.0 }
    }
}

impl Field {
    pub fn validate(&self, dim: usize) -> ModelResult<()> {
        let check_len = |name: &str, vec: &[f64]| {
            if vec.len() != dim || vec.iter().any(|x| !x.is_finite()) {
                return Err(ModelError::InvalidConfiguration(format!(
                    "{name} must have {dim} finite components, but is {vec:?}"
                )));
            }
            Ok(())
        };
        match self {
            Field::Uniform { value } => check_param("field value", *value, f64::MIN..=f64::MAX),
            Field::Linear { base, slope } => {
                check_param("field base", *base, f64::MIN..=f64::MAX)?;
                check_len("field slope", slope)
            }
            Field::Gaussian {
                center,
                amplitude,
                width,
            } => {
                check_len("source center", center)?;
                check_param("source amplitude", *amplitude, f64::MIN..=f64::MAX)?;
                check_param("source width", *width, f64::MIN_POSITIVE..f64::INFINITY)
            }
        }
    }

    /// Concentration at `pos`.
    pub fn sample(&self, pos: ArrayView1<f64>) -> f64 {
        match self {
            Field::Uniform { value } => *value,
            Field::Linear { base, slope } => base + aview1(slope).dot(&pos),
            Field::Gaussian {
                center,
                amplitude,
                width,
            } => {
                let offset = &pos - &aview1(center);
                amplitude * (-offset.dot(&offset) / (2.0 * width * width)).exp()
            }
        }
    }
}
