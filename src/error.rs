//! Error types for the motility core.

use thiserror::Error;

/// Errors produced by the motility, chemotaxis and stepping routines.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    /// A parameter was out of range when building a model component.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A filter state or derived rate stopped being finite.
    #[error("numeric divergence: {0}")]
    NumericDivergence(String),
}

pub type ModelResult<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_configuration_includes_message() {
        let err = ModelError::InvalidConfiguration("memory must be positive".into());
        let msg = format!("{err}");
        assert!(msg.contains("memory"), "missing message in: {msg}");
    }

    #[test]
    fn model_error_converts_into_anyhow() {
        fn fails() -> anyhow::Result<()> {
            Err(ModelError::NumericDivergence("turn rate is NaN".into()))?;
            Ok(())
        }
        let msg = format!("{:#}", fails().unwrap_err());
        assert!(msg.contains("turn rate"), "missing message in: {msg}");
    }
}
