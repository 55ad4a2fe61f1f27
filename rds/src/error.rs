use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum RdsError {
  #[error("invalid parameter `{name}` = {value}: {reason}")]
  InvalidParameter {
    name: &'static str,
    value: f64,
    reason: &'static str,
  },
  #[error("mismatched input lengths: {x_len} x values but {z_len} z values")]
  LengthMismatch { x_len: usize, z_len: usize },
  /// Raised when the bounds check rejects every candidate for too long, which means the aperture,
  /// screen width and haploscope offset leave no point visible to both eyes.
  #[error(
    "no candidate dot was visible to both eyes in {empty_batches} consecutive batches \
     ({collected} dots collected); the aperture, screen width and haploscope offset are \
     incompatible"
  )]
  Unsatisfiable {
    empty_batches: usize,
    collected: usize,
  },
}

impl RdsError {
  #[cold]
  pub(crate) fn invalid(name: &'static str, value: f64, reason: &'static str) -> Self {
    RdsError::InvalidParameter {
      name,
      value,
      reason,
    }
  }
}

/// Fails unless `value` is finite and strictly positive.
pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<(), RdsError> {
  if !value.is_finite() {
    return Err(RdsError::invalid(name, value, "must be finite"));
  }
  if value <= 0. {
    return Err(RdsError::invalid(name, value, "must be > 0"));
  }
  Ok(())
}
