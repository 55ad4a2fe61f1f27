use common::{mean, std_dev};

use crate::field::RdsField;

/// Per-field disparity summary written to the trial log.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DisparityStats {
  pub disparity_mean_cm: f64,
  /// Population standard deviation.
  pub disparity_std_cm: f64,
  pub disparity_angle_mean_deg: f64,
  /// Mean of `small-angle - closed-form` disparity.  Tracks how far the small-angle approximation
  /// drifts from Johnston's analytic formula for the depths in use.
  pub model_difference_mean_rad: f64,
}

impl DisparityStats {
  pub fn from_field(field: &RdsField) -> Self {
    let differences: Vec<f64> = field
      .disparity_rad
      .iter()
      .zip(&field.disparity_formula_rad)
      .map(|(small_angle, formula)| small_angle - formula)
      .collect();

    DisparityStats {
      disparity_mean_cm: mean(&field.disparity_cm),
      disparity_std_cm: std_dev(&field.disparity_cm),
      disparity_angle_mean_deg: mean(&field.disparity_rad).to_degrees(),
      model_difference_mean_rad: mean(&differences),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn summarizes_columns() {
    let field = RdsField {
      disparity_cm: vec![0., 0.5, 1.],
      disparity_rad: vec![0., 0.01, 0.02],
      disparity_formula_rad: vec![0., 0.009, 0.018],
      ..Default::default()
    };
    let stats = DisparityStats::from_field(&field);
    assert!((stats.disparity_mean_cm - 0.5).abs() < 1e-12);
    assert!((stats.disparity_std_cm - (1f64 / 6.).sqrt()).abs() < 1e-12);
    assert!((stats.disparity_angle_mean_deg - 0.01 * 180. / std::f64::consts::PI).abs() < 1e-12);
    assert!((stats.model_difference_mean_rad - 0.001).abs() < 1e-12);
  }

  #[test]
  fn flat_field_is_all_zero() {
    let field = RdsField {
      disparity_cm: vec![0.; 8],
      disparity_rad: vec![0.; 8],
      disparity_formula_rad: vec![0.; 8],
      ..Default::default()
    };
    assert_eq!(DisparityStats::from_field(&field), DisparityStats::default());
  }
}
