use crate::error::{require_positive, RdsError};

/// Per-trial stimulus parameters for a half-elliptical cylinder seen through a circular aperture.
///
/// The cylinder's axis is vertical.  Its footprint on the screen is the ellipse with semi-axes
/// `a_cm` (horizontal) and `y_semi_cm` (vertical); its cross-section bulges `b_cm` toward the
/// observer at the center.  `b_cm == 0` yields a flat field on the screen plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CylinderSpec {
  pub a_cm: f64,
  pub b_cm: f64,
  pub y_semi_cm: f64,
  pub aperture_radius_cm: f64,
  pub n_dots: usize,
}

impl CylinderSpec {
  pub fn new(
    a_cm: f64,
    b_cm: f64,
    y_semi_cm: f64,
    aperture_radius_cm: f64,
    n_dots: usize,
  ) -> Result<Self, RdsError> {
    let spec = CylinderSpec {
      a_cm,
      b_cm,
      y_semi_cm,
      aperture_radius_cm,
      n_dots,
    };
    spec.validate()?;
    Ok(spec)
  }

  pub fn validate(&self) -> Result<(), RdsError> {
    require_positive("a_cm", self.a_cm)?;
    require_positive("y_semi_cm", self.y_semi_cm)?;
    require_positive("aperture_radius_cm", self.aperture_radius_cm)?;
    if !self.b_cm.is_finite() || self.b_cm < 0. {
      return Err(RdsError::invalid("b_cm", self.b_cm, "must be finite and >= 0"));
    }
    if self.n_dots == 0 {
      return Err(RdsError::invalid("n_dots", 0., "must be > 0"));
    }
    Ok(())
  }

  /// Same cylinder with a different depth, e.g. `b_cm = 0` for the zero-disparity fusion prime.
  pub fn with_depth(&self, b_cm: f64) -> Self { CylinderSpec { b_cm, ..*self } }

  pub fn in_footprint(&self, x: f64, y: f64) -> bool {
    let nx = x / self.a_cm;
    let ny = y / self.y_semi_cm;
    nx * nx + ny * ny <= 1.
  }

  /// Height of the surface above the screen plane at `(x, y)`.  Points outside the footprint are
  /// backdrop dots lying on the screen.
  pub fn surface_height(&self, x: f64, y: f64) -> f64 {
    if !self.in_footprint(x, y) {
      return 0.;
    }
    let nx = x / self.a_cm;
    self.b_cm * (1. - nx * nx).max(0.).sqrt()
  }
}
