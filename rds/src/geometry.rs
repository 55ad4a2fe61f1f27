use crate::{
  error::{require_positive, RdsError},
  projection::Projection,
};

/// Viewing geometry of the haploscope, fixed for a session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewerGeometry {
  pub screen_distance_cm: f64,
  pub iod_cm: f64,
  /// Half of the physical width of each eye's panel.
  pub half_width_cm: f64,
  /// Horizontal calibration shift.  The left eye's image moves by `-offset`, the right eye's by
  /// `+offset`.
  pub haploscope_offset_cm: f64,
}

impl ViewerGeometry {
  pub fn new(
    screen_distance_cm: f64,
    iod_cm: f64,
    screen_width_cm: f64,
    haploscope_offset_cm: f64,
  ) -> Result<Self, RdsError> {
    let geom = ViewerGeometry {
      screen_distance_cm,
      iod_cm,
      half_width_cm: screen_width_cm / 2.,
      haploscope_offset_cm,
    };
    geom.validate()?;
    Ok(geom)
  }

  pub fn validate(&self) -> Result<(), RdsError> {
    require_positive("screen_distance_cm", self.screen_distance_cm)?;
    require_positive("iod_cm", self.iod_cm)?;
    require_positive("half_width_cm", self.half_width_cm)?;
    if !self.haploscope_offset_cm.is_finite() {
      return Err(RdsError::invalid(
        "haploscope_offset_cm",
        self.haploscope_offset_cm,
        "must be finite",
      ));
    }
    Ok(())
  }

  /// Copy of this geometry with the calibration shift disabled.  The fusion prime uses it so
  /// that both eyes see the exact same positions regardless of the session's calibration.
  pub fn without_offset(&self) -> Self {
    ViewerGeometry {
      haploscope_offset_cm: 0.,
      ..*self
    }
  }

  pub fn project(&self, x_cm: f64, z_cm: f64) -> Projection {
    crate::projection::project(x_cm, z_cm, self.screen_distance_cm, self.iod_cm)
  }

  /// Applies the haploscope shift to a projection in place.  Disparities are left untouched since
  /// they describe the simulated surface, not the calibration.
  pub fn apply_offset(&self, p: &mut Projection) {
    if self.haploscope_offset_cm != 0. {
      p.x_left -= self.haploscope_offset_cm;
      p.x_right += self.haploscope_offset_cm;
    }
  }

  /// Whether a (shifted) projection lands on both eyes' panels.  Dots seen by only one eye would
  /// appear as monocular ghosts and break fusion.
  pub fn visible_to_both(&self, p: &Projection) -> bool {
    p.x_left.abs() <= self.half_width_cm && p.x_right.abs() <= self.half_width_cm
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn offset_is_equal_and_opposite() {
    let geom = ViewerGeometry::new(85., 6.5, 70., 0.3).unwrap();
    let mut p = geom.project(1., 0.);
    geom.apply_offset(&mut p);
    assert!((p.x_left - 0.7).abs() < 1e-12);
    assert!((p.x_right - 1.3).abs() < 1e-12);
    assert_eq!(p.disparity_cm, 0.);

    let mut q = geom.without_offset().project(1., 0.);
    geom.without_offset().apply_offset(&mut q);
    assert_eq!(q.x_left, q.x_right);
  }

  #[test]
  fn visibility_requires_both_eyes() {
    let geom = ViewerGeometry::new(85., 6.5, 10., 0.).unwrap();
    let inside = geom.project(4.9, 0.);
    assert!(geom.visible_to_both(&inside));

    let edge = geom.project(5., 0.);
    assert!(geom.visible_to_both(&edge));

    // near the edge, a raised point projects off the left eye's panel
    let raised = geom.project(4.9, 8.);
    assert!(raised.x_left > 5.);
    assert!(!geom.visible_to_both(&raised));
  }

  #[test]
  fn rejects_invalid_geometry() {
    assert!(ViewerGeometry::new(0., 6.5, 70., 0.).is_err());
    assert!(ViewerGeometry::new(85., 0., 70., 0.).is_err());
    assert!(ViewerGeometry::new(85., 6.5, -1., 0.).is_err());
    assert!(ViewerGeometry::new(85., 6.5, 70., f64::NAN).is_err());
    assert!(ViewerGeometry::new(85., 6.5, 70., -0.25).is_ok());
  }
}
