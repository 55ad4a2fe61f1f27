//! Binocular pinhole projection onto a frontoparallel screen.
//!
//! Coordinates are in cm.  The screen is the `z = 0` plane at `distance_cm` from the eyes, which
//! sit at `x = ±iod / 2`.  Positive `z` moves a point off the screen toward the observer.

use crate::error::{require_positive, RdsError};

/// Minimum distance from the eye plane that a point is allowed to have.  Points closer than this
/// (or behind the eyes) are clamped so the projection never divides by zero or flips sign.
pub const MIN_DEPTH_FROM_EYE_CM: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
  pub x_left: f64,
  pub x_right: f64,
  /// Horizontal separation of the two projections, positive for points in front of the screen
  /// (crossed disparity).
  pub disparity_cm: f64,
  /// `disparity_cm / distance_cm`; the small-angle approximation of the disparity angle.
  pub disparity_rad: f64,
  /// Johnston's closed-form prediction `iod * z / (D^2 - z^2)`, computed independently of the
  /// projected coordinates.
  pub disparity_formula_rad: f64,
}

/// Projects the point at lateral offset `x_cm` and depth `z_cm` into both eyes.
///
/// Total for any finite input.  A point on the screen plane (`z_cm == 0`) projects to exactly
/// `x_cm` in both eyes with all three disparities exactly zero.
#[inline]
pub fn project(x_cm: f64, z_cm: f64, distance_cm: f64, iod_cm: f64) -> Projection {
  let half = iod_cm / 2.;
  let depth_from_eye = (distance_cm - z_cm).max(MIN_DEPTH_FROM_EYE_CM);
  let scale = distance_cm / depth_from_eye;

  // Equivalent to `-half + scale * (x + half)` and `half + scale * (x - half)`, but written so
  // that `scale == 1` reproduces `x` bit-for-bit.
  let eye_shift = half * (scale - 1.);
  let x_left = scale * x_cm + eye_shift;
  let x_right = scale * x_cm - eye_shift;

  let disparity_cm = x_left - x_right;
  let disparity_rad = disparity_cm / distance_cm;

  let safe_z = z_cm.min(distance_cm - MIN_DEPTH_FROM_EYE_CM);
  let disparity_formula_rad = (iod_cm * safe_z) / (distance_cm * distance_cm - safe_z * safe_z);

  Projection {
    x_left,
    x_right,
    disparity_cm,
    disparity_rad,
    disparity_formula_rad,
  }
}

/// Column-oriented output of [`project_slices`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProjectedBatch {
  pub x_left: Vec<f64>,
  pub x_right: Vec<f64>,
  pub disparity_cm: Vec<f64>,
  pub disparity_rad: Vec<f64>,
  pub disparity_formula_rad: Vec<f64>,
}

impl ProjectedBatch {
  pub fn with_capacity(capacity: usize) -> Self {
    ProjectedBatch {
      x_left: Vec::with_capacity(capacity),
      x_right: Vec::with_capacity(capacity),
      disparity_cm: Vec::with_capacity(capacity),
      disparity_rad: Vec::with_capacity(capacity),
      disparity_formula_rad: Vec::with_capacity(capacity),
    }
  }

  pub fn push(&mut self, p: Projection) {
    self.x_left.push(p.x_left);
    self.x_right.push(p.x_right);
    self.disparity_cm.push(p.disparity_cm);
    self.disparity_rad.push(p.disparity_rad);
    self.disparity_formula_rad.push(p.disparity_formula_rad);
  }

  pub fn len(&self) -> usize { self.x_left.len() }

  pub fn is_empty(&self) -> bool { self.x_left.is_empty() }
}

/// Element-wise [`project`] over paired `x`/`z` slices.
pub fn project_slices(
  xs: &[f64],
  zs: &[f64],
  distance_cm: f64,
  iod_cm: f64,
) -> Result<ProjectedBatch, RdsError> {
  require_positive("distance_cm", distance_cm)?;
  require_positive("iod_cm", iod_cm)?;
  if xs.len() != zs.len() {
    return Err(RdsError::LengthMismatch {
      x_len: xs.len(),
      z_len: zs.len(),
    });
  }

  let mut out = ProjectedBatch::with_capacity(xs.len());
  for (&x, &z) in xs.iter().zip(zs) {
    out.push(project(x, z, distance_cm, iod_cm));
  }
  Ok(out)
}
