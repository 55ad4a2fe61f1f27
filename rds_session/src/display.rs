//! Interfaces to the haploscope hardware.  The session only describes what each eye should see on
//! a frame; drawing, buffer flips and keyboard handling belong to the implementations.

use rds::RdsField;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Eye {
  Left,
  Right,
}

/// Nonius line segments `(start, end)` in cm.  The left eye sees a bar above fixation, the right
/// eye one below; with a correct haploscope offset they fuse into one straight vertical line.
pub const NONIUS_LEFT: ([f64; 2], [f64; 2]) = ([0., 1.5], [0., 2.5]);
pub const NONIUS_RIGHT: ([f64; 2], [f64; 2]) = ([0., -1.5], [0., -2.5]);

pub const QUESTION_TEXT: &str = "Was the cylinder:\n[1] Squashed\n[2] Stretched";

/// Dot positions for both eyes, in cm relative to fixation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StereoDots {
  pub left: Vec<[f64; 2]>,
  pub right: Vec<[f64; 2]>,
  pub dot_size_cm: f64,
}

impl StereoDots {
  pub fn from_field(field: &RdsField, dot_size_cm: f64) -> Self {
    StereoDots {
      left: field.left_xys().collect(),
      right: field.right_xys().collect(),
      dot_size_cm,
    }
  }

  /// Shows the left eye's positions to both eyes, guaranteeing zero disparity.
  pub fn fused(field: &RdsField, dot_size_cm: f64) -> Self {
    let positions: Vec<[f64; 2]> = field.left_xys().collect();
    StereoDots {
      right: positions.clone(),
      left: positions,
      dot_size_cm,
    }
  }

  pub fn len(&self) -> usize { self.left.len() }

  pub fn is_empty(&self) -> bool { self.left.is_empty() }

  pub fn for_eye(&self, eye: Eye) -> &[[f64; 2]] {
    match eye {
      Eye::Left => &self.left,
      Eye::Right => &self.right,
    }
  }
}

/// Contents of one binocular frame.  Both eyes always get the same layers; only the dot positions
/// and nonius bar differ per eye.
#[derive(Clone, Copy, Debug, Default)]
pub struct StereoFrame<'a> {
  pub fixation: bool,
  pub nonius: bool,
  pub question: bool,
  pub dots: Option<&'a StereoDots>,
}

pub trait StereoDisplay {
  /// Measured refresh rate of one eye's panel in Hz, or `None` if it couldn't be measured.
  fn measure_refresh_hz(&mut self, eye: Eye) -> Option<f64>;

  /// Draws the frame to both panels and blocks until it has been flipped.
  fn present(&mut self, frame: &StereoFrame<'_>);

  fn close(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
  Escape,
  Char(char),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KeyPress {
  pub key: Key,
  /// Seconds since the last [`ResponseSource::reset`].
  pub rt_s: f64,
}

pub trait ResponseSource {
  /// Discards pending key presses and restarts the reaction time clock.
  fn reset(&mut self);

  /// Returns the next pending key press without blocking.
  fn poll(&mut self) -> Option<KeyPress>;
}

#[cfg(test)]
mod tests {
  use common::build_rng;
  use rds::{generate, CylinderSpec, ViewerGeometry};

  use super::*;

  #[test]
  fn fused_dots_are_identical_per_eye() {
    let spec = CylinderSpec::new(5.5, 9.95, 6., 10., 50).unwrap();
    let geom = ViewerGeometry::new(85., 6.5, 70., 0.3).unwrap();
    let field = generate(&spec, &geom, &mut build_rng(8)).unwrap();

    let stereo = StereoDots::from_field(&field, 0.25);
    assert_eq!(stereo.len(), 50);
    assert_ne!(stereo.left, stereo.right);
    assert_eq!(stereo.for_eye(Eye::Left)[3], [field.x_left[3], field.y[3]]);
    assert_eq!(stereo.for_eye(Eye::Right)[3], [field.x_right[3], field.y[3]]);

    let fused = StereoDots::fused(&field, 0.25);
    assert_eq!(fused.left, fused.right);
    assert_eq!(fused.left, stereo.left);
  }
}
