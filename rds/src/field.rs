use log::{debug, warn};
use nalgebra::Point2;
use rand::Rng;

use crate::{
  cylinder::CylinderSpec, error::RdsError, geometry::ViewerGeometry, projection::Projection,
  stats::DisparityStats,
};

/// Candidates drawn per batch relative to the number of dots still missing.  Only affects
/// throughput; the loop keeps drawing batches until the field is full.
pub const OVERSAMPLE_FACTOR: f64 = 1.6;
pub const MIN_BATCH_SIZE: usize = 64;
pub const DEFAULT_MAX_EMPTY_BATCHES: usize = 1000;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeneratorOptions {
  /// Number of consecutive batches allowed to keep zero dots before giving up with
  /// [`RdsError::Unsatisfiable`].
  pub max_empty_batches: usize,
}

impl Default for GeneratorOptions {
  fn default() -> Self {
    GeneratorOptions {
      max_empty_batches: DEFAULT_MAX_EMPTY_BATCHES,
    }
  }
}

/// One candidate dot: its position on the aperture disk, the surface height there, and its
/// projection into both eyes (haploscope shift already applied).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DotSample {
  pub position: Point2<f64>,
  pub z_cm: f64,
  pub projection: Projection,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerationReport {
  pub batches: usize,
  pub candidates: usize,
  pub rejected: usize,
}

/// A complete random-dot stereogram.  All six columns have the same length and are paired by
/// index; `y` is shared by both eyes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RdsField {
  pub x_left: Vec<f64>,
  pub x_right: Vec<f64>,
  pub y: Vec<f64>,
  pub disparity_cm: Vec<f64>,
  pub disparity_rad: Vec<f64>,
  pub disparity_formula_rad: Vec<f64>,
  pub report: GenerationReport,
}

impl RdsField {
  fn with_capacity(capacity: usize) -> Self {
    RdsField {
      x_left: Vec::with_capacity(capacity),
      x_right: Vec::with_capacity(capacity),
      y: Vec::with_capacity(capacity),
      disparity_cm: Vec::with_capacity(capacity),
      disparity_rad: Vec::with_capacity(capacity),
      disparity_formula_rad: Vec::with_capacity(capacity),
      report: GenerationReport::default(),
    }
  }

  fn push(&mut self, sample: &DotSample) {
    let p = &sample.projection;
    self.x_left.push(p.x_left);
    self.x_right.push(p.x_right);
    self.y.push(sample.position.y);
    self.disparity_cm.push(p.disparity_cm);
    self.disparity_rad.push(p.disparity_rad);
    self.disparity_formula_rad.push(p.disparity_formula_rad);
  }

  fn truncate(&mut self, len: usize) {
    self.x_left.truncate(len);
    self.x_right.truncate(len);
    self.y.truncate(len);
    self.disparity_cm.truncate(len);
    self.disparity_rad.truncate(len);
    self.disparity_formula_rad.truncate(len);
  }

  pub fn len(&self) -> usize { self.x_left.len() }

  pub fn is_empty(&self) -> bool { self.x_left.is_empty() }

  /// `(x, y)` positions for the left eye's display.
  pub fn left_xys(&self) -> impl Iterator<Item = [f64; 2]> + '_ {
    self.x_left.iter().zip(&self.y).map(|(&x, &y)| [x, y])
  }

  /// `(x, y)` positions for the right eye's display.
  pub fn right_xys(&self) -> impl Iterator<Item = [f64; 2]> + '_ {
    self.x_right.iter().zip(&self.y).map(|(&x, &y)| [x, y])
  }

  pub fn stats(&self) -> DisparityStats { DisparityStats::from_field(self) }
}

/// Size of the next batch of candidates given how many dots are still missing.
pub fn batch_size(remaining: usize) -> usize {
  ((remaining as f64 * OVERSAMPLE_FACTOR).ceil() as usize).max(MIN_BATCH_SIZE)
}

/// Samples a point uniformly by area over a disk of `radius` centered at the origin.
pub fn sample_disk<R: Rng + ?Sized>(rng: &mut R, radius: f64) -> Point2<f64> {
  let theta = rng.gen::<f64>() * std::f64::consts::TAU;
  // sqrt keeps the areal density uniform; a uniform radius would crowd the center
  let r = radius * rng.gen::<f64>().sqrt();
  Point2::new(r * theta.cos(), r * theta.sin())
}

/// Draws one candidate dot, lifts it onto the cylinder and projects it into both eyes.
pub fn sample_candidate<R: Rng + ?Sized>(
  rng: &mut R,
  spec: &CylinderSpec,
  geom: &ViewerGeometry,
) -> DotSample {
  let position = sample_disk(rng, spec.aperture_radius_cm);
  let z_cm = spec.surface_height(position.x, position.y);
  let mut projection = geom.project(position.x, z_cm);
  geom.apply_offset(&mut projection);
  DotSample {
    position,
    z_cm,
    projection,
  }
}

/// Generates a field of exactly `spec.n_dots` dots visible to both eyes.
pub fn generate<R: Rng + ?Sized>(
  spec: &CylinderSpec,
  geom: &ViewerGeometry,
  rng: &mut R,
) -> Result<RdsField, RdsError> {
  generate_with_options(spec, geom, &GeneratorOptions::default(), rng)
}

pub fn generate_with_options<R: Rng + ?Sized>(
  spec: &CylinderSpec,
  geom: &ViewerGeometry,
  opts: &GeneratorOptions,
  rng: &mut R,
) -> Result<RdsField, RdsError> {
  spec.validate()?;
  geom.validate()?;

  let n = spec.n_dots;
  let mut field = RdsField::with_capacity(n + batch_size(n));
  let mut report = GenerationReport::default();
  let mut empty_batches = 0usize;

  while field.len() < n {
    let batch = batch_size(n - field.len());
    report.batches += 1;
    report.candidates += batch;

    let mut kept = 0usize;
    for _ in 0..batch {
      let sample = sample_candidate(rng, spec, geom);
      if geom.visible_to_both(&sample.projection) {
        field.push(&sample);
        kept += 1;
      }
    }
    report.rejected += batch - kept;

    if kept > 0 {
      empty_batches = 0;
      continue;
    }

    empty_batches += 1;
    if empty_batches >= opts.max_empty_batches {
      warn!(
        "Giving up on RDS generation after {empty_batches} empty batches; collected {} of {n} \
         dots (half_width={}, offset={}, aperture={})",
        field.len(),
        geom.half_width_cm,
        geom.haploscope_offset_cm,
        spec.aperture_radius_cm
      );
      return Err(RdsError::Unsatisfiable {
        empty_batches,
        collected: field.len(),
      });
    }
  }

  field.truncate(n);
  field.report = report;
  debug!(
    "Generated RDS with {n} dots for b={}cm in {} batches ({} of {} candidates rejected)",
    spec.b_cm, report.batches, report.rejected, report.candidates
  );

  Ok(field)
}
