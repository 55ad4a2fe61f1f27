//! Stereo geometry and random-dot-stereogram generation for the Johnston (1991) cylinder
//! paradigm.
//!
//! The pipeline is: sample points uniformly over a circular aperture, lift the ones inside the
//! cylinder's elliptical footprint onto a half-elliptical cylinder bulging toward the observer,
//! project every point into both eyes with a two-pinhole model, and keep only the dots that land
//! on both eyes' screens after the haploscope calibration shift.

pub mod bank;
pub mod cylinder;
pub mod error;
pub mod field;
pub mod geometry;
pub mod projection;
pub mod stats;

pub use bank::DynamicNoise;
pub use cylinder::CylinderSpec;
pub use error::RdsError;
pub use field::{
  generate, generate_with_options, DotSample, GenerationReport, GeneratorOptions, RdsField,
};
pub use geometry::ViewerGeometry;
pub use projection::{project, project_slices, Projection};
pub use stats::DisparityStats;

/// Depth values (cm) of the half-cylinder used in the experiment's conditions.
pub const B_VALUES_CM: [f64; 5] = [3.35, 5.0, 6.65, 8.3, 9.95];
