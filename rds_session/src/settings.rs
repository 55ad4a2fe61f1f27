use std::path::PathBuf;

use foundations::settings::settings;
use rds::{CylinderSpec, GeneratorOptions, RdsError, ViewerGeometry, B_VALUES_CM};
use serde_default_utils::*;

use crate::error::SessionError;

fn default_participant() -> String { "anonymous".to_owned() }
fn default_session() -> String { "1".to_owned() }
fn default_exp_name() -> String { "JohnstonRDS".to_owned() }
fn default_data_dir() -> PathBuf { PathBuf::from("data") }

fn default_screen_distance_cm() -> f64 { 85. }
fn default_screen_width_cm() -> f64 { 70. }
fn default_iod_cm() -> f64 { 6.5 }
fn default_dot_size_cm() -> f64 { 0.25 }

fn default_a_cm() -> f64 { 5.5 }
fn default_b_values_cm() -> Vec<f64> { B_VALUES_CM.to_vec() }
fn default_half_height_cm() -> f64 { 6. }
fn default_aperture_radius_cm() -> f64 { 10. }
fn default_stim_duration_s() -> f64 { 1.5 }

fn default_prime_duration_s() -> f64 { 0.4 }
fn default_test_duration_s() -> f64 { 10. }
fn default_test_b_cm() -> f64 { 9.95 }
fn default_post_fix_s() -> f64 { 0.3 }
fn default_refresh_hz() -> f64 { 60. }

#[settings]
pub struct SessionInfoSettings {
  /// Participant identifier.  Becomes part of the data file names.
  #[serde(default = "default_participant")]
  pub participant: String,
  /// Session label.
  #[serde(default = "default_session")]
  pub session: String,
}

/// Physical measurements of the haploscope, entered per participant.
#[settings]
pub struct CalibrationSettings {
  /// Horizontal calibration shift (cm).  Tweak by ±0.1–0.3 until the nonius bars line up.
  pub haploscope_offset_cm: f64,
  /// Distance from the eyes to each screen (cm).
  #[serde(default = "default_screen_distance_cm")]
  pub screen_distance_cm: f64,
  /// Measured physical width of EACH panel (cm).
  #[serde(default = "default_screen_width_cm")]
  pub screen_width_cm: f64,
  /// Interocular distance (cm).
  #[serde(default = "default_iod_cm")]
  pub interocular_distance_cm: f64,
  /// Rendered dot diameter (cm).  Bigger dots are easier to fuse.
  #[serde(default = "default_dot_size_cm")]
  pub dot_size_cm: f64,
}

#[settings]
pub struct StimulusSettings {
  /// Cylinder half-width (cm).
  #[serde(default = "default_a_cm")]
  pub a_cm: f64,
  /// Cylinder depths (cm), one condition each.
  #[serde(default = "default_b_values_cm")]
  pub b_values_cm: Vec<f64>,
  /// How many times each condition is repeated.
  #[serde(default = "default_usize::<3>")]
  pub n_reps: usize,
  #[serde(default = "default_usize::<1500>")]
  pub n_dots: usize,
  /// Cylinder half-height (cm).
  #[serde(default = "default_half_height_cm")]
  pub half_height_cm: f64,
  /// Radius of the dot field (cm).
  #[serde(default = "default_aperture_radius_cm")]
  pub aperture_radius_cm: f64,
  #[serde(default = "default_stim_duration_s")]
  pub duration_s: f64,
}

/// Brief zero-disparity dot field before each trial to lock vergence.
#[settings]
pub struct FusionPrimeSettings {
  #[serde(default = "default_bool::<true>")]
  pub enabled: bool,
  #[serde(default = "default_prime_duration_s")]
  pub duration_s: f64,
}

/// Cycles a bank of freshly generated fields during the stimulus instead of showing one static
/// field.
#[settings]
pub struct DynamicNoiseSettings {
  pub enabled: bool,
  /// Switch to the next field every N frames.
  #[serde(default = "default_usize::<2>")]
  pub update_every: usize,
  #[serde(default = "default_usize::<12>")]
  pub bank_size: usize,
}

/// Alignment bars shown above (left eye) and below (right eye) fixation.
#[settings]
pub struct NoniusSettings {
  #[serde(default = "default_bool::<true>")]
  pub enabled: bool,
}

/// Shows a strongly convex cylinder with nonius bars before the trials so the rig mapping and
/// calibration can be checked.
#[settings]
pub struct TestModeSettings {
  #[serde(default = "default_bool::<true>")]
  pub enabled: bool,
  #[serde(default = "default_test_duration_s")]
  pub duration_s: f64,
  #[serde(default = "default_test_b_cm")]
  pub b_cm: f64,
}

#[settings]
pub struct TimingSettings {
  /// Fixation-only pause between stimulus and question (s).
  #[serde(default = "default_post_fix_s")]
  pub post_fix_s: f64,
  /// Measure both panels instead of assuming the right one matches the left.
  pub measure_both_refresh: bool,
  /// Used when a panel's refresh rate can't be measured.
  #[serde(default = "default_refresh_hz")]
  pub fallback_refresh_hz: f64,
}

#[settings]
pub struct GeneratorSettings {
  /// Consecutive batches without a single visible dot before generation is abandoned.
  #[serde(default = "default_usize::<1000>")]
  pub max_empty_batches: usize,
}

#[settings]
pub struct OutputSettings {
  #[serde(default = "default_data_dir")]
  pub data_dir: PathBuf,
  #[serde(default = "default_exp_name")]
  pub exp_name: String,
}

/// Display used by the CLI when no real haploscope is attached.
#[settings]
pub struct HeadlessSettings {
  #[serde(default = "default_refresh_hz")]
  pub refresh_hz: f64,
  /// Sleep between frames so phases take their real duration.
  #[serde(default = "default_bool::<true>")]
  pub pace_frames: bool,
}

#[settings]
pub struct SessionSettings {
  pub info: SessionInfoSettings,
  pub calibration: CalibrationSettings,
  pub stimulus: StimulusSettings,
  pub fusion_prime: FusionPrimeSettings,
  pub dynamic_noise: DynamicNoiseSettings,
  pub nonius: NoniusSettings,
  pub test_mode: TestModeSettings,
  pub timing: TimingSettings,
  pub generator: GeneratorSettings,
  pub output: OutputSettings,
  pub headless: HeadlessSettings,
  /// Seed for dot sampling and trial order.  A fresh seed is drawn from the OS when unset.
  pub rng_seed: Option<u64>,
}

fn require_non_negative(name: &'static str, value: f64) -> Result<(), SessionError> {
  if !value.is_finite() || value < 0. {
    return Err(SessionError::InvalidSetting {
      name,
      reason: format!("must be a finite value >= 0, found {value}"),
    });
  }
  Ok(())
}

impl SessionSettings {
  pub fn viewer_geometry(&self) -> Result<ViewerGeometry, RdsError> {
    let c = &self.calibration;
    ViewerGeometry::new(
      c.screen_distance_cm,
      c.interocular_distance_cm,
      c.screen_width_cm,
      c.haploscope_offset_cm,
    )
  }

  pub fn cylinder_spec(&self, b_cm: f64) -> Result<CylinderSpec, RdsError> {
    let s = &self.stimulus;
    CylinderSpec::new(
      s.a_cm,
      b_cm,
      s.half_height_cm,
      s.aperture_radius_cm,
      s.n_dots,
    )
  }

  pub fn generator_options(&self) -> GeneratorOptions {
    GeneratorOptions {
      max_empty_batches: self.generator.max_empty_batches.max(1),
    }
  }

  /// Checks everything a session needs before any window is opened.
  pub fn validate(&self) -> Result<(), SessionError> {
    self.viewer_geometry()?;
    if self.stimulus.b_values_cm.is_empty() {
      return Err(SessionError::InvalidSetting {
        name: "stimulus.b_values_cm",
        reason: "at least one depth condition is required".to_owned(),
      });
    }
    for &b_cm in &self.stimulus.b_values_cm {
      self.cylinder_spec(b_cm)?;
    }
    if self.test_mode.enabled {
      self.cylinder_spec(self.test_mode.b_cm)?;
    }
    if self.stimulus.n_reps == 0 {
      return Err(SessionError::InvalidSetting {
        name: "stimulus.n_reps",
        reason: "must be >= 1".to_owned(),
      });
    }
    if !(self.calibration.dot_size_cm > 0.) || !self.calibration.dot_size_cm.is_finite() {
      return Err(SessionError::InvalidSetting {
        name: "calibration.dot_size_cm",
        reason: format!("must be > 0, found {}", self.calibration.dot_size_cm),
      });
    }
    if !(self.timing.fallback_refresh_hz > 0.) || !self.timing.fallback_refresh_hz.is_finite() {
      return Err(SessionError::InvalidSetting {
        name: "timing.fallback_refresh_hz",
        reason: format!("must be > 0, found {}", self.timing.fallback_refresh_hz),
      });
    }

    require_non_negative("stimulus.duration_s", self.stimulus.duration_s)?;
    require_non_negative("fusion_prime.duration_s", self.fusion_prime.duration_s)?;
    require_non_negative("test_mode.duration_s", self.test_mode.duration_s)?;
    require_non_negative("timing.post_fix_s", self.timing.post_fix_s)?;
    Ok(())
  }
}
