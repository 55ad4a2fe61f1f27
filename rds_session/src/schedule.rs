use crate::{
  display::{Eye, StereoDisplay},
  settings::SessionSettings,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RefreshRates {
  pub left_hz: f64,
  pub right_hz: f64,
  pub min_hz: f64,
}

impl RefreshRates {
  /// Measures the left panel, and the right one too if `measure_both` is set; otherwise the right
  /// panel is assumed to match the left.  Failed or nonsensical measurements fall back to
  /// `fallback_hz`.
  pub fn measure(display: &mut impl StereoDisplay, measure_both: bool, fallback_hz: f64) -> Self {
    let mut measure = |eye| match display.measure_refresh_hz(eye) {
      Some(hz) if hz.is_finite() && hz > 0. => hz,
      Some(hz) => {
        warn!("Ignoring bogus {eye:?} refresh measurement of {hz}Hz; using {fallback_hz}Hz");
        fallback_hz
      },
      None => {
        warn!("Couldn't measure {eye:?} refresh rate; using {fallback_hz}Hz");
        fallback_hz
      },
    };

    let left_hz = measure(Eye::Left);
    let right_hz = if measure_both {
      measure(Eye::Right)
    } else {
      left_hz
    };

    RefreshRates {
      left_hz,
      right_hz,
      min_hz: left_hz.min(right_hz),
    }
  }
}

/// Frame counts for each phase at the session's refresh rate.  Everything is timed by frames
/// rather than wall clock so both panels stay in lockstep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSchedule {
  pub stim_frames: usize,
  pub prime_frames: usize,
  pub post_fix_frames: usize,
  pub test_frames: usize,
}

impl FrameSchedule {
  pub fn new(settings: &SessionSettings, refresh_hz: f64) -> Self {
    let rounded = |secs: f64| (secs * refresh_hz).round().max(0.) as usize;
    FrameSchedule {
      stim_frames: rounded(settings.stimulus.duration_s),
      prime_frames: rounded(settings.fusion_prime.duration_s),
      // truncated rather than rounded
      post_fix_frames: (settings.timing.post_fix_s * refresh_hz).max(0.) as usize,
      test_frames: rounded(settings.test_mode.duration_s),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::headless::HeadlessDisplay;

  #[test]
  fn default_schedule_at_60hz() {
    let schedule = FrameSchedule::new(&SessionSettings::default(), 60.);
    assert_eq!(schedule, FrameSchedule {
      stim_frames: 90,
      prime_frames: 24,
      post_fix_frames: 18,
      test_frames: 600,
    });
  }

  #[test]
  fn rounding_rules() {
    let mut settings = SessionSettings::default();
    settings.stimulus.duration_s = 1.5;
    settings.fusion_prime.duration_s = 0.4;
    settings.timing.post_fix_s = 0.3;
    let schedule = FrameSchedule::new(&settings, 59.94);
    // 89.91 rounds up, 23.976 rounds up, 17.982 truncates down
    assert_eq!(schedule.stim_frames, 90);
    assert_eq!(schedule.prime_frames, 24);
    assert_eq!(schedule.post_fix_frames, 17);
  }

  #[test]
  fn refresh_measurement_fallbacks() {
    let mut display = HeadlessDisplay::new(144., false);
    let rates = RefreshRates::measure(&mut display, false, 60.);
    assert_eq!(rates, RefreshRates {
      left_hz: 144.,
      right_hz: 144.,
      min_hz: 144.,
    });

    display.set_refresh(Eye::Right, Some(120.));
    let rates = RefreshRates::measure(&mut display, true, 60.);
    assert_eq!(rates.min_hz, 120.);
    assert_eq!(rates.left_hz, 144.);

    display.set_refresh(Eye::Left, None);
    let rates = RefreshRates::measure(&mut display, false, 60.);
    assert_eq!(rates, RefreshRates {
      left_hz: 60.,
      right_hz: 60.,
      min_hz: 60.,
    });
  }
}
