use std::{path::PathBuf, sync::Arc};

use common::rand_pcg::Pcg32;
use rds::{
  generate_with_options, CylinderSpec, DisparityStats, DynamicNoise, GenerationReport,
  GeneratorOptions, RdsField, ViewerGeometry,
};

use crate::{
  display::{Key, KeyPress, ResponseSource, StereoDisplay, StereoDots, StereoFrame},
  error::SessionError,
  lifecycle::{Lifecycle, SessionState},
  metrics::rds_session as session_metrics,
  record::{DataLog, ResponseLabel, SessionInfo, TrialRecord},
  schedule::{FrameSchedule, RefreshRates},
  settings::SessionSettings,
  trials::{Trial, TrialPlan},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
  Completed { trials: usize },
  Aborted { trials: usize },
}

fn record_generation(report: &GenerationReport) {
  session_metrics::generator_batches_total().inc_by(report.batches as u64);
  session_metrics::dots_rejected_total().inc_by(report.rejected as u64);
}

/// Runs the experiment: optional test mode, then for every trial a fusion prime, the cylinder
/// stimulus, a short fixation pause and the squashed/stretched question.
pub struct Session<'a, D: StereoDisplay, R: ResponseSource> {
  settings: &'a SessionSettings,
  geom: ViewerGeometry,
  opts: GeneratorOptions,
  display: D,
  responses: R,
  rng: Pcg32,
  lifecycle: Arc<Lifecycle>,
  log: DataLog,
  refresh: RefreshRates,
  schedule: FrameSchedule,
  saved_to: Option<(PathBuf, PathBuf)>,
}

impl<'a, D: StereoDisplay, R: ResponseSource> Session<'a, D, R> {
  pub fn new(
    settings: &'a SessionSettings,
    info: SessionInfo,
    mut display: D,
    responses: R,
    rng: Pcg32,
  ) -> Result<Self, SessionError> {
    settings.validate()?;
    let geom = settings.viewer_geometry()?;

    let refresh = RefreshRates::measure(
      &mut display,
      settings.timing.measure_both_refresh,
      settings.timing.fallback_refresh_hz,
    );
    let schedule = FrameSchedule::new(settings, refresh.min_hz);
    info!(
      "Refresh L:{:.2}Hz R:{:.2}Hz -> scheduling {} frames ({:.2}s)",
      refresh.left_hz, refresh.right_hz, schedule.stim_frames, settings.stimulus.duration_s
    );

    Ok(Session {
      settings,
      geom,
      opts: settings.generator_options(),
      display,
      responses,
      rng,
      lifecycle: Arc::new(Lifecycle::new()),
      log: DataLog::new(info),
      refresh,
      schedule,
      saved_to: None,
    })
  }

  /// Handle for stopping the session from elsewhere.  The session notices between frames.
  pub fn lifecycle(&self) -> Arc<Lifecycle> { Arc::clone(&self.lifecycle) }

  pub fn refresh(&self) -> RefreshRates { self.refresh }

  pub fn schedule(&self) -> FrameSchedule { self.schedule }

  pub fn data(&self) -> &DataLog { &self.log }

  pub fn display(&self) -> &D { &self.display }

  pub fn responses(&self) -> &R { &self.responses }

  /// Where the data files were written, once the session has terminated successfully.
  pub fn saved_to(&self) -> Option<&(PathBuf, PathBuf)> { self.saved_to.as_ref() }

  /// Runs every phase of the session and terminates it afterwards, however it ended.
  pub fn run(&mut self) -> Result<SessionOutcome, SessionError> {
    let outcome = match self.run_phases() {
      Ok(outcome) => outcome,
      Err(err) => {
        error!("Session failed after {} trials: {err}", self.log.len());
        self.terminate();
        return Err(err);
      },
    };

    if let SessionOutcome::Aborted { trials } = outcome {
      warn!("Session aborted after {trials} trials");
      session_metrics::sessions_aborted_total().inc();
    }
    self.terminate();
    Ok(outcome)
  }

  /// Saves the data collected so far and closes the display.  Safe to call any number of times;
  /// only the first call does anything.
  pub fn terminate(&mut self) {
    self.lifecycle.terminate();
    if self.lifecycle.state() == SessionState::Closed {
      return;
    }

    match self.log.save(&self.settings.output.data_dir) {
      Ok((csv_path, snapshot_path)) => {
        info!(
          "Saved {} trials to {} and {}",
          self.log.len(),
          csv_path.display(),
          snapshot_path.display()
        );
        self.saved_to = Some((csv_path, snapshot_path));
      },
      Err(err) => error!("Failed to save session data: {err}"),
    }
    self.display.close();
    self.lifecycle.close();
  }

  fn run_phases(&mut self) -> Result<SessionOutcome, SessionError> {
    if self.settings.test_mode.enabled && !self.run_test_mode()? {
      return Ok(SessionOutcome::Aborted {
        trials: self.log.len(),
      });
    }

    let stimulus = &self.settings.stimulus;
    let plan = TrialPlan::randomized(&stimulus.b_values_cm, stimulus.n_reps, &mut self.rng);
    info!("Running {} trials", plan.len());

    for trial in plan.iter() {
      let Some(record) = self.run_trial(trial)? else {
        return Ok(SessionOutcome::Aborted {
          trials: self.log.len(),
        });
      };
      self.log.push(record);
    }

    Ok(SessionOutcome::Completed {
      trials: self.log.len(),
    })
  }

  /// Presents one frame and collects the key presses that arrived with it.  Returns `None` if the
  /// session has to stop.
  fn flip(&mut self, frame: &StereoFrame<'_>) -> Option<Vec<KeyPress>> {
    self.display.present(frame);

    let mut keys = Vec::new();
    while let Some(press) = self.responses.poll() {
      if press.key == Key::Escape {
        info!("Escape pressed; terminating session");
        self.lifecycle.terminate();
        return None;
      }
      keys.push(press);
    }

    if !self.lifecycle.is_running() {
      return None;
    }
    Some(keys)
  }

  /// Shows `frame` for `frames` frames.  Returns `false` if the session has to stop.
  fn hold(&mut self, frame: &StereoFrame<'_>, frames: usize) -> bool {
    for _ in 0..frames {
      if self.flip(frame).is_none() {
        return false;
      }
    }
    true
  }

  fn generate_field(
    &mut self,
    spec: &CylinderSpec,
    geom: &ViewerGeometry,
  ) -> Result<RdsField, SessionError> {
    let field = generate_with_options(spec, geom, &self.opts, &mut self.rng)?;
    record_generation(&field.report);
    Ok(field)
  }

  /// Convex cylinder with nonius bars so the experimenter can check the panel mapping and tune
  /// the haploscope offset, then waits for any key.
  fn run_test_mode(&mut self) -> Result<bool, SessionError> {
    let s = self.settings;
    info!(
      "Test mode: {}s convex cylinder with nonius bars.  Swap the panels if it looks concave.",
      s.test_mode.duration_s
    );

    let geom = self.geom;
    let field = self.generate_field(&s.cylinder_spec(s.test_mode.b_cm)?, &geom)?;
    let dots = StereoDots::from_field(&field, s.calibration.dot_size_cm);
    let frame = StereoFrame {
      fixation: true,
      nonius: s.nonius.enabled,
      question: false,
      dots: Some(&dots),
    };
    if !self.hold(&frame, self.schedule.test_frames) {
      return Ok(false);
    }

    info!(
      "Adjust haploscope_offset_cm until the nonius bars form one straight line.  Press any key \
       to continue..."
    );
    self.responses.reset();
    let wait = StereoFrame {
      fixation: true,
      nonius: s.nonius.enabled,
      ..Default::default()
    };
    loop {
      match self.flip(&wait) {
        None => return Ok(false),
        Some(keys) if !keys.is_empty() => return Ok(true),
        Some(_) => (),
      }
    }
  }

  /// Zero-disparity dots before the stimulus to settle vergence.  The flat field is generated
  /// without the haploscope offset and the left eye's positions are shown to both eyes.
  fn run_fusion_prime(&mut self) -> Result<bool, SessionError> {
    let s = self.settings;
    if !s.fusion_prime.enabled || self.schedule.prime_frames == 0 {
      return Ok(true);
    }

    let geom = self.geom.without_offset();
    let field = self.generate_field(&s.cylinder_spec(0.)?, &geom)?;
    let dots = StereoDots::fused(&field, s.calibration.dot_size_cm);
    let frame = StereoFrame {
      fixation: true,
      nonius: s.nonius.enabled,
      question: false,
      dots: Some(&dots),
    };
    Ok(self.hold(&frame, self.schedule.prime_frames))
  }

  /// Shows the cylinder for the stimulus duration.  Returns the disparity statistics of the field
  /// shown on the first frame, or `None` if the session has to stop.
  fn run_stimulus(&mut self, b_cm: f64) -> Result<Option<DisparityStats>, SessionError> {
    let s = self.settings;
    let spec = s.cylinder_spec(b_cm)?;
    let geom = self.geom;
    let dot_size_cm = s.calibration.dot_size_cm;
    let stim_frames = self.schedule.stim_frames;

    if !s.dynamic_noise.enabled {
      let field = self.generate_field(&spec, &geom)?;
      let dots = StereoDots::from_field(&field, dot_size_cm);
      let frame = StereoFrame {
        fixation: true,
        dots: Some(&dots),
        ..Default::default()
      };
      if !self.hold(&frame, stim_frames) {
        return Ok(None);
      }
      return Ok(Some(field.stats()));
    }

    let mut bank = DynamicNoise::new(
      spec,
      geom,
      self.opts,
      s.dynamic_noise.bank_size,
      s.dynamic_noise.update_every,
      &mut self.rng,
    )?;
    bank.fields().iter().for_each(|field| record_generation(&field.report));
    let stats = bank.first().stats();

    let mut dots = StereoDots::from_field(bank.current(), dot_size_cm);
    for frame_ix in 0..stim_frames {
      if bank.advance(frame_ix, &mut self.rng)? {
        if bank.index() == 0 {
          bank.fields().iter().for_each(|field| record_generation(&field.report));
        }
        dots = StereoDots::from_field(bank.current(), dot_size_cm);
      }

      let frame = StereoFrame {
        fixation: true,
        dots: Some(&dots),
        ..Default::default()
      };
      if self.flip(&frame).is_none() {
        return Ok(None);
      }
    }
    Ok(Some(stats))
  }

  /// Shows the question until `1` or `2` is pressed.  Returns `(key, label, rt)`.
  fn collect_response(&mut self) -> Option<(char, ResponseLabel, f64)> {
    self.responses.reset();
    let question = StereoFrame {
      fixation: true,
      question: true,
      ..Default::default()
    };

    loop {
      let keys = self.flip(&question)?;
      let answer = keys.iter().find_map(|press| match press.key {
        Key::Char(c) => ResponseLabel::from_key(c).map(|label| (c, label, press.rt_s)),
        Key::Escape => None,
      });
      if answer.is_some() {
        return answer;
      }
    }
  }

  fn run_trial(&mut self, trial: &Trial) -> Result<Option<TrialRecord>, SessionError> {
    debug!(
      "Trial {} (block {}, #{} in block): b={}cm",
      trial.index, trial.block, trial.index_in_block, trial.b_cm
    );

    if !self.run_fusion_prime()? {
      return Ok(None);
    }
    let Some(stats) = self.run_stimulus(trial.b_cm)? else {
      return Ok(None);
    };

    // standardizes decision time before the question appears
    let fixation = StereoFrame {
      fixation: true,
      ..Default::default()
    };
    if !self.hold(&fixation, self.schedule.post_fix_frames) {
      return Ok(None);
    }

    let Some((key, label, rt)) = self.collect_response() else {
      return Ok(None);
    };
    info!(
      "Trial {}: b={}cm -> {} (rt={rt:.3}s, mean disparity {:.3}deg)",
      trial.index,
      trial.b_cm,
      label.as_str(),
      stats.disparity_angle_mean_deg
    );
    session_metrics::trials_total(trial.b_cm.to_string()).inc();
    session_metrics::responses_total(label.as_str()).inc();

    Ok(Some(TrialRecord::new(trial, key, label, rt, &stats, &self.refresh)))
  }
}
