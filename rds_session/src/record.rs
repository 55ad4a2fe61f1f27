use std::{
  fs,
  io::{BufWriter, Write},
  path::{Path, PathBuf},
};

use rds::DisparityStats;
use serde::Serialize;

use crate::{error::SessionError, schedule::RefreshRates, settings::SessionSettings};

/// psychopy-style `YYYY-MM-DD_HHhMM.SS.mmm` timestamp, used in file names.
pub fn date_str(now: chrono::DateTime<chrono::Local>) -> String {
  now.format("%Y-%m-%d_%Hh%M.%S%.3f").to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionInfo {
  pub participant: String,
  pub session: String,
  pub date: String,
  pub exp_name: String,
}

impl SessionInfo {
  pub fn new(settings: &SessionSettings, date: String) -> Self {
    SessionInfo {
      participant: settings.info.participant.clone(),
      session: settings.info.session.clone(),
      date,
      exp_name: settings.output.exp_name.clone(),
    }
  }

  pub fn now(settings: &SessionSettings) -> Self { Self::new(settings, date_str(chrono::Local::now())) }

  /// `{participant}_{exp_name}_{date}`, with characters that don't belong in file names replaced.
  pub fn file_stem(&self) -> String {
    format!("{}_{}_{}", self.participant, self.exp_name, self.date)
      .chars()
      .map(|c| {
        if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
          c
        } else {
          '_'
        }
      })
      .collect()
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseLabel {
  Squashed,
  Stretched,
}

impl ResponseLabel {
  /// `1` means squashed, `2` stretched; anything else isn't an answer.
  pub fn from_key(key: char) -> Option<Self> {
    match key {
      '1' => Some(ResponseLabel::Squashed),
      '2' => Some(ResponseLabel::Stretched),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      ResponseLabel::Squashed => "squashed",
      ResponseLabel::Stretched => "stretched",
    }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrialRecord {
  pub trial_index: usize,
  pub block: usize,
  pub b_cm: f64,
  pub response_key: char,
  pub response_label: ResponseLabel,
  pub rt: f64,
  pub disparity_mean_cm: f64,
  pub disparity_std_cm: f64,
  pub disparity_angle_mean_deg: f64,
  pub disparity_model_diff_mean_rad: f64,
  pub refresh_min_hz: f64,
  pub refresh_left_hz: f64,
  pub refresh_right_hz: f64,
}

impl TrialRecord {
  pub fn new(
    trial: &crate::trials::Trial,
    response_key: char,
    response_label: ResponseLabel,
    rt: f64,
    stats: &DisparityStats,
    refresh: &RefreshRates,
  ) -> Self {
    TrialRecord {
      trial_index: trial.index,
      block: trial.block,
      b_cm: trial.b_cm,
      response_key,
      response_label,
      rt,
      disparity_mean_cm: stats.disparity_mean_cm,
      disparity_std_cm: stats.disparity_std_cm,
      disparity_angle_mean_deg: stats.disparity_angle_mean_deg,
      disparity_model_diff_mean_rad: stats.model_difference_mean_rad,
      refresh_min_hz: refresh.min_hz,
      refresh_left_hz: refresh.left_hz,
      refresh_right_hz: refresh.right_hz,
    }
  }
}

const WIDE_TEXT_HEADER: [&str; 17] = [
  "participant",
  "session",
  "date",
  "expName",
  "trial_index",
  "block",
  "b_cm",
  "response_key",
  "response_label",
  "rt",
  "disparity_mean_cm",
  "disparity_std_cm",
  "disparity_angle_mean_deg",
  "disparity_model_diff_mean_rad",
  "refresh_min_hz",
  "refresh_left_hz",
  "refresh_right_hz",
];

fn csv_field(val: &str) -> String {
  if val.contains([',', '"', '\n', '\r']) {
    format!("\"{}\"", val.replace('"', "\"\""))
  } else {
    val.to_owned()
  }
}

/// Everything recorded during a session, in trial order.
#[derive(Clone, Debug, Serialize)]
pub struct DataLog {
  pub info: SessionInfo,
  pub trials: Vec<TrialRecord>,
}

impl DataLog {
  pub fn new(info: SessionInfo) -> Self {
    DataLog {
      info,
      trials: Vec::new(),
    }
  }

  pub fn push(&mut self, record: TrialRecord) { self.trials.push(record); }

  pub fn len(&self) -> usize { self.trials.len() }

  pub fn is_empty(&self) -> bool { self.trials.is_empty() }

  /// One row per trial with the session info repeated on every row.
  pub fn write_wide_text(&self, mut w: impl Write) -> std::io::Result<()> {
    writeln!(w, "{}", WIDE_TEXT_HEADER.join(","))?;

    let info = &self.info;
    for t in &self.trials {
      let row = [
        csv_field(&info.participant),
        csv_field(&info.session),
        csv_field(&info.date),
        csv_field(&info.exp_name),
        t.trial_index.to_string(),
        t.block.to_string(),
        t.b_cm.to_string(),
        csv_field(&t.response_key.to_string()),
        t.response_label.as_str().to_owned(),
        t.rt.to_string(),
        t.disparity_mean_cm.to_string(),
        t.disparity_std_cm.to_string(),
        t.disparity_angle_mean_deg.to_string(),
        t.disparity_model_diff_mean_rad.to_string(),
        t.refresh_min_hz.to_string(),
        t.refresh_left_hz.to_string(),
        t.refresh_right_hz.to_string(),
      ];
      writeln!(w, "{}", row.join(","))?;
    }
    w.flush()
  }

  pub fn save_wide_text(&self, path: &Path) -> Result<(), SessionError> {
    let file = fs::File::create(path).map_err(|err| SessionError::io(path, err))?;
    self
      .write_wide_text(BufWriter::new(file))
      .map_err(|err| SessionError::io(path, err))
  }

  pub fn save_snapshot(&self, path: &Path) -> Result<(), SessionError> {
    let file = fs::File::create(path).map_err(|err| SessionError::io(path, err))?;
    let mut w = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut w, self)?;
    w.flush().map_err(|err| SessionError::io(path, err))
  }

  /// Writes `<stem>.csv` and `<stem>.json` into `data_dir`, creating it if needed.  Returns the
  /// two paths.
  pub fn save(&self, data_dir: &Path) -> Result<(PathBuf, PathBuf), SessionError> {
    fs::create_dir_all(data_dir).map_err(|err| SessionError::io(data_dir, err))?;
    let stem = self.info.file_stem();
    let csv_path = data_dir.join(format!("{stem}.csv"));
    let snapshot_path = data_dir.join(format!("{stem}.json"));
    self.save_wide_text(&csv_path)?;
    self.save_snapshot(&snapshot_path)?;
    Ok((csv_path, snapshot_path))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::trials::Trial;

  fn info() -> SessionInfo {
    SessionInfo {
      participant: "p01".to_owned(),
      session: "1".to_owned(),
      date: "2024-03-05_14h07.09.123".to_owned(),
      exp_name: "JohnstonRDS".to_owned(),
    }
  }

  fn record(index: usize, b_cm: f64, key: char) -> TrialRecord {
    let trial = Trial {
      index,
      block: 0,
      index_in_block: index,
      b_cm,
    };
    let stats = DisparityStats {
      disparity_mean_cm: 0.25,
      disparity_std_cm: 0.125,
      disparity_angle_mean_deg: 0.5,
      model_difference_mean_rad: -0.001,
    };
    let refresh = RefreshRates {
      left_hz: 60.,
      right_hz: 60.,
      min_hz: 60.,
    };
    TrialRecord::new(&trial, key, ResponseLabel::from_key(key).unwrap(), 0.75, &stats, &refresh)
  }

  #[test]
  fn date_format() {
    use chrono::TimeZone;
    let dt = chrono::Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
    assert_eq!(date_str(dt), "2024-03-05_14h07.09.000");
  }

  #[test]
  fn file_stem_is_filesystem_safe() {
    let mut info = info();
    assert_eq!(info.file_stem(), "p01_JohnstonRDS_2024-03-05_14h07.09.123");
    info.participant = "a/b c".to_owned();
    assert_eq!(info.file_stem(), "a_b_c_JohnstonRDS_2024-03-05_14h07.09.123");
  }

  #[test]
  fn response_labels() {
    assert_eq!(ResponseLabel::from_key('1'), Some(ResponseLabel::Squashed));
    assert_eq!(ResponseLabel::from_key('2'), Some(ResponseLabel::Stretched));
    assert_eq!(ResponseLabel::from_key('3'), None);
    assert_eq!(ResponseLabel::Stretched.as_str(), "stretched");
  }

  #[test]
  fn wide_text_rows() {
    let mut log = DataLog::new(info());
    log.push(record(0, 3.35, '1'));
    log.push(record(1, 9.95, '2'));

    let mut buf = Vec::new();
    log.write_wide_text(&mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].split(',').count(), WIDE_TEXT_HEADER.len());
    assert_eq!(
      lines[1],
      "p01,1,2024-03-05_14h07.09.123,JohnstonRDS,0,0,3.35,1,squashed,0.75,0.25,0.125,0.5,-0.001,\
       60,60,60"
    );
    assert!(lines[2].contains(",9.95,2,stretched,"));
  }

  #[test]
  fn quotes_awkward_fields() {
    assert_eq!(csv_field("plain"), "plain");
    assert_eq!(csv_field("a,b"), "\"a,b\"");
    assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
  }

  #[test]
  fn saves_both_files() {
    let dir = std::env::temp_dir().join(format!("rds_session_record_{}", std::process::id()));
    let mut log = DataLog::new(info());
    log.push(record(0, 5., '2'));

    let (csv_path, snapshot_path) = log.save(&dir).unwrap();
    assert!(csv_path.ends_with("p01_JohnstonRDS_2024-03-05_14h07.09.123.csv"));

    let csv = fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 2);

    let snapshot: serde_json::Value =
      serde_json::from_str(&fs::read_to_string(&snapshot_path).unwrap()).unwrap();
    assert_eq!(snapshot["info"]["participant"], "p01");
    assert_eq!(snapshot["trials"][0]["response_label"], "stretched");
    assert_eq!(snapshot["trials"][0]["b_cm"], 5.);

    fs::remove_dir_all(&dir).unwrap();
  }
}
