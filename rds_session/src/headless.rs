//! Display and response implementations that don't need a haploscope: a display that only counts
//! and paces frames, a responder reading answers from stdin, and a scripted responder for
//! automated runs.

use std::{
  collections::VecDeque,
  io::BufRead,
  sync::mpsc::{self, Receiver, TryRecvError},
  thread,
  time::{Duration, Instant},
};

use crate::display::{Eye, Key, KeyPress, ResponseSource, StereoDisplay, StereoFrame};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameCounts {
  pub total: usize,
  pub with_dots: usize,
  pub with_nonius: usize,
  pub with_question: usize,
}

pub struct HeadlessDisplay {
  refresh_left_hz: Option<f64>,
  refresh_right_hz: Option<f64>,
  pace: bool,
  last_flip: Option<Instant>,
  counts: FrameCounts,
  closed: bool,
}

impl HeadlessDisplay {
  pub fn new(refresh_hz: f64, pace: bool) -> Self {
    HeadlessDisplay {
      refresh_left_hz: Some(refresh_hz),
      refresh_right_hz: Some(refresh_hz),
      pace,
      last_flip: None,
      counts: FrameCounts::default(),
      closed: false,
    }
  }

  /// Overrides what `measure_refresh_hz` reports for one panel.
  pub fn set_refresh(&mut self, eye: Eye, refresh_hz: Option<f64>) {
    match eye {
      Eye::Left => self.refresh_left_hz = refresh_hz,
      Eye::Right => self.refresh_right_hz = refresh_hz,
    }
  }

  pub fn counts(&self) -> FrameCounts { self.counts }

  pub fn is_closed(&self) -> bool { self.closed }

  fn frame_interval(&self) -> Option<Duration> {
    let hz = self.refresh_left_hz?;
    if hz > 0. && hz.is_finite() {
      Some(Duration::from_secs_f64(1. / hz))
    } else {
      None
    }
  }
}

impl StereoDisplay for HeadlessDisplay {
  fn measure_refresh_hz(&mut self, eye: Eye) -> Option<f64> {
    match eye {
      Eye::Left => self.refresh_left_hz,
      Eye::Right => self.refresh_right_hz,
    }
  }

  fn present(&mut self, frame: &StereoFrame<'_>) {
    if self.closed {
      warn!("Frame presented after the headless display was closed");
      return;
    }

    self.counts.total += 1;
    if frame.dots.is_some() {
      self.counts.with_dots += 1;
    }
    if frame.nonius {
      self.counts.with_nonius += 1;
    }
    if frame.question {
      self.counts.with_question += 1;
    }

    if !self.pace {
      return;
    }
    if let (Some(last_flip), Some(interval)) = (self.last_flip, self.frame_interval()) {
      let elapsed = last_flip.elapsed();
      if elapsed < interval {
        thread::sleep(interval - elapsed);
      }
    }
    self.last_flip = Some(Instant::now());
  }

  fn close(&mut self) {
    if !self.closed {
      debug!("Closing headless display after {} frames", self.counts.total);
    }
    self.closed = true;
  }
}

fn parse_key(line: &str) -> Option<Key> {
  let line = line.trim();
  match line.to_ascii_lowercase().as_str() {
    "" => None,
    "esc" | "escape" | "q" | "quit" => Some(Key::Escape),
    _ => line.chars().next().map(Key::Char),
  }
}

/// Reads one key per line from stdin on a background thread.  `q`, `esc` or `quit` act as the
/// escape key; otherwise the first character of the line is the key.  Keys are timestamped when
/// the line arrives, so reaction times don't depend on how often the session polls.
pub struct StdinResponses {
  rx: Receiver<(Key, Instant)>,
  clock: Instant,
  disconnected: bool,
}

impl StdinResponses {
  pub fn spawn() -> Self {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
      let stdin = std::io::stdin();
      for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let received_at = Instant::now();
        if let Some(key) = parse_key(&line) {
          if tx.send((key, received_at)).is_err() {
            break;
          }
        }
      }
    });

    Self::from_receiver(rx)
  }

  fn from_receiver(rx: Receiver<(Key, Instant)>) -> Self {
    StdinResponses {
      rx,
      clock: Instant::now(),
      disconnected: false,
    }
  }
}

impl ResponseSource for StdinResponses {
  fn reset(&mut self) {
    while self.rx.try_recv().is_ok() {}
    self.clock = Instant::now();
  }

  fn poll(&mut self) -> Option<KeyPress> {
    match self.rx.try_recv() {
      Ok((key, received_at)) => Some(KeyPress {
        key,
        rt_s: received_at.saturating_duration_since(self.clock).as_secs_f64(),
      }),
      Err(TryRecvError::Empty) => None,
      Err(TryRecvError::Disconnected) => {
        if !self.disconnected {
          warn!("stdin closed; no further responses can be collected");
          self.disconnected = true;
        }
        None
      },
    }
  }
}

/// Replays a fixed sequence of keys.  Each key becomes available after the given number of empty
/// polls, counted from the previous delivery or the last reset; its reaction time is that count
/// times `seconds_per_poll`.  Resetting restarts the count but keeps the script.
pub struct ScriptedResponses {
  script: VecDeque<(usize, Key)>,
  polls_since_delivery: usize,
  seconds_per_poll: f64,
  delivered: Vec<KeyPress>,
}

impl ScriptedResponses {
  pub fn new(script: impl IntoIterator<Item = (usize, Key)>, seconds_per_poll: f64) -> Self {
    ScriptedResponses {
      script: script.into_iter().collect(),
      polls_since_delivery: 0,
      seconds_per_poll,
      delivered: Vec::new(),
    }
  }

  pub fn delivered(&self) -> &[KeyPress] { &self.delivered }

  pub fn remaining(&self) -> usize { self.script.len() }
}

impl ResponseSource for ScriptedResponses {
  fn reset(&mut self) { self.polls_since_delivery = 0; }

  fn poll(&mut self) -> Option<KeyPress> {
    let &(wait_polls, key) = self.script.front()?;
    if self.polls_since_delivery < wait_polls {
      self.polls_since_delivery += 1;
      return None;
    }

    self.script.pop_front();
    let press = KeyPress {
      key,
      rt_s: self.polls_since_delivery as f64 * self.seconds_per_poll,
    };
    self.polls_since_delivery = 0;
    self.delivered.push(press);
    Some(press)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_stdin_lines() {
    assert_eq!(parse_key("1"), Some(Key::Char('1')));
    assert_eq!(parse_key("  2 \n"), Some(Key::Char('2')));
    assert_eq!(parse_key("ESC"), Some(Key::Escape));
    assert_eq!(parse_key("q"), Some(Key::Escape));
    assert_eq!(parse_key("   "), None);
  }

  #[test]
  fn stdin_reaction_time_uses_arrival_time() {
    let (tx, rx) = mpsc::channel();
    let mut responses = StdinResponses::from_receiver(rx);

    tx.send((Key::Char('9'), Instant::now())).unwrap();
    responses.reset();
    let clock = responses.clock;

    tx.send((Key::Char('1'), clock + Duration::from_millis(250))).unwrap();
    thread::sleep(Duration::from_millis(5));
    // stale keys are dropped by reset; the rt comes from the stamp, not from when it was polled
    assert_eq!(
      responses.poll(),
      Some(KeyPress {
        key: Key::Char('1'),
        rt_s: 0.25,
      })
    );

    tx.send((Key::Escape, clock)).unwrap();
    assert_eq!(responses.poll().map(|press| press.rt_s), Some(0.));
    assert_eq!(responses.poll(), None);
  }

  #[test]
  fn scripted_keys_wait_their_turn() {
    let mut responses = ScriptedResponses::new([(2, Key::Char('1')), (0, Key::Char('2'))], 0.5);
    assert_eq!(responses.poll(), None);
    assert_eq!(responses.poll(), None);
    assert_eq!(
      responses.poll(),
      Some(KeyPress {
        key: Key::Char('1'),
        rt_s: 1.,
      })
    );
    assert_eq!(
      responses.poll(),
      Some(KeyPress {
        key: Key::Char('2'),
        rt_s: 0.,
      })
    );
    assert_eq!(responses.poll(), None);
    assert_eq!(responses.delivered().len(), 2);
    assert_eq!(responses.remaining(), 0);
  }

  #[test]
  fn headless_display_counts_layers() {
    let mut display = HeadlessDisplay::new(60., false);
    display.present(&StereoFrame {
      fixation: true,
      nonius: true,
      ..Default::default()
    });
    display.present(&StereoFrame {
      fixation: true,
      question: true,
      ..Default::default()
    });
    display.close();
    display.present(&StereoFrame::default());

    assert!(display.is_closed());
    assert_eq!(display.counts(), FrameCounts {
      total: 2,
      with_dots: 0,
      with_nonius: 1,
      with_question: 1,
    });
  }
}
