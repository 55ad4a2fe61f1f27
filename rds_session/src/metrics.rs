use foundations::telemetry::metrics::{metrics, Counter};

#[metrics]
pub mod rds_session {
  /// Number of completed trials.
  pub fn trials_total(b_cm: String) -> Counter;

  /// Number of responses.
  pub fn responses_total(label: &'static str) -> Counter;

  /// Number of candidate batches drawn by the dot field generator.
  pub fn generator_batches_total() -> Counter;

  /// Number of candidate dots rejected for not being visible to both eyes.
  pub fn dots_rejected_total() -> Counter;

  /// Number of sessions stopped before the last trial.
  pub fn sessions_aborted_total() -> Counter;
}
