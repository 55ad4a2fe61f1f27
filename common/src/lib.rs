pub extern crate rand;
pub extern crate rand_pcg;

use rand::prelude::*;
use rand_pcg::Pcg32;

/// Builds a deterministic RNG from a seed.  Every sampler in the workspace takes its RNG as an
/// argument so that runs can be reproduced exactly from the seed recorded in the session config.
pub fn build_rng(seed: u64) -> Pcg32 {
  let mut rng = Pcg32::seed_from_u64(seed);

  // pump the rng a few times to avoid possible issues with seeding
  for _ in 0..8 {
    let _ = rng.gen::<f64>();
  }

  rng
}

/// Builds an RNG seeded from OS entropy, for sessions that don't pin a seed.
pub fn entropy_rng() -> Pcg32 { Pcg32::from_entropy() }

/// Arithmetic mean.  Returns 0 for an empty slice.
pub fn mean(vals: &[f64]) -> f64 {
  if vals.is_empty() {
    return 0.;
  }
  vals.iter().sum::<f64>() / vals.len() as f64
}

/// Population standard deviation (divides by `n`, not `n - 1`).
pub fn std_dev(vals: &[f64]) -> f64 {
  if vals.is_empty() {
    return 0.;
  }
  let mean = mean(vals);
  let variance = vals.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / vals.len() as f64;
  variance.sqrt()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn seeded_rngs_are_reproducible() {
    let mut a = build_rng(42);
    let mut b = build_rng(42);
    for _ in 0..16 {
      assert_eq!(a.gen::<u64>(), b.gen::<u64>());
    }

    let mut c = build_rng(43);
    let a_vals: Vec<u64> = (0..4).map(|_| a.gen()).collect();
    let c_vals: Vec<u64> = (0..4).map(|_| c.gen()).collect();
    assert_ne!(a_vals, c_vals);
  }

  #[test]
  fn mean_and_population_std() {
    let vals = [2., 4., 4., 4., 5., 5., 7., 9.];
    assert_eq!(mean(&vals), 5.);
    assert_eq!(std_dev(&vals), 2.);

    assert_eq!(mean(&[]), 0.);
    assert_eq!(std_dev(&[]), 0.);
    assert_eq!(std_dev(&[3.5]), 0.);
  }
}
