use rand::{seq::SliceRandom, Rng};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trial {
  /// Position in the whole session, starting at 0.
  pub index: usize,
  /// Repetition block the trial belongs to.
  pub block: usize,
  pub index_in_block: usize,
  pub b_cm: f64,
}

/// Trial order for a session.  Every repetition block contains each condition exactly once, in a
/// freshly shuffled order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrialPlan {
  pub trials: Vec<Trial>,
}

impl TrialPlan {
  pub fn randomized<R: Rng + ?Sized>(conditions: &[f64], n_reps: usize, rng: &mut R) -> Self {
    let mut trials = Vec::with_capacity(conditions.len() * n_reps);
    let mut order: Vec<usize> = (0..conditions.len()).collect();
    for block in 0..n_reps {
      order.shuffle(rng);
      for (index_in_block, &condition_ix) in order.iter().enumerate() {
        trials.push(Trial {
          index: trials.len(),
          block,
          index_in_block,
          b_cm: conditions[condition_ix],
        });
      }
    }
    TrialPlan { trials }
  }

  pub fn len(&self) -> usize { self.trials.len() }

  pub fn is_empty(&self) -> bool { self.trials.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = &Trial> { self.trials.iter() }
}

#[cfg(test)]
mod tests {
  use common::build_rng;
  use rds::B_VALUES_CM;

  use super::*;

  #[test]
  fn each_block_is_a_permutation() {
    let plan = TrialPlan::randomized(&B_VALUES_CM, 3, &mut build_rng(4));
    assert_eq!(plan.len(), 15);

    for (ix, trial) in plan.iter().enumerate() {
      assert_eq!(trial.index, ix);
      assert_eq!(trial.block, ix / 5);
      assert_eq!(trial.index_in_block, ix % 5);
    }

    for block in plan.trials.chunks(5) {
      let mut depths: Vec<f64> = block.iter().map(|t| t.b_cm).collect();
      depths.sort_by(|a, b| a.partial_cmp(b).unwrap());
      assert_eq!(depths, B_VALUES_CM.to_vec());
    }
  }

  #[test]
  fn order_depends_on_seed() {
    let a = TrialPlan::randomized(&B_VALUES_CM, 4, &mut build_rng(1));
    let b = TrialPlan::randomized(&B_VALUES_CM, 4, &mut build_rng(1));
    assert_eq!(a, b);

    let orders: Vec<Vec<f64>> = (0..8)
      .map(|seed| {
        TrialPlan::randomized(&B_VALUES_CM, 4, &mut build_rng(seed))
          .iter()
          .map(|t| t.b_cm)
          .collect()
      })
      .collect();
    assert!(orders.iter().any(|order| order != &orders[0]));
  }

  #[test]
  fn empty_inputs() {
    assert!(TrialPlan::randomized(&B_VALUES_CM, 0, &mut build_rng(1)).is_empty());
    assert!(TrialPlan::randomized(&[], 3, &mut build_rng(1)).is_empty());
  }
}
