use rand::Rng;

use crate::{
  cylinder::CylinderSpec,
  error::RdsError,
  field::{generate_with_options, GeneratorOptions, RdsField},
  geometry::ViewerGeometry,
};

/// Dynamic noise: instead of regenerating the stereogram on every frame, a small bank of fields is
/// generated up front and cycled through, switching every `update_interval` frames.  Once the
/// cycle wraps around, the whole bank is regenerated so the noise doesn't visibly repeat.
pub struct DynamicNoise {
  spec: CylinderSpec,
  geom: ViewerGeometry,
  opts: GeneratorOptions,
  update_interval: usize,
  fields: Vec<RdsField>,
  index: usize,
}

impl DynamicNoise {
  pub fn new<R: Rng + ?Sized>(
    spec: CylinderSpec,
    geom: ViewerGeometry,
    opts: GeneratorOptions,
    bank_size: usize,
    update_interval: usize,
    rng: &mut R,
  ) -> Result<Self, RdsError> {
    let mut bank = DynamicNoise {
      spec,
      geom,
      opts,
      update_interval: update_interval.max(1),
      fields: Vec::new(),
      index: 0,
    };
    bank.fields.reserve(bank_size.max(1));
    for _ in 0..bank_size.max(1) {
      let field = generate_with_options(&bank.spec, &bank.geom, &bank.opts, rng)?;
      bank.fields.push(field);
    }
    Ok(bank)
  }

  pub fn len(&self) -> usize { self.fields.len() }

  pub fn is_empty(&self) -> bool { self.fields.is_empty() }

  pub fn index(&self) -> usize { self.index }

  pub fn update_interval(&self) -> usize { self.update_interval }

  pub fn current(&self) -> &RdsField { &self.fields[self.index] }

  pub fn fields(&self) -> &[RdsField] { &self.fields }

  /// The first field of the bank.  It's the one shown on frame 0, so its statistics are the ones
  /// logged for the trial.
  pub fn first(&self) -> &RdsField { &self.fields[0] }

  /// Moves the bank to the field for `frame`.  Returns `true` if the displayed field changed and
  /// the display needs new positions.
  pub fn advance<R: Rng + ?Sized>(&mut self, frame: usize, rng: &mut R) -> Result<bool, RdsError> {
    if frame == 0 || frame % self.update_interval != 0 {
      return Ok(false);
    }

    self.index = (self.index + 1) % self.fields.len();
    if self.index == 0 {
      for field in &mut self.fields {
        *field = generate_with_options(&self.spec, &self.geom, &self.opts, rng)?;
      }
    }
    Ok(true)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use common::{build_rng, rand_pcg::Pcg32};

  fn bank(bank_size: usize, update_interval: usize, rng: &mut Pcg32) -> DynamicNoise {
    let spec = CylinderSpec::new(5.5, 5., 6., 10., 200).unwrap();
    let geom = ViewerGeometry::new(85., 6.5, 70., 0.).unwrap();
    DynamicNoise::new(
      spec,
      geom,
      GeneratorOptions::default(),
      bank_size,
      update_interval,
      rng,
    )
    .unwrap()
  }

  #[test]
  fn cycles_every_interval() {
    let mut rng = build_rng(1);
    let mut bank = bank(3, 2, &mut rng);
    assert_eq!(bank.len(), 3);

    let mut switches = vec![];
    for frame in 0..8 {
      if bank.advance(frame, &mut rng).unwrap() {
        switches.push((frame, bank.index()));
      }
    }
    assert_eq!(switches, vec![(2, 1), (4, 2), (6, 0)]);
  }

  #[test]
  fn regenerates_after_wrapping() {
    let mut rng = build_rng(2);
    let mut bank = bank(2, 1, &mut rng);
    let original_first = bank.first().clone();

    assert!(bank.advance(1, &mut rng).unwrap());
    assert_eq!(bank.index(), 1);
    assert_eq!(bank.first(), &original_first);

    assert!(bank.advance(2, &mut rng).unwrap());
    assert_eq!(bank.index(), 0);
    assert_ne!(bank.first().x_left, original_first.x_left);
    assert_eq!(bank.current().len(), 200);
  }

  #[test]
  fn degenerate_sizes_are_clamped() {
    let mut rng = build_rng(3);
    let mut bank = bank(0, 0, &mut rng);
    assert_eq!(bank.len(), 1);
    assert_eq!(bank.update_interval(), 1);

    // a single-entry bank regenerates on every switch
    let before = bank.current().clone();
    assert!(bank.advance(1, &mut rng).unwrap());
    assert_eq!(bank.index(), 0);
    assert_ne!(bank.current().x_left, before.x_left);
  }
}
