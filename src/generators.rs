//! Problem generators, one per family.
//!
//! Each generator is a pure function of `complexity` and the supplied random
//! source. Families with interacting parameters use rejection sampling bounded
//! by `max_tries`; the bounds are generous enough that exhaustion only happens
//! when a caller passes an absurdly small budget.

use rand::{Rng, RngCore};
use tracing::debug;

use crate::domain::ProblemInstance;
use crate::error::CoreError;

/// Complexity is clamped to this range so exact arithmetic stays in 128 bits.
pub const MIN_COMPLEXITY: u32 = 2;
pub const MAX_COMPLEXITY: u32 = 1000;

pub trait ProblemGenerator: Send + Sync {
  /// Topic id; equals the `topic_id` tag of the produced instances.
  fn id(&self) -> &'static str;
  /// Human-readable catalog label.
  fn label(&self) -> &'static str;
  fn generate(&self, complexity: u32, max_tries: usize, rng: &mut dyn RngCore) -> Result<ProblemInstance, CoreError>;
}

fn clamp(complexity: u32) -> i64 {
  complexity.clamp(MIN_COMPLEXITY, MAX_COMPLEXITY) as i64
}

/// Run `draw` until the instance validates or the budget is spent.
fn sample_until_valid(
  topic: &'static str,
  max_tries: usize,
  rng: &mut dyn RngCore,
  mut draw: impl FnMut(&mut dyn RngCore) -> ProblemInstance,
) -> Result<ProblemInstance, CoreError> {
  for attempt in 0..max_tries {
    let candidate = draw(rng);
    match candidate.validate() {
      Ok(()) => return Ok(candidate),
      Err(e) => debug!(target: "series", topic, attempt, reason = %e, "Rejected candidate parameters"),
    }
  }
  Err(CoreError::GenerationConstraintExhausted { topic: topic.to_string(), tries: max_tries })
}

/// sum (b/c)^k with c in [2, complexity]. Numerators reach one past the
/// denominator on either side, so a few draws are divergent; r = 1 is rejected.
pub struct GeometricRatioGenerator;

impl ProblemGenerator for GeometricRatioGenerator {
  fn id(&self) -> &'static str { "geometric_ratio" }
  fn label(&self) -> &'static str { "Geometric series (b/c)^k" }

  fn generate(&self, complexity: u32, max_tries: usize, rng: &mut dyn RngCore) -> Result<ProblemInstance, CoreError> {
    let max_c = clamp(complexity);
    sample_until_valid(self.id(), max_tries, rng, |rng| {
      let c = rng.gen_range(2..=max_c);
      let b = rng.gen_range(-(c + 1)..=c + 1);
      ProblemInstance::GeometricRatio { b, c }
    })
  }
}

/// sum 1/(1+c)^k with c > 0 or c < -2, so |1 + c| >= 2 and the series converges.
pub struct GeometricReciprocalGenerator;

impl ProblemGenerator for GeometricReciprocalGenerator {
  fn id(&self) -> &'static str { "geometric_reciprocal" }
  fn label(&self) -> &'static str { "Geometric series 1/(1+c)^k" }

  fn generate(&self, complexity: u32, _max_tries: usize, rng: &mut dyn RngCore) -> Result<ProblemInstance, CoreError> {
    let m = clamp(complexity).max(3);
    // positives 1..=m followed by negatives -3..=-m, drawn uniformly
    let slot = rng.gen_range(0..(m + m - 2));
    let c = if slot < m { slot + 1 } else { -(slot - m + 3) };
    Ok(ProblemInstance::GeometricReciprocal { c })
  }
}

/// sum (b + p k^2)/(c k^2 + d k), k >= 1; the limit p/c decides the
/// necessary-condition outcome.
pub struct RationalQuadraticGenerator;

impl ProblemGenerator for RationalQuadraticGenerator {
  fn id(&self) -> &'static str { "rational_quadratic" }
  fn label(&self) -> &'static str { "General term (b + p k^2)/(c k^2 + d k)" }

  fn generate(&self, complexity: u32, max_tries: usize, rng: &mut dyn RngCore) -> Result<ProblemInstance, CoreError> {
    let m = (clamp(complexity) - 1).max(2);
    sample_until_valid(self.id(), max_tries, rng, |rng| ProblemInstance::RationalQuadratic {
      c: rng.gen_range(1..=m),
      d: rng.gen_range(0..=m),
      b: rng.gen_range(-m..=-1),
      p: rng.gen_range(-m..=m),
    })
  }
}

/// sum (b + p k)/(c k - d), k >= 0; draws where c divides d (a zero
/// denominator) or the term is constant are rejected.
pub struct RationalLinearGenerator;

impl ProblemGenerator for RationalLinearGenerator {
  fn id(&self) -> &'static str { "rational_linear" }
  fn label(&self) -> &'static str { "General term (b + p k)/(c k - d)" }

  fn generate(&self, complexity: u32, max_tries: usize, rng: &mut dyn RngCore) -> Result<ProblemInstance, CoreError> {
    let m = (clamp(complexity) - 1).max(2);
    sample_until_valid(self.id(), max_tries, rng, |rng| ProblemInstance::RationalLinear {
      c: rng.gen_range(1..=m),
      d: rng.gen_range(0..=m),
      b: rng.gen_range(1..=m),
      p: rng.gen_range(-m..=m),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn draw_many(g: &dyn ProblemGenerator, complexity: u32) -> Vec<ProblemInstance> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..500).map(|_| g.generate(complexity, 1000, &mut rng).expect("generates")).collect()
  }

  #[test]
  fn every_generated_instance_validates() {
    let gens: [&dyn ProblemGenerator; 4] = [
      &GeometricRatioGenerator,
      &GeometricReciprocalGenerator,
      &RationalQuadraticGenerator,
      &RationalLinearGenerator,
    ];
    for g in gens {
      for complexity in [0, 2, 10, 50] {
        for p in draw_many(g, complexity) {
          assert_eq!(p.topic_id(), g.id());
          assert!(p.validate().is_ok(), "{p:?}");
        }
      }
    }
  }

  #[test]
  fn geometric_ratio_respects_complexity_and_is_mostly_convergent() {
    let all = draw_many(&GeometricRatioGenerator, 10);
    let mut convergent = 0;
    for p in &all {
      let ProblemInstance::GeometricRatio { b, c } = *p else { panic!("wrong family") };
      assert!((2..=10).contains(&c));
      assert!(b != 0 && b != c && b.abs() <= c + 1);
      if b.abs() < c {
        convergent += 1;
      }
    }
    assert!(convergent > all.len() / 2);
  }

  #[test]
  fn geometric_reciprocal_avoids_ratios_of_magnitude_one_or_more() {
    for p in draw_many(&GeometricReciprocalGenerator, 12) {
      let ProblemInstance::GeometricReciprocal { c } = p else { panic!("wrong family") };
      assert!((1..=12).contains(&c) || (-12..=-3).contains(&c), "c = {c}");
    }
  }

  #[test]
  fn rational_parameters_stay_in_range() {
    for p in draw_many(&RationalLinearGenerator, 10) {
      let ProblemInstance::RationalLinear { b, c, d, p } = p else { panic!("wrong family") };
      assert!((1..=9).contains(&c) && (0..=9).contains(&d) && (1..=9).contains(&b) && (-9..=9).contains(&p));
      assert_ne!(d % c, 0);
    }
    for p in draw_many(&RationalQuadraticGenerator, 10) {
      let ProblemInstance::RationalQuadratic { b, c, d, p } = p else { panic!("wrong family") };
      assert!((1..=9).contains(&c) && (0..=9).contains(&d) && (-9..=-1).contains(&b) && (-9..=9).contains(&p));
    }
  }

  #[test]
  fn zero_budget_reports_exhaustion() {
    let mut rng = StdRng::seed_from_u64(1);
    let err = RationalLinearGenerator.generate(10, 0, &mut rng).unwrap_err();
    assert_eq!(err, CoreError::GenerationConstraintExhausted { topic: "rational_linear".into(), tries: 0 });
  }

  #[test]
  fn same_seed_same_instance() {
    let a = RationalQuadraticGenerator.generate(10, 100, &mut StdRng::seed_from_u64(42)).unwrap();
    let b = RationalQuadraticGenerator.generate(10, 100, &mut StdRng::seed_from_u64(42)).unwrap();
    assert_eq!(a, b);
  }
}
