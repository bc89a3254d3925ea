//! Step compiler: turns a problem instance into its ordered, gradeable steps.
//!
//! Compilation is deterministic. The only random choices (which index to
//! evaluate a term or partial sum at) come from a generator seeded with
//! `ProblemInstance::derived_seed`, so recompiling the same instance always
//! yields the same prompts and canonical answers.

use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::ScoringConfig;
use crate::domain::{Classification, Criterion, ProblemInstance, StepKind, StepSpec, TermLimit};
use crate::error::CoreError;
use crate::rational::Rational;
use crate::util::fill_template;

const A_N_LABEL: &str = "Compute the term a_{n} of the series {series}.";
const A_N_HINT: &str = "Substitute k = {n} into a_k = {term}.";
const S_N_LABEL: &str = "Compute the partial sum S_{n} = a_{first} + ... + a_{n}.";
const S_N_HINT: &str = "Add the terms from k = {first} through k = {n}.";
const LIMIT_LABEL: &str = "Find the limit of a_k = {term} as k -> oo.";
const LIMIT_HINT: &str = "Divide numerator and denominator by the highest power of k.";
const CONV_LABEL: &str = "Does the series converge?";
const CONV_HINT_GEOMETRIC: &str = "Compare the absolute value of the ratio r = {r} with 1.";
const CONV_HINT_LIMIT: &str = "Compare the limit of the general term with zero.";
const SUM_LABEL: &str = "Find the sum S of the series.";
const SUM_HINT: &str = "For a geometric series S = a_0 / (1 - r).";
const TAIL_LABEL: &str = "Find the sum of the series starting from k = 2.";
const TAIL_HINT: &str = "Subtract the first two terms from S.";
const REASON_LABEL: &str = "Which criterion justifies the conclusion?";

const GEOMETRIC_INDEX: RangeInclusive<i64> = 3..=8;
const RATIONAL_TERM_INDEX: RangeInclusive<i64> = 5..=15;
const RATIONAL_SUM_INDEX: RangeInclusive<i64> = 3..=5;

/// Closed-form convergence verdict and the criterion that establishes it.
///
/// The necessary-condition families never yield `Converges`: a zero limit of
/// the general term is inconclusive and reported as `Undetermined`.
pub fn classify(problem: &ProblemInstance) -> Result<(Classification, Criterion), CoreError> {
  let ambiguous = || CoreError::AmbiguousClassification(problem.statement());
  match problem {
    ProblemInstance::GeometricRatio { .. } | ProblemInstance::GeometricReciprocal { .. } => {
      match problem.term_limit().ok_or_else(ambiguous)? {
        TermLimit::Finite(l) if l.is_zero() => Ok((Classification::Converges, Criterion::GeometricSeries)),
        TermLimit::NotZero => Ok((Classification::Diverges, Criterion::NecessaryCondition)),
        TermLimit::Finite(_) => Err(ambiguous()),
      }
    }
    ProblemInstance::RationalQuadratic { .. } | ProblemInstance::RationalLinear { .. } => {
      match problem.term_limit().ok_or_else(ambiguous)? {
        TermLimit::Finite(l) if l.is_zero() => Ok((Classification::Undetermined, Criterion::NecessaryCondition)),
        TermLimit::Finite(_) | TermLimit::NotZero => Ok((Classification::Diverges, Criterion::NecessaryCondition)),
      }
    }
  }
}

/// Compile with the default step weights.
pub fn compile(problem: &ProblemInstance) -> Result<Vec<StepSpec>, CoreError> {
  compile_with(problem, &ScoringConfig::default())
}

pub fn compile_with(problem: &ProblemInstance, scoring: &ScoringConfig) -> Result<Vec<StepSpec>, CoreError> {
  problem.validate()?;
  let mut rng = StdRng::seed_from_u64(problem.derived_seed());
  let (classification, criterion) = classify(problem)?;

  let steps = match problem {
    ProblemInstance::GeometricRatio { .. } | ProblemInstance::GeometricReciprocal { .. } => {
      geometric_steps(problem, classification, criterion, scoring, &mut rng)?
    }
    ProblemInstance::RationalQuadratic { .. } | ProblemInstance::RationalLinear { .. } => {
      rational_steps(problem, classification, criterion, scoring, &mut rng)?
    }
  };
  debug!(
    target: "series",
    topic = problem.topic_id(),
    %classification,
    steps = steps.len(),
    "Problem compiled"
  );
  Ok(steps)
}

fn exact(problem: &ProblemInstance, v: Option<Rational>) -> Result<String, CoreError> {
  v.map(|r| r.to_string())
    .ok_or_else(|| CoreError::InvalidProblem(format!("{}: value out of exact range", problem.topic_id())))
}

fn input_step(key: &str, label: String, hint: Option<String>, points: f64, answer: String) -> StepSpec {
  StepSpec {
    key: key.to_string(),
    kind: StepKind::Input,
    label,
    hint,
    points,
    canonical_answer: Some(answer),
    options: None,
  }
}

fn term_step(problem: &ProblemInstance, n: i64, points: f64) -> Result<StepSpec, CoreError> {
  let n_text = n.to_string();
  let series = problem.statement();
  let term = problem.general_term();
  Ok(input_step(
    "a_n",
    fill_template(A_N_LABEL, &[("n", n_text.as_str()), ("series", series.as_str())]),
    Some(fill_template(A_N_HINT, &[("n", n_text.as_str()), ("term", term.as_str())])),
    points,
    exact(problem, problem.term(n))?,
  ))
}

fn partial_sum_step(problem: &ProblemInstance, n: i64, points: f64) -> Result<StepSpec, CoreError> {
  let n_text = n.to_string();
  let first = problem.first_index().to_string();
  let vars = [("n", n_text.as_str()), ("first", first.as_str())];
  Ok(input_step(
    "s_n",
    fill_template(S_N_LABEL, &vars),
    Some(fill_template(S_N_HINT, &vars)),
    points,
    exact(problem, problem.partial_sum(n))?,
  ))
}

fn convergence_step(answer: Classification, hint: String, points: f64) -> StepSpec {
  StepSpec {
    key: "conv".into(),
    kind: StepKind::Select,
    label: CONV_LABEL.into(),
    hint: Some(hint),
    points,
    canonical_answer: Some(answer.label().into()),
    options: Some(Classification::ALL.iter().map(|c| c.label().to_string()).collect()),
  }
}

fn reason_step(answer: Criterion, points: f64) -> StepSpec {
  StepSpec {
    key: "reason".into(),
    kind: StepKind::Select,
    label: REASON_LABEL.into(),
    hint: None,
    points,
    canonical_answer: Some(answer.label().into()),
    options: Some(Criterion::ALL.iter().map(|c| c.label().to_string()).collect()),
  }
}

fn geometric_steps(
  problem: &ProblemInstance,
  classification: Classification,
  criterion: Criterion,
  scoring: &ScoringConfig,
  rng: &mut StdRng,
) -> Result<Vec<StepSpec>, CoreError> {
  let n_term = rng.gen_range(GEOMETRIC_INDEX);
  let n_sum = rng.gen_range(GEOMETRIC_INDEX);
  let ratio = exact(problem, problem.ratio())?;

  let mut steps = vec![
    term_step(problem, n_term, scoring.a_n)?,
    partial_sum_step(problem, n_sum, scoring.s_n)?,
    convergence_step(classification, fill_template(CONV_HINT_GEOMETRIC, &[("r", ratio.as_str())]), scoring.conv),
  ];
  // a divergent series has no sum to ask for
  if classification == Classification::Converges {
    steps.push(input_step(
      "sum",
      SUM_LABEL.into(),
      Some(SUM_HINT.into()),
      scoring.sum,
      exact(problem, problem.geometric_tail(0))?,
    ));
    steps.push(input_step(
      "sum_from_2",
      TAIL_LABEL.into(),
      Some(TAIL_HINT.into()),
      scoring.sum_from_2,
      exact(problem, problem.geometric_tail(2))?,
    ));
  }
  steps.push(reason_step(criterion, scoring.reason));
  Ok(steps)
}

fn rational_steps(
  problem: &ProblemInstance,
  classification: Classification,
  criterion: Criterion,
  scoring: &ScoringConfig,
  rng: &mut StdRng,
) -> Result<Vec<StepSpec>, CoreError> {
  let n_term = rng.gen_range(RATIONAL_TERM_INDEX);
  let n_sum = rng.gen_range(RATIONAL_SUM_INDEX);
  let limit = match problem.term_limit() {
    Some(TermLimit::Finite(l)) => l.to_string(),
    _ => return Err(CoreError::AmbiguousClassification(problem.statement())),
  };
  let term = problem.general_term();

  Ok(vec![
    term_step(problem, n_term, scoring.a_n)?,
    partial_sum_step(problem, n_sum, scoring.s_n)?,
    input_step(
      "limit",
      fill_template(LIMIT_LABEL, &[("term", term.as_str())]),
      Some(LIMIT_HINT.into()),
      scoring.limit,
      limit,
    ),
    convergence_step(classification, CONV_HINT_LIMIT.into(), scoring.conv),
    reason_step(criterion, scoring.reason),
  ])
}
