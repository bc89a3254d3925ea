//! Topic registry: maps topic ids to generators and exposes the catalog.
//!
//! Registration is an explicit table built at startup (`with_defaults`), so
//! lookups are deterministic and testable without any discovery step.

use rand::RngCore;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::ProblemInstance;
use crate::error::CoreError;
use crate::generators::{
  GeometricRatioGenerator, GeometricReciprocalGenerator, ProblemGenerator, RationalLinearGenerator,
  RationalQuadraticGenerator,
};

/// Catalog entry for authoring screens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Topic {
  pub id: String,
  pub label: String,
}

pub struct Registry {
  generators: Vec<Box<dyn ProblemGenerator>>,
  max_tries: usize,
}

impl Registry {
  pub fn new(max_tries: usize) -> Self {
    Self { generators: Vec::new(), max_tries }
  }

  /// Registry with every built-in family.
  pub fn with_defaults(max_tries: usize) -> Self {
    let mut r = Self::new(max_tries);
    r.register(Box::new(GeometricRatioGenerator));
    r.register(Box::new(GeometricReciprocalGenerator));
    r.register(Box::new(RationalQuadraticGenerator));
    r.register(Box::new(RationalLinearGenerator));
    r
  }

  /// Add a generator; a later registration under the same id replaces the earlier one.
  pub fn register(&mut self, generator: Box<dyn ProblemGenerator>) {
    let id = generator.id();
    if let Some(slot) = self.generators.iter_mut().find(|g| g.id() == id) {
      warn!(target: "series", topic = id, "Replacing registered generator");
      *slot = generator;
    } else {
      info!(target: "series", topic = id, "Generator registered");
      self.generators.push(generator);
    }
  }

  pub fn get(&self, topic_id: &str) -> Option<&dyn ProblemGenerator> {
    self.generators.iter().find(|g| g.id() == topic_id).map(|g| &**g)
  }

  /// `{id, label}` pairs in registration order.
  pub fn topics(&self) -> Vec<Topic> {
    self
      .generators
      .iter()
      .map(|g| Topic { id: g.id().to_string(), label: g.label().to_string() })
      .collect()
  }

  /// Generate with an explicit random source.
  pub fn create_with_rng(&self, topic_id: &str, complexity: u32, rng: &mut dyn RngCore) -> Result<ProblemInstance, CoreError> {
    let generator = self.get(topic_id).ok_or_else(|| CoreError::UnknownTopic(topic_id.to_string()))?;
    let problem = generator.generate(complexity, self.max_tries, rng)?;
    debug!(target: "series", topic = topic_id, complexity, ?problem, "Problem generated");
    Ok(problem)
  }

  /// Generate from the thread-local random source.
  pub fn create(&self, topic_id: &str, complexity: u32) -> Result<ProblemInstance, CoreError> {
    self.create_with_rng(topic_id, complexity, &mut rand::thread_rng())
  }
}
