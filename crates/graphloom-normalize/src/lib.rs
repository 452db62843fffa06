//! Three-tier label normalization.
//!
//! Maps noisy free-text labels (entity types, relationship types, property
//! keys) onto closed controlled vocabularies with deterministic,
//! cache-stable results:
//!
//! 1. curated alias table (no classifier call, highest priority)
//! 2. persistent JSON cache from previous sessions
//! 3. LLM classifier constrained to the vocabulary
//! 4. fallback that keeps the original value and records why
//!
//! One generic [`resolver::Resolver`] implements the algorithm; the three
//! domains (entity type, relationship type, object property) supply the
//! parts that differ. Resolution never throws: a run always ends with a
//! decision per label plus stats describing how it was reached.

pub mod cache;
pub mod decision;
pub mod entity_type;
pub mod property;
pub mod relation_type;
pub mod resolver;
pub mod stats;
pub mod value;

pub use decision::{Decision, DecisionSource};
pub use entity_type::{EntityTypeNormalizer, EntityTypeDomain};
pub use property::{PropertyDomain, PropertyNormalizer};
pub use relation_type::{RelationTypeDomain, RelationshipTypeNormalizer};
pub use resolver::{NormalizationDomain, Resolver, ResolverOptions};
pub use stats::{NormalizerStats, NormalizerSummary};

/// Totals returned from one aggregation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOutcome {
    pub total: u64,
    pub updated: u64,
}
