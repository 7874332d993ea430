//! Scoring paths
//!
//! `rules` combines a model probability with clinical escalation rules.
//! `fallback` scores from rules alone when no probability is available.

pub mod fallback;
pub mod rules;

pub use fallback::{fallback_score, FallbackFactor, FallbackScore};
pub use rules::{base_category, clinical_adjustment, collapse, escalate, score};
