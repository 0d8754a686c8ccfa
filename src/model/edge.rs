//! The user-authored `Edge` annotation.
//!
//! Edges mirror formula-derived dependencies for the benefit of external
//! tooling (visualization, causal narratives). They carry no authority over
//! evaluation order; the dependency graph is rebuilt from formulas alone.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Dependency,
    Temporal,
    Causal,
    Derived,
    Constraint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    /// Name of the variable the influence flows from.
    pub source: String,
    /// Name of the variable the influence flows to.
    pub target: String,
    pub kind: EdgeKind,

    /// Influence strength in [0, 1]; range-checked at mutation time.
    #[serde(default = "one")]
    pub strength: f64,

    /// Time lag in steps, for annotating temporal relationships.
    #[serde(default)]
    pub lag: i64,

    /// Author confidence in [0, 1]; range-checked at mutation time.
    #[serde(default = "one")]
    pub confidence: f64,
}

fn one() -> f64 {
    1.0
}

impl Edge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        kind: EdgeKind,
    ) -> Edge {
        Edge {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            kind,
            strength: 1.0,
            lag: 0,
            confidence: 1.0,
        }
    }

    pub fn with_strength(mut self, strength: f64) -> Edge {
        self.strength = strength;
        self
    }

    pub fn with_lag(mut self, lag: i64) -> Edge {
        self.lag = lag;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Edge {
        self.confidence = confidence;
        self
    }

    /// True when the edge names `variable` as either endpoint.
    pub fn touches(&self, variable: &str) -> bool {
        self.source == variable || self.target == variable
    }
}
