//! Non-raising model validation.
//!
//! Where the engine's validate step aborts on the first problem, this
//! module aggregates everything it finds so a caller (interactive sessions,
//! the bulk diff/apply service) can preview all of a model's problems
//! before committing anything. It reuses the same two primitives the
//! collaborators share: the model's referential-integrity scan and the
//! dependency graph's cycle enumeration.

use serde::Serialize;

use crate::graph::DependencyGraph;
use crate::model::Model;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A dependency or edge endpoint names an absent variable, or edge
    /// metadata is out of range.
    Integrity,
    /// A non-temporal dependency cycle.
    CircularDependency,
    /// A user-authored edge that mirrors no formula-derived dependency.
    UnmirroredEdge,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    /// The variable or edge the issue anchors to.
    pub subject: String,
    pub message: String,
}

/// The aggregated outcome of [`validate_model`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|issue| issue.message.clone()).collect()
    }
}

/// Checks referential integrity and acyclicity, collecting every problem
/// instead of stopping at the first. Warnings never make a model invalid.
pub fn validate_model(model: &Model) -> ValidationReport {
    let mut errors = Vec::new();

    for error in model.check_integrity() {
        errors.push(ValidationIssue {
            kind: IssueKind::Integrity,
            subject: model.name.clone(),
            message: error.to_string(),
        });
    }

    let graph = DependencyGraph::build(model);
    for cycle in graph.find_cycles() {
        let mut path = cycle.join(" -> ");
        if let Some(first) = cycle.first() {
            path.push_str(" -> ");
            path.push_str(first);
        }
        errors.push(ValidationIssue {
            kind: IssueKind::CircularDependency,
            subject: cycle.first().cloned().unwrap_or_default(),
            message: format!("circular dependency: {path}"),
        });
    }

    let mut warnings = Vec::new();
    for edge in model.edges().values() {
        let mirrored = model
            .variable(&edge.target)
            .map(|target| target.dependency_bases().any(|base| base == edge.source))
            .unwrap_or(false);
        if !mirrored {
            warnings.push(ValidationIssue {
                kind: IssueKind::UnmirroredEdge,
                subject: edge.id.clone(),
                message: format!(
                    "edge '{}' ({} -> {}) mirrors no formula-derived dependency",
                    edge.id, edge.source, edge.target
                ),
            });
        }
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}
