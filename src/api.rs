//! The four operation contracts consumed by external front ends.
//!
//! Transport-agnostic parameter/result shapes: every response serializes,
//! and failures surface as a non-empty `errors` list with `values` absent
//! rather than as a Rust error crossing the boundary.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::engine::Evaluator;
use crate::graph::{DependencyGraph, GraphSummary};
use crate::model::Model;
use crate::validation;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluateResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<BTreeMap<String, Vec<f64>>>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidateResponse {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

/// Runs the full engine over `model`.
pub fn evaluate(model: &Model, horizon: usize) -> EvaluateResponse {
    match Evaluator::new(model).evaluate(horizon) {
        Ok(output) => EvaluateResponse {
            values: Some(output.values),
            errors: Vec::new(),
        },
        Err(error) => EvaluateResponse {
            values: None,
            errors: vec![error.to_string()],
        },
    }
}

/// Evaluates a single variable over its dependency sub-model.
pub fn evaluate_variable(model: &Model, name: &str, horizon: usize) -> VariableResponse {
    match Evaluator::new(model).evaluate_variable(name, horizon) {
        Ok(values) => VariableResponse {
            values: Some(values),
            errors: Vec::new(),
        },
        Err(error) => VariableResponse {
            values: None,
            errors: vec![error.to_string()],
        },
    }
}

/// Referential integrity and cycle check only; no numeric evaluation.
pub fn validate(model: &Model) -> ValidateResponse {
    let report = validation::validate_model(model);
    ValidateResponse {
        is_valid: report.is_valid,
        errors: report.error_messages(),
    }
}

/// Structural description of the model's dependency graph.
pub fn analyze_graph(model: &Model) -> GraphSummary {
    DependencyGraph::build(model).summary()
}
