//! The data holders: `Variable`, `Edge`, and the owning `Model`.

mod edge;
mod variable;

pub use edge::{Edge, EdgeKind};
pub use variable::{Variable, VariableKind};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::formula::{self, FormulaParseError};

/// Mutation-time and referential-integrity errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("variable '{name}' already exists")]
    DuplicateVariable { name: String },

    #[error("unknown variable '{name}'")]
    UnknownVariable { name: String },

    #[error("dependency '{dependency}' of variable '{referenced_by}' does not name a variable in the model")]
    MissingVariable {
        dependency: String,
        referenced_by: String,
    },

    #[error("variable '{name}' is still referenced by {used_by:?}")]
    VariableInUse { name: String, used_by: Vec<String> },

    #[error("edge '{id}' already exists")]
    DuplicateEdge { id: String },

    #[error("unknown edge '{id}'")]
    UnknownEdge { id: String },

    #[error("edge '{id}' endpoint '{name}' does not name a variable in the model")]
    MissingEdgeEndpoint { id: String, name: String },

    #[error("edge strength {value} is out of range [0.0, 1.0]")]
    StrengthOutOfRange { value: f64 },

    #[error("edge confidence {value} is out of range [0.0, 1.0]")]
    ConfidenceOutOfRange { value: f64 },

    #[error("variable '{name}' is not a parameter")]
    NotAParameter { name: String },

    #[error(transparent)]
    Formula(#[from] FormulaParseError),
}

/// A named model: variables keyed by name, edges keyed by id.
///
/// Both maps are ordered so every derived artifact (graph build, analysis
/// output, serialized form) is deterministic. All mutation goes through
/// methods that re-validate referential integrity.
///
/// Integrity policy: a *plain* dependency must name a variable present in
/// the model, checked at mutation time. A *time-offset* dependency is not
/// existence-checked here — temporal references may point at variables that
/// are added later, and a reference that is still dangling at evaluation
/// time fails there instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    variables: BTreeMap<String, Variable>,

    #[serde(default)]
    edges: BTreeMap<String, Edge>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Model {
        Model {
            name: name.into(),
            description: None,
            variables: BTreeMap::new(),
            edges: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Model {
        self.description = Some(description.into());
        self
    }

    /// Assembles a model from already-validated parts. Used for sub-model
    /// construction where insertion order must not matter; the caller is
    /// responsible for coherence.
    pub(crate) fn from_parts(
        name: impl Into<String>,
        variables: BTreeMap<String, Variable>,
        edges: BTreeMap<String, Edge>,
    ) -> Model {
        Model {
            name: name.into(),
            description: None,
            variables,
            edges,
        }
    }

    pub fn variables(&self) -> &BTreeMap<String, Variable> {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn edges(&self) -> &BTreeMap<String, Edge> {
        &self.edges
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    // --- Variable mutations ---

    pub fn add_variable(&mut self, variable: Variable) -> Result<(), ModelError> {
        if self.variables.contains_key(&variable.name) {
            return Err(ModelError::DuplicateVariable { name: variable.name });
        }
        self.check_variable_refs(&variable)?;
        self.variables.insert(variable.name.clone(), variable);
        Ok(())
    }

    /// Replaces an existing variable wholesale, re-validating its references.
    pub fn update_variable(&mut self, variable: Variable) -> Result<(), ModelError> {
        if !self.variables.contains_key(&variable.name) {
            return Err(ModelError::UnknownVariable { name: variable.name });
        }
        self.check_variable_refs(&variable)?;
        self.variables.insert(variable.name.clone(), variable);
        Ok(())
    }

    /// Sets or clears a variable's formula, re-extracting its dependencies.
    pub fn set_formula(&mut self, name: &str, formula: Option<&str>) -> Result<(), ModelError> {
        if !self.variables.contains_key(name) {
            return Err(ModelError::UnknownVariable { name: name.to_string() });
        }
        let (formula, dependencies) = match formula {
            Some(src) => {
                formula::CompiledFormula::compile(src)?;
                let refs = formula::extract_references(src)?;
                (Some(src.to_string()), refs.tokens())
            }
            None => (None, Vec::new()),
        };
        let mut updated = self.variables[name].clone();
        updated.formula = formula;
        updated.dependencies = dependencies;
        self.check_variable_refs(&updated)?;
        self.variables.insert(name.to_string(), updated);
        Ok(())
    }

    /// Replaces a variable's seeded values.
    pub fn set_values(&mut self, name: &str, values: Vec<f64>) -> Result<(), ModelError> {
        match self.variables.get_mut(name) {
            Some(variable) => {
                variable.values = values;
                Ok(())
            }
            None => Err(ModelError::UnknownVariable { name: name.to_string() }),
        }
    }

    /// Replaces a Parameter variable's seeded values; the scenario override
    /// primitive. Rejects non-parameter targets rather than silently
    /// rewriting computed state.
    pub fn override_parameter(&mut self, name: &str, values: Vec<f64>) -> Result<(), ModelError> {
        match self.variables.get_mut(name) {
            Some(variable) if variable.kind == VariableKind::Parameter => {
                variable.values = values;
                Ok(())
            }
            Some(_) => Err(ModelError::NotAParameter { name: name.to_string() }),
            None => Err(ModelError::UnknownVariable { name: name.to_string() }),
        }
    }

    /// Removes a variable. Fails while any other variable's dependency list
    /// or any edge still names it.
    pub fn remove_variable(&mut self, name: &str) -> Result<Variable, ModelError> {
        if !self.variables.contains_key(name) {
            return Err(ModelError::UnknownVariable { name: name.to_string() });
        }
        let mut used_by: Vec<String> = self
            .variables
            .values()
            .filter(|v| v.name != name && v.dependency_bases().any(|base| base == name))
            .map(|v| v.name.clone())
            .collect();
        used_by.extend(
            self.edges
                .values()
                .filter(|e| e.touches(name))
                .map(|e| format!("edge '{}'", e.id)),
        );
        if !used_by.is_empty() {
            return Err(ModelError::VariableInUse { name: name.to_string(), used_by });
        }
        self.variables
            .remove(name)
            .ok_or_else(|| ModelError::UnknownVariable { name: name.to_string() })
    }

    // --- Edge mutations ---

    pub fn add_edge(&mut self, edge: Edge) -> Result<(), ModelError> {
        if self.edges.contains_key(&edge.id) {
            return Err(ModelError::DuplicateEdge { id: edge.id });
        }
        self.check_edge(&edge)?;
        self.edges.insert(edge.id.clone(), edge);
        Ok(())
    }

    pub fn update_edge(&mut self, edge: Edge) -> Result<(), ModelError> {
        if !self.edges.contains_key(&edge.id) {
            return Err(ModelError::UnknownEdge { id: edge.id });
        }
        self.check_edge(&edge)?;
        self.edges.insert(edge.id.clone(), edge);
        Ok(())
    }

    pub fn remove_edge(&mut self, id: &str) -> Result<Edge, ModelError> {
        self.edges
            .remove(id)
            .ok_or_else(|| ModelError::UnknownEdge { id: id.to_string() })
    }

    // --- Integrity ---

    /// Scans the whole model and returns every integrity violation: plain
    /// dependencies and edge endpoints naming absent variables, and
    /// out-of-range edge metadata (reachable via deserialization, which
    /// bypasses mutation validation).
    pub fn check_integrity(&self) -> Vec<ModelError> {
        let mut errors = Vec::new();
        for variable in self.variables.values() {
            for token in &variable.dependencies {
                let (base, temporal) = formula::reference_base(token);
                if !temporal && !self.variables.contains_key(base) {
                    errors.push(ModelError::MissingVariable {
                        dependency: base.to_string(),
                        referenced_by: variable.name.clone(),
                    });
                }
            }
        }
        for edge in self.edges.values() {
            for endpoint in [&edge.source, &edge.target] {
                if !self.variables.contains_key(endpoint) {
                    errors.push(ModelError::MissingEdgeEndpoint {
                        id: edge.id.clone(),
                        name: endpoint.clone(),
                    });
                }
            }
            if !(0.0..=1.0).contains(&edge.strength) {
                errors.push(ModelError::StrengthOutOfRange { value: edge.strength });
            }
            if !(0.0..=1.0).contains(&edge.confidence) {
                errors.push(ModelError::ConfidenceOutOfRange { value: edge.confidence });
            }
        }
        errors
    }

    fn check_variable_refs(&self, variable: &Variable) -> Result<(), ModelError> {
        for token in &variable.dependencies {
            let (base, temporal) = formula::reference_base(token);
            if temporal {
                continue;
            }
            if base != variable.name && !self.variables.contains_key(base) {
                return Err(ModelError::MissingVariable {
                    dependency: base.to_string(),
                    referenced_by: variable.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_edge(&self, edge: &Edge) -> Result<(), ModelError> {
        for endpoint in [&edge.source, &edge.target] {
            if !self.variables.contains_key(endpoint) {
                return Err(ModelError::MissingEdgeEndpoint {
                    id: edge.id.clone(),
                    name: endpoint.clone(),
                });
            }
        }
        if !(0.0..=1.0).contains(&edge.strength) {
            return Err(ModelError::StrengthOutOfRange { value: edge.strength });
        }
        if !(0.0..=1.0).contains(&edge.confidence) {
            return Err(ModelError::ConfidenceOutOfRange { value: edge.confidence });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> Model {
        let mut model = Model::new("demo");
        model
            .add_variable(Variable::seeded(
                "REVENUE",
                VariableKind::Parameter,
                vec![100.0, 110.0, 121.0],
            ))
            .unwrap();
        model
            .add_variable(
                Variable::computed("COGS", VariableKind::Series, "REVENUE * 0.3").unwrap(),
            )
            .unwrap();
        model
    }

    #[test]
    fn rejects_duplicate_variable() {
        let mut model = sample_model();
        let err = model
            .add_variable(Variable::seeded("REVENUE", VariableKind::Scalar, vec![]))
            .unwrap_err();
        assert_eq!(err, ModelError::DuplicateVariable { name: "REVENUE".into() });
    }

    #[test]
    fn rejects_dangling_plain_dependency() {
        let mut model = sample_model();
        let err = model
            .add_variable(
                Variable::computed("EBITDA", VariableKind::Series, "REVENUE - OPEX").unwrap(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::MissingVariable {
                dependency: "OPEX".into(),
                referenced_by: "EBITDA".into(),
            }
        );
    }

    #[test]
    fn temporal_self_reference_is_legal_at_mutation_time() {
        let mut model = Model::new("m");
        model
            .add_variable(Variable::seeded("REVENUE", VariableKind::Series, vec![100.0]))
            .unwrap();
        let cash =
            Variable::computed("CASH", VariableKind::Series, "CASH[t-1] + REVENUE").unwrap();
        model.add_variable(cash).unwrap();
    }

    #[test]
    fn temporal_reference_to_absent_variable_is_not_checked_here() {
        let mut model = Model::new("m");
        // EXPENSES[t] does not exist yet; only plain references are
        // existence-checked at mutation time.
        let cash =
            Variable::computed("CASH", VariableKind::Series, "CASH[t-1] - EXPENSES[t]").unwrap();
        model.add_variable(cash).unwrap();
        assert!(model.check_integrity().is_empty());
    }

    #[test]
    fn cannot_remove_variable_still_referenced() {
        let mut model = sample_model();
        let err = model.remove_variable("REVENUE").unwrap_err();
        assert_eq!(
            err,
            ModelError::VariableInUse {
                name: "REVENUE".into(),
                used_by: vec!["COGS".into()],
            }
        );
        model.remove_variable("COGS").unwrap();
        model.remove_variable("REVENUE").unwrap();
    }

    #[test]
    fn edge_blocks_removal_too() {
        let mut model = sample_model();
        model
            .add_edge(Edge::new("e1", "REVENUE", "COGS", EdgeKind::Dependency))
            .unwrap();
        model.set_formula("COGS", None).unwrap();
        let err = model.remove_variable("REVENUE").unwrap_err();
        assert!(matches!(err, ModelError::VariableInUse { .. }));
        model.remove_edge("e1").unwrap();
        model.remove_variable("REVENUE").unwrap();
    }

    #[test]
    fn edge_endpoints_must_exist() {
        let mut model = sample_model();
        let err = model
            .add_edge(Edge::new("e1", "REVENUE", "GHOST", EdgeKind::Causal))
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::MissingEdgeEndpoint { id: "e1".into(), name: "GHOST".into() }
        );
    }

    #[test]
    fn edge_strength_is_range_checked() {
        let mut model = sample_model();
        let err = model
            .add_edge(
                Edge::new("e1", "REVENUE", "COGS", EdgeKind::Dependency).with_strength(1.5),
            )
            .unwrap_err();
        assert_eq!(err, ModelError::StrengthOutOfRange { value: 1.5 });
    }

    #[test]
    fn override_parameter_enforces_kind() {
        let mut model = sample_model();
        model.override_parameter("REVENUE", vec![200.0]).unwrap();
        assert_eq!(model.variable("REVENUE").unwrap().values, vec![200.0]);

        let err = model.override_parameter("COGS", vec![1.0]).unwrap_err();
        assert_eq!(err, ModelError::NotAParameter { name: "COGS".into() });
        let err = model.override_parameter("GHOST", vec![1.0]).unwrap_err();
        assert_eq!(err, ModelError::UnknownVariable { name: "GHOST".into() });
    }

    #[test]
    fn set_formula_revalidates_references() {
        let mut model = sample_model();
        let err = model.set_formula("COGS", Some("MISSING * 2")).unwrap_err();
        assert!(matches!(err, ModelError::MissingVariable { .. }));
        // The failed update must not have touched the stored variable.
        assert_eq!(
            model.variable("COGS").unwrap().formula.as_deref(),
            Some("REVENUE * 0.3")
        );
    }

    #[test]
    fn serde_round_trip_preserves_the_model() {
        let mut model = sample_model();
        model
            .add_edge(
                Edge::new("e1", "REVENUE", "COGS", EdgeKind::Dependency).with_strength(0.8),
            )
            .unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let back: Model = serde_json::from_str(&json).unwrap();
        assert_eq!(model, back);
    }
}
