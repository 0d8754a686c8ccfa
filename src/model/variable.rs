//! The `Variable` type and its kind tag.

use serde::{Deserialize, Serialize};

use crate::formula::{self, FormulaParseError};

/// How a variable behaves during evaluation.
///
/// A closed tag rather than a trait object: the engine matches on it where
/// behavior differs (parameter snapshotting), so adding a kind is a compile
/// error everywhere it matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    /// A single value, conceptually constant over the horizon.
    Scalar,
    /// A value per time step.
    Series,
    /// An input knob; its first seeded value is snapshotted into the
    /// evaluation context's parameter table and scenario simulation may
    /// override its seeds.
    Parameter,
}

/// A named quantity in a model: seeded values, an optional formula, and the
/// reference tokens that formula makes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,

    /// Formula source, if this variable is computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,

    /// Reference tokens extracted from `formula` at mutation time, in their
    /// original spelling: plain names and time-offset forms like `X[t-1]`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    /// Seeded values, index 0 = earliest step.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Variable {
    /// A variable with seeded values and no formula.
    pub fn seeded(name: impl Into<String>, kind: VariableKind, values: Vec<f64>) -> Variable {
        Variable {
            name: name.into(),
            kind,
            formula: None,
            dependencies: Vec::new(),
            values,
            unit: None,
            description: None,
        }
    }

    /// A computed variable. Parses the formula and stores its reference
    /// tokens; fails on malformed syntax rather than deferring to the first
    /// evaluation.
    pub fn computed(
        name: impl Into<String>,
        kind: VariableKind,
        formula: &str,
    ) -> Result<Variable, FormulaParseError> {
        formula::CompiledFormula::compile(formula)?;
        let refs = formula::extract_references(formula)?;
        Ok(Variable {
            name: name.into(),
            kind,
            formula: Some(formula.to_string()),
            dependencies: refs.tokens(),
            values: Vec::new(),
            unit: None,
            description: None,
        })
    }

    pub fn with_values(mut self, values: Vec<f64>) -> Variable {
        self.values = values;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Variable {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Variable {
        self.description = Some(description.into());
        self
    }

    /// Base variable names referenced by this variable's dependency tokens,
    /// time-offset spellings collapsed.
    pub fn dependency_bases(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .iter()
            .map(|token| formula::reference_base(token).0)
    }

    /// True when the formula carries at least one time-offset reference.
    pub fn is_time_dependent(&self) -> bool {
        self.dependencies
            .iter()
            .any(|token| formula::reference_base(token).1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computed_extracts_dependency_tokens() {
        let var = Variable::computed("CASH", VariableKind::Series, "CASH[t-1] + REVENUE").unwrap();
        assert_eq!(var.dependencies, vec!["REVENUE", "CASH[t-1]"]);
        assert!(var.is_time_dependent());
        let bases: Vec<&str> = var.dependency_bases().collect();
        assert_eq!(bases, vec!["REVENUE", "CASH"]);
    }

    #[test]
    fn computed_rejects_malformed_formula() {
        let err = Variable::computed("X", VariableKind::Scalar, "A +").unwrap_err();
        assert_eq!(err, FormulaParseError::UnexpectedEnd);
    }

    #[test]
    fn seeded_variable_is_not_time_dependent() {
        let var = Variable::seeded("REVENUE", VariableKind::Parameter, vec![100.0, 110.0]);
        assert!(!var.is_time_dependent());
        assert!(var.dependencies.is_empty());
    }
}
