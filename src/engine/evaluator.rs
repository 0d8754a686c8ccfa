//! The two-pass, time-recursive evaluator.

use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::context::EvalContext;
use crate::error::EngineError;
use crate::formula::{self, CompiledFormula, EvalError};
use crate::graph::DependencyGraph;
use crate::model::{Model, ModelError, Variable};

/// Failures local to an evaluation run. Integrity and cycle failures from
/// the validate step surface as their own error families instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("horizon must be at least 1")]
    InvalidHorizon,

    #[error("formula of '{variable}' failed to parse: {source}")]
    Compile {
        variable: String,
        source: formula::FormulaParseError,
    },

    #[error("evaluation of '{variable}' failed at step {step}: {source}")]
    Step {
        variable: String,
        step: usize,
        source: EvalError,
    },
}

/// The values table produced by a successful evaluation, plus the parameter
/// snapshot the run was made with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationOutput {
    pub values: BTreeMap<String, Vec<f64>>,
    pub parameters: BTreeMap<String, f64>,
}

/// A named what-if: Parameter variables to re-seed before a full run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// Parameter name → replacement seeded values.
    pub overrides: BTreeMap<String, Vec<f64>>,
}

/// Where a reference token reads from during substitution.
struct RefTarget {
    base: String,
    /// `None` for plain references; the relative step otherwise.
    offset: Option<i64>,
}

/// A formula-bearing variable, parsed once per evaluation call.
struct Prepared {
    name: String,
    compiled: CompiledFormula,
    refs: HashMap<String, RefTarget>,
}

impl Prepared {
    fn new(name: &str, src: &str) -> Result<Prepared, EvaluationError> {
        let wrap = |source| EvaluationError::Compile { variable: name.to_string(), source };
        let compiled = CompiledFormula::compile(src).map_err(&wrap)?;
        let references = formula::extract_references(src).map_err(&wrap)?;

        let mut refs = HashMap::new();
        for plain in &references.plain {
            refs.insert(
                plain.clone(),
                RefTarget { base: plain.clone(), offset: None },
            );
        }
        for temporal in &references.temporal {
            refs.insert(
                temporal.token.clone(),
                RefTarget { base: temporal.base.clone(), offset: Some(temporal.offset) },
            );
        }

        Ok(Prepared { name: name.to_string(), compiled, refs })
    }
}

/// Evaluates a model over a time horizon.
///
/// Borrows the model for exactly one call; there is no retained "current
/// model" state, and every call builds its own graph and context.
pub struct Evaluator<'a> {
    model: &'a Model,
}

impl<'a> Evaluator<'a> {
    pub fn new(model: &'a Model) -> Evaluator<'a> {
        Evaluator { model }
    }

    /// Runs the full state machine: validate, seed, compile, then the
    /// time-independent and time-dependent passes. Any failure discards
    /// the context wholesale; no partial values escape.
    pub fn evaluate(&self, horizon: usize) -> Result<EvaluationOutput, EngineError> {
        debug!(model = %self.model.name, horizon, "evaluation started");
        if horizon == 0 {
            return Err(EvaluationError::InvalidHorizon.into());
        }

        // 1. Validate: referential integrity, then acyclicity.
        if let Some(error) = self.model.check_integrity().into_iter().next() {
            return Err(error.into());
        }
        let graph = DependencyGraph::build(self.model);
        let order = graph.topological_order()?;

        // 2. Seed the context.
        let mut ctx = EvalContext::seed(self.model, horizon);

        // 3. Compile formulas and partition by time dependence, keeping
        // topological order within each partition.
        let mut pass_one = Vec::new();
        let mut pass_two = Vec::new();
        for &id in &order {
            let name = graph.name(id);
            let Some(variable) = self.model.variable(name) else {
                continue;
            };
            let Some(src) = variable.formula.as_deref() else {
                continue;
            };
            let prepared = Prepared::new(name, src)?;
            if graph.is_time_dependent(id) {
                pass_two.push(prepared);
            } else {
                pass_one.push(prepared);
            }
        }

        // 4. Pass 1: time-independent variables read their dependencies at
        // the current step.
        for t in 0..horizon {
            for prepared in &pass_one {
                let value = prepared
                    .compiled
                    .evaluate_with(&|token| ctx.value_at(token, t))
                    .map_err(|source| EvaluationError::Step {
                        variable: prepared.name.clone(),
                        step: t,
                        source,
                    })?;
                ctx.set(&prepared.name, t, value);
            }
        }

        // 5. Pass 2: time-dependent variables; offset references resolve
        // against history, the initial snapshot, or the clamped last step.
        for t in 0..horizon {
            for prepared in &pass_two {
                let value = prepared
                    .compiled
                    .evaluate_with(&|token| {
                        let target = prepared.refs.get(token)?;
                        match target.offset {
                            None => ctx.value_at(&target.base, t),
                            Some(offset) => {
                                let resolved = t as i64 + offset;
                                if resolved < 0 {
                                    ctx.initial_of(&target.base)
                                } else if resolved >= horizon as i64 {
                                    ctx.value_at(&target.base, horizon - 1)
                                } else {
                                    ctx.value_at(&target.base, resolved as usize)
                                }
                            }
                        }
                    })
                    .map_err(|source| EvaluationError::Step {
                        variable: prepared.name.clone(),
                        step: t,
                        source,
                    })?;
                ctx.set(&prepared.name, t, value);
            }
        }

        let (values, parameters) = ctx.into_tables();
        debug!(model = %self.model.name, variables = values.len(), "evaluation finished");
        Ok(EvaluationOutput { values, parameters })
    }

    /// Evaluates one variable by running the full algorithm over the
    /// sub-model of the variable and its transitive dependencies, which
    /// guarantees the same semantics as a full-model run.
    pub fn evaluate_variable(&self, name: &str, horizon: usize) -> Result<Vec<f64>, EngineError> {
        if self.model.variable(name).is_none() {
            return Err(ModelError::UnknownVariable { name: name.to_string() }.into());
        }
        let graph = DependencyGraph::build(self.model);
        let needed = graph.transitive_dependencies(name).unwrap_or_default();

        let variables: BTreeMap<String, Variable> = self
            .model
            .variables()
            .iter()
            .filter(|(var_name, _)| needed.contains(*var_name))
            .map(|(var_name, variable)| (var_name.clone(), variable.clone()))
            .collect();
        let sub = Model::from_parts(self.model.name.clone(), variables, BTreeMap::new());

        let mut output = Evaluator::new(&sub).evaluate(horizon)?;
        output
            .values
            .remove(name)
            .ok_or_else(|| EngineError::from(ModelError::UnknownVariable { name: name.to_string() }))
    }

    /// Runs each scenario against its own clone of the model. Scenarios are
    /// independent, so they fan out across threads; results are keyed by
    /// scenario name and insensitive to run order.
    pub fn simulate(
        &self,
        scenarios: &[Scenario],
        horizon: usize,
    ) -> Result<BTreeMap<String, EvaluationOutput>, EngineError> {
        let results: Result<Vec<(String, EvaluationOutput)>, EngineError> = scenarios
            .par_iter()
            .map(|scenario| {
                let mut model = self.model.clone();
                for (name, values) in &scenario.overrides {
                    model.override_parameter(name, values.clone())?;
                }
                debug!(scenario = %scenario.name, "scenario run");
                let output = Evaluator::new(&model).evaluate(horizon)?;
                Ok((scenario.name.clone(), output))
            })
            .collect();
        Ok(results?.into_iter().collect())
    }
}
