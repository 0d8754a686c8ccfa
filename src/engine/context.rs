//! The per-call evaluation context.

use std::collections::BTreeMap;

use crate::model::{Model, VariableKind};

/// Working state for exactly one evaluation call.
///
/// Owns a value sequence of length `horizon` per variable, the parameter
/// snapshot, and the initial-seed snapshot that pre-start lookbacks resolve
/// against. Never shared and never outlives the call.
#[derive(Debug, Clone)]
pub struct EvalContext {
    horizon: usize,
    values: BTreeMap<String, Vec<f64>>,
    parameters: BTreeMap<String, f64>,
    /// Each variable's *original* first seeded value (0 when unseeded).
    /// Lookbacks past the start of history read this, not the live table,
    /// so they are independent of both the offset magnitude and any value
    /// later written at index 0.
    initial: BTreeMap<String, f64>,
}

impl EvalContext {
    /// Seeds the context from a model: every variable's sequence is its
    /// seeded values zero-padded or truncated to `horizon`, and each
    /// Parameter variable's first seeded value lands in the parameter
    /// table.
    pub fn seed(model: &Model, horizon: usize) -> EvalContext {
        let mut values = BTreeMap::new();
        let mut parameters = BTreeMap::new();
        let mut initial = BTreeMap::new();

        for (name, variable) in model.variables() {
            let mut series = vec![0.0; horizon];
            for (slot, seeded) in series.iter_mut().zip(&variable.values) {
                *slot = *seeded;
            }
            let first = variable.values.first().copied().unwrap_or(0.0);
            if variable.kind == VariableKind::Parameter {
                parameters.insert(name.clone(), first);
            }
            initial.insert(name.clone(), first);
            values.insert(name.clone(), series);
        }

        EvalContext {
            horizon,
            values,
            parameters,
            initial,
        }
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// The live value of `name` at step `t`; `None` when the variable is
    /// not in the context or `t` is out of range.
    pub fn value_at(&self, name: &str, t: usize) -> Option<f64> {
        self.values.get(name)?.get(t).copied()
    }

    /// The original first seeded value of `name`.
    pub fn initial_of(&self, name: &str) -> Option<f64> {
        self.initial.get(name).copied()
    }

    pub fn set(&mut self, name: &str, t: usize, value: f64) {
        if let Some(series) = self.values.get_mut(name) {
            if let Some(slot) = series.get_mut(t) {
                *slot = value;
            }
        }
    }

    pub fn parameters(&self) -> &BTreeMap<String, f64> {
        &self.parameters
    }

    pub fn into_tables(self) -> (BTreeMap<String, Vec<f64>>, BTreeMap<String, f64>) {
        (self.values, self.parameters)
    }
}
