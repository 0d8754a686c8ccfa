//! Top-level error type aggregating the per-module families.

use thiserror::Error;

use crate::engine::EvaluationError;
use crate::formula::FormulaParseError;
use crate::graph::CircularDependencyError;
use crate::model::ModelError;
use crate::store::StoreError;

/// Any failure an operation on this crate can surface.
///
/// Every family is terminal for the operation that raised it: no partial
/// results accompany an error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Formula(#[from] FormulaParseError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Cycle(#[from] CircularDependencyError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// True when the failure is a dependency cycle.
    pub fn is_cycle(&self) -> bool {
        matches!(self, EngineError::Cycle(_))
    }

    /// True when the failure happened while parsing a formula.
    pub fn is_parse(&self) -> bool {
        matches!(
            self,
            EngineError::Formula(_)
                | EngineError::Model(ModelError::Formula(_))
                | EngineError::Evaluation(EvaluationError::Compile { .. })
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_helpers() {
        let cycle: EngineError = CircularDependencyError { variable: "A".into() }.into();
        assert!(cycle.is_cycle());
        assert!(!cycle.is_parse());

        let parse: EngineError = FormulaParseError::UnexpectedEnd.into();
        assert!(parse.is_parse());
        assert!(!parse.is_cycle());
    }

    #[test]
    fn messages_pass_through_transparently() {
        let err: EngineError = ModelError::UnknownVariable { name: "X".into() }.into();
        assert_eq!(err.to_string(), "unknown variable 'X'");
    }
}
