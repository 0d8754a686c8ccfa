//! Declaratively built computation graphs with time-recursive evaluation.
//!
//! A [`model::Model`] owns named variables whose formulas reference each
//! other, plainly (`REVENUE - COGS`) or across discrete time steps
//! (`CASH[t-1] + REVENUE[t]`). The [`graph`] module derives the dependency
//! structure from those formulas, orders it and hunts cycles; the
//! [`engine`] evaluates the whole model over a horizon, resolving temporal
//! recursion deterministically. The [`api`] module exposes the four
//! operation contracts external front ends consume.
//!
//! ```
//! use modelgraph_core::engine::Evaluator;
//! use modelgraph_core::model::{Model, Variable, VariableKind};
//!
//! let mut model = Model::new("forecast");
//! model.add_variable(Variable::seeded(
//!     "REVENUE",
//!     VariableKind::Parameter,
//!     vec![100.0, 110.0, 121.0],
//! ))?;
//! model.add_variable(Variable::computed(
//!     "COGS",
//!     VariableKind::Series,
//!     "REVENUE * 0.3",
//! )?)?;
//!
//! let output = Evaluator::new(&model).evaluate(3)?;
//! assert_eq!(output.values["COGS"].len(), 3);
//! # Ok::<(), modelgraph_core::EngineError>(())
//! ```

pub mod api;
pub mod engine;
pub mod error;
pub mod formula;
pub mod graph;
pub mod model;
pub mod store;
pub mod validation;

pub use engine::{EvaluationOutput, Evaluator, Scenario};
pub use error::{EngineError, EngineResult};
pub use graph::{DependencyGraph, GraphSummary};
pub use model::{Edge, EdgeKind, Model, Variable, VariableKind};
pub use validation::{validate_model, ValidationReport};
