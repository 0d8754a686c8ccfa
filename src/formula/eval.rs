//! Restricted evaluation of compiled formulas.

use std::collections::HashMap;

use thiserror::Error;

use super::parser::{BinOp, CompiledFormula, Expr, Func};
use super::FormulaParseError;

/// Failures while evaluating a formula: parse/resolution problems or an
/// arithmetic fault. Division by zero is an explicit error, not an infinity.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error(transparent)]
    Parse(#[from] FormulaParseError),

    #[error("division by zero")]
    DivisionByZero,

    #[error("formula produced a non-finite value")]
    NonFinite,
}

impl CompiledFormula {
    /// Evaluates against a flat substitution map keyed by each reference's
    /// original spelling (`"REVENUE"`, `"CASH[t-1]"`).
    pub fn evaluate(&self, substitutions: &HashMap<String, f64>) -> Result<f64, EvalError> {
        self.evaluate_with(&|token| substitutions.get(token).copied())
    }

    /// Evaluates with a resolver callback instead of a materialized map.
    /// The resolver returning `None` surfaces as an unresolved-token error.
    pub fn evaluate_with(
        &self,
        resolve: &dyn Fn(&str) -> Option<f64>,
    ) -> Result<f64, EvalError> {
        let value = eval_expr(&self.expr, resolve)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(EvalError::NonFinite)
        }
    }
}

fn eval_expr(expr: &Expr, resolve: &dyn Fn(&str) -> Option<f64>) -> Result<f64, EvalError> {
    match expr {
        Expr::Number(value) => Ok(*value),
        Expr::Ref(token) => resolve(token).ok_or_else(|| {
            EvalError::Parse(FormulaParseError::UnresolvedToken { token: token.clone() })
        }),
        Expr::Neg(inner) => Ok(-eval_expr(inner, resolve)?),
        Expr::Binary { op, lhs, rhs } => {
            let l = eval_expr(lhs, resolve)?;
            let r = eval_expr(rhs, resolve)?;
            match op {
                BinOp::Add => Ok(l + r),
                BinOp::Sub => Ok(l - r),
                BinOp::Mul => Ok(l * r),
                BinOp::Div => {
                    if r == 0.0 {
                        Err(EvalError::DivisionByZero)
                    } else {
                        Ok(l / r)
                    }
                }
                BinOp::Pow => Ok(l.powf(r)),
            }
        }
        Expr::Call { func, args } => {
            let mut values = [0.0f64; 2];
            for (slot, arg) in values.iter_mut().zip(args) {
                *slot = eval_expr(arg, resolve)?;
            }
            Ok(apply(*func, values[0], values[1]))
        }
    }
}

fn apply(func: Func, a: f64, b: f64) -> f64 {
    match func {
        Func::Sin => a.sin(),
        Func::Cos => a.cos(),
        Func::Tan => a.tan(),
        Func::Asin => a.asin(),
        Func::Acos => a.acos(),
        Func::Atan => a.atan(),
        Func::Exp => a.exp(),
        Func::Ln => a.ln(),
        Func::Log10 => a.log10(),
        Func::Sqrt => a.sqrt(),
        Func::Abs => a.abs(),
        Func::Floor => a.floor(),
        Func::Ceil => a.ceil(),
        Func::Round => a.round(),
        Func::Min => a.min(b),
        Func::Max => a.max(b),
        Func::Pow => a.powf(b),
    }
}

/// One-shot convenience over [`CompiledFormula::evaluate`].
pub fn evaluate(src: &str, substitutions: &HashMap<String, f64>) -> Result<f64, EvalError> {
    CompiledFormula::compile(src)?.evaluate(substitutions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subs(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    #[test]
    fn evaluates_arithmetic_with_substitution() {
        let got = evaluate("REVENUE - REVENUE * 0.3", &subs(&[("REVENUE", 100.0)])).unwrap();
        assert_eq!(got, 70.0);
    }

    #[test]
    fn evaluates_time_offset_tokens_from_map() {
        let got = evaluate(
            "CASH[t-1] + REVENUE[t] - EXPENSES[t]",
            &subs(&[("CASH[t-1]", 1000.0), ("REVENUE[t]", 100.0), ("EXPENSES[t]", 50.0)]),
        )
        .unwrap();
        assert_eq!(got, 1050.0);
    }

    #[test]
    fn evaluates_functions_and_power() {
        let got = evaluate("max(2 ^ 3, sqrt(16)) + abs(-2)", &HashMap::new()).unwrap();
        assert_eq!(got, 10.0);
        let got = evaluate("cos(0) + ln(e)", &HashMap::new()).unwrap();
        assert!((got - 2.0).abs() < 1e-12);
    }

    #[test]
    fn unresolved_token_is_an_error() {
        let err = evaluate("A + B", &subs(&[("A", 1.0)])).unwrap_err();
        assert_eq!(
            err,
            EvalError::Parse(FormulaParseError::UnresolvedToken { token: "B".into() })
        );
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let err = evaluate("A / B", &subs(&[("A", 1.0), ("B", 0.0)])).unwrap_err();
        assert_eq!(err, EvalError::DivisionByZero);
    }

    #[test]
    fn non_finite_result_is_an_error() {
        let err = evaluate("ln(0 - 1)", &HashMap::new()).unwrap_err();
        assert_eq!(err, EvalError::NonFinite);
    }

    #[test]
    fn substitution_map_is_the_only_scope() {
        // A value for the spelled token does not leak to the base name.
        let err = evaluate("CASH", &subs(&[("CASH[t-1]", 1.0)])).unwrap_err();
        assert_eq!(
            err,
            EvalError::Parse(FormulaParseError::UnresolvedToken { token: "CASH".into() })
        );
    }
}
