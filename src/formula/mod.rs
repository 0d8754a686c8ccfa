//! The formula language: tokenization, reference extraction, parsing and
//! restricted evaluation.
//!
//! A formula is an arithmetic expression over variable references. Two kinds
//! of reference exist: plain identifiers (`REVENUE`) and time-offset
//! references (`CASH[t-1]`). The evaluator is deliberately closed: it knows
//! the operators `+ - * / ^`, parentheses, a fixed table of math functions
//! and constants, and nothing else. All value lookups go through a flat
//! substitution map keyed by the reference's original spelling.

mod eval;
mod lexer;
mod parser;

pub use eval::{evaluate, EvalError};
pub use lexer::{reference_base, TimeRef};
pub use parser::{BinOp, CompiledFormula, Expr, Func};

use thiserror::Error;

/// Errors raised while lexing or parsing a formula, or when a reference is
/// still unresolved after substitution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaParseError {
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("malformed number '{text}' at position {pos}")]
    InvalidNumber { text: String, pos: usize },

    #[error("malformed time reference '{token}': expected name[t], name[t+N] or name[t-N]")]
    InvalidTimeRef { token: String },

    #[error("unexpected token '{found}' at position {pos}")]
    UnexpectedToken { found: String, pos: usize },

    #[error("unexpected end of formula")]
    UnexpectedEnd,

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("function '{name}' expects {expected} argument(s), got {actual}")]
    WrongArity { name: String, expected: usize, actual: usize },

    #[error("unresolved token '{token}' after substitution")]
    UnresolvedToken { token: String },
}

/// The references a formula makes to other variables.
///
/// Both lists preserve first-occurrence order and are de-duplicated by
/// spelling, so `A + A[t-1] + A` yields one plain and one temporal entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct References {
    /// Plain identifiers that are not recognized functions or constants.
    pub plain: Vec<String>,
    /// Time-offset references, with base name, offset and original spelling.
    pub temporal: Vec<TimeRef>,
}

impl References {
    /// All reference tokens in their original spelling, plain first.
    pub fn tokens(&self) -> Vec<String> {
        let mut out: Vec<String> = self.plain.clone();
        out.extend(self.temporal.iter().map(|r| r.token.clone()));
        out
    }

    pub fn is_empty(&self) -> bool {
        self.plain.is_empty() && self.temporal.is_empty()
    }
}

/// Extracts the plain and time-offset references from a formula string.
///
/// Identifiers naming a recognized function or constant are not references;
/// neither is the step symbol `t` inside a bracket.
pub fn extract_references(src: &str) -> Result<References, FormulaParseError> {
    let tokens = lexer::lex(src)?;
    let mut refs = References::default();
    for (token, _) in &tokens {
        match token {
            lexer::Token::Ident(name) if !parser::is_reserved(name) => {
                if !refs.plain.iter().any(|p| p == name) {
                    refs.plain.push(name.clone());
                }
            }
            lexer::Token::TimeRef(r) => {
                if !refs.temporal.iter().any(|p| p.token == r.token) {
                    refs.temporal.push(r.clone());
                }
            }
            _ => {}
        }
    }
    Ok(refs)
}
