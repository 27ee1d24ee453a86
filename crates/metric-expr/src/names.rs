//! Identifier whitelist and `$name` checks.
//!
//! Every identifier in the expression, including words inside string
//! literals and keyword-argument names, must be in [`ALLOWED_NAMES`]. Every
//! `$name` must be bound. Both checks run before parsing so a rejected
//! expression never reaches the interpreter.

use crate::error::CompileError;
use crate::lexer::{Spanned, Token};
use logos::Logos;
use std::collections::HashSet;

/// Function names, method names, keyword-argument names and string values
/// an expression may mention.
pub const ALLOWED_NAMES: &[&str] = &[
    "abs",
    "acc",
    "amplitude",
    "at",
    "autoregress",
    "avg",
    "bottom",
    "choices",
    "concat",
    "const",
    "cos",
    "cycle",
    "diff",
    "downsample",
    "end",
    "factors",
    "frag",
    "initial_phase",
    "left",
    "lines",
    "loc",
    "max",
    "median",
    "method",
    "metric1",
    "metric2",
    "min",
    "n",
    "normal",
    "padding",
    "paddings",
    "period",
    "points",
    "pos",
    "pulse",
    "rand",
    "rand_choice",
    "rand_int",
    "rect",
    "regress",
    "repeat",
    "right",
    "sample_size",
    "scale",
    "shift",
    "sin",
    "smooth",
    "start",
    "up",
    "val",
    "value",
    "values",
    "weights",
    "window_size",
    "x",
];

pub fn is_allowed(name: &str) -> bool {
    ALLOWED_NAMES.contains(&name)
}

/// Reject unknown identifiers first, then unbound `$name` references.
pub fn check_names(tokens: &[Spanned], bound: &HashSet<&str>) -> Result<(), CompileError> {
    for (token, _) in tokens {
        match token {
            Token::Ident(name) if !is_allowed(name) => {
                return Err(CompileError::Syntax(name.clone()));
            }
            Token::Str(text) => check_words(text)?,
            _ => {}
        }
    }
    for (token, _) in tokens {
        if let Token::External(name) = token {
            if !bound.contains(name.as_str()) {
                return Err(CompileError::UnknownMetric(name.clone()));
            }
        }
    }
    Ok(())
}

/// Apply the identifier check to the words inside a string literal.
fn check_words(text: &str) -> Result<(), CompileError> {
    for token in Token::lexer(text).flatten() {
        if let Token::Ident(name) = token {
            if !is_allowed(&name) {
                return Err(CompileError::Syntax(name));
            }
        }
    }
    Ok(())
}
