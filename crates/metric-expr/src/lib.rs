//! Restricted expression language for building metric graphs.
//!
//! An expression is compiled in four stages:
//!
//! 1. **Lex** with logos into numbers, identifiers, `$name` references,
//!    strings, operators and punctuation.
//! 2. **Check names**: every identifier (and every word inside a string
//!    literal) must be in [`ALLOWED_NAMES`]; every `$name` must be bound.
//! 3. **Parse** into an [`Expr`] tree with Python-style precedence.
//! 4. **Interpret** the tree into a [`Metric`].
//!
//! `#` coerces the literal that follows into a metric: `#5` is a constant,
//! `#[1, 2]` a fragment and `#{3: 1}` a pulse.
//!
//! # Example
//!
//! ```rust
//! use metric_expr::{compile, Bindings};
//!
//! let mut bindings = Bindings::new();
//! let base = compile("const(10)", &bindings).unwrap();
//! bindings.insert("base".to_string(), base.metric);
//!
//! let compiled = compile("$base + #[1, 2, 3]", &bindings).unwrap();
//! assert_eq!(compiled.bound, vec!["base".to_string()]);
//!
//! let mut metric = compiled.metric;
//! assert_eq!(metric.take(4), vec![11.0, 12.0, 13.0, 10.0]);
//! ```

pub mod ast;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod names;
pub mod parser;

pub use ast::Expr;
pub use error::CompileError;
pub use names::ALLOWED_NAMES;

use interpreter::{Interpreter, SeedSequence};
use lexer::Token;
use metric_core::Metric;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Metrics available to `$name` references.
pub type Bindings = HashMap<String, Metric>;

/// Result of a compilation.
#[derive(Debug, Clone)]
pub struct Compiled {
    /// Root of the compiled graph
    pub metric: Metric,
    /// Sorted, deduplicated names of the bindings the expression referenced
    pub bound: Vec<String>,
}

impl From<Compiled> for Metric {
    fn from(compiled: Compiled) -> Self {
        compiled.metric
    }
}

/// Expression compiler.
///
/// Without a seed, random leaves draw from entropy. With a seed, the n-th
/// random leaf constructed gets a seed derived from the base seed and `n`,
/// so compiling the same expression twice yields identical streams.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    seed: Option<u64>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Compile an expression into a metric graph.
    ///
    /// Bound metrics are cloned into the graph, so the caller's bindings are
    /// never advanced by the compiled metric. Results that are plain values
    /// (`1 + 2`, `[1, 2]`) are coerced into metrics.
    pub fn compile(&self, source: &str, bindings: &Bindings) -> Result<Compiled, CompileError> {
        let source = source.trim();
        let tokens = lexer::tokenize(source)?;
        let available: HashSet<&str> = bindings.keys().map(String::as_str).collect();
        names::check_names(&tokens, &available)?;
        let expr = parser::parse(&tokens, source.len())?;

        let mut seeds = SeedSequence::new(self.seed);
        let value = Interpreter::new(bindings, &mut seeds).eval(&expr)?;
        let metric = value.into_metric()?;

        let bound: BTreeSet<&str> = tokens
            .iter()
            .filter_map(|(token, _)| match token {
                Token::External(name) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        tracing::debug!(
            expression = source,
            kind = metric.kind(),
            bound = bound.len(),
            "compiled expression"
        );
        Ok(Compiled {
            metric,
            bound: bound.into_iter().map(str::to_string).collect(),
        })
    }
}

/// Compile with an unseeded [`Compiler`].
pub fn compile(source: &str, bindings: &Bindings) -> Result<Compiled, CompileError> {
    Compiler::new().compile(source, bindings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use metric_core::MetricError;

    fn eval(source: &str, n: usize) -> Vec<f64> {
        compile(source, &Bindings::new()).unwrap().metric.take(n)
    }

    fn bindings(pairs: &[(&str, &str)]) -> Bindings {
        let mut bindings = Bindings::new();
        for (name, source) in pairs {
            let compiled = compile(source, &bindings).unwrap();
            bindings.insert(name.to_string(), compiled.metric);
        }
        bindings
    }

    #[test]
    fn test_sigil_matches_plain_number() {
        let bound = bindings(&[("a", "frag([1, 2, 3])")]);
        let mut plain = compile("$a + 5", &bound).unwrap().metric;
        let mut lifted = compile("$a + #5", &bound).unwrap().metric;
        assert_eq!(plain.take(4), lifted.take(4));
        assert_eq!(lifted.describe()["metric2"]["type"], "Const");
    }

    #[test]
    fn test_sigil_literals() {
        assert_eq!(eval("#[1, 2] * 3", 3), vec![3.0, 6.0, 0.0]);
        assert_eq!(eval("#{3: 5, 1: 2}", 5), vec![0.0, 2.0, 0.0, 5.0, 0.0]);
        assert_eq!(eval("#7", 2), vec![7.0, 7.0]);
    }

    #[test]
    fn test_rejects_unsafe_names() {
        assert_eq!(
            compile("os.system('x')", &Bindings::new()).unwrap_err(),
            CompileError::Syntax("os".into())
        );
        assert_eq!(
            compile("$nope * 2", &Bindings::new()).unwrap_err(),
            CompileError::UnknownMetric("nope".into())
        );
    }

    #[test]
    fn test_number_folding() {
        assert_eq!(eval("1 + 2 * 3", 2), vec![7.0, 7.0]);
        assert_eq!(eval("-2 ** 2", 1), vec![-4.0]);
        assert_eq!(eval("2 ** -1", 1), vec![0.5]);
        assert_eq!(eval("7 // 2 + 7 % 3", 1), vec![4.0]);
        assert_eq!(eval("abs(-3) + min(4, 2) + max([1, 9])", 1), vec![14.0]);
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("acc(1)", 3), vec![1.0, 2.0, 3.0]);
        assert_eq!(eval("diff([1, 4, 9])", 3)[1..], [3.0, 5.0]);
        assert_eq!(eval("shift([5, 6, 7], 2)", 4), vec![0.0, 0.0, 5.0, 6.0]);
        assert_eq!(eval("smooth([2, 4, 6], window_size=2)", 3), vec![2.0, 3.0, 5.0]);
        assert_eq!(eval("concat(1, 2, at=2)", 4), vec![1.0, 1.0, 2.0, 2.0]);
        assert_eq!(eval("pulse([1, 3], [7, 8])", 4), vec![0.0, 7.0, 0.0, 8.0]);
        assert_eq!(eval("rect(1, 3, 0, 5)", 4), vec![0.0, 5.0, 5.0, 0.0]);
        assert_eq!(eval("lines([(0, 0), (2, 4)])", 4), vec![0.0, 2.0, 4.0, 4.0]);
        assert_eq!(eval("repeat(acc(1), 0, 2)", 5), vec![1.0, 2.0, 1.0, 2.0, 1.0]);
        assert_eq!(
            eval("downsample(acc(1), 2, method='max')", 3),
            vec![2.0, 4.0, 6.0]
        );
    }

    #[test]
    fn test_methods() {
        assert_eq!(eval("const(1).acc().diff()", 3)[1..], [1.0, 1.0]);
        assert_eq!(eval("acc(1).shift(-1)", 3), vec![2.0, 3.0, 4.0]);
        assert_eq!(eval("acc(1).cycle(0, 2, n=2)", 6), vec![1.0, 2.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(eval("#[1, 3].val([5, 6])", 4), vec![0.0, 5.0, 0.0, 6.0]);
        assert_eq!(eval("#[5, 6].at([1, 3])", 4), vec![0.0, 5.0, 0.0, 6.0]);
        assert_eq!(eval("const(1).concat(2, 9)", 3), vec![1.0, 1.0, 9.0]);
    }

    #[test]
    fn test_operators_on_metrics() {
        assert_eq!(eval("acc(1) << 1", 3), vec![2.0, 3.0, 4.0]);
        assert_eq!(eval("acc(1) >> 1", 3), vec![0.0, 1.0, 2.0]);
        assert_eq!(eval("[5, 6] @ #[1, 3]", 4), vec![0.0, 5.0, 0.0, 6.0]);
        assert_eq!(eval("-acc(1)", 2), vec![-1.0, -2.0]);
        assert_eq!(eval("10 - acc(1)", 2), vec![9.0, 8.0]);
    }

    #[test]
    fn test_bindings_are_copied() {
        let bound = bindings(&[("a", "acc(1)")]);
        let compiled = compile("$a + $a", &bound).unwrap();
        assert_eq!(compiled.bound, vec!["a".to_string()]);
        let mut metric = compiled.metric;
        assert_eq!(metric.take(3), vec![2.0, 4.0, 6.0]);
        assert_eq!(bound["a"].cursor(), None);
    }

    #[test]
    fn test_seeded_compiles_are_reproducible() {
        let compiler = Compiler::new().with_seed(11);
        let source = "normal(2) + rand(5) + rand_int(1, 6) + rand_choice([1, 2, 3])";
        let mut first = compiler.compile(source, &Bindings::new()).unwrap().metric;
        let mut second = compiler.compile(source, &Bindings::new()).unwrap().metric;
        assert_eq!(first.take(20), second.take(20));
    }

    #[test]
    fn test_type_and_argument_errors() {
        let empty = Bindings::new();
        assert!(matches!(compile("'avg'", &empty), Err(CompileError::Type(_))));
        assert!(matches!(compile("sin", &empty), Err(CompileError::Type(_))));
        assert!(matches!(compile("n(1)", &empty), Err(CompileError::Type(_))));
        assert!(matches!(compile("1 << 2", &empty), Err(CompileError::Type(_))));
        assert!(matches!(compile("shift(1, 0.5)", &empty), Err(CompileError::Argument { .. })));
        assert!(matches!(compile("sin()", &empty), Err(CompileError::Argument { .. })));
        assert!(matches!(compile("const(1, 2)", &empty), Err(CompileError::Argument { .. })));
        assert!(matches!(
            compile("sin(4, period=2)", &empty),
            Err(CompileError::Argument { .. })
        ));
        assert!(matches!(compile("rand(1, 2, 3)", &empty), Err(CompileError::Argument { .. })));
    }

    #[test]
    fn test_shift_amount_out_of_range() {
        let empty = Bindings::new();
        for source in [
            "acc(1) << -1e19",
            "acc(1) >> 1e19",
            "acc(1) << -9223372036854775808",
            "acc(1) << 0.5",
        ] {
            assert!(
                matches!(compile(source, &empty), Err(CompileError::Type(_))),
                "{source}"
            );
        }
        assert!(matches!(
            compile("shift(acc(1), -1e19)", &empty),
            Err(CompileError::Argument { .. })
        ));
        assert_eq!(eval("acc(1) >> -2", 2), vec![3.0, 4.0]);
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let source = format!("{}acc(1){}", "abs(".repeat(10_000), ")".repeat(10_000));
        assert!(matches!(
            compile(&source, &Bindings::new()),
            Err(CompileError::Parse { .. })
        ));
        assert_eq!(eval("abs(abs(abs(-2)))", 1), vec![2.0]);
    }

    #[test]
    fn test_constructor_errors_propagate() {
        let empty = Bindings::new();
        assert_eq!(
            compile("downsample(1, 2, method='median')", &empty).unwrap_err(),
            CompileError::Metric(MetricError::UnknownMethod("median".into()))
        );
        assert_eq!(
            compile("repeat(1, 3, 3)", &empty).unwrap_err(),
            CompileError::Metric(MetricError::InvalidWindow { start: 3, end: 3 })
        );
        assert!(matches!(
            compile("normal(-1)", &empty),
            Err(CompileError::Metric(MetricError::InvalidParameter { .. }))
        ));
    }
}
