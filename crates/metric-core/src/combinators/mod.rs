//! Combinators: nodes deriving their output from child metrics.
//!
//! Every constructor coerces its operands (see [`coerce`](crate::coerce)),
//! so plain numbers, sequences and position maps are accepted wherever a
//! child metric is expected.

pub mod arithmetic;
pub mod extrema;
pub mod periodic;
pub mod pulse;
pub mod unary;
pub mod window;

pub use arithmetic::{Arithmetic, ArithmeticOp, Concat};
pub use extrema::{Extremum, ExtremumOp};
pub use periodic::{Cycle, Repeat};
pub use pulse::Pulse;
pub use unary::{Abs, Acc, Diff, Shift};
pub use window::{AutoRegress, Downsample, DownsampleMethod, Regress, Smooth};
