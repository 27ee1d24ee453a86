//! Leaf generators: nodes without children.
//!
//! - `Const` - a fixed value
//! - `Fragment` - a finite list of values, then zeros
//! - `Normal`, `Rand`, `RandInt`, `RandChoice` - random draws
//! - `Sin`, `Cos` - periodic waves

pub mod constant;
pub mod random;
pub mod wave;

pub use constant::{Const, Fragment};
pub use random::{Normal, Rand, RandChoice, RandInt};
pub use wave::{Cos, Sin};
