//! Inspection helpers for JSON fixture documents.
//!
//! - [`tree`] renders a nested document as an indented tree
//! - [`records`] projects a list of keyed records into a map

pub mod records;
pub mod tree;

pub use records::{list_to_map, Projection, RecordError};
pub use tree::{print, render, ContainerKind, ExpandRule, TreeOptions};
