//! Intermediate Representation structures.
//!
//! This module defines the build graph handed to the external execution
//! engine. A [`RuleGraph`] maps every target to the [`Rule`] producing it; the
//! engine orders rules by their inputs and decides staleness on its own.
//!
//! # Examples
//!
//! ```
//! use camino::Utf8PathBuf;
//! use rulegraph::ir::{Recipe, RuleGraph};
//!
//! let mut graph = RuleGraph::default();
//! graph
//!     .add_rule(
//!         Utf8PathBuf::from("hello"),
//!         vec![Utf8PathBuf::from("hello.o")],
//!         Recipe::command(["g++", "-o", "hello", "hello.o"]),
//!         None,
//!     )
//!     .expect("unique target");
//! assert_eq!(graph.len(), 1);
//! ```

mod coverage;
mod cycle;
mod graph;
mod plan;

pub use coverage::{LCOV_HTML_TARGET, LCOV_ZERO_TARGET, Workspace};
pub use graph::{Command, IrGenError, Recipe, Rule, RuleGraph};
pub use plan::{BuildOutputs, TEST_TARGET};
