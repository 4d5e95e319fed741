//! Rule graph types and registration.

use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use itertools::Itertools;
use miette::Diagnostic;
use serde::{Serialize, Serializer};
use thiserror::Error;

use super::cycle::{self, CycleReport};
use crate::paths::OBJECT_EXTENSION;

/// A single shell-invocable argument vector.
pub type Command = Vec<String>;

/// How a rule produces its target.
///
/// Aggregate rules are their own variant and never carry a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recipe {
    /// Run each argument vector in order. The rule fails as soon as one
    /// command exits non-zero, and its target is not considered fresh.
    Commands {
        /// Argument vectors executed in sequence.
        commands: Vec<Command>,
    },
    /// Build every input and succeed without running anything.
    Aggregate,
}

impl Recipe {
    /// A recipe consisting of a single command.
    ///
    /// # Examples
    ///
    /// ```
    /// use rulegraph::ir::Recipe;
    ///
    /// let recipe = Recipe::command(["true"]);
    /// assert!(!recipe.is_aggregate());
    /// ```
    #[must_use]
    pub fn command<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Commands {
            commands: vec![argv.into_iter().map(Into::into).collect()],
        }
    }

    /// Return `true` for the no-op aggregate sentinel.
    #[must_use]
    pub const fn is_aggregate(&self) -> bool {
        matches!(self, Self::Aggregate)
    }

    /// Commands run for this recipe; empty for aggregates.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        match self {
            Self::Commands { commands } => commands,
            Self::Aggregate => &[],
        }
    }
}

/// A node in the build graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    /// Output path or symbolic name produced by the rule.
    pub target: Utf8PathBuf,
    /// Paths the target depends on, in declaration order.
    pub inputs: Vec<Utf8PathBuf>,
    /// How the target is produced.
    pub recipe: Recipe,
    /// Compiler-emitted file listing further implicit inputs. Only object
    /// compile rules carry one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depfile: Option<Utf8PathBuf>,
}

/// Mapping from target to the rule producing it.
///
/// Insertion order is kept for diagnostics and deterministic output; it has no
/// bearing on execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleGraph {
    rules: IndexMap<Utf8PathBuf, Rule>,
}

impl RuleGraph {
    /// Register the rule producing `target`.
    ///
    /// # Errors
    ///
    /// Returns [`IrGenError::DuplicateTarget`] when `target` already has a
    /// rule, and [`IrGenError::DepfileOnNonObject`] when a dependency file is
    /// attached to anything other than an object file.
    pub fn add_rule(
        &mut self,
        target: Utf8PathBuf,
        inputs: Vec<Utf8PathBuf>,
        recipe: Recipe,
        depfile: Option<Utf8PathBuf>,
    ) -> Result<(), IrGenError> {
        if self.rules.contains_key(&target) {
            return Err(IrGenError::DuplicateTarget { target });
        }
        if let Some(depfile) = &depfile
            && target.extension() != Some(OBJECT_EXTENSION)
        {
            return Err(IrGenError::DepfileOnNonObject {
                target,
                depfile: depfile.clone(),
            });
        }

        tracing::debug!(
            target = %target,
            inputs = inputs.len(),
            aggregate = recipe.is_aggregate(),
            "registered rule",
        );
        let rule = Rule {
            target: target.clone(),
            inputs,
            recipe,
            depfile,
        };
        self.rules.insert(target, rule);
        Ok(())
    }

    /// Look up the rule producing `target`.
    #[must_use]
    pub fn get(&self, target: &Utf8Path) -> Option<&Rule> {
        self.rules.get(target)
    }

    /// Return `true` when some rule produces `target`.
    #[must_use]
    pub fn contains(&self, target: &Utf8Path) -> bool {
        self.rules.contains_key(target)
    }

    /// Rules in registration order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    /// Number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Return `true` when no rule has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check the graph is acyclic.
    ///
    /// Inputs without a producing rule are treated as leaves (source files)
    /// and do not fail validation.
    ///
    /// # Errors
    ///
    /// Returns [`IrGenError::CircularDependency`] describing the first cycle
    /// found.
    pub fn validate(&self) -> Result<(), IrGenError> {
        let CycleReport { cycle, leaf_inputs } = cycle::analyse(&self.rules);
        if let Some(cycle) = cycle {
            return Err(IrGenError::CircularDependency { cycle, leaf_inputs });
        }
        Ok(())
    }
}

impl Serialize for RuleGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rules.values())
    }
}

/// Errors raised while constructing a [`RuleGraph`].
///
/// All of these indicate a malformed layout or a bug in rule construction;
/// none is recoverable at runtime.
#[derive(Debug, Error, Diagnostic)]
pub enum IrGenError {
    /// A source path does not carry the compilable extension.
    #[error("source {path} does not end in .cpp")]
    #[diagnostic(code(rulegraph::ir::unrecognised_source))]
    UnrecognisedSource {
        /// Offending source path.
        path: Utf8PathBuf,
    },

    /// A source file stem contains a dot and could alias a suffixed
    /// artefact of another source.
    #[error("source {path} has a dotted file stem")]
    #[diagnostic(
        code(rulegraph::ir::dotted_source_stem),
        help("rename the source so its stem has no `.`")
    )]
    DottedSourceStem {
        /// Offending source path.
        path: Utf8PathBuf,
    },

    /// A source path is absolute or escapes the project with `..`.
    #[error("source {path} lies outside the project")]
    #[diagnostic(
        code(rulegraph::ir::source_outside_project),
        help("list sources relative to the project root")
    )]
    SourceOutsideProject {
        /// Offending source path.
        path: Utf8PathBuf,
    },

    /// Two rules claim the same target.
    #[error("target {target} is produced by more than one rule")]
    #[diagnostic(
        code(rulegraph::ir::duplicate_target),
        help("check for test sources sharing a file name across directories")
    )]
    DuplicateTarget {
        /// Target registered twice.
        target: Utf8PathBuf,
    },

    /// A dependency file was attached to a rule that does not compile an
    /// object.
    #[error("dependency file {depfile} attached to non-object target {target}")]
    #[diagnostic(code(rulegraph::ir::depfile_on_non_object))]
    DepfileOnNonObject {
        /// Target the dependency file was attached to.
        target: Utf8PathBuf,
        /// The misplaced dependency file.
        depfile: Utf8PathBuf,
    },

    /// The graph contains a dependency cycle.
    #[error("circular dependency detected: {}", .cycle.iter().join(" -> "))]
    #[diagnostic(code(rulegraph::ir::circular_dependency))]
    CircularDependency {
        /// Targets forming the cycle; the first node is repeated at the end.
        cycle: Vec<Utf8PathBuf>,
        /// `(dependent, input)` pairs whose input has no producing rule.
        leaf_inputs: Vec<(Utf8PathBuf, Utf8PathBuf)>,
    },

    /// The coverage data glob could not be compiled.
    #[error("invalid coverage data pattern {pattern}")]
    #[diagnostic(code(rulegraph::ir::coverage_pattern))]
    CoveragePattern {
        /// Pattern handed to the glob matcher.
        pattern: String,
        /// Underlying pattern error.
        #[source]
        source: glob::PatternError,
    },

    /// Reading the output tree for coverage data failed.
    #[error("failed to scan the output tree for coverage data")]
    #[diagnostic(code(rulegraph::ir::coverage_scan))]
    CoverageScan {
        /// Underlying traversal error.
        #[source]
        source: glob::GlobError,
    },

    /// A path on disk cannot be represented as UTF-8.
    #[error("path {} is not valid UTF-8", .path.display())]
    #[diagnostic(code(rulegraph::ir::non_utf8_path))]
    NonUtf8Path {
        /// The offending path.
        path: PathBuf,
    },
}
