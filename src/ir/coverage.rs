//! Coverage reporting rules.
//!
//! `lcov-zero` resets the counters; `lcov-html` captures them into a single
//! report and renders it as HTML. The counters (`.gcda` files) only appear
//! once an instrumented test binary has run, so `lcov-html` takes as inputs
//! whatever counters exist when the graph is built. Counters are kept only
//! when they belong to an instrumented object of the current graph; leftovers
//! from removed sources are skipped.

use std::collections::HashSet;

use camino::{Utf8Path, Utf8PathBuf};
use glob::{MatchOptions, Pattern, glob_with};

use crate::paths::{COVERAGE_DATA_EXTENSION, OUTPUT_ROOT, coverage_data_path};

use super::graph::{Command, IrGenError, Recipe, RuleGraph};

/// Target resetting coverage counters.
pub const LCOV_ZERO_TARGET: &str = "lcov-zero";
/// Target rendering the HTML report; also the report directory.
pub const LCOV_HTML_TARGET: &str = "lcov-html";

const COVERAGE_REPORT: &str = "cov.info";
const BRANCH_COVERAGE: &str = "lcov_branch_coverage=1";

/// The directory the build runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    project_root: Utf8PathBuf,
}

impl Workspace {
    /// Describe a workspace rooted at `project_root`.
    ///
    /// The root should be absolute: it scopes the coverage capture and
    /// prefixes report paths.
    #[must_use]
    pub fn new(project_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    /// Root directory of the project.
    #[must_use]
    pub fn project_root(&self) -> &Utf8Path {
        &self.project_root
    }

    /// Counters present under the output tree that belong to
    /// `instrumented_objects`, relative to the project root and sorted.
    ///
    /// # Errors
    ///
    /// Returns [`IrGenError`] when the output tree cannot be read or holds a
    /// non-UTF-8 path.
    pub fn coverage_data(
        &self,
        instrumented_objects: &[Utf8PathBuf],
    ) -> Result<Vec<Utf8PathBuf>, IrGenError> {
        let expected: HashSet<Utf8PathBuf> = instrumented_objects
            .iter()
            .map(|object| coverage_data_path(object))
            .collect();

        let pattern = format!(
            "{}/{OUTPUT_ROOT}/**/*.{COVERAGE_DATA_EXTENSION}",
            Pattern::escape(self.project_root.as_str()),
        );
        let opts = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        let entries = glob_with(&pattern, opts).map_err(|source| IrGenError::CoveragePattern {
            pattern: pattern.clone(),
            source,
        })?;

        let mut found = Vec::new();
        for entry in entries {
            let raw = entry.map_err(|source| IrGenError::CoverageScan { source })?;
            let absolute = Utf8PathBuf::from_path_buf(raw)
                .map_err(|path| IrGenError::NonUtf8Path { path })?;
            let relative = absolute
                .strip_prefix(&self.project_root)
                .map_or_else(|_| absolute.clone(), Utf8Path::to_path_buf);
            if expected.contains(&relative) {
                found.push(relative);
            } else {
                tracing::debug!(path = %relative, "skipping stale coverage data");
            }
        }
        found.sort();
        Ok(found)
    }
}

impl RuleGraph {
    /// Register the `lcov-zero` and `lcov-html` rules.
    ///
    /// # Errors
    ///
    /// Returns [`IrGenError`] when the coverage targets already exist or the
    /// output tree cannot be scanned.
    pub fn add_coverage_rules(
        &mut self,
        workspace: &Workspace,
        instrumented_objects: &[Utf8PathBuf],
    ) -> Result<(), IrGenError> {
        self.add_rule(
            Utf8PathBuf::from(LCOV_ZERO_TARGET),
            Vec::new(),
            Recipe::command(["lcov", "--directory", ".", "--zerocounters"]),
            None,
        )?;

        let inputs = workspace.coverage_data(instrumented_objects)?;
        tracing::debug!(counters = inputs.len(), "discovered coverage data");
        let root = workspace.project_root().as_str();
        let report = Utf8Path::new(OUTPUT_ROOT).join(COVERAGE_REPORT);
        let include = format!("{root}/*");
        let output_dir = format!("--output-directory={LCOV_HTML_TARGET}");
        let capture = argv(&[
            "lcov",
            "--directory",
            ".",
            "--capture",
            "--include",
            &include,
            "--rc",
            BRANCH_COVERAGE,
            "--output-file",
            report.as_str(),
        ]);
        let render = argv(&[
            "genhtml",
            "--prefix",
            root,
            "--rc",
            BRANCH_COVERAGE,
            report.as_str(),
            &output_dir,
        ]);
        self.add_rule(
            Utf8PathBuf::from(LCOV_HTML_TARGET),
            inputs,
            Recipe::Commands {
                commands: vec![capture, render],
            },
            None,
        )
    }
}

fn argv(parts: &[&str]) -> Command {
    parts.iter().map(|part| (*part).to_owned()).collect()
}
