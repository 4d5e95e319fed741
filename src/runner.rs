//! Graph generation entry point.
//!
//! This module keeps the binary's `main` minimal: it resolves settings from
//! the environment, assembles the rule graph for the current directory and
//! writes it out for the execution engine.

use std::env;
use std::io::Write;

use anyhow::{Context, Result, bail};
use camino::Utf8PathBuf;
use tracing::info;

use crate::ir::{RuleGraph, Workspace};
use crate::layout::ProjectLayout;
use crate::ninja_gen;
use crate::toolchain::Toolchain;

/// Environment variable selecting the output format (`ninja` or `json`).
pub const EMIT_ENV: &str = "RULEGRAPH_EMIT";
/// Environment variable enabling debug logging. Unset, blank, `0`, `false`,
/// `no` and `off` leave it disabled; any other value enables it.
pub const VERBOSE_ENV: &str = "RULEGRAPH_VERBOSE";

/// Serialisation used for the generated graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmitFormat {
    /// A Ninja build file.
    #[default]
    Ninja,
    /// The rule list as pretty-printed JSON.
    Json,
}

/// Everything the generator reads from its environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Compiler and linker invocations.
    pub toolchain: Toolchain,
    /// Output serialisation.
    pub format: EmitFormat,
    /// Whether debug logging was requested.
    pub verbose: bool,
}

impl Settings {
    /// Resolve settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when `RULEGRAPH_EMIT` names an unknown format.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Testable variant that accepts an environment lookup function.
    ///
    /// # Errors
    ///
    /// Returns an error when `RULEGRAPH_EMIT` names an unknown format.
    ///
    /// # Examples
    ///
    /// ```
    /// use rulegraph::runner::{EmitFormat, Settings};
    ///
    /// let settings = Settings::from_env_with(|key| match key {
    ///     "RULEGRAPH_EMIT" => Some(String::from("json")),
    ///     _ => None,
    /// })
    /// .expect("settings");
    /// assert_eq!(settings.format, EmitFormat::Json);
    /// assert!(!settings.verbose);
    /// ```
    pub fn from_env_with<F>(read_env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let format = match read_env(EMIT_ENV).as_deref().map(str::trim) {
            None | Some("" | "ninja") => EmitFormat::Ninja,
            Some("json") => EmitFormat::Json,
            Some(other) => bail!("{EMIT_ENV} must be `ninja` or `json`, got `{other}`"),
        };
        Ok(Self {
            toolchain: Toolchain::from_env_with(&read_env),
            format,
            verbose: read_env(VERBOSE_ENV).is_some_and(|value| is_enabled(&value)),
        })
    }
}

fn is_enabled(value: &str) -> bool {
    let trimmed = value.trim();
    !(trimmed.is_empty()
        || ["0", "false", "no", "off"]
            .iter()
            .any(|off| trimmed.eq_ignore_ascii_case(off)))
}

/// Serialise `graph` in the requested format.
///
/// # Errors
///
/// Returns an error if JSON serialisation fails.
pub fn render(graph: &RuleGraph, format: EmitFormat) -> Result<String> {
    match format {
        EmitFormat::Ninja => Ok(ninja_gen::generate(graph)),
        EmitFormat::Json => {
            let mut json = serde_json::to_string_pretty(graph).context("serialise rule graph")?;
            json.push('\n');
            Ok(json)
        }
    }
}

/// Build the graph for `layout` inside `workspace` and write it to `out`.
///
/// # Errors
///
/// Returns an error if graph construction fails or `out` cannot be written.
pub fn run<W: Write>(
    settings: &Settings,
    layout: &ProjectLayout,
    workspace: &Workspace,
    out: &mut W,
) -> Result<()> {
    let graph = RuleGraph::from_layout(layout, &settings.toolchain, workspace)
        .context("build rule graph")?;
    let rendered = render(&graph, settings.format)?;
    out.write_all(rendered.as_bytes()).context("write rule graph")?;
    out.flush().context("flush rule graph")?;
    info!(rules = graph.len(), format = ?settings.format, "emitted rule graph");
    Ok(())
}

/// Workspace rooted at the current directory.
///
/// # Errors
///
/// Returns an error when the current directory is unavailable or not UTF-8.
pub fn current_workspace() -> Result<Workspace> {
    let cwd = env::current_dir().context("determine current directory")?;
    let root = Utf8PathBuf::try_from(cwd).context("current directory is not valid UTF-8")?;
    Ok(Workspace::new(root))
}
