//! Ninja file generator.
//!
//! This module converts a [`crate::ir::RuleGraph`] into the textual
//! representation expected by the Ninja build system, the execution engine
//! the graph is handed to. Rule blocks are sorted by digest and build edges
//! follow graph order, so the output is deterministic.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use shell_quote::{QuoteRefExt, Sh};

use crate::hasher::ActionHasher;
use crate::ir::{Rule, RuleGraph, TEST_TARGET};

macro_rules! write_kv {
    ($f:expr, $key:expr, $opt:expr) => {
        if let Some(val) = $opt {
            writeln!($f, "  {} = {}", $key, val)?;
        }
    };
}

/// Generate a Ninja build file as a string.
///
/// # Examples
///
/// ```
/// use camino::{Utf8Path, Utf8PathBuf};
/// use rulegraph::ir::{Recipe, RuleGraph};
/// use rulegraph::ninja_gen::generate;
///
/// let mut graph = RuleGraph::default();
/// graph
///     .add_rule(Utf8PathBuf::from("test"), Vec::new(), Recipe::Aggregate, None)
///     .expect("register");
/// assert_eq!(generate(&graph), "build test: phony\n\ndefault test\n");
/// ```
#[must_use]
pub fn generate(graph: &RuleGraph) -> String {
    NinjaFile { graph }.to_string()
}

struct NinjaFile<'a> {
    graph: &'a RuleGraph,
}

impl Display for NinjaFile<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut ids = Vec::new();
        let mut actions = BTreeMap::new();
        for rule in self.graph.rules() {
            let id = (!rule.recipe.is_aggregate()).then(|| ActionHasher::hash(rule));
            if let Some(id) = &id {
                actions.entry(id.clone()).or_insert(rule);
            }
            ids.push((rule, id));
        }

        for (id, rule) in &actions {
            write!(f, "{}", NamedAction { id, rule })?;
        }
        for (rule, id) in ids {
            write!(
                f,
                "{}",
                DisplayEdge {
                    rule,
                    action_id: id.as_deref(),
                }
            )?;
        }

        if self.graph.contains(Utf8Path::new(TEST_TARGET)) {
            writeln!(f, "default {TEST_TARGET}")?;
        }
        Ok(())
    }
}

/// Escape a path for use in a `build` line.
fn escape_path(path: &Utf8Path) -> String {
    path.as_str()
        .replace('$', "$$")
        .replace(' ', "$ ")
        .replace(':', "$:")
}

/// Escape a path used as a variable value; only `$` is special there.
fn escape_value(path: &Utf8Path) -> String {
    path.as_str().replace('$', "$$")
}

fn join(paths: &[Utf8PathBuf]) -> String {
    paths.iter().map(|path| escape_path(path)).join(" ")
}

/// Shell-quote each word and chain the commands so the first failure stops
/// the sequence. `$` is doubled because Ninja expands variables in commands.
fn command_line(rule: &Rule) -> String {
    rule.recipe
        .commands()
        .iter()
        .map(|argv| argv.iter().map(|word| quote(word)).join(" "))
        .join(" && ")
        .replace('$', "$$")
}

fn quote(word: &str) -> String {
    let bytes: Vec<u8> = word.quoted(Sh);
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            debug_assert!(false, "shell quoting produced non UTF-8 bytes: {err}");
            String::from_utf8_lossy(&err.into_bytes()).into_owned()
        }
    }
}

/// Wrapper struct to display a rule block with its identifier.
struct NamedAction<'a> {
    id: &'a str,
    rule: &'a Rule,
}

impl Display for NamedAction<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "rule {}", self.id)?;
        writeln!(f, "  command = {}", command_line(self.rule))?;
        write_kv!(f, "depfile", self.rule.depfile.as_deref().map(escape_value));
        write_kv!(f, "deps", self.rule.depfile.as_ref().map(|_| "gcc"));
        writeln!(f)
    }
}

/// Wrapper struct to display a build edge.
struct DisplayEdge<'a> {
    rule: &'a Rule,
    action_id: Option<&'a str>,
}

impl Display for DisplayEdge<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let action = self.action_id.unwrap_or("phony");
        write!(f, "build {}: {action}", escape_path(&self.rule.target))?;
        if !self.rule.inputs.is_empty() {
            write!(f, " {}", join(&self.rule.inputs))?;
        }
        writeln!(f)?;
        writeln!(f)
    }
}
