//! Cycle detection over rule inputs.
//!
//! A depth-first walk from every target in registration order. Inputs with no
//! producing rule are sources and end the walk along that branch.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;

use super::Rule;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Mark {
    /// On the current walk path.
    Open,
    /// Fully explored; reachable subgraph is acyclic.
    Done,
}

/// Outcome of walking a rule map.
pub(crate) struct CycleReport {
    /// First cycle found, starting and ending at its smallest target.
    pub(crate) cycle: Option<Vec<Utf8PathBuf>>,
    /// `(dependent, input)` pairs whose input has no producing rule.
    pub(crate) leaf_inputs: Vec<(Utf8PathBuf, Utf8PathBuf)>,
}

pub(crate) fn analyse(rules: &IndexMap<Utf8PathBuf, Rule>) -> CycleReport {
    let mut walk = Walk::new(rules);
    let cycle = rules
        .keys()
        .filter_map(|target| walk.enter(target))
        .next();
    CycleReport {
        cycle,
        leaf_inputs: walk.leaf_inputs,
    }
}

struct Walk<'a> {
    rules: &'a IndexMap<Utf8PathBuf, Rule>,
    path: Vec<&'a Utf8Path>,
    marks: HashMap<&'a Utf8Path, Mark>,
    leaf_inputs: Vec<(Utf8PathBuf, Utf8PathBuf)>,
}

impl<'a> Walk<'a> {
    fn new(rules: &'a IndexMap<Utf8PathBuf, Rule>) -> Self {
        Self {
            rules,
            path: Vec::new(),
            marks: HashMap::new(),
            leaf_inputs: Vec::new(),
        }
    }

    fn mark(&self, target: &Utf8Path) -> Option<Mark> {
        self.marks.get(target).copied()
    }

    /// Explore `target`, returning the closed cycle if one is reachable.
    fn enter(&mut self, target: &'a Utf8Path) -> Option<Vec<Utf8PathBuf>> {
        match self.mark(target) {
            Some(Mark::Done) => return None,
            Some(Mark::Open) => return Some(self.close_cycle(target)),
            None => {}
        }
        let rule = self.rules.get(target)?;

        self.marks.insert(target, Mark::Open);
        self.path.push(target);
        for input in &rule.inputs {
            if self.rules.contains_key(input) {
                if let Some(cycle) = self.enter(input) {
                    return Some(cycle);
                }
            } else {
                tracing::debug!(
                    input = %input,
                    dependent = %target,
                    "treating input without a rule as a leaf",
                );
                self.leaf_inputs
                    .push((target.to_path_buf(), input.clone()));
            }
        }
        self.path.pop();
        self.marks.insert(target, Mark::Done);
        None
    }

    fn close_cycle(&self, target: &Utf8Path) -> Vec<Utf8PathBuf> {
        let start = self
            .path
            .iter()
            .rposition(|node| *node == target)
            .unwrap_or_default();
        let mut cycle: Vec<Utf8PathBuf> = self
            .path
            .get(start..)
            .unwrap_or_default()
            .iter()
            .map(|node| node.to_path_buf())
            .collect();
        cycle.push(target.to_path_buf());
        rotate_to_smallest(cycle)
    }
}

/// Rotate a closed cycle (`first == last`) so it starts at its smallest node.
fn rotate_to_smallest(mut cycle: Vec<Utf8PathBuf>) -> Vec<Utf8PathBuf> {
    let Some((_, ring)) = cycle.split_last_mut() else {
        return cycle;
    };
    if let Some(start) = ring
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(idx, _)| idx)
    {
        ring.rotate_left(start);
    }
    if let Some(first) = cycle.first().cloned()
        && let Some(last) = cycle.last_mut()
    {
        *last = first;
    }
    cycle
}
