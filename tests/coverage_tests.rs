//! Tests for the coverage reporting rules.

use std::fs;

use anyhow::{Context, Result, ensure};
use camino::{Utf8Path, Utf8PathBuf};
use rstest::rstest;
use rulegraph::ir::{LCOV_HTML_TARGET, LCOV_ZERO_TARGET, RuleGraph, Workspace};
use rulegraph::layout::ProjectLayout;
use rulegraph::toolchain::Toolchain;
use tempfile::TempDir;

fn workspace() -> Result<(TempDir, Utf8PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).context("utf8 temp dir")?;
    Ok((dir, root))
}

fn touch(root: &Utf8Path, relative: &str) -> Result<()> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {parent}"))?;
    }
    fs::write(&path, b"").with_context(|| format!("write {path}"))
}

fn layout() -> ProjectLayout {
    ProjectLayout::new(
        ["j/j_parser.cpp", "j/j_writer.cpp"],
        ["tests/test_parser.cpp", "tests/test_writer.cpp"],
    )
}

fn lcov_html_inputs(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    let graph = RuleGraph::from_layout(&layout(), &Toolchain::default(), &Workspace::new(root))
        .context("build rule graph")?;
    let rule = graph
        .get(Utf8Path::new(LCOV_HTML_TARGET))
        .context("lcov-html rule")?;
    Ok(rule.inputs.clone())
}

#[rstest]
fn fresh_checkout_has_no_coverage_inputs() -> Result<()> {
    let (_dir, root) = workspace()?;
    let inputs = lcov_html_inputs(&root)?;
    ensure!(inputs.is_empty(), "expected no inputs, got {inputs:?}");
    Ok(())
}

#[rstest]
fn instrumented_run_exposes_every_counter() -> Result<()> {
    let (_dir, root) = workspace()?;
    for counter in [
        "_out/tests/test_writer.gcda",
        "_out/j/j_writer.gcda",
        "_out/j/j_parser.gcda",
        "_out/tests/test_parser.gcda",
    ] {
        touch(&root, counter)?;
    }
    touch(&root, "_out/j/j_parser.gcno")?;
    touch(&root, "_out/j/j_parser.o")?;

    let inputs = lcov_html_inputs(&root)?;
    let expected: Vec<Utf8PathBuf> = [
        "_out/j/j_parser.gcda",
        "_out/j/j_writer.gcda",
        "_out/tests/test_parser.gcda",
        "_out/tests/test_writer.gcda",
    ]
    .into_iter()
    .map(Utf8PathBuf::from)
    .collect();
    ensure!(inputs == expected, "unexpected inputs {inputs:?}");
    Ok(())
}

#[rstest]
#[case("_out/j/j_removed.gcda")]
#[case("_out/j/j_parser.std17.gcda")]
#[case("elsewhere/j_parser.gcda")]
fn unrelated_counters_are_ignored(#[case] stray: &str) -> Result<()> {
    let (_dir, root) = workspace()?;
    touch(&root, "_out/j/j_parser.gcda")?;
    touch(&root, stray)?;

    let inputs = lcov_html_inputs(&root)?;
    ensure!(
        inputs == [Utf8PathBuf::from("_out/j/j_parser.gcda")],
        "stray counter {stray} leaked into {inputs:?}"
    );
    Ok(())
}

#[rstest]
fn lcov_zero_resets_counters_without_inputs() -> Result<()> {
    let (_dir, root) = workspace()?;
    touch(&root, "_out/j/j_parser.gcda")?;
    let graph = RuleGraph::from_layout(&layout(), &Toolchain::default(), &Workspace::new(&root))
        .context("build rule graph")?;
    let zero = graph
        .get(Utf8Path::new(LCOV_ZERO_TARGET))
        .context("lcov-zero rule")?;
    ensure!(zero.inputs.is_empty(), "lcov-zero must not have inputs");
    ensure!(
        zero.recipe.commands() == [vec!["lcov", "--directory", ".", "--zerocounters"]],
        "unexpected command {:?}",
        zero.recipe.commands()
    );
    Ok(())
}

#[rstest]
fn lcov_html_captures_then_renders() -> Result<()> {
    let (_dir, root) = workspace()?;
    let mut graph = RuleGraph::default();
    graph
        .add_coverage_rules(&Workspace::new(&root), &[])
        .context("coverage rules")?;
    let html = graph
        .get(Utf8Path::new(LCOV_HTML_TARGET))
        .context("lcov-html rule")?;
    ensure!(html.depfile.is_none(), "reporting rules carry no depfile");

    let include = format!("{root}/*");
    let [capture, render] = html.recipe.commands() else {
        anyhow::bail!("expected capture and render commands");
    };
    ensure!(
        *capture
            == [
                "lcov",
                "--directory",
                ".",
                "--capture",
                "--include",
                include.as_str(),
                "--rc",
                "lcov_branch_coverage=1",
                "--output-file",
                "_out/cov.info",
            ],
        "unexpected capture command {capture:?}"
    );
    ensure!(
        *render
            == [
                "genhtml",
                "--prefix",
                root.as_str(),
                "--rc",
                "lcov_branch_coverage=1",
                "_out/cov.info",
                "--output-directory=lcov-html",
            ],
        "unexpected render command {render:?}"
    );
    Ok(())
}

#[rstest]
fn coverage_rules_register_once() -> Result<()> {
    let (_dir, root) = workspace()?;
    let workspace = Workspace::new(&root);
    let mut graph = RuleGraph::default();
    graph
        .add_coverage_rules(&workspace, &[])
        .context("first registration")?;
    ensure!(
        graph.add_coverage_rules(&workspace, &[]).is_err(),
        "registering coverage rules twice must fail"
    );
    Ok(())
}
