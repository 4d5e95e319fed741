//! Layout-to-graph assembly.

use camino::{Utf8Path, Utf8PathBuf};

use crate::layout::ProjectLayout;
use crate::paths::{depfile_path, executable_path, object_path};
use crate::toolchain::{BuildConfiguration, Toolchain};

use super::{
    coverage::Workspace,
    graph::{Command, IrGenError, Recipe, RuleGraph},
};

/// Aggregate target that builds every test executable and compatibility
/// object.
pub const TEST_TARGET: &str = "test";

/// Artefacts registered by [`RuleGraph::add_build_rules`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutputs {
    /// Linked test executables, in test-source order.
    pub executables: Vec<Utf8PathBuf>,
    /// Objects compiled only to check the compatibility standard.
    pub compatibility_objects: Vec<Utf8PathBuf>,
    /// Objects carrying coverage instrumentation.
    pub instrumented_objects: Vec<Utf8PathBuf>,
}

impl RuleGraph {
    /// Assemble the complete graph for `layout`.
    ///
    /// Registers compile, link, compatibility and aggregate rules, then the
    /// coverage reporting rules, and finally checks the result is acyclic.
    ///
    /// # Errors
    ///
    /// Returns [`IrGenError`] when a source cannot be mapped to an output
    /// path, two rules claim the same target, coverage data cannot be
    /// scanned, or the graph contains a cycle.
    pub fn from_layout(
        layout: &ProjectLayout,
        toolchain: &Toolchain,
        workspace: &Workspace,
    ) -> Result<Self, IrGenError> {
        let mut graph = Self::default();
        let outputs = graph.add_build_rules(layout, toolchain)?;
        graph.add_coverage_rules(workspace, &outputs.instrumented_objects)?;
        graph.validate()?;
        tracing::info!(
            rules = graph.len(),
            executables = outputs.executables.len(),
            compatibility_objects = outputs.compatibility_objects.len(),
            "assembled rule graph",
        );
        Ok(graph)
    }

    /// Register the compile, link and aggregate rules for `layout`.
    ///
    /// # Errors
    ///
    /// Returns [`IrGenError`] when a source cannot be mapped to an output
    /// path or two rules claim the same target.
    pub fn add_build_rules(
        &mut self,
        layout: &ProjectLayout,
        toolchain: &Toolchain,
    ) -> Result<BuildOutputs, IrGenError> {
        let primary = &toolchain.primary;
        let library_objects = self.add_compiles(layout.library_sources(), primary)?;
        let test_objects = self.add_compiles(layout.test_sources(), primary)?;
        let entry_object = layout
            .entry_point()
            .map(|source| self.add_compile(source, primary))
            .transpose()?;

        let mut executables = Vec::with_capacity(layout.test_sources().len());
        for (source, object) in layout.test_sources().iter().zip(&test_objects) {
            let exe = executable_path(source)?;
            let inputs: Vec<Utf8PathBuf> = library_objects
                .iter()
                .chain(std::iter::once(object))
                .chain(entry_object.as_ref())
                .cloned()
                .collect();
            let recipe = Recipe::Commands {
                commands: vec![link_command(toolchain, &exe, &inputs)],
            };
            self.add_rule(exe.clone(), inputs, recipe, None)?;
            executables.push(exe);
        }

        let compatibility_objects =
            self.add_compiles(layout.library_sources(), &toolchain.compatibility)?;

        let aggregate_inputs = executables
            .iter()
            .chain(&compatibility_objects)
            .cloned()
            .collect();
        self.add_rule(
            Utf8PathBuf::from(TEST_TARGET),
            aggregate_inputs,
            Recipe::Aggregate,
            None,
        )?;

        let mut instrumented_objects = Vec::new();
        if primary.instrumented {
            instrumented_objects.extend(library_objects);
            instrumented_objects.extend(test_objects);
            instrumented_objects.extend(entry_object);
        }
        Ok(BuildOutputs {
            executables,
            compatibility_objects,
            instrumented_objects,
        })
    }

    fn add_compiles(
        &mut self,
        sources: &[Utf8PathBuf],
        config: &BuildConfiguration,
    ) -> Result<Vec<Utf8PathBuf>, IrGenError> {
        sources
            .iter()
            .map(|source| self.add_compile(source, config))
            .collect()
    }

    fn add_compile(
        &mut self,
        source: &Utf8Path,
        config: &BuildConfiguration,
    ) -> Result<Utf8PathBuf, IrGenError> {
        let object = object_path(source, &config.suffix)?;
        let depfile = depfile_path(source, &config.suffix)?;
        let recipe = Recipe::Commands {
            commands: vec![compile_command(config, source, &object, &depfile)],
        };
        tracing::debug!(
            source = %source,
            configuration = %config.name,
            "registering compile rule",
        );
        self.add_rule(
            object.clone(),
            vec![source.to_path_buf()],
            recipe,
            Some(depfile),
        )?;
        Ok(object)
    }
}

fn compile_command(
    config: &BuildConfiguration,
    source: &Utf8Path,
    object: &Utf8Path,
    depfile: &Utf8Path,
) -> Command {
    let mut argv = Vec::with_capacity(config.flags.len() + 9);
    argv.push(config.compiler.clone());
    argv.extend(config.flags.iter().cloned());
    argv.extend(
        ["-o", object.as_str(), "-c", source.as_str(), "-MD", "-MP", "-MF", depfile.as_str()]
            .map(str::to_owned),
    );
    argv
}

fn link_command(toolchain: &Toolchain, exe: &Utf8Path, objects: &[Utf8PathBuf]) -> Command {
    let mut argv = Vec::with_capacity(toolchain.link_flags.len() + objects.len() + 3);
    argv.push(toolchain.linker.clone());
    argv.extend(toolchain.link_flags.iter().cloned());
    argv.push("-o".to_owned());
    argv.push(exe.as_str().to_owned());
    argv.extend(objects.iter().map(|o| o.as_str().to_owned()));
    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn compile_command_requests_object_and_depfile() {
        let config = BuildConfiguration::compatibility("g++");
        let argv = compile_command(
            &config,
            Utf8Path::new("j/j_parser.cpp"),
            Utf8Path::new("_out/j/j_parser.std17.o"),
            Utf8Path::new("_out/j/j_parser.std17.d"),
        );
        assert_eq!(
            argv,
            [
                "g++",
                "-std=gnu++17",
                "-Wall",
                "-Wextra",
                "-g",
                "-Og",
                "-o",
                "_out/j/j_parser.std17.o",
                "-c",
                "j/j_parser.cpp",
                "-MD",
                "-MP",
                "-MF",
                "_out/j/j_parser.std17.d",
            ]
        );
    }

    #[rstest]
    fn link_command_lists_objects_after_output() {
        let toolchain = Toolchain::default();
        let objects = [
            Utf8PathBuf::from("_out/j/j_parser.o"),
            Utf8PathBuf::from("_out/tests/test_parser.o"),
        ];
        let argv = link_command(&toolchain, Utf8Path::new("test_parser"), &objects);
        assert_eq!(
            argv,
            [
                "g++",
                "-coverage",
                "-o",
                "test_parser",
                "_out/j/j_parser.o",
                "_out/tests/test_parser.o",
            ]
        );
    }

    #[rstest]
    fn uninstrumented_primary_reports_no_instrumented_objects() {
        let mut toolchain = Toolchain::default();
        toolchain.primary.instrumented = false;
        let layout = ProjectLayout::new(["j/j_parser.cpp"], ["tests/test_parser.cpp"]);
        let mut graph = RuleGraph::default();
        let outputs = graph.add_build_rules(&layout, &toolchain).expect("build rules");
        assert!(outputs.instrumented_objects.is_empty());
        assert_eq!(outputs.executables, [Utf8PathBuf::from("test_parser")]);
    }
}
