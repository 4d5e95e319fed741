//! Source-to-artefact path mapping.
//!
//! Every derived path lives under [`OUTPUT_ROOT`] and keeps the relative
//! directory of its source, so `j/j_parser.cpp` compiles to
//! `_out/j/j_parser.o`. Alternate configurations insert their suffix before
//! the extension, which keeps artefacts of different configurations apart.
//!
//! # Examples
//!
//! ```
//! use camino::Utf8Path;
//! use rulegraph::paths::{depfile_path, object_path};
//!
//! let src = Utf8Path::new("j/j_parser.cpp");
//! assert_eq!(object_path(src, "").expect("object"), "_out/j/j_parser.o");
//! assert_eq!(object_path(src, "std17").expect("object"), "_out/j/j_parser.std17.o");
//! assert_eq!(depfile_path(src, "").expect("depfile"), "_out/j/j_parser.d");
//! ```

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

use crate::ir::IrGenError;

/// Directory that holds every generated artefact.
pub const OUTPUT_ROOT: &str = "_out";
/// Extension of compilable units.
pub const SOURCE_EXTENSION: &str = "cpp";
/// Extension of compiled objects.
pub const OBJECT_EXTENSION: &str = "o";
/// Extension of compiler-emitted dependency files.
pub const DEPFILE_EXTENSION: &str = "d";
/// Extension of the counters written by instrumented binaries.
pub const COVERAGE_DATA_EXTENSION: &str = "gcda";

/// Map `source` to its object file for the configuration with `suffix`.
///
/// # Errors
///
/// Returns [`IrGenError::UnrecognisedSource`] when `source` does not end in
/// `.cpp`, [`IrGenError::DottedSourceStem`] when its stem contains a dot,
/// and [`IrGenError::SourceOutsideProject`] when it is absolute or
/// climbs out of the project with `..`.
pub fn object_path(source: &Utf8Path, suffix: &str) -> Result<Utf8PathBuf, IrGenError> {
    derived_path(source, suffix, OBJECT_EXTENSION)
}

/// Map `source` to the dependency file written next to its object.
///
/// # Errors
///
/// Fails under the same conditions as [`object_path`].
pub fn depfile_path(source: &Utf8Path, suffix: &str) -> Result<Utf8PathBuf, IrGenError> {
    derived_path(source, suffix, DEPFILE_EXTENSION)
}

/// Name of the executable linked for a test source.
///
/// The directory prefix and extension are stripped, so
/// `tests/test_parser.cpp` links to `test_parser`.
///
/// # Errors
///
/// Returns [`IrGenError::UnrecognisedSource`] when `test_source` does not end
/// in `.cpp`.
pub fn executable_path(test_source: &Utf8Path) -> Result<Utf8PathBuf, IrGenError> {
    source_stem(test_source).map(Utf8PathBuf::from)
}

/// Coverage counters written when a binary containing `object` runs.
#[must_use]
pub fn coverage_data_path(object: &Utf8Path) -> Utf8PathBuf {
    object.with_extension(COVERAGE_DATA_EXTENSION)
}

/// A dotted stem could read as `<stem>.<suffix>` and collide with another
/// source's alternate-configuration artefact, so stems must be dot-free.
fn source_stem(source: &Utf8Path) -> Result<&str, IrGenError> {
    match (source.extension(), source.file_stem()) {
        (Some(SOURCE_EXTENSION), Some(stem)) if stem.contains('.') => {
            Err(IrGenError::DottedSourceStem {
                path: source.to_path_buf(),
            })
        }
        (Some(SOURCE_EXTENSION), Some(stem)) if !stem.is_empty() => Ok(stem),
        _ => Err(IrGenError::UnrecognisedSource {
            path: source.to_path_buf(),
        }),
    }
}

fn derived_path(
    source: &Utf8Path,
    suffix: &str,
    extension: &str,
) -> Result<Utf8PathBuf, IrGenError> {
    let stem = source_stem(source)?;
    let mut path = Utf8PathBuf::from(OUTPUT_ROOT);
    for component in source.parent().into_iter().flat_map(Utf8Path::components) {
        match component {
            Utf8Component::Normal(dir) => path.push(dir),
            Utf8Component::CurDir => {}
            _ => {
                return Err(IrGenError::SourceOutsideProject {
                    path: source.to_path_buf(),
                });
            }
        }
    }

    let file_name = if suffix.is_empty() {
        format!("{stem}.{extension}")
    } else {
        format!("{stem}.{suffix}.{extension}")
    };
    path.push(file_name);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("j/j_parser.cpp", "", "_out/j/j_parser.o")]
    #[case("j/j_parser.cpp", "std17", "_out/j/j_parser.std17.o")]
    #[case("tests/test_writer.cpp", "", "_out/tests/test_writer.o")]
    #[case("main.cpp", "", "_out/main.o")]
    #[case("./j/j_quick.cpp", "", "_out/j/j_quick.o")]
    fn object_path_keeps_directories(
        #[case] source: &str,
        #[case] suffix: &str,
        #[case] expected: &str,
    ) {
        let path = object_path(Utf8Path::new(source), suffix).expect("object path");
        assert_eq!(path, Utf8PathBuf::from(expected));
    }

    #[rstest]
    #[case("", "_out/j/j_writer.d")]
    #[case("std17", "_out/j/j_writer.std17.d")]
    fn depfile_path_mirrors_object_path(#[case] suffix: &str, #[case] expected: &str) {
        let source = Utf8Path::new("j/j_writer.cpp");
        let depfile = depfile_path(source, suffix).expect("depfile path");
        let object = object_path(source, suffix).expect("object path");
        assert_eq!(depfile, Utf8PathBuf::from(expected));
        assert_eq!(depfile.with_extension(OBJECT_EXTENSION), object);
    }

    #[rstest]
    #[case("j/j.h")]
    #[case("j/j_parser.c")]
    #[case("j/Makefile")]
    #[case("j/.cpp")]
    fn unrecognised_extension_is_rejected(#[case] source: &str) {
        let err = object_path(Utf8Path::new(source), "").expect_err("must reject");
        assert!(matches!(err, IrGenError::UnrecognisedSource { .. }));
    }

    #[rstest]
    #[case("j/j_parser.std17.cpp")]
    #[case("tests/test.parser.cpp")]
    fn dotted_stems_are_rejected(#[case] source: &str) {
        let err = object_path(Utf8Path::new(source), "").expect_err("must reject");
        assert!(matches!(err, IrGenError::DottedSourceStem { .. }), "got {err:?}");
    }

    #[rstest]
    #[case("/abs/j_parser.cpp")]
    #[case("../j/j_parser.cpp")]
    #[case("j/../../j_parser.cpp")]
    fn sources_outside_the_project_are_rejected(#[case] source: &str) {
        let err = depfile_path(Utf8Path::new(source), "").expect_err("must reject");
        assert!(matches!(err, IrGenError::SourceOutsideProject { .. }));
    }

    #[rstest]
    #[case("tests/test_parser.cpp", "test_parser")]
    #[case("tests/nested/test_quick.cpp", "test_quick")]
    #[case("test_run_json_test_suite.cpp", "test_run_json_test_suite")]
    fn executable_path_strips_directory_and_extension(
        #[case] source: &str,
        #[case] expected: &str,
    ) {
        let exe = executable_path(Utf8Path::new(source)).expect("executable");
        assert_eq!(exe, Utf8PathBuf::from(expected));
    }

    #[rstest]
    fn coverage_data_sits_next_to_object() {
        let data = coverage_data_path(Utf8Path::new("_out/j/j_reader.o"));
        assert_eq!(data, Utf8PathBuf::from("_out/j/j_reader.gcda"));
    }
}
