//! Project layout: which sources exist and what role each plays.
//!
//! Library sources are compiled under every configuration and linked into
//! every test. Each test source yields one executable. Projects that keep
//! the test runner's `main` in a shared file name it as the entry point;
//! older layouts let every test define its own.

use camino::{Utf8Path, Utf8PathBuf};

/// Source lists consumed by the build plan assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    library_sources: Vec<Utf8PathBuf>,
    test_sources: Vec<Utf8PathBuf>,
    entry_point: Option<Utf8PathBuf>,
}

impl ProjectLayout {
    /// Create a layout without a shared entry point.
    ///
    /// # Examples
    ///
    /// ```
    /// use rulegraph::layout::ProjectLayout;
    ///
    /// let layout = ProjectLayout::new(["j/j_parser.cpp"], ["tests/test_parser.cpp"]);
    /// assert_eq!(layout.library_sources().len(), 1);
    /// assert!(layout.entry_point().is_none());
    /// ```
    #[must_use]
    pub fn new<L, T, P, Q>(library_sources: L, test_sources: T) -> Self
    where
        L: IntoIterator<Item = P>,
        T: IntoIterator<Item = Q>,
        P: Into<Utf8PathBuf>,
        Q: Into<Utf8PathBuf>,
    {
        Self {
            library_sources: library_sources.into_iter().map(Into::into).collect(),
            test_sources: test_sources.into_iter().map(Into::into).collect(),
            entry_point: None,
        }
    }

    /// The JSON library and its doctest suites.
    #[must_use]
    pub fn j() -> Self {
        Self::new(
            [
                "j/j_dumper.cpp",
                "j/j_parser.cpp",
                "j/j_reader.cpp",
                "j/j_writer.cpp",
                "j/j_quick.cpp",
            ],
            [
                "tests/test_parser.cpp",
                "tests/test_dumper.cpp",
                "tests/test_reader.cpp",
                "tests/test_writer.cpp",
                "tests/test_quick.cpp",
                "tests/test_run_json_test_suite.cpp",
            ],
        )
    }

    /// Link every test against a shared entry-point source.
    #[must_use]
    pub fn with_entry_point(mut self, entry_point: impl Into<Utf8PathBuf>) -> Self {
        self.entry_point = Some(entry_point.into());
        self
    }

    /// Sources compiled into every test executable.
    #[must_use]
    pub fn library_sources(&self) -> &[Utf8PathBuf] {
        &self.library_sources
    }

    /// Sources that each become one test executable.
    #[must_use]
    pub fn test_sources(&self) -> &[Utf8PathBuf] {
        &self.test_sources
    }

    /// Shared test runner source, when the layout has one.
    #[must_use]
    pub fn entry_point(&self) -> Option<&Utf8Path> {
        self.entry_point.as_deref()
    }
}
