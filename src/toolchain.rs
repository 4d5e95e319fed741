//! Compiler configurations and the linker invocation.
//!
//! The primary configuration builds instrumented objects that are linked into
//! the test executables. The compatibility configuration recompiles the
//! library under a newer language standard purely to prove it still builds;
//! its objects are never linked, so they carry no instrumentation.
//!
//! The compiler driver defaults to `g++` and is overridden by `CXX`.

use std::env;

/// Environment variable overriding the compiler and linker driver.
pub const CXX_ENV: &str = "CXX";

const DEFAULT_CXX: &str = "g++";
const WARNING_FLAGS: &[&str] = &["-Wall", "-Wextra"];
const DEBUG_FLAGS: &[&str] = &["-g", "-Og"];
const COVERAGE_FLAG: &str = "--coverage";
const LINK_COVERAGE_FLAG: &str = "-coverage";

/// A named variant of compiler flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfiguration {
    /// Human-readable name used in logs.
    pub name: String,
    /// Compiler driver invoked for every compile.
    pub compiler: String,
    /// Flags passed before the output and input arguments.
    pub flags: Vec<String>,
    /// Inserted before the artefact extension; empty for the primary
    /// configuration.
    pub suffix: String,
    /// Whether objects carry coverage instrumentation.
    pub instrumented: bool,
}

impl BuildConfiguration {
    /// The instrumented configuration linked into test executables.
    #[must_use]
    pub fn primary(compiler: &str) -> Self {
        let mut flags = standard_flags("gnu++11");
        flags.push(COVERAGE_FLAG.to_owned());
        Self {
            name: "primary".to_owned(),
            compiler: compiler.to_owned(),
            flags,
            suffix: String::new(),
            instrumented: true,
        }
    }

    /// The compile-only configuration checking a second language standard.
    #[must_use]
    pub fn compatibility(compiler: &str) -> Self {
        Self {
            name: "compatibility".to_owned(),
            compiler: compiler.to_owned(),
            flags: standard_flags("gnu++17"),
            suffix: "std17".to_owned(),
            instrumented: false,
        }
    }
}

fn standard_flags(standard: &str) -> Vec<String> {
    std::iter::once(format!("-std={standard}"))
        .chain(WARNING_FLAGS.iter().chain(DEBUG_FLAGS).map(|f| (*f).to_owned()))
        .collect()
}

/// Every tool invocation the build plan needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// Configuration for objects linked into tests.
    pub primary: BuildConfiguration,
    /// Configuration for the compile-only standard check.
    pub compatibility: BuildConfiguration,
    /// Driver used to link test executables.
    pub linker: String,
    /// Flags passed to the linker before the output argument.
    pub link_flags: Vec<String>,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::with_compiler(DEFAULT_CXX)
    }
}

impl Toolchain {
    /// Build the toolchain around a single compiler driver.
    #[must_use]
    pub fn with_compiler(compiler: &str) -> Self {
        Self {
            primary: BuildConfiguration::primary(compiler),
            compatibility: BuildConfiguration::compatibility(compiler),
            linker: compiler.to_owned(),
            link_flags: vec![LINK_COVERAGE_FLAG.to_owned()],
        }
    }

    /// Resolve the toolchain from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Testable variant that accepts an environment lookup function.
    ///
    /// `CXX` replaces the compiler of both configurations and the linker
    /// driver. An unset or blank value keeps the default.
    ///
    /// # Examples
    ///
    /// ```
    /// use rulegraph::toolchain::Toolchain;
    ///
    /// let toolchain = Toolchain::from_env_with(|key| match key {
    ///     "CXX" => Some(String::from("clang++")),
    ///     _ => None,
    /// });
    /// assert_eq!(toolchain.primary.compiler, "clang++");
    /// assert_eq!(toolchain.linker, "clang++");
    /// ```
    #[must_use]
    pub fn from_env_with<F>(read_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        read_env(CXX_ENV)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .map_or_else(Self::default, |compiler| {
                tracing::debug!(compiler = %compiler, "compiler overridden from {CXX_ENV}");
                Self::with_compiler(&compiler)
            })
    }
}
