//! Application entry point.
//!
//! Emits the rule graph for the JSON library in the current directory on
//! standard output. Logs go to standard error so they never mix with the
//! generated file.

use std::io;
use std::process::ExitCode;

use rulegraph::layout::ProjectLayout;
use rulegraph::runner::{self, Settings};
use tracing::Level;
use tracing_subscriber::fmt;

fn main() -> ExitCode {
    let settings = Settings::from_env();
    let max_level = if settings.as_ref().is_ok_and(|s| s.verbose) {
        Level::DEBUG
    } else {
        Level::ERROR
    };
    fmt().with_max_level(max_level).with_writer(io::stderr).init();

    let result = settings.and_then(|resolved| {
        let workspace = runner::current_workspace()?;
        runner::run(
            &resolved,
            &ProjectLayout::j(),
            &workspace,
            &mut io::stdout().lock(),
        )
    });
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("graph generation failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}
