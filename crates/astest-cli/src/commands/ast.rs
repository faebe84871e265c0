//! AST dump command - output the instrumented tree as JSON

use astest_runtime::{RunError, RunOptions, Runner, VersionedProgram};
use std::io;
use std::path::Path;

/// Instrument `file` and return the tree as pretty JSON, without running it
pub fn dump(file: &Path, debug: bool) -> Result<String, RunError> {
    let runner = Runner::new(RunOptions {
        debug,
        ..RunOptions::default()
    });
    let unit = runner.instrument(file)?;
    VersionedProgram::new(unit.program)
        .to_json()
        .map_err(|err| RunError::Output(io::Error::from(err)))
}

/// Print the instrumented tree to stdout
pub fn run(file: &Path, debug: bool) -> Result<(), RunError> {
    let json = dump(file, debug)?;
    println!("{}", json);
    Ok(())
}
