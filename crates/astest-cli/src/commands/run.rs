//! Run command - execute a script as a test suite

use crate::config::Config;
use crate::debugger::DebugConsole;
use astest_runtime::{RecorderOptions, RunError, RunOptions, RunSummary, Runner, WidthSource};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// Run options derived from the flags and the environment
pub fn options(debug: bool, color: bool, config: &Config) -> RunOptions {
    RunOptions {
        debug,
        recorder: RecorderOptions {
            color,
            width: config
                .term_width
                .map_or(WidthSource::Terminal, WidthSource::Fixed),
        },
    }
}

/// Run `file`, printing outcomes and the summary to stdout
///
/// In debug mode failing assertions open the interactive console.
pub fn run(file: &Path, debug: bool, color: bool, config: &Config) -> Result<RunSummary, RunError> {
    let mut runner = Runner::new(options(debug, color, config));
    if debug {
        let console = DebugConsole::new(config.history_path(), color);
        runner = runner.with_frontend(Rc::new(RefCell::new(console)));
    }
    runner.run(file)
}
