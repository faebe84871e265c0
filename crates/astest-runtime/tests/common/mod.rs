//! Shared helpers for astest runtime integration tests

#![allow(dead_code)]

use astest_runtime::{RecorderOptions, RunOptions, Runner, WidthSource};
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use tempfile::NamedTempFile;

/// Writer whose contents stay readable after the runner takes it
#[derive(Clone, Default)]
pub struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }

    /// Output without the final summary line, whose timing varies
    pub fn outcome_lines(&self) -> String {
        let text = self.text();
        let mut lines: Vec<&str> = text.lines().collect();
        lines.pop();
        lines.join("\n")
    }
}

/// Write `text` to a temporary script file
pub fn script(text: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".tst").tempfile().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

/// Uncoloured options at a fixed width
pub fn plain_options(debug: bool, width: usize) -> RunOptions {
    RunOptions {
        debug,
        recorder: RecorderOptions {
            color: false,
            width: WidthSource::Fixed(width),
        },
    }
}

/// Runner writing into a fresh buffer
pub fn capturing_runner(debug: bool) -> (Runner, SharedBuf) {
    let buf = SharedBuf::default();
    let runner = Runner::new(plain_options(debug, 30)).with_output(Box::new(buf.clone()));
    (runner, buf)
}
