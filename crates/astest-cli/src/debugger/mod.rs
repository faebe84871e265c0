//! Interactive debugging for failing assertions

mod console;

pub use console::DebugConsole;
