//! Sink for `print` statements

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

pub trait Output: Send {
    fn write_line(&mut self, line: &str);
}

/// Writes to the process stdout
#[derive(Debug, Default)]
pub struct StdOutput;

impl Output for StdOutput {
    fn write_line(&mut self, line: &str) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        // a closed stdout is not a script error
        let _ = writeln!(lock, "{line}");
    }
}

/// Collects printed lines; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct CaptureOutput {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CaptureOutput {
    pub fn new() -> Self {
        CaptureOutput::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn text(&self) -> String {
        self.lines.lock().join("\n")
    }
}

impl Output for CaptureOutput {
    fn write_line(&mut self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}
