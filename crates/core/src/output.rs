//! Output sinks for command results.
//!
//! Commands never write to the process streams directly; they go through an
//! [`Output`] so the whole tree can be driven from tests.

use std::sync::{Arc, Mutex};

/// Destination for user-facing command output.
pub trait Output: Send + Sync {
    /// Writes a line to the standard stream.
    fn line(&self, text: &str);

    /// Writes a line to the error stream.
    fn error(&self, text: &str);

    /// Writes a pre-formatted block (help, version) without adding a newline.
    fn block(&self, text: &str) {
        for line in text.lines() {
            self.line(line);
        }
    }
}

/// Writes to the process stdout/stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdOutput;

impl Output for StdOutput {
    fn line(&self, text: &str) {
        println!("{}", text);
    }

    fn error(&self, text: &str) {
        eprintln!("{}", text);
    }

    fn block(&self, text: &str) {
        print!("{}", text);
    }
}

/// Captures everything written to it. Cloning shares the buffer.
#[derive(Debug, Default, Clone)]
pub struct BufferedOutput {
    lines: Arc<Mutex<Vec<String>>>,
    errors: Arc<Mutex<Vec<String>>>,
}

impl BufferedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines written to the standard stream so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Lines written to the error stream so far.
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Standard stream contents joined with newlines.
    pub fn text(&self) -> String {
        self.lines().join("\n")
    }

    /// Returns true if any standard line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }

    pub fn clear(&self) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.clear();
        }
        if let Ok(mut errors) = self.errors.lock() {
            errors.clear();
        }
    }
}

impl Output for BufferedOutput {
    fn line(&self, text: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(text.to_string());
        }
    }

    fn error(&self, text: &str) {
        if let Ok(mut errors) = self.errors.lock() {
            errors.push(text.to_string());
        }
    }
}
