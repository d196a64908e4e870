//! Line splitting and output decoration.
//!
//! [`split_lines`] scans raw child-process output into lines for a logger to
//! consume. [`decoration_pool`] is a bounded channel preloaded with every
//! decoration token and used as a semaphore: a worker receives one before it
//! starts printing a task's output and sends it back when done.

use crossbeam::channel::{bounded, Receiver, Sender};

/// Splits `bytes` into `\n`-delimited lines. A trailing partial line (no
/// final newline) is still yielded; empty input yields nothing.
pub fn split_lines(bytes: &[u8]) -> Vec<Vec<u8>> {
    if bytes.is_empty() {
        return Vec::new();
    }

    let mut lines = Vec::new();
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'\n' {
            lines.push(bytes[start..i].to_vec());
            start = i + 1;
        }
    }
    if start < bytes.len() {
        lines.push(bytes[start..].to_vec());
    }
    lines
}

/// A visual label assigned to one task's output stream: a color/prefix pair
/// a CLI sink can use to tell concurrent tasks' interleaved output apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDecoration {
    pub label: String,
}

/// Builds the fixed pool of decorations and a bounded channel preloaded with
/// all of them — acquiring one is a channel receive, releasing it is a
/// channel send, so the channel itself enforces "at most N tasks decorated
/// concurrently" without a separate semaphore type.
pub fn decoration_pool(labels: Vec<String>) -> (Sender<OutputDecoration>, Receiver<OutputDecoration>) {
    let (tx, rx) = bounded(labels.len().max(1));
    for label in labels {
        tx.send(OutputDecoration { label }).expect("pool channel just created, cannot be full");
    }
    (tx, rx)
}
