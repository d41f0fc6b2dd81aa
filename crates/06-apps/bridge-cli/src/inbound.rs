//! JSON-lines input: one `{"kind": ..., "data": ...}` object per line.

use std::io::BufRead;
use std::path::Path;
use std::thread;

use anyhow::{Context, Result};
use guest_abi::{Message, MessageChannel};
use tracing::{debug, warn};

/// Parses one line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Message>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let message = serde_json::from_str(line).context("invalid inbound message")?;
    Ok(Some(message))
}

/// Reads every message from a JSON-lines file.
pub fn read_file(path: &Path) -> Result<Vec<Message>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut messages = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let parsed = parse_line(line)
            .with_context(|| format!("{}:{}", path.display(), idx + 1))?;
        messages.extend(parsed);
    }
    Ok(messages)
}

/// Feeds `reader` into `channel` from a background thread until EOF.
///
/// Malformed lines are logged and skipped.
pub fn spawn_reader<R>(reader: R, channel: MessageChannel) -> thread::JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!("inbound read failed: {err}");
                    break;
                }
            };
            match parse_line(&line) {
                Ok(Some(message)) => channel.push(message),
                Ok(None) => {}
                Err(err) => warn!("skipping inbound line: {err:#}"),
            }
        }
        debug!("inbound reader finished");
    })
}
