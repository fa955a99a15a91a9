//! Reading change events from a JSON-lines file.
//!
//! One [`ChangeEvent`] per line. Blank lines and lines starting with `#`
//! are ignored; a line that fails to parse is logged and skipped.

use std::path::Path;

use anyhow::Context;
use reviewmail_events::EventBus;
use reviewmail_notify::ChangeEvent;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Parse one line. `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> Result<Option<ChangeEvent>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

/// Publish every event in `path` on `bus`, in file order. Returns the
/// number of events published.
pub async fn replay_file(bus: &EventBus, path: &Path) -> anyhow::Result<usize> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open events file {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();
    let mut line_number = 0;
    let mut published = 0;

    while let Some(line) = lines
        .next_line()
        .await
        .with_context(|| format!("failed to read {}", path.display()))?
    {
        line_number += 1;
        match parse_line(&line) {
            Ok(Some(event)) => {
                tracing::debug!(
                    line = line_number,
                    event_type = event.kind.name(),
                    change_id = %event.change.id,
                    "Publishing change event"
                );
                bus.publish(event);
                published += 1;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, line = line_number, "Skipping malformed event");
            }
        }
    }

    Ok(published)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
