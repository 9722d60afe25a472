//! Human/JSON output parity for CLI commands.
//!
//! Result sets are structured data in the core; this layer is where they
//! become terminal text. JSON output serializes the same structures
//! unchanged so scripts see a stable schema.

use std::io::{self, Write};

use mscbot_core::aggregate::{ResultSet, Reviewers, Section};
use mscbot_core::engine::Reply;
use serde::Serialize;

/// Output mode for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    /// Returns `true` if JSON output was requested.
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Render any serializable payload in JSON mode.
pub fn render_json<T: Serialize>(value: &T, w: &mut dyn Write) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *w, value)?;
    writeln!(w)?;
    Ok(())
}

/// Render a reply from the engine's message path.
pub fn render_reply(reply: &Reply, mode: OutputMode, w: &mut dyn Write) -> anyhow::Result<()> {
    match reply {
        Reply::Results(rs) => render_result_set(rs, mode, w),
        Reply::Text(text) => {
            if mode.is_json() {
                render_json(&serde_json::json!({ "text": text }), w)
            } else {
                writeln!(w, "{text}").map_err(Into::into)
            }
        }
        Reply::InvalidInput(complaint) => {
            if mode.is_json() {
                render_json(&serde_json::json!({ "error": complaint }), w)
            } else {
                writeln!(w, "error: {complaint}").map_err(Into::into)
            }
        }
    }
}

/// Render a result set as sectioned terminal text, or as stable JSON.
pub fn render_result_set(
    rs: &ResultSet,
    mode: OutputMode,
    w: &mut dyn Write,
) -> anyhow::Result<()> {
    if mode.is_json() {
        return render_json(rs, w);
    }

    if let Some(new) = &rs.new {
        section(w, "New / awaiting review", new, |e, w| {
            writeln!(w, "  MSC{} - {}", e.number, e.title)
        })?;
    }

    if let Some(pending) = &rs.pending {
        section(w, "Pending final comment period", pending, |e, w| {
            write!(w, "  MSC{} - {}", e.number, e.title)?;
            if let Some(disposition) = &e.disposition {
                write!(w, " ({disposition})")?;
            }
            match &e.awaiting {
                Reviewers::Known(names) if names.is_empty() => writeln!(w, " - all signed off"),
                Reviewers::Known(names) => writeln!(w, " - to review: {}", names.join(", ")),
                Reviewers::Unknown => writeln!(w, " - reviewers unknown"),
            }
        })?;
    }

    if let Some(fcp) = &rs.fcp {
        section(w, "In final comment period", fcp, |e, w| {
            write!(w, "  MSC{} - {}", e.number, e.title)?;
            match e.remaining_days {
                Some(0) => writeln!(w, " - ends today"),
                Some(1) => writeln!(w, " - ends in 1 day"),
                Some(days) => writeln!(w, " - ends in {days} days"),
                None => writeln!(w, " - end date unknown"),
            }
        })?;
    }

    if let Some(expired) = &rs.expired {
        if !expired.is_empty() {
            section(w, "FCP elapsed (needs re-label)", expired, |e, w| {
                writeln!(w, "  MSC{} - {}", e.number, e.title)
            })?;
        }
    }

    Ok(())
}

fn section<T>(
    w: &mut dyn Write,
    heading: &str,
    section: &Section<T>,
    mut line: impl FnMut(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    writeln!(w, "{heading} ({})", section.count)?;
    if section.is_empty() {
        writeln!(w, "  (none)")?;
    }
    for entry in &section.entries {
        line(entry, w)?;
    }
    writeln!(w)?;
    Ok(())
}
