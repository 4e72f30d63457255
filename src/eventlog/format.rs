//! Line format for session events
//!
//! Format: `<ts> | <rel>s | gameId=<id> | <payload>`
//! - ts = RFC 3339 UTC timestamp with millisecond precision; the decoder also
//!   takes the extended form without an offset (read as UTC), but not the
//!   ISO-8601 basic form
//! - rel = seconds since session start, always three decimals
//! - payload = keyword plus type specific fields
//!
//! Examples:
//! ```text
//! 2025-09-09T20:23:00.172Z | 0.000s | gameId=20250909-202300-172-6e68 | GAME_START | settings={grid=4x4,duration_ms=10000,mole_up_ms=[650,1200],idle_gap_ms=[220,500]}
//! 2025-09-09T20:23:00.272Z | 0.100s | gameId=20250909-202300-172-6e68 | SHOW  @ r2c3 (#6)
//! 2025-09-09T20:23:00.791Z | 0.619s | gameId=20250909-202300-172-6e68 | HIT   @ r2c3 (#6) | pos_rel=(0.412,0.530) | score=1
//! 2025-09-09T20:23:01.020Z | 0.848s | gameId=20250909-202300-172-6e68 | MISS  @ r1c1 (#0) | pos_rel=(0.900,0.100)
//! 2025-09-09T20:23:10.172Z | 10.000s | gameId=20250909-202300-172-6e68 | GAME_END | final_score=1
//! ```

use crate::event::{Event, EventKind, RelPos};
use crate::grid::CellRef;
use crate::settings::{MsRange, SettingsSnapshot};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Write;

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `1234` -> `1.234s`
pub fn format_rel_secs(ms: u64) -> String {
    format!("{}.{:03}s", ms / 1000, ms % 1000)
}

fn fmt_range(r: MsRange) -> String {
    format!("[{},{}]", r.min, r.max)
}

fn fmt_cell(cell: &CellRef) -> String {
    format!("r{}c{} (#{})", cell.row, cell.col, cell.index)
}

fn fmt_pos(pos: &RelPos) -> String {
    format!("pos_rel=({:.3},{:.3})", pos.x, pos.y)
}

/// `settings={...}`. Unknown fields are left out, which decodes back to unknown.
pub fn format_settings(s: &SettingsSnapshot) -> String {
    let mut fields = Vec::with_capacity(4);
    if let Some(grid) = s.grid {
        fields.push(format!("grid={}x{}", grid.rows, grid.cols));
    }
    if let Some(d) = s.duration_ms {
        fields.push(format!("duration_ms={}", d));
    }
    if let Some(r) = s.mole_up_ms {
        fields.push(format!("mole_up_ms={}", fmt_range(r)));
    }
    if let Some(r) = s.idle_gap_ms {
        fields.push(format!("idle_gap_ms={}", fmt_range(r)));
    }
    format!("settings={{{}}}", fields.join(","))
}

pub fn format_payload(kind: &EventKind) -> String {
    // cell events pad the keyword so the `@` column lines up
    let keyword = format!("{:<5}", kind.event_type().to_string());
    match kind {
        EventKind::SessionStart { settings } => {
            format!("GAME_START | {}", format_settings(settings))
        }
        EventKind::SessionEnd { final_score } => format!("GAME_END | final_score={}", final_score),
        EventKind::Show { cell } | EventKind::Hide { cell } => {
            format!("{} @ {}", keyword, fmt_cell(cell))
        }
        EventKind::Hit {
            cell,
            pos_rel,
            score,
        } => format!(
            "{} @ {} | {} | score={}",
            keyword,
            fmt_cell(cell),
            fmt_pos(pos_rel),
            score
        ),
        EventKind::Miss { cell, pos_rel } => {
            format!("{} @ {} | {}", keyword, fmt_cell(cell), fmt_pos(pos_rel))
        }
        EventKind::Unknown { raw } => raw.clone(),
    }
}

/// Encode one event as one line (no trailing newline).
pub fn format_event(event: &Event) -> String {
    format!(
        "{} | {} | gameId={} | {}",
        format_timestamp(&event.ts),
        format_rel_secs(event.t_rel_ms),
        event.game_id,
        format_payload(&event.kind)
    )
}

/// Growing log of encoded lines for one session.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    lines: Vec<String>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the encoded event and returns the new line.
    pub fn push(&mut self, event: &Event) -> &str {
        self.lines.push(format_event(event));
        self.lines.last().map(String::as_str).unwrap_or_default()
    }

    pub fn extend<'a>(&mut self, events: impl IntoIterator<Item = &'a Event>) {
        for ev in events {
            self.push(ev);
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Newline-terminated text of the whole log.
    pub fn to_text(&self) -> String {
        self.lines.iter().fold(String::new(), |mut out, line| {
            let _ = writeln!(out, "{}", line);
            out
        })
    }
}
