//! Lenient decoder for session event logs
//!
//! Each line is classified on its own:
//! - lines that do not have the four part `ts | rel | gameId=.. | payload`
//!   shape are noise and are skipped
//! - lines with that shape always become an event; a payload that does not
//!   fit its grammar (or has an unknown keyword) becomes `UNKNOWN` carrying
//!   the payload text verbatim
//!
//! Output order is line order; nothing is re-sorted.

use super::scanner::Scanner;
use crate::event::{Event, EventKind, RelPos};
use crate::grid::{CellRef, Grid};
use crate::settings::{MsRange, SettingsSnapshot};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tracing::trace;

/// Outcome of decoding one line.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedLine {
    Event(Event),
    /// Recognized as part of the stream, payload unreadable.
    Unknown(Event),
    Skip,
}

/// Decoded document handed to the dashboard and the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodedLog {
    #[serde(rename = "gameId")]
    pub game_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<SettingsSnapshot>,
    pub events: Vec<Event>,
}

impl DecodedLog {
    pub fn unknown_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::Unknown { .. }))
            .count()
    }

    pub fn final_score(&self) -> Option<u32> {
        self.events.iter().rev().find_map(|e| match e.kind {
            EventKind::SessionEnd { final_score } => Some(final_score),
            _ => None,
        })
    }
}

/// The four outer fields of a line.
struct Outer<'a> {
    ts: DateTime<Utc>,
    t_rel_ms: u64,
    game_id: &'a str,
    payload: &'a str,
}

fn parse_outer(line: &str) -> Option<Outer<'_>> {
    let mut parts = line.splitn(4, '|');
    let ts = parts.next()?.trim();
    let rel = parts.next()?.trim();
    let gid = parts.next()?.trim();
    let payload = parts.next()?.trim();

    let ts = parse_timestamp(ts)?;

    let mut s = Scanner::new(rel);
    let t_rel_ms = s.seconds_as_ms()?;
    s.eat("s")?;
    s.end()?;

    let game_id = gid.strip_prefix("gameId=")?;
    if game_id.is_empty() || game_id.contains(char::is_whitespace) {
        return None;
    }

    Some(Outer {
        ts,
        t_rel_ms,
        game_id,
        payload,
    })
}

/// RFC 3339, or the same extended form without an offset, read as UTC.
/// Basic-format (`20250909T202300Z`) timestamps are not accepted.
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// `|` with optional surrounding whitespace.
fn bar(s: &mut Scanner<'_>) -> Option<()> {
    s.skip_ws();
    s.eat("|")?;
    s.skip_ws();
    Some(())
}

/// `@ r<row>c<col> (#<index>)`
fn parse_cell(s: &mut Scanner<'_>) -> Option<CellRef> {
    s.skip_ws();
    s.eat("@")?;
    s.skip_ws();
    s.eat("r")?;
    let row = s.u32()?;
    s.eat("c")?;
    let col = s.u32()?;
    s.skip_ws();
    s.eat("(#")?;
    let index = usize::try_from(s.uint()?).ok()?;
    s.eat(")")?;
    if row == 0 || col == 0 {
        return None;
    }
    Some(CellRef { row, col, index })
}

/// `pos_rel=(<x>,<y>)`
fn parse_pos(s: &mut Scanner<'_>) -> Option<RelPos> {
    s.eat("pos_rel=(")?;
    let x = s.decimal()?;
    s.eat(",")?;
    let y = s.decimal()?;
    s.eat(")")?;
    Some(RelPos::new(x, y))
}

fn parse_grid(value: &str) -> Option<Grid> {
    let mut s = Scanner::new(value);
    let rows = s.u32()?;
    s.eat("x")?;
    let cols = s.u32()?;
    s.end()?;
    Some(Grid::new(rows, cols))
}

fn parse_range(value: &str) -> Option<MsRange> {
    let mut s = Scanner::new(value);
    s.eat("[")?;
    let min = s.uint()?;
    s.eat(",")?;
    let max = s.uint()?;
    s.eat("]")?;
    s.end()?;
    Some(MsRange::new(min, max))
}

fn parse_u64(value: &str) -> Option<u64> {
    let mut s = Scanner::new(value);
    let v = s.uint()?;
    s.end()?;
    Some(v)
}

/// Raw text of one `key=value` value: up to the next `,` or `}` outside brackets.
fn take_value<'a>(s: &mut Scanner<'a>) -> &'a str {
    let rest = s.rest();
    let mut depth = 0usize;
    let mut end = rest.len();
    for (i, c) in rest.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' | '}' if depth == 0 => {
                end = i;
                break;
            }
            _ => {}
        }
    }
    let value = &rest[..end];
    s.try_eat(value);
    value
}

/// `settings={k=v,...}`. The braces and `k=v` shape are required; any field
/// may be missing or unreadable and is then left unknown.
pub fn parse_settings(s: &mut Scanner<'_>) -> Option<SettingsSnapshot> {
    s.eat("settings={")?;
    let mut snap = SettingsSnapshot::default();
    loop {
        s.skip_ws();
        if s.try_eat("}") {
            break;
        }
        let key = s.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
        if key.is_empty() {
            return None;
        }
        s.eat("=")?;
        let value = take_value(s).trim();
        match key {
            "grid" => snap.grid = parse_grid(value),
            "duration_ms" => snap.duration_ms = parse_u64(value),
            "mole_up_ms" => snap.mole_up_ms = parse_range(value),
            "idle_gap_ms" => snap.idle_gap_ms = parse_range(value),
            other => trace!(key = other, "ignoring unknown settings field"),
        }
        s.skip_ws();
        if s.try_eat(",") {
            continue;
        }
        s.eat("}")?;
        break;
    }
    Some(snap)
}

/// Decode a payload. `None` means "recognized line, unreadable payload".
pub fn parse_payload(payload: &str) -> Option<EventKind> {
    let mut s = Scanner::new(payload);
    let keyword = s.take_while(|c| c.is_ascii_uppercase() || c == '_');
    let kind = match keyword {
        "GAME_START" => {
            bar(&mut s)?;
            EventKind::SessionStart {
                settings: parse_settings(&mut s)?,
            }
        }
        "GAME_END" => {
            bar(&mut s)?;
            s.eat("final_score=")?;
            EventKind::SessionEnd {
                final_score: s.u32()?,
            }
        }
        "SHOW" => EventKind::Show {
            cell: parse_cell(&mut s)?,
        },
        "HIDE" => EventKind::Hide {
            cell: parse_cell(&mut s)?,
        },
        "HIT" => {
            let cell = parse_cell(&mut s)?;
            bar(&mut s)?;
            let pos_rel = parse_pos(&mut s)?;
            bar(&mut s)?;
            s.eat("score=")?;
            EventKind::Hit {
                cell,
                pos_rel,
                score: s.u32()?,
            }
        }
        "MISS" => {
            let cell = parse_cell(&mut s)?;
            bar(&mut s)?;
            EventKind::Miss {
                cell,
                pos_rel: parse_pos(&mut s)?,
            }
        }
        _ => return None,
    };
    s.skip_ws();
    s.end()?;
    Some(kind)
}

pub fn parse_line(line: &str) -> ParsedLine {
    let line = line.trim();
    if line.is_empty() {
        return ParsedLine::Skip;
    }
    let Some(outer) = parse_outer(line) else {
        trace!(line, "skipping line outside the log grammar");
        return ParsedLine::Skip;
    };

    let known = parse_payload(outer.payload);
    let is_known = known.is_some();
    let event = Event {
        ts: outer.ts,
        t_rel_ms: outer.t_rel_ms,
        game_id: outer.game_id.to_string(),
        kind: known.unwrap_or_else(|| EventKind::Unknown {
            raw: outer.payload.to_string(),
        }),
    };
    if is_known {
        ParsedLine::Event(event)
    } else {
        trace!(payload = outer.payload, "unreadable payload kept as UNKNOWN");
        ParsedLine::Unknown(event)
    }
}

/// Decode a whole log (LF or CRLF separated).
pub fn decode(text: &str) -> DecodedLog {
    let mut out = DecodedLog::default();
    for line in text.lines() {
        let event = match parse_line(line) {
            ParsedLine::Event(ev) | ParsedLine::Unknown(ev) => ev,
            ParsedLine::Skip => continue,
        };
        if out.game_id.is_none() {
            out.game_id = Some(event.game_id.clone());
        }
        if out.settings.is_none() {
            if let EventKind::SessionStart { settings } = &event.kind {
                out.settings = Some(*settings);
            }
        }
        out.events.push(event);
    }
    out
}

pub fn decode_file<P: AsRef<Path>>(path: P) -> io::Result<DecodedLog> {
    let text = fs::read_to_string(path)?;
    Ok(decode(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const PREFIX: &str = "2025-09-09T20:23:00.172Z | 1.250s | gameId=abc-1 | ";

    fn line(payload: &str) -> String {
        format!("{PREFIX}{payload}")
    }

    #[test]
    fn garbage_is_skipped() {
        assert_eq!(parse_line("garbage text"), ParsedLine::Skip);
        let doc = decode("garbage text");
        assert!(doc.events.is_empty());
        assert_eq!(doc.game_id, None);
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json["gameId"].is_null());
    }

    #[test]
    fn outer_grammar_violations_are_skipped() {
        for bad in [
            "not-a-time | 1.000s | gameId=a | SHOW  @ r1c1 (#0)",
            "2025-09-09T20:23:00.172Z | 1.000 | gameId=a | SHOW  @ r1c1 (#0)",
            "2025-09-09T20:23:00.172Z | 1.000s | game=a | SHOW  @ r1c1 (#0)",
            "2025-09-09T20:23:00.172Z | 1.000s | gameId= | SHOW  @ r1c1 (#0)",
            "2025-09-09T20:23:00.172Z | 1.000s | gameId=a",
            "   ",
        ] {
            assert_eq!(parse_line(bad), ParsedLine::Skip, "{bad}");
        }
    }

    #[test]
    fn zone_less_timestamps_are_utc() {
        for ts in ["2025-09-09T20:23:00.172", "2025-09-09T22:23:00.172+02:00"] {
            let parsed = parse_line(&format!("{ts} | 1.250s | gameId=a | SHOW  @ r1c1 (#0)"));
            let ParsedLine::Event(ev) = parsed else {
                panic!("expected event for {ts}, got {parsed:?}");
            };
            assert_eq!(ev.ts.to_rfc3339(), "2025-09-09T20:23:00.172+00:00");
        }
        assert_eq!(
            parse_line("20250909T202300Z | 1.250s | gameId=a | SHOW  @ r1c1 (#0)"),
            ParsedLine::Skip
        );
    }

    #[test]
    fn outer_fields_are_extracted() {
        let parsed = parse_line(&line("SHOW  @ r1c2 (#1)"));
        let ParsedLine::Event(ev) = parsed else {
            panic!("expected event, got {parsed:?}");
        };
        assert_eq!(ev.t_rel_ms, 1250);
        assert_eq!(ev.game_id, "abc-1");
        assert_eq!(ev.ts.to_rfc3339(), "2025-09-09T20:23:00.172+00:00");
        assert_eq!(
            ev.kind,
            EventKind::Show {
                cell: CellRef {
                    row: 1,
                    col: 2,
                    index: 1
                }
            }
        );
    }

    #[test]
    fn hit_and_miss_payloads() {
        assert_eq!(
            parse_payload("HIT   @ r4c4 (#15) | pos_rel=(0.123,0.987) | score=3"),
            Some(EventKind::Hit {
                cell: CellRef {
                    row: 4,
                    col: 4,
                    index: 15
                },
                pos_rel: RelPos::new(0.123, 0.987),
                score: 3,
            })
        );
        assert_matches!(
            parse_payload("MISS  @ r1c1 (#0) | pos_rel=(1.000,0.000)"),
            Some(EventKind::Miss { pos_rel, .. }) if pos_rel == RelPos::new(1.0, 0.0)
        );
    }

    #[test]
    fn hit_without_index_group_is_unknown() {
        let payload = "HIT   @ r2c2 | pos_rel=(0.500,0.500) | score=1";
        let parsed = parse_line(&line(payload));
        let ParsedLine::Unknown(ev) = parsed else {
            panic!("expected unknown, got {parsed:?}");
        };
        assert_eq!(
            ev.kind,
            EventKind::Unknown {
                raw: payload.to_string()
            }
        );

        let doc = decode(&line(payload));
        assert_eq!(doc.events.len(), 1);
        assert_eq!(doc.unknown_count(), 1);
        assert_eq!(doc.game_id.as_deref(), Some("abc-1"));
    }

    #[test]
    fn unknown_keyword_and_trailing_junk_are_unknown() {
        for payload in [
            "WOBBLE @ r1c1 (#0)",
            "SHOWX @ r1c1 (#0)",
            "SHOW  @ r1c1 (#0) extra",
            "GAME_END | final_score=abc",
            "GAME_START | grid=4x4",
            "SHOW  @ r0c1 (#0)",
        ] {
            assert_matches!(parse_line(&line(payload)), ParsedLine::Unknown(_), "{payload}");
        }
    }

    #[test]
    fn settings_with_missing_fields_decode_as_unknown_markers() {
        let kind = parse_payload("GAME_START | settings={grid=3x5,idle_gap_ms=[0,40]}").unwrap();
        let EventKind::SessionStart { settings } = kind else {
            panic!("expected GAME_START");
        };
        assert_eq!(settings.grid, Some(Grid::new(3, 5)));
        assert_eq!(settings.duration_ms, None);
        assert_eq!(settings.mole_up_ms, None);
        assert_eq!(settings.idle_gap_ms, Some(MsRange::new(0, 40)));
    }

    #[test]
    fn settings_with_bad_values_or_extra_keys() {
        let kind = parse_payload(
            "GAME_START | settings={grid=4by4,duration_ms=9000,speed=[1,2],mole_up_ms=[5]}",
        )
        .unwrap();
        let EventKind::SessionStart { settings } = kind else {
            panic!("expected GAME_START");
        };
        assert_eq!(settings.grid, None);
        assert_eq!(settings.duration_ms, Some(9000));
        assert_eq!(settings.mole_up_ms, None);
        assert_eq!(settings.idle_gap_ms, None);

        assert_eq!(
            parse_payload("GAME_START | settings={}"),
            Some(EventKind::SessionStart {
                settings: SettingsSnapshot::default()
            })
        );
        assert_eq!(parse_payload("GAME_START | settings={grid=4x4"), None);
    }

    #[test]
    fn decode_keeps_line_order_and_first_ids() {
        let text = [
            "noise before the log",
            "2025-09-09T20:23:00.172Z | 0.000s | gameId=first | GAME_START | settings={grid=2x2,duration_ms=1000,mole_up_ms=[1,2],idle_gap_ms=[0,0]}",
            "",
            "2025-09-09T20:23:00.872Z | 0.700s | gameId=second | HIDE  @ r1c1 (#0)\r",
            "2025-09-09T20:23:00.272Z | 0.100s | gameId=first | SHOW  @ r1c1 (#0)",
            "2025-09-09T20:23:01.172Z | 1.000s | gameId=first | GAME_END | final_score=0",
        ]
        .join("\r\n");

        let doc = decode(&text);
        assert_eq!(doc.game_id.as_deref(), Some("first"));
        assert_eq!(doc.events.len(), 4);
        assert_eq!(doc.events[1].t_rel_ms, 700);
        assert_eq!(doc.events[2].t_rel_ms, 100);
        assert_eq!(doc.final_score(), Some(0));
        assert_eq!(
            doc.settings.and_then(|s| s.complete()).map(|s| s.grid),
            Some(Grid::new(2, 2))
        );
    }

    #[test]
    fn decode_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.log");
        fs::write(&path, line("SHOW  @ r1c1 (#0)")).unwrap();
        let doc = decode_file(&path).unwrap();
        assert_eq!(doc.events.len(), 1);
        assert!(decode_file(dir.path().join("missing.log")).is_err());
    }
}
