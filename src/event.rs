use crate::grid::CellRef;
use crate::settings::SettingsSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where inside a cell the player clicked, both axes in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelPos {
    pub x: f64,
    pub y: f64,
}

impl RelPos {
    /// Clamps to `[0, 1]` and quantizes to thousandths, which is the precision
    /// the log line carries.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: quantize(x),
            y: quantize(y),
        }
    }

    pub fn center() -> Self {
        Self::new(0.5, 0.5)
    }
}

fn quantize(v: f64) -> f64 {
    if v.is_nan() {
        return 0.0;
    }
    // `+ 0.0` turns -0.0 into 0.0, which would otherwise print as `-0.000`
    (v.clamp(0.0, 1.0) * 1000.0).round() / 1000.0 + 0.0
}

/// Wire keyword of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    GameStart,
    GameEnd,
    Show,
    Hide,
    Hit,
    Miss,
    Unknown,
}

/// Variant specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    #[serde(rename = "GAME_START")]
    SessionStart { settings: SettingsSnapshot },
    #[serde(rename = "GAME_END")]
    SessionEnd { final_score: u32 },
    Show { cell: CellRef },
    Hide { cell: CellRef },
    Hit {
        cell: CellRef,
        pos_rel: RelPos,
        score: u32,
    },
    Miss { cell: CellRef, pos_rel: RelPos },
    /// A line of this stream whose payload did not match any known grammar.
    /// Only the decoder produces these.
    Unknown { raw: String },
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::SessionStart { .. } => EventType::GameStart,
            EventKind::SessionEnd { .. } => EventType::GameEnd,
            EventKind::Show { .. } => EventType::Show,
            EventKind::Hide { .. } => EventType::Hide,
            EventKind::Hit { .. } => EventType::Hit,
            EventKind::Miss { .. } => EventType::Miss,
            EventKind::Unknown { .. } => EventType::Unknown,
        }
    }

    pub fn cell(&self) -> Option<CellRef> {
        match self {
            EventKind::Show { cell }
            | EventKind::Hide { cell }
            | EventKind::Hit { cell, .. }
            | EventKind::Miss { cell, .. } => Some(*cell),
            _ => None,
        }
    }
}

/// One record of a session's event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub ts: DateTime<Utc>,
    /// Milliseconds since session start; exposed as `t_rel_s` in JSON.
    #[serde(rename = "t_rel_s", with = "rel_secs")]
    pub t_rel_ms: u64,
    #[serde(rename = "gameId")]
    pub game_id: String,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }

    pub fn t_rel_s(&self) -> f64 {
        self.t_rel_ms as f64 / 1000.0
    }
}

mod rel_secs {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ms: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(*ms as f64 / 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok((secs.max(0.0) * 1000.0).round() as u64)
    }
}
