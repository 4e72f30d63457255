use crate::settings::Settings;
use chrono::{DateTime, Utc};
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    NotStarted,
    Running,
    Ended,
}

/// Per-cell mole state as seen from outside the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoleSlot {
    Hidden,
    Visible { scored: bool },
}

/// One play-through. Owned by the `Game`; replaced wholesale on the next start.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub settings: Settings,
    pub score: u32,
    pub lifecycle: Lifecycle,
    /// Clock reading (ms) at which relative time is zero.
    pub origin_ms: u64,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: String, settings: Settings, origin_ms: u64, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            settings,
            score: 0,
            lifecycle: Lifecycle::Running,
            origin_ms,
            started_at,
        }
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    /// Saturates at the latest representable instant.
    pub fn wall_at(&self, t_rel_ms: u64) -> DateTime<Utc> {
        offset_ms(self.started_at, t_rel_ms)
    }
}

pub(crate) fn offset_ms(at: DateTime<Utc>, ms: u64) -> DateTime<Utc> {
    i64::try_from(ms)
        .ok()
        .and_then(|ms| at.checked_add_signed(chrono::Duration::milliseconds(ms)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// K-sortable id: `YYYYMMDD-HHMMSS-mmm-xxxx`. Unique enough for correlation,
/// not a security token.
pub fn generate_game_id<R: Rng + ?Sized>(at: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: u16 = rng.gen();
    format!("{}-{:04x}", at.format("%Y%m%d-%H%M%S-%3f"), suffix)
}
