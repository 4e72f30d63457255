use crate::error::SettingsError;
use crate::grid::Grid;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Closed millisecond interval `[min, max]`, serialized as a two element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u64; 2]", into = "[u64; 2]")]
pub struct MsRange {
    pub min: u64,
    pub max: u64,
}

impl MsRange {
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// Uniform draw over the closed interval. Callers validate `min <= max` first.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        rng.gen_range(self.min..=self.max)
    }
}

impl From<[u64; 2]> for MsRange {
    fn from(v: [u64; 2]) -> Self {
        MsRange { min: v[0], max: v[1] }
    }
}

impl From<MsRange> for [u64; 2] {
    fn from(r: MsRange) -> Self {
        [r.min, r.max]
    }
}

/// Immutable per-session game parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub grid: Grid,
    pub duration_ms: u64,
    pub mole_up_ms: MsRange,
    pub idle_gap_ms: MsRange,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            grid: Grid::new(4, 4),
            duration_ms: 30_000,
            mole_up_ms: MsRange::new(650, 1200),
            idle_gap_ms: MsRange::new(220, 500),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        let Grid { rows, cols } = self.grid;
        if rows == 0 || cols == 0 {
            return Err(SettingsError::EmptyGrid { rows, cols });
        }
        if self.duration_ms == 0 {
            return Err(SettingsError::NonPositiveDuration);
        }
        let up = self.mole_up_ms;
        if up.min == 0 || up.min > up.max {
            return Err(SettingsError::MoleUpRange {
                min: up.min,
                max: up.max,
            });
        }
        let gap = self.idle_gap_ms;
        if gap.min > gap.max {
            return Err(SettingsError::IdleGapRange {
                min: gap.min,
                max: gap.max,
            });
        }
        Ok(())
    }
}

/// Settings as recovered from a `GAME_START` line. Every field is optional:
/// `None` is the explicit "unknown" marker for a field that was absent or
/// unreadable on the line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    pub grid: Option<Grid>,
    pub duration_ms: Option<u64>,
    pub mole_up_ms: Option<MsRange>,
    pub idle_gap_ms: Option<MsRange>,
}

impl SettingsSnapshot {
    /// All four fields present.
    pub fn complete(&self) -> Option<Settings> {
        Some(Settings {
            grid: self.grid?,
            duration_ms: self.duration_ms?,
            mole_up_ms: self.mole_up_ms?,
            idle_gap_ms: self.idle_gap_ms?,
        })
    }
}

impl From<Settings> for SettingsSnapshot {
    fn from(s: Settings) -> Self {
        Self {
            grid: Some(s.grid),
            duration_ms: Some(s.duration_ms),
            mole_up_ms: Some(s.mole_up_ms),
            idle_gap_ms: Some(s.idle_gap_ms),
        }
    }
}
