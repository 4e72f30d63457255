use crate::event::{Event, EventKind};
use crate::eventlog::DecodedLog;
use crate::grid::{CellRef, Grid};
use crate::time_series::{score_steps, ScorePoint};
use crate::util::{mean, ratio, std_dev};
use itertools::Itertools;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Per-hole counters for the heat map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellStats {
    pub index: usize,
    pub row: u32,
    pub col: u32,
    pub shows: u32,
    pub hits: u32,
    pub misses: u32,
}

impl CellStats {
    fn empty(cell: CellRef) -> Self {
        Self {
            index: cell.index,
            row: cell.row,
            col: cell.col,
            shows: 0,
            hits: 0,
            misses: 0,
        }
    }
}

/// Aggregated view of one decoded session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub game_id: Option<String>,
    pub grid: Option<Grid>,
    pub duration_s: f64,
    pub final_score: u32,
    pub shows: u32,
    pub hits: u32,
    pub misses: u32,
    pub unknown: u32,
    /// hits / (hits + misses)
    pub accuracy: Option<f64>,
    /// SHOW -> HIT latency for every scored mole
    pub reaction_ms: Vec<u64>,
    pub mean_reaction_ms: Option<f64>,
    pub reaction_std_dev_ms: Option<f64>,
    pub cells: Vec<CellStats>,
    pub score_series: Vec<ScorePoint>,
}

/// GAME_END's score when present, else the last HIT score, else 0.
pub fn final_score(events: &[Event]) -> u32 {
    let from_end = events.iter().rev().find_map(|e| match e.kind {
        EventKind::SessionEnd { final_score } => Some(final_score),
        _ => None,
    });
    let from_hits = || {
        events.iter().rev().find_map(|e| match e.kind {
            EventKind::Hit { score, .. } => Some(score),
            _ => None,
        })
    };
    from_end.or_else(from_hits).unwrap_or(0)
}

/// Largest decoded grid whose empty cells are listed up front; bigger grids
/// (only possible from an untrusted log) list the cells actually seen.
pub const MAX_PREFILLED_CELLS: usize = 4096;

pub fn summarize(doc: &DecodedLog) -> Summary {
    let grid = doc.settings.and_then(|s| s.grid);
    let events: Vec<&Event> = doc
        .events
        .iter()
        .sorted_by_key(|e| e.t_rel_ms)
        .collect();
    let final_score = final_score(&doc.events);
    let duration_s = doc
        .settings
        .and_then(|s| s.duration_ms)
        .map(|ms| ms as f64 / 1000.0)
        .or_else(|| events.last().map(|e| e.t_rel_s()))
        .unwrap_or(0.0);

    let mut cells: BTreeMap<usize, CellStats> = BTreeMap::new();
    if let Some(grid) = grid.filter(|g| g.cell_count() <= MAX_PREFILLED_CELLS) {
        for cell in (0..grid.cell_count()).filter_map(|i| grid.cell(i)) {
            cells.insert(cell.index, CellStats::empty(cell));
        }
    }

    let (mut shows, mut hits, mut misses, mut unknown) = (0, 0, 0, 0);
    let mut shown_at: HashMap<usize, u64> = HashMap::new();
    let mut reaction_ms = Vec::new();

    for ev in &events {
        match &ev.kind {
            EventKind::Show { .. } => shows += 1,
            EventKind::Hit { .. } => hits += 1,
            EventKind::Miss { .. } => misses += 1,
            EventKind::Unknown { .. } => unknown += 1,
            _ => {}
        }
        let Some(cell) = ev.kind.cell() else {
            continue;
        };
        // a known grid bounds the heat map; without one, cells appear as seen
        if grid.is_some_and(|g| g.cell(cell.index).is_none()) {
            continue;
        }
        let stats = cells
            .entry(cell.index)
            .or_insert_with(|| CellStats::empty(cell));
        match ev.kind {
            EventKind::Show { .. } => {
                stats.shows += 1;
                shown_at.insert(cell.index, ev.t_rel_ms);
            }
            EventKind::Hit { .. } => {
                stats.hits += 1;
                stats.shows = stats.shows.max(1);
                if let Some(t) = shown_at.remove(&cell.index) {
                    reaction_ms.push(ev.t_rel_ms.saturating_sub(t));
                }
            }
            EventKind::Miss { .. } => stats.misses += 1,
            EventKind::Hide { .. } => {
                shown_at.remove(&cell.index);
            }
            _ => {}
        }
    }

    let hit_points = events.iter().filter_map(|e| match e.kind {
        EventKind::Hit { score, .. } => Some((e.t_rel_s(), score)),
        _ => None,
    });
    let score_series = score_steps(hit_points, duration_s, final_score);

    let reaction_f: Vec<f64> = reaction_ms.iter().map(|&ms| ms as f64).collect();

    Summary {
        game_id: doc.game_id.clone(),
        grid,
        duration_s,
        final_score,
        shows,
        hits,
        misses,
        unknown,
        accuracy: ratio(hits as usize, (hits + misses) as usize),
        mean_reaction_ms: mean(&reaction_f),
        reaction_std_dev_ms: std_dev(&reaction_f),
        reaction_ms,
        cells: cells.into_values().collect(),
        score_series,
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "game {}",
            self.game_id.as_deref().unwrap_or("<unknown>")
        )?;
        writeln!(
            f,
            "duration {:.3}s  score {}  shows {}  hits {}  misses {}",
            self.duration_s, self.final_score, self.shows, self.hits, self.misses
        )?;
        if let Some(acc) = self.accuracy {
            writeln!(f, "accuracy {:.1}%", acc * 100.0)?;
        }
        if let (Some(m), Some(sd)) = (self.mean_reaction_ms, self.reaction_std_dev_ms) {
            writeln!(f, "reaction {:.0}ms (sd {:.0}ms)", m, sd)?;
        }
        if self.unknown > 0 {
            writeln!(f, "unreadable lines {}", self.unknown)?;
        }

        // shows/hits/misses per cell, one grid row per line
        for (row, cells) in &self.cells.iter().chunk_by(|c| c.row) {
            let line = cells
                .map(|c| format!("{:>2}/{:<2}/{:<2}", c.shows, c.hits, c.misses))
                .join(" ");
            writeln!(f, "r{:<2} {}", row, line)?;
        }
        Ok(())
    }
}
