use chrono::{TimeZone, Utc};
use molelog::bot::{simulate, Bot};
use molelog::clock::ManualClock;
use molelog::eventlog::{decode, EventLog};
use molelog::{Event, EventKind, Game, Grid, MsRange, Settings};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

fn wall() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 9, 20, 23, 0).unwrap()
}

/// A spread of shapes and timings, including the single-cell edge case.
fn settings_matrix() -> Vec<Settings> {
    vec![
        Settings::default(),
        Settings {
            grid: Grid::new(4, 4),
            duration_ms: 10_000,
            mole_up_ms: MsRange::new(650, 1200),
            idle_gap_ms: MsRange::new(220, 500),
        },
        Settings {
            grid: Grid::new(1, 1),
            duration_ms: 5_000,
            mole_up_ms: MsRange::new(100, 300),
            idle_gap_ms: MsRange::new(0, 0),
        },
        Settings {
            grid: Grid::new(2, 7),
            duration_ms: 8_000,
            mole_up_ms: MsRange::new(200, 200),
            idle_gap_ms: MsRange::new(0, 50),
        },
    ]
}

fn sessions() -> Vec<Vec<Event>> {
    let bots = [
        Bot::default(),
        Bot {
            hit_chance: 0.3,
            reaction_ms: MsRange::new(50, 900),
        },
    ];
    let mut out = Vec::new();
    for settings in settings_matrix() {
        for bot in &bots {
            for seed in 0..8 {
                out.push(simulate(settings, bot, seed, wall()).unwrap());
            }
        }
    }
    out
}

#[test]
fn start_first_end_last_exactly_once() {
    for events in sessions() {
        let starts = events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::SessionStart { .. }))
            .count();
        let ends = events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::SessionEnd { .. }))
            .count();
        assert_eq!((starts, ends), (1, 1));
        assert!(matches!(events[0].kind, EventKind::SessionStart { .. }));
        assert!(matches!(
            events.last().unwrap().kind,
            EventKind::SessionEnd { .. }
        ));
    }
}

#[test]
fn relative_time_never_goes_backwards() {
    for events in sessions() {
        assert!(events.windows(2).all(|w| w[0].t_rel_ms <= w[1].t_rel_ms));
        let game_id = &events[0].game_id;
        assert!(events.iter().all(|e| &e.game_id == game_id));
    }
}

#[test]
fn hit_scores_count_up_to_final_score() {
    for events in sessions() {
        let scores: Vec<u32> = events
            .iter()
            .filter_map(|e| match e.kind {
                EventKind::Hit { score, .. } => Some(score),
                _ => None,
            })
            .collect();
        let expected: Vec<u32> = (1..=scores.len() as u32).collect();
        assert_eq!(scores, expected);

        let final_score = match events.last().unwrap().kind {
            EventKind::SessionEnd { final_score } => final_score,
            _ => unreachable!(),
        };
        assert_eq!(final_score, scores.last().copied().unwrap_or(0));
    }
}

#[test]
fn each_show_is_closed_before_the_next() {
    for events in sessions() {
        let mut open: Option<usize> = None;
        for ev in &events {
            match ev.kind {
                EventKind::Show { cell } => {
                    assert_eq!(open, None, "SHOW while #{:?} still open", open);
                    open = Some(cell.index);
                }
                EventKind::Hide { cell } | EventKind::Hit { cell, .. } => {
                    assert_eq!(open, Some(cell.index));
                    open = None;
                }
                _ => {}
            }
        }
    }
}

#[test]
fn cell_refs_are_consistent_with_the_grid() {
    for (settings, events) in settings_matrix().into_iter().flat_map(|s| {
        (0..4).map(move |seed| (s, simulate(s, &Bot::default(), seed, wall()).unwrap()))
    }) {
        for ev in &events {
            if let Some(cell) = ev.kind.cell() {
                assert_eq!(settings.grid.cell(cell.index), Some(cell));
            }
        }
    }
}

#[test]
fn consecutive_moles_use_different_cells() {
    for events in sessions() {
        let shown: Vec<usize> = events
            .iter()
            .filter_map(|e| match e.kind {
                EventKind::Show { cell } => Some(cell.index),
                _ => None,
            })
            .collect();
        let single_cell = matches!(
            events[0].kind,
            EventKind::SessionStart { settings } if settings.grid == Some(Grid::new(1, 1))
        );
        if !single_cell {
            assert!(shown.windows(2).all(|w| w[0] != w[1]));
        }
    }
}

#[test]
fn encode_then_decode_reproduces_events() {
    for events in sessions() {
        let mut log = EventLog::new();
        log.extend(&events);
        let doc = decode(&log.to_text());

        assert_eq!(doc.unknown_count(), 0);
        assert_eq!(doc.game_id.as_deref(), Some(events[0].game_id.as_str()));
        assert_eq!(doc.events.len(), events.len());
        for (decoded, emitted) in doc.events.iter().zip(&events) {
            assert_eq!(decoded.kind, emitted.kind);
            assert_eq!(decoded.t_rel_ms, emitted.t_rel_ms);
            assert_eq!(decoded.game_id, emitted.game_id);
            assert_eq!(decoded.ts, emitted.ts);
        }
    }
}

#[test]
fn start_then_end_for_every_settings_shape() {
    for settings in settings_matrix() {
        let mut game = Game::new(ManualClock::new(wall()), StdRng::seed_from_u64(0));
        let start = game.start(settings).unwrap();
        let end = game.end().unwrap();
        assert_eq!(
            start.kind,
            EventKind::SessionStart {
                settings: settings.into()
            }
        );
        assert_eq!(end.kind, EventKind::SessionEnd { final_score: 0 });
        assert!(game.advance().is_empty());
    }
}

#[test]
fn misses_never_change_the_score() {
    for events in sessions() {
        let mut score = 0;
        let mut per_cell_hits: HashMap<usize, u32> = HashMap::new();
        for ev in &events {
            match ev.kind {
                EventKind::Hit { cell, score: s, .. } => {
                    score += 1;
                    assert_eq!(s, score);
                    *per_cell_hits.entry(cell.index).or_default() += 1;
                }
                EventKind::Miss { .. } => {}
                _ => {}
            }
        }
        assert_eq!(per_cell_hits.values().sum::<u32>(), score);
    }
}
