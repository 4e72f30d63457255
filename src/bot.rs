use crate::clock::ManualClock;
use crate::error::StartError;
use crate::event::{Event, EventKind, RelPos};
use crate::game::Game;
use crate::settings::{MsRange, Settings};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Scripted player. Reacts to every mole: with probability `hit_chance` it
/// clicks the mole after a reaction delay, otherwise it clicks a wrong hole.
/// A reaction slower than the mole's up time turns into a late miss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bot {
    pub hit_chance: f64,
    pub reaction_ms: MsRange,
}

impl Default for Bot {
    fn default() -> Self {
        Self {
            hit_chance: 0.8,
            reaction_ms: MsRange::new(250, 700),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Planned {
    at_ms: u64,
    index: usize,
    pos: RelPos,
}

impl Bot {
    /// Usable as configured: hit chance within `[0, 1]` and an ordered reaction range.
    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.hit_chance) && self.reaction_ms.min <= self.reaction_ms.max
    }

    /// Hit chance clamped to `[0, 1]`, NaN counting as never.
    fn hit_chance(&self) -> f64 {
        if self.hit_chance.is_nan() {
            0.0
        } else {
            self.hit_chance.clamp(0.0, 1.0)
        }
    }

    fn reaction_range(&self) -> MsRange {
        let MsRange { min, max } = self.reaction_ms;
        MsRange::new(min.min(max), min.max(max))
    }

    /// Runs a whole session in virtual time and returns every emitted event.
    pub fn play<R: Rng, B: Rng>(
        &self,
        game: &mut Game<ManualClock, R>,
        settings: Settings,
        rng: &mut B,
    ) -> Result<Vec<Event>, StartError> {
        let mut events = vec![game.start(settings)?];
        let origin = game.session().map_or(0, |s| s.origin_ms);
        let cells = settings.grid.cell_count();
        let hit_chance = self.hit_chance();
        let reaction = self.reaction_range();
        let mut planned: Option<Planned> = None;

        while game.is_running() {
            let Some(due) = game.next_due_ms() else {
                break;
            };
            let batch = match planned {
                Some(p) if p.at_ms <= due => {
                    planned = None;
                    game.clock().set(origin.saturating_add(p.at_ms));
                    game.activate(p.index, p.pos)
                }
                _ => {
                    game.clock().set(origin.saturating_add(due));
                    game.advance()
                }
            };

            for ev in &batch {
                if let EventKind::Show { cell } = ev.kind {
                    let target = if rng.gen_bool(hit_chance) || cells == 1 {
                        cell.index
                    } else {
                        (cell.index + rng.gen_range(1..cells)) % cells
                    };
                    planned = Some(Planned {
                        at_ms: ev.t_rel_ms.saturating_add(reaction.sample(rng)),
                        index: target,
                        pos: RelPos::new(rng.gen(), rng.gen()),
                    });
                }
            }
            events.extend(batch);
        }
        debug!(events = events.len(), score = game.score(), "bot session finished");
        Ok(events)
    }
}

/// Deterministic session: the same seed, settings and bot give the same log.
pub fn simulate(
    settings: Settings,
    bot: &Bot,
    seed: u64,
    wall: DateTime<Utc>,
) -> Result<Vec<Event>, StartError> {
    let clock = ManualClock::new(wall);
    let mut game = Game::new(clock, StdRng::seed_from_u64(seed));
    let mut bot_rng = StdRng::seed_from_u64(seed.wrapping_add(1));
    bot.play(&mut game, settings, &mut bot_rng)
}
