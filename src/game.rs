use crate::clock::{Clock, SystemClock};
use crate::error::StartError;
use crate::event::{Event, EventKind, RelPos};
use crate::session::{generate_game_id, Lifecycle, MoleSlot, Session};
use crate::settings::Settings;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

/// Delay before the first mole of a session, so the player gets action quickly.
pub const FIRST_MOLE_DELAY_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    SessionEnd,
    NextMole,
    AutoHide { appearance: u64 },
}

impl TimerKind {
    // Session end wins a tie so nothing is shown at the buzzer.
    fn rank(&self) -> u8 {
        match self {
            TimerKind::SessionEnd => 0,
            TimerKind::AutoHide { .. } => 1,
            TimerKind::NextMole => 2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    /// Relative ms at which the timer is due.
    due_ms: u64,
    kind: TimerKind,
    /// Session generation that scheduled it.
    generation: u64,
}

#[derive(Debug, Clone, Copy)]
struct Mole {
    index: usize,
    scored: bool,
    appearance: u64,
}

/// The session state machine. Time comes from the injected `Clock`; every
/// random draw comes from the injected RNG. Operations return the events they
/// emitted, in emission order.
#[derive(Debug)]
pub struct Game<C = SystemClock, R = StdRng> {
    clock: C,
    rng: R,
    session: Option<Session>,
    generation: u64,
    timers: Vec<Timer>,
    mole: Option<Mole>,
    last_cell: Option<usize>,
    appearances: u64,
    last_t_ms: u64,
}

impl Game<SystemClock, StdRng> {
    pub fn system() -> Self {
        Game::new(SystemClock::new(), StdRng::from_entropy())
    }
}

impl<C: Clock, R: Rng> Game<C, R> {
    pub fn new(clock: C, rng: R) -> Self {
        Self {
            clock,
            rng,
            session: None,
            generation: 0,
            timers: Vec::with_capacity(2),
            mole: None,
            last_cell: None,
            appearances: 0,
            last_t_ms: 0,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.session
            .as_ref()
            .map_or(Lifecycle::NotStarted, |s| s.lifecycle)
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle() == Lifecycle::Running
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn score(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.score)
    }

    pub fn slot(&self, index: usize) -> MoleSlot {
        match self.mole {
            Some(m) if m.index == index => MoleSlot::Visible { scored: m.scored },
            _ => MoleSlot::Hidden,
        }
    }

    pub fn visible_cell(&self) -> Option<usize> {
        self.mole.map(|m| m.index)
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Relative ms at which the next timer fires.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.timers.iter().map(|t| t.due_ms).min()
    }

    /// Relative ms elapsed in the current session, 0 when none has started.
    pub fn elapsed_ms(&self) -> u64 {
        self.session
            .as_ref()
            .map_or(0, |s| self.clock.now_ms().saturating_sub(s.origin_ms))
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Begins a session. Rejected while one is running; see `restart`.
    pub fn start(&mut self, settings: Settings) -> Result<Event, StartError> {
        if self.is_running() {
            return Err(StartError::AlreadyRunning);
        }
        settings.validate()?;

        self.timers.clear();
        self.generation += 1;
        self.mole = None;
        self.last_cell = None;
        self.last_t_ms = 0;

        let origin_ms = self.clock.now_ms();
        let started_at = self.clock.wall();
        let id = generate_game_id(started_at, &mut self.rng);
        debug!(game_id = %id, generation = self.generation, "session started");
        self.session = Some(Session::new(id, settings, origin_ms, started_at));

        self.schedule(settings.duration_ms, TimerKind::SessionEnd);
        self.schedule(FIRST_MOLE_DELAY_MS, TimerKind::NextMole);

        Ok(self.emit(
            0,
            EventKind::SessionStart {
                settings: settings.into(),
            },
        ))
    }

    /// Force-reset: ends a running session (emitting its `SESSION_END`) and
    /// starts a new one. Invalid settings leave the running session untouched.
    pub fn restart(&mut self, settings: Settings) -> Result<Vec<Event>, StartError> {
        settings.validate()?;
        let mut events = Vec::with_capacity(2);
        if let Some(ev) = self.end() {
            events.push(ev);
        }
        events.push(self.start(settings)?);
        Ok(events)
    }

    /// Fires every timer that is due according to the clock, in due order.
    pub fn advance(&mut self) -> Vec<Event> {
        let now = self.elapsed_ms();
        let mut events = Vec::new();
        while let Some(timer) = self.pop_due(now) {
            if let Some(ev) = self.fire(timer) {
                events.push(ev);
            }
        }
        events
    }

    /// A player action on `index`. Due timers fire first, so a mole whose
    /// auto-hide is already due is gone by the time the click lands.
    pub fn activate(&mut self, index: usize, pos: RelPos) -> Vec<Event> {
        let mut events = self.advance();
        if !self.is_running() {
            trace!(index, "activate ignored: no running session");
            return events;
        }
        let Some(cell) = self.settings().and_then(|s| s.grid.cell(index)) else {
            trace!(index, "activate ignored: cell out of range");
            return events;
        };
        let now = self.elapsed_ms();

        let target = self.mole.filter(|m| m.index == index && !m.scored);
        let kind = match target {
            Some(mole) => {
                self.mole = Some(Mole {
                    scored: true,
                    ..mole
                });
                let score = self.bump_score();
                self.cancel(TimerKind::AutoHide {
                    appearance: mole.appearance,
                });
                self.schedule_next_mole_after_gap(now);
                EventKind::Hit {
                    cell,
                    pos_rel: pos,
                    score,
                }
            }
            _ => EventKind::Miss { cell, pos_rel: pos },
        };
        events.push(self.emit(now, kind));
        events
    }

    /// Ends the running session now. `None` when nothing is running.
    pub fn end(&mut self) -> Option<Event> {
        if !self.is_running() {
            return None;
        }
        let now = self.elapsed_ms();
        Some(self.finish(now))
    }

    fn settings(&self) -> Option<Settings> {
        self.session.as_ref().map(|s| s.settings)
    }

    fn bump_score(&mut self) -> u32 {
        match self.session.as_mut() {
            Some(s) => {
                s.score += 1;
                s.score
            }
            None => 0,
        }
    }

    fn schedule(&mut self, due_ms: u64, kind: TimerKind) {
        self.timers.push(Timer {
            due_ms,
            kind,
            generation: self.generation,
        });
        debug_assert!(self.timers.len() <= 2, "timers: {:?}", self.timers);
    }

    fn cancel(&mut self, kind: TimerKind) {
        self.timers.retain(|t| t.kind != kind);
    }

    fn schedule_next_mole_after_gap(&mut self, from_ms: u64) {
        let Some(settings) = self.settings() else {
            return;
        };
        let gap = settings.idle_gap_ms.sample(&mut self.rng);
        self.schedule(from_ms.saturating_add(gap), TimerKind::NextMole);
    }

    fn pop_due(&mut self, now: u64) -> Option<Timer> {
        let pos = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= now)
            .min_by_key(|(_, t)| (t.due_ms, t.kind.rank()))
            .map(|(i, _)| i)?;
        Some(self.timers.remove(pos))
    }

    fn fire(&mut self, timer: Timer) -> Option<Event> {
        if timer.generation != self.generation || !self.is_running() {
            trace!(?timer, "stale timer dropped");
            return None;
        }
        match timer.kind {
            TimerKind::SessionEnd => Some(self.finish(timer.due_ms)),
            TimerKind::NextMole => self.show_mole(timer.due_ms),
            TimerKind::AutoHide { appearance } => self.auto_hide(appearance, timer.due_ms),
        }
    }

    fn show_mole(&mut self, at: u64) -> Option<Event> {
        let settings = self.settings()?;
        let count = settings.grid.cell_count();
        let index = loop {
            let idx = self.rng.gen_range(0..count);
            if count == 1 || Some(idx) != self.last_cell {
                break idx;
            }
        };
        let cell = settings.grid.cell(index)?;

        self.appearances += 1;
        let appearance = self.appearances;
        self.mole = Some(Mole {
            index,
            scored: false,
            appearance,
        });
        self.last_cell = Some(index);

        let up = settings.mole_up_ms.sample(&mut self.rng);
        self.schedule(at.saturating_add(up), TimerKind::AutoHide { appearance });
        Some(self.emit(at, EventKind::Show { cell }))
    }

    fn auto_hide(&mut self, appearance: u64, at: u64) -> Option<Event> {
        let mole = self.mole.filter(|m| m.appearance == appearance && !m.scored)?;
        let cell = self.settings()?.grid.cell(mole.index)?;
        self.mole = None;
        self.schedule_next_mole_after_gap(at);
        Some(self.emit(at, EventKind::Hide { cell }))
    }

    fn finish(&mut self, at: u64) -> Event {
        self.timers.clear();
        self.mole = None;
        let final_score = match self.session.as_mut() {
            Some(s) => {
                s.lifecycle = Lifecycle::Ended;
                s.score
            }
            None => 0,
        };
        let ev = self.emit(at, EventKind::SessionEnd { final_score });
        self.generation += 1;
        ev
    }

    fn emit(&mut self, at: u64, kind: EventKind) -> Event {
        let t_rel_ms = at.max(self.last_t_ms);
        self.last_t_ms = t_rel_ms;
        let (ts, game_id) = match self.session.as_ref() {
            Some(s) => (s.wall_at(t_rel_ms), s.id.clone()),
            None => (self.clock.wall(), String::new()),
        };
        let ev = Event {
            ts,
            t_rel_ms,
            game_id,
            kind,
        };
        debug!(t_rel_ms, kind = %ev.event_type(), "event");
        ev
    }
}
