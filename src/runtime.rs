use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::clock::Clock;
use crate::error::StartError;
use crate::event::{Event, RelPos};
use crate::game::Game;
use crate::settings::Settings;

/// Unified input consumed by the runner
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GameInput {
    Activate { index: usize, pos: RelPos },
    Quit,
    Tick,
}

/// Parses one line of player input: `<index> [x y]`, or `q` / `quit`.
pub fn parse_input_line(line: &str) -> Option<GameInput> {
    let mut parts = line.split_whitespace();
    let first = parts.next()?;
    if first == "q" || first == "quit" {
        return Some(GameInput::Quit);
    }
    let index = first.parse().ok()?;
    let pos = match (parts.next(), parts.next()) {
        (Some(x), Some(y)) => RelPos::new(x.parse().ok()?, y.parse().ok()?),
        (None, None) => RelPos::center(),
        _ => return None,
    };
    Some(GameInput::Activate { index, pos })
}

/// Source of player input
pub trait InputSource: Send + 'static {
    /// Block for up to `timeout` waiting for input.
    fn recv_timeout(&self, timeout: Duration) -> Result<GameInput, RecvTimeoutError>;
}

/// Reads activations from stdin on a background thread
pub struct StdinInputSource {
    rx: Receiver<GameInput>,
}

impl StdinInputSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                match parse_input_line(&line) {
                    Some(input) => {
                        if tx.send(input).is_err() {
                            break;
                        }
                    }
                    None => debug!(line, "unrecognized input"),
                }
            }
        });

        Self { rx }
    }
}

impl Default for StdinInputSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for StdinInputSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameInput, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Input fed through a channel (tests, embedding)
pub struct ChannelInputSource {
    rx: Receiver<GameInput>,
}

impl ChannelInputSource {
    pub fn new(rx: Receiver<GameInput>) -> Self {
        Self { rx }
    }
}

impl InputSource for ChannelInputSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameInput, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Drives a live `Game` one input/tick at a time
pub struct Runner<I: InputSource, T: Ticker> {
    input: I,
    ticker: T,
}

impl<I: InputSource, T: Ticker> Runner<I, T> {
    pub fn new(input: I, ticker: T) -> Self {
        Self { input, ticker }
    }

    /// Blocks up to the tick interval and returns the next input, or Tick on timeout
    pub fn step(&self) -> GameInput {
        match self.input.recv_timeout(self.ticker.interval()) {
            Ok(input) => input,
            Err(RecvTimeoutError::Timeout) => GameInput::Tick,
            // input closed (e.g. stdin EOF): keep ticking at the normal rate
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(self.ticker.interval());
                GameInput::Tick
            }
        }
    }

    /// Starts a session and feeds every emitted event to `on_event` until it ends.
    pub fn run<C: Clock, R: Rng>(
        &self,
        game: &mut Game<C, R>,
        settings: Settings,
        mut on_event: impl FnMut(&Event),
    ) -> Result<(), StartError> {
        let start = game.start(settings)?;
        on_event(&start);

        while game.is_running() {
            let batch = match self.step() {
                GameInput::Tick => game.advance(),
                GameInput::Activate { index, pos } => game.activate(index, pos),
                GameInput::Quit => game.end().into_iter().collect(),
            };
            batch.iter().for_each(&mut on_event);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use std::sync::mpsc;

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let runner = Runner::new(
            ChannelInputSource::new(rx),
            FixedTicker::new(Duration::from_millis(1)),
        );

        assert_eq!(runner.step(), GameInput::Tick);
    }

    #[test]
    fn step_passes_through_input() {
        let (tx, rx) = mpsc::channel();
        tx.send(GameInput::Quit).unwrap();
        let runner = Runner::new(
            ChannelInputSource::new(rx),
            FixedTicker::new(Duration::from_millis(10)),
        );

        assert_eq!(runner.step(), GameInput::Quit);
    }

    #[test]
    fn quit_ends_the_session() {
        let (tx, rx) = mpsc::channel();
        tx.send(GameInput::Activate {
            index: 0,
            pos: RelPos::center(),
        })
        .unwrap();
        tx.send(GameInput::Quit).unwrap();
        let runner = Runner::new(
            ChannelInputSource::new(rx),
            FixedTicker::new(Duration::from_millis(5)),
        );

        let mut game = Game::system();
        let mut seen = Vec::new();
        runner
            .run(&mut game, Settings::default(), |e| seen.push(e.clone()))
            .unwrap();

        assert!(matches!(seen[0].kind, EventKind::SessionStart { .. }));
        assert!(matches!(
            seen.last().unwrap().kind,
            EventKind::SessionEnd { .. }
        ));
        assert!(!game.is_running());
    }

    #[test]
    fn parses_input_lines() {
        assert_eq!(parse_input_line("quit"), Some(GameInput::Quit));
        assert_eq!(
            parse_input_line("5"),
            Some(GameInput::Activate {
                index: 5,
                pos: RelPos::center()
            })
        );
        assert_eq!(
            parse_input_line(" 3 0.25 0.75 "),
            Some(GameInput::Activate {
                index: 3,
                pos: RelPos::new(0.25, 0.75)
            })
        );
        assert_eq!(parse_input_line("3 0.25"), None);
        assert_eq!(parse_input_line("x"), None);
        assert_eq!(parse_input_line(""), None);
    }
}
