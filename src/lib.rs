// Library surface shared by the binary and the integration tests.
pub mod app_dirs;
pub mod bot;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod eventlog;
pub mod game;
pub mod grid;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod store;
pub mod summary;
pub mod time_series;
pub mod util;

pub use error::{Error, SettingsError, StartError};
pub use event::{Event, EventKind, EventType, RelPos};
pub use eventlog::{decode, format_event, DecodedLog, EventLog, ParsedLine};
pub use game::Game;
pub use grid::{CellRef, Grid};
pub use settings::{MsRange, Settings, SettingsSnapshot};
