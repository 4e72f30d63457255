use clap::{Args, Parser, Subcommand};
use molelog::{
    bot::{self, Bot},
    config::{ConfigStore, FileConfigStore},
    eventlog::{decode, EventLog},
    runtime::{FixedTicker, Runner, StdinInputSource},
    settings::{MsRange, Settings},
    store::{LogSink, LogStore},
    summary::summarize,
    Game,
};
use std::{
    error::Error,
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
    time::Duration,
};
use tracing_subscriber::EnvFilter;

const TICK_RATE_MS: u64 = 50;

/// whack-a-mole sessions recorded as readable event logs
#[derive(Parser, Debug)]
#[clap(version, about)]
pub struct Cli {
    /// config file (defaults to the user config dir)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

/// Per-field overrides of the configured settings
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// grid rows
    #[clap(long)]
    rows: Option<u32>,

    /// grid columns
    #[clap(long)]
    cols: Option<u32>,

    /// session length in milliseconds
    #[clap(long)]
    duration_ms: Option<u64>,

    /// shortest time a mole stays up
    #[clap(long)]
    mole_up_min: Option<u64>,

    /// longest time a mole stays up
    #[clap(long)]
    mole_up_max: Option<u64>,

    /// shortest pause between moles
    #[clap(long)]
    idle_gap_min: Option<u64>,

    /// longest pause between moles
    #[clap(long)]
    idle_gap_max: Option<u64>,
}

impl SettingsArgs {
    fn apply(&self, base: Settings) -> Settings {
        Settings {
            grid: molelog::Grid::new(
                self.rows.unwrap_or(base.grid.rows),
                self.cols.unwrap_or(base.grid.cols),
            ),
            duration_ms: self.duration_ms.unwrap_or(base.duration_ms),
            mole_up_ms: MsRange::new(
                self.mole_up_min.unwrap_or(base.mole_up_ms.min),
                self.mole_up_max.unwrap_or(base.mole_up_ms.max),
            ),
            idle_gap_ms: MsRange::new(
                self.idle_gap_min.unwrap_or(base.idle_gap_ms.min),
                self.idle_gap_max.unwrap_or(base.idle_gap_ms.max),
            ),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// run a scripted player in virtual time and print the log
    Simulate {
        #[clap(flatten)]
        settings: SettingsArgs,

        /// rng seed; the same seed reproduces the same log
        #[clap(long)]
        seed: Option<u64>,

        /// probability that the bot goes for the mole
        #[clap(long, value_parser = parse_chance)]
        hit_chance: Option<f64>,

        /// write the log here instead of stdout
        #[clap(short, long)]
        out: Option<PathBuf>,
    },
    /// play live: enter `<index> [x y]` per click, `q` to stop
    Play {
        #[clap(flatten)]
        settings: SettingsArgs,

        /// also write the finished log here
        #[clap(short, long)]
        out: Option<PathBuf>,
    },
    /// decode a log into the dashboard JSON document
    Decode {
        /// log file, `-` for stdin
        input: PathBuf,

        #[clap(long)]
        pretty: bool,
    },
    /// per-cell heat map, accuracy and reaction times of a log
    Summary {
        /// log file, `-` for stdin
        input: PathBuf,

        /// print JSON instead of the text report
        #[clap(long)]
        json: bool,
    },
    /// store a log (raw text and decoded JSON) in the local database
    Ingest {
        /// log file, `-` for stdin
        input: PathBuf,

        /// database file
        #[clap(long)]
        db: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let store = cli
        .config
        .as_ref()
        .map(FileConfigStore::with_path)
        .unwrap_or_default();
    let config = store.load();

    match cli.command {
        Command::Simulate {
            settings,
            seed,
            hit_chance,
            out,
        } => {
            let settings = settings.apply(config.settings);
            let seed = seed.unwrap_or_else(rand::random);
            let bot = Bot {
                hit_chance: hit_chance.unwrap_or(config.bot.hit_chance),
                ..config.bot
            };
            tracing::info!(seed, "simulating session");
            let events = bot::simulate(settings, &bot, seed, chrono::Utc::now())?;
            let mut log = EventLog::new();
            log.extend(&events);
            emit(&log.to_text(), out.as_deref())?;
        }
        Command::Play { settings, out } => {
            let settings = settings.apply(config.settings);
            let runner = Runner::new(
                StdinInputSource::new(),
                FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
            );
            let mut game = Game::system();
            let mut log = EventLog::new();
            runner.run(&mut game, settings, |ev| println!("{}", log.push(ev)))?;
            if let Some(path) = out {
                fs::write(path, log.to_text())?;
            }
        }
        Command::Decode { input, pretty } => {
            let doc = decode(&read_input(&input)?);
            let json = if pretty {
                serde_json::to_string_pretty(&doc)?
            } else {
                serde_json::to_string(&doc)?
            };
            println!("{}", json);
        }
        Command::Summary { input, json } => {
            let summary = summarize(&decode(&read_input(&input)?));
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", summary);
            }
        }
        Command::Ingest { input, db } => {
            let text = read_input(&input)?;
            let lines: Vec<String> = text.lines().map(String::from).collect();
            let mut store = match db.or(config.db_path) {
                Some(path) => LogStore::open(path)?,
                None => LogStore::open_default()?,
            };
            let doc = store.ingest(&lines)?;
            println!(
                "stored {} ({} events)",
                doc.game_id.as_deref().unwrap_or("<no game id>"),
                doc.events.len()
            );
        }
    }

    Ok(())
}

fn parse_chance(s: &str) -> Result<f64, String> {
    let p: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(format!("{s} is not a probability in [0, 1]"))
    }
}

fn read_input(path: &Path) -> io::Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        fs::read_to_string(path)
    }
}

fn emit(text: &str, out: Option<&Path>) -> io::Result<()> {
    match out {
        Some(path) => fs::write(path, text),
        None => {
            print!("{}", text);
            Ok(())
        }
    }
}
