use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rogaine_core::model::{GameConfig, Spot, SpotId, Station, StationEventKind, StationId};
use rogaine_core::view::View;
use services::{AppServices, Clock, ResultLeaveHandler, ResultOutcome, ResultView};

const DEFAULT_DB_URL: &str = "sqlite://rogaine.sqlite3";

#[derive(Debug)]
enum ArgsError {
    MissingCommand,
    UnknownCommand(String),
    MissingValue { flag: &'static str },
    MissingArgument { name: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    Invalid(rogaine_core::Error),
    InvalidConsentAction { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingCommand => write!(f, "missing subcommand"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { name } => write!(f, "missing <{name}>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::Invalid(err) => write!(f, "{err}"),
            ArgsError::InvalidConsentAction { raw } => write!(f, "unknown consent action: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn parse_value<T>(raw: &str) -> Result<T, ArgsError>
where
    T: std::str::FromStr,
    T::Err: Into<rogaine_core::Error>,
{
    raw.parse().map_err(|e: T::Err| ArgsError::Invalid(e.into()))
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app [--db <sqlite_url>] <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  import --spots <file.json> --stations <file.json>");
    eprintln!("  start --duration <min> [--checkpoints <n>]");
    eprintln!("  visit <spot>");
    eprintln!("  board <station>");
    eprintln!("  alight <station>");
    eprintln!("  finish | abandon | result");
    eprintln!("  leave [--decline] [--to <path>]");
    eprintln!("  route <path>");
    eprintln!("  consent <agree-safety|agree-terms|decline|reset>");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  ROGAINE_DB_URL, ROGAINE_ONLINE, RUST_LOG");
    eprintln!("  ROGAINE_SUBMIT_ENABLED, ROGAINE_SUBMIT_ENDPOINT_URL,");
    eprintln!("  ROGAINE_SUBMIT_TOKEN, ROGAINE_SUBMIT_TIMEOUT_SECS");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsentAction {
    AgreeSafety,
    AgreeTerms,
    Decline,
    Reset,
}

impl ConsentAction {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "agree-safety" => Some(Self::AgreeSafety),
            "agree-terms" => Some(Self::AgreeTerms),
            "decline" => Some(Self::Decline),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Import { spots: PathBuf, stations: PathBuf },
    Start { duration_min: u32, checkpoints: Option<usize> },
    Visit(SpotId),
    Board(StationId),
    Alight(StationId),
    Finish,
    Abandon,
    Result,
    Leave { decline: bool, to: View },
    Route(View),
    Consent(ConsentAction),
}

#[derive(Debug)]
struct Args {
    db_url: String,
    command: Command,
}

impl Args {
    fn parse(argv: impl IntoIterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("ROGAINE_DB_URL")
            .ok()
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);

        // Global flags come first; the rest belongs to the subcommand.
        let mut args = argv.into_iter();
        let name = loop {
            let arg = args.next().ok_or(ArgsError::MissingCommand)?;
            match arg.as_str() {
                "--db" => db_url = parse_db_url(require_value(&mut args, "--db")?)?,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => break arg,
            }
        };

        let mut positional = Vec::new();
        let mut spots = None;
        let mut stations = None;
        let mut duration_min = None;
        let mut checkpoints = None;
        let mut decline = false;
        let mut to = View::Home;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => db_url = parse_db_url(require_value(&mut args, "--db")?)?,
                "--spots" => spots = Some(PathBuf::from(require_value(&mut args, "--spots")?)),
                "--stations" => {
                    stations = Some(PathBuf::from(require_value(&mut args, "--stations")?));
                }
                "--duration" => {
                    let raw = require_value(&mut args, "--duration")?;
                    duration_min = Some(parse_number("--duration", raw)?);
                }
                "--checkpoints" => {
                    let raw = require_value(&mut args, "--checkpoints")?;
                    checkpoints = Some(parse_number("--checkpoints", raw)?);
                }
                "--decline" => decline = true,
                "--to" => to = parse_value(&require_value(&mut args, "--to")?)?,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let mut take = |name: &'static str| {
            positional
                .next()
                .ok_or(ArgsError::MissingArgument { name })
        };

        let command = match name.as_str() {
            "import" => Command::Import {
                spots: spots.ok_or(ArgsError::MissingValue { flag: "--spots" })?,
                stations: stations.ok_or(ArgsError::MissingValue { flag: "--stations" })?,
            },
            "start" => Command::Start {
                duration_min: duration_min.ok_or(ArgsError::MissingValue { flag: "--duration" })?,
                checkpoints,
            },
            "visit" => Command::Visit(parse_value(&take("spot")?)?),
            "board" => Command::Board(parse_value(&take("station")?)?),
            "alight" => Command::Alight(parse_value(&take("station")?)?),
            "finish" => Command::Finish,
            "abandon" => Command::Abandon,
            "result" => Command::Result,
            "leave" => Command::Leave { decline, to },
            "route" => Command::Route(parse_value(&take("path")?)?),
            "consent" => {
                let raw = take("action")?;
                Command::Consent(
                    ConsentAction::from_arg(&raw)
                        .ok_or(ArgsError::InvalidConsentAction { raw })?,
                )
            }
            _ => return Err(ArgsError::UnknownCommand(name)),
        };

        if let Some(extra) = positional.next() {
            return Err(ArgsError::UnknownArg(extra));
        }
        Ok(Self { db_url, command })
    }
}

fn parse_db_url(value: String) -> Result<String, ArgsError> {
    if value.trim().is_empty() {
        return Err(ArgsError::InvalidDbUrl { raw: value });
    }
    Ok(normalize_sqlite_url(value))
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

fn print_result(view: &ResultView) {
    println!("score: {}", view.score);
    println!("penalty: {}", view.penalty_display);
    println!("  time: {}", view.time_penalty);
    println!(
        "  checkpoints: {} ({} of {} missing)",
        view.checkpoint_penalty, view.missing_checkpoints, view.checkpoint_total
    );
    println!("achievement bonus: {}", view.achievement_bonus);
    println!(
        "visited ({}): {}",
        view.visited_spot_count,
        view.visited_spot_names.join(", ")
    );
    println!("checkpoints reached: {}", view.reached_checkpoint_names.join(", "));
    println!("station events: {}", view.station_event_count);
    println!("  boarded: {}", view.boarded_station_names.join(", "));
    println!("  alighted: {}", view.alighted_station_names.join(", "));
    println!("  passed: {}", view.passed_station_names.join(", "));
    for achievement in &view.achievements {
        println!("  + {} ({})", achievement.name, achievement.points);
    }
}

fn read_json<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<T, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

async fn execute(app: &AppServices, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let games = app.games();
    match command {
        Command::Import { spots, stations } => {
            let spots: Vec<Spot> = read_json(&spots)?;
            let stations: Vec<Station> = read_json(&stations)?;
            app.reference().replace(&spots, &stations).await?;
            println!("imported {} spots, {} stations", spots.len(), stations.len());
        }
        Command::Start {
            duration_min,
            checkpoints,
        } => {
            let config = GameConfig::new(duration_min)?;
            let game = match checkpoints {
                Some(count) => {
                    games
                        .start_with_random_checkpoints(config, count, &mut rand::rng())
                        .await?
                }
                None => games.start(config, Vec::new()).await?,
            };
            let ids: Vec<&str> = game.cp_spot_ids().iter().map(SpotId::as_str).collect();
            println!("started: {duration_min} min, checkpoints [{}]", ids.join(", "));
        }
        Command::Visit(spot) => {
            if games.visit_spot(spot.clone()).await? {
                println!("checkpoint reached: {spot}");
            } else {
                println!("visited: {spot}");
            }
        }
        Command::Board(station) => {
            games
                .record_station_event(StationEventKind::Board, station)
                .await?;
        }
        Command::Alight(station) => {
            games
                .record_station_event(StationEventKind::Alight, station)
                .await?;
        }
        Command::Finish => {
            let breakdown = games.finish().await?;
            println!(
                "finished: score {}, penalty {}",
                breakdown.score,
                breakdown.penalty_display()
            );
        }
        Command::Abandon => {
            games.abandon().await?;
            println!("abandoned");
        }
        Command::Result => match app.results().load().await {
            ResultOutcome::Ready(view) => print_result(&view),
            ResultOutcome::Redirect(to) => println!("-> {to}"),
        },
        Command::Leave { decline, to } => {
            let view = match app.results().load().await {
                ResultOutcome::Ready(view) => view,
                ResultOutcome::Redirect(to) => {
                    println!("-> {to}");
                    return Ok(());
                }
            };
            let view = *view;
            let started_at_ms = view.progress.started_at_ms();
            let handler = Arc::new(
                ResultLeaveHandler::new(app.submission(), view.progress, view.reference).await,
            );
            if decline {
                handler.set_opted_in(false);
            }
            let navigation = app.navigation();
            let _registration = navigation.register(View::Result, handler);
            let landed = navigation.navigate(View::Result, to).await;
            let decision = app.submission().decision(started_at_ms).await;
            println!("-> {landed} (submission: {decision})");
        }
        Command::Route(target) => {
            let landed = app.consent().resolve(target).await?;
            println!("-> {landed}");
        }
        Command::Consent(action) => {
            let consent = app.consent();
            match action {
                ConsentAction::AgreeSafety => consent.set_safety_acknowledged(true).await?,
                ConsentAction::AgreeTerms => consent.set_terms_acknowledged(true).await?,
                ConsentAction::Decline => consent.decline_terms().await?,
                ConsentAction::Reset => {
                    consent.set_safety_acknowledged(false).await?;
                    consent.set_terms_acknowledged(false).await?;
                    consent.clear_block().await?;
                }
            }
            let state = consent.flags().await?.state();
            println!("consent: {state:?}");
        }
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    log::debug!("using database {}", args.db_url);
    // Open + migrate SQLite here so core/services stay free of filesystem setup.
    prepare_sqlite_file(&args.db_url)?;
    let app = AppServices::new_sqlite(&args.db_url, Clock::system()).await?;
    execute(&app, args.command).await
}

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(args.iter().map(|s| (*s).to_owned()))
    }

    #[test]
    fn parses_start_with_checkpoints() {
        let args = parse(&[
            "--db",
            "sqlite::memory:",
            "start",
            "--duration",
            "90",
            "--checkpoints",
            "3",
        ])
        .unwrap();
        assert_eq!(args.db_url, "sqlite::memory:");
        assert_eq!(
            args.command,
            Command::Start {
                duration_min: 90,
                checkpoints: Some(3)
            }
        );
    }

    #[test]
    fn parses_leave_and_route() {
        let args = parse(&["leave", "--decline", "--to", "/rules"]).unwrap();
        assert_eq!(
            args.command,
            Command::Leave {
                decline: true,
                to: View::Rules
            }
        );
        let args = parse(&["route", "/play"]).unwrap();
        assert_eq!(args.command, Command::Route(View::Play));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(parse(&[]), Err(ArgsError::MissingCommand)));
        assert!(matches!(parse(&["fly"]), Err(ArgsError::UnknownCommand(_))));
        assert!(matches!(
            parse(&["start"]),
            Err(ArgsError::MissingValue { flag: "--duration" })
        ));
        assert!(matches!(
            parse(&["start", "--duration", "soon"]),
            Err(ArgsError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse(&["visit"]),
            Err(ArgsError::MissingArgument { name: "spot" })
        ));
        assert!(matches!(
            parse(&["consent", "maybe"]),
            Err(ArgsError::InvalidConsentAction { .. })
        ));
        assert!(matches!(
            parse(&["route", "/nowhere"]),
            Err(ArgsError::Invalid(rogaine_core::Error::View(_)))
        ));
        assert!(matches!(
            parse(&["board", "  "]),
            Err(ArgsError::Invalid(rogaine_core::Error::Id(_)))
        ));
    }
}
