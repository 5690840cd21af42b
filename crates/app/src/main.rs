mod terminal;

use std::fmt;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use quiz_core::model::SkillId;
use services::{
    ApiConfig, Clock, HttpBackend, SessionCollaborators, SessionConfig, SessionController,
    SessionReport,
};
use terminal::{Command, ScreenKey, TerminalPlatform};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidSkillId { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidSkillId { raw } => write!(f, "invalid skill id: {raw}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--skill-id <id>] [--base-url <url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --skill-id 1");
    eprintln!("  --base-url {}", services::http::DEFAULT_BASE_URL);
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_SKILL_ID, QUIZ_API_BASE_URL, QUIZ_API_TOKEN, QUIZ_REQUEST_TIMEOUT_MS");
    eprintln!("  RUST_LOG (default: info)");
}

struct Args {
    skill_id: SkillId,
    base_url: Option<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Option<Self>, ArgsError> {
        let mut skill_id = match std::env::var("QUIZ_SKILL_ID") {
            Ok(raw) => parse_skill_id(raw)?,
            Err(_) => SkillId::new(1),
        };
        let mut base_url = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--skill-id" => skill_id = parse_skill_id(require_value(args, "--skill-id")?)?,
                "--base-url" => base_url = Some(require_value(args, "--base-url")?),
                "--help" | "-h" => return Ok(None),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Some(Self { skill_id, base_url }))
    }
}

fn parse_skill_id(raw: String) -> Result<SkillId, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidSkillId { raw })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let Some(args) = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?
    else {
        print_usage();
        return Ok(());
    };

    init_tracing();

    let mut api = ApiConfig::from_env()?;
    if let Some(raw) = args.base_url.as_deref() {
        api = api.with_base_url(raw)?;
    }
    tracing::info!(
        base_url = %api.base_url,
        authenticated = api.token.is_some(),
        skill_id = %args.skill_id,
        "starting quiz"
    );

    let backend = Arc::new(HttpBackend::new(&api));
    let platform = Arc::new(TerminalPlatform);
    let controller = SessionController::new(
        SessionConfig::from(&api),
        Clock::default_clock(),
        SessionCollaborators {
            questions: backend.clone(),
            validator: backend.clone(),
            outcomes: backend,
            haptics: platform.clone(),
            navigator: platform.clone(),
            notifier: platform,
        },
    );

    let handle = controller.mount(args.skill_id);
    let mut snapshots = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_drawn = None;

    terminal::print_commands();
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                let key = ScreenKey::of(&snapshot);
                if last_drawn != Some(key) {
                    terminal::render(&snapshot);
                    last_drawn = Some(key);
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match terminal::parse_command(&line) {
                    Ok(Command::Send(intents)) => {
                        for intent in intents {
                            handle.send(intent);
                        }
                    }
                    Ok(Command::Help) => terminal::print_commands(),
                    Ok(Command::Quit) => break,
                    Err(err) => eprintln!("{err}"),
                }
            }
        }
    }

    let report = if handle.is_stopped() {
        handle.join().await?
    } else {
        handle.unmount().await?
    };
    print_report(&report);
    Ok(())
}

fn print_report(report: &SessionReport) {
    println!(
        "skill {}: {}/{} correct ({:?}, outcome {:?})",
        report.skill_id,
        report.state.score(),
        report.state.questions().len(),
        report.termination,
        report.outcome,
    );
    if !report.validation_errors.is_empty() {
        println!(
            "{} answer(s) could not be checked and counted as incorrect",
            report.validation_errors.len()
        );
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
