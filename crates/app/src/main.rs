use std::fmt;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use engine::{ChatEngine, MessageKind, MessageSink, PendingAction};
use gateway::{ApiConfig, FileReportDelivery, HealthApi, HttpApi, InMemoryApi};
use vital_core::Clock;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
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
    eprintln!("  cargo run -p app -- [--api-url <url>] [--report-dir <dir>] [--offline]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --api-url    http://localhost:3000");
    eprintln!("  --report-dir reports");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  VITAL_API_URL, VITAL_REPORT_DIR");
    eprintln!();
    eprintln!("--offline runs against a built-in demo service (accounts:");
    eprintln!("  ana/1234 patient, mario/5678 clinician) instead of the backend.");
}

struct Args {
    api_url: String,
    report_dir: PathBuf,
    offline: bool,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut api_url = ApiConfig::from_env().base_url;
        let mut report_dir = std::env::var("VITAL_REPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("reports"));
        let mut offline = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--api-url" => api_url = require_value(args, "--api-url")?,
                "--report-dir" => report_dir = PathBuf::from(require_value(args, "--report-dir")?),
                "--offline" => offline = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            api_url,
            report_dir,
            offline,
        })
    }
}

/// Line-based presentation shell: chat messages on stdout, logs on stderr.
struct ConsoleSink;

impl MessageSink for ConsoleSink {
    fn post(&self, text: &str, from_user: bool, kind: MessageKind) {
        // The terminal already echoes what the user typed.
        if from_user {
            return;
        }
        match kind {
            MessageKind::Normal => println!("{text}"),
            MessageKind::Error => println!("[!] {text}"),
        }
    }

    fn clear_transcript(&self) {
        println!();
        println!("────────────────────────────────────────");
        println!();
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let clock = Clock::default_clock();
    let api: Arc<dyn HealthApi> = if args.offline {
        tracing::info!("running against the built-in demo service");
        Arc::new(InMemoryApi::demo(clock)?)
    } else {
        Arc::new(HttpApi::new(ApiConfig::new(&args.api_url)))
    };
    let reports = Arc::new(FileReportDelivery::new(
        Arc::clone(&api),
        &args.report_dir,
        clock,
    ));
    let sink = Arc::new(ConsoleSink);

    let mut chat = ChatEngine::new(api, reports, sink);
    chat.start();

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut line = String::new();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF: the user closed the input stream.
        }

        let action = chat.handle(&line).await;
        if let Some(PendingAction::SessionReset) = action {
            // Let the farewell sit on screen for a beat before re-prompting.
            tokio::time::sleep(Duration::from_millis(600)).await;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
