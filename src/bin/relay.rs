//! Relay CLI - Command-line interface for Pulsejump Relay
//!
//! Commands:
//! - run: Drive a full relay cycle from an NDJSON event script
//! - doctor: Diagnose relay configuration and environment

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;

use chrono::{DateTime, Utc};
use pulsejump_relay::{
    generate_identity, relay_channel, ActivitySessionHost, BiometricProvider, RelayConfig,
    RelayError, RelayEvent, RelayHandle, RelayRuntime, SessionController, Transport,
    DEFAULT_CHANNEL, PRODUCER_NAME, RELAY_VERSION,
};

/// Pulsejump Relay - stream live heart rate to a pub/sub channel
#[derive(Parser)]
#[command(name = "relay")]
#[command(version = RELAY_VERSION)]
#[command(about = "Relay heart-rate samples to a pub/sub channel", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive a full relay cycle from an NDJSON event script
    Run {
        /// Input event script path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Configuration file (JSON); overrides the key flags
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Publish key for the transport
        #[arg(long, default_value = "demo")]
        publish_key: String,

        /// Subscribe key for the transport
        #[arg(long, default_value = "demo")]
        subscribe_key: String,

        /// Channel name to publish to
        #[arg(long, default_value = DEFAULT_CHANNEL)]
        channel: String,

        /// Stable device identity (generated when omitted)
        #[arg(long)]
        identity: Option<String>,
    },

    /// Diagnose relay configuration and environment
    Doctor {
        /// Check a configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), RelayCliError> {
    match cli.command {
        Commands::Run {
            input,
            config,
            publish_key,
            subscribe_key,
            channel,
            identity,
        } => cmd_run(
            &input,
            config.as_deref(),
            publish_key,
            subscribe_key,
            channel,
            identity,
        ),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn load_config(
    config_path: Option<&Path>,
    publish_key: String,
    subscribe_key: String,
    channel: String,
    identity: Option<String>,
) -> Result<RelayConfig, RelayCliError> {
    let config = match config_path {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            RelayConfig::from_json(&json)?
        }
        None => {
            let mut config = RelayConfig::new(publish_key, subscribe_key);
            config.channel = channel;
            config.device_identity = Some(identity.unwrap_or_else(generate_identity));
            config
        }
    };
    config.validate().map_err(RelayCliError::Config)?;
    Ok(config)
}

fn cmd_run(
    input: &Path,
    config_path: Option<&Path>,
    publish_key: String,
    subscribe_key: String,
    channel: String,
    identity: Option<String>,
) -> Result<(), RelayCliError> {
    let config = load_config(config_path, publish_key, subscribe_key, channel, identity)?;

    let (handle, events) = relay_channel();
    let controller = SessionController::new(config, RecordingHost, SimProvider, StdoutTransport);
    let runtime = RelayRuntime::new(controller, events);

    // The script is fed from its own thread; the runtime drains the queue
    // here. Host confirmations are part of the script, so ordering is
    // exactly what the file says.
    let reader = spawn_script_reader(input.to_path_buf(), handle);

    runtime.run(|status| {
        emit(serde_json::json!({ "record": "status", "text": status }));
    });

    let parsed = reader
        .join()
        .map_err(|_| RelayCliError::Parse("event reader panicked".to_string()))??;
    if parsed == 0 {
        return Err(RelayCliError::NoEvents);
    }

    Ok(())
}

/// Read NDJSON relay events and marshal them onto the queue.
///
/// Sends `Shutdown` at end of input (or on a bad line, so the runtime never
/// hangs), then reports how many events were forwarded.
fn spawn_script_reader(
    input: PathBuf,
    handle: RelayHandle,
) -> thread::JoinHandle<Result<usize, RelayCliError>> {
    thread::spawn(move || {
        let reader: Box<dyn BufRead> = if input.to_string_lossy() == "-" {
            Box::new(BufReader::new(io::stdin()))
        } else {
            Box::new(BufReader::new(fs::File::open(&input)?))
        };

        let mut sent = 0usize;
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let event: RelayEvent = match serde_json::from_str(trimmed) {
                Ok(event) => event,
                Err(e) => {
                    handle.shutdown();
                    return Err(RelayCliError::Parse(format!(
                        "Failed to parse event: {}",
                        e
                    )));
                }
            };

            let is_shutdown = matches!(event, RelayEvent::Shutdown);
            handle.send(event);
            sent += 1;
            if is_shutdown {
                return Ok(sent);
            }
        }

        handle.shutdown();
        Ok(sent)
    })
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), RelayCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "relay_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Relay version {}", RELAY_VERSION),
    });

    checks.push(DoctorCheck {
        name: "identity".to_string(),
        status: CheckStatus::Ok,
        message: format!("Identity generation works: {}", generate_identity()),
    });

    if let Some(path) = config_path {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match RelayConfig::from_json(&content) {
                    Ok(config) => match config.validate() {
                        Ok(()) => {
                            checks.push(DoctorCheck {
                                name: "config".to_string(),
                                status: CheckStatus::Ok,
                                message: format!(
                                    "Config valid (channel '{}', identity '{}')",
                                    config.channel,
                                    config.identity()
                                ),
                            });
                        }
                        Err(e) => {
                            checks.push(DoctorCheck {
                                name: "config".to_string(),
                                status: CheckStatus::Error,
                                message: format!("Config invalid: {}", e),
                            });
                        }
                    },
                    Err(e) => {
                        checks.push(DoctorCheck {
                            name: "config".to_string(),
                            status: CheckStatus::Error,
                            message: format!("Invalid config JSON: {}", e),
                        });
                    }
                },
                Err(e) => {
                    checks.push(DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Cannot read config file: {}", e),
                    });
                }
            }
        } else {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist".to_string(),
            });
        }
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (script mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: RELAY_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Relay Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(RelayCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Script-mode collaborators

fn emit(record: serde_json::Value) {
    println!("{}", record);
}

/// Records begin/end requests as output; confirmations come from the script.
struct RecordingHost;

impl ActivitySessionHost for RecordingHost {
    fn begin_session(&mut self, start: DateTime<Utc>) -> Result<(), RelayError> {
        emit(serde_json::json!({
            "record": "session_begin_requested",
            "start": start.to_rfc3339(),
        }));
        Ok(())
    }

    fn end_session(&mut self) -> Result<(), RelayError> {
        emit(serde_json::json!({ "record": "session_end_requested" }));
        Ok(())
    }
}

/// Always-available provider; samples arrive through the script instead.
struct SimProvider;

impl BiometricProvider for SimProvider {
    fn is_available(&self) -> bool {
        true
    }

    fn request_authorization(&mut self) -> Result<(), RelayError> {
        Ok(())
    }

    fn begin_stream(&mut self, since: DateTime<Utc>) -> Result<(), RelayError> {
        emit(serde_json::json!({
            "record": "feed_started",
            "since": since.to_rfc3339(),
        }));
        Ok(())
    }

    fn end_stream(&mut self) {
        emit(serde_json::json!({ "record": "feed_stopped" }));
    }
}

/// Prints every transport operation as an NDJSON record.
struct StdoutTransport;

impl Transport for StdoutTransport {
    fn connect(&mut self, identity: &str) -> Result<(), RelayError> {
        emit(serde_json::json!({ "record": "connect", "identity": identity }));
        Ok(())
    }

    fn subscribe(&mut self, channel: &str, with_presence: bool) -> Result<(), RelayError> {
        emit(serde_json::json!({
            "record": "subscribe",
            "channel": channel,
            "with_presence": with_presence,
        }));
        Ok(())
    }

    fn publish(&mut self, channel: &str, payload: &str) -> Result<(), RelayError> {
        emit(serde_json::json!({
            "record": "publish",
            "channel": channel,
            "payload": payload,
        }));
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum RelayCliError {
    Io(io::Error),
    Json(serde_json::Error),
    Config(RelayError),
    Parse(String),
    NoEvents,
    DoctorFailed,
}

impl From<io::Error> for RelayCliError {
    fn from(e: io::Error) -> Self {
        RelayCliError::Io(e)
    }
}

impl From<serde_json::Error> for RelayCliError {
    fn from(e: serde_json::Error) -> Self {
        RelayCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<RelayCliError> for CliError {
    fn from(e: RelayCliError) -> Self {
        match e {
            RelayCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            RelayCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            RelayCliError::Config(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Provide non-empty publish and subscribe keys".to_string()),
            },
            RelayCliError::Parse(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Each input line must be one relay event as JSON".to_string()),
            },
            RelayCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure the event script is not empty".to_string()),
            },
            RelayCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
