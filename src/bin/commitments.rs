//! Commitments CLI
//!
//! Operator tool for the promise ledger. `add` is the append executable the
//! promise guard invokes; `resolve` is how a commitment gets closed.

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use clap::{Parser, Subcommand, ValueEnum};

use promise_tracker_lib::commitments::{
    new_commitment, CommitmentRecord, CommitmentStatus, DueTimeResolver, LedgerReader,
    LedgerWriter, NewCommitment, PromiseDetector,
};
use promise_tracker_lib::config::{load_from_path, load_toml_config, TomlConfig};

#[derive(Parser)]
#[command(name = "commitments")]
#[command(about = "Promise ledger tools")]
#[command(version)]
struct Cli {
    /// Ledger file (defaults to the configured ledger)
    #[arg(short, long, env = "PROMISE_TRACKER_LEDGER")]
    ledger: Option<PathBuf>,

    /// Config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append a new open commitment
    ///
    /// Free-text values may start with `-` (bulleted promises, some
    /// recipient ids), so they are taken verbatim.
    Add {
        #[arg(long, allow_hyphen_values = true)]
        who: String,

        #[arg(long, allow_hyphen_values = true)]
        channel: String,

        #[arg(long, allow_hyphen_values = true)]
        what: String,

        /// Absolute due time, RFC 3339
        #[arg(long)]
        due: String,

        #[arg(long, default_value = "", allow_hyphen_values = true)]
        context: String,

        #[arg(long, allow_hyphen_values = true)]
        original_text: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        session_key: Option<String>,
    },

    /// List open commitments
    List {
        /// Include closed and stale records
        #[arg(short, long)]
        all: bool,

        /// Print JSON lines instead of text
        #[arg(long)]
        json: bool,
    },

    /// Close an open commitment
    Resolve {
        id: String,

        #[arg(short, long, value_enum, default_value = "fulfilled")]
        status: Resolution,
    },

    /// Run promise detection on a piece of text
    Detect {
        #[arg(allow_hyphen_values = true)]
        text: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Resolution {
    Fulfilled,
    Expired,
}

impl From<Resolution> for CommitmentStatus {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Fulfilled => CommitmentStatus::Fulfilled,
            Resolution::Expired => CommitmentStatus::Expired,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = dotenvy::dotenv() {
        if cli.verbose {
            eprintln!("No .env file loaded: {}", e);
        }
    }

    let default_filter = if cli.verbose {
        "promise_tracker_lib=debug,commitments=debug"
    } else {
        "promise_tracker_lib=warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match run_command(cli).await {
        Ok(_) => process::exit(0),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<TomlConfig> {
    let mut config = match &cli.config {
        Some(path) => load_from_path(path)?,
        None => load_toml_config(),
    };
    if let Some(ledger) = &cli.ledger {
        config.ledger.path = ledger.clone();
    }
    Ok(config)
}

async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let ledger = config.ledger.path.clone();
    let now = Utc::now();

    match cli.command {
        Commands::Add {
            who,
            channel,
            what,
            due,
            context,
            original_text,
            session_key,
        } => {
            let due_at = DateTime::parse_from_rfc3339(&due)
                .with_context(|| format!("--due must be an RFC 3339 timestamp, got '{}'", due))?
                .with_timezone(&Utc);
            let record = new_commitment(
                NewCommitment {
                    context: Some(context),
                    original_text,
                    session_key,
                    ..NewCommitment::new(who, channel, what, due_at)
                },
                now,
            );
            LedgerWriter::new(&ledger)
                .append(&record)
                .with_context(|| format!("appending to {}", ledger.display()))?;
            println!("Created commitment {}", record.id);
        }

        Commands::List { all, json } => {
            let records = list_records(&config, all, now).await?;
            print!("{}", render_records(&records, json, now)?);
        }

        Commands::Resolve { id, status } => {
            let record = LedgerWriter::new(&ledger).set_status(&id, status.into())?;
            println!("{} -> {}", record.id, record.status);
        }

        Commands::Detect { text } => {
            let detector = match &config.guard.patterns {
                Some(patterns) => PromiseDetector::from_patterns(patterns)?,
                None => PromiseDetector::default(),
            };
            match detector.detect(&text) {
                Some(promise) => {
                    let resolver =
                        DueTimeResolver::with_default_hours(config.guard.default_followup_hours);
                    let due_at = resolver.resolve(&text, now);
                    println!("Promise: {}", promise.fragment);
                    println!("What:    {}", promise.sentence);
                    println!("Due:     {}", due_at.to_rfc3339_opts(SecondsFormat::Millis, true));
                }
                None => println!("No promise detected"),
            }
        }
    }

    Ok(())
}

/// Every parseable record with `all`, otherwise the open, non-stale ones.
async fn list_records(
    config: &TomlConfig,
    all: bool,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<CommitmentRecord>> {
    let ledger = &config.ledger.path;
    if all {
        return Ok(LedgerWriter::new(ledger).read_all()?);
    }
    let max_age = chrono::Duration::try_days(config.ledger.max_age_days)
        .context("max_age_days out of range")?;
    Ok(LedgerReader::new(ledger)
        .with_max_age(max_age)
        .load_open_commitments(now)
        .await?)
}

fn render_records(
    records: &[CommitmentRecord],
    json: bool,
    now: DateTime<Utc>,
) -> anyhow::Result<String> {
    let mut out = String::new();
    if json {
        for record in records {
            out.push_str(&record.to_line()?);
            out.push('\n');
        }
        return Ok(out);
    }

    if records.is_empty() {
        out.push_str("No commitments\n");
        return Ok(out);
    }

    for record in records {
        let overdue = if record.is_open() && record.is_overdue(now) {
            " [OVERDUE]"
        } else {
            ""
        };
        out.push_str(&format!(
            "{} [{}]{} due {} -> {} ({}): {}\n",
            record.id,
            record.status,
            overdue,
            record.due_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            record.who,
            record.channel,
            record.what
        ));
    }
    Ok(out)
}
