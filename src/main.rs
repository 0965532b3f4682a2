//! CLI entry point for `mail2issue`.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mail2issue::config::Config;
use mail2issue::error::MailError;
use mail2issue::model::email::Decoded;
use mail2issue::parser::{decode_reader, decode_with, text};
use mail2issue::publish::accounts::{AccountLookup, StaticAccounts};
use mail2issue::publish::chat::{ChatLimits, JsonlNotifier, Notifier};
use mail2issue::publish::images::DirectoryImageHost;
use mail2issue::publish::tracker::JsonlIssueTracker;
use mail2issue::publish::{PublishOutcome, Publisher};

/// Turn raw inbound emails into issue-tracker posts.
#[derive(Parser)]
#[command(name = "mail2issue", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (overrides $MAIL2ISSUE_CONFIG)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode messages and print the normalized record
    Decode {
        /// .eml files to decode (reads stdin when none are given)
        files: Vec<PathBuf>,
        /// Print JSON instead of a readable summary
        #[arg(long)]
        json: bool,
    },
    /// Decode one message and file it as an issue
    Publish {
        /// .eml file to publish (reads stdin when omitted)
        file: Option<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => mail2issue::config::load_config_from(path)?,
        None => mail2issue::config::load_config(),
    };

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Decode { files, json } => cmd_decode(&files, json, &config),
        Commands::Publish { file } => cmd_publish(file.as_deref(), &config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = mail2issue::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mail2issue.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Read a whole message from a file, or from stdin when `path` is `None`.
fn read_input(path: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(MailError::FileNotFound(path.to_path_buf()).into());
            }
            std::fs::read(path).map_err(|e| MailError::io(path, e).into())
        }
        None => Ok(text::read_message(std::io::stdin().lock())?),
    }
}

/// Decode messages and print them.
fn cmd_decode(files: &[PathBuf], json: bool, config: &Config) -> anyhow::Result<()> {
    let options = config.decode_options();

    if files.is_empty() {
        let decoded = decode_reader(std::io::stdin().lock(), &options)?;
        return print_decoded(None, &decoded, json);
    }

    let pb = if files.len() > 1 {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} Decoding [{bar:40.cyan/blue}] {pos}/{len}")
                .expect("valid template")
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut results = Vec::with_capacity(files.len());
    for path in files {
        let raw = read_input(Some(path))?;
        results.push((path, decode_with(&raw, &options)));
        pb.inc(1);
    }
    pb.finish_and_clear();

    for (path, decoded) in &results {
        print_decoded(Some(path), decoded, json)?;
    }
    Ok(())
}

fn print_decoded(path: Option<&Path>, decoded: &Decoded, json: bool) -> anyhow::Result<()> {
    use humansize::{format_size, BINARY};

    let source = path.map(|p| p.display().to_string()).unwrap_or_else(|| "<stdin>".into());

    if json {
        let value = match decoded {
            Decoded::Email(email) => serde_json::json!({
                "source": source,
                "skip": false,
                "email": email,
            }),
            Decoded::Skip(reason) => serde_json::json!({
                "source": source,
                "skip": true,
                "reason": reason,
            }),
        };
        println!("{}", serde_json::to_string(&value)?);
        return Ok(());
    }

    let mut out = std::io::stdout().lock();
    match decoded {
        Decoded::Skip(reason) => {
            writeln!(out, "  {source}: skipped ({reason})")?;
        }
        Decoded::Email(email) => {
            writeln!(out)?;
            writeln!(out, "  {:<10} {}", "Source", source)?;
            writeln!(out, "  {:<10} {}", "Subject", email.subject)?;
            writeln!(out, "  {:<10} {}", "From", email.from)?;
            if let Some(date) = email.date {
                writeln!(out, "  {:<10} {}", "Date", date.format("%Y-%m-%d %H:%M"))?;
            }
            for att in &email.attachments {
                writeln!(
                    out,
                    "  {:<10} {} ({}, {})",
                    "Image",
                    att.filename,
                    att.content_type,
                    format_size(att.size(), BINARY)
                )?;
            }
            writeln!(out, "  {}", "-".repeat(72))?;
            writeln!(out, "{}", email.body)?;
        }
    }
    Ok(())
}

/// Decode one message and publish it with the configured collaborators.
fn cmd_publish(path: Option<&Path>, config: &Config) -> anyhow::Result<()> {
    // Configuration problems surface before any input is read or decoded.
    config.require_publish()?;

    let images = DirectoryImageHost::from_config(&config.images)?;
    let tracker = JsonlIssueTracker::new(
        config
            .tracker
            .issues_file
            .clone()
            .ok_or_else(|| MailError::MissingConfig("tracker.issues_file".into()))?,
    );
    let notifier = match (&config.chat.outbox_file, config.chat.enabled) {
        (Some(path), true) => Some(JsonlNotifier::new(path.clone())),
        _ => None,
    };
    let chain = StaticAccounts::chain_from_config(&config.accounts);

    let publisher = Publisher {
        options: config.decode_options(),
        repository: config.tracker.repository.clone().unwrap_or_default(),
        labels: config.tracker.labels.clone(),
        images: &images,
        tracker: &tracker,
        accounts: chain.iter().map(|a| a as &dyn AccountLookup).collect(),
        notifier: notifier.as_ref().map(|n| n as &dyn Notifier),
        chat_limits: ChatLimits::from(&config.chat),
    };

    let raw = read_input(path)?;
    match publisher.publish(&raw)? {
        PublishOutcome::Skipped(reason) => {
            println!("  Skipped: {reason}");
        }
        PublishOutcome::Published {
            issue,
            images,
            dropped_images,
        } => {
            println!("  Created {}", issue.reference);
            println!("  {:<20} {}", "Images uploaded", images);
            if dropped_images > 0 {
                println!("  {:<20} {}", "Images dropped", dropped_images);
            }
        }
    }
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mail2issue", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::stdout().write_all(&buf)?;
    Ok(())
}
