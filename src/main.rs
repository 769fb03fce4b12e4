use std::io::Write;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::mpsc;

use acinfinity_card::config;
use acinfinity_card::error::ApiResult;
use acinfinity_card::host::Host;
use acinfinity_card::registry::CardDescriptor;

#[derive(Parser, Debug)]
#[command(version, about = "AC Infinity controller card, rendered from local entity data")]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: Utf8PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the cards registered with the host
    Cards,

    /// List the devices classified from the state file
    Devices,

    /// Render the card once
    Render {
        /// Device id to show, instead of the configured one
        #[arg(short, long)]
        controller: Option<String>,

        /// Print the display model as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the editor form
    Editor,

    /// Apply one editor change and print the resulting card configuration
    Set {
        key: String,
        /// JSON value (plain text is taken as a string)
        value: String,
    },

    /// Re-render on every clock tick, until interrupted
    Watch {
        #[arg(short, long)]
        controller: Option<String>,
    },
}

/*
 * Formatter function to output in syslog format. This makes sense when running
 * as a service (where output might go to a log file, or the system journal)
 */
#[allow(clippy::match_same_arms)]
fn syslog_format(
    buf: &mut pretty_env_logger::env_logger::fmt::Formatter,
    record: &log::Record,
) -> std::io::Result<()> {
    writeln!(
        buf,
        "<{}>{}: {}",
        match record.level() {
            log::Level::Error => 3,
            log::Level::Warn => 4,
            log::Level::Info => 6,
            log::Level::Debug => 7,
            log::Level::Trace => 7,
        },
        record.target(),
        record.args()
    )
}

fn init_logging() -> ApiResult<()> {
    /* Try to provide reasonable default filters, when RUST_LOG is not specified */
    const DEFAULT_LOG_FILTERS: &[&str] = &["info", "acinfinity=info", "acinfinity_card=info"];

    let log_filters = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTERS.join(","));

    /* Detect if we need syslog or human-readable formatting */
    if std::env::var("SYSTEMD_EXEC_PID").is_ok_and(|pid| pid == std::process::id().to_string()) {
        Ok(pretty_env_logger::env_logger::builder()
            .format(syslog_format)
            .parse_filters(&log_filters)
            .try_init()?)
    } else {
        Ok(pretty_env_logger::formatted_timed_builder()
            .parse_filters(&log_filters)
            .try_init()?)
    }
}

fn render(host: &Host, controller: Option<&str>, json: bool) -> ApiResult<()> {
    let model = host.card(controller)?.display_model();
    if json {
        println!("{}", serde_json::to_string_pretty(&model)?);
    } else {
        print!("{model}");
    }
    Ok(())
}

fn set(host: &Host, key: &str, value: &str) -> ApiResult<()> {
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));

    let mut editor = host.editor()?;
    let event = editor.value_changed(key, value)?;
    log::info!("Emitting {}", event.name());

    print!("{}", serde_yml::to_string(editor.config())?);
    Ok(())
}

async fn watch(host: &Host, controller: Option<&str>) -> ApiResult<()> {
    let mut card = host.card(controller)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    card.connected(move || {
        let _ = tx.send(());
    })?;

    let mut sigterm = signal::unix::signal(SignalKind::terminate())?;

    print!("{}", card.display_model());
    loop {
        tokio::select! {
            Some(()) = rx.recv() => {
                host.refresh(&mut card)?;
                print!("\n{}", card.display_model());
            }
            res = signal::ctrl_c() => {
                res?;
                log::warn!("Ctrl-C pressed, exiting..");
                break;
            }
            _ = sigterm.recv() => {
                log::warn!("SIGTERM received, exiting..");
                break;
            }
        }
    }

    card.disconnected();
    let _ = std::io::stderr().flush();
    Ok(())
}

async fn run() -> ApiResult<()> {
    let args = Args::parse();

    init_logging()?;

    #[cfg(feature = "server-banner")]
    acinfinity_card::banner::print()?;

    let config = config::parse(&args.config)?;
    log::debug!("Configuration loaded successfully");

    let host = Host::new(config)?;

    match args.command {
        Command::Cards => {
            let cards = host.cards().iter().collect::<Vec<_>>();
            print!("{}", serde_yml::to_string(&cards)?);
        }
        Command::Devices => {
            let card = host.card(None)?;
            if card.devices().is_empty() {
                log::warn!("No AC Infinity devices found in {}", host.config().host.states_file);
            }
            print!("{}", serde_yml::to_string(card.devices())?);
        }
        Command::Render { controller, json } => render(&host, controller.as_deref(), json)?,
        Command::Editor => {
            let editor = host.editor()?;
            log::debug!("Rendering {} form", CardDescriptor::EDITOR_TYPE);
            println!("{}", serde_json::to_string_pretty(&editor.fields())?);
        }
        Command::Set { key, value } => set(&host, &key, &value)?,
        Command::Watch { controller } => watch(&host, controller.as_deref()).await?,
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        log::error!("Card host error: {err}");
        log::error!("Fatal error encountered, cannot continue.");
    }
}
