use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use slotwatch::{
    clock::{Clock, SystemClock},
    config::{Config, read_config_file},
    monitors::{CycleResult, Monitor, MonitorSettings, StopReason},
    notify::{NotificationDispatcher, TelegramChannel},
    probe::HttpProber,
    stats::{JsonFileBackend, StatsEngine},
};
use tracing::{error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Watch a booking endpoint for free slots")]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,

    /// Log everything down to trace level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Poll until stopped (default)
    Run,
    /// Run a single cycle and exit
    Check,
    /// Send a test message through every configured channel
    TestNotify,
    /// List Telegram chats that messaged the bot
    ChatIds,
}

fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };
    let filter = filter::Targets::new().with_targets(vec![("slotwatch", level)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    if dotenv::dotenv().is_err() {
        trace!("no .env file found");
    }

    let config = read_config_file(&args.file)?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run(&config).await,
        Command::Check => check(&config).await,
        Command::TestNotify => test_notify(&config).await,
        Command::ChatIds => chat_ids(&config).await,
    }
}

fn dispatcher(config: &Config) -> NotificationDispatcher {
    let dispatcher = NotificationDispatcher::from_config(
        &config.channels,
        config.target.booking_url.clone(),
        config.monitor.send_timeout(),
    );
    if !dispatcher.has_channels() {
        warn!("no notification channel configured, alerts will only be logged");
    }
    dispatcher
}

async fn build_monitor(config: &Config) -> anyhow::Result<Monitor> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let prober = HttpProber::new(&config.probe, &config.target.date, clock.clone())?;
    let backend = JsonFileBackend::new(config.stats.path.clone());
    let stats = StatsEngine::load(Box::new(backend), clock.clone()).await;

    Ok(Monitor::new(
        MonitorSettings::from_config(config),
        Box::new(prober),
        stats,
        dispatcher(config),
        clock,
    ))
}

async fn run(config: &Config) -> anyhow::Result<()> {
    let mut monitor = build_monitor(config).await?;

    match monitor.run().await {
        StopReason::Cancelled => {
            info!("{}", monitor.stats().global_summary());
            Ok(())
        }
        StopReason::TooManyErrors => bail!(
            "stopped after {} consecutive probe failures",
            monitor.state().consecutive_errors
        ),
    }
}

async fn check(config: &Config) -> anyhow::Result<()> {
    let mut monitor = build_monitor(config).await?;
    monitor.run_cycle().await;
    monitor.finish().await;

    if let Some(bucket) = monitor.stats().current_hour_summary() {
        info!("{}", StatsEngine::format_summary(bucket, "Current hour"));
    }
    match monitor.state().last_cycle() {
        CycleResult::Count => Ok(()),
        CycleResult::DetectionError => bail!("probe could not determine the slot count"),
        CycleResult::ProbeFailed => bail!("probe failed"),
    }
}

async fn test_notify(config: &Config) -> anyhow::Result<()> {
    let dispatcher = dispatcher(config);
    if !dispatcher.has_channels() {
        bail!("no notification channel configured");
    }

    let text = format!(
        "🧪 Test message from slotwatch\n\n📅 Target date: {}\n\nIf you can read this, notifications work.",
        config.target.date
    );

    let mut failed = 0;
    for (channel, delivered) in dispatcher.send_test_message(&text).await {
        if delivered {
            info!("{channel}: ok");
        } else {
            error!("{channel}: failed");
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{failed} channel(s) failed");
    }
    Ok(())
}

async fn chat_ids(config: &Config) -> anyhow::Result<()> {
    let Some(telegram) = &config.channels.telegram else {
        bail!("telegram is not configured");
    };
    let Some(token) = &telegram.bot_token else {
        bail!("telegram bot token is missing");
    };

    let chats = TelegramChannel::new(token, &telegram.api_base)
        .discover_chats()
        .await?;

    if chats.is_empty() {
        warn!("no chats found, send a message to the bot first");
    }
    for chat in chats {
        println!("{}\t{}\t{}", chat.id, chat.kind, chat.name);
    }
    Ok(())
}
