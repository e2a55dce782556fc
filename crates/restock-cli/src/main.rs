mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing_subscriber::{fmt, EnvFilter};

use restock_core::{
    EventKind, HttpProbe, JsonlStore, MemoryStore, MonitorConfig, MonitorEngine, Notifier,
    NullNotifier, Outcome, ProbeRegistry, Scheduler, SchedulerState, StateStore, TargetLoader,
    TelegramNotifier,
};

fn version_string() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");

    if GIT_HASH.is_empty() {
        // Leak is fine — called once, lives for the program's lifetime.
        Box::leak(VERSION.to_string().into_boxed_str())
    } else {
        Box::leak(format!("{VERSION} ({GIT_HASH})").into_boxed_str())
    }
}

/// Retail availability monitor — alert once per restock.
#[derive(Parser)]
#[command(name = "restock", version = version_string(), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single pass over all configured targets and exit.
    Once {
        /// Path to TOML config file.
        config: PathBuf,
    },
    /// Monitor continuously until interrupted.
    Watch {
        /// Path to TOML config file.
        config: PathBuf,

        /// Do not re-read the config file between passes.
        #[arg(long, default_value_t = false)]
        no_reload: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Once { config } => run_once(&config).await,
        Commands::Watch { config, no_reload } => run_watch(&config, no_reload).await,
    }
}

fn load_config(path: &Path) -> config::AppConfig {
    match config::AppConfig::load(path) {
        Ok(c) => {
            init_tracing(&c.log_format);
            tracing::info!(path = %path.display(), "Loaded config file");
            c
        }
        Err(e) => {
            init_tracing("pretty");
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    }
}

struct Runtime {
    engine: Arc<MonitorEngine>,
    monitor_config: MonitorConfig,
    store: Arc<dyn StateStore>,
}

async fn build_runtime(app: &config::AppConfig) -> Runtime {
    let monitor_config = app.defaults.to_monitor_config();
    let client = HttpProbe::build_client(monitor_config.request_timeout);

    let mut registry = ProbeRegistry::new();
    for source in &app.source {
        let probe =
            HttpProbe::from_config_with_client(&monitor_config, client.clone(), &source.marker);
        registry.register(&source.name, Arc::new(probe));
    }

    let store: Arc<dyn StateStore> = match &app.store {
        Some(store_config) => match JsonlStore::open(&store_config.path).await {
            Ok(s) => Arc::new(s),
            Err(e) => {
                tracing::error!(path = %store_config.path.display(), error = %e, "Cannot open observation store");
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("No store configured; observations are held in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let notifier: Arc<dyn Notifier> = match &app.telegram {
        Some(telegram) => match telegram.credentials() {
            Ok((token, chat_id)) => Arc::new(
                TelegramNotifier::new(client, token, chat_id)
                    .with_timeout(Duration::from_millis(telegram.timeout_ms))
                    .with_max_retries(telegram.max_retries),
            ),
            Err(e) => {
                tracing::error!("{}", e);
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("No Telegram config; alerts will only be logged");
            Arc::new(NullNotifier)
        }
    };

    let engine = Arc::new(MonitorEngine::new(
        registry,
        Arc::clone(&store),
        notifier,
        &monitor_config,
    ));

    Runtime {
        engine,
        monitor_config,
        store,
    }
}

async fn run_once(config_path: &Path) {
    let app = load_config(config_path);
    let runtime = build_runtime(&app).await;
    let scheduler = Scheduler::new(runtime.engine, app.to_targets(), runtime.monitor_config);

    let results = scheduler.run_once().await;

    let mut failures = 0usize;
    for result in &results {
        let key = format!("{}/{}", result.target.source, result.target.item);
        match &result.outcome {
            Outcome::Processed { available, alerted } => {
                let status = if *available {
                    style("IN STOCK").green().bold()
                } else {
                    style("out of stock").dim()
                };
                let alert_badge = if *alerted {
                    format!("  {}", style("alerted").green())
                } else {
                    String::new()
                };
                println!("  {:<28} {}{}", key, status, alert_badge);
            }
            Outcome::ProbeFailed(e) => {
                failures += 1;
                println!("  {:<28} {} {}", key, style("PROBE FAILED").red().bold(), e);
            }
            Outcome::StoreFailed(e) => {
                failures += 1;
                println!("  {:<28} {} {}", key, style("STORE FAILED").red().bold(), e);
            }
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
}

async fn run_watch(config_path: &Path, no_reload: bool) {
    let app = load_config(config_path);
    let runtime = build_runtime(&app).await;
    let pass_delay = runtime.monitor_config.pass_delay;
    let store = Arc::clone(&runtime.store);

    let mut scheduler = Scheduler::new(
        runtime.engine.clone(),
        app.to_targets(),
        runtime.monitor_config,
    );

    if !no_reload {
        let path = config_path.to_path_buf();
        let loader: TargetLoader =
            Arc::new(move || config::AppConfig::load(&path).map(|c| c.to_targets()));
        scheduler = scheduler.with_target_loader(loader);
    }

    let multi = MultiProgress::new();
    let msg_style = ProgressStyle::with_template("{wide_msg}").expect("valid template");

    multi
        .println(format!(
            "{} {}",
            style("restock").bold(),
            style(version_string()).dim()
        ))
        .ok();
    multi
        .println(format!(
            "  {} {}",
            style("config:").dim(),
            config_path.display()
        ))
        .ok();
    multi
        .println(format!(
            "  {} {}ms",
            style("pass:  ").dim(),
            pass_delay.as_millis()
        ))
        .ok();
    multi
        .println(format!("  {} {}", style("reload:").dim(), !no_reload))
        .ok();
    multi.println("").ok();
    multi
        .println(format!("{}", style("Press Ctrl+C to stop").dim()))
        .ok();
    multi.println("").ok();

    scheduler.start().await;

    let status_bar = multi.add(ProgressBar::new_spinner().with_style(msg_style));
    status_bar.set_message(format!("  {}", style("Waiting for first pass...").dim()));

    let mut last_event_count = 0usize;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            _ = tokio::signal::ctrl_c() => {
                status_bar.finish_and_clear();
                multi.println(format!("\n{}", style("Shutting down...").dim())).ok();
                scheduler.stop().await;
                // The scheduler only observes the stop request between
                // passes; give it a bounded window to wind down.
                for _ in 0..50 {
                    if scheduler.state().await == SchedulerState::Stopped {
                        break;
                    }
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                multi.println(format!("{}", style("Monitor stopped.").dim())).ok();
                return;
            }
        }

        let events = scheduler.engine().events().await;
        if events.len() > last_event_count {
            let new_count = events.len() - last_event_count;
            for ev in events[..new_count].iter().rev() {
                let ts = ev.timestamp.format("%H:%M:%S");
                let kind_str = format!("{:<10}", format!("{}", ev.kind));
                let colored_kind = match ev.kind {
                    EventKind::BecameAvailable | EventKind::AlertSent => style(kind_str).green(),
                    EventKind::BecameUnavailable => style(kind_str).yellow(),
                    EventKind::AlertFailed => style(kind_str).red(),
                };
                multi
                    .println(format!(
                        "  {}  {} {}/{}  {}",
                        style(ts).dim(),
                        colored_kind,
                        ev.source,
                        ev.item,
                        ev.details
                    ))
                    .ok();
            }
            last_event_count = events.len();
        }

        let targets = scheduler.targets().await;
        let mut status_lines = vec![format!(
            "{} {}",
            style("pass").dim(),
            style(scheduler.pass_count()).dim().bold()
        )];

        for target in &targets {
            let line = match store.latest(&target.source, &target.item).await {
                Ok(Some(obs)) if obs.available => format!(
                    "  {:<28} {}",
                    format!("{}/{}", target.source, target.item),
                    style("IN STOCK").green().bold()
                ),
                Ok(Some(_)) => format!(
                    "  {:<28} {}",
                    format!("{}/{}", target.source, target.item),
                    style("out of stock").dim()
                ),
                Ok(None) => format!(
                    "  {:<28} {}",
                    format!("{}/{}", target.source, target.item),
                    style("no data yet").dim()
                ),
                Err(e) => format!(
                    "  {:<28} {} {}",
                    format!("{}/{}", target.source, target.item),
                    style("STORE ERROR").red(),
                    e
                ),
            };
            status_lines.push(line);
        }

        status_bar.set_message(status_lines.join("\n"));
    }
}

fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_format {
        "json" => {
            fmt().with_env_filter(filter).json().init();
        }
        _ => {
            fmt().with_env_filter(filter).init();
        }
    }
}
