//! SHIELD dashboard - live sensor fleet monitoring.
//!
//! Run with: `cargo run -p shield-app -- --simulate`

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

use shield_app::reactor::{Reactor, ReactorOptions, Tick};
use shield_app::sim::{SimOptions, Simulator};
use shield_app::Config;
use shield_net::mock::MockChannel;
use shield_net::{ApiClient, SessionOptions, TransportSession};
use shield_state::{FeederOptions, StatusRules, Ticker};

/// SHIELD dashboard - live sensor fleet monitoring.
#[derive(Parser, Debug)]
#[command(name = "shield-app")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend base URL (overrides config).
    #[arg(long)]
    backend_url: Option<String>,

    /// Generate local traffic instead of connecting to a backend.
    #[arg(long)]
    simulate: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(args.verbose)?;

    // Load configuration, then apply CLI overrides.
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    if let Some(url) = args.backend_url {
        config.backend.base_url = url;
    }
    config.validate()?;

    let client = ApiClient::new(&config.backend.base_url)?;
    let options = ReactorOptions {
        alarm_limit: config.backend.alarm_limit,
        feeder: FeederOptions {
            throttle: config.charts.throttle(),
            range: config.charts.range,
        },
        seed_on_connect: !args.simulate,
    };
    let mut reactor = Reactor::new(client, StatusRules::default(), options);

    // The push channel: simulated traffic, or the deployment's transport
    // adapter (poll mode runs request-only until one is wired in).
    let (channel, handle) = MockChannel::new();
    let mut simulator = None;
    let mut idle_handle = None;
    if args.simulate {
        info!("simulation mode: generating local sensor traffic");
        simulator = Some(Simulator::start(handle, SimOptions::default()));
    } else {
        // Keep the channel open; without a transport adapter the session
        // simply stays quiet while the request client does the work.
        idle_handle = Some(handle);
    }
    let (session, session_events) = TransportSession::start(channel, SessionOptions::default());

    if !args.simulate {
        // No push traffic yet; seed immediately rather than waiting for a
        // connected transition.
        reactor.reseed().await;
        reactor.reload_charts(config.charts.range).await;
    }

    // Periodic work, tied to the reactor's lifetime.
    let (tick_tx, tick_rx) = mpsc::channel(16);
    let tickers = vec![
        Ticker::spawn(
            Duration::from_secs(config.timers.clock_secs),
            Tick::Clock,
            tick_tx.clone(),
        ),
        Ticker::spawn(
            Duration::from_secs(config.timers.stats_refresh_secs),
            Tick::StatsRefresh,
            tick_tx.clone(),
        ),
        Ticker::spawn(
            Duration::from_secs(config.timers.staleness_sweep_secs),
            Tick::StalenessSweep,
            tick_tx,
        ),
    ];

    info!(backend = %config.backend.base_url, "dashboard pipeline running");
    reactor.run(session_events, tick_rx).await;

    // Orderly shutdown: timers and traffic stop with the reactor.
    for ticker in tickers {
        ticker.close();
    }
    if let Some(simulator) = simulator.take() {
        simulator.close();
    }
    drop(idle_handle);
    session.close();

    Ok(())
}

fn init_tracing(verbosity: u8) -> anyhow::Result<()> {
    let default_level = match verbosity {
        0 => "shield_app=info,shield_net=info,shield_state=info",
        1 => "shield_app=debug,shield_net=debug,shield_state=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    Ok(())
}
