//! aurora-bot - Kp index alerts over Telegram
//!
//! Answers `/k`, `/forecast` and `/history` from the NOAA SWPC feeds and
//! pushes an alert to the configured channel when a geomagnetic storm is
//! forecast.

use std::sync::Arc;

use aurora_alerts::{
    AlertEvaluator, AlertScheduler, Clock, HttpFeedSource, LogMessenger, Messenger, QueryService,
    SampleFormatter, SystemClock,
};
use aurora_bot::{Cli, CommandRouter, TelegramClient, UpdatePoller};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_FILTER: &str = "aurora_bot=info,aurora_alerts=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    if let Err(e) = cli.validate() {
        error!(error = %e, "refusing to start");
        return Err(e.into());
    }

    run(cli).await
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let formatter = SampleFormatter::with_offset(cli.utc_offset()?);
    let feed = Arc::new(HttpFeedSource::new(cli.endpoints(), cli.fetch_timeout())?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let telegram = Arc::new(TelegramClient::new(
        cli.telegram_api.as_str(),
        cli.bot_token.as_str(),
        cli.poll_timeout(),
    )?);
    let me = telegram.get_me().await?;
    info!(
        bot_id = me.id,
        username = me.username.as_deref().unwrap_or("-"),
        "authenticated with bot api"
    );

    let alerts: Arc<dyn Messenger> = if cli.dry_run {
        warn!("dry run: alerts are logged, not sent");
        Arc::new(LogMessenger::new("dry-run"))
    } else {
        telegram.clone()
    };

    let config = cli.alert_config();
    let evaluator = AlertEvaluator::new(
        feed.clone(),
        alerts,
        clock.clone(),
        cli.channel(),
        &config,
    )?
    .with_formatter(formatter);
    let scheduler = AlertScheduler::spawn(evaluator);

    let queries = QueryService::new(feed, clock).with_formatter(formatter);
    let mut poller = UpdatePoller::new(telegram.clone(), telegram, CommandRouter::new(queries));
    if let Some(username) = me.username {
        poller = poller.with_bot_username(username);
    }
    let poller = poller.spawn();

    info!(
        channel = %cli.channel(),
        tick_secs = cli.tick_secs,
        cooldown_secs = cli.cooldown_secs,
        "aurora-bot running"
    );

    shutdown_signal().await;
    info!("shutting down");

    if let Err(e) = poller.shutdown().await {
        error!(error = %e, "update poller did not stop cleanly");
    }
    match scheduler.shutdown().await {
        Ok(evaluator) => info!(
            last_alert = ?evaluator.state().last_notified_at(),
            "alert scheduler stopped"
        ),
        Err(e) => error!(error = %e, "alert scheduler did not stop cleanly"),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT"),
        () = terminate => info!("received SIGTERM"),
    }
}
