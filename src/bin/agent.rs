use std::{path::Path, sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use host_sentinel::{
    actors::{alert::AlertHandle, monitor::MonitorHandle, recorder::RecorderHandle},
    alerts::AlertManager,
    config::{Config, read_config_file},
    host::{Collaborators, HostMonitor},
    monitors::collector::SysinfoCollector,
    remediation::system::{SystemCapabilities, SystemdRestarter, TcpProber},
    storage::file::FileRecorder,
    util::{apply_env_alerts, get_config_path, get_email_alert, get_interval, get_webhook_url},
};
use sysinfo::System;
use tokio::sync::broadcast;
use tracing::{debug, error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(about = "Monitors this host, remediates resource pressure and restarts failed services")]
struct Args {
    /// Config file (defaults to $SENTINEL_CONFIG or sentinel.json)
    #[arg(short, long)]
    file: Option<String>,

    /// Seconds between monitoring cycles
    #[arg(short, long)]
    interval: Option<u64>,

    /// Stop after this many seconds instead of running until ctrl-c
    #[arg(short, long)]
    duration: Option<u64>,

    #[arg(short, long)]
    verbose: bool,
}

fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };
    let filter =
        filter::Targets::new().with_targets(vec![("host_sentinel", level), ("sentinel_agent", level)]);
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

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.file {
        Some(file) => read_config_file(file).with_context(|| format!("failed to read {file}"))?,
        None => {
            let path = get_config_path();
            if Path::new(&path).exists() {
                read_config_file(&path).with_context(|| format!("failed to read {path}"))?
            } else {
                debug!("{path} not found, using default configuration");
                Config::default()
            }
        }
    };

    if let Some(interval) = args.interval.filter(|i| *i > 0).or_else(get_interval) {
        config.interval = interval;
    }
    if args.duration.is_some() {
        config.duration = args.duration;
    }
    apply_env_alerts(&mut config, get_webhook_url(), get_email_alert());

    Ok(config)
}

async fn wait_for_stop(duration: Option<u64>) {
    let elapsed = async {
        match duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("failed to listen for ctrl-c: {e}");
            }
            info!("received ctrl-c, stopping");
        }
        _ = elapsed => info!("run duration elapsed, stopping"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let config = load_config(&args)?;
    let host = System::host_name().unwrap_or_else(|| String::from("localhost"));

    let recorder = Arc::new(
        FileRecorder::new(&config.logging)
            .await
            .context("failed to prepare log files")?,
    );
    let notifier = Arc::new(AlertManager::new(config.alerts.clone(), host.clone()));

    let collaborators = Collaborators {
        collector: Arc::new(SysinfoCollector::new()),
        capabilities: Arc::new(SystemCapabilities::new(config.remediation.temp_dir.clone())),
        prober: Arc::new(TcpProber),
        restarter: Arc::new(SystemdRestarter),
    };
    let monitor = HostMonitor::new(host.clone(), collaborators, &config);

    let (report_tx, _) = broadcast::channel(64);
    let recorder = RecorderHandle::spawn(recorder, report_tx.subscribe());
    let alerts = AlertHandle::spawn(notifier, report_tx.subscribe());

    recorder.record_system("Automation suite started").await?;
    info!(
        "monitoring {host} every {}s ({} services, {} alert transports)",
        config.interval,
        config.services.len(),
        config.alerts.len()
    );

    let monitor = MonitorHandle::spawn(monitor, Duration::from_secs(config.interval), report_tx);

    wait_for_stop(config.duration).await;

    if let Err(e) = monitor.shutdown().await {
        error!("failed to stop monitor: {e:#}");
    }
    recorder.record_system("Automation suite stopped").await?;

    alerts.shutdown().await;
    recorder.shutdown().await;

    Ok(())
}
