use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use osc_pair_monitor::export::default_export_path;
use osc_pair_monitor::{LogSink, Monitor, MonitorConfig, MonitorError, Retention, TagPolicy};
use tracing::{error, info};

/// Verify that left and right eye X values arriving over OSC stay equal.
#[derive(Parser, Debug)]
#[command(name = "osc-pair-monitor", version)]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    ip: Option<IpAddr>,

    /// UDP port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Inclusive tolerance for |left_x - right_x|
    #[arg(long)]
    tolerance: Option<f64>,

    /// Seconds to monitor; 0 runs until Ctrl-C
    #[arg(long)]
    duration: Option<u64>,

    /// Export the sample log to CSV after stopping
    #[arg(long, default_value_t = false)]
    export: bool,

    /// CSV destination (implies --export)
    #[arg(long)]
    export_path: Option<PathBuf>,

    /// Reject messages with argument types other than f and i
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Keep only the newest N samples in memory
    #[arg(long)]
    max_samples: Option<usize>,

    /// Status report interval in seconds
    #[arg(long)]
    status_interval: Option<u64>,

    /// Idle status ticks before reporting that data stopped
    #[arg(long)]
    idle_ticks: Option<u32>,

    /// Print the final summary as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<(MonitorConfig, Option<PathBuf>, bool)> {
        let mut cfg = match &self.config {
            Some(path) => MonitorConfig::from_json_file(path)?,
            None => MonitorConfig::default(),
        };
        if let Some(ip) = self.ip {
            cfg.ip = ip;
        }
        if let Some(port) = self.port {
            cfg.port = port;
        }
        if let Some(tolerance) = self.tolerance {
            cfg.tolerance = tolerance;
        }
        if let Some(duration) = self.duration {
            cfg.duration_secs = duration;
        }
        if self.strict {
            cfg.tag_policy = TagPolicy::Strict;
        }
        if let Some(n) = self.max_samples {
            cfg.retention = Retention::Bounded(n);
        }
        if let Some(secs) = self.status_interval {
            cfg.status_interval_ms = secs.saturating_mul(1000);
        }
        if let Some(ticks) = self.idle_ticks {
            cfg.idle_ticks = ticks;
        }
        cfg.validate()?;

        let export = match self.export_path {
            Some(path) => Some(path),
            None if self.export => Some(default_export_path()),
            None => None,
        };
        Ok((cfg, export, self.json))
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (config, export, json) = Cli::parse().into_config()?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::Release))?;

    let monitor = Monitor::start(&config, Arc::new(LogSink)).map_err(|e| match e {
        MonitorError::Bind { .. } => {
            anyhow::anyhow!("{e}; check that port {} is not already in use", config.port)
        }
        other => other.into(),
    })?;

    match config.duration() {
        Some(d) => info!("monitoring for {}s", d.as_secs()),
        None => info!("monitoring until Ctrl-C"),
    }

    let deadline = config.duration().map(|d| Instant::now() + d);
    while monitor.is_running() && !interrupted.load(Ordering::Acquire) {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    if interrupted.load(Ordering::Acquire) {
        info!("interrupted, stopping");
    }

    let stopped = monitor.stop();
    let report = stopped.final_report();
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }

    if let Some(path) = export {
        // Export failures do not invalidate the summary above.
        match stopped.export_csv(&path) {
            Ok(rows) => info!("exported {} samples to {}", rows, path.display()),
            Err(e) => error!("CSV export to {} failed: {}", path.display(), e),
        }
    }

    Ok(())
}
