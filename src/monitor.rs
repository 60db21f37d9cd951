use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{error, info};

use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::export::export_csv;
use crate::listener::Listener;
use crate::report::ReportSink;
use crate::session::MonitorSession;
use crate::status::StatusReporter;
use crate::validate::FinalReport;

/// A running monitor: listener plus status reporter over one session.
pub struct Monitor {
    session: Arc<MonitorSession>,
    listener: Listener,
    reporter_running: Arc<AtomicBool>,
    reporter: Option<JoinHandle<()>>,
}

/// A monitor after shutdown; the session is no longer written to.
pub struct StoppedMonitor {
    session: Arc<MonitorSession>,
}

impl Monitor {
    /// Bind and start both tasks. A bind failure leaves nothing running.
    pub fn start(config: &MonitorConfig, sink: Arc<dyn ReportSink>) -> Result<Self, MonitorError> {
        config.validate()?;
        let session = Arc::new(MonitorSession::new(config.tolerance, config.retention, sink));

        let listener = Listener::start(
            config.bind_addr(),
            config.recv_timeout(),
            config.tag_policy,
            session.clone(),
        )?;

        let reporter_running = Arc::new(AtomicBool::new(true));
        let reporter = StatusReporter::new(config.status_interval(), config.idle_ticks)
            .spawn(session.clone(), reporter_running.clone())?;

        info!(tolerance = config.tolerance, "monitor started");
        Ok(Self {
            session,
            listener,
            reporter_running,
            reporter: Some(reporter),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn is_running(&self) -> bool {
        self.listener.is_running()
    }

    pub fn session(&self) -> &Arc<MonitorSession> {
        &self.session
    }

    pub fn stop(mut self) -> StoppedMonitor {
        self.shutdown();
        StoppedMonitor {
            session: self.session.clone(),
        }
    }

    fn shutdown(&mut self) {
        self.listener.stop();
        self.reporter_running.store(false, Ordering::Release);
        if let Some(handle) = self.reporter.take() {
            if handle.join().is_err() {
                error!("status reporter panicked");
            }
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl StoppedMonitor {
    pub fn session(&self) -> &MonitorSession {
        &self.session
    }

    pub fn final_report(&self) -> FinalReport {
        self.session.final_report()
    }

    pub fn export_csv<P: AsRef<Path>>(&self, path: P) -> Result<usize, MonitorError> {
        let samples = self.session.samples();
        export_csv(&path, &samples)?;
        info!(path = %path.as_ref().display(), rows = samples.len(), "exported samples");
        Ok(samples.len())
    }
}
