use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::MonitorError;
use crate::TagPolicy;

/// How many committed samples the in-memory log keeps.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Retention {
    /// Keep every sample for the life of the session. Memory grows with the run.
    #[default]
    Unbounded,
    /// Ring buffer of the newest `n` samples.
    Bounded(usize),
}

/// Runtime configuration for a monitoring session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub ip: IpAddr,
    pub port: u16,
    /// Inclusive maximum |left_x - right_x| for a matching sample.
    pub tolerance: f64,
    /// Run length in seconds; 0 runs until interrupted.
    pub duration_secs: u64,
    /// Socket read timeout, bounding shutdown latency.
    pub recv_timeout_ms: u64,
    pub status_interval_ms: u64,
    /// Consecutive idle status ticks before reporting a stall.
    pub idle_ticks: u32,
    pub tag_policy: TagPolicy,
    pub retention: Retention,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8889,
            tolerance: 0.001,
            duration_secs: 60,
            recv_timeout_ms: 1000,
            status_interval_ms: 5000,
            idle_ticks: 3,
            tag_policy: TagPolicy::Lenient,
            retention: Retention::Unbounded,
        }
    }
}

impl MonitorConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, MonitorError> {
        let data = std::fs::read(path)?;
        let config: Self = serde_json::from_slice(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(MonitorError::Config(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        if self.recv_timeout_ms == 0 {
            return Err(MonitorError::Config("recv_timeout_ms must be positive".into()));
        }
        if self.status_interval_ms == 0 {
            return Err(MonitorError::Config("status_interval_ms must be positive".into()));
        }
        if self.retention == Retention::Bounded(0) {
            return Err(MonitorError::Config("bounded retention needs room for one sample".into()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    pub fn duration(&self) -> Option<Duration> {
        (self.duration_secs > 0).then(|| Duration::from_secs(self.duration_secs))
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = MonitorConfig::default();
        assert_eq!(cfg.bind_addr(), "127.0.0.1:8889".parse().unwrap());
        assert_eq!(cfg.duration(), Some(Duration::from_secs(60)));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"port": 9001, "retention": {"bounded": 100}, "duration_secs": 0}"#;
        let cfg: MonitorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.port, 9001);
        assert_eq!(cfg.retention, Retention::Bounded(100));
        assert_eq!(cfg.duration(), None);
        assert_eq!(cfg.tolerance, 0.001);
    }

    #[test]
    fn test_rejects_negative_tolerance() {
        let cfg = MonitorConfig {
            tolerance: -1.0,
            ..MonitorConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(MonitorError::Config(_))));
    }

    #[test]
    fn test_rejects_zero_bounded_retention() {
        let cfg = MonitorConfig {
            retention: Retention::Bounded(0),
            ..MonitorConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(MonitorError::Config(_))));
    }
}
