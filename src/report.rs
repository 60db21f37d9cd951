use tracing::{info, warn};

use crate::status::StatusObservation;
use crate::validate::MismatchEvent;

/// Consumer of real-time mismatches and periodic status.
pub trait ReportSink: Send + Sync {
    fn mismatch(&self, event: &MismatchEvent);

    fn status(&self, observation: &StatusObservation);
}

/// Writes everything through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ReportSink for LogSink {
    fn mismatch(&self, event: &MismatchEvent) {
        warn!("{}", event);
    }

    fn status(&self, observation: &StatusObservation) {
        match observation {
            StatusObservation::Progress {
                total,
                match_ratio,
                max_difference,
            } => info!(
                "collected {} samples | match rate: {:.1}% | max difference: {:.6}",
                total,
                match_ratio * 100.0,
                max_difference
            ),
            StatusObservation::Stalled { idle_ticks } => warn!(
                idle_ticks,
                "no new data; check that the tracker is still sending"
            ),
            StatusObservation::AwaitingFirst => info!("waiting for the first packet..."),
            StatusObservation::Idle { .. } => {}
        }
    }
}
