use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{trace, warn};

use crate::config::Retention;
use crate::param::Param;
use crate::report::ReportSink;
use crate::sample::{PendingSample, Sample};
use crate::validate::{FinalReport, ValidationAggregate};

/// Aggregate counters read without copying the difference history.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Counters {
    pub total: u64,
    pub match_ratio: f64,
    pub max_difference: f64,
}

/// One lock over all three, so a commit and its validation are a single step.
struct SessionState {
    pending: PendingSample,
    aggregate: ValidationAggregate,
    log: VecDeque<Sample>,
}

pub struct MonitorSession {
    tolerance: f64,
    retention: Retention,
    state: Mutex<SessionState>,
    sink: Arc<dyn ReportSink>,
}

impl MonitorSession {
    /// A zero-sized ring buffer is widened to hold the latest sample.
    pub fn new(tolerance: f64, retention: Retention, sink: Arc<dyn ReportSink>) -> Self {
        let retention = match retention {
            Retention::Bounded(0) => {
                warn!("bounded retention of 0 samples, keeping 1");
                Retention::Bounded(1)
            }
            other => other,
        };
        Self {
            tolerance,
            retention,
            state: Mutex::new(SessionState {
                pending: PendingSample::new(Utc::now()),
                aggregate: ValidationAggregate::default(),
                log: VecDeque::new(),
            }),
            sink,
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn sink(&self) -> &Arc<dyn ReportSink> {
        &self.sink
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // Every critical section leaves the state consistent, so a panic
        // elsewhere never invalidates it.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply one parameter update; returns `true` if it completed a sample.
    pub fn apply(&self, param: Param, value: f64) -> bool {
        self.apply_at(param, value, Utc::now())
    }

    pub fn apply_at(&self, param: Param, value: f64, now: DateTime<Utc>) -> bool {
        let mismatch = {
            let mut state = self.lock();
            state.pending.set(param.slot(), value, now);

            let Some(sample) = state.pending.take_complete() else {
                return false;
            };
            trace!(left_x = sample.left_x, right_x = sample.right_x, "committing sample");

            let mismatch = state.aggregate.commit(&sample, self.tolerance);
            if let Retention::Bounded(cap) = self.retention {
                while !state.log.is_empty() && state.log.len() >= cap {
                    state.log.pop_front();
                }
            }
            state.log.push_back(sample);
            mismatch
        };

        if let Some(event) = mismatch {
            self.sink.mismatch(&event);
        }
        true
    }

    pub fn counters(&self) -> Counters {
        let state = self.lock();
        Counters {
            total: state.aggregate.total,
            match_ratio: state.aggregate.match_ratio(),
            max_difference: state.aggregate.max_difference,
        }
    }

    pub fn aggregate(&self) -> ValidationAggregate {
        self.lock().aggregate.clone()
    }

    /// Copy of the retained sample log, oldest first.
    pub fn samples(&self) -> Vec<Sample> {
        self.lock().log.iter().cloned().collect()
    }

    pub fn final_report(&self) -> FinalReport {
        self.lock().aggregate.final_report(self.tolerance)
    }
}
