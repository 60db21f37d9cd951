use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::sample::Sample;

/// Match ratio at or above which the run is judged consistent.
pub const CONSISTENT_RATIO: f64 = 0.99;
/// Match ratio at or above which the run is judged mostly consistent.
pub const MOSTLY_CONSISTENT_RATIO: f64 = 0.95;

/// Running totals over every committed sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationAggregate {
    pub total: u64,
    pub matching: u64,
    pub non_matching: u64,
    pub max_difference: f64,
    pub differences: Vec<f64>,
}

/// Raised for each committed sample whose paired fields differ by more than the tolerance.
#[derive(Clone, Debug, PartialEq)]
pub struct MismatchEvent {
    pub timestamp: DateTime<Utc>,
    pub left_x: f64,
    pub right_x: f64,
    pub difference: f64,
}

impl fmt::Display for MismatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let local: DateTime<Local> = self.timestamp.into();
        write!(
            f,
            "[{}] left/right X mismatch! left: {:.6}, right: {:.6}, difference: {:.6}",
            local.format("%H:%M:%S%.3f"),
            self.left_x,
            self.right_x,
            self.difference
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Consistent,
    MostlyConsistent,
    SignificantDivergence,
}

impl Verdict {
    pub fn classify(match_ratio: f64) -> Self {
        if match_ratio >= CONSISTENT_RATIO {
            Verdict::Consistent
        } else if match_ratio >= MOSTLY_CONSISTENT_RATIO {
            Verdict::MostlyConsistent
        } else {
            Verdict::SignificantDivergence
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Verdict::Consistent => "consistent: left and right X values agree",
            Verdict::MostlyConsistent => {
                "mostly consistent: occasional differences (e.g. around blinks)"
            }
            Verdict::SignificantDivergence => "significant divergence between left and right X",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub total: u64,
    pub matching: u64,
    pub non_matching: u64,
    pub match_percentage: f64,
    pub max_difference: f64,
    pub mean_difference: Option<f64>,
    pub median_difference: Option<f64>,
    pub verdict: Verdict,
    pub tolerance: f64,
}

/// Produced once at shutdown, even if nothing arrived.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FinalReport {
    NoSamples { tolerance: f64 },
    Collected(Summary),
}

impl ValidationAggregate {
    /// Fold one committed sample into the totals.
    ///
    /// `tolerance` is inclusive: a difference equal to it still matches.
    pub fn commit(&mut self, sample: &Sample, tolerance: f64) -> Option<MismatchEvent> {
        let difference = sample.difference();
        self.differences.push(difference);
        self.total += 1;
        self.max_difference = self.max_difference.max(difference);

        if difference <= tolerance {
            self.matching += 1;
            None
        } else {
            self.non_matching += 1;
            Some(MismatchEvent {
                timestamp: sample.timestamp,
                left_x: sample.left_x,
                right_x: sample.right_x,
                difference,
            })
        }
    }

    /// `matching / total`, or 0 before the first sample.
    pub fn match_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.matching as f64 / self.total as f64
        }
    }

    pub fn mean_difference(&self) -> Option<f64> {
        if self.differences.is_empty() {
            return None;
        }
        Some(self.differences.iter().sum::<f64>() / self.differences.len() as f64)
    }

    pub fn median_difference(&self) -> Option<f64> {
        if self.differences.is_empty() {
            return None;
        }
        let mut sorted = self.differences.clone();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }

    pub fn final_report(&self, tolerance: f64) -> FinalReport {
        if self.total == 0 {
            return FinalReport::NoSamples { tolerance };
        }
        let ratio = self.match_ratio();
        FinalReport::Collected(Summary {
            total: self.total,
            matching: self.matching,
            non_matching: self.non_matching,
            match_percentage: ratio * 100.0,
            max_difference: self.max_difference,
            mean_difference: self.mean_difference(),
            median_difference: self.median_difference(),
            verdict: Verdict::classify(ratio),
            tolerance,
        })
    }
}

impl fmt::Display for FinalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(f, "Final validation report")?;
        writeln!(f, "{}", "=".repeat(60))?;

        let s = match self {
            FinalReport::NoSamples { tolerance } => {
                writeln!(f, "No samples collected.")?;
                writeln!(f, "Possible causes:")?;
                writeln!(f, "  - the tracker is not running")?;
                writeln!(f, "  - the sender's OSC port does not match")?;
                writeln!(f, "  - a firewall is dropping UDP traffic")?;
                return write!(f, "Tolerance: {}", tolerance);
            }
            FinalReport::Collected(s) => s,
        };

        writeln!(f, "Total samples:     {}", s.total)?;
        writeln!(f, "Matching:          {}", s.matching)?;
        writeln!(f, "Non-matching:      {}", s.non_matching)?;
        writeln!(f, "Match rate:        {:.2}%", s.match_percentage)?;
        writeln!(f, "Max difference:    {:.6}", s.max_difference)?;
        if let Some(mean) = s.mean_difference {
            writeln!(f, "Mean difference:   {:.6}", mean)?;
        }
        if let Some(median) = s.median_difference {
            writeln!(f, "Median difference: {:.6}", median)?;
        }
        writeln!(f)?;
        writeln!(f, "Verdict: {}", s.verdict.describe())?;
        write!(f, "Tolerance: {}", s.tolerance)
    }
}
