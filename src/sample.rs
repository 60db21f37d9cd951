use chrono::{DateTime, Utc};

use crate::param::{AuxField, Slot};

/// The in-progress sample being filled by incoming updates.
#[derive(Clone, Debug)]
pub struct PendingSample {
    pub timestamp: DateTime<Utc>,
    pub left_x: Option<f64>,
    pub right_x: Option<f64>,
    /// Sticky: survives commits until overwritten.
    pub aux: [Option<f64>; AuxField::COUNT],
}

/// A committed, immutable snapshot of a [`PendingSample`].
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub left_x: f64,
    pub right_x: f64,
    pub aux: [Option<f64>; AuxField::COUNT],
}

impl PendingSample {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            timestamp: now,
            left_x: None,
            right_x: None,
            aux: [None; AuxField::COUNT],
        }
    }

    /// Write `value` into `slot`. Paired writes also refresh the timestamp.
    pub fn set(&mut self, slot: Slot, value: f64, now: DateTime<Utc>) {
        match slot {
            Slot::PairedA => {
                self.left_x = Some(value);
                self.timestamp = now;
            }
            Slot::PairedB => {
                self.right_x = Some(value);
                self.timestamp = now;
            }
            Slot::Aux(field) => self.aux[field as usize] = Some(value),
        }
    }

    /// If both paired fields are present, snapshot and clear them.
    pub fn take_complete(&mut self) -> Option<Sample> {
        let (left_x, right_x) = (self.left_x?, self.right_x?);
        self.left_x = None;
        self.right_x = None;
        Some(Sample {
            timestamp: self.timestamp,
            left_x,
            right_x,
            aux: self.aux,
        })
    }
}

impl Sample {
    pub fn difference(&self) -> f64 {
        (self.left_x - self.right_x).abs()
    }

    pub fn aux(&self, field: AuxField) -> Option<f64> {
        self.aux[field as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_sample_does_not_commit() {
        let now = Utc::now();
        let mut pending = PendingSample::new(now);
        pending.set(Slot::PairedA, 0.1, now);
        pending.set(Slot::Aux(AuxField::LeftLid), 0.9, now);
        assert!(pending.take_complete().is_none());
        assert_eq!(pending.left_x, Some(0.1));
    }

    #[test]
    fn test_commit_clears_only_paired_fields() {
        let now = Utc::now();
        let mut pending = PendingSample::new(now);
        pending.set(Slot::Aux(AuxField::PupilDilation), 0.3, now);
        pending.set(Slot::PairedB, 0.2, now);
        pending.set(Slot::PairedA, 0.25, now);

        let sample = pending.take_complete().unwrap();
        assert_eq!((sample.left_x, sample.right_x), (0.25, 0.2));
        assert_eq!(sample.aux(AuxField::PupilDilation), Some(0.3));
        assert!((sample.difference() - 0.05).abs() < 1e-12);

        assert_eq!((pending.left_x, pending.right_x), (None, None));
        assert_eq!(pending.aux[AuxField::PupilDilation as usize], Some(0.3));
    }
}
