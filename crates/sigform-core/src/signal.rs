//! One-dimensional sampled signals.
//!
//! A [`Signal`] pairs amplitude samples with monotonic integer tick
//! indices and a sampling frequency. Time of sample `i` is
//! `ticks[i] / frequency`, so fragments that keep their absolute tick
//! numbers stay on the same time axis as the signal they were cut from.

use serde::{Deserialize, Serialize};

/// Errors raised when constructing or slicing a signal.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SignalError {
    #[error("ticks and samples differ in length ({ticks} vs {samples})")]
    LengthMismatch { ticks: usize, samples: usize },

    #[error("ticks must be strictly increasing (index {index})")]
    NonMonotonicTicks { index: usize },

    #[error("sampling frequency must be positive")]
    ZeroFrequency,

    #[error("fragment [{start}, {end}] is outside the signal domain [{domain_start}, {domain_end}]")]
    OutOfDomain {
        start: f64,
        end: f64,
        domain_start: f64,
        domain_end: f64,
    },

    #[error("fragment start {start} is after end {end}")]
    InvertedRange { start: f64, end: f64 },
}

/// An immutable sampled signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    ticks: Vec<i64>,
    samples: Vec<f64>,
    frequency: u32,
}

impl Signal {
    /// Builds a signal from explicit ticks and samples.
    ///
    /// Ticks must be strictly increasing and match the samples in length.
    pub fn new(ticks: Vec<i64>, samples: Vec<f64>, frequency: u32) -> Result<Self, SignalError> {
        if frequency == 0 {
            return Err(SignalError::ZeroFrequency);
        }
        if ticks.len() != samples.len() {
            return Err(SignalError::LengthMismatch {
                ticks: ticks.len(),
                samples: samples.len(),
            });
        }
        for i in 1..ticks.len() {
            if ticks[i] <= ticks[i - 1] {
                return Err(SignalError::NonMonotonicTicks { index: i });
            }
        }
        Ok(Self {
            ticks,
            samples,
            frequency,
        })
    }

    /// Builds a signal with ticks `0..n`.
    pub fn from_samples(samples: Vec<f64>, frequency: u32) -> Result<Self, SignalError> {
        let ticks = (0..samples.len() as i64).collect();
        Self::new(ticks, samples, frequency)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn ticks(&self) -> &[i64] {
        &self.ticks
    }

    /// Time of sample `i` in seconds.
    pub fn time_at(&self, i: usize) -> f64 {
        self.ticks[i] as f64 / self.frequency as f64
    }

    /// Time of the first sample, or 0.0 for an empty signal.
    pub fn start_time(&self) -> f64 {
        if self.is_empty() { 0.0 } else { self.time_at(0) }
    }

    /// Time of the last sample, or 0.0 for an empty signal.
    pub fn end_time(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.time_at(self.len() - 1)
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time() - self.start_time()
    }

    /// Extracts the fragment whose sample times fall inside `[start, end]`.
    ///
    /// Absolute tick numbers and the sampling frequency are preserved, so
    /// time coordinates computed on the fragment remain valid on the
    /// original signal. Bounds outside the signal's domain are rejected;
    /// a range that contains no sample yields an empty fragment.
    pub fn fragment(&self, start: f64, end: f64) -> Result<Signal, SignalError> {
        if start > end {
            return Err(SignalError::InvertedRange { start, end });
        }
        if start < self.start_time() || end > self.end_time() {
            return Err(SignalError::OutOfDomain {
                start,
                end,
                domain_start: self.start_time(),
                domain_end: self.end_time(),
            });
        }
        let mut ticks = Vec::new();
        let mut samples = Vec::new();
        for i in 0..self.len() {
            let t = self.time_at(i);
            if t >= start && t <= end {
                ticks.push(self.ticks[i]);
                samples.push(self.samples[i]);
            }
        }
        Ok(Signal {
            ticks,
            samples,
            frequency: self.frequency,
        })
    }

    /// Rebuilds the signal with new samples on the same tick axis.
    ///
    /// This is the only way a signal modifier can produce its output, so
    /// length preservation is checked here.
    pub fn with_samples(&self, samples: Vec<f64>) -> Result<Signal, SignalError> {
        if samples.len() != self.len() {
            return Err(SignalError::LengthMismatch {
                ticks: self.len(),
                samples: samples.len(),
            });
        }
        Ok(Signal {
            ticks: self.ticks.clone(),
            samples,
            frequency: self.frequency,
        })
    }
}
