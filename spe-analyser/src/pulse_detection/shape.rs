use super::{AcceptedPeaks, PeakWindow, Real};
use pmt_gain_common::{SampleRate, Time};
use serde::Serialize;

/// Running sum of the signal around accepted peaks, aligned on the peak.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ShapeSum {
    window: PeakWindow,
    sum: Vec<Real>,
    count: usize,
}

impl ShapeSum {
    pub(crate) fn new(window: PeakWindow) -> Self {
        Self {
            window,
            sum: vec![0.0; window.len()],
            count: 0,
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    pub(crate) fn sum(&self) -> &[Real] {
        &self.sum
    }

    /// Adds the window around `peak` to the sum. Returns false, leaving the sum
    /// unchanged, if the window does not fit inside `signal`.
    pub(crate) fn add_pulse(&mut self, signal: &[Real], peak: usize) -> bool {
        let Some(samples) = self
            .window
            .range(peak, signal.len())
            .and_then(|range| signal.get(range))
        else {
            return false;
        };
        for (bin, sample) in self.sum.iter_mut().zip(samples) {
            *bin += sample;
        }
        self.count += 1;
        true
    }

    /// Adds every peak that fits in the waveform and, if `proximity` is set,
    /// has no other peak less than `proximity` µs before it.
    pub(crate) fn add_waveform(
        &mut self,
        signal: &[Real],
        peaks: &AcceptedPeaks,
        sample_rate: SampleRate,
        proximity: Option<Time>,
    ) {
        for peak in peaks.within_bounds(self.window, signal.len()) {
            let vetoed = proximity
                .is_some_and(|proximity| peaks.has_close_predecessor(peak, sample_rate, proximity));
            if !vetoed {
                self.add_pulse(signal, peak.index);
            }
        }
    }

    /// Merges another sum over the same window into this one.
    pub(crate) fn merge(&mut self, other: &ShapeSum) {
        for (bin, value) in self.sum.iter_mut().zip(other.sum()) {
            *bin += value;
        }
        self.count += other.count;
    }

    /// Normalises the sum by the number of contributing pulses.
    /// A sum with no pulses is returned as all zeros.
    pub(crate) fn finalize(self) -> AverageShape {
        let bins = if self.count == 0 {
            self.sum
        } else {
            let count = self.count as Real;
            self.sum.into_iter().map(|bin| bin / count).collect()
        };
        AverageShape {
            low_bins: self.window.low,
            high_bins: self.window.high,
            bins,
            count: self.count,
        }
    }
}

/// Average single photoelectron shape, from `low_bins` before the peak to `high_bins` after.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct AverageShape {
    pub(crate) low_bins: usize,
    pub(crate) high_bins: usize,
    pub(crate) bins: Vec<Real>,
    pub(crate) count: usize,
}
