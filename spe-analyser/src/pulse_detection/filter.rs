use super::{DetectionFailure, Pulse, Real, TimeValue};
use pmt_gain_common::{SampleRate, Time};
use std::ops::RangeInclusive;

/// A fixed window of samples around a peak, `low` samples before and `high` after.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PeakWindow {
    pub(crate) low: usize,
    pub(crate) high: usize,
}

impl PeakWindow {
    pub(crate) fn new(low: usize, high: usize) -> Self {
        Self { low, high }
    }

    /// Number of samples in the window, including the peak.
    pub(crate) fn len(&self) -> usize {
        self.low + self.high + 1
    }

    /// The window's sample indices around `peak`, or `None` if any would fall outside
    /// a waveform of `length` samples.
    pub(crate) fn range(&self, peak: usize, length: usize) -> Option<RangeInclusive<usize>> {
        let start = peak.checked_sub(self.low)?;
        let end = peak.checked_add(self.high)?;
        (end < length).then_some(start..=end)
    }

    pub(crate) fn contains(&self, peak: usize, length: usize) -> bool {
        self.range(peak, length).is_some()
    }
}

/// Peaks of the pulses accepted for one waveform, in increasing index order.
/// Never empty.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AcceptedPeaks(Vec<TimeValue>);

impl AcceptedPeaks {
    pub(crate) fn from_pulses(pulses: &[Pulse]) -> Result<Self, DetectionFailure> {
        if pulses.is_empty() {
            return Err(DetectionFailure::NoPulsesFound);
        }
        Ok(Self(pulses.iter().map(|pulse| pulse.peak).collect()))
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &TimeValue> {
        self.0.iter()
    }

    /// Peaks whose `window` lies wholly inside a waveform of `length` samples.
    pub(crate) fn within_bounds(
        &self,
        window: PeakWindow,
        length: usize,
    ) -> impl Iterator<Item = &TimeValue> {
        self.iter()
            .filter(move |peak| window.contains(peak.index, length))
    }

    /// True if another peak precedes `peak` by less than `proximity` µs.
    pub(crate) fn has_close_predecessor(
        &self,
        peak: &TimeValue,
        sample_rate: SampleRate,
        proximity: Time,
    ) -> bool {
        self.iter().any(|other| {
            let separation = (peak.index as Real - other.index as Real) / sample_rate;
            separation > 0.0 && separation < proximity
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(index: usize) -> TimeValue {
        TimeValue {
            index,
            value: 10.0,
        }
    }

    fn peaks(indices: &[usize]) -> AcceptedPeaks {
        let pulses: Vec<Pulse> = indices
            .iter()
            .map(|&index| Pulse {
                start: index.saturating_sub(2),
                end: index + 2,
                peak: peak(index),
            })
            .collect();
        AcceptedPeaks::from_pulses(&pulses).expect("non-empty")
    }

    #[test]
    fn empty_list_is_a_failure() {
        assert_eq!(
            AcceptedPeaks::from_pulses(&[]),
            Err(DetectionFailure::NoPulsesFound)
        );
    }

    #[test]
    fn window_bounds() {
        let window = PeakWindow::new(5, 10);
        assert_eq!(window.len(), 16);
        assert_eq!(window.range(4, 100), None);
        assert_eq!(window.range(5, 100), Some(0..=15));
        assert_eq!(window.range(89, 100), Some(84..=99));
        assert_eq!(window.range(90, 100), None);
    }

    #[test]
    fn boundary_check_filters_edges() {
        let accepted = peaks(&[2, 50, 97]);
        let kept: Vec<usize> = accepted
            .within_bounds(PeakWindow::new(5, 5), 100)
            .map(|peak| peak.index)
            .collect();
        assert_eq!(kept, vec![50]);
    }

    #[test]
    fn proximity_veto_excludes_the_later_peak() {
        // At 500 MHz, 0.1 µs is 50 samples.
        let accepted = peaks(&[100, 130, 300]);
        assert!(!accepted.has_close_predecessor(&peak(100), 500.0, 0.1));
        assert!(accepted.has_close_predecessor(&peak(130), 500.0, 0.1));
        assert!(!accepted.has_close_predecessor(&peak(300), 500.0, 0.1));
    }

    #[test]
    fn proximity_window_is_exclusive() {
        let accepted = peaks(&[100, 150]);
        assert!(!accepted.has_close_predecessor(&peak(150), 500.0, 0.1));
        assert!(accepted.has_close_predecessor(&peak(150), 500.0, 0.1001));
    }
}
