use super::Real;
use pmt_gain_common::Intensity;
use std::ops::Range;

/// Placement of the two noise-only windows used to estimate the baseline.
/// The first window is placed relative to the index of the largest pulse,
/// the second runs from a fraction of the waveform to its end.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub(crate) struct NoiseWindows {
    pub(crate) low_factor: Real,
    pub(crate) high_factor: Real,
    pub(crate) window2_low_factor: Real,
}

impl NoiseWindows {
    /// Returns the two index ranges, clipped to the waveform.
    /// The first range is `[low_factor * extreme, high_factor * extreme]` inclusive,
    /// the second is `[window2_low_factor * len, len)`.
    pub(crate) fn ranges(&self, extreme_index: usize, len: usize) -> [Range<usize>; 2] {
        let scale = |factor: Real, index: usize| (factor * index as Real).floor() as usize;
        let first_start = scale(self.low_factor, extreme_index).min(len);
        let first_end = (scale(self.high_factor, extreme_index) + 1).clamp(first_start, len);
        let second_start = scale(self.window2_low_factor, len).min(len);
        [first_start..first_end, second_start..len]
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub(crate) struct NoiseStatistics {
    pub(crate) mean: Real,
    pub(crate) stdev: Real,
}

impl NoiseStatistics {
    /// The detection threshold, `multiplier` standard deviations above the baseline.
    pub(crate) fn threshold(&self, multiplier: Real) -> Real {
        self.stdev * multiplier
    }
}

/// Index of the most negative sample, i.e. the largest pulse in the digitiser's polarity.
/// Ties resolve to the first occurrence.
pub(crate) fn extreme_index(samples: &[Intensity]) -> Option<usize> {
    samples
        .iter()
        .enumerate()
        .fold(None, |acc: Option<(usize, Intensity)>, (i, &v)| match acc {
            Some((_, min)) if v >= min => acc,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Estimates the baseline mean and standard deviation from the two noise windows.
///
/// The caller must ensure the windows are not both empty for this waveform,
/// otherwise the statistics are not finite.
pub(crate) fn estimate_noise(samples: &[Intensity], windows: &NoiseWindows) -> NoiseStatistics {
    let ranges = windows.ranges(extreme_index(samples).unwrap_or_default(), samples.len());
    let noise_samples = || {
        ranges
            .iter()
            .flat_map(|range| samples.get(range.clone()).unwrap_or_default())
            .map(|&v| Real::from(v))
    };

    let count = noise_samples().count() as Real;
    let mean = noise_samples().sum::<Real>() / count;
    let variance = noise_samples()
        .map(|v| (mean - v) * (mean - v))
        .sum::<Real>()
        / count;

    NoiseStatistics {
        mean,
        stdev: variance.sqrt(),
    }
}

/// Refers each sample to the baseline and inverts it, so pulses are positive.
pub(crate) fn baseline_referenced(samples: &[Intensity], noise: &NoiseStatistics) -> Vec<Real> {
    samples
        .iter()
        .map(|&v| noise.mean - Real::from(v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse_detection::test_waveforms::{add_triangle, noisy_baseline};
    use assert_approx_eq::assert_approx_eq;

    const WINDOWS: NoiseWindows = NoiseWindows {
        low_factor: 0.1,
        high_factor: 0.8,
        window2_low_factor: 0.9,
    };

    #[test]
    fn extreme_is_first_minimum() {
        assert_eq!(extreme_index(&[5, 3, 1, 4, 1, 2]), Some(2));
        assert_eq!(extreme_index(&[]), None);
    }

    #[test]
    fn ranges_are_clipped() {
        let [first, second] = WINDOWS.ranges(100, 200);
        assert_eq!(first, 10..81);
        assert_eq!(second, 180..200);

        let windows = NoiseWindows {
            low_factor: 0.5,
            high_factor: 3.0,
            window2_low_factor: 1.0,
        };
        let [first, second] = windows.ranges(100, 200);
        assert_eq!(first, 50..200);
        assert_eq!(second, 200..200);
    }

    #[test]
    fn constant_waveform() {
        let samples = vec![1500; 100];
        let noise = estimate_noise(&samples, &WINDOWS);
        assert_approx_eq!(noise.mean, 1500.0);
        assert_approx_eq!(noise.stdev, 0.0);
        assert!(
            baseline_referenced(&samples, &noise)
                .iter()
                .all(|&v| v == 0.0)
        );
    }

    #[test]
    fn alternating_noise() {
        // Both windows hold equal numbers of each value
        let mut samples: Vec<Intensity> = (0..400)
            .map(|i| if i % 2 == 0 { 999 } else { 1001 })
            .collect();
        samples[202] = 500;
        let noise = estimate_noise(&samples, &WINDOWS);
        assert_approx_eq!(noise.mean, 1000.0);
        assert_approx_eq!(noise.stdev, 1.0);

        let signal = baseline_referenced(&samples, &noise);
        assert_approx_eq!(signal[202], 500.0);
        assert_approx_eq!(signal[0], 1.0);
        assert_approx_eq!(signal[1], -1.0);
    }

    #[test]
    fn pulse_outside_windows_is_ignored() {
        let mut samples = noisy_baseline(1000, 2000.0, 4.0, 7);
        let quiet = estimate_noise(&samples, &WINDOWS);
        add_triangle(&mut samples, 500, 300, 10);
        let noise = estimate_noise(&samples, &WINDOWS);
        assert!(noise.stdev >= 0.0);
        assert!((noise.mean - 2000.0).abs() < 1.0);
        assert!(noise.stdev < 2.0 * quiet.stdev.max(4.0));
    }

    #[test]
    fn stdev_is_never_negative() {
        for seed in 0..20 {
            let samples = noisy_baseline(256, 100.0, seed as Real, seed);
            assert!(estimate_noise(&samples, &WINDOWS).stdev >= 0.0);
        }
    }
}
