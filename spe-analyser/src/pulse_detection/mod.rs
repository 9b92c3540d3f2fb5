//! This module provides tools for extracting single photoelectron features
//! from a raw photomultiplier waveform.
//!
//! A waveform is first referred to its noise baseline and inverted, so that
//! pulses appear as positive excursions. Typical usage may look like:
//! ```rust
//! let noise = estimate_noise(samples, &windows);
//! let signal = baseline_referenced(samples, &noise);
//! let pulses = signal.iter()
//!     .copied()
//!     .enumerate()
//!     .skip(region_start)
//!     .events(PulseDetector::new(noise.threshold(multiplier)));
//! ```

pub(crate) mod amplitude;
pub(crate) mod detector;
pub(crate) mod filter;
pub(crate) mod integral;
pub(crate) mod iterators;
pub(crate) mod noise;
pub(crate) mod pulse;
pub(crate) mod shape;

pub(crate) use amplitude::extract_amplitudes;
pub(crate) use detector::{Detector, DetectionFailure, find_pulses};
pub(crate) use filter::{AcceptedPeaks, PeakWindow};
pub(crate) use integral::{BaselineMode, BoundaryPolicy, IntegralCollections, IntegralSettings};
pub(crate) use iterators::{EventFilter, SavablePoint, SaveToFileFilter};
pub(crate) use noise::{NoiseWindows, baseline_referenced, estimate_noise};
pub(crate) use pulse::{Pulse, TimeValue};
pub(crate) use shape::{AverageShape, ShapeSum};

pub(crate) type Real = f64;

#[cfg(test)]
pub(crate) mod test_waveforms {
    //! Synthetic waveforms shared by the tests of this module and its callers.
    use super::Real;
    use pmt_gain_common::Intensity;
    use rand::{SeedableRng, rngs::StdRng};
    use rand_distr::{Distribution, Normal};

    /// A flat waveform at `baseline` with Gaussian noise of the given width.
    pub(crate) fn noisy_baseline(len: usize, baseline: Real, sd: Real, seed: u64) -> Vec<Intensity> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(baseline, sd).expect("valid normal distribution");
        (0..len)
            .map(|_| normal.sample(&mut rng).round() as Intensity)
            .collect()
    }

    /// Subtracts a triangular pulse of the given height and half-width, peaking at `peak`.
    /// Pulses are negative-going in raw units, as on the digitiser.
    pub(crate) fn add_triangle(samples: &mut [Intensity], peak: usize, height: Intensity, half_width: usize) {
        let step = height / half_width as Intensity;
        for offset in 0..half_width {
            let value = height - step * offset as Intensity;
            samples[peak - offset] -= value;
            if offset > 0 {
                samples[peak + offset] -= value;
            }
        }
    }
}
