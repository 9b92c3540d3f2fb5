use crate::pulse_detection::Real;
use serde::Serialize;

/// Uniform binning of `bins` bins over `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct HistogramBinning {
    pub(crate) bins: usize,
    pub(crate) min: Real,
    pub(crate) max: Real,
}

impl HistogramBinning {
    pub(crate) fn width(&self) -> Real {
        (self.max - self.min) / self.bins as Real
    }

    /// The bin holding `value`, or `Err` with whether it fell below the range.
    fn bin_of(&self, value: Real) -> Result<usize, bool> {
        if value < self.min {
            Err(true)
        } else if value >= self.max {
            Err(false)
        } else {
            Ok((((value - self.min) / self.width()) as usize).min(self.bins.saturating_sub(1)))
        }
    }

    pub(crate) fn centre(&self, bin: usize) -> Real {
        self.min + (bin as Real + 0.5) * self.width()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Histogram {
    pub(crate) binning: HistogramBinning,
    pub(crate) counts: Vec<u64>,
    pub(crate) underflow: u64,
    pub(crate) overflow: u64,
}

impl Histogram {
    pub(crate) fn new(binning: HistogramBinning) -> Self {
        Self {
            binning,
            counts: vec![0; binning.bins],
            underflow: 0,
            overflow: 0,
        }
    }

    pub(crate) fn from_values<'a, I: IntoIterator<Item = &'a Real>>(
        binning: HistogramBinning,
        values: I,
    ) -> Self {
        let mut histogram = Self::new(binning);
        for &value in values {
            histogram.fill(value);
        }
        histogram
    }

    pub(crate) fn fill(&mut self, value: Real) {
        match self.binning.bin_of(value) {
            Ok(bin) => {
                if let Some(count) = self.counts.get_mut(bin) {
                    *count += 1;
                }
            }
            Err(true) => self.underflow += 1,
            Err(false) => self.overflow += 1,
        }
    }

    /// Number of in-range entries.
    pub(crate) fn entries(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Mean of the in-range entries, taking each at its bin centre.
    pub(crate) fn mean(&self) -> Option<Real> {
        let entries = self.entries();
        (entries > 0).then(|| {
            self.counts
                .iter()
                .enumerate()
                .map(|(bin, &count)| self.binning.centre(bin) * count as Real)
                .sum::<Real>()
                / entries as Real
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    const BINNING: HistogramBinning = HistogramBinning {
        bins: 50,
        min: 0.0,
        max: 200.0,
    };

    #[test]
    fn fill_and_flows() {
        let histogram = Histogram::from_values(BINNING, &[-1.0, 0.0, 3.9, 4.0, 199.9, 200.0, 500.0]);
        assert_eq!(histogram.underflow, 1);
        assert_eq!(histogram.overflow, 2);
        assert_eq!(histogram.entries(), 4);
        assert_eq!(histogram.counts[0], 2);
        assert_eq!(histogram.counts[1], 1);
        assert_eq!(histogram.counts[49], 1);
    }

    #[test]
    fn mean_uses_bin_centres() {
        let histogram = Histogram::from_values(BINNING, &[1.0, 5.0, 300.0]);
        assert_approx_eq!(histogram.mean().expect("entries"), 4.0);
        assert_eq!(Histogram::new(BINNING).mean(), None);
    }
}
