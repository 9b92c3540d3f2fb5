//! Integrates the signal around each peak, with bounds found by one of three
//! policies, either as-is or after subtracting a local baseline.
use super::{AcceptedPeaks, PeakWindow, Real};
use serde::Serialize;
use strum::{Display, EnumIter, IntoEnumIterator};

/// Distance, in samples, of the two points averaged to estimate the local baseline.
pub(crate) const LOCAL_BASELINE_OFFSET: usize = 50;
/// Maximum number of steps taken from the peak when searching for bounds with a local baseline.
pub(crate) const LOCAL_SEARCH_LIMIT: usize = 50;
/// The zero-mode stopping level when no local baseline is subtracted.
pub(crate) const ZERO_MODE_LEVEL: Real = 10.0;

/// How the integration bounds either side of a peak are found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum BoundaryPolicy {
    /// Walk out until the signal returns to (near) zero.
    Zero,
    /// Walk out until the signal drops to the detection threshold.
    Threshold,
    /// Fixed offsets from the peak.
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum BaselineMode {
    /// Integrate the baseline-referenced signal as-is.
    Unsubtracted,
    /// Subtract a baseline estimated either side of the peak.
    Local,
}

impl BaselineMode {
    fn zero_level(&self) -> Real {
        match self {
            BaselineMode::Unsubtracted => ZERO_MODE_LEVEL,
            BaselineMode::Local => 0.0,
        }
    }

    fn search_limit(&self) -> Option<usize> {
        match self {
            BaselineMode::Unsubtracted => None,
            BaselineMode::Local => Some(LOCAL_SEARCH_LIMIT),
        }
    }

    /// The baseline to subtract around `peak`, or `None` if it cannot be estimated.
    fn baseline(&self, signal: &[Real], peak: usize) -> Option<Real> {
        match self {
            BaselineMode::Unsubtracted => Some(0.0),
            BaselineMode::Local => {
                let before = signal.get(peak.checked_sub(LOCAL_BASELINE_OFFSET)?)?;
                let after = signal.get(peak.checked_add(LOCAL_BASELINE_OFFSET)?)?;
                Some((before + after) / 2.0)
            }
        }
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub(crate) struct IntegralSettings {
    /// The detection threshold, used by [BoundaryPolicy::Threshold].
    pub(crate) threshold: Real,
    /// Samples before the peak included by [BoundaryPolicy::Manual].
    pub(crate) manual_low: usize,
    /// Samples after the peak included by [BoundaryPolicy::Manual].
    pub(crate) manual_high: usize,
}

#[derive(Clone, Copy)]
enum Direction {
    Left,
    Right,
}

impl Direction {
    fn step(&self, peak: usize, offset: usize) -> Option<usize> {
        match self {
            Direction::Left => peak.checked_sub(offset),
            Direction::Right => peak.checked_add(offset),
        }
    }
}

/// Walks away from `peak` while the signal stays above `level`, and returns
/// the offset of the last sample above it. This is `-1` if the peak itself is
/// not above `level`. The walk also stops at the edge of the signal, and after
/// `limit` steps if one is given.
fn search_bound(
    signal: &[Real],
    peak: usize,
    direction: Direction,
    level: Real,
    baseline: Real,
    limit: Option<usize>,
) -> isize {
    let mut offset = 0;
    let mut value = signal.get(peak).map_or(Real::MIN, |v| v - baseline);
    while value > level {
        offset += 1;
        match direction
            .step(peak, offset)
            .and_then(|index| signal.get(index))
        {
            Some(sample) => value = sample - baseline,
            None => break,
        }
        if limit.is_some_and(|limit| offset == limit) {
            break;
        }
    }
    offset as isize - 1
}

/// Sums `signal - baseline` from `low` samples before the peak to `high` samples after it.
/// Negative offsets shrink the range, which may become empty.
fn sum_between(signal: &[Real], peak: usize, low: isize, high: isize, baseline: Real) -> Option<Real> {
    let start = peak as isize - low;
    let end = peak as isize + high;
    if start > end {
        return Some(0.0);
    }
    let samples = signal.get(usize::try_from(start).ok()?..=usize::try_from(end).ok()?)?;
    Some(samples.iter().map(|v| v - baseline).sum())
}

/// Integrates the pulse at `peak` using the given baseline mode and boundary policy.
/// Returns `None` if the required samples lie outside the signal.
pub(crate) fn integrate_peak(
    signal: &[Real],
    peak: usize,
    mode: BaselineMode,
    policy: BoundaryPolicy,
    settings: &IntegralSettings,
) -> Option<Real> {
    let baseline = mode.baseline(signal, peak)?;
    let (low, high) = match policy {
        BoundaryPolicy::Manual => (
            isize::try_from(settings.manual_low).ok()?,
            isize::try_from(settings.manual_high).ok()?,
        ),
        BoundaryPolicy::Zero | BoundaryPolicy::Threshold => {
            let level = match policy {
                BoundaryPolicy::Zero => mode.zero_level(),
                _ => settings.threshold,
            };
            let search = |direction| {
                search_bound(signal, peak, direction, level, baseline, mode.search_limit())
            };
            (search(Direction::Left), search(Direction::Right))
        }
    };
    sum_between(signal, peak, low, high, baseline)
}

/// One value per boundary policy.
#[derive(Default, Debug, Clone, PartialEq, Serialize)]
pub(crate) struct Integrals<T> {
    pub(crate) zero: T,
    pub(crate) threshold: T,
    pub(crate) manual: T,
}

impl<T> Integrals<T> {
    pub(crate) fn get(&self, policy: BoundaryPolicy) -> &T {
        match policy {
            BoundaryPolicy::Zero => &self.zero,
            BoundaryPolicy::Threshold => &self.threshold,
            BoundaryPolicy::Manual => &self.manual,
        }
    }

    pub(crate) fn get_mut(&mut self, policy: BoundaryPolicy) -> &mut T {
        match policy {
            BoundaryPolicy::Zero => &mut self.zero,
            BoundaryPolicy::Threshold => &mut self.threshold,
            BoundaryPolicy::Manual => &mut self.manual,
        }
    }

    pub(crate) fn map<U, F: FnMut(&T) -> U>(&self, mut f: F) -> Integrals<U> {
        Integrals {
            zero: f(&self.zero),
            threshold: f(&self.threshold),
            manual: f(&self.manual),
        }
    }
}

/// One value per baseline mode and boundary policy.
#[derive(Default, Debug, Clone, PartialEq, Serialize)]
pub(crate) struct IntegralCollections<T> {
    pub(crate) unsubtracted: Integrals<T>,
    pub(crate) local: Integrals<T>,
}

impl<T> IntegralCollections<T> {
    pub(crate) fn get(&self, mode: BaselineMode, policy: BoundaryPolicy) -> &T {
        match mode {
            BaselineMode::Unsubtracted => self.unsubtracted.get(policy),
            BaselineMode::Local => self.local.get(policy),
        }
    }

    pub(crate) fn get_mut(&mut self, mode: BaselineMode, policy: BoundaryPolicy) -> &mut T {
        match mode {
            BaselineMode::Unsubtracted => self.unsubtracted.get_mut(policy),
            BaselineMode::Local => self.local.get_mut(policy),
        }
    }

    pub(crate) fn map<U, F: FnMut(&T) -> U>(&self, mut f: F) -> IntegralCollections<U> {
        IntegralCollections {
            unsubtracted: self.unsubtracted.map(&mut f),
            local: self.local.map(&mut f),
        }
    }
}

impl IntegralCollections<Vec<Real>> {
    /// Integrates every peak whose `window` fits in the waveform, in all six ways.
    pub(crate) fn extract(
        signal: &[Real],
        peaks: &AcceptedPeaks,
        window: PeakWindow,
        settings: &IntegralSettings,
    ) -> Self {
        let mut collections = Self::default();
        for peak in peaks.within_bounds(window, signal.len()) {
            for mode in BaselineMode::iter() {
                for policy in BoundaryPolicy::iter() {
                    if let Some(integral) =
                        integrate_peak(signal, peak.index, mode, policy, settings)
                    {
                        collections.get_mut(mode, policy).push(integral);
                    }
                }
            }
        }
        collections
    }

    pub(crate) fn append(&mut self, other: &mut Self) {
        for mode in BaselineMode::iter() {
            for policy in BoundaryPolicy::iter() {
                self.get_mut(mode, policy)
                    .append(other.get_mut(mode, policy));
            }
        }
    }
}
