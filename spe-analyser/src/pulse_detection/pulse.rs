use super::Real;
use std::fmt::Display;

/// A sample index paired with its baseline-referenced value.
#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub(crate) struct TimeValue {
    pub(crate) index: usize,
    pub(crate) value: Real,
}

impl Display for TimeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{0},{1}", self.index, self.value))
    }
}

/// A contiguous excursion above the detection threshold.
#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub(crate) struct Pulse {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) peak: TimeValue,
}

impl Pulse {
    /// Pulses no wider than this are treated as noise.
    pub(crate) const MIN_WIDTH: usize = 2;

    pub(crate) fn width(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub(crate) fn is_wide_enough(&self) -> bool {
        self.width() > Self::MIN_WIDTH
    }
}

impl Display for Pulse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{0},{1},{2}", self.start, self.end, self.peak))
    }
}
