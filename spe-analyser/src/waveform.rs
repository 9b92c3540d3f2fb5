use crate::pulse_detection::Real;
use pmt_gain_common::{Channel, Intensity, SampleRate, Time};

/// One channel's readout for one event, borrowed from the loaded event.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Waveform<'a> {
    pub(crate) channel: Channel,
    pub(crate) samples: &'a [Intensity],
    /// Time of the first sample, in µs.
    pub(crate) start_time: Time,
    pub(crate) sample_rate: SampleRate,
}

impl Waveform<'_> {
    /// Time of the sample at `index`, in µs.
    pub(crate) fn time_of(&self, index: usize) -> Time {
        self.start_time + index as Real / self.sample_rate
    }
}
