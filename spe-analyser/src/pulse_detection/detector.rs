use super::{EventFilter, Pulse, Real, TimeValue};
use pmt_gain_common::metrics::failures::FailureKind;
use thiserror::Error;

/// Consumes a waveform one sample at a time, emitting an event when one is found.
pub(crate) trait Detector: Clone {
    type EventPointType;

    fn signal(&mut self, index: usize, value: Real) -> Option<Self::EventPointType>;

    /// Called once the waveform is exhausted.
    fn finish(&mut self) -> Option<Self::EventPointType>;
}

/// Reasons a waveform yields no single photoelectron candidates.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub(crate) enum DetectionFailure {
    #[error("No SPEs found in this waveform")]
    NoPulsesFound,
    #[error("Threshold setting unsuccessful: {0} pulses found")]
    TooManyPulses(usize),
}

impl From<DetectionFailure> for FailureKind {
    fn from(value: DetectionFailure) -> Self {
        match value {
            DetectionFailure::NoPulsesFound => FailureKind::NoPulsesFound,
            DetectionFailure::TooManyPulses(_) => FailureKind::TooManyPulses,
        }
    }
}

#[derive(Default, Clone, Debug, PartialEq)]
enum State {
    #[default]
    Idle,
    InPulse {
        start: usize,
        peak: Option<TimeValue>,
    },
}

/// Single-level hysteresis detector: a pulse begins when the signal rises
/// above the threshold, and ends when it falls below the same threshold.
#[derive(Default, Clone, Debug)]
pub(crate) struct PulseDetector {
    threshold: Real,
    state: State,
}

impl PulseDetector {
    pub(crate) fn new(threshold: Real) -> Self {
        Self {
            threshold,
            state: State::Idle,
        }
    }
}

impl Detector for PulseDetector {
    type EventPointType = Pulse;

    fn signal(&mut self, index: usize, value: Real) -> Option<Pulse> {
        let (state, pulse) = match std::mem::take(&mut self.state) {
            State::Idle if value > self.threshold => (
                State::InPulse {
                    start: index.saturating_sub(1),
                    peak: None,
                },
                None,
            ),
            State::Idle => (State::Idle, None),
            State::InPulse { start, peak } if value < self.threshold => {
                let pulse = peak
                    .map(|peak| Pulse {
                        start,
                        end: index,
                        peak,
                    })
                    .filter(Pulse::is_wide_enough);
                (State::Idle, pulse)
            }
            State::InPulse { start, peak } => {
                let peak = match peak {
                    Some(peak) if value <= peak.value => peak,
                    _ => TimeValue { index, value },
                };
                (
                    State::InPulse {
                        start,
                        peak: Some(peak),
                    },
                    None,
                )
            }
        };
        self.state = state;
        pulse
    }

    fn finish(&mut self) -> Option<Pulse> {
        // A pulse unterminated at the end of the readout is discarded.
        self.state = State::Idle;
        None
    }
}

/// Scanning stops and the waveform is rejected once this many pulses are found.
pub(crate) const MAX_PULSES_PER_WAVEFORM: usize = 200;

/// Finds all pulses in `signal`, scanning from `region_start`.
#[tracing::instrument(skip_all, level = "trace", fields(num_pulses))]
pub(crate) fn find_pulses(
    signal: &[Real],
    threshold: Real,
    region_start: usize,
) -> Result<Vec<Pulse>, DetectionFailure> {
    let mut pulses = Vec::new();
    let events = signal
        .iter()
        .copied()
        .enumerate()
        .skip(region_start)
        .events(PulseDetector::new(threshold));
    for pulse in events {
        pulses.push(pulse);
        if pulses.len() == MAX_PULSES_PER_WAVEFORM {
            return Err(DetectionFailure::TooManyPulses(pulses.len()));
        }
    }
    tracing::Span::current().record("num_pulses", pulses.len());
    Ok(pulses)
}
