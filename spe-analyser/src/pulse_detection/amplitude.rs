use super::{AcceptedPeaks, PeakWindow, Real};

/// The signal value at each peak whose `window` fits inside the waveform.
pub(crate) fn extract_amplitudes(
    signal: &[Real],
    peaks: &AcceptedPeaks,
    window: PeakWindow,
) -> Vec<Real> {
    peaks
        .within_bounds(window, signal.len())
        .filter_map(|peak| signal.get(peak.index).copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse_detection::{Pulse, TimeValue};

    #[test]
    fn amplitudes_at_peaks() {
        let signal: Vec<Real> = (0..50).map(|i| (i * 2) as Real).collect();
        let pulses: Vec<Pulse> = [1, 20, 30, 48]
            .into_iter()
            .map(|index| Pulse {
                start: index - 1,
                end: index + 2,
                peak: TimeValue {
                    index,
                    value: signal[index],
                },
            })
            .collect();
        let peaks = AcceptedPeaks::from_pulses(&pulses).expect("non-empty");
        assert_eq!(
            extract_amplitudes(&signal, &peaks, PeakWindow::new(3, 3)),
            vec![40.0, 60.0]
        );
    }
}
