//! Per-channel accumulators, filled across a run and finalised once at its end.
use crate::{
    histogram::{Histogram, HistogramBinning},
    processing::WaveformFeatures,
    pulse_detection::{
        AverageShape, BaselineMode, BoundaryPolicy, IntegralCollections, PeakWindow, Real,
        ShapeSum,
    },
};
use pmt_gain_common::{Channel, SlotIndex};
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::{debug, warn};

/// Everything accumulated for one tracked channel.
#[derive(Debug, Clone)]
pub(crate) struct CalibrationSlot {
    channel: Channel,
    /// `None` when the average shape is not extracted.
    shape: Option<ShapeSum>,
    amplitudes: Vec<Real>,
    integrals: IntegralCollections<Vec<Real>>,
    waveforms: usize,
    spes: usize,
}

impl CalibrationSlot {
    pub(crate) fn new(channel: Channel, shape_window: Option<PeakWindow>) -> Self {
        Self {
            channel,
            shape: shape_window.map(ShapeSum::new),
            amplitudes: Vec::new(),
            integrals: Default::default(),
            waveforms: 0,
            spes: 0,
        }
    }

    /// Adds the features of one successfully analysed waveform.
    pub(crate) fn add(&mut self, mut features: WaveformFeatures) {
        if let (Some(sum), Some(shape)) = (&mut self.shape, &features.shape) {
            sum.merge(shape);
        }
        self.amplitudes.append(&mut features.amplitudes);
        self.integrals.append(&mut features.integrals);
        self.waveforms += 1;
        self.spes += features.num_spes;
    }

    pub(crate) fn finalize(
        self,
        amplitude_binning: HistogramBinning,
        integral_binning: HistogramBinning,
    ) -> SlotResult {
        if self.shape.as_ref().is_some_and(|shape| shape.count() == 0) {
            warn!(
                channel = self.channel,
                waveforms = self.waveforms,
                spes = self.spes,
                "No pulses contributed to the average shape"
            );
        }
        let amplitude_histogram = Histogram::from_values(amplitude_binning, &self.amplitudes);
        let integral_histograms = self
            .integrals
            .map(|values| Histogram::from_values(integral_binning, values));
        for mode in BaselineMode::iter() {
            for policy in BoundaryPolicy::iter() {
                let histogram = integral_histograms.get(mode, policy);
                debug!(
                    channel = self.channel,
                    %mode,
                    %policy,
                    entries = histogram.entries(),
                    underflow = histogram.underflow,
                    overflow = histogram.overflow,
                    "Integral histogram"
                );
            }
        }
        SlotResult {
            channel: self.channel,
            waveforms: self.waveforms,
            spes: self.spes,
            shape: self.shape.map(ShapeSum::finalize),
            amplitude_mean: amplitude_histogram.mean(),
            integral_means: integral_histograms.map(Histogram::mean),
            amplitudes: self.amplitudes,
            integrals: self.integrals,
            amplitude_histogram,
            integral_histograms,
        }
    }
}

/// The finalised features of one tracked channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct SlotResult {
    pub(crate) channel: Channel,
    /// Number of waveforms that contributed.
    pub(crate) waveforms: usize,
    /// Number of SPE candidates found on the channel, whichever features were extracted.
    pub(crate) spes: usize,
    pub(crate) shape: Option<AverageShape>,
    pub(crate) amplitudes: Vec<Real>,
    pub(crate) integrals: IntegralCollections<Vec<Real>>,
    pub(crate) amplitude_histogram: Histogram,
    pub(crate) integral_histograms: IntegralCollections<Histogram>,
    pub(crate) amplitude_mean: Option<Real>,
    pub(crate) integral_means: IntegralCollections<Option<Real>>,
}

/// One slot per tracked channel, indexed by [SlotIndex].
#[derive(Debug, Clone, Default)]
pub(crate) struct CalibrationSlots(Vec<CalibrationSlot>);

impl CalibrationSlots {
    pub(crate) fn new(channels: &[Channel], shape_window: Option<PeakWindow>) -> Self {
        Self(
            channels
                .iter()
                .map(|&channel| CalibrationSlot::new(channel, shape_window))
                .collect(),
        )
    }

    pub(crate) fn get_mut(&mut self, slot: SlotIndex) -> Option<&mut CalibrationSlot> {
        self.0.get_mut(slot)
    }

    /// Finalises every slot. Consumes the slots, so this happens once per run.
    pub(crate) fn finalize(
        self,
        amplitude_binning: HistogramBinning,
        integral_binning: HistogramBinning,
    ) -> Vec<SlotResult> {
        self.0
            .into_iter()
            .map(|slot| slot.finalize(amplitude_binning, integral_binning))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    const BINNING: HistogramBinning = HistogramBinning {
        bins: 10,
        min: 0.0,
        max: 100.0,
    };

    fn features(peak_value: Real) -> WaveformFeatures {
        let signal: Vec<Real> = (0..20)
            .map(|i| if i == 10 { peak_value } else { 1.0 })
            .collect();
        let mut shape = ShapeSum::new(PeakWindow::new(1, 1));
        shape.add_pulse(&signal, 10);
        let mut integrals = IntegralCollections::<Vec<Real>>::default();
        integrals.unsubtracted.zero.push(peak_value * 2.0);
        WaveformFeatures {
            shape: Some(shape),
            amplitudes: vec![peak_value],
            integrals,
            num_spes: 1,
        }
    }

    #[test]
    fn slots_accumulate_and_finalise() {
        let mut slots = CalibrationSlots::new(&[6, 10], Some(PeakWindow::new(1, 1)));
        let slot = slots.get_mut(1).expect("slot");
        slot.add(features(20.0));
        slot.add(features(40.0));

        let results = slots.finalize(BINNING, BINNING);
        assert_eq!(results.len(), 2);

        let empty = &results[0];
        assert_eq!(empty.channel, 6);
        let empty_shape = empty.shape.as_ref().expect("shape extracted");
        assert_eq!(empty_shape.count, 0);
        assert!(empty_shape.bins.iter().all(|&bin| bin == 0.0));
        assert_eq!(empty.spes, 0);
        assert_eq!(empty.amplitude_mean, None);

        let filled = &results[1];
        assert_eq!(filled.channel, 10);
        assert_eq!(filled.waveforms, 2);
        assert_eq!(filled.spes, 2);
        let filled_shape = filled.shape.as_ref().expect("shape extracted");
        assert_eq!(filled_shape.count, 2);
        assert_eq!(filled_shape.bins, vec![1.0, 30.0, 1.0]);
        assert_eq!(filled.amplitudes, vec![20.0, 40.0]);
        assert_eq!(filled.integrals.unsubtracted.zero, vec![40.0, 80.0]);
        // Bin centres 25 and 45
        assert_approx_eq!(filled.amplitude_mean.expect("entries"), 35.0);
        assert_eq!(filled.integral_histograms.unsubtracted.zero.overflow, 0);
        assert_eq!(filled.integral_means.local.zero, None);
    }

    #[test]
    fn spes_are_counted_without_shape() {
        let mut slots = CalibrationSlots::new(&[6], None);
        let slot = slots.get_mut(0).expect("slot");
        let mut waveform = features(20.0);
        waveform.shape = None;
        waveform.num_spes = 3;
        slot.add(waveform);
        // A shape computed elsewhere is not merged into a slot without one
        slot.add(features(40.0));

        let results = slots.finalize(BINNING, BINNING);
        let result = &results[0];
        assert_eq!(result.shape, None);
        assert_eq!(result.spes, 4);
        assert_eq!(result.waveforms, 2);
        assert_eq!(result.amplitudes, vec![20.0, 40.0]);
    }

    #[test]
    fn missing_slot() {
        let mut slots = CalibrationSlots::new(&[6], Some(PeakWindow::new(1, 1)));
        assert!(slots.get_mut(0).is_some());
        assert!(slots.get_mut(1).is_none());
    }
}
