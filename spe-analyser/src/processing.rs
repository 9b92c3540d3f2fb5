use crate::{
    calibration::CalibrationSlots,
    channels::{ChannelMap, SlotTable},
    histogram::HistogramBinning,
    loader::{Event, RawWaveform},
    output::RunSummary,
    parameters::{Extraction, HistogramParameters, SelectionParameters, SpeParameters, TimingParameters},
    pulse_detection::{
        AcceptedPeaks, DetectionFailure, IntegralCollections, IntegralSettings, Real,
        SavablePoint, SaveToFileFilter, ShapeSum, baseline_referenced, estimate_noise,
        extract_amplitudes, find_pulses,
    },
    waveform::Waveform,
};
use metrics::counter;
use pmt_gain_common::{
    Channel, EventNumber, SlotIndex,
    metrics::{
        failures::{self, FailureKind},
        metric_names::{EVENTS_PROCESSED, FAILURES, SPES_FOUND, WAVEFORMS_ANALYSED, WAVEFORMS_SKIPPED},
    },
};
use rayon::prelude::*;
use serde::Serialize;
use std::{
    ops::AddAssign,
    path::{Path, PathBuf},
};
use tracing::{debug, info, trace, warn};

/// Borrowed configuration for a calibration run.
#[derive(Clone, Copy)]
pub(crate) struct RunSettings<'a> {
    pub(crate) spe: &'a SpeParameters,
    pub(crate) selection: &'a SelectionParameters,
    pub(crate) timing: &'a TimingParameters,
    pub(crate) histograms: &'a HistogramParameters,
    pub(crate) save_path: Option<&'a Path>,
}

/// Counts of waveform outcomes.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct RunTally {
    pub(crate) analysed: usize,
    pub(crate) failed: usize,
    pub(crate) skipped: usize,
    pub(crate) total_spes: usize,
}

impl AddAssign for RunTally {
    fn add_assign(&mut self, rhs: Self) {
        self.analysed += rhs.analysed;
        self.failed += rhs.failed;
        self.skipped += rhs.skipped;
        self.total_spes += rhs.total_spes;
    }
}

/// The features extracted from a single waveform, before merging into its slot.
#[derive(Debug, Clone)]
pub(crate) struct WaveformFeatures {
    pub(crate) shape: Option<ShapeSum>,
    pub(crate) amplitudes: Vec<Real>,
    pub(crate) integrals: IntegralCollections<Vec<Real>>,
    pub(crate) num_spes: usize,
}

pub(crate) fn get_save_file_name(
    save_path: &Path,
    event: EventNumber,
    channel: Channel,
    pd_type: &str,
    index: usize,
) -> PathBuf {
    save_path.join(format!(
        "event_{event}_opchannel_{channel}_{pd_type}_{index}.csv"
    ))
}

/// The file the detected pulses are written to, alongside the signal saved in `save_file`.
pub(crate) fn get_pulses_file_name(save_file: &Path) -> PathBuf {
    save_file.with_extension("pulses.csv")
}

/// Writes the points to `path`, counting rather than propagating a failure.
fn save_points<I>(points: I, path: &Path)
where
    I: Iterator,
    I::Item: SavablePoint,
{
    if let Err(e) = points.save_to_file(path) {
        warn!("Cannot write {}: {e}", path.display());
        counter!(
            FAILURES,
            &[failures::get_label(FailureKind::FileWriteFailed)]
        )
        .increment(1);
    }
}

/// Runs the full pipeline on one waveform.
#[tracing::instrument(skip_all, fields(channel = waveform.channel, num_pulses))]
pub(crate) fn analyse_waveform(
    waveform: &Waveform,
    parameters: &SpeParameters,
    save_file: Option<&Path>,
) -> Result<WaveformFeatures, DetectionFailure> {
    let noise = estimate_noise(waveform.samples, &parameters.noise_windows());
    let signal = baseline_referenced(waveform.samples, &noise);

    if let Some(save_file) = save_file {
        save_points(
            signal
                .iter()
                .enumerate()
                .map(|(i, &v)| (waveform.time_of(i), v)),
            save_file,
        );
    }

    let threshold = noise.threshold(parameters.noise_multiplier);
    let pulses = find_pulses(&signal, threshold, parameters.spe_region_start)?;
    if let Some(save_file) = save_file {
        save_points(pulses.iter().copied(), &get_pulses_file_name(save_file));
    }
    let peaks = AcceptedPeaks::from_pulses(&pulses)?;
    tracing::Span::current().record("num_pulses", peaks.len());

    let window = parameters.peak_window();
    let shape = parameters.extracts(Extraction::Shape).then(|| {
        let mut shape = ShapeSum::new(window);
        shape.add_waveform(&signal, &peaks, waveform.sample_rate, parameters.proximity());
        shape
    });
    let amplitudes = if parameters.extracts(Extraction::Amplitude) {
        extract_amplitudes(&signal, &peaks, window)
    } else {
        Vec::new()
    };
    let integrals = if parameters.extracts(Extraction::Integral) {
        let settings = IntegralSettings {
            threshold,
            manual_low: parameters.manual_bound_low,
            manual_high: parameters.manual_bound_high,
        };
        IntegralCollections::extract(&signal, &peaks, window, &settings)
    } else {
        IntegralCollections::default()
    };

    debug!(
        "Noise mean {:.2}, stdev {:.3}, {} pulses",
        noise.mean,
        noise.stdev,
        peaks.len()
    );
    Ok(WaveformFeatures {
        shape,
        amplitudes,
        integrals,
        num_spes: peaks.len(),
    })
}

/// A waveform on a tracked channel, ready for analysis.
struct ResolvedWaveform<'a> {
    slot: SlotIndex,
    waveform: Waveform<'a>,
    save_file: Option<PathBuf>,
}

/// Owns the calibration slots for the lifetime of one run.
pub(crate) struct CalibrationRun<'a, M: ChannelMap> {
    settings: RunSettings<'a>,
    channel_map: &'a M,
    slot_table: SlotTable,
    slots: CalibrationSlots,
    tally: RunTally,
}

impl<'a, M: ChannelMap> CalibrationRun<'a, M> {
    pub(crate) fn new(settings: RunSettings<'a>, channel_map: &'a M) -> Self {
        let slot_table = SlotTable::from_selection(channel_map, &settings.selection.pmt_selection());
        let shape_window = settings
            .spe
            .extracts(Extraction::Shape)
            .then(|| settings.spe.peak_window());
        let slots = CalibrationSlots::new(slot_table.channels(), shape_window);
        Self {
            settings,
            channel_map,
            slot_table,
            slots,
            tally: RunTally::default(),
        }
    }

    pub(crate) fn tally(&self) -> RunTally {
        self.tally
    }

    /// Finds the slot and sample rate of a waveform, or `None` if it is not analysed.
    fn resolve<'w>(
        &self,
        event: EventNumber,
        raw: &'w RawWaveform,
        index: &mut usize,
    ) -> Option<ResolvedWaveform<'w>> {
        let slot = self.slot_table.slot(raw.channel)?;
        let pd_type = self.channel_map.pd_type(raw.channel)?;
        if !self.settings.selection.includes_pd_type(pd_type) {
            return None;
        }
        let electronics = self.channel_map.electronics(raw.channel).unwrap_or_default();
        let save_file = self.settings.save_path.map(|save_path| {
            get_save_file_name(save_path, event, raw.channel, pd_type, *index)
        });
        *index += 1;
        Some(ResolvedWaveform {
            slot,
            waveform: Waveform {
                channel: raw.channel,
                samples: &raw.samples,
                start_time: raw.timestamp,
                sample_rate: self.settings.timing.sample_rate(electronics),
            },
            save_file,
        })
    }

    /// Analyses every waveform of `event` and adds the results to the slots.
    #[tracing::instrument(skip_all, fields(event = event.event, num_waveforms = event.waveforms.len(), num_spes))]
    pub(crate) fn process_event(&mut self, event: &Event) {
        if !self.settings.selection.includes_event(event.event) {
            trace!("Event not selected");
            return;
        }

        let mut index = 0;
        let resolved: Vec<ResolvedWaveform> = event
            .waveforms
            .iter()
            .filter_map(|raw| self.resolve(event.event, raw, &mut index))
            .collect();

        let mut tally = RunTally {
            skipped: event.waveforms.len() - resolved.len(),
            ..Default::default()
        };
        counter!(WAVEFORMS_SKIPPED).increment(tally.skipped as u64);

        let spe = self.settings.spe;
        let outcomes: Vec<_> = resolved
            .par_iter()
            .map(|job| {
                (
                    job.slot,
                    job.waveform.channel,
                    analyse_waveform(&job.waveform, spe, job.save_file.as_deref()),
                )
            })
            .collect();

        for (slot, channel, outcome) in outcomes {
            match outcome {
                Ok(features) => {
                    tally.analysed += 1;
                    tally.total_spes += features.num_spes;
                    counter!(WAVEFORMS_ANALYSED).increment(1);
                    counter!(SPES_FOUND).increment(features.num_spes as u64);
                    if let Some(slot) = self.slots.get_mut(slot) {
                        slot.add(features);
                    }
                }
                Err(e) => {
                    tally.failed += 1;
                    debug!(channel, "{e}");
                    counter!(FAILURES, &[failures::get_label(e.into())]).increment(1);
                }
            }
        }

        tracing::Span::current().record("num_spes", tally.total_spes);
        counter!(EVENTS_PROCESSED).increment(1);
        info!(
            "Event {}: {} waveforms analysed, {} failed, {} skipped",
            event.event, tally.analysed, tally.failed, tally.skipped
        );
        self.tally += tally;
    }

    /// Finalises every slot. Consumes the run, so this happens exactly once.
    pub(crate) fn finish(self) -> RunSummary {
        let tally = self.tally;
        info!(
            "Run finished: {} waveforms analysed, {} failed, {} skipped, {} SPEs found",
            tally.analysed, tally.failed, tally.skipped, tally.total_spes
        );
        let amplitude_binning: HistogramBinning = self.settings.histograms.amplitude_binning.0;
        let integral_binning: HistogramBinning = self.settings.histograms.integral_binning.0;
        RunSummary {
            tally,
            slots: self.slots.finalize(amplitude_binning, integral_binning),
        }
    }
}
