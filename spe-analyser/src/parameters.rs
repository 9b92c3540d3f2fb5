use crate::{
    channels::PmtSelection,
    histogram::HistogramBinning,
    pulse_detection::{NoiseWindows, PeakWindow, Real},
};
use clap::{Parser, ValueEnum};
use pmt_gain_common::{EventNumber, SampleRate, Time};
use std::{
    num::{ParseFloatError, ParseIntError},
    str::FromStr,
};
use strum::{Display, EnumIter};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub(crate) enum ParameterError {
    #[error("Incorrect number of parameters in binning, expected pattern 'bins,min,max', got '{0}'")]
    BinningFormat(String),
    #[error("Invalid bin count: {0}")]
    BinCount(#[from] ParseIntError),
    #[error("Invalid bin edge: {0}")]
    BinEdge(#[from] ParseFloatError),
    #[error("Histogram binning must have at least one bin and min < max, got {0:?}")]
    EmptyHistogram(HistogramBinning),
    #[error("{name} must be finite and non-negative, got {value}")]
    NegativeFactor { name: &'static str, value: Real },
    #[error("noise-window2-low-factor must not exceed 1, got {0}")]
    Window2Factor(Real),
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: Real },
    #[error("No PMTs selected")]
    NoPmtsSelected,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HistogramBinningWrapper(pub(crate) HistogramBinning);

impl FromStr for HistogramBinningWrapper {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let vals: Vec<_> = s.split(',').map(str::trim).collect();
        match vals.as_slice() {
            [bins, min, max] => {
                let binning = HistogramBinning {
                    bins: usize::from_str(bins)?,
                    min: Real::from_str(min)?,
                    max: Real::from_str(max)?,
                };
                if binning.bins == 0 || binning.min >= binning.max {
                    return Err(ParameterError::EmptyHistogram(binning));
                }
                Ok(HistogramBinningWrapper(binning))
            }
            _ => Err(ParameterError::BinningFormat(s.to_owned())),
        }
    }
}

/// The features that can be extracted from each waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum Extraction {
    /// Average pulse shape around the peak.
    Shape,
    /// Peak amplitude.
    Amplitude,
    /// Six integrals per peak.
    Integral,
}

#[derive(Debug, Clone, Parser)]
pub(crate) struct SpeParameters {
    /// Samples before the peak included in the pulse window.
    #[clap(long, default_value = "20")]
    pub(crate) low_bins: usize,

    /// Samples after the peak included in the pulse window.
    #[clap(long, default_value = "80")]
    pub(crate) high_bins: usize,

    /// Detection threshold, in standard deviations of the noise.
    #[clap(long, default_value = "3")]
    pub(crate) noise_multiplier: Real,

    /// First sample scanned for pulses.
    #[clap(long, default_value = "0")]
    pub(crate) spe_region_start: usize,

    /// Start of the first noise window, as a fraction of the largest pulse's index.
    #[clap(long, default_value = "0.1")]
    pub(crate) noise_window_low_factor: Real,

    /// End of the first noise window, as a fraction of the largest pulse's index.
    #[clap(long, default_value = "0.8")]
    pub(crate) noise_window_high_factor: Real,

    /// Start of the second noise window, as a fraction of the waveform length.
    #[clap(long, default_value = "0.9")]
    pub(crate) noise_window2_low_factor: Real,

    /// Samples before the peak integrated in manual mode.
    #[clap(long, default_value = "5")]
    pub(crate) manual_bound_low: usize,

    /// Samples after the peak integrated in manual mode.
    #[clap(long, default_value = "20")]
    pub(crate) manual_bound_high: usize,

    /// Exclude from the average shape any peak closely preceded by another.
    #[clap(long)]
    pub(crate) proximity_veto: bool,

    /// Separation below which the proximity veto applies, in µs.
    #[clap(long, default_value = "0.1")]
    pub(crate) proximity_window: Time,

    #[clap(long, value_enum, value_delimiter = ',', default_values_t = [Extraction::Shape, Extraction::Amplitude, Extraction::Integral])]
    pub(crate) extractions: Vec<Extraction>,
}

impl SpeParameters {
    pub(crate) fn validate(&self) -> Result<(), ParameterError> {
        for (name, value) in [
            ("noise-window-low-factor", self.noise_window_low_factor),
            ("noise-window-high-factor", self.noise_window_high_factor),
            ("noise-window2-low-factor", self.noise_window2_low_factor),
            ("noise-multiplier", self.noise_multiplier),
            ("proximity-window", self.proximity_window),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ParameterError::NegativeFactor { name, value });
            }
        }
        if self.noise_window2_low_factor > 1.0 {
            return Err(ParameterError::Window2Factor(
                self.noise_window2_low_factor,
            ));
        }
        Ok(())
    }

    pub(crate) fn noise_windows(&self) -> NoiseWindows {
        NoiseWindows {
            low_factor: self.noise_window_low_factor,
            high_factor: self.noise_window_high_factor,
            window2_low_factor: self.noise_window2_low_factor,
        }
    }

    pub(crate) fn peak_window(&self) -> PeakWindow {
        PeakWindow::new(self.low_bins, self.high_bins)
    }

    pub(crate) fn extracts(&self, extraction: Extraction) -> bool {
        self.extractions.contains(&extraction)
    }

    /// The proximity window, if the veto is enabled.
    pub(crate) fn proximity(&self) -> Option<Time> {
        self.proximity_veto.then_some(self.proximity_window)
    }
}

#[derive(Debug, Clone, Parser)]
pub(crate) struct SelectionParameters {
    /// Detector types whose waveforms are analysed.
    #[clap(long, value_delimiter = ',', default_value = "pmt_coated,pmt_uncoated")]
    pub(crate) opdets_to_analyse: Vec<String>,

    /// Track every PMT, ignoring `selected_pmts`.
    #[clap(long)]
    pub(crate) use_all_pmts: bool,

    /// Ordinals of the PMTs to track, counting PMT channels in ascending order.
    #[clap(long, value_delimiter = ',', default_value = "0")]
    pub(crate) selected_pmts: Vec<usize>,

    /// Only analyse this event.
    #[clap(long)]
    pub(crate) event_id: Option<EventNumber>,
}

impl SelectionParameters {
    pub(crate) fn validate(&self) -> Result<(), ParameterError> {
        if !self.use_all_pmts && self.selected_pmts.is_empty() {
            return Err(ParameterError::NoPmtsSelected);
        }
        Ok(())
    }

    pub(crate) fn pmt_selection(&self) -> PmtSelection<'_> {
        if self.use_all_pmts {
            PmtSelection::All
        } else {
            PmtSelection::Ordinals(&self.selected_pmts)
        }
    }

    pub(crate) fn includes_pd_type(&self, pd_type: &str) -> bool {
        self.opdets_to_analyse.iter().any(|opdet| opdet == pd_type)
    }

    pub(crate) fn includes_event(&self, event: EventNumber) -> bool {
        self.event_id.is_none_or(|id| id == event)
    }
}

#[derive(Debug, Clone, Parser)]
pub(crate) struct TimingParameters {
    /// Sample rate of the standard optical readout, in MHz.
    #[clap(long, default_value = "500")]
    pub(crate) optical_frequency: SampleRate,

    /// Sample rate of the DAPHNE readout, in MHz.
    #[clap(long, default_value = "62.5")]
    pub(crate) daphne_frequency: SampleRate,
}

impl TimingParameters {
    const DAPHNE: &'static str = "daphne";

    pub(crate) fn validate(&self) -> Result<(), ParameterError> {
        for (name, value) in [
            ("optical-frequency", self.optical_frequency),
            ("daphne-frequency", self.daphne_frequency),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ParameterError::NonPositive { name, value });
            }
        }
        Ok(())
    }

    pub(crate) fn sample_rate(&self, electronics: &str) -> SampleRate {
        if electronics == Self::DAPHNE {
            self.daphne_frequency
        } else {
            self.optical_frequency
        }
    }
}

#[derive(Debug, Clone, Parser)]
pub(crate) struct HistogramParameters {
    /// Binning of the amplitude summary histogram, as "bins,min,max".
    #[clap(long, default_value = "50,0,200")]
    pub(crate) amplitude_binning: HistogramBinningWrapper,

    /// Binning of the integral summary histograms, as "bins,min,max".
    #[clap(long, default_value = "50,0,500")]
    pub(crate) integral_binning: HistogramBinningWrapper,
}
