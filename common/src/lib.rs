pub mod metrics;
pub mod tracer;

/// Photon detector channel number, as assigned by the readout.
pub type Channel = u32;
/// Raw digitiser sample, in ADC counts.
pub type Intensity = i16;
pub type EventNumber = u32;
/// Index of a tracked channel's calibration slot.
pub type SlotIndex = usize;

/// Sample rate in MHz, so that sample indices divided by it give µs.
pub type SampleRate = f64;
/// Time in µs.
pub type Time = f64;
