use metrics::{describe_counter, describe_gauge, gauge};

pub fn component_info_metric(name: &'static str) {
    static NAME: &str = "pmt_gain_component_info";

    describe_gauge!(NAME, "Basic information about the component");

    let git_rev = option_env!("GIT_VERSION").unwrap_or("unknown");
    gauge!(NAME, "component" => name, "git_version" => git_rev).set(1);
}

/// Registers descriptions for every counter the analysis emits.
pub fn describe_counters() {
    describe_counter!(
        metric_names::EVENTS_PROCESSED,
        metrics::Unit::Count,
        "Number of events processed"
    );
    describe_counter!(
        metric_names::WAVEFORMS_ANALYSED,
        metrics::Unit::Count,
        "Number of waveforms successfully analysed"
    );
    describe_counter!(
        metric_names::WAVEFORMS_SKIPPED,
        metrics::Unit::Count,
        "Number of waveforms on untracked or excluded channels"
    );
    describe_counter!(
        metric_names::FAILURES,
        metrics::Unit::Count,
        "Number of failures encountered"
    );
    describe_counter!(
        metric_names::SPES_FOUND,
        metrics::Unit::Count,
        "Number of single photoelectron candidates found"
    );
}

pub mod metric_names {
    pub const EVENTS_PROCESSED: &str = "pmt_gain_events_processed";
    pub const WAVEFORMS_ANALYSED: &str = "pmt_gain_waveforms_analysed";
    pub const WAVEFORMS_SKIPPED: &str = "pmt_gain_waveforms_skipped";
    pub const FAILURES: &str = "pmt_gain_failures";
    pub const SPES_FOUND: &str = "pmt_gain_spes_found";
}

pub mod failures {
    #[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
    pub enum FailureKind {
        NoPulsesFound,
        TooManyPulses,
        FileReadFailed,
        FileWriteFailed,
    }

    // Label building function
    pub fn get_label(failure_kind: FailureKind) -> (&'static str, &'static str) {
        (
            "failure_kind",
            match failure_kind {
                FailureKind::NoPulsesFound => "no_pulses_found",
                FailureKind::TooManyPulses => "too_many_pulses",
                FailureKind::FileReadFailed => "file_read_failed",
                FailureKind::FileWriteFailed => "file_write_failed",
            },
        )
    }

}
