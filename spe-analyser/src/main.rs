mod calibration;
mod channels;
mod histogram;
mod loader;
mod output;
mod parameters;
mod processing;
mod pulse_detection;
mod waveform;

use anyhow::Context;
use channels::ChannelTable;
use clap::Parser;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use parameters::{HistogramParameters, SelectionParameters, SpeParameters, TimingParameters};
use pmt_gain_common::{
    init_tracer,
    metrics::{
        component_info_metric, describe_counters,
        failures::{self, FailureKind},
        metric_names::FAILURES,
    },
    tracer::TracerOptions,
};
use processing::{CalibrationRun, RunSettings};
use std::{net::SocketAddr, path::PathBuf};
use tracing::{error, info, level_filters::LevelFilter, warn};

// cargo run --release --bin spe-analyser -- --input "data/run_*.json" --channel-map data/channels.json --use-all-pmts --proximity-veto

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Glob pattern matching the event files to analyse.
    #[clap(long)]
    input: String,

    /// JSON file describing the detector type and electronics of each channel.
    #[clap(long)]
    channel_map: PathBuf,

    #[clap(long, default_value = "spe_results.json")]
    output_file: PathBuf,

    /// If set, the baseline-referenced signal of each analysed waveform is written to this directory.
    #[clap(long)]
    save_path: Option<PathBuf>,

    /// If set, metrics are served on this address.
    #[clap(long, env)]
    observability_address: Option<SocketAddr>,

    /// Log level used when RUST_LOG is not set.
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,

    #[clap(flatten)]
    spe: SpeParameters,

    #[clap(flatten)]
    selection: SelectionParameters,

    #[clap(flatten)]
    timing: TimingParameters,

    #[clap(flatten)]
    histograms: HistogramParameters,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let tracer = init_tracer!(TracerOptions::new(args.log_level))?;
    info!("Starting {}", tracer.service_name());

    if let Some(address) = args.observability_address {
        PrometheusBuilder::new()
            .with_http_listener(address)
            .install()
            .context("Prometheus metrics exporter should be set up")?;
    }
    component_info_metric("spe-analyser");
    describe_counters();

    args.spe.validate()?;
    args.selection.validate()?;
    args.timing.validate()?;

    let channel_map = ChannelTable::load(&args.channel_map)?;

    if let Some(save_path) = &args.save_path {
        std::fs::create_dir_all(save_path)
            .with_context(|| format!("Cannot create {}", save_path.display()))?;
    }

    let settings = RunSettings {
        spe: &args.spe,
        selection: &args.selection,
        timing: &args.timing,
        histograms: &args.histograms,
        save_path: args.save_path.as_deref(),
    };
    let mut run = CalibrationRun::new(settings, &channel_map);

    for path in loader::find_input_files(&args.input)? {
        info!("Reading {}", path.display());
        match loader::load_events(&path) {
            Ok(events) => {
                for event in &events {
                    run.process_event(event);
                }
            }
            Err(e) => {
                error!("{e}");
                counter!(
                    FAILURES,
                    &[failures::get_label(FailureKind::FileReadFailed)]
                )
                .increment(1);
            }
        }
    }

    if run.tally().analysed == 0 {
        warn!("No waveforms were analysed");
    }
    run.finish().write_to_file(&args.output_file)
}
