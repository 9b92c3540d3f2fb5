use crate::{calibration::SlotResult, processing::RunTally};
use anyhow::Context;
use serde::Serialize;
use std::{fs::File, io::BufWriter, io::Write, path::Path};
use tracing::info;

/// Everything a calibration run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct RunSummary {
    pub(crate) tally: RunTally,
    pub(crate) slots: Vec<SlotResult>,
}

impl RunSummary {
    pub(crate) fn write_json<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(writer, self)
    }

    pub(crate) fn write_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Cannot create output file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        self.write_json(&mut writer)
            .with_context(|| format!("Cannot write results to {}", path.display()))?;
        writer.flush()?;
        info!("Results for {} channels written to {}", self.slots.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        calibration::CalibrationSlot,
        histogram::HistogramBinning,
        pulse_detection::PeakWindow,
    };

    const BINNING: HistogramBinning = HistogramBinning {
        bins: 4,
        min: 0.0,
        max: 8.0,
    };

    #[test]
    fn summary_json_layout() {
        let summary = RunSummary {
            tally: RunTally {
                analysed: 3,
                failed: 1,
                skipped: 2,
                total_spes: 5,
            },
            slots: vec![CalibrationSlot::new(7, Some(PeakWindow::new(1, 2))).finalize(BINNING, BINNING)],
        };
        let mut buffer = Vec::new();
        summary.write_json(&mut buffer).expect("serialise");
        let value: serde_json::Value = serde_json::from_slice(&buffer).expect("valid json");

        assert_eq!(value["tally"]["total_spes"], 5);
        let slot = &value["slots"][0];
        assert_eq!(slot["channel"], 7);
        assert_eq!(slot["shape"]["bins"].as_array().map(Vec::len), Some(4));
        assert_eq!(slot["shape"]["count"], 0);
        assert_eq!(slot["spes"], 0);
        assert!(slot["integrals"]["local"]["manual"].is_array());
        assert!(slot["integral_means"]["unsubtracted"]["zero"].is_null());
        assert_eq!(slot["amplitude_histogram"]["counts"], serde_json::json!([0, 0, 0, 0]));
    }

    #[test]
    fn written_to_file() {
        let path = std::env::temp_dir().join("spe_analyser_output_test.json");
        let summary = RunSummary {
            tally: RunTally::default(),
            slots: Vec::new(),
        };
        summary.write_to_file(&path).expect("write");
        let contents = std::fs::read_to_string(&path).expect("read");
        assert!(contents.contains("\"slots\": []"));
        std::fs::remove_file(path).ok();
    }
}
