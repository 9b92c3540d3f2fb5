//! Reads events and channel maps from JSON files.
use pmt_gain_common::{Channel, EventNumber, Intensity, Time};
use serde::{Deserialize, de::DeserializeOwned};
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum LoadError {
    #[error("Cannot open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid input pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("Cannot read input path: {0}")]
    Glob(#[from] glob::GlobError),
    #[error("No input files match {0}")]
    NoMatches(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct RawWaveform {
    pub(crate) channel: Channel,
    /// Time of the first sample, in µs.
    pub(crate) timestamp: Time,
    pub(crate) samples: Vec<Intensity>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct Event {
    pub(crate) event: EventNumber,
    pub(crate) waveforms: Vec<RawWaveform>,
}

pub(crate) fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| LoadError::Json {
        path: path.to_owned(),
        source,
    })
}

/// Loads the list of events held in one file.
#[tracing::instrument(skip_all, fields(path = %path.display(), num_events))]
pub(crate) fn load_events(path: &Path) -> Result<Vec<Event>, LoadError> {
    let events: Vec<Event> = load_json(path)?;
    tracing::Span::current().record("num_events", events.len());
    Ok(events)
}

/// All files matching `pattern`, in lexical order.
pub(crate) fn find_input_files(pattern: &str) -> Result<Vec<PathBuf>, LoadError> {
    let mut paths = glob::glob(pattern)?.collect::<Result<Vec<_>, _>>()?;
    if paths.is_empty() {
        return Err(LoadError::NoMatches(pattern.to_owned()));
    }
    paths.sort();
    Ok(paths)
}
