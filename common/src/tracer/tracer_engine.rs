use thiserror::Error;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt};

#[derive(Debug, Error)]
pub enum TracerError {
    #[error("Invalid directive(s) in RUST_LOG: {0}")]
    Directive(#[from] tracing_subscriber::filter::FromEnvError),
    #[error("Global subscriber already set: {0}")]
    AlreadySet(#[from] tracing::subscriber::SetGlobalDefaultError),
}

pub struct TracerOptions {
    /// Level used when `RUST_LOG` is not set.
    pub default_level: LevelFilter,
    /// Emit ANSI colour codes to stdout.
    pub ansi: bool,
}

impl TracerOptions {
    pub fn new(default_level: LevelFilter) -> Self {
        Self {
            default_level,
            ansi: true,
        }
    }
}

/// This object initialises the stdout tracer for a component.
pub struct TracerEngine {
    service_name: String,
}

impl TracerEngine {
    /// Initialises the stdout tracer for the crate
    /// #Arguments
    /// * `options` - The caller-specified instance of TracerOptions.
    /// * `service_name` - The name of the component, included in the start-up message.
    /// #Returns
    /// An instance of TracerEngine, or an error if the filter is malformed
    /// or a global subscriber has already been installed.
    pub fn new(options: TracerOptions, service_name: &str) -> Result<Self, TracerError> {
        let log_filter = EnvFilter::builder()
            .with_default_directive(options.default_level.into())
            .from_env()?;

        let stdout_tracer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(options.ansi)
            .with_filter(log_filter);

        let subscriber = tracing_subscriber::Registry::default().with(stdout_tracer);
        tracing::subscriber::set_global_default(subscriber)?;

        info!("Tracer initialised for {service_name}");
        Ok(Self {
            service_name: service_name.to_owned(),
        })
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}
