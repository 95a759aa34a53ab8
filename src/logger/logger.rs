use anyhow::{Result, anyhow};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LogFormat {
    Text,
    Json,
}

pub struct LogConfig {
    pub filter: String,
}

pub struct Logger {
    reload_handle: reload::Handle<EnvFilter, Registry>,
}

impl Logger {
    /// Installs the global subscriber at `info` until settings are loaded.
    pub fn new_bootstrap(format: LogFormat) -> Self {
        let filter = EnvFilter::new("info");
        let (filter, reload_handle) = reload::Layer::new(filter);

        let output = match format {
            LogFormat::Text => fmt::layer().boxed(),
            LogFormat::Json => fmt::layer().json().with_current_span(false).boxed(),
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(output)
            .init();

        Self { reload_handle }
    }

    /// Swaps in the configured filter. `RUST_LOG`, when set, wins over it.
    pub fn reload_from_config(&self, config: &LogConfig) -> Result<()> {
        let directives = std::env::var(EnvFilter::DEFAULT_ENV)
            .ok()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| config.filter.clone());
        let filter = EnvFilter::try_new(&directives).map_err(|e| anyhow!(e))?;
        self.reload_handle.reload(filter).map_err(|e| anyhow!(e))?;
        Ok(())
    }
}
