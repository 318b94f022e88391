use std::sync::Once;

/// How the process-wide logger is set up.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Explicit `env_logger` directives, e.g. `"rekindle_engine=debug"`.
    /// Takes priority over `RUST_LOG` and over `gpu_level`.
    pub env_filter: Option<String>,

    /// Ceiling for the wgpu and naga crates, which are chatty at info.
    pub gpu_level: log::LevelFilter,

    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            gpu_level: log::LevelFilter::Warn,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

const GPU_TARGETS: [&str; 4] = ["wgpu_core", "wgpu_hal", "wgpu", "naga"];

static INIT: Once = Once::new();

/// Picks the filter directives: the configured ones, then `rust_log`, then
/// `info` with the GPU crates capped at `gpu_level`.
fn directives(config: &LoggingConfig, rust_log: Option<String>) -> String {
    if let Some(filter) = config.env_filter.clone().or(rust_log) {
        return filter;
    }

    let gpu_level = config.gpu_level.as_str().to_ascii_lowercase();
    std::iter::once("info".to_string())
        .chain(GPU_TARGETS.iter().map(|target| format!("{target}={gpu_level}")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Installs the `env_logger` backend for the `log` facade.
///
/// Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filters = directives(&config, std::env::var("RUST_LOG").ok());

        env_logger::Builder::new()
            .parse_filters(&filters)
            .write_style(config.write_style)
            .init();

        log::debug!("logger ready ({filters})");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins_over_rust_log() {
        let config = LoggingConfig {
            env_filter: Some("rekindle_engine=trace".to_string()),
            ..LoggingConfig::default()
        };
        assert_eq!(
            directives(&config, Some("error".to_string())),
            "rekindle_engine=trace"
        );
    }

    #[test]
    fn rust_log_is_used_when_nothing_is_configured() {
        let config = LoggingConfig::default();
        assert_eq!(directives(&config, Some("debug".to_string())), "debug");
    }

    #[test]
    fn default_caps_the_gpu_crates() {
        let config = LoggingConfig {
            gpu_level: log::LevelFilter::Error,
            ..LoggingConfig::default()
        };
        assert_eq!(
            directives(&config, None),
            "info,wgpu_core=error,wgpu_hal=error,wgpu=error,naga=error"
        );
    }
}
