use tracing_subscriber::EnvFilter;

/// Output encoding of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    /// Human-readable single-line output, for local runs.
    Compact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberConfig {
    /// Directive used when `RUST_LOG` is unset or unparsable.
    pub default_filter: String,
    pub format: LogFormat,
    pub with_target: bool,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            default_filter: "info".to_string(),
            format: LogFormat::Json,
            with_target: false,
        }
    }
}

impl SubscriberConfig {
    pub fn with_default_filter(mut self, directive: impl Into<String>) -> Self {
        self.default_filter = directive.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_filter))
    }
}

/// Install a global subscriber built from `config`.
///
/// Returns `false` when a global subscriber was already set.
pub fn install(config: &SubscriberConfig) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(config.with_target);

    match config.format {
        LogFormat::Json => builder.json().try_init().is_ok(),
        LogFormat::Compact => builder.compact().try_init().is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_a_no_op() {
        crate::init();
        assert!(!install(&SubscriberConfig::default().with_format(LogFormat::Compact)));
        crate::init();
        tracing::info!(check = "ok", "subscriber installed");
    }

    #[test]
    fn builders_override_defaults() {
        let config = SubscriberConfig::default()
            .with_default_filter("orbit_infra=debug")
            .with_target(true);
        assert_eq!(config.default_filter, "orbit_infra=debug");
        assert!(config.with_target);
        assert_eq!(config.format, LogFormat::Json);
    }
}
