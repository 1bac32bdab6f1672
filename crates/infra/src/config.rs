//! Process configuration read from `ORBIT_*` environment variables.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use orbit_core::{TenantName, UserId};
use orbit_model::LinkContext;

use crate::command_dispatcher::DispatchPolicy;
use crate::orchestrator::HttpOrchestrator;

pub const ENV_TENANT: &str = "ORBIT_TENANT";
pub const ENV_ENVIRONMENT: &str = "ORBIT_ENVIRONMENT";
pub const ENV_BASE_URL: &str = "ORBIT_BASE_URL";
pub const ENV_ORCHESTRATOR_URL: &str = "ORBIT_ORCHESTRATOR_URL";
pub const ENV_ORCHESTRATOR_KEY: &str = "ORBIT_ORCHESTRATOR_KEY";
pub const ENV_ADMIN_USER_ID: &str = "ORBIT_ADMIN_USER_ID";
pub const ENV_SUBMIT_INTERVAL_MS: &str = "ORBIT_SUBMIT_INTERVAL_MS";
pub const ENV_SUBMIT_BUDGET_MS: &str = "ORBIT_SUBMIT_BUDGET_MS";
pub const ENV_POLL_INTERVAL_MS: &str = "ORBIT_POLL_INTERVAL_MS";
pub const ENV_POLL_BUDGET_MS: &str = "ORBIT_POLL_BUDGET_MS";

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_ORCHESTRATOR_URL: &str = "http://localhost:7071";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Hosting environment the process runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HostEnvironment {
    Development,
    Staging,
    #[default]
    Production,
}

impl HostEnvironment {
    pub fn is_development(self) -> bool {
        self == HostEnvironment::Development
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HostEnvironment::Development => "Development",
            HostEnvironment::Staging => "Staging",
            HostEnvironment::Production => "Production",
        }
    }
}

impl fmt::Display for HostEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(HostEnvironment::Development),
            "staging" => Ok(HostEnvironment::Staging),
            "production" | "prod" => Ok(HostEnvironment::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrbitConfig {
    pub tenant: TenantName,
    pub environment: HostEnvironment,
    /// Public base URL that reference links are resolved against.
    pub base_url: String,
    pub orchestrator_url: String,
    pub orchestrator_key: Option<String>,
    /// User promoted to admin by the bootstrap initializer.
    pub admin_user_id: Option<UserId>,
    pub dispatch: DispatchPolicy,
}

impl OrbitConfig {
    /// Defaults for everything but the tenant.
    pub fn new(tenant: TenantName) -> Self {
        Self {
            tenant,
            environment: HostEnvironment::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            orchestrator_url: DEFAULT_ORCHESTRATOR_URL.to_string(),
            orchestrator_key: None,
            admin_user_id: None,
            dispatch: DispatchPolicy::default(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let tenant = get(ENV_TENANT)
            .map(TenantName::new)
            .ok_or(ConfigError::Missing(ENV_TENANT))?;
        let mut config = Self::new(tenant);

        if let Some(value) = get(ENV_ENVIRONMENT) {
            config.environment = value.parse().map_err(|reason| ConfigError::Invalid {
                key: ENV_ENVIRONMENT,
                value: value.clone(),
                reason,
            })?;
        }
        if let Some(url) = get(ENV_BASE_URL) {
            config.base_url = parse_url(ENV_BASE_URL, url)?;
        }
        if let Some(url) = get(ENV_ORCHESTRATOR_URL) {
            config.orchestrator_url = parse_url(ENV_ORCHESTRATOR_URL, url)?;
        }
        config.orchestrator_key = get(ENV_ORCHESTRATOR_KEY);
        config.admin_user_id = get(ENV_ADMIN_USER_ID).map(UserId::new);

        let policy = &mut config.dispatch;
        if let Some(v) = get(ENV_SUBMIT_INTERVAL_MS) {
            policy.submit_interval = parse_interval(ENV_SUBMIT_INTERVAL_MS, v)?;
        }
        if let Some(v) = get(ENV_SUBMIT_BUDGET_MS) {
            policy.submit_budget = parse_millis(ENV_SUBMIT_BUDGET_MS, v)?;
        }
        if let Some(v) = get(ENV_POLL_INTERVAL_MS) {
            policy.poll_interval = parse_interval(ENV_POLL_INTERVAL_MS, v)?;
        }
        if let Some(v) = get(ENV_POLL_BUDGET_MS) {
            policy.poll_budget = parse_millis(ENV_POLL_BUDGET_MS, v)?;
        }

        Ok(config)
    }

    pub fn with_environment(mut self, environment: HostEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_orchestrator(mut self, url: impl Into<String>, key: Option<String>) -> Self {
        self.orchestrator_url = url.into();
        self.orchestrator_key = key;
        self
    }

    pub fn with_admin_user(mut self, user_id: impl Into<UserId>) -> Self {
        self.admin_user_id = Some(user_id.into());
        self
    }

    pub fn with_dispatch(mut self, policy: DispatchPolicy) -> Self {
        self.dispatch = policy;
        self
    }

    pub fn link_context(&self) -> LinkContext {
        LinkContext::new(&self.base_url)
    }

    pub fn orchestrator(&self) -> HttpOrchestrator {
        let orchestrator = HttpOrchestrator::new(&self.orchestrator_url);
        match &self.orchestrator_key {
            Some(key) => orchestrator.with_function_key(key.clone()),
            None => orchestrator,
        }
    }
}

fn parse_url(key: &'static str, value: String) -> Result<String, ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            key,
            value,
            reason: "expected an http(s) url".to_string(),
        })
    }
}

fn parse_millis(key: &'static str, value: String) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| ConfigError::Invalid {
            key,
            value,
            reason: e.to_string(),
        })
}

fn parse_interval(key: &'static str, value: String) -> Result<Duration, ConfigError> {
    let interval = parse_millis(key, value.clone())?;
    if interval.is_zero() {
        return Err(ConfigError::Invalid {
            key,
            value,
            reason: "interval must be positive".to_string(),
        });
    }
    Ok(interval)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn tenant_is_required() {
        let err = OrbitConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(ENV_TENANT));

        let err = OrbitConfig::from_lookup(lookup(&[(ENV_TENANT, "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(ENV_TENANT));
    }

    #[test]
    fn defaults_apply_when_only_tenant_is_set() {
        let config = OrbitConfig::from_lookup(lookup(&[(ENV_TENANT, "contoso")])).unwrap();
        assert_eq!(config.tenant.as_str(), "contoso");
        assert_eq!(config.environment, HostEnvironment::Production);
        assert_eq!(config.orchestrator_url, DEFAULT_ORCHESTRATOR_URL);
        assert_eq!(config.dispatch, DispatchPolicy::default());
        assert_eq!(config.admin_user_id, None);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = OrbitConfig::from_lookup(lookup(&[
            (ENV_TENANT, "contoso"),
            (ENV_ENVIRONMENT, "Development"),
            (ENV_BASE_URL, "https://orbit.example/"),
            (ENV_ADMIN_USER_ID, "admin-1"),
            (ENV_SUBMIT_INTERVAL_MS, "250"),
            (ENV_POLL_BUDGET_MS, "60000"),
        ]))
        .unwrap();

        assert!(config.environment.is_development());
        assert_eq!(config.admin_user_id, Some(UserId::new("admin-1")));
        assert_eq!(config.dispatch.submit_interval, Duration::from_millis(250));
        assert_eq!(config.dispatch.poll_budget, Duration::from_secs(60));
        assert_eq!(config.link_context().url("/projects"), "https://orbit.example/projects");
    }

    #[test]
    fn bad_values_name_the_offending_key() {
        let err = OrbitConfig::from_lookup(lookup(&[
            (ENV_TENANT, "contoso"),
            (ENV_POLL_INTERVAL_MS, "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: ENV_POLL_INTERVAL_MS, .. }));

        let err = OrbitConfig::from_lookup(lookup(&[
            (ENV_TENANT, "contoso"),
            (ENV_ORCHESTRATOR_URL, "localhost:7071"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: ENV_ORCHESTRATOR_URL, .. }));
    }
}
