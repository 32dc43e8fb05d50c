use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;
use validator::Validate;

// Default constants
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8081";
pub const DEFAULT_SERVER_NAME: &str = "codex-mux";

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_SELF_PREFIX: &str = "mod-codex-mux";
pub const DEFAULT_PAGE_LIMIT: usize = 10;

pub const DEFAULT_TELEMETRY_ENABLED: bool = false;
pub const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";

/// Environment override prefix: `MUX_FEDERATION__REQUEST_TIMEOUT_MS=5000`.
pub const ENV_PREFIX: &str = "MUX";

#[derive(Debug, Deserialize, Default, Clone, Validate)]
pub struct AppConfig {
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerSettings,
    #[serde(default)]
    #[validate(nested)]
    pub federation: FederationSettings,
    #[serde(default)]
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct ServerSettings {
    #[serde(default = "default_listen_addr")]
    #[validate(length(min = 1))]
    pub listen_addr: String,

    #[serde(default = "default_server_name")]
    pub name: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            name: default_server_name(),
        }
    }
}

/// A backend id prefix and the source tag it maps to. A `null` tag means the
/// backend id itself is the tag.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Validate)]
pub struct SourceTagRule {
    #[validate(length(min = 1))]
    pub prefix: String,
    #[serde(default)]
    pub tag: Option<String>,
}

impl SourceTagRule {
    pub fn new(prefix: &str, tag: Option<&str>) -> Self {
        Self {
            prefix: prefix.to_string(),
            tag: tag.map(str::to_string),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct FederationSettings {
    #[serde(default = "default_request_timeout_ms")]
    #[validate(range(min = 1))]
    pub request_timeout_ms: u64,

    /// Backends whose id starts with this prefix are the gateway itself.
    #[serde(default = "default_self_prefix")]
    #[validate(length(min = 1))]
    pub self_prefix: String,

    #[serde(default = "default_page_limit")]
    pub default_limit: usize,

    /// When non-empty, used instead of asking the discovery proxy.
    #[serde(default)]
    pub static_backends: Vec<String>,

    #[serde(default = "default_source_tags")]
    #[validate(nested)]
    pub source_tags: Vec<SourceTagRule>,
}

impl FederationSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for FederationSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            self_prefix: default_self_prefix(),
            default_limit: default_page_limit(),
            static_backends: Vec::new(),
            source_tags: default_source_tags(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_otlp_endpoint")]
    #[validate(url)]
    pub endpoint: String,

    #[serde(default = "default_server_name")]
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            endpoint: default_otlp_endpoint(),
            service_name: default_server_name(),
        }
    }
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

fn default_server_name() -> String {
    DEFAULT_SERVER_NAME.to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_self_prefix() -> String {
    DEFAULT_SELF_PREFIX.to_string()
}

fn default_page_limit() -> usize {
    DEFAULT_PAGE_LIMIT
}

fn default_source_tags() -> Vec<SourceTagRule> {
    vec![
        SourceTagRule::new("mod-codex-ekb", Some("kb")),
        SourceTagRule::new("mod-codex-inventory", Some("local")),
        SourceTagRule::new("mock", None),
    ]
}

fn default_telemetry_enabled() -> bool {
    DEFAULT_TELEMETRY_ENABLED
}

fn default_otlp_endpoint() -> String {
    DEFAULT_OTLP_ENDPOINT.to_string()
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let builder = config::Config::builder();

        let builder = if std::path::Path::new(path).exists() {
            builder.add_source(config::File::with_name(path))
        } else {
            builder
        };

        // MUX_SERVER__LISTEN_ADDR maps to server.listen_addr
        let builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build().context("Failed to build configuration")?;

        let app_config: AppConfig = cfg
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed: {:?}", e))?;

        Ok(app_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.federation.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.federation.default_limit, 10);
        assert_eq!(config.federation.source_tags.len(), 3);
    }

    #[test]
    fn test_telemetry_endpoint_must_be_url() {
        let config = TelemetryConfig {
            endpoint: "not_a_url".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = AppConfig {
            federation: FederationSettings {
                request_timeout_ms: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
server:
  listen_addr: "127.0.0.1:9000"
federation:
  request_timeout_ms: 1500
  static_backends: ["mod-codex-ekb-1.0", "mock-a"]
  source_tags:
    - {{ prefix: "mod-codex-ekb", tag: "kb" }}
    - {{ prefix: "mock" }}
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.server.name, DEFAULT_SERVER_NAME);
        assert_eq!(config.federation.request_timeout_ms, 1500);
        assert_eq!(config.federation.static_backends.len(), 2);
        assert_eq!(
            config.federation.source_tags[1],
            SourceTagRule::new("mock", None)
        );
    }

    #[test]
    fn test_rules_deserialize_from_yaml_value() {
        let rules: Vec<SourceTagRule> =
            serde_yaml::from_str("- { prefix: a, tag: x }\n- { prefix: b, tag: null }").unwrap();
        assert_eq!(rules[0].tag.as_deref(), Some("x"));
        assert_eq!(rules[1].tag, None);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::from_file("/nonexistent/mux-config.yaml").unwrap();
        assert_eq!(config.server.listen_addr, DEFAULT_LISTEN_ADDR);
    }
}
