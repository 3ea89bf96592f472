use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use docsum_core::InvocationMode;

/// Config file consulted by [`AppConfig::from_env`] when `DOCSUM_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/docsum.toml";

/// Claude 3.5 Haiku through the US cross-region inference profile.
pub const DEFAULT_MODEL_ID: &str = "us.anthropic.claude-3-5-haiku-20241022-v1:0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    pub region: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
        }
    }
}

// ── Proxy (Lambda) ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// ARN of the AgentCore runtime that summarizes documents.
    pub runtime_arn: String,
    /// Plain HTTP endpoint of a runtime (e.g. `http://localhost:8080`).
    /// When set it takes precedence over `runtime_arn`; used for local runs.
    pub runtime_endpoint: String,
    /// Endpoint qualifier passed with AgentCore invocations.
    pub qualifier: String,
    /// Mode requested from the runtime for every record.
    pub mode: InvocationMode,
    pub timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            runtime_arn: String::new(),
            runtime_endpoint: String::new(),
            qualifier: "DEFAULT".to_string(),
            mode: InvocationMode::Sync,
            timeout_secs: 300,
        }
    }
}

// ── Runtime (agent service) ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub bind_addr: String,
    /// Bucket used when an invocation payload omits one.
    pub default_bucket: String,
    /// AgentCore memory id.  Empty disables long-term memory entirely.
    pub memory_id: String,
    pub model_id: String,
    /// Documents larger than this are rejected before download.
    pub max_file_bytes: u64,
    /// Number of facts requested from the memory service per document.
    pub retrieval_top_k: u32,
    /// Facts scoring below this relevance are not shown to the model.
    pub retrieval_min_score: f64,
    pub max_tool_rounds: usize,
    pub max_tokens: i32,
    /// Language the summary is written in.
    pub summary_language: String,
    /// Mode used when the payload does not name one.
    pub default_mode: InvocationMode,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            default_bucket: String::new(),
            memory_id: String::new(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            max_file_bytes: 10 * 1024 * 1024,
            retrieval_top_k: 10,
            retrieval_min_score: 0.5,
            max_tool_rounds: 8,
            max_tokens: 2048,
            summary_language: "Japanese".to_string(),
            default_mode: InvocationMode::Sync,
        }
    }
}

impl RuntimeConfig {
    pub fn memory_enabled(&self) -> bool {
        !self.memory_id.trim().is_empty()
    }
}

// ── Provisioning ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Prefix for generated memory names (`{prefix}_{unix_seconds}`).
    pub name_prefix: String,
    pub poll_interval_secs: u64,
    pub timeout_secs: u64,
    /// Days raw events are retained before expiring.
    pub event_expiry_days: u32,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            name_prefix: "docsum".to_string(),
            poll_interval_secs: 5,
            timeout_secs: 300,
            event_expiry_days: 90,
        }
    }
}

// ── Telemetry ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive, e.g. `info` or `docsum_runtime=debug,info`.
    pub log_level: String,
    /// Emit one JSON object per line (CloudWatch friendly).
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

impl TelemetryConfig {
    /// Install the global tracing subscriber.  `RUST_LOG` wins over
    /// `log_level` when set.
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.log_level.as_str()));
        let builder = tracing_subscriber::fmt().with_env_filter(filter);
        // A second init (tests, embedded use) keeps the first subscriber.
        let _ = if self.json {
            builder.json().with_current_span(false).try_init()
        } else {
            builder.try_init()
        };
    }
}

// ── AppConfig ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub aws: AwsConfig,
    pub proxy: ProxyConfig,
    pub runtime: RuntimeConfig,
    pub provision: ProvisionConfig,
    pub telemetry: TelemetryConfig,
    #[serde(skip)]
    warnings: Vec<String>,
}

impl AppConfig {
    /// Read `path` when it exists, then apply environment overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, |name| env::var(name).ok())
    }

    /// [`load_from`](Self::load_from) on `$DOCSUM_CONFIG` or [`DEFAULT_CONFIG_PATH`].
    pub fn from_env() -> Result<Self> {
        let path = env::var("DOCSUM_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(path)
    }

    pub fn load_with(
        path: impl AsRef<Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }
        config.apply_overrides(lookup);
        Ok(config)
    }

    /// Defaults plus overrides, no file.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        config.apply_overrides(lookup);
        config
    }

    /// Apply environment-style overrides.  Empty values are ignored; values
    /// that fail to parse keep the current setting and are reported through
    /// [`warnings`](Self::warnings).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("AWS_REGION") {
            self.aws.region = v;
        }

        // Proxy
        if let Some(v) = get("AGENTCORE_RUNTIME_ARN").or_else(|| get("AGENTCORE_RUNTIME_ID")) {
            self.proxy.runtime_arn = v;
        }
        if let Some(v) = get("AGENTCORE_RUNTIME_ENDPOINT") {
            self.proxy.runtime_endpoint = v;
        }
        if let Some(v) = get("AGENTCORE_RUNTIME_QUALIFIER") {
            self.proxy.qualifier = v;
        }
        if let Some(v) = get("INVOCATION_MODE") {
            match InvocationMode::from_name(&v) {
                Some(mode) => self.proxy.mode = mode,
                None => self.warn_invalid("INVOCATION_MODE", &v),
            }
        }
        self.parse_into("RUNTIME_TIMEOUT_SECS", get("RUNTIME_TIMEOUT_SECS"), |c, v: u64| {
            c.proxy.timeout_secs = v
        });

        // Runtime
        if let Some(v) = get("BIND_ADDR") {
            self.runtime.bind_addr = v;
        }
        if let Some(v) = get("S3_BUCKET_NAME") {
            self.runtime.default_bucket = v;
        }
        if let Some(v) = get("AGENTCORE_MEMORY_ID") {
            self.runtime.memory_id = v;
        }
        if let Some(v) = get("BEDROCK_MODEL_ID") {
            self.runtime.model_id = v;
        }
        if let Some(v) = get("SUMMARY_LANGUAGE") {
            self.runtime.summary_language = v;
        }
        if let Some(v) = get("DEFAULT_INVOCATION_MODE") {
            match InvocationMode::from_name(&v) {
                Some(mode) => self.runtime.default_mode = mode,
                None => self.warn_invalid("DEFAULT_INVOCATION_MODE", &v),
            }
        }
        self.parse_into("MAX_FILE_BYTES", get("MAX_FILE_BYTES"), |c, v: u64| {
            c.runtime.max_file_bytes = v
        });
        self.parse_into("RETRIEVAL_TOP_K", get("RETRIEVAL_TOP_K"), |c, v: u32| {
            c.runtime.retrieval_top_k = v
        });
        self.parse_into("RETRIEVAL_MIN_SCORE", get("RETRIEVAL_MIN_SCORE"), |c, v: f64| {
            c.runtime.retrieval_min_score = v
        });
        self.parse_into("MAX_TOOL_ROUNDS", get("MAX_TOOL_ROUNDS"), |c, v: usize| {
            c.runtime.max_tool_rounds = v
        });
        self.parse_into("MAX_TOKENS", get("MAX_TOKENS"), |c, v: i32| c.runtime.max_tokens = v);

        // Telemetry
        if let Some(v) = get("LOG_LEVEL") {
            self.telemetry.log_level = v;
        }
        if let Some(v) = get("LOG_FORMAT") {
            self.telemetry.json = v.eq_ignore_ascii_case("json");
        }
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn parse_into<T: FromStr>(
        &mut self,
        name: &str,
        raw: Option<String>,
        apply: impl FnOnce(&mut Self, T),
    ) {
        let Some(raw) = raw else { return };
        match raw.trim().parse::<T>() {
            Ok(value) => apply(self, value),
            Err(_) => self.warn_invalid(name, &raw),
        }
    }

    fn warn_invalid(&mut self, name: &str, value: &str) {
        self.warnings
            .push(format!("ignoring invalid {name}={value:?}; keeping default"));
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
