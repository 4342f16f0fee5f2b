use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use crate::optimizer::PackingConfig;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub mode: RunMode,
    pub api: ApiConfig,
    pub loader: LoaderConfig,
    pub report: ReportConfig,
    pub optimizer: OptimizerConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            mode: RunMode::from_env(),
            api: ApiConfig::from_env(),
            loader: LoaderConfig::from_env(),
            report: ReportConfig::from_env(),
            optimizer: OptimizerConfig::from_env(),
        }
    }
}

/// What the binary does after startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Load both data sets once, pack them and print the report.
    Report,
    /// Serve the packing engine over HTTP.
    Serve,
}

impl RunMode {
    const VAR: &'static str = "FFD_PACKER_MODE";

    fn from_env() -> Self {
        env_string(Self::VAR)
            .and_then(|raw| Self::parse(&raw))
            .unwrap_or(RunMode::Report)
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "report" | "once" | "cli" => Some(RunMode::Report),
            "serve" | "server" | "api" => Some(RunMode::Serve),
            other => {
                eprintln!(
                    "⚠️ Unknown {} ('{}'). Expected 'report' or 'serve'. Using report.",
                    Self::VAR,
                    other
                );
                None
            }
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;

    fn from_env() -> Self {
        let host_value =
            env_string("FFD_PACKER_API_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse FFD_PACKER_API_HOST ('{}'): {}. Using {}.",
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match env_string("FFD_PACKER_API_PORT") {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    eprintln!(
                        "⚠️ FFD_PACKER_API_PORT must not be 0. Using {}.",
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    eprintln!(
                        "⚠️ Could not parse FFD_PACKER_API_PORT ('{}'): {}. Using {}.",
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

/// Configuration for loading the box and block data sets.
#[derive(Clone, Debug)]
pub struct LoaderConfig {
    boxes_source: String,
    blocks_source: String,
    http_timeout: Duration,
    max_download_bytes: Option<u64>,
    validate_input: bool,
}

impl LoaderConfig {
    pub const DEFAULT_BOXES_SOURCE: &'static str =
        "https://s3.amazonaws.com/se-code-challenge/boxes.json";
    pub const DEFAULT_BLOCKS_SOURCE: &'static str =
        "https://s3.amazonaws.com/se-code-challenge/blocks.json";
    const DEFAULT_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_MAX_DOWNLOAD_MB: u64 = 50;

    fn from_env() -> Self {
        let timeout_secs = load_u64_with_warning(
            "FFD_PACKER_HTTP_TIMEOUT_SECS",
            Self::DEFAULT_TIMEOUT_SECS,
            |value| value > 0,
            "must be greater than 0",
        );

        // 0 disables the limit.
        let max_download_mb = load_u64_with_warning(
            "FFD_PACKER_MAX_DOWNLOAD_MB",
            Self::DEFAULT_MAX_DOWNLOAD_MB,
            |_| true,
            "",
        );

        let validate_input = env_string("FFD_PACKER_VALIDATE_INPUT")
            .and_then(|raw| parse_bool(&raw, "FFD_PACKER_VALIDATE_INPUT"))
            .unwrap_or(true);

        Self {
            boxes_source: env_string("FFD_PACKER_BOXES_SOURCE")
                .unwrap_or_else(|| Self::DEFAULT_BOXES_SOURCE.to_string()),
            blocks_source: env_string("FFD_PACKER_BLOCKS_SOURCE")
                .unwrap_or_else(|| Self::DEFAULT_BLOCKS_SOURCE.to_string()),
            http_timeout: Duration::from_secs(timeout_secs),
            max_download_bytes: (max_download_mb > 0)
                .then(|| max_download_mb.saturating_mul(1024 * 1024)),
            validate_input,
        }
    }

    /// Creates a configuration for explicit sources, with default limits.
    #[allow(dead_code)]
    pub fn new(boxes_source: impl Into<String>, blocks_source: impl Into<String>) -> Self {
        Self {
            boxes_source: boxes_source.into(),
            blocks_source: blocks_source.into(),
            http_timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            max_download_bytes: Some(Self::DEFAULT_MAX_DOWNLOAD_MB * 1024 * 1024),
            validate_input: true,
        }
    }

    /// Overrides the payload limit (`None` disables it).
    #[allow(dead_code)]
    pub fn with_max_download_bytes(mut self, limit: Option<u64>) -> Self {
        self.max_download_bytes = limit;
        self
    }

    /// Enables or disables record validation after loading.
    #[allow(dead_code)]
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate_input = validate;
        self
    }

    /// URL or file path of the box data set.
    pub fn boxes_source(&self) -> &str {
        &self.boxes_source
    }

    /// URL or file path of the block data set.
    pub fn blocks_source(&self) -> &str {
        &self.blocks_source
    }

    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }

    pub fn max_download_bytes(&self) -> Option<u64> {
        self.max_download_bytes
    }

    pub fn validate_input(&self) -> bool {
        self.validate_input
    }
}

/// Configuration for the console report.
#[derive(Clone, Debug)]
pub struct ReportConfig {
    hide_output: bool,
}

impl ReportConfig {
    fn from_env() -> Self {
        Self {
            hide_output: env_string("FFD_PACKER_HIDE_OUTPUT")
                .and_then(|raw| parse_bool(&raw, "FFD_PACKER_HIDE_OUTPUT"))
                .unwrap_or(false),
        }
    }

    /// Suppresses printing of the missed report and the mappings.
    pub fn hide_output(&self) -> bool {
        self.hide_output
    }
}

/// Configuration for the packing engine.
#[derive(Clone, Debug)]
pub struct OptimizerConfig {
    packing: PackingConfig,
}

impl OptimizerConfig {
    const PRUNE_VAR: &'static str = "FFD_PACKER_PRUNE_DEGENERATE_LEFTOVERS";
    const CAPACITY_FACTOR_VAR: &'static str = "FFD_PACKER_POOL_CAPACITY_FACTOR";

    fn from_env() -> Self {
        let prune_degenerate_leftovers = env_string(Self::PRUNE_VAR)
            .and_then(|raw| parse_bool(&raw, Self::PRUNE_VAR))
            .unwrap_or(PackingConfig::DEFAULT_PRUNE_DEGENERATE_LEFTOVERS);

        let pool_capacity_factor = load_u64_with_warning(
            Self::CAPACITY_FACTOR_VAR,
            PackingConfig::DEFAULT_POOL_CAPACITY_FACTOR as u64,
            |value| (1..=64).contains(&value),
            "must be between 1 and 64",
        );

        let packing = PackingConfig::builder()
            .prune_degenerate_leftovers(prune_degenerate_leftovers)
            .pool_capacity_factor(pool_capacity_factor as usize)
            .build();

        Self { packing }
    }

    /// Returns the configured PackingConfig.
    pub fn packing_config(&self) -> PackingConfig {
        self.packing
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            eprintln!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name, err
            );
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            eprintln!(
                "⚠️ Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn load_u64_with_warning(
    var_name: &str,
    default: u64,
    validator: impl Fn(u64) -> bool,
    invalid_hint: &str,
) -> u64 {
    match env_string(var_name) {
        Some(raw) => parse_u64_with_warning(var_name, &raw, default, validator, invalid_hint),
        None => default,
    }
}

fn parse_u64_with_warning(
    var_name: &str,
    raw: &str,
    default: u64,
    validator: impl Fn(u64) -> bool,
    invalid_hint: &str,
) -> u64 {
    match raw.trim().parse::<u64>() {
        Ok(value) if validator(value) => value,
        Ok(_) => {
            eprintln!(
                "⚠️ {} contains invalid value '{}': {}. Using {}.",
                var_name, raw, invalid_hint, default
            );
            default
        }
        Err(err) => {
            eprintln!(
                "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }
    }
}
