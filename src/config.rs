use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::Path;

use crate::advisory::FailPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub treasury: TreasuryConfig,
    #[serde(default)]
    pub round: RoundConfig,
    #[serde(default)]
    pub strategies: StrategiesConfig,
    #[serde(default)]
    pub advisory: AdvisoryConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub reputation: ReputationConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Gamma REST endpoint for market discovery
    #[serde(default = "default_gamma_url")]
    pub gamma_url: String,
    /// CLOB REST endpoint for order books
    #[serde(default = "default_clob_url")]
    pub clob_url: String,
    /// Maximum markets fetched per snapshot
    #[serde(default = "default_markets_limit")]
    pub markets_limit: usize,
    /// Minimum lifetime volume (USD) for a market to be tradeable
    #[serde(default = "default_min_volume")]
    pub min_volume_usd: Decimal,
    /// Only markets that started within this many days
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    /// Order book mid-price cache TTL in seconds
    #[serde(default = "default_price_cache_ttl")]
    pub price_cache_ttl_secs: u64,
}

fn default_gamma_url() -> String {
    "https://gamma-api.polymarket.com".to_string()
}

fn default_clob_url() -> String {
    "https://clob.polymarket.com".to_string()
}

fn default_markets_limit() -> usize {
    100
}

fn default_min_volume() -> Decimal {
    dec!(1000)
}

fn default_lookback_days() -> i64 {
    30
}

fn default_price_cache_ttl() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            gamma_url: default_gamma_url(),
            clob_url: default_clob_url(),
            markets_limit: default_markets_limit(),
            min_volume_usd: default_min_volume(),
            lookback_days: default_lookback_days(),
            price_cache_ttl_secs: default_price_cache_ttl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreasuryConfig {
    /// Opening cash for the shared treasury (USD)
    #[serde(default = "default_initial_cash")]
    pub initial_cash: Decimal,
}

fn default_initial_cash() -> Decimal {
    dec!(1000)
}

impl Default for TreasuryConfig {
    fn default() -> Self {
        Self {
            initial_cash: default_initial_cash(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoundConfig {
    /// Seconds between round starts
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Deadline for all strategies to return proposals
    #[serde(default = "default_proposal_timeout")]
    pub proposal_timeout_ms: u64,
    /// Stop after this many rounds (0 = run until shutdown)
    #[serde(default)]
    pub max_rounds: u64,
    /// Markets offered to each strategy per round
    #[serde(default = "default_markets_per_strategy")]
    pub markets_per_strategy: usize,
}

fn default_interval_secs() -> u64 {
    300
}

fn default_proposal_timeout() -> u64 {
    20_000
}

fn default_markets_per_strategy() -> usize {
    20
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            proposal_timeout_ms: default_proposal_timeout(),
            max_rounds: 0,
            markets_per_strategy: default_markets_per_strategy(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategiesConfig {
    /// Enabled strategy kinds by name
    #[serde(default = "default_enabled_strategies")]
    pub enabled: Vec<String>,
}

fn default_enabled_strategies() -> Vec<String> {
    vec![
        "momentum".to_string(),
        "contrarian".to_string(),
        "value".to_string(),
        "whale".to_string(),
    ]
}

impl Default for StrategiesConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_strategies(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdvisoryConfig {
    /// Consult the advisory model before execution
    #[serde(default)]
    pub enabled: bool,
    /// OpenAI-compatible chat endpoint base URL
    #[serde(default = "default_advisory_base_url")]
    pub base_url: String,
    /// Chat model name
    #[serde(default = "default_advisory_model")]
    pub model: String,
    /// Per-verdict timeout in milliseconds
    #[serde(default = "default_advisory_timeout")]
    pub timeout_ms: u64,
    /// Completion token cap
    #[serde(default = "default_advisory_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature
    #[serde(default = "default_advisory_temperature")]
    pub temperature: f64,
    /// Verdict on advisory timeout or malformed response
    #[serde(default)]
    pub fail_policy: FailPolicy,
}

fn default_advisory_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_advisory_model() -> String {
    "llama3.2".to_string()
}

fn default_advisory_timeout() -> u64 {
    20_000
}

fn default_advisory_max_tokens() -> u32 {
    512
}

fn default_advisory_temperature() -> f64 {
    0.3
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_advisory_base_url(),
            model: default_advisory_model(),
            timeout_ms: default_advisory_timeout(),
            max_tokens: default_advisory_max_tokens(),
            temperature: default_advisory_temperature(),
            fail_policy: FailPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// CLOB REST endpoint for order submission
    #[serde(default = "default_clob_url")]
    pub clob_url: String,
    /// Simulate fills instead of submitting real orders
    #[serde(default)]
    pub paper: bool,
    /// Order submission timeout in milliseconds
    #[serde(default = "default_order_timeout")]
    pub order_timeout_ms: u64,
    /// Venue minimum order size in cash terms (USD)
    #[serde(default = "default_min_order_cash")]
    pub min_order_cash: Decimal,
}

fn default_order_timeout() -> u64 {
    5000
}

fn default_min_order_cash() -> Decimal {
    dec!(1)
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            clob_url: default_clob_url(),
            paper: false,
            order_timeout_ms: default_order_timeout(),
            min_order_cash: default_min_order_cash(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReputationConfig {
    /// Weight assigned to a strategy on first sight
    #[serde(default = "default_initial_weight")]
    pub initial_weight: Decimal,
    /// Weight increase after a profitable round
    #[serde(default = "default_gain_step")]
    pub gain_step: Decimal,
    /// Weight decrease after a losing round
    #[serde(default = "default_loss_step")]
    pub loss_step: Decimal,
    /// Extra decrease when most of a round's proposals were rejected
    #[serde(default = "default_rejection_step")]
    pub rejection_step: Decimal,
    /// Weight floor
    #[serde(default)]
    pub min_weight: Decimal,
    /// Weight ceiling
    #[serde(default = "default_max_weight")]
    pub max_weight: Decimal,
}

fn default_initial_weight() -> Decimal {
    Decimal::ONE
}

fn default_gain_step() -> Decimal {
    dec!(0.05)
}

fn default_loss_step() -> Decimal {
    dec!(0.05)
}

fn default_rejection_step() -> Decimal {
    dec!(0.02)
}

fn default_max_weight() -> Decimal {
    dec!(2)
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            initial_weight: default_initial_weight(),
            gain_step: default_gain_step(),
            loss_step: default_loss_step(),
            rejection_step: default_rejection_step(),
            min_weight: Decimal::ZERO,
            max_weight: default_max_weight(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Directory for per-run result files
    #[serde(default = "default_report_dir")]
    pub dir: String,
}

fn default_report_dir() -> String {
    "results".to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            dir: default_report_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Also write daily log files into this directory
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("GAMBIT_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (GAMBIT_ROUND__INTERVAL_SECS, etc.)
            .add_source(
                Environment::with_prefix("GAMBIT")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Create a default configuration for CLI usage
    pub fn default_config(paper: bool) -> Self {
        let mut cfg = Self::default();
        cfg.gateway.paper = paper;
        cfg
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        // Treasury
        if self.treasury.initial_cash <= Decimal::ZERO {
            errors.push("treasury.initial_cash must be positive".to_string());
        }

        // Round cadence
        if self.round.interval_secs == 0 {
            errors.push("round.interval_secs must be at least 1".to_string());
        }
        if self.round.proposal_timeout_ms == 0 {
            errors.push("round.proposal_timeout_ms must be positive".to_string());
        }
        if self.round.proposal_timeout_ms > self.round.interval_secs * 1000 {
            errors.push(format!(
                "round.proposal_timeout_ms ({}) exceeds the round interval ({}s)",
                self.round.proposal_timeout_ms, self.round.interval_secs
            ));
        }
        if self.round.markets_per_strategy == 0 {
            errors.push("round.markets_per_strategy must be positive".to_string());
        }

        // Strategy roster
        if self.strategies.enabled.is_empty() {
            errors.push("strategies.enabled must name at least one strategy".to_string());
        }

        // Endpoints
        for (field, value) in [
            ("provider.gamma_url", &self.provider.gamma_url),
            ("provider.clob_url", &self.provider.clob_url),
            ("gateway.clob_url", &self.gateway.clob_url),
        ] {
            if url::Url::parse(value).is_err() {
                errors.push(format!("{field} is not a valid URL: {value}"));
            }
        }
        if self.advisory.enabled {
            if url::Url::parse(&self.advisory.base_url).is_err() {
                errors.push(format!(
                    "advisory.base_url is not a valid URL: {}",
                    self.advisory.base_url
                ));
            }
            if self.advisory.timeout_ms == 0 {
                errors.push("advisory.timeout_ms must be positive".to_string());
            }
        }

        // Provider filters
        if self.provider.markets_limit == 0 {
            errors.push("provider.markets_limit must be positive".to_string());
        }
        if self.provider.min_volume_usd < Decimal::ZERO {
            errors.push("provider.min_volume_usd must not be negative".to_string());
        }

        // Gateway
        if self.gateway.order_timeout_ms == 0 {
            errors.push("gateway.order_timeout_ms must be positive".to_string());
        }
        if self.gateway.min_order_cash < Decimal::ZERO {
            errors.push("gateway.min_order_cash must not be negative".to_string());
        }

        // Reputation bounds
        if self.reputation.min_weight < Decimal::ZERO {
            errors.push("reputation.min_weight must not be negative".to_string());
        }
        if self.reputation.max_weight > dec!(2) {
            errors.push("reputation.max_weight must not exceed 2".to_string());
        }
        if self.reputation.min_weight >= self.reputation.max_weight {
            errors.push("reputation.min_weight must be below max_weight".to_string());
        }
        if self.reputation.initial_weight < self.reputation.min_weight
            || self.reputation.initial_weight > self.reputation.max_weight
        {
            errors.push("reputation.initial_weight must lie within the weight bounds".to_string());
        }
        for (field, step) in [
            ("reputation.gain_step", self.reputation.gain_step),
            ("reputation.loss_step", self.reputation.loss_step),
            ("reputation.rejection_step", self.reputation.rejection_step),
        ] {
            if step < Decimal::ZERO {
                errors.push(format!("{field} must not be negative"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
