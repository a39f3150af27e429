use std::time::Duration;

pub const DEFAULT_OVERPASS_ENDPOINTS: &[&str] = &[
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
    "https://z.overpass-api.de/api/interpreter",
];

pub const DEFAULT_TRIPADVISOR_BASE_URL: &str = "https://api.content.tripadvisor.com/api/v1";

pub const DEFAULT_USER_AGENT: &str = "TOOL_SERVER/1.0 (contact: ops@example.com)";

pub const DEFAULT_MODEL_NAME: &str = "facebook/mbart-large-50-many-to-many-mmt";

pub const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";

pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Which tools a deployment registers. The front-end is the same for all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ToolSet {
    /// Time plus OpenStreetMap search via Overpass mirrors.
    Osm,
    /// Time plus TripAdvisor Content API lookups.
    Tripadvisor,
    /// Time, OpenStreetMap, Japanese translation, and ping.
    Joint,
    /// Japanese-to-English translation only.
    Translator,
    /// Calculator, local clock and Open-Meteo weather.
    Local,
}

impl ToolSet {
    pub fn service_name(&self) -> &'static str {
        match self {
            ToolSet::Osm => "time-and-osm",
            ToolSet::Tripadvisor => "time-and-tripadvisor",
            ToolSet::Joint => "translator-and-osm",
            ToolSet::Translator => "japanese-translator",
            ToolSet::Local => "local-tools",
        }
    }

    /// Whether this deployment loads the translation model at startup.
    pub fn needs_model(&self) -> bool {
        matches!(self, ToolSet::Joint | ToolSet::Translator)
    }
}

/// Retry shape for the mirror-failover executor.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Full passes over the endpoint pool before giving up.
    pub rounds: u32,
    /// Sleep after round `r` is `backoff_unit * 2^r`, capped.
    pub backoff_unit: Duration,
    pub backoff_cap: Duration,
    /// Shuffle the pool once per call.
    pub shuffle: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            rounds: 4,
            backoff_unit: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(6),
            shuffle: true,
        }
    }
}

impl RetryPolicy {
    /// Delay after the given 1-indexed round.
    pub fn backoff(&self, round: u32) -> Duration {
        let factor = 2u32.saturating_pow(round);
        self.backoff_unit
            .checked_mul(factor)
            .unwrap_or(self.backoff_cap)
            .min(self.backoff_cap)
    }
}

/// HTTP budgets, mapped onto what reqwest can enforce.
///
/// reqwest has no separate write or pool-acquisition deadline. Acquiring a
/// connection either reuses an idle one or dials a new one under `connect`;
/// sending the body is bounded by the per-request cap from [`total`].
///
/// [`total`]: HttpTimeouts::total
#[derive(Debug, Clone)]
pub struct HttpTimeouts {
    /// TCP + TLS establishment (`connect_timeout`).
    pub connect: Duration,
    /// Gap between reads of the response (`read_timeout`).
    pub read: Duration,
    /// Allowance for sending the request. Only feeds [`HttpTimeouts::total`].
    pub write: Duration,
    /// How long an idle pooled connection is kept for reuse (`pool_idle_timeout`).
    pub pool_idle: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            read: Duration::from_secs(20),
            write: Duration::from_secs(10),
            pool_idle: Duration::from_secs(5),
        }
    }
}

impl HttpTimeouts {
    /// Upper bound for one complete request/response exchange.
    pub fn total(&self) -> Duration {
        self.connect + self.write + self.read
    }
}

/// Process configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub service_name: String,
    pub tool_set: ToolSet,
    pub overpass_endpoints: Vec<String>,
    pub user_agent: String,
    pub retry: RetryPolicy,
    pub timeouts: HttpTimeouts,
    pub tripadvisor_base_url: String,
    pub tripadvisor_api_key: Option<String>,
    /// Per-result cap on the optional detail lookups of a TripAdvisor search.
    pub tripadvisor_detail_timeout: Duration,
    pub weather_geocoding_url: String,
    pub weather_forecast_url: String,
    pub translator_url: Option<String>,
    pub model_name: String,
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
    /// Advertised in the OpenAPI document.
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service_name: ToolSet::Joint.service_name().into(),
            tool_set: ToolSet::Joint,
            overpass_endpoints: DEFAULT_OVERPASS_ENDPOINTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            user_agent: DEFAULT_USER_AGENT.into(),
            retry: RetryPolicy::default(),
            timeouts: HttpTimeouts::default(),
            tripadvisor_base_url: DEFAULT_TRIPADVISOR_BASE_URL.into(),
            tripadvisor_api_key: None,
            tripadvisor_detail_timeout: Duration::from_secs(5),
            weather_geocoding_url: DEFAULT_GEOCODING_URL.into(),
            weather_forecast_url: DEFAULT_FORECAST_URL.into(),
            translator_url: None,
            model_name: DEFAULT_MODEL_NAME.into(),
            allowed_origins: Vec::new(),
            public_url: "http://localhost:8001".into(),
        }
    }
}

impl ServerConfig {
    pub fn for_tool_set(tool_set: ToolSet) -> Self {
        Self {
            service_name: tool_set.service_name().into(),
            tool_set,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backoff_schedule() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (1..=4).map(|r| policy.backoff(r).as_secs()).collect();
        assert_eq!(delays, vec![2, 4, 6, 6]);
    }

    #[test]
    fn backoff_saturates_on_huge_rounds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(64), Duration::from_secs(6));
    }

    #[test]
    fn tool_set_names() {
        assert_eq!(ServerConfig::for_tool_set(ToolSet::Osm).service_name, "time-and-osm");
        assert!(ToolSet::Joint.needs_model());
        assert!(!ToolSet::Tripadvisor.needs_model());
        assert!(ToolSet::Translator.needs_model());
        assert!(!ToolSet::Local.needs_model());
        assert_eq!(ToolSet::Local.service_name(), "local-tools");
    }

    #[test]
    fn request_cap_covers_every_phase() {
        let t = HttpTimeouts::default();
        assert_eq!(t.total(), t.connect + t.write + t.read);
        assert_eq!(t.total(), Duration::from_secs(35));
        assert_eq!(t.pool_idle, Duration::from_secs(5));
    }
}
