use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Pacing and limits applied by every per-sink delivery queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryConfig {
    pub queue_capacity: usize,
    pub cadence_secs: u64,
    pub inter_task_delay_ms: u64,
    pub rate_limit_backoff_secs: u64,
    /// How many times one task may be re-enqueued after a rate-limit signal.
    pub max_rate_limit_retries: u32,
    pub sink_timeout_secs: u64,
    /// Budget for downloading an item's image before the post is sent
    /// without it.
    pub media_timeout_secs: u64,
    pub max_attachment_bytes: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 500,
            cadence_secs: 5,
            inter_task_delay_ms: 1_000,
            rate_limit_backoff_secs: 10,
            max_rate_limit_retries: 1,
            sink_timeout_secs: 15,
            media_timeout_secs: 5,
            max_attachment_bytes: 25 * 1024 * 1024,
        }
    }
}

impl DeliveryConfig {
    #[must_use]
    pub fn cadence(&self) -> Duration {
        Duration::from_secs(self.cadence_secs)
    }

    #[must_use]
    pub fn inter_task_delay(&self) -> Duration {
        Duration::from_millis(self.inter_task_delay_ms)
    }

    #[must_use]
    pub fn rate_limit_backoff(&self) -> Duration {
        Duration::from_secs(self.rate_limit_backoff_secs)
    }

    #[must_use]
    pub fn sink_timeout(&self) -> Duration {
        Duration::from_secs(self.sink_timeout_secs)
    }

    #[must_use]
    pub fn media_timeout(&self) -> Duration {
        Duration::from_secs(self.media_timeout_secs)
    }

    /// Upper bound on one whole delivery: the image download followed by the
    /// sink's own request.
    #[must_use]
    pub fn delivery_timeout(&self) -> Duration {
        self.media_timeout() + self.sink_timeout()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct DiscordConfig {
    pub bot_token: String,
    pub forum_channel_id: String,
    pub api_base: String,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("bot_token", &"[redacted]")
            .field("forum_channel_id", &self.forum_channel_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub channel_id: String,
    pub api_base: String,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"[redacted]")
            .field("channel_id", &self.channel_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub sources_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub store_query_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub fetch_user_agent: String,
    pub ingest_interval_secs: u64,
    pub delivery: DeliveryConfig,
    /// `None` when the forum sink is disabled or not configured.
    pub discord: Option<DiscordConfig>,
    /// `None` when the broadcast sink is disabled or not configured.
    pub telegram: Option<TelegramConfig>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("sources_path", &self.sources_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("store_query_timeout_secs", &self.store_query_timeout_secs)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("fetch_user_agent", &self.fetch_user_agent)
            .field("ingest_interval_secs", &self.ingest_interval_secs)
            .field("delivery", &self.delivery)
            .field("discord", &self.discord)
            .field("telegram", &self.telegram)
            .finish()
    }
}
