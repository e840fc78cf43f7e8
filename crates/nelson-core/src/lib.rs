mod app_config;
mod config;
pub mod item;
pub mod normalize;
pub mod provider;
pub mod sources;

pub use app_config::{AppConfig, DeliveryConfig, DiscordConfig, Environment, TelegramConfig};
pub use config::{load_app_config, load_app_config_from_env};
pub use item::{ItemKey, NewsItem, RawRecord, StoredItem};
pub use normalize::{
    clean_html, extract_image_url, fingerprint, normalize_batch, normalize_record,
};
pub use provider::{Provider, UnknownProvider};
pub use sources::{load_sources_config, parse_sources_config, SourcesConfig};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sources file {path}: {source}")]
    SourcesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sources file: {0}")]
    SourcesFileParse(#[from] serde_yaml::Error),

    #[error("sources config validation failed: {0}")]
    Validation(String),
}
