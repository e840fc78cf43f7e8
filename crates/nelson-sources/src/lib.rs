//! Source providers: fetch one external site each and hand back raw records.

pub mod error;
pub mod fetcher;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod rss;

pub use error::{SourceError, SourceErrorKind};
pub use fetcher::HttpFetcher;
pub use provider::SourceProvider;
pub use registry::{build_enabled, build_provider};
