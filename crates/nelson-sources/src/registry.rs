//! Maps provider identities to their implementations.

use std::sync::Arc;

use nelson_core::{Provider, SourcesConfig};

use crate::fetcher::HttpFetcher;
use crate::provider::SourceProvider;
use crate::providers::{
    DisgustingMenSource, DtfSource, EpicGamesSource, GameDevSource, IxbtSource, SteamSource,
    StopGameSource, ThreeDNewsSource,
};

/// Build the implementation for one provider. All providers share `fetcher`'s
/// connection pool.
#[must_use]
pub fn build_provider(provider: Provider, fetcher: HttpFetcher) -> Arc<dyn SourceProvider> {
    match provider {
        Provider::ThreeDNews => Arc::new(ThreeDNewsSource::new(fetcher)),
        Provider::DisgustingMen => Arc::new(DisgustingMenSource::new(fetcher)),
        Provider::Dtf => Arc::new(DtfSource::new(fetcher)),
        Provider::EpicGames => Arc::new(EpicGamesSource::new(fetcher)),
        Provider::GameDevRu => Arc::new(GameDevSource::new(fetcher)),
        Provider::Ixbt => Arc::new(IxbtSource::new(fetcher)),
        Provider::SteamDevelopers => Arc::new(SteamSource::new(fetcher)),
        Provider::StopGame => Arc::new(StopGameSource::new(fetcher)),
    }
}

/// Implementations for every provider enabled in `sources`, in registry order.
#[must_use]
pub fn build_enabled(
    sources: &SourcesConfig,
    fetcher: &HttpFetcher,
) -> Vec<Arc<dyn SourceProvider>> {
    sources
        .enabled()
        .into_iter()
        .map(|provider| build_provider(provider, fetcher.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(5, "nelson-test").unwrap()
    }

    #[test]
    fn every_provider_builds_with_matching_identity() {
        for provider in Provider::ALL {
            assert_eq!(build_provider(provider, fetcher()).provider(), provider);
        }
    }

    #[test]
    fn build_enabled_follows_sources_config() {
        let sources = nelson_core::parse_sources_config(
            "providers:\n  dtf: true\n  stopgame: true\n  ixbt: false\n",
        )
        .unwrap();
        let built: Vec<Provider> = build_enabled(&sources, &fetcher())
            .iter()
            .map(|p| p.provider())
            .collect();
        assert_eq!(built, vec![Provider::Dtf, Provider::StopGame]);
    }
}
