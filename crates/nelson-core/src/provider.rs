//! The fixed set of content providers the pipeline knows about.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "3dnews")]
    ThreeDNews,
    #[serde(rename = "disgustingmen")]
    DisgustingMen,
    #[serde(rename = "dtf")]
    Dtf,
    #[serde(rename = "epicgames")]
    EpicGames,
    #[serde(rename = "gamedevru")]
    GameDevRu,
    #[serde(rename = "ixbt")]
    Ixbt,
    #[serde(rename = "steam_developers")]
    SteamDevelopers,
    #[serde(rename = "stopgame")]
    StopGame,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown provider: {0}")]
pub struct UnknownProvider(pub String);

impl Provider {
    pub const ALL: [Provider; 8] = [
        Provider::ThreeDNews,
        Provider::DisgustingMen,
        Provider::Dtf,
        Provider::EpicGames,
        Provider::GameDevRu,
        Provider::Ixbt,
        Provider::SteamDevelopers,
        Provider::StopGame,
    ];

    /// Stable storage key. Part of the `(provider, fingerprint)` dedup key, so
    /// these strings must never change once items are stored.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::ThreeDNews => "3dnews",
            Provider::DisgustingMen => "disgustingmen",
            Provider::Dtf => "dtf",
            Provider::EpicGames => "epicgames",
            Provider::GameDevRu => "gamedevru",
            Provider::Ixbt => "ixbt",
            Provider::SteamDevelopers => "steam_developers",
            Provider::StopGame => "stopgame",
        }
    }

    /// Human-readable name used in outgoing messages.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Provider::ThreeDNews => "3DNews",
            Provider::DisgustingMen => "DisgustingMen",
            Provider::Dtf => "DTF",
            Provider::EpicGames => "Epic Games Store",
            Provider::GameDevRu => "GameDev.ru",
            Provider::Ixbt => "Ixbt Games",
            Provider::SteamDevelopers => "Steam Developer",
            Provider::StopGame => "StopGame",
        }
    }

    /// Name of the forum tag applied to threads created for this provider.
    #[must_use]
    pub fn forum_tag(self) -> &'static str {
        match self {
            Provider::ThreeDNews => "3Dnews",
            Provider::DisgustingMen => "Disgusting",
            Provider::Dtf => "DTF",
            Provider::EpicGames => "EGS",
            Provider::GameDevRu => "GameDev",
            Provider::Ixbt => "Ixbt",
            Provider::SteamDevelopers => "Steam",
            Provider::StopGame => "StopGame",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}
