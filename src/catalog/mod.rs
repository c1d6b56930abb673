//! Upstream short-drama catalogs
//!
//! Three third-party APIs are aggregated. Melolo is also relayed verbatim
//! under `/api/home|detail|video`; all three are reshaped into
//! [`models::DramaCard`] pages for `/api/catalog/{source}`.

pub mod browse;
pub mod client;
pub mod models;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::SourceError;

pub use browse::{BrowseState, ViewMode};
pub use client::CatalogClient;
pub use models::{CatalogDetail, CatalogPage, DramaCard, DramaDetail};

/// How a source pages through its listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// `offset` counts items already shown
    Offset,
    /// 1-based page number
    Page,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    #[default]
    Melolo,
    Dramabox,
    Netshort,
}

impl CatalogSource {
    pub const ALL: [CatalogSource; 3] = [Self::Melolo, Self::Dramabox, Self::Netshort];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Melolo => "melolo",
            Self::Dramabox => "dramabox",
            Self::Netshort => "netshort",
        }
    }

    /// Name shown to users and used as the card author when upstream has none
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Melolo => "Melolo",
            Self::Dramabox => "DramaBox",
            Self::Netshort => "NetShort",
        }
    }

    pub fn pagination(self) -> Pagination {
        match self {
            Self::Melolo | Self::Netshort => Pagination::Offset,
            Self::Dramabox => Pagination::Page,
        }
    }
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CatalogSource {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "melolo" => Ok(Self::Melolo),
            "dramabox" => Ok(Self::Dramabox),
            "netshort" => Ok(Self::Netshort),
            _ => Err(SourceError::UnknownSource {
                name: s.to_string(),
            }),
        }
    }
}
