//! Storage regions and their base URLs

use crate::error::{Error, Result};
use reqwest::Url;
use std::fmt;
use std::str::FromStr;

/// Regional Edge Storage endpoint
///
/// `Unset` is the zero value: it is what [`Endpoint::parse`] returns for input
/// it does not recognize, and it never passes config validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endpoint {
    #[default]
    Unset,
    Falkenstein,
    London,
    Stockholm,
    NewYork,
    LosAngeles,
    Singapore,
    Sydney,
    SaoPaulo,
    Johannesburg,
}

impl Endpoint {
    /// Every valid region, in declaration order.
    pub const ALL: [Endpoint; 9] = [
        Endpoint::Falkenstein,
        Endpoint::London,
        Endpoint::Stockholm,
        Endpoint::NewYork,
        Endpoint::LosAngeles,
        Endpoint::Singapore,
        Endpoint::Sydney,
        Endpoint::SaoPaulo,
        Endpoint::Johannesburg,
    ];

    /// Parse a region name, short code, or base URL.
    ///
    /// Unrecognized input yields [`Endpoint::Unset`]; use [`str::parse`] for
    /// an error instead.
    pub fn parse(s: &str) -> Self {
        let needle = s.trim().trim_end_matches('/').to_ascii_lowercase();

        Self::ALL
            .into_iter()
            .find(|e| e.aliases().contains(&needle.as_str()) || e.as_str() == needle)
            .unwrap_or_default()
    }

    /// True for every region except [`Endpoint::Unset`].
    pub fn is_valid(&self) -> bool {
        !matches!(self, Endpoint::Unset)
    }

    /// Canonical base URL, or an empty string for [`Endpoint::Unset`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Unset => "",
            Endpoint::Falkenstein => "https://storage.bunnycdn.com",
            Endpoint::London => "https://uk.storage.bunnycdn.com",
            Endpoint::Stockholm => "https://se.storage.bunnycdn.com",
            Endpoint::NewYork => "https://ny.storage.bunnycdn.com",
            Endpoint::LosAngeles => "https://la.storage.bunnycdn.com",
            Endpoint::Singapore => "https://sg.storage.bunnycdn.com",
            Endpoint::Sydney => "https://syd.storage.bunnycdn.com",
            Endpoint::SaoPaulo => "https://br.storage.bunnycdn.com",
            Endpoint::Johannesburg => "https://jh.storage.bunnycdn.com",
        }
    }

    /// Base URL of the region.
    pub fn url(&self) -> Result<Url> {
        if !self.is_valid() {
            return Err(Error::EndpointRequired);
        }

        Url::parse(self.as_str()).map_err(|e| Error::InvalidEndpoint(format!("{}: {}", self.as_str(), e)))
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Endpoint::Unset => &[],
            Endpoint::Falkenstein => &["falkenstein", "de"],
            Endpoint::London => &["london", "uk"],
            Endpoint::Stockholm => &["stockholm", "se"],
            Endpoint::NewYork => &["new-york", "newyork", "ny"],
            Endpoint::LosAngeles => &["los-angeles", "losangeles", "la"],
            Endpoint::Singapore => &["singapore", "sg"],
            Endpoint::Sydney => &["sydney", "syd"],
            Endpoint::SaoPaulo => &["sao-paulo", "saopaulo", "br"],
            Endpoint::Johannesburg => &["johannesburg", "jh"],
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(Error::EndpointRequired);
        }

        match Endpoint::parse(s) {
            Endpoint::Unset => Err(Error::InvalidEndpoint(s.to_string())),
            endpoint => Ok(endpoint),
        }
    }
}
