//! The fixed set of supported assets and their provider routing.

use crate::error::CycleError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// First calendar day covered by every ingested series (2005-01-01).
pub const EPOCH: NaiveDate = match NaiveDate::from_ymd_opt(2005, 1, 1) {
    Some(d) => d,
    None => panic!("invalid epoch"),
};

/// Which provider family serves an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    /// Price history (equity index, crypto, commodity, REIT proxy).
    Market,
    /// Policy/interest rate level series.
    Rate,
}

impl AssetKind {
    /// Raw provider column reduced to the single value column on ingest.
    pub fn value_column(self) -> &'static str {
        match self {
            AssetKind::Market => "close",
            AssetKind::Rate => "value",
        }
    }
}

/// A supported asset key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKey {
    Sp500,
    Kospi,
    Bitcoin,
    Gold,
    RealEstate,
    UsInterest,
    KrInterest,
}

impl AssetKey {
    /// All supported assets, in batch update order.
    pub const ALL: [AssetKey; 7] = [
        AssetKey::Sp500,
        AssetKey::Kospi,
        AssetKey::Bitcoin,
        AssetKey::Gold,
        AssetKey::RealEstate,
        AssetKey::UsInterest,
        AssetKey::KrInterest,
    ];

    /// Snapshot file stem and table column name.
    pub fn as_str(self) -> &'static str {
        match self {
            AssetKey::Sp500 => "sp500",
            AssetKey::Kospi => "kospi",
            AssetKey::Bitcoin => "bitcoin",
            AssetKey::Gold => "gold",
            AssetKey::RealEstate => "real_estate",
            AssetKey::UsInterest => "us_interest",
            AssetKey::KrInterest => "kr_interest",
        }
    }

    /// Symbol or series id understood by the provider.
    pub fn provider_symbol(self) -> &'static str {
        match self {
            AssetKey::Sp500 => "^GSPC",
            AssetKey::Kospi => "^KS11",
            AssetKey::Bitcoin => "BTC-USD",
            AssetKey::Gold => "GC=F",
            AssetKey::RealEstate => "VNQ",
            AssetKey::UsInterest => "FEDFUNDS",
            AssetKey::KrInterest => "INTGSBKRM193N",
        }
    }

    pub fn kind(self) -> AssetKind {
        match self {
            AssetKey::UsInterest | AssetKey::KrInterest => AssetKind::Rate,
            _ => AssetKind::Market,
        }
    }

    /// Parse a list of raw keys, failing on the first unsupported one.
    pub fn parse_all<S: AsRef<str>>(raw: &[S]) -> Result<Vec<AssetKey>, CycleError> {
        raw.iter().map(|s| s.as_ref().parse()).collect()
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKey {
    type Err = CycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AssetKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CycleError::validation(format!("unsupported asset key '{s}'")))
    }
}
