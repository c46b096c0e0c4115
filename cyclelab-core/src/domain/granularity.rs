//! Query granularities: table resolution and correlation window period.

use crate::error::CycleError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output granularity of a resampled table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Daily,
    Weekly,
    Monthly,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::Daily => "daily",
            Resolution::Weekly => "weekly",
            Resolution::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = CycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Resolution::Daily),
            "weekly" => Ok(Resolution::Weekly),
            "monthly" => Ok(Resolution::Monthly),
            other => Err(CycleError::validation(format!(
                "invalid resolution '{other}': must be one of daily, weekly, monthly"
            ))),
        }
    }
}

/// Correlation window length in calendar months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    OneMonth,
    ThreeMonths,
    SixMonths,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::OneMonth, Period::ThreeMonths, Period::SixMonths];

    pub fn months(self) -> u32 {
        match self {
            Period::OneMonth => 1,
            Period::ThreeMonths => 3,
            Period::SixMonths => 6,
        }
    }

    /// Label accepted on the query surface.
    pub fn label(self) -> &'static str {
        match self {
            Period::OneMonth => "1개월",
            Period::ThreeMonths => "3개월",
            Period::SixMonths => "6개월",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Period {
    type Err = CycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .into_iter()
            .find(|p| p.label() == s)
            .ok_or_else(|| {
                CycleError::validation(format!(
                    "invalid period '{s}': must be one of 1개월, 3개월, 6개월"
                ))
            })
    }
}
