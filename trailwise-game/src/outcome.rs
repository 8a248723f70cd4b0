//! Terminal outcomes returned to the session driver.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    Combat,
    Starvation,
    Dehydration,
    Unknown,
}

impl DeathCause {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Combat => "combat",
            Self::Starvation => "starvation",
            Self::Dehydration => "dehydration",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DeathCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeathCause {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "combat" => Ok(Self::Combat),
            "starvation" => Ok(Self::Starvation),
            "dehydration" => Ok(Self::Dehydration),
            "unknown" => Ok(Self::Unknown),
            _ => Err(()),
        }
    }
}

/// Ending tier awarded on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ending {
    Perfect,
    GoodSignal,
    GoodHealthy,
    Arrived,
}

impl Ending {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Perfect => "perfect",
            Self::GoodSignal => "good_signal",
            Self::GoodHealthy => "good_healthy",
            Self::Arrived => "arrived",
        }
    }
}

impl fmt::Display for Ending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session stopped without a death or an arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncompleteReason {
    MaxDays,
    Abandoned,
    Fault,
}

impl IncompleteReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MaxDays => "max_days",
            Self::Abandoned => "abandoned",
            Self::Fault => "fault",
        }
    }
}

impl fmt::Display for IncompleteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit end state of a session; the driver decides what happens next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SessionOutcome {
    Died { cause: DeathCause },
    Arrived { ending: Ending },
    Incomplete { reason: IncompleteReason },
}

impl SessionOutcome {
    #[must_use]
    pub const fn is_victory(self) -> bool {
        matches!(self, Self::Arrived { .. })
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Died { .. } => "death",
            Self::Arrived { .. } => "victory",
            Self::Incomplete { .. } => "incomplete",
        }
    }
}
