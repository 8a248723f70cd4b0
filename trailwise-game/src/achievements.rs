//! Achievement badges unlocked during a journey.
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    FirstBlood,
    Trader,
    Riddler,
    Crafter,
    Companion,
    Survivor,
    Flawless,
    Hoarder,
    Explorer,
    NightOwl,
    #[serde(rename = "milestone_25")]
    Milestone25,
    #[serde(rename = "milestone_50")]
    Milestone50,
    #[serde(rename = "milestone_75")]
    Milestone75,
    BestEnding,
    Gambler,
    WeatherMaster,
}

impl Achievement {
    pub const ALL: [Self; 16] = [
        Self::FirstBlood,
        Self::Trader,
        Self::Riddler,
        Self::Crafter,
        Self::Companion,
        Self::Survivor,
        Self::Flawless,
        Self::Hoarder,
        Self::Explorer,
        Self::NightOwl,
        Self::Milestone25,
        Self::Milestone50,
        Self::Milestone75,
        Self::BestEnding,
        Self::Gambler,
        Self::WeatherMaster,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FirstBlood => "first_blood",
            Self::Trader => "trader",
            Self::Riddler => "riddler",
            Self::Crafter => "crafter",
            Self::Companion => "companion",
            Self::Survivor => "survivor",
            Self::Flawless => "flawless",
            Self::Hoarder => "hoarder",
            Self::Explorer => "explorer",
            Self::NightOwl => "night_owl",
            Self::Milestone25 => "milestone_25",
            Self::Milestone50 => "milestone_50",
            Self::Milestone75 => "milestone_75",
            Self::BestEnding => "best_ending",
            Self::Gambler => "gambler",
            Self::WeatherMaster => "weather_master",
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::FirstBlood => "First Blood",
            Self::Trader => "Shrewd Trader",
            Self::Riddler => "Riddle Master",
            Self::Crafter => "Artisan",
            Self::Companion => "Fellowship",
            Self::Survivor => "Survivor",
            Self::Flawless => "Flawless",
            Self::Hoarder => "Hoarder",
            Self::Explorer => "Explorer",
            Self::NightOwl => "Night Owl",
            Self::Milestone25 => "Quarter Way",
            Self::Milestone50 => "Halfway There",
            Self::Milestone75 => "Final Stretch",
            Self::BestEnding => "Legend",
            Self::Gambler => "High Roller",
            Self::WeatherMaster => "Storm Chaser",
        }
    }

    /// Badge awarded for crossing a progress milestone percentage.
    #[must_use]
    pub const fn for_milestone(percent: u32) -> Option<Self> {
        match percent {
            25 => Some(Self::Milestone25),
            50 => Some(Self::Milestone50),
            75 => Some(Self::Milestone75),
            _ => None,
        }
    }
}

impl fmt::Display for Achievement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
