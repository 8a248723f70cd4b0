//! Theme catalogue: starting supplies, route length, relics, and companion pools.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::items::ItemId;

/// Identifier for a playable theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThemeId {
    #[default]
    Desert,
    Space,
    Mist,
    Time,
    Cyber,
    AiGenerated,
}

impl ThemeId {
    pub const ALL: [Self; 6] = [
        Self::Desert,
        Self::Space,
        Self::Mist,
        Self::Time,
        Self::Cyber,
        Self::AiGenerated,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Desert => "desert",
            Self::Space => "space",
            Self::Mist => "mist",
            Self::Time => "time",
            Self::Cyber => "cyber",
            Self::AiGenerated => "ai_generated",
        }
    }
}

impl fmt::Display for ThemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "desert" => Ok(Self::Desert),
            "space" => Ok(Self::Space),
            "mist" => Ok(Self::Mist),
            "time" => Ok(Self::Time),
            "cyber" => Ok(Self::Cyber),
            "ai_generated" | "ai-generated" => Ok(Self::AiGenerated),
            _ => Err(()),
        }
    }
}

impl From<ThemeId> for String {
    fn from(value: ThemeId) -> Self {
        value.as_str().to_string()
    }
}

/// What a companion contributes to the party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanionBonus {
    Scout,
    Health,
    Combat,
    Supply,
    Morale,
}

impl CompanionBonus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scout => "scout",
            Self::Health => "health",
            Self::Combat => "combat",
            Self::Supply => "supply",
            Self::Morale => "morale",
        }
    }
}

/// Static recruitable companion entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompanionSpec {
    pub name: &'static str,
    pub title: &'static str,
    pub bonus: CompanionBonus,
    pub value: u32,
}

/// Companion travelling with the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Companion {
    pub name: String,
    pub title: String,
    pub bonus: CompanionBonus,
    pub value: u32,
}

impl From<&CompanionSpec> for Companion {
    fn from(spec: &CompanionSpec) -> Self {
        Self {
            name: spec.name.to_string(),
            title: spec.title.to_string(),
            bonus: spec.bonus,
            value: spec.value,
        }
    }
}

/// Static description of one theme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub id: ThemeId,
    pub name: &'static str,
    pub special_item: ItemId,
    pub start_food: i32,
    pub start_water: i32,
    pub start_fuel: i32,
    pub daily_distance: (u32, u32),
    pub total_distance: u32,
    pub distance_unit: &'static str,
    pub companions: &'static [CompanionSpec],
    pub elite_enemy: &'static str,
}

const DESERT_COMPANIONS: [CompanionSpec; 3] = [
    CompanionSpec { name: "Kael", title: "Sand Tracker", bonus: CompanionBonus::Scout, value: 8 },
    CompanionSpec { name: "Mirra", title: "Herbalist", bonus: CompanionBonus::Health, value: 5 },
    CompanionSpec { name: "Daro", title: "Blade Dancer", bonus: CompanionBonus::Combat, value: 6 },
];

const SPACE_COMPANIONS: [CompanionSpec; 3] = [
    CompanionSpec { name: "AXON-7", title: "Repair Drone", bonus: CompanionBonus::Supply, value: 4 },
    CompanionSpec { name: "Dr. Voss", title: "Xenobiologist", bonus: CompanionBonus::Health, value: 5 },
    CompanionSpec { name: "Renko", title: "Pilot", bonus: CompanionBonus::Scout, value: 7 },
];

const MIST_COMPANIONS: [CompanionSpec; 3] = [
    CompanionSpec { name: "Thalia", title: "Mist Seer", bonus: CompanionBonus::Scout, value: 9 },
    CompanionSpec { name: "Grumm", title: "Stone Golem", bonus: CompanionBonus::Combat, value: 7 },
    CompanionSpec { name: "Elara", title: "Bard", bonus: CompanionBonus::Morale, value: 8 },
];

const TIME_COMPANIONS: [CompanionSpec; 3] = [
    CompanionSpec { name: "Epoch", title: "Chrono-Cat", bonus: CompanionBonus::Scout, value: 6 },
    CompanionSpec { name: "Lysander", title: "Historian", bonus: CompanionBonus::Morale, value: 7 },
    CompanionSpec { name: "Bolt", title: "Temporal Mechanic", bonus: CompanionBonus::Supply, value: 5 },
];

const CYBER_COMPANIONS: [CompanionSpec; 3] = [
    CompanionSpec { name: "Nyx", title: "Street Samurai", bonus: CompanionBonus::Combat, value: 8 },
    CompanionSpec { name: "Pixel", title: "Info Broker", bonus: CompanionBonus::Scout, value: 6 },
    CompanionSpec { name: "Patch", title: "Street Doc", bonus: CompanionBonus::Health, value: 6 },
];

const THEMES: [Theme; 6] = [
    Theme {
        id: ThemeId::Desert,
        name: "The Desert Caravan",
        special_item: ItemId::QuicksilverFlask,
        start_food: 60,
        start_water: 70,
        start_fuel: 40,
        daily_distance: (15, 45),
        total_distance: 2000,
        distance_unit: "km",
        companions: &DESERT_COMPANIONS,
        elite_enemy: "Vytharian War-Lord",
    },
    Theme {
        id: ThemeId::Space,
        name: "Space Colony Expedition",
        special_item: ItemId::SolarCharger,
        start_food: 55,
        start_water: 55,
        start_fuel: 50,
        daily_distance: (20, 55),
        total_distance: 2000,
        distance_unit: "AU",
        companions: &SPACE_COMPANIONS,
        elite_enemy: "Void Leviathan",
    },
    Theme {
        id: ThemeId::Mist,
        name: "Lost Kingdom of the Mist",
        special_item: ItemId::EldritchLantern,
        start_food: 65,
        start_water: 50,
        start_fuel: 35,
        daily_distance: (10, 40),
        total_distance: 2000,
        distance_unit: "leagues",
        companions: &MIST_COMPANIONS,
        elite_enemy: "Wraith King",
    },
    Theme {
        id: ThemeId::Time,
        name: "Time-Travel Expedition",
        special_item: ItemId::ChronoFilter,
        start_food: 50,
        start_water: 50,
        start_fuel: 55,
        daily_distance: (20, 60),
        total_distance: 2000,
        distance_unit: "chrono-leaps",
        companions: &TIME_COMPANIONS,
        elite_enemy: "Paradox Hydra",
    },
    Theme {
        id: ThemeId::Cyber,
        name: "Cyberpunk Heist",
        special_item: ItemId::GhostCipher,
        start_food: 45,
        start_water: 45,
        start_fuel: 60,
        daily_distance: (25, 65),
        total_distance: 2000,
        distance_unit: "nodes",
        companions: &CYBER_COMPANIONS,
        elite_enemy: "Corporate Sentinel AI",
    },
    Theme {
        id: ThemeId::AiGenerated,
        name: "AI-Generated Adventure",
        special_item: ItemId::AdaptiveToolkit,
        start_food: 60,
        start_water: 70,
        start_fuel: 50,
        daily_distance: (20, 50),
        total_distance: 2000,
        distance_unit: "km",
        companions: &[],
        elite_enemy: "Elite Enemy",
    },
];

/// Look up the static description for a theme.
#[must_use]
pub const fn theme(id: ThemeId) -> &'static Theme {
    match id {
        ThemeId::Desert => &THEMES[0],
        ThemeId::Space => &THEMES[1],
        ThemeId::Mist => &THEMES[2],
        ThemeId::Time => &THEMES[3],
        ThemeId::Cyber => &THEMES[4],
        ThemeId::AiGenerated => &THEMES[5],
    }
}
