//! Item catalogue, consumable effects, crafting recipes, and the ordered inventory.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every item the traveller can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemId {
    #[serde(rename = "Quicksilver Flask")]
    QuicksilverFlask,
    #[serde(rename = "Eldritch Lantern")]
    EldritchLantern,
    #[serde(rename = "Chrono-Filter")]
    ChronoFilter,
    #[serde(rename = "Solar-Charger")]
    SolarCharger,
    #[serde(rename = "Ghost-Cipher")]
    GhostCipher,
    #[serde(rename = "Signal-Flare")]
    SignalFlare,
    #[serde(rename = "Ironbark Shield")]
    IronbarkShield,
    #[serde(rename = "Wanderer's Compass")]
    WanderersCompass,
    #[serde(rename = "Healer's Salve")]
    HealersSalve,
    #[serde(rename = "Morale Charm")]
    MoraleCharm,
    #[serde(rename = "Elixir of Vitality")]
    ElixirOfVitality,
    #[serde(rename = "Beacon Array")]
    BeaconArray,
    #[serde(rename = "Guardian's Mantle")]
    GuardiansMantle,
    #[serde(rename = "Purified Tonic")]
    PurifiedTonic,
    #[serde(rename = "Shadow Cloak")]
    ShadowCloak,
    #[serde(rename = "Stormglass Vial")]
    StormglassVial,
    #[serde(rename = "Ember Stone")]
    EmberStone,
    #[serde(rename = "Adaptive Toolkit")]
    AdaptiveToolkit,
}

impl ItemId {
    /// Items that can turn up at traders.
    pub const CATALOGUE: [Self; 17] = [
        Self::QuicksilverFlask,
        Self::EldritchLantern,
        Self::ChronoFilter,
        Self::SolarCharger,
        Self::GhostCipher,
        Self::SignalFlare,
        Self::IronbarkShield,
        Self::WanderersCompass,
        Self::HealersSalve,
        Self::MoraleCharm,
        Self::ElixirOfVitality,
        Self::BeaconArray,
        Self::GuardiansMantle,
        Self::PurifiedTonic,
        Self::ShadowCloak,
        Self::StormglassVial,
        Self::EmberStone,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QuicksilverFlask => "Quicksilver Flask",
            Self::EldritchLantern => "Eldritch Lantern",
            Self::ChronoFilter => "Chrono-Filter",
            Self::SolarCharger => "Solar-Charger",
            Self::GhostCipher => "Ghost-Cipher",
            Self::SignalFlare => "Signal-Flare",
            Self::IronbarkShield => "Ironbark Shield",
            Self::WanderersCompass => "Wanderer's Compass",
            Self::HealersSalve => "Healer's Salve",
            Self::MoraleCharm => "Morale Charm",
            Self::ElixirOfVitality => "Elixir of Vitality",
            Self::BeaconArray => "Beacon Array",
            Self::GuardiansMantle => "Guardian's Mantle",
            Self::PurifiedTonic => "Purified Tonic",
            Self::ShadowCloak => "Shadow Cloak",
            Self::StormglassVial => "Stormglass Vial",
            Self::EmberStone => "Ember Stone",
            Self::AdaptiveToolkit => "Adaptive Toolkit",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::QuicksilverFlask => "Purifies tainted water sources, restoring +10 water.",
            Self::EldritchLantern => "Reveals hidden paths and wards off mist creatures.",
            Self::ChronoFilter => "Shields you from temporal paradoxes and traps.",
            Self::SolarCharger => "Recharges fuel reserves by +15 using ambient energy.",
            Self::GhostCipher => "Masks your digital signature, bypassing security nodes.",
            Self::SignalFlare => "Attracts rescue parties; used at journey's end.",
            Self::IronbarkShield => "Absorbs one lethal attack, saving your life.",
            Self::WanderersCompass => "Increases daily travel distance by 10.",
            Self::HealersSalve => "Restores 25 health when applied.",
            Self::MoraleCharm => "Boosts morale by 20; a trinket of good fortune.",
            Self::ElixirOfVitality => "Restores 40 health and 30 morale. (Crafted)",
            Self::BeaconArray => "A powerful rescue signal. Guarantees the best ending. (Crafted)",
            Self::GuardiansMantle => "Blocks one attack AND boosts travel distance. (Crafted)",
            Self::PurifiedTonic => "Restores 15 water and 20 health. (Crafted)",
            Self::ShadowCloak => "Lets you avoid one hostile encounter entirely.",
            Self::StormglassVial => "Predicts weather, lets you prepare for storms.",
            Self::EmberStone => "Keeps your camp warm, reducing night penalties.",
            Self::AdaptiveToolkit => "Reconfigures itself to whatever the road demands.",
        }
    }

    /// Immediate effect of using this item, if it is consumable.
    #[must_use]
    pub const fn consumable(self) -> Option<ItemUse> {
        let base = ItemUse {
            water: 0,
            fuel: 0,
            heal: 0,
            morale: 0,
            shield_days: 0,
        };
        match self {
            Self::QuicksilverFlask => Some(ItemUse { water: 10, ..base }),
            Self::SolarCharger => Some(ItemUse { fuel: 15, ..base }),
            Self::HealersSalve => Some(ItemUse { heal: 25, ..base }),
            Self::MoraleCharm => Some(ItemUse { morale: 20, ..base }),
            Self::ElixirOfVitality => Some(ItemUse {
                heal: 40,
                morale: 30,
                ..base
            }),
            Self::PurifiedTonic => Some(ItemUse {
                water: 15,
                heal: 20,
                ..base
            }),
            Self::EmberStone => Some(ItemUse {
                heal: 10,
                shield_days: 2,
                ..base
            }),
            _ => None,
        }
    }

    /// Items that count as a rescue signal for the ending.
    #[must_use]
    pub const fn is_signal(self) -> bool {
        matches!(self, Self::SignalFlare | Self::BeaconArray)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::CATALOGUE
            .iter()
            .chain(std::iter::once(&Self::AdaptiveToolkit))
            .copied()
            .find(|item| item.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// Pool deltas produced by consuming an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemUse {
    pub water: i32,
    pub fuel: i32,
    pub heal: i32,
    pub morale: i32,
    pub shield_days: u32,
}

/// Two-ingredient crafting recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recipe {
    pub inputs: [ItemId; 2],
    pub result: ItemId,
    pub description: &'static str,
}

pub const RECIPES: [Recipe; 4] = [
    Recipe {
        inputs: [ItemId::HealersSalve, ItemId::MoraleCharm],
        result: ItemId::ElixirOfVitality,
        description: "Combine healing and spirit into a potent elixir.",
    },
    Recipe {
        inputs: [ItemId::SignalFlare, ItemId::SolarCharger],
        result: ItemId::BeaconArray,
        description: "Power a flare with solar energy for a lasting beacon.",
    },
    Recipe {
        inputs: [ItemId::IronbarkShield, ItemId::WanderersCompass],
        result: ItemId::GuardiansMantle,
        description: "Fuse protection with guidance into a mystic mantle.",
    },
    Recipe {
        inputs: [ItemId::QuicksilverFlask, ItemId::HealersSalve],
        result: ItemId::PurifiedTonic,
        description: "Distill salve through quicksilver for a purified tonic.",
    },
];

/// Recipe lookup by its crafted result.
#[must_use]
pub fn recipe_for(result: ItemId) -> Option<&'static Recipe> {
    RECIPES.iter().find(|recipe| recipe.result == result)
}

/// Insertion-ordered set of carried items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    items: Vec<ItemId>,
}

impl Inventory {
    /// Add an item, returning `false` when it was already carried.
    pub fn add(&mut self, item: ItemId) -> bool {
        if self.items.contains(&item) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn remove(&mut self, item: ItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|held| *held != item);
        self.items.len() != before
    }

    #[must_use]
    pub fn contains(&self, item: ItemId) -> bool {
        self.items.contains(&item)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.items.iter().copied()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.items.iter().map(ToString::to_string).collect()
    }

    /// Recipes whose inputs are both carried and whose result is not.
    pub fn available_recipes(&self) -> impl Iterator<Item = &'static Recipe> + '_ {
        RECIPES.iter().filter(|recipe| {
            recipe.inputs.iter().all(|input| self.contains(*input)) && !self.contains(recipe.result)
        })
    }

    /// Catalogue items not yet carried, in catalogue order.
    pub fn missing_from_catalogue(&self) -> impl Iterator<Item = ItemId> + '_ {
        ItemId::CATALOGUE
            .iter()
            .copied()
            .filter(|item| !self.contains(*item))
    }
}
