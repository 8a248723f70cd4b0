//! Player state aggregate and the small enums that describe a day on the trail.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::achievements::Achievement;
use crate::constants::{
    COMBAT_COMPANION_DAMAGE_FACTOR, HOARDER_ITEM_COUNT, MILESTONE_PERCENTS, SHIELDED_DAMAGE_FACTOR,
};
use crate::effects::{EffectKind, StatusEffectTable};
use crate::items::{Inventory, ItemId};
use crate::ledger::{DailyCost, Pool, RationModifiers, ResourceLedger};
use crate::params::{Param, ParameterStore};
use crate::themes::{Companion, CompanionBonus, ThemeId, theme};

/// Difficulty tier selected at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

/// Fixed base constants per difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultySettings {
    pub supply_multiplier: f64,
    pub damage_multiplier: f64,
    pub event_chance: f64,
    pub daily_consume: f64,
}

impl Difficulty {
    pub const ALL: [Self; 3] = [Self::Easy, Self::Normal, Self::Hard];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Normal => "normal",
            Self::Hard => "hard",
        }
    }

    #[must_use]
    pub const fn settings(self) -> DifficultySettings {
        match self {
            Self::Easy => DifficultySettings {
                supply_multiplier: 1.4,
                damage_multiplier: 0.6,
                event_chance: 0.30,
                daily_consume: 0.7,
            },
            Self::Normal => DifficultySettings {
                supply_multiplier: 1.0,
                damage_multiplier: 1.0,
                event_chance: 0.40,
                daily_consume: 1.0,
            },
            Self::Hard => DifficultySettings {
                supply_multiplier: 0.7,
                damage_multiplier: 1.5,
                event_chance: 0.55,
                daily_consume: 1.3,
            },
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "normal" => Ok(Self::Normal),
            "hard" => Ok(Self::Hard),
            _ => Err(()),
        }
    }
}

impl From<Difficulty> for String {
    fn from(value: Difficulty) -> Self {
        value.as_str().to_string()
    }
}

/// Position in the four-step daily light cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    #[default]
    Dawn,
    Day,
    Dusk,
    Night,
}

impl TimeOfDay {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dawn => "dawn",
            Self::Day => "day",
            Self::Dusk => "dusk",
            Self::Night => "night",
        }
    }

    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Dawn => Self::Day,
            Self::Day => Self::Dusk,
            Self::Dusk => Self::Night,
            Self::Night => Self::Dawn,
        }
    }

    #[must_use]
    pub const fn is_night(self) -> bool {
        matches!(self, Self::Night)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weather conditions that affect travel distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    #[default]
    Clear,
    Rain,
    Fog,
    Storm,
}

impl Weather {
    pub const ALL: [Self; 4] = [Self::Clear, Self::Rain, Self::Fog, Self::Storm];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Rain => "rain",
            Self::Fog => "fog",
            Self::Storm => "storm",
        }
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable aggregate describing one traveller for the length of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub theme: ThemeId,
    pub difficulty: Difficulty,
    pub ledger: ResourceLedger,
    pub inventory: Inventory,
    pub effects: StatusEffectTable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companion: Option<Companion>,
    pub distance_travelled: u32,
    pub total_distance: u32,
    pub day: u32,
    pub time_of_day: TimeOfDay,
    pub weather: Weather,
    pub scout_count: u32,
    pub combats_survived: u32,
    #[serde(default)]
    pub milestones_hit: SmallVec<[u32; 3]>,
    #[serde(default)]
    pub achievements: BTreeSet<Achievement>,
    #[serde(default)]
    pub seen_scenarios: BTreeSet<String>,
}

impl PlayerState {
    /// Build a fresh traveller with difficulty- and theme-scaled starting supplies.
    #[must_use]
    pub fn new(theme_id: ThemeId, difficulty: Difficulty, params: &ParameterStore) -> Self {
        let spec = theme(theme_id);
        Self {
            theme: theme_id,
            difficulty,
            ledger: ResourceLedger::starting(spec, difficulty, params),
            inventory: Inventory::default(),
            effects: StatusEffectTable::default(),
            companion: None,
            distance_travelled: 0,
            total_distance: spec.total_distance,
            day: 0,
            time_of_day: TimeOfDay::default(),
            weather: Weather::default(),
            scout_count: 0,
            combats_survived: 0,
            milestones_hit: SmallVec::new(),
            achievements: BTreeSet::new(),
            seen_scenarios: BTreeSet::new(),
        }
    }

    #[must_use]
    pub const fn health(&self) -> i32 {
        self.ledger.health
    }

    #[must_use]
    pub const fn morale(&self) -> i32 {
        self.ledger.morale
    }

    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.ledger.health > 0
    }

    #[must_use]
    pub const fn has_arrived(&self) -> bool {
        self.is_alive() && self.distance_travelled >= self.total_distance
    }

    /// Percentage of the route covered, capped at 100.
    #[must_use]
    pub fn progress_pct(&self) -> f64 {
        if self.total_distance == 0 {
            return 100.0;
        }
        (f64::from(self.distance_travelled) / f64::from(self.total_distance) * 100.0).min(100.0)
    }

    #[must_use]
    pub fn companion_bonus(&self, bonus: CompanionBonus) -> Option<u32> {
        self.companion
            .as_ref()
            .filter(|c| c.bonus == bonus)
            .map(|c| c.value)
    }

    #[must_use]
    pub fn has_companion_bonus(&self, bonus: CompanionBonus) -> bool {
        self.companion_bonus(bonus).is_some()
    }

    #[must_use]
    pub fn has_item(&self, item: ItemId) -> bool {
        self.inventory.contains(item)
    }

    /// Combined damage multiplier for this traveller under the tuned parameters.
    #[must_use]
    pub fn damage_factor(&self, params: &ParameterStore) -> f64 {
        let mut factor = params.resolve(Param::DamageMultiplier, self.difficulty, Some(self.theme));
        if self.effects.contains(EffectKind::Shielded) {
            factor *= SHIELDED_DAMAGE_FACTOR;
        }
        if self.has_companion_bonus(CompanionBonus::Combat) {
            factor *= COMBAT_COMPANION_DAMAGE_FACTOR;
        }
        factor
    }

    /// Apply mitigated damage, returning the health actually lost.
    pub fn damage(&mut self, amount: i32, params: &ParameterStore) -> i32 {
        let factor = self.damage_factor(params);
        self.ledger.damage(amount, factor)
    }

    pub fn heal(&mut self, amount: i32) -> i32 {
        self.ledger.heal(amount)
    }

    pub fn adjust_morale(&mut self, delta: i32) -> i32 {
        self.ledger.adjust(Pool::Morale, delta)
    }

    pub fn adjust_supply(&mut self, pool: Pool, delta: i32) -> i32 {
        self.ledger.adjust(pool, delta)
    }

    #[must_use]
    pub fn ration_modifiers(&self) -> RationModifiers {
        RationModifiers {
            exhausted: self.effects.contains(EffectKind::Exhausted),
            supply_companion: self.has_companion_bonus(CompanionBonus::Supply),
        }
    }

    /// Eat and drink one day's ration at the tuned rates.
    pub fn consume_ration(&mut self, params: &ParameterStore) -> DailyCost {
        let modifiers = self.ration_modifiers();
        self.ledger
            .consume_daily(self.difficulty, self.theme, params, modifiers)
    }

    /// Move forward (or back) along the route, never below the start.
    pub fn advance_distance(&mut self, delta: i32) {
        let next = i64::from(self.distance_travelled) + i64::from(delta);
        self.distance_travelled = u32::try_from(next.max(0)).unwrap_or(u32::MAX);
    }

    /// Unlock an achievement, returning `true` only on the first unlock.
    pub fn try_unlock(&mut self, achievement: Achievement) -> bool {
        self.achievements.insert(achievement)
    }

    /// Add an item to the inventory, unlocking the hoarder badge when the bag fills up.
    pub fn add_item(&mut self, item: ItemId) -> SmallVec<[Achievement; 1]> {
        let mut unlocked = SmallVec::new();
        if self.inventory.add(item)
            && self.inventory.len() >= HOARDER_ITEM_COUNT
            && self.try_unlock(Achievement::Hoarder)
        {
            unlocked.push(Achievement::Hoarder);
        }
        unlocked
    }

    /// Record newly crossed progress milestones.
    pub fn check_milestones(&mut self) -> SmallVec<[u32; 3]> {
        let pct = self.progress_pct();
        let mut crossed = SmallVec::new();
        for milestone in MILESTONE_PERCENTS {
            if pct >= f64::from(milestone) && !self.milestones_hit.contains(&milestone) {
                self.milestones_hit.push(milestone);
                crossed.push(milestone);
            }
        }
        crossed
    }

    #[must_use]
    pub fn special_item(&self) -> ItemId {
        theme(self.theme).special_item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_parses_and_displays() {
        for difficulty in Difficulty::ALL {
            assert_eq!(difficulty.as_str().parse::<Difficulty>(), Ok(difficulty));
            assert_eq!(String::from(difficulty), difficulty.to_string());
        }
        assert_eq!("HARD".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("nightmare".parse::<Difficulty>().is_err());
    }

    #[test]
    fn time_of_day_cycles_through_night() {
        let mut time = TimeOfDay::Dawn;
        for _ in 0..3 {
            time = time.next();
        }
        assert!(time.is_night());
        assert_eq!(time.next(), TimeOfDay::Dawn);
    }

    #[test]
    fn fresh_player_scales_supplies_by_difficulty() {
        let params = ParameterStore::neutral();
        let easy = PlayerState::new(ThemeId::Desert, Difficulty::Easy, &params);
        let hard = PlayerState::new(ThemeId::Desert, Difficulty::Hard, &params);
        assert_eq!(easy.ledger.food, 84);
        assert_eq!(hard.ledger.food, 42);
        assert_eq!(easy.health(), 100);
        assert_eq!(easy.morale(), 100);
        assert_eq!(easy.total_distance, 2000);
    }

    #[test]
    fn milestones_fire_once() {
        let params = ParameterStore::neutral();
        let mut player = PlayerState::new(ThemeId::Space, Difficulty::Normal, &params);
        player.distance_travelled = 1_100;
        assert_eq!(player.check_milestones().as_slice(), &[25, 50]);
        assert!(player.check_milestones().is_empty());
        player.distance_travelled = 1_600;
        assert_eq!(player.check_milestones().as_slice(), &[75]);
    }

    #[test]
    fn hoarder_unlocks_at_five_items() {
        let params = ParameterStore::neutral();
        let mut player = PlayerState::new(ThemeId::Mist, Difficulty::Normal, &params);
        let items = [
            ItemId::SignalFlare,
            ItemId::HealersSalve,
            ItemId::MoraleCharm,
            ItemId::IronbarkShield,
        ];
        for item in items {
            assert!(player.add_item(item).is_empty());
        }
        assert_eq!(
            player.add_item(ItemId::WanderersCompass).as_slice(),
            &[Achievement::Hoarder]
        );
        assert!(player.add_item(ItemId::EmberStone).is_empty());
    }

    #[test]
    fn distance_never_goes_negative() {
        let params = ParameterStore::neutral();
        let mut player = PlayerState::new(ThemeId::Cyber, Difficulty::Easy, &params);
        player.advance_distance(7);
        player.advance_distance(-20);
        assert_eq!(player.distance_travelled, 0);
    }

    fn damage_overrides(multiplier: f64) -> ParameterStore {
        let mut adjustments = std::collections::BTreeMap::new();
        adjustments.insert("global.damage_multiplier".to_string(), multiplier);
        for difficulty in Difficulty::ALL {
            adjustments.insert(format!("difficulty.{difficulty}.damage_multiplier"), multiplier);
        }
        for id in ThemeId::ALL {
            adjustments.insert(format!("theme.{id}.damage_multiplier"), multiplier);
        }
        ParameterStore::from_adjustments(&adjustments)
    }

    #[test]
    fn mitigated_hits_still_cost_health_under_any_overrides() {
        let stores = [
            ParameterStore::neutral(),
            damage_overrides(0.7),
            damage_overrides(0.05),
        ];
        for params in &stores {
            for difficulty in Difficulty::ALL {
                for id in ThemeId::ALL {
                    let mut player = PlayerState::new(id, difficulty, params);
                    player.effects.apply(EffectKind::Shielded, 3);
                    player.companion = Some(Companion {
                        name: "Daro".to_string(),
                        title: "Blade Dancer".to_string(),
                        bonus: CompanionBonus::Combat,
                        value: 6,
                    });
                    let tuned = params.resolve(Param::DamageMultiplier, difficulty, Some(id));
                    assert!(player.damage_factor(params) < tuned);
                    for hit in 1..=5 {
                        let before = player.health();
                        let lost = player.damage(hit, params);
                        assert!(lost >= 1, "{difficulty}/{id} hit {hit} lost {lost}");
                        assert_eq!(player.health(), before - lost);
                    }
                }
            }
        }
    }
}
