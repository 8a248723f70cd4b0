//! Tunable parameter resolution.
//!
//! Every tunable value is `base(param, difficulty)` times the product of the
//! overrides that match it. Override keys use a dotted scheme:
//!
//! * `global.<param>`
//! * `difficulty.<easy|normal|hard>.<param>`
//! * `theme.<theme_id>.<param>`
//!
//! A missing override is 1.0. The store is an immutable snapshot built once at
//! start-up and passed by reference to anything that needs a tuned value.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::state::Difficulty;
use crate::themes::ThemeId;
use crate::tuning::{TuningFile, TuningFileError};

/// Named tunable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Param {
    SupplyMultiplier,
    DamageMultiplier,
    EventChance,
    DailyConsume,
    FoodConsumptionRate,
    WaterConsumptionRate,
    InitialHealth,
}

impl Param {
    pub const ALL: [Self; 7] = [
        Self::SupplyMultiplier,
        Self::DamageMultiplier,
        Self::EventChance,
        Self::DailyConsume,
        Self::FoodConsumptionRate,
        Self::WaterConsumptionRate,
        Self::InitialHealth,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SupplyMultiplier => "supply_multiplier",
            Self::DamageMultiplier => "damage_multiplier",
            Self::EventChance => "event_chance",
            Self::DailyConsume => "daily_consume",
            Self::FoodConsumptionRate => "food_consumption_rate",
            Self::WaterConsumptionRate => "water_consumption_rate",
            Self::InitialHealth => "initial_health",
        }
    }

    /// Untuned constant for this parameter at the given difficulty.
    #[must_use]
    pub const fn base(self, difficulty: Difficulty) -> f64 {
        let settings = difficulty.settings();
        match self {
            Self::SupplyMultiplier => settings.supply_multiplier,
            Self::DamageMultiplier => settings.damage_multiplier,
            Self::EventChance => settings.event_chance,
            Self::DailyConsume => settings.daily_consume,
            Self::FoodConsumptionRate | Self::WaterConsumptionRate | Self::InitialHealth => 1.0,
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Param {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|p| p.as_str() == s).ok_or(())
    }
}

/// Where an override applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Global,
    Difficulty(Difficulty),
    Theme(ThemeId),
}

/// Parsed override key such as `difficulty.hard.event_chance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParamKey {
    pub scope: Scope,
    pub param: Param,
}

impl ParamKey {
    #[must_use]
    pub const fn global(param: Param) -> Self {
        Self {
            scope: Scope::Global,
            param,
        }
    }

    #[must_use]
    pub const fn difficulty(difficulty: Difficulty, param: Param) -> Self {
        Self {
            scope: Scope::Difficulty(difficulty),
            param,
        }
    }

    #[must_use]
    pub const fn theme(theme: ThemeId, param: Param) -> Self {
        Self {
            scope: Scope::Theme(theme),
            param,
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            Scope::Global => write!(f, "global.{}", self.param),
            Scope::Difficulty(d) => write!(f, "difficulty.{d}.{}", self.param),
            Scope::Theme(t) => write!(f, "theme.{t}.{}", self.param),
        }
    }
}

impl FromStr for ParamKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            ["global", param] => Ok(Self::global(param.parse()?)),
            ["difficulty", difficulty, param] => {
                Ok(Self::difficulty(difficulty.parse()?, param.parse()?))
            }
            ["theme", theme, param] => Ok(Self::theme(theme.parse()?, param.parse()?)),
            _ => Err(()),
        }
    }
}

impl From<ParamKey> for String {
    fn from(value: ParamKey) -> Self {
        value.to_string()
    }
}

/// Immutable snapshot of tuned overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterStore {
    overrides: BTreeMap<ParamKey, f64>,
}

impl ParameterStore {
    /// Store with no overrides; every parameter resolves to its base constant.
    #[must_use]
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Build from a raw key/multiplier map, dropping malformed entries.
    #[must_use]
    pub fn from_adjustments(adjustments: &BTreeMap<String, f64>) -> Self {
        let mut overrides = BTreeMap::new();
        for (raw, value) in adjustments {
            let Ok(key) = raw.parse::<ParamKey>() else {
                log::warn!("ignoring unknown tuning key {raw}");
                continue;
            };
            if !value.is_finite() || *value <= 0.0 {
                log::warn!("ignoring non-positive multiplier {value} for {raw}");
                continue;
            }
            overrides.insert(key, *value);
        }
        Self { overrides }
    }

    /// Load overrides from an adjustment file.
    ///
    /// A missing or malformed file yields a neutral store; tuning must never
    /// block a session from starting.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(store) => store,
            Err(TuningFileError::Io { source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                log::debug!("no tuning file at {}, using base constants", path.display());
                Self::neutral()
            }
            Err(err) => {
                log::warn!("{err}; falling back to base constants");
                Self::neutral()
            }
        }
    }

    /// Strict variant of [`ParameterStore::load`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn try_load(path: &Path) -> Result<Self, TuningFileError> {
        let file = TuningFile::load(path)?;
        Ok(Self::from_adjustments(&file.current_adjustments))
    }

    /// Multiplier stored for one exact key, 1.0 when absent.
    #[must_use]
    pub fn adjustment(&self, key: ParamKey) -> f64 {
        self.overrides.get(&key).copied().unwrap_or(1.0)
    }

    /// Effective value of `param` for a difficulty and, optionally, a theme.
    #[must_use]
    pub fn resolve(&self, param: Param, difficulty: Difficulty, theme: Option<ThemeId>) -> f64 {
        let mut value = param.base(difficulty)
            * self.adjustment(ParamKey::global(param))
            * self.adjustment(ParamKey::difficulty(difficulty, param));
        if let Some(theme) = theme {
            value *= self.adjustment(ParamKey::theme(theme, param));
        }
        value
    }

    /// Resolve a dotted key. Unparseable names resolve to the neutral 1.0.
    #[must_use]
    pub fn resolve_key(&self, key: &str, difficulty: Difficulty) -> f64 {
        let Ok(parsed) = key.parse::<ParamKey>() else {
            return 1.0;
        };
        match parsed.scope {
            Scope::Global => self.resolve(parsed.param, difficulty, None),
            Scope::Difficulty(scoped) => self.resolve(parsed.param, scoped, None),
            Scope::Theme(theme) => self.resolve(parsed.param, difficulty, Some(theme)),
        }
    }

    pub fn overrides(&self) -> impl Iterator<Item = (ParamKey, f64)> + '_ {
        self.overrides.iter().map(|(key, value)| (*key, *value))
    }

    #[must_use]
    pub fn is_neutral(&self) -> bool {
        self.overrides.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(entries: &[(&str, f64)]) -> ParameterStore {
        let map = entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), *v))
            .collect::<BTreeMap<_, _>>();
        ParameterStore::from_adjustments(&map)
    }

    #[test]
    fn keys_round_trip_through_display() {
        for raw in [
            "global.damage_multiplier",
            "difficulty.hard.event_chance",
            "theme.ai_generated.supply_multiplier",
        ] {
            let key: ParamKey = raw.parse().unwrap();
            assert_eq!(key.to_string(), raw);
        }
        assert!("difficulty.hard".parse::<ParamKey>().is_err());
        assert!("theme.moon.supply_multiplier".parse::<ParamKey>().is_err());
        assert!("global.speed".parse::<ParamKey>().is_err());
    }

    #[test]
    fn scoped_overrides_compose_multiplicatively() {
        let params = store(&[
            ("difficulty.easy.supply_multiplier", 1.2),
            ("theme.desert.supply_multiplier", 1.3),
        ]);
        let value = params.resolve(Param::SupplyMultiplier, Difficulty::Easy, Some(ThemeId::Desert));
        assert!((value - 1.4 * 1.2 * 1.3).abs() < 1e-12);
        let other_theme =
            params.resolve(Param::SupplyMultiplier, Difficulty::Easy, Some(ThemeId::Space));
        assert!((other_theme - 1.4 * 1.2).abs() < 1e-12);
        let normal = params.resolve(Param::SupplyMultiplier, Difficulty::Normal, Some(ThemeId::Desert));
        assert!((normal - 1.3).abs() < 1e-12);
    }

    #[test]
    fn invalid_entries_are_dropped() {
        let params = store(&[
            ("global.damage_multiplier", -1.0),
            ("global.event_chance", f64::NAN),
            ("nonsense", 2.0),
        ]);
        assert!(params.is_neutral());
        assert!((params.resolve_key("nonsense", Difficulty::Hard) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn resolve_key_uses_the_key_scope() {
        let params = store(&[("difficulty.hard.event_chance", 1.2)]);
        let hard = params.resolve_key("difficulty.hard.event_chance", Difficulty::Easy);
        assert!((hard - 0.55 * 1.2).abs() < 1e-12);
        let easy = params.resolve_key("global.event_chance", Difficulty::Easy);
        assert!((easy - 0.30).abs() < 1e-12);
    }

    #[test]
    fn missing_file_is_neutral() {
        let path = std::env::temp_dir().join("trailwise-params-missing-file.json");
        let _ = std::fs::remove_file(&path);
        assert!(ParameterStore::load(&path).is_neutral());
    }

    #[test]
    fn malformed_file_is_neutral() {
        let path = std::env::temp_dir().join(format!(
            "trailwise-params-malformed-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, "{ not json").unwrap();
        assert!(ParameterStore::load(&path).is_neutral());
        assert!(ParameterStore::try_load(&path).is_err());
        let _ = std::fs::remove_file(&path);
    }
}
