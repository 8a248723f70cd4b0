//! Clamped resource pools with fractional daily consumption.
//!
//! Daily costs are real-valued once tuning multipliers are applied. The ledger
//! carries the unpaid fraction forward per resource so that a tuned rate of 0.5
//! costs one unit every second day instead of rounding to a flat 0 or 1.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    EXHAUSTED_EXTRA_COST, MIN_DAMAGE, STAT_CAP, SUPPLY_CAP, SUPPLY_COMPANION_FOOD_RELIEF,
};
use crate::numbers::{round_f64_to_i32, trunc_f64_to_i32};
use crate::params::{Param, ParameterStore};
use crate::state::Difficulty;
use crate::themes::{Theme, ThemeId};

/// Named resource pool tracked by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pool {
    Food,
    Water,
    Fuel,
    Health,
    Morale,
}

impl Pool {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Water => "water",
            Self::Fuel => "fuel",
            Self::Health => "health",
            Self::Morale => "morale",
        }
    }

    /// Upper bound for the pool.
    #[must_use]
    pub const fn cap(self) -> i32 {
        match self {
            Self::Food | Self::Water | Self::Fuel => SUPPLY_CAP,
            Self::Health | Self::Morale => STAT_CAP,
        }
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Situational modifiers for one day's ration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RationModifiers {
    pub exhausted: bool,
    pub supply_companion: bool,
}

/// Whole units actually deducted by a daily ration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCost {
    pub food: i32,
    pub water: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLedger {
    pub food: i32,
    pub water: i32,
    pub fuel: i32,
    pub health: i32,
    pub morale: i32,
    #[serde(default)]
    food_debt: f64,
    #[serde(default)]
    water_debt: f64,
}

impl ResourceLedger {
    /// Ledger with explicit supplies and full health and morale.
    #[must_use]
    pub const fn with_pools(food: i32, water: i32, fuel: i32) -> Self {
        Self {
            food,
            water,
            fuel,
            health: STAT_CAP,
            morale: STAT_CAP,
            food_debt: 0.0,
            water_debt: 0.0,
        }
    }

    /// Starting ledger scaled by the tuned supply multiplier and initial health.
    #[must_use]
    pub fn starting(theme: &Theme, difficulty: Difficulty, params: &ParameterStore) -> Self {
        let supply = params.resolve(Param::SupplyMultiplier, difficulty, Some(theme.id));
        let scale = |start: i32| trunc_f64_to_i32(f64::from(start) * supply).clamp(0, SUPPLY_CAP);
        let health_mult = params.resolve(Param::InitialHealth, difficulty, Some(theme.id));
        let health = trunc_f64_to_i32(f64::from(STAT_CAP) * health_mult).clamp(1, STAT_CAP);
        Self {
            health,
            ..Self::with_pools(
                scale(theme.start_food),
                scale(theme.start_water),
                scale(theme.start_fuel),
            )
        }
    }

    #[must_use]
    pub const fn get(&self, pool: Pool) -> i32 {
        match pool {
            Pool::Food => self.food,
            Pool::Water => self.water,
            Pool::Fuel => self.fuel,
            Pool::Health => self.health,
            Pool::Morale => self.morale,
        }
    }

    fn slot(&mut self, pool: Pool) -> &mut i32 {
        match pool {
            Pool::Food => &mut self.food,
            Pool::Water => &mut self.water,
            Pool::Fuel => &mut self.fuel,
            Pool::Health => &mut self.health,
            Pool::Morale => &mut self.morale,
        }
    }

    /// Add `delta` to a pool and clamp to `[0, cap]`, returning the new value.
    pub fn adjust(&mut self, pool: Pool, delta: i32) -> i32 {
        let slot = self.slot(pool);
        *slot = slot.saturating_add(delta).clamp(0, pool.cap());
        *slot
    }

    /// Restore health, returning the amount actually gained.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.health;
        self.adjust(Pool::Health, amount.max(0)) - before
    }

    /// Unmitigated health loss used for penalties and poison. Returns the loss applied.
    pub fn lose_health(&mut self, amount: i32) -> i32 {
        let before = self.health;
        before - self.adjust(Pool::Health, -amount.max(0))
    }

    /// Apply mitigated damage. Any positive amount costs at least one point.
    pub fn damage(&mut self, amount: i32, factor: f64) -> i32 {
        if amount <= 0 {
            return 0;
        }
        let scaled = round_f64_to_i32(f64::from(amount) * factor).max(MIN_DAMAGE);
        self.health = (self.health - scaled).max(0);
        scaled
    }

    /// Consume one day's ration using the tuned per-difficulty rates.
    pub fn consume_daily(
        &mut self,
        difficulty: Difficulty,
        theme: ThemeId,
        params: &ParameterStore,
        modifiers: RationModifiers,
    ) -> DailyCost {
        let daily = params.resolve(Param::DailyConsume, difficulty, Some(theme));
        let food_rate = daily * params.resolve(Param::FoodConsumptionRate, difficulty, Some(theme));
        let water_rate =
            daily * params.resolve(Param::WaterConsumptionRate, difficulty, Some(theme));
        self.consume_at_rates(food_rate, water_rate, modifiers)
    }

    /// Accrue fractional debt at the given rates and pay the whole part.
    pub fn consume_at_rates(
        &mut self,
        food_rate: f64,
        water_rate: f64,
        modifiers: RationModifiers,
    ) -> DailyCost {
        let mut food_cost = settle(&mut self.food_debt, food_rate);
        let mut water_cost = settle(&mut self.water_debt, water_rate);
        if modifiers.exhausted {
            food_cost += EXHAUSTED_EXTRA_COST;
            water_cost += EXHAUSTED_EXTRA_COST;
        }
        if modifiers.supply_companion {
            food_cost = (food_cost - SUPPLY_COMPANION_FOOD_RELIEF).max(0);
        }
        let food_before = self.food;
        let water_before = self.water;
        self.adjust(Pool::Food, -food_cost);
        self.adjust(Pool::Water, -water_cost);
        DailyCost {
            food: food_before - self.food,
            water: water_before - self.water,
        }
    }

    #[must_use]
    pub const fn debts(&self) -> (f64, f64) {
        (self.food_debt, self.water_debt)
    }
}

fn settle(debt: &mut f64, rate: f64) -> i32 {
    if rate.is_finite() && rate > 0.0 {
        *debt += rate;
    }
    let whole = trunc_f64_to_i32(*debt);
    *debt -= f64::from(whole);
    whole
}
