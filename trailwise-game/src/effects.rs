//! Timed status effects with a recurring per-day impact.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

use crate::constants::{INSPIRED_DAILY_MORALE, POISON_DAILY_DAMAGE};
use crate::ledger::{Pool, ResourceLedger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    Poisoned,
    Inspired,
    Exhausted,
    Shielded,
    Lucky,
}

impl EffectKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Poisoned => "poisoned",
            Self::Inspired => "inspired",
            Self::Exhausted => "exhausted",
            Self::Shielded => "shielded",
            Self::Lucky => "lucky",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of advancing one effect by a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectTick {
    pub effect: EffectKind,
    pub health_delta: i32,
    pub morale_delta: i32,
    pub expired: bool,
}

pub type EffectTicks = SmallVec<[EffectTick; 4]>;

/// Active effects keyed by kind; iteration order is the enum order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusEffectTable {
    active: BTreeMap<EffectKind, u32>,
}

impl StatusEffectTable {
    /// Set or reset an effect's remaining duration. A zero duration clears it.
    pub fn apply(&mut self, effect: EffectKind, days: u32) {
        if days == 0 {
            self.active.remove(&effect);
        } else {
            self.active.insert(effect, days);
        }
    }

    pub fn remove(&mut self, effect: EffectKind) -> bool {
        self.active.remove(&effect).is_some()
    }

    #[must_use]
    pub fn contains(&self, effect: EffectKind) -> bool {
        self.active.contains_key(&effect)
    }

    #[must_use]
    pub fn remaining(&self, effect: EffectKind) -> Option<u32> {
        self.active.get(&effect).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EffectKind, u32)> + '_ {
        self.active.iter().map(|(effect, days)| (*effect, *days))
    }

    /// Apply each effect's daily impact, then count it down, dropping the ones that run out.
    pub fn tick(&mut self, ledger: &mut ResourceLedger) -> EffectTicks {
        let mut ticks = EffectTicks::new();
        for (effect, remaining) in &mut self.active {
            let (health_delta, morale_delta) = match effect {
                EffectKind::Poisoned => (-ledger.lose_health(POISON_DAILY_DAMAGE), 0),
                EffectKind::Inspired => {
                    let before = ledger.morale;
                    let after = ledger.adjust(Pool::Morale, INSPIRED_DAILY_MORALE);
                    (0, after - before)
                }
                EffectKind::Exhausted | EffectKind::Shielded | EffectKind::Lucky => (0, 0),
            };
            *remaining = remaining.saturating_sub(1);
            ticks.push(EffectTick {
                effect: *effect,
                health_delta,
                morale_delta,
                expired: *remaining == 0,
            });
        }
        self.active.retain(|_, remaining| *remaining > 0);
        ticks
    }

    /// Effect names for log snapshots.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.active.keys().map(ToString::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_day_effect_expires_on_first_tick() {
        let mut table = StatusEffectTable::default();
        let mut ledger = ResourceLedger::with_pools(10, 10, 10);
        table.apply(EffectKind::Lucky, 1);
        let ticks = table.tick(&mut ledger);
        assert!(!table.contains(EffectKind::Lucky));
        assert_eq!(ticks.len(), 1);
        assert!(ticks[0].expired);
    }

    #[test]
    fn reapply_overwrites_instead_of_stacking() {
        let mut table = StatusEffectTable::default();
        table.apply(EffectKind::Shielded, 4);
        table.apply(EffectKind::Shielded, 2);
        assert_eq!(table.remaining(EffectKind::Shielded), Some(2));
        table.apply(EffectKind::Shielded, 0);
        assert!(table.is_empty());
    }

    #[test]
    fn poison_and_inspiration_apply_daily_impacts() {
        let mut table = StatusEffectTable::default();
        let mut ledger = ResourceLedger::with_pools(10, 10, 10);
        ledger.morale = 50;
        table.apply(EffectKind::Poisoned, 3);
        table.apply(EffectKind::Inspired, 2);
        let ticks = table.tick(&mut ledger);
        assert_eq!(ledger.health, 95);
        assert_eq!(ledger.morale, 53);
        assert_eq!(ticks[0].effect, EffectKind::Poisoned);
        assert_eq!(ticks[0].health_delta, -5);
        assert_eq!(ticks[1].morale_delta, 3);
        assert!(ticks.iter().all(|tick| !tick.expired));
        assert_eq!(table.remaining(EffectKind::Poisoned), Some(2));
    }

    #[test]
    fn tick_order_is_stable() {
        let mut table = StatusEffectTable::default();
        let mut ledger = ResourceLedger::with_pools(10, 10, 10);
        table.apply(EffectKind::Lucky, 2);
        table.apply(EffectKind::Poisoned, 2);
        table.apply(EffectKind::Exhausted, 2);
        let order: Vec<_> = table.tick(&mut ledger).iter().map(|t| t.effect).collect();
        assert_eq!(
            order,
            vec![EffectKind::Poisoned, EffectKind::Exhausted, EffectKind::Lucky]
        );
    }
}
