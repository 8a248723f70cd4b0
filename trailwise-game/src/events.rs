//! Weighted random event pool and selection telemetry.
//!
//! Selection runs on integer weights. Base weights are scaled by
//! [`EVENT_WEIGHT_SCALE`] so the night multiplier for hostile events stays
//! exact, then a single uniform roll walks the cumulative table.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{EVENT_POOL_ID, EVENT_WEIGHT_SCALE, NIGHT_HOSTILE_WEIGHT_MULT};
use crate::numbers::trunc_f64_to_u32;
use crate::state::TimeOfDay;

pub mod handlers;

pub use handlers::{EventCtx, EventOutcome, Handler, handler_for, resolve_event};

/// Every random event the trail can throw at the traveller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Bandit,
    River,
    Storm,
    Wildlife,
    Trader,
    Discovery,
    Morale,
    SpecialItem,
    Riddle,
    Companion,
    AmbushElite,
    WeatherShift,
    GeneratedScenario,
}

impl EventKind {
    pub const ALL: [Self; 13] = [
        Self::Bandit,
        Self::River,
        Self::Storm,
        Self::Wildlife,
        Self::Trader,
        Self::Discovery,
        Self::Morale,
        Self::SpecialItem,
        Self::Riddle,
        Self::Companion,
        Self::AmbushElite,
        Self::WeatherShift,
        Self::GeneratedScenario,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bandit => "bandit",
            Self::River => "river",
            Self::Storm => "storm",
            Self::Wildlife => "wildlife",
            Self::Trader => "trader",
            Self::Discovery => "discovery",
            Self::Morale => "morale",
            Self::SpecialItem => "special_item",
            Self::Riddle => "riddle",
            Self::Companion => "companion",
            Self::AmbushElite => "ambush_elite",
            Self::WeatherShift => "weather_shift",
            Self::GeneratedScenario => "generated_scenario",
        }
    }

    /// Weight in the standard pool.
    #[must_use]
    pub const fn base_weight(self) -> u32 {
        match self {
            Self::Bandit => 14,
            Self::River | Self::Wildlife | Self::Morale => 10,
            Self::Storm => 12,
            Self::Trader => 11,
            Self::Discovery => 9,
            Self::SpecialItem | Self::WeatherShift => 6,
            Self::Riddle => 7,
            Self::Companion | Self::GeneratedScenario => 5,
            Self::AmbushElite => 4,
        }
    }

    /// Hostile events grow more likely after dark.
    #[must_use]
    pub const fn is_hostile(self) -> bool {
        matches!(self, Self::Bandit | Self::AmbushElite | Self::Wildlife)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s).ok_or(())
    }
}

impl From<EventKind> for String {
    fn from(value: EventKind) -> Self {
        value.as_str().to_string()
    }
}

/// Non-empty weighted set of events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPool {
    entries: Vec<(EventKind, u32)>,
}

impl EventPool {
    /// Build a pool, rejecting empty pools and pools with no positive weight.
    #[must_use]
    pub fn new(entries: Vec<(EventKind, u32)>) -> Option<Self> {
        if entries.iter().any(|(_, weight)| *weight > 0) {
            Some(Self { entries })
        } else {
            None
        }
    }

    /// The full pool with base weights.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            entries: EventKind::ALL
                .into_iter()
                .map(|kind| (kind, kind.base_weight()))
                .collect(),
        }
    }

    #[must_use]
    pub fn single(kind: EventKind) -> Self {
        Self {
            entries: vec![(kind, 1)],
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (EventKind, u32)> + '_ {
        self.entries.iter().copied()
    }
}

impl Default for EventPool {
    fn default() -> Self {
        Self::standard()
    }
}

/// Conditions that shape selection weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionContext {
    pub time_of_day: TimeOfDay,
}

/// Explainability telemetry for random event selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDecisionTrace {
    pub pool_id: String,
    pub roll: RollValue,
    pub candidates: Vec<WeightedCandidate>,
    pub chosen_id: String,
}

/// Candidate weight telemetry captured during event selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedCandidate {
    pub id: String,
    pub base_weight: f64,
    /// Multipliers applied in order.
    pub multipliers: Vec<WeightFactor>,
    pub final_weight: f64,
}

/// Random roll value used by weighted selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RollValue {
    U32(u32),
    F32(f32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightFactor {
    pub label: String,
    pub value: f64,
}

/// Pick one event from `pool`, returning it with the trace of the draw.
pub fn select_event<R: Rng + ?Sized>(
    pool: &EventPool,
    context: SelectionContext,
    rng: &mut R,
) -> (EventKind, EventDecisionTrace) {
    let night = context.time_of_day.is_night();
    let mut weights = Vec::with_capacity(pool.entries.len());
    let mut candidates = Vec::with_capacity(pool.entries.len());
    for (idx, (kind, base)) in pool.entries().enumerate() {
        let mut multipliers = Vec::new();
        let mut scaled = base.saturating_mul(EVENT_WEIGHT_SCALE);
        if night && kind.is_hostile() {
            multipliers.push(WeightFactor {
                label: "night_hostile".to_string(),
                value: NIGHT_HOSTILE_WEIGHT_MULT,
            });
            scaled = trunc_f64_to_u32(f64::from(scaled) * NIGHT_HOSTILE_WEIGHT_MULT);
        }
        weights.push((idx, scaled));
        candidates.push(WeightedCandidate {
            id: kind.as_str().to_string(),
            base_weight: f64::from(base),
            multipliers,
            final_weight: f64::from(scaled) / f64::from(EVENT_WEIGHT_SCALE),
        });
    }

    // EventPool guarantees a positive total, so the draw always lands.
    let (chosen_idx, roll) = choose_weighted(&weights, rng).unwrap_or((0, 0));
    let chosen = pool
        .entries
        .get(chosen_idx)
        .or_else(|| pool.entries.first())
        .map_or(EventKind::GeneratedScenario, |(kind, _)| *kind);
    let trace = EventDecisionTrace {
        pool_id: EVENT_POOL_ID.to_string(),
        roll: RollValue::U32(roll),
        candidates,
        chosen_id: chosen.as_str().to_string(),
    };
    (chosen, trace)
}

fn choose_weighted<R: Rng + ?Sized>(weights: &[(usize, u32)], rng: &mut R) -> Option<(usize, u32)> {
    let total_weight: u32 = weights.iter().map(|(_, weight)| *weight).sum();
    if total_weight == 0 {
        return None;
    }

    let roll = rng.gen_range(0..total_weight);
    let mut current = 0;
    for (idx, weight) in weights {
        current += *weight;
        if roll < current {
            return Some((*idx, roll));
        }
    }

    weights.first().map(|(idx, _)| (*idx, roll))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::collections::BTreeMap;

    #[test]
    fn single_event_pool_always_returns_its_event() {
        let pool = EventPool::single(EventKind::Riddle);
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..50 {
            let (kind, trace) = select_event(&pool, SelectionContext::default(), &mut rng);
            assert_eq!(kind, EventKind::Riddle);
            assert_eq!(trace.chosen_id, "riddle");
        }
    }

    #[test]
    fn empty_or_weightless_pools_are_rejected() {
        assert!(EventPool::new(Vec::new()).is_none());
        assert!(EventPool::new(vec![(EventKind::Bandit, 0)]).is_none());
        assert!(EventPool::new(vec![(EventKind::Bandit, 0), (EventKind::River, 2)]).is_some());
    }

    #[test]
    fn every_weighted_event_is_reachable() {
        let pool = EventPool::standard();
        let mut rng = SmallRng::seed_from_u64(11);
        let mut seen = BTreeMap::new();
        for _ in 0..5_000 {
            let (kind, _) = select_event(&pool, SelectionContext::default(), &mut rng);
            *seen.entry(kind).or_insert(0_u32) += 1;
        }
        assert_eq!(seen.len(), EventKind::ALL.len());
    }

    #[test]
    fn night_boosts_hostile_weights_in_trace() {
        let pool = EventPool::standard();
        let mut rng = SmallRng::seed_from_u64(5);
        let night = SelectionContext {
            time_of_day: TimeOfDay::Night,
        };
        let (_, trace) = select_event(&pool, night, &mut rng);
        let bandit = trace
            .candidates
            .iter()
            .find(|c| c.id == "bandit")
            .unwrap();
        assert!((bandit.final_weight - 21.0).abs() < f64::EPSILON);
        assert_eq!(bandit.multipliers.len(), 1);
        let river = trace.candidates.iter().find(|c| c.id == "river").unwrap();
        assert!((river.final_weight - 10.0).abs() < f64::EPSILON);
        assert!(river.multipliers.is_empty());
        assert_eq!(trace.pool_id, EVENT_POOL_ID);
    }

    #[test]
    fn kinds_round_trip_through_names() {
        for kind in EventKind::ALL {
            assert_eq!(kind.as_str().parse::<EventKind>(), Ok(kind));
        }
        let total: u32 = EventKind::ALL.iter().map(|k| k.base_weight()).sum();
        assert_eq!(total, 109);
    }
}
