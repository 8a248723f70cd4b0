//! Journey domain primitives shared by the day simulator and the session driver.
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::cell::{RefCell, RefMut};
use std::fmt;
use thiserror::Error;

use crate::constants::{
    DEFAULT_MAX_DAYS, DEFAULT_NARRATIVE_TIMEOUT_MS, DEFAULT_SNAPSHOT_INTERVAL, DEHYDRATION_PENALTY,
    EXHAUSTION_PENALTY, LOW_MORALE_PENALTY, STARVATION_PENALTY,
};

pub mod daily;
pub mod endgame;
pub mod session;

pub use daily::{Collaborators, DayReport, DaySimulator, Phase, Rejection, TerminalState};
pub use endgame::{death_cause, determine_ending, ending_achievements, final_encounter};
pub use session::{JourneySession, SessionSetup};

/// Stream type handed out by [`RngBundle`].
pub type StreamRng = CountingRng<SmallRng>;

/// Deterministic bundle of RNG streams segregated by simulation domain.
#[derive(Debug, Clone)]
pub struct RngBundle {
    travel: RefCell<StreamRng>,
    events: RefCell<StreamRng>,
    outcomes: RefCell<StreamRng>,
    weather: RefCell<StreamRng>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            travel: RefCell::new(CountingRng::new(derive_stream_seed(seed, b"travel"))),
            events: RefCell::new(CountingRng::new(derive_stream_seed(seed, b"events"))),
            outcomes: RefCell::new(CountingRng::new(derive_stream_seed(seed, b"outcomes"))),
            weather: RefCell::new(CountingRng::new(derive_stream_seed(seed, b"weather"))),
        }
    }

    /// Daily distance draws.
    #[must_use]
    pub fn travel(&self) -> RefMut<'_, StreamRng> {
        self.travel.borrow_mut()
    }

    /// Event chance rolls and event selection.
    #[must_use]
    pub fn events(&self) -> RefMut<'_, StreamRng> {
        self.events.borrow_mut()
    }

    /// Event outcomes, healing, and shortcuts.
    #[must_use]
    pub fn outcomes(&self) -> RefMut<'_, StreamRng> {
        self.outcomes.borrow_mut()
    }

    #[must_use]
    pub fn weather(&self) -> RefMut<'_, StreamRng> {
        self.weather.borrow_mut()
    }

    /// Draw counts per stream in `travel, events, outcomes, weather` order.
    #[must_use]
    pub fn draws(&self) -> [u64; 4] {
        [
            self.travel.borrow().draws(),
            self.events.borrow().draws(),
            self.outcomes.borrow().draws(),
            self.weather.borrow().draws(),
        ]
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

pub(crate) fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    // HMAC accepts keys of any length, so the error arm is unreachable in practice.
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    for (dst, src) in seed_bytes.iter_mut().zip(digest.iter()) {
        *dst = *src;
    }
    u64::from_le_bytes(seed_bytes)
}

/// Health penalty applied at the end of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyKind {
    Starvation,
    Dehydration,
    LowMorale,
    Exhaustion,
}

impl PenaltyKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starvation => "starvation",
            Self::Dehydration => "dehydration",
            Self::LowMorale => "low_morale",
            Self::Exhaustion => "exhaustion",
        }
    }

    /// Unmitigated health lost to this penalty.
    #[must_use]
    pub const fn health_loss(self) -> i32 {
        match self {
            Self::Starvation => STARVATION_PENALTY,
            Self::Dehydration => DEHYDRATION_PENALTY,
            Self::LowMorale => LOW_MORALE_PENALTY,
            Self::Exhaustion => EXHAUSTION_PENALTY,
        }
    }
}

impl fmt::Display for PenaltyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One applied penalty and the health it actually cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Penalty {
    pub kind: PenaltyKind,
    pub amount: i32,
}

/// Per-session knobs that are not balance parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyConfig {
    #[serde(default = "default_max_days")]
    pub max_days: u32,
    /// Days between periodic `player_snapshot` records.
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval: u32,
    #[serde(default = "default_events_enabled")]
    pub events_enabled: bool,
    #[serde(default = "default_narrative_timeout_ms")]
    pub narrative_timeout_ms: u64,
    #[serde(default)]
    pub total_distance_override: Option<u32>,
}

const fn default_max_days() -> u32 {
    DEFAULT_MAX_DAYS
}

const fn default_snapshot_interval() -> u32 {
    DEFAULT_SNAPSHOT_INTERVAL
}

const fn default_events_enabled() -> bool {
    true
}

const fn default_narrative_timeout_ms() -> u64 {
    DEFAULT_NARRATIVE_TIMEOUT_MS
}

impl Default for JourneyConfig {
    fn default() -> Self {
        Self {
            max_days: default_max_days(),
            snapshot_interval: default_snapshot_interval(),
            events_enabled: default_events_enabled(),
            narrative_timeout_ms: default_narrative_timeout_ms(),
            total_distance_override: None,
        }
    }
}

/// Validation failures for [`JourneyConfig`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JourneyConfigError {
    #[error("{field} must be between {min} and {max} (got {value})")]
    RangeViolation {
        field: &'static str,
        min: u64,
        max: u64,
        value: u64,
    },
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: u64,
        value: u64,
    },
}

impl JourneyConfig {
    const MAX_DAYS_CEILING: u32 = 10_000;

    /// Check that every knob is usable.
    ///
    /// # Errors
    ///
    /// Returns the first field that is out of range.
    pub fn validate(&self) -> Result<(), JourneyConfigError> {
        if !(1..=Self::MAX_DAYS_CEILING).contains(&self.max_days) {
            return Err(JourneyConfigError::RangeViolation {
                field: "max_days",
                min: 1,
                max: u64::from(Self::MAX_DAYS_CEILING),
                value: u64::from(self.max_days),
            });
        }
        if self.snapshot_interval == 0 {
            return Err(JourneyConfigError::MinViolation {
                field: "snapshot_interval",
                min: 1,
                value: 0,
            });
        }
        if self.narrative_timeout_ms == 0 {
            return Err(JourneyConfigError::MinViolation {
                field: "narrative_timeout_ms",
                min: 1,
                value: 0,
            });
        }
        if let Some(distance) = self.total_distance_override
            && distance == 0
        {
            return Err(JourneyConfigError::MinViolation {
                field: "total_distance_override",
                min: 1,
                value: 0,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn streams_are_independent_and_reproducible() {
        let a = RngBundle::from_user_seed(42);
        let b = RngBundle::from_user_seed(42);
        let first: u32 = a.travel().gen_range(0..1_000);
        let _ = rand::RngCore::next_u64(&mut *a.events());
        let second: u32 = b.travel().gen_range(0..1_000);
        assert_eq!(first, second);
        assert_eq!(a.draws()[0], 1);
        assert_ne!(
            derive_stream_seed(42, b"travel"),
            derive_stream_seed(42, b"events")
        );
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: JourneyConfig = serde_json::from_str(r#"{"max_days": 30}"#).unwrap();
        assert_eq!(config.max_days, 30);
        assert_eq!(config.snapshot_interval, 10);
        assert!(config.events_enabled);
        assert!(config.validate().is_ok());
        assert_eq!(JourneyConfig::default().max_days, 200);
    }

    #[test]
    fn config_validation_rejects_zero_knobs() {
        let config = JourneyConfig {
            max_days: 0,
            ..JourneyConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(JourneyConfigError::RangeViolation { field: "max_days", .. })
        ));
        let config = JourneyConfig {
            total_distance_override: Some(0),
            ..JourneyConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn penalties_serialize_in_snake_case() {
        let penalty = Penalty {
            kind: PenaltyKind::LowMorale,
            amount: 3,
        };
        let json = serde_json::to_string(&penalty).unwrap();
        assert_eq!(json, r#"{"kind":"low_morale","amount":3}"#);
        assert_eq!(PenaltyKind::Dehydration.health_loss(), 12);
    }
}
