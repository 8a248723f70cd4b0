//! Centralized balance constants for Trailwise simulation logic.
//!
//! Base values live here; tuned multipliers from the adjustment file are
//! layered on top through [`crate::params::ParameterStore`] and never
//! rewrite these numbers.

// Logging keys -------------------------------------------------------------
pub(crate) const DEBUG_ENV_VAR: &str = "TRAILWISE_DEBUG_LOGS";
pub(crate) const EVENT_POOL_ID: &str = "trailwise.events";
pub(crate) const FALLBACK_SCENARIO_TEXT: &str =
    "A strange turn of events unfolds before you. The air crackles with possibility.";

// Pools --------------------------------------------------------------------
pub(crate) const STAT_CAP: i32 = 100;
pub(crate) const SUPPLY_CAP: i32 = 999;
pub(crate) const MIN_DAMAGE: i32 = 1;
pub(crate) const SHIELDED_DAMAGE_FACTOR: f64 = 0.5;
pub(crate) const COMBAT_COMPANION_DAMAGE_FACTOR: f64 = 0.8;
pub(crate) const EXHAUSTED_EXTRA_COST: i32 = 1;
pub(crate) const SUPPLY_COMPANION_FOOD_RELIEF: i32 = 1;

// Status effects -----------------------------------------------------------
pub(crate) const POISON_DAILY_DAMAGE: i32 = 5;
pub(crate) const INSPIRED_DAILY_MORALE: i32 = 3;

// Event selection ----------------------------------------------------------
pub(crate) const NIGHT_HOSTILE_WEIGHT_MULT: f64 = 1.5;
/// Integer scale applied to event weights so the 1.5x night factor stays exact.
pub(crate) const EVENT_WEIGHT_SCALE: u32 = 2;

// Daily penalties ----------------------------------------------------------
pub(crate) const STARVATION_PENALTY: i32 = 8;
pub(crate) const DEHYDRATION_PENALTY: i32 = 12;
pub(crate) const LOW_MORALE_PENALTY: i32 = 3;
pub(crate) const LOW_MORALE_THRESHOLD: i32 = 10;
pub(crate) const EXHAUSTION_PENALTY: i32 = 2;
pub(crate) const NIGHTFALL_MORALE_LOSS: i32 = 3;

// Travel -------------------------------------------------------------------
pub(crate) const TRAVEL_GEAR_BONUS: u32 = 10;
pub(crate) const STORM_DISTANCE_PENALTY: u32 = 15;
pub(crate) const FOG_DISTANCE_PENALTY: u32 = 8;
pub(crate) const NIGHT_DISTANCE_PENALTY: u32 = 10;
pub(crate) const CLEAR_DISTANCE_BONUS: u32 = 5;
pub(crate) const MIN_IMPAIRED_DISTANCE: u32 = 5;
pub(crate) const INSPIRED_DISTANCE_BONUS: u32 = 8;
pub(crate) const DAILY_FUEL_COST: i32 = 1;
pub(crate) const MORALE_DRIFT_TARGET: i32 = 50;

// Rest & scouting ----------------------------------------------------------
pub(crate) const REST_HEAL_MIN: i32 = 8;
pub(crate) const REST_HEAL_MAX: i32 = 18;
pub(crate) const REST_CURE_CHANCE: f64 = 0.5;
pub(crate) const SCOUT_EVENT_CHANCE: f64 = 0.55;
pub(crate) const SCOUT_COMPANION_EVENT_CHANCE: f64 = 0.65;
pub(crate) const SCOUT_SHORTCUT_CHANCE: f64 = 0.30;
pub(crate) const SCOUT_SHORTCUT_MIN: u32 = 5;
pub(crate) const SCOUT_SHORTCUT_MAX: u32 = 15;
pub(crate) const EXPLORER_SCOUT_COUNT: u32 = 5;

// Weather ------------------------------------------------------------------
pub(crate) const WEATHER_WEIGHT_CLEAR: u32 = 45;
pub(crate) const WEATHER_WEIGHT_RAIN: u32 = 25;
pub(crate) const WEATHER_WEIGHT_FOG: u32 = 20;
pub(crate) const WEATHER_WEIGHT_STORM: u32 = 10;
pub(crate) const NIGHT_STORM_WEIGHT_BONUS: u32 = 15;
pub(crate) const NIGHT_CLEAR_WEIGHT_PENALTY: u32 = 10;

// Progress & endings -------------------------------------------------------
pub(crate) const MILESTONE_PERCENTS: [u32; 3] = [25, 50, 75];
pub(crate) const HOARDER_ITEM_COUNT: usize = 5;
pub(crate) const HEALTHY_ENDING_THRESHOLD: i32 = 80;
pub(crate) const COMBAT_DEATH_THRESHOLD: u32 = 3;

// Session defaults ---------------------------------------------------------
pub(crate) const DEFAULT_MAX_DAYS: u32 = 200;
pub(crate) const DEFAULT_SNAPSHOT_INTERVAL: u32 = 10;
pub(crate) const DEFAULT_NARRATIVE_TIMEOUT_MS: u64 = 1_500;
