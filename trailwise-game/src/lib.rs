//! Trailwise Game Engine
//!
//! Core simulation for the Trailwise survival journey: resource pools, status
//! effects, weighted random events, the daily state machine, the JSONL session
//! log, and the adjustment file that closes the tuning loop. The crate has no
//! terminal or CLI dependencies; drivers plug in through [`Decider`],
//! [`NarrativeProvider`], and [`StatusDisplay`].

pub mod achievements;
mod constants;
pub mod decision;
pub mod effects;
pub mod events;
pub mod items;
pub mod journey;
pub mod ledger;
pub mod narrative;
pub mod numbers;
pub mod outcome;
pub mod params;
pub mod session_log;
pub mod state;
pub mod themes;
pub mod tuning;

use std::hash::Hasher;
use twox_hash::XxHash64;

// Re-export commonly used types
pub use achievements::Achievement;
pub use decision::{Action, Decider, Prompt, ScriptedDecider};
pub use effects::{EffectKind, StatusEffectTable};
pub use events::{
    EventCtx, EventDecisionTrace, EventKind, EventOutcome, EventPool, SelectionContext,
    handler_for, resolve_event, select_event,
};
pub use items::{Inventory, ItemId, RECIPES, Recipe, recipe_for};
pub use journey::{
    Collaborators, DayReport, DaySimulator, JourneyConfig, JourneyConfigError, JourneySession,
    Penalty, PenaltyKind, Phase, RngBundle, SessionSetup, TerminalState,
};
pub use ledger::{Pool, ResourceLedger};
pub use narrative::{
    NarrativeError, NarrativeProvider, NullDisplay, ScenarioClass, ScenarioRequest,
    StatusDisplay, TemplateNarrator, TimedNarrator,
};
pub use outcome::{DeathCause, Ending, IncompleteReason, SessionOutcome};
pub use params::{Param, ParamKey, ParameterStore, Scope};
pub use session_log::{
    FileSink, LogEvent, LogRecord, LogSink, LogSummary, MemorySink, SessionLog, SessionLogError,
    SessionResult, SessionSummary, read_session_file,
};
pub use state::{Difficulty, PlayerState, TimeOfDay, Weather};
pub use themes::{Companion, CompanionBonus, Theme, ThemeId, theme};
pub use tuning::{
    Classification, DEFAULT_TUNING_FILE, HISTORY_WINDOW, Metrics, TuningFile, TuningFileError,
    TuningIteration, TuningMetadata,
};

/// Stable digest of a traveller's full state, for reproducibility checks.
#[must_use]
pub fn state_fingerprint(player: &PlayerState) -> u64 {
    let bytes = serde_json::to_vec(player).unwrap_or_default();
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(&bytes);
    hasher.finish()
}
