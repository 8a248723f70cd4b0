//! Append-only JSONL record of one play session.
//!
//! Each record is serialized, written, and flushed on its own so a crash loses
//! at most the record in flight. Write failures are reported through `log` and
//! swallowed: a session never stops because its log could not be written.
use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;
use thiserror::Error;

use crate::achievements::Achievement;
use crate::effects::EffectKind;
use crate::journey::Penalty;
use crate::numbers::round_to;
use crate::outcome::{DeathCause, Ending, IncompleteReason};
use crate::state::{Difficulty, PlayerState, TimeOfDay, Weather};
use crate::themes::ThemeId;

pub const LOG_FILE_PREFIX: &str = "game_";
pub const LOG_FILE_EXTENSION: &str = "jsonl";
const MAX_NAME_COLLISIONS: u32 = 10_000;

#[derive(Debug, Error)]
pub enum SessionLogError {
    #[error("failed to access session log {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid record on line {line} of {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("no free log file name for {stem} after {MAX_NAME_COLLISIONS} attempts")]
    NameExhausted { stem: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplies {
    pub food: i32,
    pub water: i32,
    pub fuel: i32,
}

/// Point-in-time view of the traveller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub label: String,
    pub day: u32,
    pub distance: u32,
    pub total_distance: u32,
    pub health: i32,
    pub morale: i32,
    pub supplies: Supplies,
    pub inventory: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companion: Option<String>,
    pub effects: Vec<String>,
    pub time_of_day: TimeOfDay,
    pub weather: Weather,
    pub achievements: usize,
}

impl PlayerSnapshot {
    #[must_use]
    pub fn capture(label: impl Into<String>, player: &PlayerState) -> Self {
        Self {
            label: label.into(),
            day: player.day,
            distance: player.distance_travelled,
            total_distance: player.total_distance,
            health: player.health(),
            morale: player.morale(),
            supplies: Supplies {
                food: player.ledger.food,
                water: player.ledger.water,
                fuel: player.ledger.fuel,
            },
            inventory: player.inventory.names(),
            companion: player.companion.as_ref().map(|c| c.name.clone()),
            effects: player.effects.names(),
            time_of_day: player.time_of_day,
            weather: player.weather,
            achievements: player.achievements.len(),
        }
    }
}

/// Counters written into the closing `session_end` record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSummary {
    pub total_events: usize,
    pub choices_made: usize,
    pub random_events: usize,
    pub deaths: usize,
    pub victories: usize,
    pub errors: usize,
    #[serde(default)]
    pub error_types: BTreeMap<String, usize>,
    #[serde(default)]
    pub write_failures: usize,
}

/// Kind-specific payload of a log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEvent {
    SessionStart {
        test_mode: bool,
    },
    GameStart {
        theme: ThemeId,
        difficulty: Difficulty,
        seed: u64,
    },
    PlayerSnapshot(PlayerSnapshot),
    Choice {
        prompt: String,
        choice: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<String>,
    },
    EventStart {
        event: String,
        day: u32,
    },
    PenaltiesApplied {
        day: u32,
        penalties: Vec<Penalty>,
        health: i32,
    },
    EffectExpired {
        effect: EffectKind,
        day: u32,
    },
    AchievementUnlock {
        achievement: Achievement,
        day: u32,
    },
    MaxDaysReached {
        days: u32,
    },
    Death {
        cause: DeathCause,
        day: u32,
        distance: u32,
        distance_pct: f64,
        health: i32,
        food: i32,
        water: i32,
        fuel: i32,
        difficulty: Difficulty,
        theme: ThemeId,
    },
    Victory {
        ending: Ending,
        day: u32,
        health: i32,
        morale: i32,
        achievements: usize,
        difficulty: Difficulty,
        theme: ThemeId,
    },
    Incomplete {
        reason: IncompleteReason,
        day: u32,
        distance_pct: f64,
    },
    Error {
        error_type: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        context: Option<String>,
    },
    SessionEnd {
        summary: LogSummary,
    },
}

impl LogEvent {
    #[must_use]
    pub fn death(cause: DeathCause, player: &PlayerState) -> Self {
        Self::Death {
            cause,
            day: player.day,
            distance: player.distance_travelled,
            distance_pct: round_to(player.progress_pct(), 1),
            health: player.health(),
            food: player.ledger.food,
            water: player.ledger.water,
            fuel: player.ledger.fuel,
            difficulty: player.difficulty,
            theme: player.theme,
        }
    }

    #[must_use]
    pub fn victory(ending: Ending, player: &PlayerState) -> Self {
        Self::Victory {
            ending,
            day: player.day,
            health: player.health(),
            morale: player.morale(),
            achievements: player.achievements.len(),
            difficulty: player.difficulty,
            theme: player.theme,
        }
    }

    const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Death { .. } | Self::Victory { .. } | Self::Incomplete { .. }
        )
    }

    const fn day(&self) -> Option<u32> {
        match self {
            Self::PlayerSnapshot(snapshot) => Some(snapshot.day),
            Self::EventStart { day, .. }
            | Self::PenaltiesApplied { day, .. }
            | Self::EffectExpired { day, .. }
            | Self::AchievementUnlock { day, .. } => Some(*day),
            _ => None,
        }
    }
}

/// One line of the session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: String,
    /// Seconds since the session started, rounded to two places.
    pub elapsed: f64,
    #[serde(flatten)]
    pub event: LogEvent,
}

/// Destination for serialized log lines.
pub trait LogSink {
    /// Append one complete line and make it durable before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if the line could not be written.
    fn append_line(&mut self, line: &str) -> io::Result<()>;
}

/// Anything that accepts session log events.
pub trait Recorder {
    /// Returns `true` when the event was accepted.
    fn record(&mut self, event: LogEvent) -> bool;
}

impl Recorder for Vec<LogEvent> {
    fn record(&mut self, event: LogEvent) -> bool {
        self.push(event);
        true
    }
}

/// One exclusively created JSONL file per session.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: File,
}

impl FileSink {
    /// Create `game_<YYYYmmdd_HHMMSS>.jsonl` in `dir`, adding `_<n>` on collision.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or no free name is found.
    pub fn create(dir: &Path, started: DateTime<Local>) -> Result<Self, SessionLogError> {
        fs::create_dir_all(dir).map_err(|source| SessionLogError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let stem = format!("{LOG_FILE_PREFIX}{}", started.format("%Y%m%d_%H%M%S"));
        for attempt in 0..MAX_NAME_COLLISIONS {
            let name = if attempt == 0 {
                format!("{stem}.{LOG_FILE_EXTENSION}")
            } else {
                format!("{stem}_{attempt}.{LOG_FILE_EXTENSION}")
            };
            let path = dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok(Self { path, file }),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
                Err(source) => return Err(SessionLogError::Io { path, source }),
            }
        }
        Err(SessionLogError::NameExhausted { stem })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn append_line(&mut self, line: &str) -> io::Result<()> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        self.file.write_all(buf.as_bytes())?;
        self.file.flush()
    }
}

/// In-memory sink; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Rc<RefCell<Vec<String>>>,
}

impl MemorySink {
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    /// Parse every captured line, skipping any that do not decode.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.lines
            .borrow()
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

impl LogSink for MemorySink {
    fn append_line(&mut self, line: &str) -> io::Result<()> {
        self.lines.borrow_mut().push(line.to_string());
        Ok(())
    }
}

/// Structured, append-only session log.
///
/// Enforces at most one terminal record (death, victory, or incomplete) and
/// that `session_end` is the last record. Dropping an unclosed log closes it
/// as abandoned.
pub struct SessionLog<S: LogSink> {
    sink: S,
    started: Instant,
    terminal_written: bool,
    closed: bool,
    last_day: u32,
    last_distance_pct: f64,
    summary: LogSummary,
}

impl<S: LogSink> SessionLog<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            started: Instant::now(),
            terminal_written: false,
            closed: false,
            last_day: 0,
            last_distance_pct: 0.0,
            summary: LogSummary::default(),
        }
    }

    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    #[must_use]
    pub const fn summary(&self) -> &LogSummary {
        &self.summary
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub const fn has_terminal(&self) -> bool {
        self.terminal_written
    }

    /// Append a record. Returns `true` when it was accepted and written.
    pub fn record(&mut self, event: LogEvent) -> bool {
        if self.closed {
            log::warn!("dropping {} record after session_end", record_type(&event));
            return false;
        }
        if event.is_terminal() {
            if self.terminal_written {
                log::warn!("dropping second terminal record {}", record_type(&event));
                return false;
            }
            self.terminal_written = true;
        }
        if let Some(day) = event.day() {
            self.last_day = day;
        }
        if let LogEvent::PlayerSnapshot(snapshot) = &event
            && snapshot.total_distance > 0
        {
            self.last_distance_pct =
                f64::from(snapshot.distance) / f64::from(snapshot.total_distance) * 100.0;
        }
        self.count(&event);
        if matches!(event, LogEvent::SessionEnd { .. }) {
            self.closed = true;
        }
        self.write(event)
    }

    pub fn choice(
        &mut self,
        prompt: impl Into<String>,
        choice: impl Into<String>,
        context: Option<String>,
    ) -> bool {
        self.record(LogEvent::Choice {
            prompt: prompt.into(),
            choice: choice.into(),
            context,
        })
    }

    pub fn error(
        &mut self,
        error_type: impl Into<String>,
        message: impl Into<String>,
        context: Option<String>,
    ) -> bool {
        self.record(LogEvent::Error {
            error_type: error_type.into(),
            message: message.into(),
            context,
        })
    }

    /// Write `session_end` with the running summary. Idempotent.
    pub fn close(&mut self) -> LogSummary {
        if !self.closed {
            let mut summary = self.summary.clone();
            summary.total_events += 1;
            self.record(LogEvent::SessionEnd { summary });
        }
        self.summary.clone()
    }

    /// Close a session that stopped early, writing an incomplete record first if needed.
    pub fn abandon(&mut self, reason: IncompleteReason) -> LogSummary {
        if !self.closed && !self.terminal_written {
            self.record(LogEvent::Incomplete {
                reason,
                day: self.last_day,
                distance_pct: round_to(self.last_distance_pct, 1),
            });
        }
        self.close()
    }

    fn count(&mut self, event: &LogEvent) {
        self.summary.total_events += 1;
        match event {
            LogEvent::Choice { .. } => self.summary.choices_made += 1,
            LogEvent::EventStart { .. } => self.summary.random_events += 1,
            LogEvent::Death { .. } => self.summary.deaths += 1,
            LogEvent::Victory { .. } => self.summary.victories += 1,
            LogEvent::Error { error_type, .. } => {
                self.summary.errors += 1;
                *self
                    .summary
                    .error_types
                    .entry(error_type.clone())
                    .or_insert(0) += 1;
            }
            _ => {}
        }
    }

    fn write(&mut self, event: LogEvent) -> bool {
        let record = LogRecord {
            timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Millis, false),
            elapsed: round_to(self.started.elapsed().as_secs_f64(), 2),
            event,
        };
        let result = serde_json::to_string(&record)
            .map_err(io::Error::other)
            .and_then(|line| self.sink.append_line(&line));
        match result {
            Ok(()) => true,
            Err(err) => {
                self.summary.write_failures += 1;
                log::warn!(
                    "session log write failed for {}: {err}",
                    record_type(&record.event)
                );
                false
            }
        }
    }
}

impl<S: LogSink> Recorder for SessionLog<S> {
    fn record(&mut self, event: LogEvent) -> bool {
        Self::record(self, event)
    }
}

impl<S: LogSink> Drop for SessionLog<S> {
    fn drop(&mut self) {
        if !self.closed {
            log::debug!("closing abandoned session log");
            self.abandon(IncompleteReason::Abandoned);
        }
    }
}

fn record_type(event: &LogEvent) -> &'static str {
    match event {
        LogEvent::SessionStart { .. } => "session_start",
        LogEvent::GameStart { .. } => "game_start",
        LogEvent::PlayerSnapshot(_) => "player_snapshot",
        LogEvent::Choice { .. } => "choice",
        LogEvent::EventStart { .. } => "event_start",
        LogEvent::PenaltiesApplied { .. } => "penalties_applied",
        LogEvent::EffectExpired { .. } => "effect_expired",
        LogEvent::AchievementUnlock { .. } => "achievement_unlock",
        LogEvent::MaxDaysReached { .. } => "max_days_reached",
        LogEvent::Death { .. } => "death",
        LogEvent::Victory { .. } => "victory",
        LogEvent::Incomplete { .. } => "incomplete",
        LogEvent::Error { .. } => "error",
        LogEvent::SessionEnd { .. } => "session_end",
    }
}

/// Read every record of a session file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a non-blank line fails to decode.
pub fn read_session_file(path: &Path) -> Result<Vec<LogRecord>, SessionLogError> {
    let raw = fs::read_to_string(path).map_err(|source| SessionLogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut records = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(line).map_err(|source| SessionLogError::Decode {
            path: path.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Coarse result of a logged session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionResult {
    Death,
    Victory,
    Incomplete,
}

/// Per-session facts extracted from a log for offline analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub test_mode: bool,
    pub theme: Option<ThemeId>,
    pub difficulty: Option<Difficulty>,
    pub seed: Option<u64>,
    pub result: SessionResult,
    pub death_cause: Option<DeathCause>,
    pub death_day: Option<u32>,
    pub death_distance_pct: Option<f64>,
    pub ending: Option<Ending>,
    pub final_day: u32,
    pub final_health: i32,
    /// Random events in the order they fired.
    pub events: Vec<String>,
    pub choices: usize,
    pub error_types: Vec<String>,
}

impl SessionSummary {
    /// Summarize a record sequence; `None` when there are no records.
    #[must_use]
    pub fn from_records(records: &[LogRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        let mut summary = Self {
            test_mode: false,
            theme: None,
            difficulty: None,
            seed: None,
            result: SessionResult::Incomplete,
            death_cause: None,
            death_day: None,
            death_distance_pct: None,
            ending: None,
            final_day: 0,
            final_health: 0,
            events: Vec::new(),
            choices: 0,
            error_types: Vec::new(),
        };
        for record in records {
            match &record.event {
                LogEvent::SessionStart { test_mode } => summary.test_mode = *test_mode,
                LogEvent::GameStart {
                    theme,
                    difficulty,
                    seed,
                } => {
                    summary.theme = Some(*theme);
                    summary.difficulty = Some(*difficulty);
                    summary.seed = Some(*seed);
                }
                LogEvent::PlayerSnapshot(snapshot) => {
                    summary.final_day = snapshot.day;
                    summary.final_health = snapshot.health;
                }
                LogEvent::Choice { .. } => summary.choices += 1,
                LogEvent::EventStart { event, .. } => summary.events.push(event.clone()),
                LogEvent::Death {
                    cause,
                    day,
                    distance_pct,
                    ..
                } if summary.result == SessionResult::Incomplete => {
                    summary.result = SessionResult::Death;
                    summary.death_cause = Some(*cause);
                    summary.death_day = Some(*day);
                    summary.death_distance_pct = Some(*distance_pct);
                }
                LogEvent::Victory { ending, .. } if summary.result == SessionResult::Incomplete => {
                    summary.result = SessionResult::Victory;
                    summary.ending = Some(*ending);
                }
                LogEvent::Error { error_type, .. } => summary.error_types.push(error_type.clone()),
                _ => {}
            }
        }
        Some(summary)
    }
}
