use serde::{Deserialize, Serialize};

use crate::decision::{Action, Decider};
use crate::events::EventCtx;
use crate::journey::daily::{Collaborators, DaySimulator, DayReport, Phase, TerminalState};
use crate::journey::endgame::{death_cause, determine_ending, ending_achievements, final_encounter};
use crate::journey::{JourneyConfig, JourneyConfigError};
use crate::narrative::{NarrativeProvider, StatusDisplay};
use crate::numbers::round_to;
use crate::outcome::{IncompleteReason, SessionOutcome};
use crate::params::ParameterStore;
use crate::session_log::{LogEvent, LogSink, LogSummary, PlayerSnapshot, SessionLog};
use crate::state::{Difficulty, PlayerState};
use crate::themes::ThemeId;

/// Free actions tolerated within one day before the decider is considered stuck.
const MAX_FREE_ACTIONS_PER_DAY: u32 = 64;

/// Who is travelling, where, and with which seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSetup {
    pub theme: ThemeId,
    pub difficulty: Difficulty,
    pub seed: u64,
    /// Marks automated sessions in the log.
    #[serde(default)]
    pub test_mode: bool,
}

/// High-level session wrapper binding the day simulator to a traveller and its log.
pub struct JourneySession<'p, S: LogSink> {
    simulator: DaySimulator<'p>,
    player: PlayerState,
    log: SessionLog<S>,
    setup: SessionSetup,
    outcome: Option<SessionOutcome>,
    free_actions_today: u32,
}

impl<'p, S: LogSink> JourneySession<'p, S> {
    /// Start a session and write its opening records.
    ///
    /// # Errors
    ///
    /// Returns an error when `config` fails validation.
    pub fn new(
        params: &'p ParameterStore,
        config: JourneyConfig,
        setup: SessionSetup,
        sink: S,
    ) -> Result<Self, JourneyConfigError> {
        config.validate()?;
        let mut player = PlayerState::new(setup.theme, setup.difficulty, params);
        if let Some(distance) = config.total_distance_override {
            player.total_distance = distance;
        }
        let mut log = SessionLog::new(sink);
        log.record(LogEvent::SessionStart {
            test_mode: setup.test_mode,
        });
        log.record(LogEvent::GameStart {
            theme: setup.theme,
            difficulty: setup.difficulty,
            seed: setup.seed,
        });
        log.record(LogEvent::PlayerSnapshot(PlayerSnapshot::capture(
            "initial", &player,
        )));
        Ok(Self {
            simulator: DaySimulator::new(params, config, setup.seed),
            player,
            log,
            setup,
            outcome: None,
            free_actions_today: 0,
        })
    }

    /// Swap the simulator, e.g. to install a custom event pool.
    #[must_use]
    pub fn with_simulator(mut self, simulator: DaySimulator<'p>) -> Self {
        self.simulator = simulator;
        self
    }

    #[must_use]
    pub const fn player(&self) -> &PlayerState {
        &self.player
    }

    #[must_use]
    pub const fn log(&self) -> &SessionLog<S> {
        &self.log
    }

    #[must_use]
    pub const fn simulator(&self) -> &DaySimulator<'p> {
        &self.simulator
    }

    #[must_use]
    pub const fn setup(&self) -> SessionSetup {
        self.setup
    }

    #[must_use]
    pub const fn outcome(&self) -> Option<SessionOutcome> {
        self.outcome
    }

    /// Ask the decider for one action and resolve it.
    ///
    /// Returns the outcome once the session has ended.
    pub fn step(
        &mut self,
        decider: &mut dyn Decider,
        narrator: &dyn NarrativeProvider,
        display: &mut dyn StatusDisplay,
    ) -> Option<SessionOutcome> {
        if self.outcome.is_some() {
            return self.outcome;
        }
        let action = decider.choose_action(&self.player);
        self.log.choice(
            "daily_action",
            action.to_string(),
            Some(format!("day {}", self.player.day)),
        );
        let report = {
            let mut io = Collaborators {
                decider: &mut *decider,
                narrator,
                display,
                log: &mut self.log,
            };
            self.simulator.perform(&mut self.player, action, &mut io)
        };
        self.after_action(action, &report, decider, narrator)
    }

    /// Drive the session to a terminal outcome.
    pub fn run(
        &mut self,
        decider: &mut dyn Decider,
        narrator: &dyn NarrativeProvider,
        display: &mut dyn StatusDisplay,
    ) -> SessionOutcome {
        loop {
            if let Some(outcome) = self.step(decider, narrator, display) {
                return outcome;
            }
        }
    }

    /// Stop early, writing an incomplete record. Idempotent once the session has ended.
    pub fn abandon(&mut self, reason: IncompleteReason) -> SessionOutcome {
        match self.outcome {
            Some(outcome) => outcome,
            None => self.finish(SessionOutcome::Incomplete { reason }),
        }
    }

    /// Close the log and return the summary it wrote.
    pub fn close(&mut self) -> LogSummary {
        self.log.close()
    }

    fn after_action(
        &mut self,
        action: Action,
        report: &DayReport,
        decider: &mut dyn Decider,
        narrator: &dyn NarrativeProvider,
    ) -> Option<SessionOutcome> {
        if !action.consumes_day() {
            self.free_actions_today += 1;
            if self.free_actions_today > MAX_FREE_ACTIONS_PER_DAY {
                self.log.error(
                    "DeciderStalled",
                    format!(
                        "{} free actions without ending day {}",
                        self.free_actions_today, self.player.day
                    ),
                    Some(action.to_string()),
                );
                return Some(self.finish(SessionOutcome::Incomplete {
                    reason: IncompleteReason::Fault,
                }));
            }
            return None;
        }
        self.free_actions_today = 0;

        let interval = self.simulator.config().snapshot_interval;
        if interval > 0 && self.player.day % interval == 0 {
            self.log.record(LogEvent::PlayerSnapshot(PlayerSnapshot::capture(
                format!("day_{}", self.player.day),
                &self.player,
            )));
        }

        match report.phase {
            Phase::Terminal(TerminalState::Dead) => Some(self.finish(SessionOutcome::Died {
                cause: death_cause(&self.player),
            })),
            Phase::Terminal(TerminalState::Arrived) => Some(self.arrive(decider, narrator)),
            _ if self.player.day >= self.simulator.config().max_days => {
                self.log.record(LogEvent::MaxDaysReached {
                    days: self.player.day,
                });
                Some(self.finish(SessionOutcome::Incomplete {
                    reason: IncompleteReason::MaxDays,
                }))
            }
            _ => None,
        }
    }

    fn arrive(
        &mut self,
        decider: &mut dyn Decider,
        narrator: &dyn NarrativeProvider,
    ) -> SessionOutcome {
        let result = {
            let mut outcomes = self.simulator.rng().outcomes();
            let mut ctx = EventCtx {
                player: &mut self.player,
                params: self.simulator.params(),
                rng: &mut *outcomes,
                decider,
                narrator,
                log: &mut self.log,
                scope: "final_encounter",
            };
            final_encounter(&mut ctx).result
        };
        log::debug!("final encounter resolved as {result}");
        self.simulator.settle(&self.player);
        if self.player.is_alive() {
            self.finish(SessionOutcome::Arrived {
                ending: determine_ending(&self.player),
            })
        } else {
            self.finish(SessionOutcome::Died {
                cause: death_cause(&self.player),
            })
        }
    }

    fn finish(&mut self, outcome: SessionOutcome) -> SessionOutcome {
        self.log.record(LogEvent::PlayerSnapshot(PlayerSnapshot::capture(
            "final",
            &self.player,
        )));
        match outcome {
            SessionOutcome::Died { cause } => {
                self.log.record(LogEvent::death(cause, &self.player));
            }
            SessionOutcome::Arrived { ending } => {
                for achievement in ending_achievements(ending) {
                    if self.player.try_unlock(*achievement) {
                        self.log.record(LogEvent::AchievementUnlock {
                            achievement: *achievement,
                            day: self.player.day,
                        });
                    }
                }
                self.log.record(LogEvent::victory(ending, &self.player));
            }
            SessionOutcome::Incomplete { reason } => {
                self.log.record(LogEvent::Incomplete {
                    reason,
                    day: self.player.day,
                    distance_pct: round_to(self.player.progress_pct(), 1),
                });
            }
        }
        let summary = self.log.close();
        log::info!(
            "session seed {} ended as {} on day {} ({} records)",
            self.setup.seed,
            outcome.label(),
            self.player.day,
            summary.total_events
        );
        self.outcome = Some(outcome);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::ScriptedDecider;
    use crate::narrative::{NullDisplay, TemplateNarrator};
    use crate::outcome::DeathCause;
    use crate::session_log::{LogRecord, MemorySink};

    fn setup(seed: u64) -> SessionSetup {
        SessionSetup {
            theme: ThemeId::Desert,
            difficulty: Difficulty::Normal,
            seed,
            test_mode: true,
        }
    }

    fn record_types(records: &[LogRecord]) -> Vec<String> {
        records
            .iter()
            .map(|record| {
                serde_json::to_value(record).unwrap()["type"]
                    .as_str()
                    .unwrap()
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn short_route_arrives_and_closes_the_log() {
        let params = ParameterStore::neutral();
        let config = JourneyConfig {
            events_enabled: false,
            total_distance_override: Some(60),
            ..JourneyConfig::default()
        };
        let sink = MemorySink::default();
        let mut session = JourneySession::new(&params, config, setup(11), sink.clone()).unwrap();
        let mut decider = ScriptedDecider::new(Vec::new()).with_fallback(Action::Travel, 2);
        let outcome = session.run(&mut decider, &TemplateNarrator, &mut NullDisplay);
        assert!(outcome.is_victory());

        let types = record_types(&sink.records());
        assert_eq!(types.first().map(String::as_str), Some("session_start"));
        assert_eq!(types.last().map(String::as_str), Some("session_end"));
        assert_eq!(types.iter().filter(|t| *t == "victory").count(), 1);
        assert!(types.iter().any(|t| t == "achievement_unlock"));
        assert!(session.player().achievements.contains(&crate::achievements::Achievement::Survivor));
    }

    #[test]
    fn max_days_ends_incomplete() {
        let params = ParameterStore::neutral();
        let config = JourneyConfig {
            events_enabled: false,
            max_days: 3,
            ..JourneyConfig::default()
        };
        let sink = MemorySink::default();
        let mut session = JourneySession::new(&params, config, setup(12), sink.clone()).unwrap();
        let mut decider = ScriptedDecider::new(Vec::new()).with_fallback(Action::Rest, 0);
        let outcome = session.run(&mut decider, &TemplateNarrator, &mut NullDisplay);
        assert_eq!(
            outcome,
            SessionOutcome::Incomplete {
                reason: IncompleteReason::MaxDays
            }
        );
        let types = record_types(&sink.records());
        assert!(types.iter().any(|t| t == "max_days_reached"));
        assert_eq!(types.iter().filter(|t| *t == "incomplete").count(), 1);
    }

    #[test]
    fn stalled_decider_is_a_fault() {
        let params = ParameterStore::neutral();
        let sink = MemorySink::default();
        let mut session =
            JourneySession::new(&params, JourneyConfig::default(), setup(13), sink.clone()).unwrap();
        let mut decider = ScriptedDecider::new(Vec::new()).with_fallback(Action::Inspect, 0);
        let outcome = session.run(&mut decider, &TemplateNarrator, &mut NullDisplay);
        assert_eq!(
            outcome,
            SessionOutcome::Incomplete {
                reason: IncompleteReason::Fault
            }
        );
        assert_eq!(session.log().summary().error_types.get("DeciderStalled"), Some(&1));
    }

    #[test]
    fn starving_traveller_dies_of_starvation() {
        let params = ParameterStore::neutral();
        let config = JourneyConfig {
            events_enabled: false,
            ..JourneyConfig::default()
        };
        let sink = MemorySink::default();
        let mut session = JourneySession::new(&params, config, setup(14), sink.clone()).unwrap();
        session.player.ledger.food = 0;
        session.player.ledger.health = 10;
        let mut decider = ScriptedDecider::new(Vec::new()).with_fallback(Action::Scout, 0);
        let outcome = session.run(&mut decider, &TemplateNarrator, &mut NullDisplay);
        assert_eq!(
            outcome,
            SessionOutcome::Died {
                cause: DeathCause::Starvation
            }
        );
    }

    #[test]
    fn abandon_writes_a_single_terminal_record() {
        let params = ParameterStore::neutral();
        let sink = MemorySink::default();
        let mut session =
            JourneySession::new(&params, JourneyConfig::default(), setup(15), sink.clone()).unwrap();
        let first = session.abandon(IncompleteReason::Abandoned);
        let second = session.abandon(IncompleteReason::Fault);
        assert_eq!(first, second);
        let types = record_types(&sink.records());
        assert_eq!(types.iter().filter(|t| *t == "incomplete").count(), 1);
        assert_eq!(types.last().map(String::as_str), Some("session_end"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let params = ParameterStore::neutral();
        let config = JourneyConfig {
            snapshot_interval: 0,
            ..JourneyConfig::default()
        };
        assert!(JourneySession::new(&params, config, setup(16), MemorySink::default()).is_err());
    }
}
