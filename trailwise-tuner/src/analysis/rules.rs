//! Balance rules that turn session summaries into bounded parameter adjustments.
use serde::Serialize;
use std::collections::BTreeMap;
use trailwise_game::numbers::{ratio, u64_to_f64, usize_to_f64};
use trailwise_game::{
    DeathCause, Difficulty, EventKind, Param, ParamKey, SessionResult, SessionSummary, ThemeId,
};

use super::metrics::{cause_label, most_common};

/// Every emitted multiplier is clamped into this range.
pub const ADJUSTMENT_BOUNDS: (f64, f64) = (0.7, 1.3);

const THEME_TOO_HARD: f64 = 0.25;
const THEME_TOO_EASY: f64 = 0.75;
const THEME_SUPPLY_BOOST: f64 = 1.3;
const THEME_SUPPLY_CUT: f64 = 0.8;
const EARLY_DEATH_CLUSTER_DAY: f64 = 20.0;
const EARLY_DEATH_CLUSTER_MIN: usize = 3;

const EASY_WIN_FLOOR: f64 = 0.5;
const EASY_SUPPLY_BOOST: f64 = 1.2;
const NORMAL_WIN_FLOOR: f64 = 0.35;
const NORMAL_SUPPLY_BOOST: f64 = 1.15;

const DOMINANT_CAUSE_SHARE: f64 = 0.5;
const CONSUMPTION_RELIEF: f64 = 0.85;
const COMBAT_RELIEF: f64 = 0.9;

const MIN_EVENT_DAYS: u64 = 50;
const EVENT_RATE_TOLERANCE: f64 = 0.30;

const EARLY_DEATH_DAY: u32 = 15;

const FAST_COMPLETION_DAYS: f64 = 30.0;
const SLOW_COMPLETION_DAYS: f64 = 100.0;

const MIN_OBSERVED_EVENTS: usize = 20;

/// Outcome of one analyzer run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Analysis {
    /// Dotted parameter key to multiplier, last writer wins.
    pub adjustments: BTreeMap<String, f64>,
    pub insights: Vec<String>,
}

impl Analysis {
    fn set(&mut self, key: ParamKey, value: f64) {
        self.adjustments.insert(key.to_string(), clamp_adjustment(value));
    }

    fn note(&mut self, insight: String) {
        self.insights.push(insight);
    }
}

/// Clamp a multiplier into [`ADJUSTMENT_BOUNDS`]. Non-finite values become neutral.
#[must_use]
pub fn clamp_adjustment(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(ADJUSTMENT_BOUNDS.0, ADJUSTMENT_BOUNDS.1)
    } else {
        1.0
    }
}

/// Target events per played day for a difficulty.
#[must_use]
pub const fn target_event_rate(difficulty: Difficulty) -> f64 {
    match difficulty {
        Difficulty::Easy => 0.30,
        Difficulty::Normal => 0.40,
        Difficulty::Hard => 0.55,
    }
}

/// Applies the balance rules in a fixed order.
#[derive(Debug, Clone, Copy)]
pub struct TuningAnalyzer {
    min_sessions: usize,
}

impl TuningAnalyzer {
    #[must_use]
    pub const fn new(min_sessions: usize) -> Self {
        Self { min_sessions }
    }

    #[must_use]
    pub const fn min_sessions(&self) -> usize {
        self.min_sessions
    }

    /// Run every rule; `None` when fewer than `min_sessions` sessions are available.
    #[must_use]
    pub fn analyze(&self, sessions: &[SessionSummary]) -> Option<Analysis> {
        if sessions.len() < self.min_sessions {
            log::info!(
                "only {} session(s), need {} for analysis",
                sessions.len(),
                self.min_sessions
            );
            return None;
        }
        let mut analysis = Analysis::default();
        self.theme_balance(sessions, &mut analysis);
        self.difficulty_scaling(sessions, &mut analysis);
        self.death_causes(sessions, &mut analysis);
        self.damage_balance(sessions, &mut analysis);
        Self::event_rates(sessions, &mut analysis);
        self.health_survivability(sessions, &mut analysis);
        self.pacing(sessions, &mut analysis);
        Self::event_frequency(sessions, &mut analysis);
        log::debug!(
            "analysis produced {} adjustment(s) and {} insight(s)",
            analysis.adjustments.len(),
            analysis.insights.len()
        );
        Some(analysis)
    }

    fn theme_balance(&self, sessions: &[SessionSummary], out: &mut Analysis) {
        for theme in ThemeId::ALL {
            let plays: Vec<&SessionSummary> =
                sessions.iter().filter(|s| s.theme == Some(theme)).collect();
            if plays.len() < self.min_sessions {
                continue;
            }
            let wins = plays
                .iter()
                .filter(|s| s.result == SessionResult::Victory)
                .count();
            let win_rate = ratio(wins, plays.len());
            let key = ParamKey::theme(theme, Param::SupplyMultiplier);
            if win_rate < THEME_TOO_HARD {
                out.set(key, THEME_SUPPLY_BOOST);
                out.note(format!(
                    "Theme '{theme}': {:.1}% win rate (too hard), raising starting supplies by 30%",
                    win_rate * 100.0
                ));
            } else if win_rate > THEME_TOO_EASY {
                out.set(key, THEME_SUPPLY_CUT);
                out.note(format!(
                    "Theme '{theme}': {:.1}% win rate (too easy), cutting starting supplies by 20%",
                    win_rate * 100.0
                ));
            }

            let death_days: Vec<u32> = plays
                .iter()
                .filter(|s| s.result == SessionResult::Death)
                .map(|s| s.death_day.unwrap_or(0))
                .collect();
            if death_days.len() >= EARLY_DEATH_CLUSTER_MIN {
                let avg = mean_days(&death_days);
                if avg < EARLY_DEATH_CLUSTER_DAY {
                    out.note(format!(
                        "Theme '{theme}': average death on day {avg:.0}, early game may be too punishing"
                    ));
                }
            }
        }
    }

    fn difficulty_scaling(&self, sessions: &[SessionSummary], out: &mut Analysis) {
        let win_rate = |difficulty: Difficulty| {
            let games: Vec<&SessionSummary> = sessions
                .iter()
                .filter(|s| s.difficulty == Some(difficulty))
                .collect();
            (games.len() >= self.min_sessions).then(|| {
                let wins = games
                    .iter()
                    .filter(|s| s.result == SessionResult::Victory)
                    .count();
                ratio(wins, games.len())
            })
        };
        let easy = win_rate(Difficulty::Easy);
        let normal = win_rate(Difficulty::Normal);
        let hard = win_rate(Difficulty::Hard);

        if let (Some(easy), Some(hard)) = (easy, hard) {
            if easy < hard {
                out.note(format!(
                    "Scaling issue: easy ({:.1}%) wins less often than hard ({:.1}%), difficulty multipliers may be inverted",
                    easy * 100.0,
                    hard * 100.0
                ));
            } else if easy < EASY_WIN_FLOOR {
                out.set(
                    ParamKey::difficulty(Difficulty::Easy, Param::SupplyMultiplier),
                    EASY_SUPPLY_BOOST,
                );
                out.note(format!(
                    "Easy mode: {:.1}% win rate, boosting easy supplies by 20%",
                    easy * 100.0
                ));
            }
        }
        if let Some(normal) = normal
            && normal < NORMAL_WIN_FLOOR
        {
            out.set(
                ParamKey::difficulty(Difficulty::Normal, Param::SupplyMultiplier),
                NORMAL_SUPPLY_BOOST,
            );
            out.note(format!(
                "Normal difficulty: {:.1}% win rate, raising supplies by 15%",
                normal * 100.0
            ));
        }
    }

    fn death_causes(&self, sessions: &[SessionSummary], out: &mut Analysis) {
        let deaths: Vec<&SessionSummary> = sessions
            .iter()
            .filter(|s| s.result == SessionResult::Death)
            .collect();
        if deaths.len() < self.min_sessions {
            return;
        }
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for death in deaths.iter().filter(|d| d.death_cause.is_some()) {
            *counts
                .entry(cause_label(death.death_cause).to_string())
                .or_default() += 1;
        }
        for (cause, count) in most_common(counts) {
            let share = ratio(count, deaths.len());
            if share <= DOMINANT_CAUSE_SHARE {
                continue;
            }
            let pct = share * 100.0;
            match cause.parse::<DeathCause>() {
                Ok(DeathCause::Starvation) => {
                    out.set(
                        ParamKey::global(Param::FoodConsumptionRate),
                        CONSUMPTION_RELIEF,
                    );
                    out.note(format!(
                        "{pct:.0}% of deaths from starvation, slowing food consumption by 15%"
                    ));
                }
                Ok(DeathCause::Dehydration) => {
                    out.set(
                        ParamKey::global(Param::WaterConsumptionRate),
                        CONSUMPTION_RELIEF,
                    );
                    out.note(format!(
                        "{pct:.0}% of deaths from dehydration, slowing water consumption by 15%"
                    ));
                }
                Ok(DeathCause::Combat) => {
                    out.set(ParamKey::global(Param::DamageMultiplier), COMBAT_RELIEF);
                    out.note(format!(
                        "{pct:.0}% of deaths from combat, reducing combat damage by 10%"
                    ));
                }
                Ok(DeathCause::Unknown) | Err(()) => {}
            }
        }
    }

    fn damage_balance(&self, sessions: &[SessionSummary], out: &mut Analysis) {
        for difficulty in Difficulty::ALL {
            let games: Vec<&SessionSummary> = sessions
                .iter()
                .filter(|s| s.difficulty == Some(difficulty))
                .collect();
            if games.len() < self.min_sessions {
                continue;
            }
            let deaths = games
                .iter()
                .filter(|s| s.result == SessionResult::Death)
                .count();
            let death_rate = ratio(deaths, games.len());
            let (ceiling, relief) = match difficulty {
                Difficulty::Easy => (0.60, 0.8),
                Difficulty::Normal => (0.75, 0.9),
                Difficulty::Hard => (0.90, 0.85),
            };
            if death_rate > ceiling {
                out.set(
                    ParamKey::difficulty(difficulty, Param::DamageMultiplier),
                    relief,
                );
                out.note(format!(
                    "{difficulty} mode: {:.0}% death rate, reducing damage taken by {:.0}%",
                    death_rate * 100.0,
                    (1.0 - relief) * 100.0
                ));
            }
        }
    }

    fn event_rates(sessions: &[SessionSummary], out: &mut Analysis) {
        for difficulty in Difficulty::ALL {
            let (events, days) = sessions
                .iter()
                .filter(|s| s.difficulty == Some(difficulty))
                .fold((0_usize, 0_u64), |(events, days), s| {
                    (events + s.events.len(), days + u64::from(s.final_day))
                });
            if days < MIN_EVENT_DAYS {
                continue;
            }
            let rate = usize_to_f64(events) / u64_to_f64(days);
            let target = target_event_rate(difficulty);
            let deviation = (rate - target).abs() / target;
            if deviation <= EVENT_RATE_TOLERANCE {
                continue;
            }
            let adjustment = if rate > 0.0 { target / rate } else { 1.0 };
            out.set(
                ParamKey::difficulty(difficulty, Param::EventChance),
                adjustment,
            );
            let direction = if adjustment > 1.0 { "raising" } else { "lowering" };
            out.note(format!(
                "{difficulty} mode: {rate:.2} events/day (target {target:.2}), {direction} event chance by {:.0}%",
                (1.0 - clamp_adjustment(adjustment)).abs() * 100.0
            ));
        }
    }

    fn health_survivability(&self, sessions: &[SessionSummary], out: &mut Analysis) {
        let early: Vec<u32> = sessions
            .iter()
            .filter(|s| s.result == SessionResult::Death)
            .filter_map(|s| s.death_day)
            .filter(|day| *day < EARLY_DEATH_DAY)
            .collect();
        if early.len() < self.min_sessions {
            return;
        }
        let avg = mean_days(&early);
        let boost = if avg < 10.0 {
            1.2
        } else if avg < 12.0 {
            1.1
        } else {
            return;
        };
        out.set(ParamKey::global(Param::InitialHealth), boost);
        out.note(format!(
            "{} deaths before day {EARLY_DEATH_DAY} (avg day {avg:.1}), raising starting health by {:.0}%",
            early.len(),
            (boost - 1.0) * 100.0
        ));
    }

    fn pacing(&self, sessions: &[SessionSummary], out: &mut Analysis) {
        let completed: Vec<u32> = sessions
            .iter()
            .filter(|s| s.result == SessionResult::Victory)
            .map(|s| s.final_day)
            .collect();
        if completed.len() < self.min_sessions {
            return;
        }
        let avg = mean_days(&completed);
        if avg < FAST_COMPLETION_DAYS {
            out.note(format!(
                "Average completion: {avg:.0} days (too fast), consider a longer route"
            ));
        } else if avg > SLOW_COMPLETION_DAYS {
            out.note(format!(
                "Average completion: {avg:.0} days (too slow), consider faster travel or a shorter route"
            ));
        }
    }

    fn event_frequency(sessions: &[SessionSummary], out: &mut Analysis) {
        let observed: Vec<&str> = sessions
            .iter()
            .flat_map(|s| s.events.iter().map(String::as_str))
            .collect();
        if observed.len() <= MIN_OBSERVED_EVENTS {
            return;
        }
        for kind in EventKind::ALL {
            if kind == EventKind::GeneratedScenario {
                continue;
            }
            if !observed.contains(&kind.as_str()) {
                out.note(format!(
                    "Event '{}' never fired in {} sessions, its weight may be too low",
                    kind.as_str(),
                    sessions.len()
                ));
            }
        }
    }
}

fn mean_days(days: &[u32]) -> f64 {
    let total: u64 = days.iter().map(|d| u64::from(*d)).sum();
    u64_to_f64(total) / usize_to_f64(days.len().max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::metrics::fixtures::{death, session, win};

    fn with_difficulty(mut s: SessionSummary, difficulty: Difficulty) -> SessionSummary {
        s.difficulty = Some(difficulty);
        s
    }

    fn with_theme(mut s: SessionSummary, theme: ThemeId) -> SessionSummary {
        s.theme = Some(theme);
        s
    }

    #[test]
    fn too_few_sessions_is_not_an_error() {
        let analyzer = TuningAnalyzer::new(5);
        assert!(analyzer.analyze(&[win(), win()]).is_none());
        assert!(TuningAnalyzer::new(2).analyze(&[win(), win()]).is_some());
    }

    #[test]
    fn clamp_keeps_adjustments_in_bounds() {
        assert!((clamp_adjustment(2.5) - 1.3).abs() < f64::EPSILON);
        assert!((clamp_adjustment(0.1) - 0.7).abs() < f64::EPSILON);
        assert!((clamp_adjustment(f64::INFINITY) - 1.0).abs() < f64::EPSILON);
        assert!((clamp_adjustment(0.9) - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn losing_theme_gets_more_supplies() {
        let sessions: Vec<SessionSummary> = (0..5)
            .map(|day| with_theme(death(DeathCause::Unknown, 30 + day), ThemeId::Space))
            .collect();
        let analysis = TuningAnalyzer::new(5).analyze(&sessions).unwrap();
        assert_eq!(
            analysis.adjustments.get("theme.space.supply_multiplier"),
            Some(&1.3)
        );
    }

    #[test]
    fn dominant_starvation_slows_food_consumption() {
        let mut sessions: Vec<SessionSummary> =
            (0..4).map(|_| death(DeathCause::Starvation, 40)).collect();
        sessions.push(death(DeathCause::Combat, 40));
        let analysis = TuningAnalyzer::new(5).analyze(&sessions).unwrap();
        assert_eq!(
            analysis.adjustments.get("global.food_consumption_rate"),
            Some(&0.85)
        );
        assert!(!analysis.adjustments.contains_key("global.damage_multiplier"));
    }

    #[test]
    fn inverted_difficulty_is_reported_not_adjusted() {
        let mut sessions = Vec::new();
        for _ in 0..3 {
            sessions.push(with_difficulty(death(DeathCause::Unknown, 50), Difficulty::Easy));
            sessions.push(with_difficulty(win(), Difficulty::Hard));
        }
        let analysis = TuningAnalyzer::new(3).analyze(&sessions).unwrap();
        assert!(analysis.insights.iter().any(|i| i.contains("inverted")));
        assert!(!analysis
            .adjustments
            .contains_key("difficulty.easy.supply_multiplier"));
    }

    #[test]
    fn deadly_easy_mode_reduces_damage() {
        let sessions: Vec<SessionSummary> = (0..5)
            .map(|_| with_difficulty(death(DeathCause::Unknown, 60), Difficulty::Easy))
            .collect();
        let analysis = TuningAnalyzer::new(5).analyze(&sessions).unwrap();
        assert_eq!(
            analysis.adjustments.get("difficulty.easy.damage_multiplier"),
            Some(&0.8)
        );
    }

    #[test]
    fn sparse_events_raise_event_chance_within_bounds() {
        // 60 days on hard with 6 events: 0.1 per day against a 0.55 target.
        let sessions: Vec<SessionSummary> = (0..3)
            .map(|_| {
                let mut s = with_difficulty(win(), Difficulty::Hard);
                s.final_day = 20;
                s.events = vec!["bandit".into(), "river".into()];
                s
            })
            .collect();
        let analysis = TuningAnalyzer::new(3).analyze(&sessions).unwrap();
        assert_eq!(
            analysis.adjustments.get("difficulty.hard.event_chance"),
            Some(&1.3)
        );
    }

    #[test]
    fn early_deaths_raise_initial_health() {
        let sessions: Vec<SessionSummary> =
            (0..5).map(|_| death(DeathCause::Unknown, 8)).collect();
        let analysis = TuningAnalyzer::new(5).analyze(&sessions).unwrap();
        assert_eq!(analysis.adjustments.get("global.initial_health"), Some(&1.2));

        let later: Vec<SessionSummary> =
            (0..5).map(|_| death(DeathCause::Unknown, 11)).collect();
        let analysis = TuningAnalyzer::new(5).analyze(&later).unwrap();
        assert_eq!(analysis.adjustments.get("global.initial_health"), Some(&1.1));
    }

    #[test]
    fn missing_events_are_reported_once_enough_fired() {
        let sessions: Vec<SessionSummary> = (0..3)
            .map(|_| {
                let mut s = session(SessionResult::Incomplete);
                s.events = vec!["bandit".to_string(); 8];
                s
            })
            .collect();
        let analysis = TuningAnalyzer::new(3).analyze(&sessions).unwrap();
        assert!(analysis.insights.iter().any(|i| i.contains("'river'")));
        assert!(!analysis.insights.iter().any(|i| i.contains("'bandit'")));
        assert!(!analysis.insights.iter().any(|i| i.contains("generated_scenario")));
    }

    #[test]
    fn quick_victories_trigger_a_pacing_insight() {
        let sessions: Vec<SessionSummary> = (0..5)
            .map(|_| {
                let mut s = win();
                s.final_day = 20;
                s
            })
            .collect();
        let analysis = TuningAnalyzer::new(5).analyze(&sessions).unwrap();
        assert!(analysis.insights.iter().any(|i| i.contains("too fast")));
    }
}
