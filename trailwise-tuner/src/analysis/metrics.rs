use serde::Serialize;
use std::collections::BTreeMap;
use trailwise_game::numbers::{ratio, usize_to_f64};
use trailwise_game::{DeathCause, Difficulty, Metrics, SessionResult, SessionSummary, ThemeId};

/// Deaths before this share of the route count as early.
pub const EARLY_DEATH_DISTANCE_PCT: f64 = 20.0;

pub(crate) fn cause_label(cause: Option<DeathCause>) -> &'static str {
    cause.unwrap_or(DeathCause::Unknown).as_str()
}

/// Aggregate win, death, and pacing figures used by the tuning history.
#[must_use]
pub fn calculate_metrics(sessions: &[SessionSummary]) -> Metrics {
    if sessions.is_empty() {
        return Metrics::default();
    }
    let total = sessions.len();
    let victories = count_result(sessions, SessionResult::Victory);
    let deaths: Vec<&SessionSummary> = sessions
        .iter()
        .filter(|s| s.result == SessionResult::Death)
        .collect();

    let mut days = RunningStats::default();
    for session in sessions {
        days.add(f64::from(session.final_day));
    }

    let mut cause_counts: BTreeMap<String, usize> = BTreeMap::new();
    for death in &deaths {
        *cause_counts
            .entry(cause_label(death.death_cause).to_string())
            .or_default() += 1;
    }
    let death_causes = cause_counts
        .into_iter()
        .map(|(cause, count)| (cause, ratio(count, deaths.len())))
        .collect();

    Metrics {
        total_sessions: total,
        win_rate: ratio(victories, total),
        death_rate: ratio(deaths.len(), total),
        avg_days: days.mean(),
        death_causes,
    }
}

fn count_result(sessions: &[SessionSummary], result: SessionResult) -> usize {
    sessions.iter().filter(|s| s.result == result).count()
}

/// Plays and win rate for one theme or difficulty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub name: String,
    pub plays: usize,
    pub win_rate: f64,
}

/// Summary statistics shown at the top of every report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    pub total: usize,
    pub test_mode: usize,
    pub victories: usize,
    pub deaths: usize,
    pub incomplete: usize,
    pub win_rate: f64,
    pub themes: Vec<GroupStats>,
    pub difficulties: Vec<GroupStats>,
    pub avg_days: f64,
    pub std_days: f64,
    pub avg_choices: f64,
    pub avg_events: f64,
    /// Death counts per cause, most common first.
    pub death_causes: Vec<(String, usize)>,
    pub avg_death_day: f64,
    pub avg_death_distance_pct: f64,
    pub early_deaths: usize,
    pub endings: Vec<(String, usize)>,
}

/// Error records grouped by type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorStats {
    pub total: usize,
    pub sessions_with_errors: usize,
    /// Counts per error type, most common first.
    pub by_type: Vec<(String, usize)>,
}

/// Build the report statistics for a set of sessions.
#[must_use]
pub fn summarize(sessions: &[SessionSummary]) -> SessionStats {
    let total = sessions.len();
    let victories = count_result(sessions, SessionResult::Victory);
    let deaths: Vec<&SessionSummary> = sessions
        .iter()
        .filter(|s| s.result == SessionResult::Death)
        .collect();

    let mut days = RunningStats::default();
    let mut choices = RunningStats::default();
    let mut events = RunningStats::default();
    for session in sessions {
        days.add(f64::from(session.final_day));
        choices.add(usize_to_f64(session.choices));
        events.add(usize_to_f64(session.events.len()));
    }

    let mut death_days = RunningStats::default();
    let mut death_distance = RunningStats::default();
    let mut causes: BTreeMap<String, usize> = BTreeMap::new();
    let mut early_deaths = 0;
    for death in &deaths {
        death_days.add(f64::from(death.death_day.unwrap_or(0)));
        let pct = death.death_distance_pct.unwrap_or(0.0);
        death_distance.add(pct);
        if pct < EARLY_DEATH_DISTANCE_PCT {
            early_deaths += 1;
        }
        *causes
            .entry(cause_label(death.death_cause).to_string())
            .or_default() += 1;
    }

    let mut endings: BTreeMap<String, usize> = BTreeMap::new();
    for session in sessions {
        if let Some(ending) = session.ending {
            *endings.entry(ending.to_string()).or_default() += 1;
        }
    }

    SessionStats {
        total,
        test_mode: sessions.iter().filter(|s| s.test_mode).count(),
        victories,
        deaths: deaths.len(),
        incomplete: count_result(sessions, SessionResult::Incomplete),
        win_rate: ratio(victories, total),
        themes: ThemeId::ALL
            .iter()
            .filter_map(|theme| group(sessions, theme.to_string(), |s| s.theme == Some(*theme)))
            .collect(),
        difficulties: Difficulty::ALL
            .iter()
            .filter_map(|difficulty| {
                group(sessions, difficulty.to_string(), |s| {
                    s.difficulty == Some(*difficulty)
                })
            })
            .collect(),
        avg_days: days.mean(),
        std_days: days.std_dev(),
        avg_choices: choices.mean(),
        avg_events: events.mean(),
        death_causes: most_common(causes),
        avg_death_day: death_days.mean(),
        avg_death_distance_pct: death_distance.mean(),
        early_deaths,
        endings: most_common(endings),
    }
}

/// Group error records across sessions.
#[must_use]
pub fn summarize_errors(sessions: &[SessionSummary]) -> ErrorStats {
    let mut by_type: BTreeMap<String, usize> = BTreeMap::new();
    for session in sessions {
        for error_type in &session.error_types {
            *by_type.entry(error_type.clone()).or_default() += 1;
        }
    }
    ErrorStats {
        total: by_type.values().sum(),
        sessions_with_errors: sessions
            .iter()
            .filter(|s| !s.error_types.is_empty())
            .count(),
        by_type: most_common(by_type),
    }
}

fn group(
    sessions: &[SessionSummary],
    name: String,
    belongs: impl Fn(&SessionSummary) -> bool,
) -> Option<GroupStats> {
    let members: Vec<&SessionSummary> = sessions.iter().filter(|s| belongs(s)).collect();
    if members.is_empty() {
        return None;
    }
    let wins = members
        .iter()
        .filter(|s| s.result == SessionResult::Victory)
        .count();
    Some(GroupStats {
        name,
        plays: members.len(),
        win_rate: ratio(wins, members.len()),
    })
}

pub(crate) fn most_common(counts: BTreeMap<String, usize>) -> Vec<(String, usize)> {
    let mut ordered: Vec<(String, usize)> = counts.into_iter().collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ordered
}

/// Welford accumulator for mean and sample deviation.
#[derive(Debug, Default, Clone)]
pub struct RunningStats {
    count: u32,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    pub fn add(&mut self, value: f64) {
        self.count += 1;
        let count = f64::from(self.count);
        let delta = value - self.mean;
        self.mean += delta / count;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    #[must_use]
    pub const fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    #[must_use]
    pub fn variance(&self) -> f64 {
        if self.count > 1 {
            self.m2 / f64::from(self.count - 1)
        } else {
            0.0
        }
    }

    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use trailwise_game::{DeathCause, Difficulty, Ending, SessionResult, SessionSummary, ThemeId};

    pub fn session(result: SessionResult) -> SessionSummary {
        SessionSummary {
            test_mode: true,
            theme: Some(ThemeId::Desert),
            difficulty: Some(Difficulty::Normal),
            seed: Some(1),
            result,
            death_cause: None,
            death_day: None,
            death_distance_pct: None,
            ending: (result == SessionResult::Victory).then_some(Ending::Arrived),
            final_day: 40,
            final_health: 50,
            events: Vec::new(),
            choices: 10,
            error_types: Vec::new(),
        }
    }

    pub fn death(cause: DeathCause, day: u32) -> SessionSummary {
        SessionSummary {
            death_cause: Some(cause),
            death_day: Some(day),
            death_distance_pct: Some(35.0),
            final_day: day,
            final_health: 0,
            ..session(SessionResult::Death)
        }
    }

    pub fn win() -> SessionSummary {
        session(SessionResult::Victory)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{death, session, win};
    use super::*;

    #[test]
    fn metrics_cover_rates_days_and_causes() {
        let sessions = vec![
            win(),
            death(DeathCause::Starvation, 10),
            death(DeathCause::Starvation, 20),
            death(DeathCause::Combat, 30),
        ];
        let metrics = calculate_metrics(&sessions);
        assert_eq!(metrics.total_sessions, 4);
        assert!((metrics.win_rate - 0.25).abs() < 1e-9);
        assert!((metrics.death_rate - 0.75).abs() < 1e-9);
        assert!((metrics.avg_days - 25.0).abs() < 1e-9);
        let share_sum: f64 = metrics.death_causes.values().sum();
        assert!((share_sum - 1.0).abs() < 1e-9);
        assert!((metrics.death_causes["starvation"] - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_input_gives_default_metrics() {
        assert_eq!(calculate_metrics(&[]), Metrics::default());
    }

    #[test]
    fn summary_counts_early_deaths_and_groups() {
        let mut early = death(DeathCause::Dehydration, 4);
        early.death_distance_pct = Some(5.0);
        early.theme = Some(ThemeId::Mist);
        let sessions = vec![win(), early, session(SessionResult::Incomplete)];
        let stats = summarize(&sessions);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.early_deaths, 1);
        assert_eq!(stats.incomplete, 1);
        assert_eq!(stats.themes.len(), 2);
        assert_eq!(stats.themes[0].name, "desert");
        assert_eq!(stats.death_causes, vec![("dehydration".to_string(), 1)]);
    }

    #[test]
    fn errors_are_grouped_most_common_first() {
        let mut a = win();
        a.error_types = vec!["NarrativeTimeout".into(), "DeciderStalled".into()];
        let mut b = win();
        b.error_types = vec!["NarrativeTimeout".into()];
        let stats = summarize_errors(&[a, b, win()]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.sessions_with_errors, 2);
        assert_eq!(stats.by_type[0], ("NarrativeTimeout".to_string(), 2));
    }

    #[test]
    fn running_stats_matches_sample_deviation() {
        let mut stats = RunningStats::default();
        for value in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stats.add(value);
        }
        assert!((stats.mean() - 5.0).abs() < 1e-9);
        assert!((stats.variance() - 32.0 / 7.0).abs() < 1e-9);
    }
}
