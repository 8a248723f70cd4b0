//! Batch autoplay: one blocking worker per session, one log file per session.
use anyhow::{Context, Result, ensure};
use chrono::Local;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use trailwise_game::{
    Difficulty, FileSink, JourneyConfig, JourneySession, NullDisplay, ParameterStore,
    SessionOutcome, SessionSetup, TemplateNarrator, ThemeId, TimedNarrator, state_fingerprint,
};

use super::policy::{DecisionStrategy, StrategyDecider};

/// What to play and where to log it.
#[derive(Debug, Clone)]
pub struct PlayPlan {
    pub sessions: usize,
    pub seed: u64,
    /// Fixed theme, or rotate through all themes by seed.
    pub theme: Option<ThemeId>,
    /// Fixed difficulty, or rotate through all difficulties by seed.
    pub difficulty: Option<Difficulty>,
    pub strategy: DecisionStrategy,
    pub max_days: u32,
    pub logs_dir: PathBuf,
}

/// Result of one autoplayed session.
#[derive(Debug, Clone, Serialize)]
pub struct PlayRecord {
    pub seed: u64,
    pub theme: ThemeId,
    pub difficulty: Difficulty,
    pub strategy: DecisionStrategy,
    pub outcome: SessionOutcome,
    pub days: u32,
    pub distance_pct: f64,
    pub health: i32,
    /// Digest of the final state, for replay checks.
    pub fingerprint: u64,
    pub log_file: PathBuf,
}

#[derive(Debug, Clone)]
struct SessionJob {
    setup: SessionSetup,
    strategy: DecisionStrategy,
    max_days: u32,
    logs_dir: PathBuf,
}

impl PlayPlan {
    fn job(&self, index: usize) -> SessionJob {
        let seed = self.seed.wrapping_add(u64::try_from(index).unwrap_or_default());
        SessionJob {
            setup: SessionSetup {
                theme: self.theme.unwrap_or_else(|| rotate(&ThemeId::ALL, seed)),
                difficulty: self
                    .difficulty
                    .unwrap_or_else(|| rotate(&Difficulty::ALL, seed / 6)),
                seed,
                test_mode: true,
            },
            strategy: self.strategy,
            max_days: self.max_days,
            logs_dir: self.logs_dir.clone(),
        }
    }
}

fn rotate<T: Copy>(all: &[T], seed: u64) -> T {
    let len = u64::try_from(all.len()).unwrap_or(u64::MAX).max(1);
    let idx = usize::try_from(seed % len).unwrap_or(0);
    all[idx]
}

/// Play every session of the plan on tokio's blocking pool.
///
/// Records come back in seed order.
///
/// # Errors
///
/// Returns an error if the plan is empty, a log file cannot be created, the
/// journey configuration is invalid, or a worker panics.
pub async fn run_batch(plan: &PlayPlan, params: Arc<ParameterStore>) -> Result<Vec<PlayRecord>> {
    ensure!(plan.sessions > 0, "--sessions must be at least 1");
    log::info!(
        "autoplaying {} session(s) from seed {} with the {} strategy",
        plan.sessions,
        plan.seed,
        plan.strategy
    );
    let mut handles = Vec::with_capacity(plan.sessions);
    for index in 0..plan.sessions {
        let job = plan.job(index);
        let params = Arc::clone(&params);
        handles.push(tokio::task::spawn_blocking(move || {
            play_session(&params, &job)
        }));
    }
    let mut records = Vec::with_capacity(handles.len());
    for handle in handles {
        let record = handle.await.context("autoplay worker panicked")??;
        records.push(record);
    }
    Ok(records)
}

fn play_session(params: &ParameterStore, job: &SessionJob) -> Result<PlayRecord> {
    let sink = FileSink::create(&job.logs_dir, Local::now())
        .with_context(|| format!("failed to open a session log in {}", job.logs_dir.display()))?;
    let log_file = sink.path().to_path_buf();
    let config = JourneyConfig {
        max_days: job.max_days,
        ..JourneyConfig::default()
    };
    let narrator = TimedNarrator::new(
        TemplateNarrator,
        Duration::from_millis(config.narrative_timeout_ms),
    );
    let mut session = JourneySession::new(params, config, job.setup, sink)
        .context("invalid journey configuration")?;
    let mut decider = StrategyDecider::new(job.strategy, job.setup.seed);
    let outcome = session.run(&mut decider, &narrator, &mut NullDisplay);

    let player = session.player();
    log::debug!(
        "seed {} finished as {} on day {}",
        job.setup.seed,
        outcome.label(),
        player.day
    );
    Ok(PlayRecord {
        seed: job.setup.seed,
        theme: job.setup.theme,
        difficulty: job.setup.difficulty,
        strategy: job.strategy,
        outcome,
        days: player.day,
        distance_pct: player.progress_pct(),
        health: player.health(),
        fingerprint: state_fingerprint(player),
        log_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "trailwise-autoplay-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }

    fn plan(dir: PathBuf, sessions: usize) -> PlayPlan {
        PlayPlan {
            sessions,
            seed: 100,
            theme: None,
            difficulty: Some(Difficulty::Easy),
            strategy: DecisionStrategy::Cautious,
            max_days: 40,
            logs_dir: dir,
        }
    }

    #[test]
    fn jobs_rotate_themes_by_seed() {
        let plan = plan(PathBuf::from("logs"), 6);
        let themes: Vec<ThemeId> = (0..6).map(|i| plan.job(i).setup.theme).collect();
        assert_eq!(themes.len(), 6);
        for theme in ThemeId::ALL {
            assert!(themes.contains(&theme));
        }
        assert_eq!(plan.job(3).setup.seed, 103);
        assert_eq!(plan.job(0).setup.difficulty, Difficulty::Easy);
    }

    #[tokio::test]
    async fn batch_writes_one_log_per_session_and_replays() {
        let params = Arc::new(ParameterStore::neutral());
        let first_dir = scratch_dir("first");
        let second_dir = scratch_dir("second");
        let first = run_batch(&plan(first_dir.clone(), 3), Arc::clone(&params))
            .await
            .unwrap();
        let second = run_batch(&plan(second_dir.clone(), 3), params).await.unwrap();

        assert_eq!(first.len(), 3);
        let files = std::fs::read_dir(&first_dir).unwrap().count();
        assert_eq!(files, 3);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.seed, b.seed);
            assert_eq!(a.fingerprint, b.fingerprint);
            assert!(a.days <= 40);
        }
        let _ = std::fs::remove_dir_all(&first_dir);
        let _ = std::fs::remove_dir_all(&second_dir);
    }

    #[tokio::test]
    async fn empty_plan_is_rejected() {
        let params = Arc::new(ParameterStore::neutral());
        let result = run_batch(&plan(scratch_dir("empty"), 0), params).await;
        assert!(result.is_err());
    }
}
