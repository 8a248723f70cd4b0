use chrono::{Local, TimeZone};
use std::fs;
use std::path::PathBuf;
use trailwise_game::{
    Action, Difficulty, FileSink, JourneyConfig, JourneySession, NullDisplay, ParameterStore,
    ScriptedDecider, SessionResult, SessionSetup, SessionSummary, TemplateNarrator, ThemeId,
    read_session_file,
};

fn scratch_dir(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "trailwise-{label}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn colliding_start_times_get_numbered_files() {
    let dir = scratch_dir("collide");
    let started = Local.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
    let first = FileSink::create(&dir, started).unwrap();
    let second = FileSink::create(&dir, started).unwrap();
    let first_name = first.path().file_name().unwrap().to_string_lossy().into_owned();
    let second_name = second.path().file_name().unwrap().to_string_lossy().into_owned();
    assert_eq!(first_name, "game_20250314_092653.jsonl");
    assert_eq!(second_name, "game_20250314_092653_1.jsonl");
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn finished_session_reads_back_as_a_victory() {
    let dir = scratch_dir("victory");
    let params = ParameterStore::neutral();
    let config = JourneyConfig {
        events_enabled: false,
        total_distance_override: Some(90),
        ..JourneyConfig::default()
    };
    let setup = SessionSetup {
        theme: ThemeId::Cyber,
        difficulty: Difficulty::Easy,
        seed: 2024,
        test_mode: true,
    };
    let sink = FileSink::create(&dir, Local::now()).unwrap();
    let path = sink.path().to_path_buf();
    let mut session = JourneySession::new(&params, config, setup, sink).unwrap();
    // Workaround at the final obstacle keeps a healthy traveller whole.
    let mut decider = ScriptedDecider::new(Vec::new()).with_fallback(Action::Travel, 2);
    let outcome = session.run(&mut decider, &TemplateNarrator, &mut NullDisplay);
    assert!(outcome.is_victory());
    drop(session);

    let records = read_session_file(&path).unwrap();
    let summary = SessionSummary::from_records(&records).unwrap();
    assert!(summary.test_mode);
    assert_eq!(summary.seed, Some(2024));
    assert_eq!(summary.theme, Some(ThemeId::Cyber));
    assert_eq!(summary.result, SessionResult::Victory);
    assert!(summary.ending.is_some());
    assert!(summary.choices >= 1);
    assert!(summary.events.is_empty());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn abandoned_session_is_incomplete_on_disk() {
    let dir = scratch_dir("abandon");
    let params = ParameterStore::neutral();
    let setup = SessionSetup {
        theme: ThemeId::Time,
        difficulty: Difficulty::Normal,
        seed: 1,
        test_mode: false,
    };
    let sink = FileSink::create(&dir, Local::now()).unwrap();
    let path = sink.path().to_path_buf();
    let mut session = JourneySession::new(&params, JourneyConfig::default(), setup, sink).unwrap();
    session.abandon(trailwise_game::IncompleteReason::Abandoned);
    drop(session);

    let records = read_session_file(&path).unwrap();
    let summary = SessionSummary::from_records(&records).unwrap();
    assert_eq!(summary.result, SessionResult::Incomplete);
    assert_eq!(summary.final_day, 0);
    let _ = fs::remove_dir_all(&dir);
}
