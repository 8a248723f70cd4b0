mod analysis;
mod autoplay;
mod reports;

use anyhow::{Context, Result, ensure};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use trailwise_game::{
    DEFAULT_TUNING_FILE, Difficulty, HISTORY_WINDOW, Metrics, ParameterStore, ThemeId,
    TuningFile, TuningFileError, TuningIteration,
};

use analysis::{Analysis, DEFAULT_OSCILLATION_WINDOW, TuningAnalyzer, TuningHistory};
use autoplay::{DecisionStrategy, PlayPlan};
use reports::TunerReport;

#[derive(Debug, Parser)]
#[command(name = "trailwise-tuner", version)]
#[command(about = "Analyze Trailwise session logs and tune game balance between runs")]
struct Args {
    /// Directory holding game_*.jsonl session logs
    #[arg(long, global = true, default_value = "logs")]
    logs_dir: PathBuf,

    /// Adjustment file read by the game and rewritten by --apply
    #[arg(long, global = true, default_value = DEFAULT_TUNING_FILE)]
    config: PathBuf,

    /// Sessions required before any adjustment is proposed
    #[arg(long, global = true, default_value_t = 5)]
    min_sessions: usize,

    /// Write proposed adjustments to the adjustment file
    #[arg(long, global = true)]
    apply: bool,

    /// Delete the adjustment file and exit
    #[arg(long, global = true)]
    reset: bool,

    /// Output report format
    #[arg(long, global = true, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Iterations inspected when looking for oscillating adjustments (2 up to the history size)
    #[arg(long, global = true, default_value_t = DEFAULT_OSCILLATION_WINDOW)]
    oscillation_window: usize,

    /// Verbose output (info-level diagnostics unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Autoplay a batch of sessions into the logs directory before analyzing
    Play(PlayArgs),
}

#[derive(Debug, Clone, clap::Args)]
struct PlayArgs {
    /// Number of sessions to play
    #[arg(long, default_value_t = 10)]
    sessions: usize,

    /// First seed; session i uses seed + i
    #[arg(long, default_value_t = 1337)]
    seed: u64,

    /// Fixed theme (rotates through all themes when omitted)
    #[arg(long, value_enum)]
    theme: Option<ThemeArg>,

    /// Fixed difficulty (rotates through all difficulties when omitted)
    #[arg(long, value_enum)]
    difficulty: Option<DifficultyArg>,

    /// Decision strategy for actions and event choices
    #[arg(long, value_enum, default_value_t = DecisionStrategy::Cautious)]
    strategy: DecisionStrategy,

    /// Day limit before a session is abandoned
    #[arg(long, default_value_t = 200)]
    max_days: u32,
}

impl PlayArgs {
    fn plan(&self, logs_dir: &Path) -> PlayPlan {
        PlayPlan {
            sessions: self.sessions,
            seed: self.seed,
            theme: self.theme.map(ThemeId::from),
            difficulty: self.difficulty.map(Difficulty::from),
            strategy: self.strategy,
            max_days: self.max_days,
            logs_dir: logs_dir.to_path_buf(),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ThemeArg {
    Desert,
    Space,
    Mist,
    Time,
    Cyber,
    AiGenerated,
}

impl From<ThemeArg> for ThemeId {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Desert => Self::Desert,
            ThemeArg::Space => Self::Space,
            ThemeArg::Mist => Self::Mist,
            ThemeArg::Time => Self::Time,
            ThemeArg::Cyber => Self::Cyber,
            ThemeArg::AiGenerated => Self::AiGenerated,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DifficultyArg {
    Easy,
    Normal,
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(arg: DifficultyArg) -> Self {
        match arg {
            DifficultyArg::Easy => Self::Easy,
            DifficultyArg::Normal => Self::Normal,
            DifficultyArg::Hard => Self::Hard,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    run(&args).await
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

async fn run(args: &Args) -> Result<()> {
    ensure!(args.min_sessions >= 1, "--min-sessions must be at least 1");
    ensure!(
        (2..=HISTORY_WINDOW).contains(&args.oscillation_window),
        "--oscillation-window must be between 2 and {HISTORY_WINDOW}"
    );

    if args.reset {
        return reset_tuning(args);
    }

    if args.report == "console" {
        announce_banner();
    }

    let params = Arc::new(ParameterStore::load(&args.config));
    let autoplay = match &args.command {
        Some(Command::Play(play)) => autoplay::run_batch(&play.plan(&args.logs_dir), params).await?,
        None => Vec::new(),
    };

    let sessions = analysis::load_sessions(&args.logs_dir)?;
    if sessions.is_empty() {
        log::info!("no session logs found in {}", args.logs_dir.display());
    } else {
        log::info!("analyzing {} session(s)", sessions.len());
    }
    let analyzer = TuningAnalyzer::new(args.min_sessions);
    let proposal = analyzer.analyze(&sessions.sessions);
    let metrics = analysis::calculate_metrics(&sessions.sessions);

    let mut history = TuningHistory::new(load_tuning_file(&args.config)?, args.oscillation_window);
    let applied = apply_adjustments(args, &mut history, proposal.as_ref(), metrics)?;

    let report = TunerReport {
        logs_dir: args.logs_dir.clone(),
        min_sessions: analyzer.min_sessions(),
        sessions: analysis::summarize(&sessions.sessions),
        errors: analysis::summarize_errors(&sessions.sessions),
        skipped_files: sessions.skipped,
        analysis: proposal,
        applied,
        history: history.analyze_history(),
        autoplay,
    };
    write_reports(args, &report)
}

fn announce_banner() {
    println!("{}", "🎮 Trailwise Balance Tuner".bright_cyan().bold());
    println!("{}", "==========================".cyan());
}

fn reset_tuning(args: &Args) -> Result<()> {
    let removed = TuningFile::remove(&args.config)
        .with_context(|| format!("failed to reset {}", args.config.display()))?;
    let mut output_target = OutputTarget::new(args.output.clone())?;
    if removed {
        writeln!(
            output_target.writer(),
            "🗑️  Removed {}; the game is back to base constants",
            args.config.display()
        )?;
    } else {
        writeln!(
            output_target.writer(),
            "No tuning file at {}",
            args.config.display()
        )?;
    }
    output_target.flush_inner()?;
    Ok(())
}

/// Existing adjustment file, or a fresh one when it is missing or unreadable JSON.
fn load_tuning_file(path: &Path) -> Result<TuningFile> {
    match TuningFile::load_optional(path) {
        Ok(Some(file)) => Ok(file),
        Ok(None) => Ok(TuningFile::default()),
        Err(err @ TuningFileError::Parse { .. }) => {
            log::warn!("{err}; starting a new tuning history");
            Ok(TuningFile::default())
        }
        Err(err) => Err(err).context("failed to load tuning history"),
    }
}

fn apply_adjustments(
    args: &Args,
    history: &mut TuningHistory,
    proposal: Option<&Analysis>,
    metrics: Metrics,
) -> Result<Option<TuningIteration>> {
    let Some(proposal) = proposal else {
        return Ok(None);
    };
    if !args.apply || proposal.adjustments.is_empty() {
        return Ok(None);
    }
    let iteration = history.record_iteration(
        &proposal.adjustments,
        metrics,
        &proposal.insights,
        Local::now(),
    );
    history
        .file()
        .save(&args.config)
        .with_context(|| format!("failed to save {}", args.config.display()))?;
    log::info!(
        "saved {} adjustment(s) to {}",
        iteration.adjustments.len(),
        args.config.display()
    );
    Ok(Some(iteration))
}

fn write_reports(args: &Args, report: &TunerReport) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => reports::generate_json_report(&mut output_target, report)?,
        "markdown" => reports::generate_markdown_report(&mut output_target, report)?,
        _ => reports::generate_console_report(&mut output_target, report)?,
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("trailwise-tuner-{label}-{nanos}"))
    }

    fn base_args() -> Args {
        Args {
            logs_dir: temp_path("logs"),
            config: temp_path("config.json"),
            min_sessions: 5,
            apply: false,
            reset: false,
            report: "json".to_string(),
            verbose: false,
            output: None,
            oscillation_window: DEFAULT_OSCILLATION_WINDOW,
            command: None,
        }
    }

    fn play(sessions: usize) -> Command {
        Command::Play(PlayArgs {
            sessions,
            seed: 7,
            theme: Some(ThemeArg::Desert),
            difficulty: Some(DifficultyArg::Easy),
            strategy: DecisionStrategy::Cautious,
            max_days: 60,
        })
    }

    #[test]
    fn cli_parses_play_with_global_flags() {
        let args = Args::try_parse_from([
            "trailwise-tuner",
            "play",
            "--sessions",
            "3",
            "--theme",
            "ai-generated",
            "--strategy",
            "bold",
            "--apply",
            "--min-sessions",
            "2",
        ])
        .unwrap();
        assert!(args.apply);
        assert_eq!(args.min_sessions, 2);
        let Some(Command::Play(play)) = &args.command else {
            panic!("expected play subcommand");
        };
        let plan = play.plan(&args.logs_dir);
        assert_eq!(plan.sessions, 3);
        assert_eq!(plan.theme, Some(ThemeId::AiGenerated));
        assert_eq!(plan.difficulty, None);
        assert_eq!(plan.strategy, DecisionStrategy::Bold);
        assert_eq!(plan.logs_dir, PathBuf::from("logs"));
    }

    #[test]
    fn unknown_report_format_is_rejected() {
        let parsed = Args::try_parse_from(["trailwise-tuner", "--report", "csv"]);
        assert!(parsed.is_err());
    }

    #[tokio::test]
    async fn zero_min_sessions_is_rejected() {
        let args = Args {
            min_sessions: 0,
            ..base_args()
        };
        assert!(run(&args).await.is_err());
    }

    #[tokio::test]
    async fn oscillation_window_must_fit_the_history() {
        for window in [0, 1, HISTORY_WINDOW + 1] {
            let args = Args {
                oscillation_window: window,
                ..base_args()
            };
            let err = run(&args).await.unwrap_err();
            assert!(err.to_string().contains("--oscillation-window"));
        }
    }

    #[tokio::test]
    async fn empty_logs_dir_reports_missing_sessions() {
        let output = temp_path("empty.json");
        let args = Args {
            output: Some(output.clone()),
            ..base_args()
        };
        run(&args).await.unwrap();
        let content = std::fs::read_to_string(&output).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["sessions"]["total"], 0);
        assert!(value["analysis"].is_null());
        assert!(!args.config.exists());
        let _ = std::fs::remove_file(output);
    }

    #[tokio::test]
    async fn play_then_apply_writes_history_when_adjusting() {
        let output = temp_path("play.md");
        let args = Args {
            min_sessions: 1,
            apply: true,
            report: "markdown".to_string(),
            output: Some(output.clone()),
            command: Some(play(2)),
            ..base_args()
        };
        run(&args).await.unwrap();
        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains("# Trailwise Tuning Report"));
        assert!(content.contains("## Autoplay"));
        let logs = std::fs::read_dir(&args.logs_dir).unwrap().count();
        assert_eq!(logs, 2);
        if content.contains("Saved iteration") {
            let file = TuningFile::load(&args.config).unwrap();
            assert_eq!(file.metadata.tuning_iteration, 1);
            assert_eq!(file.tuning_history.len(), 1);
        } else {
            assert!(!args.config.exists());
        }
        let _ = std::fs::remove_dir_all(&args.logs_dir);
        let _ = std::fs::remove_file(&args.config);
        let _ = std::fs::remove_file(output);
    }

    #[tokio::test]
    async fn reset_removes_the_tuning_file() {
        let output = temp_path("reset.txt");
        let args = Args {
            reset: true,
            output: Some(output.clone()),
            ..base_args()
        };
        TuningFile::default().save(&args.config).unwrap();
        run(&args).await.unwrap();
        assert!(!args.config.exists());
        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains("Removed"));

        run(&args).await.unwrap();
        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains("No tuning file"));
        let _ = std::fs::remove_file(output);
    }

    #[test]
    fn malformed_tuning_file_starts_fresh_history() {
        let path = temp_path("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let file = load_tuning_file(&path).unwrap();
        assert!(file.tuning_history.is_empty());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn write_reports_emits_console_output() {
        let output = temp_path("console.txt");
        let args = Args {
            report: "console".to_string(),
            output: Some(output.clone()),
            ..base_args()
        };
        let report = TunerReport {
            logs_dir: args.logs_dir.clone(),
            min_sessions: 5,
            sessions: analysis::SessionStats::default(),
            errors: analysis::ErrorStats::default(),
            skipped_files: Vec::new(),
            analysis: None,
            applied: None,
            history: analysis::HistoryStatus::default(),
            autoplay: Vec::new(),
        };
        write_reports(&args, &report).unwrap();
        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains("Session Summary"));
        assert!(content.contains("Need at least 5"));
        let _ = std::fs::remove_file(output);
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        target.write_all(b"ok").unwrap();
        target.flush().unwrap();
    }
}
