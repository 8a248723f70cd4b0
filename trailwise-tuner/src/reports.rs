use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use trailwise_game::TuningIteration;

use crate::analysis::{Analysis, ErrorStats, HistoryStatus, SessionStats};
use crate::autoplay::PlayRecord;

/// Everything one tuner run produced, ready for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct TunerReport {
    pub logs_dir: PathBuf,
    pub min_sessions: usize,
    pub sessions: SessionStats,
    pub errors: ErrorStats,
    /// Log files that matched the naming pattern but could not be read.
    pub skipped_files: Vec<PathBuf>,
    /// `None` when fewer than `min_sessions` sessions were found.
    pub analysis: Option<Analysis>,
    /// Iteration written to the adjustment file, when `--apply` saved one.
    pub applied: Option<TuningIteration>,
    pub history: HistoryStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub autoplay: Vec<PlayRecord>,
}

fn pct(fraction: f64) -> f64 {
    fraction * 100.0
}

pub fn generate_json_report(out: &mut dyn Write, report: &TunerReport) -> Result<()> {
    let json_output = serde_json::to_string_pretty(report)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_console_report(out: &mut dyn Write, report: &TunerReport) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Session Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==================".cyan())?;

    let stats = &report.sessions;
    writeln!(out, "Logs directory: {}", report.logs_dir.display())?;
    writeln!(
        out,
        "Sessions: {} ({} automated)",
        stats.total, stats.test_mode
    )?;
    writeln!(out, "Victories: {}", stats.victories.to_string().green())?;
    writeln!(out, "Deaths: {}", stats.deaths.to_string().red())?;
    writeln!(out, "Incomplete: {}", stats.incomplete.to_string().yellow())?;
    writeln!(out, "Win rate: {:.1}%", pct(stats.win_rate))?;
    writeln!(
        out,
        "Days played: {:.1} avg (σ {:.1})",
        stats.avg_days, stats.std_days
    )?;
    writeln!(
        out,
        "Per session: {:.1} choices, {:.1} events",
        stats.avg_choices, stats.avg_events
    )?;
    if !report.skipped_files.is_empty() {
        writeln!(
            out,
            "Skipped files: {}",
            report.skipped_files.len().to_string().yellow()
        )?;
    }

    if !stats.themes.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", "Themes".bold())?;
        for group in &stats.themes {
            writeln!(
                out,
                "  {:<12} {:>4} plays  {:>5.1}% wins",
                group.name,
                group.plays,
                pct(group.win_rate)
            )?;
        }
    }
    if !stats.difficulties.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", "Difficulties".bold())?;
        for group in &stats.difficulties {
            writeln!(
                out,
                "  {:<12} {:>4} plays  {:>5.1}% wins",
                group.name,
                group.plays,
                pct(group.win_rate)
            )?;
        }
    }

    if stats.deaths > 0 {
        writeln!(out)?;
        writeln!(out, "{}", "💀 Deaths".bright_red().bold())?;
        writeln!(out, "{}", "=========".red())?;
        for (cause, count) in &stats.death_causes {
            writeln!(out, "  • {cause}: {count}")?;
        }
        writeln!(out, "Average death day: {:.1}", stats.avg_death_day)?;
        writeln!(
            out,
            "Average distance at death: {:.1}%",
            stats.avg_death_distance_pct
        )?;
        writeln!(
            out,
            "Early deaths (under 20% distance): {}",
            stats.early_deaths.to_string().red()
        )?;
    }

    if !stats.endings.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", "Endings".bold())?;
        for (ending, count) in &stats.endings {
            writeln!(out, "  • {ending}: {count}")?;
        }
    }

    write_console_errors(out, &report.errors)?;
    write_console_tuning(out, report)?;
    write_console_history(out, &report.history)?;
    write_console_autoplay(out, &report.autoplay)?;
    Ok(())
}

fn write_console_errors(out: &mut dyn Write, errors: &ErrorStats) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "⚠️  Error Analysis".bright_yellow().bold())?;
    writeln!(out, "{}", "=================".yellow())?;
    if errors.total == 0 {
        writeln!(out, "{}", "No errors recorded.".green())?;
        return Ok(());
    }
    writeln!(
        out,
        "Errors: {} across {} session(s)",
        errors.total.to_string().red(),
        errors.sessions_with_errors
    )?;
    for (kind, count) in &errors.by_type {
        writeln!(out, "  • {kind}: {count}")?;
    }
    Ok(())
}

fn write_console_tuning(out: &mut dyn Write, report: &TunerReport) -> Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "{}",
        "🔧 AUTOMATIC GAME TUNING REPORT".bright_cyan().bold()
    )?;
    writeln!(out, "{}", "===============================".cyan())?;

    let Some(analysis) = &report.analysis else {
        writeln!(
            out,
            "{}",
            format!(
                "Only {} session(s) found. Need at least {} for tuning analysis.",
                report.sessions.total, report.min_sessions
            )
            .yellow()
        )?;
        return Ok(());
    };

    if analysis.insights.is_empty() {
        writeln!(out, "{}", "No significant balance issues detected.".green())?;
    } else {
        writeln!(out, "{}", "Insights".bold())?;
        for insight in &analysis.insights {
            writeln!(out, "  • {insight}")?;
        }
    }

    if analysis.adjustments.is_empty() {
        writeln!(out, "No adjustments to apply.")?;
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "{}", "Adjustments".bold())?;
    let suppressed = report
        .applied
        .as_ref()
        .map_or(&[][..], |it| it.suppressed.as_slice());
    for (key, value) in &analysis.adjustments {
        if suppressed.contains(key) {
            writeln!(
                out,
                "  {key:<40} ×{value:.3}  {}",
                "held (oscillating)".yellow()
            )?;
        } else {
            writeln!(out, "  {key:<40} ×{value:.3}")?;
        }
    }

    writeln!(out)?;
    match &report.applied {
        Some(iteration) => writeln!(
            out,
            "✅ Saved tuning iteration {} ({})",
            iteration.iteration.to_string().green(),
            iteration.outcome
        )?,
        None => writeln!(out, "Dry run: pass --apply to save these adjustments.")?,
    }
    Ok(())
}

fn write_console_history(out: &mut dyn Write, history: &HistoryStatus) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📈 Tuning History".bright_blue().bold())?;
    writeln!(out, "{}", "=================".blue())?;
    writeln!(out, "Iterations so far: {}", history.total_iterations)?;
    if history.recent_outcomes.is_empty() {
        return Ok(());
    }
    let outcomes: Vec<String> = history
        .recent_outcomes
        .iter()
        .map(ToString::to_string)
        .collect();
    writeln!(out, "Recent outcomes: {}", outcomes.join(" → "))?;
    if history.oscillating {
        writeln!(
            out,
            "{}",
            "Oscillation detected: flip-flopping keys are held".yellow()
        )?;
    }
    for failed in &history.failed_adjustments {
        let keys: Vec<&str> = failed.adjustments.keys().map(String::as_str).collect();
        writeln!(
            out,
            "  iteration {} regressed after adjusting {}",
            failed.iteration.to_string().red(),
            keys.join(", ")
        )?;
    }
    Ok(())
}

fn write_console_autoplay(out: &mut dyn Write, records: &[PlayRecord]) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "{}", "🎲 Autoplay Sessions".bright_magenta().bold())?;
    writeln!(out, "{}", "====================".magenta())?;
    for record in records {
        let status = if record.outcome.is_victory() {
            "✅".green()
        } else {
            "❌".red()
        };
        writeln!(
            out,
            "{status} seed {} {}/{} {} day {} at {:.1}% ({})",
            record.seed,
            record.theme,
            record.difficulty,
            record.outcome.label(),
            record.days,
            record.distance_pct,
            record.log_file.display()
        )?;
    }
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, report: &TunerReport) -> Result<()> {
    let stats = &report.sessions;
    writeln!(out, "# Trailwise Tuning Report\n")?;

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Logs directory**: `{}`", report.logs_dir.display())?;
    writeln!(out, "- **Sessions**: {}", stats.total)?;
    writeln!(out, "- **Automated sessions**: {}", stats.test_mode)?;
    writeln!(out, "- **Victories**: {}", stats.victories)?;
    writeln!(out, "- **Deaths**: {}", stats.deaths)?;
    writeln!(out, "- **Incomplete**: {}", stats.incomplete)?;
    writeln!(out, "- **Win rate**: {:.1}%", pct(stats.win_rate))?;
    writeln!(out, "- **Average days**: {:.1}", stats.avg_days)?;
    writeln!(out, "- **Early deaths**: {}\n", stats.early_deaths)?;

    if !stats.death_causes.is_empty() {
        writeln!(out, "## Death Causes\n")?;
        writeln!(out, "| Cause | Count |")?;
        writeln!(out, "|-------|-------|")?;
        for (cause, count) in &stats.death_causes {
            writeln!(out, "| {cause} | {count} |")?;
        }
        writeln!(out)?;
    }

    writeln!(out, "## Errors\n")?;
    if report.errors.total == 0 {
        writeln!(out, "_No errors recorded._\n")?;
    } else {
        for (kind, count) in &report.errors.by_type {
            writeln!(out, "- **{kind}**: {count}")?;
        }
        writeln!(out)?;
    }

    writeln!(out, "## Tuning\n")?;
    match &report.analysis {
        None => writeln!(
            out,
            "_Only {} session(s) found. Need at least {} for tuning analysis._\n",
            stats.total, report.min_sessions
        )?,
        Some(analysis) => {
            if analysis.insights.is_empty() {
                writeln!(out, "_No significant balance issues detected._\n")?;
            } else {
                for insight in &analysis.insights {
                    writeln!(out, "- {insight}")?;
                }
                writeln!(out)?;
            }
            if !analysis.adjustments.is_empty() {
                writeln!(out, "| Key | Multiplier |")?;
                writeln!(out, "|-----|------------|")?;
                for (key, value) in &analysis.adjustments {
                    writeln!(out, "| `{key}` | {value:.3} |")?;
                }
                writeln!(out)?;
            }
        }
    }
    if let Some(iteration) = &report.applied {
        writeln!(
            out,
            "- **Saved iteration**: {} ({})",
            iteration.iteration, iteration.outcome
        )?;
        if !iteration.suppressed.is_empty() {
            writeln!(
                out,
                "- **Suppressed keys**: {}",
                iteration.suppressed.join(", ")
            )?;
        }
        writeln!(out)?;
    }

    let history = &report.history;
    writeln!(out, "## History\n")?;
    writeln!(out, "- **Iterations**: {}", history.total_iterations)?;
    writeln!(out, "- **Oscillating**: {}", history.oscillating)?;
    writeln!(
        out,
        "- **Failed adjustments**: {}",
        history.failed_adjustments.len()
    )?;

    if !report.autoplay.is_empty() {
        writeln!(out, "\n## Autoplay\n")?;
        writeln!(out, "| Seed | Theme | Difficulty | Result | Days |")?;
        writeln!(out, "|------|-------|------------|--------|------|")?;
        for record in &report.autoplay {
            writeln!(
                out,
                "| {} | {} | {} | {} | {} |",
                record.seed,
                record.theme,
                record.difficulty,
                record.outcome.label(),
                record.days
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use trailwise_game::{Classification, Metrics};

    fn sample_report() -> TunerReport {
        TunerReport {
            logs_dir: PathBuf::from("logs"),
            min_sessions: 5,
            sessions: SessionStats {
                total: 8,
                victories: 3,
                deaths: 5,
                win_rate: 0.375,
                death_causes: vec![("starvation".to_string(), 4), ("combat".to_string(), 1)],
                early_deaths: 2,
                ..SessionStats::default()
            },
            errors: ErrorStats {
                total: 2,
                sessions_with_errors: 1,
                by_type: vec![("NarrativeTimeout".to_string(), 2)],
            },
            skipped_files: Vec::new(),
            analysis: Some(Analysis {
                adjustments: BTreeMap::from([
                    ("global.food_consumption_rate".to_string(), 0.85),
                    ("difficulty.hard.event_chance".to_string(), 1.1),
                ]),
                insights: vec!["Starvation causes 80% of deaths".to_string()],
            }),
            applied: None,
            history: HistoryStatus::default(),
            autoplay: Vec::new(),
        }
    }

    fn render(
        renderer: fn(&mut dyn Write, &TunerReport) -> Result<()>,
        report: &TunerReport,
    ) -> String {
        let mut buf = Vec::new();
        renderer(&mut buf, report).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn console_report_lists_insights_and_dry_run_hint() {
        let content = render(generate_console_report, &sample_report());
        assert!(content.contains("Session Summary"));
        assert!(content.contains("AUTOMATIC GAME TUNING REPORT"));
        assert!(content.contains("Starvation causes 80% of deaths"));
        assert!(content.contains("global.food_consumption_rate"));
        assert!(content.contains("NarrativeTimeout"));
        assert!(content.contains("pass --apply"));
    }

    #[test]
    fn console_report_explains_missing_sessions() {
        let report = TunerReport {
            analysis: None,
            ..sample_report()
        };
        let content = render(generate_console_report, &report);
        assert!(content.contains("Only 8 session(s) found"));
        assert!(content.contains("Need at least 5"));
    }

    #[test]
    fn console_report_marks_suppressed_keys() {
        let iteration = TuningIteration {
            iteration: 4,
            date: "2025-06-01T12:00:00+00:00".to_string(),
            sessions_analyzed: 8,
            adjustments: BTreeMap::new(),
            metrics: Metrics::default(),
            previous_metrics: None,
            insights_count: 1,
            outcome: Classification::Regressing,
            suppressed: vec!["difficulty.hard.event_chance".to_string()],
        };
        let report = TunerReport {
            applied: Some(iteration),
            ..sample_report()
        };
        let content = render(generate_console_report, &report);
        assert!(content.contains("held (oscillating)"));
        assert!(content.contains("Saved tuning iteration"));
        assert!(!content.contains("pass --apply"));
    }

    #[test]
    fn quiet_analysis_reports_no_issues() {
        let report = TunerReport {
            analysis: Some(Analysis::default()),
            ..sample_report()
        };
        let content = render(generate_console_report, &report);
        assert!(content.contains("No significant balance issues detected."));
        assert!(content.contains("No adjustments to apply."));
    }

    #[test]
    fn markdown_report_has_sections() {
        let content = render(generate_markdown_report, &sample_report());
        assert!(content.starts_with("# Trailwise Tuning Report"));
        assert!(content.contains("## Summary"));
        assert!(content.contains("- **Win rate**: 37.5%"));
        assert!(content.contains("| starvation | 4 |"));
        assert!(content.contains("| `global.food_consumption_rate` | 0.850 |"));
    }

    #[test]
    fn json_report_round_trips_through_serde_value() {
        let content = render(generate_json_report, &sample_report());
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["sessions"]["total"], 8);
        assert_eq!(value["min_sessions"], 5);
        assert!(value["analysis"]["adjustments"]["global.food_consumption_rate"].is_number());
        assert!(value.get("autoplay").is_none());
    }
}
