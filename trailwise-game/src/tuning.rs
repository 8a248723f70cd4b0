//! Adjustment file format shared by the simulation and the offline tuner.
//!
//! The file is read once at start-up by [`crate::params::ParameterStore`] and
//! rewritten wholesale by the tuner after each accepted iteration.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::params::{Param, ParamKey};
use crate::state::Difficulty;

pub const TUNING_FILE_VERSION: &str = "1.1";
pub const DEFAULT_TUNING_FILE: &str = "game_tuning.json";
/// Number of past iterations kept in the file for display.
pub const HISTORY_WINDOW: usize = 5;

#[derive(Debug, Error)]
pub enum TuningFileError {
    #[error("failed to access tuning file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse tuning file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode tuning file: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Aggregate gameplay metrics for a set of sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_sessions: usize,
    pub win_rate: f64,
    pub death_rate: f64,
    pub avg_days: f64,
    /// Share of deaths per cause; sums to 1 when any deaths occurred.
    #[serde(default)]
    pub death_causes: BTreeMap<String, f64>,
}

/// How an iteration's win rate moved relative to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    #[serde(rename = "initial_tuning")]
    Initial,
    Improving,
    Regressing,
    Neutral,
}

impl Classification {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial_tuning",
            Self::Improving => "improving",
            Self::Regressing => "regressing",
            Self::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded tuner run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningIteration {
    pub iteration: u64,
    pub date: String,
    pub sessions_analyzed: usize,
    pub adjustments: BTreeMap<String, f64>,
    pub metrics: Metrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_metrics: Option<Metrics>,
    pub insights_count: usize,
    pub outcome: Classification,
    /// Keys whose new value was held back by oscillation detection.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suppressed: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TuningMetadata {
    pub generated: String,
    pub tuning_iteration: u64,
    pub sessions_analyzed: usize,
    pub status: String,
}

/// Complete on-disk adjustment document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningFile {
    pub version: String,
    pub metadata: TuningMetadata,
    #[serde(default = "baseline_constants")]
    pub baseline: BTreeMap<String, f64>,
    #[serde(default)]
    pub current_adjustments: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_before: Option<Metrics>,
    #[serde(default)]
    pub metrics_after: Metrics,
    #[serde(default)]
    pub tuning_history: Vec<TuningIteration>,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub note: String,
}

impl Default for TuningFile {
    fn default() -> Self {
        Self {
            version: TUNING_FILE_VERSION.to_string(),
            metadata: TuningMetadata::default(),
            baseline: baseline_constants(),
            current_adjustments: BTreeMap::new(),
            metrics_before: None,
            metrics_after: Metrics::default(),
            tuning_history: Vec::new(),
            insights: Vec::new(),
            note: String::new(),
        }
    }
}

impl TuningFile {
    /// Read and parse an adjustment file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON for this schema.
    pub fn load(path: &Path) -> Result<Self, TuningFileError> {
        let raw = fs::read_to_string(path).map_err(|source| TuningFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: Self = serde_json::from_str(&raw).map_err(|source| TuningFileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if file.version != TUNING_FILE_VERSION {
            log::warn!(
                "tuning file {} has version {} (expected {TUNING_FILE_VERSION})",
                path.display(),
                file.version
            );
        }
        Ok(file)
    }

    /// Load when present, `None` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than a missing file.
    pub fn load_optional(path: &Path) -> Result<Option<Self>, TuningFileError> {
        match Self::load(path) {
            Ok(file) => Ok(Some(file)),
            Err(TuningFileError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Rewrite the whole document, replacing the file in a single rename.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or any filesystem step fails.
    pub fn save(&self, path: &Path) -> Result<(), TuningFileError> {
        let io_err = |source: io::Error| TuningFileError::Io {
            path: path.to_path_buf(),
            source,
        };
        let json = serde_json::to_string_pretty(self).map_err(TuningFileError::Encode)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, json).map_err(io_err)?;
        fs::rename(&staging, path).map_err(io_err)
    }

    /// Delete the adjustment file, returning whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn remove(path: &Path) -> Result<bool, TuningFileError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(TuningFileError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Most recent recorded iteration, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&TuningIteration> {
        self.tuning_history.last()
    }
}

/// Untuned base value of every difficulty-scoped key.
#[must_use]
pub fn baseline_constants() -> BTreeMap<String, f64> {
    let mut baseline = BTreeMap::new();
    for difficulty in Difficulty::ALL {
        for param in Param::ALL {
            baseline.insert(
                ParamKey::difficulty(difficulty, param).to_string(),
                param.base(difficulty),
            );
        }
    }
    baseline
}
