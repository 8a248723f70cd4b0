pub mod history;
pub mod metrics;
pub mod rules;
pub mod sessions;

pub use history::{DEFAULT_OSCILLATION_WINDOW, HistoryStatus, TuningHistory};
pub use metrics::{ErrorStats, SessionStats, calculate_metrics, summarize, summarize_errors};
pub use rules::{Analysis, TuningAnalyzer};
pub use sessions::load_sessions;
