//! Narrative and presentation collaborators.
//!
//! The simulation only needs a scenario paragraph for generated events and a
//! place to push status snapshots. Both are traits so a driver can plug in a
//! remote text generator or a terminal renderer; the defaults are template
//! text and a no-op display.
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use thiserror::Error;

use crate::constants::{DEFAULT_NARRATIVE_TIMEOUT_MS, FALLBACK_SCENARIO_TEXT};
use crate::state::PlayerState;
use crate::themes::ThemeId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NarrativeError {
    #[error("narrative provider failed: {0}")]
    Failed(String),
    #[error("narrative provider timed out after {millis} ms")]
    Timeout { millis: u64 },
    #[error("narrative provider returned empty text")]
    Empty,
}

impl NarrativeError {
    /// Value written to the `error_type` field of the session log.
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "NarrativeTimeout",
            Self::Failed(_) | Self::Empty => "NarrativeFailure",
        }
    }
}

/// Flavour of generated scenario; selects the response table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioClass {
    General,
    Danger,
    Mystery,
    Discovery,
    Encounter,
}

impl ScenarioClass {
    pub const ALL: [Self; 5] = [
        Self::General,
        Self::Danger,
        Self::Mystery,
        Self::Discovery,
        Self::Encounter,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Danger => "danger",
            Self::Mystery => "mystery",
            Self::Discovery => "discovery",
            Self::Encounter => "encounter",
        }
    }
}

impl fmt::Display for ScenarioClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a provider needs to produce one scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioRequest {
    pub theme: ThemeId,
    pub class: ScenarioClass,
    /// Scenarios already shown this session.
    pub seen: BTreeSet<String>,
    /// Caller-supplied entropy so template picks follow the session seed.
    pub pick: u64,
}

/// Produces scenario text for a theme and class.
pub trait NarrativeProvider {
    /// # Errors
    ///
    /// Returns an error when no text could be produced.
    fn scenario(&self, request: &ScenarioRequest) -> Result<String, NarrativeError>;
}

/// Receives a view of the traveller whenever the driver would redraw status.
pub trait StatusDisplay {
    fn render(&mut self, player: &PlayerState);
}

/// Display that ignores every snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDisplay;

impl StatusDisplay for NullDisplay {
    fn render(&mut self, _player: &PlayerState) {}
}

/// Resolve a provider result into display text, substituting the fallback paragraph.
///
/// Returns the text plus the error that forced the fallback, if any.
#[must_use]
pub fn text_or_fallback(result: Result<String, NarrativeError>) -> (String, Option<NarrativeError>) {
    match result {
        Ok(text) if !text.trim().is_empty() => (text, None),
        Ok(_) => (FALLBACK_SCENARIO_TEXT.to_string(), Some(NarrativeError::Empty)),
        Err(err) => (FALLBACK_SCENARIO_TEXT.to_string(), Some(err)),
    }
}

const DESERT_SCENARIOS: [&str; 5] = [
    "You discover ancient ruins half-buried in the sand. Inscriptions glow faintly.",
    "A mirage appears, but it feels too real. Something moves within it.",
    "The sand beneath your feet suddenly shifts. You've stumbled upon a hidden cavern.",
    "A solitary figure on the horizon signals urgently. They seem to know you're coming.",
    "You find strange crystalline formations that sing in the wind.",
];

const SPACE_SCENARIOS: [&str; 5] = [
    "An unidentified signal emanates from nearby asteroids. It's in a familiar frequency.",
    "The ship's scanners detect an artificial construct from unknown origins.",
    "Spatial radiation spikes. Your instruments show a temporal distortion ahead.",
    "You receive a distress beacon, but it's dated from 50 years in the future.",
    "A dormant alien probe awakens as you pass. It begins transmitting.",
];

const MIST_SCENARIOS: [&str; 5] = [
    "The fog parts briefly, revealing a city that shouldn't exist on any map.",
    "Ancient music echoes through the mist. Your companions feel strangely drawn to it.",
    "A figure made of mist approaches. It wears a crown of spectral light.",
    "The ground beneath you becomes solid as a bridge appears out of nowhere.",
    "The mist turns colours you've never seen before. It feels alive.",
];

const TIME_SCENARIOS: [&str; 5] = [
    "You stumble upon a moment where two timelines overlap. You see yourself arriving.",
    "A chrono-anomaly reveals futures that never were. Some look better, some worse.",
    "You find a journal written in your own handwriting... decades in the future.",
    "The fabric of time stutters. You catch glimpses of parallel journeys.",
    "A Time Guardian manifests, warning of a paradox in your path ahead.",
];

const CYBER_SCENARIOS: [&str; 5] = [
    "You intercept a data stream from a rival runner. They know your infiltration path.",
    "The building's AI suddenly goes silent. Someone else has jacked in.",
    "A black-market neural implant vendor contacts you with intel on the vault.",
    "Ghost code from a previous hack activates and helps you bypass security.",
    "A corporate kill-team arrives early. Someone leaked your timeline.",
];

const AI_SCENARIOS: [&str; 20] = [
    "Reality shifts around you. The path ahead morphs into something unexpected.",
    "A presence watches from the shadows. It knows your name, though you've never met.",
    "Time and space fracture. You glimpse a thousand possible futures at once.",
    "The world glitches. For a moment, you see the code underlying everything.",
    "A voice echoes from nowhere: 'This is not how your story was meant to unfold.'",
    "The environment warps. Colors bleed into sounds, and gravity becomes optional.",
    "You encounter a door that wasn't there before. It bears your initials.",
    "Memory fragments from lives you never lived flood your consciousness.",
    "A strange artifact pulses with energy. It reacts specifically to your presence.",
    "The boundary between dream and reality thins. Which side are you on?",
    "Symbols appear in the air around you, rearranging into a warning message.",
    "You hear your own voice calling from the distance, but older and wiser.",
    "The path splits into impossible directions. Each feels equally certain and wrong.",
    "Something ancient stirs. It has been waiting specifically for you to arrive.",
    "Reality loops. You've experienced this exact moment before, but differently.",
    "A threshold appears. Crossing it will change everything, but standing still will too.",
    "The narrative itself seems to falter. You sense the story rewriting around you.",
    "Probability collapses. Multiple outcomes exist simultaneously until you choose.",
    "You discover evidence of your own future actions. The causality makes no sense.",
    "The journey reveals itself to be a test. But who set it, and why?",
];

const REPEAT_SUFFIXES: [&str; 3] = [
    "The situation feels eerily familiar.",
    "Something about this reminds you of before.",
    "Déjà vu washes over you.",
];

/// Template paragraphs written for a theme.
#[must_use]
pub const fn scenario_templates(theme: ThemeId) -> &'static [&'static str] {
    match theme {
        ThemeId::Desert => &DESERT_SCENARIOS,
        ThemeId::Space => &SPACE_SCENARIOS,
        ThemeId::Mist => &MIST_SCENARIOS,
        ThemeId::Time => &TIME_SCENARIOS,
        ThemeId::Cyber => &CYBER_SCENARIOS,
        ThemeId::AiGenerated => &AI_SCENARIOS,
    }
}

/// Offline provider backed by the per-theme templates.
///
/// Unseen templates are preferred. Once a theme is exhausted the generated
/// theme borrows from the others, while fixed themes repeat a template with a
/// déjà-vu suffix.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateNarrator;

impl NarrativeProvider for TemplateNarrator {
    fn scenario(&self, request: &ScenarioRequest) -> Result<String, NarrativeError> {
        let own = scenario_templates(request.theme);
        let unseen: Vec<&str> = own
            .iter()
            .copied()
            .filter(|text| !request.seen.contains(*text))
            .collect();
        if let Some(text) = pick(&unseen, request.pick) {
            return Ok(text.to_string());
        }

        if request.theme == ThemeId::AiGenerated {
            let borrowed: Vec<&str> = ThemeId::ALL
                .into_iter()
                .filter(|theme| *theme != ThemeId::AiGenerated)
                .flat_map(|theme| scenario_templates(theme).iter().copied())
                .filter(|text| !request.seen.contains(*text))
                .collect();
            return pick(&borrowed, request.pick)
                .map(str::to_string)
                .ok_or_else(|| NarrativeError::Failed("every template has been shown".to_string()));
        }

        let base = pick(own, request.pick)
            .ok_or_else(|| NarrativeError::Failed(format!("no templates for {}", request.theme)))?;
        let rounds = u64::try_from(own.len()).unwrap_or(1).max(1);
        let suffix = pick(&REPEAT_SUFFIXES, request.pick / rounds)
            .unwrap_or(REPEAT_SUFFIXES[0]);
        Ok(format!("{base} {suffix}"))
    }
}

fn pick<'a>(options: &[&'a str], entropy: u64) -> Option<&'a str> {
    if options.is_empty() {
        return None;
    }
    let len = u64::try_from(options.len()).ok()?;
    let idx = usize::try_from(entropy % len).ok()?;
    options.get(idx).copied()
}

/// Runs a provider on a worker thread and gives up after a deadline.
#[derive(Debug)]
pub struct TimedNarrator<P> {
    inner: Arc<P>,
    timeout: Duration,
}

impl<P> TimedNarrator<P> {
    #[must_use]
    pub fn new(inner: P, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            timeout,
        }
    }

    #[must_use]
    pub fn with_default_timeout(inner: P) -> Self {
        Self::new(inner, Duration::from_millis(DEFAULT_NARRATIVE_TIMEOUT_MS))
    }
}

impl<P> NarrativeProvider for TimedNarrator<P>
where
    P: NarrativeProvider + Send + Sync + 'static,
{
    fn scenario(&self, request: &ScenarioRequest) -> Result<String, NarrativeError> {
        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let owned = request.clone();
        thread::Builder::new()
            .name("trailwise-narrative".to_string())
            .spawn(move || {
                let _ = tx.send(inner.scenario(&owned));
            })
            .map_err(|err| NarrativeError::Failed(err.to_string()))?;
        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                let millis = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                log::warn!("narrative provider exceeded {millis} ms");
                Err(NarrativeError::Timeout { millis })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(NarrativeError::Failed(
                "narrative worker exited without a result".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Slow;

    impl NarrativeProvider for Slow {
        fn scenario(&self, _request: &ScenarioRequest) -> Result<String, NarrativeError> {
            thread::sleep(Duration::from_millis(200));
            Ok("late".to_string())
        }
    }

    fn request(theme: ThemeId, seen: &[&str], pick: u64) -> ScenarioRequest {
        ScenarioRequest {
            theme,
            class: ScenarioClass::Mystery,
            seen: seen.iter().map(|s| (*s).to_string()).collect(),
            pick,
        }
    }

    #[test]
    fn templates_skip_seen_scenarios() {
        let seen = &DESERT_SCENARIOS[..4];
        let text = TemplateNarrator
            .scenario(&request(ThemeId::Desert, seen, 7))
            .unwrap();
        assert_eq!(text, DESERT_SCENARIOS[4]);
    }

    #[test]
    fn exhausted_fixed_theme_repeats_with_suffix() {
        let text = TemplateNarrator
            .scenario(&request(ThemeId::Cyber, &CYBER_SCENARIOS, 2))
            .unwrap();
        assert!(text.starts_with(CYBER_SCENARIOS[2]));
        assert!(REPEAT_SUFFIXES.iter().any(|suffix| text.ends_with(suffix)));
    }

    #[test]
    fn exhausted_generated_theme_borrows_from_others() {
        let text = TemplateNarrator
            .scenario(&request(ThemeId::AiGenerated, &AI_SCENARIOS, 0))
            .unwrap();
        assert!(!AI_SCENARIOS.contains(&text.as_str()));
        assert!(DESERT_SCENARIOS.contains(&text.as_str()));
    }

    #[test]
    fn timed_narrator_falls_back_on_timeout() {
        let narrator = TimedNarrator::new(Slow, Duration::from_millis(10));
        let result = narrator.scenario(&request(ThemeId::Space, &[], 0));
        assert_eq!(result, Err(NarrativeError::Timeout { millis: 10 }));
        let (text, err) = text_or_fallback(result);
        assert_eq!(text, FALLBACK_SCENARIO_TEXT);
        assert_eq!(err.map(|e| e.error_type()), Some("NarrativeTimeout"));
    }

    #[test]
    fn empty_text_counts_as_failure() {
        let (text, err) = text_or_fallback(Ok("   ".to_string()));
        assert_eq!(text, FALLBACK_SCENARIO_TEXT);
        assert_eq!(err, Some(NarrativeError::Empty));
    }
}
