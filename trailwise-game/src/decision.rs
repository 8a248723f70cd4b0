//! Seams through which a driver steers a session: daily actions and prompt answers.
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::items::ItemId;
use crate::state::PlayerState;

/// Daily command issued to the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", content = "item", rename_all = "snake_case")]
pub enum Action {
    Travel,
    Rest,
    Scout,
    UseItem(ItemId),
    /// Craft the recipe producing this item.
    Craft(ItemId),
    Inspect,
}

impl Action {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Travel => "travel",
            Self::Rest => "rest",
            Self::Scout => "scout",
            Self::UseItem(_) => "use_item",
            Self::Craft(_) => "craft",
            Self::Inspect => "status",
        }
    }

    /// Whether the action ends the day.
    #[must_use]
    pub const fn consumes_day(self) -> bool {
        matches!(self, Self::Travel | Self::Rest | Self::Scout)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UseItem(item) | Self::Craft(item) => write!(f, "{}:{item}", self.as_str()),
            _ => f.write_str(self.as_str()),
        }
    }
}

/// Labelled options offered during an event or the final encounter.
#[derive(Debug, Clone, Copy)]
pub struct Prompt<'a> {
    /// Stable identifier such as `bandit` or `riddle`.
    pub id: &'a str,
    pub options: &'a [&'a str],
    pub player: &'a PlayerState,
}

/// Source of decisions for a session.
pub trait Decider {
    fn choose_action(&mut self, player: &PlayerState) -> Action;

    /// Index into `prompt.options`. Out-of-range answers are clamped by the caller.
    fn choose_option(&mut self, prompt: &Prompt<'_>) -> usize;
}

/// Replays a fixed script, then falls back to a default action and option.
#[derive(Debug, Clone)]
pub struct ScriptedDecider {
    actions: VecDeque<Action>,
    options: VecDeque<usize>,
    fallback_action: Action,
    fallback_option: usize,
}

impl ScriptedDecider {
    #[must_use]
    pub fn new(actions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            actions: actions.into_iter().collect(),
            options: VecDeque::new(),
            fallback_action: Action::Travel,
            fallback_option: 0,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: impl IntoIterator<Item = usize>) -> Self {
        self.options = options.into_iter().collect();
        self
    }

    #[must_use]
    pub const fn with_fallback(mut self, action: Action, option: usize) -> Self {
        self.fallback_action = action;
        self.fallback_option = option;
        self
    }

    #[must_use]
    pub fn remaining_actions(&self) -> usize {
        self.actions.len()
    }
}

impl Decider for ScriptedDecider {
    fn choose_action(&mut self, _player: &PlayerState) -> Action {
        self.actions.pop_front().unwrap_or(self.fallback_action)
    }

    fn choose_option(&mut self, _prompt: &Prompt<'_>) -> usize {
        self.options.pop_front().unwrap_or(self.fallback_option)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterStore;
    use crate::state::Difficulty;
    use crate::themes::ThemeId;

    #[test]
    fn script_runs_out_into_fallback() {
        let player = PlayerState::new(ThemeId::Desert, Difficulty::Normal, &ParameterStore::neutral());
        let mut decider = ScriptedDecider::new([Action::Rest, Action::Scout])
            .with_options([2])
            .with_fallback(Action::Travel, 1);
        assert_eq!(decider.choose_action(&player), Action::Rest);
        assert_eq!(decider.choose_action(&player), Action::Scout);
        assert_eq!(decider.choose_action(&player), Action::Travel);
        let prompt = Prompt {
            id: "river",
            options: &["ford", "search", "bypass"],
            player: &player,
        };
        assert_eq!(decider.choose_option(&prompt), 2);
        assert_eq!(decider.choose_option(&prompt), 1);
    }

    #[test]
    fn free_actions_do_not_consume_a_day() {
        assert!(Action::Travel.consumes_day());
        assert!(!Action::UseItem(ItemId::HealersSalve).consumes_day());
        assert!(!Action::Inspect.consumes_day());
        assert_eq!(
            Action::Craft(ItemId::BeaconArray).to_string(),
            "craft:Beacon Array"
        );
    }
}
