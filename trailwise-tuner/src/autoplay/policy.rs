use clap::ValueEnum;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use std::fmt;
use trailwise_game::{Action, Decider, ItemId, PlayerState, Prompt};

/// Health below which the cautious strategy stops to recover.
const CAUTIOUS_HEALTH_FLOOR: i32 = 45;

const CAUTIOUS_PREFERENCES: &[&str] = &[
    "flare",
    "stormglass",
    "companion",
    "special item",
    "take it",
    "invite",
    "retreat",
    "safer",
    "shelter",
    "avoid",
    "defensive",
    "parley",
    "walk away",
    "move on",
    "move along",
    "decline",
    "leave",
];

const BOLD_PREFERENCES: &[&str] = &[
    "fight",
    "assault",
    "brute force",
    "push through",
    "approach",
    "investigate",
    "accept",
    "play again",
    "take it",
    "invite",
];

/// Built-in strategies for automated play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStrategy {
    /// Uniformly random actions and answers
    Random,
    /// Rests and heals when hurt, avoids fights
    Cautious,
    /// Always travels and takes the aggressive option
    Bold,
}

impl DecisionStrategy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Cautious => "cautious",
            Self::Bold => "bold",
        }
    }
}

impl fmt::Display for DecisionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// [`Decider`] driven by a [`DecisionStrategy`] and a seeded RNG.
#[derive(Debug, Clone)]
pub struct StrategyDecider {
    strategy: DecisionStrategy,
    rng: ChaCha20Rng,
}

impl StrategyDecider {
    #[must_use]
    pub fn new(strategy: DecisionStrategy, seed: u64) -> Self {
        Self {
            strategy,
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    fn random_action(&mut self, player: &PlayerState) -> Action {
        if let Some(recipe) = player.inventory.available_recipes().next()
            && self.rng.gen_bool(0.2)
        {
            return Action::Craft(recipe.result);
        }
        match self.rng.gen_range(0..10) {
            0..=5 => Action::Travel,
            6 | 7 => Action::Rest,
            _ => Action::Scout,
        }
    }

    fn cautious_action(player: &PlayerState) -> Action {
        if let Some(recipe) = player.inventory.available_recipes().next() {
            return Action::Craft(recipe.result);
        }
        if player.health() < CAUTIOUS_HEALTH_FLOOR {
            return healing_item(player).map_or(Action::Rest, Action::UseItem);
        }
        Action::Travel
    }
}

fn healing_item(player: &PlayerState) -> Option<ItemId> {
    player
        .inventory
        .iter()
        .find(|item| item.consumable().is_some_and(|effect| effect.heal > 0))
}

fn preferred_option(options: &[&str], preferences: &[&str]) -> Option<usize> {
    preferences.iter().find_map(|wanted| {
        options
            .iter()
            .position(|option| option.to_ascii_lowercase().contains(wanted))
    })
}

impl Decider for StrategyDecider {
    fn choose_action(&mut self, player: &PlayerState) -> Action {
        match self.strategy {
            DecisionStrategy::Random => self.random_action(player),
            DecisionStrategy::Cautious => Self::cautious_action(player),
            DecisionStrategy::Bold => Action::Travel,
        }
    }

    fn choose_option(&mut self, prompt: &Prompt<'_>) -> usize {
        let options = prompt.options;
        if options.is_empty() {
            return 0;
        }
        match self.strategy {
            DecisionStrategy::Random => self.rng.gen_range(0..options.len()),
            DecisionStrategy::Cautious => {
                preferred_option(options, CAUTIOUS_PREFERENCES).unwrap_or(0)
            }
            DecisionStrategy::Bold => preferred_option(options, BOLD_PREFERENCES).unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trailwise_game::{Difficulty, ParameterStore, ThemeId};

    fn traveller() -> PlayerState {
        PlayerState::new(ThemeId::Desert, Difficulty::Normal, &ParameterStore::neutral())
    }

    fn prompt<'a>(options: &'a [&'a str], player: &'a PlayerState) -> Prompt<'a> {
        Prompt {
            id: "bandit",
            options,
            player,
        }
    }

    #[test]
    fn bold_always_travels_and_fights() {
        let player = traveller();
        let mut decider = StrategyDecider::new(DecisionStrategy::Bold, 1);
        assert_eq!(decider.choose_action(&player), Action::Travel);
        let options = ["Attempt a tactical retreat", "Stand and fight"];
        assert_eq!(decider.choose_option(&prompt(&options, &player)), 1);
    }

    #[test]
    fn cautious_rests_or_heals_when_hurt() {
        let mut player = traveller();
        let mut decider = StrategyDecider::new(DecisionStrategy::Cautious, 1);
        assert_eq!(decider.choose_action(&player), Action::Travel);
        player.ledger.health = 30;
        assert_eq!(decider.choose_action(&player), Action::Rest);
        player.inventory.add(ItemId::HealersSalve);
        assert_eq!(
            decider.choose_action(&player),
            Action::UseItem(ItemId::HealersSalve)
        );
        let options = ["Stand and fight", "Attempt a tactical retreat"];
        assert_eq!(decider.choose_option(&prompt(&options, &player)), 1);
    }

    #[test]
    fn random_strategy_is_seeded() {
        let player = traveller();
        let options = ["a", "b", "c", "d"];
        let picks = |seed| {
            let mut decider = StrategyDecider::new(DecisionStrategy::Random, seed);
            (0..16)
                .map(|_| decider.choose_option(&prompt(&options, &player)))
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(9), picks(9));
        assert!(picks(9).iter().all(|idx| *idx < options.len()));
    }

    #[test]
    fn unmatched_prompts_fall_back_to_the_first_option() {
        let player = traveller();
        let mut decider = StrategyDecider::new(DecisionStrategy::Cautious, 1);
        let options = ["A globe", "A map"];
        assert_eq!(decider.choose_option(&prompt(&options, &player)), 0);
    }
}
