//! Final encounter, ending tiers, and death attribution.
use crate::achievements::Achievement;
use crate::constants::{COMBAT_DEATH_THRESHOLD, HEALTHY_ENDING_THRESHOLD};
use crate::events::{EventCtx, EventOutcome};
use crate::ledger::Pool;
use crate::outcome::{DeathCause, Ending};
use crate::state::PlayerState;
use crate::themes::CompanionBonus;

#[derive(Clone, Copy)]
enum FinalMove {
    BruteForce,
    SpecialItem,
    Workaround,
    Companion,
}

/// Last obstacle before the destination, resolved through the decider.
pub fn final_encounter(ctx: &mut EventCtx<'_>) -> EventOutcome {
    let mut options = vec![
        (FinalMove::BruteForce, "Charge through with brute force"),
        (FinalMove::SpecialItem, "Use your special item"),
        (FinalMove::Workaround, "Find a creative workaround"),
    ];
    if ctx.player.companion.is_some() {
        options.push((FinalMove::Companion, "Rely on your companion's expertise"));
    }

    match ctx.choose(&options).unwrap_or(FinalMove::BruteForce) {
        FinalMove::BruteForce => {
            if ctx.player.health() >= 60 {
                ctx.damage(30);
                EventOutcome::new("forced_through")
            } else {
                ctx.damage(50);
                ctx.supply(Pool::Food, -10);
                EventOutcome::new("overwhelmed")
            }
        }
        FinalMove::SpecialItem => {
            let relic = ctx.player.special_item();
            if ctx.player.inventory.remove(relic) {
                EventOutcome::new("relic_used")
            } else {
                ctx.damage(40);
                EventOutcome::new("improvised")
            }
        }
        FinalMove::Workaround => {
            if ctx.player.morale() >= 50 {
                ctx.supply(Pool::Fuel, -5);
                EventOutcome::new("bypassed")
            } else {
                ctx.damage(25);
                ctx.supply(Pool::Food, -5);
                EventOutcome::new("partial_failure")
            }
        }
        FinalMove::Companion => {
            let expert = ctx.player.has_companion_bonus(CompanionBonus::Scout)
                || ctx.player.has_companion_bonus(CompanionBonus::Combat);
            if expert {
                ctx.morale(10);
            } else {
                ctx.player.heal(15);
            }
            EventOutcome::new("companion_led")
        }
    }
}

/// Ending tier for a traveller who reached the destination alive.
#[must_use]
pub fn determine_ending(player: &PlayerState) -> Ending {
    let signal = player.inventory.iter().any(|item| item.is_signal());
    let healthy = player.health() >= HEALTHY_ENDING_THRESHOLD;
    match (signal, healthy) {
        (true, true) => Ending::Perfect,
        (true, false) => Ending::GoodSignal,
        (false, true) => Ending::GoodHealthy,
        (false, false) => Ending::Arrived,
    }
}

/// Achievements earned by an ending, survivor first.
#[must_use]
pub fn ending_achievements(ending: Ending) -> &'static [Achievement] {
    match ending {
        Ending::Perfect => &[
            Achievement::Survivor,
            Achievement::BestEnding,
            Achievement::Flawless,
        ],
        Ending::GoodSignal => &[Achievement::Survivor, Achievement::BestEnding],
        Ending::GoodHealthy => &[Achievement::Survivor, Achievement::Flawless],
        Ending::Arrived => &[Achievement::Survivor],
    }
}

/// Most likely reason a traveller died.
#[must_use]
pub const fn death_cause(player: &PlayerState) -> DeathCause {
    if player.combats_survived > COMBAT_DEATH_THRESHOLD {
        DeathCause::Combat
    } else if player.ledger.food <= 0 {
        DeathCause::Starvation
    } else if player.ledger.water <= 0 {
        DeathCause::Dehydration
    } else {
        DeathCause::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::ScriptedDecider;
    use crate::items::ItemId;
    use crate::narrative::TemplateNarrator;
    use crate::params::ParameterStore;
    use crate::session_log::LogEvent;
    use crate::state::Difficulty;
    use crate::themes::ThemeId;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn traveller() -> PlayerState {
        PlayerState::new(ThemeId::Desert, Difficulty::Normal, &ParameterStore::neutral())
    }

    fn encounter(player: &mut PlayerState, option: usize) -> EventOutcome {
        let params = ParameterStore::neutral();
        let mut rng = SmallRng::seed_from_u64(9);
        let mut decider = ScriptedDecider::new(Vec::new()).with_options([option]);
        let mut log: Vec<LogEvent> = Vec::new();
        let mut ctx = EventCtx {
            player,
            params: &params,
            rng: &mut rng,
            decider: &mut decider,
            narrator: &TemplateNarrator,
            log: &mut log,
            scope: "final_encounter",
        };
        final_encounter(&mut ctx)
    }

    #[test]
    fn endings_follow_signal_and_health() {
        let mut player = traveller();
        assert_eq!(determine_ending(&player), Ending::GoodHealthy);
        player.inventory.add(ItemId::BeaconArray);
        assert_eq!(determine_ending(&player), Ending::Perfect);
        player.ledger.health = 79;
        assert_eq!(determine_ending(&player), Ending::GoodSignal);
        player.inventory.remove(ItemId::BeaconArray);
        assert_eq!(determine_ending(&player), Ending::Arrived);
        assert_eq!(ending_achievements(Ending::Perfect).len(), 3);
    }

    #[test]
    fn death_cause_prefers_combat_then_supplies() {
        let mut player = traveller();
        assert_eq!(death_cause(&player), DeathCause::Unknown);
        player.ledger.water = 0;
        assert_eq!(death_cause(&player), DeathCause::Dehydration);
        player.ledger.food = 0;
        assert_eq!(death_cause(&player), DeathCause::Starvation);
        player.combats_survived = 4;
        assert_eq!(death_cause(&player), DeathCause::Combat);
    }

    #[test]
    fn special_item_clears_the_final_obstacle_for_free() {
        let mut player = traveller();
        player.inventory.add(ItemId::QuicksilverFlask);
        let outcome = encounter(&mut player, 1);
        assert_eq!(outcome.result, "relic_used");
        assert_eq!(player.health(), 100);
        assert!(!player.has_item(ItemId::QuicksilverFlask));

        let mut empty_handed = traveller();
        let outcome = encounter(&mut empty_handed, 1);
        assert_eq!(outcome.result, "improvised");
        assert_eq!(empty_handed.health(), 60);
    }

    #[test]
    fn weak_brute_force_costs_food_too() {
        let mut player = traveller();
        player.ledger.health = 55;
        let food = player.ledger.food;
        let outcome = encounter(&mut player, 0);
        assert_eq!(outcome.result, "overwhelmed");
        assert_eq!(player.health(), 5);
        assert_eq!(player.ledger.food, food - 10);
    }
}
