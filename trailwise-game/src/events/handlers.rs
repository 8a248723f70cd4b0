//! Resolution of each random event.
//!
//! [`handler_for`] is the dispatch table: an exhaustive match from
//! [`EventKind`] to a plain function, so a new event kind does not compile
//! until it has a handler. Handlers ask the [`Decider`] to pick among labelled
//! options and draw every roll from the outcome stream they are handed.
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use smallvec::SmallVec;

use crate::achievements::Achievement;
use crate::decision::{Decider, Prompt};
use crate::effects::EffectKind;
use crate::events::EventKind;
use crate::items::ItemId;
use crate::ledger::Pool;
use crate::narrative::{NarrativeProvider, ScenarioClass, ScenarioRequest, text_or_fallback};
use crate::params::ParameterStore;
use crate::session_log::{LogEvent, Recorder};
use crate::state::{PlayerState, Weather};
use crate::themes::{CompanionBonus, ThemeId, theme};

const SCENARIO_ATTEMPTS: usize = 5;
const SCENARIO_ITEM_LIMIT: usize = 8;
const DICE_STAKE: i32 = 5;
const DICE_MAX_ROUNDS: u32 = 3;

/// Signature shared by every event handler.
pub type Handler = fn(&mut EventCtx<'_>) -> EventOutcome;

/// What a handler reports back to the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOutcome {
    /// Short machine-readable result such as `evaded` or `won`.
    pub result: &'static str,
    /// Scenario paragraph shown for generated events.
    pub scenario: Option<String>,
}

impl EventOutcome {
    #[must_use]
    pub const fn new(result: &'static str) -> Self {
        Self {
            result,
            scenario: None,
        }
    }
}

/// Borrowed world handed to a handler for one event.
pub struct EventCtx<'a> {
    pub player: &'a mut PlayerState,
    pub params: &'a ParameterStore,
    pub rng: &'a mut dyn RngCore,
    pub decider: &'a mut dyn Decider,
    pub narrator: &'a dyn NarrativeProvider,
    pub log: &'a mut dyn Recorder,
    /// Prompt id and choice context, e.g. `bandit` or `final_encounter`.
    pub scope: &'static str,
}

impl EventCtx<'_> {
    /// Ask the decider to pick one option and log the pick.
    pub(crate) fn choose<T: Copy>(&mut self, options: &[(T, &str)]) -> Option<T> {
        let labels: SmallVec<[&str; 6]> = options.iter().map(|(_, label)| *label).collect();
        let prompt = Prompt {
            id: self.scope,
            options: &labels,
            player: &*self.player,
        };
        let idx = self
            .decider
            .choose_option(&prompt)
            .min(options.len().saturating_sub(1));
        let (value, label) = *options.get(idx)?;
        self.log.record(LogEvent::Choice {
            prompt: self.scope.to_string(),
            choice: label.to_string(),
            context: Some(format!("day {}", self.player.day)),
        });
        Some(value)
    }

    pub(crate) fn chance(&mut self, probability: f64) -> bool {
        self.rng.r#gen::<f64>() < probability
    }

    pub(crate) fn roll(&mut self, low: i32, high: i32) -> i32 {
        self.rng.gen_range(low..=high)
    }

    pub(crate) fn pick<T: Copy>(&mut self, options: &[T]) -> Option<T> {
        options.choose(&mut *self.rng).copied()
    }

    pub(crate) fn unlock(&mut self, achievement: Achievement) {
        if self.player.try_unlock(achievement) {
            self.log.record(LogEvent::AchievementUnlock {
                achievement,
                day: self.player.day,
            });
        }
    }

    pub(crate) fn add_item(&mut self, item: ItemId) {
        for achievement in self.player.add_item(item) {
            self.log.record(LogEvent::AchievementUnlock {
                achievement,
                day: self.player.day,
            });
        }
    }

    pub(crate) fn damage(&mut self, amount: i32) -> i32 {
        self.player.damage(amount, self.params)
    }

    pub(crate) fn morale(&mut self, delta: i32) {
        self.player.adjust_morale(delta);
    }

    pub(crate) fn supply(&mut self, pool: Pool, delta: i32) {
        self.player.adjust_supply(pool, delta);
    }

    pub(crate) fn travel(&mut self, delta: i32) {
        self.player.advance_distance(delta);
    }

    pub(crate) fn ration(&mut self) {
        self.player.consume_ration(self.params);
    }

    /// Count a fight and award the first-blood badge.
    pub(crate) fn fought(&mut self) {
        self.player.combats_survived += 1;
        self.unlock(Achievement::FirstBlood);
    }

    fn has_companion(&self, bonus: CompanionBonus) -> bool {
        self.player.has_companion_bonus(bonus)
    }
}

/// Dispatch table from event kind to handler.
#[must_use]
pub const fn handler_for(kind: EventKind) -> Handler {
    match kind {
        EventKind::Bandit => bandit,
        EventKind::River => river,
        EventKind::Storm => storm,
        EventKind::Wildlife => wildlife,
        EventKind::Trader => trader,
        EventKind::Discovery => discovery,
        EventKind::Morale => morale_event,
        EventKind::SpecialItem => special_item,
        EventKind::Riddle => riddle,
        EventKind::Companion => companion,
        EventKind::AmbushElite => ambush_elite,
        EventKind::WeatherShift => weather_shift,
        EventKind::GeneratedScenario => generated_scenario,
    }
}

/// Run the handler for `kind`.
pub fn resolve_event(kind: EventKind, ctx: &mut EventCtx<'_>) -> EventOutcome {
    handler_for(kind)(ctx)
}

#[derive(Clone, Copy)]
enum BanditMove {
    Fight,
    Retreat,
    Tribute,
    Intimidate,
    CompanionLead,
    Flare,
}

fn bandit(ctx: &mut EventCtx<'_>) -> EventOutcome {
    if ctx.player.inventory.remove(ItemId::ShadowCloak) {
        return EventOutcome::new("evaded");
    }
    let combat_companion = ctx.has_companion(CompanionBonus::Combat);
    let mut options: SmallVec<[(BanditMove, &str); 6]> = SmallVec::new();
    options.push((BanditMove::Fight, "Stand and fight"));
    options.push((BanditMove::Retreat, "Attempt a tactical retreat"));
    options.push((BanditMove::Tribute, "Offer supplies for safe passage"));
    options.push((BanditMove::Intimidate, "Try to intimidate them"));
    if combat_companion {
        options.push((BanditMove::CompanionLead, "Let your companion take the lead"));
    }
    if ctx.player.has_item(ItemId::SignalFlare) {
        options.push((BanditMove::Flare, "Fire a Signal-Flare to scare them off"));
    }

    match ctx.choose(&options).unwrap_or(BanditMove::Retreat) {
        BanditMove::Fight => {
            let shielded = ctx.player.has_item(ItemId::IronbarkShield)
                || ctx.player.has_item(ItemId::GuardiansMantle);
            let result = if shielded {
                ctx.player.inventory.remove(ItemId::IronbarkShield);
                if ctx.chance(0.3)
                    && let Some(loot) = ctx.pick(&[ItemId::HealersSalve, ItemId::MoraleCharm])
                {
                    ctx.add_item(loot);
                }
                "shield_victory"
            } else {
                let odds = if ctx.player.effects.contains(EffectKind::Lucky) {
                    0.65
                } else {
                    0.55
                };
                if ctx.chance(odds) {
                    ctx.supply(Pool::Food, -3);
                    let hit = ctx.roll(5, 12);
                    ctx.damage(hit);
                    "won"
                } else {
                    ctx.damage(25);
                    ctx.supply(Pool::Food, -5);
                    ctx.morale(-10);
                    "overwhelmed"
                }
            };
            ctx.fought();
            EventOutcome::new(result)
        }
        BanditMove::Retreat => {
            if ctx.chance(0.5) {
                ctx.supply(Pool::Fuel, -4);
                EventOutcome::new("escaped")
            } else {
                ctx.damage(15);
                ctx.morale(-8);
                EventOutcome::new("caught")
            }
        }
        BanditMove::Tribute => {
            if ctx.chance(0.7) {
                ctx.supply(Pool::Food, -8);
                ctx.supply(Pool::Water, -5);
                EventOutcome::new("paid")
            } else {
                ctx.supply(Pool::Food, -5);
                ctx.supply(Pool::Water, -3);
                ctx.damage(15);
                EventOutcome::new("betrayed")
            }
        }
        BanditMove::Intimidate => {
            let bold = ctx.player.effects.contains(EffectKind::Inspired) || ctx.player.health() > 80;
            if ctx.chance(if bold { 0.6 } else { 0.35 }) {
                ctx.morale(15);
                EventOutcome::new("intimidated")
            } else {
                ctx.damage(20);
                ctx.morale(-5);
                EventOutcome::new("provoked")
            }
        }
        BanditMove::CompanionLead => {
            ctx.fought();
            ctx.morale(10);
            if ctx.chance(0.4) {
                ctx.supply(Pool::Food, 5);
            }
            EventOutcome::new("companion_victory")
        }
        BanditMove::Flare => {
            ctx.player.inventory.remove(ItemId::SignalFlare);
            if ctx.chance(0.8) {
                ctx.morale(5);
                EventOutcome::new("scared_off")
            } else {
                ctx.damage(12);
                ctx.player.combats_survived += 1;
                EventOutcome::new("charged")
            }
        }
    }
}

#[derive(Clone, Copy)]
enum RiverMove {
    Ford,
    Search,
    Bypass,
}

fn river(ctx: &mut EventCtx<'_>) -> EventOutcome {
    let options = [
        (RiverMove::Ford, "Ford through carefully"),
        (RiverMove::Search, "Search for a safer crossing"),
        (RiverMove::Bypass, "Build a bypass"),
    ];
    match ctx.choose(&options).unwrap_or(RiverMove::Bypass) {
        RiverMove::Ford => {
            if ctx.chance(0.5) {
                EventOutcome::new("crossed")
            } else {
                ctx.supply(Pool::Fuel, -3);
                ctx.supply(Pool::Water, -3);
                EventOutcome::new("swept")
            }
        }
        RiverMove::Search => {
            let guided = ctx.player.has_item(ItemId::EldritchLantern)
                || ctx.player.has_item(ItemId::WanderersCompass)
                || ctx.has_companion(CompanionBonus::Scout);
            if guided {
                EventOutcome::new("found_passage")
            } else {
                ctx.ration();
                EventOutcome::new("lost_day")
            }
        }
        RiverMove::Bypass => {
            ctx.supply(Pool::Fuel, -5);
            EventOutcome::new("bypassed")
        }
    }
}

#[derive(Clone, Copy)]
enum StormMove {
    Shelter,
    Push,
    Cover,
    Vial,
    Companion,
}

fn storm(ctx: &mut EventCtx<'_>) -> EventOutcome {
    let mut options: SmallVec<[(StormMove, &str); 5]> = SmallVec::new();
    options.push((StormMove::Shelter, "Take shelter and wait it out"));
    options.push((StormMove::Push, "Push through quickly"));
    options.push((StormMove::Cover, "Use the storm as cover"));
    if ctx.player.has_item(ItemId::StormglassVial) {
        options.push((StormMove::Vial, "Navigate with the Stormglass Vial"));
    }
    if ctx.player.companion.is_some() {
        options.push((StormMove::Companion, "Trust your companion's instincts"));
    }

    match ctx.choose(&options).unwrap_or(StormMove::Shelter) {
        StormMove::Shelter => {
            ctx.supply(Pool::Food, -3);
            ctx.supply(Pool::Water, -2);
            EventOutcome::new("sheltered")
        }
        StormMove::Push => {
            if ctx.chance(0.4) {
                ctx.supply(Pool::Fuel, -2);
                let gain = ctx.roll(5, 10);
                ctx.travel(gain);
                ctx.unlock(Achievement::WeatherMaster);
                EventOutcome::new("pushed_through")
            } else {
                ctx.damage(20);
                ctx.supply(Pool::Food, -4);
                ctx.supply(Pool::Water, -3);
                EventOutcome::new("battered")
            }
        }
        StormMove::Cover => {
            if ctx.chance(0.5) {
                let gain = ctx.roll(10, 20);
                ctx.travel(gain);
                ctx.morale(10);
                ctx.unlock(Achievement::WeatherMaster);
                EventOutcome::new("used_cover")
            } else {
                let loss = ctx.roll(5, 10);
                ctx.travel(-loss);
                ctx.damage(10);
                EventOutcome::new("turned_around")
            }
        }
        StormMove::Vial => {
            let gain = ctx.roll(8, 15);
            ctx.travel(gain);
            ctx.unlock(Achievement::WeatherMaster);
            EventOutcome::new("navigated")
        }
        StormMove::Companion => {
            if ctx.has_companion(CompanionBonus::Scout) {
                let gain = ctx.roll(10, 15);
                ctx.travel(gain);
                ctx.supply(Pool::Food, -1);
                EventOutcome::new("companion_path")
            } else {
                ctx.supply(Pool::Food, -2);
                ctx.supply(Pool::Water, -1);
                ctx.morale(5);
                EventOutcome::new("weathered_together")
            }
        }
    }
}

#[derive(Clone, Copy)]
enum WildlifeMove {
    Approach,
    Scare,
    Avoid,
}

fn wildlife(ctx: &mut EventCtx<'_>) -> EventOutcome {
    let options = [
        (WildlifeMove::Approach, "Approach cautiously"),
        (WildlifeMove::Scare, "Scare it away"),
        (WildlifeMove::Avoid, "Avoid it entirely"),
    ];
    match ctx.choose(&options).unwrap_or(WildlifeMove::Avoid) {
        WildlifeMove::Approach => {
            if ctx.chance(0.5) {
                ctx.supply(Pool::Food, 5);
                ctx.supply(Pool::Water, 5);
                EventOutcome::new("friendly")
            } else {
                ctx.damage(15);
                if ctx.chance(0.3) {
                    ctx.player.effects.apply(EffectKind::Poisoned, 3);
                    EventOutcome::new("poisoned")
                } else {
                    EventOutcome::new("attacked")
                }
            }
        }
        WildlifeMove::Scare => {
            if ctx.chance(0.6) {
                ctx.add_item(ItemId::SignalFlare);
                EventOutcome::new("fled")
            } else {
                ctx.damage(10);
                ctx.morale(-5);
                EventOutcome::new("charged")
            }
        }
        WildlifeMove::Avoid => EventOutcome::new("avoided"),
    }
}

#[derive(Clone, Copy)]
enum TraderMove {
    Browse,
    Dice,
    Leave,
}

fn trader(ctx: &mut EventCtx<'_>) -> EventOutcome {
    let options = [
        (TraderMove::Browse, "Browse their wares"),
        (TraderMove::Dice, "Try a game of dice"),
        (TraderMove::Leave, "Move along"),
    ];
    match ctx.choose(&options).unwrap_or(TraderMove::Leave) {
        TraderMove::Browse => {
            let tradeable: Vec<ItemId> = ctx.player.inventory.missing_from_catalogue().collect();
            let Some(offered) = ctx.pick(&tradeable) else {
                ctx.morale(5);
                return EventOutcome::new("nothing_to_sell");
            };
            let food_cost = ctx.roll(5, 12);
            let water_cost = ctx.roll(3, 8);
            let accept = ctx
                .choose(&[(true, "Accept trade"), (false, "Decline")])
                .unwrap_or(false);
            if !accept {
                return EventOutcome::new("declined");
            }
            if ctx.player.ledger.food < food_cost || ctx.player.ledger.water < water_cost {
                return EventOutcome::new("cannot_afford");
            }
            ctx.supply(Pool::Food, -food_cost);
            ctx.supply(Pool::Water, -water_cost);
            ctx.add_item(offered);
            ctx.unlock(Achievement::Trader);
            EventOutcome::new("traded")
        }
        TraderMove::Dice => dice(ctx),
        TraderMove::Leave => EventOutcome::new("moved_on"),
    }
}

/// Two-dice gamble against the trader for a fixed food stake.
fn dice(ctx: &mut EventCtx<'_>) -> EventOutcome {
    let mut result = "declined";
    for round in 0..DICE_MAX_ROUNDS {
        let labels = if round == 0 {
            [(true, "Accept the bet"), (false, "Walk away")]
        } else {
            [(true, "Play again"), (false, "Move on")]
        };
        if !ctx.choose(&labels).unwrap_or(false) {
            break;
        }
        if ctx.player.ledger.food < DICE_STAKE {
            result = "cannot_afford";
            break;
        }
        let mut player_dice = [ctx.roll(1, 6), ctx.roll(1, 6)];
        if ctx.player.effects.contains(EffectKind::Lucky) {
            let low = usize::from(player_dice[1] < player_dice[0]);
            player_dice[low] = ctx.roll(1, 6);
        }
        let trader_total = ctx.roll(1, 6) + ctx.roll(1, 6);
        let player_total = player_dice[0] + player_dice[1];
        result = match player_total.cmp(&trader_total) {
            std::cmp::Ordering::Greater => {
                ctx.supply(Pool::Food, DICE_STAKE);
                ctx.unlock(Achievement::Gambler);
                "dice_won"
            }
            std::cmp::Ordering::Less => {
                ctx.supply(Pool::Food, -DICE_STAKE);
                "dice_lost"
            }
            std::cmp::Ordering::Equal => "dice_draw",
        };
    }
    EventOutcome::new(result)
}

#[derive(Clone, Copy)]
enum DiscoveryMove {
    Investigate,
    Grab,
    Leave,
}

fn discovery(ctx: &mut EventCtx<'_>) -> EventOutcome {
    let options = [
        (DiscoveryMove::Investigate, "Investigate thoroughly"),
        (DiscoveryMove::Grab, "Grab what you can and leave"),
        (DiscoveryMove::Leave, "Leave it alone"),
    ];
    match ctx.choose(&options).unwrap_or(DiscoveryMove::Leave) {
        DiscoveryMove::Investigate => {
            if ctx.chance(0.6) {
                ctx.supply(Pool::Food, 8);
                ctx.supply(Pool::Water, 6);
                ctx.supply(Pool::Fuel, 4);
                ctx.morale(10);
                EventOutcome::new("cache")
            } else {
                ctx.damage(15);
                ctx.supply(Pool::Food, 4);
                EventOutcome::new("trap")
            }
        }
        DiscoveryMove::Grab => {
            ctx.supply(Pool::Food, 4);
            ctx.supply(Pool::Water, 3);
            EventOutcome::new("grabbed")
        }
        DiscoveryMove::Leave => {
            ctx.morale(5);
            EventOutcome::new("left")
        }
    }
}

#[derive(Clone, Copy)]
enum CampMove {
    Stories,
    Repair,
    Watch,
    Talk,
}

fn morale_event(ctx: &mut EventCtx<'_>) -> EventOutcome {
    let mut options: SmallVec<[(CampMove, &str); 4]> = SmallVec::new();
    options.push((CampMove::Stories, "Share stories"));
    options.push((CampMove::Repair, "Repair gear"));
    options.push((CampMove::Watch, "Stand watch"));
    if ctx.player.companion.is_some() {
        options.push((CampMove::Talk, "Talk with your companion"));
    }
    match ctx.choose(&options).unwrap_or(CampMove::Stories) {
        CampMove::Stories => {
            let boost = ctx.roll(10, 20);
            ctx.morale(boost);
            if let Some(extra) = ctx.player.companion_bonus(CompanionBonus::Morale) {
                ctx.morale(i32::try_from(extra).unwrap_or(0));
            }
            EventOutcome::new("stories")
        }
        CampMove::Repair => {
            ctx.supply(Pool::Fuel, 5);
            EventOutcome::new("repaired")
        }
        CampMove::Watch => {
            ctx.player.heal(5);
            ctx.player.effects.apply(EffectKind::Shielded, 1);
            EventOutcome::new("watched")
        }
        CampMove::Talk => {
            ctx.morale(8);
            ctx.player.heal(3);
            EventOutcome::new("talked")
        }
    }
}

fn special_item(ctx: &mut EventCtx<'_>) -> EventOutcome {
    let relic = ctx.player.special_item();
    if ctx.player.has_item(relic) {
        ctx.supply(Pool::Food, 5);
        ctx.supply(Pool::Water, 5);
        return EventOutcome::new("stash");
    }
    let take = ctx
        .choose(&[(true, "Take it"), (false, "Leave it")])
        .unwrap_or(false);
    if take {
        ctx.add_item(relic);
        EventOutcome::new("relic_taken")
    } else {
        EventOutcome::new("relic_left")
    }
}

/// Question, answers, and the index of the correct answer.
pub(crate) struct Riddle {
    pub question: &'static str,
    pub answers: [&'static str; 4],
    pub correct: usize,
}

pub(crate) static RIDDLES: [Riddle; 8] = [
    Riddle {
        question: "I have cities but no houses, forests but no trees, water but no fish. What am I?",
        answers: ["A globe", "A map", "A painting", "A dream"],
        correct: 1,
    },
    Riddle {
        question: "The more you take, the more you leave behind. What am I?",
        answers: ["Breaths", "Steps", "Footsteps", "Memories"],
        correct: 2,
    },
    Riddle {
        question: "I speak without a mouth and hear without ears. I come alive with the wind. What am I?",
        answers: ["A ghost", "An echo", "A shadow", "A whisper"],
        correct: 1,
    },
    Riddle {
        question: "What has keys but no locks, space but no room, and you can enter but not go inside?",
        answers: ["A riddle", "A keyboard", "A mansion", "A treasure chest"],
        correct: 1,
    },
    Riddle {
        question: "I am not alive, but I grow; I need air; water kills me. What am I?",
        answers: ["A crystal", "Ice", "Fire", "A mushroom"],
        correct: 2,
    },
    Riddle {
        question: "What can travel around the world while staying in a corner?",
        answers: ["A spider", "A stamp", "A shadow", "The wind"],
        correct: 1,
    },
    Riddle {
        question: "I have hands but cannot clap. What am I?",
        answers: ["A statue", "A clock", "A puppet", "A glove"],
        correct: 1,
    },
    Riddle {
        question: "What gets wetter the more it dries?",
        answers: ["Sand", "A sponge", "A towel", "Salt"],
        correct: 2,
    },
];

fn riddle(ctx: &mut EventCtx<'_>) -> EventOutcome {
    let idx = ctx.rng.gen_range(0..RIDDLES.len());
    let Some(riddle) = RIDDLES.get(idx) else {
        return EventOutcome::new("no_riddle");
    };
    let options: [(usize, &str); 4] = [
        (0, riddle.answers[0]),
        (1, riddle.answers[1]),
        (2, riddle.answers[2]),
        (3, riddle.answers[3]),
    ];
    let answer = ctx.choose(&options).unwrap_or(0);
    if answer != riddle.correct {
        ctx.damage(15);
        ctx.morale(-10);
        return EventOutcome::new("wrong");
    }
    ctx.morale(15);
    ctx.player.heal(10);
    ctx.unlock(Achievement::Riddler);
    if ctx.chance(0.4) {
        let gifts: SmallVec<[ItemId; 3]> =
            [ItemId::ShadowCloak, ItemId::StormglassVial, ItemId::EmberStone]
                .into_iter()
                .filter(|item| !ctx.player.has_item(*item))
                .collect();
        if let Some(gift) = ctx.pick(&gifts) {
            ctx.add_item(gift);
        }
    }
    EventOutcome::new("correct")
}

fn companion(ctx: &mut EventCtx<'_>) -> EventOutcome {
    if ctx.player.companion.is_some() {
        if ctx.chance(0.6) {
            let gain = ctx.roll(15, 30);
            ctx.travel(gain);
            return EventOutcome::new("shortcut");
        }
        ctx.ration();
        return EventOutcome::new("dead_end");
    }
    let pool = theme(ctx.player.theme).companions;
    let Some(candidate) = pool.choose(&mut *ctx.rng) else {
        return EventOutcome::new("nobody");
    };
    let invite = ctx
        .choose(&[(true, "Invite them to join you"), (false, "Decline politely")])
        .unwrap_or(false);
    if !invite {
        return EventOutcome::new("declined");
    }
    ctx.player.companion = Some(candidate.into());
    ctx.unlock(Achievement::Companion);
    EventOutcome::new("recruited")
}

#[derive(Clone, Copy)]
enum EliteMove {
    Assault,
    Defend,
    Terrain,
    Parley,
}

fn ambush_elite(ctx: &mut EventCtx<'_>) -> EventOutcome {
    let options = [
        (EliteMove::Assault, "All-out assault"),
        (EliteMove::Defend, "Defensive stance"),
        (EliteMove::Terrain, "Use the terrain"),
        (EliteMove::Parley, "Attempt to parley"),
    ];
    match ctx.choose(&options).unwrap_or(EliteMove::Defend) {
        EliteMove::Assault => {
            let mut odds = 0.40;
            if ctx.player.effects.contains(EffectKind::Lucky) {
                odds += 0.15;
            }
            if ctx.has_companion(CompanionBonus::Combat) {
                odds += 0.15;
            }
            let result = if ctx.chance(odds) {
                ctx.supply(Pool::Food, 8);
                ctx.supply(Pool::Water, 5);
                ctx.morale(15);
                ctx.player.effects.apply(EffectKind::Inspired, 3);
                "elite_defeated"
            } else {
                ctx.damage(35);
                ctx.morale(-15);
                "elite_overpowered"
            };
            ctx.fought();
            EventOutcome::new(result)
        }
        EliteMove::Defend => {
            ctx.damage(15);
            ctx.supply(Pool::Fuel, -5);
            ctx.fought();
            EventOutcome::new("endured")
        }
        EliteMove::Terrain => {
            let knows_ground = ctx.has_companion(CompanionBonus::Scout)
                || ctx.player.has_item(ItemId::WanderersCompass);
            let result = if knows_ground {
                ctx.morale(10);
                "outmanoeuvred"
            } else if ctx.chance(0.5) {
                ctx.supply(Pool::Fuel, -3);
                "terrain_used"
            } else {
                ctx.damage(20);
                "backfired"
            };
            ctx.fought();
            EventOutcome::new(result)
        }
        EliteMove::Parley => {
            if ctx.player.morale() >= 60 {
                ctx.player.effects.apply(EffectKind::Lucky, 3);
                EventOutcome::new("boon")
            } else {
                ctx.damage(25);
                ctx.player.combats_survived += 1;
                EventOutcome::new("parley_failed")
            }
        }
    }
}

fn weather_shift(ctx: &mut EventCtx<'_>) -> EventOutcome {
    let current = ctx.player.weather;
    let others: SmallVec<[Weather; 3]> = Weather::ALL
        .into_iter()
        .filter(|weather| *weather != current)
        .collect();
    let next = ctx.pick(&others).unwrap_or(current);
    ctx.player.weather = next;
    match next {
        Weather::Storm => {
            ctx.supply(Pool::Water, -2);
            ctx.morale(-5);
        }
        Weather::Clear => ctx.morale(5),
        Weather::Fog => {}
        Weather::Rain => {
            if ctx.player.theme == ThemeId::Desert {
                ctx.supply(Pool::Water, 8);
            } else {
                ctx.morale(-3);
            }
        }
    }
    EventOutcome::new(next.as_str())
}

fn generated_scenario(ctx: &mut EventCtx<'_>) -> EventOutcome {
    let class = ctx
        .pick(&ScenarioClass::ALL)
        .unwrap_or(ScenarioClass::General);
    let mut text = None;
    for _ in 0..SCENARIO_ATTEMPTS {
        let request = ScenarioRequest {
            theme: ctx.player.theme,
            class,
            seen: ctx.player.seen_scenarios.clone(),
            pick: ctx.rng.next_u64(),
        };
        let (candidate, failure) = text_or_fallback(ctx.narrator.scenario(&request));
        if let Some(err) = failure {
            ctx.log.record(LogEvent::Error {
                error_type: err.error_type().to_string(),
                message: err.to_string(),
                context: Some(format!("scenario:{class}")),
            });
            text = Some(candidate);
            break;
        }
        let fresh = !ctx.player.seen_scenarios.contains(&candidate);
        text = Some(candidate);
        if fresh {
            break;
        }
    }
    let text = text.unwrap_or_default();
    ctx.player.seen_scenarios.insert(text.clone());

    let result = respond_to_scenario(ctx, class);
    ctx.unlock(Achievement::Explorer);
    EventOutcome {
        result,
        scenario: Some(text),
    }
}

fn scenario_item(ctx: &mut EventCtx<'_>, pool: &[ItemId]) {
    if ctx.player.inventory.len() < SCENARIO_ITEM_LIMIT
        && let Some(item) = ctx.pick(pool)
    {
        ctx.add_item(item);
    }
}

fn respond_to_scenario(ctx: &mut EventCtx<'_>, class: ScenarioClass) -> &'static str {
    let labels: [&str; 4] = match class {
        ScenarioClass::Danger => [
            "Face the danger head-on",
            "Find a clever way around it",
            "Wait it out cautiously",
            "Use what you have to escape",
        ],
        ScenarioClass::Mystery => [
            "Investigate the mystery thoroughly",
            "Leave it unsolved and move on",
            "Share what you learn with others",
            "Use it to your advantage",
        ],
        ScenarioClass::Discovery => [
            "Claim it for yourself",
            "Share it and gain favor",
            "Study it carefully",
            "Leave it for someone else",
        ],
        ScenarioClass::Encounter => [
            "Approach peacefully",
            "Keep your distance",
            "Try to learn from them",
            "Challenge them",
        ],
        ScenarioClass::General => [
            "Investigate carefully",
            "Act boldly and seize the moment",
            "Proceed cautiously",
            "Avoid involvement and move on",
        ],
    };
    let options = [
        (0_u8, labels[0]),
        (1, labels[1]),
        (2, labels[2]),
        (3, labels[3]),
    ];
    let choice = ctx.choose(&options).unwrap_or(2);

    match (class, choice) {
        (ScenarioClass::Danger, 0) => {
            if ctx.chance(0.4) {
                let hit = ctx.roll(10, 20);
                ctx.damage(hit);
                "danger_hurt"
            } else {
                let lift = ctx.roll(5, 15);
                ctx.morale(lift);
                "danger_faced"
            }
        }
        (ScenarioClass::Danger, 1) => {
            let lift = ctx.roll(8, 15);
            ctx.morale(lift);
            let gain = ctx.roll(5, 10);
            ctx.travel(gain);
            "danger_avoided"
        }
        (ScenarioClass::Danger, 3) => {
            let gain = ctx.roll(15, 25);
            ctx.travel(gain);
            "danger_escaped"
        }
        (ScenarioClass::Danger, _) => {
            ctx.supply(Pool::Food, -2);
            "danger_waited"
        }
        (ScenarioClass::Mystery, 0) => {
            let lift = ctx.roll(5, 12);
            ctx.morale(lift);
            "mystery_solved"
        }
        (ScenarioClass::Mystery, 1) => {
            let drop = ctx.roll(2, 5);
            ctx.morale(-drop);
            "mystery_ignored"
        }
        (ScenarioClass::Mystery, 3) => {
            let gain = ctx.roll(10, 20);
            ctx.travel(gain);
            let lift = ctx.roll(5, 10);
            ctx.morale(lift);
            "mystery_exploited"
        }
        (ScenarioClass::Mystery, _) => {
            let lift = ctx.roll(3, 8);
            ctx.morale(lift);
            "mystery_shared"
        }
        (ScenarioClass::Discovery, 0) => {
            scenario_item(ctx, &[ItemId::HealersSalve, ItemId::MoraleCharm]);
            "discovery_claimed"
        }
        (ScenarioClass::Discovery, 1) => {
            let lift = ctx.roll(8, 15);
            ctx.morale(lift);
            "discovery_shared"
        }
        (ScenarioClass::Discovery, 3) => {
            let drop = ctx.roll(1, 3);
            ctx.morale(-drop);
            "discovery_left"
        }
        (ScenarioClass::Discovery, _) => {
            let lift = ctx.roll(3, 8);
            ctx.morale(lift);
            "discovery_studied"
        }
        (ScenarioClass::Encounter, 0) => {
            let lift = ctx.roll(5, 10);
            ctx.morale(lift);
            "encounter_friendly"
        }
        (ScenarioClass::Encounter, 1) => {
            let drop = ctx.roll(1, 3);
            ctx.morale(-drop);
            "encounter_distant"
        }
        (ScenarioClass::Encounter, 3) => {
            let hit = ctx.roll(8, 15);
            ctx.damage(hit);
            "encounter_hostile"
        }
        (ScenarioClass::Encounter, _) => {
            let lift = ctx.roll(8, 12);
            ctx.morale(lift);
            "encounter_learned"
        }
        (ScenarioClass::General, 0) => {
            if ctx.chance(0.6) && ctx.chance(0.6) {
                scenario_item(
                    ctx,
                    &[ItemId::HealersSalve, ItemId::MoraleCharm, ItemId::SignalFlare],
                );
            }
            let lift = ctx.roll(1, 3);
            ctx.morale(lift);
            "general_investigated"
        }
        (ScenarioClass::General, 1) => {
            if ctx.chance(0.5) {
                let gain = ctx.roll(10, 20);
                ctx.travel(gain);
                let lift = ctx.roll(10, 20);
                ctx.morale(lift);
                "general_bold"
            } else {
                let hit = ctx.roll(10, 18);
                ctx.damage(hit);
                "general_backfired"
            }
        }
        (ScenarioClass::General, 3) => {
            let drop = ctx.roll(1, 3);
            ctx.morale(-drop);
            "general_avoided"
        }
        (ScenarioClass::General, _) => {
            let lift = ctx.roll(5, 10);
            ctx.morale(lift);
            "general_cautious"
        }
    }
}
