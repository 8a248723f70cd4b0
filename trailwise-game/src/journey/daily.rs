//! The per-day state machine.
//!
//! A day runs `AwaitingAction → Resolving → DayAdvanced` and may end in a
//! terminal phase. Free actions (item use, crafting, inspecting) resolve and
//! return straight to `AwaitingAction` without touching the calendar.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::achievements::Achievement;
use crate::constants::{
    CLEAR_DISTANCE_BONUS, DAILY_FUEL_COST, DEBUG_ENV_VAR, EXPLORER_SCOUT_COUNT,
    FOG_DISTANCE_PENALTY, INSPIRED_DISTANCE_BONUS, LOW_MORALE_THRESHOLD, MIN_IMPAIRED_DISTANCE,
    MORALE_DRIFT_TARGET, NIGHT_CLEAR_WEIGHT_PENALTY, NIGHT_DISTANCE_PENALTY,
    NIGHT_STORM_WEIGHT_BONUS, NIGHTFALL_MORALE_LOSS, REST_CURE_CHANCE, REST_HEAL_MAX,
    REST_HEAL_MIN, SCOUT_COMPANION_EVENT_CHANCE, SCOUT_EVENT_CHANCE, SCOUT_SHORTCUT_CHANCE,
    SCOUT_SHORTCUT_MAX, SCOUT_SHORTCUT_MIN, STORM_DISTANCE_PENALTY, TRAVEL_GEAR_BONUS,
    WEATHER_WEIGHT_CLEAR, WEATHER_WEIGHT_FOG, WEATHER_WEIGHT_RAIN, WEATHER_WEIGHT_STORM,
};
use crate::decision::{Action, Decider};
use crate::effects::EffectKind;
use crate::events::{EventCtx, EventKind, EventPool, SelectionContext, resolve_event, select_event};
use crate::items::{ItemId, recipe_for};
use crate::journey::{JourneyConfig, Penalty, PenaltyKind, RngBundle};
use crate::ledger::Pool;
use crate::narrative::{NarrativeProvider, StatusDisplay};
use crate::params::{Param, ParameterStore};
use crate::session_log::{LogEvent, Recorder};
use crate::state::{PlayerState, Weather};
use crate::themes::{CompanionBonus, theme};

#[cfg(debug_assertions)]
fn debug_log_enabled() -> bool {
    matches!(std::env::var(DEBUG_ENV_VAR), Ok(val) if val != "0")
}

#[cfg(not(debug_assertions))]
const fn debug_log_enabled() -> bool {
    false
}

/// How a session ended inside the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    Dead,
    Arrived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AwaitingAction,
    Resolving,
    DayAdvanced,
    Terminal(TerminalState),
}

impl Phase {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Terminal(_))
    }
}

/// Why a free action did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    ItemNotCarried,
    NotConsumable,
    RecipeUnavailable,
    SessionOver,
}

impl Rejection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ItemNotCarried => "item_not_carried",
            Self::NotConsumable => "not_consumable",
            Self::RecipeUnavailable => "recipe_unavailable",
            Self::SessionOver => "session_over",
        }
    }
}

/// Everything outside the simulator that a day may call into.
pub struct Collaborators<'a> {
    pub decider: &'a mut dyn Decider,
    pub narrator: &'a dyn NarrativeProvider,
    pub display: &'a mut dyn StatusDisplay,
    pub log: &'a mut dyn Recorder,
}

/// Summary of one `perform` call.
#[derive(Debug, Clone, PartialEq)]
pub struct DayReport {
    pub action: Action,
    /// Day number after the action resolved.
    pub day: u32,
    /// Raw draw from the travel stream, before modifiers.
    pub travel_roll: Option<u32>,
    /// Net distance change, including shortcuts and event effects.
    pub distance_delta: i64,
    pub event: Option<EventKind>,
    pub event_result: Option<&'static str>,
    pub scenario: Option<String>,
    pub penalties: Vec<Penalty>,
    pub rejected: Option<Rejection>,
    pub phase: Phase,
}

impl DayReport {
    const fn new(action: Action, day: u32) -> Self {
        Self {
            action,
            day,
            travel_roll: None,
            distance_delta: 0,
            event: None,
            event_result: None,
            scenario: None,
            penalties: Vec::new(),
            rejected: None,
            phase: Phase::AwaitingAction,
        }
    }
}

/// Drives one traveller through the daily cycle with seeded RNG streams.
#[derive(Debug)]
pub struct DaySimulator<'p> {
    params: &'p ParameterStore,
    config: JourneyConfig,
    rng: RngBundle,
    pool: EventPool,
    phase: Phase,
}

impl<'p> DaySimulator<'p> {
    #[must_use]
    pub fn new(params: &'p ParameterStore, config: JourneyConfig, seed: u64) -> Self {
        Self {
            params,
            config,
            rng: RngBundle::from_user_seed(seed),
            pool: EventPool::standard(),
            phase: Phase::AwaitingAction,
        }
    }

    /// Replace the event pool.
    #[must_use]
    pub fn with_pool(mut self, pool: EventPool) -> Self {
        self.pool = pool;
        self
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn params(&self) -> &'p ParameterStore {
        self.params
    }

    #[must_use]
    pub const fn config(&self) -> &JourneyConfig {
        &self.config
    }

    #[must_use]
    pub const fn rng(&self) -> &RngBundle {
        &self.rng
    }

    /// Resolve one action and, for day-consuming actions, advance the calendar.
    pub fn perform(
        &mut self,
        player: &mut PlayerState,
        action: Action,
        io: &mut Collaborators<'_>,
    ) -> DayReport {
        let mut report = DayReport::new(action, player.day);
        if self.phase.is_terminal() {
            report.rejected = Some(Rejection::SessionOver);
            report.phase = self.phase;
            return report;
        }
        self.phase = Phase::Resolving;
        let distance_before = i64::from(player.distance_travelled);

        let event_due = match action {
            Action::UseItem(item) => {
                report.rejected = self.use_item(player, item).err();
                false
            }
            Action::Craft(result) => {
                report.rejected = self.craft(player, result, io.log).err();
                false
            }
            Action::Inspect => {
                io.display.render(player);
                false
            }
            Action::Travel => self.travel(player, io.log, &mut report),
            Action::Rest => {
                self.rest(player);
                false
            }
            Action::Scout => self.scout(player, io.log),
        };

        if !action.consumes_day() {
            self.phase = Phase::AwaitingAction;
            report.phase = self.phase;
            return report;
        }

        if event_due && self.config.events_enabled {
            self.trigger_event(player, io, &mut report);
        }
        self.advance_day(player, io.log, &mut report);
        report.day = player.day;
        report.distance_delta = i64::from(player.distance_travelled) - distance_before;
        self.phase = Self::terminal_phase(player).unwrap_or(Phase::AwaitingAction);
        report.phase = self.phase;
        report
    }

    /// Mark the session as terminal from outside the daily loop (final encounter deaths).
    pub fn settle(&mut self, player: &PlayerState) -> Phase {
        if let Some(phase) = Self::terminal_phase(player) {
            self.phase = phase;
        }
        self.phase
    }

    fn terminal_phase(player: &PlayerState) -> Option<Phase> {
        if !player.is_alive() {
            Some(Phase::Terminal(TerminalState::Dead))
        } else if player.has_arrived() {
            Some(Phase::Terminal(TerminalState::Arrived))
        } else {
            None
        }
    }

    fn use_item(&self, player: &mut PlayerState, item: ItemId) -> Result<(), Rejection> {
        if !player.has_item(item) {
            return Err(Rejection::ItemNotCarried);
        }
        let effect = item.consumable().ok_or(Rejection::NotConsumable)?;
        player.adjust_supply(Pool::Water, effect.water);
        player.adjust_supply(Pool::Fuel, effect.fuel);
        player.heal(effect.heal);
        player.adjust_morale(effect.morale);
        if effect.shield_days > 0 {
            player.effects.apply(EffectKind::Shielded, effect.shield_days);
        }
        player.inventory.remove(item);
        log::debug!("used {item} on day {}", player.day);
        Ok(())
    }

    fn craft(
        &self,
        player: &mut PlayerState,
        result: ItemId,
        log: &mut dyn Recorder,
    ) -> Result<(), Rejection> {
        let recipe = recipe_for(result).ok_or(Rejection::RecipeUnavailable)?;
        if !player.inventory.available_recipes().any(|r| r.result == result) {
            return Err(Rejection::RecipeUnavailable);
        }
        for input in recipe.inputs {
            player.inventory.remove(input);
        }
        let mut unlocked = player.add_item(recipe.result);
        if player.try_unlock(Achievement::Crafter) {
            unlocked.push(Achievement::Crafter);
        }
        for achievement in unlocked {
            log.record(LogEvent::AchievementUnlock {
                achievement,
                day: player.day,
            });
        }
        Ok(())
    }

    /// Move along the route and pay the day's upkeep. Returns whether an event is due.
    fn travel(
        &mut self,
        player: &mut PlayerState,
        log: &mut dyn Recorder,
        report: &mut DayReport,
    ) -> bool {
        let (low, high) = theme(player.theme).daily_distance;
        let roll = self.rng.travel().gen_range(low..=high.max(low));
        report.travel_roll = Some(roll);

        let mut distance = roll;
        if player.has_item(ItemId::WanderersCompass) || player.has_item(ItemId::GuardiansMantle) {
            distance += TRAVEL_GEAR_BONUS;
        }
        if let Some(bonus) = player.companion_bonus(CompanionBonus::Scout) {
            distance += bonus;
        }
        distance = match player.weather {
            Weather::Storm => impaired(distance, STORM_DISTANCE_PENALTY),
            Weather::Fog => impaired(distance, FOG_DISTANCE_PENALTY),
            Weather::Clear => distance + CLEAR_DISTANCE_BONUS,
            Weather::Rain => distance,
        };
        if player.time_of_day.is_night() {
            unlock(player, Achievement::NightOwl, log);
            if !player.has_item(ItemId::EldritchLantern) && !player.has_item(ItemId::EmberStone) {
                distance = impaired(distance, NIGHT_DISTANCE_PENALTY);
            }
        }
        if player.effects.contains(EffectKind::Inspired) {
            distance += INSPIRED_DISTANCE_BONUS;
        }
        player.advance_distance(i32::try_from(distance).unwrap_or(i32::MAX));

        player.consume_ration(self.params);
        player.adjust_supply(Pool::Fuel, -DAILY_FUEL_COST);
        let drift = (MORALE_DRIFT_TARGET - player.morale()).signum();
        player.adjust_morale(drift);

        let chance = self.params.resolve(
            Param::EventChance,
            player.difficulty,
            Some(player.theme),
        );
        self.config.events_enabled && self.rng.events().r#gen::<f64>() < chance
    }

    fn rest(&mut self, player: &mut PlayerState) {
        let mut outcomes = self.rng.outcomes();
        let mut amount = outcomes.gen_range(REST_HEAL_MIN..=REST_HEAL_MAX);
        if let Some(bonus) = player.companion_bonus(CompanionBonus::Health) {
            amount += i32::try_from(bonus).unwrap_or(0);
        }
        player.heal(amount);
        player.consume_ration(self.params);
        if player.effects.contains(EffectKind::Poisoned) && outcomes.r#gen::<f64>() < REST_CURE_CHANCE {
            player.effects.remove(EffectKind::Poisoned);
        }
    }

    fn scout(&mut self, player: &mut PlayerState, log: &mut dyn Recorder) -> bool {
        player.scout_count += 1;
        player.consume_ration(self.params);
        if player.scout_count >= EXPLORER_SCOUT_COUNT {
            unlock(player, Achievement::Explorer, log);
        }
        if self.config.events_enabled {
            let chance = if player.has_companion_bonus(CompanionBonus::Scout) {
                SCOUT_COMPANION_EVENT_CHANCE
            } else {
                SCOUT_EVENT_CHANCE
            };
            if self.rng.events().r#gen::<f64>() < chance {
                return true;
            }
        }
        let mut outcomes = self.rng.outcomes();
        if outcomes.r#gen::<f64>() < SCOUT_SHORTCUT_CHANCE {
            let shortcut = outcomes.gen_range(SCOUT_SHORTCUT_MIN..=SCOUT_SHORTCUT_MAX);
            player.advance_distance(i32::try_from(shortcut).unwrap_or(0));
        }
        false
    }

    fn trigger_event(
        &mut self,
        player: &mut PlayerState,
        io: &mut Collaborators<'_>,
        report: &mut DayReport,
    ) {
        let context = SelectionContext {
            time_of_day: player.time_of_day,
        };
        let (kind, trace) = select_event(&self.pool, context, &mut *self.rng.events());
        if debug_log_enabled() {
            log::debug!(
                "day {} event {} roll {:?} over {} candidates",
                player.day,
                trace.chosen_id,
                trace.roll,
                trace.candidates.len()
            );
        }
        io.log.record(LogEvent::EventStart {
            event: kind.as_str().to_string(),
            day: player.day,
        });

        let mut outcomes = self.rng.outcomes();
        let mut ctx = EventCtx {
            player,
            params: self.params,
            rng: &mut *outcomes,
            decider: &mut *io.decider,
            narrator: io.narrator,
            log: &mut *io.log,
            scope: kind.as_str(),
        };
        let outcome = resolve_event(kind, &mut ctx);
        report.event = Some(kind);
        report.event_result = Some(outcome.result);
        report.scenario = outcome.scenario;
    }

    fn advance_day(&mut self, player: &mut PlayerState, log: &mut dyn Recorder, report: &mut DayReport) {
        player.day += 1;
        player.time_of_day = player.time_of_day.next();
        if player.time_of_day.is_night() && !player.has_item(ItemId::EmberStone) {
            player.adjust_morale(-NIGHTFALL_MORALE_LOSS);
        }
        player.weather = self.next_weather(player.time_of_day.is_night());

        for tick in player.effects.tick(&mut player.ledger) {
            if tick.expired {
                log.record(LogEvent::EffectExpired {
                    effect: tick.effect,
                    day: player.day,
                });
            }
        }
        for milestone in player.check_milestones() {
            if let Some(achievement) = Achievement::for_milestone(milestone) {
                unlock(player, achievement, log);
            }
        }
        self.phase = Phase::DayAdvanced;

        report.penalties = apply_penalties(player);
        if !report.penalties.is_empty() {
            log.record(LogEvent::PenaltiesApplied {
                day: player.day,
                penalties: report.penalties.clone(),
                health: player.health(),
            });
        }
    }

    fn next_weather(&self, night: bool) -> Weather {
        let table = [
            (
                Weather::Clear,
                if night {
                    WEATHER_WEIGHT_CLEAR - NIGHT_CLEAR_WEIGHT_PENALTY
                } else {
                    WEATHER_WEIGHT_CLEAR
                },
            ),
            (Weather::Rain, WEATHER_WEIGHT_RAIN),
            (Weather::Fog, WEATHER_WEIGHT_FOG),
            (
                Weather::Storm,
                if night {
                    WEATHER_WEIGHT_STORM + NIGHT_STORM_WEIGHT_BONUS
                } else {
                    WEATHER_WEIGHT_STORM
                },
            ),
        ];
        let total: u32 = table.iter().map(|(_, weight)| *weight).sum();
        let roll = self.rng.weather().gen_range(0..total);
        let mut current = 0;
        for (weather, weight) in table {
            current += weight;
            if roll < current {
                return weather;
            }
        }
        Weather::Clear
    }
}

fn impaired(distance: u32, penalty: u32) -> u32 {
    distance.saturating_sub(penalty).max(MIN_IMPAIRED_DISTANCE)
}

fn unlock(player: &mut PlayerState, achievement: Achievement, log: &mut dyn Recorder) {
    if player.try_unlock(achievement) {
        log.record(LogEvent::AchievementUnlock {
            achievement,
            day: player.day,
        });
    }
}

/// Apply every end-of-day penalty that holds, in a fixed order.
pub(crate) fn apply_penalties(player: &mut PlayerState) -> Vec<Penalty> {
    let mut due = Vec::new();
    if player.ledger.food <= 0 {
        due.push(PenaltyKind::Starvation);
    }
    if player.ledger.water <= 0 {
        due.push(PenaltyKind::Dehydration);
    }
    if player.morale() <= LOW_MORALE_THRESHOLD {
        due.push(PenaltyKind::LowMorale);
    }
    if player.effects.contains(EffectKind::Exhausted) {
        due.push(PenaltyKind::Exhaustion);
    }
    due.into_iter()
        .map(|kind| Penalty {
            kind,
            amount: player.ledger.lose_health(kind.health_loss()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::ScriptedDecider;
    use crate::narrative::{NullDisplay, TemplateNarrator};
    use crate::state::{Difficulty, TimeOfDay};
    use crate::themes::ThemeId;

    fn quiet() -> JourneyConfig {
        JourneyConfig {
            events_enabled: false,
            ..JourneyConfig::default()
        }
    }

    fn perform(
        sim: &mut DaySimulator<'_>,
        player: &mut PlayerState,
        action: Action,
        log: &mut Vec<LogEvent>,
    ) -> DayReport {
        let mut decider = ScriptedDecider::new(Vec::new());
        let mut display = NullDisplay;
        let mut io = Collaborators {
            decider: &mut decider,
            narrator: &TemplateNarrator,
            display: &mut display,
            log,
        };
        sim.perform(player, action, &mut io)
    }

    #[test]
    fn free_actions_keep_the_calendar_still() {
        let params = ParameterStore::neutral();
        let mut sim = DaySimulator::new(&params, quiet(), 1);
        let mut player = PlayerState::new(ThemeId::Desert, Difficulty::Normal, &params);
        player.inventory.add(ItemId::HealersSalve);
        player.ledger.health = 50;
        let mut log = Vec::new();
        let report = perform(&mut sim, &mut player, Action::UseItem(ItemId::HealersSalve), &mut log);
        assert_eq!(report.rejected, None);
        assert_eq!(player.day, 0);
        assert_eq!(player.health(), 75);
        assert!(!player.has_item(ItemId::HealersSalve));
        assert_eq!(sim.phase(), Phase::AwaitingAction);

        let report = perform(&mut sim, &mut player, Action::UseItem(ItemId::HealersSalve), &mut log);
        assert_eq!(report.rejected, Some(Rejection::ItemNotCarried));
        let report = perform(&mut sim, &mut player, Action::Craft(ItemId::BeaconArray), &mut log);
        assert_eq!(report.rejected, Some(Rejection::RecipeUnavailable));
    }

    #[test]
    fn crafting_swaps_inputs_for_result() {
        let params = ParameterStore::neutral();
        let mut sim = DaySimulator::new(&params, quiet(), 2);
        let mut player = PlayerState::new(ThemeId::Space, Difficulty::Easy, &params);
        player.inventory.add(ItemId::SignalFlare);
        player.inventory.add(ItemId::SolarCharger);
        let mut log = Vec::new();
        let report = perform(&mut sim, &mut player, Action::Craft(ItemId::BeaconArray), &mut log);
        assert_eq!(report.rejected, None);
        assert_eq!(player.inventory.iter().collect::<Vec<_>>(), vec![ItemId::BeaconArray]);
        assert!(player.achievements.contains(&Achievement::Crafter));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn travel_advances_the_day_and_costs_fuel() {
        let params = ParameterStore::neutral();
        let mut sim = DaySimulator::new(&params, quiet(), 3);
        let mut player = PlayerState::new(ThemeId::Mist, Difficulty::Normal, &params);
        let fuel = player.ledger.fuel;
        let mut log = Vec::new();
        let report = perform(&mut sim, &mut player, Action::Travel, &mut log);
        let roll = report.travel_roll.unwrap();
        assert!((10..=40).contains(&roll));
        // Dawn and clear at the start of the journey.
        assert_eq!(player.distance_travelled, roll + CLEAR_DISTANCE_BONUS);
        assert_eq!(player.day, 1);
        assert_eq!(player.time_of_day, TimeOfDay::Day);
        assert_eq!(player.ledger.fuel, fuel - 1);
        assert_eq!(player.morale(), 99);
        assert!(report.event.is_none());
    }

    #[test]
    fn empty_supplies_apply_both_penalties_in_one_record() {
        let params = ParameterStore::neutral();
        let mut sim = DaySimulator::new(&params, quiet(), 4);
        let mut player = PlayerState::new(ThemeId::Time, Difficulty::Normal, &params);
        player.ledger.food = 0;
        player.ledger.water = 0;
        let mut log = Vec::new();
        let report = perform(&mut sim, &mut player, Action::Rest, &mut log);
        let kinds: Vec<_> = report.penalties.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![PenaltyKind::Starvation, PenaltyKind::Dehydration]);
        let lost: i32 = report.penalties.iter().map(|p| p.amount).sum();
        assert_eq!(lost, 20);
        let records: Vec<_> = log
            .iter()
            .filter(|event| matches!(event, LogEvent::PenaltiesApplied { .. }))
            .collect();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn death_is_terminal_and_rejects_further_actions() {
        let params = ParameterStore::neutral();
        let mut sim = DaySimulator::new(&params, quiet(), 5);
        let mut player = PlayerState::new(ThemeId::Cyber, Difficulty::Hard, &params);
        player.ledger.health = 5;
        player.ledger.food = 0;
        let mut log = Vec::new();
        let report = perform(&mut sim, &mut player, Action::Travel, &mut log);
        assert_eq!(report.phase, Phase::Terminal(TerminalState::Dead));
        let after = perform(&mut sim, &mut player, Action::Rest, &mut log);
        assert_eq!(after.rejected, Some(Rejection::SessionOver));
    }

    #[test]
    fn forced_events_are_logged_before_the_day_advances() {
        let params = ParameterStore::neutral();
        let mut sim =
            DaySimulator::new(&params, JourneyConfig::default(), 6).with_pool(EventPool::single(EventKind::Discovery));
        let mut player = PlayerState::new(ThemeId::Desert, Difficulty::Hard, &params);
        let mut log = Vec::new();
        let mut fired = false;
        for _ in 0..20 {
            let report = perform(&mut sim, &mut player, Action::Scout, &mut log);
            if report.event.is_some() {
                assert_eq!(report.event, Some(EventKind::Discovery));
                fired = true;
                break;
            }
        }
        assert!(fired);
        assert!(log.iter().any(|event| matches!(
            event,
            LogEvent::EventStart { event, .. } if event == "discovery"
        )));
    }

    #[test]
    fn night_weather_never_panics_and_stays_in_table() {
        let params = ParameterStore::neutral();
        let sim = DaySimulator::new(&params, quiet(), 7);
        for _ in 0..200 {
            let weather = sim.next_weather(true);
            assert!(Weather::ALL.contains(&weather));
        }
    }
}
