//! Turn machine: roll/move/land/end-turn (C6).

use rand::Rng;

use crate::game::board::{self, TileType};
use crate::game::cards::{self, CardEffect, Deck};
use crate::game::state::{Game, LedgerType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollDenyReason {
    NotYourTurn,
    NoRolls,
    NegativeAfterRecurring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndTurnDenyReason {
    NotYourTurn,
    NoRollYet,
    RollsLeft,
    NegativeBalance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JailCardDenyReason {
    NotYourTurn,
    NotInJail,
    NoCards,
}

const JAIL_POS: u8 = 10;

impl Game {
    pub fn roll_dice(&mut self, actor: &str) -> Result<(u8, u8), RollDenyReason> {
        let mut rng = rand::thread_rng();
        let dice = (rng.gen_range(1..=6), rng.gen_range(1..=6));
        self.roll_dice_with(actor, dice)
    }

    /// Roll handler parameterized on the dice outcome so tests can fix the RNG.
    pub fn roll_dice_with(&mut self, actor: &str, dice: (u8, u8)) -> Result<(u8, u8), RollDenyReason> {
        if self.current_player_name().as_deref() != Some(actor) {
            return Err(RollDenyReason::NotYourTurn);
        }
        if self.rolls_left == 0 {
            return Err(RollDenyReason::NoRolls);
        }

        if !self.rolled_this_turn {
            self.rolled_this_turn = true;
            self.process_turn_start_obligations(actor);
            if self.get_player(actor).map(|p| p.cash).unwrap_or(0) < 0 {
                return Err(RollDenyReason::NegativeAfterRecurring);
            }
        }

        let (d1, d2) = dice;
        let is_doubles = d1 == d2;
        self.last_action = Some(format!("rolled({d1},{d2})"));

        let was_in_jail = self.get_player(actor).map(|p| p.in_jail).unwrap_or(false);
        let mut leaving_jail = false;

        if was_in_jail {
            if is_doubles {
                leaving_jail = true;
                if let Some(p) = self.get_player_mut(actor) {
                    p.in_jail = false;
                    p.jail_turns = 0;
                }
            } else {
                let jail_turns = self.get_player(actor).map(|p| p.jail_turns).unwrap_or(0);
                if jail_turns < 3 {
                    if let Some(p) = self.get_player_mut(actor) {
                        p.jail_turns += 1;
                    }
                    self.rolls_left = 0;
                    return Ok(dice);
                } else {
                    self.pay_with_debt_tolerance(actor, "bank", 50, LedgerType::CardPay, Some("jail fee".into()));
                    if let Some(p) = self.get_player_mut(actor) {
                        p.in_jail = false;
                        p.jail_turns = 0;
                    }
                    leaving_jail = true;
                }
            }
        }

        if !leaving_jail {
            if is_doubles {
                let count = {
                    let p = self.get_player_mut(actor).unwrap();
                    p.doubles_count += 1;
                    p.doubles_count
                };
                if count >= 3 {
                    self.send_to_jail(actor);
                    self.rolls_left = 0;
                    if let Some(p) = self.get_player_mut(actor) {
                        p.doubles_count = 0;
                    }
                    return Ok(dice);
                }
            } else if let Some(p) = self.get_player_mut(actor) {
                p.doubles_count = 0;
            }
        }

        self.move_player(actor, d1 + d2);
        self.apply_tile_effect(actor, d1 + d2);

        if is_doubles && !was_in_jail {
            self.rolls_left = 1;
        } else {
            self.rolls_left = 0;
        }

        Ok(dice)
    }

    fn move_player(&mut self, actor: &str, delta: u8) {
        let Some(player) = self.get_player_mut(actor) else { return };
        let old = player.position;
        let new = (old as u32 + delta as u32) % 40;
        player.position = new as u8;
        let passed_go = old as u32 + delta as u32 >= 40;
        if passed_go {
            self.route_inflow(actor, 200, LedgerType::PassGo, None);
        }
        *self.land_counts.entry(new as u8).or_insert(0) += 1;
    }

    fn send_to_jail(&mut self, actor: &str) {
        if let Some(p) = self.get_player_mut(actor) {
            p.position = JAIL_POS;
            p.in_jail = true;
        }
        *self.land_counts.entry(JAIL_POS).or_insert(0) += 1;
    }

    fn apply_tile_effect(&mut self, actor: &str, dice_sum: u8) {
        let pos = self.get_player(actor).map(|p| p.position).unwrap_or(0);
        let tile_type = board::get_tile(pos).map(|t| t.tile_type).unwrap();
        match tile_type {
            TileType::GoToJail => {
                self.send_to_jail(actor);
                self.rolls_left = 0;
            }
            TileType::Tax => {
                self.pay_tax(actor, pos);
            }
            TileType::Chance => self.draw_and_apply(actor, Deck::Chance, dice_sum),
            TileType::CommunityChest => self.draw_and_apply(actor, Deck::CommunityChest, dice_sum),
            TileType::Property | TileType::Railroad | TileType::Utility
                if self.properties.get(&pos).map(|p| p.owner.is_some()).unwrap_or(false) => {
                    self.pay_rent(actor, pos, dice_sum);
                }
            _ => {}
        }
    }

    fn draw_and_apply(&mut self, actor: &str, deck: Deck, dice_sum: u8) {
        let card = cards::draw(deck);
        self.log(format!("{actor} drew: {}", card.text));
        match card.effect.clone() {
            CardEffect::AdvanceTo { target } => {
                let old = self.get_player(actor).map(|p| p.position).unwrap_or(0);
                if target < old {
                    self.route_inflow(actor, 200, LedgerType::PassGo, None);
                }
                if let Some(p) = self.get_player_mut(actor) {
                    p.position = target;
                }
                *self.land_counts.entry(target).or_insert(0) += 1;
                self.apply_tile_effect(actor, dice_sum);
            }
            CardEffect::AdvanceToNearestRailroad { double_rent } => {
                let old = self.get_player(actor).map(|p| p.position).unwrap_or(0);
                let target = nearest(old, &board::railroad_tiles().iter().map(|t| t.index).collect::<Vec<_>>());
                if target < old {
                    self.route_inflow(actor, 200, LedgerType::PassGo, None);
                }
                if let Some(p) = self.get_player_mut(actor) {
                    p.position = target;
                }
                *self.land_counts.entry(target).or_insert(0) += 1;
                if self.properties.get(&target).map(|p| p.owner.is_some()).unwrap_or(false) {
                    let rent = self.compute_rent(target, dice_sum);
                    let rent = if double_rent { rent * 2 } else { rent };
                    let owner = self.properties.get(&target).and_then(|p| p.owner.clone());
                    if let Some(owner) = owner {
                        if owner != actor {
                            self.pay_with_debt_tolerance(actor, &owner, rent, LedgerType::Rent, None);
                        }
                    }
                }
            }
            CardEffect::AdvanceToNearestUtility { ten_x } => {
                let old = self.get_player(actor).map(|p| p.position).unwrap_or(0);
                let target = nearest(old, &board::utility_tiles().iter().map(|t| t.index).collect::<Vec<_>>());
                if target < old {
                    self.route_inflow(actor, 200, LedgerType::PassGo, None);
                }
                if let Some(p) = self.get_player_mut(actor) {
                    p.position = target;
                }
                *self.land_counts.entry(target).or_insert(0) += 1;
                if self.properties.get(&target).map(|p| p.owner.is_some()).unwrap_or(false) {
                    let multiplier = if ten_x { 10 } else { 4 };
                    let owner = self.properties.get(&target).and_then(|p| p.owner.clone());
                    if let Some(owner) = owner {
                        if owner != actor {
                            let rent = multiplier * dice_sum.clamp(2, 12) as i64;
                            self.pay_with_debt_tolerance(actor, &owner, rent, LedgerType::Rent, None);
                        }
                    }
                }
            }
            CardEffect::AdvanceBy { delta } => {
                let old = self.get_player(actor).map(|p| p.position as i32).unwrap_or(0);
                let new = ((old + delta).rem_euclid(40)) as u8;
                if let Some(p) = self.get_player_mut(actor) {
                    p.position = new;
                }
                *self.land_counts.entry(new).or_insert(0) += 1;
                self.apply_tile_effect(actor, dice_sum);
            }
            CardEffect::GoToJail => {
                self.send_to_jail(actor);
                self.rolls_left = 0;
            }
            CardEffect::Collect { amount } => {
                self.route_inflow(actor, amount, LedgerType::CardCollect, None);
            }
            CardEffect::Pay { amount } => {
                self.pay_with_debt_tolerance(actor, "bank", amount, LedgerType::CardPay, None);
            }
            CardEffect::CollectFromEachPlayer { amount } => {
                let others: Vec<String> = self.players.iter().map(|p| p.name.clone()).filter(|n| n != actor).collect();
                for other in others {
                    self.pay_with_debt_tolerance(&other, actor, amount, LedgerType::CardPay, None);
                }
            }
            CardEffect::PayEachPlayer { amount } => {
                let others: Vec<String> = self.players.iter().map(|p| p.name.clone()).filter(|n| n != actor).collect();
                for other in others {
                    self.pay_with_debt_tolerance(actor, &other, amount, LedgerType::CardPay, None);
                }
            }
            CardEffect::Repairs { per_house, per_hotel } => {
                let mut total = 0i64;
                for state in self.properties.values() {
                    if state.owner.as_deref() != Some(actor) {
                        continue;
                    }
                    if state.hotel {
                        total += per_hotel;
                    } else {
                        total += per_house * state.houses as i64;
                    }
                }
                if total > 0 {
                    self.pay_with_debt_tolerance(actor, "bank", total, LedgerType::Repairs, None);
                }
            }
            CardEffect::JailFree => {
                if let Some(p) = self.get_player_mut(actor) {
                    p.jail_cards += 1;
                }
            }
        }
    }

    pub fn end_turn(&mut self, actor: &str) -> Result<(), EndTurnDenyReason> {
        if self.current_player_name().as_deref() != Some(actor) {
            return Err(EndTurnDenyReason::NotYourTurn);
        }
        let player = self.get_player(actor).unwrap();
        if !self.rolled_this_turn && !player.in_jail {
            return Err(EndTurnDenyReason::NoRollYet);
        }
        if self.rolls_left != 0 {
            return Err(EndTurnDenyReason::RollsLeft);
        }
        if player.cash < 0 {
            return Err(EndTurnDenyReason::NegativeBalance);
        }

        let len = self.players.len();
        self.current_turn = (self.current_turn + 1) % len;
        if self.current_turn == 0 {
            self.round += 1;
        }
        *self.turn_counts.entry(actor.to_string()).or_insert(0) += 1;
        self.turns += 1;
        self.tick_rentals();
        self.record_stock_history_tick();
        self.rolls_left = 1;
        self.rolled_this_turn = false;
        if let Some(p) = self.get_player_mut(actor) {
            p.doubles_count = 0;
        }
        Ok(())
    }

    /// Any player may declare bankruptcy, not only the current-turn player.
    pub fn bankrupt(&mut self, actor: &str) -> Result<(), RollDenyReason> {
        if self.get_player(actor).is_none() {
            return Err(RollDenyReason::NotYourTurn);
        }
        self.bankrupt_player(actor);
        Ok(())
    }

    pub fn use_jail_card(&mut self, actor: &str) -> Result<(), JailCardDenyReason> {
        if self.current_player_name().as_deref() != Some(actor) {
            return Err(JailCardDenyReason::NotYourTurn);
        }
        let player = self.get_player(actor).unwrap();
        if !player.in_jail {
            return Err(JailCardDenyReason::NotInJail);
        }
        if player.jail_cards == 0 {
            return Err(JailCardDenyReason::NoCards);
        }
        let p = self.get_player_mut(actor).unwrap();
        p.jail_cards -= 1;
        p.in_jail = false;
        p.jail_turns = 0;
        Ok(())
    }
}

fn nearest(from: u8, positions: &[u8]) -> u8 {
    positions
        .iter()
        .copied()
        .map(|p| (((p as i32 - from as i32).rem_euclid(40)), p))
        .min_by_key(|(d, _)| *d)
        .map(|(_, p)| p)
        .unwrap_or(from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Player;

    fn two_player_game() -> Game {
        let mut g = Game::new();
        g.players.push(Player::new("A", 1500, "#fff", false));
        g.players.push(Player::new("B", 1500, "#000", false));
        g
    }

    #[test]
    fn triples_to_jail_scenario() {
        // SPEC_FULL §8 scenario 1
        let mut g = two_player_game();
        g.roll_dice_with("A", (3, 3)).unwrap();
        assert_eq!(g.get_player("A").unwrap().position, 6);
        assert_eq!(g.get_player("A").unwrap().doubles_count, 1);
        assert_eq!(g.rolls_left, 1);

        g.roll_dice_with("A", (2, 2)).unwrap();
        assert_eq!(g.get_player("A").unwrap().position, 10);
        assert_eq!(g.get_player("A").unwrap().doubles_count, 2);
        assert_eq!(g.rolls_left, 1);

        g.roll_dice_with("A", (1, 1)).unwrap();
        let a = g.get_player("A").unwrap();
        assert_eq!(a.position, 10);
        assert!(a.in_jail);
        assert_eq!(a.doubles_count, 0);
        assert_eq!(g.rolls_left, 0);

        assert!(g.end_turn("A").is_ok());
    }

    #[test]
    fn jailed_player_doubles_moves_without_extra_roll() {
        let mut g = two_player_game();
        g.get_player_mut("A").unwrap().in_jail = true;
        g.get_player_mut("A").unwrap().position = 10;
        g.roll_dice_with("A", (4, 4)).unwrap();
        let a = g.get_player("A").unwrap();
        assert!(!a.in_jail);
        assert_eq!(a.position, 18);
        assert_eq!(g.rolls_left, 0);
    }

    #[test]
    fn pass_go_credits_exactly_200() {
        let mut g = two_player_game();
        g.get_player_mut("A").unwrap().position = 38;
        g.roll_dice_with("A", (3, 2)).unwrap();
        // 38 + 5 = 43 -> wraps to 3, passes go
        assert_eq!(g.get_player("A").unwrap().cash, 1700);
    }

    #[test]
    fn end_turn_rejects_negative_cash() {
        let mut g = two_player_game();
        g.rolled_this_turn = true;
        g.rolls_left = 0;
        g.get_player_mut("A").unwrap().cash = -1;
        assert_eq!(g.end_turn("A").unwrap_err(), EndTurnDenyReason::NegativeBalance);
    }

    #[test]
    fn end_turn_advances_round_on_wrap() {
        let mut g = two_player_game();
        g.rolled_this_turn = true;
        g.rolls_left = 0;
        g.end_turn("A").unwrap();
        assert_eq!(g.current_turn, 1);
        g.rolled_this_turn = true;
        g.rolls_left = 0;
        g.end_turn("B").unwrap();
        assert_eq!(g.current_turn, 0);
        assert_eq!(g.round, 1);
    }
}
