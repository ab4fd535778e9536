//! Dispatches a `GameAction` onto a `Game`, the single seam between the
//! wire protocol and the economic engine / turn machine / trade protocol.

use crate::game::events::GameAction;
use crate::game::state::Game;

pub struct GameEngine;

impl GameEngine {
    /// Apply `action` as `actor`. On success returns an optional sound-event
    /// name for the caller to broadcast; on failure returns a deny reason.
    pub fn apply(game: &mut Game, actor: &str, action: GameAction) -> Result<Option<&'static str>, String> {
        if game.game_over.is_some() {
            return Err("game_over".into());
        }
        use GameAction::*;
        match action {
            RollDice => {
                let is_current = game.current_player_name().as_deref() == Some(actor);
                if !is_current {
                    return Err("not_your_turn".into());
                }
                game.roll_dice(actor).map_err(|e| format!("{e:?}"))?;
                Ok(Some("dice"))
            }
            BuyProperty => {
                let pos = game
                    .get_player(actor)
                    .map(|p| p.position)
                    .ok_or("player_not_found")?;
                game.buy_property(actor, pos).map_err(|e| format!("{e:?}"))?;
                Ok(Some("buy"))
            }
            EndTurn => {
                game.end_turn(actor).map_err(|e| format!("{e:?}"))?;
                Ok(None)
            }
            UseJailCard => {
                game.use_jail_card(actor).map_err(|e| format!("{e:?}"))?;
                Ok(Some("jail_free"))
            }
            Mortgage { pos } => {
                game.mortgage(actor, pos).map_err(|e| format!("{e:?}"))?;
                Ok(Some("mortgage"))
            }
            Unmortgage { pos } => {
                game.unmortgage(actor, pos).map_err(|e| format!("{e:?}"))?;
                Ok(Some("unmortgage"))
            }
            BuyHouse { pos } => {
                game.buy_house(actor, pos).map_err(|e| format!("{e:?}"))?;
                Ok(Some("build"))
            }
            SellHouse { pos } => {
                game.sell_house(actor, pos).map_err(|e| format!("{e:?}"))?;
                Ok(Some("sell_building"))
            }
            BuyHotel { pos } => {
                game.buy_hotel(actor, pos).map_err(|e| format!("{e:?}"))?;
                Ok(Some("build"))
            }
            SellHotel { pos } => {
                game.sell_hotel(actor, pos).map_err(|e| format!("{e:?}"))?;
                Ok(Some("sell_building"))
            }
            ToggleAutoMortgage => {
                let p = game.get_player_mut(actor).ok_or("player_not_found")?;
                p.auto_mortgage = !p.auto_mortgage;
                Ok(None)
            }
            ToggleAutoBuyHouses => {
                let p = game.get_player_mut(actor).ok_or("player_not_found")?;
                p.auto_buy_houses = !p.auto_buy_houses;
                Ok(None)
            }
            OfferTrade { to, give, receive, recurring_terms, rental_terms } => {
                game.offer_trade(actor, &to, give, receive, recurring_terms, rental_terms)
                    .map_err(|e| format!("{e:?}"))?;
                Ok(Some("trade_offer"))
            }
            AcceptTrade { trade_id } => {
                game.accept_trade(actor, &trade_id).map_err(|e| format!("{e:?}"))?;
                Ok(Some("trade_accept"))
            }
            DeclineTrade { trade_id } => {
                game.decline_trade(actor, &trade_id).map_err(|e| format!("{e:?}"))?;
                Ok(None)
            }
            CancelTrade { trade_id } => {
                game.cancel_trade(actor, &trade_id).map_err(|e| format!("{e:?}"))?;
                Ok(None)
            }
            OfferRental { owner, properties, percentage, turns, cash_upfront } => {
                game.offer_rental(actor, &owner, properties, percentage, turns, cash_upfront)
                    .map_err(|e| format!("{e:?}"))?;
                Ok(Some("trade_offer"))
            }
            AcceptRental { trade_id } => {
                game.accept_rental(actor, &trade_id).map_err(|e| format!("{e:?}"))?;
                Ok(Some("trade_accept"))
            }
            DeclineRental { trade_id } => {
                game.decline_rental(actor, &trade_id).map_err(|e| format!("{e:?}"))?;
                Ok(None)
            }
            CancelRental { trade_id } => {
                game.cancel_rental(actor, &trade_id).map_err(|e| format!("{e:?}"))?;
                Ok(None)
            }
            StockInvest { owner, amount } => {
                game.stock_invest(&owner, actor, amount).map_err(|e| format!("{e:?}"))?;
                Ok(Some("stock"))
            }
            StockSell { owner, amount } => {
                game.stock_sell(&owner, actor, amount).map_err(|e| format!("{e:?}"))?;
                Ok(Some("stock"))
            }
            StockSettings {
                owner,
                allow_investing,
                enforce_min_buy,
                min_buy,
                enforce_min_pool_total,
                min_pool_total,
                enforce_min_pool_owner,
                min_pool_owner,
            } => {
                if actor != owner {
                    return Err("not_owner".into());
                }
                game.stock_settings(
                    &owner,
                    Some(allow_investing),
                    Some(enforce_min_buy),
                    Some(min_buy),
                    Some(enforce_min_pool_total),
                    Some(min_pool_total),
                    Some(enforce_min_pool_owner),
                    Some(min_pool_owner),
                );
                Ok(None)
            }
            BondInvest { owner, amount } => {
                game.bond_invest(&owner, actor, amount).map_err(|e| format!("{e:?}"))?;
                Ok(Some("bond"))
            }
            BondSettings { owner, allow_bonds, rate_percent, period_turns } => {
                if actor != owner {
                    return Err("not_owner".into());
                }
                game.bond_settings(&owner, Some(allow_bonds), Some(rate_percent), Some(period_turns));
                Ok(None)
            }
            Bankrupt => {
                game.bankrupt(actor).map_err(|e| format!("{e:?}"))?;
                Ok(Some("bankrupt"))
            }
        }
    }

    /// Seed a fresh game with `names` (in turn order), giving bots a flag and
    /// everyone the configured starting cash.
    pub fn start(names: &[(String, bool)], starting_cash: i64) -> Game {
        let mut game = Game::new();
        let palette = ["#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4", "#42d4f4", "#f032e6"];
        for (i, (name, is_bot)) in names.iter().enumerate() {
            game.players.push(crate::game::state::Player::new(
                name.clone(),
                starting_cash,
                palette[i % palette.len()],
                *is_bot,
            ));
            game.turn_counts.insert(name.clone(), 0);
        }
        for tile in crate::game::board::BOARD.iter() {
            if tile.is_ownable() {
                game.properties.insert(tile.index, Default::default());
            }
        }
        game
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::events::GameAction;

    #[test]
    fn start_seeds_players_and_ownable_properties() {
        let game = GameEngine::start(&[("A".into(), false), ("B".into(), true)], 1500);
        assert_eq!(game.players.len(), 2);
        assert_eq!(game.get_player("A").unwrap().cash, 1500);
        assert!(game.get_player("B").unwrap().is_bot);
        assert_eq!(game.properties.len(), 28);
    }

    #[test]
    fn apply_rejects_roll_when_not_your_turn() {
        let mut game = GameEngine::start(&[("A".into(), false), ("B".into(), false)], 1500);
        let err = GameEngine::apply(&mut game, "B", GameAction::RollDice).unwrap_err();
        assert_eq!(err, "not_your_turn");
    }

    #[test]
    fn apply_buy_property_transfers_cash_and_ownership() {
        let mut game = GameEngine::start(&[("A".into(), false), ("B".into(), false)], 1500);
        game.get_player_mut("A").unwrap().position = 1;
        GameEngine::apply(&mut game, "A", GameAction::BuyProperty).unwrap();
        assert_eq!(game.properties.get(&1).unwrap().owner.as_deref(), Some("A"));
        assert_eq!(game.get_player("A").unwrap().cash, 1440);
    }
}
