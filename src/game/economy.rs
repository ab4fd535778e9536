//! Rent computation, tax, auto-liquidation cascades, and bankruptcy (C4).

use crate::game::board::{self, ColorGroup, TileType};
use crate::game::state::{Game, LedgerType};

const RAILROAD_RENT: [i64; 4] = [25, 50, 100, 200];

impl Game {
    fn owner_group_tiles(&self, owner: &str, group: ColorGroup) -> Vec<u8> {
        board::get_group_tiles(group)
            .into_iter()
            .filter(|t| {
                self.properties
                    .get(&t.index)
                    .map(|p| p.owner.as_deref() == Some(owner))
                    .unwrap_or(false)
            })
            .map(|t| t.index)
            .collect()
    }

    fn owns_full_group(&self, owner: &str, group: ColorGroup) -> bool {
        let all = board::get_group_tiles(group);
        !all.is_empty() && all.iter().all(|t| {
            self.properties
                .get(&t.index)
                .map(|p| p.owner.as_deref() == Some(owner))
                .unwrap_or(false)
        })
    }

    fn group_has_mortgage(&self, group: ColorGroup) -> bool {
        board::get_group_tiles(group)
            .iter()
            .any(|t| self.properties.get(&t.index).map(|p| p.mortgaged).unwrap_or(false))
    }

    fn group_has_buildings(&self, owner: &str, group: ColorGroup) -> bool {
        self.owner_group_tiles(owner, group)
            .iter()
            .any(|pos| self.properties.get(pos).map(|p| p.houses > 0 || p.hotel).unwrap_or(false))
    }

    /// Rent owed at `pos` to its owner, given the dice sum that produced this landing.
    pub fn compute_rent(&self, pos: u8, dice_sum: u8) -> i64 {
        let tile = board::get_tile(pos).expect("valid position");
        let Some(state) = self.properties.get(&pos) else { return 0 };
        let Some(owner) = &state.owner else { return 0 };
        if state.mortgaged {
            return 0;
        }
        match tile.tile_type {
            TileType::Property => {
                let table = &tile.rent_table;
                
                if state.hotel {
                    table[5]
                } else if state.houses > 0 {
                    table[state.houses.clamp(0, 4) as usize]
                } else {
                    let group = tile.group.expect("property has group");
                    let monopoly = self.owns_full_group(owner, group) && !self.group_has_mortgage(group);
                    if monopoly {
                        table[0] * 2
                    } else {
                        table[0]
                    }
                }
            }
            TileType::Railroad => {
                let owned = self
                    .owner_group_tiles(owner, ColorGroup::Railroad)
                    .iter()
                    .filter(|pos| !self.properties.get(pos).map(|p| p.mortgaged).unwrap_or(true))
                    .count();
                RAILROAD_RENT[owned.saturating_sub(1).min(3)]
            }
            TileType::Utility => {
                let owned = self
                    .owner_group_tiles(owner, ColorGroup::Utility)
                    .iter()
                    .filter(|pos| !self.properties.get(pos).map(|p| p.mortgaged).unwrap_or(true))
                    .count();
                let multiplier = if owned >= 2 { 10 } else { 4 };
                multiplier * dice_sum.clamp(2, 12) as i64
            }
            _ => 0,
        }
    }

    /// Resolve a rent payment from `payer` landing on `pos`, applying any
    /// active rental redirection to the owner's property list.
    pub fn pay_rent(&mut self, payer: &str, pos: u8, dice_sum: u8) {
        let rent = self.compute_rent(pos, dice_sum);
        if rent <= 0 {
            return;
        }
        let Some(owner) = self.properties.get(&pos).and_then(|p| p.owner.clone()) else { return };
        if owner == payer {
            return;
        }

        self.try_raise_cash_for(payer, rent);

        let cash = self.get_player(payer).map(|p| p.cash).unwrap_or(0);
        let paid = rent.min(cash.max(0));
        let shortfall = rent - paid;
        if paid > 0 {
            if let Some(p) = self.get_player_mut(payer) {
                p.cash -= paid;
            }
            let redirected = self.split_rent_to_rentals(&owner, pos, paid);
            if redirected > 0 {
                self.ledger_add(LedgerType::RentSplit, Some(payer), Some("<renters>"), redirected, None);
            }
        }
        if shortfall > 0 {
            self.ledger_add(LedgerType::DebtAdd, Some(&owner), Some(payer), shortfall, None);
            let entries = self.debts.entry(payer.to_string()).or_default();
            if let Some(last) = entries.last_mut() {
                if last.creditor == owner {
                    last.amount += shortfall;
                } else {
                    entries.push(crate::game::state::DebtEntry { creditor: owner.clone(), amount: shortfall });
                }
            } else {
                entries.push(crate::game::state::DebtEntry { creditor: owner.clone(), amount: shortfall });
            }
        }
    }

    /// Redirect `paid` rent to active renters of `pos`, crediting the owner
    /// with whatever remains. Returns the total amount redirected to renters.
    fn split_rent_to_rentals(&mut self, owner: &str, pos: u8, paid: i64) -> i64 {
        let active: Vec<usize> = self
            .property_rentals
            .iter()
            .enumerate()
            .filter(|(_, r)| r.owner == owner && r.turns_left > 0 && r.properties.contains(&pos))
            .map(|(i, _)| i)
            .collect();

        let mut remainder = paid;
        for idx in active {
            let (renter, pct) = {
                let r = &self.property_rentals[idx];
                (r.renter.clone(), r.percentage)
            };
            let redirected = ((paid as f64) * pct / 100.0).floor() as i64;
            if redirected <= 0 {
                continue;
            }
            let credited = self.route_inflow(&renter, redirected, LedgerType::RentalIncomeSplit, None);
            let turn = self.turns;
            let r = &mut self.property_rentals[idx];
            r.total_received += credited;
            r.last_payment = credited;
            r.last_payment_turn = turn;
            remainder -= redirected;
        }
        if remainder > 0 {
            self.route_inflow(owner, remainder, LedgerType::Rent, None);
        }
        paid - remainder
    }

    /// Income/Luxury tax for the tile just landed on.
    pub fn pay_tax(&mut self, payer: &str, pos: u8) {
        let tile = board::get_tile(pos).expect("valid position");
        if tile.tile_type != TileType::Tax {
            return;
        }
        let amount = if pos == 4 {
            let net_worth = self.net_worth(payer);
            200i64.min((net_worth as f64 * 0.1).floor() as i64)
        } else {
            100
        };
        self.try_raise_cash_for(payer, amount);
        self.pay_with_debt_tolerance(payer, "bank", amount, LedgerType::Tax, None);
    }

    /// Attempt to raise `target` cash via auto-mortgage before a payment/purchase.
    pub fn try_raise_cash_for(&mut self, player: &str, target: i64) {
        let auto = self.get_player(player).map(|p| p.auto_mortgage).unwrap_or(false);
        if !auto {
            return;
        }
        self.auto_mortgage_for_cash(player, target);
    }

    fn auto_mortgage_for_cash(&mut self, player: &str, target: i64) {
        loop {
            let cash = self.get_player(player).map(|p| p.cash).unwrap_or(0);
            if cash >= target {
                return;
            }
            let mut candidates: Vec<(u8, bool, i64)> = Vec::new();
            for (pos, state) in &self.properties {
                if state.owner.as_deref() != Some(player) || state.mortgaged || state.houses > 0 || state.hotel {
                    continue;
                }
                let tile = board::get_tile(*pos).unwrap();
                let Some(group) = tile.group else { continue };
                if self.group_has_buildings(player, group) {
                    continue;
                }
                let singleton = !self.owns_full_group(player, group);
                candidates.push((*pos, singleton, tile.mortgage_value()));
            }
            if candidates.is_empty() {
                return;
            }
            candidates.sort_by(|a, b| {
                // singletons (true) first, then mortgage value descending
                b.1.cmp(&a.1).then(b.2.cmp(&a.2))
            });
            let (pos, _, value) = candidates[0];
            if let Some(p) = self.properties.get_mut(&pos) {
                p.mortgaged = true;
            }
            self.route_inflow(player, value, LedgerType::Mortgage, Some(format!("auto pos {pos}")));
            self.log(format!("{player} auto-mortgaged position {pos} for ${value}"));
        }
    }

    /// Sell buildings to cover a negative balance (auto_mortgage players only).
    pub fn auto_sell_houses_for_cash(&mut self, player: &str) {
        let auto = self.get_player(player).map(|p| p.auto_mortgage).unwrap_or(false);
        if !auto {
            return;
        }
        loop {
            let cash = self.get_player(player).map(|p| p.cash).unwrap_or(0);
            if cash >= 0 {
                return;
            }
            let mut best: Option<(u8, u8)> = None;
            for (pos, state) in &self.properties {
                if state.owner.as_deref() != Some(player) {
                    continue;
                }
                let count = state.building_count();
                if count == 0 {
                    continue;
                }
                if best.map(|(_, c)| count > c).unwrap_or(true) {
                    best = Some((*pos, count));
                }
            }
            let Some((pos, _)) = best else { return };
            let tile = board::get_tile(pos).unwrap();
            let house_cost = tile.group.map(|g| g.house_cost()).unwrap_or(0);
            let state = self.properties.get_mut(&pos).unwrap();
            let proceeds = if state.hotel {
                state.hotel = false;
                state.houses = 4;
                house_cost * 5 / 2
            } else {
                state.houses -= 1;
                house_cost / 2
            };
            self.route_inflow(player, proceeds, LedgerType::SellHouse, Some(format!("auto pos {pos}")));
            self.log(format!("{player} auto-sold a building at position {pos} for ${proceeds}"));
        }
    }

    /// Bankruptcy procedure (C4 §4.3): liquidate, zero cash, release properties,
    /// remove the player, purge obligations involving them.
    pub fn bankrupt_player(&mut self, name: &str) {
        let current_name = self.current_player_name();
        // 1. sell houses/hotels at half cost, direct credit (not inflow-routed)
        let positions: Vec<u8> = self
            .properties
            .iter()
            .filter(|(_, s)| s.owner.as_deref() == Some(name))
            .map(|(p, _)| *p)
            .collect();
        for pos in &positions {
            let tile = board::get_tile(*pos).unwrap();
            let house_cost = tile.group.map(|g| g.house_cost()).unwrap_or(0);
            let state = self.properties.get_mut(pos).unwrap();
            let proceeds = if state.hotel {
                state.hotel = false;
                state.houses = 0;
                house_cost * 5 / 2
            } else if state.houses > 0 {
                let p = house_cost / 2 * state.houses as i64;
                state.houses = 0;
                p
            } else {
                0
            };
            if proceeds > 0 {
                if let Some(p) = self.get_player_mut(name) {
                    p.cash += proceeds;
                }
            }
        }
        // 2. mortgage everything remaining unmortgaged
        for pos in &positions {
            let tile = board::get_tile(*pos).unwrap();
            let value = tile.mortgage_value();
            let state = self.properties.get_mut(pos).unwrap();
            if !state.mortgaged {
                state.mortgaged = true;
                if let Some(p) = self.get_player_mut(name) {
                    p.cash += value;
                }
            }
        }
        // 3/4. residual debt unresolved, zero cash
        let remaining_debt = self.get_player(name).map(|p| p.cash).unwrap_or(0);
        if remaining_debt < 0 {
            self.log(format!("{name} went bankrupt with unresolved debt of ${}", -remaining_debt));
        }
        if let Some(p) = self.get_player_mut(name) {
            p.cash = 0;
        }
        // 5. release properties to bank
        for pos in &positions {
            self.properties.insert(*pos, Default::default());
        }
        // 6. remove from players, purge obligations
        let idx_before = self.players.iter().position(|p| p.name == name);
        self.players.retain(|p| p.name != name);
        self.recurring.retain(|r| r.from != name && r.to != name);
        self.pending_trades.retain(|t| t.from != name && t.to != name);
        self.property_rentals.retain(|r| r.owner != name && r.renter != name);
        self.ledger_add(LedgerType::Bankruptcy, Some(name), None, 0, None);
        self.log(format!("{name} declared bankruptcy"));

        // 7. re-derive current_turn: keep pointing at whoever held the turn,
        // unless they are the one just removed, in which case advance to the
        // next surviving player in turn order (wrapping via modulo).
        if !self.players.is_empty() {
            self.current_turn = match current_name {
                Some(ref cur) if cur != name => {
                    self.players.iter().position(|p| &p.name == cur).unwrap_or(0)
                }
                _ => idx_before.unwrap_or(0) % self.players.len(),
            };
        } else {
            self.current_turn = 0;
        }
        self.rolls_left = 1;

        // 8. finalize if one player remains
        if self.players.len() == 1 {
            self.finalize_game();
        }
    }

    /// Auto-unmortgage every mortgaged property in `group` owned by `player`,
    /// paying full payoff, only while solvent. Used before auto-buying houses.
    fn auto_unmortgage_group(&mut self, player: &str, group: ColorGroup) {
        for pos in board::get_group_tiles(group).iter().map(|t| t.index) {
            let Some(state) = self.properties.get(&pos) else { continue };
            if state.owner.as_deref() != Some(player) || !state.mortgaged {
                continue;
            }
            let tile = board::get_tile(pos).unwrap();
            let payoff = tile.mortgage_value() + (tile.mortgage_value() as f64 * 0.1).ceil() as i64;
            let cash = self.get_player(player).map(|p| p.cash).unwrap_or(0);
            if cash < payoff {
                continue;
            }
            if let Some(p) = self.get_player_mut(player) {
                p.cash -= payoff;
            }
            self.properties.get_mut(&pos).unwrap().mortgaged = false;
            self.ledger_add(LedgerType::Unmortgage, Some(player), None, payoff, Some(format!("auto pos {pos}")));
        }
    }

    fn can_build_even(&self, group: ColorGroup, pos: u8, delta: i8) -> bool {
        let tiles = board::get_group_tiles(group);
        let mut counts: Vec<i16> = tiles
            .iter()
            .map(|t| {
                let c = self.properties.get(&t.index).map(|s| s.building_count()).unwrap_or(0) as i16;
                if t.index == pos { c + delta as i16 } else { c }
            })
            .collect();
        counts.sort();
        counts.last().unwrap() - counts.first().unwrap() <= 1
    }

    /// After completing a full, unmortgaged color group, auto-buy houses
    /// evenly across the group until funds run out or every property sits
    /// at 4 houses. Hotels are never auto-purchased by this cascade.
    pub fn auto_buy_houses_even(&mut self, player: &str) {
        let auto = self.get_player(player).map(|p| p.auto_buy_houses).unwrap_or(false);
        if !auto {
            return;
        }
        let groups: Vec<ColorGroup> = [
            ColorGroup::Brown, ColorGroup::LightBlue, ColorGroup::Pink, ColorGroup::Orange,
            ColorGroup::Red, ColorGroup::Yellow, ColorGroup::Green, ColorGroup::DarkBlue,
        ]
        .into_iter()
        .filter(|g| self.owns_full_group(player, *g) && !self.group_has_mortgage(*g))
        .collect();

        for group in groups {
            self.auto_unmortgage_group(player, group);
            loop {
                let house_cost = group.house_cost();
                let tiles = board::get_group_tiles(group);
                let candidate = tiles.iter().find(|t| {
                    let state = self.properties.get(&t.index);
                    let houses = state.map(|s| s.houses).unwrap_or(0);
                    let hotel = state.map(|s| s.hotel).unwrap_or(false);
                    !hotel && houses < 4 && self.can_build_even(group, t.index, 1)
                });
                let Some(tile) = candidate else { break };
                let cash = self.get_player(player).map(|p| p.cash).unwrap_or(0);
                if cash < house_cost {
                    break;
                }
                if let Some(p) = self.get_player_mut(player) {
                    p.cash -= house_cost;
                }
                self.properties.get_mut(&tile.index).unwrap().houses += 1;
                self.ledger_add(LedgerType::BuyHouse, Some(player), None, house_cost, Some(format!("auto pos {}", tile.index)));
            }
        }
    }

    /// Combined cascade run whenever a player's cash may have gone negative:
    /// auto-mortgage first, then auto-sell buildings, only if `auto_mortgage`
    /// is enabled. Returns whether cash ended up non-negative.
    pub fn handle_negative_cash(&mut self, player: &str) -> bool {
        let cash = self.get_player(player).map(|p| p.cash).unwrap_or(0);
        if cash >= 0 {
            return true;
        }
        let auto = self.get_player(player).map(|p| p.auto_mortgage).unwrap_or(false);
        if !auto {
            return false;
        }
        self.auto_mortgage_for_cash(player, 0);
        self.auto_sell_houses_for_cash(player);
        self.get_player(player).map(|p| p.cash >= 0).unwrap_or(false)
    }

    fn finalize_game(&mut self) {
        let winner = self.players.first().map(|p| p.name.clone()).unwrap_or_default();
        let (pos, count) = self
            .land_counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(p, c)| (*p, *c))
            .unwrap_or((0, 0));
        let name = board::get_tile(pos).map(|t| t.name.clone()).unwrap_or_default();
        self.game_over = Some(crate::game::state::GameOver {
            winner,
            turns: self.turns,
            most_landed_pos: pos,
            most_landed_name: name,
            most_landed_count: count,
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuyDenyReason {
    NotBuyable,
    Owned,
    InsufficientCash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MortgageDenyReason {
    HasBuildings,
    AlreadyMortgaged,
    NotMortgaged,
    InsufficientCash,
    NotOwner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildDenyReason {
    GroupOrMortgage,
    HasHotel,
    MaxHouses,
    InsufficientCash,
    EvenRule,
    NoHousesOrHotel,
    NotOwner,
}

impl Game {
    pub fn buy_property(&mut self, actor: &str, pos: u8) -> Result<(), BuyDenyReason> {
        let tile = board::get_tile(pos).ok_or(BuyDenyReason::NotBuyable)?;
        if !tile.is_ownable() {
            return Err(BuyDenyReason::NotBuyable);
        }
        if self.properties.get(&pos).map(|p| p.owner.is_some()).unwrap_or(false) {
            return Err(BuyDenyReason::Owned);
        }
        self.try_raise_cash_for(actor, tile.price);
        let cash = self.get_player(actor).map(|p| p.cash).unwrap_or(0);
        if cash < tile.price {
            return Err(BuyDenyReason::InsufficientCash);
        }
        if let Some(p) = self.get_player_mut(actor) {
            p.cash -= tile.price;
        }
        self.properties.insert(pos, crate::game::state::PropertyState { owner: Some(actor.to_string()), ..Default::default() });
        self.ledger_add(LedgerType::BuyProperty, Some(actor), None, tile.price, Some(format!("pos {pos}")));
        self.auto_buy_houses_even(actor);
        Ok(())
    }

    pub fn mortgage(&mut self, actor: &str, pos: u8) -> Result<(), MortgageDenyReason> {
        let state = self.properties.get(&pos).ok_or(MortgageDenyReason::NotOwner)?;
        if state.owner.as_deref() != Some(actor) {
            return Err(MortgageDenyReason::NotOwner);
        }
        if state.houses > 0 || state.hotel {
            return Err(MortgageDenyReason::HasBuildings);
        }
        if state.mortgaged {
            return Err(MortgageDenyReason::AlreadyMortgaged);
        }
        let tile = board::get_tile(pos).unwrap();
        let value = tile.mortgage_value();
        self.properties.get_mut(&pos).unwrap().mortgaged = true;
        self.route_inflow(actor, value, LedgerType::Mortgage, Some(format!("pos {pos}")));
        Ok(())
    }

    pub fn unmortgage(&mut self, actor: &str, pos: u8) -> Result<(), MortgageDenyReason> {
        let state = self.properties.get(&pos).ok_or(MortgageDenyReason::NotOwner)?;
        if state.owner.as_deref() != Some(actor) {
            return Err(MortgageDenyReason::NotOwner);
        }
        if !state.mortgaged {
            return Err(MortgageDenyReason::NotMortgaged);
        }
        let tile = board::get_tile(pos).unwrap();
        let payoff = tile.mortgage_value() + (tile.mortgage_value() as f64 * 0.1).ceil() as i64;
        let cash = self.get_player(actor).map(|p| p.cash).unwrap_or(0);
        if cash < payoff {
            return Err(MortgageDenyReason::InsufficientCash);
        }
        if let Some(p) = self.get_player_mut(actor) {
            p.cash -= payoff;
        }
        self.properties.get_mut(&pos).unwrap().mortgaged = false;
        self.ledger_add(LedgerType::Unmortgage, Some(actor), None, payoff, Some(format!("pos {pos}")));
        Ok(())
    }

    pub fn buy_house(&mut self, actor: &str, pos: u8) -> Result<(), BuildDenyReason> {
        let state = self.properties.get(&pos).ok_or(BuildDenyReason::NotOwner)?;
        if state.owner.as_deref() != Some(actor) {
            return Err(BuildDenyReason::NotOwner);
        }
        if state.hotel {
            return Err(BuildDenyReason::HasHotel);
        }
        if state.houses >= 4 {
            return Err(BuildDenyReason::MaxHouses);
        }
        let tile = board::get_tile(pos).unwrap();
        let group = tile.group.ok_or(BuildDenyReason::GroupOrMortgage)?;
        if !self.owns_full_group(actor, group) || self.group_has_mortgage(group) {
            return Err(BuildDenyReason::GroupOrMortgage);
        }
        if !self.can_build_even(group, pos, 1) {
            return Err(BuildDenyReason::EvenRule);
        }
        let cost = group.house_cost();
        let cash = self.get_player(actor).map(|p| p.cash).unwrap_or(0);
        if cash < cost {
            return Err(BuildDenyReason::InsufficientCash);
        }
        if let Some(p) = self.get_player_mut(actor) {
            p.cash -= cost;
        }
        self.properties.get_mut(&pos).unwrap().houses += 1;
        self.ledger_add(LedgerType::BuyHouse, Some(actor), None, cost, Some(format!("pos {pos}")));
        Ok(())
    }

    pub fn sell_house(&mut self, actor: &str, pos: u8) -> Result<(), BuildDenyReason> {
        let state = self.properties.get(&pos).ok_or(BuildDenyReason::NotOwner)?;
        if state.owner.as_deref() != Some(actor) {
            return Err(BuildDenyReason::NotOwner);
        }
        if state.houses == 0 {
            return Err(BuildDenyReason::NoHousesOrHotel);
        }
        let tile = board::get_tile(pos).unwrap();
        let group = tile.group.unwrap();
        if !self.can_build_even(group, pos, -1) {
            return Err(BuildDenyReason::EvenRule);
        }
        let proceeds = group.house_cost() / 2;
        self.properties.get_mut(&pos).unwrap().houses -= 1;
        self.route_inflow(actor, proceeds, LedgerType::SellHouse, Some(format!("pos {pos}")));
        Ok(())
    }

    pub fn buy_hotel(&mut self, actor: &str, pos: u8) -> Result<(), BuildDenyReason> {
        let state = self.properties.get(&pos).ok_or(BuildDenyReason::NotOwner)?;
        if state.owner.as_deref() != Some(actor) {
            return Err(BuildDenyReason::NotOwner);
        }
        if state.hotel {
            return Err(BuildDenyReason::HasHotel);
        }
        if state.houses != 4 {
            return Err(BuildDenyReason::MaxHouses);
        }
        let tile = board::get_tile(pos).unwrap();
        let group = tile.group.ok_or(BuildDenyReason::GroupOrMortgage)?;
        if !self.owns_full_group(actor, group) || self.group_has_mortgage(group) {
            return Err(BuildDenyReason::GroupOrMortgage);
        }
        if !self.can_build_even(group, pos, 1) {
            return Err(BuildDenyReason::EvenRule);
        }
        let cost = group.house_cost();
        let cash = self.get_player(actor).map(|p| p.cash).unwrap_or(0);
        if cash < cost {
            return Err(BuildDenyReason::InsufficientCash);
        }
        if let Some(p) = self.get_player_mut(actor) {
            p.cash -= cost;
        }
        let state = self.properties.get_mut(&pos).unwrap();
        state.houses = 0;
        state.hotel = true;
        self.ledger_add(LedgerType::BuyHotel, Some(actor), None, cost, Some(format!("pos {pos}")));
        Ok(())
    }

    pub fn sell_hotel(&mut self, actor: &str, pos: u8) -> Result<(), BuildDenyReason> {
        let state = self.properties.get(&pos).ok_or(BuildDenyReason::NotOwner)?;
        if state.owner.as_deref() != Some(actor) {
            return Err(BuildDenyReason::NotOwner);
        }
        if !state.hotel {
            return Err(BuildDenyReason::NoHousesOrHotel);
        }
        let tile = board::get_tile(pos).unwrap();
        let group = tile.group.unwrap();
        let proceeds = group.house_cost() * 5 / 2;
        let state = self.properties.get_mut(&pos).unwrap();
        state.hotel = false;
        state.houses = 4;
        self.route_inflow(actor, proceeds, LedgerType::SellHotel, Some(format!("pos {pos}")));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{Player, PropertyState};

    fn base_game() -> Game {
        let mut g = Game::new();
        g.players.push(Player::new("A", 1500, "#fff", false));
        g.players.push(Player::new("B", 1500, "#000", false));
        g
    }

    #[test]
    fn hotel_rent_on_monopoly_pos39() {
        let mut g = base_game();
        g.properties.insert(39, PropertyState { owner: Some("A".into()), houses: 0, hotel: true, mortgaged: false });
        assert_eq!(g.compute_rent(39, 7), 2000);
    }

    #[test]
    fn unimproved_monopoly_doubles_base_rent() {
        let mut g = base_game();
        g.properties.insert(1, PropertyState { owner: Some("A".into()), houses: 0, hotel: false, mortgaged: false });
        g.properties.insert(3, PropertyState { owner: Some("A".into()), houses: 0, hotel: false, mortgaged: false });
        assert_eq!(g.compute_rent(1, 7), 4); // base 2 doubled
    }

    #[test]
    fn railroad_rent_scales_with_count_owned() {
        let mut g = base_game();
        g.properties.insert(5, PropertyState { owner: Some("A".into()), houses: 0, hotel: false, mortgaged: false });
        assert_eq!(g.compute_rent(5, 7), 25);
        g.properties.insert(15, PropertyState { owner: Some("A".into()), houses: 0, hotel: false, mortgaged: false });
        assert_eq!(g.compute_rent(5, 7), 50);
    }

    #[test]
    fn utility_rent_uses_dice_multiplier() {
        let mut g = base_game();
        g.properties.insert(12, PropertyState { owner: Some("A".into()), houses: 0, hotel: false, mortgaged: false });
        assert_eq!(g.compute_rent(12, 6), 24);
        g.properties.insert(28, PropertyState { owner: Some("A".into()), houses: 0, hotel: false, mortgaged: false });
        assert_eq!(g.compute_rent(12, 6), 60);
    }

    #[test]
    fn rent_with_active_rental_splits_income_and_tags_ledger_correctly() {
        let mut g = base_game();
        g.players.push(Player::new("C", 1500, "#0f0", false));
        g.properties.insert(5, PropertyState { owner: Some("B".into()), houses: 0, hotel: false, mortgaged: false });
        g.property_rentals.push(crate::game::state::PropertyRental {
            id: "rt1".into(),
            owner: "B".into(),
            renter: "C".into(),
            properties: vec![5],
            percentage: 50.0,
            turns_left: 3,
            cash_paid: 100,
            total_received: 0,
            last_payment: 0,
            last_payment_turn: 0,
        });

        g.pay_rent("A", 5, 7); // railroad rent at count 1 = 25

        assert_eq!(g.get_player("A").unwrap().cash, 1475);
        assert_eq!(g.get_player("C").unwrap().cash, 1512); // +12 = floor(25*50/100)
        assert_eq!(g.get_player("B").unwrap().cash, 1513); // +13 remainder
        assert_eq!(g.property_rentals[0].total_received, 12);

        assert!(g
            .ledger
            .iter()
            .any(|e| e.entry_type == LedgerType::RentalIncomeSplit && e.to.as_deref() == Some("C") && e.amount == 12));
        assert!(g
            .ledger
            .iter()
            .any(|e| e.entry_type == LedgerType::RentSplit
                && e.from.as_deref() == Some("A")
                && e.to.as_deref() == Some("<renters>")
                && e.amount == 12));
        assert!(g
            .ledger
            .iter()
            .any(|e| e.entry_type == LedgerType::Rent && e.to.as_deref() == Some("B") && e.amount == 13));
    }

    #[test]
    fn rent_with_monopoly_and_hotel_scenario() {
        // SPEC_FULL §8 scenario 2
        let mut g = base_game();
        g.get_player_mut("B").unwrap().cash = 500;
        g.properties.insert(39, PropertyState { owner: Some("A".into()), houses: 0, hotel: true, mortgaged: false });
        g.pay_rent("B", 39, 7);
        assert_eq!(g.get_player("B").unwrap().cash, 0);
        assert_eq!(g.debt_total("B"), 1500);
        assert_eq!(g.get_player("A").unwrap().cash, 1500 + 500);
    }

    #[test]
    fn mortgage_then_unmortgage_round_trip() {
        let mut g = base_game();
        g.properties.insert(1, PropertyState { owner: Some("A".into()), ..Default::default() });
        let start = g.get_player("A").unwrap().cash;
        g.mortgage("A", 1).unwrap();
        g.unmortgage("A", 1).unwrap();
        let end = g.get_player("A").unwrap().cash;
        let mortgage_value = board::get_tile(1).unwrap().mortgage_value();
        let interest = (mortgage_value as f64 * 0.1).ceil() as i64;
        assert_eq!(start - end, interest);
        assert!(!g.properties.get(&1).unwrap().mortgaged);
    }

    #[test]
    fn build_then_sell_house_round_trip() {
        let mut g = base_game();
        g.properties.insert(1, PropertyState { owner: Some("A".into()), ..Default::default() });
        g.properties.insert(3, PropertyState { owner: Some("A".into()), ..Default::default() });
        let start = g.get_player("A").unwrap().cash;
        g.buy_house("A", 1).unwrap();
        g.sell_house("A", 1).unwrap();
        let end = g.get_player("A").unwrap().cash;
        let house_cost = ColorGroup::Brown.house_cost();
        assert_eq!(start - end, house_cost / 2);
    }

    #[test]
    fn even_build_allows_hotel_transition_from_four_even_houses() {
        let mut g = base_game();
        g.properties.insert(1, PropertyState { owner: Some("A".into()), houses: 4, ..Default::default() });
        g.properties.insert(3, PropertyState { owner: Some("A".into()), houses: 4, ..Default::default() });
        g.get_player_mut("A").unwrap().cash = 1000;
        assert!(g.buy_hotel("A", 1).is_ok());
    }

    #[test]
    fn bankruptcy_releases_properties_and_removes_player() {
        let mut g = base_game();
        g.get_player_mut("A").unwrap().cash = -100;
        g.properties.insert(1, PropertyState { owner: Some("A".into()), houses: 0, hotel: false, mortgaged: false });
        g.bankrupt_player("A");
        assert!(g.get_player("A").is_none());
        assert_eq!(g.properties.get(&1).unwrap().owner, None);
        assert_eq!(g.players.len(), 1);
        assert!(g.game_over.is_some());
    }

    #[test]
    fn bankrupting_a_non_current_player_keeps_turn_on_same_player() {
        let mut g = base_game();
        g.players.push(Player::new("C", 1500, "#00f", false));
        g.current_turn = 2; // C is current
        g.get_player_mut("B").unwrap().cash = -100;
        g.bankrupt_player("B");
        assert_eq!(g.current_player_name().as_deref(), Some("C"));
    }
}
