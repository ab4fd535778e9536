//! Stocks (percent-of-pool), bonds, recurring payments, property rentals (C5).

use crate::game::state::{DebtEntry, Game, LedgerType, Stock};

const DUST: f64 = 1e-6;
const HISTORY_CAP: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDenyReason {
    OwnerCannotInvest,
    Disabled,
    BelowMin,
    BelowMinPoolTotal,
    BelowMinPoolOwner,
    InsufficientCash,
    NoStakeOrPool,
    InvalidAmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondDenyReason {
    OwnerCannotInvestInOwnBond,
    Disabled,
    InsufficientCash,
}

impl Game {
    fn owner_pool(&self, owner: &str) -> i64 {
        self.get_player(owner).map(|p| p.cash).unwrap_or(0)
    }

    fn stock_entry(&mut self, owner: &str) -> &mut Stock {
        self.stocks.entry(owner.to_string()).or_default()
    }

    pub fn stock_invest(&mut self, owner: &str, investor: &str, amount: i64) -> Result<(), StockDenyReason> {
        if investor == owner {
            return Err(StockDenyReason::OwnerCannotInvest);
        }
        if amount <= 0 {
            return Err(StockDenyReason::InvalidAmount);
        }
        let stock = self.stocks.entry(owner.to_string()).or_default();
        if !stock.allow_investing {
            return Err(StockDenyReason::Disabled);
        }
        if stock.enforce_min_buy && amount < stock.min_buy {
            return Err(StockDenyReason::BelowMin);
        }
        let pool = self.owner_pool(owner);
        let stock = self.stocks.get(owner).unwrap();
        if stock.enforce_min_pool_total && pool + amount < stock.min_pool_total {
            return Err(StockDenyReason::BelowMinPoolTotal);
        }
        let investor_cash = self.get_player(investor).map(|p| p.cash).unwrap_or(0);
        if investor_cash < amount {
            return Err(StockDenyReason::InsufficientCash);
        }
        if stock.enforce_min_pool_owner {
            let external: f64 = stock.holdings.values().sum();
            let new_pool = (pool + amount) as f64;
            let owner_stake = (1.0 - external) * pool as f64;
            let owner_share_after = if new_pool > 0.0 { owner_stake / new_pool } else { 0.0 };
            if owner_share_after < stock.min_pool_owner {
                return Err(StockDenyReason::BelowMinPoolOwner);
            }
        }

        if let Some(p) = self.get_player_mut(investor) {
            p.cash -= amount;
        }
        self.route_inflow(owner, amount, LedgerType::StockInvest, Some(format!("from {investor}")));

        let new_pool = (pool + amount) as f64;
        let stock = self.stock_entry(owner);
        for v in stock.holdings.values_mut() {
            *v = (*v * pool as f64) / new_pool;
        }
        let investor_stake = stock.holdings.get(investor).copied().unwrap_or(0.0) * pool as f64;
        let investor_pct = (investor_stake + amount as f64) / new_pool;
        stock.holdings.insert(investor.to_string(), investor_pct);
        stock.holdings.retain(|_, v| *v >= DUST);
        let total: f64 = stock.holdings.values().sum();
        if total > 1.0 {
            let scale = 1.0 / total;
            for v in stock.holdings.values_mut() {
                *v *= scale;
            }
        }
        let turn = self.turns;
        self.stock_entry(owner).history.push((turn, new_pool as i64));
        trim_history(&mut self.stock_entry(owner).history);
        Ok(())
    }

    pub fn stock_sell(&mut self, owner: &str, investor: &str, requested: i64) -> Result<i64, StockDenyReason> {
        let pool = self.owner_pool(owner);
        let stock = self.stocks.entry(owner.to_string()).or_default();
        let percent = stock.holdings.get(investor).copied().unwrap_or(0.0);
        let stake = (percent * pool as f64) as i64;
        if stake <= 0 || pool <= 0 {
            return Err(StockDenyReason::NoStakeOrPool);
        }
        let owner_cash = pool;
        let sell_amount = requested.min(stake).min(owner_cash);
        if sell_amount <= 0 {
            return Err(StockDenyReason::NoStakeOrPool);
        }

        if let Some(p) = self.get_player_mut(owner) {
            p.cash -= sell_amount;
        }
        self.route_inflow(investor, sell_amount, LedgerType::StockSell, Some(format!("from {owner}")));

        let new_pool = pool - sell_amount;
        let stock = self.stock_entry(owner);
        if new_pool <= 0 {
            stock.holdings.clear();
        } else {
            for (name, v) in stock.holdings.iter_mut() {
                let prior_stake = if name == investor { stake as f64 - sell_amount as f64 } else { *v * pool as f64 };
                *v = prior_stake / new_pool as f64;
            }
            stock.holdings.retain(|_, v| *v >= DUST);
        }
        let turn = self.turns;
        self.stock_entry(owner).history.push((turn, new_pool));
        trim_history(&mut self.stock_entry(owner).history);
        Ok(sell_amount)
    }

    pub fn stock_settings(
        &mut self,
        owner: &str,
        allow_investing: Option<bool>,
        enforce_min_buy: Option<bool>,
        min_buy: Option<i64>,
        enforce_min_pool_total: Option<bool>,
        min_pool_total: Option<i64>,
        enforce_min_pool_owner: Option<bool>,
        min_pool_owner: Option<f64>,
    ) {
        let stock = self.stocks.entry(owner.to_string()).or_default();
        if let Some(v) = allow_investing { stock.allow_investing = v; }
        if let Some(v) = enforce_min_buy { stock.enforce_min_buy = v; }
        if let Some(v) = min_buy { stock.min_buy = v; }
        if let Some(v) = enforce_min_pool_total { stock.enforce_min_pool_total = v; }
        if let Some(v) = min_pool_total { stock.min_pool_total = v; }
        if let Some(v) = enforce_min_pool_owner { stock.enforce_min_pool_owner = v; }
        if let Some(v) = min_pool_owner { stock.min_pool_owner = v; }
    }

    pub fn bond_settings(
        &mut self,
        owner: &str,
        allow_bonds: Option<bool>,
        rate_percent: Option<f64>,
        period_turns: Option<u32>,
    ) {
        let turn = self.turns;
        let bond = self.bonds.entry(owner.to_string()).or_default();
        if let Some(v) = allow_bonds { bond.allow_bonds = v; }
        if let Some(v) = rate_percent {
            let clamped = v.clamp(0.0, 100.0);
            if (clamped - bond.rate_percent).abs() > f64::EPSILON {
                bond.rate_percent = clamped;
                bond.history.push((turn, clamped));
                trim_history_f64(&mut bond.history);
            }
        }
        if let Some(v) = period_turns { bond.period_turns = v.clamp(1, 20); }
    }

    pub fn bond_invest(&mut self, owner: &str, investor: &str, principal: i64) -> Result<(), BondDenyReason> {
        if investor == owner {
            return Err(BondDenyReason::OwnerCannotInvestInOwnBond);
        }
        if principal <= 0 {
            return Err(BondDenyReason::InsufficientCash);
        }
        let bond = self.bonds.entry(owner.to_string()).or_default();
        if !bond.allow_bonds {
            return Err(BondDenyReason::Disabled);
        }
        let investor_cash = self.get_player(investor).map(|p| p.cash).unwrap_or(0);
        if investor_cash < principal {
            return Err(BondDenyReason::InsufficientCash);
        }
        if let Some(p) = self.get_player_mut(investor) {
            p.cash -= principal;
        }
        self.route_inflow(owner, principal, LedgerType::BondInvest, Some(format!("from {investor}")));
        if let Some(entry) = self
            .bond_investments
            .iter_mut()
            .find(|b| b.owner == owner && b.investor == investor)
        {
            entry.principal += principal;
        } else {
            self.bond_investments.push(crate::game::state::BondInvestment {
                owner: owner.to_string(),
                investor: investor.to_string(),
                principal,
            });
        }
        Ok(())
    }

    /// Process recurring payments and bond coupons owed by `payer` at the
    /// start of their turn (called before the dice roll).
    pub fn process_turn_start_obligations(&mut self, payer: &str) {
        let due: Vec<(usize, i64, String)> = self
            .recurring
            .iter()
            .enumerate()
            .filter(|(_, r)| r.from == payer)
            .map(|(i, r)| (i, r.amount, r.to.clone()))
            .collect();
        for (idx, amount, to) in due {
            self.pay_with_debt_tolerance(payer, &to, amount, LedgerType::RecurringPay, None);
            self.recurring[idx].turns_left = self.recurring[idx].turns_left.saturating_sub(1);
        }
        let mut done = Vec::new();
        for (i, r) in self.recurring.iter().enumerate() {
            if r.from == payer && r.turns_left == 0 {
                done.push(i);
            }
        }
        for i in done.into_iter().rev() {
            self.recurring.remove(i);
            self.log(format!("recurring payment from {payer} completed"));
        }

        let count = {
            let c = self.turn_counts.entry(payer.to_string()).or_insert(0);
            *c += 1;
            *c
        };
        let period = self.bonds.get(payer).map(|b| b.period_turns).unwrap_or(0);
        if period > 0 && count % period == 0 {
            let rate = self.bonds.get(payer).map(|b| b.rate_percent).unwrap_or(0.0);
            let investments: Vec<(String, i64)> = self
                .bond_investments
                .iter()
                .filter(|b| b.owner == payer)
                .map(|b| (b.investor.clone(), b.principal))
                .collect();
            for (investor, principal) in investments {
                let coupon = (principal as f64 * rate / 100.0 * period as f64).round() as i64;
                if coupon > 0 {
                    self.pay_with_debt_tolerance(payer, &investor, coupon, LedgerType::BondCoupon, None);
                }
            }
        }
    }

    /// Decrement rental terms and expire any that hit zero; called on end_turn.
    pub fn tick_rentals(&mut self) {
        let mut expired = Vec::new();
        for (i, r) in self.property_rentals.iter_mut().enumerate() {
            if r.turns_left > 0 {
                r.turns_left -= 1;
                if r.turns_left == 0 {
                    expired.push(i);
                }
            }
        }
        for i in expired.into_iter().rev() {
            let r = self.property_rentals.remove(i);
            self.log(format!(
                "rental {} between {} and {} expired, total received ${}",
                r.id, r.owner, r.renter, r.total_received
            ));
        }
    }

    pub fn record_stock_history_tick(&mut self) {
        let turn = self.turns;
        let owners: Vec<String> = self.stocks.keys().cloned().collect();
        for owner in owners {
            let pool = self.owner_pool(&owner);
            let stock = self.stock_entry(&owner);
            stock.history.push((turn, pool));
            trim_history(&mut stock.history);
        }
    }

    /// Remove debt entries that have been fully paid (amount == 0); kept as
    /// a standalone helper so callers needn't repeat the invariant check.
    pub fn prune_paid_debts(&mut self) {
        for entries in self.debts.values_mut() {
            entries.retain(|e: &DebtEntry| e.amount > 0);
        }
    }
}

fn trim_history(history: &mut Vec<(usize, i64)>) {
    let len = history.len();
    if len > HISTORY_CAP {
        history.drain(0..len - HISTORY_CAP);
    }
}

fn trim_history_f64(history: &mut Vec<(usize, f64)>) {
    let len = history.len();
    if len > HISTORY_CAP {
        history.drain(0..len - HISTORY_CAP);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Player;

    fn game_with(names: &[(&str, i64)]) -> Game {
        let mut g = Game::new();
        for (n, cash) in names {
            g.players.push(Player::new(*n, *cash, "#fff", false));
        }
        g
    }

    #[test]
    fn stock_invest_and_redeem_scenario() {
        // SPEC_FULL §8 scenario 4
        let mut g = game_with(&[("O", 1000), ("I", 500)]);
        g.stock_settings("O", Some(true), None, None, None, None, None, None);
        g.stock_invest("O", "I", 500).unwrap();
        assert_eq!(g.get_player("O").unwrap().cash, 1500);
        assert_eq!(g.get_player("I").unwrap().cash, 0);
        let pct = g.stocks.get("O").unwrap().holdings.get("I").copied().unwrap();
        assert!((pct - 500.0 / 1500.0).abs() < 1e-9);

        let sold = g.stock_sell("O", "I", 300).unwrap();
        assert_eq!(sold, 300);
        assert_eq!(g.get_player("O").unwrap().cash, 1200);
        assert_eq!(g.get_player("I").unwrap().cash, 300);
        let pct = g.stocks.get("O").unwrap().holdings.get("I").copied().unwrap();
        assert!((pct - 200.0 / 1200.0).abs() < 1e-9);
    }

    #[test]
    fn stock_invest_rejects_when_disabled() {
        let mut g = game_with(&[("O", 1000), ("I", 500)]);
        let err = g.stock_invest("O", "I", 100).unwrap_err();
        assert_eq!(err, StockDenyReason::Disabled);
    }

    #[test]
    fn recurring_payment_depletes_after_three_turns() {
        // SPEC_FULL §8 scenario 6
        let mut g = game_with(&[("A", 1000), ("B", 0)]);
        g.recurring.push(crate::game::state::RecurringPayment {
            id: "r1".into(), from: "A".into(), to: "B".into(), amount: 100, turns_left: 3,
        });
        g.process_turn_start_obligations("A");
        g.process_turn_start_obligations("A");
        g.process_turn_start_obligations("A");
        assert!(g.recurring.is_empty());
        assert_eq!(g.get_player("B").unwrap().cash, 300);
        assert_eq!(g.get_player("A").unwrap().cash, 700);
    }

    #[test]
    fn bond_coupon_pays_on_period_boundary() {
        let mut g = game_with(&[("O", 1000), ("I", 100)]);
        g.bond_settings("O", Some(true), Some(10.0), Some(2));
        g.bond_invest("O", "I", 100).unwrap();
        g.process_turn_start_obligations("O"); // count=1, no coupon
        assert_eq!(g.get_player("I").unwrap().cash, 0);
        g.process_turn_start_obligations("O"); // count=2, coupon due
        let coupon = (100f64 * 10.0 / 100.0 * 2.0).round() as i64;
        assert_eq!(g.get_player("I").unwrap().cash, coupon);
    }
}
