//! Append-only ledger and FIFO debt-inflow routing (C3).

use crate::game::state::{DebtEntry, Game, LedgerEntry, LedgerType};

const LEDGER_CAP: usize = 5000;

impl Game {
    pub fn ledger_add(
        &mut self,
        entry_type: LedgerType,
        from: Option<&str>,
        to: Option<&str>,
        amount: i64,
        meta: Option<String>,
    ) {
        self.ledger.push(LedgerEntry {
            turn: self.turns,
            round: self.round,
            entry_type,
            from: from.map(String::from),
            to: to.map(String::from),
            amount,
            meta,
        });
        let len = self.ledger.len();
        if len > LEDGER_CAP {
            self.ledger.drain(0..len - LEDGER_CAP);
        }
    }

    pub fn ledger_tail(&self, n: usize) -> Vec<LedgerEntry> {
        let len = self.ledger.len();
        if len <= n {
            self.ledger.clone()
        } else {
            self.ledger[len - n..].to_vec()
        }
    }

    fn debt_add(&mut self, debtor: &str, creditor: &str, amount: i64) {
        if amount <= 0 {
            return;
        }
        let entries = self.debts.entry(debtor.to_string()).or_default();
        if let Some(last) = entries.last_mut() {
            if last.creditor == creditor {
                last.amount += amount;
                self.ledger_add(LedgerType::DebtAdd, Some(creditor), Some(debtor), amount, None);
                return;
            }
        }
        entries.push(DebtEntry { creditor: creditor.to_string(), amount });
        self.ledger_add(LedgerType::DebtAdd, Some(creditor), Some(debtor), amount, None);
    }

    pub fn debt_total(&self, debtor: &str) -> i64 {
        self.debts
            .get(debtor)
            .map(|v| v.iter().map(|e| e.amount).sum())
            .unwrap_or(0)
    }

    /// Pay `due` from `payer` to `creditor` (or "bank"), tolerating insufficient
    /// cash by routing the shortfall into the payer's debt queue.
    pub fn pay_with_debt_tolerance(
        &mut self,
        payer: &str,
        creditor: &str,
        due: i64,
        entry_type: LedgerType,
        meta: Option<String>,
    ) -> i64 {
        if due <= 0 {
            return 0;
        }
        let cash = self.get_player(payer).map(|p| p.cash).unwrap_or(0);
        let paid = due.min(cash.max(0));
        let shortfall = due - paid;

        if paid > 0 {
            if let Some(p) = self.get_player_mut(payer) {
                p.cash -= paid;
            }
            if creditor == "bank" {
                self.ledger_add(entry_type, Some(payer), None, paid, meta.clone());
            } else {
                self.route_inflow(creditor, paid, entry_type, meta.clone());
            }
        }
        if shortfall > 0 {
            self.debt_add(payer, creditor, shortfall);
        }
        paid
    }

    /// Credit `amount` to `receiver`, first paying down their debt queue FIFO.
    /// Returns the residue actually credited to the receiver's cash.
    pub fn route_inflow(
        &mut self,
        receiver: &str,
        amount: i64,
        reason: LedgerType,
        meta: Option<String>,
    ) -> i64 {
        if amount <= 0 {
            return 0;
        }
        let mut remaining = amount;
        let mut payments: Vec<(String, i64)> = Vec::new();
        if let Some(entries) = self.debts.get_mut(receiver) {
            for entry in entries.iter_mut() {
                if remaining <= 0 {
                    break;
                }
                let pay = remaining.min(entry.amount);
                entry.amount -= pay;
                remaining -= pay;
                payments.push((entry.creditor.clone(), pay));
            }
            entries.retain(|e| e.amount > 0);
        }
        for (creditor, pay) in payments {
            if creditor != "bank" {
                if let Some(c) = self.players.iter_mut().find(|p| p.name == creditor) {
                    c.cash += pay;
                }
            }
            self.ledger_add(LedgerType::DebtPayment, Some(receiver), Some(&creditor), pay, None);
        }
        if let Some(p) = self.get_player_mut(receiver) {
            p.cash += remaining;
        }
        if remaining > 0 {
            self.ledger_add(reason, None, Some(receiver), remaining, meta);
        }
        remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Player;

    fn game_with(names: &[&str]) -> Game {
        let mut g = Game::new();
        for n in names {
            g.players.push(Player::new(*n, 0, "#fff", false));
        }
        g
    }

    #[test]
    fn routing_inflow_clears_debt_and_retains_residue() {
        let mut g = game_with(&["A", "B"]);
        g.debts.insert("A".into(), vec![DebtEntry { creditor: "B".into(), amount: 100 }]);
        let residue = g.route_inflow("A", 150, LedgerType::Rent, None);
        assert_eq!(residue, 50);
        assert_eq!(g.get_player("A").unwrap().cash, 50);
        assert_eq!(g.get_player("B").unwrap().cash, 100);
        assert_eq!(g.debt_total("A"), 0);
    }

    #[test]
    fn routing_inflow_smaller_than_debt_retains_nothing() {
        let mut g = game_with(&["A", "B"]);
        g.debts.insert("A".into(), vec![DebtEntry { creditor: "B".into(), amount: 100 }]);
        let residue = g.route_inflow("A", 40, LedgerType::Rent, None);
        assert_eq!(residue, 0);
        assert_eq!(g.get_player("A").unwrap().cash, 0);
        assert_eq!(g.get_player("B").unwrap().cash, 40);
        assert_eq!(g.debt_total("A"), 60);
    }

    #[test]
    fn pay_with_debt_tolerance_queues_shortfall() {
        let mut g = game_with(&["A", "B"]);
        g.get_player_mut("A").unwrap().cash = 30;
        g.pay_with_debt_tolerance("A", "B", 100, LedgerType::Rent, None);
        assert_eq!(g.get_player("A").unwrap().cash, 0);
        assert_eq!(g.get_player("B").unwrap().cash, 30);
        assert_eq!(g.debt_total("A"), 70);
    }

    #[test]
    fn debt_inflow_to_creditor_is_not_rerouted() {
        let mut g = game_with(&["A", "B", "C"]);
        g.debts.insert("A".into(), vec![DebtEntry { creditor: "B".into(), amount: 50 }]);
        g.debts.insert("B".into(), vec![DebtEntry { creditor: "C".into(), amount: 1000 }]);
        g.route_inflow("A", 50, LedgerType::Rent, None);
        // B's own debt to C is untouched by this credit.
        assert_eq!(g.get_player("B").unwrap().cash, 50);
        assert_eq!(g.debt_total("B"), 1000);
    }
}
