//! Trade protocol: offer/accept/decline/cancel, plus rental-specific offers (C7).

use crate::game::state::{
    Game, LedgerType, PropertyRental, RecurringPayment, RentalDirection, TradeAssets, TradeOffer,
};

const RECENT_TRADES_CAP: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeDenyReason {
    SenderIsRecipient,
    EmptyOffer,
    NotRecipient,
    NotSender,
    NotFound,
}

impl Game {
    pub fn offer_trade(
        &mut self,
        from: &str,
        to: &str,
        give: TradeAssets,
        receive: TradeAssets,
        recurring_terms: Vec<crate::game::state::RecurringTerm>,
        rental_terms: Vec<crate::game::state::RentalTerm>,
    ) -> Result<String, TradeDenyReason> {
        if from == to {
            return Err(TradeDenyReason::SenderIsRecipient);
        }
        let empty = give.cash == 0
            && give.properties.is_empty()
            && !give.jail_card
            && receive.cash == 0
            && receive.properties.is_empty()
            && !receive.jail_card
            && recurring_terms.is_empty()
            && rental_terms.is_empty();
        if empty {
            return Err(TradeDenyReason::EmptyOffer);
        }
        let id = self.next_trade_id();
        self.pending_trades.push(TradeOffer {
            id: id.clone(),
            from: from.to_string(),
            to: to.to_string(),
            give,
            receive,
            recurring_terms,
            rental_terms,
            status: "pending".to_string(),
        });
        self.last_action = Some(format!("trade_offer {id}"));
        Ok(id)
    }

    pub fn accept_trade(&mut self, actor: &str, trade_id: &str) -> Result<(), TradeDenyReason> {
        let idx = self
            .pending_trades
            .iter()
            .position(|t| t.id == trade_id)
            .ok_or(TradeDenyReason::NotFound)?;
        if self.pending_trades[idx].to != actor {
            return Err(TradeDenyReason::NotRecipient);
        }
        let offer = self.pending_trades.remove(idx);

        self.apply_transfer(&offer.from, &offer.to, &offer.give);
        self.apply_transfer(&offer.to, &offer.from, &offer.receive);

        for term in &offer.recurring_terms {
            if term.amount > 0 && term.turns > 0 {
                self.recurring.push(RecurringPayment {
                    id: format!("rp{}", self.next_trade_id),
                    from: term.from.clone(),
                    to: term.to.clone(),
                    amount: term.amount,
                    turns_left: term.turns,
                });
            }
        }
        for term in &offer.rental_terms {
            if term.percentage <= 0.0 || term.turns == 0 {
                continue;
            }
            let (owner, renter) = match term.direction {
                RentalDirection::Give => (offer.from.clone(), offer.to.clone()),
                RentalDirection::Receive => (offer.to.clone(), offer.from.clone()),
            };
            self.property_rentals.push(PropertyRental {
                id: format!("rt{}", self.next_trade_id),
                owner,
                renter,
                properties: term.properties.clone(),
                percentage: term.percentage,
                turns_left: term.turns,
                cash_paid: 0,
                total_received: 0,
                last_payment: 0,
                last_payment_turn: self.turns,
            });
        }

        self.log(format!("trade {trade_id} accepted between {} and {}", offer.from, offer.to));
        self.archive_trade(offer, "accepted");
        Ok(())
    }

    pub fn decline_trade(&mut self, actor: &str, trade_id: &str) -> Result<(), TradeDenyReason> {
        let idx = self
            .pending_trades
            .iter()
            .position(|t| t.id == trade_id)
            .ok_or(TradeDenyReason::NotFound)?;
        if self.pending_trades[idx].to != actor {
            return Err(TradeDenyReason::NotRecipient);
        }
        let offer = self.pending_trades.remove(idx);
        self.archive_trade(offer, "declined");
        Ok(())
    }

    pub fn cancel_trade(&mut self, actor: &str, trade_id: &str) -> Result<(), TradeDenyReason> {
        let idx = self
            .pending_trades
            .iter()
            .position(|t| t.id == trade_id)
            .ok_or(TradeDenyReason::NotFound)?;
        if self.pending_trades[idx].from != actor {
            return Err(TradeDenyReason::NotSender);
        }
        let offer = self.pending_trades.remove(idx);
        self.archive_trade(offer, "cancelled");
        Ok(())
    }

    fn archive_trade(&mut self, mut offer: TradeOffer, status: &str) {
        offer.status = status.to_string();
        self.recent_trades.push(offer);
        let len = self.recent_trades.len();
        if len > RECENT_TRADES_CAP {
            self.recent_trades.drain(0..len - RECENT_TRADES_CAP);
        }
    }

    /// Transfer `assets` from `from` to `to`, re-validating at acceptance time
    /// and silently skipping properties no longer owned by `from`.
    fn apply_transfer(&mut self, from: &str, to: &str, assets: &TradeAssets) {
        if assets.cash > 0 {
            let cash = self.get_player(from).map(|p| p.cash).unwrap_or(0);
            let paid = assets.cash.min(cash.max(0));
            if paid > 0 {
                if let Some(p) = self.get_player_mut(from) {
                    p.cash -= paid;
                }
                self.route_inflow(to, paid, LedgerType::TradeCash, None);
            }
        }
        for &pos in &assets.properties {
            if let Some(state) = self.properties.get_mut(&pos) {
                if state.owner.as_deref() == Some(from) {
                    state.owner = Some(to.to_string());
                }
            }
        }
        if assets.jail_card {
            let has = self.get_player(from).map(|p| p.jail_cards > 0).unwrap_or(false);
            if has {
                if let Some(p) = self.get_player_mut(from) {
                    p.jail_cards -= 1;
                }
                if let Some(p) = self.get_player_mut(to) {
                    p.jail_cards += 1;
                }
            }
        }
    }

    /// Convenience one-way offer: `investor` pays `cash_upfront` now for
    /// `percentage`% of rent on `owner`'s listed properties for `turns` turns.
    pub fn offer_rental(
        &mut self,
        investor: &str,
        owner: &str,
        properties: Vec<u8>,
        percentage: f64,
        turns: u32,
        cash_upfront: i64,
    ) -> Result<String, TradeDenyReason> {
        self.offer_trade(
            investor,
            owner,
            TradeAssets { cash: cash_upfront, properties: vec![], jail_card: false },
            TradeAssets::default(),
            vec![],
            vec![crate::game::state::RentalTerm {
                properties,
                percentage,
                turns,
                direction: RentalDirection::Receive,
            }],
        )
    }

    pub fn accept_rental(&mut self, actor: &str, trade_id: &str) -> Result<(), TradeDenyReason> {
        let idx = self
            .pending_trades
            .iter()
            .position(|t| t.id == trade_id)
            .ok_or(TradeDenyReason::NotFound)?;
        if self.pending_trades[idx].to != actor {
            return Err(TradeDenyReason::NotRecipient);
        }
        let offer = self.pending_trades.remove(idx);
        let investor = offer.from.clone();
        let owner = offer.to.clone();
        let cash_upfront = offer.give.cash;

        let paid = if cash_upfront > 0 {
            self.pay_with_debt_tolerance(
                &investor,
                &owner,
                cash_upfront,
                LedgerType::RentalUpfront,
                Some(format!("from {investor}")),
            )
        } else {
            0
        };

        for term in &offer.rental_terms {
            if term.percentage <= 0.0 || term.turns == 0 {
                continue;
            }
            let (rental_owner, renter) = match term.direction {
                RentalDirection::Give => (offer.from.clone(), offer.to.clone()),
                RentalDirection::Receive => (offer.to.clone(), offer.from.clone()),
            };
            let rental_id = format!("rt{}", self.next_trade_id);
            self.log(format!(
                "rental_created {rental_id}: {renter} paid ${paid} for {}% rent on {} propert{} for {} turns",
                term.percentage,
                term.properties.len(),
                if term.properties.len() == 1 { "y" } else { "ies" },
                term.turns
            ));
            self.property_rentals.push(PropertyRental {
                id: rental_id,
                owner: rental_owner,
                renter,
                properties: term.properties.clone(),
                percentage: term.percentage,
                turns_left: term.turns,
                cash_paid: paid,
                total_received: 0,
                last_payment: 0,
                last_payment_turn: self.turns,
            });
        }

        self.log(format!("trade {trade_id} accepted between {investor} and {owner}"));
        self.archive_trade(offer, "accepted");
        Ok(())
    }

    pub fn decline_rental(&mut self, actor: &str, trade_id: &str) -> Result<(), TradeDenyReason> {
        self.decline_trade(actor, trade_id)
    }

    pub fn cancel_rental(&mut self, actor: &str, trade_id: &str) -> Result<(), TradeDenyReason> {
        self.cancel_trade(actor, trade_id)
    }

    pub fn find_trade(&self, trade_id: &str) -> Option<(&TradeOffer, &'static str)> {
        if let Some(t) = self.pending_trades.iter().find(|t| t.id == trade_id) {
            return Some((t, "pending"));
        }
        if let Some(t) = self.recent_trades.iter().find(|t| t.id == trade_id) {
            return Some((t, "archived"));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{Player, PropertyState};

    fn two_player_game() -> Game {
        let mut g = Game::new();
        g.players.push(Player::new("A", 500, "#fff", false));
        g.players.push(Player::new("B", 500, "#000", false));
        g
    }

    #[test]
    fn accept_trade_transfers_cash_and_properties() {
        let mut g = two_player_game();
        g.properties.insert(1, PropertyState { owner: Some("A".into()), ..Default::default() });
        let give = TradeAssets { cash: 100, properties: vec![1], jail_card: false };
        let receive = TradeAssets { cash: 50, properties: vec![], jail_card: false };
        let id = g.offer_trade("A", "B", give, receive, vec![], vec![]).unwrap();
        g.accept_trade("B", &id).unwrap();
        assert_eq!(g.get_player("A").unwrap().cash, 450);
        assert_eq!(g.get_player("B").unwrap().cash, 550);
        assert_eq!(g.properties.get(&1).unwrap().owner.as_deref(), Some("B"));
        assert!(g.pending_trades.is_empty());
        assert_eq!(g.recent_trades.len(), 1);
    }

    #[test]
    fn accept_trade_skips_stale_property_instead_of_failing() {
        let mut g = two_player_game();
        g.properties.insert(1, PropertyState { owner: Some("A".into()), ..Default::default() });
        let give = TradeAssets { cash: 0, properties: vec![1], jail_card: false };
        let id = g.offer_trade("A", "B", give, TradeAssets::default(), vec![], vec![]).unwrap();
        // Ownership changes before acceptance.
        g.properties.get_mut(&1).unwrap().owner = Some("B".into());
        assert!(g.accept_trade("B", &id).is_ok());
        assert_eq!(g.properties.get(&1).unwrap().owner.as_deref(), Some("B"));
    }

    #[test]
    fn only_recipient_can_accept_or_decline() {
        let mut g = two_player_game();
        let id = g.offer_trade("A", "B", TradeAssets { cash: 10, ..Default::default() }, TradeAssets::default(), vec![], vec![]).unwrap();
        assert_eq!(g.accept_trade("A", &id).unwrap_err(), TradeDenyReason::NotRecipient);
    }

    #[test]
    fn only_sender_can_cancel() {
        let mut g = two_player_game();
        let id = g.offer_trade("A", "B", TradeAssets { cash: 10, ..Default::default() }, TradeAssets::default(), vec![], vec![]).unwrap();
        assert_eq!(g.cancel_trade("B", &id).unwrap_err(), TradeDenyReason::NotSender);
        assert!(g.cancel_trade("A", &id).is_ok());
    }

    #[test]
    fn accept_rental_routes_upfront_as_rental_upfront_and_records_cash_paid() {
        let mut g = two_player_game();
        g.properties.insert(1, PropertyState { owner: Some("B".into()), ..Default::default() });
        let id = g.offer_rental("A", "B", vec![1], 50.0, 5, 100).unwrap();
        g.accept_rental("B", &id).unwrap();

        assert_eq!(g.get_player("A").unwrap().cash, 400);
        assert_eq!(g.get_player("B").unwrap().cash, 600);
        assert_eq!(g.property_rentals.len(), 1);
        let rental = &g.property_rentals[0];
        assert_eq!(rental.cash_paid, 100);
        assert_eq!(rental.owner, "B");
        assert_eq!(rental.renter, "A");
        assert!(g
            .ledger
            .iter()
            .any(|e| e.entry_type == LedgerType::RentalUpfront && e.amount == 100));
        assert!(g.log.iter().any(|l| l.starts_with("rental_created")));
    }

    #[test]
    fn accept_rental_upfront_tolerates_insufficient_cash_as_debt() {
        let mut g = two_player_game();
        g.properties.insert(1, PropertyState { owner: Some("B".into()), ..Default::default() });
        g.get_player_mut("A").unwrap().cash = 30;
        let id = g.offer_rental("A", "B", vec![1], 50.0, 5, 100).unwrap();
        g.accept_rental("B", &id).unwrap();

        assert_eq!(g.get_player("A").unwrap().cash, 0);
        assert_eq!(g.get_player("B").unwrap().cash, 530);
        assert_eq!(g.debt_total("A"), 70);
        assert_eq!(g.property_rentals[0].cash_paid, 30);
    }
}
