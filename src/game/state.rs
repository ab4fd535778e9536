//! Game state types: players, properties, instruments, and the `Game` aggregate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::game::board;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub cash: i64,
    pub position: u8,
    pub in_jail: bool,
    pub jail_turns: u8,
    pub doubles_count: u8,
    pub jail_cards: u8,
    pub color: String,
    pub auto_mortgage: bool,
    pub auto_buy_houses: bool,
    pub is_bot: bool,
}

impl Player {
    pub fn new(name: impl Into<String>, cash: i64, color: impl Into<String>, is_bot: bool) -> Self {
        Self {
            name: name.into(),
            cash,
            position: 0,
            in_jail: false,
            jail_turns: 0,
            doubles_count: 0,
            jail_cards: 0,
            color: color.into(),
            auto_mortgage: false,
            auto_buy_houses: false,
            is_bot,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PropertyState {
    pub owner: Option<String>,
    pub houses: u8,
    pub hotel: bool,
    pub mortgaged: bool,
}

impl PropertyState {
    /// Building count for even-build comparisons; hotel counts as 5.
    pub fn building_count(&self) -> u8 {
        if self.hotel {
            5
        } else {
            self.houses
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtEntry {
    pub creditor: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerType {
    BuyProperty,
    Mortgage,
    Unmortgage,
    Rent,
    RentSplit,
    Tax,
    CardPay,
    CardCollect,
    Repairs,
    RecurringPay,
    BondInvest,
    BondCoupon,
    StockInvest,
    StockSell,
    RentalUpfront,
    RentalIncomeSplit,
    DebtAdd,
    DebtPayment,
    PassGo,
    BuyHouse,
    SellHouse,
    BuyHotel,
    SellHotel,
    TradeCash,
    Bankruptcy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub turn: usize,
    pub round: usize,
    pub entry_type: LedgerType,
    pub from: Option<String>,
    pub to: Option<String>,
    pub amount: i64,
    pub meta: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringPayment {
    pub id: String,
    pub from: String,
    pub to: String,
    pub amount: i64,
    pub turns_left: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyRental {
    pub id: String,
    pub owner: String,
    pub renter: String,
    pub properties: Vec<u8>,
    pub percentage: f64,
    pub turns_left: u32,
    pub cash_paid: i64,
    pub total_received: i64,
    pub last_payment: i64,
    pub last_payment_turn: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Stock {
    pub allow_investing: bool,
    pub enforce_min_buy: bool,
    pub min_buy: i64,
    pub enforce_min_pool_total: bool,
    pub min_pool_total: i64,
    pub enforce_min_pool_owner: bool,
    pub min_pool_owner: f64,
    pub holdings: HashMap<String, f64>,
    pub history: Vec<(usize, i64)>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Bond {
    pub allow_bonds: bool,
    pub rate_percent: f64,
    pub period_turns: u32,
    pub history: Vec<(usize, f64)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondInvestment {
    pub owner: String,
    pub investor: String,
    pub principal: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[derive(Default)]
pub struct TradeAssets {
    pub cash: i64,
    pub properties: Vec<u8>,
    pub jail_card: bool,
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringTerm {
    pub from: String,
    pub to: String,
    pub amount: i64,
    pub turns: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalTerm {
    pub properties: Vec<u8>,
    pub percentage: f64,
    pub turns: u32,
    /// "give" = offer maker becomes owner of the rental income split; "receive" = the other way.
    pub direction: RentalDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentalDirection {
    Give,
    Receive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeOffer {
    pub id: String,
    pub from: String,
    pub to: String,
    pub give: TradeAssets,
    pub receive: TradeAssets,
    pub recurring_terms: Vec<RecurringTerm>,
    pub rental_terms: Vec<RentalTerm>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameOver {
    pub winner: String,
    pub turns: usize,
    pub most_landed_pos: u8,
    pub most_landed_name: String,
    pub most_landed_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub players: Vec<Player>,
    pub current_turn: usize,
    pub properties: HashMap<u8, PropertyState>,
    pub rolls_left: u32,
    pub rolled_this_turn: bool,
    pub round: usize,
    pub turns: usize,
    pub land_counts: HashMap<u8, u32>,
    pub game_over: Option<GameOver>,
    pub last_action: Option<String>,
    pub log: Vec<String>,
    pub ledger: Vec<LedgerEntry>,
    pub recurring: Vec<RecurringPayment>,
    pub property_rentals: Vec<PropertyRental>,
    pub stocks: HashMap<String, Stock>,
    pub bonds: HashMap<String, Bond>,
    pub bond_investments: Vec<BondInvestment>,
    pub turn_counts: HashMap<String, u32>,
    pub debts: HashMap<String, Vec<DebtEntry>>,
    pub pending_trades: Vec<TradeOffer>,
    pub recent_trades: Vec<TradeOffer>,
    pub next_trade_id: u64,
}

impl Game {
    pub fn new() -> Self {
        Self {
            players: Vec::new(),
            current_turn: 0,
            properties: HashMap::new(),
            rolls_left: 1,
            rolled_this_turn: false,
            round: 0,
            turns: 0,
            land_counts: HashMap::new(),
            game_over: None,
            last_action: None,
            log: Vec::new(),
            ledger: Vec::new(),
            recurring: Vec::new(),
            property_rentals: Vec::new(),
            stocks: HashMap::new(),
            bonds: HashMap::new(),
            bond_investments: Vec::new(),
            turn_counts: HashMap::new(),
            debts: HashMap::new(),
            pending_trades: Vec::new(),
            recent_trades: Vec::new(),
            next_trade_id: 1,
        }
    }

    pub fn get_player(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn get_player_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.name == name)
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_turn)
    }

    pub fn current_player_name(&self) -> Option<String> {
        self.current_player().map(|p| p.name.clone())
    }

    pub fn log(&mut self, message: impl Into<String>) {
        self.log.push(message.into());
        let len = self.log.len();
        if len > 200 {
            self.log.drain(0..len - 200);
        }
    }

    pub fn next_trade_id(&mut self) -> String {
        let id = format!("t{}", self.next_trade_id);
        self.next_trade_id += 1;
        id
    }

    /// Net worth: cash plus purchase price of owned unmortgaged properties
    /// plus house/hotel value.
    pub fn net_worth(&self, name: &str) -> i64 {
        let Some(player) = self.get_player(name) else { return 0 };
        let mut total = player.cash;
        for (pos, state) in &self.properties {
            if state.owner.as_deref() != Some(name) || state.mortgaged {
                continue;
            }
            let tile = board::get_tile(*pos).expect("valid board position");
            total += tile.price;
            let house_cost = tile.group.map(|g| g.house_cost()).unwrap_or(0);
            if state.hotel {
                total += house_cost;
            } else {
                total += house_cost * state.houses as i64;
            }
        }
        total
    }

    /// Build the broadcast view of this game: the full state, except the
    /// three unbounded-growth lists are trimmed to their wire tail size
    /// (distinct from, and smaller than, their internal storage caps).
    pub fn snapshot(&self) -> GameSnapshot {
        const PENDING_TRADES_TAIL: usize = 50;
        const RECENT_TRADE_IDS_TAIL: usize = 100;

        let pending_len = self.pending_trades.len();
        let pending_trades = if pending_len > PENDING_TRADES_TAIL {
            self.pending_trades[pending_len - PENDING_TRADES_TAIL..].to_vec()
        } else {
            self.pending_trades.clone()
        };
        let recent_len = self.recent_trades.len();
        let recent_trade_ids = self.recent_trades
            [recent_len.saturating_sub(RECENT_TRADE_IDS_TAIL)..]
            .iter()
            .map(|t| t.id.clone())
            .collect();

        GameSnapshot {
            players: self.players.clone(),
            current_turn: self.current_turn,
            properties: self.properties.clone(),
            rolls_left: self.rolls_left,
            rolled_this_turn: self.rolled_this_turn,
            round: self.round,
            turns: self.turns,
            land_counts: self.land_counts.clone(),
            game_over: self.game_over.clone(),
            last_action: self.last_action.clone(),
            log: self.log.clone(),
            ledger: self.ledger_tail(500),
            recurring: self.recurring.clone(),
            property_rentals: self.property_rentals.clone(),
            stocks: self.stocks.clone(),
            bonds: self.bonds.clone(),
            bond_investments: self.bond_investments.clone(),
            turn_counts: self.turn_counts.clone(),
            debts: self.debts.clone(),
            pending_trades,
            recent_trade_ids,
            next_trade_id: self.next_trade_id,
        }
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire snapshot of a [`Game`], broadcast on every state-changing action.
/// Ledger/pending-trade/recent-trade lists carry a short tail here, distinct
/// from their much larger internal storage caps (`LEDGER_CAP`, `RECENT_TRADES_CAP`).
#[derive(Debug, Clone, Serialize)]
pub struct GameSnapshot {
    pub players: Vec<Player>,
    pub current_turn: usize,
    pub properties: HashMap<u8, PropertyState>,
    pub rolls_left: u32,
    pub rolled_this_turn: bool,
    pub round: usize,
    pub turns: usize,
    pub land_counts: HashMap<u8, u32>,
    pub game_over: Option<GameOver>,
    pub last_action: Option<String>,
    pub log: Vec<String>,
    pub ledger: Vec<LedgerEntry>,
    pub recurring: Vec<RecurringPayment>,
    pub property_rentals: Vec<PropertyRental>,
    pub stocks: HashMap<String, Stock>,
    pub bonds: HashMap<String, Bond>,
    pub bond_investments: Vec<BondInvestment>,
    pub turn_counts: HashMap<String, u32>,
    pub debts: HashMap<String, Vec<DebtEntry>>,
    pub pending_trades: Vec<TradeOffer>,
    pub recent_trade_ids: Vec<String>,
    pub next_trade_id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn building_count_treats_hotel_as_five() {
        let mut p = PropertyState::default();
        p.houses = 4;
        assert_eq!(p.building_count(), 4);
        p.hotel = true;
        p.houses = 0;
        assert_eq!(p.building_count(), 5);
    }

    #[test]
    fn net_worth_includes_unmortgaged_property_and_buildings() {
        let mut game = Game::new();
        game.players.push(Player::new("A", 100, "#fff", false));
        game.properties.insert(1, PropertyState { owner: Some("A".into()), houses: 2, hotel: false, mortgaged: false });
        let nw = game.net_worth("A");
        // tile 1 price 60, house_cost 50 * 2 houses = 100; total = 100 + 60 + 100
        assert_eq!(nw, 260);
    }

    #[test]
    fn net_worth_excludes_mortgaged_property() {
        let mut game = Game::new();
        game.players.push(Player::new("A", 100, "#fff", false));
        game.properties.insert(1, PropertyState { owner: Some("A".into()), houses: 0, hotel: false, mortgaged: true });
        assert_eq!(game.net_worth("A"), 100);
    }

    #[test]
    fn snapshot_trims_ledger_pending_trades_and_recent_trade_ids() {
        let mut game = Game::new();
        game.players.push(Player::new("A", 1000, "#fff", false));
        game.players.push(Player::new("B", 1000, "#000", false));

        for i in 0..600 {
            game.ledger_add(LedgerType::Tax, Some("A"), None, i, None);
        }
        for i in 1..=60 {
            game.offer_trade(
                "A",
                "B",
                TradeAssets { cash: i, ..Default::default() },
                TradeAssets::default(),
                vec![],
                vec![],
            )
            .unwrap();
        }
        for i in 0..150 {
            let offer = TradeOffer {
                id: format!("archived{i}"),
                from: "A".into(),
                to: "B".into(),
                give: TradeAssets::default(),
                receive: TradeAssets::default(),
                recurring_terms: vec![],
                rental_terms: vec![],
                status: "declined".into(),
            };
            game.recent_trades.push(offer);
        }

        let snapshot = game.snapshot();
        assert_eq!(snapshot.ledger.len(), 500);
        assert_eq!(snapshot.ledger.last().unwrap().amount, 599);
        assert_eq!(snapshot.pending_trades.len(), 50);
        assert_eq!(snapshot.recent_trade_ids.len(), 100);
        assert_eq!(snapshot.recent_trade_ids.last().unwrap(), "archived149");
    }
}
