//! In-game action payloads dispatched through `game_action` (C9).

use serde::{Deserialize, Serialize};

use crate::game::state::{RecurringTerm, RentalTerm, TradeAssets};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameAction {
    RollDice,
    BuyProperty,
    EndTurn,
    UseJailCard,
    Mortgage { pos: u8 },
    Unmortgage { pos: u8 },
    BuyHouse { pos: u8 },
    SellHouse { pos: u8 },
    BuyHotel { pos: u8 },
    SellHotel { pos: u8 },
    ToggleAutoMortgage,
    ToggleAutoBuyHouses,
    OfferTrade {
        to: String,
        give: TradeAssets,
        receive: TradeAssets,
        #[serde(default)]
        recurring_terms: Vec<RecurringTerm>,
        #[serde(default)]
        rental_terms: Vec<RentalTerm>,
    },
    AcceptTrade { trade_id: String },
    DeclineTrade { trade_id: String },
    CancelTrade { trade_id: String },
    OfferRental {
        owner: String,
        properties: Vec<u8>,
        percentage: f64,
        turns: u32,
        cash_upfront: i64,
    },
    AcceptRental { trade_id: String },
    DeclineRental { trade_id: String },
    CancelRental { trade_id: String },
    StockInvest { owner: String, amount: i64 },
    StockSell { owner: String, amount: i64 },
    StockSettings {
        owner: String,
        allow_investing: bool,
        enforce_min_buy: bool,
        min_buy: i64,
        enforce_min_pool_total: bool,
        min_pool_total: i64,
        enforce_min_pool_owner: bool,
        min_pool_owner: f64,
    },
    BondInvest { owner: String, amount: i64 },
    BondSettings {
        owner: String,
        allow_bonds: bool,
        rate_percent: f64,
        period_turns: u32,
    },
    Bankrupt,
}
