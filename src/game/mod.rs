//! Game module - board catalog, economic engine, turn machine, trade protocol.

pub mod board;
pub mod cards;
mod economy;
mod engine;
pub mod events;
mod instruments;
mod ledger;
pub mod state;
mod trade;
mod turn;

pub use board::BOARD;
pub use economy::{BuildDenyReason, BuyDenyReason, MortgageDenyReason};
pub use engine::GameEngine;
pub use instruments::{BondDenyReason, StockDenyReason};
pub use state::*;
pub use trade::TradeDenyReason;
pub use turn::{EndTurnDenyReason, JailCardDenyReason, RollDenyReason};
