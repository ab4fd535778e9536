//! Session-level wire events (C9): lobby control plane plus the `game_action`
//! envelope wrapping [`crate::game::events::GameAction`].

use serde::{Deserialize, Serialize};

use crate::game::events::GameAction;
use crate::game::{Game, GameSnapshot, TradeOffer};
use crate::lobby::model::{ChatMessage, LobbySummary, PlayerInfo};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Auth { display: String, client_id: Option<String> },
    LobbyList,
    LobbyCreate { name: String },
    LobbyJoin { id: String },
    LeaveLobby { id: String },
    LobbyReady { id: String, ready: bool },
    LobbySetting { id: String, setting: String, value: serde_json::Value },
    LobbyStart { id: String },
    LobbyReset { id: String },
    LobbyRematch { id: String },
    VoteKick { id: String, target: String },
    ChatSend { id: String, message: String },
    BotAdd { id: String, name: Option<String> },
    BotRemove { id: String, name: String },
    GetPlayers { id: String },
    GameAction { id: String, action: GameAction },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    LobbyList { lobbies: Vec<LobbySummary> },
    LobbyState { id: String, state: crate::lobby::model::LobbyState },
    LobbyJoined { id: String },
    LobbyCreated { id: String },
    LobbyDeleted { id: String },
    PlayersList { id: String, players: Vec<PlayerInfo> },
    GameState { lobby_id: String, snapshot: Box<GameSnapshot> },
    Sound { event: &'static str },
    LobbyChat { id: String, message: ChatMessage },
    ChatMessage { id: String, message: ChatMessage },
    Error { message: String },
}

#[allow(dead_code)]
pub fn trade_lookup(game: &Game, trade_id: &str) -> Option<(TradeOffer, &'static str)> {
    game.find_trade(trade_id).map(|(t, status)| (t.clone(), status))
}
