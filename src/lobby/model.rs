//! Lobby state: membership, ready-gating, chat, vote-kick, and the game slot (C8).

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use serde::Serialize;
use uuid::Uuid;

use crate::game::{Game, GameEngine};

pub type ConnId = Uuid;

const CHAT_CAP: usize = 200;
const MIN_STARTING_CASH: i64 = 1;
const MAX_STARTING_CASH: i64 = 25_000;
const KICK_INITIAL: Duration = Duration::from_secs(300);
const KICK_CLAMPED: Duration = Duration::from_secs(120);
pub const PALETTE: [&str; 8] = [
    "#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4", "#42d4f4", "#f032e6",
];

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub from: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerInfo {
    pub name: String,
    pub is_bot: bool,
    pub is_host: bool,
    pub ready: bool,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LobbySummary {
    pub id: String,
    pub name: String,
    pub player_count: usize,
    pub in_game: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LobbyState {
    pub id: String,
    pub name: String,
    pub players: Vec<PlayerInfo>,
    pub starting_cash: i64,
    pub in_game: bool,
    pub kick_target: Option<String>,
    pub kick_votes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyError {
    NameTaken,
    NotHost,
    AlreadyInGame,
    NotEnoughPlayers,
    NotAllReady,
    InvalidSetting,
    InvalidColor,
    NoGame,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteKickResult {
    Registered,
    Kicked,
}

pub struct Lobby {
    pub id: String,
    pub name: String,
    pub host: Option<ConnId>,
    pub players: Vec<String>,
    pub connection_to_name: HashMap<ConnId, String>,
    pub client_to_name: HashMap<String, String>,
    pub ready: HashSet<String>,
    pub bots: HashSet<String>,
    pub disconnect_deadlines: HashMap<String, Instant>,
    pub kick_target: Option<String>,
    pub kick_deadline: Option<Instant>,
    pub kick_votes: HashSet<String>,
    pub chat: VecDeque<ChatMessage>,
    pub colors: HashMap<String, String>,
    pub starting_cash: i64,
    pub game: Option<Game>,
    next_bot: u32,
}

impl Lobby {
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            host: None,
            players: Vec::new(),
            connection_to_name: HashMap::new(),
            client_to_name: HashMap::new(),
            ready: HashSet::new(),
            bots: HashSet::new(),
            disconnect_deadlines: HashMap::new(),
            kick_target: None,
            kick_deadline: None,
            kick_votes: HashSet::new(),
            chat: VecDeque::new(),
            colors: HashMap::new(),
            starting_cash: 1500,
            game: None,
            next_bot: 100,
        }
    }

    pub fn is_host(&self, conn: ConnId) -> bool {
        self.host == Some(conn)
    }

    /// Join `requested_name`, unless `client_id` recovers a previously-seen
    /// display name for this lobby (identity continuity across reconnects).
    pub fn join(&mut self, conn: ConnId, requested_name: &str, client_id: Option<&str>) -> Result<String, LobbyError> {
        let name = match client_id.and_then(|cid| self.client_to_name.get(cid)) {
            Some(prior) => prior.clone(),
            None => requested_name.to_string(),
        };
        let already_live = self.connection_to_name.values().any(|n| n == &name);
        if already_live {
            return Err(LobbyError::NameTaken);
        }
        if !self.players.contains(&name) {
            self.players.push(name.clone());
        }
        self.connection_to_name.insert(conn, name.clone());
        if let Some(cid) = client_id {
            self.client_to_name.insert(cid.to_string(), name.clone());
        }
        if self.host.is_none() {
            self.host = Some(conn);
        }
        self.disconnect_deadlines.remove(&name);
        Ok(name)
    }

    /// Remove `conn`'s mapping. Returns the display name if this was a known
    /// connection. If a game is running the player record itself is kept
    /// (disconnect-deadline handling is the caller's job).
    pub fn leave(&mut self, conn: ConnId) -> Option<String> {
        let name = self.connection_to_name.remove(&conn)?;
        if self.game.is_none() {
            self.players.retain(|p| p != &name);
            self.ready.remove(&name);
            self.colors.remove(&name);
        }
        if self.host == Some(conn) {
            self.host = self.connection_to_name.keys().next().copied();
        }
        Some(name)
    }

    pub fn set_ready(&mut self, conn: ConnId, ready: bool) -> Option<String> {
        let name = self.connection_to_name.get(&conn)?.clone();
        if ready {
            self.ready.insert(name.clone());
        } else {
            self.ready.remove(&name);
        }
        Some(name)
    }

    pub fn set_setting(&mut self, conn: ConnId, setting: &str, value: &serde_json::Value) -> Result<(), LobbyError> {
        match setting {
            "starting_cash" => {
                if !self.is_host(conn) {
                    return Err(LobbyError::NotHost);
                }
                let cash = value.as_i64().ok_or(LobbyError::InvalidSetting)?;
                if !(MIN_STARTING_CASH..=MAX_STARTING_CASH).contains(&cash) {
                    return Err(LobbyError::InvalidSetting);
                }
                self.starting_cash = cash;
                Ok(())
            }
            "player_color" => {
                let name = self.connection_to_name.get(&conn).cloned().ok_or(LobbyError::NotFound)?;
                let color = value.as_str().ok_or(LobbyError::InvalidColor)?;
                if !is_valid_hex_color(color) {
                    return Err(LobbyError::InvalidColor);
                }
                self.colors.insert(name, color.to_string());
                Ok(())
            }
            _ => Err(LobbyError::InvalidSetting),
        }
    }

    pub fn start_game(&mut self, conn: ConnId) -> Result<(), LobbyError> {
        if !self.is_host(conn) {
            return Err(LobbyError::NotHost);
        }
        if self.game.is_some() {
            return Err(LobbyError::AlreadyInGame);
        }
        if self.players.len() < 2 {
            return Err(LobbyError::NotEnoughPlayers);
        }
        let all_ready = self
            .connection_to_name
            .values()
            .all(|name| self.bots.contains(name) || self.ready.contains(name));
        if !all_ready {
            return Err(LobbyError::NotAllReady);
        }
        let names: Vec<(String, bool)> = self
            .players
            .iter()
            .map(|n| (n.clone(), self.bots.contains(n)))
            .collect();
        let mut game = GameEngine::start(&names, self.starting_cash);
        for (i, (name, _)) in names.iter().enumerate() {
            if let Some(color) = self.colors.get(name) {
                if let Some(p) = game.get_player_mut(name) {
                    p.color = color.clone();
                }
            } else if let Some(p) = game.get_player_mut(name) {
                p.color = PALETTE[i % PALETTE.len()].to_string();
            }
        }
        for (name, _) in &names {
            let stock = game.stocks.entry(name.clone()).or_default();
            stock.history.push((0, self.starting_cash));
            let bond = game.bonds.entry(name.clone()).or_default();
            bond.history.push((0, bond.rate_percent));
        }
        self.game = Some(game);
        self.kick_target = None;
        self.kick_deadline = None;
        self.kick_votes.clear();
        Ok(())
    }

    /// Pre-game-only instant removal by the host.
    pub fn host_remove(&mut self, conn: ConnId, target: &str) -> Result<(), LobbyError> {
        if self.game.is_some() {
            return Err(LobbyError::AlreadyInGame);
        }
        if !self.is_host(conn) {
            return Err(LobbyError::NotHost);
        }
        if self.connection_to_name.get(&conn).map(|n| n.as_str()) == Some(target) {
            return Err(LobbyError::InvalidSetting);
        }
        self.players.retain(|p| p != target);
        self.bots.remove(target);
        self.ready.remove(target);
        self.colors.remove(target);
        let stale: Vec<ConnId> = self
            .connection_to_name
            .iter()
            .filter(|(_, n)| n.as_str() == target)
            .map(|(c, _)| *c)
            .collect();
        for c in stale {
            self.connection_to_name.remove(&c);
        }
        Ok(())
    }

    /// In-game vote-kick, targeting only the current-turn player.
    pub fn vote_kick(&mut self, voter: &str, target: &str) -> Result<VoteKickResult, LobbyError> {
        let game = self.game.as_ref().ok_or(LobbyError::NoGame)?;
        if game.current_player_name().as_deref() != Some(target) {
            return Err(LobbyError::InvalidSetting);
        }
        let non_bot_active = self.players.iter().filter(|p| !self.bots.contains(*p)).count();
        if self.kick_target.as_deref() != Some(target) {
            self.kick_target = Some(target.to_string());
            self.kick_votes.clear();
            self.kick_deadline = Some(Instant::now() + KICK_INITIAL);
        }
        self.kick_votes.insert(voter.to_string());
        if self.kick_votes.len() >= 2 {
            let clamp_to = Instant::now() + KICK_CLAMPED;
            if self.kick_deadline.map(|d| d > clamp_to).unwrap_or(false) {
                self.kick_deadline = Some(clamp_to);
            }
        }
        let threshold = non_bot_active / 2;
        if self.kick_votes.len() > threshold {
            self.apply_kick(target);
            return Ok(VoteKickResult::Kicked);
        }
        Ok(VoteKickResult::Registered)
    }

    pub fn apply_kick(&mut self, target: &str) {
        if let Some(game) = self.game.as_mut() {
            let _ = game.bankrupt(target);
        }
        self.players.retain(|p| p != target);
        self.kick_target = None;
        self.kick_deadline = None;
        self.kick_votes.clear();
    }

    /// A successful `end_turn` cancels any vote targeting that player.
    pub fn cancel_kick_if_target(&mut self, name: &str) {
        if self.kick_target.as_deref() == Some(name) {
            self.kick_target = None;
            self.kick_deadline = None;
            self.kick_votes.clear();
        }
    }

    pub fn chat_send(&mut self, from: &str, message: &str) -> ChatMessage {
        let msg = ChatMessage { from: from.to_string(), message: message.to_string() };
        self.chat.push_back(msg.clone());
        if self.chat.len() > CHAT_CAP {
            self.chat.pop_front();
        }
        msg
    }

    pub fn bot_add(&mut self, conn: ConnId, name: Option<String>) -> Result<String, LobbyError> {
        if self.game.is_some() {
            return Err(LobbyError::AlreadyInGame);
        }
        if !self.is_host(conn) {
            return Err(LobbyError::NotHost);
        }
        let name = name.unwrap_or_else(|| {
            self.next_bot += 1;
            format!("Bot-{}", self.next_bot)
        });
        if !self.players.contains(&name) {
            self.players.push(name.clone());
        }
        self.bots.insert(name.clone());
        Ok(name)
    }

    pub fn bot_remove(&mut self, conn: ConnId, name: &str) -> Result<(), LobbyError> {
        if self.game.is_some() {
            return Err(LobbyError::AlreadyInGame);
        }
        if !self.is_host(conn) {
            return Err(LobbyError::NotHost);
        }
        self.bots.remove(name);
        self.players.retain(|p| p != name);
        Ok(())
    }

    pub fn reset(&mut self, conn: ConnId) -> Result<(), LobbyError> {
        if !self.is_host(conn) {
            return Err(LobbyError::NotHost);
        }
        self.game = None;
        self.kick_target = None;
        self.kick_deadline = None;
        self.kick_votes.clear();
        self.disconnect_deadlines.clear();
        self.ready.clear();
        Ok(())
    }

    pub fn players_info(&self) -> Vec<PlayerInfo> {
        let host_name = self.host.and_then(|c| self.connection_to_name.get(&c));
        self.players
            .iter()
            .map(|name| PlayerInfo {
                name: name.clone(),
                is_bot: self.bots.contains(name),
                is_host: host_name == Some(name),
                ready: self.ready.contains(name),
                color: self.colors.get(name).cloned(),
            })
            .collect()
    }

    pub fn summary(&self) -> LobbySummary {
        LobbySummary {
            id: self.id.clone(),
            name: self.name.clone(),
            player_count: self.players.len(),
            in_game: self.game.is_some(),
        }
    }

    pub fn snapshot(&self) -> LobbyState {
        LobbyState {
            id: self.id.clone(),
            name: self.name.clone(),
            players: self.players_info(),
            starting_cash: self.starting_cash,
            in_game: self.game.is_some(),
            kick_target: self.kick_target.clone(),
            kick_votes: self.kick_votes.len(),
        }
    }

    pub fn is_empty_pregame(&self) -> bool {
        self.game.is_none() && self.players.is_empty()
    }

    pub fn is_finished_and_empty(&self) -> bool {
        self.game.as_ref().map(|g| g.game_over.is_some()).unwrap_or(false) && self.players.is_empty()
    }
}

fn is_valid_hex_color(s: &str) -> bool {
    let rest = match s.strip_prefix('#') {
        Some(r) => r,
        None => return false,
    };
    matches!(rest.len(), 3 | 6) && rest.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_rejects_live_name_collision() {
        let mut lobby = Lobby::new("l1".into(), "room".into());
        let c1 = Uuid::new_v4();
        let c2 = Uuid::new_v4();
        lobby.join(c1, "Alice", None).unwrap();
        assert_eq!(lobby.join(c2, "Alice", None).unwrap_err(), LobbyError::NameTaken);
    }

    #[test]
    fn join_recovers_name_via_client_id() {
        let mut lobby = Lobby::new("l1".into(), "room".into());
        let c1 = Uuid::new_v4();
        lobby.join(c1, "Alice", Some("device-1")).unwrap();
        lobby.leave(c1);
        let c2 = Uuid::new_v4();
        let name = lobby.join(c2, "Someone Else", Some("device-1")).unwrap();
        assert_eq!(name, "Alice");
    }

    #[test]
    fn start_game_requires_all_non_bot_ready() {
        let mut lobby = Lobby::new("l1".into(), "room".into());
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        lobby.join(host, "Host", None).unwrap();
        lobby.join(guest, "Guest", None).unwrap();
        lobby.set_ready(host, true);
        assert_eq!(lobby.start_game(host).unwrap_err(), LobbyError::NotAllReady);
        lobby.set_ready(guest, true);
        assert!(lobby.start_game(host).is_ok());
        assert!(lobby.game.is_some());
    }

    #[test]
    fn vote_kick_requires_majority_of_non_bots() {
        let mut lobby = Lobby::new("l1".into(), "room".into());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        lobby.join(a, "A", None).unwrap();
        lobby.join(b, "B", None).unwrap();
        lobby.join(c, "C", None).unwrap();
        lobby.set_ready(a, true);
        lobby.set_ready(b, true);
        lobby.set_ready(c, true);
        lobby.start_game(a).unwrap();
        // current player is "A"
        assert_eq!(lobby.vote_kick("B", "A").unwrap(), VoteKickResult::Registered);
        assert_eq!(lobby.vote_kick("C", "A").unwrap(), VoteKickResult::Kicked);
    }
}
