//! Process-wide lobby table plus the background sweep/disconnect/kick timers (§5).

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::Mutex;

use crate::events::ServerEvent;
use crate::lobby::model::{Lobby, LobbySummary};
use crate::ws::hub::Hub;

const SWEEP_INTERVAL: Duration = Duration::from_secs(20);
const EMPTY_GRACE: Duration = Duration::from_secs(5);
const DISCONNECT_GRACE: Duration = Duration::from_secs(120);

pub struct LobbyRegistry {
    lobbies: Mutex<std::collections::HashMap<String, Arc<Mutex<Lobby>>>>,
    hub: Arc<Hub>,
}

impl LobbyRegistry {
    pub fn new(hub: Arc<Hub>) -> Arc<Self> {
        Arc::new(Self { lobbies: Mutex::new(std::collections::HashMap::new()), hub })
    }

    pub async fn create_lobby(&self, name: String) -> (String, Arc<Mutex<Lobby>>) {
        let mut map = self.lobbies.lock().await;
        let id = loop {
            let candidate = format!("l{}", rand::thread_rng().gen_range(1000..=9999));
            if !map.contains_key(&candidate) {
                break candidate;
            }
        };
        let lobby = Arc::new(Mutex::new(Lobby::new(id.clone(), name)));
        map.insert(id.clone(), lobby.clone());
        (id, lobby)
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Mutex<Lobby>>> {
        self.lobbies.lock().await.get(id).cloned()
    }

    pub async fn remove(&self, id: &str) -> Option<Arc<Mutex<Lobby>>> {
        self.lobbies.lock().await.remove(id)
    }

    pub async fn list_summaries(&self) -> Vec<LobbySummary> {
        let map = self.lobbies.lock().await;
        let mut out = Vec::with_capacity(map.len());
        for lobby in map.values() {
            let l = lobby.lock().await;
            if l.game.is_none() && !l.players.is_empty() {
                out.push(l.summary());
            }
        }
        out
    }

    pub async fn broadcast_room(&self, lobby: &Lobby, event: ServerEvent) {
        for conn in lobby.connection_to_name.keys() {
            self.hub.send_to(conn, event.clone()).await;
        }
    }

    pub async fn broadcast_lobby_list(&self) {
        let lobbies = self.list_summaries().await;
        self.hub.broadcast_all(ServerEvent::LobbyList { lobbies }).await;
    }

    pub fn spawn_background_tasks(self: &Arc<Self>) {
        let registry = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(SWEEP_INTERVAL).await;
                registry.run_consistency_sweep().await;
            }
        });
    }

    async fn run_consistency_sweep(&self) {
        let ids: Vec<String> = self.lobbies.lock().await.keys().cloned().collect();
        let mut changed = false;
        for id in ids {
            let Some(lobby_arc) = self.get(&id).await else { continue };
            let remove_this;
            {
                let mut lobby = lobby_arc.lock().await;
                let before = lobby.players.clone();
                let mut seen = HashSet::new();
                let mut rebuilt: Vec<String> = Vec::new();
                for name in lobby.connection_to_name.values() {
                    if seen.insert(name.clone()) {
                        rebuilt.push(name.clone());
                    }
                }
                for name in lobby.bots.clone() {
                    if seen.insert(name.clone()) {
                        rebuilt.push(name);
                    }
                }
                if lobby.game.is_some() {
                    for name in &before {
                        if !seen.contains(name) && lobby.disconnect_deadlines.contains_key(name) {
                            seen.insert(name.clone());
                            rebuilt.push(name.clone());
                        }
                    }
                }
                if rebuilt != before {
                    lobby.players = rebuilt;
                    changed = true;
                }
                remove_this = lobby.is_empty_pregame() || lobby.is_finished_and_empty();
            }
            if remove_this {
                self.remove(&id).await;
                changed = true;
            }
        }
        if changed {
            self.broadcast_lobby_list().await;
        }
    }

    /// Schedule deletion of a lobby with no players and no game, `EMPTY_GRACE` from now.
    pub fn schedule_empty_grace(self: &Arc<Self>, lobby_id: String) {
        let registry = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(EMPTY_GRACE).await;
            let Some(lobby_arc) = registry.get(&lobby_id).await else { return };
            let empty = {
                let lobby = lobby_arc.lock().await;
                lobby.is_empty_pregame()
            };
            if empty {
                registry.remove(&lobby_id).await;
                registry.broadcast_lobby_list().await;
            }
        });
    }

    pub fn schedule_disconnect_timeout(self: &Arc<Self>, lobby_id: String, name: String) {
        let registry = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(DISCONNECT_GRACE).await;
            registry.run_disconnect_timeout(&lobby_id, &name).await;
        });
    }

    async fn run_disconnect_timeout(&self, lobby_id: &str, name: &str) {
        let Some(lobby_arc) = self.get(lobby_id).await else { return };
        let mut lobby = lobby_arc.lock().await;
        let Some(&deadline) = lobby.disconnect_deadlines.get(name) else { return };
        if Instant::now() < deadline {
            return;
        }
        if lobby.connection_to_name.values().any(|n| n == name) {
            return;
        }
        lobby.disconnect_deadlines.remove(name);
        let mut new_len = 0;
        if let Some(game) = lobby.game.as_mut() {
            let _ = game.bankrupt(name);
            new_len = game.players.len();
        }
        lobby.players.retain(|p| p != name);
        let _ = new_len;
        let event = lobby.game.as_ref().map(|g| {
            ServerEvent::GameState { lobby_id: lobby_id.to_string(), snapshot: Box::new(g.snapshot()) }
        });
        if let Some(event) = event {
            self.broadcast_room(&lobby, event).await;
        }
    }

    pub fn schedule_kick_timer(self: &Arc<Self>, lobby_id: String, target: String, deadline: Instant) {
        let registry = self.clone();
        tokio::spawn(async move {
            let now = Instant::now();
            if deadline > now {
                tokio::time::sleep(deadline - now).await;
            }
            registry.run_kick_timer(&lobby_id, &target, deadline).await;
        });
    }

    async fn run_kick_timer(&self, lobby_id: &str, target: &str, expected_deadline: Instant) {
        let Some(lobby_arc) = self.get(lobby_id).await else { return };
        let mut lobby = lobby_arc.lock().await;
        if lobby.kick_target.as_deref() != Some(target) {
            return;
        }
        if lobby.kick_deadline != Some(expected_deadline) {
            return;
        }
        let should_kick = match lobby.game.as_ref() {
            Some(game) => game.current_player_name().as_deref() == Some(target) && !game.rolled_this_turn,
            None => false,
        };
        if should_kick {
            lobby.apply_kick(target);
            let event = lobby.game.as_ref().map(|g| {
                ServerEvent::GameState { lobby_id: lobby_id.to_string(), snapshot: Box::new(g.snapshot()) }
            });
            if let Some(event) = event {
                self.broadcast_room(&lobby, event).await;
            }
        }
    }
}
