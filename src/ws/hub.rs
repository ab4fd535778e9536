//! Connection registry and the per-socket event loop (C9).

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::api::AppState;
use crate::events::{ClientEvent, ServerEvent};
use crate::game::{Game, GameEngine};
use crate::lobby::model::{ConnId, LobbyError, VoteKickResult};

/// Registry of live connections, keyed by a per-socket id independent of any
/// lobby membership (generalized from the teacher's per-room `Hub` to a
/// single multiplexed endpoint).
pub struct Hub {
    connections: Mutex<HashMap<ConnId, mpsc::UnboundedSender<ServerEvent>>>,
}

impl Hub {
    pub fn new() -> Self {
        Self { connections: Mutex::new(HashMap::new()) }
    }

    pub async fn register(&self, id: ConnId, tx: mpsc::UnboundedSender<ServerEvent>) {
        self.connections.lock().await.insert(id, tx);
    }

    pub async fn unregister(&self, id: &ConnId) {
        self.connections.lock().await.remove(id);
    }

    pub async fn send_to(&self, id: &ConnId, event: ServerEvent) {
        if let Some(tx) = self.connections.lock().await.get(id) {
            let _ = tx.send(event);
        }
    }

    pub async fn broadcast_all(&self, event: ServerEvent) {
        for tx in self.connections.lock().await.values() {
            let _ = tx.send(event.clone());
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle a single WebSocket connection for its entire lifetime.
pub async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let conn_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    state.hub.register(conn_id, tx).await;

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let msg = match serde_json::to_string(&event) {
                Ok(m) => m,
                Err(_) => continue,
            };
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    let mut display: Option<String> = None;
    let mut client_id: Option<String> = None;
    let mut current_lobby: Option<String> = None;

    while let Some(Ok(msg)) = receiver.next().await {
        let Message::Text(text) = msg else { continue };
        let event = match serde_json::from_str::<ClientEvent>(&text) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("bad client event: {e}");
                continue;
            }
        };
        dispatch(&state, conn_id, &mut display, &mut client_id, &mut current_lobby, event).await;
    }

    if let Some(lobby_id) = current_lobby {
        on_disconnect(&state, conn_id, &lobby_id).await;
    }
    state.hub.unregister(&conn_id).await;
    send_task.abort();
}

async fn on_disconnect(state: &AppState, conn: ConnId, lobby_id: &str) {
    let Some(lobby_arc) = state.registry.get(lobby_id).await else { return };
    let mut lobby = lobby_arc.lock().await;
    let Some(name) = lobby.leave(conn) else { return };
    if lobby.game.is_some() {
        lobby
            .disconnect_deadlines
            .insert(name.clone(), std::time::Instant::now() + std::time::Duration::from_secs(120));
        state.registry.schedule_disconnect_timeout(lobby_id.to_string(), name);
        state.registry.broadcast_room(&lobby, game_state_event(lobby_id, &lobby)).await;
    } else {
        let empty = lobby.is_empty_pregame();
        drop(lobby);
        if empty {
            state.registry.schedule_empty_grace(lobby_id.to_string());
        }
        state.registry.broadcast_lobby_list().await;
    }
}

fn game_state_event(lobby_id: &str, lobby: &crate::lobby::model::Lobby) -> ServerEvent {
    let snapshot = lobby.game.as_ref().map(|g| g.snapshot()).unwrap_or_else(|| Game::default().snapshot());
    ServerEvent::GameState { lobby_id: lobby_id.to_string(), snapshot: Box::new(snapshot) }
}

async fn dispatch(
    state: &AppState,
    conn: ConnId,
    display: &mut Option<String>,
    client_id: &mut Option<String>,
    current_lobby: &mut Option<String>,
    event: ClientEvent,
) {
    match event {
        ClientEvent::Auth { display: d, client_id: cid } => {
            *display = Some(d);
            *client_id = cid;
        }
        ClientEvent::LobbyList => {
            let lobbies = state.registry.list_summaries().await;
            state.hub.send_to(&conn, ServerEvent::LobbyList { lobbies }).await;
        }
        ClientEvent::LobbyCreate { name } => {
            let (id, lobby_arc) = state.registry.create_lobby(name).await;
            state.hub.broadcast_all(ServerEvent::LobbyCreated { id: id.clone() }).await;
            let player_name = display.clone().unwrap_or_else(|| format!("Player-{}", &conn.to_string()[..4]));
            let mut lobby = lobby_arc.lock().await;
            let _ = lobby.join(conn, &player_name, client_id.as_deref());
            *current_lobby = Some(id.clone());
            state.hub.send_to(&conn, ServerEvent::LobbyJoined { id: id.clone() }).await;
            state
                .registry
                .broadcast_room(&lobby, ServerEvent::LobbyState { id: id.clone(), state: lobby.snapshot() })
                .await;
        }
        ClientEvent::LobbyJoin { id } => {
            let Some(lobby_arc) = state.registry.get(&id).await else {
                state.hub.send_to(&conn, ServerEvent::Error { message: "not_found".into() }).await;
                return;
            };
            let player_name = display.clone().unwrap_or_else(|| format!("Player-{}", &conn.to_string()[..4]));
            let mut lobby = lobby_arc.lock().await;
            match lobby.join(conn, &player_name, client_id.as_deref()) {
                Ok(name) => {
                    *display = Some(name);
                    *current_lobby = Some(id.clone());
                    state.hub.send_to(&conn, ServerEvent::LobbyJoined { id: id.clone() }).await;
                    if lobby.game.is_some() {
                        state.hub.send_to(&conn, game_state_event(&id, &lobby)).await;
                    }
                    state
                        .registry
                        .broadcast_room(&lobby, ServerEvent::LobbyState { id: id.clone(), state: lobby.snapshot() })
                        .await;
                    drop(lobby);
                    state.registry.broadcast_lobby_list().await;
                }
                Err(LobbyError::NameTaken) => {
                    state
                        .hub
                        .send_to(&conn, ServerEvent::Error { message: format!("name '{player_name}' is already taken") })
                        .await;
                }
                Err(_) => {
                    state.hub.send_to(&conn, ServerEvent::Error { message: "join_failed".into() }).await;
                }
            }
        }
        ClientEvent::LeaveLobby { id } => {
            if let Some(lobby_arc) = state.registry.get(&id).await {
                let mut lobby = lobby_arc.lock().await;
                lobby.leave(conn);
                let empty = lobby.is_empty_pregame();
                state
                    .registry
                    .broadcast_room(&lobby, ServerEvent::LobbyState { id: id.clone(), state: lobby.snapshot() })
                    .await;
                drop(lobby);
                if empty {
                    state.registry.schedule_empty_grace(id.clone());
                }
                state.registry.broadcast_lobby_list().await;
            }
            *current_lobby = None;
        }
        ClientEvent::LobbyReady { id, ready } => {
            with_lobby_broadcast(state, &id, |lobby| {
                lobby.set_ready(conn, ready);
            })
            .await;
        }
        ClientEvent::LobbySetting { id, setting, value } => {
            with_lobby_result(state, &id, conn, |lobby| lobby.set_setting(conn, &setting, &value)).await;
        }
        ClientEvent::LobbyStart { id } => {
            with_lobby_result(state, &id, conn, |lobby| lobby.start_game(conn)).await;
            if let Some(lobby_arc) = state.registry.get(&id).await {
                let has_bots = {
                    let lobby = lobby_arc.lock().await;
                    lobby.game.is_some() && !lobby.bots.is_empty()
                };
                if has_bots {
                    crate::bot::driver::ensure_running(state.bot_driver.clone(), state.clone(), id.clone());
                }
            }
        }
        ClientEvent::LobbyReset { id } => {
            with_lobby_result(state, &id, conn, |lobby| lobby.reset(conn)).await;
        }
        ClientEvent::LobbyRematch { id } => {
            rematch(state, conn, &id).await;
        }
        ClientEvent::VoteKick { id, target } => {
            vote_kick(state, conn, &id, &target).await;
        }
        ClientEvent::ChatSend { id, message } => {
            if let Some(lobby_arc) = state.registry.get(&id).await {
                let mut lobby = lobby_arc.lock().await;
                if let Some(name) = lobby.connection_to_name.get(&conn).cloned() {
                    let msg = lobby.chat_send(&name, &message);
                    state
                        .registry
                        .broadcast_room(&lobby, ServerEvent::LobbyChat { id: id.clone(), message: msg.clone() })
                        .await;
                    state
                        .registry
                        .broadcast_room(&lobby, ServerEvent::ChatMessage { id: id.clone(), message: msg })
                        .await;
                }
            }
        }
        ClientEvent::BotAdd { id, name } => {
            with_lobby_result(state, &id, conn, |lobby| lobby.bot_add(conn, name.clone()).map(|_| ())).await;
        }
        ClientEvent::BotRemove { id, name } => {
            with_lobby_result(state, &id, conn, |lobby| lobby.bot_remove(conn, &name)).await;
        }
        ClientEvent::GetPlayers { id } => {
            if let Some(lobby_arc) = state.registry.get(&id).await {
                let lobby = lobby_arc.lock().await;
                state
                    .hub
                    .send_to(&conn, ServerEvent::PlayersList { id: id.clone(), players: lobby.players_info() })
                    .await;
            }
        }
        ClientEvent::GameAction { id, action } => {
            game_action(state, conn, &id, action).await;
        }
    }
}

async fn with_lobby_broadcast(state: &AppState, id: &str, f: impl FnOnce(&mut crate::lobby::model::Lobby)) {
    let Some(lobby_arc) = state.registry.get(id).await else { return };
    let mut lobby = lobby_arc.lock().await;
    f(&mut lobby);
    state
        .registry
        .broadcast_room(&lobby, ServerEvent::LobbyState { id: id.to_string(), state: lobby.snapshot() })
        .await;
}

async fn with_lobby_result(
    state: &AppState,
    id: &str,
    conn: ConnId,
    f: impl FnOnce(&mut crate::lobby::model::Lobby) -> Result<(), LobbyError>,
) {
    let Some(lobby_arc) = state.registry.get(id).await else { return };
    let mut lobby = lobby_arc.lock().await;
    match f(&mut lobby) {
        Ok(()) => {
            if lobby.game.is_some() {
                state.registry.broadcast_room(&lobby, game_state_event(id, &lobby)).await;
            }
            state
                .registry
                .broadcast_room(&lobby, ServerEvent::LobbyState { id: id.to_string(), state: lobby.snapshot() })
                .await;
        }
        Err(e) => {
            state.hub.send_to(&conn, ServerEvent::Error { message: format!("{e:?}") }).await;
        }
    }
}

async fn vote_kick(state: &AppState, conn: ConnId, id: &str, target: &str) {
    let Some(lobby_arc) = state.registry.get(id).await else { return };
    let mut lobby = lobby_arc.lock().await;
    if lobby.game.is_some() {
        let Some(name) = lobby.connection_to_name.get(&conn).cloned() else { return };
        match lobby.vote_kick(&name, target) {
            Ok(VoteKickResult::Registered) => {
                if let Some(deadline) = lobby.kick_deadline {
                    state.registry.schedule_kick_timer(id.to_string(), target.to_string(), deadline);
                }
            }
            Ok(VoteKickResult::Kicked) => {
                state.registry.broadcast_room(&lobby, game_state_event(id, &lobby)).await;
            }
            Err(_) => {}
        }
        state
            .registry
            .broadcast_room(&lobby, ServerEvent::LobbyState { id: id.to_string(), state: lobby.snapshot() })
            .await;
    } else {
        let _ = lobby.host_remove(conn, target);
        state
            .registry
            .broadcast_room(&lobby, ServerEvent::LobbyState { id: id.to_string(), state: lobby.snapshot() })
            .await;
    }
}

async fn rematch(state: &AppState, conn: ConnId, id: &str) {
    let Some(old_arc) = state.registry.get(id).await else { return };
    let (name, players, bots, colors, starting_cash, connections) = {
        let lobby = old_arc.lock().await;
        if !lobby.is_host(conn) {
            return;
        }
        (
            lobby.name.clone(),
            lobby.players.clone(),
            lobby.bots.clone(),
            lobby.colors.clone(),
            lobby.starting_cash,
            lobby.connection_to_name.clone(),
        )
    };
    let (new_id, new_arc) = state.registry.create_lobby(name).await;
    {
        let mut new_lobby = new_arc.lock().await;
        new_lobby.players = players;
        new_lobby.bots = bots;
        new_lobby.colors = colors;
        new_lobby.starting_cash = starting_cash;
        for (c, n) in &connections {
            new_lobby.connection_to_name.insert(*c, n.clone());
        }
        new_lobby.host = Some(conn);
        for c in connections.keys() {
            state.hub.send_to(c, ServerEvent::LobbyJoined { id: new_id.clone() }).await;
        }
        state
            .registry
            .broadcast_room(&new_lobby, ServerEvent::LobbyState { id: new_id.clone(), state: new_lobby.snapshot() })
            .await;
    }
    state.registry.remove(id).await;
    state.hub.broadcast_all(ServerEvent::LobbyDeleted { id: id.to_string() }).await;
    state.registry.broadcast_lobby_list().await;
}

async fn game_action(state: &AppState, conn: ConnId, id: &str, action: crate::game::events::GameAction) {
    let Some(lobby_arc) = state.registry.get(id).await else { return };
    let mut lobby = lobby_arc.lock().await;
    let Some(actor) = lobby.connection_to_name.get(&conn).cloned() else { return };
    let is_end_turn = matches!(action, crate::game::events::GameAction::EndTurn);
    let Some(game) = lobby.game.as_mut() else {
        state.hub.send_to(&conn, ServerEvent::Error { message: "no_game".into() }).await;
        return;
    };
    match GameEngine::apply(game, &actor, action) {
        Ok(sound) => {
            if is_end_turn {
                lobby.cancel_kick_if_target(&actor);
            }
            if let Some(sound) = sound {
                state.registry.broadcast_room(&lobby, ServerEvent::Sound { event: sound }).await;
            }
            state.registry.broadcast_room(&lobby, game_state_event(id, &lobby)).await;
        }
        Err(reason) => {
            state.hub.send_to(&conn, ServerEvent::Error { message: reason }).await;
        }
    }
}
