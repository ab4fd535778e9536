//! Per-lobby bot tick loop (C10). Each bot in turn just rolls, buys the tile
//! it lands on when affordable, and ends its turn — no auction bidding, no
//! personality weighting, a doubles roll ends the turn like any other.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::api::AppState;
use crate::events::ServerEvent;
use crate::game::board::get_tile;
use crate::game::{Game, RollDenyReason};

const TICK_INTERVAL: Duration = Duration::from_millis(600);

pub struct BotDriver {
    active: Mutex<HashSet<String>>,
}

impl BotDriver {
    pub fn new() -> Self {
        Self { active: Mutex::new(HashSet::new()) }
    }
}

impl Default for BotDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// Idempotently start the tick loop for `lobby_id` if it isn't already running.
pub fn ensure_running(driver: Arc<BotDriver>, state: AppState, lobby_id: String) {
    tokio::spawn(async move {
        {
            let mut active = driver.active.lock().await;
            if !active.insert(lobby_id.clone()) {
                return;
            }
        }
        run_loop(state, lobby_id.clone()).await;
        driver.active.lock().await.remove(&lobby_id);
    });
}

async fn run_loop(state: AppState, lobby_id: String) {
    loop {
        tokio::time::sleep(TICK_INTERVAL).await;
        let Some(lobby_arc) = state.registry.get(&lobby_id).await else { return };
        let mut lobby = lobby_arc.lock().await;
        let Some(actor) = lobby.game.as_ref().and_then(|g| g.current_player_name()) else { continue };
        if lobby.game.as_ref().map(|g| g.game_over.is_some()).unwrap_or(true) {
            return;
        }
        if !lobby.bots.contains(&actor) {
            continue;
        }
        let game = lobby.game.as_mut().unwrap();
        step_bot_turn(game, &actor);
        lobby.cancel_kick_if_target(&actor);
        let snapshot = lobby.game.as_ref().map(|g| g.snapshot());
        drop(lobby);
        if let Some(snapshot) = snapshot {
            state
                .registry
                .broadcast_room(
                    &*lobby_arc.lock().await,
                    ServerEvent::GameState { lobby_id: lobby_id.clone(), snapshot: Box::new(snapshot) },
                )
                .await;
        }
    }
}

/// Take one bot turn's worth of action: roll, maybe buy, end turn.
fn step_bot_turn(game: &mut Game, actor: &str) {
    match game.roll_dice(actor) {
        Ok(_) => {}
        Err(RollDenyReason::NegativeAfterRecurring) => {
            let _ = game.bankrupt(actor);
            return;
        }
        Err(_) => return,
    }

    if let Some(player) = game.get_player(actor) {
        let pos = player.position;
        let cash = player.cash;
        if let Some(tile) = get_tile(pos) {
            if tile.is_ownable() {
                let owned = game.properties.get(&pos).and_then(|p| p.owner.clone());
                if owned.is_none() && tile.price <= cash {
                    let _ = game.buy_property(actor, pos);
                }
            }
        }
    }

    game.rolls_left = 0;

    let cash = game.get_player(actor).map(|p| p.cash).unwrap_or(0);
    if cash < 0 {
        let _ = game.bankrupt(actor);
    } else {
        let _ = game.end_turn(actor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Player;

    #[test]
    fn bot_buys_affordable_unowned_tile() {
        let mut g = Game::new();
        g.players.push(Player::new("Bot-1", 1500, "#fff", true));
        g.players.push(Player::new("B", 1500, "#000", false));
        step_bot_turn(&mut g, "Bot-1");
        assert!(!g.rolled_this_turn || g.current_player_name().as_deref() == Some("B"));
    }
}
