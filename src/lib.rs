//! Monop Backend
//!
//! A real-time multiplayer Monopoly-like game server built with:
//! - Axum for HTTP/WebSocket
//! - In-memory lobby/game state, no external datastore
//!
//! Architecture:
//! - `api/` - HTTP handlers and routes
//! - `ws/` - WebSocket hub and the single `/ws` event gateway
//! - `lobby/` - room lifecycle, membership, vote-kick, reconnection
//! - `game/` - core game engine and state machine
//! - `bot/` - deterministic AI for computer players

pub mod api;
pub mod bot;
pub mod events;
pub mod game;
pub mod lobby;
pub mod ws;

pub mod config;
pub mod error;
