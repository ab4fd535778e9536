//! Lobby & session lifecycle (C8): rooms, membership, vote-kick, reconnection.

pub mod model;
pub mod registry;

pub use model::{ConnId, Lobby};
pub use registry::LobbyRegistry;
