//! Bot module - deterministic AI for computer players (C10)

pub mod driver;
