// Application layer - Player facade

pub mod player;

pub use player::{Player, PlayerOptions};
