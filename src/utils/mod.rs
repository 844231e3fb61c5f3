//! Common utilities and helpers

pub mod time;

pub use time::{format_position, format_volume};
