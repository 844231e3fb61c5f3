// Domain layer - player model, keystroke vocabulary and step rules

pub mod command;
pub mod model;
pub mod rules;
