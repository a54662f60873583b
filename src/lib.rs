//! Signup bot — registers job board users through a chat dialogue.

pub mod bot;
pub mod channels;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod registration;
