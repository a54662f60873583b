//! Bot runtime: the main loop and per-conversation dispatch.

pub mod app;
pub mod dispatcher;

pub use app::Bot;
pub use dispatcher::Dispatcher;
