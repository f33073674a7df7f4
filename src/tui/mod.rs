pub mod app;
pub mod command_actions;
pub mod effects;
pub mod input;
pub mod modes;
pub mod msg;
pub mod render;
pub mod theme;
pub mod undo;

pub use app::{App, RunOptions, run};
pub use effects::{Request, execute};
pub use input::update;
pub use msg::Msg;
