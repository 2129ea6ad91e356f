pub mod format;
pub mod player;
pub mod state;
