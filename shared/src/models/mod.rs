//! Domain models for the plate warehouse

mod inventory;
mod movement;
mod plate;
mod statistics;
mod task;
mod user;

pub use inventory::*;
pub use movement::*;
pub use plate::*;
pub use statistics::*;
pub use task::*;
pub use user::*;
