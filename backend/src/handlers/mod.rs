//! HTTP request handlers

pub mod auth;
pub mod health;
pub mod inbound;
pub mod inventory;
pub mod outbound;
pub mod plate;
pub mod statistics;
pub mod task;
pub mod user;

pub use auth::*;
pub use health::*;
pub use inbound::*;
pub use inventory::*;
pub use outbound::*;
pub use plate::*;
pub use statistics::*;
pub use task::*;
pub use user::*;
