//! Business logic services for the plate warehouse

pub mod auth;
pub mod inbound;
pub mod inventory;
pub mod operator;
pub mod outbound;
pub mod plate;
pub mod statistics;
pub mod task;
pub mod user;

pub use auth::AuthService;
pub use inbound::InboundService;
pub use inventory::InventoryService;
pub use outbound::OutboundService;
pub use plate::PlateService;
pub use statistics::StatisticsService;
pub use task::TaskService;
pub use user::UserService;
