//! Shared domain types for the aluminum plate warehouse.
//!
//! Holds the models, ledger rules and validation helpers used by the backend
//! server. Nothing here touches the database; the `sqlx` feature only adds
//! row and enum mappings.

pub mod error;
pub mod models;
pub mod time;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use time::*;
pub use types::*;
pub use validation::*;
