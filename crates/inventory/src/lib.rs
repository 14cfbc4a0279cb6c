//! Inventory domain module.
//!
//! Stock locations, per-location stock levels, the movements that change them
//! and the alerts derived from min/max thresholds. Pure domain logic (no IO,
//! no HTTP, no storage).

pub mod alert;
pub mod level;
pub mod location;
pub mod movement;

pub use alert::{AlertKind, StockAlert, alert_for};
pub use level::{StockLevel, StockLevelKey, Thresholds};
pub use location::{LocationKind, LocationPatch, NewLocation, StockLocation};
pub use movement::{MovementContext, MovementKind, MovementRequest, StockMovement};
