//! `retailpos-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod page;
pub mod period;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    CashBoxId, CashMovementId, LocationId, MovementId, PayableId, ProductId, ReceivableId, SaleId,
    SellerId, UserId,
};
pub use money::Money;
pub use page::{Page, PageRequest, paginate};
pub use period::DateRange;
pub use value_object::ValueObject;
