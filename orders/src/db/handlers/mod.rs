//! Repository implementations for database access.
//!
//! Each repository wraps a `PgConnection` (or a transaction dereferenced to one) and exposes
//! strongly-typed queries returning records from [`crate::db::models`]:
//!
//! - [`Items`]: catalog lookups and startup seeding
//! - [`Orders`]: order rows and their line items

pub mod items;
pub mod orders;

pub use items::Items;
pub use orders::Orders;
