//! Identifier aliases shared across the orders crate.

/// Primary key of an order row
pub type OrderId = i32;
/// Primary key of a catalog item
pub type ItemId = i32;
