//! Identifier aliases shared across layers.

pub type ReservationId = i32;
pub type TableId = i32;
pub type OrderReferenceId = i32;
