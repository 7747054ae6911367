//! Database record structures matching table schemas.

pub mod items;
pub mod orders;
