pub mod order_references;
pub mod reservations;
pub mod tables;
