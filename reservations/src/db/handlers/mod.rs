pub mod order_references;
pub mod reservations;
pub mod tables;

pub use order_references::OrderReferences;
pub use reservations::Reservations;
pub use tables::Tables;
