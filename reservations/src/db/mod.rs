//! Database layer.
//!
//! Repositories in [`handlers`] wrap a `&mut PgConnection`, so the same code runs on a pooled
//! connection or inside a transaction. Scheduling code relies on the latter: the free-table
//! lookup and the reservation write share one SERIALIZABLE transaction, and the
//! `reservations_no_overlap` exclusion constraint backs it up at the storage level.
//!
//! Migrations live in `migrations/` and are applied by [`crate::migrator`] on startup.

pub mod errors;
pub mod handlers;
pub mod models;
