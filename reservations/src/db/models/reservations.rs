use crate::types::{ReservationId, TableId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Column values for an insert or a full update of a reservation
#[derive(Debug, Clone)]
pub struct ReservationWriteDBRequest {
    pub table_id: TableId,
    pub guests: i32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ReservationDBResponse {
    pub id: ReservationId,
    pub table_id: TableId,
    pub guests: i32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A reservation joined with the table it occupies
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ReservationWithTableDBResponse {
    pub id: ReservationId,
    pub guests: i32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub table_number: i32,
    pub table_capacity: i32,
}
