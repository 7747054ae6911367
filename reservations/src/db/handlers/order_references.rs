//! Database repository for the reservation → remote order links.

use crate::{
    db::{errors::Result, models::order_references::OrderReferenceDBResponse},
    types::ReservationId,
};
use sqlx::PgConnection;
use tracing::instrument;

pub struct OrderReferences<'c> {
    db: &'c mut PgConnection,
}

impl<'c> OrderReferences<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Block until no other transaction holds the attach lock for this reservation. The lock is
    /// released when the surrounding transaction ends.
    #[instrument(skip(self), err)]
    pub async fn lock_reservation(&mut self, reservation_id: ReservationId) -> Result<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext('reservation_has_order'), $1)")
            .bind(reservation_id)
            .execute(&mut *self.db)
            .await?;

        Ok(())
    }

    #[instrument(skip(self), err)]
    pub async fn create(&mut self, reservation_id: ReservationId, order_uri: &str) -> Result<OrderReferenceDBResponse> {
        let reference = sqlx::query_as::<_, OrderReferenceDBResponse>(
            r#"
            INSERT INTO reservation_has_order (reservation_id, order_uri)
            VALUES ($1, $2)
            RETURNING id, reservation_id, order_uri
            "#,
        )
        .bind(reservation_id)
        .bind(order_uri)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(reference)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_reservation(&mut self, reservation_id: ReservationId) -> Result<Option<OrderReferenceDBResponse>> {
        let reference = sqlx::query_as::<_, OrderReferenceDBResponse>(
            "SELECT id, reservation_id, order_uri FROM reservation_has_order WHERE reservation_id = $1",
        )
        .bind(reservation_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(reference)
    }
}
