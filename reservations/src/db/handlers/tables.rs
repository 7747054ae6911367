//! Database repository for tables, including the free-table search used by scheduling.

use crate::{
    config::TableSeed,
    db::{errors::Result, models::tables::TableDBResponse},
    scheduling::window::TimeWindow,
    types::ReservationId,
};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Tables<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Tables<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Tables seating at least `guests` with no booking intersecting `window`, by ascending id.
    ///
    /// `exclude` leaves one reservation out of the collision check so a booking being updated
    /// does not block itself. An empty result means "nothing free", not an error.
    #[instrument(skip(self), err)]
    pub async fn free_tables(
        &mut self,
        guests: i32,
        window: &TimeWindow,
        exclude: Option<ReservationId>,
    ) -> Result<Vec<TableDBResponse>> {
        let tables = sqlx::query_as::<_, TableDBResponse>(
            r#"
            SELECT t.id, t.number, t.capacity
            FROM tables t
            WHERE t.capacity >= $1
              AND NOT EXISTS (
                SELECT 1
                FROM reservations r
                WHERE r.table_id = t.id
                  AND r.start <= $3
                  AND r."end" >= $2
                  AND ($4::int4 IS NULL OR r.id <> $4)
              )
            ORDER BY t.id ASC
            "#,
        )
        .bind(guests)
        .bind(window.start())
        .bind(window.end())
        .bind(exclude)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(tables)
    }

    #[cfg(test)]
    #[instrument(skip(self), err)]
    pub async fn list(&mut self) -> Result<Vec<TableDBResponse>> {
        let tables = sqlx::query_as::<_, TableDBResponse>("SELECT id, number, capacity FROM tables ORDER BY id ASC")
            .fetch_all(&mut *self.db)
            .await?;

        Ok(tables)
    }

    /// Insert the floor plan, but only into an empty `tables` relation. Returns rows added.
    #[instrument(skip(self, floor_plan), fields(count = floor_plan.len()), err)]
    pub async fn seed(&mut self, floor_plan: &[TableSeed]) -> Result<u64> {
        if floor_plan.is_empty() {
            return Ok(0);
        }

        let numbers: Vec<i32> = floor_plan.iter().map(|t| t.number).collect();
        let capacities: Vec<i32> = floor_plan.iter().map(|t| t.capacity).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO tables (number, capacity)
            SELECT number, capacity FROM UNNEST($1::int4[], $2::int4[]) AS plan(number, capacity)
            WHERE NOT EXISTS (SELECT 1 FROM tables)
            "#,
        )
        .bind(&numbers)
        .bind(&capacities)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected())
    }
}
