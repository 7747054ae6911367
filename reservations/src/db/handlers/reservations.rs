//! Database repository for reservations.

use crate::{
    db::{
        errors::Result,
        models::reservations::{ReservationDBResponse, ReservationWithTableDBResponse, ReservationWriteDBRequest},
    },
    types::ReservationId,
};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Reservations<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Reservations<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(table_id = request.table_id), err)]
    pub async fn create(&mut self, request: &ReservationWriteDBRequest) -> Result<ReservationDBResponse> {
        let reservation = sqlx::query_as::<_, ReservationDBResponse>(
            r#"
            INSERT INTO reservations (table_id, guests, start, "end")
            VALUES ($1, $2, $3, $4)
            RETURNING id, table_id, guests, start, "end"
            "#,
        )
        .bind(request.table_id)
        .bind(request.guests)
        .bind(request.start)
        .bind(request.end)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(reservation)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: ReservationId) -> Result<Option<ReservationDBResponse>> {
        let reservation = sqlx::query_as::<_, ReservationDBResponse>(
            r#"SELECT id, table_id, guests, start, "end" FROM reservations WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(reservation)
    }

    #[instrument(skip(self), err)]
    pub async fn get_with_table(&mut self, id: ReservationId) -> Result<Option<ReservationWithTableDBResponse>> {
        let reservation = sqlx::query_as::<_, ReservationWithTableDBResponse>(
            r#"
            SELECT r.id, r.guests, r.start, r."end", t.number AS table_number, t.capacity AS table_capacity
            FROM reservations r
            JOIN tables t ON t.id = r.table_id
            WHERE r.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(reservation)
    }

    /// Overwrite table, guests and window; `None` when the reservation does not exist.
    #[instrument(skip(self, request), fields(table_id = request.table_id), err)]
    pub async fn update(
        &mut self,
        id: ReservationId,
        request: &ReservationWriteDBRequest,
    ) -> Result<Option<ReservationDBResponse>> {
        let reservation = sqlx::query_as::<_, ReservationDBResponse>(
            r#"
            UPDATE reservations
            SET table_id = $2, guests = $3, start = $4, "end" = $5
            WHERE id = $1
            RETURNING id, table_id, guests, start, "end"
            "#,
        )
        .bind(id)
        .bind(request.table_id)
        .bind(request.guests)
        .bind(request.start)
        .bind(request.end)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(reservation)
    }

    /// Returns whether a row was removed.
    #[instrument(skip(self), err)]
    pub async fn delete(&mut self, id: ReservationId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    pub async fn exists(&mut self, id: ReservationId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM reservations WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::TableSeed, db::errors::DbError, db::handlers::Tables};
    use chrono::{DateTime, TimeZone, Utc};
    use sqlx::PgPool;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, h, 0, 0).unwrap()
    }

    async fn seed_tables(pool: &PgPool) -> Vec<i32> {
        let mut conn = pool.acquire().await.unwrap();
        let mut tables = Tables::new(&mut conn);
        tables
            .seed(&[TableSeed { number: 1, capacity: 4 }, TableSeed { number: 2, capacity: 6 }])
            .await
            .unwrap();
        tables.list().await.unwrap().into_iter().map(|t| t.id).collect()
    }

    fn request(table_id: i32, from: u32, to: u32) -> ReservationWriteDBRequest {
        ReservationWriteDBRequest {
            table_id,
            guests: 3,
            start: at(from),
            end: at(to),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_read_update_delete(pool: PgPool) {
        let tables = seed_tables(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Reservations::new(&mut conn);

        let created = repo.create(&request(tables[0], 18, 20)).await.unwrap();
        assert_eq!(created.start, at(18));
        assert!(repo.exists(created.id).await.unwrap());

        let joined = repo.get_with_table(created.id).await.unwrap().unwrap();
        assert_eq!((joined.table_number, joined.table_capacity), (1, 4));

        let updated = repo.update(created.id, &request(tables[1], 19, 21)).await.unwrap().unwrap();
        assert_eq!(updated.table_id, tables[1]);
        assert_eq!(updated.end, at(21));

        assert!(repo.delete(created.id).await.unwrap());
        assert!(!repo.delete(created.id).await.unwrap());
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        assert!(repo.update(created.id, &request(tables[0], 18, 20)).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_overlap_rejected_by_exclusion_constraint(pool: PgPool) {
        let tables = seed_tables(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Reservations::new(&mut conn);

        repo.create(&request(tables[0], 18, 20)).await.unwrap();

        let clash = repo.create(&request(tables[0], 20, 22)).await;
        assert!(matches!(clash, Err(DbError::ExclusionViolation { .. })), "got {clash:?}");

        repo.create(&request(tables[1], 18, 20)).await.unwrap();
    }
}
