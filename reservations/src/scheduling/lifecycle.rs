//! Reservation lifecycle: create, read, update and delete on top of the table allocator.
//!
//! Create and update run the free-table lookup and the write in one SERIALIZABLE transaction.
//! Postgres aborts such a transaction whenever a concurrent one touched `reservations`, even for
//! unrelated tables or days, so an aborted attempt is retried from scratch with a jittered
//! exponential backoff. Only an empty free-table list or the exclusion constraint on
//! `reservations` is reported as a conflict.

use std::{future::Future, time::Duration};

use rand::{prelude::RngExt, rng};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info, instrument, warn};

use super::{Booking, window::format_timestamp};
use crate::{
    db::{
        errors::DbError,
        handlers::{Reservations, Tables},
        models::{
            reservations::{ReservationDBResponse, ReservationWithTableDBResponse},
            tables::TableDBResponse,
        },
    },
    errors::{Error, Result},
    types::ReservationId,
};

/// Attempts per create/update before a serialization failure is reported as internal
const MAX_ATTEMPTS: u32 = 12;
const BACKOFF_MS: u64 = 5;
const BACKOFF_FACTOR: u64 = 2;
const MAX_BACKOFF_MS: u64 = 250;

fn not_found(id: ReservationId) -> Error {
    Error::NotFound {
        resource: "Reservation".to_string(),
        id: id.to_string(),
    }
}

/// Full-jitter backoff: uniform in `1..=min(MAX_BACKOFF_MS, BACKOFF_MS * BACKOFF_FACTOR^attempt)`.
fn retry_backoff(attempt: u32) -> Duration {
    let ceiling = BACKOFF_MS
        .saturating_mul(BACKOFF_FACTOR.saturating_pow(attempt))
        .min(MAX_BACKOFF_MS);
    Duration::from_millis(rng().random_range(1..=ceiling))
}

/// Run `attempt` until it stops failing with a serialization failure, at most `MAX_ATTEMPTS` times.
async fn retry_serializable<T, F, Fut>(operation: &str, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut tries = 0;
    loop {
        tries += 1;
        match attempt().await {
            Err(Error::Database(DbError::SerializationFailure)) if tries < MAX_ATTEMPTS => {
                let backoff = retry_backoff(tries - 1);
                debug!(operation, tries, backoff_ms = backoff.as_millis() as u64, "Serialization failure, retrying");
                tokio::time::sleep(backoff).await;
            }
            Err(Error::Database(DbError::SerializationFailure)) => {
                warn!(operation, tries, "Serialization failures on every attempt, giving up");
                return Err(Error::Internal {
                    operation: operation.to_string(),
                });
            }
            other => return other,
        }
    }
}

async fn begin_serializable(db: &PgPool) -> Result<Transaction<'static, Postgres>> {
    let mut tx = db.begin().await.map_err(|e| Error::Database(e.into()))?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Database(e.into()))?;
    Ok(tx)
}

/// First free table for the booking, or a conflict when every suitable table is taken.
async fn first_free_table(
    tx: &mut Transaction<'static, Postgres>,
    booking: &Booking,
    exclude: Option<ReservationId>,
) -> Result<TableDBResponse> {
    let free = Tables::new(tx).free_tables(booking.guests, &booking.window, exclude).await?;

    free.into_iter().next().ok_or_else(|| Error::Conflict {
        message: format!(
            "No free table for {} guests between {} and {}",
            booking.guests,
            format_timestamp(&booking.window.start()),
            format_timestamp(&booking.window.end()),
        ),
    })
}

async fn try_create(db: &PgPool, booking: &Booking) -> Result<(ReservationDBResponse, TableDBResponse)> {
    let mut tx = begin_serializable(db).await?;

    let table = first_free_table(&mut tx, booking, None).await?;
    let reservation = Reservations::new(&mut tx).create(&booking.write_request(table.id)).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok((reservation, table))
}

#[instrument(skip(db), err)]
pub async fn create_reservation(db: &PgPool, booking: &Booking) -> Result<ReservationDBResponse> {
    let (reservation, table) = retry_serializable("create reservation", || try_create(db, booking)).await?;

    info!(reservation_id = reservation.id, table = table.number, "Reservation created");
    Ok(reservation)
}

#[instrument(skip(db), err)]
pub async fn get_reservation(db: &PgPool, id: ReservationId) -> Result<ReservationWithTableDBResponse> {
    let mut conn = db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    Reservations::new(&mut conn).get_with_table(id).await?.ok_or_else(|| not_found(id))
}

async fn try_update(
    db: &PgPool,
    id: ReservationId,
    booking: &Booking,
) -> Result<(ReservationDBResponse, TableDBResponse)> {
    let mut tx = begin_serializable(db).await?;

    if Reservations::new(&mut tx).get_by_id(id).await?.is_none() {
        return Err(not_found(id));
    }

    let table = first_free_table(&mut tx, booking, Some(id)).await?;
    let reservation = Reservations::new(&mut tx)
        .update(id, &booking.write_request(table.id))
        .await?
        .ok_or_else(|| not_found(id))?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;
    Ok((reservation, table))
}

/// Re-run allocation for an existing reservation. The reservation's own booking never blocks
/// it, but the first free table is chosen afresh and may differ from the current one.
#[instrument(skip(db), err)]
pub async fn update_reservation(db: &PgPool, id: ReservationId, booking: &Booking) -> Result<ReservationDBResponse> {
    let (reservation, table) = retry_serializable("update reservation", || try_update(db, id, booking)).await?;

    info!(reservation_id = id, table = table.number, "Reservation updated");
    Ok(reservation)
}

#[instrument(skip(db), err)]
pub async fn delete_reservation(db: &PgPool, id: ReservationId) -> Result<()> {
    let mut conn = db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    if Reservations::new(&mut conn).delete(id).await? {
        info!(reservation_id = id, "Reservation deleted");
        Ok(())
    } else {
        Err(not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::TableSeed, scheduling::window::TimeWindow};
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::task::JoinSet;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, h, m, 0).unwrap()
    }

    fn booking(guests: i32, from: (u32, u32), to: (u32, u32)) -> Booking {
        Booking {
            guests,
            window: TimeWindow::new(at(from.0, from.1), at(to.0, to.1)).unwrap(),
        }
    }

    async fn floor_plan(pool: &PgPool, tables: &[(i32, i32)]) {
        let plan: Vec<_> = tables.iter().map(|&(number, capacity)| TableSeed { number, capacity }).collect();
        let mut conn = pool.acquire().await.unwrap();
        Tables::new(&mut conn).seed(&plan).await.unwrap();
    }

    async fn table_number(pool: &PgPool, id: ReservationId) -> i32 {
        get_reservation(pool, id).await.unwrap().table_number
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_single_large_table_is_booked_once(pool: PgPool) {
        floor_plan(&pool, &[(1, 10)]).await;
        let evening = booking(10, (19, 0), (21, 0));

        let first = create_reservation(&pool, &evening).await.unwrap();
        assert_eq!(table_number(&pool, first.id).await, 1);

        let second = create_reservation(&pool, &evening).await;
        assert!(matches!(second, Err(Error::Conflict { .. })), "got {second:?}");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_allocation_takes_lowest_id_that_fits(pool: PgPool) {
        floor_plan(&pool, &[(1, 2), (2, 6), (3, 4)]).await;

        let party = create_reservation(&pool, &booking(4, (19, 0), (21, 0))).await.unwrap();
        assert_eq!(table_number(&pool, party.id).await, 2);

        let next = create_reservation(&pool, &booking(4, (20, 0), (22, 0))).await.unwrap();
        assert_eq!(table_number(&pool, next.id).await, 3);

        let later = create_reservation(&pool, &booking(4, (21, 1), (22, 0))).await.unwrap();
        assert_eq!(table_number(&pool, later.id).await, 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_read_returns_what_was_booked(pool: PgPool) {
        floor_plan(&pool, &[(5, 4)]).await;
        let requested = booking(3, (18, 0), (20, 18));

        let created = create_reservation(&pool, &requested).await.unwrap();
        let read = get_reservation(&pool, created.id).await.unwrap();

        assert_eq!(read.guests, 3);
        assert_eq!(read.start, requested.window.start());
        assert_eq!(read.end, requested.window.end());
        assert_eq!((read.table_number, read.table_capacity), (5, 4));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_does_not_conflict_with_itself(pool: PgPool) {
        floor_plan(&pool, &[(1, 4)]).await;
        let evening = booking(2, (19, 0), (21, 0));
        let created = create_reservation(&pool, &evening).await.unwrap();

        let same = update_reservation(&pool, created.id, &evening).await.unwrap();
        assert_eq!(same.table_id, created.table_id);

        let shifted = update_reservation(&pool, created.id, &booking(4, (20, 0), (22, 0))).await.unwrap();
        assert_eq!(shifted.guests, 4);
        assert_eq!(shifted.end, at(22, 0));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_conflicts_with_other_bookings(pool: PgPool) {
        floor_plan(&pool, &[(1, 4)]).await;
        create_reservation(&pool, &booking(2, (19, 0), (21, 0))).await.unwrap();
        let lunch = create_reservation(&pool, &booking(2, (12, 0), (13, 0))).await.unwrap();

        let result = update_reservation(&pool, lunch.id, &booking(2, (20, 0), (22, 0))).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));

        let unchanged = get_reservation(&pool, lunch.id).await.unwrap();
        assert_eq!(unchanged.start, at(12, 0));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_may_move_to_lower_table(pool: PgPool) {
        floor_plan(&pool, &[(1, 4), (2, 4)]).await;
        let blocker = create_reservation(&pool, &booking(2, (19, 0), (21, 0))).await.unwrap();
        let moved = create_reservation(&pool, &booking(2, (19, 0), (21, 0))).await.unwrap();
        assert_eq!(table_number(&pool, moved.id).await, 2);

        delete_reservation(&pool, blocker.id).await.unwrap();
        update_reservation(&pool, moved.id, &booking(2, (19, 0), (21, 0))).await.unwrap();

        assert_eq!(table_number(&pool, moved.id).await, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_missing_reservations(pool: PgPool) {
        floor_plan(&pool, &[(1, 4)]).await;
        let evening = booking(2, (19, 0), (21, 0));

        assert!(matches!(get_reservation(&pool, 404).await, Err(Error::NotFound { .. })));
        assert!(matches!(update_reservation(&pool, 404, &evening).await, Err(Error::NotFound { .. })));
        assert!(matches!(delete_reservation(&pool, 404).await, Err(Error::NotFound { .. })));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_twice(pool: PgPool) {
        floor_plan(&pool, &[(1, 4)]).await;
        let created = create_reservation(&pool, &booking(2, (19, 0), (21, 0))).await.unwrap();

        delete_reservation(&pool, created.id).await.unwrap();
        assert!(matches!(delete_reservation(&pool, created.id).await, Err(Error::NotFound { .. })));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_no_overlaps_after_mixed_operations(pool: PgPool) {
        floor_plan(&pool, &[(1, 2), (2, 4), (3, 8)]).await;

        let mut ids = Vec::new();
        for (guests, from, to) in [
            (2, (18, 0), (20, 0)),
            (2, (19, 0), (21, 0)),
            (4, (19, 30), (20, 30)),
            (2, (20, 0), (22, 0)),
            (6, (17, 0), (23, 0)),
            (1, (18, 0), (18, 30)),
        ] {
            if let Ok(reservation) = create_reservation(&pool, &booking(guests, from, to)).await {
                ids.push(reservation.id);
            }
        }
        if let Some(&first) = ids.first() {
            let _ = update_reservation(&pool, first, &booking(2, (20, 30), (21, 30))).await;
        }

        let rows: Vec<(i32, DateTime<Utc>, DateTime<Utc>)> =
            sqlx::query_as(r#"SELECT table_id, start, "end" FROM reservations"#).fetch_all(&pool).await.unwrap();
        for (i, a) in rows.iter().enumerate() {
            for b in rows.iter().skip(i + 1) {
                if a.0 == b.0 {
                    let wa = TimeWindow::new(a.1, a.2).unwrap();
                    let wb = TimeWindow::new(b.1, b.2).unwrap();
                    assert!(!wa.overlaps(&wb), "{a:?} overlaps {b:?}");
                }
            }
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_concurrent_disjoint_bookings_all_succeed(pool: PgPool) {
        let plan: Vec<_> = (1..=10).map(|n| (n, 4)).collect();
        floor_plan(&pool, &plan).await;

        let mut tasks = JoinSet::new();
        for day in 1..=10 {
            let pool = pool.clone();
            let evening = Booking {
                guests: 2,
                window: TimeWindow::new(
                    Utc.with_ymd_and_hms(2030, 7, day, 19, 0, 0).unwrap(),
                    Utc.with_ymd_and_hms(2030, 7, day, 21, 0, 0).unwrap(),
                )
                .unwrap(),
            };
            tasks.spawn(async move { create_reservation(&pool, &evening).await });
        }

        while let Some(joined) = tasks.join_next().await {
            let result = joined.unwrap();
            assert!(result.is_ok(), "got {result:?}");
        }

        let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reservations").fetch_one(&pool).await.unwrap();
        assert_eq!(stored, 10);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_concurrent_bookings_for_one_table_yield_one_winner(pool: PgPool) {
        floor_plan(&pool, &[(1, 10)]).await;

        let mut tasks = JoinSet::new();
        for _ in 0..6 {
            let pool = pool.clone();
            tasks.spawn(async move { create_reservation(&pool, &booking(8, (19, 0), (21, 0))).await });
        }

        let mut booked = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined.unwrap() {
                Ok(_) => booked += 1,
                Err(Error::Conflict { .. }) | Err(Error::Database(DbError::ExclusionViolation { .. })) => {}
                Err(other) => panic!("expected a conflict, got {other:?}"),
            }
        }
        assert_eq!(booked, 1);
    }

    #[tokio::test]
    async fn test_retry_gives_up_as_internal() {
        let calls = AtomicU32::new(0);

        let result: Result<()> = retry_serializable("create reservation", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::Database(DbError::SerializationFailure)) }
        })
        .await;

        assert!(matches!(result, Err(Error::Internal { .. })), "got {result:?}");
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_retry_stops_on_success_or_other_errors() {
        let calls = AtomicU32::new(0);
        let result = retry_serializable("update reservation", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Error::Database(DbError::SerializationFailure))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);

        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_serializable("update reservation", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::Conflict { message: "taken".to_string() }) }
        })
        .await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_retry_backoff_is_capped() {
        for attempt in 0..20 {
            let backoff = retry_backoff(attempt);
            assert!(backoff >= Duration::from_millis(1));
            assert!(backoff <= Duration::from_millis(MAX_BACKOFF_MS));
        }
    }
}
