//! Attaching orders to reservations.
//!
//! Attaching is two writes in two systems: the order is created in the Orders service first, then
//! its locator is stored next to the reservation. Both happen inside one local transaction that
//! holds a per-reservation advisory lock, so a concurrent attach for the same reservation waits
//! and then sees the stored locator instead of creating a second remote order. The transaction
//! stays open for at most the Orders client timeout.
//!
//! Nothing rolls the remote order back when the local write fails; that case is logged with the
//! locator so the orphan can be found by hand.

pub mod client;

use std::collections::HashSet;

use sqlx::PgPool;
use tracing::{error, info, instrument, warn};

use crate::{
    db::{
        errors::DbError,
        handlers::{OrderReferences, Reservations},
    },
    errors::{Error, Result},
    types::ReservationId,
};
use client::{OrdersClient, OrdersClientError};

/// Same shape rules the Orders service applies, checked before any remote call.
pub fn validate_meals(meals: &[String]) -> Result<()> {
    if meals.is_empty() {
        return Err(Error::BadRequest {
            message: "meals must contain at least one item".to_string(),
        });
    }

    let mut seen = HashSet::with_capacity(meals.len());
    for meal in meals {
        if meal.trim().is_empty() {
            return Err(Error::BadRequest {
                message: "meal names cannot be empty".to_string(),
            });
        }
        if !seen.insert(meal.as_str()) {
            return Err(Error::BadRequest {
                message: format!("meal '{meal}' is listed more than once"),
            });
        }
    }

    Ok(())
}

fn reservation_not_found(id: ReservationId) -> Error {
    Error::NotFound {
        resource: "Reservation".to_string(),
        id: id.to_string(),
    }
}

fn already_attached(id: ReservationId) -> Error {
    Error::Conflict {
        message: format!("Reservation {id} already has an order"),
    }
}

/// Create an order for `meals` in the Orders service and link it to the reservation.
///
/// Returns the stored locator.
#[instrument(skip(db, orders, meals), fields(meals = meals.len()), err)]
pub async fn attach_order(
    db: &PgPool,
    orders: &dyn OrdersClient,
    reservation_id: ReservationId,
    meals: &[String],
) -> Result<String> {
    validate_meals(meals)?;

    let mut tx = db.begin().await.map_err(|e| Error::Database(e.into()))?;
    OrderReferences::new(&mut tx).lock_reservation(reservation_id).await?;

    if !Reservations::new(&mut tx).exists(reservation_id).await? {
        return Err(reservation_not_found(reservation_id));
    }
    if OrderReferences::new(&mut tx).get_by_reservation(reservation_id).await?.is_some() {
        return Err(already_attached(reservation_id));
    }

    let locator = orders.create_order(meals).await.map_err(|e| match e {
        OrdersClientError::Rejected { message, .. } => Error::BadRequest {
            message: format!("Order rejected: {message}"),
        },
        other => Error::Upstream {
            message: other.to_string(),
        },
    })?;

    let created = OrderReferences::new(&mut tx).create(reservation_id, &locator).await;
    let recorded = match created {
        Ok(_) => tx.commit().await.map_err(DbError::from),
        Err(e) => Err(e),
    };
    if let Err(e) = recorded {
        error!(
            reservation_id,
            order_uri = %locator,
            "Orphaned remote order: created in the Orders service but not linked locally: {:#}",
            e
        );
        return Err(match e {
            DbError::UniqueViolation { .. } => already_attached(reservation_id),
            _ => Error::Internal {
                operation: "record order reference".to_string(),
            },
        });
    }

    info!(reservation_id, order_uri = %locator, "Order attached");
    Ok(locator)
}

/// Meal names of the order attached to a reservation.
///
/// A reservation without an order, and any failure talking to the Orders service, both read
/// as "not found".
#[instrument(skip(db, orders), err)]
pub async fn fetch_order(db: &PgPool, orders: &dyn OrdersClient, reservation_id: ReservationId) -> Result<Vec<String>> {
    let not_found = || Error::NotFound {
        resource: "Order for reservation".to_string(),
        id: reservation_id.to_string(),
    };

    let mut conn = db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let reference = OrderReferences::new(&mut conn)
        .get_by_reservation(reservation_id)
        .await?
        .ok_or_else(not_found)?;

    match orders.get_order(&reference.order_uri).await {
        Ok(meals) => Ok(meals.into_iter().map(|meal| meal.name).collect()),
        Err(e) => {
            warn!(reservation_id, order_uri = %reference.order_uri, "Could not read attached order: {}", e);
            Err(not_found())
        }
    }
}
