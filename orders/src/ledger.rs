//! Order ledger: turns a validated meal list into a persisted order.
//!
//! An order is accepted only when every meal name resolves to a catalog item. The order row and
//! all of its line items are written inside one transaction, so a failure part-way leaves no
//! trace in the database.

use std::collections::HashSet;

use crate::{
    db::{
        handlers::{Items, Orders},
        models::orders::{OrderDBResponse, OrderLineDBResponse},
    },
    errors::{Error, Result},
    types::OrderId,
};
use sqlx::PgPool;
use tracing::{info, instrument};

/// Check the shape rules on a meal list: at least one entry, no blanks, no duplicates.
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

/// Validate, resolve and persist an order.
#[instrument(skip(db, meals), fields(meals = meals.len()), err)]
pub async fn create_order(db: &PgPool, meals: &[String]) -> Result<OrderDBResponse> {
    validate_meals(meals)?;

    let mut tx = db.begin().await.map_err(|e| Error::Database(e.into()))?;

    let items = Items::new(&mut tx).find_by_names(meals).await?;
    if items.len() != meals.len() {
        let known: HashSet<&str> = items.iter().map(|i| i.name.as_str()).collect();
        let unknown: Vec<&str> = meals.iter().map(String::as_str).filter(|m| !known.contains(m)).collect();
        return Err(Error::BadRequest {
            message: format!("Unknown meals: {}", unknown.join(", ")),
        });
    }

    let item_ids: Vec<_> = items.iter().map(|i| i.id).collect();
    let order = Orders::new(&mut tx).create(&item_ids).await?;

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    info!(order_id = order.id, lines = item_ids.len(), "Order created");
    Ok(order)
}

/// Fetch the meals of an order; `None` when the order does not exist.
#[instrument(skip(db), err)]
pub async fn get_order(db: &PgPool, id: OrderId) -> Result<Option<Vec<OrderLineDBResponse>>> {
    let mut conn = db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Orders::new(&mut conn);

    if repo.get_by_id(id).await?.is_none() {
        return Ok(None);
    }
    Ok(Some(repo.get_lines(id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed_menu;

    fn meals(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    async fn order_counts(pool: &PgPool) -> (i64, i64) {
        let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders").fetch_one(pool).await.unwrap();
        let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_has_item").fetch_one(pool).await.unwrap();
        (orders, lines)
    }

    #[test]
    fn test_validate_meals() {
        assert!(validate_meals(&meals(&["soup"])).is_ok());
        assert!(validate_meals(&meals(&["soup", "steak"])).is_ok());

        assert!(matches!(validate_meals(&[]), Err(Error::BadRequest { .. })));
        assert!(matches!(validate_meals(&meals(&[""])), Err(Error::BadRequest { .. })));
        assert!(matches!(validate_meals(&meals(&["soup", "soup"])), Err(Error::BadRequest { .. })));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_order_with_known_meals(pool: PgPool) {
        seed_menu(&meals(&["soup", "steak", "pizza"]), &pool).await.unwrap();

        let order = create_order(&pool, &meals(&["soup", "steak"])).await.unwrap();

        let lines = get_order(&pool, order.id).await.unwrap().expect("order should exist");
        let mut names: Vec<_> = lines.into_iter().map(|l| l.name).collect();
        names.sort();
        assert_eq!(names, meals(&["soup", "steak"]));
        assert_eq!(order_counts(&pool).await, (1, 2));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_partial_match_persists_nothing(pool: PgPool) {
        seed_menu(&meals(&["soup", "steak"]), &pool).await.unwrap();

        let result = create_order(&pool, &meals(&["soup", "unknown-item"])).await;

        match result {
            Err(Error::BadRequest { message }) => assert!(message.contains("unknown-item")),
            other => panic!("expected BadRequest, got {other:?}"),
        }
        assert_eq!(order_counts(&pool).await, (0, 0));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_missing_order(pool: PgPool) {
        assert!(get_order(&pool, 12345).await.unwrap().is_none());
    }
}
