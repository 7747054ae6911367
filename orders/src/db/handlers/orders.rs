//! Database repository for orders and their line items.

use crate::{
    db::{
        errors::Result,
        models::orders::{OrderDBResponse, OrderLineDBResponse},
    },
    types::{ItemId, OrderId},
};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Orders<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Orders<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Insert an order row plus one line item per item id.
    ///
    /// Both statements run on the connection handed to [`Orders::new`]; callers wanting
    /// all-or-nothing semantics pass a transaction.
    #[instrument(skip(self, item_ids), fields(count = item_ids.len()), err)]
    pub async fn create(&mut self, item_ids: &[ItemId]) -> Result<OrderDBResponse> {
        let order = sqlx::query_as::<_, OrderDBResponse>("INSERT INTO orders DEFAULT VALUES RETURNING id, created_at")
            .fetch_one(&mut *self.db)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO order_has_item (order_id, item_id)
            SELECT $1, item_id FROM UNNEST($2::int4[]) AS line(item_id)
            "#,
        )
        .bind(order.id)
        .bind(item_ids)
        .execute(&mut *self.db)
        .await?;

        Ok(order)
    }

    #[instrument(skip(self), err)]
    pub async fn get_by_id(&mut self, id: OrderId) -> Result<Option<OrderDBResponse>> {
        let order = sqlx::query_as::<_, OrderDBResponse>("SELECT id, created_at FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(order)
    }

    /// Line items of an order in insertion order; empty when the order does not exist
    #[instrument(skip(self), err)]
    pub async fn get_lines(&mut self, id: OrderId) -> Result<Vec<OrderLineDBResponse>> {
        let lines = sqlx::query_as::<_, OrderLineDBResponse>(
            r#"
            SELECT items.id AS item_id, items.name
            FROM order_has_item
            JOIN items ON items.id = order_has_item.item_id
            WHERE order_has_item.order_id = $1
            ORDER BY order_has_item.id ASC
            "#,
        )
        .bind(id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(lines)
    }

    #[cfg(test)]
    #[instrument(skip(self), err)]
    pub async fn count(&mut self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders").fetch_one(&mut *self.db).await?;
        Ok(count)
    }
}
