//! Database repository for the item catalog.

use crate::db::{errors::Result, models::items::ItemDBResponse};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Items<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Items<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Resolve meal names to catalog items. Unknown names are simply absent from the result.
    #[instrument(skip(self, names), fields(count = names.len()), err)]
    pub async fn find_by_names(&mut self, names: &[String]) -> Result<Vec<ItemDBResponse>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let items = sqlx::query_as::<_, ItemDBResponse>(
            r#"
            SELECT id, name
            FROM items
            WHERE name = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(names)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(items)
    }

    #[cfg(test)]
    #[instrument(skip(self), err)]
    pub async fn list(&mut self) -> Result<Vec<ItemDBResponse>> {
        let items = sqlx::query_as::<_, ItemDBResponse>("SELECT id, name FROM items ORDER BY id ASC")
            .fetch_all(&mut *self.db)
            .await?;

        Ok(items)
    }

    /// Insert every name not yet in the catalog, returning how many rows were added
    #[instrument(skip(self, names), fields(count = names.len()), err)]
    pub async fn insert_missing(&mut self, names: &[String]) -> Result<u64> {
        if names.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO items (name)
            SELECT name FROM UNNEST($1::varchar[]) AS seed(name)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(names)
        .execute(&mut *self.db)
        .await?;

        Ok(result.rows_affected())
    }
}
