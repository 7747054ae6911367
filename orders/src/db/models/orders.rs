use crate::types::{ItemId, OrderId};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct OrderDBResponse {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
}

/// One line item of an order, joined with its catalog entry
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct OrderLineDBResponse {
    pub item_id: ItemId,
    pub name: String,
}
