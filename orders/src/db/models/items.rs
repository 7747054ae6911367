use crate::types::ItemId;
use sqlx::FromRow;

/// A catalog entry a meal name resolves to
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ItemDBResponse {
    pub id: ItemId,
    pub name: String,
}
