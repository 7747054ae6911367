use crate::types::TableId;
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TableDBResponse {
    pub id: TableId,
    pub number: i32,
    pub capacity: i32,
}
