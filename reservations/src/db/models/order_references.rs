use crate::types::{OrderReferenceId, ReservationId};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct OrderReferenceDBResponse {
    pub id: OrderReferenceId,
    pub reservation_id: ReservationId,
    /// Locator handed out by the Orders service, stored verbatim
    pub order_uri: String,
}
