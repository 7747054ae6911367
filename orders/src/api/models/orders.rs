//! API request/response models for orders.

use crate::db::models::orders::OrderLineDBResponse;
use crate::types::ItemId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for creating an order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderCreate {
    /// Distinct catalog item names, at least one
    #[schema(example = json!(["soup", "steak"]))]
    pub meals: Vec<String>,
}

/// A single meal of an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MealResponse {
    /// Catalog item id
    pub id: ItemId,
    /// Catalog item name
    pub name: String,
}

/// Meals of an order
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub meals: Vec<MealResponse>,
}

impl From<OrderLineDBResponse> for MealResponse {
    fn from(line: OrderLineDBResponse) -> Self {
        Self {
            id: line.item_id,
            name: line.name,
        }
    }
}

impl From<Vec<OrderLineDBResponse>> for OrderResponse {
    fn from(lines: Vec<OrderLineDBResponse>) -> Self {
        Self {
            meals: lines.into_iter().map(MealResponse::from).collect(),
        }
    }
}
