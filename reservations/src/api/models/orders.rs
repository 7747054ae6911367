//! API request/response models for orders attached to reservations.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for attaching an order to a reservation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct OrderAttach {
    /// Distinct catalog item names, at least one
    #[schema(example = json!(["soup", "steak"]))]
    pub meals: Vec<String>,
}

/// Meal names of the attached order
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttachedOrderResponse {
    pub meals: Vec<String>,
}
