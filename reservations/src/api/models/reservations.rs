//! API request/response models for reservations.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use utoipa::ToSchema;

use crate::{
    db::models::reservations::ReservationWithTableDBResponse, scheduling::window::format_timestamp,
    types::ReservationId,
};

/// Body of create and update requests.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ReservationRequest {
    pub reservation: ReservationInput,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ReservationInput {
    /// Party size; `4.0` is accepted as `4`
    #[schema(example = 4)]
    #[serde(deserialize_with = "whole_number")]
    pub guests: i64,
    /// Start of the booking, ISO-8601 with an offset; must not be in the past
    #[schema(example = "2030-06-01T19:00:00+00:00")]
    pub time: String,
    /// Length of the booking in hours, in steps of 0.1
    #[schema(value_type = f64, example = 2.5)]
    pub duration: Decimal,
}

fn whole_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(n) = number.as_i64() {
        return Ok(n);
    }
    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() <= i32::MAX as f64 => Ok(f as i64),
        _ => Err(D::Error::custom(format!("expected a whole number, got {number}"))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TableResponse {
    pub number: i32,
    pub capacity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReservationDetails {
    pub id: ReservationId,
    pub guests: i32,
    /// UTC, rendered as `YYYY-MM-DDTHH:mm:ss+00:00`
    pub start: String,
    pub end: String,
    pub table: TableResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReservationResponse {
    pub reservation: ReservationDetails,
}

impl From<ReservationWithTableDBResponse> for ReservationResponse {
    fn from(db: ReservationWithTableDBResponse) -> Self {
        Self {
            reservation: ReservationDetails {
                id: db.id,
                guests: db.guests,
                start: format_timestamp(&db.start),
                end: format_timestamp(&db.end),
                table: TableResponse {
                    number: db.table_number,
                    capacity: db.table_capacity,
                },
            },
        }
    }
}
