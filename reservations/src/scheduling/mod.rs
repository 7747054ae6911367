//! Reservation scheduling: request validation, booking windows and the create/read/update/delete
//! lifecycle that allocates tables without double-booking.

pub mod lifecycle;
pub mod window;

use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;

use crate::{
    config::SchedulingConfig,
    db::models::reservations::ReservationWriteDBRequest,
    errors::{Error, Result},
    types::TableId,
};
use window::{TimeWindow, parse_timestamp};

/// A validated booking request: party size plus the window it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Booking {
    pub guests: i32,
    pub window: TimeWindow,
}

impl Booking {
    pub(crate) fn write_request(&self, table_id: TableId) -> ReservationWriteDBRequest {
        ReservationWriteDBRequest {
            table_id,
            guests: self.guests,
            start: self.window.start(),
            end: self.window.end(),
        }
    }
}

fn bad_request(message: impl Into<String>) -> Error {
    Error::BadRequest { message: message.into() }
}

/// Check raw booking input against the configured bounds and turn it into a [`Booking`].
pub fn validate_booking(
    rules: &SchedulingConfig,
    guests: i64,
    time: &str,
    duration: Decimal,
    now: DateTime<Utc>,
) -> Result<Booking> {
    let guests = i32::try_from(guests)
        .ok()
        .filter(|g| (rules.min_guests..=rules.max_guests).contains(g))
        .ok_or_else(|| {
            bad_request(format!(
                "guests must be between {} and {}",
                rules.min_guests, rules.max_guests
            ))
        })?;

    let start = parse_timestamp(time)
        .map_err(|e| bad_request(format!("time must be an ISO-8601 timestamp with an offset: {e}")))?;
    if start < now.trunc_subsecs(0) {
        return Err(bad_request("time must not be in the past"));
    }

    if duration < rules.min_duration || duration > rules.max_duration {
        return Err(bad_request(format!(
            "duration must be between {} and {} hours",
            rules.min_duration, rules.max_duration
        )));
    }
    if duration.normalize().scale() > 1 {
        return Err(bad_request("duration must be a multiple of 0.1 hours"));
    }

    let window = TimeWindow::from_duration(start, duration).ok_or_else(|| bad_request("duration is out of range"))?;

    Ok(Booking { guests, window })
}
