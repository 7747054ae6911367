pub mod orders;

use crate::errors::{Error, Result};

/// Parse a path id: a decimal integer of at least 1.
pub fn parse_id(raw: &str) -> Result<i32> {
    match raw.trim().parse::<i32>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(Error::BadRequest {
            message: format!("Invalid id '{raw}': expected a positive integer"),
        }),
    }
}
