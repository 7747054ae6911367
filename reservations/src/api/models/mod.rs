pub mod orders;
pub mod reservations;

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("7").unwrap(), 7);

        for bad in ["0", "-3", "", "seven", "2.0", "2147483648"] {
            assert!(matches!(parse_id(bad), Err(Error::BadRequest { .. })), "{bad} should be rejected");
        }
    }
}
