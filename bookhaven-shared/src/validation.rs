//! Field checks for `validator` derives that the built-in rules cannot
//! express.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use validator::ValidationError;

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Rejects empty and whitespace-only strings.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("blank", "Value cannot be blank"));
    }
    Ok(())
}

pub fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(invalid("negative", "Value cannot be negative"));
    }
    Ok(())
}

/// Greater than 0 and at most 100
pub fn percentage(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO || *value > Decimal::ONE_HUNDRED {
        return Err(invalid(
            "percentage",
            "Discount must be greater than 0 and at most 100",
        ));
    }
    Ok(())
}

/// A schedule must end strictly after it starts. The error code names the
/// offending field so struct-level failures still report one.
pub fn date_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ValidationError> {
    if start < end {
        return Ok(());
    }
    Err(invalid("end_date", "End date must be after start date"))
}
