pub mod user;
pub mod project;
pub mod campaign_request;
pub mod payment;

pub use user::*;
pub use project::*;
pub use campaign_request::*;
pub use payment::*;

use mongodb::bson::oid::ObjectId;

use crate::utils::AppError;

/// Current time as Unix epoch milliseconds, the timestamp unit of every collection
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Longest campaign a creator may ask for, ten years
pub const MAX_CAMPAIGN_DAYS: i64 = 3650;

pub fn validate_days_left(days_left: i64) -> Result<(), AppError> {
    if days_left <= 0 {
        return Err(AppError::Validation("days_left must be greater than 0".into()));
    }
    if days_left > MAX_CAMPAIGN_DAYS {
        return Err(AppError::Validation(format!(
            "days_left cannot exceed {} days",
            MAX_CAMPAIGN_DAYS
        )));
    }
    Ok(())
}

/// Epoch millis `days_left` days after `now`
pub fn end_date_after(now: i64, days_left: i64) -> Result<i64, AppError> {
    validate_days_left(days_left)?;
    days_left
        .checked_mul(DAY_MILLIS)
        .and_then(|span| now.checked_add(span))
        .ok_or_else(|| AppError::Validation("days_left is out of range".into()))
}

pub(crate) fn hex_id(id: &Option<ObjectId>) -> String {
    id.map(|id| id.to_hex()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_date_rejects_out_of_range_durations() {
        let now = 1_700_000_000_000;
        assert_eq!(end_date_after(now, 1).unwrap(), now + DAY_MILLIS);
        assert_eq!(
            end_date_after(now, MAX_CAMPAIGN_DAYS).unwrap(),
            now + MAX_CAMPAIGN_DAYS * DAY_MILLIS
        );

        for days in [0, -3, MAX_CAMPAIGN_DAYS + 1, 9_000_000_000_000_000, i64::MAX] {
            assert!(matches!(end_date_after(now, days), Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn test_end_date_never_wraps_near_the_end_of_time() {
        assert!(end_date_after(i64::MAX - DAY_MILLIS, 2).is_err());
    }
}
