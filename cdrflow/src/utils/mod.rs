//! Utility functions for identifiers and calendar handling.

pub mod timestamps;
mod uuid_utils;

pub use timestamps::{
    current_year, now_utc, report_month, run_date, today_utc, DateInputError, Timestamp,
};
pub use uuid_utils::{generate_suffix, generate_uuid, idempotency_token, NAMESPACE_SUFFIX_LEN};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uuid_is_valid() {
        let id = generate_uuid();
        assert_eq!(id.get_version_num(), 4);
    }

    #[test]
    fn test_current_year_matches_today() {
        use chrono::Datelike;
        assert_eq!(current_year(), today_utc().year());
    }
}
