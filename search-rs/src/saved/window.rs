//! Dashboard sliding window
//!
//! A scheduled dashboard search only surfaces entities modified since its
//! previous run. Re-running on the same day keeps the window start so that
//! same-day changes are not lost.

use chrono::{DateTime, Months, Utc};

use crate::query::QueryDescription;

/// Advance the modification window of a dashboard query to `now`
pub fn advance_window(query: &mut QueryDescription, now: DateTime<Utc>) {
    let last_to = query
        .last_modified_to
        .unwrap_or_else(|| now.checked_sub_months(Months::new(1)).unwrap_or(now));

    if last_to.date_naive() < now.date_naive() {
        query.last_modified_from = Some(last_to);
    }
    query.last_modified_to = Some(now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_first_run_opens_one_month_window() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let mut query = QueryDescription::default();

        advance_window(&mut query, now);

        assert_eq!(
            query.last_modified_from,
            Some(Utc.with_ymd_and_hms(2024, 2, 15, 9, 0, 0).unwrap())
        );
        assert_eq!(query.last_modified_to, Some(now));
    }

    #[test]
    fn test_next_day_slides_start_forward() {
        let first = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let second = first + Duration::days(1);
        let mut query = QueryDescription::default();

        advance_window(&mut query, first);
        advance_window(&mut query, second);

        assert_eq!(query.last_modified_from, Some(first));
        assert_eq!(query.last_modified_to, Some(second));
    }

    #[test]
    fn test_same_day_rerun_keeps_start() {
        let first = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 3, 15, 17, 30, 0).unwrap();
        let mut query = QueryDescription::default();

        advance_window(&mut query, first);
        let start = query.last_modified_from;
        advance_window(&mut query, later);

        assert_eq!(query.last_modified_from, start);
        assert_eq!(query.last_modified_to, Some(later));
    }
}
