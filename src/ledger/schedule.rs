//! Due-date arithmetic for recurring fixed expenses.

use chrono::{Datelike, Duration, NaiveDate};

use crate::{
    domain::{Frequency, Period},
    errors::LedgerError,
};

/// Iteration cap applied by [`catch_up`] unless configured otherwise.
pub const DEFAULT_ADVANCE_LIMIT: usize = 120;

/// Applies one period increment to `next_due`.
///
/// Month-based frequencies land on `anchor_day` (or the day of `next_due` when
/// no anchor is set), clamped to the length of the target month. `Once` and
/// calendar overflow return `next_due` unchanged.
pub fn advance(next_due: NaiveDate, frequency: Frequency, anchor_day: Option<u32>) -> NaiveDate {
    let advanced = match frequency.period() {
        Some(Period::Days(days)) => next_due.checked_add_signed(Duration::days(days)),
        Some(Period::Months(months)) => {
            let anchor = anchor_day.unwrap_or_else(|| next_due.day());
            shift_month_anchored(next_due, months, anchor)
        }
        None => None,
    };
    advanced.unwrap_or(next_due)
}

/// Advances `next_due` until it is on or after `today`.
///
/// A date already on or after `today` is returned as is, so a schedule never
/// moves backwards. Fails once `limit` advances have been spent or when an
/// advance makes no progress.
pub fn catch_up(
    next_due: NaiveDate,
    frequency: Frequency,
    anchor_day: Option<u32>,
    today: NaiveDate,
    limit: usize,
) -> Result<NaiveDate, LedgerError> {
    let mut current = next_due;
    let mut steps = 0usize;
    while current < today {
        if steps >= limit {
            return Err(LedgerError::ScheduleAdvanceLimitExceeded {
                limit,
                reached: current,
                today,
            });
        }
        let candidate = advance(current, frequency, anchor_day);
        if candidate <= current {
            return Err(LedgerError::ScheduleAdvanceLimitExceeded {
                limit: steps,
                reached: current,
                today,
            });
        }
        current = candidate;
        steps += 1;
    }
    Ok(current)
}

/// Lists the due dates from `first` up to and including `until`, capped at
/// `limit` entries.
pub fn occurrences_until(
    first: NaiveDate,
    frequency: Frequency,
    anchor_day: Option<u32>,
    until: NaiveDate,
    limit: usize,
) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = first;
    while current <= until && dates.len() < limit {
        dates.push(current);
        let next = advance(current, frequency, anchor_day);
        if next <= current {
            break;
        }
        current = next;
    }
    dates
}

fn shift_month_anchored(date: NaiveDate, months: u32, anchor: u32) -> Option<NaiveDate> {
    let index = date.year() * 12 + date.month0() as i32 + months as i32;
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    let day = anchor.clamp(1, days_in_month(year, month)?);
    NaiveDate::from_ymd_opt(year, month, day)
}

pub(crate) fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let first_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
    first_next.pred_opt().map(|last| last.day())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_based_frequencies_add_fixed_days() {
        assert_eq!(advance(ymd(2024, 12, 28), Frequency::Weekly, None), ymd(2025, 1, 4));
        assert_eq!(advance(ymd(2024, 2, 20), Frequency::Biweekly, Some(20)), ymd(2024, 3, 5));
    }

    #[test]
    fn monthly_anchor_clamps_and_recovers() {
        let feb = advance(ymd(2024, 1, 31), Frequency::Monthly, Some(31));
        assert_eq!(feb, ymd(2024, 2, 29));
        let mar = advance(feb, Frequency::Monthly, Some(31));
        assert_eq!(mar, ymd(2024, 3, 31));
        assert_eq!(advance(ymd(2023, 1, 31), Frequency::Monthly, Some(31)), ymd(2023, 2, 28));
    }

    #[test]
    fn month_multiples_cross_year_boundaries() {
        assert_eq!(advance(ymd(2024, 12, 15), Frequency::Bimonthly, None), ymd(2025, 2, 15));
        assert_eq!(advance(ymd(2024, 11, 30), Frequency::Quarterly, Some(30)), ymd(2025, 2, 28));
        assert_eq!(advance(ymd(2024, 8, 31), Frequency::Semiannual, Some(31)), ymd(2025, 2, 28));
        assert_eq!(advance(ymd(2024, 2, 29), Frequency::Annual, Some(29)), ymd(2025, 2, 28));
    }

    #[test]
    fn missing_anchor_uses_current_day() {
        assert_eq!(advance(ymd(2024, 3, 10), Frequency::Monthly, None), ymd(2024, 4, 10));
    }

    #[test]
    fn once_is_not_advanceable() {
        assert_eq!(advance(ymd(2024, 3, 10), Frequency::Once, None), ymd(2024, 3, 10));
    }

    #[test]
    fn catch_up_skips_elapsed_occurrences() {
        let today = ymd(2024, 6, 15);
        let caught = catch_up(ymd(2024, 1, 31), Frequency::Monthly, Some(31), today, 120)
            .expect("reachable");
        assert_eq!(caught, ymd(2024, 6, 30));

        let exact = catch_up(ymd(2024, 6, 1), Frequency::Weekly, None, ymd(2024, 6, 15), 120)
            .expect("reachable");
        assert_eq!(exact, ymd(2024, 6, 15));
    }

    #[test]
    fn catch_up_never_regresses_future_dates() {
        let future = ymd(2030, 1, 1);
        let result = catch_up(future, Frequency::Annual, None, ymd(2024, 1, 1), 120)
            .expect("already current");
        assert_eq!(result, future);
    }

    #[test]
    fn catch_up_stops_at_limit() {
        let err = catch_up(ymd(2000, 1, 1), Frequency::Weekly, None, ymd(2024, 1, 1), 120)
            .expect_err("too far behind");
        match err {
            LedgerError::ScheduleAdvanceLimitExceeded { limit, reached, today } => {
                assert_eq!(limit, 120);
                assert_eq!(reached, ymd(2000, 1, 1) + Duration::days(7 * 120));
                assert_eq!(today, ymd(2024, 1, 1));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn catch_up_fails_fast_without_progress() {
        let err = catch_up(ymd(2024, 1, 1), Frequency::Once, None, ymd(2024, 2, 1), 120)
            .expect_err("once cannot catch up");
        assert!(matches!(err, LedgerError::ScheduleAdvanceLimitExceeded { .. }));
    }

    #[test]
    fn catch_up_bounded_for_every_recurring_frequency() {
        let today = ymd(2024, 7, 1);
        for frequency in Frequency::ALL.into_iter().filter(|f| f.is_recurring()) {
            let result = catch_up(ymd(2023, 1, 31), frequency, Some(31), today, 120)
                .expect("within cap");
            assert!(result >= today, "{frequency} fell short: {result}");
        }
    }

    #[test]
    fn occurrences_until_lists_inclusive_dates() {
        let dates = occurrences_until(ymd(2024, 1, 31), Frequency::Monthly, Some(31), ymd(2024, 4, 30), 10);
        assert_eq!(dates, vec![ymd(2024, 1, 31), ymd(2024, 2, 29), ymd(2024, 3, 31), ymd(2024, 4, 30)]);
        assert_eq!(occurrences_until(ymd(2024, 1, 1), Frequency::Once, None, ymd(2024, 12, 31), 10).len(), 1);
    }

    #[test]
    fn days_in_month_handles_december_and_leap_years() {
        assert_eq!(days_in_month(2024, 12), Some(31));
        assert_eq!(days_in_month(2024, 2), Some(29));
        assert_eq!(days_in_month(2100, 2), Some(28));
    }
}
