//! Risk classification
//!
//! Pure derivation of a risk tier from budget and schedule. The result is
//! computed on every read and never persisted.

use chrono::{Datelike, Months, NaiveDate};

use super::entity::RiskLevel;

/// Budget ceiling for the low tier, in cents (100 000.00)
pub const BUDGET_LOW_MAX_CENTS: i64 = 100_000_00;

/// Budget ceiling for the medium tier, in cents (500 000.00)
pub const BUDGET_MEDIUM_MAX_CENTS: i64 = 500_000_00;

/// Duration ceiling for the low tier, in whole months
pub const DURATION_LOW_MAX_MONTHS: i64 = 3;

/// Duration ceiling for the medium tier, in whole months
pub const DURATION_MEDIUM_MAX_MONTHS: i64 = 6;

/// Number of whole calendar months between two dates
///
/// A trailing partial month does not count: Jan 15 to Apr 14 is two
/// months, Jan 15 to Apr 15 is three. Negative when `end` precedes
/// `start`.
pub fn whole_months_between(start: NaiveDate, end: NaiveDate) -> i64 {
    if end < start {
        return -whole_months_between(end, start);
    }
    let mut months = (i64::from(end.year()) - i64::from(start.year())) * 12
        + (i64::from(end.month()) - i64::from(start.month()));
    if months > 0 {
        // Month-end days clamp when added, so compare against the
        // candidate date rather than raw day numbers.
        let candidate = start
            .checked_add_months(Months::new(months as u32))
            .unwrap_or(end);
        if candidate > end {
            months -= 1;
        }
    }
    months
}

/// Classify a project's risk from budget and schedule
///
/// With either date absent the classification falls back to Low; that is
/// a deliberate simplification for incomplete data, not a computed risk.
/// Rules are evaluated in priority order, so a small budget cannot rescue
/// an overlong schedule from the High tier.
pub fn classify(
    budget_cents: i64,
    start_date: Option<NaiveDate>,
    forecast_end_date: Option<NaiveDate>,
) -> RiskLevel {
    let (Some(start), Some(end)) = (start_date, forecast_end_date) else {
        return RiskLevel::Low;
    };

    let duration_months = whole_months_between(start, end);

    if budget_cents <= BUDGET_LOW_MAX_CENTS && duration_months <= DURATION_LOW_MAX_MONTHS {
        RiskLevel::Low
    } else if (budget_cents > BUDGET_LOW_MAX_CENTS && budget_cents <= BUDGET_MEDIUM_MAX_CENTS)
        || (duration_months > DURATION_LOW_MAX_MONTHS
            && duration_months <= DURATION_MEDIUM_MAX_MONTHS)
    {
        RiskLevel::Medium
    } else if budget_cents > BUDGET_MEDIUM_MAX_CENTS
        || duration_months > DURATION_MEDIUM_MAX_MONTHS
    {
        RiskLevel::High
    } else {
        // Unreachable with the rules above, kept for totality.
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_whole_months_truncates_partial_month() {
        assert_eq!(whole_months_between(date(2024, 1, 15), date(2024, 4, 14)), 2);
        assert_eq!(whole_months_between(date(2024, 1, 15), date(2024, 4, 15)), 3);
        assert_eq!(whole_months_between(date(2024, 1, 1), date(2024, 1, 20)), 0);
    }

    #[test]
    fn test_whole_months_negative_when_reversed() {
        assert_eq!(whole_months_between(date(2024, 4, 15), date(2024, 1, 15)), -3);
    }

    #[test]
    fn test_whole_months_clamps_month_end() {
        // Jan 31 + 1 month clamps to Feb 29, which is within range.
        assert_eq!(whole_months_between(date(2024, 1, 31), date(2024, 2, 29)), 1);
        assert_eq!(whole_months_between(date(2023, 1, 31), date(2023, 2, 28)), 1);
    }

    #[test]
    fn test_low_when_both_clauses_hold() {
        // Exactly on both boundaries.
        let level = classify(100_000_00, Some(date(2024, 1, 1)), Some(date(2024, 4, 1)));
        assert_eq!(level, RiskLevel::Low);
    }

    #[test]
    fn test_medium_on_budget_just_over_low() {
        let level = classify(100_000_01, Some(date(2024, 1, 1)), Some(date(2024, 2, 1)));
        assert_eq!(level, RiskLevel::Medium);
    }

    #[test]
    fn test_medium_on_duration_alone() {
        let level = classify(50_000_00, Some(date(2024, 1, 1)), Some(date(2024, 6, 1)));
        assert_eq!(level, RiskLevel::Medium);
    }

    #[test]
    fn test_high_when_duration_breaks_low_budget() {
        // Budget satisfies the low clause, but low requires both clauses;
        // the 8-month schedule then lands in the high rule.
        let level = classify(50_000_00, Some(date(2024, 1, 1)), Some(date(2024, 9, 1)));
        assert_eq!(level, RiskLevel::High);
    }

    #[test]
    fn test_high_on_budget_alone() {
        let level = classify(600_000_00, Some(date(2024, 1, 1)), Some(date(2024, 2, 1)));
        assert_eq!(level, RiskLevel::High);
    }

    #[test]
    fn test_missing_dates_default_to_low() {
        assert_eq!(classify(900_000_00, None, None), RiskLevel::Low);
        assert_eq!(classify(900_000_00, Some(date(2024, 1, 1)), None), RiskLevel::Low);
        assert_eq!(classify(900_000_00, None, Some(date(2024, 1, 1))), RiskLevel::Low);
    }
}
