use time::{util::days_in_year_month, Date, Month};

use crate::error::{ApiError, FieldError};
use crate::expenses::dto::{CategoryStat, MonthlyStat};
use crate::expenses::repo::{CategoryStatRow, MonthlyStatRow};

/// Inclusive day bounds a statistics request resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsRange {
    pub start: Date,
    pub end: Date,
}

/// Resolves `?year&month` to calendar bounds: a specific month, a specific
/// year, or the current year when nothing was asked for.
pub fn resolve_range(
    year: Option<i32>,
    month: Option<u8>,
    today: Date,
) -> Result<StatsRange, ApiError> {
    let year = year.unwrap_or_else(|| today.year());

    let range = match month {
        Some(m) => {
            let month = Month::try_from(m).map_err(|_| {
                ApiError::Validation(vec![FieldError::new(
                    "month",
                    "Month must be between 1 and 12",
                )])
            })?;
            StatsRange {
                start: calendar_date(year, month, 1)?,
                end: calendar_date(year, month, days_in_year_month(year, month))?,
            }
        }
        None => StatsRange {
            start: calendar_date(year, Month::January, 1)?,
            end: calendar_date(year, Month::December, 31)?,
        },
    };
    Ok(range)
}

fn calendar_date(year: i32, month: Month, day: u8) -> Result<Date, ApiError> {
    Date::from_calendar_date(year, month, day).map_err(|_| {
        ApiError::Validation(vec![FieldError::new("year", "Year is out of range")])
    })
}

impl From<CategoryStatRow> for CategoryStat {
    fn from(row: CategoryStatRow) -> Self {
        Self {
            category: row.category,
            total_amount: row.total_cents.to_display(),
            count: row.count,
            // groups only exist with count >= 1
            average_amount: (row.total_cents.0 as f64 / row.count as f64) / 100.0,
        }
    }
}

impl From<MonthlyStatRow> for MonthlyStat {
    fn from(row: MonthlyStatRow) -> Self {
        Self {
            year: row.year,
            month: row.month,
            total_amount: row.total_cents.to_display(),
            count: row.count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expenses::repo_types::Category;
    use crate::money::Cents;
    use time::macros::date;

    const TODAY: Date = date!(2024 - 06 - 15);

    #[test]
    fn year_and_month_resolve_to_that_month() {
        let range = resolve_range(Some(2024), Some(3), TODAY).unwrap();
        assert_eq!(range.start, date!(2024 - 03 - 01));
        assert_eq!(range.end, date!(2024 - 03 - 31));
    }

    #[test]
    fn february_respects_leap_years() {
        let leap = resolve_range(Some(2024), Some(2), TODAY).unwrap();
        assert_eq!(leap.end, date!(2024 - 02 - 29));
        let common = resolve_range(Some(2023), Some(2), TODAY).unwrap();
        assert_eq!(common.end, date!(2023 - 02 - 28));
    }

    #[test]
    fn year_alone_covers_the_whole_year() {
        let range = resolve_range(Some(2023), None, TODAY).unwrap();
        assert_eq!(range.start, date!(2023 - 01 - 01));
        assert_eq!(range.end, date!(2023 - 12 - 31));
    }

    #[test]
    fn no_params_default_to_the_current_year() {
        let range = resolve_range(None, None, TODAY).unwrap();
        assert_eq!(range.start, date!(2024 - 01 - 01));
        assert_eq!(range.end, date!(2024 - 12 - 31));
    }

    #[test]
    fn month_without_year_uses_the_current_year() {
        let range = resolve_range(None, Some(1), TODAY).unwrap();
        assert_eq!(range.start, date!(2024 - 01 - 01));
        assert_eq!(range.end, date!(2024 - 01 - 31));
    }

    #[test]
    fn out_of_range_month_is_a_validation_error() {
        assert!(matches!(
            resolve_range(Some(2024), Some(0), TODAY).unwrap_err(),
            ApiError::Validation(_)
        ));
        assert!(matches!(
            resolve_range(Some(2024), Some(13), TODAY).unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[test]
    fn category_stat_average_comes_from_cents() {
        let stat: CategoryStat = CategoryStatRow {
            category: Category::Food,
            total_cents: Cents(450),
            count: 1,
        }
        .into();
        assert_eq!(stat.total_amount, 4.5);
        assert_eq!(stat.average_amount, 4.5);

        let stat: CategoryStat = CategoryStatRow {
            category: Category::Shopping,
            total_cents: Cents(1000),
            count: 3,
        }
        .into();
        assert_eq!(stat.total_amount, 10.0);
        assert!((stat.average_amount - 10.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn monthly_stat_converts_to_display_units() {
        let stat: MonthlyStat = MonthlyStatRow {
            year: 2024,
            month: 3,
            total_cents: Cents(123_45),
            count: 7,
        }
        .into();
        assert_eq!(stat.total_amount, 123.45);
        assert_eq!(stat.count, 7);
    }
}
