use chrono::{Datelike, Duration as ChronoDuration, Local, Months, NaiveDate};

pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Canonical store key for a local calendar date, `YYYY-MM-DD`.
///
/// Built from the date's own year/month/day so no timezone conversion can
/// shift it across midnight.
pub fn date_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key.trim(), DATE_KEY_FORMAT).ok()
}

/// Monday of the week containing `date`. Sundays belong to the week that
/// started six days earlier.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday() as i64;
    date - ChronoDuration::days(offset)
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

pub fn month_end(date: NaiveDate) -> NaiveDate {
    let last = days_in_month(date.year(), date.month());
    NaiveDate::from_ymd_opt(date.year(), date.month(), last).unwrap_or(date)
}

/// First day of the Jan/Apr/Jul/Oct quarter containing `date`.
pub fn quarter_start(date: NaiveDate) -> NaiveDate {
    let month = quarter_index(date) * 3 + 1;
    NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
}

pub fn quarter_index(date: NaiveDate) -> u32 {
    date.month0() / 3
}

pub fn quarter_end(date: NaiveDate) -> NaiveDate {
    month_end(add_months(quarter_start(date), 2))
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let first = match NaiveDate::from_ymd_opt(year, month, 1) {
        Some(d) => d,
        None => return 30,
    };
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .unwrap_or(first);
    next.pred_opt().map(|d| d.day()).unwrap_or(28)
}

pub fn month_days(date: NaiveDate) -> Vec<NaiveDate> {
    let start = month_start(date);
    let count = days_in_month(start.year(), start.month());
    (0..count as i64)
        .map(|offset| start + ChronoDuration::days(offset))
        .collect()
}

/// Blank cells before the first of the month in a Monday-first grid.
pub fn leading_blanks(date: NaiveDate) -> usize {
    month_start(date).weekday().num_days_from_monday() as usize
}

/// Shifts by whole months, clamping the day to the target month's length.
pub fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    let shifted = if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(ChronoDuration::days(days))
        .unwrap_or(date)
}

/// Column heading, e.g. `Sat, Jun 1`.
pub fn format_day(date: NaiveDate) -> String {
    date.format("%a, %b %-d").to_string()
}

pub fn format_month_year(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

pub fn format_short_month(date: NaiveDate) -> String {
    date.format("%b").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn date_key_is_zero_padded() {
        assert_eq!(date_key(ymd(2024, 6, 1)), "2024-06-01");
        assert_eq!(date_key(ymd(987, 12, 31)), "0987-12-31");
    }

    #[test]
    fn date_key_round_trips() {
        let mut date = ymd(2023, 12, 25);
        for _ in 0..800 {
            let key = date_key(date);
            assert_eq!(date_key(date), key);
            assert_eq!(parse_date_key(&key), Some(date));
            date = add_days(date, 1);
        }
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_date_key("2024-13-01"), None);
        assert_eq!(parse_date_key("yesterday"), None);
    }

    #[test]
    fn week_start_is_an_idempotent_monday() {
        let mut date = ymd(2024, 1, 1);
        for _ in 0..400 {
            let start = week_start(date);
            assert_eq!(start.weekday(), Weekday::Mon);
            assert_eq!(week_start(start), start);
            assert!(start <= date && date - start < ChronoDuration::days(7));
            date = add_days(date, 1);
        }
    }

    #[test]
    fn sunday_belongs_to_previous_monday() {
        let sunday = ymd(2024, 6, 2);
        assert_eq!(sunday.weekday(), Weekday::Sun);
        assert_eq!(week_start(sunday), ymd(2024, 5, 27));
    }

    #[test]
    fn quarter_boundaries() {
        assert_eq!(quarter_start(ymd(2024, 2, 29)), ymd(2024, 1, 1));
        assert_eq!(quarter_start(ymd(2024, 6, 30)), ymd(2024, 4, 1));
        assert_eq!(quarter_start(ymd(2024, 7, 1)), ymd(2024, 7, 1));
        assert_eq!(quarter_start(ymd(2024, 11, 15)), ymd(2024, 10, 1));
        assert_eq!(quarter_end(ymd(2024, 11, 15)), ymd(2024, 12, 31));
        assert_eq!(quarter_index(ymd(2024, 5, 3)), 1);
    }

    #[test]
    fn month_helpers() {
        assert_eq!(month_start(ymd(2024, 2, 17)), ymd(2024, 2, 1));
        assert_eq!(month_end(ymd(2024, 2, 17)), ymd(2024, 2, 29));
        assert_eq!(month_days(ymd(2023, 2, 3)).len(), 28);
        // June 2024 starts on a Saturday.
        assert_eq!(leading_blanks(ymd(2024, 6, 20)), 5);
        assert_eq!(leading_blanks(ymd(2024, 7, 20)), 0);
    }

    #[test]
    fn add_months_clamps_day() {
        assert_eq!(add_months(ymd(2024, 1, 31), 1), ymd(2024, 2, 29));
        assert_eq!(add_months(ymd(2024, 3, 31), -1), ymd(2024, 2, 29));
        assert_eq!(add_months(ymd(2024, 5, 15), 12), ymd(2025, 5, 15));
    }

    #[test]
    fn labels() {
        assert_eq!(format_day(ymd(2024, 6, 1)), "Sat, Jun 1");
        assert_eq!(format_month_year(ymd(2024, 6, 1)), "June 2024");
        assert_eq!(format_short_month(ymd(2024, 6, 1)), "Jun");
    }
}
