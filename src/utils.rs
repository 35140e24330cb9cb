use chrono::{Datelike, NaiveDate};

/// First day of the calendar month `date` falls in.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap()
}

pub fn next_month(month: NaiveDate) -> NaiveDate {
    let year = if month.month() == 12 {
        month.year() + 1
    } else {
        month.year()
    };

    let m = if month.month() == 12 {
        1
    } else {
        month.month() + 1
    };

    NaiveDate::from_ymd_opt(year, m, 1).unwrap()
}

pub fn prev_month(month: NaiveDate) -> NaiveDate {
    months_back(month, 1)
}

/// Steps `n` calendar months backwards from the month containing `month`.
pub fn months_back(month: NaiveDate, n: u32) -> NaiveDate {
    let total = month.year() * 12 + month.month() as i32 - 1 - n as i32;
    let year = total.div_euclid(12);
    let m = total.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, m, 1).unwrap()
}

/// Renders a month as the `YYYY-MM` key used throughout the result files.
pub fn format_year_month(month: NaiveDate) -> String {
    month.format("%Y-%m").to_string()
}
