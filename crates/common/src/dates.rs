//! Calendar helpers for test data
//!
//! Patterns use the tokens `dd`, `MM`, `yyyy`, `HH`, `mm` and `ss`; any
//! other text is copied through.

use std::cmp::Ordering;

use chrono::{
    DateTime, Datelike, Duration, Local, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike,
    Weekday,
};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::{Error, Result};

pub const DEFAULT_FORMAT: &str = "dd/MM/yyyy";
pub const DEFAULT_DATETIME_FORMAT: &str = "dd/MM/yyyy HH:mm:ss";

static TOKENS: Lazy<Regex> = Lazy::new(|| Regex::new("yyyy|MM|dd|HH|mm|ss").expect("token regex"));

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

/// Render `dt` using a `dd/MM/yyyy`-style pattern
pub fn format_date(dt: &NaiveDateTime, pattern: &str) -> String {
    TOKENS
        .replace_all(pattern, |caps: &Captures<'_>| match &caps[0] {
            "yyyy" => format!("{:04}", dt.year()),
            "MM" => format!("{:02}", dt.month()),
            "dd" => format!("{:02}", dt.day()),
            "HH" => format!("{:02}", dt.hour()),
            "mm" => format!("{:02}", dt.minute()),
            _ => format!("{:02}", dt.second()),
        })
        .into_owned()
}

/// Parse `dd/MM/yyyy`, ISO `yyyy-MM-dd` or an RFC 3339 timestamp
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(input, "%Y-%m-%d"))
        .or_else(|_| DateTime::parse_from_rfc3339(input).map(|dt| dt.date_naive()))
        .map_err(|_| Error::InvalidDate(input.to_string()))
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` (1-12) of `year`
pub fn days_in_month(month: u32, year: i32) -> Result<u32> {
    let first = first_of(year, month)?;
    let next = first
        .checked_add_months(Months::new(1))
        .ok_or_else(|| Error::InvalidDate(format!("{}-{}", year, month)))?;
    Ok((next - first).num_days() as u32)
}

/// English month name for a zero-based month index
pub fn month_name(month_index: usize) -> Option<&'static str> {
    MONTH_NAMES.get(month_index).copied()
}

/// Whole days between two dates, rounded up, ignoring order
pub fn days_between(a: &NaiveDateTime, b: &NaiveDateTime) -> i64 {
    let millis = (*b - *a).num_milliseconds().abs();
    (millis + 86_399_999) / 86_400_000
}

pub fn compare_dates(a: &NaiveDateTime, b: &NaiveDateTime) -> Ordering {
    a.cmp(b)
}

fn first_of(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::InvalidDate(format!("{}-{}", year, month)))
}

fn start_of(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Date arithmetic relative to a fixed reference instant
#[derive(Debug, Clone, Copy)]
pub struct DateUtil {
    now: NaiveDateTime,
}

impl DateUtil {
    /// Anchored at the current local time
    pub fn now() -> Self {
        Self {
            now: Local::now().naive_local(),
        }
    }

    /// Anchored at an explicit reference
    pub fn at(now: NaiveDateTime) -> Self {
        Self { now }
    }

    pub fn reference(&self) -> NaiveDateTime {
        self.now
    }

    pub fn today(&self, fmt: &str) -> String {
        format_date(&self.now, fmt)
    }

    pub fn tomorrow(&self, fmt: &str) -> Result<String> {
        self.days_from_now(1, fmt)
    }

    pub fn yesterday(&self, fmt: &str) -> Result<String> {
        self.days_ago(1, fmt)
    }

    /// Shift the reference by `delta`; `what` names the request in errors
    fn shifted(
        &self,
        delta: Option<Duration>,
        what: impl FnOnce() -> String,
        fmt: &str,
    ) -> Result<String> {
        delta
            .and_then(|d| self.now.checked_add_signed(d))
            .map(|dt| format_date(&dt, fmt))
            .ok_or_else(|| Error::InvalidDate(format!("{} from {}", what(), self.now)))
    }

    pub fn days_from_now(&self, days: i64, fmt: &str) -> Result<String> {
        self.shifted(Duration::try_days(days), || format!("{} days", days), fmt)
    }

    pub fn days_ago(&self, days: i64, fmt: &str) -> Result<String> {
        let back = days
            .checked_neg()
            .ok_or_else(|| Error::InvalidDate(format!("{} days ago", days)))?;
        self.days_from_now(back, fmt)
    }

    /// Month arithmetic clamps to the last valid day (31 Jan + 1 month = 28/29 Feb)
    pub fn months_from_now(&self, months: i32, fmt: &str) -> Result<String> {
        let shifted = if months >= 0 {
            self.now.checked_add_months(Months::new(months.unsigned_abs()))
        } else {
            self.now.checked_sub_months(Months::new(months.unsigned_abs()))
        };
        shifted
            .map(|dt| format_date(&dt, fmt))
            .ok_or_else(|| Error::InvalidDate(format!("{} months from {}", months, self.now)))
    }

    pub fn months_ago(&self, months: i32, fmt: &str) -> Result<String> {
        let back = months
            .checked_neg()
            .ok_or_else(|| Error::InvalidDate(format!("{} months ago", months)))?;
        self.months_from_now(back, fmt)
    }

    pub fn years_from_now(&self, years: i32, fmt: &str) -> Result<String> {
        let months = years
            .checked_mul(12)
            .ok_or_else(|| Error::InvalidDate(format!("{} years from {}", years, self.now)))?;
        self.months_from_now(months, fmt)
    }

    pub fn years_ago(&self, years: i32, fmt: &str) -> Result<String> {
        let months = years
            .checked_mul(12)
            .ok_or_else(|| Error::InvalidDate(format!("{} years before {}", years, self.now)))?;
        self.months_ago(months, fmt)
    }

    pub fn specific_date(&self, year: i32, month: u32, day: u32, fmt: &str) -> Result<String> {
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| Error::InvalidDate(format!("{}-{}-{}", year, month, day)))?;
        Ok(format_date(&start_of(date), fmt))
    }

    pub fn first_day_of_month(&self, fmt: &str) -> Result<String> {
        self.first_day_of_specific_month(self.now.year(), self.now.month(), fmt)
    }

    pub fn last_day_of_month(&self, fmt: &str) -> Result<String> {
        self.last_day_of_specific_month(self.now.year(), self.now.month(), fmt)
    }

    pub fn first_day_of_specific_month(&self, year: i32, month: u32, fmt: &str) -> Result<String> {
        Ok(format_date(&start_of(first_of(year, month)?), fmt))
    }

    pub fn last_day_of_specific_month(&self, year: i32, month: u32, fmt: &str) -> Result<String> {
        let last = NaiveDate::from_ymd_opt(year, month, days_in_month(month, year)?)
            .ok_or_else(|| Error::InvalidDate(format!("{}-{}", year, month)))?;
        Ok(format_date(&start_of(last), fmt))
    }

    pub fn first_day_of_next_month(&self, fmt: &str) -> Result<String> {
        let next = first_of(self.now.year(), self.now.month())?
            .checked_add_months(Months::new(1))
            .ok_or_else(|| Error::InvalidDate(self.now.to_string()))?;
        Ok(format_date(&start_of(next), fmt))
    }

    pub fn last_day_of_previous_month(&self, fmt: &str) -> Result<String> {
        let first = first_of(self.now.year(), self.now.month())?;
        let last = first
            .pred_opt()
            .ok_or_else(|| Error::InvalidDate(self.now.to_string()))?;
        Ok(format_date(&start_of(last), fmt))
    }

    /// 0 = Sunday ... 6 = Saturday
    pub fn day_of_week(&self) -> u32 {
        self.now.weekday().num_days_from_sunday()
    }

    pub fn day_of_week_name(&self) -> &'static str {
        match self.now.weekday() {
            Weekday::Sun => "Sunday",
            Weekday::Mon => "Monday",
            Weekday::Tue => "Tuesday",
            Weekday::Wed => "Wednesday",
            Weekday::Thu => "Thursday",
            Weekday::Fri => "Friday",
            Weekday::Sat => "Saturday",
        }
    }

    /// Next occurrence of `day`, always strictly after today
    pub fn next_weekday(&self, day: Weekday, fmt: &str) -> Result<String> {
        let current = self.now.weekday().num_days_from_sunday() as i64;
        let target = day.num_days_from_sunday() as i64;
        let diff = match (target - current).rem_euclid(7) {
            0 => 7,
            d => d,
        };
        self.days_from_now(diff, fmt)
    }

    /// Previous occurrence of `day`, always strictly before today
    pub fn previous_weekday(&self, day: Weekday, fmt: &str) -> Result<String> {
        let current = self.now.weekday().num_days_from_sunday() as i64;
        let target = day.num_days_from_sunday() as i64;
        let diff = match (current - target).rem_euclid(7) {
            0 => 7,
            d => d,
        };
        self.days_ago(diff, fmt)
    }

    pub fn add_hours(&self, hours: i64, fmt: &str) -> Result<String> {
        self.shifted(Duration::try_hours(hours), || format!("{} hours", hours), fmt)
    }

    pub fn add_minutes(&self, minutes: i64, fmt: &str) -> Result<String> {
        self.shifted(Duration::try_minutes(minutes), || format!("{} minutes", minutes), fmt)
    }

    pub fn add_seconds(&self, seconds: i64, fmt: &str) -> Result<String> {
        self.shifted(Duration::try_seconds(seconds), || format!("{} seconds", seconds), fmt)
    }

    pub fn current_time(&self) -> String {
        format_date(&self.now, "HH:mm:ss")
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.now.and_utc().timestamp_millis()
    }

    pub fn is_in_past(&self, dt: &NaiveDateTime) -> bool {
        *dt < self.now
    }

    pub fn is_in_future(&self, dt: &NaiveDateTime) -> bool {
        *dt > self.now
    }

    pub fn is_today(&self, date: &NaiveDate) -> bool {
        *date == self.now.date()
    }

    /// Completed years since `birthdate`
    pub fn age_from_birthdate(&self, birthdate: &NaiveDate) -> i32 {
        let today = self.now.date();
        let mut age = today.year() - birthdate.year();
        if (today.month(), today.day()) < (birthdate.month(), birthdate.day()) {
            age -= 1;
        }
        age
    }

    /// ISO 8601 week number
    pub fn week_number(&self) -> u32 {
        self.now.iso_week().week()
    }

    pub fn quarter(&self) -> u32 {
        (self.now.month() - 1) / 3 + 1
    }

    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[self.now.month0() as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn at(y: i32, m: u32, d: u32) -> DateUtil {
        DateUtil::at(
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(9, 5, 7)
                .unwrap(),
        )
    }

    #[test]
    fn test_format_tokens() {
        let util = at(2024, 3, 4);
        assert_eq!(util.today(DEFAULT_FORMAT), "04/03/2024");
        assert_eq!(util.today(DEFAULT_DATETIME_FORMAT), "04/03/2024 09:05:07");
        assert_eq!(util.today("yyyy-MM-dd"), "2024-03-04");
        assert_eq!(util.current_time(), "09:05:07");
    }

    #[test]
    fn test_relative_days() {
        let util = at(2024, 12, 31);
        assert_eq!(util.tomorrow(DEFAULT_FORMAT).unwrap(), "01/01/2025");
        assert_eq!(util.yesterday(DEFAULT_FORMAT).unwrap(), "30/12/2024");
        assert_eq!(util.days_ago(31, DEFAULT_FORMAT).unwrap(), "30/11/2024");
    }

    #[test]
    fn test_month_arithmetic_clamps() {
        let util = at(2024, 1, 31);
        assert_eq!(util.months_from_now(1, DEFAULT_FORMAT).unwrap(), "29/02/2024");
        assert_eq!(util.months_ago(2, DEFAULT_FORMAT).unwrap(), "30/11/2023");
        let leap = at(2024, 2, 29);
        assert_eq!(leap.years_from_now(1, DEFAULT_FORMAT).unwrap(), "28/02/2025");
    }

    #[test]
    fn test_out_of_range_shifts_are_errors() {
        let util = at(2024, 3, 4);
        assert!(matches!(util.years_from_now(i32::MAX, DEFAULT_FORMAT), Err(Error::InvalidDate(_))));
        assert!(matches!(util.years_ago(i32::MAX, DEFAULT_FORMAT), Err(Error::InvalidDate(_))));
        assert!(matches!(util.months_ago(i32::MIN, DEFAULT_FORMAT), Err(Error::InvalidDate(_))));
        assert!(matches!(util.days_from_now(i64::MAX, DEFAULT_FORMAT), Err(Error::InvalidDate(_))));
        assert!(matches!(util.days_ago(i64::MIN, DEFAULT_FORMAT), Err(Error::InvalidDate(_))));
        assert!(matches!(util.add_seconds(i64::MAX, DEFAULT_FORMAT), Err(Error::InvalidDate(_))));
        assert_eq!(util.add_hours(15, DEFAULT_DATETIME_FORMAT).unwrap(), "05/03/2024 00:05:07");
    }

    #[test]
    fn test_month_boundaries() {
        let util = at(2023, 3, 15);
        assert_eq!(util.first_day_of_month(DEFAULT_FORMAT).unwrap(), "01/03/2023");
        assert_eq!(util.last_day_of_month(DEFAULT_FORMAT).unwrap(), "31/03/2023");
        assert_eq!(util.first_day_of_next_month(DEFAULT_FORMAT).unwrap(), "01/04/2023");
        assert_eq!(util.last_day_of_previous_month(DEFAULT_FORMAT).unwrap(), "28/02/2023");
        assert!(util.first_day_of_specific_month(2023, 13, DEFAULT_FORMAT).is_err());
    }

    #[test_case(2, 2024 => 29; "leap february")]
    #[test_case(2, 2023 => 28; "common february")]
    #[test_case(12, 2023 => 31; "december")]
    #[test_case(4, 2023 => 30; "april")]
    fn test_days_in_month(month: u32, year: i32) -> u32 {
        days_in_month(month, year).unwrap()
    }

    #[test]
    fn test_weekday_navigation() {
        // 2024-03-04 is a Monday
        let util = at(2024, 3, 4);
        assert_eq!(util.day_of_week(), 1);
        assert_eq!(util.day_of_week_name(), "Monday");
        assert_eq!(util.next_weekday(Weekday::Mon, DEFAULT_FORMAT).unwrap(), "11/03/2024");
        assert_eq!(util.next_weekday(Weekday::Wed, DEFAULT_FORMAT).unwrap(), "06/03/2024");
        assert_eq!(util.previous_weekday(Weekday::Mon, DEFAULT_FORMAT).unwrap(), "26/02/2024");
        assert_eq!(util.previous_weekday(Weekday::Sun, DEFAULT_FORMAT).unwrap(), "03/03/2024");
    }

    #[test]
    fn test_parse_accepts_three_shapes() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(parse_date("04/03/2024").unwrap(), expected);
        assert_eq!(parse_date("2024-03-04").unwrap(), expected);
        assert_eq!(parse_date("2024-03-04T10:00:00Z").unwrap(), expected);
        assert!(parse_date("March 4th").is_err());
    }

    #[test]
    fn test_age_counts_completed_years() {
        let util = at(2024, 3, 4);
        let before = NaiveDate::from_ymd_opt(1990, 3, 5).unwrap();
        let on = NaiveDate::from_ymd_opt(1990, 3, 4).unwrap();
        assert_eq!(util.age_from_birthdate(&before), 33);
        assert_eq!(util.age_from_birthdate(&on), 34);
    }

    #[test]
    fn test_days_between_rounds_up() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap().and_hms_opt(1, 0, 0).unwrap();
        assert_eq!(days_between(&a, &b), 3);
        assert_eq!(days_between(&b, &a), 3);
        assert_eq!(compare_dates(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_calendar_facts() {
        let util = at(2024, 11, 20);
        assert_eq!(util.quarter(), 4);
        assert_eq!(util.month_name(), "November");
        assert_eq!(month_name(0), Some("January"));
        assert_eq!(month_name(12), None);
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert_eq!(util.week_number(), 47);
    }
}
