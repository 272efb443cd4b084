//! Recurrence expressions for schedule rules.
//!
//! Supported keys: `FREQ` (`WEEKLY` by default, or `DAILY`), `BYDAY`
//! (comma-separated two-letter weekday codes), `BYHOUR` and `BYMINUTE`.
//! Parsing is tolerant: unknown keys and malformed values are ignored, and an
//! unknown frequency matches every day.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use std::convert::Infallible;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    /// Anything else; treated as "every day".
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recurrence {
    pub frequency: Frequency,
    pub weekdays: Vec<Weekday>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
}

impl Default for Recurrence {
    fn default() -> Self {
        Self {
            frequency: Frequency::Weekly,
            weekdays: Vec::new(),
            hour: None,
            minute: None,
        }
    }
}

impl Recurrence {
    pub fn parse(expr: &str) -> Self {
        let mut rule = Recurrence::default();
        let body = strip_prefix_ignore_case(expr.trim(), "RRULE:");

        for part in body.split(';') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim().to_ascii_uppercase().as_str() {
                "FREQ" => {
                    rule.frequency = match value.to_ascii_uppercase().as_str() {
                        "WEEKLY" => Frequency::Weekly,
                        "DAILY" => Frequency::Daily,
                        other => {
                            log::debug!("Unsupported recurrence frequency {other:?}, matching every day");
                            Frequency::Other
                        }
                    }
                }
                "BYDAY" => {
                    rule.weekdays.clear();
                    for code in value.split(',') {
                        if let Some(day) = weekday_from_code(code)
                            && !rule.weekdays.contains(&day)
                        {
                            rule.weekdays.push(day);
                        }
                    }
                }
                "BYHOUR" => rule.hour = first_number(value).filter(|h| *h < 24),
                "BYMINUTE" => rule.minute = first_number(value).filter(|m| *m < 60),
                _ => {}
            }
        }

        rule
    }

    /// Whether an occurrence falls on `date`.
    pub fn matches(&self, date: NaiveDate) -> bool {
        match self.frequency {
            Frequency::Weekly if !self.weekdays.is_empty() => {
                self.weekdays.contains(&date.weekday())
            }
            Frequency::Weekly | Frequency::Daily | Frequency::Other => true,
        }
    }

    /// `BYHOUR`/`BYMINUTE` override the matching parts of `fallback`.
    pub fn time_of_day(&self, fallback: NaiveTime) -> NaiveTime {
        use chrono::Timelike;
        let hour = self.hour.unwrap_or(fallback.hour());
        let minute = self.minute.unwrap_or(fallback.minute());
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(fallback)
    }

    /// Local start times of every occurrence from `first_day` to `last_day`, both inclusive.
    pub fn expand(
        &self,
        first_day: NaiveDate,
        last_day: NaiveDate,
        time: NaiveTime,
    ) -> Vec<NaiveDateTime> {
        let mut starts = Vec::new();
        let mut day = first_day;
        while day <= last_day {
            if self.matches(day) {
                starts.push(day.and_time(time));
            }
            day += Duration::days(1);
        }
        starts
    }
}

impl FromStr for Recurrence {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Recurrence::parse(s))
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> &'a str {
    match s.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => &s[prefix.len()..],
        _ => s,
    }
}

fn first_number(value: &str) -> Option<u32> {
    value
        .split(',')
        .find_map(|v| v.trim().parse::<u32>().ok())
}

fn weekday_from_code(code: &str) -> Option<Weekday> {
    match code.trim().to_ascii_uppercase().as_str() {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn midnight() -> NaiveTime {
        NaiveTime::from_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_full_expression() {
        let rule = Recurrence::parse("FREQ=WEEKLY;BYDAY=MO,WE;BYHOUR=18;BYMINUTE=30");
        assert_eq!(rule.frequency, Frequency::Weekly);
        assert_eq!(rule.weekdays, vec![Weekday::Mon, Weekday::Wed]);
        assert_eq!(rule.hour, Some(18));
        assert_eq!(rule.minute, Some(30));
    }

    #[test]
    fn test_parse_is_tolerant() {
        let rule = Recurrence::parse("rrule:freq=daily; INTERVAL=2; byday=mo,XX,mo; byhour=25; byminute=abc");
        assert_eq!(rule.frequency, Frequency::Daily);
        assert_eq!(rule.weekdays, vec![Weekday::Mon]);
        assert_eq!(rule.hour, None);
        assert_eq!(rule.minute, None);

        let empty: Recurrence = "".parse().unwrap();
        assert_eq!(empty, Recurrence::default());
    }

    #[test]
    fn test_weekly_expansion_two_weeks() {
        let rule = Recurrence::parse("FREQ=WEEKLY;BYDAY=MO,WE;BYHOUR=18;BYMINUTE=30");
        let time = rule.time_of_day(midnight());
        let start = date(2024, 1, 1);
        let starts = rule.expand(start, start + Duration::days(14), time);

        let expected: Vec<NaiveDateTime> = [1, 3, 8, 10, 15]
            .iter()
            .map(|d| date(2024, 1, *d).and_hms_opt(18, 30, 0).unwrap())
            .collect();
        assert_eq!(starts, expected);
    }

    #[test]
    fn test_weekly_without_days_keeps_every_day() {
        let rule = Recurrence::parse("FREQ=WEEKLY");
        let starts = rule.expand(date(2024, 1, 1), date(2024, 1, 7), midnight());
        assert_eq!(starts.len(), 7);
    }

    #[test]
    fn test_daily_ignores_weekday_set() {
        let rule = Recurrence::parse("FREQ=DAILY;BYDAY=MO");
        let starts = rule.expand(date(2024, 1, 1), date(2024, 1, 3), midnight());
        assert_eq!(starts.len(), 3);
    }

    #[test]
    fn test_unknown_frequency_matches_every_day() {
        let rule = Recurrence::parse("FREQ=MONTHLY;BYDAY=MO");
        assert_eq!(rule.frequency, Frequency::Other);
        assert!(rule.matches(date(2024, 1, 2)));
        assert!(rule.matches(date(2024, 1, 6)));
        let starts = rule.expand(date(2024, 1, 1), date(2024, 1, 10), midnight());
        assert_eq!(starts.len(), 10);
    }

    #[test]
    fn test_time_of_day_falls_back_to_window_start() {
        let fallback = NaiveTime::from_hms_opt(9, 15, 0).unwrap();
        assert_eq!(Recurrence::parse("FREQ=DAILY").time_of_day(fallback), fallback);
        assert_eq!(
            Recurrence::parse("FREQ=DAILY;BYHOUR=7").time_of_day(fallback),
            NaiveTime::from_hms_opt(7, 15, 0).unwrap()
        );
        assert_eq!(
            Recurrence::parse("BYMINUTE=0").time_of_day(fallback),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_empty_range() {
        let rule = Recurrence::parse("FREQ=DAILY");
        assert!(rule.expand(date(2024, 1, 5), date(2024, 1, 4), midnight()).is_empty());
    }
}
