use chrono::offset::LocalResult;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Parses an IANA zone name, falling back when the name is unknown.
pub fn parse_timezone(name: &str, fallback: Tz) -> Tz {
    match name.trim().parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            log::warn!("Unknown timezone {name:?}, falling back to {fallback}");
            fallback
        }
    }
}

/// Interprets a wall-clock time in `tz`.
///
/// Ambiguous times (DST fold) resolve to the earlier instant; times inside a DST
/// gap are pushed forward by one hour.
pub fn local_to_utc(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            let shifted = naive + Duration::hours(1);
            match tz.from_local_datetime(&shifted) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
                LocalResult::None => Utc.from_utc_datetime(&naive),
            }
        }
    }
}

pub fn to_local(tz: &Tz, dt: DateTime<Utc>) -> NaiveDateTime {
    dt.with_timezone(tz).naive_local()
}

pub fn local_date(tz: &Tz, dt: DateTime<Utc>) -> NaiveDate {
    to_local(tz, dt).date()
}

pub fn start_of_day_utc(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    local_to_utc(tz, date.and_time(NaiveTime::MIN))
}

/// Last instant (microsecond precision) of `date` in `tz`.
pub fn end_of_day_utc(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    start_of_day_utc(tz, date + Duration::days(1)) - Duration::microseconds(1)
}

/// Moves an instant by whole calendar days while keeping its local wall-clock time.
pub fn shift_days_local(tz: &Tz, dt: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    local_to_utc(tz, to_local(tz, dt) + Duration::days(days))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_timezone_fallback() {
        assert_eq!(
            parse_timezone("Europe/Moscow", chrono_tz::UTC),
            chrono_tz::Europe::Moscow
        );
        assert_eq!(
            parse_timezone("Mars/Olympus", chrono_tz::Asia::Tashkent),
            chrono_tz::Asia::Tashkent
        );
    }

    #[test]
    fn test_day_bounds_in_local_zone() {
        let tz = chrono_tz::Asia::Tashkent;
        let start = start_of_day_utc(&tz, date(2024, 11, 1));
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 10, 31, 19, 0, 0).unwrap());

        let end = end_of_day_utc(&tz, date(2024, 11, 7));
        assert_eq!(local_date(&tz, end), date(2024, 11, 7));
        assert_eq!(to_local(&tz, end).hour(), 23);
        assert_eq!(local_date(&tz, end + Duration::microseconds(1)), date(2024, 11, 8));
    }

    #[test]
    fn test_shift_keeps_wall_clock_across_dst() {
        let tz = chrono_tz::Europe::Berlin;
        // 2024-03-30 10:00 CET, DST starts on 2024-03-31
        let before = local_to_utc(&tz, date(2024, 3, 30).and_hms_opt(10, 0, 0).unwrap());
        let after = shift_days_local(&tz, before, 7);
        assert_eq!(to_local(&tz, after), date(2024, 4, 6).and_hms_opt(10, 0, 0).unwrap());
        assert_eq!(after - before, Duration::days(7) - Duration::hours(1));
    }

    #[test]
    fn test_local_gap_moves_forward() {
        let tz = chrono_tz::Europe::Berlin;
        let in_gap = date(2024, 3, 31).and_hms_opt(2, 30, 0).unwrap();
        let resolved = local_to_utc(&tz, in_gap);
        assert_eq!(to_local(&tz, resolved), date(2024, 3, 31).and_hms_opt(3, 30, 0).unwrap());
    }
}
