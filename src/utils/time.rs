use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};

const UTC_PLUS_8: i32 = 8 * 3600;
const UTC_PLUS_7: i32 = 7 * 3600;

/// Calendar day key (`YYYY-MM-DD`) in UTC+8, used for `USER_STATS`/
/// `GLOBAL_STATS` coordination-store keys and the daily-reset boundary.
pub fn utc8_day_key(now: DateTime<Utc>) -> String {
    now.with_timezone(&fixed_offset(UTC_PLUS_8))
        .format("%Y-%m-%d")
        .to_string()
}

/// The next UTC+8 midnight strictly after `now`, expressed in UTC.
pub fn next_utc8_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    next_midnight(now, UTC_PLUS_8)
}

/// The next UTC+7 midnight strictly after `now`, expressed in UTC — the
/// default cooling-restoration deadline when upstream gives no reset hint.
pub fn next_utc7_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    next_midnight(now, UTC_PLUS_7)
}

fn next_midnight(now: DateTime<Utc>, offset_secs: i32) -> DateTime<Utc> {
    let tz = fixed_offset(offset_secs);
    let local = now.with_timezone(&tz);
    let today_midnight = local
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_local_timezone(tz)
        .single()
        .expect("fixed offset is never ambiguous");
    let next = if today_midnight > local {
        today_midnight
    } else {
        today_midnight + Duration::days(1)
    };
    next.with_timezone(&Utc)
}

fn fixed_offset(secs: i32) -> FixedOffset {
    FixedOffset::east_opt(secs).expect("offset within +-24h")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_utc8_midnight_is_strictly_after_now() {
        let now = Utc.with_ymd_and_hms(2026, 7, 31, 23, 59, 0).unwrap();
        let next = next_utc8_midnight(now);
        assert!(next > now);
        assert!(next - now <= Duration::hours(24));
    }

    #[test]
    fn utc8_day_key_rolls_over_at_utc8_midnight() {
        // 16:00 UTC == 00:00 UTC+8 of the next day.
        let just_before = Utc.with_ymd_and_hms(2026, 7, 31, 15, 59, 59).unwrap();
        let just_after = Utc.with_ymd_and_hms(2026, 7, 31, 16, 0, 0).unwrap();
        assert_ne!(utc8_day_key(just_before), utc8_day_key(just_after));
    }
}
