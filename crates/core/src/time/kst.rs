use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};

// KST has no DST; a fixed shift is exact.
const KST_OFFSET_SECS: i64 = 9 * 3600;

pub fn to_kst_naive(now_utc: DateTime<Utc>) -> NaiveDateTime {
    now_utc.naive_utc() + Duration::seconds(KST_OFFSET_SECS)
}

/// Wall-clock stamp shown next to generated views, e.g. `2026-01-05 17:00:00`.
pub fn job_date_time(now_utc: DateTime<Utc>) -> String {
    to_kst_naive(now_utc).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// KIS `fid_input_date_*` format for the KST calendar day.
pub fn input_date(now_utc: DateTime<Utc>) -> String {
    to_kst_naive(now_utc).format("%Y%m%d").to_string()
}

/// Parses a KIS wall time ("YYYY-MM-DD HH:MM:SS", KST) into UTC.
pub fn parse_kst_wall_time(s: &str) -> Option<DateTime<Utc>> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(t, "%Y-%m-%d %H:%M:%S").ok()?;
    Some(Utc.from_utc_datetime(&(naive - Duration::seconds(KST_OFFSET_SECS))))
}
