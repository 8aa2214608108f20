use chrono::{DateTime, NaiveDateTime};

pub struct TimeUtils;

impl TimeUtils {
    pub const MS_IN_S: i64 = 1000;
    pub const MS_IN_MIN: i64 = Self::MS_IN_S * 60;
    pub const MS_IN_5_MIN: i64 = Self::MS_IN_S * 60 * 5;
    pub const MS_IN_15_MIN: i64 = Self::MS_IN_S * 60 * 15;
    pub const MS_IN_30_MIN: i64 = Self::MS_IN_S * 60 * 30;
    pub const MS_IN_H: i64 = Self::MS_IN_MIN * 60;
    pub const MS_IN_D: i64 = Self::MS_IN_H * 24;
    pub const STANDARD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
}

/// Epoch-ms to a naive wall-clock datetime. Bars carry host timestamps as
/// epoch ms; the session engine does all its calendar math in naive space.
pub fn epoch_ms_to_naive(epoch_ms: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(epoch_ms).map(|dt| dt.naive_utc())
}

pub fn naive_to_epoch_ms(naive: NaiveDateTime) -> i64 {
    naive.and_utc().timestamp_millis()
}

/// Used for display/log purposes only.
pub fn epoch_ms_to_string(epoch_ms: i64) -> String {
    match epoch_ms_to_naive(epoch_ms) {
        Some(dt) => dt.format(TimeUtils::STANDARD_TIME_FORMAT).to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_naive_roundtrip() {
        let ms = 1_700_000_000_000;
        let naive = epoch_ms_to_naive(ms).unwrap();
        assert_eq!(naive_to_epoch_ms(naive), ms);
    }

    #[test]
    fn test_display_format() {
        // 2023-11-14 22:13 UTC
        let s = epoch_ms_to_string(1_700_000_000_000);
        assert_eq!(s, "2023-11-14 22:13");
    }
}
