use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};

/// A recurring local-time-of-day trading window. `open > close` means the
/// session wraps past midnight and the end lands on the next calendar day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionWindow {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl SessionWindow {
    pub fn new(open: NaiveTime, close: NaiveTime) -> Self {
        Self { open, close }
    }

    /// Concrete `[start, end]` instants for this window on `date`.
    ///
    /// Returns `None` when the close date would fall outside the supported
    /// calendar range; the caller logs and skips that date.
    pub fn materialize(&self, date: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let start = date.and_time(self.open);
        let close_date = if self.open > self.close {
            date.checked_add_days(Days::new(1))?
        } else {
            date
        };
        let end = close_date.and_time(self.close);
        Some((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_same_day_session() {
        let window = SessionWindow::new(t(9, 30), t(16, 0));
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let (start, end) = window.materialize(date).unwrap();
        assert_eq!(start, date.and_time(t(9, 30)));
        assert_eq!(end, date.and_time(t(16, 0)));
    }

    #[test]
    fn test_overnight_session_wraps_to_next_day() {
        let window = SessionWindow::new(t(22, 0), t(6, 0));
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let (start, end) = window.materialize(date).unwrap();
        assert_eq!(start, date.and_time(t(22, 0)));
        assert_eq!(
            end,
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_time(t(6, 0))
        );
        assert!(end > start);
    }

    #[test]
    fn test_calendar_boundary_is_not_fatal() {
        let window = SessionWindow::new(t(22, 0), t(6, 0));
        // The far edge of chrono's calendar cannot produce a next day
        assert!(window.materialize(NaiveDate::MAX).is_none());
    }
}
