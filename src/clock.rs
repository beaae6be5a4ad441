//! Wall clock access and the spoken time/date reports.

use chrono::{Local, NaiveDateTime};

/// Source of the current local time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// The system's local clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// "The current time is 03:07 PM"
pub fn time_report(now: NaiveDateTime) -> String {
    format!("The current time is {}", now.format("%I:%M %p"))
}

/// "Today is Monday, October 19, 2026"
pub fn date_report(now: NaiveDateTime) -> String {
    format!("Today is {}", now.format("%A, %B %d, %Y"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_time_report_uses_twelve_hour_clock() {
        assert_eq!(time_report(at(15, 7)), "The current time is 03:07 PM");
        assert_eq!(time_report(at(0, 30)), "The current time is 12:30 AM");
        assert_eq!(time_report(at(12, 0)), "The current time is 12:00 PM");
    }

    #[test]
    fn test_date_report() {
        assert_eq!(date_report(at(9, 0)), "Today is Monday, October 19, 2026");
        let new_year = NaiveDate::from_ymd_opt(2027, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(date_report(new_year), "Today is Friday, January 01, 2027");
    }
}
