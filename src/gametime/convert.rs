use serde::{Deserialize, Serialize};

/// Whole hours and minutes of an in-game day.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HourMinute {
    pub hours: u8,
    pub minutes: u8,
}

/// Converts a day fraction in hours (`[0, 24)`) to whole hours and minutes.
///
/// Minutes are rounded to the nearest whole minute but never report `60`,
/// and hours never report `24`, so `23.999` reads `23:59` rather than `24:00`.
pub fn to_hour_minute(time_of_day: f64) -> HourMinute {
    if !time_of_day.is_finite() {
        return HourMinute::default();
    }

    let time_of_day = time_of_day.rem_euclid(24.0);
    let mut hours = time_of_day.floor() as u32;
    let mut minutes = ((time_of_day - hours as f64) * 60.0).round() as u32;

    if minutes >= 60 {
        minutes = 59;
    }
    if hours >= 24 {
        hours = 0;
    }

    HourMinute {
        hours: hours as u8,
        minutes: minutes as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_half_hours() {
        assert_eq!(
            to_hour_minute(13.5),
            HourMinute {
                hours: 13,
                minutes: 30
            }
        );
    }

    #[test]
    fn end_of_day_never_rolls_over() {
        let hm = to_hour_minute(23.999);
        assert_eq!(hm.hours, 23);
        assert_eq!(hm.minutes, 59);
    }

    #[test]
    fn out_of_range_values_wrap() {
        assert_eq!(to_hour_minute(24.0), HourMinute::default());
        assert_eq!(to_hour_minute(f64::NAN), HourMinute::default());
    }

    #[test]
    fn stays_within_bounds_and_close_to_total_minutes() {
        let mut t = 0.0;
        while t < 24.0 {
            let hm = to_hour_minute(t);
            assert!(hm.hours <= 23, "hours out of range for {t}");
            assert!(hm.minutes <= 59, "minutes out of range for {t}");

            let total = hm.hours as i64 * 60 + hm.minutes as i64;
            let expected = (t * 60.0).round() as i64;
            assert!((total - expected).abs() <= 1, "{t}: {total} vs {expected}");
            t += 0.0137;
        }
    }
}
