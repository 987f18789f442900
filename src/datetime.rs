use crate::Error;

const SECONDS_PER_DAY: i64 = 86_400;

/// A UTC calendar date and time with one-second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DateTime {
    /// Creates a `DateTime`, rejecting fields that do not form a real date.
    pub fn new(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<DateTime, Error> {
        if !(1..=12).contains(&month)
            || day == 0
            || day > days_in_month(year, month)
            || hour > 23
            || minute > 59
            || second > 59
        {
            return Err(Error::InvalidDateTime);
        }
        Ok(DateTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    /// ISO 8601 day of the week, Monday = 1 through Sunday = 7.
    pub fn weekday(&self) -> u8 {
        // 1970-01-01 was a Thursday.
        ((self.days_since_epoch() + 3).rem_euclid(7) + 1) as u8
    }

    /// Milliseconds since 1970-01-01T00:00:00Z.
    pub fn epoch_millis(&self) -> i64 {
        let secs = self.days_since_epoch() * SECONDS_PER_DAY
            + i64::from(self.hour) * 3600
            + i64::from(self.minute) * 60
            + i64::from(self.second);
        secs * 1000
    }

    /// Converts milliseconds since the Unix epoch to a `DateTime`, dropping
    /// the sub-second part.
    pub fn from_epoch_millis(millis: i64) -> Result<DateTime, Error> {
        let secs = millis.div_euclid(1000);
        let days = secs.div_euclid(SECONDS_PER_DAY);
        let rem = secs.rem_euclid(SECONDS_PER_DAY);

        let (year, month, day) = civil_from_days(days);
        let year = u16::try_from(year).map_err(|_| Error::InvalidArg)?;
        DateTime::new(
            year,
            month,
            day,
            (rem / 3600) as u8,
            ((rem % 3600) / 60) as u8,
            (rem % 60) as u8,
        )
    }

    fn days_since_epoch(&self) -> i64 {
        days_from_civil(i64::from(self.year), self.month, self.day)
    }
}

pub fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

// Days since 1970-01-01 of a proleptic Gregorian date (Hinnant's algorithm).
fn days_from_civil(year: i64, month: u8, day: u8) -> i64 {
    let month = i64::from(month);
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let yoe = year - era * 400;
    let mp = (month + 9) % 12;
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(days: i64) -> (i64, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_impossible_dates() {
        assert_eq!(DateTime::new(2023, 2, 29, 0, 0, 0), Err(Error::InvalidDateTime));
        assert_eq!(DateTime::new(2023, 13, 1, 0, 0, 0), Err(Error::InvalidDateTime));
        assert_eq!(DateTime::new(2023, 4, 31, 0, 0, 0), Err(Error::InvalidDateTime));
        assert_eq!(DateTime::new(2023, 1, 1, 24, 0, 0), Err(Error::InvalidDateTime));
        assert_eq!(DateTime::new(2023, 1, 0, 0, 0, 0), Err(Error::InvalidDateTime));
        assert!(DateTime::new(2024, 2, 29, 23, 59, 59).is_ok());
        assert!(DateTime::new(2000, 2, 29, 0, 0, 0).is_ok());
        assert!(DateTime::new(1900, 2, 29, 0, 0, 0).is_err());
    }

    #[test]
    fn epoch_origin() {
        let origin = DateTime::new(1970, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(origin.epoch_millis(), 0);
        assert_eq!(origin.weekday(), 4);
        assert_eq!(DateTime::from_epoch_millis(0), Ok(origin));
    }

    #[test]
    fn known_timestamps() {
        let dt = DateTime::new(2017, 12, 25, 13, 45, 30).unwrap();
        assert_eq!(dt.epoch_millis(), 1_514_209_530_000);
        assert_eq!(dt.weekday(), 1);
        assert_eq!(DateTime::from_epoch_millis(1_514_209_530_999), Ok(dt));

        let before = DateTime::new(1969, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(before.epoch_millis(), -1000);
        assert_eq!(DateTime::from_epoch_millis(-1000), Ok(before));
    }

    #[test]
    fn weekdays() {
        // 2000-01-01 was a Saturday, 2099-12-31 is a Thursday.
        assert_eq!(DateTime::new(2000, 1, 1, 0, 0, 0).unwrap().weekday(), 6);
        assert_eq!(DateTime::new(2099, 12, 31, 0, 0, 0).unwrap().weekday(), 4);
        assert_eq!(DateTime::new(2024, 3, 10, 0, 0, 0).unwrap().weekday(), 7);
    }

    #[test]
    fn millis_round_trip_across_a_leap_day() {
        let start = DateTime::new(2024, 2, 28, 12, 0, 0).unwrap().epoch_millis();
        for hours in 0..72 {
            let millis = start + hours * 3_600_000;
            let dt = DateTime::from_epoch_millis(millis).unwrap();
            assert_eq!(dt.epoch_millis(), millis);
        }
    }
}
