//! Serial day-count → calendar date-time conversion.
//!
//! Spreadsheet dates are a float count of days from an epoch: 1899-12-30 in
//! the 1900 date system, 1904-01-01 in the 1904 system. The 1900 system
//! believes 1900 was a leap year, so serial 60 names the non-existent
//! 1900-02-29 and every serial before it is one day off from a plain count.
//! Serials up to 61 therefore go through a Julian-day transform and get the
//! leap-day correction; later serials are a straight offset from the epoch.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Modified Julian Date epoch, as a Julian date.
const MJD_0: f64 = 2_400_000.5;
/// MJD of 1899-12-30.
const MJD_OFFSET_1900: f64 = 15_018.0;
/// MJD of 1904-01-01.
const MJD_OFFSET_1904: f64 = 16_480.0;
/// Last serial routed through the Julian transform.
const JULIAN_WINDOW_END: i64 = 61;
/// Serial of the fictitious 1900-02-29.
const FICTITIOUS_LEAP_DAY: i64 = 60;
const NANOS_PER_DAY: f64 = 86_400_000_000_000.0;
/// Serial of 9999-12-31; anything further out is not a date.
const MAX_SERIAL: f64 = 2_958_465.0;

/// Which epoch serial 0 refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DateMode {
    /// Serial 0 is 1899-12-30.
    #[default]
    Epoch1900,
    /// Serial 0 is 1904-01-01.
    Epoch1904,
}

impl DateMode {
    /// Interpret the DATEMODE record flag.
    pub fn from_flag(flag: u16) -> Self {
        if flag == 1 {
            DateMode::Epoch1904
        } else {
            DateMode::Epoch1900
        }
    }
}

/// Convert a serial day count to a date-time.
///
/// Returns `None` for non-finite input or serials past year 9999 either way.
pub fn from_serial(serial: f64, mode: DateMode) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial.abs() > MAX_SERIAL {
        return None;
    }

    let whole = serial.trunc();
    let whole_days = whole as i64;

    if whole_days <= JULIAN_WINDOW_END {
        let offset = match mode {
            DateMode::Epoch1900 => MJD_OFFSET_1900,
            DateMode::Epoch1904 => MJD_OFFSET_1904,
        };
        let date = julian_to_gregorian(MJD_0 + offset, serial)?;
        if mode == DateMode::Epoch1900 && (1..FICTITIOUS_LEAP_DAY).contains(&whole_days) {
            // before the phantom leap day the 1900 system counts 1900-01-01 as 1
            return date.checked_add_signed(Duration::days(1));
        }
        return Some(date);
    }

    let base = match mode {
        DateMode::Epoch1900 => NaiveDate::from_ymd_opt(1899, 12, 30)?,
        DateMode::Epoch1904 => NaiveDate::from_ymd_opt(1904, 1, 1)?,
    };
    let nanos = ((serial - whole) * NANOS_PER_DAY) as i64;
    base.and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::days(whole_days))?
        .checked_add_signed(Duration::nanoseconds(nanos))
}

/// Convert a Julian date given as two parts into a calendar date-time.
fn julian_to_gregorian(part1: f64, part2: f64) -> Option<NaiveDateTime> {
    let (int1, frac1) = (part1.trunc(), part1.fract());
    let (int2, frac2) = (part2.trunc(), part2.fract());

    let (days, fraction) = shift_to_midnight(int1 + int2, frac1 + frac2);

    let (day, month, year) = fliegel_van_flandern(days as i64);
    let date = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month as u32, day as u32)?;
    Some(date.and_time(time_of_day(fraction)?))
}

/// Move the day boundary from astronomical noon to midnight.
fn shift_to_midnight(mut days: f64, mut fraction: f64) -> (f64, f64) {
    if -0.5 < fraction && fraction < 0.5 {
        fraction += 0.5;
    } else if fraction >= 0.5 {
        days += 1.0;
        fraction -= 0.5;
    } else {
        days -= 1.0;
        fraction += 1.5;
    }
    (days, fraction)
}

/// Split a fraction of a day into a wall-clock time.
fn time_of_day(fraction: f64) -> Option<NaiveTime> {
    let total = (fraction * NANOS_PER_DAY) as i64;
    let nanos = total % 1_000_000_000;
    let secs = total / 1_000_000_000;
    let seconds = secs % 60;
    let minutes = (secs / 60) % 60;
    let hours = secs / 3600;
    NaiveTime::from_hms_nano_opt(hours as u32, minutes as u32, seconds as u32, nanos as u32)
}

/// Julian day number to (day, month, year).
///
/// H. F. Fliegel and T. C. Van Flandern, CACM 11(10), October 1968, p. 657.
fn fliegel_van_flandern(jd: i64) -> (i64, i64, i64) {
    let mut l = jd + 68569;
    let n = (4 * l) / 146097;
    l -= (146097 * n + 3) / 4;
    let i = (4000 * (l + 1)) / 1461001;
    l = l - (1461 * i) / 4 + 31;
    let j = (80 * l) / 2447;
    let d = l - (2447 * j) / 80;
    l = j / 11;
    let m = j + 2 - (12 * l);
    let y = 100 * (n - 49) + i + l;
    (d, m, y)
}
