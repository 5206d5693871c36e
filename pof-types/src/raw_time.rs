//! Source-preserving temporal representations.
//!
//! These carry zone/offset and nanosecond precision the way the wire format
//! does, rather than normalizing into a single native clock type, so that a
//! value round-trips exactly regardless of what native date/time library
//! (if any) the caller has on hand.

use crate::error::Result;
use crate::io::{PofSink, PofSource};
use crate::packed::{read_packed_i32, write_packed_i32};

/// How a [`RawTime`] expresses its relationship to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeZone {
    /// No zone information; the time is local to an unspecified zone.
    NoZone,
    /// UTC.
    Utc,
    /// A fixed offset from UTC, in whole minutes (may be negative).
    Offset {
        /// Offset from UTC in minutes, e.g. `-300` for UTC-05:00.
        offset_minutes: i32,
    },
}

impl TimeZone {
    fn encode<S: PofSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        match self {
            TimeZone::NoZone => write_packed_i32(sink, 0),
            TimeZone::Utc => write_packed_i32(sink, 1),
            TimeZone::Offset { offset_minutes } => {
                write_packed_i32(sink, 2)?;
                write_packed_i32(sink, *offset_minutes)
            }
        }
    }

    fn decode<S: PofSource + ?Sized>(source: &mut S) -> Result<Self> {
        Ok(match read_packed_i32(source)? {
            1 => TimeZone::Utc,
            2 => TimeZone::Offset {
                offset_minutes: read_packed_i32(source)?,
            },
            _ => TimeZone::NoZone,
        })
    }
}

/// A calendar date, independent of any time component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawDate {
    /// Proleptic Gregorian year, may be negative.
    pub year: i32,
    /// Month, `1..=12`.
    pub month: u8,
    /// Day of month, `1..=31`.
    pub day: u8,
}

impl RawDate {
    /// Encodes the packed year/month/day triplet.
    pub fn encode<S: PofSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        write_packed_i32(sink, self.year)?;
        write_packed_i32(sink, self.month as i32)?;
        write_packed_i32(sink, self.day as i32)
    }

    /// Decodes a packed year/month/day triplet.
    pub fn decode<S: PofSource + ?Sized>(source: &mut S) -> Result<Self> {
        let year = read_packed_i32(source)?;
        let month = read_packed_i32(source)? as u8;
        let day = read_packed_i32(source)? as u8;
        Ok(Self { year, month, day })
    }
}

/// A time of day with optional zone/offset and nanosecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawTime {
    /// Hour, `0..=23`.
    pub hour: u8,
    /// Minute, `0..=59`.
    pub minute: u8,
    /// Second, `0..=60` (60 to allow leap seconds).
    pub second: u8,
    /// Fractional second, in nanoseconds, `0..999_999_999`.
    pub nanos: u32,
    /// Source zone/offset.
    pub zone: TimeZone,
}

impl RawTime {
    /// Encodes the packed hour/minute/second/fraction/zone fields.
    pub fn encode<S: PofSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        write_packed_i32(sink, self.hour as i32)?;
        write_packed_i32(sink, self.minute as i32)?;
        write_packed_i32(sink, self.second as i32)?;
        write_packed_i32(sink, self.nanos as i32)?;
        self.zone.encode(sink)
    }

    /// Decodes the packed hour/minute/second/fraction/zone fields.
    pub fn decode<S: PofSource + ?Sized>(source: &mut S) -> Result<Self> {
        let hour = read_packed_i32(source)? as u8;
        let minute = read_packed_i32(source)? as u8;
        let second = read_packed_i32(source)? as u8;
        let nanos = read_packed_i32(source)? as u32;
        let zone = TimeZone::decode(source)?;
        Ok(Self {
            hour,
            minute,
            second,
            nanos,
            zone,
        })
    }
}

/// A combined date and time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawDateTime {
    /// The calendar date.
    pub date: RawDate,
    /// The time of day.
    pub time: RawTime,
}

impl RawDateTime {
    /// Encodes the date followed by the time.
    pub fn encode<S: PofSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        self.date.encode(sink)?;
        self.time.encode(sink)
    }

    /// Decodes the date followed by the time.
    pub fn decode<S: PofSource + ?Sized>(source: &mut S) -> Result<Self> {
        let date = RawDate::decode(source)?;
        let time = RawTime::decode(source)?;
        Ok(Self { date, time })
    }
}

/// A year-month interval (e.g. "+3 years, -1 month").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawYearMonthInterval {
    /// Whole years.
    pub years: i32,
    /// Whole months, independent of `years`.
    pub months: i32,
}

impl RawYearMonthInterval {
    /// Encodes years then months.
    pub fn encode<S: PofSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        write_packed_i32(sink, self.years)?;
        write_packed_i32(sink, self.months)
    }

    /// Decodes years then months.
    pub fn decode<S: PofSource + ?Sized>(source: &mut S) -> Result<Self> {
        let years = read_packed_i32(source)?;
        let months = read_packed_i32(source)?;
        Ok(Self { years, months })
    }
}

/// A day-time interval (e.g. "+1 day, 02:03:04.5").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawDayTimeInterval {
    /// Whole days.
    pub days: i32,
    /// Hours, independent of `days`.
    pub hours: i32,
    /// Minutes, independent of `hours`.
    pub minutes: i32,
    /// Seconds, independent of `minutes`.
    pub seconds: i32,
    /// Nanoseconds, independent of `seconds`.
    pub nanos: i32,
}

impl RawDayTimeInterval {
    /// Encodes days/hours/minutes/seconds/nanos in order.
    pub fn encode<S: PofSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        write_packed_i32(sink, self.days)?;
        write_packed_i32(sink, self.hours)?;
        write_packed_i32(sink, self.minutes)?;
        write_packed_i32(sink, self.seconds)?;
        write_packed_i32(sink, self.nanos)
    }

    /// Decodes days/hours/minutes/seconds/nanos in order.
    pub fn decode<S: PofSource + ?Sized>(source: &mut S) -> Result<Self> {
        let days = read_packed_i32(source)?;
        let hours = read_packed_i32(source)?;
        let minutes = read_packed_i32(source)?;
        let seconds = read_packed_i32(source)?;
        let nanos = read_packed_i32(source)?;
        Ok(Self {
            days,
            hours,
            minutes,
            seconds,
            nanos,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_roundtrip() {
        let d = RawDate {
            year: -44,
            month: 3,
            day: 17,
        };
        let mut buf = Vec::new();
        d.encode(&mut buf).unwrap();
        let mut slice = buf.as_slice();
        assert_eq!(RawDate::decode(&mut slice).unwrap(), d);
    }

    #[test]
    fn time_with_offset_roundtrip() {
        let t = RawTime {
            hour: 23,
            minute: 59,
            second: 60,
            nanos: 123_456_789,
            zone: TimeZone::Offset {
                offset_minutes: -480,
            },
        };
        let mut buf = Vec::new();
        t.encode(&mut buf).unwrap();
        let mut slice = buf.as_slice();
        assert_eq!(RawTime::decode(&mut slice).unwrap(), t);
    }

    #[test]
    fn intervals_roundtrip() {
        let ym = RawYearMonthInterval {
            years: 3,
            months: -1,
        };
        let mut buf = Vec::new();
        ym.encode(&mut buf).unwrap();
        let mut slice = buf.as_slice();
        assert_eq!(RawYearMonthInterval::decode(&mut slice).unwrap(), ym);

        let dt = RawDayTimeInterval {
            days: 1,
            hours: 2,
            minutes: 3,
            seconds: 4,
            nanos: 500_000_000,
        };
        let mut buf = Vec::new();
        dt.encode(&mut buf).unwrap();
        let mut slice = buf.as_slice();
        assert_eq!(RawDayTimeInterval::decode(&mut slice).unwrap(), dt);
    }
}
