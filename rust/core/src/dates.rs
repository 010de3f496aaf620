// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Calendar bucketing of record timestamps.
//!
//! Day keys are `YYYY-MM-DD`, month keys `YYYY-MM`, both in the site's local
//! offset so a record made at 00:30 local time lands on the local day.

use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::error::{Error, Result};

/// `YYYY-MM-DD` of a timestamp seen from `offset`.
pub fn day_key(ts: OffsetDateTime, offset: UtcOffset) -> String {
    let date = ts.to_offset(offset).date();
    format_day(date)
}

/// `YYYY-MM` of a timestamp seen from `offset`.
pub fn month_key(ts: OffsetDateTime, offset: UtcOffset) -> String {
    let date = ts.to_offset(offset).date();
    format!("{:04}-{:02}", date.year(), u8::from(date.month()))
}

pub fn format_day(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

pub fn parse_day_key(key: &str) -> Result<Date> {
    Date::parse(key.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| Error::InvalidDateKey(key.to_string()))
}

pub fn parse_month_key(key: &str) -> Result<(i32, Month)> {
    let invalid = || Error::InvalidDateKey(key.to_string());
    let (year, month) = key.trim().split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || month.len() != 2 {
        return Err(invalid());
    }
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u8 = month.parse().map_err(|_| invalid())?;
    let month = Month::try_from(month).map_err(|_| invalid())?;
    Ok((year, month))
}

/// A whole day or a whole month, used by bulk deletes and day locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DateScope {
    Day(Date),
    Month { year: i32, month: Month },
}

impl DateScope {
    /// Parse `YYYY-MM-DD` as a day or `YYYY-MM` as a month.
    pub fn parse(key: &str) -> Result<Self> {
        match key.trim().len() {
            10 => parse_day_key(key).map(DateScope::Day),
            7 => parse_month_key(key).map(|(year, month)| DateScope::Month { year, month }),
            _ => Err(Error::InvalidDateKey(key.to_string())),
        }
    }

    pub fn key(&self) -> String {
        match self {
            DateScope::Day(date) => format_day(*date),
            DateScope::Month { year, month } => format!("{:04}-{:02}", year, u8::from(*month)),
        }
    }

    /// Half-open `[start, end)` interval of the scope at the given offset.
    pub fn bounds(&self, offset: UtcOffset) -> Result<(OffsetDateTime, OffsetDateTime)> {
        let invalid = || Error::InvalidDateKey(self.key());
        let (first, next) = match *self {
            DateScope::Day(date) => (date, date.next_day().ok_or_else(invalid)?),
            DateScope::Month { year, month } => {
                let first = Date::from_calendar_date(year, month, 1).map_err(|_| invalid())?;
                let (next_year, next_month) = if month == Month::December {
                    (year + 1, Month::January)
                } else {
                    (year, month.next())
                };
                let next =
                    Date::from_calendar_date(next_year, next_month, 1).map_err(|_| invalid())?;
                (first, next)
            }
        };
        Ok((
            PrimitiveDateTime::new(first, Time::MIDNIGHT).assume_offset(offset),
            PrimitiveDateTime::new(next, Time::MIDNIGHT).assume_offset(offset),
        ))
    }

    pub fn contains(&self, ts: OffsetDateTime, offset: UtcOffset) -> bool {
        let date = ts.to_offset(offset).date();
        match *self {
            DateScope::Day(day) => date == day,
            DateScope::Month { year, month } => date.year() == year && date.month() == month,
        }
    }
}
