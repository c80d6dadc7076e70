//! Date parsing and formatting.
//!
//! Dates move through the generator as ISO `YYYY-MM-DD` strings; the
//! `datefmt` built-in reformats them with strftime-style directives. The
//! directive interpreter is hand-written over the `time` crate because
//! `time`'s own description language is not what template authors write.

use core::fmt::Write as _;
use std::time::SystemTime;
use time::{
    Date, OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem,
    macros::format_description,
};

/// The wire format for dates.
const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parses an ISO `YYYY-MM-DD` date.
pub fn parse_iso(text: &str) -> Result<Date, time::error::Parse> {
    Date::parse(text, ISO_DATE)
}

/// Formats a date as ISO `YYYY-MM-DD`.
pub fn iso(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// The current date in the system time zone, falling back to UTC when the
/// local offset cannot be determined.
pub fn today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

/// Converts a file timestamp to a date in the system time zone.
pub fn from_system_time(time: SystemTime) -> Date {
    let utc = OffsetDateTime::from(time);
    match UtcOffset::current_local_offset() {
        Ok(offset) => utc.to_offset(offset).date(),
        Err(_) => utc.date(),
    }
}

/// Formats `date` according to strftime-style `%` directives.
///
/// The supported set covers what site templates actually use: years
/// (`%Y`, `%y`), months (`%m`, `%b`, `%B`), days (`%d`, `%e`, `%j`),
/// weekdays (`%a`, `%A`, `%u`, `%w`), and the literal `%%`. Unknown
/// directives pass through unchanged.
pub fn strftime(date: Date, format: &str) -> Result<String, core::fmt::Error> {
    let mut out = String::new();
    let mut f = format.chars();
    while let Some(c) = f.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match f.next() {
            Some('Y') => write!(out, "{:04}", date.year())?,
            Some('y') => write!(out, "{:02}", date.year().rem_euclid(100))?,
            Some('m') => write!(out, "{:02}", u8::from(date.month()))?,
            Some('b' | 'h') => write!(out, "{:.3}", date.month())?,
            Some('B') => write!(out, "{}", date.month())?,
            Some('d') => write!(out, "{:02}", date.day())?,
            Some('e') => write!(out, "{:2}", date.day())?,
            Some('j') => write!(out, "{:03}", date.ordinal())?,
            Some('a') => write!(out, "{:.3}", date.weekday())?,
            Some('A') => write!(out, "{}", date.weekday())?,
            Some('u') => write!(out, "{}", date.weekday().number_days_from_monday() + 1)?,
            Some('w') => write!(out, "{}", date.weekday().number_days_from_sunday())?,
            Some('F') => out += &iso(date),
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    Ok(out)
}
