//! Regex extractors for the free-text comment column. Each one is a pure
//! function over the normalized comment; a missing annotation is never an
//! error, the caller keeps its default.

use once_cell::sync::Lazy;
use regex::Regex;
use time::{Date, Duration, Month};

use crate::error::ParseError;

static EXCEPTIONS_REGEX: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"((?:\d+\.\d+\s*[;,и\s]*)+) занятий не будет").unwrap());
static DATE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\.(\d+)").unwrap());
static START_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"с (\d+)\.(\d+)").unwrap());
static END_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:по|до) (\d+)\.(\d+)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekParity {
  Upper,
  Lower,
}

/// Dates of the "`d.m`[, `d.m` ...] занятий не будет" clause, reconstructed
/// with the table's start year.
pub fn exception_dates(comment: &str, year: i32) -> Result<Vec<Date>, ParseError> {
  let captures = match EXCEPTIONS_REGEX.captures(comment) {
    None => return Ok(Vec::new()),
    Some(captures) => captures,
  };

  DATE_REGEX
    .captures_iter(captures.get(1).unwrap().as_str())
    .map(|date| date_in_year(&date[1], &date[2], year))
    .collect()
}

/// "с `d.m`": the lesson starts on this date instead of the table default.
pub fn start_override(comment: &str, year: i32) -> Result<Option<Date>, ParseError> {
  START_REGEX
    .captures(comment)
    .map(|captures| date_in_year(&captures[1], &captures[2], year))
    .transpose()
}

/// "по `d.m`" or "до `d.m`": the last day the lesson takes place. The source
/// names an inclusive day, the returned date is the exclusive end.
pub fn end_override(comment: &str, year: i32) -> Result<Option<Date>, ParseError> {
  END_REGEX
    .captures(comment)
    .map(|captures| {
      date_in_year(&captures[1], &captures[2], year).map(|date| date + Duration::days(1))
    })
    .transpose()
}

/// "неделе" marks a biweekly lesson; "по верхней неделе" pins it to upper
/// weeks, anything else to lower weeks.
pub fn week_parity(comment: &str) -> Option<WeekParity> {
  if !comment.contains("неделе") {
    return None;
  }

  if comment.contains("по верхней неделе") {
    Some(WeekParity::Upper)
  } else {
    Some(WeekParity::Lower)
  }
}

pub(crate) fn date_in_year(day: &str, month: &str, year: i32) -> Result<Date, ParseError> {
  let invalid = || ParseError::InvalidDate(format!("{day}.{month}.{year}"));

  let day = day.parse::<u8>().map_err(|_| invalid())?;
  let month = month
    .parse::<u8>()
    .ok()
    .and_then(|month| Month::try_from(month).ok())
    .ok_or_else(invalid)?;

  Date::from_calendar_date(year, month, day).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
  use time::macros::date;

  use super::*;

  #[test]
  fn exceptions_single() {
    let dates = exception_dates("12.09 занятий не будет", 2024).unwrap();
    assert_eq!(dates, vec![date!(2024 - 09 - 12)]);
  }

  #[test]
  fn exceptions_joined() {
    let dates = exception_dates("12.09, 19.09 и 26.09 занятий не будет", 2024).unwrap();
    assert_eq!(
      dates,
      vec![
        date!(2024 - 09 - 12),
        date!(2024 - 09 - 19),
        date!(2024 - 09 - 26)
      ]
    );
  }

  #[test]
  fn exceptions_absent() {
    assert!(exception_dates("лекции в А-100", 2024).unwrap().is_empty());
  }

  #[test]
  fn exceptions_invalid_date() {
    assert!(exception_dates("31.02 занятий не будет", 2024).is_err());
  }

  #[test]
  fn start() {
    let date = start_override("занятия с 15.10", 2024).unwrap();
    assert_eq!(date, Some(date!(2024 - 10 - 15)));
    assert_eq!(start_override("занятия", 2024).unwrap(), None);
  }

  #[test]
  fn end_is_exclusive() {
    assert_eq!(
      end_override("по 30.11", 2024).unwrap(),
      Some(date!(2024 - 12 - 01))
    );
    assert_eq!(
      end_override("до 30.11", 2024).unwrap(),
      Some(date!(2024 - 12 - 01))
    );
    assert_eq!(end_override("каждую неделю", 2024).unwrap(), None);
  }

  #[test]
  fn parity() {
    assert_eq!(week_parity("по верхней неделе"), Some(WeekParity::Upper));
    assert_eq!(week_parity("по нижней неделе"), Some(WeekParity::Lower));
    assert_eq!(week_parity("лекция"), None);
  }
}
