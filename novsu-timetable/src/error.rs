use thiserror::Error;

/// Structural violations of the expected table shape. Every variant aborts
/// the parse: a half-correct model feeding a delete-and-recreate calendar
/// sync is worse than no model at all.
#[derive(Debug, Error)]
pub enum ParseError {
  #[error("timetable title does not contain a validity window")]
  TitleFormat,
  #[error("timetable table not found in document")]
  MissingTable,
  #[error("table header has changed: {0:?}")]
  HeaderFormat(Vec<String>),
  #[error("unknown day of week: {0:?}")]
  UnknownWeekday(String),
  #[error("weekday cell {0:?} is missing a row span")]
  MissingRowspan(String),
  #[error("lesson row has no hours cell and no previous hours to reuse")]
  MissingHours,
  #[error("lesson row has {0} cells, expected 5 or 6")]
  LessonRowShape(usize),
  #[error("invalid lesson time: {0:?}")]
  InvalidClock(String),
  #[error("invalid subgroup tag: {0:?}")]
  InvalidSubgroup(String),
  #[error("invalid calendar date: {0:?}")]
  InvalidDate(String),
}
