//! The table walk: title validation, the weekday-block state machine, the
//! cell interpreter and the recurrence resolver.

use once_cell::sync::Lazy;
use regex::Regex;
use select::document::Document;
use select::node::Node;
use select::predicate::{Class, Name, Predicate, Text};
use time::{Date, Duration, PrimitiveDateTime, Time, UtcOffset};

use crate::annotation;
use crate::annotation::WeekParity;
use crate::error::ParseError;
use crate::model::{Lesson, Timetable};

static TITLE_REGEX: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"с\s+(\d+)\.(\d+)\.(\d+)\s+по\s+(\d+)\.(\d+)\.(\d+)").unwrap());

const EXPECTED_HEADER: [&str; 7] = [
  "дата",
  "время",
  "подгр.",
  "предмет",
  "преподаватель",
  "ауд.",
  "комм.",
];
const DAYS_OF_WEEK: [&str; 7] = ["Пн", "Вт", "Ср", "Чт", "Пт", "Сб", "Вс"];

/// Marker for classes held remotely; such rows are not schedulable events.
const DISTANCE_LEARNING: &str = "ДОТ";

enum RowState {
  ExpectWeekdayHeader,
  ExpectLessonRow { weekday: u8, remaining: u32 },
}

struct Context {
  date_from: Date,
  date_to_exclusive: Date,
  timezone: UtcOffset,
  subgroup_filter: Option<u8>,
}

/// Everything the cell interpreter extracts from one lesson row.
struct LessonCells {
  subgroup: Option<u8>,
  subject: String,
  teacher: String,
  location: Option<String>,
  comment: String,
}

/// Parses a fetched timetable page into a [`Timetable`]. Fails on the first
/// structural violation, returning no partial result.
pub fn parse_document(
  document: &Document,
  timezone: UtcOffset,
  subgroup_filter: Option<u8>,
) -> Result<Timetable, ParseError> {
  // The title carries the validity window: "с d.m.y по d.m.y".
  let title = match document.find(Name("h3")).next() {
    None => return Err(ParseError::TitleFormat),
    Some(title) => collapse_text(title),
  };

  let captures = TITLE_REGEX.captures(&title).ok_or(ParseError::TitleFormat)?;
  let date_from = annotation::date_in_year(&captures[1], &captures[2], parse_year(&captures[3])?)?;
  let date_to = annotation::date_in_year(&captures[4], &captures[5], parse_year(&captures[6])?)?;
  // The title names an inclusive last day.
  let date_to_exclusive = date_to + Duration::days(1);

  let table = document
    .find(Name("table").and(Class("shedultable")))
    .next()
    .ok_or(ParseError::MissingTable)?;

  let mut rows = table.find(Name("tr"));

  // The first row is always the header. Check that it has not changed, so
  // that a reworked page template fails loudly instead of misparsing.
  let header = rows
    .next()
    .map(|row| {
      collapse_text(row)
        .split_whitespace()
        .map(str::to_string)
        .collect::<Vec<String>>()
    })
    .unwrap_or_default();

  if header != EXPECTED_HEADER {
    return Err(ParseError::HeaderFormat(header));
  }

  let context = Context {
    date_from,
    date_to_exclusive,
    timezone,
    subgroup_filter,
  };

  let mut state = RowState::ExpectWeekdayHeader;
  // The hours column is merged across sibling rows; the last explicit value
  // is carried forward for continuation rows.
  let mut carried_hours: Option<Vec<Time>> = None;
  let mut lessons = Vec::new();

  for row in rows {
    state = match state {
      RowState::ExpectWeekdayHeader => {
        let (weekday, remaining) = parse_weekday_header(row)?;

        if remaining == 0 {
          RowState::ExpectWeekdayHeader
        } else {
          RowState::ExpectLessonRow { weekday, remaining }
        }
      }
      RowState::ExpectLessonRow { weekday, remaining } => {
        process_lesson_row(&context, weekday, row, &mut carried_hours, &mut lessons)?;

        if remaining == 1 {
          RowState::ExpectWeekdayHeader
        } else {
          RowState::ExpectLessonRow {
            weekday,
            remaining: remaining - 1,
          }
        }
      }
    };
  }

  Ok(Timetable {
    date_from,
    date_to_exclusive,
    lessons,
  })
}

/// A weekday header row holds a single rowspanned cell naming the day; the
/// span covers the header row itself plus its lesson rows.
fn parse_weekday_header(row: Node) -> Result<(u8, u32), ParseError> {
  let cell = row
    .find(Name("td"))
    .next()
    .ok_or_else(|| ParseError::UnknownWeekday(String::new()))?;

  let name = match cell.find(Name("b")).next() {
    Some(bold) => collapse_text(bold),
    None => collapse_text(cell),
  };

  let weekday = DAYS_OF_WEEK
    .iter()
    .position(|day| *day == name)
    .ok_or_else(|| ParseError::UnknownWeekday(name.clone()))? as u8;

  let rowspan = cell
    .attr("rowspan")
    .and_then(|value| value.parse::<u32>().ok())
    .ok_or(ParseError::MissingRowspan(name))?;

  Ok((weekday, rowspan.saturating_sub(1)))
}

fn process_lesson_row(
  context: &Context,
  weekday: u8,
  row: Node,
  carried_hours: &mut Option<Vec<Time>>,
  lessons: &mut Vec<Lesson>,
) -> Result<(), ParseError> {
  let mut cells = row.find(Name("td")).collect::<Vec<Node>>();

  let has_own_hours = match cells.len() {
    6 => true,
    5 => false,
    count => return Err(ParseError::LessonRowShape(count)),
  };

  let hours = if has_own_hours {
    let hours = parse_hours(&collapse_text(cells.remove(0)))?;
    *carried_hours = Some(hours.clone());
    hours
  } else {
    carried_hours.clone().ok_or(ParseError::MissingHours)?
  };

  let cells = match interpret_cells(context, &cells)? {
    None => return Ok(()),
    Some(cells) => cells,
  };

  resolve(context, weekday, &hours, has_own_hours, cells, lessons)
}

/// Cell interpreter. Returns `Ok(None)` for rows that are not lessons for
/// us: another subgroup, a free-standing note, or a remote class.
fn interpret_cells(context: &Context, cells: &[Node]) -> Result<Option<LessonCells>, ParseError> {
  let subgroup_text = collapse_text(cells[0]);
  let subgroup = if subgroup_text.is_empty() {
    None
  } else {
    let subgroup = subgroup_text
      .trim_end_matches(')')
      .parse::<u8>()
      .map_err(|_| ParseError::InvalidSubgroup(subgroup_text))?;

    if let Some(filter) = context.subgroup_filter {
      if subgroup != filter {
        return Ok(None);
      }
    }

    Some(subgroup)
  };

  // Real subjects start with a parenthesized kind marker like "(лек)";
  // anything else is a note spanning the row.
  let subject = collapse_text(cells[1]);
  if !subject.starts_with('(') {
    return Ok(None);
  }

  let teacher = collapse_text(cells[2]);

  let location = match collapse_text(cells[3]) {
    location if location == "." => None,
    location => Some(location),
  };

  let comment = collapse_text(cells[4]);

  if location.is_none() && comment.contains(DISTANCE_LEARNING) {
    return Ok(None);
  }

  Ok(Some(LessonCells {
    subgroup,
    subject,
    teacher,
    location,
    comment,
  }))
}

/// Recurrence resolver: combines the interpreted cells with the comment
/// annotations and emits one lesson per carried clock time. May retroactively
/// shorten previously emitted lessons (see the overlap correction below).
fn resolve(
  context: &Context,
  weekday: u8,
  hours: &[Time],
  has_own_hours: bool,
  cells: LessonCells,
  lessons: &mut Vec<Lesson>,
) -> Result<(), ParseError> {
  let year = context.date_from.year();

  // First date on or after the window start that falls on this weekday.
  let days_ahead = (i64::from(weekday)
    - i64::from(context.date_from.weekday().number_days_from_monday()))
  .rem_euclid(7);
  let mut first = context.date_from + Duration::days(days_ahead);
  let mut until_exclusive = context.date_to_exclusive;
  let mut interval_weeks = 1;

  let exceptions = annotation::exception_dates(&cells.comment, year)?;

  if let Some(start) = annotation::start_override(&cells.comment, year)? {
    first = start;

    // Overlap correction: a continuation row without a subgroup that names
    // its own start date replaces the lessons sharing its hours from that
    // date on. Clip every recent lesson still running to the table end.
    if cells.subgroup.is_none() && !has_own_hours {
      let lookback = lessons.len().saturating_sub(hours.len());

      for prev in &mut lessons[lookback..] {
        if prev.until_exclusive == context.date_to_exclusive {
          prev.until_exclusive = first;
        }
      }
    }
  }

  if let Some(end) = annotation::end_override(&cells.comment, year)? {
    until_exclusive = end;
  }

  if let Some(parity) = annotation::week_parity(&cells.comment) {
    // The table's first week is the upper week by definition.
    let first_is_upper = (i16::from(first.iso_week())
      - i16::from(context.date_from.iso_week()))
    .rem_euclid(2)
      == 0;

    if (parity == WeekParity::Upper) != first_is_upper {
      first += Duration::weeks(1);
    }

    interval_weeks = 2;
  }

  for clock in hours {
    lessons.push(Lesson {
      first: PrimitiveDateTime::new(first, *clock).assume_offset(context.timezone),
      until_exclusive,
      subject: cells.subject.clone(),
      teacher: cells.teacher.clone(),
      location: cells.location.clone(),
      interval_weeks,
      subgroup: cells.subgroup,
      exceptions: exceptions
        .iter()
        .map(|date| PrimitiveDateTime::new(*date, *clock).assume_offset(context.timezone))
        .collect(),
      comment: cells.comment.clone(),
    });
  }

  Ok(())
}

fn parse_hours(text: &str) -> Result<Vec<Time>, ParseError> {
  text.split_whitespace().map(parse_clock).collect()
}

fn parse_clock(clock: &str) -> Result<Time, ParseError> {
  let invalid = || ParseError::InvalidClock(clock.to_string());

  let (hour, minute) = clock.split_once(':').ok_or_else(invalid)?;
  let hour = hour.parse::<u8>().map_err(|_| invalid())?;
  let minute = minute.parse::<u8>().map_err(|_| invalid())?;

  Time::from_hms(hour, minute, 0).map_err(|_| invalid())
}

fn parse_year(year: &str) -> Result<i32, ParseError> {
  year.parse::<i32>().map_err(|_| ParseError::TitleFormat)
}

/// Descendant text joined by single spaces with whitespace runs collapsed.
fn collapse_text(node: Node) -> String {
  node
    .find(Text)
    .filter_map(|text| text.as_text())
    .flat_map(str::split_whitespace)
    .collect::<Vec<&str>>()
    .join(" ")
}
