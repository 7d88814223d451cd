use time::{Date, Duration, OffsetDateTime};

/// One weekly (or biweekly) recurring class slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
  /// First concrete instance, carrying the timetable's fixed UTC offset.
  pub first: OffsetDateTime,
  /// Exclusive end of the recurrence window.
  pub until_exclusive: Date,
  pub subject: String,
  pub teacher: String,
  /// `None` means no physical room is assigned.
  pub location: Option<String>,
  /// 1 for every week, 2 for alternating weeks.
  pub interval_weeks: u8,
  /// `None` means the lesson applies to all subgroups.
  pub subgroup: Option<u8>,
  /// Instants on which this otherwise recurring lesson does not occur.
  pub exceptions: Vec<OffsetDateTime>,
  pub comment: String,
}

/// Parse result: the validity window from the document title plus all
/// lessons in document row order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timetable {
  pub date_from: Date,
  pub date_to_exclusive: Date,
  pub lessons: Vec<Lesson>,
}

impl Lesson {
  /// Concrete instants of the recurrence: every `interval_weeks` weeks from
  /// `first` while the date is before `until_exclusive`, minus `exceptions`.
  pub fn occurrences(&self) -> impl Iterator<Item = OffsetDateTime> + '_ {
    let step = Duration::weeks(i64::from(self.interval_weeks));
    let mut next = self.first;

    std::iter::from_fn(move || {
      while next.date() < self.until_exclusive {
        let instant = next;
        next += step;

        if !self.exceptions.contains(&instant) {
          return Some(instant);
        }
      }

      None
    })
  }
}
