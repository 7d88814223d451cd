use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};
use uuid::Uuid;

/// One calendar event, serialized as an RFC 5545 calendar object.
#[derive(Debug, Clone)]
pub struct Event {
  pub uid: String,
  pub start: OffsetDateTime,
  pub end: OffsetDateTime,
  pub summary: String,
  pub description: String,
  pub location: Option<String>,
  pub rrule: Option<Rrule>,
  pub exdates: Vec<OffsetDateTime>,
}

/// Weekly recurrence with an exclusive end date.
#[derive(Debug, Clone, Copy)]
pub struct Rrule {
  pub interval_weeks: u8,
  pub until_exclusive: Date,
}

impl Event {
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    start: OffsetDateTime,
    end: OffsetDateTime,
    summary: String,
    description: String,
    location: Option<String>,
    rrule: Option<Rrule>,
    exdates: Vec<OffsetDateTime>,
  ) -> Self {
    Self {
      uid: Uuid::new_v4().to_string(),
      start,
      end,
      summary,
      description,
      location,
      rrule,
      exdates,
    }
  }

  pub fn to_ics(&self) -> String {
    let mut lines = vec![
      "BEGIN:VCALENDAR".to_string(),
      "VERSION:2.0".to_string(),
      "PRODID:-//novsu-sync//EN".to_string(),
      "BEGIN:VEVENT".to_string(),
      format!("UID:{}", self.uid),
      format!("DTSTAMP:{}", format_utc(OffsetDateTime::now_utc())),
      format!("DTSTART:{}", format_utc(self.start)),
      format!("DTEND:{}", format_utc(self.end)),
      format!("SUMMARY:{}", escape_text(&self.summary)),
      format!("DESCRIPTION:{}", escape_text(&self.description)),
    ];

    if let Some(location) = &self.location {
      lines.push(format!("LOCATION:{}", escape_text(location)));
    }

    if let Some(rrule) = &self.rrule {
      // UNTIL is inclusive: the last instant before local midnight of the
      // exclusive end date.
      let until = PrimitiveDateTime::new(rrule.until_exclusive, Time::MIDNIGHT)
        .assume_offset(self.start.offset())
        - Duration::seconds(1);

      lines.push(format!(
        "RRULE:FREQ=WEEKLY;INTERVAL={};UNTIL={}",
        rrule.interval_weeks,
        format_utc(until)
      ));
    }

    for exdate in &self.exdates {
      lines.push(format!("EXDATE:{}", format_utc(*exdate)));
    }

    lines.push("END:VEVENT".to_string());
    lines.push("END:VCALENDAR".to_string());
    lines.push(String::new());

    lines.join("\r\n")
  }
}

pub(crate) fn format_utc(instant: OffsetDateTime) -> String {
  let utc = instant.to_offset(UtcOffset::UTC);

  format!(
    "{:04}{:02}{:02}T{:02}{:02}{:02}Z",
    utc.year(),
    utc.month() as u8,
    utc.day(),
    utc.hour(),
    utc.minute(),
    utc.second()
  )
}

fn escape_text(value: &str) -> String {
  value
    .replace('\\', "\\\\")
    .replace(';', "\\;")
    .replace(',', "\\,")
    .replace('\n', "\\n")
}
