use reqwest::{Client, Url};
use select::document::Document;
use time::UtcOffset;
use tracing::info;

pub use crate::error::ParseError;
pub use crate::model::{Lesson, Timetable};
pub use crate::parse::parse_document;

mod annotation;
mod error;
mod model;
mod parse;

/// Fetches the published NovSU timetable page and parses it into a
/// [`Timetable`]. The parse itself is pure; this is the only networked part.
pub struct Novsu {
  client: Client,
  timetable_url: Url,
  timezone: UtcOffset,
  subgroup: Option<u8>,
}

impl Novsu {
  pub fn new(timetable_url: Url, timezone: UtcOffset, subgroup: Option<u8>) -> Self {
    Self {
      client: Client::new(),
      timetable_url,
      timezone,
      subgroup,
    }
  }

  pub async fn fetch(&self) -> anyhow::Result<Timetable> {
    let response = self
      .client
      .get(self.timetable_url.clone())
      .send()
      .await?
      .error_for_status()?;

    let text = response.text().await?;
    let document = Document::from(text.as_str());

    let timetable = parse_document(&document, self.timezone, self.subgroup)?;

    info!(
      "Parsed timetable from {} to {}, got {} lessons",
      timetable.date_from,
      timetable.date_to_exclusive,
      timetable.lessons.len()
    );

    Ok(timetable)
  }
}
