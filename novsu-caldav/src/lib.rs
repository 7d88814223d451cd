//! Minimal CalDAV client: just enough of RFC 4791 to purge a date window
//! and upload freshly generated events. Responses are scanned with regexes
//! for the two element names we care about instead of pulling in an XML
//! stack.

use anyhow::anyhow;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Url};
use time::{Date, PrimitiveDateTime, Time, UtcOffset};

pub use crate::ics::{Event, Rrule};

mod ics;

static DISPLAY_NAME_REGEX: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"<(?:[A-Za-z]+:)?displayname[^>/]*>([^<]*)</").unwrap());
static HREF_REGEX: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"<(?:[A-Za-z]+:)?href[^>/]*>([^<]+)</").unwrap());

pub struct Caldav {
  client: Client,
  username: String,
  password: String,
}

impl Caldav {
  pub fn new(username: String, password: String) -> Self {
    Self {
      client: Client::new(),
      username,
      password,
    }
  }

  /// Display name of the calendar collection. Callers compare it against
  /// their configuration before purging anything.
  pub async fn display_name(&self, calendar: &Url) -> anyhow::Result<String> {
    let body = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:"><d:prop><d:displayname/></d:prop></d:propfind>"#;

    let text = self
      .request(Method::from_bytes(b"PROPFIND")?, calendar.clone())
      .header("Depth", "0")
      .header(CONTENT_TYPE, HeaderValue::from_static("application/xml; charset=utf-8"))
      .body(body)
      .send()
      .await?
      .error_for_status()?
      .text()
      .await?;

    match DISPLAY_NAME_REGEX.captures(&text) {
      Some(captures) => Ok(captures[1].trim().to_string()),
      None => Err(anyhow!("calendar did not report a display name")),
    }
  }

  /// URLs of the calendar objects with events inside `[from, to_exclusive)`.
  pub async fn event_urls(
    &self,
    calendar: &Url,
    from: Date,
    to_exclusive: Date,
  ) -> anyhow::Result<Vec<Url>> {
    let body = format!(
      r#"<?xml version="1.0" encoding="utf-8"?>
<c:calendar-query xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:prop><d:getetag/></d:prop>
  <c:filter>
    <c:comp-filter name="VCALENDAR">
      <c:comp-filter name="VEVENT">
        <c:time-range start="{}" end="{}"/>
      </c:comp-filter>
    </c:comp-filter>
  </c:filter>
</c:calendar-query>"#,
      stamp(from),
      stamp(to_exclusive)
    );

    let text = self
      .request(Method::from_bytes(b"REPORT")?, calendar.clone())
      .header("Depth", "1")
      .header(CONTENT_TYPE, HeaderValue::from_static("application/xml; charset=utf-8"))
      .body(body)
      .send()
      .await?
      .error_for_status()?
      .text()
      .await?;

    HREF_REGEX
      .captures_iter(&text)
      .map(|captures| calendar.join(&captures[1]).map_err(Into::into))
      .collect()
  }

  pub async fn delete_event(&self, event: &Url) -> anyhow::Result<()> {
    self
      .request(Method::DELETE, event.clone())
      .send()
      .await?
      .error_for_status()?;

    Ok(())
  }

  /// Uploads one event as a new calendar object named after its UID.
  pub async fn put_event(&self, calendar: &Url, event: &Event) -> anyhow::Result<()> {
    let url = calendar.join(&format!("{}.ics", event.uid))?;

    self
      .request(Method::PUT, url)
      .header(CONTENT_TYPE, HeaderValue::from_static("text/calendar; charset=utf-8"))
      .body(event.to_ics())
      .send()
      .await?
      .error_for_status()?;

    Ok(())
  }

  fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
    self
      .client
      .request(method, url)
      .basic_auth(&self.username, Some(&self.password))
  }
}

fn stamp(date: Date) -> String {
  ics::format_utc(PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_offset(UtcOffset::UTC))
}
