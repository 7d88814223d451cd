use std::fmt::Write;

use anyhow::anyhow;
use clap::Parser;
use reqwest::Url;
use time::macros::format_description;
use time::{Duration, UtcOffset};
use tracing::info;

use novsu_caldav::{Caldav, Event, Rrule};
use novsu_timetable::{Lesson, Novsu};

#[derive(Parser)]
#[command(author, version, about, long_about)]
struct Args {
  /// URL of the published timetable page.
  #[arg(long, short, env = "NOVSU_SYNC_TIMETABLE_URL")]
  timetable_url: Url,
  /// Fixed UTC offset of the lesson times.
  #[arg(
    long,
    env = "NOVSU_SYNC_TIMEZONE",
    default_value = "+03:00",
    value_parser = parse_offset
  )]
  timezone: UtcOffset,
  /// Subgroup (1 or 2) to keep; both when omitted.
  #[arg(long, short, env = "NOVSU_SYNC_SUBGROUP")]
  subgroup: Option<u8>,
  #[arg(long, env = "NOVSU_SYNC_CALDAV_USERNAME")]
  caldav_username: String,
  #[arg(long, env = "NOVSU_SYNC_CALDAV_PASSWORD")]
  caldav_password: String,
  /// URL of the CalDAV calendar collection to synchronize into.
  #[arg(long, env = "NOVSU_SYNC_CALDAV_CALENDAR")]
  caldav_calendar: Url,
  /// Expected display name of that calendar. The sync aborts on a mismatch
  /// instead of purging a calendar it was not meant for.
  #[arg(long, env = "NOVSU_SYNC_CALDAV_NAME")]
  caldav_name: String,
}

fn parse_offset(value: &str) -> Result<UtcOffset, String> {
  UtcOffset::parse(
    value,
    format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
  )
  .map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let args = Args::parse();
  tracing_subscriber::fmt::init();

  let caldav = Caldav::new(args.caldav_username.clone(), args.caldav_password.clone());

  let name = caldav.display_name(&args.caldav_calendar).await?;
  if name != args.caldav_name {
    return Err(anyhow!(
      "mismatched calendar name: expected {}, got {}",
      args.caldav_name,
      name
    ));
  }

  let novsu = Novsu::new(args.timetable_url.clone(), args.timezone, args.subgroup);
  let timetable = novsu.fetch().await?;

  let existing = caldav
    .event_urls(
      &args.caldav_calendar,
      timetable.date_from,
      timetable.date_to_exclusive,
    )
    .await?;

  for (i, url) in existing.iter().enumerate() {
    info!("Deleting existing events... ({}/{})", i + 1, existing.len());
    caldav.delete_event(url).await?;
  }

  info!("Deleted {} existing events", existing.len());

  for (i, lesson) in timetable.lessons.iter().enumerate() {
    info!(
      "Importing lessons... ({}/{})",
      i + 1,
      timetable.lessons.len()
    );
    caldav
      .put_event(&args.caldav_calendar, &event(lesson))
      .await?;
  }

  info!("Imported {} lessons", timetable.lessons.len());

  Ok(())
}

/// Maps one lesson to a 45 minute recurring event.
fn event(lesson: &Lesson) -> Event {
  let mut description = format!("Преподаватель: {}", lesson.teacher);

  if let Some(subgroup) = lesson.subgroup {
    write!(description, "\nПодгруппа: {subgroup}").unwrap();
  }
  if !lesson.comment.is_empty() {
    write!(description, "\nКомментарий: {}", lesson.comment).unwrap();
  }

  Event::new(
    lesson.first,
    lesson.first + Duration::minutes(45),
    lesson.subject.clone(),
    description,
    lesson.location.clone(),
    Some(Rrule {
      interval_weeks: lesson.interval_weeks,
      until_exclusive: lesson.until_exclusive,
    }),
    lesson.exceptions.clone(),
  )
}
