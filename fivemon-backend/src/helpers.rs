use chrono::{DateTime, TimeZone, Utc};
use std::time::Duration;

pub fn now() -> DateTime<Utc> {
  Utc::now()
}

/// Time left until the next midnight in `now`'s timezone.
///
/// Falls back to a full day when that midnight does not exist locally
/// (DST transitions at 00:00).
pub fn until_next_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> Duration {
  const DAY: Duration = Duration::from_secs(24 * 60 * 60);

  let tz = now.timezone();
  let next = now
    .date_naive()
    .succ_opt()
    .and_then(|day| day.and_hms_opt(0, 0, 0))
    .and_then(|midnight| tz.from_local_datetime(&midnight).earliest());

  match next {
    Some(next) => next
      .signed_duration_since(now)
      .to_std()
      .unwrap_or(Duration::from_secs(1)),
    None => DAY,
  }
}

/// Whether a periodic size report is due (first poll of every fifth minute).
pub fn on_report_tick(now: &DateTime<Utc>, poll_interval: Duration) -> bool {
  use chrono::Timelike;
  now.minute() % 5 == 0 && u64::from(now.second()) < poll_interval.as_secs().max(1)
}
