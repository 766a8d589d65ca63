use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::broadcast::BroadcastTask;

/// A fixed wall-clock time in a named time zone, once per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
    tz: Tz,
}

impl DailySchedule {
    pub fn new(at: NaiveTime, tz: Tz) -> Self {
        Self { at, tz }
    }

    /// First firing strictly after `now`.
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.with_timezone(&self.tz).date_naive();
        today
            .iter_days()
            .take(3)
            .filter_map(|day| self.resolve(day))
            .find(|at| *at > now)
            .unwrap_or_else(|| now + chrono::Duration::days(1))
    }

    /// Local firing time on `day`. A time skipped by a DST jump moves forward
    /// an hour; a repeated one fires on its first occurrence.
    fn resolve(&self, day: NaiveDate) -> Option<DateTime<Utc>> {
        let naive = day.and_time(self.at);
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .or_else(|| {
                self.tz
                    .from_local_datetime(&(naive + chrono::Duration::hours(1)))
                    .earliest()
            })
            .map(|t| t.with_timezone(&Utc))
    }
}

/// Fire `task` every day according to `schedule`. Runs until aborted.
///
/// Each firing runs in its own tokio task, so even a panic inside it leaves
/// the loop alive for the next day.
pub async fn run_daily(schedule: DailySchedule, task: Arc<BroadcastTask>) {
    let mut after = Utc::now();
    loop {
        let next = schedule.next_fire_after(after);
        let wait = (next - Utc::now()).to_std().unwrap_or_default();
        tracing::info!(
            "⏰ Next daily broadcast at {} ({} min from now)",
            next.with_timezone(&schedule.tz),
            wait.as_secs() / 60
        );
        tokio::time::sleep(wait).await;

        let firing = task.clone();
        if let Err(e) = tokio::spawn(async move { firing.fire().await }).await {
            tracing::error!("Daily broadcast crashed: {}", e);
        }
        after = next.max(Utc::now());
    }
}
