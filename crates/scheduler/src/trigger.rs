//! Cron trigger construction from stored schedules.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule as CronSchedule;
use tracing::warn;

use database::validation::parse_schedule_time;
use database::{ScheduleType, ScheduledSummary};

use crate::SchedulerError;

/// Stored weekly days are 0 = Monday .. 6 = Sunday.
const CRON_DAYS: [&str; 7] = ["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

/// One firing rule: a cron expression evaluated in a schedule's timezone.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub schedule_id: i64,
    pub schedule_name: String,
    pub cron: CronSchedule,
    pub timezone: Tz,
}

impl Trigger {
    /// The next firing instant strictly after `after`, in UTC. Evaluation
    /// happens in the trigger's timezone, so DST shifts move the UTC
    /// instant while the local wall-clock time stays put.
    pub fn next_fire(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = after.with_timezone(&self.timezone);
        self.cron
            .after(&local)
            .next()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Resolve an IANA timezone name, falling back to UTC when it does not
/// resolve. Schedules keep firing rather than going dark over a typo.
pub fn parse_timezone(name: &str) -> Tz {
    match Tz::from_str(name) {
        Ok(tz) => tz,
        Err(_) => {
            warn!(timezone = name, "Unknown timezone, falling back to UTC");
            Tz::UTC
        }
    }
}

/// Build the triggers for a schedule: one per configured firing time for
/// daily schedules, a single trigger at the first time for weekly ones.
pub fn build_triggers(sched: &ScheduledSummary) -> Result<Vec<Trigger>, SchedulerError> {
    let timezone = parse_timezone(&sched.timezone);

    let times = match sched.schedule_type {
        ScheduleType::Weekly => &sched.schedule_times[..sched.schedule_times.len().min(1)],
        ScheduleType::Daily => &sched.schedule_times[..],
    };
    let mut triggers = Vec::with_capacity(times.len());

    for time in times {
        let (hour, minute) = parse_schedule_time(time)?;

        let expr = match (sched.schedule_type, sched.schedule_day_of_week) {
            (ScheduleType::Weekly, Some(day)) if (0..=6).contains(&day) => {
                format!("0 {minute} {hour} * * {}", CRON_DAYS[day as usize])
            }
            (ScheduleType::Weekly, _) => {
                return Err(SchedulerError::InvalidSchedule {
                    schedule_id: sched.id,
                    reason: "weekly schedule without a valid day of week".to_string(),
                })
            }
            (ScheduleType::Daily, _) => format!("0 {minute} {hour} * * *"),
        };

        let cron = CronSchedule::from_str(&expr).map_err(|e| SchedulerError::InvalidSchedule {
            schedule_id: sched.id,
            reason: format!("cron expression {expr:?}: {e}"),
        })?;

        triggers.push(Trigger {
            schedule_id: sched.id,
            schedule_name: sched.name.clone(),
            cron,
            timezone,
        });
    }
    Ok(triggers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(times: &[&str], tz: &str) -> ScheduledSummary {
        ScheduledSummary {
            id: 1,
            name: "daily".to_string(),
            source_group_id: "src".to_string(),
            target_group_id: "dst".to_string(),
            schedule_times: times.iter().map(|t| t.to_string()).collect(),
            timezone: tz.to_string(),
            summary_period_hours: 24,
            schedule_type: ScheduleType::Daily,
            schedule_day_of_week: None,
            retention_hours: 48,
            detail_mode: true,
            enabled: true,
            last_run: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn one_trigger_per_time() {
        let triggers = build_triggers(&sample(&["09:00", "17:30"], "UTC")).unwrap();
        assert_eq!(triggers.len(), 2);
    }

    #[test]
    fn daily_fires_next_day_after_passing() {
        let triggers = build_triggers(&sample(&["10:00"], "UTC")).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let next = triggers[0].next_fire(after).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap());
    }

    #[test]
    fn timezone_shifts_the_utc_instant() {
        // 09:00 in New York is 14:00 UTC during standard time.
        let triggers = build_triggers(&sample(&["09:00"], "America/New_York")).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let next = triggers[0].next_fire(after).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 10, 14, 0, 0).unwrap());

        // During daylight saving the same wall-clock time is 13:00 UTC.
        let after = Utc.with_ymd_and_hms(2024, 7, 10, 0, 0, 0).unwrap();
        let next = triggers[0].next_fire(after).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 7, 10, 13, 0, 0).unwrap());
    }

    #[test]
    fn weekly_fires_on_configured_day() {
        let mut sched = sample(&["10:00"], "UTC");
        sched.schedule_type = ScheduleType::Weekly;
        sched.schedule_day_of_week = Some(0);

        let triggers = build_triggers(&sched).unwrap();
        // 2024-01-01 is a Monday; from Tuesday the next fire is the
        // following Monday.
        let after = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let next = triggers[0].next_fire(after).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 1, 8, 10, 0, 0).unwrap());
    }

    #[test]
    fn weekly_uses_only_the_first_time() {
        let mut sched = sample(&["10:00", "18:00"], "UTC");
        sched.schedule_type = ScheduleType::Weekly;
        sched.schedule_day_of_week = Some(0);

        let triggers = build_triggers(&sched).unwrap();
        assert_eq!(triggers.len(), 1);
        let after = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(
            triggers[0].next_fire(after).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 8, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn weekly_without_day_is_rejected() {
        let mut sched = sample(&["10:00"], "UTC");
        sched.schedule_type = ScheduleType::Weekly;
        assert!(matches!(
            build_triggers(&sched).unwrap_err(),
            SchedulerError::InvalidSchedule { .. }
        ));
    }

    #[test]
    fn unknown_timezone_falls_back_to_utc() {
        assert_eq!(parse_timezone("Not/AZone"), Tz::UTC);
        assert_eq!(parse_timezone("Europe/Berlin").name(), "Europe/Berlin");
    }
}
